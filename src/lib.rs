/*
 * This file is part of tvout.
 *
 * Copyright (C) 2025 tvout contributors
 *
 * tvout is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * tvout is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with tvout. If not, see <https://www.gnu.org/licenses/>.
 */
//! tvout - TV-out attribute control
//!
//! Command line front end over `tvout-core`: configuration resolution,
//! logging setup and scripted sessions against the simulated device.

pub mod cli;
pub mod logger;
pub mod script;
