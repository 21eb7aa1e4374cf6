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
//! Logging setup
//!
//! Structured logging through `tracing`, written to stderr so command
//! output on stdout stays machine-readable. `RUST_LOG` wins over the
//! configured level.

use tracing_subscriber::EnvFilter;

/// Filter from `RUST_LOG`, falling back to `level`
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init_logging(level: &str) {
    let result = tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_env_filter(build_filter(level))
        .try_init();

    if result.is_ok() {
        tracing::debug!("Logging initialized at {}", level);
    }
}
