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
use clap::Parser;
use tracing::error;

use tvout::cli::{resolve_config, run_cli, Cli};
use tvout::logger;

fn main() {
    let cli = Cli::parse();

    let cfg = match resolve_config(&cli) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(2);
        }
    };
    logger::init_logging(&cfg.log_level);

    if let Err(e) = run_cli(&cli, &cfg) {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
