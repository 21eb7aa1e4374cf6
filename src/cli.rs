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
//! Command Line Interface
//!
//! Drives a control session against the simulated TV-out device.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use tvout_core::{
    load_config, load_config_from, sim, AbstractValue, AttributeId, BackendKind, ControlSession,
    EngineConfig, SetOutcome,
};

use crate::script::{load_script, run_script};

#[derive(Parser, Debug)]
#[command(name = "tvout")]
#[command(version)]
#[command(about = "tvout - TV-out attribute control")]
#[command(long_about = "tvout - TV-out attribute control

Discovers the TV-out attributes of the display server, validates them and
keeps a synchronized view of their values.

EXAMPLES:
    tvout status                       Show every supported attribute
    tvout get scale                    Print one attribute
    tvout set aspect 1                 Switch to widescreen
    tvout --backend xv set enable 1    Clone video to the TV through Xv
    tvout script steps.json            Replay a scripted session

ENVIRONMENT VARIABLES:
    RUST_LOG=debug         Enable debug logging
    TVOUT_CONFIG=FILE      Use FILE instead of the default configuration

FILES:
    ~/.config/tvout/config.json        Engine configuration")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file to use
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the configured backend
    #[arg(long, global = true)]
    pub backend: Option<BackendKind>,

    /// Override the configured output name
    #[arg(long, global = true)]
    pub output: Option<String>,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show every supported attribute with its value and metadata
    Status,

    /// Print the cached value of one attribute
    Get {
        /// Attribute name, e.g. scale or tv_standard
        attribute: AttributeId,
    },

    /// Request a new value and print the confirmed changes
    Set {
        attribute: AttributeId,
        #[arg(allow_hyphen_values = true)]
        value: AbstractValue,
    },

    /// Replay a JSON list of steps
    Script {
        file: PathBuf,
    },
}

/// Configuration file plus command line overrides
pub fn resolve_config(cli: &Cli) -> anyhow::Result<EngineConfig> {
    let mut cfg = match &cli.config {
        Some(path) => load_config_from(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => load_config().context("Failed to load config")?,
    };

    if let Some(backend) = cli.backend {
        cfg.backend = backend;
    }
    if let Some(output) = &cli.output {
        cfg.output_name = output.clone();
    }
    Ok(cfg)
}

pub fn run_cli(cli: &Cli, cfg: &EngineConfig) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Status => cmd_status(cfg, cli.json),
        Commands::Get { attribute } => cmd_get(cfg, *attribute, cli.json),
        Commands::Set { attribute, value } => cmd_set(cfg, *attribute, *value, cli.json),
        Commands::Script { file } => cmd_script(cfg, file, cli.json),
    }
}

fn cmd_status(cfg: &EngineConfig, json: bool) -> anyhow::Result<()> {
    let (backend, _server) = sim::start(cfg)?;
    let session = ControlSession::from_boxed(backend, |_, _| {});
    let snapshot = session.snapshot();

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        println!("tvout Status");
        println!("============");
        println!();
        println!("Backend:    {}", session.kind());
        println!("Descriptor: {}", session.descriptor());
        println!();
        for entry in &snapshot {
            println!("  {:<16} {:<8} {}", entry.id, format_value(entry.value), entry.metadata);
        }
    }

    session.teardown();
    Ok(())
}

fn cmd_get(cfg: &EngineConfig, attribute: AttributeId, json: bool) -> anyhow::Result<()> {
    let (backend, _server) = sim::start(cfg)?;
    let session = ControlSession::from_boxed(backend, |_, _| {});
    if !session.supports(attribute) {
        anyhow::bail!("{} is not supported by the {} backend", attribute, session.kind());
    }

    let value = session.get(attribute);
    if json {
        println!("{}", serde_json::json!({ "attribute": attribute, "value": value }));
    } else {
        println!("{}", format_value(value));
    }
    session.teardown();
    Ok(())
}

fn cmd_set(cfg: &EngineConfig, attribute: AttributeId, value: AbstractValue, json: bool) -> anyhow::Result<()> {
    let changes: Rc<RefCell<Vec<(AttributeId, AbstractValue)>>> = Rc::default();
    let sink = changes.clone();

    let (backend, _server) = sim::start(cfg)?;
    let mut session = ControlSession::from_boxed(backend, move |id, v| sink.borrow_mut().push((id, v)));
    let outcome = session.set(attribute, value)?;
    session.teardown();

    let changes = changes.borrow();
    if json {
        let changed: Vec<_> = changes
            .iter()
            .map(|(id, v)| serde_json::json!({ "attribute": id, "value": v }))
            .collect();
        println!(
            "{}",
            serde_json::json!({ "submitted": outcome == SetOutcome::Submitted, "changed": changed })
        );
    } else if outcome == SetOutcome::Unchanged {
        println!("{} already {}", attribute, value);
    } else {
        for (id, v) in changes.iter() {
            println!("{} -> {}", id, v);
        }
    }
    Ok(())
}

fn cmd_script(cfg: &EngineConfig, file: &Path, json: bool) -> anyhow::Result<()> {
    let steps = load_script(file)?;
    let observations = run_script(cfg, &steps)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&observations)?);
    } else {
        for observation in &observations {
            println!("{}", serde_json::to_string(observation)?);
        }
    }
    Ok(())
}

fn format_value(value: Option<AbstractValue>) -> String {
    value.map_or_else(|| "unknown".to_string(), |v| v.to_string())
}
