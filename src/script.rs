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
//! Scripted sessions
//!
//! Replays a list of steps against a simulated device and records what the
//! client would observe: confirmed change callbacks, read values and
//! rejected requests.

use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use tvout_core::sim::{self, SimulatedServer};
use tvout_core::{AbstractValue, AttributeId, ControlSession, EngineConfig, SetOutcome};

/// One step of a script file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScriptStep {
    /// Request a value through the session
    Set {
        attribute: AttributeId,
        value: AbstractValue,
    },
    /// Change a value as another client would
    External {
        attribute: AttributeId,
        value: AbstractValue,
    },
    /// Process whatever the connection has queued
    Drain,
    /// Read the cached value
    Get { attribute: AttributeId },
}

/// What the client saw while replaying
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Observation {
    Changed {
        attribute: AttributeId,
        value: AbstractValue,
    },
    Value {
        attribute: AttributeId,
        value: Option<AbstractValue>,
    },
    Unchanged {
        attribute: AttributeId,
    },
    Rejected {
        attribute: AttributeId,
        reason: String,
    },
}

pub fn load_script(path: &Path) -> anyhow::Result<Vec<ScriptStep>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read script {}", path.display()))?;
    let steps = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse script {}", path.display()))?;
    Ok(steps)
}

/// Run `steps` against a fresh simulated device
pub fn run_script(cfg: &EngineConfig, steps: &[ScriptStep]) -> anyhow::Result<Vec<Observation>> {
    let log: Rc<RefCell<Vec<Observation>>> = Rc::default();
    let sink = log.clone();

    let (backend, server) = sim::start(cfg)?;
    let mut session = ControlSession::from_boxed(backend, move |attribute, value| {
        sink.borrow_mut().push(Observation::Changed { attribute, value });
    });

    info!("Replaying {} steps on {}", steps.len(), session.kind());
    for (index, step) in steps.iter().enumerate() {
        debug!("Step {}: {:?}", index, step);
        apply(&mut session, server.as_ref(), step, &log)?;
    }

    session.teardown();
    let observations = log.borrow().clone();
    Ok(observations)
}

fn apply(
    session: &mut ControlSession<'_>,
    server: &dyn SimulatedServer,
    step: &ScriptStep,
    log: &RefCell<Vec<Observation>>,
) -> anyhow::Result<()> {
    match *step {
        ScriptStep::Set { attribute, value } => match session.set(attribute, value) {
            Ok(SetOutcome::Submitted) => {}
            Ok(SetOutcome::Unchanged) => log.borrow_mut().push(Observation::Unchanged { attribute }),
            Err(e) if e.is_validation_failure() => log.borrow_mut().push(Observation::Rejected {
                attribute,
                reason: e.to_string(),
            }),
            Err(e) => return Err(e).context(format!("set {} failed", attribute)),
        },
        ScriptStep::External { attribute, value } => {
            server
                .inject(attribute, value)
                .with_context(|| format!("external change of {} failed", attribute))?;
        }
        ScriptStep::Drain => {
            session.on_readable();
        }
        ScriptStep::Get { attribute } => log.borrow_mut().push(Observation::Value {
            attribute,
            value: session.get(attribute),
        }),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_steps() {
        let steps: Vec<ScriptStep> = serde_json::from_str(
            r#"[
                { "op": "set", "attribute": "scale", "value": 60 },
                { "op": "external", "attribute": "aspect", "value": 1 },
                { "op": "drain" },
                { "op": "get", "attribute": "x_offset" }
            ]"#,
        )
        .unwrap();

        assert_eq!(
            steps,
            vec![
                ScriptStep::Set {
                    attribute: AttributeId::Scale,
                    value: 60
                },
                ScriptStep::External {
                    attribute: AttributeId::Aspect,
                    value: 1
                },
                ScriptStep::Drain,
                ScriptStep::Get {
                    attribute: AttributeId::XOffset
                },
            ]
        );
    }

    #[test]
    fn test_unknown_op_rejected() {
        let result: Result<Vec<ScriptStep>, _> = serde_json::from_str(r#"[{ "op": "reset" }]"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_replay_reports_confirmed_changes_only() {
        let steps = vec![
            ScriptStep::Set {
                attribute: AttributeId::Scale,
                value: 150,
            },
            ScriptStep::Set {
                attribute: AttributeId::Scale,
                value: 50,
            },
            ScriptStep::Set {
                attribute: AttributeId::Scale,
                value: 60,
            },
            ScriptStep::External {
                attribute: AttributeId::Aspect,
                value: 1,
            },
            ScriptStep::Drain,
            ScriptStep::Get {
                attribute: AttributeId::Aspect,
            },
        ];

        let seen = run_script(&EngineConfig::default(), &steps).unwrap();
        assert!(matches!(seen[0], Observation::Rejected { attribute: AttributeId::Scale, .. }));
        assert_eq!(
            seen[1..],
            [
                Observation::Unchanged {
                    attribute: AttributeId::Scale
                },
                Observation::Changed {
                    attribute: AttributeId::Scale,
                    value: 60
                },
                Observation::Changed {
                    attribute: AttributeId::Aspect,
                    value: 1
                },
                Observation::Value {
                    attribute: AttributeId::Aspect,
                    value: Some(1)
                },
            ]
        );
    }
}
