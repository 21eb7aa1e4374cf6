/*
 * Integration tests for tvout
 *
 * These tests drive complete sessions over the simulated display servers
 * and check configuration loading and the scripted front end.
 */

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use serial_test::serial;
use tempfile::NamedTempFile;

use tvout::cli::{resolve_config, Cli};
use tvout::script::{load_script, run_script, Observation, ScriptStep};
use tvout_core::constants::randr;
use tvout_core::sim::randr::TV_OUTPUT;
use tvout_core::sim::{self, SimRandr, SimXv, SimulatedServer};
use tvout_core::{
    load_config, AbstractValue, AttributeId, BackendKind, ControlSession, EngineConfig, SetOutcome,
    TvoutError,
};

use clap::Parser;

type Log = Rc<RefCell<Vec<(AttributeId, AbstractValue)>>>;

fn recorder() -> (Log, impl FnMut(AttributeId, AbstractValue)) {
    let log: Log = Rc::default();
    let sink = log.clone();
    (log, move |id, value| sink.borrow_mut().push((id, value)))
}

fn write_temp(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_randr_full_session() {
    let sim = SimRandr::tv_out();
    let (log, notify) = recorder();
    let mut session = ControlSession::init_randr(sim.clone(), &EngineConfig::default(), notify).unwrap();

    // Out of range: rejected locally, nothing written
    let err = session.set(AttributeId::Scale, 150).unwrap_err();
    assert!(err.is_validation_failure());
    assert_eq!(sim.writes(), 0);

    // Same value: no write, no callback
    assert_eq!(session.set(AttributeId::Scale, 50).unwrap(), SetOutcome::Unchanged);
    assert_eq!(sim.writes(), 0);

    // New value: one write, one callback before returning
    assert_eq!(session.set(AttributeId::Scale, 60).unwrap(), SetOutcome::Submitted);
    assert_eq!(*log.borrow(), vec![(AttributeId::Scale, 60)]);

    // Another client switches to widescreen
    sim.inject(AttributeId::Aspect, 1).unwrap();
    assert_eq!(session.on_readable(), 1);
    assert_eq!(log.borrow().last(), Some(&(AttributeId::Aspect, 1)));

    // Enabling binds the output to its CRTC
    session.set(AttributeId::Enable, 1).unwrap();
    assert_eq!(session.get(AttributeId::Enable), Some(1));
    assert_eq!(log.borrow().len(), 3);

    session.teardown();
    assert!(!sim.server().events_selected);
}

#[test]
fn test_xv_full_session() {
    let sim = SimXv::omap();
    let (log, notify) = recorder();
    let mut session = ControlSession::init_xv(sim.clone(), notify).unwrap();

    assert!(!session.supports(AttributeId::XOffset));
    assert!(matches!(
        session.set(AttributeId::XOffset, 1),
        Err(TvoutError::UnsupportedAttribute(_))
    ));

    session.set(AttributeId::Enable, 1).unwrap();
    sim.inject(AttributeId::Scale, 75).unwrap();
    session.on_readable();

    assert_eq!(
        *log.borrow(),
        vec![(AttributeId::Enable, 1), (AttributeId::Scale, 75)]
    );
}

#[test]
fn test_init_failure_leaves_no_subscription() {
    let sim = SimRandr::tv_out();
    let atom = sim.atom(randr::XV_CLONE_FULLSCREEN).unwrap();
    sim.server()
        .output_mut(TV_OUTPUT)
        .unwrap()
        .properties
        .retain(|p| p.atom != atom);

    let (log, notify) = recorder();
    let result = ControlSession::init_randr(sim.clone(), &EngineConfig::default(), notify);
    let err = result.err().unwrap();

    assert!(err.is_init_failure());
    assert!(!sim.server().events_selected);
    assert!(log.borrow().is_empty());
}

#[test]
fn test_sim_start_honours_backend() {
    let cfg = EngineConfig {
        backend: BackendKind::Xv,
        descriptor: 9,
        ..EngineConfig::default()
    };
    let (backend, _server) = sim::start(&cfg).unwrap();
    assert_eq!(backend.kind(), BackendKind::Xv);
    assert_eq!(backend.descriptor(), 9);

    let cfg = EngineConfig {
        output_name: "VGA".to_string(),
        ..EngineConfig::default()
    };
    assert!(matches!(sim::start(&cfg), Err(TvoutError::TargetNotFound(_))));
}

#[test]
fn test_script_file_replay() {
    let file = write_temp(
        r#"[
            { "op": "external", "attribute": "tv_standard", "value": 1 },
            { "op": "drain" },
            { "op": "set", "attribute": "tv_standard", "value": 1 },
            { "op": "get", "attribute": "tv_standard" }
        ]"#,
    );

    let steps = load_script(file.path()).unwrap();
    assert_eq!(steps.len(), 4);
    assert_eq!(steps[1], ScriptStep::Drain);

    let seen = run_script(&EngineConfig::default(), &steps).unwrap();
    assert_eq!(
        seen,
        vec![
            Observation::Changed {
                attribute: AttributeId::TvStandard,
                value: 1
            },
            Observation::Unchanged {
                attribute: AttributeId::TvStandard
            },
            Observation::Value {
                attribute: AttributeId::TvStandard,
                value: Some(1)
            },
        ]
    );
}

#[test]
#[serial]
fn test_config_from_environment() {
    let file = write_temp(r#"{ "backend": "xv", "log_level": "debug" }"#);
    std::env::set_var("TVOUT_CONFIG", file.path());

    let cfg = load_config().unwrap();
    assert_eq!(cfg.backend, BackendKind::Xv);
    assert_eq!(cfg.log_level, "debug");

    let cli = Cli::try_parse_from(["tvout", "--backend", "randr", "status"]).unwrap();
    let cfg = resolve_config(&cli).unwrap();
    assert_eq!(cfg.backend, BackendKind::Randr);
    assert_eq!(cfg.log_level, "debug");

    std::env::remove_var("TVOUT_CONFIG");
}

#[test]
#[serial]
fn test_missing_config_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var("TVOUT_CONFIG", dir.path().join("absent.json"));

    let cfg = load_config().unwrap();
    assert_eq!(cfg, EngineConfig::default());

    std::env::remove_var("TVOUT_CONFIG");
}

#[test]
#[serial]
fn test_invalid_config_file_is_reported() {
    let file = write_temp("{ not json");
    std::env::set_var("TVOUT_CONFIG", file.path());

    assert!(matches!(load_config(), Err(TvoutError::JsonParse(_))));

    std::env::remove_var("TVOUT_CONFIG");
}
