//! Output-property backend
//!
//! Binds to a named output driven by exactly one CRTC. Attributes are output
//! properties, except Enable which connects or disconnects the output from
//! its CRTC.
//!
//! Property notifications only say *which* property changed, so every one
//! is followed by an authoritative read.

use std::os::unix::io::RawFd;

use tracing::{debug, info, warn};

use super::AttributeBackend;
use crate::catalog::{enum_fixup, AttributeDescriptor, RANDR_CATALOG};
use crate::constants::{enable, randr};
use crate::data::{
    validate_enum_values, validate_range_info, validate_scalar_reply, AbstractValue, AttributeId,
    AttributeMetadata, BackendKind, RawValue, SetOutcome, ValueKind,
};
use crate::engine::{confirm, plan_write, Handle, Notify, StateCache, WritePlan};
use crate::error::{Result, TvoutError};
use crate::provider::{
    Atom, CrtcId, ModeId, OutputId, OutputPropertyProvider, PropertyState, PropertyType, RandrEvent,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandrOptions {
    pub output_name: String,
}

impl Default for RandrOptions {
    fn default() -> Self {
        Self {
            output_name: randr::DEFAULT_OUTPUT_NAME.to_string(),
        }
    }
}

/// Output plus the pipeline used to enable it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub output: OutputId,
    pub crtc: CrtcId,
    pub mode: ModeId,
}

pub struct RandrBackend<P: OutputPropertyProvider> {
    provider: P,
    target: Target,
    cache: StateCache,
    subscribed: bool,
}

/// Wire type a property of the given kind is declared with
fn wire_type(kind: ValueKind) -> PropertyType {
    match kind {
        ValueKind::Range => PropertyType::Integer,
        ValueKind::Enum => PropertyType::Atom,
    }
}

impl<P: OutputPropertyProvider> RandrBackend<P> {
    /// Discover the target output and every catalog property.
    ///
    /// Either all attributes resolve or the event subscription is undone and
    /// the error returned.
    pub fn init(mut provider: P, options: &RandrOptions) -> Result<Self> {
        let (major, minor) = provider
            .query_version()
            .map_err(|e| TvoutError::ExtensionMissing {
                name: randr::EXTENSION.to_string(),
                reason: e.to_string(),
            })?;
        info!("RandR extension {}.{}", major, minor);

        provider
            .select_output_events(true)
            .map_err(|e| e.during_init(randr::EXTENSION))?;

        let (target, cache) = match discover(&mut provider, options) {
            Ok(found) => found,
            Err(e) => {
                warn!("RandR discovery failed: {}", e);
                if let Err(err) = provider.select_output_events(false) {
                    debug!("Failed to deselect RandR events during rollback: {}", err);
                }
                return Err(e.during_init(randr::EXTENSION));
            }
        };

        info!(
            "Using output {} ({:#x}) on CRTC {:#x}, {} attributes",
            options.output_name,
            target.output,
            target.crtc,
            cache.len()
        );

        let mut backend = Self {
            provider,
            target,
            cache,
            subscribed: true,
        };
        // Settle anything queued during discovery without telling anyone
        backend.drain(&mut |_, _| {});
        Ok(backend)
    }

    pub fn target(&self) -> Target {
        self.target
    }

    fn handle_output_change(&mut self, crtc: Option<CrtcId>, notify: &mut Notify<'_>) {
        let raw = if crtc.is_some() { enable::ON } else { enable::OFF };
        confirm(&mut self.cache, AttributeId::Enable, raw, notify);
    }

    fn handle_output_property(&mut self, property: Atom, state: PropertyState, notify: &mut Notify<'_>) {
        let Some(id) = self.cache.find_symbol(property) else {
            return;
        };
        if state != PropertyState::NewValue {
            debug!("{} property deleted, ignoring", id);
            return;
        }
        let Some(kind) = self.cache.metadata(id).map(AttributeMetadata::kind) else {
            return;
        };

        match read_property(&mut self.provider, self.target.output, property, id.as_str(), kind) {
            Ok(raw) => {
                confirm(&mut self.cache, id, raw, notify);
            }
            Err(e) => debug!("Dropping {} notification: {}", id, e),
        }
    }
}

impl<P: OutputPropertyProvider> AttributeBackend for RandrBackend<P> {
    fn kind(&self) -> BackendKind {
        BackendKind::Randr
    }

    fn descriptor(&self) -> RawFd {
        self.provider.connection_fd()
    }

    fn cache(&self) -> &StateCache {
        &self.cache
    }

    fn set(&mut self, id: AttributeId, value: AbstractValue, notify: &mut Notify<'_>) -> Result<SetOutcome> {
        let WritePlan::Write { handle, raw } = plan_write(&self.cache, id, value)? else {
            return Ok(SetOutcome::Unchanged);
        };

        match handle {
            Handle::Pipeline => {
                let Target { output, crtc, mode } = self.target;
                if raw == enable::ON {
                    self.provider.set_crtc_config(crtc, Some(mode), &[output])?;
                } else {
                    self.provider.set_crtc_config(crtc, None, &[])?;
                }
            }
            Handle::Symbol(atom) => {
                let kind = self
                    .cache
                    .metadata(id)
                    .map(AttributeMetadata::kind)
                    .ok_or_else(|| TvoutError::UnsupportedAttribute(id.to_string()))?;
                self.provider
                    .change_output_property(self.target.output, atom, wire_type(kind), raw)?;
            }
        }
        debug!("Wrote {} = {} (raw {})", id, value, raw);

        self.drain(notify);
        Ok(SetOutcome::Submitted)
    }

    fn drain(&mut self, notify: &mut Notify<'_>) -> usize {
        let mut processed = 0;
        while let Some(event) = self.provider.poll_event() {
            processed += 1;
            match event {
                RandrEvent::OutputChange { output, crtc } if output == self.target.output => {
                    self.handle_output_change(crtc, notify);
                }
                RandrEvent::OutputProperty {
                    output,
                    property,
                    state,
                } if output == self.target.output => {
                    self.handle_output_property(property, state, notify);
                }
                RandrEvent::OtherNotify { subtype } => {
                    debug!("Unknown RandR event subtype {}", subtype);
                }
                _ => {}
            }
        }
        processed
    }

    fn shutdown(&mut self) {
        if !self.subscribed {
            return;
        }
        self.subscribed = false;
        if let Err(e) = self.provider.select_output_events(false) {
            debug!("Failed to deselect RandR events: {}", e);
        }
    }
}

impl<P: OutputPropertyProvider> Drop for RandrBackend<P> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn discover<P: OutputPropertyProvider>(
    provider: &mut P,
    options: &RandrOptions,
) -> Result<(Target, StateCache)> {
    let (target, enabled) = select_output(provider, &options.output_name)?;

    let mut cache = StateCache::new();
    cache.insert(
        AttributeId::Enable,
        Handle::Pipeline,
        AttributeMetadata::Range {
            low: enable::OFF,
            high: enable::ON,
        },
        if enabled { enable::ON } else { enable::OFF },
    );

    for atom in provider.list_output_properties(target.output)? {
        let name = provider.atom_name(atom)?;
        let Some(desc) = RANDR_CATALOG.by_name(&name) else {
            continue;
        };
        let (metadata, raw) = probe_property(provider, target.output, atom, desc)?;
        debug!("{} -> {} ({}), raw {}", desc.id, name, metadata, raw);
        cache.insert(desc.id, Handle::Symbol(atom), metadata, raw);
    }

    if let Some(missing) = RANDR_CATALOG.iter().find(|d| !cache.contains(d.id)) {
        return Err(TvoutError::AttributeUnresolved {
            attribute: missing.id.to_string(),
            name: missing.name().to_string(),
        });
    }

    Ok((target, cache))
}

/// First output called `name` with a single CRTC and at least one mode
fn select_output<P: OutputPropertyProvider>(provider: &mut P, name: &str) -> Result<(Target, bool)> {
    provider
        .outputs()?
        .into_iter()
        .find(|o| o.name == name && o.crtcs.len() == 1 && !o.modes.is_empty())
        .map(|o| {
            let target = Target {
                output: o.id,
                crtc: o.crtcs[0],
                mode: o.modes[0],
            };
            (target, o.crtc.is_some())
        })
        .ok_or_else(|| {
            TvoutError::TargetNotFound(format!("output {} with one CRTC and a mode", name))
        })
}

fn probe_property<P: OutputPropertyProvider>(
    provider: &mut P,
    output: OutputId,
    atom: Atom,
    desc: &AttributeDescriptor,
) -> Result<(AttributeMetadata, RawValue)> {
    let name = desc.name();
    let raw = read_property(provider, output, atom, name, desc.kind)?;
    let info = provider.query_output_property(output, atom)?;

    let metadata = match desc.kind {
        ValueKind::Range => validate_range_info(name, &info)?,
        ValueKind::Enum => {
            if info.range {
                return Err(TvoutError::malformed_metadata(name, "expected a value list"));
            }
            let values = if info.values.is_empty() {
                fixup_values(provider, name)?
            } else {
                info.values
            };
            validate_enum_values(name, values)?
        }
    };
    Ok((metadata, raw))
}

/// Value list for a whitelisted property reported without one
fn fixup_values<P: OutputPropertyProvider>(provider: &mut P, name: &str) -> Result<Vec<RawValue>> {
    let fixup = enum_fixup(name)
        .ok_or_else(|| TvoutError::malformed_metadata(name, "empty value list"))?;
    debug!("Synthesizing value list for {}", name);

    fixup
        .symbols
        .iter()
        .map(|symbol| {
            provider
                .intern_atom(symbol)?
                .map(RawValue::from)
                .ok_or_else(|| {
                    TvoutError::malformed_metadata(name, format!("symbol {} unknown to server", symbol))
                })
        })
        .collect()
}

fn read_property<P: OutputPropertyProvider>(
    provider: &mut P,
    output: OutputId,
    atom: Atom,
    name: &str,
    kind: ValueKind,
) -> Result<RawValue> {
    let expected = wire_type(kind);
    let reply = provider.get_output_property(output, atom, expected)?;
    validate_scalar_reply(name, &reply, expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::randr::symbols;
    use crate::provider::MockOutputPropertyProvider;
    use crate::sim::randr::{LCD_OUTPUT, TV_CRTC, TV_OUTPUT, TV_PAL_MODE};
    use crate::sim::{SimRandr, SimulatedServer};
    use mockall::predicate::eq;

    type Seen = Vec<(AttributeId, AbstractValue)>;

    fn collect(seen: &mut Seen) -> impl FnMut(AttributeId, AbstractValue) + '_ {
        move |id, value| seen.push((id, value))
    }

    fn init(sim: &SimRandr) -> RandrBackend<SimRandr> {
        RandrBackend::init(sim.clone(), &RandrOptions::default()).unwrap()
    }

    fn remove_property(sim: &SimRandr, name: &str) {
        let atom = sim.atom(name).unwrap();
        sim.server()
            .output_mut(TV_OUTPUT)
            .unwrap()
            .properties
            .retain(|p| p.atom != atom);
    }

    #[test]
    fn test_discovery_resolves_every_attribute() {
        let sim = SimRandr::tv_out();
        let backend = init(&sim);

        assert_eq!(
            backend.target(),
            Target {
                output: TV_OUTPUT,
                crtc: TV_CRTC,
                mode: TV_PAL_MODE
            }
        );
        for id in AttributeId::ALL {
            assert!(backend.supports(id), "{} not resolved", id);
        }
        assert_eq!(backend.get(AttributeId::Enable), Some(0));
        assert_eq!(backend.get(AttributeId::TvStandard), Some(0));
        assert_eq!(backend.get(AttributeId::Scale), Some(50));
        assert_eq!(backend.get(AttributeId::XOffset), Some(0));
        assert_eq!(
            backend.metadata(AttributeId::Scale),
            Some(&AttributeMetadata::Range { low: 1, high: 100 })
        );
        assert!(sim.server().events_selected);
        assert_eq!(sim.writes(), 0);
    }

    #[test]
    fn test_empty_enum_lists_are_synthesized() {
        let sim = SimRandr::tv_out();
        let backend = init(&sim);

        let expected = vec![
            RawValue::from(sim.atom(symbols::ASPECT_4_3).unwrap()),
            RawValue::from(sim.atom(symbols::ASPECT_16_9).unwrap()),
        ];
        assert_eq!(
            backend.metadata(AttributeId::Aspect),
            Some(&AttributeMetadata::Enum { values: expected })
        );
        assert_eq!(backend.get(AttributeId::Aspect), Some(0));
    }

    #[test]
    fn test_unlisted_enum_outside_whitelist_is_rejected() {
        let mut sim = SimRandr::tv_out();
        let err = fixup_values(&mut sim, "Backlight").unwrap_err();
        assert!(matches!(err, TvoutError::MalformedMetadata { .. }));
    }

    #[test]
    fn test_missing_property_fails_and_unsubscribes() {
        let sim = SimRandr::tv_out();
        remove_property(&sim, randr::TV_Y_OFFSET);

        let err = RandrBackend::init(sim.clone(), &RandrOptions::default()).err().unwrap();
        match err {
            TvoutError::AttributeUnresolved { attribute, name } => {
                assert_eq!(attribute, "y_offset");
                assert_eq!(name, "TVYOffset");
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(!sim.server().events_selected);
    }

    #[test]
    fn test_malformed_metadata_fails_init() {
        let sim = SimRandr::tv_out();
        sim.server()
            .property_mut(TV_OUTPUT, randr::TV_SCALE)
            .unwrap()
            .info
            .values = vec![100, 1];

        let err = RandrBackend::init(sim.clone(), &RandrOptions::default()).err().unwrap();
        assert!(matches!(err, TvoutError::MalformedMetadata { .. }));
        assert!(err.is_init_failure());
        assert!(!sim.server().events_selected);
    }

    #[test]
    fn test_wrong_value_type_fails_init() {
        let sim = SimRandr::tv_out();
        sim.server()
            .property_mut(TV_OUTPUT, randr::TV_X_OFFSET)
            .unwrap()
            .property_type = PropertyType::Atom;

        let err = RandrBackend::init(sim, &RandrOptions::default()).err().unwrap();
        assert!(matches!(err, TvoutError::MalformedValue { .. }));
    }

    #[test]
    fn test_failed_property_read_is_init_failure() {
        let sim = SimRandr::tv_out();
        sim.server().fail_property_reads = true;

        let err = RandrBackend::init(sim.clone(), &RandrOptions::default()).err().unwrap();
        assert!(err.is_init_failure());
        match err {
            TvoutError::DiscoveryFailed { backend, source } => {
                assert_eq!(backend, "RANDR");
                assert!(matches!(*source, TvoutError::Provider { .. }));
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(!sim.server().events_selected);
    }

    #[test]
    fn test_target_selection() {
        let sim = SimRandr::tv_out();
        let options = RandrOptions {
            output_name: "HDMI".to_string(),
        };
        let err = RandrBackend::init(sim.clone(), &options).err().unwrap();
        assert!(matches!(err, TvoutError::TargetNotFound(_)));

        // Two candidate CRTCs disqualify the output
        sim.server().output_mut(TV_OUTPUT).unwrap().info.crtcs.push(0x53);
        let err = RandrBackend::init(sim, &RandrOptions::default()).err().unwrap();
        assert!(matches!(err, TvoutError::TargetNotFound(_)));
    }

    #[test]
    fn test_missing_extension() {
        let sim = SimRandr::tv_out();
        sim.server().version = None;
        let err = RandrBackend::init(sim.clone(), &RandrOptions::default()).err().unwrap();
        assert!(matches!(err, TvoutError::ExtensionMissing { .. }));
        assert!(!sim.server().events_selected);
    }

    #[test]
    fn test_scale_set_rules() {
        let sim = SimRandr::tv_out();
        let mut backend = init(&sim);
        let mut seen = Seen::new();

        let err = backend.set(AttributeId::Scale, 150, &mut collect(&mut seen)).unwrap_err();
        assert!(matches!(err, TvoutError::OutOfRange { low: 1, high: 100, .. }));
        assert_eq!(sim.writes(), 0);

        let outcome = backend.set(AttributeId::Scale, 50, &mut collect(&mut seen)).unwrap();
        assert_eq!(outcome, SetOutcome::Unchanged);
        assert_eq!(sim.writes(), 0);
        assert!(seen.is_empty());

        let outcome = backend.set(AttributeId::Scale, 60, &mut collect(&mut seen)).unwrap();
        assert_eq!(outcome, SetOutcome::Submitted);
        assert_eq!(sim.writes(), 1);
        assert_eq!(seen, vec![(AttributeId::Scale, 60)]);
        assert_eq!(backend.get(AttributeId::Scale), Some(60));
        assert_eq!(sim.property_value(TV_OUTPUT, randr::TV_SCALE), Some(60));
    }

    #[test]
    fn test_enum_set_writes_symbol() {
        let sim = SimRandr::tv_out();
        let mut backend = init(&sim);
        let mut seen = Seen::new();

        let err = backend.set(AttributeId::TvStandard, 2, &mut collect(&mut seen)).unwrap_err();
        assert!(matches!(err, TvoutError::InvalidIndex { len: 2, .. }));

        backend.set(AttributeId::TvStandard, 1, &mut collect(&mut seen)).unwrap();
        assert_eq!(seen, vec![(AttributeId::TvStandard, 1)]);
        assert_eq!(
            sim.property_value(TV_OUTPUT, randr::SIGNAL_PROPERTIES),
            sim.atom(symbols::NTSC).map(RawValue::from)
        );
    }

    #[test]
    fn test_external_aspect_change_is_reported() {
        let sim = SimRandr::tv_out();
        let mut backend = init(&sim);
        let mut seen = Seen::new();

        let widescreen = RawValue::from(sim.atom(symbols::ASPECT_16_9).unwrap());
        sim.external_property_change(TV_OUTPUT, randr::TV_ASPECT_RATIO, widescreen)
            .unwrap();

        assert_eq!(backend.drain(&mut collect(&mut seen)), 1);
        assert_eq!(seen, vec![(AttributeId::Aspect, 1)]);
        assert_eq!(backend.get(AttributeId::Aspect), Some(1));
    }

    #[test]
    fn test_unknown_enum_value_degrades_silently() {
        let sim = SimRandr::tv_out();
        let mut backend = init(&sim);
        let mut seen = Seen::new();

        let pal = RawValue::from(sim.atom(symbols::PAL).unwrap());
        sim.external_property_change(TV_OUTPUT, randr::TV_ASPECT_RATIO, pal).unwrap();
        backend.drain(&mut collect(&mut seen));

        assert!(seen.is_empty());
        assert_eq!(backend.get(AttributeId::Aspect), None);
        assert!(backend.supports(AttributeId::Aspect));
    }

    #[test]
    fn test_enable_follows_pipeline_binding() {
        let sim = SimRandr::tv_out();
        let mut backend = init(&sim);
        let mut seen = Seen::new();

        backend.set(AttributeId::Enable, 1, &mut collect(&mut seen)).unwrap();
        assert_eq!(seen, vec![(AttributeId::Enable, 1)]);
        assert_eq!(sim.server().crtc_writes, 1);

        // Another client tears the output down
        sim.external_output_change(TV_OUTPUT, None).unwrap();
        backend.drain(&mut collect(&mut seen));
        assert_eq!(seen.last(), Some(&(AttributeId::Enable, 0)));
        assert_eq!(backend.get(AttributeId::Enable), Some(0));
    }

    #[test]
    fn test_drain_delivers_every_change_in_order() {
        let sim = SimRandr::tv_out();
        let mut backend = init(&sim);
        let mut seen = Seen::new();

        let widescreen = RawValue::from(sim.atom(symbols::ASPECT_16_9).unwrap());
        sim.external_property_change(TV_OUTPUT, randr::TV_SCALE, 70).unwrap();
        sim.external_property_change(TV_OUTPUT, randr::TV_ASPECT_RATIO, widescreen)
            .unwrap();
        sim.external_output_change(TV_OUTPUT, Some(TV_CRTC)).unwrap();

        assert_eq!(backend.drain(&mut collect(&mut seen)), 3);
        assert_eq!(
            seen,
            vec![
                (AttributeId::Scale, 70),
                (AttributeId::Aspect, 1),
                (AttributeId::Enable, 1),
            ]
        );
        assert!(sim.server().queue.is_empty());
    }

    #[test]
    fn test_other_outputs_are_ignored() {
        let sim = SimRandr::tv_out();
        let mut backend = init(&sim);
        let mut seen = Seen::new();

        sim.external_output_change(LCD_OUTPUT, None).unwrap();
        sim.push_event(RandrEvent::OtherNotify { subtype: 7 });
        sim.push_event(RandrEvent::Unrelated { code: 12 });

        assert_eq!(backend.drain(&mut collect(&mut seen)), 3);
        assert!(seen.is_empty());
        assert_eq!(backend.get(AttributeId::Enable), Some(0));
    }

    #[test]
    fn test_failed_requery_drops_event() {
        let sim = SimRandr::tv_out();
        let mut backend = init(&sim);
        let mut seen = Seen::new();

        sim.external_property_change(TV_OUTPUT, randr::TV_SCALE, 70).unwrap();
        sim.external_property_change(TV_OUTPUT, randr::TV_X_OFFSET, 4).unwrap();
        sim.server().fail_property_reads = true;

        assert_eq!(backend.drain(&mut collect(&mut seen)), 2);
        assert!(seen.is_empty());
        assert_eq!(backend.get(AttributeId::Scale), Some(50));
        assert!(sim.server().queue.is_empty());
    }

    #[test]
    fn test_deleted_property_is_ignored() {
        let sim = SimRandr::tv_out();
        let mut backend = init(&sim);
        let mut seen = Seen::new();

        let atom = sim.atom(randr::TV_SCALE).unwrap();
        sim.push_event(RandrEvent::OutputProperty {
            output: TV_OUTPUT,
            property: atom,
            state: PropertyState::Deleted,
        });

        backend.drain(&mut collect(&mut seen));
        assert!(seen.is_empty());
        assert_eq!(backend.get(AttributeId::Scale), Some(50));
    }

    #[test]
    fn test_init_drains_silently() {
        let sim = SimRandr::tv_out();
        sim.push_event(RandrEvent::Unrelated { code: 2 });
        sim.push_event(RandrEvent::OtherNotify { subtype: 5 });

        let _backend = init(&sim);
        assert!(sim.server().queue.is_empty());
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let sim = SimRandr::tv_out();
        let mut backend = init(&sim);

        backend.shutdown();
        assert!(!sim.server().events_selected);

        sim.server().events_selected = true;
        backend.shutdown();
        drop(backend);
        assert!(sim.server().events_selected);
    }

    #[test]
    fn test_rollback_deselects_events() {
        let mut mock = MockOutputPropertyProvider::new();
        mock.expect_query_version().returning(|| Ok((1, 3)));
        mock.expect_select_output_events()
            .with(eq(true))
            .times(1)
            .returning(|_| Ok(()));
        mock.expect_outputs().returning(|| Ok(Vec::new()));
        mock.expect_select_output_events()
            .with(eq(false))
            .times(1)
            .returning(|_| Ok(()));

        let err = RandrBackend::init(mock, &RandrOptions::default()).err().unwrap();
        assert!(matches!(err, TvoutError::TargetNotFound(_)));
    }

    #[test]
    fn test_missing_extension_never_subscribes() {
        let mut mock = MockOutputPropertyProvider::new();
        mock.expect_query_version()
            .returning(|| Err(TvoutError::provider("RRQueryVersion", "BadRequest")));
        mock.expect_select_output_events().times(0);

        assert!(RandrBackend::init(mock, &RandrOptions::default()).is_err());
    }
}
