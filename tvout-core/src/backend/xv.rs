//! Port-attribute backend
//!
//! Binds to the first video port exposing every tvout attribute. All four
//! attributes are plain integer ranges taken from the port's attribute list.
//!
//! The server sends port notifications even for values it rejected, echoing
//! the rejected request as the new value. A notification is therefore only a
//! hint: the real value is always read back before the cache is touched.

use std::os::unix::io::RawFd;

use tracing::{debug, info, trace, warn};

use super::AttributeBackend;
use crate::catalog::XV_CATALOG;
use crate::constants::{enable, xv};
use crate::data::{
    validate_port_attribute, AbstractValue, AttributeId, AttributeMetadata, BackendKind, RawValue,
    SetOutcome,
};
use crate::engine::{confirm, plan_write, Handle, Notify, StateCache, WritePlan};
use crate::error::{Result, TvoutError};
use crate::provider::{Atom, PortAttributeInfo, PortAttributeProvider, PortId, XvEvent};

pub struct XvBackend<P: PortAttributeProvider> {
    provider: P,
    port: PortId,
    cache: StateCache,
    subscribed: bool,
}

impl<P: PortAttributeProvider> XvBackend<P> {
    pub fn init(mut provider: P) -> Result<Self> {
        let (version, revision) = provider
            .query_extension()
            .map_err(|e| TvoutError::ExtensionMissing {
                name: xv::EXTENSION.to_string(),
                reason: e.to_string(),
            })?;
        info!("XVideo extension {}.{}", version, revision);

        let (port, attributes) =
            select_port(&mut provider).map_err(|e| e.during_init(xv::EXTENSION))?;

        provider
            .select_port_notify(port, true)
            .map_err(|e| e.during_init(xv::EXTENSION))?;

        let cache = match resolve_attributes(&mut provider, port, &attributes) {
            Ok(cache) => cache,
            Err(e) => {
                warn!("XVideo attribute discovery failed: {}", e);
                if let Err(err) = provider.select_port_notify(port, false) {
                    debug!("Failed to deselect port notify during rollback: {}", err);
                }
                return Err(e.during_init(xv::EXTENSION));
            }
        };

        info!("Using XVideo port {}, {} attributes", port, cache.len());

        let mut backend = Self {
            provider,
            port,
            cache,
            subscribed: true,
        };
        backend.drain(&mut |_, _| {});
        Ok(backend)
    }

    pub fn port(&self) -> PortId {
        self.port
    }

    fn handle_port_notify(&mut self, attribute: Atom, claimed: i32, notify: &mut Notify<'_>) {
        let Some(id) = self.cache.find_symbol(attribute) else {
            return;
        };
        trace!("{} notification claims {}", id, claimed);

        match self.provider.get_port_attribute(self.port, attribute) {
            Ok(actual) => {
                if actual != claimed {
                    debug!("{} notification claimed {} but port reports {}", id, claimed, actual);
                }
                confirm(&mut self.cache, id, RawValue::from(actual), notify);
            }
            Err(e) => debug!("Dropping {} notification: {}", id, e),
        }
    }
}

impl<P: PortAttributeProvider> AttributeBackend for XvBackend<P> {
    fn kind(&self) -> BackendKind {
        BackendKind::Xv
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
        let Handle::Symbol(atom) = handle else {
            return Err(TvoutError::NotSupported(format!("{} has no port attribute", id)));
        };
        // Bounds came from i32 attribute limits
        let raw = i32::try_from(raw)
            .map_err(|_| TvoutError::malformed_value(id.as_str(), format!("{} exceeds 32 bits", raw)))?;

        self.provider.set_port_attribute(self.port, atom, raw)?;
        debug!("Wrote {} = {}", id, raw);

        self.drain(notify);
        Ok(SetOutcome::Submitted)
    }

    fn drain(&mut self, notify: &mut Notify<'_>) -> usize {
        let mut processed = 0;
        while let Some(event) = self.provider.poll_event() {
            processed += 1;
            if let XvEvent::PortNotify {
                port,
                attribute,
                value,
            } = event
            {
                if port == self.port {
                    self.handle_port_notify(attribute, value, notify);
                }
            }
        }
        processed
    }

    fn shutdown(&mut self) {
        if !self.subscribed {
            return;
        }
        self.subscribed = false;
        if let Err(e) = self.provider.select_port_notify(self.port, false) {
            debug!("Failed to deselect port notify: {}", e);
        }
    }
}

impl<P: PortAttributeProvider> Drop for XvBackend<P> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// First port, in adaptor order, exposing every catalog attribute
fn select_port<P: PortAttributeProvider>(provider: &mut P) -> Result<(PortId, Vec<PortAttributeInfo>)> {
    for adaptor in provider.adaptors()? {
        for port in adaptor.ports() {
            let attributes = match provider.port_attributes(port) {
                Ok(attributes) => attributes,
                Err(e) => {
                    debug!("Skipping port {} of {}: {}", port, adaptor.name, e);
                    continue;
                }
            };

            let complete = XV_CATALOG
                .property_names()
                .all(|name| attributes.iter().any(|a| a.name == name));
            if complete {
                debug!("Port {} of adaptor {} exposes all tvout attributes", port, adaptor.name);
                return Ok((port, attributes));
            }
        }
    }

    Err(TvoutError::TargetNotFound(
        "no XVideo port exposes every tvout attribute".to_string(),
    ))
}

fn resolve_attributes<P: PortAttributeProvider>(
    provider: &mut P,
    port: PortId,
    attributes: &[PortAttributeInfo],
) -> Result<StateCache> {
    let mut cache = StateCache::new();

    for desc in XV_CATALOG.iter() {
        let name = desc.name();
        let unresolved = || TvoutError::AttributeUnresolved {
            attribute: desc.id.to_string(),
            name: name.to_string(),
        };

        let info = attributes.iter().find(|a| a.name == name).ok_or_else(unresolved)?;
        let atom = provider.intern_atom(name)?.ok_or_else(unresolved)?;
        let mut metadata = validate_port_attribute(info)?;
        if desc.id == AttributeId::Enable {
            metadata = clamp_enable(name, metadata)?;
        }
        let raw = provider.get_port_attribute(port, atom)?;

        debug!("{} -> {} ({}), raw {}", desc.id, name, metadata, raw);
        cache.insert(desc.id, Handle::Symbol(atom), metadata, RawValue::from(raw));
    }

    Ok(cache)
}

/// Enable is boolean whatever range the port advertises
fn clamp_enable(name: &str, metadata: AttributeMetadata) -> Result<AttributeMetadata> {
    match metadata {
        AttributeMetadata::Range { low, high } if low <= enable::OFF && high >= enable::ON => {
            Ok(AttributeMetadata::Range {
                low: enable::OFF,
                high: enable::ON,
            })
        }
        other => Err(TvoutError::malformed_metadata(
            name,
            format!("{} cannot hold both off and on", other),
        )),
    }
}
