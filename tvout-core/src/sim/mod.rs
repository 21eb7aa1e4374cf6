//! Simulated display servers
//!
//! In-memory implementations of both provider traits, used by the command
//! line front end and by the tests. Each models the defects of the real
//! driver it stands in for.

pub mod randr;
pub mod xv;

pub use randr::{RandrServer, SimRandr};
pub use xv::{SimXv, XvServer};

use tracing::debug;

use crate::backend::{AttributeBackend, RandrBackend, RandrOptions, XvBackend};
use crate::catalog::{Binding, RANDR_CATALOG, XV_CATALOG};
use crate::constants;
use crate::data::{AbstractValue, AttributeId, BackendKind, EngineConfig};
use crate::error::{Result, TvoutError};

/// Server-side handle for changing state behind a session's back
pub trait SimulatedServer {
    /// Change `id` as another client would, queueing the notification.
    ///
    /// Enumerated attributes take an index into the driver's own value list.
    fn inject(&self, id: AttributeId, value: AbstractValue) -> Result<()>;

    /// Number of write requests received so far
    fn writes(&self) -> usize;
}

impl SimulatedServer for SimRandr {
    fn inject(&self, id: AttributeId, value: AbstractValue) -> Result<()> {
        let desc = RANDR_CATALOG
            .get(id)
            .ok_or_else(|| TvoutError::UnsupportedAttribute(id.to_string()))?;
        let (output, crtc) = {
            let server = self.server();
            let tv = server
                .outputs
                .iter()
                .find(|o| o.info.name == constants::randr::DEFAULT_OUTPUT_NAME)
                .ok_or_else(|| TvoutError::TargetNotFound("simulated TV output".to_string()))?;
            (tv.info.id, tv.info.crtcs.first().copied())
        };

        match desc.binding {
            Binding::Pipeline => {
                let crtc = if value != 0 { crtc } else { None };
                self.external_output_change(output, crtc)
            }
            Binding::Property(name) => {
                let raw = {
                    let mut server = self.server();
                    let property = server
                        .property_mut(output, name)
                        .ok_or_else(|| TvoutError::provider("ChangeOutputProperty", name))?;
                    if property.accepted.is_empty() {
                        i64::from(value)
                    } else {
                        let len = property.accepted.len();
                        usize::try_from(value)
                            .ok()
                            .and_then(|index| property.accepted.get(index).copied())
                            .ok_or_else(|| TvoutError::InvalidIndex {
                                attribute: id.to_string(),
                                index: i64::from(value),
                                len,
                            })?
                    }
                };
                debug!("Injecting external {} = {} (raw {})", id, value, raw);
                self.external_property_change(output, name, raw)
            }
        }
    }

    fn writes(&self) -> usize {
        let server = self.server();
        server.property_writes + server.crtc_writes
    }
}

impl SimulatedServer for SimXv {
    fn inject(&self, id: AttributeId, value: AbstractValue) -> Result<()> {
        let desc = XV_CATALOG
            .get(id)
            .ok_or_else(|| TvoutError::UnsupportedAttribute(id.to_string()))?;
        let port = self
            .first_port_with(desc.name())
            .ok_or_else(|| TvoutError::TargetNotFound(format!("port with {}", desc.name())))?;
        debug!("Injecting external {} = {} on port {}", id, value, port);
        self.external_change(port, desc.name(), value)
    }

    fn writes(&self) -> usize {
        self.server().writes
    }
}

/// Build the configured backend over a default simulated device
pub fn start(cfg: &EngineConfig) -> Result<(Box<dyn AttributeBackend>, Box<dyn SimulatedServer>)> {
    match cfg.backend {
        BackendKind::Randr => {
            let sim = SimRandr::new(RandrServer::tv_out(cfg.descriptor));
            let options = RandrOptions {
                output_name: cfg.output_name.clone(),
            };
            let backend = RandrBackend::init(sim.clone(), &options)?;
            Ok((Box::new(backend), Box::new(sim)))
        }
        BackendKind::Xv => {
            let sim = SimXv::new(XvServer::omap(cfg.descriptor));
            let backend = XvBackend::init(sim.clone())?;
            Ok((Box::new(backend), Box::new(sim)))
        }
    }
}
