//! Control session
//!
//! Couples a backend with the client's change callback. This is the handle
//! a client holds between `init` and `teardown`.

use std::os::unix::io::RawFd;

use serde::Serialize;
use tracing::{debug, info};

use crate::backend::{AttributeBackend, RandrBackend, RandrOptions, XvBackend};
use crate::data::{AbstractValue, AttributeId, AttributeMetadata, BackendKind, EngineConfig, SetOutcome};
use crate::error::Result;
use crate::provider::{OutputPropertyProvider, PortAttributeProvider};

/// One attribute as the client sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeSnapshot {
    pub id: AttributeId,
    /// `None` when the provider holds a value outside the known list
    pub value: Option<AbstractValue>,
    pub metadata: AttributeMetadata,
}

pub struct ControlSession<'a> {
    backend: Box<dyn AttributeBackend + 'a>,
    notify: Box<dyn FnMut(AttributeId, AbstractValue) + 'a>,
}

impl<'a> ControlSession<'a> {
    pub fn new<B, F>(backend: B, notify: F) -> Self
    where
        B: AttributeBackend + 'a,
        F: FnMut(AttributeId, AbstractValue) + 'a,
    {
        Self::from_boxed(Box::new(backend), notify)
    }

    pub fn from_boxed<F>(backend: Box<dyn AttributeBackend + 'a>, notify: F) -> Self
    where
        F: FnMut(AttributeId, AbstractValue) + 'a,
    {
        info!(
            "{} session ready, descriptor {}",
            backend.kind(),
            backend.descriptor()
        );
        Self {
            backend,
            notify: Box::new(notify),
        }
    }

    /// Open an output-property session on the configured output
    pub fn init_randr<P, F>(provider: P, cfg: &EngineConfig, notify: F) -> Result<Self>
    where
        P: OutputPropertyProvider + 'a,
        F: FnMut(AttributeId, AbstractValue) + 'a,
    {
        let options = RandrOptions {
            output_name: cfg.output_name.clone(),
        };
        let backend = RandrBackend::init(provider, &options)?;
        Ok(Self::new(backend, notify))
    }

    /// Open a port-attribute session
    pub fn init_xv<P, F>(provider: P, notify: F) -> Result<Self>
    where
        P: PortAttributeProvider + 'a,
        F: FnMut(AttributeId, AbstractValue) + 'a,
    {
        let backend = XvBackend::init(provider)?;
        Ok(Self::new(backend, notify))
    }

    pub fn kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// Descriptor the caller's event loop should watch
    pub fn descriptor(&self) -> RawFd {
        self.backend.descriptor()
    }

    /// Call when the descriptor is readable. Returns the number of events read.
    pub fn on_readable(&mut self) -> usize {
        let processed = self.backend.drain(&mut *self.notify);
        if processed > 0 {
            debug!("Processed {} events", processed);
        }
        processed
    }

    pub fn set(&mut self, id: AttributeId, value: AbstractValue) -> Result<SetOutcome> {
        self.backend.set(id, value, &mut *self.notify)
    }

    pub fn get(&self, id: AttributeId) -> Option<AbstractValue> {
        self.backend.get(id)
    }

    pub fn supports(&self, id: AttributeId) -> bool {
        self.backend.supports(id)
    }

    pub fn metadata(&self, id: AttributeId) -> Option<&AttributeMetadata> {
        self.backend.metadata(id)
    }

    /// Every supported attribute in catalog order
    pub fn snapshot(&self) -> Vec<AttributeSnapshot> {
        AttributeId::ALL
            .iter()
            .filter_map(|&id| {
                self.backend.metadata(id).map(|metadata| AttributeSnapshot {
                    id,
                    value: self.backend.get(id),
                    metadata: metadata.clone(),
                })
            })
            .collect()
    }

    /// Unsubscribe and release the session
    pub fn teardown(mut self) {
        info!("Tearing down {} session", self.backend.kind());
        self.backend.shutdown();
    }
}
