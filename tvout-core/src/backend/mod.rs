//! Attribute backends
//!
//! Provides the two interchangeable implementations of the control contract:
//! - `randr`: output properties, Enable through CRTC binding
//! - `xv`: video port attributes, with untrusted change notifications

pub mod randr;
pub mod xv;

pub use randr::{RandrBackend, RandrOptions};
pub use xv::XvBackend;

use std::os::unix::io::RawFd;

use crate::data::{AbstractValue, AttributeId, AttributeMetadata, BackendKind, SetOutcome};
use crate::engine::{Notify, StateCache};
use crate::error::Result;

/// Contract shared by both provider protocols.
///
/// Nothing here locks or blocks on events: the caller polls `descriptor()`
/// and calls `drain` when it becomes readable. Calls must be serialized by
/// the owner.
pub trait AttributeBackend {
    fn kind(&self) -> BackendKind;

    /// Connection descriptor to watch for readability
    fn descriptor(&self) -> RawFd;

    fn cache(&self) -> &StateCache;

    /// Cached abstract value; `None` for unsupported or untranslatable attributes
    fn get(&self, id: AttributeId) -> Option<AbstractValue> {
        self.cache().value(id)
    }

    fn supports(&self, id: AttributeId) -> bool {
        self.cache().contains(id)
    }

    fn metadata(&self, id: AttributeId) -> Option<&AttributeMetadata> {
        self.cache().metadata(id)
    }

    /// Validate and issue a write, then drain so the cache reflects the
    /// provider's answer before returning
    fn set(&mut self, id: AttributeId, value: AbstractValue, notify: &mut Notify<'_>) -> Result<SetOutcome>;

    /// Process every queued event; returns how many were read
    fn drain(&mut self, notify: &mut Notify<'_>) -> usize;

    /// Unsubscribe from provider events. Idempotent.
    fn shutdown(&mut self);
}
