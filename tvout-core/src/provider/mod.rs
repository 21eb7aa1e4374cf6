//! Provider-facing interfaces
//!
//! The display-server connection is an external collaborator. These traits
//! describe the capabilities the engine needs from it:
//! - `OutputPropertyProvider`: outputs with named, typed properties (RandR style)
//! - `PortAttributeProvider`: video adaptor ports with integer attributes (Xv style)

pub mod randr;
pub mod xv;

pub use randr::{
    CrtcId, ModeId, OutputId, OutputInfo, OutputPropertyProvider, PropertyInfo, PropertyReply,
    PropertyState, PropertyType, RandrEvent,
};
pub use xv::{AdaptorInfo, PortAttributeInfo, PortAttributeProvider, PortId, XvEvent};

#[cfg(test)]
pub use randr::MockOutputPropertyProvider;
#[cfg(test)]
pub use xv::MockPortAttributeProvider;

/// Interned symbol identifier (atom)
pub type Atom = u32;
