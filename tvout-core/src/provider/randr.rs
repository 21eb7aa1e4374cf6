//! Output-property provider interface
//!
//! Models a display-server extension that exposes outputs driven by CRTCs,
//! each output carrying named properties with typed 32-bit values.

use std::os::unix::io::RawFd;

use super::Atom;
use crate::error::Result;

pub type OutputId = u32;
pub type CrtcId = u32;
pub type ModeId = u32;

/// Declared type of a property value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyType {
    Integer,
    Atom,
    Other(Atom),
}

/// Reply to a property read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyReply {
    pub property_type: PropertyType,
    /// Bits per item
    pub format: u8,
    pub items: Vec<i64>,
}

/// Reply to a property description query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyInfo {
    /// `values` holds {low, high} when set, otherwise the valid values
    pub range: bool,
    pub values: Vec<i64>,
}

/// An output as enumerated from the screen resources
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputInfo {
    pub id: OutputId,
    pub name: String,
    /// CRTC currently driving the output
    pub crtc: Option<CrtcId>,
    /// CRTCs able to drive the output
    pub crtcs: Vec<CrtcId>,
    pub modes: Vec<ModeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyState {
    NewValue,
    Deleted,
}

/// Events delivered on the provider connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RandrEvent {
    /// An output was connected to or disconnected from a CRTC
    OutputChange {
        output: OutputId,
        crtc: Option<CrtcId>,
    },
    /// A property of an output changed; the new value is not included
    OutputProperty {
        output: OutputId,
        property: Atom,
        state: PropertyState,
    },
    /// Extension notify with a subtype this engine does not handle
    OtherNotify { subtype: u8 },
    /// Any event not belonging to the extension
    Unrelated { code: u8 },
}

/// Requests the output-property backend issues on the provider connection
#[cfg_attr(test, mockall::automock)]
pub trait OutputPropertyProvider {
    /// Descriptor of the underlying connection, for the caller's poll loop
    fn connection_fd(&self) -> RawFd;

    /// Extension version; fails if the extension is not present
    fn query_version(&mut self) -> Result<(u32, u32)>;

    /// Subscribe to (or unsubscribe from) output-change and output-property events
    fn select_output_events(&mut self, enabled: bool) -> Result<()>;

    fn outputs(&mut self) -> Result<Vec<OutputInfo>>;

    fn list_output_properties(&mut self, output: OutputId) -> Result<Vec<Atom>>;

    fn atom_name(&mut self, atom: Atom) -> Result<String>;

    /// Look up an existing symbol; never creates one
    fn intern_atom(&mut self, name: &str) -> Result<Option<Atom>>;

    fn get_output_property(
        &mut self,
        output: OutputId,
        property: Atom,
        expected: PropertyType,
    ) -> Result<PropertyReply>;

    fn query_output_property(&mut self, output: OutputId, property: Atom) -> Result<PropertyInfo>;

    /// Replace a property with a single 32-bit value
    fn change_output_property(
        &mut self,
        output: OutputId,
        property: Atom,
        property_type: PropertyType,
        value: i64,
    ) -> Result<()>;

    /// Bind `outputs` to `crtc` with `mode`, or release the CRTC when `mode` is `None`
    fn set_crtc_config(
        &mut self,
        crtc: CrtcId,
        mode: Option<ModeId>,
        outputs: &[OutputId],
    ) -> Result<()>;

    /// Next queued event, without blocking
    fn poll_event(&mut self) -> Option<RandrEvent>;
}
