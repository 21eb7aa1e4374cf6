//! Port-attribute provider interface
//!
//! Models a video extension exposing adaptors, each with a contiguous block
//! of ports carrying named integer attributes.

use std::os::unix::io::RawFd;

use super::Atom;
use crate::error::Result;

pub type PortId = u32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdaptorInfo {
    pub name: String,
    pub base_id: PortId,
    pub num_ports: u32,
}

impl AdaptorInfo {
    pub fn ports(&self) -> impl Iterator<Item = PortId> {
        self.base_id..self.base_id.saturating_add(self.num_ports)
    }
}

/// Attribute description as reported for a port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortAttributeInfo {
    pub name: String,
    pub min_value: i32,
    pub max_value: i32,
    pub gettable: bool,
    pub settable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XvEvent {
    /// A port attribute changed. `value` is what the server claims, which
    /// may be a rejected request echoed back.
    PortNotify {
        port: PortId,
        attribute: Atom,
        value: i32,
    },
    /// Any event not belonging to the extension
    Unrelated { code: u8 },
}

/// Requests the port-attribute backend issues on the provider connection
#[cfg_attr(test, mockall::automock)]
pub trait PortAttributeProvider {
    fn connection_fd(&self) -> RawFd;

    /// Extension version; fails if the extension is not present
    fn query_extension(&mut self) -> Result<(u32, u32)>;

    fn adaptors(&mut self) -> Result<Vec<AdaptorInfo>>;

    fn port_attributes(&mut self, port: PortId) -> Result<Vec<PortAttributeInfo>>;

    /// Look up an existing symbol; never creates one
    fn intern_atom(&mut self, name: &str) -> Result<Option<Atom>>;

    fn select_port_notify(&mut self, port: PortId, enabled: bool) -> Result<()>;

    fn get_port_attribute(&mut self, port: PortId, attribute: Atom) -> Result<i32>;

    fn set_port_attribute(&mut self, port: PortId, attribute: Atom, value: i32) -> Result<()>;

    /// Next queued event, without blocking
    fn poll_event(&mut self) -> Option<XvEvent>;
}
