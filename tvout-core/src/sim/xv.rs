//! Simulated port-attribute server
//!
//! Reproduces the OMAP video overlay: out-of-range writes are refused but
//! still announced through a port notification echoing the requested value.

use std::cell::{RefCell, RefMut};
use std::collections::VecDeque;
use std::os::unix::io::RawFd;
use std::rc::Rc;

use crate::constants::{config, xv};
use crate::error::{Result, TvoutError};
use crate::provider::{AdaptorInfo, Atom, PortAttributeInfo, PortAttributeProvider, PortId, XvEvent};

pub const TEXTURED_BASE: PortId = 20;
pub const OVERLAY_BASE: PortId = 30;

#[derive(Debug, Clone)]
pub struct SimPortAttribute {
    pub info: PortAttributeInfo,
    pub value: i32,
}

#[derive(Debug, Clone)]
pub struct SimPort {
    pub id: PortId,
    pub attributes: Vec<SimPortAttribute>,
}

#[derive(Debug)]
pub struct XvServer {
    pub descriptor: RawFd,
    /// `None` means the extension is absent
    pub version: Option<(u32, u32)>,
    atoms: Vec<String>,
    pub adaptors: Vec<AdaptorInfo>,
    pub ports: Vec<SimPort>,
    /// Ports with notifications selected
    pub selected: Vec<PortId>,
    pub queue: VecDeque<XvEvent>,
    pub writes: usize,
    /// Make every attribute read fail
    pub fail_reads: bool,
}

fn attribute(name: &str, min_value: i32, max_value: i32, value: i32) -> SimPortAttribute {
    SimPortAttribute {
        info: PortAttributeInfo {
            name: name.to_string(),
            min_value,
            max_value,
            gettable: true,
            settable: true,
        },
        value,
    }
}

impl XvServer {
    pub fn new(descriptor: RawFd) -> Self {
        Self {
            descriptor,
            version: Some((2, 2)),
            atoms: Vec::new(),
            adaptors: Vec::new(),
            ports: Vec::new(),
            selected: Vec::new(),
            queue: VecDeque::new(),
            writes: 0,
            fail_reads: false,
        }
    }

    pub fn intern(&mut self, name: &str) -> Atom {
        match self.lookup(name) {
            Some(atom) => atom,
            None => {
                self.atoms.push(name.to_string());
                self.atoms.len() as Atom
            }
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Atom> {
        self.atoms
            .iter()
            .position(|a| a == name)
            .map(|i| (i + 1) as Atom)
    }

    fn name_of(&self, atom: Atom) -> Option<&str> {
        let index = usize::try_from(atom).ok()?.checked_sub(1)?;
        self.atoms.get(index).map(String::as_str)
    }

    /// Register an adaptor whose ports all carry `attributes`
    pub fn add_adaptor(&mut self, name: &str, base_id: PortId, num_ports: u32, attributes: &[SimPortAttribute]) {
        for attr in attributes {
            self.intern(&attr.info.name);
        }
        self.adaptors.push(AdaptorInfo {
            name: name.to_string(),
            base_id,
            num_ports,
        });
        for id in base_id..base_id + num_ports {
            self.ports.push(SimPort {
                id,
                attributes: attributes.to_vec(),
            });
        }
    }

    pub fn port_mut(&mut self, port: PortId) -> Option<&mut SimPort> {
        self.ports.iter_mut().find(|p| p.id == port)
    }

    fn attribute_mut(&mut self, port: PortId, atom: Atom, request: &str) -> Result<&mut SimPortAttribute> {
        let name = self
            .name_of(atom)
            .ok_or_else(|| TvoutError::provider(request, "BadAtom"))?
            .to_string();
        self.port_mut(port)
            .ok_or_else(|| TvoutError::provider(request, "XvBadPort"))?
            .attributes
            .iter_mut()
            .find(|a| a.info.name == name)
            .ok_or_else(|| TvoutError::provider(request, "BadMatch"))
    }

    fn announce(&mut self, port: PortId, attribute: Atom, value: i32) {
        if self.selected.contains(&port) {
            self.queue.push_back(XvEvent::PortNotify {
                port,
                attribute,
                value,
            });
        }
    }

    /// The default device: a textured adaptor without tvout support
    /// followed by a two-port overlay adaptor carrying it
    pub fn omap(descriptor: RawFd) -> Self {
        let mut server = Self::new(descriptor);
        server.add_adaptor(
            "Textured Video",
            TEXTURED_BASE,
            1,
            &[attribute("XV_BRIGHTNESS", -1000, 1000, 0)],
        );
        server.add_adaptor(
            "OMAP Video Overlay",
            OVERLAY_BASE,
            2,
            &[
                attribute("XV_COLORKEY", 0, 0xff_ffff, 0x0101),
                attribute(xv::CLONE_TO_TVOUT, 0, 1, 0),
                attribute(xv::TVOUT_STANDARD, 0, 1, 0),
                attribute(xv::TVOUT_WIDESCREEN, 0, 1, 0),
                attribute(xv::TVOUT_SCALE, 1, 100, 50),
            ],
        );
        server
    }
}

/// Provider handle onto a shared simulated server
#[derive(Debug, Clone)]
pub struct SimXv {
    server: Rc<RefCell<XvServer>>,
}

impl SimXv {
    pub fn new(server: XvServer) -> Self {
        Self {
            server: Rc::new(RefCell::new(server)),
        }
    }

    pub fn omap() -> Self {
        Self::new(XvServer::omap(config::DEFAULT_SIM_DESCRIPTOR))
    }

    pub fn server(&self) -> RefMut<'_, XvServer> {
        self.server.borrow_mut()
    }

    pub fn atom(&self, name: &str) -> Option<Atom> {
        self.server.borrow().lookup(name)
    }

    /// Change an attribute behind the client's back and announce it
    pub fn external_change(&self, port: PortId, name: &str, value: i32) -> Result<()> {
        let mut server = self.server();
        let atom = server
            .lookup(name)
            .ok_or_else(|| TvoutError::provider("SetPortAttribute", format!("no attribute {}", name)))?;
        server.attribute_mut(port, atom, "SetPortAttribute")?.value = value;
        server.announce(port, atom, value);
        Ok(())
    }

    /// Lowest-numbered port carrying an attribute called `name`
    pub fn first_port_with(&self, name: &str) -> Option<PortId> {
        self.server
            .borrow()
            .ports
            .iter()
            .find(|p| p.attributes.iter().any(|a| a.info.name == name))
            .map(|p| p.id)
    }

    /// Queue an arbitrary event, even for unselected ports
    pub fn push_event(&self, event: XvEvent) {
        self.server().queue.push_back(event);
    }

    pub fn value(&self, port: PortId, name: &str) -> Option<i32> {
        let mut server = self.server();
        let atom = server.lookup(name)?;
        let value = server
            .attribute_mut(port, atom, "GetPortAttribute")
            .ok()
            .map(|a| a.value);
        value
    }
}

impl PortAttributeProvider for SimXv {
    fn connection_fd(&self) -> RawFd {
        self.server.borrow().descriptor
    }

    fn query_extension(&mut self) -> Result<(u32, u32)> {
        self.server
            .borrow()
            .version
            .ok_or_else(|| TvoutError::provider("XvQueryExtension", "extension not present"))
    }

    fn adaptors(&mut self) -> Result<Vec<AdaptorInfo>> {
        Ok(self.server.borrow().adaptors.clone())
    }

    fn port_attributes(&mut self, port: PortId) -> Result<Vec<PortAttributeInfo>> {
        let server = self.server.borrow();
        let p = server
            .ports
            .iter()
            .find(|p| p.id == port)
            .ok_or_else(|| TvoutError::provider("XvQueryPortAttributes", "XvBadPort"))?;
        Ok(p.attributes.iter().map(|a| a.info.clone()).collect())
    }

    fn intern_atom(&mut self, name: &str) -> Result<Option<Atom>> {
        Ok(self.server.borrow().lookup(name))
    }

    fn select_port_notify(&mut self, port: PortId, enabled: bool) -> Result<()> {
        let mut server = self.server();
        server.selected.retain(|p| *p != port);
        if enabled {
            server.selected.push(port);
        }
        Ok(())
    }

    fn get_port_attribute(&mut self, port: PortId, attribute: Atom) -> Result<i32> {
        let mut server = self.server();
        if server.fail_reads {
            return Err(TvoutError::provider("XvGetPortAttribute", "BadImplementation"));
        }
        let value = server.attribute_mut(port, attribute, "XvGetPortAttribute")?.value;
        Ok(value)
    }

    fn set_port_attribute(&mut self, port: PortId, attribute: Atom, value: i32) -> Result<()> {
        let mut server = self.server();
        server.writes += 1;
        let attr = server.attribute_mut(port, attribute, "XvSetPortAttribute")?;
        if (attr.info.min_value..=attr.info.max_value).contains(&value) {
            attr.value = value;
        }
        // Announced whether or not the value was accepted
        server.announce(port, attribute, value);
        Ok(())
    }

    fn poll_event(&mut self) -> Option<XvEvent> {
        self.server().queue.pop_front()
    }
}
