//! Simulated output-property server
//!
//! Reproduces the behaviour of the OMAP TV-out driver: the enumerated
//! properties are advertised without their value lists, writes of invalid
//! values are dropped silently, and accepted writes queue a property
//! notification that carries no value.

use std::cell::{RefCell, RefMut};
use std::collections::VecDeque;
use std::os::unix::io::RawFd;
use std::rc::Rc;

use crate::constants::{config, randr, wire};
use crate::error::{Result, TvoutError};
use crate::provider::{
    Atom, CrtcId, ModeId, OutputId, OutputInfo, OutputPropertyProvider, PropertyInfo,
    PropertyReply, PropertyState, PropertyType, RandrEvent,
};

pub const LCD_OUTPUT: OutputId = 0x41;
pub const TV_OUTPUT: OutputId = 0x42;
pub const LCD_CRTC: CrtcId = 0x51;
pub const TV_CRTC: CrtcId = 0x52;
pub const LCD_MODE: ModeId = 0x61;
pub const TV_PAL_MODE: ModeId = 0x62;
pub const TV_NTSC_MODE: ModeId = 0x63;

#[derive(Debug, Clone)]
pub struct SimProperty {
    pub atom: Atom,
    pub property_type: PropertyType,
    pub format: u8,
    pub items: Vec<i64>,
    /// What the description query reports
    pub info: PropertyInfo,
    /// Values the driver accepts when `info` carries no list
    pub accepted: Vec<i64>,
}

impl SimProperty {
    fn accepts(&self, value: i64) -> bool {
        if self.info.range {
            match self.info.values.as_slice() {
                [low, high] => (*low..=*high).contains(&value),
                _ => false,
            }
        } else if self.info.values.is_empty() {
            self.accepted.contains(&value)
        } else {
            self.info.values.contains(&value)
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimOutput {
    pub info: OutputInfo,
    pub properties: Vec<SimProperty>,
}

/// Complete server-side state, open for tests to poke at
#[derive(Debug)]
pub struct RandrServer {
    pub descriptor: RawFd,
    /// `None` means the extension is absent
    pub version: Option<(u32, u32)>,
    atoms: Vec<String>,
    pub outputs: Vec<SimOutput>,
    pub events_selected: bool,
    pub queue: VecDeque<RandrEvent>,
    pub property_writes: usize,
    pub crtc_writes: usize,
    /// Make every property read fail
    pub fail_property_reads: bool,
}

impl RandrServer {
    pub fn new(descriptor: RawFd) -> Self {
        Self {
            descriptor,
            version: Some((1, 3)),
            atoms: Vec::new(),
            outputs: Vec::new(),
            events_selected: false,
            queue: VecDeque::new(),
            property_writes: 0,
            crtc_writes: 0,
            fail_property_reads: false,
        }
    }

    /// Intern a symbol, creating it if needed
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

    pub fn output_mut(&mut self, output: OutputId) -> Option<&mut SimOutput> {
        self.outputs.iter_mut().find(|o| o.info.id == output)
    }

    pub fn property_mut(&mut self, output: OutputId, name: &str) -> Option<&mut SimProperty> {
        let atom = self.lookup(name)?;
        self.output_mut(output)?
            .properties
            .iter_mut()
            .find(|p| p.atom == atom)
    }

    fn property(&self, output: OutputId, atom: Atom) -> Result<&SimProperty> {
        self.outputs
            .iter()
            .find(|o| o.info.id == output)
            .ok_or_else(|| TvoutError::provider("GetOutputProperty", "BadRROutput"))?
            .properties
            .iter()
            .find(|p| p.atom == atom)
            .ok_or_else(|| TvoutError::provider("GetOutputProperty", "BadAtom"))
    }

    /// Add an integer range property
    pub fn add_range_property(&mut self, output: OutputId, name: &str, low: i64, high: i64, value: i64) {
        let atom = self.intern(name);
        if let Some(o) = self.output_mut(output) {
            o.properties.push(SimProperty {
                atom,
                property_type: PropertyType::Integer,
                format: wire::VALUE_FORMAT,
                items: vec![value],
                info: PropertyInfo {
                    range: true,
                    values: vec![low, high],
                },
                accepted: Vec::new(),
            });
        }
    }

    /// Add an atom-valued property whose description omits the value list
    pub fn add_unlisted_enum_property(&mut self, output: OutputId, name: &str, symbols: &[&str], current: usize) {
        let atom = self.intern(name);
        let accepted: Vec<i64> = symbols.iter().map(|s| i64::from(self.intern(s))).collect();
        let value = accepted.get(current).copied().unwrap_or(i64::from(wire::NONE));
        if let Some(o) = self.output_mut(output) {
            o.properties.push(SimProperty {
                atom,
                property_type: PropertyType::Atom,
                format: wire::VALUE_FORMAT,
                items: vec![value],
                info: PropertyInfo::default(),
                accepted,
            });
        }
    }

    fn queue_event(&mut self, event: RandrEvent) {
        if self.events_selected {
            self.queue.push_back(event);
        }
    }

    /// The default device: an LCD in use and a disconnected TV output
    pub fn tv_out(descriptor: RawFd) -> Self {
        use randr::symbols::*;

        let mut server = Self::new(descriptor);
        server.outputs.push(SimOutput {
            info: OutputInfo {
                id: LCD_OUTPUT,
                name: "LCD".to_string(),
                crtc: Some(LCD_CRTC),
                crtcs: vec![LCD_CRTC],
                modes: vec![LCD_MODE],
            },
            properties: Vec::new(),
        });
        server.outputs.push(SimOutput {
            info: OutputInfo {
                id: TV_OUTPUT,
                name: randr::DEFAULT_OUTPUT_NAME.to_string(),
                crtc: None,
                crtcs: vec![TV_CRTC],
                modes: vec![TV_PAL_MODE, TV_NTSC_MODE],
            },
            properties: Vec::new(),
        });

        server.add_range_property(LCD_OUTPUT, "Backlight", 0, 255, 200);

        let edid = server.intern("EDID");
        if let Some(tv) = server.output_mut(TV_OUTPUT) {
            tv.properties.push(SimProperty {
                atom: edid,
                property_type: PropertyType::Integer,
                format: 8,
                items: vec![0, 255, 255, 255],
                info: PropertyInfo::default(),
                accepted: Vec::new(),
            });
        }
        server.add_unlisted_enum_property(TV_OUTPUT, randr::SIGNAL_FORMAT, &[COMPOSITE_PAL, COMPOSITE_NTSC], 0);
        server.add_unlisted_enum_property(TV_OUTPUT, randr::SIGNAL_PROPERTIES, &[PAL, NTSC], 0);
        server.add_unlisted_enum_property(TV_OUTPUT, randr::TV_ASPECT_RATIO, &[ASPECT_4_3, ASPECT_16_9], 0);
        server.add_range_property(TV_OUTPUT, randr::TV_SCALE, 1, 100, 50);
        server.add_range_property(TV_OUTPUT, randr::TV_DYNAMIC_ASPECT_RATIO, 0, 1, 0);
        server.add_range_property(TV_OUTPUT, randr::TV_X_OFFSET, -32, 32, 0);
        server.add_range_property(TV_OUTPUT, randr::TV_Y_OFFSET, -32, 32, 0);
        server.add_range_property(TV_OUTPUT, randr::XV_CLONE_FULLSCREEN, 0, 1, 0);
        server
    }
}

/// Provider handle onto a shared simulated server.
///
/// Cloning yields another handle onto the same server, so a test can keep
/// one while a backend owns the other.
#[derive(Debug, Clone)]
pub struct SimRandr {
    server: Rc<RefCell<RandrServer>>,
}

impl SimRandr {
    pub fn new(server: RandrServer) -> Self {
        Self {
            server: Rc::new(RefCell::new(server)),
        }
    }

    pub fn tv_out() -> Self {
        Self::new(RandrServer::tv_out(config::DEFAULT_SIM_DESCRIPTOR))
    }

    pub fn server(&self) -> RefMut<'_, RandrServer> {
        self.server.borrow_mut()
    }

    pub fn atom(&self, name: &str) -> Option<Atom> {
        self.server.borrow().lookup(name)
    }

    /// Change a property behind the client's back and announce it
    pub fn external_property_change(&self, output: OutputId, name: &str, value: i64) -> Result<()> {
        let mut server = self.server();
        let property = server
            .property_mut(output, name)
            .ok_or_else(|| TvoutError::provider("ChangeOutputProperty", format!("no property {}", name)))?;
        property.items = vec![value];
        let atom = property.atom;
        server.queue_event(RandrEvent::OutputProperty {
            output,
            property: atom,
            state: PropertyState::NewValue,
        });
        Ok(())
    }

    /// Connect or disconnect an output behind the client's back
    pub fn external_output_change(&self, output: OutputId, crtc: Option<CrtcId>) -> Result<()> {
        let mut server = self.server();
        let o = server
            .output_mut(output)
            .ok_or_else(|| TvoutError::provider("SetCrtcConfig", "BadRROutput"))?;
        o.info.crtc = crtc;
        server.queue_event(RandrEvent::OutputChange { output, crtc });
        Ok(())
    }

    /// Queue an arbitrary event, even if no events are selected
    pub fn push_event(&self, event: RandrEvent) {
        self.server().queue.push_back(event);
    }

    pub fn property_value(&self, output: OutputId, name: &str) -> Option<i64> {
        let mut server = self.server();
        let value = server
            .property_mut(output, name)
            .and_then(|p| p.items.first().copied());
        value
    }
}

impl OutputPropertyProvider for SimRandr {
    fn connection_fd(&self) -> RawFd {
        self.server.borrow().descriptor
    }

    fn query_version(&mut self) -> Result<(u32, u32)> {
        self.server
            .borrow()
            .version
            .ok_or_else(|| TvoutError::provider("RRQueryVersion", "extension not present"))
    }

    fn select_output_events(&mut self, enabled: bool) -> Result<()> {
        self.server().events_selected = enabled;
        Ok(())
    }

    fn outputs(&mut self) -> Result<Vec<OutputInfo>> {
        Ok(self.server.borrow().outputs.iter().map(|o| o.info.clone()).collect())
    }

    fn list_output_properties(&mut self, output: OutputId) -> Result<Vec<Atom>> {
        let server = self.server.borrow();
        let o = server
            .outputs
            .iter()
            .find(|o| o.info.id == output)
            .ok_or_else(|| TvoutError::provider("ListOutputProperties", "BadRROutput"))?;
        Ok(o.properties.iter().map(|p| p.atom).collect())
    }

    fn atom_name(&mut self, atom: Atom) -> Result<String> {
        self.server
            .borrow()
            .name_of(atom)
            .map(str::to_string)
            .ok_or_else(|| TvoutError::provider("GetAtomName", "BadAtom"))
    }

    fn intern_atom(&mut self, name: &str) -> Result<Option<Atom>> {
        Ok(self.server.borrow().lookup(name))
    }

    fn get_output_property(
        &mut self,
        output: OutputId,
        property: Atom,
        _expected: PropertyType,
    ) -> Result<PropertyReply> {
        let server = self.server.borrow();
        if server.fail_property_reads {
            return Err(TvoutError::provider("GetOutputProperty", "BadImplementation"));
        }
        let p = server.property(output, property)?;
        Ok(PropertyReply {
            property_type: p.property_type,
            format: p.format,
            items: p.items.clone(),
        })
    }

    fn query_output_property(&mut self, output: OutputId, property: Atom) -> Result<PropertyInfo> {
        let server = self.server.borrow();
        let info = server.property(output, property)?.info.clone();
        Ok(info)
    }

    fn change_output_property(
        &mut self,
        output: OutputId,
        property: Atom,
        property_type: PropertyType,
        value: i64,
    ) -> Result<()> {
        let mut server = self.server();
        server.property_writes += 1;

        let p = server
            .output_mut(output)
            .ok_or_else(|| TvoutError::provider("ChangeOutputProperty", "BadRROutput"))?
            .properties
            .iter_mut()
            .find(|p| p.atom == property)
            .ok_or_else(|| TvoutError::provider("ChangeOutputProperty", "BadAtom"))?;

        // The driver drops bad values without an error
        if p.property_type != property_type || !p.accepts(value) {
            return Ok(());
        }
        p.items = vec![value];

        server.queue_event(RandrEvent::OutputProperty {
            output,
            property,
            state: PropertyState::NewValue,
        });
        Ok(())
    }

    fn set_crtc_config(&mut self, crtc: CrtcId, mode: Option<ModeId>, outputs: &[OutputId]) -> Result<()> {
        let mut server = self.server();
        server.crtc_writes += 1;

        let mut changed = Vec::new();
        for o in server.outputs.iter_mut() {
            let bound = mode.is_some() && outputs.contains(&o.info.id);
            if bound {
                if !o.info.crtcs.contains(&crtc) {
                    return Err(TvoutError::provider("SetCrtcConfig", "BadMatch"));
                }
                if o.info.crtc != Some(crtc) {
                    o.info.crtc = Some(crtc);
                    changed.push((o.info.id, Some(crtc)));
                }
            } else if o.info.crtc == Some(crtc) {
                o.info.crtc = None;
                changed.push((o.info.id, None));
            }
        }

        for (output, crtc) in changed {
            server.queue_event(RandrEvent::OutputChange { output, crtc });
        }
        Ok(())
    }

    fn poll_event(&mut self) -> Option<RandrEvent> {
        self.server().queue.pop_front()
    }
}
