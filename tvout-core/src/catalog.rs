//! Attribute catalogs
//!
//! Immutable tables mapping each `AttributeId` a backend supports to the
//! provider-side identifier and the expected value kind.

use crate::constants::{randr, xv};
use crate::data::{AttributeId, ValueKind};

/// How an attribute is reached on the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// A named property or port attribute
    Property(&'static str),
    /// Binding the output to its display pipeline (CRTC + mode)
    Pipeline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeDescriptor {
    pub id: AttributeId,
    pub binding: Binding,
    pub kind: ValueKind,
}

impl AttributeDescriptor {
    const fn property(id: AttributeId, name: &'static str, kind: ValueKind) -> Self {
        Self {
            id,
            binding: Binding::Property(name),
            kind,
        }
    }

    /// Provider-facing name, used for matching and in error messages
    pub fn name(&self) -> &'static str {
        match self.binding {
            Binding::Property(name) => name,
            Binding::Pipeline => "crtc",
        }
    }
}

#[derive(Debug)]
pub struct Catalog {
    backend: &'static str,
    entries: &'static [AttributeDescriptor],
}

impl Catalog {
    pub fn backend(&self) -> &'static str {
        self.backend
    }

    pub fn get(&self, id: AttributeId) -> Option<&AttributeDescriptor> {
        self.entries.iter().find(|d| d.id == id)
    }

    /// Descriptor bound to the property called `name`
    pub fn by_name(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.entries
            .iter()
            .find(|d| matches!(d.binding, Binding::Property(n) if n == name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttributeDescriptor> {
        self.entries.iter()
    }

    /// Names of every property-bound entry
    pub fn property_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().filter_map(|d| match d.binding {
            Binding::Property(name) => Some(name),
            Binding::Pipeline => None,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

static RANDR_ENTRIES: [AttributeDescriptor; 8] = [
    AttributeDescriptor {
        id: AttributeId::Enable,
        binding: Binding::Pipeline,
        kind: ValueKind::Range,
    },
    AttributeDescriptor::property(AttributeId::TvStandard, randr::SIGNAL_PROPERTIES, ValueKind::Enum),
    AttributeDescriptor::property(AttributeId::Aspect, randr::TV_ASPECT_RATIO, ValueKind::Enum),
    AttributeDescriptor::property(AttributeId::Scale, randr::TV_SCALE, ValueKind::Range),
    AttributeDescriptor::property(
        AttributeId::DynamicAspect,
        randr::TV_DYNAMIC_ASPECT_RATIO,
        ValueKind::Range,
    ),
    AttributeDescriptor::property(AttributeId::XOffset, randr::TV_X_OFFSET, ValueKind::Range),
    AttributeDescriptor::property(AttributeId::YOffset, randr::TV_Y_OFFSET, ValueKind::Range),
    AttributeDescriptor::property(
        AttributeId::FullscreenVideo,
        randr::XV_CLONE_FULLSCREEN,
        ValueKind::Range,
    ),
];

static XV_ENTRIES: [AttributeDescriptor; 4] = [
    AttributeDescriptor::property(AttributeId::Enable, xv::CLONE_TO_TVOUT, ValueKind::Range),
    AttributeDescriptor::property(AttributeId::TvStandard, xv::TVOUT_STANDARD, ValueKind::Range),
    AttributeDescriptor::property(AttributeId::Aspect, xv::TVOUT_WIDESCREEN, ValueKind::Range),
    AttributeDescriptor::property(AttributeId::Scale, xv::TVOUT_SCALE, ValueKind::Range),
];

/// Output-property backend: every attribute, Enable through the pipeline
pub static RANDR_CATALOG: Catalog = Catalog {
    backend: "randr",
    entries: &RANDR_ENTRIES,
};

/// Port-attribute backend: the four OMAP tvout port attributes
pub static XV_CATALOG: Catalog = Catalog {
    backend: "xv",
    entries: &XV_ENTRIES,
};

/// Enumerated property whose driver omits the list of valid values
#[derive(Debug)]
pub struct EnumFixup {
    pub property: &'static str,
    /// Symbol names in abstract index order
    pub symbols: &'static [&'static str],
}

/// Properties known to be reported with an empty value list.
///
/// Only these names get their value list synthesized.
pub static ENUM_FIXUPS: &[EnumFixup] = &[
    EnumFixup {
        property: randr::SIGNAL_PROPERTIES,
        symbols: &[randr::symbols::PAL, randr::symbols::NTSC],
    },
    EnumFixup {
        property: randr::TV_ASPECT_RATIO,
        symbols: &[randr::symbols::ASPECT_4_3, randr::symbols::ASPECT_16_9],
    },
];

pub fn enum_fixup(property: &str) -> Option<&'static EnumFixup> {
    ENUM_FIXUPS.iter().find(|f| f.property == property)
}
