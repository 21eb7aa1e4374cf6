//! Core data types for tvout
//!
//! Defines the abstract attribute identifiers, discovered metadata and the
//! per-attribute cached state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TvoutError;

/// Wire-format value exchanged with the provider
pub type RawValue = i64;

/// UI-facing value: enum index or direct range value
pub type AbstractValue = i32;

/// The fixed set of controllable attributes
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AttributeId {
    Enable,
    TvStandard,
    Aspect,
    Scale,
    DynamicAspect,
    XOffset,
    YOffset,
    FullscreenVideo,
}

impl AttributeId {
    pub const ALL: [AttributeId; 8] = [
        AttributeId::Enable,
        AttributeId::TvStandard,
        AttributeId::Aspect,
        AttributeId::Scale,
        AttributeId::DynamicAspect,
        AttributeId::XOffset,
        AttributeId::YOffset,
        AttributeId::FullscreenVideo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeId::Enable => "enable",
            AttributeId::TvStandard => "tv_standard",
            AttributeId::Aspect => "aspect",
            AttributeId::Scale => "scale",
            AttributeId::DynamicAspect => "dynamic_aspect",
            AttributeId::XOffset => "x_offset",
            AttributeId::YOffset => "y_offset",
            AttributeId::FullscreenVideo => "fullscreen_video",
        }
    }
}

impl fmt::Display for AttributeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for AttributeId {
    type Err = TvoutError;

    /// Accepts snake_case or kebab-case names, case-insensitive
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        AttributeId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == normalized)
            .ok_or_else(|| TvoutError::UnsupportedAttribute(s.to_string()))
    }
}

/// Expected shape of an attribute's values
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Range,
    Enum,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Range => write!(f, "range"),
            ValueKind::Enum => write!(f, "enum"),
        }
    }
}

/// Metadata discovered from the provider once per session
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AttributeMetadata {
    /// Inclusive bounds; the abstract value is the raw value
    Range { low: RawValue, high: RawValue },
    /// Ordered raw values; the abstract value is the position in the list
    Enum { values: Vec<RawValue> },
}

impl AttributeMetadata {
    pub fn kind(&self) -> ValueKind {
        match self {
            AttributeMetadata::Range { .. } => ValueKind::Range,
            AttributeMetadata::Enum { .. } => ValueKind::Enum,
        }
    }

    /// Translate a raw provider value into its abstract form.
    ///
    /// Returns `None` when an enumerated raw value is not in the list.
    pub fn translate(&self, raw: RawValue) -> Option<AbstractValue> {
        match self {
            AttributeMetadata::Range { .. } => AbstractValue::try_from(raw).ok(),
            AttributeMetadata::Enum { values } => values
                .iter()
                .position(|v| *v == raw)
                .and_then(|i| AbstractValue::try_from(i).ok()),
        }
    }

    /// Translate an abstract value back to the raw value to write.
    ///
    /// Returns `None` if the value is out of bounds or not a valid index.
    pub fn to_raw(&self, value: AbstractValue) -> Option<RawValue> {
        match self {
            AttributeMetadata::Range { low, high } => {
                let raw = RawValue::from(value);
                (*low..=*high).contains(&raw).then_some(raw)
            }
            AttributeMetadata::Enum { values } => usize::try_from(value)
                .ok()
                .and_then(|i| values.get(i).copied()),
        }
    }
}

impl fmt::Display for AttributeMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeMetadata::Range { low, high } => write!(f, "range {}..={}", low, high),
            AttributeMetadata::Enum { values } => write!(f, "enum of {} values", values.len()),
        }
    }
}

/// Cached raw value and its derived abstract value.
///
/// The abstract value is only ever computed from the raw value, so the two
/// cannot drift apart.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct AttributeState {
    raw: RawValue,
    value: Option<AbstractValue>,
}

impl AttributeState {
    pub fn new(raw: RawValue, metadata: &AttributeMetadata) -> Self {
        Self {
            raw,
            value: metadata.translate(raw),
        }
    }

    pub fn raw(&self) -> RawValue {
        self.raw
    }

    /// Abstract value, `None` while the raw value is not translatable
    pub fn value(&self) -> Option<AbstractValue> {
        self.value
    }
}

/// Result of an accepted set request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    /// Requested value already cached, nothing was sent
    Unchanged,
    /// Write issued and pending events drained
    Submitted,
}
