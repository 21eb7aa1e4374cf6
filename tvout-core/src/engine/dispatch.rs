//! Command dispatch
//!
//! Turns an abstract set request into the raw write a backend must issue,
//! rejecting invalid requests before any provider traffic.

use tracing::debug;

use super::cache::{Handle, StateCache};
use crate::data::{AbstractValue, AttributeId, AttributeMetadata, RawValue};
use crate::error::{Result, TvoutError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePlan {
    /// The cache already holds the requested raw value
    Unchanged,
    Write { handle: Handle, raw: RawValue },
}

pub fn plan_write(cache: &StateCache, id: AttributeId, value: AbstractValue) -> Result<WritePlan> {
    let entry = cache
        .get(id)
        .ok_or_else(|| TvoutError::UnsupportedAttribute(id.to_string()))?;

    let raw = entry.metadata.to_raw(value).ok_or_else(|| match &entry.metadata {
        AttributeMetadata::Range { low, high } => TvoutError::OutOfRange {
            attribute: id.to_string(),
            value: RawValue::from(value),
            low: *low,
            high: *high,
        },
        AttributeMetadata::Enum { values } => TvoutError::InvalidIndex {
            attribute: id.to_string(),
            index: i64::from(value),
            len: values.len(),
        },
    })?;

    if raw == entry.state.raw() {
        debug!("{} already {}, skipping write", id, value);
        return Ok(WritePlan::Unchanged);
    }

    Ok(WritePlan::Write {
        handle: entry.handle,
        raw,
    })
}
