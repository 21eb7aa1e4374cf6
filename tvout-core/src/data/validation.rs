//! Sanity checks for provider replies and discovered metadata
//!
//! Every reply the provider sends is checked before it reaches the cache:
//! - a value must be exactly one 32-bit item of the expected type
//! - range descriptions must carry exactly two ordered bounds
//! - enumerated value lists must be free of duplicates

use std::collections::HashSet;

use super::types::{AttributeMetadata, RawValue};
use crate::constants::wire;
use crate::error::{Result, TvoutError};
use crate::provider::{PortAttributeInfo, PropertyInfo, PropertyReply, PropertyType};

/// Validates a property read and extracts its single value
pub fn validate_scalar_reply(
    name: &str,
    reply: &PropertyReply,
    expected: PropertyType,
) -> Result<RawValue> {
    if reply.property_type != expected {
        return Err(TvoutError::malformed_value(
            name,
            format!("type {:?}, expected {:?}", reply.property_type, expected),
        ));
    }
    if reply.format != wire::VALUE_FORMAT {
        return Err(TvoutError::malformed_value(
            name,
            format!("format {}, expected {}", reply.format, wire::VALUE_FORMAT),
        ));
    }
    match reply.items.as_slice() {
        [value] => Ok(*value),
        items => Err(TvoutError::malformed_value(
            name,
            format!("{} items, expected {}", items.len(), wire::SCALAR_ITEMS),
        )),
    }
}

/// Validates that bounds are ordered
pub fn validate_bounds(name: &str, low: RawValue, high: RawValue) -> Result<AttributeMetadata> {
    if low > high {
        return Err(TvoutError::malformed_metadata(
            name,
            format!("inverted bounds {}..{}", low, high),
        ));
    }
    Ok(AttributeMetadata::Range { low, high })
}

/// Validates a range property description
pub fn validate_range_info(name: &str, info: &PropertyInfo) -> Result<AttributeMetadata> {
    if !info.range {
        return Err(TvoutError::malformed_metadata(name, "expected a range"));
    }
    match info.values.as_slice() {
        [low, high] => validate_bounds(name, *low, *high),
        values => Err(TvoutError::malformed_metadata(
            name,
            format!("{} bounds, expected {}", values.len(), wire::RANGE_BOUNDS),
        )),
    }
}

/// Validates an enumerated value list
pub fn validate_enum_values(name: &str, values: Vec<RawValue>) -> Result<AttributeMetadata> {
    if values.is_empty() {
        return Err(TvoutError::malformed_metadata(name, "empty value list"));
    }
    let mut seen = HashSet::with_capacity(values.len());
    if let Some(dup) = values.iter().find(|v| !seen.insert(**v)) {
        return Err(TvoutError::malformed_metadata(
            name,
            format!("duplicate value {}", dup),
        ));
    }
    Ok(AttributeMetadata::Enum { values })
}

/// Validates a port attribute description as a range
pub fn validate_port_attribute(info: &PortAttributeInfo) -> Result<AttributeMetadata> {
    if !info.gettable || !info.settable {
        return Err(TvoutError::malformed_metadata(
            &info.name,
            "attribute must be gettable and settable",
        ));
    }
    validate_bounds(
        &info.name,
        RawValue::from(info.min_value),
        RawValue::from(info.max_value),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(property_type: PropertyType, format: u8, items: Vec<i64>) -> PropertyReply {
        PropertyReply {
            property_type,
            format,
            items,
        }
    }

    #[test]
    fn test_scalar_reply_accepts_single_item() {
        let r = reply(PropertyType::Integer, 32, vec![50]);
        assert_eq!(validate_scalar_reply("TVScale", &r, PropertyType::Integer).unwrap(), 50);
    }

    #[test]
    fn test_scalar_reply_rejects_wrong_shape() {
        let wrong_type = reply(PropertyType::Atom, 32, vec![50]);
        assert!(validate_scalar_reply("TVScale", &wrong_type, PropertyType::Integer).is_err());

        let wrong_format = reply(PropertyType::Integer, 8, vec![50]);
        assert!(validate_scalar_reply("TVScale", &wrong_format, PropertyType::Integer).is_err());

        let two_items = reply(PropertyType::Integer, 32, vec![50, 60]);
        assert!(validate_scalar_reply("TVScale", &two_items, PropertyType::Integer).is_err());

        let empty = reply(PropertyType::Integer, 32, vec![]);
        assert!(validate_scalar_reply("TVScale", &empty, PropertyType::Integer).is_err());
    }

    #[test]
    fn test_range_info_requires_two_ordered_bounds() {
        let ok = PropertyInfo {
            range: true,
            values: vec![1, 100],
        };
        assert_eq!(
            validate_range_info("TVScale", &ok).unwrap(),
            AttributeMetadata::Range { low: 1, high: 100 }
        );

        let not_range = PropertyInfo {
            range: false,
            values: vec![1, 100],
        };
        assert!(validate_range_info("TVScale", &not_range).is_err());

        let three = PropertyInfo {
            range: true,
            values: vec![1, 50, 100],
        };
        assert!(validate_range_info("TVScale", &three).is_err());

        let inverted = PropertyInfo {
            range: true,
            values: vec![100, 1],
        };
        assert!(matches!(
            validate_range_info("TVScale", &inverted),
            Err(TvoutError::MalformedMetadata { .. })
        ));
    }

    #[test]
    fn test_enum_values_reject_duplicates() {
        assert!(validate_enum_values("TVAspectRatio", vec![7, 8]).is_ok());
        assert!(validate_enum_values("TVAspectRatio", vec![7, 7]).is_err());
        assert!(validate_enum_values("TVAspectRatio", vec![]).is_err());
    }

    #[test]
    fn test_port_attribute_must_be_read_write() {
        let mut info = PortAttributeInfo {
            name: "XV_OMAP_TVOUT_SCALE".into(),
            min_value: 1,
            max_value: 100,
            gettable: true,
            settable: true,
        };
        assert_eq!(
            validate_port_attribute(&info).unwrap(),
            AttributeMetadata::Range { low: 1, high: 100 }
        );
        info.settable = false;
        assert!(validate_port_attribute(&info).is_err());
    }
}
