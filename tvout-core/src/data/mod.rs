//! Data types and validation modules
//!
//! Contains the attribute data model and the sanity checks applied to
//! everything the provider reports.

mod config;
mod types;
mod validation;

pub use config::{
    get_config_path, load_config, load_config_from, validate_config, BackendKind, EngineConfig,
};
pub use types::{
    AbstractValue, AttributeId, AttributeMetadata, AttributeState, RawValue, SetOutcome,
    ValueKind,
};
pub use validation::{
    validate_bounds, validate_enum_values, validate_port_attribute, validate_range_info,
    validate_scalar_reply,
};
