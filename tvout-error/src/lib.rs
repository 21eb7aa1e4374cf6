//! Unified error handling for tvout
//!
//! This crate provides a single error type used across all tvout components.
//! It uses thiserror for ergonomic error definitions with proper Display and Error trait impls.

use std::io;
use std::path::PathBuf;

/// Result type alias using TvoutError
pub type Result<T> = std::result::Result<T, TvoutError>;

/// Unified error type for all tvout operations
#[derive(thiserror::Error, Debug)]
pub enum TvoutError {
    // ============================================================================
    // I/O and File System Errors
    // ============================================================================
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: io::Error,
    },

    // ============================================================================
    // Session Initialization Errors
    // ============================================================================
    #[error("Display extension {name} not available: {reason}")]
    ExtensionMissing {
        name: String,
        reason: String,
    },

    #[error("No suitable target found: {0}")]
    TargetNotFound(String),

    #[error("Attribute {attribute} could not be resolved (provider name {name})")]
    AttributeUnresolved {
        attribute: String,
        name: String,
    },

    #[error("Malformed value for {name}: {reason}")]
    MalformedValue {
        name: String,
        reason: String,
    },

    #[error("Malformed metadata for {name}: {reason}")]
    MalformedMetadata {
        name: String,
        reason: String,
    },

    #[error("{backend} discovery failed: {source}")]
    DiscoveryFailed {
        backend: String,
        source: Box<TvoutError>,
    },

    // ============================================================================
    // Provider Errors
    // ============================================================================
    #[error("Provider request {request} failed: {reason}")]
    Provider {
        request: String,
        reason: String,
    },

    // ============================================================================
    // Validation Errors
    // ============================================================================
    #[error("Attribute not supported by this backend: {0}")]
    UnsupportedAttribute(String),

    #[error("Value {value} out of range for {attribute} (must be {low}-{high})")]
    OutOfRange {
        attribute: String,
        value: i64,
        low: i64,
        high: i64,
    },

    #[error("Invalid index {index} for {attribute} ({len} values available)")]
    InvalidIndex {
        attribute: String,
        index: i64,
        len: usize,
    },

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidConfig {
        field: String,
        reason: String,
    },

    // ============================================================================
    // Other Errors
    // ============================================================================
    #[error("Operation not supported: {0}")]
    NotSupported(String),
}

impl TvoutError {
    /// Create a config error from a string
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a provider error for a failed request
    pub fn provider(request: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Provider {
            request: request.into(),
            reason: reason.into(),
        }
    }

    /// Create a malformed value error
    pub fn malformed_value(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedValue {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a malformed metadata error
    pub fn malformed_metadata(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedMetadata {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// True for errors that abort session initialization
    pub fn is_init_failure(&self) -> bool {
        matches!(
            self,
            Self::ExtensionMissing { .. }
                | Self::TargetNotFound(_)
                | Self::AttributeUnresolved { .. }
                | Self::MalformedValue { .. }
                | Self::MalformedMetadata { .. }
                | Self::DiscoveryFailed { .. }
        )
    }

    /// Classify an error raised while a session is being set up.
    ///
    /// Errors that already are init failures pass through; anything else
    /// (a failed provider request, say) is wrapped in `DiscoveryFailed`.
    pub fn during_init(self, backend: impl Into<String>) -> Self {
        if self.is_init_failure() {
            self
        } else {
            Self::DiscoveryFailed {
                backend: backend.into(),
                source: Box::new(self),
            }
        }
    }

    /// True for locally rejected set requests (no provider traffic happened)
    pub fn is_validation_failure(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedAttribute(_) | Self::OutOfRange { .. } | Self::InvalidIndex { .. }
        )
    }
}
