//! tvout Core Library
//!
//! Discovers the TV-out attributes a display server exposes, keeps a
//! validated cache of their values, and keeps that cache in sync with
//! changes made by any client.
//!
//! # Features
//!
//! - **Discovery**: Resolves every catalog attribute or fails as a whole
//! - **Validation**: Checks wire type, format and metadata before anything is cached
//! - **Notification Bridge**: Turns provider events into confirmed value changes
//! - **Two Backends**: Output properties (RandR style) and port attributes (Xv style)
//!
//! # Module Structure
//!
//! - `provider/` - Interfaces to the display-server connection
//! - `backend/` - Protocol-specific discovery, writes and event handling
//! - `engine/` - Cache, write planning and change confirmation
//! - `data/` - Data types, configuration, validation
//! - `sim/` - Simulated display servers
//!
//! # Example
//!
//! ```no_run
//! use tvout_core::{sim::SimRandr, AttributeId, ControlSession, EngineConfig};
//!
//! let mut session = ControlSession::init_randr(
//!     SimRandr::tv_out(),
//!     &EngineConfig::default(),
//!     |id, value| println!("{} -> {}", id, value),
//! )
//! .unwrap();
//!
//! session.set(AttributeId::Scale, 60).unwrap();
//! ```

// Grouped modules
pub mod backend;
pub mod data;
pub mod engine;
pub mod provider;
pub mod sim;

// Standalone modules
pub mod catalog;
pub mod constants;
pub mod error;
pub mod session;

pub use backend::{AttributeBackend, RandrBackend, RandrOptions, XvBackend};
pub use catalog::{AttributeDescriptor, Binding, Catalog, RANDR_CATALOG, XV_CATALOG};
pub use data::{
    get_config_path, load_config, load_config_from, validate_config, AbstractValue, AttributeId,
    AttributeMetadata, BackendKind, EngineConfig, RawValue, SetOutcome, ValueKind,
};
pub use engine::{Notify, StateCache};
pub use error::{Result, TvoutError};
pub use session::{AttributeSnapshot, ControlSession};
