//! Error types re-exported from tvout-error

pub use tvout_error::{Result, TvoutError};
