//! Synchronization engine modules
//!
//! Contains the state cache, the command dispatcher and the notification
//! bridge shared by every backend.

mod bridge;
mod cache;
mod dispatch;

pub use bridge::{confirm, Notify};
pub use cache::{CachedAttribute, Handle, Reconciled, StateCache};
pub use dispatch::{plan_write, WritePlan};
