//! State module for tracking pagination progress
//!
//! # Components
//!
//! - `DriverState`: the stage a platform's pagination driver is in
//! - `StopReason`: why pagination ended

mod driver_state;

// Re-export main types
pub use driver_state::{DriverState, StopReason};
