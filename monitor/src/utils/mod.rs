//! Utility modules for the void-mc monitor.
//!
//! # Modules
//!
//! - [`stop`]: Cooperative stop signal shared by the monitoring loops

pub mod stop;

pub use stop::{stop_signal, StopHandle, StopToken};
