//! # RadioBox Common Library
//!
//! Shared code for the RadioBox appliance:
//! - Device state and channel types (the published snapshot shape)
//! - Bootstrap configuration loading

pub mod config;
pub mod error;
pub mod state;

pub use error::{Error, Result};
pub use state::{Channel, DeviceState};
