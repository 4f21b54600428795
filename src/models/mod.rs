//! Models Module - Data Structures & Configuration
//!
//! Single source of truth for data types, configuration and errors.
//! No endpoint, threshold or pacing value is read outside this module and utils::constants.

pub mod config;
pub mod errors;
pub mod types;

pub use config::*;
pub use errors::*;
pub use types::*;
