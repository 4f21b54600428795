//! Utils Module - Helper Functions & Shared Utilities
//!
//! Constants, the protocol-list cache, response decoding and formatting.

pub mod cache;
pub mod constants;
pub mod decoder;
pub mod format;

pub use cache::*;
pub use constants::*;
pub use decoder::*;
pub use format::*;
