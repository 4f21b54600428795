//! Core Module - Scoring, Milestones, Resolution & Orchestration
//!
//! Pure scoring and threshold logic plus the two stateful pieces that
//! drive the store: the address resolver and the enricher.

pub mod enrichment;
pub mod milestones;
pub mod resolver;
pub mod scoring;

pub use enrichment::*;
pub use resolver::*;
pub use scoring::*;
