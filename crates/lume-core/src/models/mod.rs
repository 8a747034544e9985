//! Data models for Lume
//!
//! Core data structures for services, detection results, and structured intents.

mod detection;
mod intent;
mod service;

pub use detection::*;
pub use intent::*;
pub use service::*;
