#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! Triplegate Intermediate Representation (IR)
//!
//! This crate defines the descriptor structures the gateway generator reads:
//! files, services, methods with their HTTP bindings, messages, fields and enums.
//! Descriptors arrive already resolved from annotations; this crate only models
//! them and loads them from JSON.

pub mod descriptor;
pub mod field_path;

// Re-export the descriptor types for convenience
pub use descriptor::*;
pub use field_path::{FieldPath, FieldPathComponent};
