#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! High-level pipeline that turns a descriptor set into gateway units.
//!
//! ## Module Organization
//!
//! - `orchestration` - run entry points (`run`, `generate_all`, `prepare_output_dir`)
//! - `report` - per-run outcome: written units, skipped files, per-file failures
//!
//! A run owns one [`registry::Namespace`], so module aliases stay stable
//! across every file it generates.

use thiserror::Error;

/// Convenient result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that abort a whole run.
///
/// Failures confined to one file do not appear here; they are collected in
/// the [`RunReport`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The descriptor set could not be read.
    #[error(transparent)]
    Descriptors(#[from] ir::IrError),
    /// The descriptor set is inconsistent.
    #[error(transparent)]
    Registry(#[from] registry::RegistryError),
    /// The core module aliases could not be reserved.
    #[error(transparent)]
    Namespace(#[from] registry::NamespaceError),
    /// A fatal generation error.
    #[error(transparent)]
    Codegen(#[from] codegen::CodegenError),
    /// A requested target is not part of the descriptor set.
    #[error("target {0} is not in the descriptor set")]
    UnknownTarget(String),
    /// I/O error while preparing the output directory.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub mod orchestration;
pub mod report;

pub use orchestration::{generate_all, prepare_output_dir, run, Pipeline};
pub use report::{FileFailure, RunReport};
