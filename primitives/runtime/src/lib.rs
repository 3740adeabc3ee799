#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! Triplegate runtime support.
//!
//! Value-level helpers shared by the generator and by the gateway handlers it
//! emits: the query-parameter filter, path-parameter conversion, field-mask
//! derivation from request bodies, the metadata carried alongside every
//! response or error, and the client handle routes share.

pub mod client;
pub mod convert;
pub mod error;
pub mod field_mask;
pub mod metadata;
pub mod utilities;

pub use client::SharedClient;
pub use error::CallError;
pub use metadata::{merge_attachments, AttachmentValue, Attachments, InterfaceKey, ServerMetadata};
