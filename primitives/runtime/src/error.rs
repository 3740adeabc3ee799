//! Error returned by generated handlers.

use thiserror::Error;
use tonic::metadata::MetadataMap;
use tonic::{Code, Status};

use crate::metadata::{merge_attachments, Attachments, ServerMetadata};

/// A failed handler invocation together with the metadata captured so far.
///
/// Client input problems (missing or malformed path parameters, bad bodies,
/// bad query strings) carry `Code::InvalidArgument`; failures of the RPC itself
/// are passed through unchanged.
#[derive(Debug, Error)]
#[error("{status}")]
pub struct CallError {
    /// RPC status
    pub status: Status,
    /// Metadata to send with the error response
    pub metadata: ServerMetadata,
}

impl CallError {
    /// Client input error
    pub fn invalid_argument(message: impl Into<String>) -> Self { Status::invalid_argument(message).into() }

    /// Whether the failure was caused by client input
    pub fn is_client_input(&self) -> bool { self.status.code() == Code::InvalidArgument }
}

impl CallError {
    /// Error for a failed RPC.
    ///
    /// Status metadata becomes the trailer, and attachments the transport
    /// carried on the status are merged over it.
    pub fn from_rpc(status: Status) -> Self {
        let mut trailer: MetadataMap = status.metadata().clone();
        if let Some(attachments) = Attachments::from_status(&status) {
            merge_attachments(&mut trailer, attachments);
        }
        Self { status, metadata: ServerMetadata { header: MetadataMap::new(), trailer } }
    }
}

impl From<Status> for CallError {
    fn from(status: Status) -> Self { Self::from_rpc(status) }
}
