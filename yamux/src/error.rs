//! The crate-local error type, converted into [`TransportError`] at the
//! `StreamMuxer` boundary and usable directly by callers that only drive
//! a yamux connection.

use libp2prs_core::error::CoreError;
use libp2prs_core::transport::TransportError;
use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct ConnectionError(#[from] pub CoreError);

impl From<ConnectionError> for TransportError {
    fn from(e: ConnectionError) -> Self {
        TransportError::StreamMuxerError(e.0.to_string())
    }
}
