use thiserror::Error;

/// Errors raised while generating, parsing or verifying a libp2p-TLS
/// certificate. Converts into [`libp2prs_core::error::CoreError`] at the
/// crate boundary so callers driving a handshake through [`crate::provider`]
/// see the unified error type.
#[derive(Debug, Error)]
pub enum TlsError {
    #[error("failed to generate certificate: {0}")]
    Generation(#[from] rcgen::RcgenError),
    #[error("failed to parse peer certificate: {0}")]
    CertificateParse(String),
    #[error("peer certificate is missing the libp2p extension")]
    MissingExtension,
    #[error("malformed libp2p extension payload: {0}")]
    MalformedExtension(String),
    #[error("malformed libp2p public key in extension: {0}")]
    MalformedPublicKey(#[from] libp2prs_core::identity::DecodingError),
    #[error("libp2p extension signature did not verify")]
    InvalidSignature,
    #[error("peer id mismatch: expected {expected}, got {actual}")]
    PeerIdMismatch { expected: String, actual: String },
}

impl From<TlsError> for libp2prs_core::error::CoreError {
    fn from(e: TlsError) -> Self {
        match e {
            TlsError::MissingExtension => libp2prs_core::error::CoreError::MissingLibp2pExtension,
            TlsError::InvalidSignature => libp2prs_core::error::CoreError::InvalidExtensionSignature,
            TlsError::PeerIdMismatch { expected, actual } => libp2prs_core::error::CoreError::PeerIdMismatch { expected, actual },
            other => libp2prs_core::error::CoreError::CertificateInvalid(other.to_string()),
        }
    }
}
