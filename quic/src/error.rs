use libp2prs_core::error::CoreError;
use thiserror::Error;

/// Errors specific to driving a QUIC connection or coordinating a
/// hole-punch; converts into [`CoreError`] at the crate boundary like every
/// other subsystem in this stack.
#[derive(Debug, Error)]
pub enum QuicError {
    #[error("multiaddr {0} is not a /ip{{4,6}}/.../udp/<port>/quic-v1 address")]
    UnsupportedAddress(String),
    #[error(transparent)]
    Connect(#[from] quinn::ConnectError),
    #[error(transparent)]
    Connection(#[from] quinn::ConnectionError),
    #[error(transparent)]
    Write(#[from] quinn::WriteError),
    #[error(transparent)]
    Read(#[from] quinn::ReadError),
    #[error(transparent)]
    Tls(#[from] libp2prs_tls::TlsError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("endpoint has no bound local socket address")]
    NoLocalAddr,
    #[error("hole punch coordination timed out after {0:?}")]
    PunchTimeout(std::time::Duration),
    #[error("no attempt succeeded and no underlying error was recorded")]
    NoCandidate,
}

impl From<QuicError> for CoreError {
    fn from(e: QuicError) -> Self {
        match e {
            QuicError::UnsupportedAddress(a) => CoreError::InvalidAddress(a),
            QuicError::PunchTimeout(_) => CoreError::PunchTimeout,
            QuicError::NoCandidate => CoreError::NoCandidate,
            QuicError::Tls(t) => t.into(),
            other => CoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, other.to_string())),
        }
    }
}
