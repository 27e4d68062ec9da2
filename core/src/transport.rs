//! Dialing and listening contracts transports implement.

use async_trait::async_trait;
use libp2prs_multiaddr::Multiaddr;
use thiserror::Error;

/// Errors a [`Transport`] or [`TransportListener`] can produce. Distinct
/// from [`crate::error::CoreError`]: this is the narrow set a raw,
/// not-yet-secured transport can actually hit.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("address {0} is not supported by this transport")]
    UnsupportedAddress(Multiaddr),
    #[error("connection limit reached")]
    ConnectionLimitReached,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("internal transport error: {0}")]
    Internal(String),
    #[error("stream muxer error: {0}")]
    StreamMuxerError(String),
}

/// A dialable, listenable transport (TCP, the QUIC adapter, an in-memory
/// fixture for tests).
#[async_trait]
pub trait Transport {
    type Output: Send + 'static;
    type Listener: TransportListener<Output = Self::Output> + Send;

    fn listen_on(self, addr: Multiaddr) -> Result<Self::Listener, TransportError>;
    async fn dial(self, addr: Multiaddr) -> Result<Self::Output, TransportError>;
}

/// The listening half of a [`Transport`]: accepts inbound connections one
/// at a time.
#[async_trait]
pub trait TransportListener {
    type Output: Send + 'static;

    async fn accept(&mut self) -> Result<Self::Output, TransportError>;
    fn multi_addr(&self) -> Multiaddr;
}

/// Implemented by a connection (secured or not) so callers can ask which
/// local and remote address it was established over, independent of which
/// transport produced it.
pub trait ConnectionInfo {
    fn local_multiaddr(&self) -> Multiaddr;
    fn remote_multiaddr(&self) -> Multiaddr;
}
