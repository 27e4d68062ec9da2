//! The error taxonomy shared by every crate in this stack.
//!
//! Each subsystem crate (`libp2prs-yamux`, `libp2prs-tls`, `libp2prs-quic`,
//! `libp2prs-traversal`) defines its own `thiserror` enum for the failures it
//! can produce directly, and converts into `CoreError` at its public
//! boundary so callers driving several subsystems at once (the traversal
//! engine dialing through both QUIC and a Yamux-over-TCP fallback) see one
//! error type.

use thiserror::Error;

/// Errors a stream-scoped protocol violation produces. These are handled by
/// sending `RST` on the offending stream; the connection's read loop
/// continues.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StreamFault {
    #[error("stream id {0} was already used and cannot be reused")]
    StreamIdReused(u32),
    #[error("stream id {0} has invalid parity for this connection's role")]
    InvalidStreamIdParity(u32),
    #[error("received frame for unknown stream {0} without SYN")]
    UnknownStream(u32),
    #[error("read buffer exceeded configured maximum")]
    ReadBufferOverflow,
    #[error("peer sent more data than its advertised window allowed")]
    WindowExceeded,
}

/// Errors that force the whole connection down. These escape the read loop
/// and drive an abrupt shutdown with the fault as cause.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectionFault {
    #[error("frame header carries unsupported version {0}")]
    InvalidVersion(u8),
    #[error("frame header carries unknown frame type {0}")]
    InvalidFrameType(u8),
    #[error("frame body length {0} exceeds the maximum frame size")]
    FrameTooLarge(u32),
    #[error("maximum number of concurrent streams ({0}) exceeded")]
    MaxStreamsExceeded(usize),
    #[error("stream ids for this connection are exhausted")]
    StreamIdExhausted,
}

/// Lifecycle errors surfaced to callers of a closed stream or connection.
/// `is_reset` distinguishes a remote-caused teardown from a local one.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("stream is closed (reset: {is_reset})")]
    StreamClosed { is_reset: bool },
    #[error("connection is closed (reset: {is_reset})")]
    ConnectionClosed { is_reset: bool },
}

/// Top-level error type threaded through the public API of every crate in
/// this stack.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("stream fault: {0}")]
    Stream(#[from] StreamFault),
    #[error("connection fault: {0}")]
    Connection(#[from] ConnectionFault),
    #[error("lifecycle: {0}")]
    Lifecycle(#[from] LifecycleError),
    #[error("resource exhausted: connection limit reached")]
    ConnectionLimitReached,
    #[error("keep-alive timed out")]
    KeepAliveTimeout,
    #[error("timed out waiting for send window")]
    WriteWindowTimeout,
    #[error("peer certificate is missing the libp2p extension")]
    MissingLibp2pExtension,
    #[error("libp2p extension signature did not verify")]
    InvalidExtensionSignature,
    #[error("peer id mismatch: expected {expected}, got {actual}")]
    PeerIdMismatch { expected: String, actual: String },
    #[error("certificate invalid: {0}")]
    CertificateInvalid(String),
    #[error("no traversal candidate succeeded")]
    NoCandidate,
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("hole punch coordination timed out")]
    PunchTimeout,
    #[error(transparent)]
    Multiaddr(#[from] libp2prs_multiaddr::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
