//! Stream multiplexer capability traits.
//!
//! Both the Yamux connection and the QUIC secured adapter implement
//! [`StreamMuxer`]; code above the transport layer is generic over this
//! trait rather than over either concrete implementation.

use crate::error::CoreError;
use async_trait::async_trait;
use futures::future::BoxFuture;
use libp2prs_traits::{ReadEx, WriteEx};

/// Per-stream metadata independent of the read/write path.
pub trait StreamInfo {
    /// The negotiated protocol string for this stream, if multistream-select
    /// has completed. `None` before negotiation or for a raw stream that
    /// opted out of it.
    fn protocol_id(&self) -> Option<&str>;
    /// Records the negotiated protocol string.
    fn set_protocol_id(&mut self, proto: String);
}

/// A single multiplexed stream: the `MuxedStream` capability from the
/// external-interfaces contract. `read`/`write` come from [`ReadEx`]/[`WriteEx`];
/// this trait adds the half-close and reset operations a yamux or QUIC
/// stream layers on top.
#[async_trait]
pub trait MuxedStream: ReadEx + WriteEx + StreamInfo + Send {
    /// Closes the writable half only; peer still sees readable data until
    /// it also closes or resets.
    async fn close_write(&mut self) -> Result<(), CoreError>;
    /// Closes the readable half only. Yamux has no wire signal for this
    /// (no `STOP_SENDING` equivalent): it is local-only, discarding
    /// already-buffered data and failing pending readers, while inbound
    /// data the peer keeps sending is silently dropped until its own
    /// window exhausts. QUIC sends `STOP_SENDING`. Callers that need
    /// uniform behavior across both should treat this as advisory.
    async fn close_read(&mut self) -> Result<(), CoreError>;
    /// Closes both halves gracefully.
    async fn close(&mut self) -> Result<(), CoreError>;
    /// Aborts the stream immediately, signalling an error to the peer
    /// rather than a clean EOF.
    async fn reset(&mut self) -> Result<(), CoreError>;
}

/// A boxed, object-safe, full-duplex byte pipe - what [`StreamMuxer::open_stream`]
/// and [`StreamMuxer::accept_stream`] hand back to callers that don't want
/// to be generic over the concrete substream type.
pub trait ReadWriteEx: ReadEx + WriteEx + Send {
    fn box_clone(&self) -> IReadWrite;
}

pub type IReadWrite = Box<dyn ReadWriteEx>;

impl Clone for IReadWrite {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// The capability every multiplexer (Yamux, the QUIC adapter) implements:
/// open outbound streams, accept inbound ones, and close the whole session.
#[async_trait]
pub trait StreamMuxer: Send {
    type Substream: Send + 'static;

    async fn open_stream(&mut self) -> Result<Self::Substream, CoreError>;
    async fn accept_stream(&mut self) -> Result<Self::Substream, CoreError>;
    async fn close(&mut self) -> Result<(), CoreError>;

    /// The background task (read loop, keep-alive timer) driving this
    /// muxer, if it needs to be spawned separately from the handle that
    /// callers hold. `None` once taken or if the implementation drives
    /// itself inline.
    fn task(&mut self) -> Option<BoxFuture<'static, ()>>;
}

/// Object-safe variant of [`StreamMuxer`] for code holding a boxed muxer
/// (`IStreamMuxer`) rather than being generic over the concrete type.
#[async_trait]
pub trait StreamMuxerEx: Send {
    async fn open_stream(&mut self) -> Result<IReadWrite, CoreError>;
    async fn accept_stream(&mut self) -> Result<IReadWrite, CoreError>;
    async fn close(&mut self) -> Result<(), CoreError>;
    fn task(&mut self) -> Option<BoxFuture<'static, ()>>;
    fn box_clone(&self) -> IStreamMuxer;
}

pub type IStreamMuxer = Box<dyn StreamMuxerEx>;

impl Clone for IStreamMuxer {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}
