//! A single QUIC bidirectional stream wearing the [`MuxedStream`] capability.
//!
//! QUIC is natively multiplexed, so unlike a Yamux [`Stream`][yamux-stream]
//! there is no shared connection-wide lock to take here: `send`/`recv` are
//! already independent, per-stream handles the QUIC implementation hands
//! out.
//!
//! [yamux-stream]: ../../libp2prs_yamux/connection/stream/struct.Stream.html

use async_trait::async_trait;
use libp2prs_core::error::CoreError;
use libp2prs_core::muxing::{MuxedStream, StreamInfo};
use libp2prs_traits::{ReadEx, WriteEx};
use std::io;

pub struct QuicStream {
    pub(crate) send: quinn::SendStream,
    pub(crate) recv: quinn::RecvStream,
    protocol_id: Option<String>,
}

impl QuicStream {
    pub(crate) fn new(send: quinn::SendStream, recv: quinn::RecvStream) -> Self {
        QuicStream { send, recv, protocol_id: None }
    }

}

#[async_trait]
impl ReadEx for QuicStream {
    async fn read2(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.recv.read(buf).await {
            Ok(Some(n)) => Ok(n),
            Ok(None) => Ok(0),
            Err(e) => Err(io::Error::new(io::ErrorKind::Other, e)),
        }
    }
}

#[async_trait]
impl WriteEx for QuicStream {
    async fn write2(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.send.write(buf).await.map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }

    async fn flush2(&mut self) -> io::Result<()> {
        Ok(())
    }

    async fn close2(&mut self) -> io::Result<()> {
        self.send.finish().await.map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }
}

#[async_trait]
impl MuxedStream for QuicStream {
    /// FIN only: bytes already queued on the wire are preserved.
    async fn close_write(&mut self) -> Result<(), CoreError> {
        self.send.finish().await.map_err(|e| CoreError::Io(io::Error::new(io::ErrorKind::Other, e)))
    }

    async fn close(&mut self) -> Result<(), CoreError> {
        self.close_write().await
    }

    /// `STOP_SENDING`: this side no longer wants the peer's remaining data,
    /// but keeps the write half open - unlike Yamux's `close_read`, this is
    /// a genuine wire signal, per §4.F.
    async fn close_read(&mut self) -> Result<(), CoreError> {
        self.recv.stop(quinn::VarInt::from_u32(0)).map_err(|e| CoreError::Io(io::Error::new(io::ErrorKind::Other, e.to_string())))
    }

    /// `RESET_STREAM`: an abrupt abort, visible to the peer as an error
    /// rather than a clean EOF.
    async fn reset(&mut self) -> Result<(), CoreError> {
        self.send
            .reset(quinn::VarInt::from_u32(0))
            .map_err(|e| CoreError::Io(io::Error::new(io::ErrorKind::Other, e.to_string())))
    }
}

impl StreamInfo for QuicStream {
    fn protocol_id(&self) -> Option<&str> {
        self.protocol_id.as_deref()
    }

    fn set_protocol_id(&mut self, proto: String) {
        self.protocol_id = Some(proto);
    }
}
