//! Minimal async I/O capability traits.
//!
//! Transports and secure channels in this stack are generic over these
//! traits rather than over a concrete runtime's socket type, so the same
//! `YamuxConnection` or `QUICSecuredAdapter` code works whether the
//! underlying byte pipe came from `async-std`, `tokio`, or an in-memory
//! test fixture.

use async_trait::async_trait;
use std::io;

/// A readable half, or whole, of a byte pipe.
#[async_trait]
pub trait ReadEx: Send {
    /// Reads into `buf`, returning the number of bytes read. `Ok(0)` means EOF.
    async fn read2(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// A writable half, or whole, of a byte pipe.
#[async_trait]
pub trait WriteEx: Send {
    /// Writes `buf`, returning the number of bytes accepted.
    async fn write2(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Flushes any buffered output.
    async fn flush2(&mut self) -> io::Result<()>;

    /// Closes the writable side. Idempotent.
    async fn close2(&mut self) -> io::Result<()>;
}

/// A full-duplex byte pipe.
pub trait ReadWriteEx: ReadEx + WriteEx {}

impl<T: ReadEx + WriteEx> ReadWriteEx for T {}

/// A type that can be split into an owned read half and an owned write half.
///
/// Secured transports (QUIC streams, the Yamux read loop and its writer
/// actor) need independently-owned halves so the read loop and application
/// writers can progress concurrently without sharing a lock across an
/// `.await` point.
pub trait SplitEx: ReadWriteEx {
    type Reader: ReadEx + Send + Unpin + 'static;
    type Writer: WriteEx + Send + Unpin + 'static;

    fn split(self) -> (Self::Reader, Self::Writer);
}

/// A byte pipe that is both splittable and full-duplex; the bound most
/// transport-upgrade code actually needs.
pub trait SplittableReadWrite: SplitEx + Send + Unpin + 'static {}

impl<T: SplitEx + Send + Unpin + 'static> SplittableReadWrite for T {}
