//! The Yamux stream multiplexer.
//!
//! [`connection`] holds the frame codec, flow control and the connection's
//! driver task; this module wires that driver up to the capability traits
//! the rest of the stack (`libp2prs-core::muxing`, the upgrade pipeline)
//! expects, so a [`Yamux`] is usable anywhere a `StreamMuxer` is.

pub mod chunks;
pub mod connection;
pub mod error;
pub mod flow_control;
pub mod frame;

pub use connection::{control::Control, stream::Stream, Config, Id, Mode, WindowUpdateMode};
pub use error::ConnectionError;

use connection::Connection;
use futures::future::BoxFuture;
use futures::FutureExt;
use libp2prs_core::identity::Keypair;
use libp2prs_core::muxing::{IReadWrite, IStreamMuxer, ReadWriteEx, StreamMuxer, StreamMuxerEx};
use libp2prs_core::secure_io::SecureInfo;
use libp2prs_core::transport::{ConnectionInfo, TransportError};
use libp2prs_core::upgrade::{UpgradeInfo, Upgrader};
use libp2prs_core::{CoreError, Multiaddr, PeerId, PublicKey};
use libp2prs_traits::{SplitEx, SplittableReadWrite};
use std::fmt;

/// A Yamux session: the driver task plus the identity/address bookkeeping
/// carried over from whatever secure channel it was built on top of.
///
/// Cloning a `Yamux` clones the cheap [`Control`] handle and the recorded
/// metadata; only the original instance carries the driver task (see
/// [`StreamMuxer::task`]).
pub struct Yamux<C: SplitEx> {
    connection: Option<Connection<C::Reader, C::Writer>>,
    control: Control,
    id: Id,
    pub la: Multiaddr,
    pub ra: Multiaddr,
    pub local_priv_key: Keypair,
    pub local_peer_id: PeerId,
    pub remote_pub_key: PublicKey,
    pub remote_peer_id: PeerId,
}

impl<C: SplitEx> Clone for Yamux<C> {
    fn clone(&self) -> Self {
        Yamux {
            connection: None,
            control: self.control.clone(),
            id: self.id,
            la: self.la.clone(),
            ra: self.ra.clone(),
            local_priv_key: self.local_priv_key.clone(),
            local_peer_id: self.local_peer_id.clone(),
            remote_pub_key: self.remote_pub_key.clone(),
            remote_peer_id: self.remote_peer_id.clone(),
        }
    }
}

impl<C: SplitEx> fmt::Debug for Yamux<C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Yamux").field("id", &self.id).field("ra", &self.ra).field("remote_peer_id", &self.remote_peer_id).finish()
    }
}

impl<C: ConnectionInfo + SecureInfo + SplittableReadWrite> Yamux<C> {
    /// Builds a `Yamux` on top of an already-secured, splittable channel,
    /// copying the identity/address info out of `io` before it is consumed
    /// by the driver connection.
    pub fn new(io: C, config: Config, mode: Mode) -> Self {
        let local_priv_key = io.local_priv_key();
        let local_peer_id = io.local_peer();
        let remote_pub_key = io.remote_pub_key();
        let remote_peer_id = io.remote_peer();
        let la = io.local_multiaddr();
        let ra = io.remote_multiaddr();

        let (reader, writer) = io.split();
        let id = Id::random();
        let (conn, control) = Connection::new(id, reader, writer, mode, config);

        Yamux {
            connection: Some(conn),
            control,
            id,
            la,
            ra,
            local_priv_key,
            local_peer_id,
            remote_pub_key,
            remote_peer_id,
        }
    }
}

impl<C: SplitEx> SecureInfo for Yamux<C> {
    fn local_peer(&self) -> PeerId {
        self.local_peer_id.clone()
    }

    fn remote_peer(&self) -> PeerId {
        self.remote_peer_id.clone()
    }

    fn local_priv_key(&self) -> Keypair {
        self.local_priv_key.clone()
    }

    fn remote_pub_key(&self) -> PublicKey {
        self.remote_pub_key.clone()
    }
}

impl<C: SplitEx> ConnectionInfo for Yamux<C> {
    fn local_multiaddr(&self) -> Multiaddr {
        self.la.clone()
    }

    fn remote_multiaddr(&self) -> Multiaddr {
        self.ra.clone()
    }
}

impl ReadWriteEx for Stream {
    fn box_clone(&self) -> IReadWrite {
        Box::new(self.clone())
    }
}

#[async_trait::async_trait]
impl<C: SplittableReadWrite> StreamMuxerEx for Yamux<C> {
    async fn open_stream(&mut self) -> Result<IReadWrite, CoreError> {
        let s = self.control.open_stream().await?;
        log::trace!("{:?}: outbound substream {} opened", self.id, s.id());
        Ok(Box::new(s))
    }

    async fn accept_stream(&mut self) -> Result<IReadWrite, CoreError> {
        let s = self.control.accept_stream().await?;
        log::trace!("{:?}: inbound substream {} accepted", self.id, s.id());
        Ok(Box::new(s))
    }

    async fn close(&mut self) -> Result<(), CoreError> {
        self.control.close().await
    }

    fn task(&mut self) -> Option<BoxFuture<'static, ()>> {
        let conn = self.connection.take()?;
        let id = self.id;
        Some(
            async move {
                conn.run().await;
                log::info!("{:?}: driver task exiting", id);
            }
            .boxed(),
        )
    }

    fn box_clone(&self) -> IStreamMuxer {
        Box::new(self.clone())
    }
}

#[async_trait::async_trait]
impl<C: SplittableReadWrite> StreamMuxer for Yamux<C> {
    type Substream = Stream;

    async fn open_stream(&mut self) -> Result<Self::Substream, CoreError> {
        self.control.open_stream().await
    }

    async fn accept_stream(&mut self) -> Result<Self::Substream, CoreError> {
        self.control.accept_stream().await
    }

    async fn close(&mut self) -> Result<(), CoreError> {
        self.control.close().await
    }

    fn task(&mut self) -> Option<BoxFuture<'static, ()>> {
        let conn = self.connection.take()?;
        let id = self.id;
        Some(
            async move {
                conn.run().await;
                log::info!("{:?}: driver task exiting", id);
            }
            .boxed(),
        )
    }
}

impl UpgradeInfo for Config {
    type Info = &'static [u8];

    fn protocol_info(&self) -> Vec<Self::Info> {
        vec![b"/yamux/1.0.0"]
    }
}

#[async_trait::async_trait]
impl<T> Upgrader<T> for Config
where
    T: ConnectionInfo + SecureInfo + SplittableReadWrite,
{
    type Output = Yamux<T>;

    async fn upgrade_inbound(self, socket: T) -> Result<Self::Output, TransportError> {
        log::trace!("upgrading inbound connection to yamux");
        Ok(Yamux::new(socket, self, Mode::Server))
    }

    async fn upgrade_outbound(self, socket: T) -> Result<Self::Output, TransportError> {
        log::trace!("upgrading outbound connection to yamux");
        Ok(Yamux::new(socket, self, Mode::Client))
    }
}
