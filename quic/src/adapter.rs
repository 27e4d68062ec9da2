//! The QUIC transport: native TLS, native multiplexing, secured by
//! libp2p-TLS instead of a Yamux upgrade stacked on top.

use crate::addr::{multiaddr_to_socketaddr, socketaddr_to_multiaddr};
use crate::error::QuicError;
use crate::stream::QuicStream;
use async_trait::async_trait;
use futures::future::BoxFuture;
use libp2prs_core::error::CoreError;
use libp2prs_core::identity::Keypair;
use libp2prs_core::muxing::{IReadWrite, IStreamMuxer, StreamMuxer, StreamMuxerEx};
use libp2prs_core::secure_io::SecureInfo;
use libp2prs_core::transport::{ConnectionInfo, TransportError, TransportListener};
use libp2prs_core::{Multiaddr, PeerId, PublicKey};
use libp2prs_tls::{certificate::verify_certificate, TLSProvider, VerifiedIdentity};
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;

/// Builds secured QUIC connections and listeners for one local identity.
/// Stateless beyond that identity: a fresh [`TLSProvider`] (and therefore a
/// fresh ephemeral certificate) is generated per dial/listen call, matching
/// §4.E's "Generation" - nothing here needs to survive longer than the
/// `quinn::Endpoint` it configures.
#[derive(Clone)]
pub struct QUICSecuredAdapter {
    identity: Keypair,
}

impl QUICSecuredAdapter {
    pub fn new(identity: Keypair) -> Self {
        QUICSecuredAdapter { identity }
    }

    /// Dials `addr` (`/ip{4,6}/.../udp/<port>/quic-v1`), completing the QUIC
    /// and libp2p-TLS handshake before returning. If `expected_peer` is
    /// given, a mismatch fails the dial rather than returning a connection
    /// to the wrong peer.
    pub async fn dial_secured(&self, addr: Multiaddr, expected_peer: Option<PeerId>) -> Result<QuicConnection, QuicError> {
        let remote = multiaddr_to_socketaddr(&addr)?;
        let provider = TLSProvider::new(&self.identity)?;
        let crypto = provider.client_config_with_0rtt(expected_peer.clone())?;

        let bind_addr = wildcard_addr(remote.is_ipv6());
        let mut endpoint = quinn::Endpoint::client(bind_addr)?;
        endpoint.set_default_client_config(quinn::ClientConfig::new(Arc::new(crypto)));

        // The SNI string doubles as the key `rustls`'s session-ticket cache
        // uses, which is how 0-RTT resumption ends up keyed per server
        // identity without a second cache of our own (see `TLSProvider`).
        let server_name = expected_peer.as_ref().map(PeerId::to_base58).unwrap_or_else(|| "libp2p".to_string());

        let connecting = endpoint.connect(remote, &server_name)?;
        let new_conn = connecting.await?;

        let verified = extract_verified_identity(&new_conn.connection)?;
        let verified = verified.expect_peer(expected_peer.as_ref()).map_err(QuicError::Tls)?;

        let la = socketaddr_to_multiaddr(endpoint.local_addr().map_err(|_| QuicError::NoLocalAddr)?);
        Ok(QuicConnection::new(endpoint, new_conn, self.identity.clone(), verified, la, addr))
    }

    /// Binds a listening QUIC endpoint at `addr`. Each accepted connection
    /// completes its own handshake before [`QuicListener::accept`] returns
    /// it, so a caller never sees an unauthenticated `QuicConnection`.
    pub fn listen_secured(&self, addr: Multiaddr) -> Result<QuicListener, QuicError> {
        let bind_addr = multiaddr_to_socketaddr(&addr)?;
        let provider = TLSProvider::new(&self.identity)?;
        let crypto = provider.server_config()?;
        let server_config = quinn::ServerConfig::with_crypto(Arc::new(crypto));

        let (endpoint, incoming) = quinn::Endpoint::server(server_config, bind_addr)?;
        let la = socketaddr_to_multiaddr(endpoint.local_addr().map_err(|_| QuicError::NoLocalAddr)?);

        Ok(QuicListener { endpoint, incoming, identity: self.identity.clone(), la })
    }
}

fn wildcard_addr(is_v6: bool) -> SocketAddr {
    if is_v6 {
        SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0)
    } else {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0)
    }
}

pub(crate) fn extract_verified_identity(connection: &quinn::Connection) -> Result<VerifiedIdentity, QuicError> {
    let certs = connection
        .peer_identity()
        .and_then(|identity| identity.downcast::<Vec<rustls::Certificate>>().ok())
        .ok_or_else(|| QuicError::Io(io::Error::new(io::ErrorKind::InvalidData, "no peer certificate presented")))?;
    let leaf = certs.first().ok_or_else(|| QuicError::Io(io::Error::new(io::ErrorKind::InvalidData, "empty certificate chain")))?;
    verify_certificate(&leaf.0).map_err(QuicError::Tls)
}

/// An accepted or dialed, already-authenticated QUIC session.
///
/// Unlike [`libp2prs_yamux::Yamux`], there is no separate driver task to
/// spawn: `quinn`'s `runtime-async-std` feature drives the endpoint's
/// packet I/O internally, so [`StreamMuxer::task`] always returns `None`.
pub struct QuicConnection {
    endpoint: quinn::Endpoint,
    connection: quinn::Connection,
    bi_streams: quinn::IncomingBiStreams,
    local_identity: Keypair,
    local_peer_id: PeerId,
    remote_peer_id: PeerId,
    remote_pub_key: PublicKey,
    la: Multiaddr,
    ra: Multiaddr,
}

impl QuicConnection {
    pub(crate) fn new(endpoint: quinn::Endpoint, new_conn: quinn::NewConnection, local_identity: Keypair, verified: VerifiedIdentity, la: Multiaddr, ra: Multiaddr) -> Self {
        let local_peer_id = local_identity.public().to_peer_id();
        QuicConnection {
            endpoint,
            connection: new_conn.connection,
            bi_streams: new_conn.bi_streams,
            remote_peer_id: verified.peer_id,
            remote_pub_key: verified.public_key,
            local_identity,
            local_peer_id,
            la,
            ra,
        }
    }
}

impl SecureInfo for QuicConnection {
    fn local_peer(&self) -> PeerId {
        self.local_peer_id.clone()
    }

    fn remote_peer(&self) -> PeerId {
        self.remote_peer_id.clone()
    }

    fn local_priv_key(&self) -> Keypair {
        self.local_identity.clone()
    }

    fn remote_pub_key(&self) -> PublicKey {
        self.remote_pub_key.clone()
    }
}

impl ConnectionInfo for QuicConnection {
    fn local_multiaddr(&self) -> Multiaddr {
        self.la.clone()
    }

    fn remote_multiaddr(&self) -> Multiaddr {
        self.ra.clone()
    }
}

#[async_trait::async_trait]
impl StreamMuxer for QuicConnection {
    type Substream = QuicStream;

    async fn open_stream(&mut self) -> Result<Self::Substream, CoreError> {
        let (send, recv) = self.connection.open_bi().await.map_err(|e| CoreError::Io(io::Error::new(io::ErrorKind::Other, e)))?;
        Ok(QuicStream::new(send, recv))
    }

    async fn accept_stream(&mut self) -> Result<Self::Substream, CoreError> {
        use futures::StreamExt;
        let (send, recv) = self
            .bi_streams
            .next()
            .await
            .ok_or_else(|| CoreError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "quic connection closed")))?
            .map_err(|e| CoreError::Io(io::Error::new(io::ErrorKind::Other, e)))?;
        Ok(QuicStream::new(send, recv))
    }

    async fn close(&mut self) -> Result<(), CoreError> {
        self.connection.close(quinn::VarInt::from_u32(0), b"");
        Ok(())
    }

    fn task(&mut self) -> Option<BoxFuture<'static, ()>> {
        None
    }
}

#[async_trait::async_trait]
impl StreamMuxerEx for QuicConnection {
    async fn open_stream(&mut self) -> Result<IReadWrite, CoreError> {
        Ok(Box::new(StreamMuxer::open_stream(self).await?))
    }

    async fn accept_stream(&mut self) -> Result<IReadWrite, CoreError> {
        Ok(Box::new(StreamMuxer::accept_stream(self).await?))
    }

    async fn close(&mut self) -> Result<(), CoreError> {
        StreamMuxer::close(self).await
    }

    fn task(&mut self) -> Option<BoxFuture<'static, ()>> {
        None
    }

    fn box_clone(&self) -> IStreamMuxer {
        // A `QuicConnection` is not cheaply cloneable (it owns the unique
        // `bi_streams` consumer); callers needing a shared handle should
        // hold it behind their own `Arc`/actor rather than going through
        // `IStreamMuxer::clone`.
        panic!("QuicConnection does not support box_clone; hold it behind an Arc instead")
    }
}

impl libp2prs_core::muxing::ReadWriteEx for QuicStream {
    fn box_clone(&self) -> IReadWrite {
        panic!("QuicStream halves are not cloneable; open a new stream instead")
    }
}

/// The listening half of [`QUICSecuredAdapter`].
pub struct QuicListener {
    endpoint: quinn::Endpoint,
    incoming: quinn::Incoming,
    identity: Keypair,
    la: Multiaddr,
}

#[async_trait]
impl TransportListener for QuicListener {
    type Output = QuicConnection;

    async fn accept(&mut self) -> Result<Self::Output, TransportError> {
        use futures::StreamExt;
        let connecting = self.incoming.next().await.ok_or_else(|| TransportError::Internal("quic endpoint closed".into()))?;
        let remote = connecting.remote_address();
        let new_conn = connecting.await.map_err(|e| TransportError::Io(io::Error::new(io::ErrorKind::Other, e)))?;

        let verified = extract_verified_identity(&new_conn.connection).map_err(|e| TransportError::StreamMuxerError(e.to_string()))?;
        let ra = socketaddr_to_multiaddr(remote);

        Ok(QuicConnection::new(self.endpoint.clone(), new_conn, self.identity.clone(), verified, self.la.clone(), ra))
    }

    fn multi_addr(&self) -> Multiaddr {
        self.la.clone()
    }
}

impl QuicListener {
    /// The bound endpoint backing this listener, handed to
    /// [`crate::hole_punch::QUICHolePunchCoordinator`] so a punch attempt
    /// dials out from the same UDP socket the listener already has a NAT
    /// mapping for, instead of opening a fresh ephemeral port.
    pub(crate) fn endpoint(&self) -> quinn::Endpoint {
        self.endpoint.clone()
    }
}
