use async_trait::async_trait;
use libp2prs_core::error::CoreError;
use libp2prs_core::PeerId;
use libp2prs_multiaddr::Multiaddr;

/// Everything a [`crate::mechanism::Mechanism`] or [`crate::policy::Policy`]
/// needs from the outside world, kept narrow on purpose: address book
/// lookups and the ability to dial, nothing about discovery or persistence
/// (those stay external collaborators per the core's scope).
///
/// `Output` is whatever a successful dial produces - a `Yamux<TcpStream>`,
/// a `QuicConnection`, a test fixture - so this crate never depends on a
/// concrete transport.
#[async_trait]
pub trait Context: Send + Sync {
    type Output: Send + 'static;

    /// Addresses known for `peer`, mirroring `AddrBook::get_addr`'s shape
    /// without requiring callers to depend on a concrete peer store.
    fn known_addresses(&self, peer: &PeerId) -> Vec<Multiaddr>;

    /// Whether any registered transport claims it can dial `addr` at all
    /// (independent of whether the dial would actually succeed).
    fn can_dial(&self, addr: &Multiaddr) -> bool;

    /// Dials `addr`, returning the established connection on success.
    async fn dial_address(&self, addr: &Multiaddr) -> Result<Self::Output, CoreError>;
}
