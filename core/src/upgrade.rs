//! Protocol negotiation and connection-upgrade contracts.

use crate::transport::TransportError;
use async_trait::async_trait;

/// A protocol identified by an opaque byte string, as exchanged during
/// multistream-select.
pub trait ProtocolName {
    fn protocol_name(&self) -> &[u8];
}

/// Declares which protocol strings an [`Upgrader`] is willing to negotiate.
pub trait UpgradeInfo {
    type Info: ProtocolName + Clone;
    fn protocol_info(&self) -> Vec<Self::Info>;
}

/// Upgrades a raw transport connection into something further up the
/// stack can use - a secured, multiplexed connection in the common case.
#[async_trait]
pub trait Upgrader<C>: UpgradeInfo {
    type Output: Send;

    async fn upgrade_inbound(self, socket: C) -> Result<Self::Output, TransportError>;
    async fn upgrade_outbound(self, socket: C) -> Result<Self::Output, TransportError>;
}

/// Outcome of a multistream-select negotiation: the agreed protocol plus
/// any bytes the negotiation read past the handshake itself. Implementers
/// MUST surface `remainder` so callers don't silently drop data.
#[derive(Debug, Clone)]
pub struct Negotiated<P> {
    pub protocol: P,
    pub remainder: Vec<u8>,
}

/// Protocol strings are plain byte slices almost everywhere in this stack
/// (`b"/yamux/1.0.0"`, `b"/libp2p/circuit/relay/0.2.0"`, ...); this blanket
/// impl means an [`Upgrader`] can just declare `type Info = &'static [u8]`
/// instead of wrapping every protocol string in a newtype.
impl ProtocolName for &'static [u8] {
    fn protocol_name(&self) -> &[u8] {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_slice_is_its_own_protocol_name() {
        let p: &'static [u8] = b"/yamux/1.0.0";
        assert_eq!(p.protocol_name(), b"/yamux/1.0.0");
    }
}
