//! Identity information carried by a secured (authenticated) connection.

use crate::identity::{Keypair, PublicKey};
use crate::peer_id::PeerId;

/// Implemented by the output of a security upgrade (Yamux-over-TLS, the
/// QUIC adapter) so upper layers can ask "who am I talking to" without
/// caring which transport or handshake produced the answer.
pub trait SecureInfo {
    /// This node's own identity.
    fn local_peer(&self) -> PeerId;
    /// The identity the remote end proved during the handshake.
    fn remote_peer(&self) -> PeerId;
    /// This node's private key, for protocols that need to re-sign
    /// something after the initial handshake (e.g. QUIC hole-punch
    /// coordination messages).
    fn local_priv_key(&self) -> Keypair;
    /// The public key the remote end proved ownership of.
    fn remote_pub_key(&self) -> PublicKey;
}
