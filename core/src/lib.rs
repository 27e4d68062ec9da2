//! Transports, upgrades, multiplexing and identity for *libp2prs*.
//!
//! The main concepts:
//!
//! - A [`PeerId`] is a unique global identifier for a node on the network.
//!   Each node must have a different `PeerId`. Normally, a `PeerId` is the
//!   hash of the public key used to negotiate encryption on the
//!   communication channel, thereby guaranteeing that they cannot be spoofed.
//! - A [`Multiaddr`] is how nodes advertise and dial each other.

pub mod error;
pub mod identity;
pub mod muxing;
mod peer_id;
pub mod peerstore;
pub mod secure_io;
pub mod transport;
pub mod upgrade;

pub use error::CoreError;
pub use identity::{Keypair, PublicKey};
pub use libp2prs_multiaddr::Multiaddr;
pub use peer_id::PeerId;
