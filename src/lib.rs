//! `libp2prs`: the core of a libp2p-style networking stack - Yamux stream
//! multiplexing, a QUIC transport secured by libp2p-TLS, and the
//! NAT-traversal mechanism set and policy that dials through either.
//!
//! This crate is a thin facade: each subsystem lives in its own published
//! crate (`libp2prs-core`, `libp2prs-yamux`, `libp2prs-tls`, `libp2prs-quic`,
//! `libp2prs-traversal`, `libp2prs-multiaddr`, `libp2prs-traits`) so that a
//! caller who only needs, say, the multiaddr parser is not forced to pull in
//! QUIC. Re-exporting them here under one name is what most applications
//! actually want to depend on.
//!
//! Application-level protocols (Identify, Ping, Circuit Relay), discovery,
//! peer stores and CLI surfaces are not part of this crate; they are external
//! collaborators built on top of the [`core::muxing::MuxedStream`] capability
//! this crate exposes.

pub use libp2prs_core as core;
pub use libp2prs_multiaddr as multiaddr;
pub use libp2prs_quic as quic;
pub use libp2prs_tls as tls;
pub use libp2prs_traits as traits;
pub use libp2prs_traversal as traversal;
pub use libp2prs_yamux as yamux;

pub use libp2prs_core::{CoreError, Keypair, Multiaddr, PeerId, PublicKey};
