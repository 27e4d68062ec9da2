//! libp2p-TLS: binds a TLS 1.3 handshake to a peer's long-lived libp2p
//! identity key via a custom X.509 extension.
//!
//! The certificate TLS negotiates is an ephemeral, single-connection
//! artifact; what actually proves identity is the extension [`certificate`]
//! embeds in it, signed by the caller's persistent [`libp2prs_core::identity::Keypair`].
//! [`provider::TLSProvider`] is the piece that turns a generated certificate
//! into `rustls` configs with the right (non-CA) trust model.

pub mod certificate;
pub mod error;
pub mod provider;

pub use certificate::{LibP2PTLSCertificate, VerifiedIdentity};
pub use error::TlsError;
pub use provider::TLSProvider;
