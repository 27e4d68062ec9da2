//! QUIC transport secured by libp2p-TLS (§4.E), plus the hole-punch
//! coordination primitive that reuses a listener's bound socket to dial out
//! across a NAT (§4.F).

pub mod addr;
pub mod adapter;
pub mod error;
pub mod hole_punch;
pub mod stream;

pub use adapter::{QuicConnection, QuicListener, QUICSecuredAdapter};
pub use error::QuicError;
pub use hole_punch::{HolePunchConfig, HolePunchResult, QUICHolePunchCoordinator};
pub use stream::QuicStream;
