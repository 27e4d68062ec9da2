//! Wires [`crate::certificate`] into `rustls` via the `dangerous_configuration`
//! escape hatch: libp2p-TLS trusts no certificate authority, so both sides
//! must install a custom verifier that accepts any self-signed leaf
//! certificate carrying a valid libp2p extension and rejects everything
//! else.

use crate::certificate::{verify_certificate, LibP2PTLSCertificate, ALPN_LIBP2P};
use crate::error::TlsError;
use libp2prs_core::identity::Keypair;
use libp2prs_core::PeerId;
use rustls::client::{ServerCertVerified, ServerCertVerifier};
use rustls::server::{ClientCertVerified, ClientCertVerifier};
use rustls::{Certificate, ClientConfig, DistinguishedName, Error as RustlsError, ServerConfig, ServerName};
use std::sync::Arc;
use std::time::SystemTime;

/// Generates a certificate for `identity` and builds the matching `rustls`
/// client and server configs, both speaking ALPN `libp2p` and accepting any
/// peer whose leaf certificate verifies per [`crate::certificate`].
///
/// This is the unit callers install per connection attempt: a fresh
/// ephemeral certificate is not required per dial (the same
/// [`TLSProvider`] can be reused across many connections), but nothing here
/// holds long-lived session state, so building one per `Swarm` is the
/// expected lifetime.
pub struct TLSProvider {
    certificate_der: Vec<u8>,
    private_key_der: Vec<u8>,
}

impl TLSProvider {
    pub fn new(identity: &Keypair) -> Result<Self, TlsError> {
        let cert = LibP2PTLSCertificate::generate(identity)?;
        Ok(TLSProvider { certificate_der: cert.certificate_der, private_key_der: cert.private_key_der })
    }

    fn certified_key(&self) -> (Vec<Certificate>, rustls::PrivateKey) {
        (vec![Certificate(self.certificate_der.clone())], rustls::PrivateKey(self.private_key_der.clone()))
    }

    /// Builds a `rustls::ClientConfig` that authenticates the remote via the
    /// libp2p extension instead of a root CA, optionally pinning
    /// `expected_peer` (the peer id the caller dialed).
    pub fn client_config(&self, expected_peer: Option<PeerId>) -> Result<ClientConfig, TlsError> {
        let (chain, key) = self.certified_key();
        let mut config = ClientConfig::builder()
            .with_safe_defaults()
            .with_custom_certificate_verifier(Arc::new(Libp2pServerVerifier { expected_peer }))
            .with_single_cert(chain, key)
            .map_err(|e| TlsError::CertificateParse(e.to_string()))?;
        config.alpn_protocols = vec![ALPN_LIBP2P.to_vec()];
        Ok(config)
    }

    /// Same as [`Self::client_config`] but with TLS early data (0-RTT)
    /// enabled. `rustls`'s own `session_storage` already keys resumption
    /// tickets by the SNI string the dial passed in; the QUIC adapter
    /// supplies the expected peer's base58 id as that string, which gives
    /// the "per-server-identity ticket cache" §4.F asks for without this
    /// crate needing to maintain a second one.
    pub fn client_config_with_0rtt(&self, expected_peer: Option<PeerId>) -> Result<ClientConfig, TlsError> {
        let mut config = self.client_config(expected_peer)?;
        config.enable_early_data = true;
        Ok(config)
    }

    /// Builds a `rustls::ServerConfig` that accepts any inbound client
    /// presenting a valid libp2p certificate; peer identity is only known
    /// after the handshake completes, via [`crate::certificate::verify_certificate`]
    /// on the accepted connection's peer certificates.
    pub fn server_config(&self) -> Result<ServerConfig, TlsError> {
        let (chain, key) = self.certified_key();
        let mut config = ServerConfig::builder()
            .with_safe_defaults()
            .with_client_cert_verifier(Arc::new(Libp2pClientVerifier))
            .with_single_cert(chain, key)
            .map_err(|e| TlsError::CertificateParse(e.to_string()))?;
        config.alpn_protocols = vec![ALPN_LIBP2P.to_vec()];
        Ok(config)
    }
}

struct Libp2pServerVerifier {
    expected_peer: Option<PeerId>,
}

impl ServerCertVerifier for Libp2pServerVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &Certificate,
        _intermediates: &[Certificate],
        _server_name: &ServerName,
        _scts: &mut dyn Iterator<Item = &[u8]>,
        _ocsp_response: &[u8],
        _now: SystemTime,
    ) -> Result<ServerCertVerified, RustlsError> {
        let verified =
            verify_certificate(&end_entity.0).map_err(|e| RustlsError::General(e.to_string()))?;
        verified.expect_peer(self.expected_peer.as_ref()).map_err(|e| RustlsError::General(e.to_string()))?;
        Ok(ServerCertVerified::assertion())
    }
}

/// Accepts any client certificate that carries a valid libp2p extension.
/// There is no peer id to check against yet at this layer; the caller reads
/// it back out of the session's peer certificates once the handshake
/// completes and binds it to the resulting `StreamMuxer`.
struct Libp2pClientVerifier;

impl ClientCertVerifier for Libp2pClientVerifier {
    fn client_auth_root_subjects(&self) -> Option<Vec<DistinguishedName>> {
        Some(Vec::new())
    }

    fn verify_client_cert(
        &self,
        end_entity: &Certificate,
        _intermediates: &[Certificate],
        _now: SystemTime,
    ) -> Result<ClientCertVerified, RustlsError> {
        verify_certificate(&end_entity.0).map_err(|e| RustlsError::General(e.to_string()))?;
        Ok(ClientCertVerified::assertion())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configs_build_without_error() {
        let identity = Keypair::generate_ed25519();
        let provider = TLSProvider::new(&identity).unwrap();
        assert!(provider.client_config(None).is_ok());
        assert!(provider.server_config().is_ok());
    }

    #[test]
    fn client_config_carries_libp2p_alpn() {
        let identity = Keypair::generate_ed25519();
        let provider = TLSProvider::new(&identity).unwrap();
        let config = provider.client_config(None).unwrap();
        assert_eq!(config.alpn_protocols, vec![ALPN_LIBP2P.to_vec()]);
    }
}
