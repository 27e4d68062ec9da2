//! Generation and verification of the libp2p-TLS certificate extension.
//!
//! TLS 1.3 alone proves possession of *some* key in the leaf certificate;
//! libp2p additionally needs proof of possession of the peer's long-lived
//! identity key, which is not the certificate's key at all - it's a
//! separate, persistent `Keypair`. That binding lives in an X.509
//! extension: a DER `SEQUENCE` of two `OCTET STRING`s, `{publicKey,
//! signature}`, where `signature` covers the literal bytes
//! `"libp2p-tls-handshake:"` followed by the certificate's own
//! `SubjectPublicKeyInfo` DER.

use crate::error::TlsError;
use libp2prs_core::identity::{Keypair, PublicKey};
use libp2prs_core::PeerId;
use rcgen::{Certificate, CertificateParams, CustomExtension, DistinguishedName, PKCS_ECDSA_P256_SHA256};
use std::time::{Duration, SystemTime};

/// `1.3.6.1.4.1.53594.1.1` - the libp2p-TLS extension OID, registered under
/// the Protocol Labs private enterprise number.
pub const LIBP2P_TLS_EXTENSION_OID: &[u64] = &[1, 3, 6, 1, 4, 1, 53594, 1, 1];

/// The TLS ALPN protocol id all libp2p-TLS connections negotiate.
pub const ALPN_LIBP2P: &[u8] = b"libp2p";

const MESSAGE_PREFIX: &[u8] = b"libp2p-tls-handshake:";
const CERT_VALIDITY: Duration = Duration::from_secs(60 * 60 * 24 * 365);
const CLOCK_SKEW_TOLERANCE: Duration = Duration::from_secs(60 * 60);

/// A freshly generated self-signed certificate plus the ephemeral key that
/// signed it. The certificate's DER and the key's PKCS#8 DER are what get
/// handed to the TLS stack for the connection's lifetime; ownership moves
/// into the TLS provider at handshake time, per the ownership model.
pub struct LibP2PTLSCertificate {
    pub certificate_der: Vec<u8>,
    pub private_key_der: Vec<u8>,
}

impl LibP2PTLSCertificate {
    /// Generates a certificate binding `identity` (the long-lived libp2p
    /// key) to a fresh ephemeral ECDSA-P256 certificate key, per §4.E
    /// "Generation".
    pub fn generate(identity: &Keypair) -> Result<LibP2PTLSCertificate, TlsError> {
        let cert_key = rcgen::KeyPair::generate(&PKCS_ECDSA_P256_SHA256)?;
        let spki_der = cert_key.public_key_der();

        let mut message = Vec::with_capacity(MESSAGE_PREFIX.len() + spki_der.len());
        message.extend_from_slice(MESSAGE_PREFIX);
        message.extend_from_slice(&spki_der);

        let signature = identity
            .sign(&message)
            .map_err(|_| TlsError::MalformedExtension("identity key cannot sign".into()))?;
        let extension_value = encode_signed_key(&identity.public().to_protobuf_encoding(), &signature);

        let mut params = CertificateParams::default();
        params.alg = &PKCS_ECDSA_P256_SHA256;
        params.key_pair = Some(cert_key);
        params.distinguished_name = DistinguishedName::new();
        params.not_after = (SystemTime::now() + CERT_VALIDITY).into();
        // Allow for up to an hour of clock skew between peers by backdating
        // validity start rather than trusting `now` exactly.
        params.not_before = (SystemTime::now() - CLOCK_SKEW_TOLERANCE).into();
        params.custom_extensions = vec![CustomExtension::from_oid_content(LIBP2P_TLS_EXTENSION_OID, extension_value)];

        let cert = Certificate::from_params(params)?;
        let certificate_der = cert.serialize_der()?;
        let private_key_der = cert.serialize_private_key_der();

        Ok(LibP2PTLSCertificate { certificate_der, private_key_der })
    }
}

/// The outcome of verifying a peer's leaf certificate: their libp2p
/// identity, confirmed by the extension signature.
#[derive(Debug, Clone)]
pub struct VerifiedIdentity {
    pub public_key: PublicKey,
    pub peer_id: PeerId,
}

/// Verifies the libp2p-TLS extension on a DER-encoded leaf certificate, per
/// §4.E "Verification at handshake completion" steps 1-6. Step 7 (matching
/// an expected remote peer id) is the caller's responsibility via
/// [`VerifiedIdentity::expect_peer`] since not every caller dials with one
/// in hand (a fresh inbound connection has none yet).
pub fn verify_certificate(certificate_der: &[u8]) -> Result<VerifiedIdentity, TlsError> {
    let (_, cert) =
        x509_parser::parse_x509_certificate(certificate_der).map_err(|e| TlsError::CertificateParse(e.to_string()))?;

    let extension = cert
        .tbs_certificate
        .extensions()
        .iter()
        .find(|ext| oid_matches(&ext.oid, LIBP2P_TLS_EXTENSION_OID))
        .ok_or(TlsError::MissingExtension)?;

    let (raw_public_key, signature) = decode_signed_key(extension.value)?;

    // SPKI-byte equality is load-bearing: re-derive the message from the
    // exact bytes the certificate carries, not a re-encoding of the parsed
    // structure, which could legally differ (e.g. different `NULL` params
    // encoding) while still parsing to the "same" key.
    let spki_der = cert.tbs_certificate.subject_pki.raw;
    let mut message = Vec::with_capacity(MESSAGE_PREFIX.len() + spki_der.len());
    message.extend_from_slice(MESSAGE_PREFIX);
    message.extend_from_slice(spki_der);

    let public_key = PublicKey::from_protobuf_encoding(&raw_public_key)?;
    if !public_key.verify(&message, &signature) {
        return Err(TlsError::InvalidSignature);
    }

    let peer_id = public_key.to_peer_id();
    Ok(VerifiedIdentity { public_key, peer_id })
}

impl VerifiedIdentity {
    /// Step 7: if the caller dialed expecting a specific peer, enforce it.
    pub fn expect_peer(self, expected: Option<&PeerId>) -> Result<Self, TlsError> {
        if let Some(expected) = expected {
            if expected != &self.peer_id {
                return Err(TlsError::PeerIdMismatch { expected: expected.to_base58(), actual: self.peer_id.to_base58() });
            }
        }
        Ok(self)
    }
}

fn oid_matches(oid: &x509_parser::der_parser::oid::Oid<'_>, arcs: &[u64]) -> bool {
    oid.iter().map(|arcs_iter| arcs_iter.eq(arcs.iter().copied())).unwrap_or(false)
}

/// DER-encodes the `SignedKey ::= SEQUENCE { publicKey OCTET STRING,
/// signature OCTET STRING }` extension body.
fn encode_signed_key(public_key: &[u8], signature: &[u8]) -> Vec<u8> {
    yasna::construct_der(|writer| {
        writer.write_sequence(|seq| {
            seq.next().write_bytes(public_key);
            seq.next().write_bytes(signature);
        })
    })
}

fn decode_signed_key(der: &[u8]) -> Result<(Vec<u8>, Vec<u8>), TlsError> {
    yasna::parse_der(der, |reader| {
        reader.read_sequence(|reader| {
            let public_key = reader.next().read_bytes()?;
            let signature = reader.next().read_bytes()?;
            Ok((public_key, signature))
        })
    })
    .map_err(|e| TlsError::MalformedExtension(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_then_verify_round_trips_identity() {
        let identity = Keypair::generate_ed25519();
        let cert = LibP2PTLSCertificate::generate(&identity).unwrap();

        let verified = verify_certificate(&cert.certificate_der).unwrap();
        assert_eq!(verified.public_key, identity.public());
        assert_eq!(verified.peer_id, identity.public().to_peer_id());
    }

    #[test]
    fn tampering_with_extension_signature_fails_verification() {
        let identity = Keypair::generate_ed25519();
        let cert = LibP2PTLSCertificate::generate(&identity).unwrap();

        let mut tampered = cert.certificate_der.clone();
        // Flip a byte near the end of the DER, which - for this certificate
        // shape - lands inside the custom extension's signature bytes.
        let last = tampered.len() - 1;
        tampered[last] ^= 0xff;

        match verify_certificate(&tampered) {
            Err(_) => {}
            Ok(v) => assert_ne!(v.public_key, identity.public(), "corrupted signature must not verify"),
        }
    }

    #[test]
    fn ecdsa_identity_also_round_trips() {
        let identity = Keypair::generate_ecdsa();
        let cert = LibP2PTLSCertificate::generate(&identity).unwrap();
        let verified = verify_certificate(&cert.certificate_der).unwrap();
        assert_eq!(verified.peer_id, identity.public().to_peer_id());
    }

    #[test]
    fn expect_peer_rejects_mismatch() {
        let identity = Keypair::generate_ed25519();
        let other = Keypair::generate_ed25519().public().to_peer_id();
        let cert = LibP2PTLSCertificate::generate(&identity).unwrap();
        let verified = verify_certificate(&cert.certificate_der).unwrap();
        assert!(verified.expect_peer(Some(&other)).is_err());
    }
}
