//! Keys used to sign and verify peer identities.
//!
//! Mirrors the real libp2p `keys.proto` wire format for public/private keys
//! so that PeerIDs and signatures interoperate with the wider libp2p
//! ecosystem. Ed25519 and ECDSA over P-256 are the required algorithms;
//! RSA and secp256k1 slots exist in the wire format but are not implemented
//! here (see DESIGN.md).

use crate::peer_id::PeerId;
use prost::Message;
use rand::rngs::OsRng;
use thiserror::Error;

mod keys_proto {
    include!(concat!(env!("OUT_DIR"), "/keys_proto.rs"));
}

/// Errors produced while decoding, signing or verifying with a key.
#[derive(Debug, Error)]
pub enum DecodingError {
    #[error("failed to decode protobuf-encoded key: {0}")]
    Protobuf(#[from] prost::DecodeError),
    #[error("unsupported or malformed key bytes for this algorithm")]
    InvalidKeyBytes,
    #[error("key type {0:?} is not supported by this build")]
    UnsupportedKeyType(keys_proto::KeyType),
}

#[derive(Debug, Error)]
pub enum SigningError {
    #[error("signing with this key is not supported")]
    Unsupported,
}

/// A keypair covering one of the supported signature algorithms.
///
/// `Keypair` owns private key material; cloning it is cheap for Ed25519
/// (a 32-byte scalar) and intentionally not derived automatically for
/// variants that may later hold non-`Copy` key material.
pub enum Keypair {
    Ed25519(Ed25519Keypair),
    Ecdsa(EcdsaKeypair),
}

impl Keypair {
    /// Generates a new Ed25519 keypair. This is the default algorithm used
    /// when a caller does not care which one they get.
    pub fn generate_ed25519() -> Keypair {
        Keypair::Ed25519(Ed25519Keypair::generate())
    }

    /// Generates a new ECDSA (P-256) keypair.
    pub fn generate_ecdsa() -> Keypair {
        Keypair::Ecdsa(EcdsaKeypair::generate())
    }

    /// Signs a message with this keypair's private key.
    pub fn sign(&self, msg: &[u8]) -> Result<Vec<u8>, SigningError> {
        match self {
            Keypair::Ed25519(k) => Ok(k.sign(msg)),
            Keypair::Ecdsa(k) => Ok(k.sign(msg)),
        }
    }

    /// Returns the public half of this keypair.
    pub fn public(&self) -> PublicKey {
        match self {
            Keypair::Ed25519(k) => PublicKey::Ed25519(k.public()),
            Keypair::Ecdsa(k) => PublicKey::Ecdsa(k.public()),
        }
    }
}

impl Clone for Keypair {
    fn clone(&self) -> Self {
        match self {
            Keypair::Ed25519(k) => Keypair::Ed25519(k.clone()),
            Keypair::Ecdsa(k) => Keypair::Ecdsa(k.clone()),
        }
    }
}

#[derive(Clone)]
pub struct Ed25519Keypair(ed25519_dalek::Keypair);

impl Ed25519Keypair {
    fn generate() -> Self {
        Ed25519Keypair(ed25519_dalek::Keypair::generate(&mut OsRng))
    }

    fn sign(&self, msg: &[u8]) -> Vec<u8> {
        use ed25519_dalek::Signer;
        self.0.sign(msg).to_bytes().to_vec()
    }

    fn public(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.0.public)
    }
}

#[derive(Clone)]
pub struct EcdsaKeypair(p256::ecdsa::SigningKey);

impl EcdsaKeypair {
    fn generate() -> Self {
        EcdsaKeypair(p256::ecdsa::SigningKey::random(&mut OsRng))
    }

    fn sign(&self, msg: &[u8]) -> Vec<u8> {
        use p256::ecdsa::signature::Signer;
        let sig: p256::ecdsa::Signature = self.0.sign(msg);
        use p256::ecdsa::signature::Signature as _;
        sig.as_bytes().to_vec()
    }

    fn public(&self) -> EcdsaPublicKey {
        EcdsaPublicKey(p256::ecdsa::VerifyingKey::from(&self.0))
    }
}

/// The public half of a [`Keypair`].
///
/// `PublicKey` is what gets embedded in the libp2p-TLS certificate
/// extension and protobuf-serialized wherever a peer needs to announce its
/// identity without revealing its private key.
pub enum PublicKey {
    Ed25519(Ed25519PublicKey),
    Ecdsa(EcdsaPublicKey),
}

impl Clone for PublicKey {
    fn clone(&self) -> Self {
        match self {
            PublicKey::Ed25519(k) => PublicKey::Ed25519(k.clone()),
            PublicKey::Ecdsa(k) => PublicKey::Ecdsa(k.clone()),
        }
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_protobuf_encoding() == other.to_protobuf_encoding()
    }
}

impl Eq for PublicKey {}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKey({:?})", bs58::encode(self.to_protobuf_encoding()).into_string())
    }
}

impl PublicKey {
    /// Verifies `signature` was produced over `msg` by the private half of
    /// this key.
    pub fn verify(&self, msg: &[u8], signature: &[u8]) -> bool {
        match self {
            PublicKey::Ed25519(k) => k.verify(msg, signature),
            PublicKey::Ecdsa(k) => k.verify(msg, signature),
        }
    }

    /// Encodes this key using the libp2p `keys.proto` wire format.
    pub fn to_protobuf_encoding(&self) -> Vec<u8> {
        let (key_type, data) = match self {
            PublicKey::Ed25519(k) => (keys_proto::KeyType::Ed25519, k.0.to_bytes().to_vec()),
            PublicKey::Ecdsa(k) => (keys_proto::KeyType::Ecdsa, k.0.to_encoded_point(true).as_bytes().to_vec()),
        };
        let msg = keys_proto::PublicKey { r#type: key_type as i32, data };
        let mut buf = Vec::with_capacity(msg.encoded_len());
        msg.encode(&mut buf).expect("Vec<u8> provides sufficient capacity");
        buf
    }

    /// Decodes a key previously produced by [`PublicKey::to_protobuf_encoding`].
    pub fn from_protobuf_encoding(bytes: &[u8]) -> Result<PublicKey, DecodingError> {
        let msg = keys_proto::PublicKey::decode(bytes)?;
        let key_type = keys_proto::KeyType::from_i32(msg.r#type).ok_or(DecodingError::InvalidKeyBytes)?;
        match key_type {
            keys_proto::KeyType::Ed25519 => {
                let k = ed25519_dalek::PublicKey::from_bytes(&msg.data).map_err(|_| DecodingError::InvalidKeyBytes)?;
                Ok(PublicKey::Ed25519(Ed25519PublicKey(k)))
            }
            keys_proto::KeyType::Ecdsa => {
                let k = p256::ecdsa::VerifyingKey::from_sec1_bytes(&msg.data).map_err(|_| DecodingError::InvalidKeyBytes)?;
                Ok(PublicKey::Ecdsa(EcdsaPublicKey(k)))
            }
            other => Err(DecodingError::UnsupportedKeyType(other)),
        }
    }

    /// Derives this key's [`PeerId`].
    pub fn to_peer_id(&self) -> PeerId {
        PeerId::from_public_key(self)
    }
}

#[derive(Clone)]
pub struct Ed25519PublicKey(ed25519_dalek::PublicKey);

impl Ed25519PublicKey {
    fn verify(&self, msg: &[u8], signature: &[u8]) -> bool {
        use ed25519_dalek::Verifier;
        match ed25519_dalek::Signature::from_bytes(signature) {
            Ok(sig) => self.0.verify(msg, &sig).is_ok(),
            Err(_) => false,
        }
    }
}

#[derive(Clone)]
pub struct EcdsaPublicKey(p256::ecdsa::VerifyingKey);

impl EcdsaPublicKey {
    fn verify(&self, msg: &[u8], signature: &[u8]) -> bool {
        use p256::ecdsa::signature::Verifier;
        match p256::ecdsa::Signature::from_der(signature).or_else(|_| {
            use p256::ecdsa::signature::Signature as _;
            p256::ecdsa::Signature::from_bytes(signature)
        }) {
            Ok(sig) => self.0.verify(msg, &sig).is_ok(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ed25519_sign_verify_round_trip() {
        let kp = Keypair::generate_ed25519();
        let sig = kp.sign(b"hello").unwrap();
        assert!(kp.public().verify(b"hello", &sig));
        assert!(!kp.public().verify(b"goodbye", &sig));
    }

    #[test]
    fn ecdsa_sign_verify_round_trip() {
        let kp = Keypair::generate_ecdsa();
        let sig = kp.sign(b"hello").unwrap();
        assert!(kp.public().verify(b"hello", &sig));
    }

    #[test]
    fn protobuf_round_trip() {
        let kp = Keypair::generate_ed25519();
        let pk = kp.public();
        let bytes = pk.to_protobuf_encoding();
        let back = PublicKey::from_protobuf_encoding(&bytes).unwrap();
        assert_eq!(pk, back);
    }
}
