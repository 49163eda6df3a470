//! Signing keypairs
//!
//! Two algorithms are supported. `ed25519` is the default: the public
//! material is a real verifying key, so anyone holding it can check a
//! signature. `hmac-sha256` is the legacy development scheme whose "public"
//! value is a hash of the private key; its signatures can only be checked by
//! the private key holder. Legacy keys stay loadable so existing cartridges
//! remain verifiable.

use ed25519_dalek::SigningKey;
use eyre::Result;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::GumdropError;

/// Length of the private material in bytes
pub const PRIVATE_KEY_LEN: usize = 32;

/// Length of the hex key ids and fingerprints derived from public material
pub const SHORT_ID_LEN: usize = 16;

const LEGACY_PUBLIC_PREFIX: &[u8] = b"gumdrop-pub:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Algorithm {
    #[default]
    #[serde(rename = "ed25519")]
    Ed25519,
    #[serde(rename = "hmac-sha256")]
    HmacSha256,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Ed25519 => "ed25519",
            Algorithm::HmacSha256 => "hmac-sha256",
        }
    }

    /// Whether the public material alone can verify a signature
    pub fn is_asymmetric(&self) -> bool {
        matches!(self, Algorithm::Ed25519)
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Algorithm {
    type Err = GumdropError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ed25519" => Ok(Algorithm::Ed25519),
            "hmac-sha256" | "hmac" => Ok(Algorithm::HmacSha256),
            _ => Err(GumdropError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

/// First 16 hex characters of SHA-256 over the given bytes
pub fn short_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex::encode(digest)[..SHORT_ID_LEN].to_string()
}

/// Derive public material from private material
pub fn derive_public(algorithm: Algorithm, private: &[u8]) -> Result<Vec<u8>> {
    match algorithm {
        Algorithm::Ed25519 => Ok(signing_key(private)?.verifying_key().to_bytes().to_vec()),
        Algorithm::HmacSha256 => {
            let mut hasher = Sha256::new();
            hasher.update(LEGACY_PUBLIC_PREFIX);
            hasher.update(private);
            Ok(hasher.finalize().to_vec())
        }
    }
}

pub(crate) fn signing_key(private: &[u8]) -> Result<SigningKey> {
    let seed: [u8; PRIVATE_KEY_LEN] = private.try_into().map_err(|_| GumdropError::InvalidKey {
        reason: format!(
            "ed25519 private key must be {} bytes, got {}",
            PRIVATE_KEY_LEN,
            private.len()
        ),
    })?;
    Ok(SigningKey::from_bytes(&seed))
}

/// A private/public key pair used to sign cartridges
#[derive(Clone, PartialEq, Eq)]
pub struct KeyPair {
    private_material: Vec<u8>,
    public_material: Vec<u8>,
    key_id: String,
    algorithm: Algorithm,
}

impl KeyPair {
    /// Generate a fresh keypair from the OS random source
    pub fn generate(algorithm: Algorithm, key_id: Option<&str>) -> Result<Self> {
        let mut private = vec![0u8; PRIVATE_KEY_LEN];
        OsRng.fill_bytes(&mut private);
        let public = derive_public(algorithm, &private)?;
        Self::from_parts(private, public, key_id, algorithm)
    }

    /// Assemble a keypair, checking the public material matches the private
    pub fn from_parts(private: Vec<u8>, public: Vec<u8>, key_id: Option<&str>, algorithm: Algorithm) -> Result<Self> {
        let expected = derive_public(algorithm, &private)?;
        if expected != public {
            return Err(GumdropError::InvalidKey {
                reason: "public material does not match private material".to_string(),
            }
            .into());
        }

        let key_id = match key_id {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => short_hash(&public),
        };

        Ok(Self {
            private_material: private,
            public_material: public,
            key_id,
            algorithm,
        })
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn public_material(&self) -> &[u8] {
        &self.public_material
    }

    pub(crate) fn private_material(&self) -> &[u8] {
        &self.private_material
    }

    pub fn public_hex(&self) -> String {
        hex::encode(&self.public_material)
    }

    pub(crate) fn private_hex(&self) -> String {
        hex::encode(&self.private_material)
    }

    /// Short fingerprint of the public material, used as the owner token
    pub fn fingerprint(&self) -> String {
        short_hash(&self.public_material)
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("key_id", &self.key_id)
            .field("algorithm", &self.algorithm)
            .field("public_material", &self.public_hex())
            .field("private_material", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_derives_key_id_from_public() {
        let kp = KeyPair::generate(Algorithm::Ed25519, None).unwrap();
        assert_eq!(kp.key_id(), short_hash(kp.public_material()));
        assert_eq!(kp.key_id().len(), SHORT_ID_LEN);
        assert_eq!(kp.fingerprint(), kp.key_id());
    }

    #[test]
    fn test_generate_with_explicit_key_id() {
        let kp = KeyPair::generate(Algorithm::Ed25519, Some("work-laptop")).unwrap();
        assert_eq!(kp.key_id(), "work-laptop");
        // fingerprint still tracks the public material
        assert_eq!(kp.fingerprint(), short_hash(kp.public_material()));
    }

    #[test]
    fn test_generated_keys_differ() {
        let a = KeyPair::generate(Algorithm::Ed25519, None).unwrap();
        let b = KeyPair::generate(Algorithm::Ed25519, None).unwrap();
        assert_ne!(a.public_material(), b.public_material());
    }

    #[test]
    fn test_legacy_public_is_prefixed_hash() {
        let private = vec![7u8; PRIVATE_KEY_LEN];
        let public = derive_public(Algorithm::HmacSha256, &private).unwrap();

        let mut hasher = Sha256::new();
        hasher.update(b"gumdrop-pub:");
        hasher.update(&private);
        assert_eq!(public, hasher.finalize().to_vec());
    }

    #[test]
    fn test_from_parts_rejects_mismatched_public() {
        let kp = KeyPair::generate(Algorithm::Ed25519, None).unwrap();
        let other = KeyPair::generate(Algorithm::Ed25519, None).unwrap();
        let result = KeyPair::from_parts(
            kp.private_material().to_vec(),
            other.public_material().to_vec(),
            None,
            Algorithm::Ed25519,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_ed25519_rejects_short_private() {
        assert!(derive_public(Algorithm::Ed25519, &[1u8; 16]).is_err());
    }

    #[test]
    fn test_debug_redacts_private() {
        let kp = KeyPair::generate(Algorithm::Ed25519, None).unwrap();
        let debug = format!("{:?}", kp);
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains(&kp.private_hex()));
    }

    #[test]
    fn test_algorithm_parse() {
        assert_eq!("ED25519".parse::<Algorithm>().unwrap(), Algorithm::Ed25519);
        assert_eq!("hmac-sha256".parse::<Algorithm>().unwrap(), Algorithm::HmacSha256);
        assert!("rsa".parse::<Algorithm>().is_err());
    }
}
