//! Signing and verification of cartridge identity
//!
//! The signature covers the identity block, the personality block, the
//! directives and the signer's public material. Memory, auth timestamps and
//! the signature block itself are outside the covered set, so those can change
//! after signing without invalidating it.

use ed25519_dalek::{Signature, Signer as _, Verifier, VerifyingKey};
use eyre::Result;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use sha2::Sha256;

use super::keypair::{Algorithm, KeyPair, signing_key};
use crate::canonical;
use crate::identity::Identity;
use crate::schema;

/// Version tag embedded in every signature payload and block
pub const SIGNATURE_VERSION: &str = "1";

type HmacSha256 = Hmac<Sha256>;

/// Signature block stored alongside a signed cartridge
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureBlock {
    #[serde(rename = "version", alias = "protocol_version", default)]
    pub protocol_version: String,

    #[serde(rename = "algorithm", alias = "algorithm_id", default)]
    pub algorithm_id: String,

    #[serde(default)]
    pub key_id: String,

    /// Hex-encoded public material of the signer
    #[serde(rename = "public_key", alias = "public_material", default)]
    pub public_material: String,

    /// Hex-encoded signature over the canonical payload
    #[serde(rename = "signature", alias = "signature_value", default)]
    pub signature_value: String,

    #[serde(default)]
    pub signed_at: String,
}

/// Outcome of a cryptographic verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verification {
    /// No signature block is present
    Unsigned,
    /// The signature matches the recomputed payload
    Verified,
    /// A signature is present but does not match
    Invalid,
}

impl Verification {
    pub fn is_verified(&self) -> bool {
        matches!(self, Verification::Verified)
    }
}

impl std::fmt::Display for Verification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Verification::Unsigned => "unsigned",
            Verification::Verified => "verified",
            Verification::Invalid => "invalid",
        };
        write!(f, "{}", s)
    }
}

/// Outcome of a structure-only check. Says nothing about authenticity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StructuralCheck {
    Unsigned,
    /// Every required field of the block is present
    WellFormed,
    /// The block is missing required fields
    Malformed,
}

impl std::fmt::Display for StructuralCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StructuralCheck::Unsigned => "unsigned",
            StructuralCheck::WellFormed => "well-formed (not cryptographically verified)",
            StructuralCheck::Malformed => "malformed",
        };
        write!(f, "{}", s)
    }
}

/// Build the canonical bytes that are signed for an identity
pub fn canonical_payload(identity: &Identity, public_material: &[u8]) -> Vec<u8> {
    let traits: Map<String, Value> = identity
        .trait_numbers()
        .into_iter()
        .map(|(name, number)| (name, Value::Number(number)))
        .collect();

    let signable = json!({
        "v": SIGNATURE_VERSION,
        "identity": {
            "name": identity.name,
            "voice": identity.voice,
            "origin": identity.origin,
        },
        "personality": {
            "traits": traits,
            "quirks": identity.quirks,
        },
        "directives": identity.directives,
        "public_key": hex::encode(public_material),
    });

    canonical::to_vec(&signable)
}

/// Sign an identity with a keypair
pub fn sign(identity: &Identity, keypair: &KeyPair) -> Result<SignatureBlock> {
    let payload = canonical_payload(identity, keypair.public_material());

    let signature = match keypair.algorithm() {
        Algorithm::Ed25519 => {
            let key = signing_key(keypair.private_material())?;
            key.sign(&payload).to_bytes().to_vec()
        }
        Algorithm::HmacSha256 => {
            let mut mac = HmacSha256::new_from_slice(keypair.private_material())
                .map_err(|e| eyre::eyre!("Invalid HMAC key: {}", e))?;
            mac.update(&payload);
            mac.finalize().into_bytes().to_vec()
        }
    };

    log::debug!(
        "Signed {} byte payload with {} key {}",
        payload.len(),
        keypair.algorithm(),
        keypair.key_id()
    );

    Ok(SignatureBlock {
        protocol_version: SIGNATURE_VERSION.to_string(),
        algorithm_id: keypair.algorithm().as_str().to_string(),
        key_id: keypair.key_id().to_string(),
        public_material: keypair.public_hex(),
        signature_value: hex::encode(signature),
        signed_at: schema::now_timestamp(),
    })
}

/// Decoded parts of a block, or None when it cannot be interpreted
struct DecodedBlock {
    algorithm: Algorithm,
    public: Vec<u8>,
    signature: Vec<u8>,
}

fn decode(block: &SignatureBlock) -> Option<DecodedBlock> {
    let algorithm = match block.algorithm_id.parse::<Algorithm>() {
        Ok(a) => a,
        Err(e) => {
            log::warn!("{}", e);
            return None;
        }
    };
    let public = hex::decode(&block.public_material)
        .map_err(|e| log::warn!("Signature block public key is not valid hex: {}", e))
        .ok()?;
    let signature = hex::decode(&block.signature_value)
        .map_err(|e| log::warn!("Signature value is not valid hex: {}", e))
        .ok()?;
    Some(DecodedBlock {
        algorithm,
        public,
        signature,
    })
}

fn verify_ed25519(public: &[u8], payload: &[u8], signature: &[u8]) -> bool {
    let Ok(key_bytes) = <[u8; 32]>::try_from(public) else {
        return false;
    };
    let Ok(key) = VerifyingKey::from_bytes(&key_bytes) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(signature) else {
        return false;
    };
    key.verify(payload, &signature).is_ok()
}

/// Full verification using the caller's keypair.
///
/// The payload is rebuilt with the public material recorded in the block.
/// Ed25519 signatures are checked against the caller's public key; legacy
/// HMAC signatures are recomputed with the caller's private key and compared
/// in constant time.
pub fn verify_with_key(identity: &Identity, block: &SignatureBlock, keypair: &KeyPair) -> Verification {
    let Some(decoded) = decode(block) else {
        return Verification::Invalid;
    };

    if decoded.algorithm != keypair.algorithm() {
        log::info!(
            "Signature algorithm {} does not match key algorithm {}",
            decoded.algorithm,
            keypair.algorithm()
        );
        return Verification::Invalid;
    }

    let payload = canonical_payload(identity, &decoded.public);

    let matches = match decoded.algorithm {
        Algorithm::Ed25519 => verify_ed25519(keypair.public_material(), &payload, &decoded.signature),
        Algorithm::HmacSha256 => match HmacSha256::new_from_slice(keypair.private_material()) {
            Ok(mut mac) => {
                mac.update(&payload);
                mac.verify_slice(&decoded.signature).is_ok()
            }
            Err(_) => false,
        },
    };

    if matches {
        Verification::Verified
    } else {
        log::info!("Signature by {} did not verify with key {}", block.key_id, keypair.key_id());
        Verification::Invalid
    }
}

/// Verification with public material only.
///
/// Only meaningful for ed25519; a legacy HMAC signature cannot be checked
/// without the private key and is reported invalid.
pub fn verify_with_public_key(identity: &Identity, block: &SignatureBlock, public_material: &[u8]) -> Verification {
    let Some(decoded) = decode(block) else {
        return Verification::Invalid;
    };

    if !decoded.algorithm.is_asymmetric() {
        log::warn!(
            "{} signatures need the private key to verify; use a keypair instead",
            decoded.algorithm
        );
        return Verification::Invalid;
    }

    let payload = canonical_payload(identity, &decoded.public);
    if verify_ed25519(public_material, &payload, &decoded.signature) {
        Verification::Verified
    } else {
        Verification::Invalid
    }
}

/// Check that every required field of the block is present
pub fn check_structure(block: &SignatureBlock) -> StructuralCheck {
    let required = [
        &block.protocol_version,
        &block.algorithm_id,
        &block.key_id,
        &block.public_material,
        &block.signature_value,
    ];
    if required.iter().all(|field| !field.is_empty()) {
        StructuralCheck::WellFormed
    } else {
        StructuralCheck::Malformed
    }
}
