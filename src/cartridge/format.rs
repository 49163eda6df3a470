//! On-disk cartridge layout
//!
//! Field names follow the stored `.gdp` files. Every top-level section is
//! optional on read so a partial file can be loaded and filled from defaults.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Number;

use crate::keyring::SignatureBlock;
use crate::schema;

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct CartridgeFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<IdentitySection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personality: Option<PersonalitySection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directives: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<SignatureBlock>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct IdentitySection {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub voice: String,
    #[serde(default)]
    pub origin: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct PersonalitySection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traits: Option<IndexMap<String, Number>>,
    #[serde(default)]
    pub quirks: Vec<String>,
}

/// Where and how the cartridge's memory store lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryDescriptor {
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_encryption")]
    pub encryption: String,
    /// Empty until the cartridge is first saved
    #[serde(default)]
    pub path: String,
}

impl Default for MemoryDescriptor {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            encryption: default_encryption(),
            path: String::new(),
        }
    }
}

fn default_backend() -> String {
    schema::DEFAULT_MEMORY_BACKEND.to_string()
}

fn default_encryption() -> String {
    schema::DEFAULT_MEMORY_ENCRYPTION.to_string()
}

/// Ownership and access bookkeeping
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthBlock {
    /// Creation nonce hash, replaced by the signing key fingerprint on sign
    #[serde(rename = "owner_hash", alias = "owner_token", default)]
    pub owner_token: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub last_accessed: String,
    /// Hex public material of the last signer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_parses() {
        let file: CartridgeFile = serde_json::from_str("{}").unwrap();
        assert!(file.version.is_none());
        assert!(file.identity.is_none());
        assert!(file.signature.is_none());
    }

    #[test]
    fn test_memory_descriptor_defaults() {
        let memory: MemoryDescriptor = serde_json::from_str("{}").unwrap();
        assert_eq!(memory.backend, "local");
        assert_eq!(memory.encryption, "none");
        assert!(memory.path.is_empty());
    }

    #[test]
    fn test_auth_accepts_both_owner_names() {
        let stored: AuthBlock = serde_json::from_str(r#"{"owner_hash": "abcd"}"#).unwrap();
        let aliased: AuthBlock = serde_json::from_str(r#"{"owner_token": "abcd"}"#).unwrap();
        assert_eq!(stored.owner_token, "abcd");
        assert_eq!(aliased.owner_token, "abcd");

        let json = serde_json::to_string(&stored).unwrap();
        assert!(json.contains("\"owner_hash\""));
        assert!(!json.contains("public_key"));
    }

    #[test]
    fn test_personality_keeps_trait_order() {
        let p: PersonalitySection =
            serde_json::from_str(r#"{"traits": {"zeal": 0.9, "warmth": 0.2, "humor": 1}}"#).unwrap();
        let keys: Vec<&String> = p.traits.as_ref().unwrap().keys().collect();
        assert_eq!(keys, vec!["zeal", "warmth", "humor"]);
        let traits = p.traits.unwrap();
        assert_eq!(traits["humor"].as_u64(), Some(1));
        assert_eq!(traits["warmth"].as_f64(), Some(0.2));
    }
}
