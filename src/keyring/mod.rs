//! Keyring: on-disk keystore of signing keypairs
//!
//! A keystore is a directory holding one `<key_id>.json` entry per key. The
//! handle is explicit, so tests and tools can use independent keystores side
//! by side. Entries are written once through a temp file and an atomic
//! no-clobber rename, restricted to the owning user, and never edited in place.

pub mod keypair;
pub mod signer;

use eyre::{Context, Result};
use lazy_regex::regex_is_match;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub use keypair::{Algorithm, KeyPair};
pub use signer::{SignatureBlock, StructuralCheck, Verification};

use crate::error::GumdropError;
use crate::schema;

/// Explicit acknowledgement required to delete a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Unconfirmed,
}

/// Keystore entry file layout
#[derive(Debug, Clone, Serialize, Deserialize)]
struct KeyEntry {
    key_id: String,
    #[serde(alias = "public_material")]
    public_key: String,
    #[serde(alias = "private_material")]
    private_key: String,
    #[serde(default)]
    created_at: String,
    /// Entries written before ed25519 support carry no algorithm field
    #[serde(alias = "algorithm_id", default = "legacy_algorithm")]
    algorithm: String,
}

fn legacy_algorithm() -> String {
    Algorithm::HmacSha256.as_str().to_string()
}

impl KeyEntry {
    fn from_keypair(keypair: &KeyPair) -> Self {
        Self {
            key_id: keypair.key_id().to_string(),
            public_key: keypair.public_hex(),
            private_key: keypair.private_hex(),
            created_at: schema::now_timestamp(),
            algorithm: keypair.algorithm().as_str().to_string(),
        }
    }

    fn into_keypair(self) -> Result<KeyPair> {
        let algorithm: Algorithm = self.algorithm.parse()?;
        let private = hex::decode(&self.private_key).context("Private key is not valid hex")?;
        let public = hex::decode(&self.public_key).context("Public key is not valid hex")?;
        KeyPair::from_parts(private, public, Some(&self.key_id), algorithm)
    }
}

/// Summary of a stored key, without private material
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyInfo {
    pub key_id: String,
    pub created_at: String,
    pub algorithm: String,
    pub fingerprint: String,
}

/// Key ids become file names, so keep them to a safe alphabet
pub fn validate_key_id(key_id: &str) -> Result<()> {
    if regex_is_match!(r"^[A-Za-z0-9_-]{1,64}$", key_id) {
        Ok(())
    } else {
        Err(GumdropError::InvalidKey {
            reason: format!("key id '{}' must be 1-64 characters of [A-Za-z0-9_-]", key_id),
        }
        .into())
    }
}

/// Handle on a keystore directory
#[derive(Debug, Clone)]
pub struct Keyring {
    dir: PathBuf,
}

impl Keyring {
    /// Open a keystore, creating the directory if needed
    pub fn open<P: Into<PathBuf>>(dir: P) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).with_context(|| format!("Failed to create keystore: {}", dir.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&dir, fs::Permissions::from_mode(0o700))
                .with_context(|| format!("Failed to restrict keystore permissions: {}", dir.display()))?;
        }

        log::debug!("Opened keystore at {}", dir.display());
        Ok(Self { dir })
    }

    /// Handle on an existing keystore. Nothing is created and permissions
    /// are left as found, so the directory can be inspected as-is.
    pub fn existing<P: Into<PathBuf>>(dir: P) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(GumdropError::NotFound { what: "Keystore", path: dir }.into());
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key_id))
    }

    /// Generate an ed25519 keypair and persist it
    pub fn generate(&self, key_id: Option<&str>) -> Result<KeyPair> {
        self.generate_with(Algorithm::Ed25519, key_id)
    }

    /// Generate a keypair with a chosen algorithm and persist it
    pub fn generate_with(&self, algorithm: Algorithm, key_id: Option<&str>) -> Result<KeyPair> {
        if let Some(id) = key_id {
            validate_key_id(id)?;
        }
        let keypair = KeyPair::generate(algorithm, key_id)?;
        self.store(&keypair)?;
        log::info!("Generated {} key {}", algorithm, keypair.key_id());
        Ok(keypair)
    }

    /// Persist a keypair. Fails if an entry with the same id exists.
    pub fn store(&self, keypair: &KeyPair) -> Result<PathBuf> {
        validate_key_id(keypair.key_id())?;
        let target = self.entry_path(keypair.key_id());
        if target.exists() {
            return Err(GumdropError::KeyExists {
                key_id: keypair.key_id().to_string(),
            }
            .into());
        }

        let content = serde_json::to_string_pretty(&KeyEntry::from_keypair(keypair))?;

        let mut temp = tempfile::NamedTempFile::new_in(&self.dir)
            .with_context(|| format!("Failed to create temp file in {}", self.dir.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(temp.path(), fs::Permissions::from_mode(0o600))
                .context("Failed to restrict key file permissions")?;
        }

        temp.write_all(content.as_bytes()).context("Failed to write key entry")?;
        temp.as_file().sync_all().context("Failed to sync key entry")?;

        temp.persist_noclobber(&target).map_err(|e| {
            if e.error.kind() == std::io::ErrorKind::AlreadyExists {
                eyre::Report::from(GumdropError::KeyExists {
                    key_id: keypair.key_id().to_string(),
                })
            } else {
                eyre::Report::from(e.error).wrap_err(format!("Failed to write key file: {}", target.display()))
            }
        })?;

        Ok(target)
    }

    /// Load a keypair by id; `None` when no entry exists
    pub fn load(&self, key_id: &str) -> Result<Option<KeyPair>> {
        validate_key_id(key_id)?;
        let path = self.entry_path(key_id);
        if !path.exists() {
            return Ok(None);
        }

        let content =
            fs::read_to_string(&path).with_context(|| format!("Failed to read key file: {}", path.display()))?;
        let entry: KeyEntry =
            serde_json::from_str(&content).with_context(|| format!("Failed to parse key file: {}", path.display()))?;
        let keypair = entry
            .into_keypair()
            .with_context(|| format!("Invalid key file: {}", path.display()))?;

        Ok(Some(keypair))
    }

    /// Load a keypair by id, failing with `NotFound` if absent
    pub fn require(&self, key_id: &str) -> Result<KeyPair> {
        self.load(key_id)?.ok_or_else(|| {
            GumdropError::NotFound {
                what: "Key",
                path: self.entry_path(key_id),
            }
            .into()
        })
    }

    /// List stored keys sorted by id, skipping unreadable entries
    pub fn list(&self) -> Result<Vec<KeyInfo>> {
        let mut keys = Vec::new();

        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read keystore: {}", self.dir.display()))?;

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().map(|e| e != "json").unwrap_or(true) {
                continue;
            }

            let parsed = fs::read_to_string(&path)
                .map_err(eyre::Report::from)
                .and_then(|content| serde_json::from_str::<KeyEntry>(&content).map_err(eyre::Report::from));

            match parsed {
                Ok(key) => {
                    let fingerprint = match hex::decode(&key.public_key) {
                        Ok(public) => keypair::short_hash(&public),
                        Err(e) => {
                            log::warn!("Skipping key file {} with invalid public key: {}", path.display(), e);
                            continue;
                        }
                    };
                    keys.push(KeyInfo {
                        key_id: key.key_id,
                        created_at: if key.created_at.is_empty() {
                            "unknown".to_string()
                        } else {
                            key.created_at
                        },
                        algorithm: key.algorithm,
                        fingerprint,
                    });
                }
                Err(e) => {
                    log::warn!("Skipping malformed key file {}: {}", path.display(), e);
                }
            }
        }

        keys.sort_by(|a, b| a.key_id.cmp(&b.key_id));
        Ok(keys)
    }

    /// Delete a keypair. Irreversible: cartridges bound to this key can no
    /// longer be re-signed, and legacy HMAC signatures can no longer be verified.
    pub fn delete(&self, key_id: &str, confirm: Confirmation) -> Result<bool> {
        validate_key_id(key_id)?;
        if confirm != Confirmation::Confirmed {
            return Err(GumdropError::DestructiveOperation {
                key_id: key_id.to_string(),
            }
            .into());
        }

        let path = self.entry_path(key_id);
        if !path.exists() {
            return Ok(false);
        }

        fs::remove_file(&path).with_context(|| format!("Failed to delete key file: {}", path.display()))?;
        log::warn!("Deleted key {}", key_id);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_is_idempotent() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join("keys");
        Keyring::open(&dir).unwrap();
        Keyring::open(&dir).unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn test_generate_persists_and_loads() {
        let temp = tempdir().unwrap();
        let keyring = Keyring::open(temp.path()).unwrap();

        let kp = keyring.generate(None).unwrap();
        assert!(temp.path().join(format!("{}.json", kp.key_id())).exists());

        let loaded = keyring.load(kp.key_id()).unwrap().unwrap();
        assert_eq!(loaded, kp);
    }

    #[cfg(unix)]
    #[test]
    fn test_key_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempdir().unwrap();
        let keyring = Keyring::open(temp.path()).unwrap();
        let kp = keyring.generate(None).unwrap();

        let mode = fs::metadata(temp.path().join(format!("{}.json", kp.key_id())))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_entries_are_never_overwritten() {
        let temp = tempdir().unwrap();
        let keyring = Keyring::open(temp.path()).unwrap();
        keyring.generate(Some("main")).unwrap();

        let err = keyring.generate(Some("main")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GumdropError>(),
            Some(GumdropError::KeyExists { .. })
        ));
    }

    #[test]
    fn test_load_missing_is_none() {
        let temp = tempdir().unwrap();
        let keyring = Keyring::open(temp.path()).unwrap();
        assert!(keyring.load("nope").unwrap().is_none());
        assert!(GumdropError::is_not_found(&keyring.require("nope").unwrap_err()));
    }

    #[test]
    fn test_rejects_path_like_key_ids() {
        let temp = tempdir().unwrap();
        let keyring = Keyring::open(temp.path()).unwrap();
        assert!(keyring.load("../etc/passwd").is_err());
        assert!(keyring.generate(Some("a/b")).is_err());
    }

    #[test]
    fn test_list_skips_malformed() {
        let temp = tempdir().unwrap();
        let keyring = Keyring::open(temp.path()).unwrap();
        let b = keyring.generate(Some("bravo")).unwrap();
        let a = keyring.generate_with(Algorithm::HmacSha256, Some("alpha")).unwrap();
        fs::write(temp.path().join("broken.json"), "{ not json").unwrap();
        fs::write(temp.path().join("notes.txt"), "ignored").unwrap();

        let keys = keyring.list().unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].key_id, "alpha");
        assert_eq!(keys[0].algorithm, "hmac-sha256");
        assert_eq!(keys[0].fingerprint, a.fingerprint());
        assert_eq!(keys[1].key_id, "bravo");
        assert_eq!(keys[1].fingerprint, b.fingerprint());
    }

    #[test]
    fn test_list_skips_invalid_public_key() {
        let temp = tempdir().unwrap();
        let keyring = Keyring::open(temp.path()).unwrap();
        keyring.generate(Some("good")).unwrap();
        let entry = serde_json::json!({
            "key_id": "garbled",
            "public_key": "not-hex",
            "private_key": "00",
            "algorithm": "ed25519",
        });
        fs::write(temp.path().join("garbled.json"), entry.to_string()).unwrap();

        let keys = keyring.list().unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].key_id, "good");
        assert!(!keys[0].fingerprint.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_existing_leaves_permissions_alone() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempdir().unwrap();
        let dir = temp.path().join("keys");
        fs::create_dir(&dir).unwrap();
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o755)).unwrap();

        let keyring = Keyring::existing(&dir).unwrap();
        assert!(keyring.list().unwrap().is_empty());
        let mode = fs::metadata(&dir).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn test_existing_requires_directory() {
        let temp = tempdir().unwrap();
        let err = Keyring::existing(temp.path().join("missing")).unwrap_err();
        assert!(GumdropError::is_not_found(&err));
        assert!(!temp.path().join("missing").exists());
    }

    #[test]
    fn test_delete_requires_confirmation() {
        let temp = tempdir().unwrap();
        let keyring = Keyring::open(temp.path()).unwrap();
        let kp = keyring.generate(None).unwrap();

        let err = keyring.delete(kp.key_id(), Confirmation::Unconfirmed).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GumdropError>(),
            Some(GumdropError::DestructiveOperation { .. })
        ));
        assert!(keyring.load(kp.key_id()).unwrap().is_some());

        assert!(keyring.delete(kp.key_id(), Confirmation::Confirmed).unwrap());
        assert!(keyring.load(kp.key_id()).unwrap().is_none());
        assert!(!keyring.delete(kp.key_id(), Confirmation::Confirmed).unwrap());
    }

    #[test]
    fn test_loads_legacy_entry_without_algorithm() {
        let temp = tempdir().unwrap();
        let keyring = Keyring::open(temp.path()).unwrap();

        let private = [3u8; 32];
        let public = keypair::derive_public(Algorithm::HmacSha256, &private).unwrap();
        let entry = serde_json::json!({
            "key_id": "legacy",
            "public_key": hex::encode(&public),
            "private_key": hex::encode(private),
            "created_at": "2025-01-01T00:00:00+00:00",
        });
        fs::write(temp.path().join("legacy.json"), entry.to_string()).unwrap();

        let kp = keyring.require("legacy").unwrap();
        assert_eq!(kp.algorithm(), Algorithm::HmacSha256);
        assert_eq!(kp.public_material(), public.as_slice());
    }
}
