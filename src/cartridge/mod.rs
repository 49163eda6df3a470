//! Cartridge container
//!
//! A cartridge is a single `.gdp` JSON file holding an AI identity, its
//! ownership record, an optional signature and a pointer to its memory
//! store. The container tracks whether it changed since the last save and
//! whether a signed field changed since the last signature.

pub mod format;

use eyre::{Context, Result, bail, eyre};
use rand::RngCore;
use rand::rngs::OsRng;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::GumdropError;
use crate::identity::{Identity, TraitMap};
use crate::keyring::keypair::short_hash;
use crate::keyring::{KeyPair, SignatureBlock, StructuralCheck, Verification, signer};
use crate::memory::{FileMemory, MemoryStore};
use crate::prompt::PromptSource;
use crate::schema;

use format::{CartridgeFile, IdentitySection, PersonalitySection};
pub use format::{AuthBlock, MemoryDescriptor};

/// A mutable part of the cartridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Voice,
    Origin,
    Traits,
    Quirks,
    Directives,
    MemoryPath,
}

impl Field {
    /// Whether changing this field invalidates an existing signature
    pub fn is_signature_covered(&self) -> bool {
        !matches!(self, Field::MemoryPath)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Voice => "voice",
            Field::Origin => "origin",
            Field::Traits => "traits",
            Field::Quirks => "quirks",
            Field::Directives => "directives",
            Field::MemoryPath => "memory.path",
        }
    }
}

/// Signature state as known without a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustStatus {
    Unsigned,
    Signed,
    /// Signed, but a covered field changed afterwards
    Stale,
}

impl std::fmt::Display for TrustStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TrustStatus::Unsigned => "unsigned",
            TrustStatus::Signed => "signed",
            TrustStatus::Stale => "signed (modified since signing)",
        };
        write!(f, "{}", s)
    }
}

/// Fresh owner token: short hash of 32 random bytes
fn new_owner_token() -> String {
    let mut nonce = [0u8; 32];
    OsRng.fill_bytes(&mut nonce);
    short_hash(&nonce)
}

/// Builder for a brand new cartridge
#[derive(Debug, Clone, Default)]
pub struct CartridgeBuilder {
    name: String,
    voice: Option<String>,
    origin: Option<String>,
    traits: TraitMap,
    directives: Vec<String>,
    quirks: Vec<String>,
}

impl CartridgeBuilder {
    pub fn voice(mut self, voice: &str) -> Self {
        self.voice = Some(voice.to_string());
        self
    }

    pub fn origin(mut self, origin: &str) -> Self {
        self.origin = Some(origin.to_string());
        self
    }

    /// Trait overrides, merged over the defaults
    pub fn traits(mut self, traits: TraitMap) -> Self {
        self.traits = traits;
        self
    }

    pub fn trait_value(mut self, name: &str, value: f64) -> Self {
        self.traits.insert(name.to_string(), value);
        self
    }

    /// Directives; an empty list falls back to the defaults
    pub fn directives(mut self, directives: Vec<String>) -> Self {
        self.directives = directives;
        self
    }

    pub fn quirks(mut self, quirks: Vec<String>) -> Self {
        self.quirks = quirks;
        self
    }

    pub fn build(self) -> Cartridge {
        let directives = if self.directives.is_empty() {
            schema::default_directives()
        } else {
            self.directives
        };
        let voice = self.voice.unwrap_or_else(|| schema::DEFAULT_VOICE.to_string());
        let origin = self.origin.unwrap_or_else(|| schema::DEFAULT_ORIGIN.to_string());

        let identity =
            Identity::from_raw(&self.name, &voice, &origin, None, self.quirks, directives).with_traits(&self.traits);

        let now = schema::now_timestamp();
        let auth = AuthBlock {
            owner_token: new_owner_token(),
            created_at: now.clone(),
            last_accessed: now,
            public_key: None,
        };

        log::info!("Created cartridge {}", identity.name);

        Cartridge {
            version: schema::CARTRIDGE_VERSION.to_string(),
            identity,
            memory_descriptor: MemoryDescriptor::default(),
            auth,
            signature: None,
            path: None,
            memory: None,
            modified: true,
            covered_touched: false,
            defaulted: Vec::new(),
            fact_limit: schema::DEFAULT_FACT_LIMIT,
        }
    }
}

/// A portable AI identity
pub struct Cartridge {
    version: String,
    identity: Identity,
    memory_descriptor: MemoryDescriptor,
    auth: AuthBlock,
    signature: Option<SignatureBlock>,
    path: Option<PathBuf>,
    memory: Option<Box<dyn MemoryStore>>,
    modified: bool,
    covered_touched: bool,
    defaulted: Vec<&'static str>,
    fact_limit: usize,
}

impl std::fmt::Debug for Cartridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cartridge")
            .field("version", &self.version)
            .field("identity", &self.identity)
            .field("memory_descriptor", &self.memory_descriptor)
            .field("auth", &self.auth)
            .field("signature", &self.signature)
            .field("path", &self.path)
            .field("memory_attached", &self.memory.is_some())
            .field("modified", &self.modified)
            .finish()
    }
}

impl Cartridge {
    /// Start building a new cartridge
    pub fn builder(name: &str) -> CartridgeBuilder {
        CartridgeBuilder {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// New cartridge with default voice, origin, traits and directives
    pub fn create(name: &str) -> Self {
        Self::builder(name).build()
    }

    /// Load a cartridge from disk
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(GumdropError::NotFound {
                what: "Cartridge",
                path: path.to_path_buf(),
            }
            .into());
        }

        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read cartridge: {}", path.display()))?;
        let mut cartridge =
            Self::from_json(&content).with_context(|| format!("Failed to parse cartridge: {}", path.display()))?;

        cartridge.path = Some(path.to_path_buf());
        log::debug!("Loaded cartridge {} from {}", cartridge.identity.name, path.display());
        Ok(cartridge)
    }

    /// Parse cartridge JSON, filling any missing section from defaults
    pub fn from_json(content: &str) -> Result<Self> {
        let file: CartridgeFile = serde_json::from_str(content)?;
        let mut defaulted = Vec::new();

        let version = match file.version.as_deref() {
            Some(v) => {
                let (resolved, supported) = schema::resolve_version(Some(v));
                if !supported {
                    log::warn!("Unknown cartridge version {}, reading as {}", v, resolved);
                }
                resolved.to_string()
            }
            None => {
                defaulted.push("version");
                schema::CARTRIDGE_VERSION.to_string()
            }
        };

        let identity_section = file.identity.unwrap_or_else(|| {
            defaulted.push("identity");
            IdentitySection::default()
        });
        let personality = file.personality.unwrap_or_else(|| {
            defaulted.push("personality");
            PersonalitySection::default()
        });
        let directives = file.directives.unwrap_or_else(|| {
            defaulted.push("directives");
            schema::default_directives()
        });
        let memory_descriptor = file.memory.unwrap_or_else(|| {
            defaulted.push("memory");
            MemoryDescriptor::default()
        });
        let mut auth = file.auth.unwrap_or_else(|| {
            defaulted.push("auth");
            AuthBlock {
                owner_token: new_owner_token(),
                created_at: schema::now_timestamp(),
                ..Default::default()
            }
        });
        auth.last_accessed = schema::now_timestamp();

        for field in &defaulted {
            log::warn!("Cartridge is missing '{}', using defaults", field);
        }

        let identity = Identity::from_stored(
            &identity_section.name,
            &identity_section.voice,
            &identity_section.origin,
            personality.traits,
            personality.quirks,
            directives,
        );

        Ok(Self {
            version,
            identity,
            memory_descriptor,
            auth,
            signature: file.signature,
            path: None,
            memory: None,
            modified: false,
            covered_touched: false,
            defaulted,
            fact_limit: schema::DEFAULT_FACT_LIMIT,
        })
    }

    /// Serialized form as written by `save`
    pub fn to_json(&self) -> Result<String> {
        let file = CartridgeFile {
            version: Some(self.version.clone()),
            identity: Some(IdentitySection {
                name: self.identity.name.clone(),
                voice: self.identity.voice.clone(),
                origin: self.identity.origin.clone(),
            }),
            personality: Some(PersonalitySection {
                traits: Some(self.identity.trait_numbers()),
                quirks: self.identity.quirks.clone(),
            }),
            directives: Some(self.identity.directives.clone()),
            memory: Some(self.memory_descriptor.clone()),
            auth: Some(self.auth.clone()),
            signature: self.signature.clone(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Write the cartridge. Without a path the last load/save path is reused.
    pub fn save(&mut self, path: Option<&Path>) -> Result<PathBuf> {
        let dest = match path.or(self.path.as_deref()) {
            Some(p) => p.to_path_buf(),
            None => bail!("No path to save cartridge {} to", self.identity.name),
        };

        self.auth.last_accessed = schema::now_timestamp();
        if self.memory_descriptor.path.is_empty() {
            self.memory_descriptor.path = dest
                .with_extension(schema::MEMORY_EXTENSION)
                .to_string_lossy()
                .into_owned();
        }

        let dir = dest
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).with_context(|| format!("Failed to create directory: {}", dir.display()))?;

        let content = self.to_json()?;
        let mut temp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
        temp.write_all(content.as_bytes()).context("Failed to write cartridge")?;
        temp.as_file().sync_all().context("Failed to sync cartridge")?;
        temp.persist(&dest)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to write cartridge: {}", dest.display()))?;

        if let Some(memory) = self.memory.as_mut() {
            memory.bind_path(Path::new(&self.memory_descriptor.path))?;
            memory.flush()?;
        }

        log::info!("Saved cartridge {} to {}", self.identity.name, dest.display());
        self.path = Some(dest.clone());
        self.modified = false;
        Ok(dest)
    }

    // --- signing ---

    /// Sign with a keypair; the owner token becomes the key fingerprint
    pub fn sign(&mut self, keypair: &KeyPair) -> Result<&SignatureBlock> {
        let block = signer::sign(&self.identity, keypair)?;
        self.auth.public_key = Some(keypair.public_hex());
        self.auth.owner_token = keypair.fingerprint();
        self.covered_touched = false;
        self.modified = true;
        log::info!("Signed cartridge {} with key {}", self.identity.name, keypair.key_id());
        Ok(self.signature.insert(block))
    }

    /// Verify against a keypair
    pub fn verify(&self, keypair: &KeyPair) -> Verification {
        match &self.signature {
            Some(block) => signer::verify_with_key(&self.identity, block, keypair),
            None => Verification::Unsigned,
        }
    }

    /// Verify against a bare public key (ed25519 signatures only)
    pub fn verify_public(&self, public_material: &[u8]) -> Verification {
        match &self.signature {
            Some(block) => signer::verify_with_public_key(&self.identity, block, public_material),
            None => Verification::Unsigned,
        }
    }

    /// Like `verify`, but an unsigned or invalid cartridge is an error
    pub fn require_verified(&self, keypair: &KeyPair) -> Result<()> {
        match self.verify(keypair) {
            Verification::Verified => Ok(()),
            Verification::Unsigned => Err(GumdropError::VerificationFailure {
                reason: format!("cartridge {} is not signed", self.identity.name),
            }
            .into()),
            Verification::Invalid => Err(GumdropError::VerificationFailure {
                reason: format!("signature does not match key {}", keypair.key_id()),
            }
            .into()),
        }
    }

    /// Check the signature block shape without any key
    pub fn check_signature_structure(&self) -> StructuralCheck {
        match &self.signature {
            Some(block) => signer::check_structure(block),
            None => StructuralCheck::Unsigned,
        }
    }

    pub fn trust_status(&self) -> TrustStatus {
        match (&self.signature, self.covered_touched) {
            (None, _) => TrustStatus::Unsigned,
            (Some(_), false) => TrustStatus::Signed,
            (Some(_), true) => TrustStatus::Stale,
        }
    }

    // --- prompt ---

    /// System prompt with up to `fact_limit` remembered facts
    pub fn compile_prompt(&self) -> String {
        self.compile_prompt_with_limit(self.fact_limit)
    }

    /// How many remembered facts `compile_prompt` includes. Not persisted.
    pub fn set_fact_limit(&mut self, limit: usize) {
        self.fact_limit = limit;
    }

    /// System prompt including at most `fact_limit` remembered facts
    pub fn compile_prompt_with_limit(&self, fact_limit: usize) -> String {
        let id = &self.identity;
        let mut lines = vec![format!("You are {}.", id.name)];

        if !id.voice.is_empty() {
            lines.push(format!("Your communication style: {}", id.voice));
        }
        if !id.origin.is_empty() {
            lines.push(format!("Background: {}", id.origin));
        }

        lines.push(format!("\nPersonality: {}", id.describe()));

        if !id.quirks.is_empty() {
            lines.push("\nQuirks:".to_string());
            lines.extend(id.quirks.iter().map(|q| format!("- {}", q)));
        }

        if !id.directives.is_empty() {
            lines.push("\nCore directives:".to_string());
            lines.extend(id.directives.iter().map(|d| format!("- {}", d)));
        }

        if let Some(memory) = self.memory.as_deref()
            && memory.has_memories()
        {
            lines.push("\nWhat you remember about the user:".to_string());
            lines.extend(
                memory
                    .get_recent_facts(fact_limit)
                    .into_iter()
                    .map(|fact| format!("- {}", fact)),
            );
        }

        lines.join("\n")
    }

    // --- memory ---

    /// Attach a memory store, replacing any current one
    pub fn attach_memory(&mut self, store: Box<dyn MemoryStore>) {
        self.memory = Some(store);
    }

    /// The attached store, opening the file-backed one on first use
    pub fn memory(&mut self) -> Result<&mut dyn MemoryStore> {
        if self.memory.is_none() {
            let store = match self.memory_path() {
                Some(path) => FileMemory::open(path)?,
                None => {
                    log::debug!("Cartridge {} has no memory path yet, using in-process memory", self.identity.name);
                    FileMemory::in_memory()
                }
            };
            self.memory = Some(Box::new(store));
        }
        match self.memory.as_deref_mut() {
            Some(store) => Ok(store),
            None => Err(eyre!("Memory store unavailable")),
        }
    }

    /// Resolved memory file location
    pub fn memory_path(&self) -> Option<PathBuf> {
        if !self.memory_descriptor.path.is_empty() {
            return Some(PathBuf::from(&self.memory_descriptor.path));
        }
        self.path
            .as_ref()
            .map(|p| p.with_extension(schema::MEMORY_EXTENSION))
    }

    // --- mutation ---

    fn touch(&mut self, field: Field) {
        self.modified = true;
        if field.is_signature_covered() && self.signature.is_some() && !self.covered_touched {
            log::debug!("Signed field {} changed on {}", field.as_str(), self.identity.name);
            self.covered_touched = true;
        }
    }

    pub fn set_name(&mut self, name: &str) {
        self.identity.name = name.to_string();
        self.touch(Field::Name);
    }

    pub fn set_voice(&mut self, voice: &str) {
        self.identity.voice = voice.to_string();
        self.touch(Field::Voice);
    }

    pub fn set_origin(&mut self, origin: &str) {
        self.identity.origin = origin.to_string();
        self.touch(Field::Origin);
    }

    /// Set a trait value, clamped into [0, 1]
    pub fn set_trait(&mut self, name: &str, value: f64) {
        self.identity.set_trait(name, value);
        self.touch(Field::Traits);
    }

    pub fn set_quirks(&mut self, quirks: Vec<String>) {
        self.identity.quirks = quirks;
        self.touch(Field::Quirks);
    }

    pub fn set_directives(&mut self, directives: Vec<String>) {
        self.identity.directives = directives;
        self.touch(Field::Directives);
    }

    /// Point at a different memory file. Does not affect the signature.
    pub fn set_memory_path(&mut self, path: &str) {
        self.memory_descriptor.path = path.to_string();
        self.memory = None;
        self.touch(Field::MemoryPath);
    }

    // --- accessors ---

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn get_trait(&self, name: &str) -> f64 {
        self.identity.get_trait(name)
    }

    pub fn memory_descriptor(&self) -> &MemoryDescriptor {
        &self.memory_descriptor
    }

    pub fn auth(&self) -> &AuthBlock {
        &self.auth
    }

    pub fn owner_token(&self) -> &str {
        &self.auth.owner_token
    }

    pub fn public_key_hex(&self) -> Option<&str> {
        self.auth.public_key.as_deref()
    }

    pub fn signature(&self) -> Option<&SignatureBlock> {
        self.signature.as_ref()
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn covered_fields_touched(&self) -> bool {
        self.covered_touched
    }

    /// Top-level sections that were missing on load
    pub fn defaulted_fields(&self) -> &[&'static str] {
        &self.defaulted
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl PromptSource for Cartridge {
    fn name(&self) -> &str {
        Cartridge::name(self)
    }

    fn compile_prompt(&self) -> String {
        Cartridge::compile_prompt(self)
    }
}
