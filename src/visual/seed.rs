//! Identity seed
//!
//! Every renderer draws its variation from the same 32 bytes:
//! SHA-256 of `gumdrop:{name}:{owner}`.

use sha2::{Digest, Sha256};

pub const SEED_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seed([u8; SEED_LEN]);

impl Seed {
    pub fn derive(name: &str, owner: &str) -> Self {
        let digest = Sha256::digest(format!("gumdrop:{}:{}", name, owner).as_bytes());
        Self(digest.into())
    }

    /// Byte at `index`, wrapping around the seed
    pub fn byte(&self, index: usize) -> u8 {
        self.0[index % SEED_LEN]
    }

    pub fn as_bytes(&self) -> &[u8; SEED_LEN] {
        &self.0
    }
}
