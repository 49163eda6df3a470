//! Gumdrop: portable, signed AI identity cartridges
//!
//! A cartridge bundles an identity (name, voice, origin, personality traits,
//! quirks and directives) with a memory descriptor, owner metadata and an
//! optional signature. The visual engine turns the same identity into
//! deterministic fingerprints: a text thumbprint, an IC chip panel and a
//! ribbon panel.

pub mod canonical;
pub mod cartridge;
pub mod error;
pub mod hardware;
pub mod identity;
pub mod keyring;
pub mod memory;
pub mod prompt;
pub mod schema;
pub mod visual;
