//! Hardware-backed key discovery
//!
//! No token or secure-enclave backend is wired in, so discovery always comes
//! back empty. Callers should check `is_supported` before offering hardware
//! keys as a signing option.

use serde::Serialize;

/// A signing key held by a hardware device
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HardwareKey {
    pub device: String,
    pub key_id: String,
}

/// Whether any hardware key backend is available in this build
pub fn is_supported() -> bool {
    false
}

/// Enumerate hardware keys. Empty when unsupported.
pub fn detect_hardware_keys() -> Vec<HardwareKey> {
    if !is_supported() {
        log::debug!("Hardware key support is not available");
    }
    Vec::new()
}
