//! Cartridge schema constants and defaults

use chrono::{SecondsFormat, Utc};

/// Current cartridge format version
pub const CARTRIDGE_VERSION: &str = "1.0";

/// Versions this crate can read without conversion
pub const SUPPORTED_VERSIONS: &[&str] = &[CARTRIDGE_VERSION];

/// File extension for cartridge files
pub const CARTRIDGE_EXTENSION: &str = "gdp";

/// Extension of the memory store derived from a cartridge path
pub const MEMORY_EXTENSION: &str = "memory";

pub const DEFAULT_VOICE: &str = "helpful and friendly";
pub const DEFAULT_ORIGIN: &str = "Created with Gumdrop SDK";

pub const DEFAULT_MEMORY_BACKEND: &str = "local";
pub const DEFAULT_MEMORY_ENCRYPTION: &str = "none";

/// Maximum number of remembered facts included in a compiled prompt
pub const DEFAULT_FACT_LIMIT: usize = 20;

pub fn default_directives() -> Vec<String> {
    vec![
        "Be helpful and honest.".to_string(),
        "Maintain the user's privacy.".to_string(),
    ]
}

/// Current UTC time as RFC 3339 with microseconds, e.g. `2025-01-01T12:00:00.000000+00:00`
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Resolve a stored version string to a supported one, oldest compatible first
pub fn resolve_version(version: Option<&str>) -> (&'static str, bool) {
    match version {
        Some(v) => match SUPPORTED_VERSIONS.iter().find(|s| **s == v) {
            Some(supported) => (supported, true),
            None => (SUPPORTED_VERSIONS[0], false),
        },
        None => (SUPPORTED_VERSIONS[0], false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    #[test]
    fn test_timestamp_parses_as_rfc3339() {
        let ts = now_timestamp();
        assert!(DateTime::parse_from_rfc3339(&ts).is_ok());
        assert!(ts.ends_with("+00:00"));
    }

    #[test]
    fn test_resolve_version() {
        assert_eq!(resolve_version(Some("1.0")), ("1.0", true));
        assert_eq!(resolve_version(Some("0.9-beta")), ("1.0", false));
        assert_eq!(resolve_version(None), ("1.0", false));
    }
}
