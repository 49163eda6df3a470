//! Diagnose gumdrop setup issues

use colored::*;
use eyre::Result;
use std::fs;
use std::path::{Path, PathBuf};

use gumdrop::cartridge::{Cartridge, TrustStatus};
use gumdrop::hardware;
use gumdrop::keyring::{Algorithm, Keyring};
use gumdrop::schema;

use crate::config::Config;

pub fn run(config: &Config) -> Result<()> {
    println!("{}", "Gumdrop Doctor".bold());
    println!("{}", "═".repeat(50));
    println!();

    let mut issues = 0;

    let gumdrop_dir = Config::gumdrop_dir();
    if gumdrop_dir.exists() {
        println!("{} Gumdrop directory: {}", "✓".green(), gumdrop_dir.display());
    } else {
        println!("{} Gumdrop directory missing: {}", "⚠".yellow(), gumdrop_dir.display());
        println!("  It is created on first {} or {}", "gumdrop create".cyan(), "gumdrop key generate".cyan());
    }

    let config_file = gumdrop_dir.join("gumdrop.yaml");
    if config_file.exists() {
        println!("{} Config file: {}", "✓".green(), config_file.display());
    } else {
        println!("{} Config file not found, using defaults", "⚠".yellow());
    }

    println!();
    println!("{}", "Keystore:".bold());
    let keystore = config.keystore_dir();
    if keystore.exists() {
        issues += check_keystore(&keystore);
    } else {
        println!("  {} {} does not exist yet", "⚠".yellow(), keystore.display());
    }

    println!();
    println!("{}", "Cartridges:".bold());
    let containers = Config::expand_path(&config.paths.containers);
    if containers.exists() {
        let cartridges = find_cartridges(&containers);
        println!("  {} {} ({} cartridges)", "✓".green(), containers.display(), cartridges.len());
        for path in cartridges {
            match Cartridge::load(&path) {
                Ok(c) => {
                    let status = match c.trust_status() {
                        TrustStatus::Signed => "signed".green(),
                        TrustStatus::Unsigned => "unsigned".yellow(),
                        TrustStatus::Stale => "stale signature".red(),
                    };
                    println!("    {} {} ({})", "•".cyan(), c.name(), status);
                }
                Err(e) => {
                    println!("    {} {}: {}", "✗".red(), path.display(), e);
                    issues += 1;
                }
            }
        }
    } else {
        println!("  {} {} does not exist yet", "⚠".yellow(), containers.display());
    }

    println!();
    println!("{}", "Hardware keys:".bold());
    if hardware::is_supported() {
        let keys = hardware::detect_hardware_keys();
        println!("  {} {} device(s) found", "✓".green(), keys.len());
    } else {
        println!("  {} Not supported in this build", "⚠".yellow());
    }

    println!();
    println!("{}", "═".repeat(50));
    if issues == 0 {
        println!("{} All checks passed!", "✓".green().bold());
    } else {
        println!("{} {} issue(s) found", "⚠".yellow().bold(), issues);
    }

    Ok(())
}

/// Report on an existing keystore without modifying it; returns the issue count
fn check_keystore(keystore: &Path) -> usize {
    let mut issues = 0;

    match Keyring::existing(keystore).and_then(|k| k.list()) {
        Ok(keys) if keys.is_empty() => {
            println!("  {} {} (no keys)", "⚠".yellow(), keystore.display());
            println!("    Create one with {}", "gumdrop key generate".cyan());
        }
        Ok(keys) => {
            println!("  {} {} ({} keys)", "✓".green(), keystore.display(), keys.len());
            let legacy = keys.iter().filter(|k| k.algorithm != Algorithm::Ed25519.as_str()).count();
            if legacy > 0 {
                println!(
                    "  {} {} legacy hmac key(s); their signatures need the private key to verify",
                    "⚠".yellow(),
                    legacy
                );
            }
        }
        Err(e) => {
            println!("  {} {} unreadable: {}", "✗".red(), keystore.display(), e);
            issues += 1;
        }
    }

    if !is_owner_only(keystore) {
        println!("  {} Keystore is readable by other users", "✗".red());
        println!("    Fix with {}", format!("chmod 700 {}", keystore.display()).cyan());
        issues += 1;
    }

    issues
}

fn find_cartridges(dir: &Path) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.extension().is_some_and(|ext| ext == schema::CARTRIDGE_EXTENSION))
                .collect()
        })
        .unwrap_or_default();
    found.sort();
    found
}

#[cfg(unix)]
fn is_owner_only(dir: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(dir)
        .map(|m| m.permissions().mode() & 0o077 == 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_owner_only(_dir: &Path) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_find_cartridges_filters_extension() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("b.gdp"), "{}").unwrap();
        fs::write(temp.path().join("a.gdp"), "{}").unwrap();
        fs::write(temp.path().join("a.memory"), "{}").unwrap();

        let found = find_cartridges(temp.path());
        let names: Vec<_> = found.iter().filter_map(|p| p.file_name()).collect();
        assert_eq!(names, vec!["a.gdp", "b.gdp"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_open_keystore_is_reported_and_left_unchanged() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempdir().unwrap();
        let keystore = temp.path().join("keys");
        fs::create_dir(&keystore).unwrap();
        fs::set_permissions(&keystore, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(!is_owner_only(&keystore));
        assert_eq!(check_keystore(&keystore), 1);
        let mode = fs::metadata(&keystore).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[cfg(unix)]
    #[test]
    fn test_private_keystore_passes() {
        let temp = tempdir().unwrap();
        let keystore = temp.path().join("keys");
        Keyring::open(&keystore).unwrap().generate(Some("main")).unwrap();

        assert!(is_owner_only(&keystore));
        assert_eq!(check_keystore(&keystore), 0);
    }
}
