//! Keystore commands

use colored::*;
use eyre::Result;
use serde::Serialize;

use gumdrop::error::GumdropError;
use gumdrop::keyring::{Algorithm, Confirmation, KeyInfo, Keyring};

use crate::cli::{KeyAction, OutputFormat};
use crate::config::Config;

pub fn run(action: KeyAction, config: &Config) -> Result<()> {
    let keyring = Keyring::open(config.keystore_dir())?;
    match action {
        KeyAction::Generate { id, algorithm } => generate(&keyring, id.as_deref(), algorithm.into()),
        KeyAction::List { format } => list(&keyring, OutputFormat::resolve(format)),
        KeyAction::Show { id, format } => show(&keyring, &id, OutputFormat::resolve(format)),
        KeyAction::Delete { id, yes } => delete(&keyring, &id, yes),
    }
}

fn generate(keyring: &Keyring, id: Option<&str>, algorithm: Algorithm) -> Result<()> {
    let keypair = keyring.generate_with(algorithm, id)?;

    println!("{} Generated {} key {}", "✓".green(), algorithm, keypair.key_id().cyan());
    println!("  Fingerprint: {}", keypair.fingerprint());
    if algorithm.is_asymmetric() {
        println!("  Public key:  {}", keypair.public_hex());
    } else {
        println!(
            "  {} Legacy key: signatures can only be verified with this private key",
            "⚠".yellow()
        );
    }
    println!("  Stored in:   {}", keyring.dir().display());
    Ok(())
}

fn list(keyring: &Keyring, format: OutputFormat) -> Result<()> {
    let keys = keyring.list()?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&keys)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&keys)?),
        OutputFormat::Text => {
            if keys.is_empty() {
                println!("No keys in {}", keyring.dir().display());
                println!("Create one with {}", "gumdrop key generate".cyan());
                return Ok(());
            }

            println!("{}", "Keys:".bold());
            for key in &keys {
                println!(
                    "  {} {} {} {}",
                    key.key_id.cyan(),
                    key.algorithm,
                    key.fingerprint.dimmed(),
                    key.created_at.dimmed()
                );
            }
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct KeyDetails {
    #[serde(flatten)]
    info: KeyInfo,
    public_key: Option<String>,
}

fn show(keyring: &Keyring, id: &str, format: OutputFormat) -> Result<()> {
    let keypair = keyring.require(id)?;
    let info = keyring
        .list()?
        .into_iter()
        .find(|k| k.key_id == id)
        .unwrap_or_else(|| KeyInfo {
            key_id: keypair.key_id().to_string(),
            created_at: "unknown".to_string(),
            algorithm: keypair.algorithm().to_string(),
            fingerprint: keypair.fingerprint(),
        });

    // hmac public material is derived from the secret and is not shared
    let details = KeyDetails {
        info,
        public_key: keypair.algorithm().is_asymmetric().then(|| keypair.public_hex()),
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&details)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&details)?),
        OutputFormat::Text => {
            println!("{} {}", "Key:".bold(), details.info.key_id.cyan());
            println!("  Algorithm:   {}", details.info.algorithm);
            println!("  Fingerprint: {}", details.info.fingerprint);
            println!("  Created:     {}", details.info.created_at);
            if let Some(ref public) = details.public_key {
                println!("  Public key:  {}", public);
            }
        }
    }

    Ok(())
}

fn delete(keyring: &Keyring, id: &str, yes: bool) -> Result<()> {
    let confirm = if yes {
        Confirmation::Confirmed
    } else {
        Confirmation::Unconfirmed
    };

    match keyring.delete(id, confirm) {
        Ok(true) => {
            println!("{} Deleted key {}", "✓".green(), id.cyan());
            Ok(())
        }
        Ok(false) => Err(GumdropError::NotFound {
            what: "Key",
            path: keyring.dir().join(format!("{}.json", id)),
        }
        .into()),
        Err(e) => {
            if matches!(e.downcast_ref::<GumdropError>(), Some(GumdropError::DestructiveOperation { .. })) {
                eprintln!(
                    "{} Deleting a key is irreversible; cartridges signed with it can no longer be re-signed",
                    "⚠".yellow()
                );
                eprintln!("  Re-run with {} to confirm", "--yes".cyan());
            }
            Err(e)
        }
    }
}
