//! Cartridge commands: create, show, prompt, set-trait, sign, verify

use colored::*;
use eyre::{Context, Result, bail};
use serde::Serialize;
use std::path::PathBuf;

use gumdrop::cartridge::{Cartridge, TrustStatus};
use gumdrop::error::GumdropError;
use gumdrop::identity::{Trait, TraitMap};
use gumdrop::keyring::{Keyring, SignatureBlock, StructuralCheck, Verification};
use gumdrop::prompt::{LayeredPrompt, PromptSource};
use gumdrop::visual::thumbprint;

use crate::cli::OutputFormat;
use crate::config::Config;

/// Arguments for `gumdrop create`
pub struct CreateArgs {
    pub name: String,
    pub voice: Option<String>,
    pub origin: Option<String>,
    pub traits: Vec<(String, f64)>,
    pub directives: Vec<String>,
    pub quirks: Vec<String>,
    pub output: Option<PathBuf>,
    pub force: bool,
}

/// Only exact lowercase names take part in descriptions and rendering
fn is_canonical(name: &str) -> bool {
    Trait::ALL.iter().any(|t| t.as_str() == name)
}

fn load(arg: &str, config: &Config) -> Result<Cartridge> {
    let path = config.resolve_cartridge(arg);
    let mut cartridge = Cartridge::load(&path)?;
    cartridge.set_fact_limit(config.prompt.fact_limit);
    Ok(cartridge)
}

pub fn create(args: CreateArgs, config: &Config) -> Result<()> {
    let path = match args.output {
        Some(p) => Config::expand_path(&p),
        None => config.resolve_cartridge(&args.name),
    };

    if path.exists() && !args.force {
        bail!("Cartridge already exists: {} (use --force to overwrite)", path.display());
    }

    for (name, _) in &args.traits {
        if !is_canonical(name) {
            println!("{} '{}' is not a standard trait; it is stored but not described", "⚠".yellow(), name);
        }
    }

    let traits: TraitMap = args.traits.into_iter().collect();
    let mut builder = Cartridge::builder(&args.name)
        .traits(traits)
        .directives(args.directives)
        .quirks(args.quirks);
    if let Some(ref voice) = args.voice {
        builder = builder.voice(voice);
    }
    if let Some(ref origin) = args.origin {
        builder = builder.origin(origin);
    }

    let mut cartridge = builder.build();
    let saved = cartridge.save(Some(&path))?;

    println!("{} Created {} at {}", "✓".green(), cartridge.name().bold(), saved.display());
    println!("  {}", thumbprint::compact_from_cartridge(&cartridge));
    Ok(())
}

#[derive(Serialize)]
struct CartridgeSummary<'a> {
    name: &'a str,
    voice: &'a str,
    origin: &'a str,
    version: &'a str,
    traits: &'a TraitMap,
    description: String,
    quirks: &'a [String],
    directives: &'a [String],
    owner_token: &'a str,
    created_at: &'a str,
    last_accessed: &'a str,
    memory_path: Option<String>,
    trust: TrustStatus,
    signature: Option<&'a SignatureBlock>,
    defaulted_fields: &'a [&'static str],
}

fn trait_bar(value: f64) -> String {
    let filled = (value * 10.0).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(10 - filled.min(10)))
}

pub fn show(arg: &str, format: OutputFormat, config: &Config) -> Result<()> {
    let cartridge = load(arg, config)?;
    let identity = cartridge.identity();

    let summary = CartridgeSummary {
        name: &identity.name,
        voice: &identity.voice,
        origin: &identity.origin,
        version: cartridge.version(),
        traits: identity.traits(),
        description: identity.describe(),
        quirks: &identity.quirks,
        directives: &identity.directives,
        owner_token: cartridge.owner_token(),
        created_at: &cartridge.auth().created_at,
        last_accessed: &cartridge.auth().last_accessed,
        memory_path: cartridge.memory_path().map(|p| p.display().to_string()),
        trust: cartridge.trust_status(),
        signature: cartridge.signature(),
        defaulted_fields: cartridge.defaulted_fields(),
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&summary)?),
        OutputFormat::Text => {
            println!("{} {}", "Cartridge:".bold(), summary.name.green().bold());
            println!("  {}", thumbprint::compact_from_cartridge(&cartridge));
            println!();
            if !summary.voice.is_empty() {
                println!("{} {}", "Voice:".bold(), summary.voice);
            }
            if !summary.origin.is_empty() {
                println!("{} {}", "Origin:".bold(), summary.origin);
            }
            println!("{} {}", "Personality:".bold(), summary.description);

            println!();
            println!("{}", "Traits:".bold());
            for (name, value) in summary.traits {
                let label = format!("{:<14}", name);
                let label = if is_canonical(name) { label.normal() } else { label.dimmed() };
                println!("  {} {:.2} {}", label, value, trait_bar(*value).cyan());
            }

            if !summary.quirks.is_empty() {
                println!();
                println!("{}", "Quirks:".bold());
                for quirk in summary.quirks {
                    println!("  {} {}", "•".cyan(), quirk);
                }
            }

            if !summary.directives.is_empty() {
                println!();
                println!("{}", "Directives:".bold());
                for directive in summary.directives {
                    println!("  {} {}", "•".cyan(), directive);
                }
            }

            println!();
            println!("{} {}", "Owner:".bold(), summary.owner_token);
            println!("{} {}", "Created:".bold(), summary.created_at);
            if let Some(ref path) = summary.memory_path {
                println!("{} {}", "Memory:".bold(), path);
            }
            let trust = match summary.trust {
                TrustStatus::Unsigned => summary.trust.to_string().yellow(),
                TrustStatus::Signed => summary.trust.to_string().green(),
                TrustStatus::Stale => summary.trust.to_string().red(),
            };
            println!("{} {}", "Trust:".bold(), trust);
            if let Some(sig) = summary.signature {
                println!("  key {} ({}) at {}", sig.key_id.cyan(), sig.algorithm_id, sig.signed_at);
            }
            if !summary.defaulted_fields.is_empty() {
                println!();
                println!(
                    "{} Missing sections filled from defaults: {}",
                    "⚠".yellow(),
                    summary.defaulted_fields.join(", ")
                );
            }
        }
    }

    Ok(())
}

pub fn prompt(
    arg: &str,
    preamble: Option<&str>,
    postscript: Option<&str>,
    no_memory: bool,
    config: &Config,
) -> Result<()> {
    let mut cartridge = load(arg, config)?;
    if !no_memory {
        cartridge.memory().context("Failed to open memory store")?;
    }

    let mut layered = LayeredPrompt::new(&cartridge);
    if let Some(text) = preamble {
        layered = layered.with_preamble(text);
    }
    if let Some(text) = postscript {
        layered = layered.with_postscript(text);
    }

    println!("{}", layered.compile_prompt());
    Ok(())
}

pub fn set_trait(arg: &str, name: &str, value: f64, config: &Config) -> Result<()> {
    let mut cartridge = load(arg, config)?;

    if !is_canonical(name) {
        println!("{} '{}' is not a standard trait; it is stored but not described", "⚠".yellow(), name);
    }

    let before = cartridge.get_trait(name);
    cartridge.set_trait(name, value);
    let after = cartridge.get_trait(name);
    cartridge.save(None)?;

    println!("{} {}: {:.2} → {:.2}", "✓".green(), name.cyan(), before, after);
    if after != value {
        println!("  {} clamped from {}", "⚠".yellow(), value);
    }
    if cartridge.trust_status() == TrustStatus::Stale {
        println!(
            "  {} Signature no longer matches; re-sign with {}",
            "⚠".yellow(),
            "gumdrop sign".cyan()
        );
    }
    Ok(())
}

pub fn sign(arg: &str, key_id: &str, config: &Config) -> Result<()> {
    let keyring = Keyring::open(config.keystore_dir())?;
    let keypair = keyring.require(key_id)?;

    let mut cartridge = load(arg, config)?;
    let block = cartridge.sign(&keypair)?.clone();
    let saved = cartridge.save(None)?;

    println!(
        "{} Signed {} with {} ({})",
        "✓".green(),
        cartridge.name().bold(),
        block.key_id.cyan(),
        block.algorithm_id
    );
    println!("  Owner: {}", cartridge.owner_token());
    println!("  Saved: {}", saved.display());
    Ok(())
}

#[derive(Serialize)]
struct VerifyReport<'a> {
    cartridge: &'a str,
    method: &'static str,
    result: String,
    verified: bool,
}

pub fn verify(
    arg: &str,
    key_id: Option<&str>,
    public_key: Option<&str>,
    format: OutputFormat,
    config: &Config,
) -> Result<()> {
    let cartridge = load(arg, config)?;

    let (method, verification) = match (key_id, public_key) {
        (Some(id), _) => {
            let keyring = Keyring::open(config.keystore_dir())?;
            let keypair = keyring.require(id)?;
            ("key", Some(cartridge.verify(&keypair)))
        }
        (None, Some(hex_key)) => {
            let public = hex::decode(hex_key.trim()).context("Public key is not valid hex")?;
            ("public-key", Some(cartridge.verify_public(&public)))
        }
        (None, None) => ("structure", None),
    };

    let (result, verified) = match verification {
        Some(v) => (v.to_string(), v.is_verified()),
        None => (cartridge.check_signature_structure().to_string(), false),
    };

    let report = VerifyReport {
        cartridge: cartridge.name(),
        method,
        result,
        verified,
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&report)?),
        OutputFormat::Text => {
            let symbol = if verified { "✓".green() } else { "✗".red() };
            println!("{} {}: {}", symbol, report.cartridge.bold(), report.result);
            if method == "structure" {
                println!(
                    "  Pass {} or {} to check authenticity",
                    "--key".cyan(),
                    "--public-key".cyan()
                );
            }
        }
    }

    match verification {
        Some(Verification::Verified) => Ok(()),
        Some(Verification::Unsigned) => Err(GumdropError::VerificationFailure {
            reason: format!("{} is not signed", cartridge.name()),
        }
        .into()),
        Some(Verification::Invalid) => Err(GumdropError::VerificationFailure {
            reason: format!("{} has an invalid signature", cartridge.name()),
        }
        .into()),
        None => match cartridge.check_signature_structure() {
            StructuralCheck::Malformed => Err(GumdropError::VerificationFailure {
                reason: format!("{} has a malformed signature block", cartridge.name()),
            }
            .into()),
            _ => Ok(()),
        },
    }
}
