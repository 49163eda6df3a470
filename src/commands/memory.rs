//! Memory commands

use colored::*;
use eyre::Result;
use serde::Serialize;

use gumdrop::cartridge::Cartridge;

use crate::cli::{MemoryAction, OutputFormat};
use crate::config::Config;

pub fn run(action: MemoryAction, config: &Config) -> Result<()> {
    match action {
        MemoryAction::Remember {
            cartridge,
            key,
            value,
            category,
            confidence,
        } => {
            let mut cartridge = Cartridge::load(&config.resolve_cartridge(&cartridge))?;
            let store = cartridge.memory()?;
            store.remember(&key, &value, category.as_deref(), confidence)?;
            store.flush()?;
            println!("{} Remembered {}", "✓".green(), key.cyan());
            Ok(())
        }
        MemoryAction::Recall { cartridge, key } => {
            let mut cartridge = Cartridge::load(&config.resolve_cartridge(&cartridge))?;
            match cartridge.memory()?.recall(&key) {
                Some(value) => {
                    println!("{}", value);
                    Ok(())
                }
                None => eyre::bail!("No fact stored under '{}'", key),
            }
        }
        MemoryAction::Forget { cartridge, key } => {
            let mut cartridge = Cartridge::load(&config.resolve_cartridge(&cartridge))?;
            let store = cartridge.memory()?;
            if store.forget(&key)? {
                store.flush()?;
                println!("{} Forgot {}", "✓".green(), key.cyan());
            } else {
                println!("{} Nothing stored under {}", "⚠".yellow(), key);
            }
            Ok(())
        }
        MemoryAction::List { cartridge, limit, format } => {
            let mut cartridge = Cartridge::load(&config.resolve_cartridge(&cartridge))?;
            list(&mut cartridge, limit, OutputFormat::resolve(format))
        }
    }
}

#[derive(Serialize)]
struct FactList<'a> {
    cartridge: &'a str,
    facts: Vec<String>,
}

fn list(cartridge: &mut Cartridge, limit: usize, format: OutputFormat) -> Result<()> {
    let facts = cartridge.memory()?.get_recent_facts(limit);
    let report = FactList {
        cartridge: cartridge.name(),
        facts,
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&report)?),
        OutputFormat::Text => {
            if report.facts.is_empty() {
                println!("{} has no memories yet", report.cartridge.bold());
                return Ok(());
            }
            println!("{} {}", "Memories of".bold(), report.cartridge.bold());
            for fact in &report.facts {
                println!("  {} {}", "•".cyan(), fact);
            }
        }
    }

    Ok(())
}
