use clap::Parser;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;

mod cli;
mod commands;
mod config;

use cli::{Cli, Commands};
use config::{Config, LogLevel};

/// Log to a file so stdout stays clean for prompts and SVG output
fn setup_logging(log_level: &LogLevel) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gumdrop")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("gumdrop.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    // RUST_LOG env var takes precedence, otherwise use config log_level
    let mut builder = env_logger::Builder::new();

    if std::env::var("RUST_LOG").is_ok() {
        builder.parse_default_env();
    } else {
        builder.filter_level(log_level.level_filter());
    }

    builder.target(env_logger::Target::Pipe(target)).init();

    info!("Logging initialized, writing to: {}", log_file.display());
    info!(
        "Log level: {} (from {})",
        log_level.as_filter(),
        if std::env::var("RUST_LOG").is_ok() { "RUST_LOG env" } else { "config" }
    );
    Ok(())
}

fn run(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Create {
            name,
            voice,
            origin,
            traits,
            directives,
            quirks,
            output,
            force,
        } => commands::cartridge::create(
            commands::cartridge::CreateArgs {
                name,
                voice,
                origin,
                traits,
                directives,
                quirks,
                output,
                force,
            },
            &config,
        ),
        Commands::Show { cartridge, format } => {
            commands::cartridge::show(&cartridge, cli::OutputFormat::resolve(format), &config)
        }
        Commands::Prompt {
            cartridge,
            preamble,
            postscript,
            no_memory,
        } => commands::cartridge::prompt(&cartridge, preamble.as_deref(), postscript.as_deref(), no_memory, &config),
        Commands::SetTrait { cartridge, name, value } => {
            commands::cartridge::set_trait(&cartridge, &name, value, &config)
        }
        Commands::Sign { cartridge, key } => commands::cartridge::sign(&cartridge, &key, &config),
        Commands::Verify {
            cartridge,
            key,
            public_key,
            format,
        } => commands::cartridge::verify(
            &cartridge,
            key.as_deref(),
            public_key.as_deref(),
            cli::OutputFormat::resolve(format),
            &config,
        ),
        Commands::Key { action } => commands::key::run(action, &config),
        Commands::Render { action } => commands::render::run(action, &config),
        Commands::Memory { action } => commands::memory::run(action, &config),
        Commands::Config { action } => commands::config::run(action, &config),
        Commands::Doctor => commands::doctor::run(&config),
        Commands::Completions { shell } => commands::completions::run(shell),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration (before logging, so log messages in Config::load are silent)
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(&config.log_level).context("Failed to setup logging")?;

    info!("Starting gumdrop with config from: {:?}", cli.config);

    run(cli, config).context("Command failed")?;

    Ok(())
}
