use clap::{Parser, Subcommand, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;

use gumdrop::keyring::Algorithm;

/// Output format for commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

impl OutputFormat {
    /// Resolve the effective output format.
    /// If user specified a format, use it.
    /// Otherwise: TTY → Text, non-TTY (pipe) → Json
    pub fn resolve(user_choice: Option<OutputFormat>) -> OutputFormat {
        match user_choice {
            Some(fmt) => fmt,
            None => {
                if std::io::stdout().is_terminal() {
                    OutputFormat::Text
                } else {
                    OutputFormat::Json
                }
            }
        }
    }
}

/// Signing algorithm as accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AlgorithmArg {
    Ed25519,
    /// Legacy scheme, verifiable only with the private key
    HmacSha256,
}

impl From<AlgorithmArg> for Algorithm {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Ed25519 => Algorithm::Ed25519,
            AlgorithmArg::HmacSha256 => Algorithm::HmacSha256,
        }
    }
}

/// Parse `name=value` into a trait override
pub fn parse_trait_pair(s: &str) -> Result<(String, f64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("trait name is empty".to_string());
    }
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", value.trim()))?;
    Ok((name.to_string(), value))
}

#[derive(Parser)]
#[command(
    name = "gumdrop",
    about = "Portable, signed AI identity cartridges",
    version,
    after_help = "Logs are written to: ~/.local/share/gumdrop/logs/gumdrop.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to gumdrop.yaml config file")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new cartridge
    Create {
        /// Cartridge name
        name: String,

        /// Communication style
        #[arg(long)]
        voice: Option<String>,

        /// Background story
        #[arg(long)]
        origin: Option<String>,

        /// Trait override, e.g. --trait warmth=0.9 (repeatable)
        #[arg(long = "trait", value_name = "NAME=VALUE", value_parser = parse_trait_pair)]
        traits: Vec<(String, f64)>,

        /// Core directive (repeatable; defaults apply when none given)
        #[arg(long = "directive")]
        directives: Vec<String>,

        /// Personality quirk (repeatable)
        #[arg(long = "quirk")]
        quirks: Vec<String>,

        /// Output file (defaults to <containers>/<name>.gdp)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show a cartridge
    Show {
        /// Cartridge path or name
        cartridge: String,

        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Print the compiled system prompt
    Prompt {
        /// Cartridge path or name
        cartridge: String,

        /// Text placed before the prompt
        #[arg(long)]
        preamble: Option<String>,

        /// Text placed after the prompt
        #[arg(long)]
        postscript: Option<String>,

        /// Leave remembered facts out
        #[arg(long)]
        no_memory: bool,
    },

    /// Set a personality trait
    SetTrait {
        /// Cartridge path or name
        cartridge: String,

        /// Trait name
        name: String,

        /// Value in [0, 1]; out-of-range values are clamped
        #[arg(allow_negative_numbers = true)]
        value: f64,
    },

    /// Sign a cartridge with a key from the keystore
    Sign {
        /// Cartridge path or name
        cartridge: String,

        /// Key id
        #[arg(short, long)]
        key: String,
    },

    /// Verify a cartridge signature
    Verify {
        /// Cartridge path or name
        cartridge: String,

        /// Verify with this keystore key
        #[arg(short, long, conflicts_with = "public_key")]
        key: Option<String>,

        /// Verify with a hex ed25519 public key
        #[arg(long)]
        public_key: Option<String>,

        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Manage signing keys
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },

    /// Render visual fingerprints
    Render {
        #[command(subcommand)]
        action: RenderAction,
    },

    /// Manage a cartridge's memory
    Memory {
        #[command(subcommand)]
        action: MemoryAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Diagnose setup issues
    Doctor,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum KeyAction {
    /// Generate and store a new keypair
    Generate {
        /// Key id (defaults to the public key fingerprint)
        id: Option<String>,

        #[arg(long, value_enum, default_value = "ed25519")]
        algorithm: AlgorithmArg,
    },

    /// List stored keys
    List {
        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Show a stored key's public details
    Show {
        /// Key id
        id: String,

        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Delete a stored key
    Delete {
        /// Key id
        id: String,

        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum RenderAction {
    /// Text thumbprint
    Thumbprint {
        /// Cartridge path or name
        cartridge: String,

        /// Omit the frame
        #[arg(long)]
        no_frame: bool,

        /// Matrix width
        #[arg(long)]
        width: Option<usize>,

        /// Matrix height
        #[arg(long)]
        height: Option<usize>,
    },

    /// One-line thumbprint
    Compact {
        /// Cartridge path or name
        cartridge: String,
    },

    /// IC chip panel as SVG
    Panel {
        /// Cartridge path or name
        cartridge: String,

        /// Write SVG to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Glyph grid size
        #[arg(long)]
        grid: Option<usize>,
    },

    /// Ribbon panel as SVG
    Ribbon {
        /// Cartridge path or name
        cartridge: String,

        /// Write SVG to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Draw bands without perspective skew
        #[arg(long)]
        flat: bool,
    },
}

#[derive(Subcommand)]
pub enum MemoryAction {
    /// Store a fact
    Remember {
        /// Cartridge path or name
        cartridge: String,

        key: String,

        value: String,

        #[arg(long)]
        category: Option<String>,

        /// Confidence in [0, 1]
        #[arg(long)]
        confidence: Option<f64>,
    },

    /// Print a fact's value
    Recall {
        /// Cartridge path or name
        cartridge: String,

        key: String,
    },

    /// Remove a fact
    Forget {
        /// Cartridge path or name
        cartridge: String,

        key: String,
    },

    /// List recent facts
    List {
        /// Cartridge path or name
        cartridge: String,

        /// Maximum number of facts
        #[arg(short, long, default_value_t = 20)]
        limit: usize,

        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Get a configuration value
    Get {
        /// Configuration key (dot notation)
        key: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_trait_pair() {
        assert_eq!(parse_trait_pair("warmth=0.9"), Ok(("warmth".to_string(), 0.9)));
        assert_eq!(parse_trait_pair(" humor = 1 "), Ok(("humor".to_string(), 1.0)));
        assert!(parse_trait_pair("warmth").is_err());
        assert!(parse_trait_pair("=0.5").is_err());
        assert!(parse_trait_pair("warmth=lots").is_err());
    }

    #[test]
    fn test_create_args() {
        let cli = Cli::try_parse_from([
            "gumdrop", "create", "Atlas", "--trait", "warmth=0.9", "--trait", "humor=0.2", "--quirk", "Hums",
        ])
        .unwrap();
        match cli.command {
            Commands::Create { name, traits, quirks, .. } => {
                assert_eq!(name, "Atlas");
                assert_eq!(traits.len(), 2);
                assert_eq!(quirks, vec!["Hums"]);
            }
            _ => panic!("expected create"),
        }
    }

    #[test]
    fn test_verify_key_conflicts_with_public_key() {
        let result = Cli::try_parse_from(["gumdrop", "verify", "a.gdp", "--key", "k", "--public-key", "ab"]);
        assert!(result.is_err());
    }
}
