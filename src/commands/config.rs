use colored::*;
use eyre::Result;

use crate::cli::{ConfigAction, OutputFormat};
use crate::config::Config;

pub fn run(action: ConfigAction, config: &Config) -> Result<()> {
    match action {
        ConfigAction::Show { format } => show(OutputFormat::resolve(format), config),
        ConfigAction::Get { key } => get(&key, config),
    }
}

fn show(format: OutputFormat, config: &Config) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(config)?);
        }
        OutputFormat::Text => {
            println!("{}", "Gumdrop Configuration".bold());
            println!();

            println!("log_level: {}", config.log_level.as_filter());
            println!();

            println!("{}:", "paths".cyan());
            println!("  keystore: {}", config.paths.keystore.display());
            println!("  containers: {}", config.paths.containers.display());
            println!();

            println!("{}:", "render".cyan());
            println!("  thumbprint_width: {}", config.render.thumbprint_width);
            println!("  thumbprint_height: {}", config.render.thumbprint_height);
            println!("  panel_grid: {}", config.render.panel_grid);
            println!("  ribbon_perspective: {}", config.render.ribbon_perspective);
            println!();

            println!("{}:", "prompt".cyan());
            println!("  fact_limit: {}", config.prompt.fact_limit);
        }
    }

    Ok(())
}

fn lookup(key: &str, config: &Config) -> Option<String> {
    match key {
        "paths.keystore" => Some(config.paths.keystore.display().to_string()),
        "paths.containers" => Some(config.paths.containers.display().to_string()),
        "render.thumbprint_width" => Some(config.render.thumbprint_width.to_string()),
        "render.thumbprint_height" => Some(config.render.thumbprint_height.to_string()),
        "render.panel_grid" => Some(config.render.panel_grid.to_string()),
        "render.ribbon_perspective" => Some(config.render.ribbon_perspective.to_string()),
        "prompt.fact_limit" => Some(config.prompt.fact_limit.to_string()),
        "log_level" | "log-level" => Some(config.log_level.as_filter().to_string()),
        _ => None,
    }
}

fn get(key: &str, config: &Config) -> Result<()> {
    match lookup(key, config) {
        Some(v) => println!("{}", v),
        None => {
            eprintln!("{} Unknown config key: {}", "✗".red(), key);
            std::process::exit(1);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_keys() {
        let config = Config::default();
        assert_eq!(lookup("prompt.fact_limit", &config).as_deref(), Some("20"));
        assert_eq!(lookup("render.panel_grid", &config).as_deref(), Some("8"));
        assert_eq!(lookup("log-level", &config).as_deref(), Some("info"));
        assert!(lookup("paths.plugins", &config).is_none());
    }
}
