//! Visual fingerprint commands

use colored::*;
use eyre::{Context, Result};
use std::fs;
use std::path::Path;

use gumdrop::cartridge::Cartridge;
use gumdrop::visual::{panel, ribbon, thumbprint};

use crate::cli::RenderAction;
use crate::config::Config;

pub fn run(action: RenderAction, config: &Config) -> Result<()> {
    match action {
        RenderAction::Thumbprint {
            cartridge,
            no_frame,
            width,
            height,
        } => {
            let cartridge = Cartridge::load(&config.resolve_cartridge(&cartridge))?;
            let mut options = config.render.thumbprint(!no_frame);
            if let Some(w) = width {
                options.width = w.max(1);
            }
            if let Some(h) = height {
                options.height = h.max(1);
            }
            println!("{}", thumbprint::from_cartridge(&cartridge, &options));
            Ok(())
        }
        RenderAction::Compact { cartridge } => {
            let cartridge = Cartridge::load(&config.resolve_cartridge(&cartridge))?;
            println!("{}", thumbprint::compact_from_cartridge(&cartridge));
            Ok(())
        }
        RenderAction::Panel { cartridge, output, grid } => {
            let cartridge = Cartridge::load(&config.resolve_cartridge(&cartridge))?;
            let mut options = config.render.panel();
            if let Some(g) = grid {
                options.grid_size = g.max(1);
            }
            emit(&panel::from_cartridge(&cartridge, &options), output.as_deref())
        }
        RenderAction::Ribbon { cartridge, output, flat } => {
            let cartridge = Cartridge::load(&config.resolve_cartridge(&cartridge))?;
            let mut options = config.render.ribbon();
            if flat {
                options.perspective = false;
            }
            emit(&ribbon::from_cartridge(&cartridge, &options), output.as_deref())
        }
    }
}

/// Print SVG to stdout or write it to a file
fn emit(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        None => {
            println!("{}", svg);
            Ok(())
        }
        Some(path) => {
            let path = Config::expand_path(path);
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            fs::write(&path, svg).with_context(|| format!("Failed to write {}", path.display()))?;
            println!("{} Wrote {}", "✓".green(), path.display());
            Ok(())
        }
    }
}
