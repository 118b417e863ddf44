//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Command-line arguments for the `mirage` driver.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "mirage", about = "Procedural desert city streaming driver")]
pub struct CliArgs {
    /// Session seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Load radius in tiles.
    #[arg(long)]
    pub load_radius: Option<u32>,

    /// Unload radius in tiles.
    #[arg(long)]
    pub unload_radius: Option<u32>,

    /// Number of ticks to simulate.
    #[arg(long)]
    pub ticks: Option<u32>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print the layout of tile `X,Y` as RON and exit.
    #[arg(long, value_name = "X,Y", value_parser = parse_tile, allow_hyphen_values = true)]
    pub dump_tile: Option<(i32, i32)>,
}

/// Parse `"X,Y"` into a tile coordinate pair.
pub fn parse_tile(s: &str) -> Result<(i32, i32), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got `{s}`"))?;
    let x = x
        .trim()
        .parse()
        .map_err(|e| format!("bad tile x `{x}`: {e}"))?;
    let y = y
        .trim()
        .parse()
        .map_err(|e| format!("bad tile y `{y}`: {e}"))?;
    Ok((x, y))
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(seed) = args.seed {
            self.generation.session_seed = seed;
        }
        if let Some(r) = args.load_radius {
            self.streaming.load_radius = r;
        }
        if let Some(r) = args.unload_radius {
            self.streaming.unload_radius = r;
        }
        if let Some(ticks) = args.ticks {
            self.debug.ticks = ticks;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
