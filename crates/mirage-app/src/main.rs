//! The `mirage` binary.

use std::process::ExitCode;

use clap::Parser;
use mirage_app::platform::PlatformDirs;
use mirage_app::{AppError, Driver, ViewerPath, WorldSession};
use mirage_config::{CliArgs, Config};
use mirage_procgen::TileCoord;
use tracing::info;

fn main() -> ExitCode {
    let args = CliArgs::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("mirage: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

fn run(args: &CliArgs) -> Result<(), AppError> {
    let dirs = match &args.config {
        Some(root) => PlatformDirs::resolve_with_root(root),
        None => PlatformDirs::resolve()?,
    };
    dirs.create_dirs()?;

    let mut config = Config::load_or_create(&dirs.config_dir)?;
    config.apply_cli_overrides(args);
    config.validate()?;

    mirage_log::init_logging(Some(&dirs.log_dir), cfg!(debug_assertions), Some(&config));

    let mut session = WorldSession::from_config(&config)?;

    if let Some((x, y)) = args.dump_tile {
        println!("{}", session.dump_tile(TileCoord::new(x, y))?);
        return Ok(());
    }

    // Start on the mosque tile.
    let start = TileCoord::new(0, 2).center(session.tile_size());
    let path = ViewerPath::new(start, config.debug.viewer_speed);
    info!(
        ticks = config.debug.ticks,
        speed = path.speed(),
        config_dir = %dirs.config_dir.display(),
        "starting headless run"
    );

    let report = Driver::new(session, path).run(config.debug.ticks);
    info!(
        ticks = report.ticks,
        tiles_loaded = report.tiles_loaded,
        tiles_unloaded = report.tiles_unloaded,
        peak_resident = report.peak_resident,
        reselections = report.reselections,
        rebuilds = report.rebuilds,
        batches = report.last.batches,
        instances = report.last.instances,
        cache_hits = report.cache.hits,
        "run complete"
    );
    Ok(())
}
