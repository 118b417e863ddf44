//! End-to-end runs through config, session and driver.

use clap::Parser;
use glam::Vec2;
use mirage_app::platform::PlatformDirs;
use mirage_app::{Driver, ViewerPath, WorldSession};
use mirage_config::{CliArgs, Config};
use mirage_procgen::TileCoord;

fn config_in(dir: &std::path::Path, args: &[&str]) -> Config {
    let dirs = PlatformDirs::resolve_with_root(dir);
    dirs.create_dirs().unwrap();
    let mut config = Config::load_or_create(&dirs.config_dir).unwrap();
    config.apply_cli_overrides(&CliArgs::parse_from(args));
    config.validate().unwrap();
    config
}

#[test]
fn test_cli_seed_reaches_layouts() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config_in(tmp.path(), &["mirage", "--seed", "31337"]);
    let mut session = WorldSession::from_config(&config).unwrap();
    let layout = session.layout(TileCoord::new(3, -1));
    assert_eq!(layout.session_seed(), 31337);
}

#[test]
fn test_dump_matches_across_sessions() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config_in(tmp.path(), &["mirage"]);
    let a = WorldSession::from_config(&config)
        .unwrap()
        .dump_tile(TileCoord::new(0, 2))
        .unwrap();
    let b = WorldSession::from_config(&config)
        .unwrap()
        .dump_tile(TileCoord::new(0, 2))
        .unwrap();
    assert_eq!(a, b, "same seed and tile must dump identically");
}

#[test]
fn test_headless_run_keeps_resident_set_bounded() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config_in(
        tmp.path(),
        &["mirage", "--load-radius", "2", "--unload-radius", "3", "--ticks", "600"],
    );
    let session = WorldSession::from_config(&config).unwrap();
    let start = TileCoord::new(0, 2).center(session.tile_size());
    let mut driver = Driver::new(session, ViewerPath::new(start, 120.0));
    let report = driver.run(config.debug.ticks);

    assert_eq!(report.ticks, 600);
    // Every tile within the unload radius (3) of the viewer: 29 tiles.
    assert!(
        report.peak_resident <= 29 + 7,
        "resident set grew to {}",
        report.peak_resident
    );
    assert!(report.tiles_unloaded > 0);
    assert_eq!(report.last.instances, report.last.entities);
}

#[test]
fn test_moving_viewer_plans_same_batches_as_fresh_session() {
    let tmp = tempfile::tempdir().unwrap();
    let mut config = config_in(tmp.path(), &["mirage"]);
    config.streaming.loads_per_tick = 1000;
    config.lod.hysteresis_margin = 0.0;

    // Stay inside tile (0, 2) so both sessions hold the same tiles.
    let mut walker = WorldSession::from_config(&config).unwrap();
    let end = Vec2::new(24.0, 128.0);
    for step in 0..=8 {
        let x = step as f32 * 3.0;
        walker.tick(glam::Vec3::new(x, 1.7, 128.0));
    }

    let mut fresh = WorldSession::from_config(&config).unwrap();
    fresh.tick(glam::Vec3::new(end.x, 1.7, end.y));

    assert_eq!(walker.plan().len(), fresh.plan().len());
    assert_eq!(walker.plan().instance_count(), fresh.plan().instance_count());
}
