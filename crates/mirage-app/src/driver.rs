//! Headless run: a scripted viewer walking through a [`WorldSession`].

use mirage_world::CacheStats;
use tracing::info;

use crate::game_loop::{FIXED_DT, GameLoop};
use crate::session::{TickSummary, WorldSession};
use crate::viewer::ViewerPath;

/// Simulation steps between progress log lines (one simulated second).
const REPORT_INTERVAL: u64 = 60;

/// Totals over a headless run.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RunReport {
    /// Simulation ticks executed.
    pub ticks: u64,
    /// Tiles generated.
    pub tiles_loaded: usize,
    /// Tiles released.
    pub tiles_unloaded: usize,
    /// Largest number of resident tiles.
    pub peak_resident: usize,
    /// Ticks that re-selected tiers.
    pub reselections: u64,
    /// Ticks that rebuilt the batch plan.
    pub rebuilds: u64,
    /// The last tick.
    pub last: TickSummary,
    /// Layout cache counters at the end of the run.
    pub cache: CacheStats,
}

impl RunReport {
    fn record(&mut self, summary: TickSummary) {
        self.ticks += 1;
        self.tiles_loaded += summary.loaded;
        self.tiles_unloaded += summary.unloaded;
        self.peak_resident = self.peak_resident.max(summary.resident);
        self.reselections += u64::from(summary.reselected);
        self.rebuilds += u64::from(summary.rebuilt);
        self.last = summary;
    }
}

/// Drives a session along a viewer path at the fixed simulation rate.
pub struct Driver {
    session: WorldSession,
    path: ViewerPath,
    game_loop: GameLoop,
}

impl Driver {
    /// A driver for `session` following `path`.
    pub fn new(session: WorldSession, path: ViewerPath) -> Self {
        Self {
            session,
            path,
            game_loop: GameLoop::new(),
        }
    }

    /// Run `ticks` simulation steps as fast as possible.
    ///
    /// Frames are fed exactly one fixed step each, so a run is reproducible.
    pub fn run(&mut self, ticks: u32) -> RunReport {
        let mut report = RunReport::default();
        let Self {
            session,
            path,
            game_loop,
        } = self;

        while report.ticks < u64::from(ticks) {
            game_loop.advance(FIXED_DT, |dt, sim_time| {
                let viewer = path.position(sim_time + dt);
                let summary = session.tick(viewer);
                report.record(summary);
                if report.ticks % REPORT_INTERVAL == 0 {
                    info!(
                        tick = report.ticks,
                        tile = %summary.viewer_tile,
                        resident = summary.resident,
                        pending = summary.pending,
                        entities = summary.entities,
                        batches = summary.batches,
                        "streaming"
                    );
                }
            });
        }

        report.cache = session.cache().stats();
        report
    }

    /// The session being driven.
    pub fn session(&self) -> &WorldSession {
        &self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use mirage_config::Config;

    fn driver(speed: f32) -> Driver {
        let mut config = Config::default();
        config.generation.heightmap = false;
        config.batching.horizon_count = 16;
        let session = WorldSession::from_config(&config).unwrap();
        Driver::new(session, ViewerPath::new(Vec2::new(0.0, 128.0), speed))
    }

    #[test]
    fn test_runs_requested_ticks() {
        let mut driver = driver(8.0);
        let report = driver.run(120);
        assert_eq!(report.ticks, 120);
        assert!(report.tiles_loaded > 0);
        assert!(report.peak_resident >= report.last.resident);
        assert_eq!(report.cache.generated as usize, report.tiles_loaded);
    }

    #[test]
    fn test_runs_are_reproducible() {
        let a = driver(40.0).run(300);
        let b = driver(40.0).run(300);
        assert_eq!(a, b);
    }

    #[test]
    fn test_fast_viewer_unloads_tiles() {
        // 300 units per second crosses several tiles per second.
        let report = driver(300.0).run(240);
        assert!(report.tiles_unloaded > 0, "tiles behind the viewer must unload");
        assert!(report.reselections > 0);
    }

    #[test]
    fn test_zero_ticks() {
        let report = driver(8.0).run(0);
        assert_eq!(report.ticks, 0);
        assert_eq!(driver(8.0).session().cache().len(), 0);
    }
}
