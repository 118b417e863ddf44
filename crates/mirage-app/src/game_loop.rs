//! Fixed-timestep simulation loop.
//!
//! Simulation runs at a fixed 60 Hz regardless of how frame time arrives.
//! An accumulator carries the remainder between frames. The headless driver
//! feeds explicit frame times so a run is reproducible.

use tracing::warn;

/// Fixed simulation timestep: 60 Hz.
pub const FIXED_DT: f64 = 1.0 / 60.0;

/// Frame times above this are clamped so a stall cannot trigger a long
/// burst of catch-up steps.
pub const MAX_FRAME_TIME: f64 = 0.25;

/// Fixed-timestep loop state.
#[derive(Debug, Default)]
pub struct GameLoop {
    accumulator: f64,
    total_sim_time: f64,
    frame_count: u64,
    update_count: u64,
}

impl GameLoop {
    /// A loop at simulation time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one frame of `frame_time` seconds.
    ///
    /// `update_fn(fixed_dt, total_sim_time)` is called zero or more times at
    /// the fixed rate. Returns the number of steps executed.
    pub fn advance(&mut self, frame_time: f64, mut update_fn: impl FnMut(f64, f64)) -> u32 {
        let mut frame_time = frame_time.max(0.0);
        if frame_time > MAX_FRAME_TIME {
            warn!(
                "Frame time {:.1}ms exceeds maximum, clamping to {:.1}ms",
                frame_time * 1000.0,
                MAX_FRAME_TIME * 1000.0
            );
            frame_time = MAX_FRAME_TIME;
        }

        self.accumulator += frame_time;

        let mut steps = 0;
        while self.accumulator >= FIXED_DT {
            update_fn(FIXED_DT, self.total_sim_time);
            self.total_sim_time += FIXED_DT;
            self.accumulator -= FIXED_DT;
            self.update_count += 1;
            steps += 1;
        }

        self.frame_count += 1;
        steps
    }

    /// Total number of frames run.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Total number of simulation steps executed.
    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    /// Total simulation time in seconds.
    pub fn total_sim_time(&self) -> f64 {
        self.total_sim_time
    }
}
