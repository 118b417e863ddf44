//! Headless streaming driver for the mirage world.
//!
//! Loads configuration, builds a [`WorldSession`](session::WorldSession) and
//! walks a scripted viewer through it on a fixed timestep.

pub mod driver;
pub mod error;
pub mod game_loop;
pub mod platform;
pub mod session;
pub mod viewer;

pub use driver::{Driver, RunReport};
pub use error::AppError;
pub use session::{TickSummary, WorldSession};
pub use viewer::ViewerPath;
