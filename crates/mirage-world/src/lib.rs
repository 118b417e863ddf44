//! Tile-level world state: the layout cache keyed by tile and session seed,
//! and the streaming loop that loads and unloads tiles around the viewer.

mod layout_cache;
mod streaming;

pub use layout_cache::{CacheStats, LayoutCache, LayoutKey};
pub use streaming::{MAX_LOAD_RADIUS, StreamConfig, StreamTick, TileLoadQueue, TileStreamer};
