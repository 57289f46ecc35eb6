// lib.rs - Library exports for maze-sync
// Provides public API for embedding the sync engine outside the CLI

pub mod error_handling;
pub mod http_client;
pub mod sync_engine;
pub mod tile_grid;
pub mod types;

// Re-export commonly used types
pub use error_handling::{Result, SyncError};
pub use http_client::{HttpMazeStore, RemoteMazeStore};
pub use sync_engine::{default_maze_name, LoadReport, SaveReport, SyncConfig, SyncEngine};
pub use tile_grid::{infer_dimensions, GridSpec, TileGrid, TileGridProvider};
pub use types::{decode_tiles, MazeRecord, MazeSpec, MazeTileRecord, TileKind, TileRecord};
