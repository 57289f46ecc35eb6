// types.rs - Tile model and wire-level records for the maze web service

use log::error;
use serde::{Deserialize, Serialize};

use crate::error_handling::{Result, SyncError};

// ============= Tile Model =============

/// The three tile states a cell can hold.
///
/// The successor order Wall -> Path -> Hole -> Wall is part of the editing
/// contract; adding a state means extending `next` explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    #[serde(rename = "W")]
    Wall,
    #[serde(rename = "T")]
    Path,
    #[serde(rename = "H")]
    Hole,
}

impl TileKind {
    /// Successor in the click-to-cycle order.
    pub fn next(self) -> TileKind {
        match self {
            TileKind::Wall => TileKind::Path,
            TileKind::Path => TileKind::Hole,
            TileKind::Hole => TileKind::Wall,
        }
    }

    /// Single-letter code used in tile upsert URLs and stored payloads.
    pub fn code(self) -> &'static str {
        match self {
            TileKind::Wall => "W",
            TileKind::Path => "T",
            TileKind::Hole => "H",
        }
    }

    /// Parses a stored tile code. Anything but W/T/H is rejected.
    pub fn from_code(code: &str) -> Result<TileKind> {
        match code {
            "W" => Ok(TileKind::Wall),
            "T" => Ok(TileKind::Path),
            "H" => Ok(TileKind::Hole),
            other => {
                let err = SyncError::UnknownTileCode {
                    code: other.to_string(),
                };
                error!("{err}");
                Err(err)
            }
        }
    }
}

/// One cell of the local grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileRecord {
    pub row: u32,
    pub column: u32,
    pub kind: TileKind,
    /// Density falloff rolled once at generation time, range 1..100.
    pub falloff: u32,
}

impl TileRecord {
    pub fn new(row: u32, column: u32, kind: TileKind, falloff: u32) -> Self {
        TileRecord {
            row,
            column,
            kind,
            falloff,
        }
    }

    /// Walls always render; other tiles render only while the maze density
    /// is at or above their falloff.
    pub fn is_visible(&self, density: u32) -> bool {
        self.kind == TileKind::Wall || self.falloff <= density
    }
}

// ============= Wire Records =============

/// Maze resource as the web service returns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MazeRecord {
    pub maze_id: i64,
    pub name: String,
    #[serde(default)]
    pub creation_date: Option<String>,
    #[serde(default)]
    pub density: f64,
    /// Set on secondary mazes, linking back to the maze they were derived from.
    #[serde(default)]
    pub original_maze_id: Option<i64>,
    #[serde(default)]
    pub maze_tiles: Vec<MazeTileRecord>,
}

/// Tile resource as the web service returns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MazeTileRecord {
    #[serde(default)]
    pub tile_id: i64,
    pub row_index: u32,
    pub column_index: u32,
    pub tile_type: String,
    #[serde(default)]
    pub maze_id: Option<i64>,
    #[serde(default)]
    pub density_fall_off: u32,
}

impl MazeTileRecord {
    /// Converts the wire record into a local tile.
    pub fn decode(&self) -> Result<TileRecord> {
        let kind = TileKind::from_code(&self.tile_type)?;
        Ok(TileRecord::new(
            self.row_index,
            self.column_index,
            kind,
            self.density_fall_off,
        ))
    }

    pub fn from_tile(tile: &TileRecord) -> Self {
        MazeTileRecord {
            tile_id: 0,
            row_index: tile.row,
            column_index: tile.column,
            tile_type: tile.kind.code().to_string(),
            maze_id: None,
            density_fall_off: tile.falloff,
        }
    }
}

/// Decodes a full tile list, rejecting the batch on the first bad record.
pub fn decode_tiles(records: &[MazeTileRecord]) -> Result<Vec<TileRecord>> {
    records.iter().map(MazeTileRecord::decode).collect()
}

/// Request body for maze creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MazeSpec {
    pub name: String,
    pub rows: u32,
    pub columns: u32,
    pub tile_density: u32,
    pub tile_offset: u32,
}
