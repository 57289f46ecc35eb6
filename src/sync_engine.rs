// sync_engine.rs - Save/load reconciliation between a local grid and the remote store

use log::{debug, error, info};

use crate::error_handling::{Result, SyncError};
use crate::http_client::RemoteMazeStore;
use crate::tile_grid::{GridSpec, TileGridProvider};
use crate::types::{decode_tiles, MazeSpec, TileRecord};

// ============= Configuration =============

/// Session configuration handed to the engine at construction.
#[derive(Debug, Clone, Default)]
pub struct SyncConfig {
    /// Maze name to sync against. When unset (or blank) the name is
    /// derived from the grid dimensions.
    pub maze_name: Option<String>,
    /// When set, each save of an existing maze also rebuilds a secondary
    /// maze under this name, linked to the primary. Must differ from the
    /// effective primary name.
    pub secondary_name: Option<String>,
}

/// Name used when none is configured: `maze{rows}x{columns}`.
pub fn default_maze_name(rows: u32, columns: u32) -> String {
    format!("maze{rows}x{columns}")
}

// ============= Reports =============

/// What a completed save did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub maze_id: i64,
    pub secondary_maze_id: Option<i64>,
    /// True when the maze did not exist and was created by this save.
    pub created_maze: bool,
    /// Targeted deletes issued for cells edited since the last sync.
    pub tiles_deleted: usize,
    /// Tile upserts issued, across primary and secondary.
    pub tiles_written: usize,
}

/// What a completed load brought back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub maze_id: i64,
    pub name: String,
    pub rows: u32,
    pub columns: u32,
    pub density: u32,
    pub tile_count: usize,
}

// ============= Engine =============

/// Drives the maze sync protocol against a [`RemoteMazeStore`].
///
/// Save and load take `&mut self`, which keeps a session's remote calls
/// strictly sequential. Failures are terminal for the call that hit
/// them: writes already applied stand, and the next save starts the
/// protocol over from the top.
pub struct SyncEngine<S> {
    store: S,
    config: SyncConfig,
}

impl<S: RemoteMazeStore> SyncEngine<S> {
    pub fn new(store: S, config: SyncConfig) -> Self {
        SyncEngine { store, config }
    }

    fn effective_name(&self, spec: &GridSpec) -> String {
        match &self.config.maze_name {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => default_maze_name(spec.rows, spec.columns),
        }
    }

    /// Persists the provider's grid to the store.
    ///
    /// Saving over an existing maze first deletes the stored copy of
    /// every cell edited since the last sync. A configured secondary
    /// maze is then torn down and recreated against the primary's id.
    /// Finally the full tile snapshot is rewritten into the primary and
    /// into the secondary. A maze not on the store yet is simply created
    /// and written in full, with no deletes and no secondary. Edit
    /// tracking is cleared only once everything above succeeded, so a
    /// failed save retries from scratch.
    ///
    /// A secondary name equal to the primary's is rejected before any
    /// remote call is made.
    pub async fn save<P: TileGridProvider>(&mut self, provider: &mut P) -> Result<SaveReport> {
        let spec = provider.grid_spec();
        let name = self.effective_name(&spec);
        if self.config.secondary_name.as_deref() == Some(name.as_str()) {
            let err = SyncError::InvalidConfig {
                message: format!("secondary maze name `{name}` matches the primary maze name"),
            };
            error!("{err}");
            return Err(err);
        }
        let tiles = provider.current_tiles();
        let edited = provider.edited_cells();
        info!(
            "Saving maze `{name}`: {} tiles, {} edited since last sync",
            tiles.len(),
            edited.len()
        );

        let (maze_id, created) = match self.store.find_maze_by_name(&name).await? {
            Some(record) => (record.maze_id, false),
            None => {
                info!("Maze `{name}` not on the store yet, creating it");
                let maze_spec = MazeSpec {
                    name: name.clone(),
                    rows: spec.rows,
                    columns: spec.columns,
                    tile_density: spec.density,
                    tile_offset: spec.offset,
                };
                let record = self.store.create_maze(&maze_spec).await?;
                (record.maze_id, true)
            }
        };

        let mut tiles_deleted = 0;
        let mut secondary_id = None;

        if !created {
            for (row, column) in &edited {
                self.store.delete_tile(maze_id, *row, *column).await?;
                tiles_deleted += 1;
            }
            if tiles_deleted > 0 {
                debug!("deleted {tiles_deleted} edited tiles from maze {maze_id}");
            }

            if let Some(secondary_name) = self.config.secondary_name.as_deref() {
                secondary_id = Some(self.rebuild_secondary(secondary_name, maze_id).await?);
            }

            self.store.delete_all_tiles(maze_id).await?;
        }

        let mut tiles_written = self.write_tiles(maze_id, &tiles).await?;
        if let Some(secondary_id) = secondary_id {
            self.store.delete_all_tiles(secondary_id).await?;
            tiles_written += self.write_tiles(secondary_id, &tiles).await?;
        }

        provider.mark_synced();
        info!("Saved maze `{name}` (id {maze_id}): {tiles_written} tiles written");
        Ok(SaveReport {
            maze_id,
            secondary_maze_id: secondary_id,
            created_maze: created,
            tiles_deleted,
            tiles_written,
        })
    }

    /// Replaces the provider's grid with the maze stored under the given
    /// name (falling back to the configured or derived name).
    ///
    /// A missing maze is an error, never an implicit create. The grid is
    /// only touched once the whole payload has decoded, so a bad record
    /// leaves local state as it was.
    pub async fn load<P: TileGridProvider>(
        &mut self,
        provider: &mut P,
        name_override: Option<&str>,
    ) -> Result<LoadReport> {
        let spec = provider.grid_spec();
        let name = match name_override {
            Some(name) => name.to_string(),
            None => self.effective_name(&spec),
        };
        info!("Loading maze `{name}`");

        let maze = self
            .store
            .find_maze_by_name(&name)
            .await?
            .ok_or_else(|| {
                let err = SyncError::MazeNotFound { name: name.clone() };
                error!("{err}");
                err
            })?;
        let tiles = decode_tiles(&maze.maze_tiles)?;
        let density = maze.density as u32;
        let tile_count = tiles.len();

        provider.apply_loaded_tiles(tiles, density);
        let loaded = provider.grid_spec();
        info!(
            "Loaded maze `{}` (id {}): {tile_count} tiles, {}x{}",
            maze.name, maze.maze_id, loaded.rows, loaded.columns
        );
        Ok(LoadReport {
            maze_id: maze.maze_id,
            name: maze.name,
            rows: loaded.rows,
            columns: loaded.columns,
            density,
            tile_count,
        })
    }

    /// Drops any stale maze under `name` and creates a fresh one linked
    /// to the primary.
    async fn rebuild_secondary(&self, name: &str, original_id: i64) -> Result<i64> {
        if let Some(stale) = self.store.find_maze_by_name(name).await? {
            info!(
                "Replacing secondary maze `{name}` (id {})",
                stale.maze_id
            );
            self.store.delete_all_tiles(stale.maze_id).await?;
            self.store.delete_maze(stale.maze_id).await?;
        }
        let secondary = self.store.create_secondary_maze(name, original_id).await?;
        Ok(secondary.maze_id)
    }

    async fn write_tiles(&self, maze_id: i64, tiles: &[TileRecord]) -> Result<usize> {
        for tile in tiles {
            self.store.upsert_tile(maze_id, tile).await?;
            debug!("wrote tile ({}, {}) to maze {maze_id}", tile.row, tile.column);
        }
        Ok(tiles.len())
    }
}
