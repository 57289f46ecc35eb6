// main.rs - CLI for generating, editing, and syncing mazes against the maze web service

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use maze_sync::{
    GridSpec, HttpMazeStore, SyncConfig, SyncEngine, TileGrid, TileGridProvider, TileKind,
    TileRecord,
};

/// CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Base URL of the maze web service API
    #[arg(long, default_value = "http://localhost:5216/api")]
    pub base_url: String,

    /// Maze name; derived from the dimensions (maze{R}x{C}) when omitted
    #[arg(short, long)]
    pub name: Option<String>,

    /// Secondary maze name, rebuilt on every save of an existing maze
    #[arg(long)]
    pub secondary: Option<String>,

    /// Grid rows
    #[arg(short, long, default_value = "8")]
    pub rows: u32,

    /// Grid columns
    #[arg(short, long, default_value = "8")]
    pub columns: u32,

    /// Density threshold for tile visibility (0-100)
    #[arg(short, long, default_value = "50")]
    pub density: u32,

    /// Tile spacing used by display layouts
    #[arg(long, default_value = "1")]
    pub offset: u32,

    /// Seed for grid generation; entropy-seeded when omitted
    #[arg(long)]
    pub seed: Option<u64>,

    /// Load the maze from the store instead of generating a grid
    #[arg(long)]
    pub load: bool,

    /// Cycle the tile at ROW,COL through wall -> path -> hole (repeatable)
    #[arg(long, value_name = "ROW,COL", value_parser = parse_cell)]
    pub cycle: Vec<(u32, u32)>,

    /// Save the grid back to the store
    #[arg(long)]
    pub save: bool,

    /// Request timeout in seconds
    #[arg(long, default_value = "10")]
    pub timeout: u64,

    /// Read the starting grid from a local JSON snapshot
    #[arg(long)]
    pub grid: Option<PathBuf>,

    /// Write the final grid to a local JSON snapshot
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Print the grid as ASCII, with tiles hidden by density as '.'
    #[arg(long)]
    pub print: bool,
}

fn parse_cell(s: &str) -> Result<(u32, u32), String> {
    let (row, column) = s
        .split_once(',')
        .ok_or_else(|| format!("expected ROW,COL, got `{s}`"))?;
    let row = row
        .trim()
        .parse()
        .map_err(|err| format!("bad row in `{s}`: {err}"))?;
    let column = column
        .trim()
        .parse()
        .map_err(|err| format!("bad column in `{s}`: {err}"))?;
    Ok((row, column))
}

/// On-disk grid snapshot, kept separate from the wire records
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GridSnapshot {
    rows: u32,
    columns: u32,
    density: u32,
    offset: u32,
    tiles: Vec<TileRecord>,
}

async fn read_grid_snapshot(path: &Path) -> Result<TileGrid> {
    let s = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let snapshot: GridSnapshot = serde_json::from_str(&s)
        .with_context(|| format!("Failed to parse grid snapshot from {}", path.display()))?;
    let mut grid = TileGrid::new(GridSpec {
        rows: snapshot.rows,
        columns: snapshot.columns,
        density: snapshot.density,
        offset: snapshot.offset,
    });
    grid.apply_loaded_tiles(snapshot.tiles, snapshot.density);
    Ok(grid)
}

async fn write_grid_snapshot(grid: &TileGrid, path: &Path) -> Result<()> {
    let spec = grid.spec();
    let snapshot = GridSnapshot {
        rows: spec.rows,
        columns: spec.columns,
        density: spec.density,
        offset: spec.offset,
        tiles: grid.current_tiles(),
    };
    let json =
        serde_json::to_string_pretty(&snapshot).context("Failed to serialize grid snapshot")?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn render_ascii(grid: &TileGrid) -> String {
    let spec = grid.spec();
    let mut out = String::new();
    for row in 0..spec.rows {
        for column in 0..spec.columns {
            out.push(match grid.tile(row, column) {
                Some(tile) if !tile.is_visible(spec.density) => '.',
                Some(tile) => match tile.kind {
                    TileKind::Wall => 'W',
                    TileKind::Path => 'T',
                    TileKind::Hole => 'H',
                },
                None => ' ',
            });
        }
        out.push('\n');
    }
    out
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    info!("Starting with {args:?}");

    let store = HttpMazeStore::new(args.base_url.as_str(), Duration::from_secs(args.timeout))?;
    info!("Using maze service at {}", store.base_url());
    let config = SyncConfig {
        maze_name: args.name.clone(),
        secondary_name: args.secondary.clone(),
    };
    let mut engine = SyncEngine::new(store, config);

    let spec = GridSpec {
        rows: args.rows,
        columns: args.columns,
        density: args.density,
        offset: args.offset,
    };

    let mut grid = if let Some(path) = &args.grid {
        let grid = read_grid_snapshot(path).await?;
        info!("Read {} tiles from {}", grid.tile_count(), path.display());
        grid
    } else if args.load {
        // The store is about to replace everything anyway.
        TileGrid::new(spec)
    } else {
        let mut rng = match args.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let grid = TileGrid::generate(spec, &mut rng);
        info!(
            "Generated a {}x{} grid ({} tiles)",
            spec.rows,
            spec.columns,
            grid.tile_count()
        );
        grid
    };

    if args.load {
        let report = match engine.load(&mut grid, None).await {
            Err(err) if err.is_not_found() => {
                bail!("{err}; pass --name to pick an existing maze")
            }
            result => result?,
        };
        info!(
            "Loaded maze `{}` (id {}): {} tiles, {}x{}, density {}",
            report.name,
            report.maze_id,
            report.tile_count,
            report.rows,
            report.columns,
            report.density
        );
    }

    for (row, column) in &args.cycle {
        match grid.cycle_tile(*row, *column) {
            Some(kind) => info!("Tile ({row}, {column}) is now {kind:?}"),
            None => warn!("No tile at ({row}, {column}); cycle ignored"),
        }
    }

    if args.print {
        print!("{}", render_ascii(&grid));
    }

    if args.save {
        let report = engine.save(&mut grid).await?;
        if report.created_maze {
            info!(
                "Created maze {} with {} tiles",
                report.maze_id, report.tiles_written
            );
        } else {
            info!(
                "Updated maze {}: {} edited tiles removed, {} tiles written",
                report.maze_id, report.tiles_deleted, report.tiles_written
            );
        }
        if let Some(secondary_id) = report.secondary_maze_id {
            info!("Rebuilt secondary maze {secondary_id}");
        }
    }

    if let Some(path) = &args.out {
        write_grid_snapshot(&grid, path).await?;
        info!("Wrote grid snapshot to {}", path.display());
    }

    Ok(())
}
