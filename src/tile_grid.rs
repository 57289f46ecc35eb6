// tile_grid.rs - Local tile grid state and the provider seam the sync engine talks to

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::types::{TileKind, TileRecord};

// ============= Grid Shape =============

/// Dimensions and display parameters of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSpec {
    pub rows: u32,
    pub columns: u32,
    /// Display density threshold, compared against per-tile falloff.
    pub density: u32,
    /// Spacing between tiles when the grid is laid out for display.
    pub offset: u32,
}

/// Smallest bounding dimensions covering every tile in the list.
///
/// An empty list yields a 0x0 grid. Gaps inside the extent are preserved
/// as missing cells. Indices are remote-supplied; the +1 saturates
/// instead of overflowing on extreme values.
pub fn infer_dimensions(tiles: &[TileRecord]) -> (u32, u32) {
    let mut rows = 0;
    let mut columns = 0;
    for tile in tiles {
        rows = rows.max(tile.row.saturating_add(1));
        columns = columns.max(tile.column.saturating_add(1));
    }
    (rows, columns)
}

// ============= Provider Seam =============

/// What the sync engine needs from whoever owns the editable grid.
///
/// `TileGrid` is the in-crate implementation; an editor embedding the
/// engine supplies its own.
pub trait TileGridProvider {
    fn grid_spec(&self) -> GridSpec;

    /// Every live tile, in row-major order.
    fn current_tiles(&self) -> Vec<TileRecord>;

    /// Cells touched since the last successful save, in row-major order.
    fn edited_cells(&self) -> Vec<(u32, u32)>;

    /// Edit notification from the input layer. Targets outside the grid
    /// are ignored.
    fn record_edit(&mut self, row: u32, column: u32, kind: TileKind);

    /// Replaces all local state with tiles fetched from the store.
    fn apply_loaded_tiles(&mut self, tiles: Vec<TileRecord>, density: u32);

    /// Called once a save has fully succeeded.
    fn mark_synced(&mut self);
}

// ============= Tile Grid =============

/// Editable maze grid keyed by (row, column).
///
/// Tiles iterate in row-major order, which fixes the order of every bulk
/// operation sent to the store. Cells edited since the last successful
/// save are tracked separately so saves can delete exactly those tiles
/// before rewriting.
#[derive(Debug, Clone)]
pub struct TileGrid {
    spec: GridSpec,
    tiles: BTreeMap<(u32, u32), TileRecord>,
    edited: BTreeSet<(u32, u32)>,
}

impl TileGrid {
    /// Empty grid with the given shape. Useful as a load target.
    pub fn new(spec: GridSpec) -> Self {
        TileGrid {
            spec,
            tiles: BTreeMap::new(),
            edited: BTreeSet::new(),
        }
    }

    /// Full grid: border cells are walls, interior cells are paths, and
    /// every tile rolls its falloff once in 1..100.
    pub fn generate(spec: GridSpec, rng: &mut impl Rng) -> Self {
        let mut tiles = BTreeMap::new();
        for row in 0..spec.rows {
            for column in 0..spec.columns {
                let border = row == 0
                    || column == 0
                    || row + 1 == spec.rows
                    || column + 1 == spec.columns;
                let kind = if border { TileKind::Wall } else { TileKind::Path };
                let falloff = rng.gen_range(1..100);
                tiles.insert((row, column), TileRecord::new(row, column, kind, falloff));
            }
        }
        TileGrid {
            spec,
            tiles,
            edited: BTreeSet::new(),
        }
    }

    pub fn spec(&self) -> GridSpec {
        self.spec
    }

    pub fn tile(&self, row: u32, column: u32) -> Option<&TileRecord> {
        self.tiles.get(&(row, column))
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Sets a cell to `kind`, keeping its falloff. Returns the new kind,
    /// or `None` when no tile exists there. Setting a cell to the kind it
    /// already holds does not mark it edited.
    pub fn apply_edit(&mut self, row: u32, column: u32, kind: TileKind) -> Option<TileKind> {
        let tile = self.tiles.get_mut(&(row, column))?;
        if tile.kind != kind {
            tile.kind = kind;
            self.edited.insert((row, column));
        }
        Some(kind)
    }

    /// Advances a cell to the successor of its current kind.
    pub fn cycle_tile(&mut self, row: u32, column: u32) -> Option<TileKind> {
        let next = self.tiles.get(&(row, column))?.kind.next();
        self.apply_edit(row, column, next)
    }
}

impl TileGridProvider for TileGrid {
    fn grid_spec(&self) -> GridSpec {
        self.spec
    }

    fn current_tiles(&self) -> Vec<TileRecord> {
        self.tiles.values().copied().collect()
    }

    fn edited_cells(&self) -> Vec<(u32, u32)> {
        self.edited.iter().copied().collect()
    }

    fn record_edit(&mut self, row: u32, column: u32, kind: TileKind) {
        if self.apply_edit(row, column, kind).is_none() {
            log::warn!("edit notification for missing tile ({row}, {column}) ignored");
        }
    }

    fn apply_loaded_tiles(&mut self, tiles: Vec<TileRecord>, density: u32) {
        let (rows, columns) = infer_dimensions(&tiles);
        self.tiles = tiles
            .into_iter()
            .map(|tile| ((tile.row, tile.column), tile))
            .collect();
        self.spec.rows = rows;
        self.spec.columns = columns;
        self.spec.density = density;
        self.edited.clear();
    }

    fn mark_synced(&mut self) {
        self.edited.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn spec(rows: u32, columns: u32) -> GridSpec {
        GridSpec {
            rows,
            columns,
            density: 50,
            offset: 1,
        }
    }

    #[test]
    fn test_generate_builds_walled_border() {
        let mut rng = StdRng::seed_from_u64(42);
        let grid = TileGrid::generate(spec(5, 7), &mut rng);
        assert_eq!(grid.tile_count(), 35);
        for row in 0..5 {
            for column in 0..7 {
                let tile = grid.tile(row, column).unwrap();
                let border = row == 0 || column == 0 || row == 4 || column == 6;
                if border {
                    assert_eq!(tile.kind, TileKind::Wall, "({row}, {column})");
                } else {
                    assert_eq!(tile.kind, TileKind::Path, "({row}, {column})");
                }
                assert!((1..100).contains(&tile.falloff));
            }
        }
    }

    #[test]
    fn test_current_tiles_are_row_major() {
        let mut rng = StdRng::seed_from_u64(1);
        let grid = TileGrid::generate(spec(3, 3), &mut rng);
        let cells: Vec<(u32, u32)> = grid
            .current_tiles()
            .iter()
            .map(|t| (t.row, t.column))
            .collect();
        let mut sorted = cells.clone();
        sorted.sort();
        assert_eq!(cells, sorted);
        assert_eq!(cells[0], (0, 0));
        assert_eq!(cells[8], (2, 2));
    }

    #[test]
    fn test_cycle_tile_marks_cell_edited() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut grid = TileGrid::generate(spec(4, 4), &mut rng);
        assert!(grid.edited_cells().is_empty());

        assert_eq!(grid.cycle_tile(1, 2), Some(TileKind::Hole));
        assert_eq!(grid.cycle_tile(1, 2), Some(TileKind::Wall));
        assert_eq!(grid.cycle_tile(2, 1), Some(TileKind::Hole));

        assert_eq!(grid.edited_cells(), vec![(1, 2), (2, 1)]);
    }

    #[test]
    fn test_noop_edit_does_not_mark_cell() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut grid = TileGrid::generate(spec(4, 4), &mut rng);
        grid.record_edit(0, 0, TileKind::Wall);
        assert!(grid.edited_cells().is_empty());
    }

    #[test]
    fn test_edit_outside_grid_is_ignored() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut grid = TileGrid::generate(spec(4, 4), &mut rng);
        assert_eq!(grid.cycle_tile(4, 0), None);
        grid.record_edit(9, 9, TileKind::Hole);
        assert!(grid.edited_cells().is_empty());
        assert_eq!(grid.tile_count(), 16);
    }

    #[test]
    fn test_cycle_keeps_falloff() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut grid = TileGrid::generate(spec(4, 4), &mut rng);
        let before = grid.tile(2, 2).unwrap().falloff;
        grid.cycle_tile(2, 2);
        assert_eq!(grid.tile(2, 2).unwrap().falloff, before);
    }

    #[test]
    fn test_apply_loaded_tiles_replaces_state_and_infers_shape() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut grid = TileGrid::generate(spec(8, 8), &mut rng);
        grid.cycle_tile(3, 3);

        let loaded = vec![
            TileRecord::new(0, 0, TileKind::Wall, 10),
            TileRecord::new(0, 3, TileKind::Path, 60),
            TileRecord::new(2, 1, TileKind::Hole, 30),
        ];
        grid.apply_loaded_tiles(loaded, 75);

        assert_eq!(grid.spec().rows, 3);
        assert_eq!(grid.spec().columns, 4);
        assert_eq!(grid.spec().density, 75);
        assert_eq!(grid.tile_count(), 3);
        assert!(grid.tile(1, 1).is_none());
        assert!(grid.edited_cells().is_empty());
    }

    #[test]
    fn test_apply_loaded_tiles_empty_list_gives_empty_grid() {
        let mut grid = TileGrid::new(spec(4, 4));
        grid.apply_loaded_tiles(Vec::new(), 50);
        assert_eq!(grid.spec().rows, 0);
        assert_eq!(grid.spec().columns, 0);
        assert_eq!(grid.tile_count(), 0);
    }

    #[test]
    fn test_duplicate_loaded_cells_last_write_wins() {
        let mut grid = TileGrid::new(spec(2, 2));
        let loaded = vec![
            TileRecord::new(0, 0, TileKind::Wall, 10),
            TileRecord::new(0, 0, TileKind::Hole, 90),
        ];
        grid.apply_loaded_tiles(loaded, 50);
        assert_eq!(grid.tile_count(), 1);
        assert_eq!(grid.tile(0, 0).unwrap().kind, TileKind::Hole);
    }

    #[test]
    fn test_infer_dimensions_from_extent() {
        assert_eq!(infer_dimensions(&[]), (0, 0));
        let tiles = vec![
            TileRecord::new(0, 9, TileKind::Path, 1),
            TileRecord::new(4, 2, TileKind::Wall, 1),
        ];
        assert_eq!(infer_dimensions(&tiles), (5, 10));
    }

    #[test]
    fn test_infer_dimensions_saturates_at_index_limit() {
        let tiles = vec![TileRecord::new(u32::MAX, 2, TileKind::Path, 1)];
        assert_eq!(infer_dimensions(&tiles), (u32::MAX, 3));
    }
}
