//! Sparse store of discovered cells plus the shrinking world bounds.

use std::collections::HashMap;

use maze_explorer_core::{Bounds, Cell, CellCoord, CellKind, MapStatistics, MapView};

/// Result of merging a batch of cells into the map.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Coordinates that were unknown before the merge.
    pub discovered: usize,
    /// Coordinates whose record was overwritten.
    pub updated: usize,
}

/// Discovered cells keyed by absolute coordinate.
///
/// Absence of a key means the cell is unknown. Bounds start wide and only
/// ever tighten as truncated observations reveal the edge of the world.
#[derive(Clone, Debug, Default)]
pub struct WorldMap {
    cells: HashMap<CellCoord, Cell>,
    bounds: Bounds,
}

impl WorldMap {
    /// Creates an empty map with the default bounds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets every cell and restores the default bounds.
    pub fn clear(&mut self) {
        self.cells.clear();
        self.bounds = Bounds::default();
    }

    /// Current bounds of the explorable region.
    #[must_use]
    pub const fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Read-only view used by searches and presentation.
    #[must_use]
    pub fn view(&self) -> MapView<'_> {
        MapView::new(&self.cells)
    }

    /// Number of discovered cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Reports whether nothing has been discovered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Upserts cells; later reports for a coordinate replace earlier ones.
    pub fn merge(&mut self, cells: impl IntoIterator<Item = Cell>) -> MergeSummary {
        let mut summary = MergeSummary::default();
        for cell in cells {
            match self.cells.insert(cell.coord, cell) {
                Some(_) => summary.updated += 1,
                None => summary.discovered += 1,
            }
        }
        summary
    }

    /// Narrows the bounds around `position` using gaps in the known cells.
    ///
    /// Offsets are checked from `radius` inwards along each axis so the gap
    /// closest to the agent decides the candidate. A candidate that would
    /// widen the current bound is ignored. Returns whether any bound moved.
    pub fn adjust_bounds(&mut self, position: CellCoord, radius: i32) -> bool {
        let mut min_x = None;
        let mut min_y = None;
        let mut max_x = None;
        let mut max_y = None;

        for i in (1..=radius).rev() {
            if !self.cells.contains_key(&position.translate(-i, 0)) {
                min_x = Some(position.x() - i + 1);
            }
            if !self.cells.contains_key(&position.translate(0, -i)) {
                min_y = Some(position.y() - i + 1);
            }
            if !self.cells.contains_key(&position.translate(i, 0)) {
                max_x = Some(position.x() + i - 1);
            }
            if !self.cells.contains_key(&position.translate(0, i)) {
                max_y = Some(position.y() + i - 1);
            }
        }

        let current = self.bounds;
        let narrowed = Bounds::new(
            min_x.map_or(current.min_x(), |candidate| candidate.max(current.min_x())),
            min_y.map_or(current.min_y(), |candidate| candidate.max(current.min_y())),
            max_x.map_or(current.max_x(), |candidate| candidate.min(current.max_x())),
            max_y.map_or(current.max_y(), |candidate| candidate.min(current.max_y())),
        );
        self.bounds = narrowed;
        narrowed != current
    }

    /// Reports whether a coordinate blocks movement.
    #[must_use]
    pub fn is_obstacle(&self, coord: CellCoord) -> bool {
        self.view().is_obstacle(coord, &self.bounds)
    }

    /// Marks a collected cell as empty, returning the category it carried.
    ///
    /// Unknown coordinates and cells that are already empty are left alone.
    pub fn consume(&mut self, coord: CellCoord) -> Option<CellKind> {
        let cell = self.cells.get_mut(&coord)?;
        if cell.kind == CellKind::Empty {
            return None;
        }
        Some(std::mem::replace(&mut cell.kind, CellKind::Empty))
    }

    /// Per-type census of the discovered cells.
    #[must_use]
    pub fn statistics(&self) -> MapStatistics {
        MapStatistics::from_cells(self.cells.values())
    }

    /// Every discovered cell ordered by coordinate.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Cell> {
        let mut cells: Vec<Cell> = self.cells.values().cloned().collect();
        cells.sort_by_key(|cell| cell.coord);
        cells
    }
}
