#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Grid searches over the discovered map.
//!
//! Both strategies walk the 8-connected grid restricted to the current
//! bounds and answer two questions: how to reach the nearest known cell of a
//! given kind, and how to reach the nearest unknown cell. Searches borrow the
//! map immutably and allocate their containers per call.

mod astar;
mod bfs;

pub use astar::{AStar, DistanceMetric};
pub use bfs::Bfs;

use log::warn;
use maze_explorer_core::{Bounds, CellCoord, CellKind, MapView, Path, Step};
use thiserror::Error;

/// Cost of a horizontal or vertical step.
pub const STRAIGHT_COST: u32 = 10;
/// Cost of a diagonal step.
pub const DIAGONAL_COST: u32 = 14;

/// Shared contract implemented by every search strategy.
pub trait PathFinder {
    /// Path to the nearest known cell of `kind`, walking only known passable cells.
    fn path_to_kind(
        &self,
        map: MapView<'_>,
        kind: &CellKind,
        start: CellCoord,
        bounds: Bounds,
    ) -> Option<Path>;

    /// Path to the nearest unknown in-bounds cell.
    fn path_to_unknown(&self, map: MapView<'_>, start: CellCoord, bounds: Bounds) -> Option<Path>;
}

/// Runtime choice between the available strategies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Algorithm {
    /// Unweighted breadth-first search.
    #[default]
    Bfs,
    /// Heuristic search using the provided distance metric.
    AStar(DistanceMetric),
}

impl PathFinder for Algorithm {
    fn path_to_kind(
        &self,
        map: MapView<'_>,
        kind: &CellKind,
        start: CellCoord,
        bounds: Bounds,
    ) -> Option<Path> {
        match self {
            Self::Bfs => Bfs.path_to_kind(map, kind, start, bounds),
            Self::AStar(metric) => AStar::new(*metric).path_to_kind(map, kind, start, bounds),
        }
    }

    fn path_to_unknown(&self, map: MapView<'_>, start: CellCoord, bounds: Bounds) -> Option<Path> {
        match self {
            Self::Bfs => Bfs.path_to_unknown(map, start, bounds),
            Self::AStar(metric) => AStar::new(*metric).path_to_unknown(map, start, bounds),
        }
    }
}

/// Failures detected while turning search results into a path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum SearchError {
    /// A node other than the start had no recorded predecessor.
    #[error("predecessor chain broken at {at}")]
    BrokenChain {
        /// Node whose predecessor is missing.
        at: CellCoord,
    },
    /// Two consecutive waypoints are not neighbours.
    #[error("waypoints {from} and {to} are not adjacent")]
    NonAdjacent {
        /// Earlier waypoint.
        from: CellCoord,
        /// Later waypoint.
        to: CellCoord,
    },
}

/// Walkability for searches towards a known kind.
pub(crate) fn passable_known(map: &MapView<'_>, bounds: &Bounds, coord: CellCoord) -> bool {
    bounds.contains(coord) && map.kind(coord).map_or(false, |kind| !kind.is_obstacle())
}

/// Walkability for searches towards the unknown.
pub(crate) fn passable_or_unknown(map: &MapView<'_>, bounds: &Bounds, coord: CellCoord) -> bool {
    !map.is_obstacle(coord, bounds)
}

/// Reports whether a coordinate is an in-bounds unknown cell.
pub(crate) fn is_frontier(map: &MapView<'_>, bounds: &Bounds, coord: CellCoord) -> bool {
    bounds.contains(coord) && !map.is_known(coord)
}

/// Converts ordered waypoints (start first) into a path.
pub(crate) fn steps_between(waypoints: &[CellCoord]) -> Result<Option<Path>, SearchError> {
    let mut steps = Vec::with_capacity(waypoints.len().saturating_sub(1));
    for pair in waypoints.windows(2) {
        let step = Step::between(pair[0], pair[1]).ok_or(SearchError::NonAdjacent {
            from: pair[0],
            to: pair[1],
        })?;
        steps.push(step);
    }
    Ok(Path::from_steps(steps))
}

/// Logs reconstruction failures and downgrades them to "no path".
pub(crate) fn settle(result: Result<Option<Path>, SearchError>) -> Option<Path> {
    match result {
        Ok(path) => path,
        Err(error) => {
            warn!("discarding search result: {error}");
            None
        }
    }
}
