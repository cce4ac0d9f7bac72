//! Heuristic-guided search over the discovered map.

use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashMap, HashSet},
};

use log::debug;
use maze_explorer_core::{Bounds, CellCoord, CellKind, MapView, Path, Step};

use crate::{
    is_frontier, passable_known, passable_or_unknown, settle, PathFinder, SearchError,
    DIAGONAL_COST, STRAIGHT_COST,
};

const MAX_EXPANSIONS: usize = 200_000;
const CANDIDATE_LIMIT: usize = 4;

/// Distance estimate used to rank open nodes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DistanceMetric {
    /// Exact 8-connected cost on an empty grid.
    #[default]
    Octile,
    /// Estimate computed from differences of absolute coordinates.
    ///
    /// Kept for reproducing recorded runs; it is not admissible once the
    /// start and goal lie on opposite sides of an axis.
    LegacyAbsDelta,
}

impl DistanceMetric {
    /// Estimated cost between two coordinates.
    #[must_use]
    pub fn estimate(self, from: CellCoord, to: CellCoord) -> u32 {
        match self {
            Self::Octile => {
                let dx = from.x().abs_diff(to.x());
                let dy = from.y().abs_diff(to.y());
                let diagonal = dx.min(dy);
                diagonal * DIAGONAL_COST + (dx.max(dy) - diagonal) * STRAIGHT_COST
            }
            Self::LegacyAbsDelta => {
                let dx = i64::from(from.x()).abs() - i64::from(to.x()).abs();
                let dy = i64::from(from.y()).abs() - i64::from(to.y()).abs();
                let remaining = dx.abs() - dy.abs();
                let cost = (dx.abs() - remaining.abs()).unsigned_abs()
                    * u64::from(DIAGONAL_COST)
                    + remaining.unsigned_abs() * u64::from(STRAIGHT_COST);
                u32::try_from(cost).unwrap_or(u32::MAX)
            }
        }
    }
}

/// Index of a node inside the per-call arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct NodeHandle(usize);

#[derive(Clone, Copy, Debug)]
struct SearchNode {
    coord: CellCoord,
    g: u32,
    parent: Option<NodeHandle>,
}

/// A* search with straight cost 10 and diagonal cost 14.
///
/// Target cells are chosen up front by Manhattan distance. When the closest
/// candidate cannot be reached the next few candidates are tried before
/// giving up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AStar {
    metric: DistanceMetric,
}

impl Default for AStar {
    fn default() -> Self {
        Self::new(DistanceMetric::default())
    }
}

impl AStar {
    /// Creates a search using the provided metric.
    #[must_use]
    pub const fn new(metric: DistanceMetric) -> Self {
        Self { metric }
    }

    fn search<W>(
        &self,
        start: CellCoord,
        goal: CellCoord,
        mut walkable: W,
        accept_on_generation: bool,
    ) -> Option<Path>
    where
        W: FnMut(CellCoord) -> bool,
    {
        let mut arena: Vec<SearchNode> = Vec::new();
        let mut open: BinaryHeap<Reverse<(u32, usize, NodeHandle)>> = BinaryHeap::new();
        let mut closed: HashSet<CellCoord> = HashSet::new();
        let mut best: HashMap<CellCoord, u32> = HashMap::new();
        let mut sequence = 0;

        arena.push(SearchNode {
            coord: start,
            g: 0,
            parent: None,
        });
        open.push(Reverse((
            self.metric.estimate(start, goal),
            sequence,
            NodeHandle(0),
        )));
        let _ = best.insert(start, 0);

        while let Some(Reverse((_, _, handle))) = open.pop() {
            let node = arena[handle.0];
            if !closed.insert(node.coord) {
                continue;
            }

            if node.coord == goal {
                return settle(reconstruct(&arena, handle, start));
            }

            if closed.len() > MAX_EXPANSIONS {
                debug!(
                    "a* gave up on {goal} after {} expansions",
                    MAX_EXPANSIONS
                );
                return None;
            }

            for step in Step::NEIGHBOURS {
                let next = node.coord.offset(step);
                if closed.contains(&next) {
                    continue;
                }

                let g = node.g + step_cost(step);
                if next == goal && accept_on_generation {
                    arena.push(SearchNode {
                        coord: next,
                        g,
                        parent: Some(handle),
                    });
                    return settle(reconstruct(&arena, NodeHandle(arena.len() - 1), start));
                }

                if !walkable(next) {
                    continue;
                }

                if best.get(&next).map_or(false, |&known| known <= g) {
                    continue;
                }
                let _ = best.insert(next, g);

                arena.push(SearchNode {
                    coord: next,
                    g,
                    parent: Some(handle),
                });
                sequence += 1;
                open.push(Reverse((
                    g + self.metric.estimate(next, goal),
                    sequence,
                    NodeHandle(arena.len() - 1),
                )));
            }
        }

        None
    }
}

impl PathFinder for AStar {
    fn path_to_kind(
        &self,
        map: MapView<'_>,
        kind: &CellKind,
        start: CellCoord,
        bounds: Bounds,
    ) -> Option<Path> {
        let mut candidates: Vec<CellCoord> = map
            .iter()
            .filter(|cell| &cell.kind == kind && cell.coord != start)
            .filter(|cell| passable_known(&map, &bounds, cell.coord))
            .map(|cell| cell.coord)
            .collect();
        candidates.sort_by_key(|coord| (start.manhattan_distance(*coord), *coord));

        candidates
            .into_iter()
            .take(CANDIDATE_LIMIT)
            .find_map(|goal| {
                self.search(
                    start,
                    goal,
                    |coord| passable_known(&map, &bounds, coord),
                    false,
                )
            })
    }

    fn path_to_unknown(&self, map: MapView<'_>, start: CellCoord, bounds: Bounds) -> Option<Path> {
        nearest_unknown(&map, &bounds, start)
            .take(CANDIDATE_LIMIT)
            .find_map(|goal| {
                self.search(
                    start,
                    goal,
                    |coord| passable_or_unknown(&map, &bounds, coord),
                    true,
                )
            })
    }
}

fn step_cost(step: Step) -> u32 {
    if step.is_diagonal() {
        DIAGONAL_COST
    } else {
        STRAIGHT_COST
    }
}

/// Unknown in-bounds cells ordered by Manhattan distance from `start`.
///
/// Rings are walked from west to east, north before south within a column.
fn nearest_unknown<'a>(
    map: &'a MapView<'a>,
    bounds: &'a Bounds,
    start: CellCoord,
) -> impl Iterator<Item = CellCoord> + 'a {
    let reach_x = (start.x() - bounds.min_x())
        .abs()
        .max((bounds.max_x() - start.x()).abs());
    let reach_y = (start.y() - bounds.min_y())
        .abs()
        .max((bounds.max_y() - start.y()).abs());
    let max_ring = reach_x.saturating_add(reach_y);

    (1..=max_ring)
        .flat_map(move |ring| {
            (-ring..=ring).flat_map(move |dx| {
                let dy = ring - dx.abs();
                let north = start.translate(dx, -dy);
                let south = (dy != 0).then(|| start.translate(dx, dy));
                std::iter::once(north).chain(south)
            })
        })
        .filter(move |coord| is_frontier(map, bounds, *coord))
}

fn reconstruct(
    arena: &[SearchNode],
    goal: NodeHandle,
    start: CellCoord,
) -> Result<Option<Path>, SearchError> {
    let mut waypoints = Vec::new();
    let mut cursor = Some(goal);
    while let Some(handle) = cursor {
        let node = arena[handle.0];
        waypoints.push(node.coord);
        cursor = node.parent;
        if cursor.is_none() && node.coord != start {
            return Err(SearchError::BrokenChain { at: node.coord });
        }
    }
    waypoints.reverse();
    crate::steps_between(&waypoints)
}
