//! Unweighted breadth-first search.

use std::collections::{HashMap, VecDeque};

use log::debug;
use maze_explorer_core::{Bounds, CellCoord, CellKind, MapView, Path, Step};

use crate::{is_frontier, passable_known, passable_or_unknown, settle, PathFinder, SearchError};

/// Breadth-first search returning paths with the fewest steps.
///
/// Targets are tested when a neighbour is first discovered, so the first
/// match is the nearest by step count. The start cell is never a target:
/// an agent standing on a matching cell gets the path to the next match
/// instead of no path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Bfs;

impl Bfs {
    fn search<W, T>(start: CellCoord, mut walkable: W, mut is_target: T) -> Option<Path>
    where
        W: FnMut(CellCoord) -> bool,
        T: FnMut(CellCoord) -> bool,
    {
        let mut predecessors: HashMap<CellCoord, CellCoord> = HashMap::new();
        let mut queue = VecDeque::new();
        queue.push_back(start);

        while let Some(current) = queue.pop_front() {
            for step in Step::NEIGHBOURS {
                let next = current.offset(step);
                if next == start || predecessors.contains_key(&next) {
                    continue;
                }

                if !walkable(next) {
                    continue;
                }

                let _ = predecessors.insert(next, current);
                if is_target(next) {
                    debug!("bfs reached {next} after {} visits", predecessors.len());
                    return settle(reconstruct(&predecessors, start, next));
                }
                queue.push_back(next);
            }
        }

        None
    }
}

impl PathFinder for Bfs {
    fn path_to_kind(
        &self,
        map: MapView<'_>,
        kind: &CellKind,
        start: CellCoord,
        bounds: Bounds,
    ) -> Option<Path> {
        Self::search(
            start,
            |coord| passable_known(&map, &bounds, coord),
            |coord| map.kind(coord) == Some(kind),
        )
    }

    fn path_to_unknown(&self, map: MapView<'_>, start: CellCoord, bounds: Bounds) -> Option<Path> {
        Self::search(
            start,
            |coord| passable_or_unknown(&map, &bounds, coord),
            |coord| is_frontier(&map, &bounds, coord),
        )
    }
}

fn reconstruct(
    predecessors: &HashMap<CellCoord, CellCoord>,
    start: CellCoord,
    goal: CellCoord,
) -> Result<Option<Path>, SearchError> {
    let mut waypoints = vec![goal];
    let mut current = goal;
    while current != start {
        current = *predecessors
            .get(&current)
            .ok_or(SearchError::BrokenChain { at: current })?;
        waypoints.push(current);
    }
    waypoints.reverse();
    crate::steps_between(&waypoints)
}
