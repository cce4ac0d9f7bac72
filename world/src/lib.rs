#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative session state for Maze Explorer.
//!
//! A [`World`] owns the discovered map, the coordinate frame, and the bounds
//! of one exploration session. It is mutated exclusively through [`apply`];
//! everything else reads it through the [`query`] module.

mod frame;
mod map;

pub use frame::CoordinateFrame;
pub use map::{MergeSummary, WorldMap};

use log::debug;
use maze_explorer_core::{Command, Event};

/// Discovered state of a single exploration session.
#[derive(Clone, Debug, Default)]
pub struct World {
    frame: CoordinateFrame,
    map: WorldMap,
}

impl World {
    /// Creates a fresh session with an empty map and the agent at the origin.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ResetSession => {
            let from = world.frame.position();
            world.map.clear();
            world.frame = CoordinateFrame::new();
            out_events.push(Event::SessionReset);
            if from != world.frame.position() {
                out_events.push(Event::PositionChanged {
                    from,
                    to: world.frame.position(),
                });
            }
        }
        Command::SetPosition { position } => {
            let from = world.frame.position();
            world.frame.set_position(position);
            out_events.push(Event::PositionChanged { from, to: position });
        }
        Command::AdvancePosition { step } => {
            let from = world.frame.position();
            world.frame.update_position(step);
            out_events.push(Event::PositionChanged {
                from,
                to: world.frame.position(),
            });
        }
        Command::IngestObservations { observations, scan } => {
            let from = world.frame.position();
            if world.frame.calibrate(&observations) {
                let position = world.frame.position();
                out_events.push(Event::FrameCalibrated { position });
                if position != from {
                    debug!("frame re-anchored from {from} to {position}");
                    out_events.push(Event::PositionChanged { from, to: position });
                }
            }

            let cells = world.frame.to_absolute(&observations);
            let summary = world.map.merge(cells);
            out_events.push(Event::CellsMerged {
                discovered: summary.discovered,
                updated: summary.updated,
            });

            if scan.is_truncated(observations.len())
                && world
                    .map
                    .adjust_bounds(world.frame.position(), scan.radius)
            {
                let bounds = world.map.bounds();
                debug!(
                    "bounds narrowed to x {}..={} y {}..={}",
                    bounds.min_x(),
                    bounds.max_x(),
                    bounds.min_y(),
                    bounds.max_y()
                );
                out_events.push(Event::BoundsNarrowed { bounds });
            }
        }
        Command::ConsumeCell { coord } => {
            if let Some(previous) = world.map.consume(coord) {
                out_events.push(Event::CellConsumed { coord, previous });
            }
        }
        Command::SeedMap { cells } => {
            let summary = world.map.merge(cells);
            debug!("seeded {} cells", summary.discovered + summary.updated);
            out_events.push(Event::CellsMerged {
                discovered: summary.discovered,
                updated: summary.updated,
            });
        }
    }
}

/// Read-only queries over the world state.
pub mod query {
    use maze_explorer_core::{Bounds, Cell, CellCoord, MapStatistics, MapView};

    use super::World;

    /// Absolute position of the agent.
    #[must_use]
    pub fn position(world: &World) -> CellCoord {
        world.frame.position()
    }

    /// Current bounds of the explorable region.
    #[must_use]
    pub fn bounds(world: &World) -> Bounds {
        world.map.bounds()
    }

    /// Captures a read-only view of the discovered cells.
    #[must_use]
    pub fn map_view(world: &World) -> MapView<'_> {
        world.map.view()
    }

    /// Reports whether a coordinate blocks movement under the current bounds.
    #[must_use]
    pub fn is_obstacle(world: &World, coord: CellCoord) -> bool {
        world.map.is_obstacle(coord)
    }

    /// Per-type census of the discovered cells.
    #[must_use]
    pub fn statistics(world: &World) -> MapStatistics {
        world.map.statistics()
    }

    /// Every discovered cell in coordinate order, suitable for persistence.
    #[must_use]
    pub fn snapshot_cells(world: &World) -> Vec<Cell> {
        world.map.snapshot()
    }
}
