//! Translation between agent-relative observations and the absolute frame.

use maze_explorer_core::{Cell, CellCoord, CellKind, Observation, Step};

/// Tracks the agent's absolute position and anchors it to the start marker.
///
/// The server only ever reports cells relative to the agent. Absolute
/// coordinates exist so that observations from different positions can be
/// merged into one map; the start marker defines the origin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CoordinateFrame {
    position: CellCoord,
}

impl CoordinateFrame {
    /// Creates a frame with the agent placed at the origin.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            position: CellCoord::ORIGIN,
        }
    }

    /// Current absolute position of the agent.
    #[must_use]
    pub const fn position(&self) -> CellCoord {
        self.position
    }

    /// Forcibly places the agent at an absolute coordinate.
    pub fn set_position(&mut self, position: CellCoord) {
        self.position = position;
    }

    /// Applies a move the server confirmed.
    pub fn update_position(&mut self, step: Step) {
        self.position = self.position.offset(step);
    }

    /// Re-anchors the frame if the batch contains the start marker.
    ///
    /// The marker sits at the absolute origin, so the agent must be at the
    /// negated relative offset of the marker. Returns whether a marker was found.
    pub fn calibrate(&mut self, observations: &[Observation]) -> bool {
        let marker = observations
            .iter()
            .find(|observation| observation.kind == CellKind::StartMarker);
        match marker {
            Some(observation) => {
                self.position =
                    CellCoord::new(-observation.offset.x(), -observation.offset.y());
                true
            }
            None => false,
        }
    }

    /// Translates relative observations into absolute cells.
    #[must_use]
    pub fn to_absolute(&self, observations: &[Observation]) -> Vec<Cell> {
        observations
            .iter()
            .map(|observation| {
                Cell::new(
                    self.position
                        .translate(observation.offset.x(), observation.offset.y()),
                    observation.kind.clone(),
                    observation.name.clone(),
                )
            })
            .collect()
    }

    /// Offset of an absolute cell as seen from the agent's current position.
    #[must_use]
    pub fn to_relative(&self, cell: &Cell) -> CellCoord {
        CellCoord::new(
            cell.coord.x() - self.position.x(),
            cell.coord.y() - self.position.y(),
        )
    }
}
