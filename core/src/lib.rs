#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Maze Explorer engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Systems submit [`Command`] values
//! describing desired mutations of the discovered map, the world executes
//! those commands via its `apply` entry point, and then broadcasts [`Event`]
//! values describing what changed. The exploration system talks to the
//! external game server exclusively through [`Action`] requests and
//! [`Outcome`] answers, with [`GameOracle`] describing the server contract.

use std::{
    collections::{BTreeMap, HashMap},
    convert::TryFrom,
    fmt,
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Half-width of the square that bounds a fresh session before any edge is seen.
pub const DEFAULT_BOUND_EXTENT: i32 = 999;

/// Absolute (or relative) location of a single grid cell.
///
/// The Y axis grows downwards, so "north" is a step towards smaller `y`.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct CellCoord {
    x: i32,
    y: i32,
}

impl CellCoord {
    /// Origin of the absolute frame, where the start marker lives once calibrated.
    pub const ORIGIN: Self = Self::new(0, 0);

    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Horizontal component of the coordinate.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Vertical component of the coordinate.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Returns the coordinate reached by applying a single step.
    #[must_use]
    pub const fn offset(self, step: Step) -> Self {
        Self::new(self.x + step.dx(), self.y + step.dy())
    }

    /// Returns the coordinate translated by an arbitrary delta.
    #[must_use]
    pub const fn translate(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Computes the Manhattan distance between two coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Unit move between two 8-connected neighbours.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Step {
    dx: i32,
    dy: i32,
}

impl Step {
    /// Move towards decreasing `x`.
    pub const WEST: Self = Self { dx: -1, dy: 0 };
    /// Move towards decreasing `x` and decreasing `y`.
    pub const NORTH_WEST: Self = Self { dx: -1, dy: -1 };
    /// Move towards decreasing `x` and increasing `y`.
    pub const SOUTH_WEST: Self = Self { dx: -1, dy: 1 };
    /// Move towards increasing `x`.
    pub const EAST: Self = Self { dx: 1, dy: 0 };
    /// Move towards increasing `x` and decreasing `y`.
    pub const NORTH_EAST: Self = Self { dx: 1, dy: -1 };
    /// Move towards increasing `x` and increasing `y`.
    pub const SOUTH_EAST: Self = Self { dx: 1, dy: 1 };
    /// Move towards decreasing `y`.
    pub const NORTH: Self = Self { dx: 0, dy: -1 };
    /// Move towards increasing `y`.
    pub const SOUTH: Self = Self { dx: 0, dy: 1 };

    /// Neighbour generation order shared by every search strategy.
    pub const NEIGHBOURS: [Self; 8] = [
        Self::WEST,
        Self::NORTH_WEST,
        Self::SOUTH_WEST,
        Self::EAST,
        Self::NORTH_EAST,
        Self::SOUTH_EAST,
        Self::NORTH,
        Self::SOUTH,
    ];

    /// Creates a step from its components, rejecting the null move and anything longer than one cell.
    #[must_use]
    pub const fn new(dx: i32, dy: i32) -> Option<Self> {
        if dx < -1 || dx > 1 || dy < -1 || dy > 1 || (dx == 0 && dy == 0) {
            return None;
        }
        Some(Self { dx, dy })
    }

    /// Derives the step that moves between two adjacent coordinates.
    #[must_use]
    pub const fn between(from: CellCoord, to: CellCoord) -> Option<Self> {
        Self::new(to.x() - from.x(), to.y() - from.y())
    }

    /// Horizontal component of the step.
    #[must_use]
    pub const fn dx(&self) -> i32 {
        self.dx
    }

    /// Vertical component of the step.
    #[must_use]
    pub const fn dy(&self) -> i32 {
        self.dy
    }

    /// Reports whether the step changes both axes.
    #[must_use]
    pub const fn is_diagonal(&self) -> bool {
        self.dx != 0 && self.dy != 0
    }
}

/// Non-empty sequence of unit steps produced by a search.
///
/// A path never contains zero steps: a search whose target coincides with the
/// start reports "no path" instead, because the exploration loop needs forward
/// progress from every path it follows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Path {
    steps: Vec<Step>,
}

impl Path {
    /// Wraps the provided steps, returning `None` when the sequence is empty.
    #[must_use]
    pub fn from_steps(steps: Vec<Step>) -> Option<Self> {
        if steps.is_empty() {
            None
        } else {
            Some(Self { steps })
        }
    }

    /// Number of steps contained in the path.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always false; present for API symmetry with collections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Ordered steps from start to destination.
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Consumes the path, yielding its steps.
    #[must_use]
    pub fn into_steps(self) -> Vec<Step> {
        self.steps
    }

    /// Absolute waypoints visited when the path is applied from `start`, including `start`.
    #[must_use]
    pub fn waypoints(&self, start: CellCoord) -> Vec<CellCoord> {
        let mut points = Vec::with_capacity(self.steps.len() + 1);
        let mut current = start;
        points.push(current);
        for step in &self.steps {
            current = current.offset(*step);
            points.push(current);
        }
        points
    }

    /// Cell reached after applying every step from `start`.
    #[must_use]
    pub fn destination(&self, start: CellCoord) -> CellCoord {
        self.steps
            .iter()
            .fold(start, |current, step| current.offset(*step))
    }
}

/// Inclusive axis-aligned rectangle believed to contain the explorable world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bounds {
    min_x: i32,
    min_y: i32,
    max_x: i32,
    max_y: i32,
}

impl Bounds {
    /// Creates bounds from explicit inclusive limits.
    #[must_use]
    pub const fn new(min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Creates bounds spanning `-extent..=extent` on both axes.
    #[must_use]
    pub const fn symmetric(extent: i32) -> Self {
        Self::new(-extent, -extent, extent, extent)
    }

    /// Smallest admissible `x`.
    #[must_use]
    pub const fn min_x(&self) -> i32 {
        self.min_x
    }

    /// Smallest admissible `y`.
    #[must_use]
    pub const fn min_y(&self) -> i32 {
        self.min_y
    }

    /// Largest admissible `x`.
    #[must_use]
    pub const fn max_x(&self) -> i32 {
        self.max_x
    }

    /// Largest admissible `y`.
    #[must_use]
    pub const fn max_y(&self) -> i32 {
        self.max_y
    }

    /// Reports whether the coordinate lies within the inclusive limits.
    #[must_use]
    pub const fn contains(&self, coord: CellCoord) -> bool {
        coord.x() >= self.min_x
            && coord.x() <= self.max_x
            && coord.y() >= self.min_y
            && coord.y() <= self.max_y
    }

    /// Shrinks every edge by the provided margins.
    ///
    /// The result may be empty (`min > max`), in which case nothing is contained.
    #[must_use]
    pub const fn inset(&self, margin_x: i32, margin_y: i32) -> Self {
        Self::new(
            self.min_x + margin_x,
            self.min_y + margin_y,
            self.max_x - margin_x,
            self.max_y - margin_y,
        )
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::symmetric(DEFAULT_BOUND_EXTENT)
    }
}

/// Closed set of cell categories reported by the game server.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum CellKind {
    /// Walkable floor without anything on it.
    Empty,
    /// Collectible coin counted towards finishing the world.
    Coin,
    /// Special collectible (dynamite) that does not count towards finishing.
    Special,
    /// Impassable wall.
    Wall,
    /// Impassable rock.
    Rock,
    /// Marker placed on the cell that defines the absolute origin.
    StartMarker,
    /// Any category unknown to this engine, carried by name.
    Other(String),
}

impl CellKind {
    /// Reports whether the cell blocks movement.
    #[must_use]
    pub const fn is_obstacle(&self) -> bool {
        matches!(self, Self::Wall | Self::Rock)
    }

    /// Reports whether the cell holds something that can be collected.
    #[must_use]
    pub const fn is_collectible(&self) -> bool {
        matches!(self, Self::Coin | Self::Special)
    }

    /// Name used by the game protocol and persisted snapshots.
    #[must_use]
    pub fn wire_name(&self) -> &str {
        match self {
            Self::Empty => "NONE",
            Self::Coin => "COLLECTIBLE_COIN",
            Self::Special => "COLLECTIBLE_DYNAMITE",
            Self::Wall => "SOLID_WALL",
            Self::Rock => "SOLID_ROCK",
            Self::StartMarker => "INFO_STARTPOS",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Error returned when a cell category cannot be parsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum CellKindParseError {
    /// The category name was empty or contained only whitespace.
    #[error("cell type name is empty")]
    Empty,
}

impl FromStr for CellKind {
    type Err = CellKindParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let kind = match trimmed {
            "" => return Err(CellKindParseError::Empty),
            "NONE" => Self::Empty,
            "COLLECTIBLE_COIN" => Self::Coin,
            "COLLECTIBLE_DYNAMITE" => Self::Special,
            "SOLID_WALL" => Self::Wall,
            "SOLID_ROCK" => Self::Rock,
            "INFO_STARTPOS" => Self::StartMarker,
            other => Self::Other(other.to_owned()),
        };
        Ok(kind)
    }
}

impl From<CellKind> for String {
    fn from(kind: CellKind) -> Self {
        match kind {
            CellKind::Other(name) => name,
            known => known.wire_name().to_owned(),
        }
    }
}

impl TryFrom<String> for CellKind {
    type Error = CellKindParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Discovered grid cell expressed in the absolute frame.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// Absolute location of the cell.
    pub coord: CellCoord,
    /// Category reported for the cell.
    pub kind: CellKind,
    /// Display name reported by the server.
    pub name: String,
}

impl Cell {
    /// Creates a new cell record.
    #[must_use]
    pub fn new(coord: CellCoord, kind: CellKind, name: impl Into<String>) -> Self {
        Self {
            coord,
            kind,
            name: name.into(),
        }
    }
}

/// Cell reported by the server relative to the agent's position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    /// Offset from the agent's position at the time of the report.
    pub offset: CellCoord,
    /// Category reported for the cell.
    pub kind: CellKind,
    /// Display name reported by the server.
    pub name: String,
}

impl Observation {
    /// Creates a new relative observation.
    #[must_use]
    pub fn new(dx: i32, dy: i32, kind: CellKind, name: impl Into<String>) -> Self {
        Self {
            offset: CellCoord::new(dx, dy),
            kind,
            name: name.into(),
        }
    }
}

/// Neighbourhood revealed by a single observation call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanShape {
    /// Reach of the observation along each axis.
    pub radius: i32,
    /// Number of cells reported when the whole neighbourhood lies inside the world.
    pub complete_len: usize,
}

impl ScanShape {
    /// Diamond of Manhattan radius five revealed by an explicit look.
    pub const LOOK: Self = Self {
        radius: 5,
        complete_len: 61,
    };

    /// Eight-cell ring revealed after every confirmed move.
    pub const MOVE: Self = Self {
        radius: 1,
        complete_len: 8,
    };

    /// Reports whether a batch of `len` cells proves part of the neighbourhood is missing.
    #[must_use]
    pub const fn is_truncated(&self, len: usize) -> bool {
        len < self.complete_len
    }
}

/// Read-only view over the discovered cells.
#[derive(Clone, Copy, Debug)]
pub struct MapView<'a> {
    cells: &'a HashMap<CellCoord, Cell>,
}

impl<'a> MapView<'a> {
    /// Captures a new view backed by the provided cell table.
    #[must_use]
    pub fn new(cells: &'a HashMap<CellCoord, Cell>) -> Self {
        Self { cells }
    }

    /// Returns the discovered cell at the coordinate, if any.
    #[must_use]
    pub fn cell(&self, coord: CellCoord) -> Option<&'a Cell> {
        self.cells.get(&coord)
    }

    /// Returns the category of the discovered cell at the coordinate, if any.
    #[must_use]
    pub fn kind(&self, coord: CellCoord) -> Option<&'a CellKind> {
        self.cells.get(&coord).map(|cell| &cell.kind)
    }

    /// Reports whether the coordinate has been discovered.
    #[must_use]
    pub fn is_known(&self, coord: CellCoord) -> bool {
        self.cells.contains_key(&coord)
    }

    /// Reports whether a coordinate blocks movement under the provided bounds.
    ///
    /// Known walls and rocks block, and so does anything outside `bounds`.
    /// Unknown in-bounds coordinates are not obstacles; callers decide how to
    /// treat them.
    #[must_use]
    pub fn is_obstacle(&self, coord: CellCoord, bounds: &Bounds) -> bool {
        if !bounds.contains(coord) {
            return true;
        }
        self.kind(coord).map_or(false, CellKind::is_obstacle)
    }

    /// Iterator over every discovered cell in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &'a Cell> + 'a {
        let cells: &'a HashMap<CellCoord, Cell> = self.cells;
        cells.values()
    }

    /// Number of discovered cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Reports whether nothing has been discovered yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Per-type census of the discovered map.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapStatistics {
    counts: BTreeMap<String, usize>,
    total: usize,
}

impl MapStatistics {
    /// Builds statistics from an iterator over discovered cells.
    #[must_use]
    pub fn from_cells<'a>(cells: impl IntoIterator<Item = &'a Cell>) -> Self {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut total = 0;
        for cell in cells {
            *counts.entry(cell.kind.wire_name().to_owned()).or_default() += 1;
            total += 1;
        }
        Self { counts, total }
    }

    /// Number of discovered cells of the given category.
    #[must_use]
    pub fn count(&self, kind: &CellKind) -> usize {
        self.counts.get(kind.wire_name()).copied().unwrap_or(0)
    }

    /// Total number of discovered cells.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.total
    }

    /// Iterator over `(type name, count)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts
            .iter()
            .map(|(name, count)| (name.as_str(), *count))
    }
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Clears the map, restores default bounds and moves the agent to the origin.
    ResetSession,
    /// Forcibly places the agent at an absolute coordinate.
    SetPosition {
        /// New absolute position.
        position: CellCoord,
    },
    /// Applies a confirmed move to the agent's absolute position.
    AdvancePosition {
        /// Step confirmed by the game server.
        step: Step,
    },
    /// Calibrates, converts and merges a batch of relative observations.
    IngestObservations {
        /// Cells reported relative to the agent's current position.
        observations: Vec<Observation>,
        /// Neighbourhood the batch was taken from.
        scan: ScanShape,
    },
    /// Marks a collected cell as empty in the local working copy.
    ConsumeCell {
        /// Absolute location of the collected cell.
        coord: CellCoord,
    },
    /// Preloads cells from a previously saved snapshot.
    SeedMap {
        /// Absolute cells restored from the snapshot.
        cells: Vec<Cell>,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Confirms that the session state was cleared.
    SessionReset,
    /// Announces that the agent's absolute position changed.
    PositionChanged {
        /// Position before the change.
        from: CellCoord,
        /// Position after the change.
        to: CellCoord,
    },
    /// Announces that the frame was anchored using the start marker.
    FrameCalibrated {
        /// Absolute position derived from the marker.
        position: CellCoord,
    },
    /// Reports how an observation batch altered the map.
    CellsMerged {
        /// Coordinates that were unknown before the batch.
        discovered: usize,
        /// Coordinates that were overwritten by the batch.
        updated: usize,
    },
    /// Announces that at least one bound moved towards the agent.
    BoundsNarrowed {
        /// Bounds after the adjustment.
        bounds: Bounds,
    },
    /// Confirms that a collected cell was cleared.
    CellConsumed {
        /// Location of the cleared cell.
        coord: CellCoord,
        /// Category the cell carried before it was cleared.
        previous: CellKind,
    },
}

/// Requests the exploration system issues to the game server.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// Observe the neighbourhood around the agent.
    Look,
    /// Move the agent by a single step.
    Move(Step),
    /// Collect whatever lies on the agent's cell.
    Collect,
    /// Ask the server to close the world.
    Finish,
}

/// Domain reason supplied by the game server when it refuses a request.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct Rejection {
    /// Opaque explanation surfaced to the user layer.
    pub reason: String,
}

impl Rejection {
    /// Creates a rejection carrying the provided reason.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Cells reported by a look or a move, with the position the server confirmed.
///
/// The position is expressed in the absolute frame anchored at the start
/// marker. Servers that do not report one leave it `None`, and the agent's
/// position is then tracked locally from confirmed steps.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Sighting {
    /// Authoritative absolute position of the agent, if reported.
    pub position: Option<CellCoord>,
    /// Cells relative to the agent's position.
    pub observations: Vec<Observation>,
}

impl Sighting {
    /// Sighting without a reported position.
    #[must_use]
    pub fn new(observations: Vec<Observation>) -> Self {
        Self {
            position: None,
            observations,
        }
    }

    /// Sighting taken at a position confirmed by the server.
    #[must_use]
    pub fn at(position: CellCoord, observations: Vec<Observation>) -> Self {
        Self {
            position: Some(position),
            observations,
        }
    }
}

impl From<Vec<Observation>> for Sighting {
    fn from(observations: Vec<Observation>) -> Self {
        Self::new(observations)
    }
}

/// Answers returned by the game server for each [`Action`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// A look succeeded and reported the surrounding cells.
    Observed(Sighting),
    /// A move succeeded; observations are relative to the new position.
    Moved {
        /// Step the server confirmed.
        step: Step,
        /// Ring of cells visible from the new position.
        sighting: Sighting,
    },
    /// The collect request succeeded.
    Collected,
    /// The world was closed successfully.
    Finished,
    /// The server refused the request.
    Rejected(Rejection),
}

/// Authoritative game server consumed by the exploration system.
pub trait GameOracle {
    /// Reports the cells around the agent relative to its position.
    fn observe(&mut self) -> Result<Sighting, Rejection>;

    /// Moves the agent and reports the cells visible from the new position.
    fn step(&mut self, step: Step) -> Result<Sighting, Rejection>;

    /// Collects the item on the agent's cell.
    fn collect(&mut self) -> Result<(), Rejection>;

    /// Attempts to close the world; an error explains why it remains open.
    fn finish(&mut self) -> Result<(), Rejection>;

    /// Performs an action and folds the result into an [`Outcome`].
    fn perform(&mut self, action: Action) -> Outcome {
        let result = match action {
            Action::Look => self.observe().map(Outcome::Observed),
            Action::Move(step) => self
                .step(step)
                .map(|sighting| Outcome::Moved { step, sighting }),
            Action::Collect => self.collect().map(|()| Outcome::Collected),
            Action::Finish => self.finish().map(|()| Outcome::Finished),
        };
        result.unwrap_or_else(Outcome::Rejected)
    }
}

/// Persistent storage for discovered maps keyed by world identifier.
pub trait MapStore {
    /// Error raised by the backing storage.
    type Error;

    /// Persists the provided cells for the given world.
    fn save(&mut self, world: &str, cells: &[Cell]) -> Result<(), Self::Error>;

    /// Restores the cells previously saved for the given world.
    fn load(&self, world: &str) -> Result<Vec<Cell>, Self::Error>;
}
