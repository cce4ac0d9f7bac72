//! Offline game server backed by a text grid.

use std::{
    collections::{HashMap, HashSet},
    fs,
    path::Path,
};

use anyhow::{bail, Context, Result};
use maze_explorer_core::{
    Action, CellCoord, CellKind, GameOracle, Observation, Rejection, Sighting, Step,
};
use maze_explorer_system_exploration::ActionTally;
use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const LOOK_RADIUS: i32 = 5;
const EXTRA_OPENING_CHANCE: f64 = 0.08;
const MAX_GRID_CELLS: i32 = 4_000_000;

/// Simulated server that answers requests from a fully known grid.
///
/// Glyphs: `#` wall, `%` rock, `c` coin, `d` special, `S` start marker,
/// `.` or space for empty floor.
#[derive(Debug)]
pub(crate) struct SimulatedMaze {
    cells: HashMap<CellCoord, CellKind>,
    start: CellCoord,
    agent: CellCoord,
    tally: ActionTally,
}

impl SimulatedMaze {
    /// Reads a maze from a text file.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read maze file {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("invalid maze file {}", path.display()))
    }

    /// Parses a maze from its text representation.
    pub(crate) fn parse(text: &str) -> Result<Self> {
        let mut cells = HashMap::new();
        let mut agent = None;

        for (row, line) in text.lines().enumerate() {
            for (column, glyph) in line.chars().enumerate() {
                let coord = CellCoord::new(
                    i32::try_from(column).context("maze is too wide")?,
                    i32::try_from(row).context("maze is too tall")?,
                );
                let kind = match glyph {
                    '#' => CellKind::Wall,
                    '%' => CellKind::Rock,
                    'c' => CellKind::Coin,
                    'd' => CellKind::Special,
                    '.' | ' ' => CellKind::Empty,
                    'S' => {
                        if agent.replace(coord).is_some() {
                            bail!("maze contains more than one start marker");
                        }
                        CellKind::StartMarker
                    }
                    other => bail!("unsupported glyph '{other}' at row {row}, column {column}"),
                };
                let _ = cells.insert(coord, kind);
            }
        }

        let agent = agent.context("maze has no start marker 'S'")?;
        Ok(Self {
            cells,
            start: agent,
            agent,
            tally: ActionTally::default(),
        })
    }

    /// Generates a perfect maze with a few extra openings, deterministic per seed.
    ///
    /// `width` and `height` count rooms; walls between them double the grid.
    pub(crate) fn generate(seed: u64, width: u32, height: u32, coins: usize) -> Result<Self> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let width = i32::try_from(width.max(2)).context("maze width does not fit the grid")?;
        let height = i32::try_from(height.max(2)).context("maze height does not fit the grid")?;
        let (Some(columns), Some(rows)) = (
            width.checked_mul(2).and_then(|doubled| doubled.checked_add(1)),
            height.checked_mul(2).and_then(|doubled| doubled.checked_add(1)),
        ) else {
            bail!("maze of {width}x{height} rooms is too large");
        };
        let _ = columns
            .checked_mul(rows)
            .filter(|count| *count <= MAX_GRID_CELLS)
            .with_context(|| format!("maze of {columns}x{rows} cells is too large"))?;

        let mut cells = HashMap::new();
        for x in 0..columns {
            for y in 0..rows {
                let _ = cells.insert(CellCoord::new(x, y), CellKind::Wall);
            }
        }

        let room = |x: i32, y: i32| CellCoord::new(x * 2 + 1, y * 2 + 1);
        let mut visited = HashSet::from([(0, 0)]);
        let mut stack = vec![(0, 0)];
        let _ = cells.insert(room(0, 0), CellKind::Empty);

        while let Some(&(x, y)) = stack.last() {
            let mut options: Vec<(i32, i32)> = [(-1, 0), (1, 0), (0, -1), (0, 1)]
                .into_iter()
                .map(|(dx, dy)| (x + dx, y + dy))
                .filter(|&(nx, ny)| nx >= 0 && ny >= 0 && nx < width && ny < height)
                .filter(|room| !visited.contains(room))
                .collect();
            options.shuffle(&mut rng);

            match options.first() {
                Some(&(nx, ny)) => {
                    let _ = visited.insert((nx, ny));
                    let _ = cells.insert(CellCoord::new(x + nx + 1, y + ny + 1), CellKind::Empty);
                    let _ = cells.insert(room(nx, ny), CellKind::Empty);
                    stack.push((nx, ny));
                }
                None => {
                    let _ = stack.pop();
                }
            }
        }

        for x in 1..columns - 1 {
            for y in 1..rows - 1 {
                let coord = CellCoord::new(x, y);
                let between_rooms = (x % 2 == 1) != (y % 2 == 1);
                if between_rooms && rng.gen_bool(EXTRA_OPENING_CHANCE) {
                    let _ = cells.insert(coord, CellKind::Empty);
                }
            }
        }

        let start = room(0, 0);
        let mut floor: Vec<CellCoord> = cells
            .iter()
            .filter(|(coord, kind)| **kind == CellKind::Empty && **coord != start)
            .map(|(coord, _)| *coord)
            .collect();
        floor.sort();
        floor.shuffle(&mut rng);
        for coord in floor.into_iter().take(coins) {
            let kind = if rng.gen_range(0..10) == 0 {
                CellKind::Special
            } else {
                CellKind::Coin
            };
            let _ = cells.insert(coord, kind);
        }
        let _ = cells.insert(start, CellKind::StartMarker);

        Ok(Self {
            cells,
            start,
            agent: start,
            tally: ActionTally::default(),
        })
    }

    /// Coins still lying in the maze.
    #[must_use]
    pub(crate) fn coins_left(&self) -> usize {
        self.cells
            .values()
            .filter(|kind| **kind == CellKind::Coin)
            .count()
    }

    /// Requests answered so far, by kind.
    #[must_use]
    pub(crate) const fn tally(&self) -> ActionTally {
        self.tally
    }

    fn sighting(&self, offsets: impl Iterator<Item = (i32, i32)>) -> Sighting {
        let position = CellCoord::new(
            self.agent.x() - self.start.x(),
            self.agent.y() - self.start.y(),
        );
        Sighting::at(position, self.visible(offsets))
    }

    fn visible(&self, offsets: impl Iterator<Item = (i32, i32)>) -> Vec<Observation> {
        offsets
            .filter_map(|(dx, dy)| {
                let kind = self.cells.get(&self.agent.translate(dx, dy))?;
                Some(Observation::new(dx, dy, kind.clone(), kind.wire_name()))
            })
            .collect()
    }
}

impl GameOracle for SimulatedMaze {
    fn observe(&mut self) -> Result<Sighting, Rejection> {
        self.tally.record(Action::Look);
        let diamond = (-LOOK_RADIUS..=LOOK_RADIUS).flat_map(|dx| {
            let reach = LOOK_RADIUS - dx.abs();
            (-reach..=reach).map(move |dy| (dx, dy))
        });
        Ok(self.sighting(diamond))
    }

    fn step(&mut self, step: Step) -> Result<Sighting, Rejection> {
        self.tally.record(Action::Move(step));
        let target = self.agent.offset(step);
        match self.cells.get(&target) {
            Some(kind) if !kind.is_obstacle() => {
                self.agent = target;
                let ring = Step::NEIGHBOURS.iter().map(|step| (step.dx(), step.dy()));
                Ok(self.sighting(ring))
            }
            Some(kind) => Err(Rejection::new(format!("{target} is {kind}"))),
            None => Err(Rejection::new(format!("{target} is outside the maze"))),
        }
    }

    fn collect(&mut self) -> Result<(), Rejection> {
        self.tally.record(Action::Collect);
        match self.cells.get_mut(&self.agent) {
            Some(kind) if kind.is_collectible() => {
                *kind = CellKind::Empty;
                Ok(())
            }
            _ => Err(Rejection::new("nothing to collect here")),
        }
    }

    fn finish(&mut self) -> Result<(), Rejection> {
        self.tally.record(Action::Finish);
        match self.coins_left() {
            0 => Ok(()),
            left => Err(Rejection::new(format!("{left} coins remain"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_missing_start() {
        let error = SimulatedMaze::parse("###\n#.#\n###").expect_err("no start marker");
        assert!(error.to_string().contains("no start marker"));
    }

    #[test]
    fn look_reports_the_full_diamond_inside_large_mazes() {
        let row = ".".repeat(11);
        let mut rows = vec![row.clone(); 11];
        rows[5] = format!("{}S{}", ".".repeat(5), ".".repeat(5));
        let mut maze = SimulatedMaze::parse(&rows.join("\n")).expect("valid maze");

        let sighting = maze.observe().expect("look succeeds");
        assert_eq!(sighting.position, Some(CellCoord::ORIGIN));
        assert_eq!(sighting.observations.len(), 61);
        assert!(sighting
            .observations
            .iter()
            .any(|observation| observation.kind == CellKind::StartMarker
                && observation.offset == CellCoord::ORIGIN));
    }

    #[test]
    fn moves_into_walls_are_rejected() {
        let mut maze = SimulatedMaze::parse("#####\n#S.c#\n#####").expect("valid maze");

        assert!(maze.step(Step::NORTH).is_err());
        let ring = maze.step(Step::EAST).expect("floor to the east");
        assert_eq!(ring.observations.len(), 8);
        assert_eq!(ring.position, Some(CellCoord::new(1, 0)));
        assert!(maze.collect().is_err(), "floor holds nothing");
        assert!(maze.step(Step::EAST).is_ok());
        assert_eq!(maze.finish(), Err(Rejection::new("1 coins remain")));
        assert!(maze.collect().is_ok());
        assert_eq!(maze.finish(), Ok(()));
        assert_eq!(maze.tally().moves, 3);
    }

    #[test]
    fn generation_is_deterministic_per_seed() {
        let first = SimulatedMaze::generate(7, 6, 4, 5).expect("small maze");
        let second = SimulatedMaze::generate(7, 6, 4, 5).expect("small maze");
        let mut left: Vec<_> = first.cells.iter().collect();
        let mut right: Vec<_> = second.cells.iter().collect();
        left.sort_by_key(|(coord, _)| **coord);
        right.sort_by_key(|(coord, _)| **coord);

        assert_eq!(left, right);
        assert_eq!(first.agent, CellCoord::new(1, 1));
        assert_eq!(first.cells.len(), 13 * 9);
    }

    #[test]
    fn oversized_generation_is_an_error() {
        let error = SimulatedMaze::generate(1, u32::MAX, 4, 0).expect_err("width overflows");
        assert!(error.to_string().contains("width"), "{error}");

        let limit = u32::try_from(i32::MAX / 2).expect("fits u32");
        let error = SimulatedMaze::generate(1, 4, limit + 1, 0).expect_err("rows overflow");
        assert!(error.to_string().contains("too large"), "{error}");

        let error = SimulatedMaze::generate(1, 5_000, 5_000, 0).expect_err("grid too big");
        assert!(error.to_string().contains("10001x10001"), "{error}");
    }
}
