use std::collections::HashMap;

use maze_explorer_core::{
    Action, Cell, CellCoord, CellKind, GameOracle, Observation, Outcome, Rejection, Sighting,
    Step,
};
use maze_explorer_system_exploration::{
    drive, ControllerError, Directive, EpisodeEnd, EpisodeGoal, ExplorationController,
    ExplorationProfile, Phase, UnknownMargin,
};
use maze_explorer_system_pathfinding::{Algorithm, DistanceMetric};

const LOOK_RADIUS: i32 = 5;

/// Scripted server backed by a text grid.
struct GridOracle {
    cells: HashMap<(i32, i32), CellKind>,
    start: (i32, i32),
    agent: (i32, i32),
}

impl GridOracle {
    fn parse(rows: &[&str]) -> Self {
        let mut cells = HashMap::new();
        let mut agent = None;
        for (row, line) in rows.iter().enumerate() {
            for (column, glyph) in line.chars().enumerate() {
                let at = (column as i32, row as i32);
                let kind = match glyph {
                    '#' => CellKind::Wall,
                    '%' => CellKind::Rock,
                    'c' => CellKind::Coin,
                    'd' => CellKind::Special,
                    'S' => {
                        agent = Some(at);
                        CellKind::StartMarker
                    }
                    _ => CellKind::Empty,
                };
                let _ = cells.insert(at, kind);
            }
        }
        let start = agent.expect("grid has a start marker");
        Self {
            cells,
            start,
            agent: start,
        }
    }

    /// Position of the agent in the frame anchored at the start marker.
    fn position(&self) -> CellCoord {
        CellCoord::new(self.agent.0 - self.start.0, self.agent.1 - self.start.1)
    }

    /// Every cell of the grid, in the frame anchored at the start marker.
    fn known_cells(&self) -> Vec<Cell> {
        self.cells
            .iter()
            .map(|(&(x, y), kind)| {
                let coord = CellCoord::new(x - self.start.0, y - self.start.1);
                Cell::new(coord, kind.clone(), kind.wire_name())
            })
            .collect()
    }

    fn coins_left(&self) -> usize {
        self.cells
            .values()
            .filter(|kind| **kind == CellKind::Coin)
            .count()
    }

    fn observations_within(&self, radius: i32, include_center: bool) -> Vec<Observation> {
        let mut batch = Vec::new();
        for dx in -radius..=radius {
            for dy in -radius..=radius {
                if dx.abs() + dy.abs() > radius && radius > 1 {
                    continue;
                }
                if (dx, dy) == (0, 0) && !include_center {
                    continue;
                }
                if let Some(kind) = self.cells.get(&(self.agent.0 + dx, self.agent.1 + dy)) {
                    batch.push(Observation::new(dx, dy, kind.clone(), kind.wire_name()));
                }
            }
        }
        batch
    }
}

impl GameOracle for GridOracle {
    fn observe(&mut self) -> Result<Sighting, Rejection> {
        let observations = self.observations_within(LOOK_RADIUS, true);
        Ok(Sighting::at(self.position(), observations))
    }

    fn step(&mut self, step: Step) -> Result<Sighting, Rejection> {
        let target = (self.agent.0 + step.dx(), self.agent.1 + step.dy());
        match self.cells.get(&target) {
            Some(kind) if !kind.is_obstacle() => {
                self.agent = target;
                let observations = self.observations_within(1, false);
                Ok(Sighting::at(self.position(), observations))
            }
            _ => Err(Rejection::new("blocked")),
        }
    }

    fn collect(&mut self) -> Result<(), Rejection> {
        match self.cells.get_mut(&self.agent) {
            Some(kind) if kind.is_collectible() => {
                *kind = CellKind::Empty;
                Ok(())
            }
            _ => Err(Rejection::new("nothing to collect")),
        }
    }

    fn finish(&mut self) -> Result<(), Rejection> {
        if self.coins_left() == 0 {
            Ok(())
        } else {
            Err(Rejection::new("coins remain"))
        }
    }
}

struct RefusingOracle;

impl GameOracle for RefusingOracle {
    fn observe(&mut self) -> Result<Sighting, Rejection> {
        Err(Rejection::new("server busy"))
    }

    fn step(&mut self, _step: Step) -> Result<Sighting, Rejection> {
        Err(Rejection::new("server busy"))
    }

    fn collect(&mut self) -> Result<(), Rejection> {
        Err(Rejection::new("server busy"))
    }

    fn finish(&mut self) -> Result<(), Rejection> {
        Err(Rejection::new("server busy"))
    }
}

const SMALL_MAZE: [&str; 5] = [
    "#########",
    "#S..c...#",
    "#.###.#.#",
    "#c..#..c#",
    "#########",
];

/// Walled corridor with a coin eight steps east and a gap in the north wall.
fn corridor_batch() -> Vec<Observation> {
    let mut batch = Vec::new();
    for x in -1..=9 {
        for y in -1..=1 {
            let kind = if y != 0 || x == -1 || x == 9 {
                CellKind::Wall
            } else if x == 8 {
                CellKind::Coin
            } else {
                CellKind::Empty
            };
            if (x, y) == (3, -1) {
                continue;
            }
            batch.push(Observation::new(x, y, kind.clone(), kind.wire_name()));
        }
    }
    batch
}

fn corridor_profile() -> ExplorationProfile {
    ExplorationProfile {
        change_to_unknown_threshold: 5,
        ..ExplorationProfile::default()
    }
}

fn run_recorded(
    controller: &mut ExplorationController,
    oracle: &mut GridOracle,
) -> (Vec<Action>, EpisodeEnd) {
    controller.start().expect("idle controller starts");
    let mut actions = Vec::new();
    loop {
        match controller.poll() {
            Directive::Act(action) => {
                actions.push(action);
                controller
                    .resolve(oracle.perform(action))
                    .expect("outcome answers action");
            }
            Directive::Halt(report) => return (actions, report.end),
            Directive::Idle => panic!("controller went idle mid-episode"),
        }
    }
}

#[test]
fn collects_every_coin_then_finishes() {
    for algorithm in [
        Algorithm::Bfs,
        Algorithm::AStar(DistanceMetric::Octile),
        Algorithm::AStar(DistanceMetric::LegacyAbsDelta),
    ] {
        let mut oracle = GridOracle::parse(&SMALL_MAZE);
        let mut controller = ExplorationController::new(ExplorationProfile::default(), algorithm);

        let report = drive(&mut controller, &mut oracle).expect("episode runs");

        assert_eq!(report.end, EpisodeEnd::Finished, "{algorithm:?}");
        assert_eq!(report.collected, 3, "{algorithm:?}");
        assert_eq!(oracle.coins_left(), 0);
        assert_eq!(report.statistics.count(&CellKind::Coin), 0);
    }
}

#[test]
fn long_target_path_yields_to_shorter_frontier() {
    let mut controller = ExplorationController::new(corridor_profile(), Algorithm::Bfs);
    controller.start().expect("idle controller starts");
    assert_eq!(controller.poll(), Directive::Act(Action::Look));
    controller
        .resolve(Outcome::Observed(corridor_batch().into()))
        .expect("look answered");

    assert_eq!(controller.poll(), Directive::Act(Action::Move(Step::EAST)));
    assert_eq!(controller.phase(), Phase::Exploring);
    let progress = controller.progress();
    assert_eq!(progress.route.last(), Some(&CellCoord::new(3, -1)));
    assert_eq!(progress.route.len(), 3, "three-step frontier");
}

#[test]
fn short_target_path_is_pursued() {
    let profile = ExplorationProfile {
        change_to_unknown_threshold: 10,
        ..ExplorationProfile::default()
    };
    let mut controller = ExplorationController::new(profile, Algorithm::Bfs);
    controller.start().expect("idle controller starts");
    let _ = controller.poll();
    controller
        .resolve(Outcome::Observed(corridor_batch().into()))
        .expect("look answered");

    assert_eq!(controller.poll(), Directive::Act(Action::Move(Step::EAST)));
    assert_eq!(controller.phase(), Phase::Pursuing);
    assert_eq!(
        controller.progress().route.last(),
        Some(&CellCoord::new(8, 0))
    );
}

#[test]
fn seeded_map_never_trades_target_for_frontier() {
    let seed: Vec<Cell> = corridor_batch()
        .into_iter()
        .map(|observation| Cell::new(observation.offset, observation.kind, observation.name))
        .collect();
    let mut controller =
        ExplorationController::new(corridor_profile(), Algorithm::Bfs).with_seed(seed);
    controller.start().expect("idle controller starts");
    let _ = controller.poll();
    controller
        .resolve(Outcome::Observed(corridor_batch().into()))
        .expect("look answered");

    let _ = controller.poll();
    assert_eq!(controller.phase(), Phase::Pursuing);
}

#[test]
fn reaching_finish_target_finishes_before_moving_on() {
    let profile = ExplorationProfile {
        finish_target_count: 1,
        ..ExplorationProfile::default()
    };
    let mut oracle = GridOracle::parse(&["#######", "#S.c.c#", "#######"]);
    let mut controller = ExplorationController::new(profile, Algorithm::Bfs);

    let (actions, end) = run_recorded(&mut controller, &mut oracle);

    let first_collect = actions
        .iter()
        .position(|action| *action == Action::Collect)
        .expect("a coin was collected");
    assert_eq!(actions[first_collect + 1], Action::Finish);
    assert_eq!(actions[first_collect + 2], Action::Look, "refusal triggers a scan");
    assert_eq!(end, EpisodeEnd::Finished);
    assert_eq!(actions.last(), Some(&Action::Finish));
}

#[test]
fn reveal_explores_without_collecting() {
    let mut oracle = GridOracle::parse(&SMALL_MAZE);
    let mut controller = ExplorationController::new(ExplorationProfile::default(), Algorithm::Bfs)
        .with_goal(EpisodeGoal::Reveal);

    let (actions, end) = run_recorded(&mut controller, &mut oracle);

    assert_eq!(end, EpisodeEnd::Revealed);
    assert!(actions
        .iter()
        .all(|action| !matches!(action, Action::Collect | Action::Finish)));
    let statistics = controller.progress().statistics;
    assert_eq!(statistics.count(&CellKind::Coin), 3);
    assert_eq!(statistics.count(&CellKind::StartMarker), 1);
    assert_eq!(oracle.coins_left(), 3);
}

#[test]
fn repeated_look_rejections_abort() {
    let mut controller = ExplorationController::new(ExplorationProfile::default(), Algorithm::Bfs);

    let report = drive(&mut controller, &mut RefusingOracle).expect("episode runs");

    assert_eq!(report.end, EpisodeEnd::Aborted);
    assert_eq!(report.actions, 3);
}

#[test]
fn rejected_move_triggers_rescan() {
    let mut controller = ExplorationController::new(corridor_profile(), Algorithm::Bfs);
    controller.start().expect("idle controller starts");
    let _ = controller.poll();
    controller
        .resolve(Outcome::Observed(corridor_batch().into()))
        .expect("look answered");
    let _ = controller.poll();

    controller
        .resolve(Outcome::Rejected(Rejection::new("blocked")))
        .expect("rejection answers move");

    assert_eq!(controller.phase(), Phase::Scanning);
    assert_eq!(controller.poll(), Directive::Act(Action::Look));
    assert!(controller.progress().route.is_empty());
}

#[test]
fn refused_collect_still_clears_the_cell() {
    let profile = ExplorationProfile {
        change_to_unknown_threshold: 10,
        ..ExplorationProfile::default()
    };
    let mut controller = ExplorationController::new(profile, Algorithm::Bfs);
    controller.start().expect("idle controller starts");
    let _ = controller.poll();
    controller
        .resolve(Outcome::Observed(corridor_batch().into()))
        .expect("look answered");

    for _ in 0..8 {
        assert!(matches!(controller.poll(), Directive::Act(Action::Move(_))));
        controller
            .resolve(Outcome::Moved {
                step: Step::EAST,
                sighting: Sighting::default(),
            })
            .expect("move answered");
    }
    assert_eq!(controller.poll(), Directive::Act(Action::Collect));
    controller
        .resolve(Outcome::Rejected(Rejection::new("already taken")))
        .expect("rejection answers collect");

    let progress = controller.progress();
    assert_eq!(progress.collected, 0);
    assert_eq!(progress.statistics.count(&CellKind::Coin), 0);
}

#[test]
fn cancellation_halts_before_the_next_action() {
    let mut controller = ExplorationController::new(ExplorationProfile::default(), Algorithm::Bfs);
    let token = controller.cancel_token();
    controller.start().expect("idle controller starts");
    token.cancel();

    match controller.poll() {
        Directive::Halt(report) => {
            assert_eq!(report.end, EpisodeEnd::Cancelled);
            assert_eq!(report.actions, 0);
        }
        other => panic!("expected halt, got {other:?}"),
    }
}

#[test]
fn api_misuse_is_reported() {
    let mut controller = ExplorationController::new(ExplorationProfile::default(), Algorithm::Bfs);
    assert_eq!(controller.poll(), Directive::Idle);
    assert_eq!(
        controller.resolve(Outcome::Collected),
        Err(ControllerError::NoPendingAction)
    );

    controller.start().expect("idle controller starts");
    assert_eq!(controller.start(), Err(ControllerError::EpisodeActive));

    assert_eq!(controller.poll(), Directive::Act(Action::Look));
    assert_eq!(
        controller.resolve(Outcome::Collected),
        Err(ControllerError::UnexpectedOutcome {
            action: Action::Look
        })
    );
    assert_eq!(
        controller.poll(),
        Directive::Act(Action::Look),
        "unanswered action stays pending"
    );
}

/// Every cell within `radius` of the agent is open floor.
fn open_batch(radius: i32, diamond: bool) -> Vec<Observation> {
    let mut batch = Vec::new();
    for dx in -radius..=radius {
        for dy in -radius..=radius {
            if diamond && dx.abs() + dy.abs() > radius {
                continue;
            }
            let kind = if (dx, dy) == (0, 0) {
                CellKind::StartMarker
            } else {
                CellKind::Empty
            };
            batch.push(Observation::new(dx, dy, kind.clone(), kind.wire_name()));
        }
    }
    batch
}

fn finishes_between_collect_and_next_move(profile: ExplorationProfile) -> (usize, EpisodeEnd) {
    let mut oracle = GridOracle::parse(&[
        "##################",
        "#Sc.............c#",
        "##################",
    ]);
    let mut controller = ExplorationController::new(profile, Algorithm::Bfs);

    let (actions, end) = run_recorded(&mut controller, &mut oracle);

    let first_collect = actions
        .iter()
        .position(|action| *action == Action::Collect)
        .expect("a coin was collected");
    let finishes = actions[first_collect..]
        .iter()
        .take_while(|action| !matches!(action, Action::Move(_)))
        .filter(|action| **action == Action::Finish)
        .count();
    (finishes, end)
}

#[test]
fn long_frontier_triggers_an_extra_finish_attempt() {
    let eager = ExplorationProfile {
        finish_target_count: 1,
        try_finish_threshold: 2,
        ..ExplorationProfile::default()
    };
    assert_eq!(
        finishes_between_collect_and_next_move(eager),
        (2, EpisodeEnd::Finished)
    );

    let patient = ExplorationProfile {
        finish_target_count: 1,
        ..ExplorationProfile::default()
    };
    assert_eq!(
        finishes_between_collect_and_next_move(patient),
        (1, EpisodeEnd::Finished)
    );
}

#[test]
fn known_look_corners_skip_the_extra_look() {
    let mut controller = ExplorationController::new(ExplorationProfile::default(), Algorithm::Bfs);
    controller.start().expect("idle controller starts");
    let _ = controller.poll();
    controller
        .resolve(Outcome::Observed(open_batch(5, false).into()))
        .expect("look answered");

    assert!(matches!(controller.poll(), Directive::Act(Action::Move(_))));
    assert_eq!(controller.phase(), Phase::Exploring);

    let mut controller = ExplorationController::new(ExplorationProfile::default(), Algorithm::Bfs);
    controller.start().expect("idle controller starts");
    let _ = controller.poll();
    controller
        .resolve(Outcome::Observed(open_batch(5, true).into()))
        .expect("look answered");

    assert_eq!(controller.poll(), Directive::Act(Action::Look));
    assert_eq!(controller.phase(), Phase::Scanning);
}

fn decision_after_two_open_looks(profile: ExplorationProfile) -> Directive {
    let mut controller = ExplorationController::new(profile, Algorithm::Bfs);
    controller.start().expect("idle controller starts");
    for _ in 0..2 {
        assert_eq!(controller.poll(), Directive::Act(Action::Look));
        controller
            .resolve(Outcome::Observed(open_batch(5, true).into()))
            .expect("look answered");
    }
    controller.poll()
}

#[test]
fn unknown_margin_hides_the_outer_frontier() {
    let margin = ExplorationProfile {
        ignore_unknown_margin: UnknownMargin { x: 997, y: 997 },
        ..ExplorationProfile::default()
    };
    assert_eq!(
        decision_after_two_open_looks(margin),
        Directive::Act(Action::Finish)
    );
    assert!(matches!(
        decision_after_two_open_looks(ExplorationProfile::default()),
        Directive::Act(Action::Move(_))
    ));
}

#[test]
fn unreachable_leftovers_end_the_episode_exhausted() {
    let mut oracle = GridOracle::parse(&[
        "###################",
        "#S...............c#",
        "#%%%%%%%%%%%%%%%%%#",
        "#%c%c%c%c%c%%%%%%%#",
        "###################",
    ]);
    let mut controller = ExplorationController::new(
        ExplorationProfile::default(),
        Algorithm::AStar(DistanceMetric::Octile),
    )
    .with_seed(oracle.known_cells());

    let (actions, end) = run_recorded(&mut controller, &mut oracle);

    assert_eq!(end, EpisodeEnd::Exhausted);
    assert_eq!(controller.progress().collected, 1, "coin past the caged ones");
    assert_eq!(oracle.coins_left(), 5);
    assert_eq!(actions.last(), Some(&Action::Finish));
}

#[test]
fn look_position_overrides_the_local_frame() {
    let mut controller = ExplorationController::new(corridor_profile(), Algorithm::Bfs);
    controller.start().expect("idle controller starts");
    let _ = controller.poll();
    controller
        .resolve(Outcome::Observed(Sighting::at(CellCoord::ORIGIN, corridor_batch())))
        .expect("look answered");
    assert_eq!(controller.poll(), Directive::Act(Action::Move(Step::EAST)));
    controller
        .resolve(Outcome::Rejected(Rejection::new("timeout")))
        .expect("rejection answers move");

    assert_eq!(controller.poll(), Directive::Act(Action::Look));
    controller
        .resolve(Outcome::Observed(Sighting::at(CellCoord::new(4, 0), Vec::new())))
        .expect("look answered");

    assert_eq!(controller.progress().position, CellCoord::new(4, 0));
    assert_eq!(controller.poll(), Directive::Act(Action::Move(Step::EAST)));
    let progress = controller.progress();
    assert_eq!(progress.phase, Phase::Pursuing);
    assert_eq!(progress.route.len(), 4);
    assert_eq!(progress.route.last(), Some(&CellCoord::new(8, 0)));
}

#[test]
fn drifted_move_is_resynced_and_replanned() {
    let profile = ExplorationProfile {
        change_to_unknown_threshold: 10,
        ..ExplorationProfile::default()
    };
    let mut controller = ExplorationController::new(profile, Algorithm::Bfs);
    controller.start().expect("idle controller starts");
    let _ = controller.poll();
    controller
        .resolve(Outcome::Observed(corridor_batch().into()))
        .expect("look answered");
    assert_eq!(controller.poll(), Directive::Act(Action::Move(Step::EAST)));

    controller
        .resolve(Outcome::Moved {
            step: Step::EAST,
            sighting: Sighting::at(CellCoord::new(2, 0), Vec::new()),
        })
        .expect("move answered");

    let progress = controller.progress();
    assert_eq!(progress.position, CellCoord::new(2, 0));
    assert!(progress.route.is_empty(), "stale route dropped");

    assert_eq!(controller.poll(), Directive::Act(Action::Move(Step::EAST)));
    let progress = controller.progress();
    assert_eq!(progress.route.len(), 6);
    assert_eq!(progress.route.last(), Some(&CellCoord::new(8, 0)));
}

#[test]
fn cancellation_between_path_steps_keeps_the_position() {
    let profile = ExplorationProfile {
        change_to_unknown_threshold: 10,
        ..ExplorationProfile::default()
    };
    let mut controller = ExplorationController::new(profile, Algorithm::Bfs);
    let token = controller.cancel_token();
    controller.start().expect("idle controller starts");
    let _ = controller.poll();
    controller
        .resolve(Outcome::Observed(corridor_batch().into()))
        .expect("look answered");
    assert_eq!(controller.poll(), Directive::Act(Action::Move(Step::EAST)));
    controller
        .resolve(Outcome::Moved {
            step: Step::EAST,
            sighting: Sighting::default(),
        })
        .expect("move answered");

    token.cancel();

    match controller.poll() {
        Directive::Halt(report) => {
            assert_eq!(report.end, EpisodeEnd::Cancelled);
            assert_eq!(report.actions, 2);
        }
        other => panic!("expected halt, got {other:?}"),
    }
    let progress = controller.progress();
    assert_eq!(progress.position, CellCoord::new(1, 0));
    assert!(progress.route.is_empty());
    assert_eq!(progress.phase, Phase::Done(EpisodeEnd::Cancelled));
}
