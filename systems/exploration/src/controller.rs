//! Decision loop driving one exploration episode.

use std::collections::VecDeque;

use log::{debug, info, warn};
use maze_explorer_core::{
    Action, Bounds, Cell, CellCoord, Command, Event, MapStatistics, Outcome, Path, Rejection,
    Sighting, Step,
};
use maze_explorer_system_pathfinding::{Algorithm, Bfs, PathFinder};
use maze_explorer_world::{self as world, query, World};
use thiserror::Error;

use crate::{CancelToken, ExplorationProfile};

/// What an episode is trying to achieve.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EpisodeGoal {
    /// Collect targets and close the world.
    #[default]
    Collect,
    /// Explore until no frontier remains, without collecting or finishing.
    Reveal,
}

/// Reason an episode stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EpisodeEnd {
    /// The server accepted the finish request.
    Finished,
    /// Every reachable cell has been discovered.
    Revealed,
    /// Nothing left to explore and the final finish request was refused.
    Exhausted,
    /// The cancel token was triggered.
    Cancelled,
    /// Too many consecutive rejections.
    Aborted,
}

/// Observable state of the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// No episode has been started.
    Idle,
    /// Observing the neighbourhood.
    Scanning,
    /// Following a path to a known target.
    Pursuing,
    /// Following a path to the frontier.
    Exploring,
    /// Waiting for the server to answer a finish request.
    AttemptingFinish,
    /// The episode is over.
    Done(EpisodeEnd),
}

/// Next thing the caller should do on behalf of the controller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Directive {
    /// No episode is running.
    Idle,
    /// Perform the action and feed the outcome back through `resolve`.
    Act(Action),
    /// The episode is over.
    Halt(EpisodeReport),
}

/// Summary produced when an episode ends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EpisodeReport {
    /// Why the episode stopped.
    pub end: EpisodeEnd,
    /// Targets collected and counted.
    pub collected: usize,
    /// Actions issued to the server.
    pub actions: usize,
    /// Census of the discovered map.
    pub statistics: MapStatistics,
}

/// Read-only view of a running episode for presentation layers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgressSnapshot {
    /// Current phase.
    pub phase: Phase,
    /// Absolute position of the agent.
    pub position: CellCoord,
    /// Current bounds of the explorable region.
    pub bounds: Bounds,
    /// Cells still to be visited on the current route.
    pub route: Vec<CellCoord>,
    /// Census of the discovered map.
    pub statistics: MapStatistics,
    /// Targets collected and counted.
    pub collected: usize,
    /// Actions issued to the server.
    pub actions: usize,
}

/// Misuse of the controller API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ControllerError {
    /// `start` was called while an episode is running.
    #[error("an exploration episode is already running")]
    EpisodeActive,
    /// `resolve` was called without an outstanding action.
    #[error("no action is waiting for an outcome")]
    NoPendingAction,
    /// The outcome does not answer the outstanding action.
    #[error("outcome does not answer pending action {action:?}")]
    UnexpectedOutcome {
        /// Action still waiting for its outcome.
        action: Action,
    },
}

enum Next {
    Act(Action),
    End(EpisodeEnd),
}

/// Pull-based state machine that explores a world through a game server.
///
/// Call [`poll`](Self::poll) to obtain the next action, perform it, then hand
/// the answer to [`resolve`](Self::resolve). The controller owns the session
/// [`World`] and never performs I/O itself.
#[derive(Debug)]
pub struct ExplorationController {
    world: World,
    profile: ExplorationProfile,
    algorithm: Algorithm,
    goal: EpisodeGoal,
    seed: Option<Vec<Cell>>,
    cancel: CancelToken,
    phase: Phase,
    route: VecDeque<Step>,
    queued: Option<Action>,
    pending: Option<Action>,
    collected: usize,
    actions: usize,
    finish_attempted_at: Option<usize>,
    long_route_finish_at: Option<usize>,
    final_finish: bool,
    scan_credit: bool,
    consecutive_rejections: usize,
    events: Vec<Event>,
}

impl ExplorationController {
    /// Creates an idle controller.
    #[must_use]
    pub fn new(profile: ExplorationProfile, algorithm: Algorithm) -> Self {
        Self {
            world: World::new(),
            profile,
            algorithm,
            goal: EpisodeGoal::default(),
            seed: None,
            cancel: CancelToken::new(),
            phase: Phase::Idle,
            route: VecDeque::new(),
            queued: None,
            pending: None,
            collected: 0,
            actions: 0,
            finish_attempted_at: None,
            long_route_finish_at: None,
            final_finish: false,
            scan_credit: true,
            consecutive_rejections: 0,
            events: Vec::new(),
        }
    }

    /// Selects the goal of subsequent episodes.
    #[must_use]
    pub fn with_goal(mut self, goal: EpisodeGoal) -> Self {
        self.goal = goal;
        self
    }

    /// Preloads every episode with a previously saved map.
    ///
    /// A seeded map is trusted, so long target paths are never traded for
    /// frontier exploration.
    #[must_use]
    pub fn with_seed(mut self, cells: Vec<Cell>) -> Self {
        self.seed = Some(cells);
        self
    }

    /// Token that cancels this controller's episodes.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Session state of the current or last episode.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Reports whether an episode is running.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !matches!(self.phase, Phase::Idle | Phase::Done(_))
    }

    /// Begins a new episode with a fresh session.
    pub fn start(&mut self) -> Result<(), ControllerError> {
        if self.is_active() {
            return Err(ControllerError::EpisodeActive);
        }

        self.execute(Command::ResetSession);
        if let Some(cells) = self.seed.clone() {
            self.execute(Command::SeedMap { cells });
        }

        self.route.clear();
        self.pending = None;
        self.collected = 0;
        self.actions = 0;
        self.finish_attempted_at = None;
        self.long_route_finish_at = None;
        self.final_finish = false;
        self.scan_credit = true;
        self.consecutive_rejections = 0;
        self.queue(Action::Look);

        info!(
            "episode started: goal {:?}, algorithm {:?}, seeded {}",
            self.goal,
            self.algorithm,
            self.seed.is_some()
        );
        Ok(())
    }

    /// Yields the next action, or the report once the episode is over.
    ///
    /// Polling again before resolving returns the same action.
    pub fn poll(&mut self) -> Directive {
        if let Some(action) = self.pending {
            return Directive::Act(action);
        }

        match self.phase {
            Phase::Idle => return Directive::Idle,
            Phase::Done(end) => return Directive::Halt(self.report(end)),
            _ => {}
        }

        if self.cancel.is_cancelled() {
            self.end_episode(EpisodeEnd::Cancelled);
            return Directive::Halt(self.report(EpisodeEnd::Cancelled));
        }

        match self.next_action() {
            Next::Act(action) => {
                self.pending = Some(action);
                self.actions += 1;
                Directive::Act(action)
            }
            Next::End(end) => {
                self.end_episode(end);
                Directive::Halt(self.report(end))
            }
        }
    }

    /// Feeds the server's answer to the outstanding action.
    pub fn resolve(&mut self, outcome: Outcome) -> Result<(), ControllerError> {
        let action = self.pending.take().ok_or(ControllerError::NoPendingAction)?;

        match (action, outcome) {
            (_, Outcome::Rejected(rejection)) => self.on_rejected(action, rejection),
            (Action::Look, Outcome::Observed(sighting)) => self.on_observed(sighting),
            (Action::Move(expected), Outcome::Moved { step, sighting }) if expected == step => {
                self.on_moved(step, sighting)
            }
            (Action::Collect, Outcome::Collected) => self.on_collected(),
            (Action::Finish, Outcome::Finished) => {
                info!(
                    "world finished after {} actions with {} collected",
                    self.actions, self.collected
                );
                self.end_episode(EpisodeEnd::Finished);
            }
            (action, _) => {
                self.pending = Some(action);
                return Err(ControllerError::UnexpectedOutcome { action });
            }
        }
        Ok(())
    }

    /// Captures the state of the episode for presentation.
    #[must_use]
    pub fn progress(&self) -> ProgressSnapshot {
        let position = query::position(&self.world);
        let in_flight = match self.pending {
            Some(Action::Move(step)) => Some(step),
            _ => None,
        };
        let route = in_flight
            .into_iter()
            .chain(self.route.iter().copied())
            .scan(position, |current, step| {
                *current = current.offset(step);
                Some(*current)
            })
            .collect();

        ProgressSnapshot {
            phase: self.phase,
            position,
            bounds: query::bounds(&self.world),
            route,
            statistics: query::statistics(&self.world),
            collected: self.collected,
            actions: self.actions,
        }
    }

    fn execute(&mut self, command: Command) {
        self.events.clear();
        world::apply(&mut self.world, command, &mut self.events);
    }

    fn queue(&mut self, action: Action) {
        match action {
            Action::Look => self.phase = Phase::Scanning,
            Action::Finish => self.phase = Phase::AttemptingFinish,
            Action::Move(_) | Action::Collect => {}
        }
        self.queued = Some(action);
    }

    fn next_action(&mut self) -> Next {
        if let Some(action) = self.queued.take() {
            return Next::Act(action);
        }
        if let Some(step) = self.route.pop_front() {
            return Next::Act(Action::Move(step));
        }
        match self.goal {
            EpisodeGoal::Collect => self.decide_collect(),
            EpisodeGoal::Reveal => self.decide_reveal(),
        }
    }

    fn decide_collect(&mut self) -> Next {
        let position = query::position(&self.world);
        let bounds = query::bounds(&self.world);
        let finish_target = self.profile.finish_target_count;
        let enough_collected = self.collected >= finish_target;

        if enough_collected && self.finish_attempted_at != Some(self.collected) {
            self.finish_attempted_at = Some(self.collected);
            return self.attempt_finish(false);
        }

        let mut target = self.target_path(position, bounds);
        let mut frontier = None;
        let target_len = target.as_ref().map(Path::len);

        match target_len {
            None => {
                if self.scan_credit
                    && self.look_confidence(position) < self.profile.look_confidence_threshold
                {
                    debug!("no target in sight from {position}, looking again");
                    self.scan_credit = false;
                    return self.scan();
                }
                frontier = self.frontier_path(position, self.profile.frontier_bounds(bounds));
            }
            Some(len) if len > self.profile.change_to_unknown_threshold && self.seed.is_none() => {
                frontier = self.frontier_path(position, self.profile.frontier_bounds(bounds));
                if frontier.as_ref().map_or(false, |unknown| unknown.len() < len) {
                    debug!("target is {len} steps away, exploring instead");
                    target = None;
                }
            }
            Some(_) => {}
        }

        if let Some(path) = target {
            debug!(
                "pursuing {} over {} steps",
                self.profile.target_kind,
                path.len()
            );
            return self.follow(path, Phase::Pursuing);
        }

        if let Some(path) = frontier {
            if path.len() > self.profile.try_finish_threshold
                && enough_collected
                && self.long_route_finish_at != Some(self.collected)
            {
                debug!("frontier is {} steps away, trying to finish first", path.len());
                self.long_route_finish_at = Some(self.collected);
                return self.attempt_finish(false);
            }
            debug!("exploring frontier over {} steps", path.len());
            return self.follow(path, Phase::Exploring);
        }

        if self.scan_credit {
            self.scan_credit = false;
            return self.scan();
        }

        info!("nothing left to pursue, attempting final finish");
        self.attempt_finish(true)
    }

    fn decide_reveal(&mut self) -> Next {
        let position = query::position(&self.world);
        let bounds = query::bounds(&self.world);

        if let Some(path) = self.frontier_path(position, bounds) {
            return self.follow(path, Phase::Exploring);
        }
        if self.scan_credit {
            self.scan_credit = false;
            return self.scan();
        }

        info!(
            "map revealed: {} cells, {} {}",
            query::map_view(&self.world).len(),
            query::statistics(&self.world).count(&self.profile.target_kind),
            self.profile.target_kind
        );
        Next::End(EpisodeEnd::Revealed)
    }

    fn target_path(&self, position: CellCoord, bounds: Bounds) -> Option<Path> {
        let view = query::map_view(&self.world);
        let kind = &self.profile.target_kind;
        self.algorithm
            .path_to_kind(view, kind, position, bounds)
            .or_else(|| match self.algorithm {
                Algorithm::Bfs => None,
                Algorithm::AStar(_) => {
                    let fallback = Bfs.path_to_kind(view, kind, position, bounds);
                    if fallback.is_some() {
                        debug!("heuristic search missed every nearby {kind}, using bfs");
                    }
                    fallback
                }
            })
    }

    fn frontier_path(&self, position: CellCoord, bounds: Bounds) -> Option<Path> {
        let view = query::map_view(&self.world);
        self.algorithm
            .path_to_unknown(view, position, bounds)
            .or_else(|| match self.algorithm {
                Algorithm::Bfs => None,
                Algorithm::AStar(_) => {
                    let fallback = Bfs.path_to_unknown(view, position, bounds);
                    if fallback.is_some() {
                        debug!("heuristic search missed the frontier, using bfs");
                    }
                    fallback
                }
            })
    }

    /// Counts the known corners of the look diamond's bounding square.
    fn look_confidence(&self, position: CellCoord) -> usize {
        let radius = self.profile.look_scan.radius;
        let view = query::map_view(&self.world);
        [(radius, radius), (-radius, radius), (radius, -radius), (-radius, -radius)]
            .into_iter()
            .filter(|(dx, dy)| view.is_known(position.translate(*dx, *dy)))
            .count()
    }

    fn follow(&mut self, path: Path, phase: Phase) -> Next {
        self.phase = phase;
        self.route = path.into_steps().into();
        self.next_action()
    }

    fn scan(&mut self) -> Next {
        self.phase = Phase::Scanning;
        Next::Act(Action::Look)
    }

    fn attempt_finish(&mut self, last_chance: bool) -> Next {
        self.phase = Phase::AttemptingFinish;
        self.final_finish = last_chance;
        Next::Act(Action::Finish)
    }

    fn end_episode(&mut self, end: EpisodeEnd) {
        self.phase = Phase::Done(end);
        self.route.clear();
        self.queued = None;
        info!(
            "episode ended {:?}: {} collected in {} actions",
            end, self.collected, self.actions
        );
    }

    fn report(&self, end: EpisodeEnd) -> EpisodeReport {
        EpisodeReport {
            end,
            collected: self.collected,
            actions: self.actions,
            statistics: query::statistics(&self.world),
        }
    }

    fn on_observed(&mut self, sighting: Sighting) {
        self.resync(sighting.position);
        let scan = self.profile.look_scan;
        self.execute(Command::IngestObservations {
            observations: sighting.observations,
            scan,
        });
    }

    fn on_moved(&mut self, step: Step, sighting: Sighting) {
        self.consecutive_rejections = 0;
        self.scan_credit = true;
        self.execute(Command::AdvancePosition { step });
        self.resync(sighting.position);
        let scan = self.profile.move_scan;
        self.execute(Command::IngestObservations {
            observations: sighting.observations,
            scan,
        });

        if self.goal == EpisodeGoal::Collect {
            let position = query::position(&self.world);
            if query::map_view(&self.world).kind(position) == Some(&self.profile.target_kind) {
                self.queue(Action::Collect);
            }
        }
    }

    /// Adopts the server's position when it disagrees with the local frame.
    fn resync(&mut self, reported: Option<CellCoord>) {
        let Some(position) = reported else {
            return;
        };
        let local = query::position(&self.world);
        if position != local {
            warn!("server places the agent at {position}, local frame had {local}");
            self.execute(Command::SetPosition { position });
            self.route.clear();
        }
    }

    fn on_collected(&mut self) {
        self.consecutive_rejections = 0;
        self.collected += 1;
        let coord = query::position(&self.world);
        self.execute(Command::ConsumeCell { coord });
        debug!("collected #{} at {coord}", self.collected);

        if self.collected >= self.profile.finish_target_count {
            self.route.clear();
            self.finish_attempted_at = Some(self.collected);
            self.final_finish = false;
            self.queue(Action::Finish);
        }
    }

    fn on_rejected(&mut self, action: Action, rejection: Rejection) {
        match action {
            Action::Finish => {
                info!("finish refused: {rejection}");
                if self.final_finish {
                    self.end_episode(EpisodeEnd::Exhausted);
                } else {
                    self.queue(Action::Look);
                }
                return;
            }
            Action::Collect => {
                warn!("collect refused: {rejection}");
                let coord = query::position(&self.world);
                self.execute(Command::ConsumeCell { coord });
            }
            Action::Move(step) => {
                warn!("move {step:?} refused: {rejection}");
                self.route.clear();
                self.queue(Action::Look);
            }
            Action::Look => {
                warn!("look refused: {rejection}");
                self.queue(Action::Look);
            }
        }

        self.consecutive_rejections += 1;
        if self.consecutive_rejections >= self.profile.max_consecutive_rejections {
            warn!(
                "aborting after {} consecutive rejections",
                self.consecutive_rejections
            );
            self.end_episode(EpisodeEnd::Aborted);
        }
    }
}
