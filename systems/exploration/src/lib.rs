#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Exploration system that decides what the agent does next.
//!
//! The [`ExplorationController`] owns one session [`World`](maze_explorer_world::World)
//! and turns it into a stream of [`Action`] requests. It alternates between
//! chasing known targets and pushing into the frontier, and decides when to
//! ask the server to finish. [`drive`] couples the controller with a
//! [`GameOracle`] for callers that do not need to interleave other work.

mod cancel;
mod controller;
mod profile;

pub use cancel::CancelToken;
pub use controller::{
    ControllerError, Directive, EpisodeEnd, EpisodeGoal, EpisodeReport, ExplorationController,
    Phase, ProgressSnapshot,
};
pub use profile::{ExplorationProfile, ProfileBook, UnknownMargin};

use maze_explorer_core::{Action, GameOracle};

/// Runs an episode to completion against the oracle.
///
/// A controller that is not running is started first.
pub fn drive<O>(
    controller: &mut ExplorationController,
    oracle: &mut O,
) -> Result<EpisodeReport, ControllerError>
where
    O: GameOracle + ?Sized,
{
    if !controller.is_active() {
        controller.start()?;
    }

    loop {
        match controller.poll() {
            Directive::Act(action) => {
                let outcome = oracle.perform(action);
                controller.resolve(outcome)?;
            }
            Directive::Halt(report) => return Ok(report),
            Directive::Idle => controller.start()?,
        }
    }
}

/// Number of actions of each kind, useful for summaries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ActionTally {
    /// Look requests issued.
    pub looks: usize,
    /// Move requests issued.
    pub moves: usize,
    /// Collect requests issued.
    pub collects: usize,
    /// Finish requests issued.
    pub finishes: usize,
}

impl ActionTally {
    /// Records one action.
    pub fn record(&mut self, action: Action) {
        match action {
            Action::Look => self.looks += 1,
            Action::Move(_) => self.moves += 1,
            Action::Collect => self.collects += 1,
            Action::Finish => self.finishes += 1,
        }
    }

    /// Total number of recorded actions.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.looks + self.moves + self.collects + self.finishes
    }
}
