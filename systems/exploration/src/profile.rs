//! Tuning parameters for exploration episodes.

use std::collections::HashMap;

use maze_explorer_core::{Bounds, CellKind, ScanShape};
use serde::Deserialize;

/// Margin trimmed from each edge of the bounds when looking for frontiers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UnknownMargin {
    /// Columns ignored at the west and east edges.
    pub x: i32,
    /// Rows ignored at the north and south edges.
    pub y: i32,
}

/// Per-episode parameters steering the exploration loop.
///
/// Every field has a default, so partial configuration files only need to
/// name the values they change.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExplorationProfile {
    /// Target paths longer than this are compared against the frontier path.
    pub change_to_unknown_threshold: usize,
    /// Frontier paths longer than this trigger a finish attempt once enough is collected.
    pub try_finish_threshold: usize,
    /// Edge margin ignored by frontier searches.
    pub ignore_unknown_margin: UnknownMargin,
    /// Number of collected targets after which finishing is attempted.
    pub finish_target_count: usize,
    /// Known look-diamond corners required to skip a confidence re-scan.
    pub look_confidence_threshold: usize,
    /// Neighbourhood revealed by an explicit look.
    pub look_scan: ScanShape,
    /// Neighbourhood revealed after every confirmed move.
    pub move_scan: ScanShape,
    /// Cell kind pursued and collected.
    pub target_kind: CellKind,
    /// Rejections in a row tolerated before the episode is aborted.
    pub max_consecutive_rejections: usize,
}

impl Default for ExplorationProfile {
    fn default() -> Self {
        Self {
            change_to_unknown_threshold: 20,
            try_finish_threshold: 999,
            ignore_unknown_margin: UnknownMargin::default(),
            finish_target_count: 999,
            look_confidence_threshold: 4,
            look_scan: ScanShape::LOOK,
            move_scan: ScanShape::MOVE,
            target_kind: CellKind::Coin,
            max_consecutive_rejections: 3,
        }
    }
}

impl ExplorationProfile {
    /// Bounds searched for frontiers once the margin is trimmed.
    #[must_use]
    pub const fn frontier_bounds(&self, bounds: Bounds) -> Bounds {
        bounds.inset(self.ignore_unknown_margin.x, self.ignore_unknown_margin.y)
    }
}

/// Profiles keyed by world identifier with a fallback.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProfileBook {
    /// Profile used for worlds without a dedicated entry.
    pub default: ExplorationProfile,
    /// Dedicated profiles keyed by world identifier.
    pub worlds: HashMap<String, ExplorationProfile>,
}

impl ProfileBook {
    /// Profile for the world, falling back to the default profile.
    #[must_use]
    pub fn for_world(&self, world: &str) -> &ExplorationProfile {
        self.worlds.get(world).unwrap_or(&self.default)
    }
}
