//! Text rendering of the discovered map.

use std::collections::HashSet;

use maze_explorer_core::{CellCoord, CellKind, MapView};
use maze_explorer_system_exploration::ProgressSnapshot;

const UNKNOWN: char = ' ';
const AGENT: char = '@';
const ROUTE: char = '*';

/// Draws the discovered cells as a grid, with the agent and its planned route.
#[must_use]
pub(crate) fn render(map: MapView<'_>, progress: &ProgressSnapshot) -> String {
    let mut min = progress.position;
    let mut max = progress.position;
    for cell in map.iter() {
        min = CellCoord::new(min.x().min(cell.coord.x()), min.y().min(cell.coord.y()));
        max = CellCoord::new(max.x().max(cell.coord.x()), max.y().max(cell.coord.y()));
    }

    let route: HashSet<CellCoord> = progress.route.iter().copied().collect();
    let mut out = String::new();
    for y in min.y()..=max.y() {
        for x in min.x()..=max.x() {
            let coord = CellCoord::new(x, y);
            let glyph = if coord == progress.position {
                AGENT
            } else if route.contains(&coord) {
                ROUTE
            } else {
                map.kind(coord).map_or(UNKNOWN, glyph_for)
            };
            out.push(glyph);
        }
        out.push('\n');
    }
    out
}

fn glyph_for(kind: &CellKind) -> char {
    match kind {
        CellKind::Empty => '.',
        CellKind::Coin => 'c',
        CellKind::Special => 'd',
        CellKind::Wall => '#',
        CellKind::Rock => '%',
        CellKind::StartMarker => 'S',
        CellKind::Other(_) => '?',
    }
}
