#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that explores a simulated maze.
//!
//! The binary plays the part of the game client: it feeds the exploration
//! controller with answers from [`maze::SimulatedMaze`] and optionally keeps
//! the discovered map on disk between runs.

mod args;
mod map_store;
mod maze;
mod profiles;
mod render;

use anyhow::{bail, Context, Result};
use clap::Parser;
use maze_explorer_core::{GameOracle, MapStore};
use maze_explorer_system_exploration::{
    Directive, EpisodeGoal, EpisodeReport, ExplorationController,
};
use maze_explorer_world::query;

use crate::{
    args::{Cli, Mode, RunArgs},
    map_store::JsonMapStore,
    maze::SimulatedMaze,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.mode {
        Mode::Run(args) => run(&args, EpisodeGoal::Collect),
        Mode::Reveal(args) => run(&args, EpisodeGoal::Reveal),
    }
}

fn run(args: &RunArgs, goal: EpisodeGoal) -> Result<()> {
    let book = profiles::load(args.profiles.as_deref())?;
    let profile = book.for_world(&args.world).clone();

    let mut maze = match &args.maze {
        Some(path) => SimulatedMaze::load(path)?,
        None => {
            log::info!(
                "generating {}x{} maze with seed {}",
                args.width,
                args.height,
                args.seed
            );
            SimulatedMaze::generate(args.seed, args.width, args.height, args.coins)?
        }
    };

    let mut store = args.snapshots.as_ref().map(JsonMapStore::new);
    let mut controller = ExplorationController::new(profile, args.algorithm()).with_goal(goal);
    if args.use_saved {
        let store = store.as_ref().context("--use-saved needs --snapshots")?;
        let cells = store
            .load(&args.world)
            .with_context(|| format!("failed to load saved map for {}", args.world))?;
        log::info!("seeding {} with {} saved cells", args.world, cells.len());
        controller = controller.with_seed(cells);
    }

    let report = play(&mut controller, &mut maze, args.render_every, args.max_actions)?;
    print_report(&report, &maze);

    if let Some(store) = store.as_mut() {
        let cells = query::snapshot_cells(controller.world());
        store
            .save(&args.world, &cells)
            .with_context(|| format!("failed to save map for {}", args.world))?;
        log::info!(
            "saved {} cells to {}",
            cells.len(),
            store.path_for(&args.world).display()
        );
    }
    Ok(())
}

fn play(
    controller: &mut ExplorationController,
    oracle: &mut dyn GameOracle,
    render_every: usize,
    max_actions: usize,
) -> Result<EpisodeReport> {
    let cancel = controller.cancel_token();
    controller.start()?;
    loop {
        match controller.poll() {
            Directive::Act(action) => {
                let outcome = oracle.perform(action);
                log::trace!("{action:?} -> {outcome:?}");
                controller.resolve(outcome)?;

                let progress = controller.progress();
                if max_actions > 0 && progress.actions >= max_actions {
                    log::warn!("action limit of {max_actions} reached, cancelling");
                    cancel.cancel();
                }
                if render_every > 0 && progress.actions % render_every == 0 {
                    log::info!(
                        "{:?} at {} after {} actions, {} collected",
                        progress.phase,
                        progress.position,
                        progress.actions,
                        progress.collected
                    );
                    println!(
                        "{}",
                        render::render(query::map_view(controller.world()), &progress)
                    );
                }
            }
            Directive::Halt(report) => return Ok(report),
            Directive::Idle => bail!("controller stopped without reporting"),
        }
    }
}

fn print_report(report: &EpisodeReport, maze: &SimulatedMaze) {
    let tally = maze.tally();
    println!("episode ended: {:?}", report.end);
    println!("collected: {}", report.collected);
    println!(
        "actions: {} (look {}, move {}, collect {}, finish {})",
        tally.total(),
        tally.looks,
        tally.moves,
        tally.collects,
        tally.finishes
    );
    println!("coins left in maze: {}", maze.coins_left());
    println!("discovered cells: {}", report.statistics.total());
    for (name, count) in report.statistics.iter() {
        println!("  {name}: {count}");
    }
}
