//! Scripted headless session driven by a [`CliConfig`].

use anyhow::{Context, Result};
use log::{info, warn};
use skirmish_core::{AgentId, Event, InputEvent, Key, ManualClock};
use skirmish_system_bootstrap::{Bootstrap, Simulation};
use skirmish_world::query;

use crate::{
    config::{heading, point, CliConfig, Order},
    overlay::AsciiOverlay,
};

/// Tallies gathered while a session runs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct SessionReport {
    pub(crate) agents: usize,
    pub(crate) moves: usize,
    pub(crate) waypoints: usize,
    pub(crate) completed_paths: usize,
    pub(crate) failed_paths: usize,
    pub(crate) removed: usize,
    pub(crate) elapsed_ms: u64,
    pub(crate) overlay: String,
}

/// Builds the world described by `config`, plays its orders and ticks, and
/// reports what happened.
pub(crate) fn run(config: &CliConfig) -> Result<SessionReport> {
    let settings = config.simulation();
    let bootstrap = Bootstrap;
    let mut overlay = AsciiOverlay::new(settings.cell_size());
    let mut grid = bootstrap
        .build_grid(&settings, &mut overlay)
        .context("failed to prepare the play area")?;
    if let Some(path) = &config.collision_map {
        let summary = bootstrap
            .load_collision_file(&mut grid, path)
            .with_context(|| format!("failed to load collision map {}", path.display()))?;
        info!(
            "collision map {}: {} solid of {} cells, {} extra tokens",
            path.display(),
            summary.solid,
            summary.applied,
            summary.ignored
        );
    }

    let mut simulation = Simulation::new(&settings, grid);
    let roster = simulation
        .populate()
        .context("failed to place the initial roster")?;
    let player = roster.first().copied();

    let clock = ManualClock::new(0);
    let mut report = SessionReport::default();
    tally(&mut report, &simulation.drain_events());
    for tick in 0..config.ticks {
        for order in config.orders_at(tick) {
            execute(&mut simulation, player, order);
        }
        clock.advance(settings.move_interval());
        simulation.tick(&clock);
        tally(&mut report, &simulation.drain_events());
    }

    report.agents = query::agents(simulation.world()).count();
    report.elapsed_ms = query::now_ms(simulation.world());
    report.overlay = overlay.render(simulation.world());
    Ok(report)
}

fn execute(simulation: &mut Simulation, player: Option<AgentId>, order: &Order) {
    match *order {
        Order::Select { first, second, .. } => {
            simulation.handle_input(InputEvent::ButtonDown {
                position: point(first),
            });
            simulation.handle_input(InputEvent::PointerMoved {
                position: point(second),
            });
            simulation.handle_input(InputEvent::ButtonUp {
                position: point(second),
            });
        }
        Order::Designate { target, .. } => {
            simulation.handle_input(InputEvent::ButtonDown {
                position: point(target),
            });
            simulation.handle_input(InputEvent::ButtonUp {
                position: point(target),
            });
        }
        Order::ClearSelection { .. } => simulation.handle_input(InputEvent::KeyDown {
            key: Key::ClearSelection,
        }),
        Order::MovePlayer { target, .. } => {
            let Some(player) = player else {
                return;
            };
            if !simulation.set_goal(player, point(target)) {
                warn!("player has no path to {target:?}");
            }
        }
        Order::Launch {
            origin,
            heading: direction,
            ..
        } => {
            if let Err(reason) = simulation.launch_missile(point(origin), heading(direction)) {
                warn!("missile launch at {origin:?} failed: {reason}");
            }
        }
    }
}

fn tally(report: &mut SessionReport, events: &[Event]) {
    for event in events {
        match event {
            Event::AgentMoved { .. } => report.moves += 1,
            Event::WaypointReached { .. } => report.waypoints += 1,
            Event::PathCompleted { .. } => report.completed_paths += 1,
            Event::PathNotFound { .. } => report.failed_paths += 1,
            Event::AgentRemoved { .. } => report.removed += 1,
            _ => {}
        }
    }
}
