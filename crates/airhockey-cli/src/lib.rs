//! # Air Hockey CLI
//!
//! Command-line interface for the air-hockey table simulation.
//!
//! ## Commands
//! - `simulate` - Build a table and run it headless
//! - `check` - Validate a table description
//! - `sample-table` - Print the standard table as JSON

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use glam::Vec3;
use serde::Serialize;

use airhockey_input::{Action, InputContext, InputEvent, KeyCode, Player};
use airhockey_physics::{
    AirHockeyTable, Paddle, PaddleShape, PhysicsConfig, TableLayout, YawMode, init_with_config,
};

/// Air hockey table simulation
#[derive(Parser)]
#[command(name = "airhockey")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Build a table and simulate it without rendering
    Simulate {
        /// Table description (JSON); the standard table when omitted
        #[arg(short, long)]
        table: Option<PathBuf>,

        /// Simulated duration in seconds
        #[arg(short, long, default_value = "5")]
        seconds: f32,

        /// Fixed step in seconds
        #[arg(long, default_value_t = 1.0 / 60.0)]
        timestep: f32,

        /// Initial impulse on the puck, as X and Z
        #[arg(long, num_args = 2, value_names = ["X", "Z"], allow_negative_numbers = true)]
        puck_impulse: Option<Vec<f32>>,

        /// Key presses fed to the controls before the first step
        #[arg(short, long, value_delimiter = ',')]
        keys: Vec<KeyCode>,

        /// Impulse per accumulated paddle shift
        #[arg(long, default_value = "20")]
        shift_impulse: f32,

        /// Rotation about the vertical axis: locked or free
        #[arg(long, default_value = "locked")]
        yaw: YawMode,

        /// Paddle collision shape: box or disc
        #[arg(long, default_value = "box")]
        paddle_shape: PaddleShape,

        /// Log body positions every N steps (0 disables)
        #[arg(long, default_value = "60")]
        report_every: u32,

        /// Print the final state as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a table description
    Check {
        /// Table description (JSON)
        table: PathBuf,
    },

    /// Print the standard table description
    SampleTable {
        /// Output file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Settings for one headless run
#[derive(Debug, Clone)]
pub struct SimulationSettings {
    pub seconds: f32,
    pub puck_impulse: Option<Vec3>,
    pub keys: Vec<KeyCode>,
    pub shift_impulse: f32,
    pub report_every: u32,
}

/// Where a body ended up
#[derive(Debug, Clone, Serialize)]
pub struct BodyState {
    pub position: Vec3,
    pub velocity: Vec3,
}

/// Outcome of a headless run
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub steps: u32,
    pub elapsed: f64,
    pub puck: BodyState,
    pub paddle1: BodyState,
    pub paddle2: BodyState,
}

/// Execute the CLI command
pub fn execute(cli: Cli) -> Result<()> {
    let filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    match cli.command {
        Commands::Simulate {
            table,
            seconds,
            timestep,
            puck_impulse,
            keys,
            shift_impulse,
            yaw,
            paddle_shape,
            report_every,
            json,
        } => {
            let layout = load_layout(table.as_deref())?;
            let config = PhysicsConfig {
                timestep,
                yaw,
                paddle_shape,
                ..Default::default()
            };
            let settings = SimulationSettings {
                seconds,
                puck_impulse: puck_impulse.map(|v| Vec3::new(v[0], 0.0, v[1])),
                keys,
                shift_impulse,
                report_every,
            };

            log::info!("Simulating {}s at {}s per step", seconds, timestep);
            let report = simulate(&layout, config, &settings)?;
            log::info!(
                "Done after {} steps: puck at {}",
                report.steps,
                report.puck.position
            );
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
        }

        Commands::Check { table } => {
            let layout = load_layout(Some(&table))?;
            let built = init_with_config(&layout, PhysicsConfig::default())
                .with_context(|| format!("Invalid table {}", table.display()))?;
            log::info!("Table {} is valid", table.display());
            log::info!("  Board triangles: {}", built.board_triangle_count());
            log::info!("  Bodies: {}", built.world().body_count());
            log::info!("  Constraints: {}", built.world().constraint_count());
        }

        Commands::SampleTable { output } => {
            let json = serde_json::to_string_pretty(&TableLayout::standard())?;
            match output {
                Some(path) => {
                    fs::write(&path, json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    log::info!("Wrote {}", path.display());
                }
                None => println!("{}", json),
            }
        }
    }

    Ok(())
}

/// Read a table description, or fall back to the standard table
pub fn load_layout(path: Option<&Path>) -> Result<TableLayout> {
    let Some(path) = path else {
        return Ok(TableLayout::standard());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read table {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse table {}", path.display()))
}

/// Build the table and run it for `settings.seconds`.
pub fn simulate(
    layout: &TableLayout,
    config: PhysicsConfig,
    settings: &SimulationSettings,
) -> Result<SimulationReport> {
    let timestep = config.timestep;
    let mut table = init_with_config(layout, config).context("Failed to build table")?;

    if let Some(impulse) = settings.puck_impulse {
        let puck = table.puck();
        table.world_mut().apply_impulse(puck, impulse)?;
    }

    let mut input = InputContext::new();
    for key in &settings.keys {
        input.handle_event(&InputEvent::KeyPressed(*key));
        input.handle_event(&InputEvent::KeyReleased(*key));
    }

    let total = (settings.seconds / timestep).round().max(0.0) as u32;
    let mut steps = 0;
    while steps < total {
        if !apply_input(&mut table, &mut input, settings.shift_impulse)? {
            log::info!("Quit requested at step {}", steps);
            break;
        }
        table.step(timestep);
        steps += 1;

        if settings.report_every > 0 && steps % settings.report_every == 0 {
            let puck = table.world().translation(table.puck())?;
            log::info!("t={:.2}s puck={}", table.world().elapsed(), puck);
        }
    }

    Ok(SimulationReport {
        steps,
        elapsed: table.world().elapsed(),
        puck: body_state(&table, table.puck())?,
        paddle1: body_state(&table, table.paddle(Paddle::One))?,
        paddle2: body_state(&table, table.paddle(Paddle::Two))?,
    })
}

/// Drain pending input into the world. Returns `false` on quit.
fn apply_input(
    table: &mut AirHockeyTable,
    input: &mut InputContext,
    shift_impulse: f32,
) -> Result<bool> {
    let action = input.take_action();
    if action.contains(Action::QUIT) {
        return Ok(false);
    }
    if action.contains(Action::RESET) {
        table.reset();
    }
    if action.contains(Action::SERVE) {
        let puck = table.puck();
        table
            .world_mut()
            .apply_impulse(puck, Vec3::new(0.0, 0.0, shift_impulse))?;
    }
    if action.contains(Action::PAUSE) {
        log::debug!("Pause has no effect in a headless run");
    }

    for (player, paddle) in Player::ALL.into_iter().zip(Paddle::ALL) {
        let shift = input.take_shift(player);
        if shift.x == 0.0 && shift.y == 0.0 {
            continue;
        }
        let impulse = Vec3::new(shift.x, 0.0, shift.y) * shift_impulse;
        log::debug!("{:?} paddle impulse {}", player, impulse);
        let body = table.paddle(paddle);
        table.world_mut().apply_impulse(body, impulse)?;
    }
    Ok(true)
}

fn body_state(table: &AirHockeyTable, body: airhockey_physics::BodyHandle) -> Result<BodyState> {
    Ok(BodyState {
        position: table.world().translation(body)?,
        velocity: table.world().linear_velocity(body)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(keys: Vec<KeyCode>) -> SimulationSettings {
        SimulationSettings {
            seconds: 0.5,
            puck_impulse: None,
            keys,
            shift_impulse: 20.0,
            report_every: 0,
        }
    }

    #[test]
    fn test_cli_parse() {
        let cli = Cli::parse_from(["airhockey", "simulate"]);
        assert!(matches!(cli.command, Commands::Simulate { .. }));
    }

    #[test]
    fn test_simulate_command() {
        let cli = Cli::parse_from([
            "airhockey",
            "simulate",
            "-s",
            "2",
            "--puck-impulse",
            "1.5",
            "-3",
            "--keys",
            "d,d,left",
            "--yaw",
            "free",
            "--paddle-shape",
            "disc",
        ]);
        if let Commands::Simulate {
            seconds,
            puck_impulse,
            keys,
            yaw,
            paddle_shape,
            ..
        } = cli.command
        {
            assert_eq!(seconds, 2.0);
            assert_eq!(puck_impulse, Some(vec![1.5, -3.0]));
            assert_eq!(keys, vec![KeyCode::D, KeyCode::D, KeyCode::Left]);
            assert_eq!(yaw, YawMode::Free);
            assert_eq!(paddle_shape, PaddleShape::Disc);
        } else {
            panic!("Expected Simulate command");
        }
    }

    #[test]
    fn test_check_command() {
        let cli = Cli::parse_from(["airhockey", "check", "table.json"]);
        if let Commands::Check { table } = cli.command {
            assert_eq!(table, PathBuf::from("table.json"));
        } else {
            panic!("Expected Check command");
        }
    }

    #[test]
    fn test_default_layout() {
        let layout = load_layout(None).unwrap();
        assert_eq!(layout, TableLayout::standard());
        assert!(load_layout(Some(Path::new("/nonexistent/table.json"))).is_err());
    }

    #[test]
    fn test_keys_drive_paddles() {
        let layout = TableLayout::standard();
        let report = simulate(
            &layout,
            PhysicsConfig::default(),
            &settings(vec![KeyCode::D, KeyCode::D, KeyCode::Up]),
        )
        .unwrap();

        assert_eq!(report.steps, 30);
        assert!(report.paddle1.position.x > layout.paddle1_center.x);
        assert!(report.paddle2.position.z < layout.paddle2_center.z);
        assert!(report.paddle1.position.y.abs() < 1e-3);
    }

    #[test]
    fn test_quit_stops_early() {
        let report = simulate(
            &TableLayout::standard(),
            PhysicsConfig::default(),
            &settings(vec![KeyCode::Escape]),
        )
        .unwrap();
        assert_eq!(report.steps, 0);
    }

    #[test]
    fn test_bad_table_is_reported() {
        let mut layout = TableLayout::standard();
        layout.board_points.pop();
        assert!(simulate(&layout, PhysicsConfig::default(), &settings(Vec::new())).is_err());
    }
}
