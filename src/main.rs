//! CLI Entry Point for dark-hole
//!
//! Provides command-line access to the controller without the external control
//! framework:
//! - Replaying a command script through the control actor
//! - Validating a configuration file
//!
//! # Usage
//!
//! Replay a script and save the final state:
//! ```bash
//! dark-hole run session.dhc --snapshot out/session.json
//! ```
//!
//! Resume from a saved state:
//! ```bash
//! dark-hole run more.dhc --resume out/session.json
//! ```
//!
//! Check configuration:
//! ```bash
//! dark-hole --config config/dark_hole.toml check-config
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dark_hole_control::config::{DarkHoleConfig, DEFAULT_CONFIG_PATH};
use dark_hole_control::control_actor;
use dark_hole_control::controller::DarkHoleController;
use dark_hole_control::script::{load_script, ScriptStep};
use dark_hole_control::snapshot::SessionSnapshot;
use dark_hole_control::tracing_setup::{self, OutputFormat, TracingConfig};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "dark-hole")]
#[command(about = "Dark hole control loop session manager", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log output format (pretty, compact, json)
    #[arg(long, global = true, default_value = "pretty")]
    log_format: String,

    /// Log span creation and close events
    #[arg(long, global = true)]
    log_span_events: bool,

    /// Disable ANSI colors in pretty output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a command script through the controller
    Run {
        /// Path to the script file
        script: PathBuf,

        /// Write the final controller state here
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Start from a previously saved state instead of a fresh session
        #[arg(long)]
        resume: Option<PathBuf>,
    },

    /// Load and validate the configuration, then print it
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = DarkHoleConfig::load_from(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    config.validate()?;

    let format: OutputFormat = cli.log_format.parse()?;
    tracing_setup::init(
        TracingConfig::from_config(&config)?
            .with_format(format)
            .with_span_events(cli.log_span_events)
            .with_ansi(!cli.no_color),
    )?;

    match cli.command {
        Commands::Run {
            script,
            snapshot,
            resume,
        } => run_script(&config, script, snapshot, resume).await,
        Commands::CheckConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            println!("Configuration OK");
            Ok(())
        }
    }
}

async fn run_script(
    config: &DarkHoleConfig,
    script_path: PathBuf,
    snapshot_path: Option<PathBuf>,
    resume_path: Option<PathBuf>,
) -> Result<()> {
    let steps = load_script(&script_path)
        .with_context(|| format!("Failed to load script {}", script_path.display()))?;
    info!(
        script = %script_path.display(),
        steps = steps.len(),
        application = %config.application.name,
        "Replaying script"
    );

    let mut controller = DarkHoleController::from_config(config);
    if let Some(path) = resume_path {
        controller
            .restore(SessionSnapshot::load(&path)?)
            .with_context(|| format!("Cannot resume from {}", path.display()))?;
    }

    let (handle, task) = control_actor::spawn(controller, config.control.command_queue_capacity);

    for step in steps {
        match step {
            ScriptStep::Command(command) => {
                let line = command.to_string();
                match handle.send(command).await {
                    Ok(ack) => println!("{line} -> {ack}"),
                    Err(e) if e.can_recover() => println!("{line} -> ERROR: {e}"),
                    Err(e) => {
                        handle.shutdown().await.ok();
                        bail!("{line} failed: {e}");
                    }
                }
            }
            ScriptStep::Frame(frame) => {
                let frame_number = frame.frame_number;
                match handle.deliver_frame(frame).await {
                    Ok(()) => {}
                    Err(e) if e.can_recover() => println!("FRAME {frame_number} -> ERROR: {e}"),
                    Err(e) => bail!("FRAME {frame_number} failed: {e}"),
                }
            }
        }
    }

    handle.shutdown().await?;
    let controller = task.await.context("Control actor task failed")?;
    println!("{}", controller.status_report());

    if let Some(path) = snapshot_path {
        controller.snapshot().save(&path)?;
        println!("Snapshot written to {}", path.display());
    }

    Ok(())
}
