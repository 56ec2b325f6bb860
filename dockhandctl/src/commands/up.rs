use anyhow::{Context, Result};
use clap::Args;
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::commands::RuntimeArgs;
use crate::compose::{ComposeRuntime, ServiceRuntime};
use crate::executor::SystemCommandExecutor;
use crate::orchestrator::{
    self, ReadinessOrchestrator, ReadinessOutcome, WaitPhase, SUPERVISION_POLL_INTERVAL,
};
use crate::probe::TcpProbe;
use crate::stack::{self, StackConfig};
use stack_config::{
    materialize_config_file, MaterializeOutcome, RuntimeConfiguration, LOOPBACK_HOST,
};

pub const EXIT_READY: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_CONTAINER_STATE_TIMEOUT: i32 = 2;
pub const EXIT_NETWORK_PROBE_TIMEOUT: i32 = 3;
pub const EXIT_INTERRUPTED: i32 = 130;

#[derive(Args, Debug)]
pub struct UpArgs {
    #[command(flatten)]
    pub runtime: RuntimeArgs,

    /// Stack definition file (default: dockhand.yaml when present)
    #[arg(long, value_name = "FILE")]
    pub stack_file: Option<PathBuf>,

    /// Stay attached after readiness and exit when the set stops running
    #[arg(long)]
    pub watch: bool,
}

pub async fn run(args: UpArgs) -> Result<i32> {
    let stack = stack::load_stack_config(args.stack_file.as_deref())?;
    let config = args.runtime.resolve()?;

    if stack.stack.frontend_enabled {
        match materialize_config_file(
            &stack.frontend.env_template,
            &stack.frontend.env_file,
            &config,
        )? {
            MaterializeOutcome::Created => {
                info!("Materialized {}", stack.frontend.env_file.display())
            }
            MaterializeOutcome::AlreadyPresent => {}
        }
    }

    let runtime = ComposeRuntime::new(
        &stack,
        config.compose_environment(),
        Arc::new(SystemCommandExecutor),
    );
    let probe = TcpProbe::new(LOOPBACK_HOST, config.backend_port);

    let orchestration_runtime = runtime.clone();
    let orchestration = tokio::task::spawn_blocking(move || {
        ReadinessOrchestrator::new(orchestration_runtime, probe).run()
    });

    let outcome = tokio::select! {
        joined = orchestration => joined.context("Orchestration task failed")??,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupt received, tearing down the service set");
            teardown_best_effort(&runtime);
            return Ok(EXIT_INTERRUPTED);
        }
    };

    match outcome {
        ReadinessOutcome::Ready => print_ready_summary(&stack, &config),
        ReadinessOutcome::TimedOut(WaitPhase::ContainerState) => {
            return Ok(EXIT_CONTAINER_STATE_TIMEOUT)
        }
        ReadinessOutcome::TimedOut(WaitPhase::NetworkProbe) => {
            return Ok(EXIT_NETWORK_PROBE_TIMEOUT)
        }
    }

    if args.watch {
        info!(
            "Watching the service set (poll every {})",
            humantime::format_duration(SUPERVISION_POLL_INTERVAL)
        );

        let watch_runtime = runtime.clone();
        let supervision = tokio::task::spawn_blocking(move || {
            orchestrator::supervise(&watch_runtime, SUPERVISION_POLL_INTERVAL)
        });

        tokio::select! {
            joined = supervision => {
                joined.context("Supervision task failed")?;
                return Ok(EXIT_FAILURE);
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupt received, tearing down the service set");
                teardown_best_effort(&runtime);
                return Ok(EXIT_INTERRUPTED);
            }
        }
    }

    Ok(EXIT_READY)
}

fn teardown_best_effort(runtime: &ComposeRuntime) {
    if let Err(err) = runtime.tear_down() {
        warn!("Teardown failed: {:#}", err);
    }
}

fn print_ready_summary(stack: &StackConfig, config: &RuntimeConfiguration) {
    println!();
    println!(
        "{} service set '{}' is ready",
        "✓".green().bold(),
        stack.stack.project_name
    );
    println!("  backend    {}", config.backend_url().cyan());
    if stack.stack.frontend_enabled {
        println!("  frontend   {}", config.frontend_url().cyan());
    }
    println!("  workspace  {}", config.workspace_base.display());
}
