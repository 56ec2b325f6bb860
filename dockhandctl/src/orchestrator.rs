//! Brings the service set to an observably ready state, or fails within
//! a bounded time with the service-set logs attached.
//!
//! Readiness is two signals in sequence: the container runtime reporting
//! every required service running, then the backend's published port
//! accepting a TCP connection. The runtime can schedule and report a
//! process running before its listening socket is bound, so neither
//! signal alone is sufficient.

use anyhow::{Context, Result};
use humantime::format_duration;
use std::fmt;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::compose::ServiceRuntime;
use crate::probe::NetworkProbe;
use crate::retry::{retry_until, RetryOutcome};

pub const CONTAINER_STATE_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const CONTAINER_STATE_CEILING: Duration = Duration::from_secs(60);
pub const NETWORK_PROBE_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const NETWORK_PROBE_CEILING: Duration = Duration::from_secs(30);
pub const SUPERVISION_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPhase {
    ContainerState,
    NetworkProbe,
}

impl fmt::Display for WaitPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitPhase::ContainerState => write!(f, "container-state"),
            WaitPhase::NetworkProbe => write!(f, "network-probe"),
        }
    }
}

/// Outcome of one orchestration run. Bring-up failures are reported as
/// errors instead: they are fatal before any wait phase starts.
#[derive(Debug, PartialEq, Eq)]
pub enum ReadinessOutcome {
    Ready,
    TimedOut(WaitPhase),
}

pub struct ReadinessOrchestrator<R, P> {
    runtime: R,
    probe: P,
    container_interval: Duration,
    container_ceiling: Duration,
    probe_interval: Duration,
    probe_ceiling: Duration,
}

impl<R: ServiceRuntime, P: NetworkProbe> ReadinessOrchestrator<R, P> {
    pub fn new(runtime: R, probe: P) -> Self {
        Self {
            runtime,
            probe,
            container_interval: CONTAINER_STATE_POLL_INTERVAL,
            container_ceiling: CONTAINER_STATE_CEILING,
            probe_interval: NETWORK_PROBE_POLL_INTERVAL,
            probe_ceiling: NETWORK_PROBE_CEILING,
        }
    }

    #[cfg(test)]
    fn with_budgets(
        runtime: R,
        probe: P,
        container: (Duration, Duration),
        network: (Duration, Duration),
    ) -> Self {
        Self {
            runtime,
            probe,
            container_interval: container.0,
            container_ceiling: container.1,
            probe_interval: network.0,
            probe_ceiling: network.1,
        }
    }

    /// Tear down any prior instance, bring the set up, then wait through
    /// both readiness phases. Strictly sequential; no state is carried
    /// between invocations.
    pub fn run(&self) -> Result<ReadinessOutcome> {
        // Idempotent pre-run cleanup; a missing prior instance is
        // expected and harmless.
        if let Err(err) = self.runtime.tear_down() {
            warn!("Pre-run teardown failed (continuing): {:#}", err);
        }

        info!("Bringing up the service set");
        self.runtime
            .bring_up()
            .context("Service set bring-up failed")?;

        info!(
            "Waiting up to {} for the service set to report running",
            format_duration(self.container_ceiling)
        );
        match retry_until(self.container_interval, self.container_ceiling, || {
            self.runtime.is_running()
        }) {
            RetryOutcome::Satisfied { attempts } => {
                info!("Service set reported running after {} poll(s)", attempts)
            }
            RetryOutcome::TimedOut {
                attempts,
                last_error,
            } => {
                self.report_timeout(WaitPhase::ContainerState, attempts, last_error);
                return Ok(ReadinessOutcome::TimedOut(WaitPhase::ContainerState));
            }
        }

        info!(
            "Waiting up to {} for the backend port to accept connections",
            format_duration(self.probe_ceiling)
        );
        match retry_until(self.probe_interval, self.probe_ceiling, || {
            Ok(self.probe.is_open())
        }) {
            RetryOutcome::Satisfied { attempts } => {
                info!("Backend port accepted a connection after {} probe(s)", attempts)
            }
            RetryOutcome::TimedOut {
                attempts,
                last_error,
            } => {
                self.report_timeout(WaitPhase::NetworkProbe, attempts, last_error);
                return Ok(ReadinessOutcome::TimedOut(WaitPhase::NetworkProbe));
            }
        }

        Ok(ReadinessOutcome::Ready)
    }

    fn report_timeout(&self, phase: WaitPhase, attempts: u32, last_error: Option<anyhow::Error>) {
        let ceiling = match phase {
            WaitPhase::ContainerState => self.container_ceiling,
            WaitPhase::NetworkProbe => self.probe_ceiling,
        };

        error!(
            "{} wait exhausted its {} budget after {} poll(s)",
            phase,
            format_duration(ceiling),
            attempts
        );
        if let Some(err) = last_error {
            warn!("Last poll error: {:#}", err);
        }

        emit_logs(&self.runtime);
    }
}

/// Surface the service-set logs so a timeout can be diagnosed without
/// re-running at higher verbosity.
fn emit_logs<R: ServiceRuntime>(runtime: &R) {
    match runtime.logs() {
        Ok(logs) if !logs.trim().is_empty() => {
            eprintln!("--- service set logs (tail) ---");
            eprintln!("{}", logs.trim_end());
        }
        Ok(_) => warn!("Service set produced no log output"),
        Err(err) => warn!("Failed to fetch service set logs: {:#}", err),
    }
}

/// Passive post-ready watch. Returns once the service set is no longer
/// reported running; poll errors are logged and tolerated.
pub fn supervise<R: ServiceRuntime>(runtime: &R, interval: Duration) {
    loop {
        std::thread::sleep(interval);

        match runtime.is_running() {
            Ok(true) => {}
            Ok(false) => {
                error!("Service set stopped running");
                emit_logs(runtime);
                return;
            }
            Err(err) => warn!("Supervision poll failed (continuing): {:#}", err),
        }
    }
}
