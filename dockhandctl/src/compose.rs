//! Container-runtime adapter: drives `docker compose` for one named
//! service set and reports its observable state.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::executor::CommandExecutor;
use crate::stack::StackConfig;

const LOG_TAIL_LINES: &str = "100";

/// Narrow interface the orchestrator needs from the container runtime.
pub trait ServiceRuntime: Send + Sync {
    /// Build-if-needed and start the service set, detached.
    fn bring_up(&self) -> Result<()>;
    /// Stop and remove the service set. Expected to be idempotent.
    fn tear_down(&self) -> Result<()>;
    /// Whether every required service is reported running.
    fn is_running(&self) -> Result<bool>;
    /// Recent log output of the whole service set.
    fn logs(&self) -> Result<String>;
}

#[derive(Clone)]
pub struct ComposeRuntime {
    executor: Arc<dyn CommandExecutor + Send + Sync>,
    compose_file: PathBuf,
    project_name: String,
    required_services: Vec<String>,
    environment: Vec<(String, String)>,
}

#[derive(Debug, Deserialize)]
struct ComposePsEntry {
    #[serde(rename = "Service")]
    service: String,
    #[serde(rename = "State")]
    state: String,
}

impl ComposeRuntime {
    pub fn new(
        stack: &StackConfig,
        environment: Vec<(String, String)>,
        executor: Arc<dyn CommandExecutor + Send + Sync>,
    ) -> Self {
        Self {
            executor,
            compose_file: stack.stack.compose_file.clone(),
            project_name: stack.stack.project_name.clone(),
            required_services: stack.required_services(),
            environment,
        }
    }

    fn compose_args(&self, subcommand: &[&str]) -> Vec<String> {
        let mut args = vec![
            "compose".to_string(),
            "-f".to_string(),
            self.compose_file.display().to_string(),
            "-p".to_string(),
            self.project_name.clone(),
        ];
        args.extend(subcommand.iter().map(|s| s.to_string()));
        args
    }

    fn run_compose(&self, subcommand: &[&str]) -> Result<crate::executor::CommandOutput> {
        let args = self.compose_args(subcommand);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.executor.execute("docker", &arg_refs, &self.environment)
    }
}

impl ServiceRuntime for ComposeRuntime {
    fn bring_up(&self) -> Result<()> {
        let output = self
            .run_compose(&["up", "--build", "-d"])
            .context("Failed to invoke docker compose up")?;

        if !output.success() {
            anyhow::bail!(
                "docker compose up failed with exit code {}:\n{}",
                output.status,
                output.stderr.trim()
            );
        }

        Ok(())
    }

    fn tear_down(&self) -> Result<()> {
        let output = self
            .run_compose(&["down", "--remove-orphans"])
            .context("Failed to invoke docker compose down")?;

        if !output.success() {
            anyhow::bail!(
                "docker compose down failed with exit code {}:\n{}",
                output.status,
                output.stderr.trim()
            );
        }

        Ok(())
    }

    fn is_running(&self) -> Result<bool> {
        let output = self
            .run_compose(&["ps", "--format", "json"])
            .context("Failed to invoke docker compose ps")?;

        if !output.success() {
            anyhow::bail!(
                "docker compose ps failed with exit code {}:\n{}",
                output.status,
                output.stderr.trim()
            );
        }

        let entries = parse_ps_output(&output.stdout)?;

        let pending: Vec<&String> = self
            .required_services
            .iter()
            .filter(|required| {
                !entries
                    .iter()
                    .any(|entry| entry.service == **required && entry.state == "running")
            })
            .collect();

        if pending.is_empty() {
            Ok(true)
        } else {
            debug!("Services not yet running: {:?}", pending);
            Ok(false)
        }
    }

    fn logs(&self) -> Result<String> {
        let output = self
            .run_compose(&["logs", "--no-color", "--tail", LOG_TAIL_LINES])
            .context("Failed to invoke docker compose logs")?;

        // Compose interleaves service logs on stdout; stderr carries its
        // own diagnostics, worth surfacing alongside.
        let mut combined = output.stdout;
        if !output.stderr.trim().is_empty() {
            combined.push_str(&output.stderr);
        }
        Ok(combined)
    }
}

/// `docker compose ps --format json` emits one JSON object per line on
/// recent releases and a single JSON array on older ones.
fn parse_ps_output(stdout: &str) -> Result<Vec<ComposePsEntry>> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).context("Failed to parse docker compose ps output");
    }

    trimmed
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str(line)
                .with_context(|| format!("Failed to parse docker compose ps line: {}", line))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ScriptedCommandExecutor;
    use crate::stack::StackConfig;

    fn runtime_with(executor: Arc<ScriptedCommandExecutor>) -> ComposeRuntime {
        ComposeRuntime::new(
            &StackConfig::default(),
            vec![("BACKEND_PORT".to_string(), "3000".to_string())],
            executor,
        )
    }

    #[test]
    fn parse_ps_output_accepts_json_lines() {
        let stdout = concat!(
            "{\"Service\":\"backend\",\"State\":\"running\"}\n",
            "{\"Service\":\"frontend\",\"State\":\"starting\"}\n",
        );

        let entries = parse_ps_output(stdout).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].service, "backend");
        assert_eq!(entries[1].state, "starting");
    }

    #[test]
    fn parse_ps_output_accepts_json_array() {
        let stdout = r#"[{"Service":"backend","State":"running"}]"#;

        let entries = parse_ps_output(stdout).unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].service, "backend");
    }

    #[test]
    fn parse_ps_output_of_empty_stdout_is_empty() {
        assert!(parse_ps_output("\n").unwrap().is_empty());
    }

    #[test]
    fn given_all_required_services_running_when_is_running_then_true() {
        let executor = Arc::new(ScriptedCommandExecutor::new().enqueue_success(concat!(
            "{\"Service\":\"backend\",\"State\":\"running\"}\n",
            "{\"Service\":\"frontend\",\"State\":\"running\"}\n",
        )));
        let runtime = runtime_with(executor);

        assert!(runtime.is_running().unwrap());
    }

    #[test]
    fn given_frontend_still_starting_when_is_running_then_false() {
        let executor = Arc::new(ScriptedCommandExecutor::new().enqueue_success(concat!(
            "{\"Service\":\"backend\",\"State\":\"running\"}\n",
            "{\"Service\":\"frontend\",\"State\":\"restarting\"}\n",
        )));
        let runtime = runtime_with(executor);

        assert!(!runtime.is_running().unwrap());
    }

    #[test]
    fn given_no_containers_yet_when_is_running_then_false() {
        let executor = Arc::new(ScriptedCommandExecutor::new().enqueue_success(""));
        let runtime = runtime_with(executor);

        assert!(!runtime.is_running().unwrap());
    }

    #[test]
    fn given_compose_up_failure_when_bring_up_then_stderr_surfaces() {
        let executor =
            Arc::new(ScriptedCommandExecutor::new().enqueue_failure("no such image: backend"));
        let runtime = runtime_with(executor);

        let err = runtime.bring_up().unwrap_err();
        assert!(err.to_string().contains("no such image: backend"));
    }

    #[test]
    fn compose_invocations_carry_file_and_project() {
        let executor = Arc::new(ScriptedCommandExecutor::new());
        let runtime = runtime_with(executor.clone());

        runtime.bring_up().unwrap();
        runtime.tear_down().unwrap();

        let calls = executor.recorded_commands();
        assert_eq!(
            calls[0],
            "docker compose -f docker-compose.yml -p workbench up --build -d"
        );
        assert_eq!(
            calls[1],
            "docker compose -f docker-compose.yml -p workbench down --remove-orphans"
        );
    }
}
