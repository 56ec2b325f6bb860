use anyhow::{Context, Result};
use std::process::{Command, Stdio};

/// Seam between orchestration logic and the host system. Everything that
/// shells out goes through this trait so tests can script responses
/// instead of invoking a real container runtime.
pub trait CommandExecutor {
    fn execute(
        &self,
        program: &str,
        args: &[&str],
        envs: &[(String, String)],
    ) -> Result<CommandOutput>;
}

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn execute(
        &self,
        program: &str,
        args: &[&str],
        envs: &[(String, String)],
    ) -> Result<CommandOutput> {
        let output = Command::new(program)
            .args(args)
            .envs(envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .with_context(|| format!("Failed to execute command: {} {:?}", program, args))?;

        Ok(CommandOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Deterministic command executor used in tests where shelling out is
/// undesirable. Replays queued outputs in order and falls back to a fixed
/// output once the queue is drained; every invocation is recorded.
#[cfg(test)]
pub struct ScriptedCommandExecutor {
    queue: std::sync::Mutex<std::collections::VecDeque<CommandOutput>>,
    fallback: CommandOutput,
    calls: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl ScriptedCommandExecutor {
    pub fn new() -> Self {
        Self {
            queue: std::sync::Mutex::new(std::collections::VecDeque::new()),
            fallback: CommandOutput {
                status: 0,
                stdout: String::new(),
                stderr: String::new(),
            },
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn enqueue_success(self, stdout: impl Into<String>) -> Self {
        self.queue.lock().unwrap().push_back(CommandOutput {
            status: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        });
        self
    }

    pub fn enqueue_failure(self, stderr: impl Into<String>) -> Self {
        self.queue.lock().unwrap().push_back(CommandOutput {
            status: 1,
            stdout: String::new(),
            stderr: stderr.into(),
        });
        self
    }

    pub fn recorded_commands(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl CommandExecutor for ScriptedCommandExecutor {
    fn execute(
        &self,
        program: &str,
        args: &[&str],
        _envs: &[(String, String)],
    ) -> Result<CommandOutput> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{} {}", program, args.join(" ")));

        let next = self.queue.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| self.fallback.clone()))
    }
}
