use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::compose::{ComposeRuntime, ServiceRuntime};
use crate::executor::SystemCommandExecutor;
use crate::stack;

#[derive(Args, Debug)]
pub struct DownArgs {
    /// Stack definition file (default: dockhand.yaml when present)
    #[arg(long, value_name = "FILE")]
    pub stack_file: Option<PathBuf>,
}

/// Unconditional teardown. Always exits 0: tearing down a service set
/// that is not running is expected and harmless.
pub fn run(args: DownArgs) -> i32 {
    match tear_down(args) {
        Ok(project_name) => info!("Service set '{}' torn down", project_name),
        Err(err) => warn!("Teardown failed (ignored): {:#}", err),
    }
    0
}

fn tear_down(args: DownArgs) -> Result<String> {
    let stack = stack::load_stack_config(args.stack_file.as_deref())?;
    let runtime = ComposeRuntime::new(&stack, Vec::new(), Arc::new(SystemCommandExecutor));
    runtime.tear_down()?;
    Ok(stack.stack.project_name)
}
