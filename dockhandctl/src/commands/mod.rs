pub mod down;
pub mod show_config;
pub mod up;

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use stack_config::{
    default_cors_origins, parse_cors_origins, RuntimeConfiguration, DEFAULT_BACKEND_HOST,
    DEFAULT_BACKEND_PORT, DEFAULT_FRONTEND_HOST, DEFAULT_FRONTEND_PORT, DEFAULT_SANDBOX_USER_ID,
    DEFAULT_WORKSPACE_BASE,
};

/// Runtime settings shared by the subcommands. Every key has a default
/// and an environment override; explicit flags win over the environment.
#[derive(Args, Debug, Clone)]
pub struct RuntimeArgs {
    /// Host the backend binds inside its container
    #[arg(long, env = "BACKEND_HOST", default_value = DEFAULT_BACKEND_HOST)]
    pub backend_host: String,

    /// Port the backend publishes to the host
    #[arg(long, env = "BACKEND_PORT", default_value_t = DEFAULT_BACKEND_PORT)]
    pub backend_port: u16,

    /// Host the frontend binds inside its container
    #[arg(long, env = "FRONTEND_HOST", default_value = DEFAULT_FRONTEND_HOST)]
    pub frontend_host: String,

    /// Port the frontend publishes to the host
    #[arg(long, env = "FRONTEND_PORT", default_value_t = DEFAULT_FRONTEND_PORT)]
    pub frontend_port: u16,

    /// Enable debug output in the managed services
    #[arg(long, env = "DEBUG", value_parser = clap::builder::FalseyValueParser::new())]
    pub debug: bool,

    /// Comma-separated CORS origin allowlist (default: the frontend URL)
    #[arg(long, env = "PERMITTED_CORS_ORIGINS", value_name = "ORIGINS")]
    pub permitted_cors_origins: Option<String>,

    /// Workspace directory mounted into the backend
    #[arg(long, env = "WORKSPACE_BASE", default_value = DEFAULT_WORKSPACE_BASE)]
    pub workspace_base: PathBuf,

    /// Numeric user id the backend sandbox runs as
    #[arg(long, env = "SANDBOX_USER_ID", default_value_t = DEFAULT_SANDBOX_USER_ID)]
    pub sandbox_user_id: u32,
}

impl RuntimeArgs {
    /// Resolve into the immutable configuration used for the rest of the
    /// run; nothing reads the process environment after this point.
    pub fn resolve(&self) -> Result<RuntimeConfiguration> {
        let permitted_cors_origins = match &self.permitted_cors_origins {
            Some(raw) => parse_cors_origins(raw),
            None => default_cors_origins(self.frontend_port),
        };

        let config = RuntimeConfiguration {
            backend_host: self.backend_host.clone(),
            backend_port: self.backend_port,
            frontend_host: self.frontend_host.clone(),
            frontend_port: self.frontend_port,
            debug: self.debug,
            permitted_cors_origins,
            workspace_base: self.workspace_base.clone(),
            sandbox_user_id: self.sandbox_user_id,
        };

        config.validate().context("Invalid runtime configuration")?;
        Ok(config)
    }
}
