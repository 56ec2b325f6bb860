use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub mod materialize;
pub use materialize::{materialize_config_file, MaterializeOutcome};

pub const DEFAULT_BACKEND_HOST: &str = "0.0.0.0";
pub const DEFAULT_BACKEND_PORT: u16 = 3000;
pub const DEFAULT_FRONTEND_HOST: &str = "0.0.0.0";
pub const DEFAULT_FRONTEND_PORT: u16 = 3001;
pub const DEFAULT_WORKSPACE_BASE: &str = "./workspace";
pub const DEFAULT_SANDBOX_USER_ID: u32 = 1000;

/// Host used when dialing or displaying services from the host machine.
/// The bind hosts above are what the services listen on inside their
/// containers and must never leak into host-facing endpoints.
pub const LOOPBACK_HOST: &str = "localhost";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{name} port must be in 1-65535 (got {value})")]
    InvalidPort { name: &'static str, value: u16 },

    #[error("Backend and frontend ports must differ (both set to {port})")]
    PortCollision { port: u16 },

    #[error("{name} host cannot be empty")]
    EmptyHost { name: &'static str },

    #[error("Workspace base path cannot be empty")]
    EmptyWorkspaceBase,

    #[error("CORS origin entries cannot be empty")]
    EmptyCorsOrigin,

    #[error("Template file not found: {path}")]
    TemplateNotFound { path: String },

    #[error("Unresolved placeholder '{{{{ .{name} }}}}' in template {path}")]
    UnresolvedPlaceholder { name: String, path: String },

    #[error("IO error: {message}")]
    IoError { message: String },
}

/// Resolved, immutable runtime configuration for the service set.
///
/// Constructed once at startup from defaults and explicit environment
/// overrides, then passed by reference; nothing reads ambient process
/// state after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfiguration {
    pub backend_host: String,
    pub backend_port: u16,
    pub frontend_host: String,
    pub frontend_port: u16,
    pub debug: bool,
    pub permitted_cors_origins: Vec<String>,
    pub workspace_base: PathBuf,
    pub sandbox_user_id: u32,
}

impl Default for RuntimeConfiguration {
    fn default() -> Self {
        Self {
            backend_host: DEFAULT_BACKEND_HOST.to_string(),
            backend_port: DEFAULT_BACKEND_PORT,
            frontend_host: DEFAULT_FRONTEND_HOST.to_string(),
            frontend_port: DEFAULT_FRONTEND_PORT,
            debug: false,
            permitted_cors_origins: default_cors_origins(DEFAULT_FRONTEND_PORT),
            workspace_base: PathBuf::from(DEFAULT_WORKSPACE_BASE),
            sandbox_user_id: DEFAULT_SANDBOX_USER_ID,
        }
    }
}

impl RuntimeConfiguration {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend_port == 0 {
            return Err(ConfigError::InvalidPort {
                name: "backend",
                value: self.backend_port,
            });
        }

        if self.frontend_port == 0 {
            return Err(ConfigError::InvalidPort {
                name: "frontend",
                value: self.frontend_port,
            });
        }

        if self.backend_port == self.frontend_port {
            return Err(ConfigError::PortCollision {
                port: self.backend_port,
            });
        }

        if self.backend_host.trim().is_empty() {
            return Err(ConfigError::EmptyHost { name: "backend" });
        }

        if self.frontend_host.trim().is_empty() {
            return Err(ConfigError::EmptyHost { name: "frontend" });
        }

        if self.workspace_base.as_os_str().is_empty() {
            return Err(ConfigError::EmptyWorkspaceBase);
        }

        if self
            .permitted_cors_origins
            .iter()
            .any(|origin| origin.trim().is_empty())
        {
            return Err(ConfigError::EmptyCorsOrigin);
        }

        Ok(())
    }

    /// Host-facing endpoint of the backend, e.g. `localhost:3000`.
    pub fn backend_endpoint(&self) -> String {
        format!("{}:{}", LOOPBACK_HOST, self.backend_port)
    }

    pub fn frontend_endpoint(&self) -> String {
        format!("{}:{}", LOOPBACK_HOST, self.frontend_port)
    }

    pub fn backend_url(&self) -> String {
        format!("http://{}", self.backend_endpoint())
    }

    pub fn frontend_url(&self) -> String {
        format!("http://{}", self.frontend_endpoint())
    }

    /// Environment injected into the container runtime at bring-up.
    ///
    /// These carry the bind hosts: the services themselves must listen on
    /// all interfaces so the published ports are reachable from the host.
    pub fn compose_environment(&self) -> Vec<(String, String)> {
        vec![
            ("BACKEND_HOST".to_string(), self.backend_host.clone()),
            ("BACKEND_PORT".to_string(), self.backend_port.to_string()),
            ("FRONTEND_HOST".to_string(), self.frontend_host.clone()),
            ("FRONTEND_PORT".to_string(), self.frontend_port.to_string()),
            ("DEBUG".to_string(), self.debug.to_string()),
            (
                "PERMITTED_CORS_ORIGINS".to_string(),
                self.permitted_cors_origins.join(","),
            ),
            (
                "WORKSPACE_BASE".to_string(),
                self.workspace_base.display().to_string(),
            ),
            (
                "SANDBOX_USER_ID".to_string(),
                self.sandbox_user_id.to_string(),
            ),
        ]
    }
}

/// Origins allowed to reach the backend when no explicit list is given:
/// the frontend dev server as reached from the host.
pub fn default_cors_origins(frontend_port: u16) -> Vec<String> {
    vec![format!("http://{}:{}", LOOPBACK_HOST, frontend_port)]
}

/// Parse a comma-separated origin list, dropping empty segments.
pub fn parse_cors_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_configuration_is_valid() {
        let config = RuntimeConfiguration::default();
        config.validate().unwrap();
    }

    #[test]
    fn given_zero_backend_port_when_validate_then_invalid_port() {
        let config = RuntimeConfiguration {
            backend_port: 0,
            ..Default::default()
        };

        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidPort {
                name: "backend",
                value: 0
            }
        ));
    }

    #[test]
    fn given_colliding_ports_when_validate_then_port_collision() {
        let config = RuntimeConfiguration {
            backend_port: 3000,
            frontend_port: 3000,
            ..Default::default()
        };

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::PortCollision { port: 3000 }));
    }

    #[test]
    fn given_empty_cors_entry_when_validate_then_rejected() {
        let config = RuntimeConfiguration {
            permitted_cors_origins: vec!["http://localhost:3001".to_string(), "  ".to_string()],
            ..Default::default()
        };

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::EmptyCorsOrigin));
    }

    #[test]
    fn endpoints_use_loopback_host_not_bind_host() {
        let config = RuntimeConfiguration {
            backend_host: "0.0.0.0".to_string(),
            backend_port: 3000,
            ..Default::default()
        };

        assert_eq!(config.backend_endpoint(), "localhost:3000");
        assert_eq!(config.backend_url(), "http://localhost:3000");
        assert!(!config.backend_url().contains("0.0.0.0"));
    }

    #[test]
    fn compose_environment_carries_every_key() {
        let config = RuntimeConfiguration {
            debug: true,
            permitted_cors_origins: vec![
                "http://localhost:3001".to_string(),
                "http://127.0.0.1:3001".to_string(),
            ],
            ..Default::default()
        };

        let env = config.compose_environment();
        let lookup = |key: &str| {
            env.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .unwrap()
        };

        assert_eq!(lookup("BACKEND_HOST"), "0.0.0.0");
        assert_eq!(lookup("BACKEND_PORT"), "3000");
        assert_eq!(lookup("FRONTEND_PORT"), "3001");
        assert_eq!(lookup("DEBUG"), "true");
        assert_eq!(
            lookup("PERMITTED_CORS_ORIGINS"),
            "http://localhost:3001,http://127.0.0.1:3001"
        );
        assert_eq!(lookup("WORKSPACE_BASE"), "./workspace");
        assert_eq!(lookup("SANDBOX_USER_ID"), "1000");
    }

    #[test]
    fn parse_cors_origins_drops_empty_segments() {
        let origins = parse_cors_origins("http://a.example, ,http://b.example,");
        assert_eq!(
            origins,
            vec!["http://a.example".to_string(), "http://b.example".to_string()]
        );
    }
}
