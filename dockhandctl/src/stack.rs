//! Stack definition: which compose project the orchestrator manages and
//! which services within it must be running before the set counts as up.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_STACK_FILE: &str = "dockhand.yaml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackConfig {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: StackMetadata,
    pub stack: StackSpec,
    pub frontend: FrontendConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackMetadata {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackSpec {
    #[serde(rename = "projectName")]
    pub project_name: String,
    #[serde(rename = "composeFile")]
    pub compose_file: PathBuf,
    #[serde(rename = "backendService")]
    pub backend_service: String,
    #[serde(rename = "frontendService")]
    pub frontend_service: String,
    #[serde(rename = "frontendEnabled", default = "default_frontend_enabled")]
    pub frontend_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontendConfig {
    #[serde(rename = "envTemplate")]
    pub env_template: PathBuf,
    #[serde(rename = "envFile")]
    pub env_file: PathBuf,
}

fn default_frontend_enabled() -> bool {
    true
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            api_version: "dockhand/v1".to_string(),
            kind: "StackConfig".to_string(),
            metadata: StackMetadata {
                name: "workbench".to_string(),
            },
            stack: StackSpec {
                project_name: "workbench".to_string(),
                compose_file: PathBuf::from("docker-compose.yml"),
                backend_service: "backend".to_string(),
                frontend_service: "frontend".to_string(),
                frontend_enabled: true,
            },
            frontend: FrontendConfig {
                env_template: PathBuf::from("templates/frontend.env.template"),
                env_file: PathBuf::from("frontend/.env"),
            },
        }
    }
}

impl StackConfig {
    /// Services that must all be reported running for the set to count
    /// as up: the backend, plus the frontend when enabled.
    pub fn required_services(&self) -> Vec<String> {
        let mut services = vec![self.stack.backend_service.clone()];
        if self.stack.frontend_enabled {
            services.push(self.stack.frontend_service.clone());
        }
        services
    }
}

/// Load the stack definition. An explicit path must exist; otherwise
/// `dockhand.yaml` is used when present, else the built-in defaults.
pub fn load_stack_config(path: Option<&Path>) -> Result<StackConfig> {
    let config = match path {
        Some(explicit) => parse_stack_file(explicit)?,
        None => {
            let default_path = Path::new(DEFAULT_STACK_FILE);
            if default_path.exists() {
                parse_stack_file(default_path)?
            } else {
                debug!("No {} found, using built-in stack definition", DEFAULT_STACK_FILE);
                StackConfig::default()
            }
        }
    };

    validate_stack_config(&config)?;
    Ok(config)
}

fn parse_stack_file(path: &Path) -> Result<StackConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read stack file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse stack file: {}", path.display()))
}

pub fn validate_stack_config(config: &StackConfig) -> Result<()> {
    if config.kind != "StackConfig" {
        anyhow::bail!("Only kind 'StackConfig' is supported (got '{}')", config.kind);
    }

    if config.stack.project_name.is_empty() {
        anyhow::bail!("Stack project name cannot be empty");
    }

    if config.stack.backend_service.is_empty() {
        anyhow::bail!("Backend service name cannot be empty");
    }

    if config.stack.frontend_enabled {
        if config.stack.frontend_service.is_empty() {
            anyhow::bail!("Frontend service name cannot be empty when the frontend is enabled");
        }

        if config.stack.frontend_service == config.stack.backend_service {
            anyhow::bail!(
                "Backend and frontend cannot share the service name '{}'",
                config.stack.backend_service
            );
        }
    }

    if config.stack.compose_file.as_os_str().is_empty() {
        anyhow::bail!("Compose file path cannot be empty");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_stack_config_is_valid() {
        validate_stack_config(&StackConfig::default()).unwrap();
    }

    #[test]
    fn given_stack_file_when_load_then_fields_parsed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stack.yaml");
        fs::write(
            &path,
            r#"
apiVersion: dockhand/v1
kind: StackConfig
metadata:
  name: demo
stack:
  projectName: demo
  composeFile: compose/dev.yml
  backendService: api
  frontendService: web
frontend:
  envTemplate: templates/web.env.template
  envFile: web/.env
"#,
        )
        .unwrap();

        let config = load_stack_config(Some(path.as_path())).unwrap();

        assert_eq!(config.stack.project_name, "demo");
        assert_eq!(config.stack.compose_file, PathBuf::from("compose/dev.yml"));
        assert!(config.stack.frontend_enabled);
        assert_eq!(
            config.required_services(),
            vec!["api".to_string(), "web".to_string()]
        );
    }

    #[test]
    fn given_disabled_frontend_when_required_services_then_backend_only() {
        let mut config = StackConfig::default();
        config.stack.frontend_enabled = false;

        assert_eq!(config.required_services(), vec!["backend".to_string()]);
    }

    #[test]
    fn given_shared_service_name_when_validate_then_rejected() {
        let mut config = StackConfig::default();
        config.stack.frontend_service = config.stack.backend_service.clone();

        let err = validate_stack_config(&config).unwrap_err();
        assert!(err.to_string().contains("cannot share the service name"));
    }

    #[test]
    fn given_missing_explicit_file_when_load_then_error() {
        let err = load_stack_config(Some(Path::new("/does/not/exist.yaml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read stack file"));
    }

    #[test]
    fn given_wrong_kind_when_validate_then_rejected() {
        let mut config = StackConfig::default();
        config.kind = "Deployment".to_string();

        let err = validate_stack_config(&config).unwrap_err();
        assert!(err.to_string().contains("Only kind 'StackConfig'"));
    }
}
