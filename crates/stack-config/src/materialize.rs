//! First-run materialization of the frontend's effective env file.
//!
//! The effective file is produced by copying a named template and
//! substituting `{{ .key }}` placeholders with literal values from the
//! resolved [`RuntimeConfiguration`]. An existing effective file is left
//! untouched; it persists across runs until manually removed.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::{ConfigError, RuntimeConfiguration};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterializeOutcome {
    Created,
    AlreadyPresent,
}

pub fn materialize_config_file(
    template_path: &Path,
    output_path: &Path,
    config: &RuntimeConfiguration,
) -> Result<MaterializeOutcome, ConfigError> {
    if output_path.exists() {
        debug!(
            "Effective config file {} already present, leaving untouched",
            output_path.display()
        );
        return Ok(MaterializeOutcome::AlreadyPresent);
    }

    if !template_path.exists() {
        return Err(ConfigError::TemplateNotFound {
            path: template_path.display().to_string(),
        });
    }

    let template = fs::read_to_string(template_path).map_err(|e| ConfigError::IoError {
        message: format!(
            "Failed to read template {}: {}",
            template_path.display(),
            e
        ),
    })?;

    let rendered = substitute_placeholders(&template, &template_context(config), template_path)?;

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::IoError {
                message: format!("Failed to create {}: {}", parent.display(), e),
            })?;
        }
    }

    fs::write(output_path, rendered).map_err(|e| ConfigError::IoError {
        message: format!("Failed to write {}: {}", output_path.display(), e),
    })?;

    info!(
        "Materialized {} from {}",
        output_path.display(),
        template_path.display()
    );

    Ok(MaterializeOutcome::Created)
}

/// Placeholder values exposed to templates. Host-facing keys resolve to
/// the loopback endpoint, never the bind host.
fn template_context(config: &RuntimeConfiguration) -> HashMap<String, String> {
    let mut context = HashMap::new();

    context.insert("backendHost".to_string(), config.backend_endpoint());
    context.insert("backendUrl".to_string(), config.backend_url());
    context.insert("backendPort".to_string(), config.backend_port.to_string());
    context.insert("frontendHost".to_string(), config.frontend_endpoint());
    context.insert("frontendUrl".to_string(), config.frontend_url());
    context.insert(
        "frontendPort".to_string(),
        config.frontend_port.to_string(),
    );
    context.insert("debug".to_string(), config.debug.to_string());
    context.insert(
        "corsOrigins".to_string(),
        config.permitted_cors_origins.join(","),
    );
    context.insert(
        "workspaceBase".to_string(),
        config.workspace_base.display().to_string(),
    );
    context.insert(
        "sandboxUserId".to_string(),
        config.sandbox_user_id.to_string(),
    );

    context
}

fn substitute_placeholders(
    template: &str,
    context: &HashMap<String, String>,
    template_path: &Path,
) -> Result<String, ConfigError> {
    let mut result = template.to_string();

    for (key, value) in context {
        let placeholder = format!("{{{{ .{} }}}}", key);
        // Only substitute if the placeholder is actually used in the template
        if template.contains(&placeholder) {
            result = result.replace(&placeholder, value);
        }
    }

    // A placeholder that survives substitution would be consumed verbatim
    // by whatever reads the effective file.
    if let Some(name) = first_unresolved_placeholder(&result) {
        return Err(ConfigError::UnresolvedPlaceholder {
            name,
            path: template_path.display().to_string(),
        });
    }

    Ok(result)
}

fn first_unresolved_placeholder(rendered: &str) -> Option<String> {
    let start = rendered.find("{{ .")?;
    let rest = &rendered[start + 4..];
    let end = rest.find(" }}").unwrap_or(rest.len());
    Some(rest[..end].to_string())
}
