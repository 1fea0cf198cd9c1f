use super::types::*;
use crate::config::{expand_env_vars, expand_tilde};
use regex::Regex;
use std::fs::File;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation failed:\n{}", .0.join("\n"))]
    ValidationList(Vec<String>),

    #[error("validation failed: {0}")]
    Validation(String),
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    use std::io::Read;

    let mut file = File::open(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to open config file '{}': {}", path.display(), e),
        ))
    })?;

    let mut yaml_string = String::new();
    file.read_to_string(&mut yaml_string).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read config file '{}': {}", path.display(), e),
        ))
    })?;

    parse_config(&yaml_string)
}

/// Parse and validate a config document
pub fn parse_config(yaml: &str) -> Result<Config, ConfigError> {
    // Expand environment variables in the YAML string before parsing
    let yaml_string = expand_env_vars(yaml);
    check_unexpanded_vars(&yaml_string)?;

    let mut config: Config = serde_yaml::from_str(&yaml_string)?;
    expand_paths(&mut config);
    validate_config(&config)?;

    Ok(config)
}

/// Checks for unexpanded environment variables and returns a helpful error
fn check_unexpanded_vars(yaml_string: &str) -> Result<(), ConfigError> {
    let re = Regex::new(r"\$env\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap();
    let mut unexpanded_vars: Vec<String> = re
        .captures_iter(yaml_string)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
        .collect();

    if unexpanded_vars.is_empty() {
        return Ok(());
    }

    unexpanded_vars.sort();
    unexpanded_vars.dedup();

    let error_msg = if unexpanded_vars.len() == 1 {
        format!(
            "Environment variable $env{{{0}}} is not set.\n\
             \n\
             To fix this, either:\n\
             1. Set the environment variable: export {0}=...\n\
             2. Replace $env{{{0}}} in the config file with an actual value",
            unexpanded_vars[0]
        )
    } else {
        format!(
            "Environment variables are not set: {}\n\
             \n\
             To fix this, either:\n\
             1. Set the environment variables\n\
             2. Replace the variables in the config file with actual values",
            unexpanded_vars.join(", ")
        )
    };

    Err(ConfigError::Validation(error_msg))
}

fn expand_paths(config: &mut Config) {
    if let ObjectStoreConfig::Local { root } = &mut config.object_store {
        *root = expand_tilde(root);
    }
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    validate_index(&config.index, &mut errors);
    validate_object_store(&config.object_store, &mut errors);

    if config.pipeline.line_buffer == 0 {
        errors.push("pipeline.line_buffer must be greater than 0".to_string());
    }
    if config.pipeline.max_line_bytes == 0 {
        errors.push("pipeline.max_line_bytes must be greater than 0".to_string());
    }

    if config.web.listen.parse::<SocketAddr>().is_err() {
        errors.push(format!(
            "web.listen: '{}' is not a socket address (expected host:port)",
            config.web.listen
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationList(errors))
    }
}

fn validate_index(index: &IndexConfig, errors: &mut Vec<String>) {
    if !is_http_url(&index.endpoint) {
        errors.push(format!(
            "index.endpoint: '{}' must start with http:// or https://",
            index.endpoint
        ));
    }

    // Index names must be lowercase and free of path or wildcard characters
    let prefix_ok = !index.prefix.is_empty()
        && !index.prefix.starts_with(['-', '_', '+'])
        && index
            .prefix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.'));
    if !prefix_ok {
        errors.push(format!(
            "index.prefix: '{}' must be non-empty lowercase letters, digits, '-', '_' or '.'",
            index.prefix
        ));
    }

    if index.doc_type.is_empty() || index.doc_type.contains('/') {
        errors.push(format!(
            "index.doc_type: '{}' must be non-empty and must not contain '/'",
            index.doc_type
        ));
    }

    if index.max_in_flight == Some(0) {
        errors.push("index.max_in_flight must be greater than 0 when set".to_string());
    }

    if let AuthConfig::Header { name, value } = &index.auth {
        if name.is_empty() {
            errors.push("index.auth.name cannot be empty".to_string());
        }
        if value.is_empty() {
            errors.push("index.auth.value cannot be empty".to_string());
        }
    }
}

fn validate_object_store(store: &ObjectStoreConfig, errors: &mut Vec<String>) {
    match store {
        ObjectStoreConfig::Local { root } => {
            if root.as_os_str().is_empty() {
                errors.push("object_store.root cannot be empty".to_string());
            }
        }
        ObjectStoreConfig::Http { base_url, .. } => {
            if !is_http_url(base_url) {
                errors.push(format!(
                    "object_store.base_url: '{}' must start with http:// or https://",
                    base_url
                ));
            }
        }
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
