//! Per-service filter configuration.
//!
//! An [`InterfaceConfig`] carries everything the selector needs for one
//! exported or referenced service: the alias directives, the custom filter
//! instances and the application name used when attributing async faults.
//! Configurations can be created programmatically or loaded from files.
//!
//! # Examples
//!
//! ```rust
//! use filter_core::config::InterfaceConfig;
//!
//! let config = InterfaceConfig::new("com.example.Echo")
//!     .with_app_name("echo-app")
//!     .with_filters(["trace", "-logging"]);
//!
//! assert!(config.validate().is_ok());
//! ```

use crate::error::{ConfigError, FilterResult};
use crate::filter::{is_exclude_directive, FilterRef};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Which side of a call a chain is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The serving side
    Provider,
    /// The calling side
    Consumer,
}

impl Role {
    /// Lower-case name used in logs and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Provider => "provider",
            Role::Consumer => "consumer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filter configuration of one provider or consumer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InterfaceConfig {
    /// Unique name of the service interface
    pub interface_id: String,

    /// Owning application, used to attribute async notification faults
    #[serde(default)]
    pub app_name: String,

    /// Ordered alias directives: `name` includes, `-name` / `!name` excludes
    #[serde(default)]
    pub filter: Vec<String>,

    /// Filter instances constructed in code, appended after extension filters
    #[serde(skip)]
    pub filter_ref: Vec<FilterRef>,
}

impl InterfaceConfig {
    /// Create a configuration for `interface_id` with no directives.
    pub fn new(interface_id: impl Into<String>) -> Self {
        Self {
            interface_id: interface_id.into(),
            ..Self::default()
        }
    }

    /// Set the owning application name.
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    /// Append alias directives.
    pub fn with_filters<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter.extend(aliases.into_iter().map(Into::into));
        self
    }

    /// Append a custom filter instance or exclusion marker.
    pub fn with_filter_ref(mut self, filter_ref: impl Into<FilterRef>) -> Self {
        self.filter_ref.push(filter_ref.into());
        self
    }

    /// Validate the configuration and return the first problem found.
    pub fn validate(&self) -> FilterResult<()> {
        if self.interface_id.trim().is_empty() {
            return Err(ConfigError::MissingParameter {
                parameter: "interface_id".to_string(),
            }
            .into());
        }

        for directive in &self.filter {
            let trimmed = directive.trim();
            if trimmed.is_empty() {
                return Err(ConfigError::InvalidValue {
                    parameter: format!("{}.filter", self.interface_id),
                    value: directive.clone(),
                    reason: "Filter alias cannot be empty".to_string(),
                }
                .into());
            }
            if is_exclude_directive(trimmed) && trimmed.len() == 1 {
                return Err(ConfigError::InvalidValue {
                    parameter: format!("{}.filter", self.interface_id),
                    value: directive.clone(),
                    reason: "Exclude prefix must be followed by an alias".to_string(),
                }
                .into());
            }
        }

        Ok(())
    }
}

/// A file describing the providers and consumers of one process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfigFile {
    /// Exported services
    #[serde(default)]
    pub providers: Vec<InterfaceConfig>,

    /// Referenced services
    #[serde(default)]
    pub consumers: Vec<InterfaceConfig>,
}

impl ServiceConfigFile {
    /// Load and validate a service file.
    ///
    /// Supports JSON, YAML, and TOML formats based on file extension.
    pub fn from_file(path: impl AsRef<Path>) -> FilterResult<Self> {
        let config: Self = load_config_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every service in the file.
    pub fn validate(&self) -> FilterResult<()> {
        self.providers
            .iter()
            .chain(self.consumers.iter())
            .try_for_each(InterfaceConfig::validate)
    }

    /// All services of one role.
    pub fn services(&self, role: Role) -> &[InterfaceConfig] {
        match role {
            Role::Provider => &self.providers,
            Role::Consumer => &self.consumers,
        }
    }

    /// Find a service of `role` by interface id.
    pub fn find(&self, role: Role, interface_id: &str) -> Option<&InterfaceConfig> {
        self.services(role)
            .iter()
            .find(|config| config.interface_id == interface_id)
    }
}

/// Deserialize any configuration type from a `.json`, `.yaml`/`.yml` or
/// `.toml` file.
pub fn load_config_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> FilterResult<T> {
    let path = path.as_ref();
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            }
            .into())
        }
        Err(e) => return Err(e.into()),
    };

    let invalid = |reason: String| ConfigError::InvalidFormat {
        path: path.display().to_string(),
        reason,
    };

    let config = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(&content).map_err(|e| invalid(e.to_string()))?,
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(&content).map_err(|e| invalid(e.to_string()))?
        }
        Some("toml") => toml::from_str(&content).map_err(|e| invalid(e.to_string()))?,
        _ => {
            return Err(invalid(
                "Unsupported file format. Use .json, .yaml, or .toml".to_string(),
            )
            .into())
        }
    };

    Ok(config)
}
