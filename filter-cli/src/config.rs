//! Configuration file read by the CLI.
//!
//! The service lists sit at the top level next to an optional `filters`
//! section for the built-in filters:
//!
//! ```yaml
//! app_name: demo-app
//! providers:
//!   - interface_id: com.example.Echo
//!     filter: ["-rateLimit"]
//! consumers:
//!   - interface_id: com.example.Echo
//! filters:
//!   rate_limit:
//!     max_requests: 10
//!     window: 1s
//! ```

use filter_builtin::BuiltinFilterSettings;
use filter_core::{load_config_file, FilterResult, InterfaceConfig, Role, ServiceConfigFile};
use serde::Deserialize;
use std::path::Path;

/// Everything the CLI reads from `--config`.
#[derive(Debug, Default, Deserialize)]
pub struct CliConfig {
    /// Application name for services that do not set their own
    #[serde(default)]
    pub app_name: Option<String>,

    /// Providers and consumers
    #[serde(flatten)]
    pub services: ServiceConfigFile,

    /// Built-in filter settings
    #[serde(default)]
    pub filters: BuiltinFilterSettings,
}

impl CliConfig {
    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> FilterResult<Self> {
        let mut config: Self = load_config_file(path)?;
        config.services.validate()?;
        config.filters.validate()?;
        config.apply_app_name();
        Ok(config)
    }

    fn apply_app_name(&mut self) {
        let Some(app_name) = &self.app_name else {
            return;
        };
        for service in self
            .services
            .providers
            .iter_mut()
            .chain(self.services.consumers.iter_mut())
        {
            if service.app_name.is_empty() {
                service.app_name = app_name.clone();
            }
        }
    }

    /// The configuration of `interface_id` for `role`, if the file has one.
    pub fn service(&self, role: Role, interface_id: &str) -> Option<InterfaceConfig> {
        self.services.find(role, interface_id).cloned()
    }
}
