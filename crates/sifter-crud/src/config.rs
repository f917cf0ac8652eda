//! Orchestrator configuration.
//!
//! [`CrudConfig`] holds the request-parameter names, page-size limits and
//! defaults the orchestrator works with. Every field has a default, so a YAML
//! file only needs to name what it changes:
//!
//! ```yaml
//! default_page_size: 50
//! default_ordering: "-created_at"
//! reserved_params: [page, page_size, ordering, format, fields]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use sifter_query::{PageSettings, DEFAULT_PAGE_SIZE, DEFAULT_RESERVED, MAX_PAGE_SIZE};
use thiserror::Error;

/// Errors raised while loading a [`CrudConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read {path}: {message}")]
    Load { path: String, message: String },

    /// The YAML is malformed or names unknown keys.
    #[error("invalid configuration: {message}")]
    Parse { message: String },

    /// The values are inconsistent with each other.
    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

/// Settings for list handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CrudConfig {
    /// Parameters never interpreted as filters. The page, page-size and
    /// ordering parameter names are always reserved in addition.
    pub reserved_params: Vec<String>,
    pub page_param: String,
    pub page_size_param: String,
    pub ordering_param: String,
    /// Page size when the request gives none or an invalid one.
    pub default_page_size: usize,
    /// Largest page size a request may ask for.
    pub max_page_size: usize,
    /// Ordering directive used when the request's own yields no terms.
    pub default_ordering: Option<String>,
    /// When `false`, lists return every match as a plain array.
    pub paginate: bool,
}

impl Default for CrudConfig {
    fn default() -> Self {
        CrudConfig {
            reserved_params: DEFAULT_RESERVED.iter().map(|s| s.to_string()).collect(),
            page_param: "page".to_string(),
            page_size_param: "page_size".to_string(),
            ordering_param: "ordering".to_string(),
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
            default_ordering: None,
            paginate: true,
        }
    }
}

impl CrudConfig {
    /// Parses a configuration from YAML. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed YAML or unknown keys and
    /// [`ConfigError::Invalid`] when the page sizes are inconsistent.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: CrudConfig = if yaml.trim().is_empty() {
            CrudConfig::default()
        } else {
            serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse {
                message: e.to_string(),
            })?
        };
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a YAML configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Load {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_yaml_str(&content)
    }

    /// Checks that the page sizes make sense together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_page_size == 0 {
            return Err(ConfigError::Invalid {
                message: "max_page_size must be at least 1".to_string(),
            });
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err(ConfigError::Invalid {
                message: format!(
                    "default_page_size must be between 1 and max_page_size ({}), got {}",
                    self.max_page_size, self.default_page_size
                ),
            });
        }
        Ok(())
    }

    /// Adds a reserved parameter name.
    pub fn reserve(mut self, param: impl Into<String>) -> Self {
        let param = param.into();
        if !self.reserved_params.contains(&param) {
            self.reserved_params.push(param);
        }
        self
    }

    pub fn with_default_page_size(mut self, size: usize) -> Self {
        self.default_page_size = size;
        self
    }

    pub fn with_max_page_size(mut self, size: usize) -> Self {
        self.max_page_size = size;
        self
    }

    pub fn with_default_ordering(mut self, directive: impl Into<String>) -> Self {
        self.default_ordering = Some(directive.into());
        self
    }

    /// Disables pagination: lists return every match as a plain array.
    pub fn without_pagination(mut self) -> Self {
        self.paginate = false;
        self
    }

    /// Every parameter name excluded from filtering.
    pub fn reserved_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.reserved_params.iter().map(String::as_str).collect();
        for name in [&self.page_param, &self.page_size_param, &self.ordering_param] {
            if !keys.contains(&name.as_str()) {
                keys.push(name);
            }
        }
        keys
    }

    /// Pagination settings derived from this configuration.
    pub fn page_settings(&self) -> PageSettings {
        PageSettings {
            page_param: self.page_param.clone(),
            page_size_param: self.page_size_param.clone(),
            default_page_size: self.default_page_size,
            max_page_size: self.max_page_size,
        }
    }
}
