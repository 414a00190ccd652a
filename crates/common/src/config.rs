//! Builder configuration loaded from YAML
//!
//! Every key is optional; a missing file section falls back to the defaults
//! below.
//!
//! ```yaml
//! preferred_media_types:
//!   - application/json
//!   - application/x-www-form-urlencoded
//! ignored_headers: [Accept, Content-Type, Authorization]
//! extra_keywords: [model]
//! include_component_schemas: true
//! ```

use crate::{GeneratorError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Knobs of the client model builder
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Media types tried in order when a body declares several
    pub preferred_media_types: Vec<String>,

    /// Header parameters dropped from signatures (compared case-insensitively)
    pub ignored_headers: Vec<String>,

    /// Reserved words on top of the built-in list
    pub extra_keywords: Vec<String>,

    /// Emit a class for every object schema under `components/schemas`,
    /// even when no operation references it
    pub include_component_schemas: bool,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            preferred_media_types: vec!["application/json".to_string()],
            ignored_headers: vec![
                "Accept".to_string(),
                "Content-Type".to_string(),
                "Authorization".to_string(),
            ],
            extra_keywords: Vec::new(),
            include_component_schemas: true,
        }
    }
}

impl BuilderConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            GeneratorError::Parse(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn is_ignored_header(&self, name: &str) -> bool {
        self.ignored_headers
            .iter()
            .any(|h| h.eq_ignore_ascii_case(name))
    }
}
