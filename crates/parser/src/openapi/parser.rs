//! OpenAPI document loader

use crate::client::ClientBuilder;
use crate::naming::IdentifierStrategy;
use clientgen_common::{BuilderConfig, ClientModel, GeneratorError, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// OpenAPI document parser
///
/// Holds the raw document; schemas are read lazily through pointers while
/// the client model is built.
#[derive(Debug)]
pub struct OpenApiParser {
    /// Loaded document
    document: Value,

    /// Builder settings
    config: BuilderConfig,
}

impl OpenApiParser {
    /// Load an OpenAPI document from a JSON file
    ///
    /// # Example
    /// ```rust,ignore
    /// let parser = OpenApiParser::from_file("petstore.json")?;
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            GeneratorError::Parse(format!(
                "Failed to read OpenAPI file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_json(&content)
    }

    /// Parse an OpenAPI document from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let document: Value = serde_json::from_str(json)
            .map_err(|e| GeneratorError::Parse(format!("Failed to parse OpenAPI JSON: {}", e)))?;

        Ok(Self::from_value(document))
    }

    /// Wrap an already parsed document (e.g. converted from YAML)
    pub fn from_value(document: Value) -> Self {
        Self {
            document,
            config: BuilderConfig::default(),
        }
    }

    /// Set builder configuration
    pub fn with_config(mut self, config: BuilderConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the client model
    pub fn parse(&self) -> Result<ClientModel> {
        ClientBuilder::new(&self.document)
            .with_config(self.config.clone())
            .build()
    }

    /// Build the client model with a custom identifier strategy
    pub fn parse_with<'a>(&'a self, naming: Box<dyn IdentifierStrategy + 'a>) -> Result<ClientModel> {
        ClientBuilder::new(&self.document)
            .with_config(self.config.clone())
            .with_naming(naming)
            .build()
    }

    /// Get reference to the underlying document
    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_openapi() {
        let openapi_json = r#"{
            "openapi": "3.0.0",
            "info": {
                "title": "Test API",
                "version": "1.0.0"
            },
            "paths": {}
        }"#;

        let parser = OpenApiParser::from_json(openapi_json);
        assert!(parser.is_ok());

        let model = parser.unwrap().parse().unwrap();
        assert_eq!(model.title, "Test API");
        assert_eq!(model.version, "1.0.0");
        assert!(model.operations.is_empty());
        assert!(model.init.base_url.is_none());
    }

    #[test]
    fn test_invalid_json() {
        let err = OpenApiParser::from_json("{ not json").unwrap_err();
        assert!(matches!(err, GeneratorError::Parse(_)));
    }

    #[test]
    fn test_swagger_documents_are_rejected() {
        let parser = OpenApiParser::from_json(
            r#"{"openapi": "2.0", "info": {"title": "Old", "version": "1"}}"#,
        )
        .unwrap();
        let err = parser.parse().unwrap_err();
        assert!(matches!(err, GeneratorError::UnsupportedSchema { .. }));
    }
}
