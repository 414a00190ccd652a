//! Common types and utilities for clientgen
//!
//! This crate contains the shared data structures used across the parser and
//! CLI components: error and warning types, document pointers, identifier
//! derivation, the annotated type system and the client model IR.

mod config;
mod model;
pub mod naming;
mod pointer;
mod types;

pub use config::BuilderConfig;
pub use model::{
    ClassBase, ClientModel, Field, HttpMethod, InitModel, OAuthFlowModel, OperationModel,
    ParameterLocation, ParameterModel, ParameterStyle, RequestBodyModel, ResponseModel,
    ResponseStatus, SchemaClass, SecurityRequirementModel, SecuritySchemeKind,
    SecuritySchemeModel,
};
pub use pointer::Pointer;
pub use types::{AnnotatedType, Constraints, ScalarKind, TypeName};

use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while building a client model
///
/// Every variant is fatal for the build: no partial model is produced.
#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("Reference cycle detected: {}", render_trail(.trail))]
    ReferenceCycle { trail: Vec<Pointer> },

    #[error("Pointer not found: {pointer}")]
    UnresolvedPointer { pointer: String },

    #[error("Unsupported schema at {pointer}: {reason}")]
    UnsupportedSchema { pointer: Pointer, reason: String },

    #[error("Operation {method} {path} has no operationId")]
    MissingOperationId { method: String, path: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl GeneratorError {
    /// Shorthand for an [`GeneratorError::UnsupportedSchema`] at `pointer`
    pub fn unsupported(pointer: &Pointer, reason: impl Into<String>) -> Self {
        GeneratorError::UnsupportedSchema {
            pointer: pointer.clone(),
            reason: reason.into(),
        }
    }
}

fn render_trail(trail: &[Pointer]) -> String {
    trail
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Result type for generator operations
pub type Result<T> = std::result::Result<T, GeneratorError>;

/// Non-fatal conditions collected while building a model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// A schema can never match; the field or branch using it was omitted
    BottomSchema { pointer: Pointer },

    /// More than one server was declared; the first one wins
    MultipleServers { count: usize, used: String },

    /// A header parameter the runtime controls itself was dropped
    IgnoredHeader { pointer: Pointer, name: String },

    /// A schema keyword the algebra does not model was skipped
    UnsupportedKeyword { pointer: Pointer, keyword: String },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::BottomSchema { pointer } => {
                write!(f, "schema at {pointer} can never match and was omitted")
            }
            Warning::MultipleServers { count, used } => {
                write!(f, "{count} servers declared, using {used}")
            }
            Warning::IgnoredHeader { pointer, name } => {
                write!(f, "header parameter '{name}' at {pointer} is ignored")
            }
            Warning::UnsupportedKeyword { pointer, keyword } => {
                write!(f, "keyword '{keyword}' at {pointer} is not supported")
            }
        }
    }
}
