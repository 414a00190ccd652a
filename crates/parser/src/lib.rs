//! OpenAPI 3.0 resolution and schema algebra for clientgen
//!
//! This crate turns an OpenAPI document into a [`ClientModel`]:
//!
//! - `openapi`: typed document objects and `$ref` resolution
//! - `schema`: the MetaModel arena, `normalize`/`intersect`, annotations
//!   and class extraction
//! - `client`: the walk over servers, paths, operations and security
//!
//! ## Usage
//! ```rust,ignore
//! use clientgen_parser::build_client_model;
//!
//! let document: serde_json::Value = serde_json::from_str(&text)?;
//! let model = build_client_model(&document, &BuilderConfig::default())?;
//! ```

mod client;
pub mod naming;
pub mod openapi;
pub mod schema;

pub use client::ClientBuilder;
pub use naming::{EscapingIdentifiers, IdentifierStrategy};
pub use openapi::OpenApiParser;
pub use schema::SchemaContext;

use clientgen_common::{BuilderConfig, ClientModel, Result};
use serde_json::Value;

/// Build the client model of a parsed OpenAPI document
pub fn build_client_model(document: &Value, config: &BuilderConfig) -> Result<ClientModel> {
    ClientBuilder::new(document)
        .with_config(config.clone())
        .build()
}
