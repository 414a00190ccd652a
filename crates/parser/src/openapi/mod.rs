//! OpenAPI 3.0 document handling
//!
//! Loads a document, exposes typed views of its objects and resolves local
//! `$ref` pointers.
//!
//! ## Usage
//! ```rust,ignore
//! use clientgen_parser::openapi::OpenApiParser;
//!
//! let parser = OpenApiParser::from_file("petstore.json")?;
//! let model = parser.parse()?;
//! ```

mod parser;
mod resolver;
mod types;

pub use parser::OpenApiParser;
pub use resolver::{parse_at, reference_target, Resolver};
pub use types::*;
