//! Identifier strategy used by the schema context and the client builder

use clientgen_common::naming::{escape_identifier, to_pascal_case, DEFAULT_KEYWORDS};
use std::collections::BTreeSet;

/// Turns document names into target identifiers
#[cfg_attr(test, mockall::automock)]
pub trait IdentifierStrategy {
    /// Identifier of a generated class (`pet_owner` → `PetOwner`)
    fn class_name(&self, name: &str) -> String;

    /// Identifier of a field or parameter
    fn field_name(&self, name: &str) -> String;

    /// Identifier of one module path segment
    fn module_name(&self, segment: &str) -> String;

    /// Identifier of an operation
    fn operation_name(&self, operation_id: &str) -> String;
}

/// Reversible escaping of the document names; class names are
/// PascalCased first
#[derive(Debug, Clone)]
pub struct EscapingIdentifiers {
    keywords: BTreeSet<String>,
}

impl EscapingIdentifiers {
    pub fn new(extra_keywords: &[String]) -> Self {
        let keywords = DEFAULT_KEYWORDS
            .iter()
            .map(|k| k.to_string())
            .chain(extra_keywords.iter().cloned())
            .collect();
        Self { keywords }
    }
}

impl Default for EscapingIdentifiers {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl IdentifierStrategy for EscapingIdentifiers {
    fn class_name(&self, name: &str) -> String {
        escape_identifier(&to_pascal_case(name), &self.keywords)
    }

    fn field_name(&self, name: &str) -> String {
        escape_identifier(name, &self.keywords)
    }

    fn module_name(&self, segment: &str) -> String {
        escape_identifier(segment, &self.keywords)
    }

    fn operation_name(&self, operation_id: &str) -> String {
        escape_identifier(operation_id, &self.keywords)
    }
}
