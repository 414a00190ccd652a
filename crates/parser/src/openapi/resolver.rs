//! `$ref` resolution against the raw document

use super::types::ReferenceOr;
use clientgen_common::{GeneratorError, Pointer, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::borrow::Cow;

/// Read-only view of a loaded document that follows local references
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    document: &'a Value,
}

impl<'a> Resolver<'a> {
    pub fn new(document: &'a Value) -> Self {
        Self { document }
    }

    pub fn document(&self) -> &'a Value {
        self.document
    }

    /// Walk to `pointer` without following references
    pub fn node(&self, pointer: &Pointer) -> Result<&'a Value> {
        let mut current = self.document;
        for segment in pointer.segments() {
            let next = match current {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            };
            current = next.ok_or_else(|| GeneratorError::UnresolvedPointer {
                pointer: pointer.to_string(),
            })?;
        }
        Ok(current)
    }

    /// Walk to `pointer`, then follow `$ref` chains to a concrete node
    ///
    /// Returns the pointer of the node finally reached. A chain that comes
    /// back to a pointer it already visited is a [`GeneratorError::ReferenceCycle`].
    pub fn resolve(&self, pointer: &Pointer) -> Result<(Pointer, &'a Value)> {
        let mut trail = vec![pointer.clone()];
        let mut current = pointer.clone();

        loop {
            let node = self.node(&current)?;
            let Some(target) = reference_target(node) else {
                return Ok((current, node));
            };

            let next = Pointer::parse(target)?;
            let seen = trail.contains(&next);
            trail.push(next.clone());
            if seen {
                return Err(GeneratorError::ReferenceCycle { trail });
            }
            tracing::trace!("following {} -> {}", current, next);
            current = next;
        }
    }

    /// Resolve `pointer` and deserialize the node into a document object
    pub fn resolve_as<T: DeserializeOwned>(&self, pointer: &Pointer) -> Result<(Pointer, T)> {
        let (target, node) = self.resolve(pointer)?;
        let item = T::deserialize(node)
            .map_err(|e| GeneratorError::Parse(format!("Invalid object at {}: {}", target, e)))?;
        Ok((target, item))
    }

    /// Inline items are borrowed as-is and located at `at`; references are
    /// resolved and deserialized
    pub fn resolve_item<'b, T>(
        &self,
        item: &'b ReferenceOr<T>,
        at: &Pointer,
    ) -> Result<(Pointer, Cow<'b, T>)>
    where
        T: DeserializeOwned + Clone,
    {
        match item {
            ReferenceOr::Item(item) => Ok((at.clone(), Cow::Borrowed(item))),
            ReferenceOr::Reference(reference) => {
                let (target, item) = self.resolve_as(&reference.pointer()?)?;
                Ok((target, Cow::Owned(item)))
            }
        }
    }
}

/// The `$ref` string of a reference object, if `node` is one
pub fn reference_target(node: &Value) -> Option<&str> {
    node.as_object()?.get("$ref")?.as_str()
}

/// Deserialize an inline item, attributing failures to `at`
pub fn parse_at<T: DeserializeOwned>(node: &Value, at: &Pointer) -> Result<T> {
    T::deserialize(node)
        .map_err(|e| GeneratorError::Parse(format!("Invalid object at {}: {}", at, e)))
}
