//! Document pointers
//!
//! A [`Pointer`] names a location inside an OpenAPI document. Segments are
//! kept unescaped; JSON Pointer escaping (`~0`, `~1`) only happens when a
//! pointer is parsed from or rendered to its `#/...` string form.

use crate::{GeneratorError, Result};
use serde::{Serialize, Serializer};
use std::fmt;

/// Location inside the source document, rooted at `#`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pointer {
    segments: Vec<String>,
}

impl Pointer {
    /// The document root (`#`)
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a pointer from already-unescaped segments
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a local reference such as `#/components/schemas/Pet`
    ///
    /// # Example
    /// ```
    /// use clientgen_common::Pointer;
    ///
    /// let pointer = Pointer::parse("#/paths/~1pets~1{id}/get").unwrap();
    /// assert_eq!(pointer.segments()[1], "/pets/{id}");
    /// ```
    pub fn parse(reference: &str) -> Result<Self> {
        let fragment = reference
            .strip_prefix('#')
            .ok_or_else(|| GeneratorError::UnresolvedPointer {
                pointer: reference.to_string(),
            })?;

        if fragment.is_empty() {
            return Ok(Self::root());
        }

        let rest = fragment
            .strip_prefix('/')
            .ok_or_else(|| GeneratorError::UnresolvedPointer {
                pointer: reference.to_string(),
            })?;

        Ok(Self {
            segments: rest.split('/').map(unescape_segment).collect(),
        })
    }

    /// Child pointer with one more segment
    pub fn push(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    /// Child pointer for an array element
    pub fn index(&self, index: usize) -> Self {
        self.push(index.to_string())
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Pointer without its last segment; the root is its own parent
    pub fn parent(&self) -> Self {
        let mut segments = self.segments.clone();
        segments.pop();
        Self { segments }
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn starts_with(&self, prefix: &Pointer) -> bool {
        self.segments.starts_with(&prefix.segments)
    }
}

/// Escape one segment for the `#/...` string form (`~` → `~0`, `/` → `~1`)
pub fn escape_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Reverse of [`escape_segment`]
pub fn unescape_segment(segment: &str) -> String {
    // `~0` first would turn `~01` into `/` instead of `~1`
    segment.replace("~1", "/").replace("~0", "~")
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#")?;
        for segment in &self.segments {
            write!(f, "/{}", escape_segment(segment))?;
        }
        Ok(())
    }
}

impl Serialize for Pointer {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
