//! Annotated type expressions
//!
//! An [`AnnotatedType`] is the target-neutral type of a value position:
//! a field, a parameter, a request or response body.

use serde::Serialize;
use std::fmt;

/// Module-qualified name of a generated class
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TypeName {
    /// Module path segments, already turned into identifiers
    pub module: Vec<String>,

    /// Class identifier
    pub name: String,
}

impl TypeName {
    pub fn new(module: Vec<String>, name: impl Into<String>) -> Self {
        Self {
            module,
            name: name.into(),
        }
    }

    /// Dotted module path (`components.schemas`)
    pub fn module_path(&self) -> String {
        self.module.join(".")
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.module.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.module_path(), self.name)
        }
    }
}

/// Primitive value kinds, including the format-specific string overrides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    String,
    Integer,
    Number,
    Boolean,
    Uuid,
    Date,
    DateTime,
    Time,
    Decimal,
    Bytes,
}

impl ScalarKind {
    fn as_str(self) -> &'static str {
        match self {
            ScalarKind::String => "string",
            ScalarKind::Integer => "integer",
            ScalarKind::Number => "number",
            ScalarKind::Boolean => "boolean",
            ScalarKind::Uuid => "uuid",
            ScalarKind::Date => "date",
            ScalarKind::DateTime => "date-time",
            ScalarKind::Time => "time",
            ScalarKind::Decimal => "decimal",
            ScalarKind::Bytes => "bytes",
        }
    }
}

/// Wire-format constraints carried by a scalar, list or map annotation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Constraints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gt: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ge: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lt: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub le: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub unique_items: bool,
}

impl Constraints {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl fmt::Display for Constraints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        let numeric = [
            ("gt", self.gt),
            ("ge", self.ge),
            ("lt", self.lt),
            ("le", self.le),
            ("multiple_of", self.multiple_of),
        ];
        for (name, value) in numeric {
            if let Some(v) = value {
                parts.push(format!("{name}={v}"));
            }
        }
        let lengths = [
            ("min_length", self.min_length),
            ("max_length", self.max_length),
            ("min_items", self.min_items),
            ("max_items", self.max_items),
        ];
        for (name, value) in lengths {
            if let Some(v) = value {
                parts.push(format!("{name}={v}"));
            }
        }
        if let Some(pattern) = &self.pattern {
            parts.push(format!("pattern={pattern:?}"));
        }
        if self.unique_items {
            parts.push("unique_items".to_string());
        }
        write!(f, "{}", parts.join(", "))
    }
}

/// Target type of a value position
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnnotatedType {
    /// Any JSON value
    Any,

    /// Any JSON object
    AnyObject,

    /// The JSON `null` value on its own
    Null,

    Scalar {
        scalar: ScalarKind,
        #[serde(skip_serializing_if = "Constraints::is_empty")]
        constraints: Constraints,
    },

    /// One of a fixed set of literal values
    Literal { values: Vec<serde_json::Value> },

    List {
        items: Box<AnnotatedType>,
        #[serde(skip_serializing_if = "Constraints::is_empty")]
        constraints: Constraints,
    },

    /// Object whose values all share one type
    Map { values: Box<AnnotatedType> },

    Tuple { members: Vec<AnnotatedType> },

    /// Flattened, deduplicated, sorted; never nested and never holds `Null`
    Union { members: Vec<AnnotatedType> },

    Optional { inner: Box<AnnotatedType> },

    /// Reference to a generated class
    Named { name: TypeName },
}

impl AnnotatedType {
    pub fn scalar(scalar: ScalarKind) -> Self {
        AnnotatedType::Scalar {
            scalar,
            constraints: Constraints::default(),
        }
    }

    pub fn list(items: AnnotatedType) -> Self {
        AnnotatedType::List {
            items: Box::new(items),
            constraints: Constraints::default(),
        }
    }

    pub fn named(name: TypeName) -> Self {
        AnnotatedType::Named { name }
    }

    /// Wrap in `Optional`, collapsing nested optionals
    pub fn optional(inner: AnnotatedType) -> Self {
        match inner {
            AnnotatedType::Optional { .. } | AnnotatedType::Any | AnnotatedType::Null => inner,
            other => AnnotatedType::Optional {
                inner: Box::new(other),
            },
        }
    }

    /// Build a union, absorbing nested unions and lifting `null`/optional
    /// members into a single `Optional` wrapper
    ///
    /// # Example
    /// ```
    /// use clientgen_common::{AnnotatedType, ScalarKind};
    ///
    /// let int = AnnotatedType::scalar(ScalarKind::Integer);
    /// let text = AnnotatedType::scalar(ScalarKind::String);
    /// let a = AnnotatedType::union(vec![int.clone(), text.clone()]);
    /// let b = AnnotatedType::union(vec![text, AnnotatedType::union(vec![int])]);
    /// assert_eq!(a, b);
    /// ```
    pub fn union(members: impl IntoIterator<Item = AnnotatedType>) -> Self {
        let mut flat: Vec<AnnotatedType> = Vec::new();
        let mut nullable = false;
        let mut any = false;

        let mut pending: Vec<AnnotatedType> = members.into_iter().collect();
        pending.reverse();
        while let Some(member) = pending.pop() {
            match member {
                AnnotatedType::Union { members } => {
                    pending.extend(members.into_iter().rev());
                }
                AnnotatedType::Optional { inner } => {
                    nullable = true;
                    pending.push(*inner);
                }
                AnnotatedType::Null => nullable = true,
                AnnotatedType::Any => any = true,
                other => {
                    if !flat.contains(&other) {
                        flat.push(other);
                    }
                }
            }
        }

        if any {
            return AnnotatedType::Any;
        }

        flat.sort_by_cached_key(ToString::to_string);

        let core = match flat.len() {
            0 => return AnnotatedType::Null,
            1 => flat.remove(0),
            _ => AnnotatedType::Union { members: flat },
        };

        if nullable {
            AnnotatedType::optional(core)
        } else {
            core
        }
    }

    pub fn is_optional(&self) -> bool {
        matches!(
            self,
            AnnotatedType::Optional { .. } | AnnotatedType::Any | AnnotatedType::Null
        )
    }

    /// Members of a union (or the type itself), looking through `Optional`
    pub fn members(&self) -> Vec<&AnnotatedType> {
        match self {
            AnnotatedType::Optional { inner } => inner.members(),
            AnnotatedType::Union { members } => members.iter().collect(),
            other => vec![other],
        }
    }

    /// Every generated class this type refers to, in order of appearance
    pub fn referenced_names(&self) -> Vec<&TypeName> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names<'a>(&'a self, names: &mut Vec<&'a TypeName>) {
        match self {
            AnnotatedType::Named { name } => names.push(name),
            AnnotatedType::List { items, .. } => items.collect_names(names),
            AnnotatedType::Map { values } => values.collect_names(names),
            AnnotatedType::Optional { inner } => inner.collect_names(names),
            AnnotatedType::Tuple { members } | AnnotatedType::Union { members } => {
                for member in members {
                    member.collect_names(names);
                }
            }
            AnnotatedType::Any
            | AnnotatedType::AnyObject
            | AnnotatedType::Null
            | AnnotatedType::Scalar { .. }
            | AnnotatedType::Literal { .. } => {}
        }
    }
}

fn join(types: &[AnnotatedType]) -> String {
    types
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for AnnotatedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotatedType::Any => write!(f, "any"),
            AnnotatedType::AnyObject => write!(f, "object"),
            AnnotatedType::Null => write!(f, "null"),
            AnnotatedType::Scalar {
                scalar,
                constraints,
            } => {
                if constraints.is_empty() {
                    write!(f, "{}", scalar.as_str())
                } else {
                    write!(f, "{}({constraints})", scalar.as_str())
                }
            }
            AnnotatedType::Literal { values } => {
                let rendered: Vec<String> = values.iter().map(ToString::to_string).collect();
                write!(f, "literal<{}>", rendered.join(", "))
            }
            AnnotatedType::List { items, constraints } => {
                if constraints.is_empty() {
                    write!(f, "list<{items}>")
                } else {
                    write!(f, "list<{items}>({constraints})")
                }
            }
            AnnotatedType::Map { values } => write!(f, "map<{values}>"),
            AnnotatedType::Tuple { members } => write!(f, "tuple<{}>", join(members)),
            AnnotatedType::Union { members } => write!(f, "union<{}>", join(members)),
            AnnotatedType::Optional { inner } => write!(f, "optional<{inner}>"),
            AnnotatedType::Named { name } => write!(f, "{name}"),
        }
    }
}
