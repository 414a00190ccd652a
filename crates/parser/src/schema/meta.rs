//! Normalized structural representation of a schema node

use clientgen_common::{Constraints, Pointer};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

/// JSON value kinds a schema may admit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    Object,
    Array,
    String,
    Number,
    Integer,
    Boolean,
    Null,
}

impl Kind {
    pub const ALL: [Kind; 7] = [
        Kind::Object,
        Kind::Array,
        Kind::String,
        Kind::Number,
        Kind::Integer,
        Kind::Boolean,
        Kind::Null,
    ];

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "object" => Some(Kind::Object),
            "array" => Some(Kind::Array),
            "string" => Some(Kind::String),
            "number" => Some(Kind::Number),
            "integer" => Some(Kind::Integer),
            "boolean" => Some(Kind::Boolean),
            "null" => Some(Kind::Null),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Object => "object",
            Kind::Array => "array",
            Kind::String => "string",
            Kind::Number => "number",
            Kind::Integer => "integer",
            Kind::Boolean => "boolean",
            Kind::Null => "null",
        }
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// Bitset of [`Kind`]s
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct KindSet(u8);

impl KindSet {
    pub const EMPTY: KindSet = KindSet(0);
    pub const ALL: KindSet = KindSet(0b0111_1111);

    pub fn single(kind: Kind) -> Self {
        KindSet(kind.bit())
    }

    pub fn of(kinds: &[Kind]) -> Self {
        kinds.iter().fold(Self::EMPTY, |set, &k| set.with(k))
    }

    pub fn with(self, kind: Kind) -> Self {
        KindSet(self.0 | kind.bit())
    }

    pub fn contains(self, kind: Kind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn intersection(self, other: KindSet) -> Self {
        KindSet(self.0 & other.0)
    }

    pub fn union(self, other: KindSet) -> Self {
        KindSet(self.0 | other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn is_subset(self, other: KindSet) -> bool {
        self.0 & !other.0 == 0
    }

    /// Only `number` and/or `integer`
    pub fn is_numeric(self) -> bool {
        !self.is_empty() && self.is_subset(KindSet::of(&[Kind::Number, Kind::Integer]))
    }

    pub fn iter(self) -> impl Iterator<Item = Kind> {
        Kind::ALL.into_iter().filter(move |k| self.contains(*k))
    }

    /// Whether a literal value belongs to one of the kinds
    pub fn accepts_value(self, value: &Value) -> bool {
        match value {
            Value::Null => self.contains(Kind::Null),
            Value::Bool(_) => self.contains(Kind::Boolean),
            Value::Number(n) => {
                let integral =
                    n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0);
                self.contains(Kind::Number) || (integral && self.contains(Kind::Integer))
            }
            Value::String(_) => self.contains(Kind::String),
            Value::Array(_) => self.contains(Kind::Array),
            Value::Object(_) => self.contains(Kind::Object),
        }
    }
}

impl fmt::Debug for KindSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(Kind::as_str)).finish()
    }
}

/// Index of a [`MetaModel`] in the schema arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdditionalProperties {
    Allowed(bool),
    Schema(ModelId),
}

/// Structural view of one schema node
///
/// Child schemas are arena ids. The pointer only names the node; it takes no
/// part in [`MetaModel::constraints_eq`].
#[derive(Debug, Clone, Default)]
pub struct MetaModel {
    pub pointer: Pointer,

    /// `None` until normalized: any kind
    pub type_set: Option<KindSet>,
    pub enum_values: Option<Vec<Value>>,

    pub gt: Option<f64>,
    pub ge: Option<f64>,
    pub lt: Option<f64>,
    pub le: Option<f64>,
    pub multiple_of: Option<f64>,

    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub pattern: Option<String>,
    pub format: Option<String>,

    pub items: Option<ModelId>,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    pub unique_items: bool,

    pub properties: IndexMap<String, ModelId>,
    pub required: BTreeSet<String>,
    pub additional_properties: Option<AdditionalProperties>,
    pub min_properties: Option<u64>,
    pub max_properties: Option<u64>,

    pub all_of: Vec<ModelId>,
    pub any_of: Vec<ModelId>,
    pub one_of: Vec<ModelId>,

    pub read_only: bool,
    pub write_only: bool,
    pub deprecated: bool,
    pub title: Option<String>,
    pub description: Option<String>,
    pub default: Option<Value>,

    /// `x-name`: effective name of the field or parameter using this schema
    pub name_hint: Option<String>,

    /// `x-class-name`: name of the class generated from this schema
    pub class_hint: Option<String>,
}

impl MetaModel {
    pub fn new(pointer: Pointer) -> Self {
        Self {
            pointer,
            ..Default::default()
        }
    }

    /// Admits no value at all
    pub fn is_bottom(&self) -> bool {
        self.type_set.is_some_and(KindSet::is_empty)
            || self.enum_values.as_ref().is_some_and(Vec::is_empty)
            || self.numeric_infeasible()
    }

    fn numeric_infeasible(&self) -> bool {
        if !self.type_set.is_some_and(KindSet::is_numeric) {
            return false;
        }
        let lower = match (self.gt, self.ge) {
            (Some(gt), Some(ge)) if ge > gt => Some((ge, false)),
            (Some(gt), _) => Some((gt, true)),
            (None, Some(ge)) => Some((ge, false)),
            (None, None) => None,
        };
        let upper = match (self.lt, self.le) {
            (Some(lt), Some(le)) if le < lt => Some((le, false)),
            (Some(lt), _) => Some((lt, true)),
            (None, Some(le)) => Some((le, false)),
            (None, None) => None,
        };
        match (lower, upper) {
            (Some((lo, lo_strict)), Some((hi, hi_strict))) => {
                lo > hi || (lo == hi && (lo_strict || hi_strict))
            }
            _ => false,
        }
    }

    /// Accepts every value (`true`, `{}`, or a node carrying only descriptions
    /// and the `readOnly`/`writeOnly` field flags)
    pub fn is_unconstrained(&self) -> bool {
        self.type_set.map_or(true, |set| set == KindSet::ALL)
            && self.constraints_eq(&MetaModel {
                type_set: self.type_set,
                read_only: self.read_only,
                write_only: self.write_only,
                ..Default::default()
            })
    }

    pub fn has_combinators(&self) -> bool {
        !self.all_of.is_empty() || !self.any_of.is_empty() || !self.one_of.is_empty()
    }

    pub fn without_combinators(&self) -> MetaModel {
        MetaModel {
            all_of: Vec::new(),
            any_of: Vec::new(),
            one_of: Vec::new(),
            ..self.clone()
        }
    }

    /// The child of a lone single-member combinator on an otherwise
    /// unconstrained node (a kind narrowing is allowed)
    pub fn sole_combinator_child(&self) -> Option<ModelId> {
        let lists = [&self.all_of, &self.any_of, &self.one_of];
        let mut non_empty = lists.iter().filter(|list| !list.is_empty());
        let only = non_empty.next()?;
        if non_empty.next().is_some() || only.len() != 1 {
            return None;
        }
        let rest = MetaModel {
            type_set: None,
            ..self.without_combinators()
        };
        rest.is_unconstrained().then_some(only[0])
    }

    /// Structural equality of everything that restricts values
    pub fn constraints_eq(&self, other: &MetaModel) -> bool {
        self.type_set == other.type_set
            && self.enum_values == other.enum_values
            && self.gt == other.gt
            && self.ge == other.ge
            && self.lt == other.lt
            && self.le == other.le
            && self.multiple_of == other.multiple_of
            && self.min_length == other.min_length
            && self.max_length == other.max_length
            && self.pattern == other.pattern
            && self.format == other.format
            && self.items == other.items
            && self.min_items == other.min_items
            && self.max_items == other.max_items
            && self.unique_items == other.unique_items
            && self.properties == other.properties
            && self.required == other.required
            && self.additional_properties == other.additional_properties
            && self.min_properties == other.min_properties
            && self.max_properties == other.max_properties
            && self.all_of == other.all_of
            && self.any_of == other.any_of
            && self.one_of == other.one_of
            && self.read_only == other.read_only
            && self.write_only == other.write_only
    }

    /// Kinds to consider when annotating. Without a declared `type`, the
    /// kind-specific keywords present decide (`properties` means object).
    pub fn effective_kinds(&self) -> KindSet {
        let declared = self.type_set.unwrap_or(KindSet::ALL);
        if declared != KindSet::ALL {
            return declared;
        }

        let mut implied = KindSet::EMPTY;
        if !self.properties.is_empty()
            || !self.required.is_empty()
            || self.additional_properties.is_some()
            || self.min_properties.is_some()
            || self.max_properties.is_some()
        {
            implied = implied.with(Kind::Object);
        }
        if self.items.is_some() || self.min_items.is_some() || self.max_items.is_some() {
            implied = implied.with(Kind::Array);
        }
        if self.min_length.is_some()
            || self.max_length.is_some()
            || self.pattern.is_some()
            || self.format.is_some()
        {
            implied = implied.with(Kind::String);
        }
        if [self.gt, self.ge, self.lt, self.le, self.multiple_of]
            .iter()
            .any(Option::is_some)
        {
            implied = implied.with(Kind::Number);
        }

        if implied.is_empty() {
            declared
        } else {
            implied
        }
    }

    pub fn numeric_constraints(&self) -> Constraints {
        Constraints {
            gt: self.gt,
            ge: self.ge,
            lt: self.lt,
            le: self.le,
            multiple_of: self.multiple_of,
            ..Default::default()
        }
    }

    pub fn string_constraints(&self) -> Constraints {
        Constraints {
            min_length: self.min_length,
            max_length: self.max_length,
            pattern: self.pattern.clone(),
            ..Default::default()
        }
    }

    pub fn array_constraints(&self) -> Constraints {
        Constraints {
            min_items: self.min_items,
            max_items: self.max_items,
            unique_items: self.unique_items,
            ..Default::default()
        }
    }
}
