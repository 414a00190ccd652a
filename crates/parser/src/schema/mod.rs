//! Schema algebra
//!
//! Schemas are loaded into an arena of [`MetaModel`]s keyed by the pointer
//! they were found at. From there [`SchemaContext`] normalizes them
//! (`allOf` folded, constraints pushed into `anyOf`/`oneOf` branches),
//! derives [`AnnotatedType`]s and extracts the classes a client needs.
//!
//! Every table lives in the context, so one context covers one build.

mod algebra;
mod annotate;
mod classes;
mod meta;

pub use meta::{AdditionalProperties, Kind, KindSet, MetaModel, ModelId};
pub(crate) use classes::derived_name;

use crate::naming::IdentifierStrategy;
use crate::openapi::Resolver;
use clientgen_common::{
    AnnotatedType, GeneratorError, Pointer, Result, SchemaClass, TypeName, Warning,
};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Normalization {
    InProgress,
    Done(Option<ModelId>),
}

/// Memo tables and arena for one build
pub struct SchemaContext<'a> {
    resolver: Resolver<'a>,
    naming: Box<dyn IdentifierStrategy + 'a>,

    models: Vec<MetaModel>,
    loaded: HashMap<Pointer, ModelId>,

    normalized: HashMap<ModelId, Normalization>,
    normalizing: Vec<ModelId>,
    intersections: HashMap<(ModelId, ModelId, Pointer), Option<ModelId>>,
    /// Deferred `allOf` nodes keyed by their flattened operands
    deferred: HashMap<BTreeSet<ModelId>, ModelId>,
    deferred_operands: HashMap<ModelId, BTreeSet<ModelId>>,

    annotations: HashMap<ModelId, AnnotatedType>,
    annotating: Vec<ModelId>,

    class_names: HashMap<ModelId, TypeName>,
    taken_names: HashSet<TypeName>,
    suggested_names: HashMap<Pointer, String>,
    classes: IndexMap<TypeName, SchemaClass>,
    collected: HashSet<ModelId>,

    warnings: Vec<Warning>,
}

impl<'a> SchemaContext<'a> {
    pub fn new(resolver: Resolver<'a>, naming: Box<dyn IdentifierStrategy + 'a>) -> Self {
        Self {
            resolver,
            naming,
            models: Vec::new(),
            loaded: HashMap::new(),
            normalized: HashMap::new(),
            normalizing: Vec::new(),
            intersections: HashMap::new(),
            deferred: HashMap::new(),
            deferred_operands: HashMap::new(),
            annotations: HashMap::new(),
            annotating: Vec::new(),
            class_names: HashMap::new(),
            taken_names: HashSet::new(),
            suggested_names: HashMap::new(),
            classes: IndexMap::new(),
            collected: HashSet::new(),
            warnings: Vec::new(),
        }
    }

    pub fn resolver(&self) -> Resolver<'a> {
        self.resolver
    }

    pub fn naming(&self) -> &dyn IdentifierStrategy {
        self.naming.as_ref()
    }

    pub fn model(&self, id: ModelId) -> &MetaModel {
        &self.models[id.0]
    }

    /// Record a non-fatal condition once and log it
    pub fn warn(&mut self, warning: Warning) {
        if !self.warnings.contains(&warning) {
            tracing::warn!("{}", warning);
            self.warnings.push(warning);
        }
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }

    fn push_model(&mut self, model: MetaModel) -> ModelId {
        let id = ModelId(self.models.len());
        self.models.push(model);
        id
    }

    /// Load the schema at `pointer` (following references)
    ///
    /// A pointer is loaded once; both the referring pointer and the target
    /// map to the same id. The slot is reserved before children are read,
    /// so self-referencing schemas load fine.
    pub fn load(&mut self, pointer: &Pointer) -> Result<ModelId> {
        if let Some(&id) = self.loaded.get(pointer) {
            return Ok(id);
        }

        let (target, node) = self.resolver.resolve(pointer)?;
        if let Some(&id) = self.loaded.get(&target) {
            self.loaded.insert(pointer.clone(), id);
            return Ok(id);
        }

        let id = self.push_model(MetaModel::new(target.clone()));
        self.loaded.insert(target.clone(), id);
        self.loaded.insert(pointer.clone(), id);

        let model = self.read_schema(&target, node)?;
        self.models[id.0] = model;
        Ok(id)
    }

    fn read_schema(&mut self, target: &Pointer, node: &'a Value) -> Result<MetaModel> {
        let mut model = MetaModel::new(target.clone());
        let map = match node {
            Value::Bool(true) => return Ok(model),
            Value::Bool(false) => {
                model.type_set = Some(KindSet::EMPTY);
                return Ok(model);
            }
            Value::Object(map) => map,
            _ => {
                return Err(GeneratorError::unsupported(
                    target,
                    "schema must be an object or a boolean",
                ))
            }
        };

        model.type_set = read_kinds(target, map)?;
        model.enum_values = map.get("enum").and_then(Value::as_array).cloned();
        if let Some(constant) = map.get("const") {
            model.enum_values = Some(vec![constant.clone()]);
        }

        read_bounds(&mut model, map);
        model.multiple_of = number(map, "multipleOf");

        model.min_length = count(map, "minLength");
        model.max_length = count(map, "maxLength");
        model.pattern = text(map, "pattern");
        model.format = text(map, "format");

        if let Some(items) = map.get("items") {
            if items.is_array() {
                return Err(GeneratorError::unsupported(
                    target,
                    "tuple-style `items` arrays are not supported",
                ));
            }
            model.items = Some(self.load(&target.push("items"))?);
        }
        model.min_items = count(map, "minItems");
        model.max_items = count(map, "maxItems");
        model.unique_items = flag(map, "uniqueItems");

        if let Some(properties) = map.get("properties").and_then(Value::as_object) {
            let base = target.push("properties");
            for name in properties.keys() {
                let child = self.load(&base.push(name.as_str()))?;
                model.properties.insert(name.clone(), child);
            }
        }
        if let Some(required) = map.get("required").and_then(Value::as_array) {
            model.required = required
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect();
        }
        model.additional_properties = match map.get("additionalProperties") {
            None => None,
            Some(Value::Bool(allowed)) => Some(AdditionalProperties::Allowed(*allowed)),
            Some(_) => Some(AdditionalProperties::Schema(
                self.load(&target.push("additionalProperties"))?,
            )),
        };
        model.min_properties = count(map, "minProperties");
        model.max_properties = count(map, "maxProperties");

        model.all_of = self.load_list(target, map, "allOf")?;
        model.any_of = self.load_list(target, map, "anyOf")?;
        model.one_of = self.load_list(target, map, "oneOf")?;

        if map.contains_key("not") {
            self.warn(Warning::UnsupportedKeyword {
                pointer: target.clone(),
                keyword: "not".to_string(),
            });
        }

        model.read_only = flag(map, "readOnly");
        model.write_only = flag(map, "writeOnly");
        model.deprecated = flag(map, "deprecated");
        model.title = text(map, "title");
        model.description = text(map, "description");
        model.default = map.get("default").cloned();
        model.name_hint = text(map, "x-name");
        model.class_hint = text(map, "x-class-name");

        if flag(map, "nullable") {
            match model.type_set {
                Some(kinds) => model.type_set = Some(kinds.with(Kind::Null)),
                None if model.has_combinators() => return Ok(self.nullable_wrapper(model)),
                None => {}
            }
        }

        Ok(model)
    }

    /// `{nullable: true, anyOf: [...]}` without a `type`: `anyOf[inner, null]`
    fn nullable_wrapper(&mut self, inner: MetaModel) -> MetaModel {
        let pointer = inner.pointer.clone();
        let null = MetaModel {
            type_set: Some(KindSet::single(Kind::Null)),
            ..MetaModel::new(pointer.push("nullable"))
        };
        let inner = self.push_model(inner);
        let null = self.push_model(null);
        MetaModel {
            any_of: vec![inner, null],
            ..MetaModel::new(pointer)
        }
    }

    fn load_list(
        &mut self,
        target: &Pointer,
        map: &Map<String, Value>,
        keyword: &str,
    ) -> Result<Vec<ModelId>> {
        let Some(members) = map.get(keyword) else {
            return Ok(Vec::new());
        };
        let members = members.as_array().ok_or_else(|| {
            GeneratorError::unsupported(target, format!("`{}` must be an array", keyword))
        })?;

        let base = target.push(keyword);
        (0..members.len())
            .map(|i| self.load(&base.index(i)))
            .collect()
    }

    /// Load, normalize and annotate the schema at `pointer`, registering
    /// every class it reaches
    ///
    /// Returns `None` when the schema can never match.
    pub fn annotate(&mut self, pointer: &Pointer, required: bool) -> Result<Option<AnnotatedType>> {
        let id = self.load(pointer)?;
        let annotation = self.as_annotation(id, required)?;
        if let Some(normalized) = self.normalize(id)? {
            self.collect(&[normalized])?;
        }
        Ok(annotation)
    }

    /// Prefer `name` for a class generated from the schema at `pointer`
    pub fn suggest_class_name(&mut self, pointer: &Pointer, name: impl Into<String>) {
        self.suggested_names
            .entry(pointer.clone())
            .or_insert_with(|| name.into());
    }
}

fn read_kinds(target: &Pointer, map: &Map<String, Value>) -> Result<Option<KindSet>> {
    let names: Vec<&str> = match map.get("type") {
        None => return Ok(None),
        Some(Value::String(name)) => vec![name.as_str()],
        Some(Value::Array(names)) => names.iter().filter_map(Value::as_str).collect(),
        Some(other) => {
            return Err(GeneratorError::unsupported(
                target,
                format!("invalid `type` {}", other),
            ))
        }
    };

    // every integer is also a number
    names.into_iter().try_fold(KindSet::EMPTY, |set, name| {
        match Kind::parse(name) {
            Some(Kind::Number) => Ok(set.with(Kind::Number).with(Kind::Integer)),
            Some(kind) => Ok(set.with(kind)),
            None => Err(GeneratorError::unsupported(target, format!("unknown type '{}'", name))),
        }
    })
    .map(Some)
}

/// Numeric bounds in both the boolean (3.0) and numeric (3.1) exclusive forms
fn read_bounds(model: &mut MetaModel, map: &Map<String, Value>) {
    let exclusive_min = map.get("exclusiveMinimum");
    let exclusive_max = map.get("exclusiveMaximum");

    if let Some(minimum) = number(map, "minimum") {
        if exclusive_min.and_then(Value::as_bool) == Some(true) {
            model.gt = Some(minimum);
        } else {
            model.ge = Some(minimum);
        }
    }
    if let Some(maximum) = number(map, "maximum") {
        if exclusive_max.and_then(Value::as_bool) == Some(true) {
            model.lt = Some(maximum);
        } else {
            model.le = Some(maximum);
        }
    }
    if let Some(gt) = exclusive_min.and_then(Value::as_f64) {
        model.gt = Some(model.gt.map_or(gt, |current| current.max(gt)));
    }
    if let Some(lt) = exclusive_max.and_then(Value::as_f64) {
        model.lt = Some(model.lt.map_or(lt, |current| current.min(lt)));
    }
}

fn number(map: &Map<String, Value>, key: &str) -> Option<f64> {
    map.get(key).and_then(Value::as_f64)
}

fn count(map: &Map<String, Value>, key: &str) -> Option<u64> {
    map.get(key).and_then(Value::as_u64)
}

fn text(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

fn flag(map: &Map<String, Value>, key: &str) -> bool {
    map.get(key).and_then(Value::as_bool).unwrap_or(false)
}
