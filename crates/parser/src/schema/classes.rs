//! Class extraction
//!
//! Object-shaped models with properties become [`SchemaClass`]es. Names are
//! derived from the pointer the model was found at: the module is the
//! container (`components.schemas`, `paths`), the class name comes from the
//! remaining segments unless a hint overrides it.

use super::meta::{AdditionalProperties, Kind, ModelId};
use super::SchemaContext;
use clientgen_common::{
    AnnotatedType, ClassBase, Field, Result, SchemaClass, TypeName, Warning,
};
use indexmap::IndexMap;
use std::collections::HashSet;

impl SchemaContext<'_> {
    /// Name of the class generated for a normalized model, allocated once
    pub fn class_name(&mut self, id: ModelId) -> TypeName {
        if let Some(name) = self.class_names.get(&id) {
            return name.clone();
        }

        let model = &self.models[id.0];
        let pointer = model.pointer.clone();
        let segments = pointer.segments();
        let module_len = match segments.first().map(String::as_str) {
            Some("components") => 2,
            Some(_) => 1,
            None => 0,
        }
        .min(segments.len().saturating_sub(1));

        let base = model
            .class_hint
            .clone()
            .or_else(|| self.suggested_names.get(&pointer).cloned())
            .unwrap_or_else(|| derived_name(&segments[module_len..]));

        let module = segments[..module_len].to_vec();
        let name = self.allocate_name(&module, &base);
        self.class_names.insert(id, name.clone());
        name
    }

    /// Reserve a unique class name in `module`, suffixing a counter on
    /// collision
    pub fn allocate_name(&mut self, module: &[String], base: &str) -> TypeName {
        let module: Vec<String> = module
            .iter()
            .map(|segment| self.naming.module_name(segment))
            .collect();
        let ident = self.naming.class_name(base);

        let mut candidate = TypeName::new(module, ident.clone());
        let mut counter = 2;
        while self.taken_names.contains(&candidate) {
            candidate.name = format!("{}{}", ident, counter);
            counter += 1;
        }
        self.taken_names.insert(candidate.clone());
        candidate
    }

    /// The class a normalized model materializes into, if any
    pub fn as_type(&mut self, id: ModelId) -> Result<Option<SchemaClass>> {
        let model = self.models[id.0].clone();
        if !model.effective_kinds().contains(Kind::Object)
            || !model.any_of.is_empty()
            || model.properties.is_empty()
        {
            return Ok(None);
        }

        let name = self.class_name(id);
        let mut fields = Vec::with_capacity(model.properties.len());
        let mut taken = HashSet::new();

        for (wire, &child) in &model.properties {
            let Some(normal) = self.normalize(child)? else {
                self.warn(Warning::BottomSchema {
                    pointer: self.models[child.0].pointer.clone(),
                });
                continue;
            };

            let required = model.required.contains(wire);
            let annotation = self.annotation_of(normal)?;
            let annotation = if required {
                annotation
            } else {
                AnnotatedType::optional(annotation)
            };

            let raw = &self.models[child.0];
            let declared_here = raw.pointer.last() == Some(wire.as_str())
                && raw.pointer.parent().last() == Some("properties");
            let effective = match (&raw.name_hint, declared_here) {
                (Some(hint), true) => hint.clone(),
                _ => wire.clone(),
            };
            let description = raw
                .description
                .clone()
                .or_else(|| self.models[normal.0].description.clone());
            let default = raw
                .default
                .clone()
                .or_else(|| self.models[normal.0].default.clone());
            let read_only = raw.read_only || self.models[normal.0].read_only;
            let write_only = raw.write_only || self.models[normal.0].write_only;

            let ident = self.naming.field_name(&effective);
            let mut field_name = ident.clone();
            let mut counter = 2;
            while !taken.insert(field_name.clone()) {
                field_name = format!("{}_{}", ident, counter);
                counter += 1;
            }

            fields.push(Field {
                name: field_name,
                alias: wire.clone(),
                annotation,
                required,
                read_only,
                write_only,
                description,
                default,
            });
        }

        Ok(Some(SchemaClass {
            name,
            base: ClassBase::Model,
            allow_extra: model.additional_properties
                != Some(AdditionalProperties::Allowed(false)),
            description: model.description.clone(),
            fields,
            pointer: model.pointer.clone(),
        }))
    }

    /// Normalized models a model's annotation can refer to
    pub fn dependencies(&mut self, id: ModelId) -> Result<Vec<ModelId>> {
        let model = self.models[id.0].clone();
        let mut raw: Vec<ModelId> = Vec::new();
        raw.extend(model.items);
        raw.extend(model.properties.values().copied());
        if let Some(AdditionalProperties::Schema(extra)) = model.additional_properties {
            raw.push(extra);
        }
        raw.extend(model.any_of.iter().copied());

        let mut deps = Vec::with_capacity(raw.len());
        for child in raw {
            if let Some(normal) = self.normalize(child)? {
                deps.push(normal);
            }
        }
        Ok(deps)
    }

    /// Register the class of every model reachable from `roots`, depth first
    pub fn collect(&mut self, roots: &[ModelId]) -> Result<()> {
        let mut stack: Vec<ModelId> = roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if !self.collected.insert(id) {
                continue;
            }
            if let Some(class) = self.as_type(id)? {
                tracing::debug!("extracted class {}", class.name);
                self.classes.entry(class.name.clone()).or_insert(class);
            }
            let deps = self.dependencies(id)?;
            stack.extend(deps.into_iter().rev());
        }
        Ok(())
    }

    /// Add a class that has no schema of its own (metadata aggregates)
    pub fn register_class(&mut self, class: SchemaClass) {
        self.classes.insert(class.name.clone(), class);
    }

    pub fn classes(&self) -> &IndexMap<TypeName, SchemaClass> {
        &self.classes
    }

    pub fn take_classes(&mut self) -> IndexMap<TypeName, SchemaClass> {
        std::mem::take(&mut self.classes)
    }
}

/// `Pet/properties/owner` → `PetOwner`, `/pets/{id}/get/...` → `PetsIdGet...`
pub(crate) fn derived_name(segments: &[String]) -> String {
    let mut words = Vec::new();
    let mut previous: Option<&str> = None;
    for segment in segments {
        let skip = matches!(segment.as_str(), "content" | "properties" | "schema")
            || previous == Some("content");
        previous = Some(segment.as_str());
        if skip {
            continue;
        }
        for word in segment.split(|c: char| !c.is_ascii_alphanumeric()) {
            let mut chars = word.chars();
            if let Some(first) = chars.next() {
                words.push(first.to_ascii_uppercase().to_string() + chars.as_str());
            }
        }
    }

    if words.is_empty() {
        "Model".to_string()
    } else {
        words.concat()
    }
}
