//! `normalize` and `intersect`

use super::meta::{AdditionalProperties, KindSet, MetaModel, ModelId};
use super::{Normalization, SchemaContext};
use clientgen_common::{GeneratorError, Pointer, Result};
use indexmap::IndexMap;
use std::collections::{BTreeSet, HashSet};

impl SchemaContext<'_> {
    /// Normalize a model: `allOf` folded in, `oneOf` merged into `anyOf`,
    /// every `anyOf` branch carrying the parent's own constraints
    ///
    /// Returns `None` for a schema that can never match. Normalized models
    /// are their own normal form.
    pub fn normalize(&mut self, id: ModelId) -> Result<Option<ModelId>> {
        match self.normalized.get(&id) {
            Some(Normalization::Done(result)) => return Ok(*result),
            Some(Normalization::InProgress) => return Err(self.normalization_cycle(id)),
            None => {}
        }

        self.normalized.insert(id, Normalization::InProgress);
        self.normalizing.push(id);
        let result = self.normalize_uncached(id);
        self.normalizing.pop();

        match result {
            Ok(normal) => {
                self.normalized.insert(id, Normalization::Done(normal));
                if let Some(normal) = normal {
                    self.normalized
                        .insert(normal, Normalization::Done(Some(normal)));
                }
                Ok(normal)
            }
            Err(e) => {
                self.normalized.remove(&id);
                Err(e)
            }
        }
    }

    fn normalization_cycle(&self, id: ModelId) -> GeneratorError {
        let start = self
            .normalizing
            .iter()
            .position(|&entry| entry == id)
            .unwrap_or(0);
        let mut trail: Vec<Pointer> = self.normalizing[start..]
            .iter()
            .map(|&entry| self.models[entry.0].pointer.clone())
            .collect();
        trail.push(self.models[id.0].pointer.clone());
        GeneratorError::ReferenceCycle { trail }
    }

    fn normalize_uncached(&mut self, id: ModelId) -> Result<Option<ModelId>> {
        let model = self.models[id.0].clone();
        if model.is_bottom() {
            return Ok(None);
        }

        if let Some(child) = model.sole_combinator_child() {
            let Some(inner) = self.normalize(child)? else {
                return Ok(None);
            };
            return match model.type_set {
                None => Ok(Some(inner)),
                Some(kinds) => {
                    let narrowing = MetaModel {
                        type_set: Some(kinds),
                        ..MetaModel::new(model.pointer.clone())
                    };
                    match self.insert_normalized(narrowing) {
                        Some(narrowing) => self.intersect_at(inner, narrowing, &model.pointer),
                        None => Ok(None),
                    }
                }
            };
        }

        let mut base = model.without_combinators();
        base.type_set.get_or_insert(KindSet::ALL);
        let Some(mut current) = self.insert_normalized(base) else {
            return Ok(None);
        };

        for &member in &model.all_of {
            match self.intersect_at(current, member, &model.pointer)? {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }

        let mut branches: Option<Vec<ModelId>> = None;
        for (keyword, members) in [("anyOf", &model.any_of), ("oneOf", &model.one_of)] {
            if members.is_empty() {
                continue;
            }

            let group = model.pointer.push(keyword);
            let mut survivors = Vec::new();
            for (i, &member) in members.iter().enumerate() {
                match self.intersect_at(member, current, &group.index(i))? {
                    Some(branch) => survivors.push(branch),
                    None => tracing::debug!("dropping bottom branch {}", group.index(i)),
                }
            }
            if survivors.is_empty() {
                return Ok(None);
            }

            branches = Some(match branches {
                None => survivors,
                Some(previous) => {
                    let combined = self.cross(&previous, &survivors, &model.pointer.push("anyOf"))?;
                    if combined.is_empty() {
                        return Ok(None);
                    }
                    combined
                }
            });
        }

        match branches {
            None => Ok(Some(current)),
            Some(branches) if branches.len() == 1 => Ok(Some(branches[0])),
            Some(branches) => {
                let node = MetaModel {
                    pointer: model.pointer.clone(),
                    any_of: branches,
                    ..self.models[current.0].clone()
                };
                Ok(self.insert_normalized(node))
            }
        }
    }

    /// Pairwise intersection of two branch lists, bottoms dropped
    fn cross(&mut self, left: &[ModelId], right: &[ModelId], at: &Pointer) -> Result<Vec<ModelId>> {
        let mut survivors = Vec::new();
        for &l in left {
            for &r in right {
                let slot = at.index(survivors.len());
                if let Some(branch) = self.intersect_at(l, r, &slot)? {
                    if !survivors.contains(&branch) {
                        survivors.push(branch);
                    }
                }
            }
        }
        Ok(survivors)
    }

    /// Store a model that is already in normal form
    fn insert_normalized(&mut self, mut model: MetaModel) -> Option<ModelId> {
        if let (Some(values), Some(kinds)) = (model.enum_values.as_mut(), model.type_set) {
            values.retain(|v| kinds.accepts_value(v));
        }
        if model.is_bottom() {
            return None;
        }

        let id = self.push_model(model);
        self.normalized.insert(id, Normalization::Done(Some(id)));
        Some(id)
    }

    /// Conjunction of two schemas, named after the left operand
    pub fn intersect(&mut self, a: ModelId, b: ModelId) -> Result<Option<ModelId>> {
        let at = self.models[a.0].pointer.clone();
        self.intersect_at(a, b, &at)
    }

    /// Conjunction of two schemas; a new node is located at `at`
    ///
    /// A result structurally equal to an operand is that operand.
    pub fn intersect_at(&mut self, a: ModelId, b: ModelId, at: &Pointer) -> Result<Option<ModelId>> {
        let Some(a) = self.normalize(a)? else {
            return Ok(None);
        };
        let Some(b) = self.normalize(b)? else {
            return Ok(None);
        };
        if a == b {
            return Ok(Some(a));
        }

        let key = (a, b, at.clone());
        if let Some(&result) = self.intersections.get(&key) {
            tracing::trace!("intersection memo hit at {}", at);
            return Ok(result);
        }

        let result = self.intersect_normalized(a, b, at)?;
        self.intersections.insert(key, result);
        Ok(result)
    }

    fn intersect_normalized(&mut self, a: ModelId, b: ModelId, at: &Pointer) -> Result<Option<ModelId>> {
        let ma = self.models[a.0].clone();
        let mb = self.models[b.0].clone();
        if mb.is_unconstrained() {
            return Ok(Some(a));
        }
        if ma.is_unconstrained() {
            return Ok(Some(b));
        }

        let kinds = ma
            .type_set
            .unwrap_or(KindSet::ALL)
            .intersection(mb.type_set.unwrap_or(KindSet::ALL));

        let mut out = MetaModel {
            type_set: Some(kinds),
            enum_values: match (&ma.enum_values, &mb.enum_values) {
                (Some(x), Some(y)) => Some(x.iter().filter(|v| y.contains(v)).cloned().collect()),
                (x, y) => x.clone().or_else(|| y.clone()),
            },
            gt: max_bound(ma.gt, mb.gt),
            ge: max_bound(ma.ge, mb.ge),
            lt: min_bound(ma.lt, mb.lt),
            le: min_bound(ma.le, mb.le),
            multiple_of: same_or_conflict(&ma, ma.multiple_of, mb.multiple_of, "multipleOf")?,
            min_length: max_bound(ma.min_length, mb.min_length),
            max_length: min_bound(ma.max_length, mb.max_length),
            pattern: same_or_conflict(&ma, ma.pattern.clone(), mb.pattern.clone(), "pattern")?,
            format: same_or_conflict(&ma, ma.format.clone(), mb.format.clone(), "format")?,
            min_items: max_bound(ma.min_items, mb.min_items),
            max_items: min_bound(ma.max_items, mb.max_items),
            unique_items: ma.unique_items || mb.unique_items,
            required: ma.required.union(&mb.required).cloned().collect(),
            min_properties: max_bound(ma.min_properties, mb.min_properties),
            max_properties: min_bound(ma.max_properties, mb.max_properties),
            read_only: ma.read_only || mb.read_only,
            write_only: ma.write_only || mb.write_only,
            deprecated: ma.deprecated || mb.deprecated,
            title: ma.title.clone().or_else(|| mb.title.clone()),
            description: ma.description.clone().or_else(|| mb.description.clone()),
            default: ma.default.clone().or_else(|| mb.default.clone()),
            name_hint: ma.name_hint.clone().or_else(|| mb.name_hint.clone()),
            class_hint: ma.class_hint.clone().or_else(|| mb.class_hint.clone()),
            ..MetaModel::new(at.clone())
        };

        out.items = match (ma.items, mb.items) {
            (Some(x), Some(y)) => match self.intersect_child(x, y, &at.push("items"))? {
                Some(items) => Some(items),
                None => return Ok(None),
            },
            (x, y) => x.or(y),
        };

        out.additional_properties = match (ma.additional_properties, mb.additional_properties) {
            (None | Some(AdditionalProperties::Allowed(true)), other)
            | (other, None | Some(AdditionalProperties::Allowed(true))) => other,
            (Some(AdditionalProperties::Allowed(false)), _)
            | (_, Some(AdditionalProperties::Allowed(false))) => {
                Some(AdditionalProperties::Allowed(false))
            }
            (Some(AdditionalProperties::Schema(x)), Some(AdditionalProperties::Schema(y))) => {
                match self.intersect_child(x, y, &at.push("additionalProperties"))? {
                    Some(z) => Some(AdditionalProperties::Schema(z)),
                    None => Some(AdditionalProperties::Allowed(false)),
                }
            }
        };

        match self.merge_properties(&ma, &mb, at)? {
            Some(properties) => out.properties = properties,
            None => return Ok(None),
        }

        if !ma.any_of.is_empty() || !mb.any_of.is_empty() {
            let left = if ma.any_of.is_empty() { vec![a] } else { ma.any_of.clone() };
            let right = if mb.any_of.is_empty() { vec![b] } else { mb.any_of.clone() };
            let survivors = self.cross(&left, &right, &at.push("anyOf"))?;
            match survivors.len() {
                0 => return Ok(None),
                1 => return Ok(Some(survivors[0])),
                _ => out.any_of = survivors,
            }
        }

        if out.constraints_eq(&ma) {
            return Ok(Some(a));
        }
        if out.constraints_eq(&mb) {
            return Ok(Some(b));
        }
        Ok(self.insert_normalized(out))
    }

    /// Key-wise merge; a closed side restricts the candidate keys to its own
    fn merge_properties(
        &mut self,
        ma: &MetaModel,
        mb: &MetaModel,
        at: &Pointer,
    ) -> Result<Option<IndexMap<String, ModelId>>> {
        let closed_a = ma.additional_properties == Some(AdditionalProperties::Allowed(false));
        let closed_b = mb.additional_properties == Some(AdditionalProperties::Allowed(false));
        let extra_a = match ma.additional_properties {
            Some(AdditionalProperties::Schema(s)) => Some(s),
            _ => None,
        };
        let extra_b = match mb.additional_properties {
            Some(AdditionalProperties::Schema(s)) => Some(s),
            _ => None,
        };

        let keys: Vec<&String> = ma
            .properties
            .keys()
            .chain(mb.properties.keys().filter(|k| !ma.properties.contains_key(*k)))
            .filter(|k| !closed_a || ma.properties.contains_key(*k))
            .filter(|k| !closed_b || mb.properties.contains_key(*k))
            .collect();

        let base = at.push("properties");
        let mut merged = IndexMap::new();
        for key in keys {
            let slot = base.push(key.as_str());
            let child = match (ma.properties.get(key), mb.properties.get(key)) {
                (Some(&x), Some(&y)) => self.intersect_child(x, y, &slot)?,
                (Some(&x), None) => match extra_b {
                    Some(extra) => self.intersect_child(x, extra, &slot)?,
                    None => Some(x),
                },
                (None, Some(&y)) => match extra_a {
                    Some(extra) => self.intersect_child(extra, y, &slot)?,
                    None => Some(y),
                },
                (None, None) => continue,
            };
            match child {
                Some(child) => {
                    merged.insert(key.clone(), child);
                }
                None => return Ok(None),
            }
        }
        Ok(Some(merged))
    }

    /// Intersect two child schemas (properties, items, additional properties)
    ///
    /// Children are raw ids. When either side reaches a model that is being
    /// normalized right now, the conjunction is stored as a plain `allOf`
    /// node and normalized on first use instead. Deferred nodes over the
    /// same operands are shared, so recursive conjunctions reach a fixed
    /// point.
    fn intersect_child(&mut self, x: ModelId, y: ModelId, at: &Pointer) -> Result<Option<ModelId>> {
        if x == y {
            return Ok(Some(x));
        }

        if self.reaches_in_progress(x) || self.reaches_in_progress(y) {
            let mut operands = self.deferred_operands_of(x);
            operands.extend(self.deferred_operands_of(y));
            if operands.len() == 1 {
                return Ok(operands.into_iter().next());
            }
            if let Some(&existing) = self.deferred.get(&operands) {
                return Ok(Some(existing));
            }

            tracing::debug!("deferring intersection at {}", at);
            let deferred = MetaModel {
                all_of: operands.iter().copied().collect(),
                ..MetaModel::new(at.clone())
            };
            let id = self.push_model(deferred);
            self.deferred.insert(operands.clone(), id);
            self.deferred_operands.insert(id, operands);
            return Ok(Some(id));
        }

        let (Some(nx), Some(ny)) = (self.normalize(x)?, self.normalize(y)?) else {
            return Ok(None);
        };
        Ok(match self.intersect_at(nx, ny, at)? {
            Some(result) if result == nx => Some(x),
            Some(result) if result == ny => Some(y),
            other => other,
        })
    }

    fn deferred_operands_of(&self, id: ModelId) -> BTreeSet<ModelId> {
        self.deferred_operands
            .get(&id)
            .cloned()
            .unwrap_or_else(|| BTreeSet::from([id]))
    }

    /// Whether normalizing `id` would re-enter a model under normalization
    fn reaches_in_progress(&self, id: ModelId) -> bool {
        let mut stack = vec![id];
        let mut seen = HashSet::new();
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            match self.normalized.get(&current) {
                Some(Normalization::InProgress) => return true,
                Some(Normalization::Done(_)) => continue,
                None => {}
            }
            let model = &self.models[current.0];
            stack.extend(model.all_of.iter().chain(&model.any_of).chain(&model.one_of));
        }
        false
    }
}

fn max_bound<T: PartialOrd>(a: Option<T>, b: Option<T>) -> Option<T> {
    match (a, b) {
        (Some(x), Some(y)) => Some(if y > x { y } else { x }),
        (x, y) => x.or(y),
    }
}

fn min_bound<T: PartialOrd>(a: Option<T>, b: Option<T>) -> Option<T> {
    match (a, b) {
        (Some(x), Some(y)) => Some(if y < x { y } else { x }),
        (x, y) => x.or(y),
    }
}

/// Keywords that cannot be combined: both sides must agree
fn same_or_conflict<T: PartialEq + std::fmt::Debug>(
    left: &MetaModel,
    a: Option<T>,
    b: Option<T>,
    keyword: &str,
) -> Result<Option<T>> {
    match (a, b) {
        (Some(x), Some(y)) if x != y => Err(GeneratorError::unsupported(
            &left.pointer,
            format!("conflicting `{}` values {:?} and {:?}", keyword, x, y),
        )),
        (x, y) => Ok(x.or(y)),
    }
}
