//! MetaModel → AnnotatedType

use super::meta::{AdditionalProperties, Kind, ModelId};
use super::SchemaContext;
use clientgen_common::{AnnotatedType, GeneratorError, Pointer, Result, ScalarKind, Warning};

impl SchemaContext<'_> {
    /// Annotation of a (raw) model at a value position
    ///
    /// Positions that are not required are wrapped in `Optional`. Returns
    /// `None` when the schema can never match.
    pub fn as_annotation(&mut self, id: ModelId, required: bool) -> Result<Option<AnnotatedType>> {
        let Some(normal) = self.normalize(id)? else {
            return Ok(None);
        };
        let annotation = self.annotation_of(normal)?;
        Ok(Some(if required {
            annotation
        } else {
            AnnotatedType::optional(annotation)
        }))
    }

    /// Annotation of a normalized model, memoized per model
    pub(crate) fn annotation_of(&mut self, id: ModelId) -> Result<AnnotatedType> {
        if let Some(annotation) = self.annotations.get(&id) {
            return Ok(annotation.clone());
        }
        if let Some(start) = self.annotating.iter().position(|&entry| entry == id) {
            // a list or map that contains itself with no class in between
            let mut trail: Vec<Pointer> = self.annotating[start..]
                .iter()
                .map(|&entry| self.models[entry.0].pointer.clone())
                .collect();
            trail.push(self.models[id.0].pointer.clone());
            return Err(GeneratorError::ReferenceCycle { trail });
        }

        self.annotating.push(id);
        let result = self.annotate_uncached(id);
        self.annotating.pop();

        let annotation = result?;
        self.annotations.insert(id, annotation.clone());
        Ok(annotation)
    }

    fn annotate_uncached(&mut self, id: ModelId) -> Result<AnnotatedType> {
        let model = self.models[id.0].clone();
        if model.is_unconstrained() {
            return Ok(AnnotatedType::Any);
        }

        if !model.any_of.is_empty() {
            let mut members = Vec::with_capacity(model.any_of.len());
            for &branch in &model.any_of {
                members.push(self.annotation_of(branch)?);
            }
            return Ok(AnnotatedType::union(members));
        }

        let kinds = model.effective_kinds();

        if let Some(values) = &model.enum_values {
            let literals: Vec<_> = values.iter().filter(|v| !v.is_null()).cloned().collect();
            let mut members = Vec::new();
            if !literals.is_empty() {
                members.push(AnnotatedType::Literal { values: literals });
            }
            if kinds.contains(Kind::Null) || values.iter().any(|v| v.is_null()) {
                members.push(AnnotatedType::Null);
            }
            return Ok(AnnotatedType::union(members));
        }

        let mut members = Vec::new();
        for kind in kinds.iter() {
            let member = match kind {
                Kind::Object => {
                    if !model.properties.is_empty() {
                        AnnotatedType::named(self.class_name(id))
                    } else if let Some(AdditionalProperties::Schema(values)) =
                        model.additional_properties
                    {
                        match self.normalize(values)? {
                            Some(values) => AnnotatedType::Map {
                                values: Box::new(self.annotation_of(values)?),
                            },
                            None => AnnotatedType::AnyObject,
                        }
                    } else {
                        AnnotatedType::AnyObject
                    }
                }
                Kind::Array => {
                    let items = match model.items {
                        None => AnnotatedType::Any,
                        Some(items) => match self.normalize(items)? {
                            Some(items) => self.annotation_of(items)?,
                            None => {
                                self.warn(Warning::BottomSchema {
                                    pointer: self.models[items.0].pointer.clone(),
                                });
                                AnnotatedType::Any
                            }
                        },
                    };
                    AnnotatedType::List {
                        items: Box::new(items),
                        constraints: model.array_constraints(),
                    }
                }
                Kind::String => AnnotatedType::Scalar {
                    scalar: string_scalar(model.format.as_deref()),
                    constraints: model.string_constraints(),
                },
                Kind::Number => AnnotatedType::Scalar {
                    scalar: ScalarKind::Number,
                    constraints: model.numeric_constraints(),
                },
                // number already admits every integer
                Kind::Integer if kinds.contains(Kind::Number) => continue,
                Kind::Integer => AnnotatedType::Scalar {
                    scalar: ScalarKind::Integer,
                    constraints: model.numeric_constraints(),
                },
                Kind::Boolean => AnnotatedType::scalar(ScalarKind::Boolean),
                Kind::Null => AnnotatedType::Null,
            };
            members.push(member);
        }

        Ok(AnnotatedType::union(members))
    }
}

fn string_scalar(format: Option<&str>) -> ScalarKind {
    match format {
        Some("uuid") => ScalarKind::Uuid,
        Some("date") => ScalarKind::Date,
        Some("date-time") => ScalarKind::DateTime,
        Some("time") => ScalarKind::Time,
        Some("decimal") => ScalarKind::Decimal,
        Some("binary") | Some("byte") => ScalarKind::Bytes,
        _ => ScalarKind::String,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::EscapingIdentifiers;
    use crate::openapi::Resolver;
    use clientgen_common::{Constraints, TypeName};
    use serde_json::{json, Value};

    fn annotate(schema: Value) -> Result<Option<AnnotatedType>> {
        let doc = json!({"components": {"schemas": {"Subject": schema}}});
        let mut ctx = SchemaContext::new(
            Resolver::new(&doc),
            Box::new(EscapingIdentifiers::default()),
        );
        let id = ctx.load(&Pointer::parse("#/components/schemas/Subject")?)?;
        ctx.as_annotation(id, true)
    }

    fn component(name: &str) -> AnnotatedType {
        AnnotatedType::named(TypeName::new(
            vec!["components".to_string(), "schemas".to_string()],
            name,
        ))
    }

    #[test]
    fn test_scalars_and_formats() {
        assert_eq!(
            annotate(json!({"type": "string", "format": "uuid"})).unwrap(),
            Some(AnnotatedType::scalar(ScalarKind::Uuid))
        );
        assert_eq!(
            annotate(json!({"type": "string", "format": "date-time"})).unwrap(),
            Some(AnnotatedType::scalar(ScalarKind::DateTime))
        );
        assert_eq!(
            annotate(json!({"type": "integer", "maximum": 10}))
                .unwrap()
                .unwrap()
                .to_string(),
            "integer(le=10)"
        );
        assert_eq!(annotate(json!({})).unwrap(), Some(AnnotatedType::Any));
        assert_eq!(annotate(json!(false)).unwrap(), None);
    }

    #[test]
    fn test_access_flags_alone_are_any() {
        assert_eq!(
            annotate(json!({"readOnly": true, "description": "server id"})).unwrap(),
            Some(AnnotatedType::Any)
        );
        assert_eq!(
            annotate(json!({"writeOnly": true})).unwrap(),
            Some(AnnotatedType::Any)
        );
        assert_eq!(
            annotate(json!({"readOnly": true, "type": "integer"})).unwrap(),
            Some(AnnotatedType::scalar(ScalarKind::Integer))
        );
    }

    #[test]
    fn test_nullable_scalar_is_optional() {
        let annotation = annotate(json!({"type": "string", "nullable": true, "maxLength": 3}))
            .unwrap()
            .unwrap();
        assert_eq!(
            annotation,
            AnnotatedType::optional(AnnotatedType::Scalar {
                scalar: ScalarKind::String,
                constraints: Constraints {
                    max_length: Some(3),
                    ..Default::default()
                },
            })
        );
    }

    #[test]
    fn test_enum_is_literal() {
        let annotation = annotate(json!({"type": "string", "enum": ["a", "b", 3]}))
            .unwrap()
            .unwrap();
        assert_eq!(
            annotation,
            AnnotatedType::Literal {
                values: vec![json!("a"), json!("b")]
            }
        );
    }

    #[test]
    fn test_object_shapes() {
        assert_eq!(
            annotate(json!({"type": "object", "properties": {"id": {"type": "integer"}}})).unwrap(),
            Some(component("Subject"))
        );
        assert_eq!(
            annotate(json!({"type": "object", "additionalProperties": {"type": "string"}})).unwrap(),
            Some(AnnotatedType::Map {
                values: Box::new(AnnotatedType::scalar(ScalarKind::String))
            })
        );
        assert_eq!(
            annotate(json!({"type": "object"})).unwrap(),
            Some(AnnotatedType::AnyObject)
        );
        // properties without a declared type still make a class
        assert_eq!(
            annotate(json!({"properties": {"id": {"type": "integer"}}})).unwrap(),
            Some(component("Subject"))
        );
    }

    #[test]
    fn test_array_of_itself_is_a_cycle() {
        let err = annotate(json!({"type": "array", "items": {"$ref": "#/components/schemas/Subject"}}))
            .unwrap_err();
        assert!(matches!(err, GeneratorError::ReferenceCycle { .. }));
    }

    #[test]
    fn test_array_of_bottom_items_warns() {
        let doc = json!({"components": {"schemas": {"Subject": {"type": "array", "items": false}}}});
        let mut ctx = SchemaContext::new(
            Resolver::new(&doc),
            Box::new(EscapingIdentifiers::default()),
        );
        let id = ctx
            .load(&Pointer::parse("#/components/schemas/Subject").unwrap())
            .unwrap();

        let annotation = ctx.as_annotation(id, false).unwrap().unwrap();
        assert_eq!(
            annotation,
            AnnotatedType::optional(AnnotatedType::list(AnnotatedType::Any))
        );
        assert!(matches!(ctx.warnings(), [Warning::BottomSchema { .. }]));
    }
}
