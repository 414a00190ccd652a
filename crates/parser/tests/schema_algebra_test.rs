//! Integration test for the schema algebra

use clientgen_common::{AnnotatedType, GeneratorError, Pointer};
use clientgen_parser::openapi::Resolver;
use clientgen_parser::schema::{Kind, KindSet, ModelId};
use clientgen_parser::{EscapingIdentifiers, SchemaContext};
use serde_json::{json, Value};

fn context(doc: &Value) -> SchemaContext<'_> {
    SchemaContext::new(Resolver::new(doc), Box::new(EscapingIdentifiers::default()))
}

fn schema(name: &str) -> Pointer {
    Pointer::parse(&format!("#/components/schemas/{}", name)).unwrap()
}

fn load(ctx: &mut SchemaContext<'_>, name: &str) -> ModelId {
    ctx.load(&schema(name)).unwrap()
}

fn document(schemas: Value) -> Value {
    json!({"components": {"schemas": schemas}})
}

#[test]
fn test_resolver_detects_direct_and_indirect_cycles() {
    let doc = document(json!({
        "Self": {"$ref": "#/components/schemas/Self"},
        "A": {"$ref": "#/components/schemas/B"},
        "B": {"$ref": "#/components/schemas/C"},
        "C": {"$ref": "#/components/schemas/A"}
    }));
    let resolver = Resolver::new(&doc);

    match resolver.resolve(&schema("Self")) {
        Err(GeneratorError::ReferenceCycle { trail }) => assert_eq!(trail.len(), 2),
        other => panic!("expected a cycle, got {:?}", other.map(|(p, _)| p)),
    }

    match resolver.resolve(&schema("A")) {
        Err(GeneratorError::ReferenceCycle { trail }) => {
            assert_eq!(trail.first(), Some(&schema("A")));
            assert_eq!(trail.last(), Some(&schema("A")));
            assert_eq!(trail.len(), 4);
        }
        other => panic!("expected a cycle, got {:?}", other.map(|(p, _)| p)),
    }
}

#[test]
fn test_unknown_reference_is_unresolved() {
    let doc = document(json!({"Pet": {"$ref": "#/components/schemas/Missing"}}));
    let mut ctx = context(&doc);

    let err = ctx.load(&schema("Pet")).unwrap_err();
    assert!(matches!(err, GeneratorError::UnresolvedPointer { .. }));
}

#[test]
fn test_intersect_with_true_and_false() {
    let doc = document(json!({
        "Pet": {
            "type": "object",
            "required": ["name"],
            "properties": {"name": {"type": "string", "maxLength": 20}}
        },
        "Anything": true,
        "Nothing": false
    }));
    let mut ctx = context(&doc);
    let pet = load(&mut ctx, "Pet");
    let anything = load(&mut ctx, "Anything");
    let nothing = load(&mut ctx, "Nothing");

    let normal = ctx.normalize(pet).unwrap();
    assert!(normal.is_some());
    assert_eq!(ctx.intersect(pet, anything).unwrap(), normal);
    assert_eq!(ctx.intersect(anything, pet).unwrap(), normal);
    assert_eq!(ctx.intersect(pet, nothing).unwrap(), None);
    assert_eq!(ctx.intersect(nothing, pet).unwrap(), None);
}

#[test]
fn test_bottom_intersections_are_symmetric() {
    let doc = document(json!({
        "Text": {"type": "string"},
        "Count": {"type": "integer", "minimum": 0},
        "Small": {"type": "integer", "maximum": 5},
        "Large": {"type": "number", "exclusiveMinimum": 5},
        "Colors": {"enum": ["red", "green"]},
        "Shades": {"enum": ["blue"]},
        "Nullable": {"type": "string", "nullable": true}
    }));
    let mut ctx = context(&doc);
    let names = ["Text", "Count", "Small", "Large", "Colors", "Shades", "Nullable"];
    let ids: Vec<ModelId> = names.iter().map(|name| load(&mut ctx, name)).collect();

    for &a in &ids {
        for &b in &ids {
            let ab = ctx.intersect(a, b).unwrap();
            let ba = ctx.intersect(b, a).unwrap();
            assert_eq!(ab.is_none(), ba.is_none(), "{:?} and {:?}", a, b);
        }
    }

    let small = ids[2];
    let large = ids[3];
    assert_eq!(ctx.intersect(small, large).unwrap(), None);
    assert_eq!(ctx.intersect(ids[0], ids[1]).unwrap(), None);
    assert_eq!(ctx.intersect(ids[4], ids[5]).unwrap(), None);
}

#[test]
fn test_single_branch_collapses() {
    let doc = document(json!({
        "Pet": {"type": "object", "properties": {"name": {"type": "string"}}},
        "Wrapped": {"anyOf": [{"$ref": "#/components/schemas/Pet"}]},
        "Joined": {"allOf": [{"$ref": "#/components/schemas/Pet"}]}
    }));
    let mut ctx = context(&doc);
    let pet = load(&mut ctx, "Pet");
    let wrapped = load(&mut ctx, "Wrapped");
    let joined = load(&mut ctx, "Joined");

    let normal = ctx.normalize(pet).unwrap();
    assert_eq!(ctx.normalize(wrapped).unwrap(), normal);
    assert_eq!(ctx.normalize(joined).unwrap(), normal);
}

#[test]
fn test_closed_object_restricts_keys() {
    let doc = document(json!({
        "Closed": {
            "type": "object",
            "additionalProperties": false,
            "properties": {"x": {"type": "string"}}
        },
        "Open": {
            "type": "object",
            "properties": {"x": {"type": "string"}, "y": {"type": "integer"}}
        }
    }));
    let mut ctx = context(&doc);
    let closed = load(&mut ctx, "Closed");
    let open = load(&mut ctx, "Open");

    for (a, b) in [(closed, open), (open, closed)] {
        let both = ctx.intersect(a, b).unwrap().unwrap();
        let keys: Vec<&String> = ctx.model(both).properties.keys().collect();
        assert_eq!(keys, vec!["x"]);
    }
}

#[test]
fn test_normalize_is_idempotent() {
    let doc = document(json!({
        "Base": {"type": "object", "properties": {"id": {"type": "integer"}}},
        "Pet": {
            "allOf": [
                {"$ref": "#/components/schemas/Base"},
                {"properties": {"name": {"type": "string"}}, "required": ["name"]}
            ],
            "oneOf": [
                {"properties": {"kind": {"enum": ["cat"]}}},
                {"properties": {"kind": {"enum": ["dog"]}}}
            ]
        }
    }));
    let mut ctx = context(&doc);
    let pet = load(&mut ctx, "Pet");

    let normal = ctx.normalize(pet).unwrap().unwrap();
    assert_eq!(ctx.normalize(normal).unwrap(), Some(normal));
    assert_eq!(ctx.model(normal).any_of.len(), 2);
    assert!(ctx.model(normal).all_of.is_empty());
    assert!(ctx.model(normal).one_of.is_empty());

    for &branch in &ctx.model(normal).any_of.clone() {
        assert_eq!(ctx.normalize(branch).unwrap(), Some(branch));
        let mut keys: Vec<&String> = ctx.model(branch).properties.keys().collect();
        keys.sort();
        assert_eq!(keys, vec!["id", "kind", "name"]);
        assert!(ctx.model(branch).required.contains("name"));
    }
}

#[test]
fn test_constraints_are_pushed_into_branches() {
    let doc = document(json!({
        "Bounded": {
            "type": "integer",
            "oneOf": [{"maximum": 10}, {"minimum": 20}]
        }
    }));
    let mut ctx = context(&doc);
    let bounded = load(&mut ctx, "Bounded");

    let normal = ctx.normalize(bounded).unwrap().unwrap();
    let branches = ctx.model(normal).any_of.clone();
    assert_eq!(branches.len(), 2);

    let integer = KindSet::single(Kind::Integer);
    assert_eq!(ctx.model(branches[0]).type_set, Some(integer));
    assert_eq!(ctx.model(branches[0]).le, Some(10.0));
    assert_eq!(ctx.model(branches[1]).type_set, Some(integer));
    assert_eq!(ctx.model(branches[1]).ge, Some(20.0));

    let annotation = ctx.as_annotation(bounded, true).unwrap().unwrap();
    assert_eq!(
        annotation.to_string(),
        "union<integer(ge=20), integer(le=10)>"
    );
}

#[test]
fn test_nullable_branch_makes_union_optional() {
    let doc = document(json!({
        "Cat": {"type": "object", "properties": {"meow": {"type": "boolean"}}},
        "Dog": {"type": "object", "properties": {"bark": {"type": "boolean"}}},
        "Subject": {
            "anyOf": [
                {"$ref": "#/components/schemas/Cat"},
                {"$ref": "#/components/schemas/Dog"},
                {"type": "integer", "maximum": 20, "nullable": true}
            ]
        }
    }));
    let mut ctx = context(&doc);
    let annotation = ctx.annotate(&schema("Subject"), true).unwrap().unwrap();

    let AnnotatedType::Optional { inner } = &annotation else {
        panic!("expected an optional union, got {}", annotation);
    };
    assert_eq!(
        inner.to_string(),
        "union<components.schemas.Cat, components.schemas.Dog, integer(le=20)>"
    );
    assert_eq!(ctx.classes().len(), 2);
}

#[test]
fn test_combinator_cycle_is_fatal() {
    let doc = document(json!({
        "A": {"allOf": [{"$ref": "#/components/schemas/B"}, {"type": "object"}]},
        "B": {"allOf": [{"$ref": "#/components/schemas/A"}, {"type": "object"}]}
    }));
    let mut ctx = context(&doc);

    let err = ctx.annotate(&schema("A"), true).unwrap_err();
    assert!(matches!(err, GeneratorError::ReferenceCycle { .. }));
}

#[test]
fn test_recursive_properties_are_allowed() {
    let doc = document(json!({
        "Node": {
            "type": "object",
            "required": ["value"],
            "properties": {
                "value": {"type": "integer"},
                "next": {"$ref": "#/components/schemas/Node"},
                "children": {"type": "array", "items": {"$ref": "#/components/schemas/Node"}}
            }
        }
    }));
    let mut ctx = context(&doc);
    let annotation = ctx.annotate(&schema("Node"), true).unwrap().unwrap();
    assert_eq!(annotation.to_string(), "components.schemas.Node");

    let class = ctx.classes().values().next().unwrap().clone();
    assert_eq!(class.fields.len(), 3);
    assert_eq!(
        class.field("next").unwrap().annotation.to_string(),
        "optional<components.schemas.Node>"
    );
    assert_eq!(
        class.field("children").unwrap().annotation.to_string(),
        "optional<list<components.schemas.Node>>"
    );
}

#[test]
fn test_recursive_intersection_terminates() {
    let doc = document(json!({
        "Tree": {
            "type": "object",
            "properties": {"child": {"$ref": "#/components/schemas/Tree"}}
        },
        "Labelled": {
            "allOf": [
                {"$ref": "#/components/schemas/Tree"},
                {"properties": {"child": {"$ref": "#/components/schemas/Labelled"}, "label": {"type": "string"}}}
            ]
        }
    }));
    let mut ctx = context(&doc);
    let labelled = load(&mut ctx, "Labelled");

    let normal = ctx.normalize(labelled).unwrap().unwrap();
    let keys: Vec<&String> = ctx.model(normal).properties.keys().collect();
    assert_eq!(keys, vec!["child", "label"]);
    assert!(ctx.annotate(&schema("Labelled"), true).unwrap().is_some());
}
