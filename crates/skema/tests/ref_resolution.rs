use skema::{
    KeywordSchema, LoadedSchema, PreloadedSchemaClient, SchemaLoadError, SchemaLoader, SchemaNode,
    ValidationFailure, Validator,
};
use skema_json::{JsonParser, JsonValue};

fn parse(text: &str) -> JsonValue {
    JsonParser::new(text).parse().unwrap()
}

fn load(text: &str) -> LoadedSchema {
    SchemaLoader::new(parse(text)).load().unwrap()
}

fn check(schema: &LoadedSchema, instance: &str) -> Option<ValidationFailure> {
    Validator::for_schema(schema).validate(&parse(instance))
}

// ==== Self Reference Tests ====

#[test]
fn self_reference_resolves_to_the_root_node() {
    let schema = load(r##"{"$ref": "#"}"##);
    let SchemaNode::Composite(root) = schema.graph().node(schema.root()) else {
        panic!("root should be a composite");
    };
    let KeywordSchema::Ref { reference, .. } = &root.keywords[0] else {
        panic!("root should carry a $ref");
    };
    let SchemaNode::Ref(reference) = schema.graph().node(*reference) else {
        panic!("reference node expected");
    };
    assert_eq!(reference.target(), Some(schema.root()));
}

#[test]
fn recursive_schema_validates_finite_instances() {
    let schema = load(
        r##"{
            "type": "object",
            "properties": {
                "children": {"type": "array", "items": {"$ref": "#"}}
            }
        }"##,
    );
    assert!(check(&schema, r##"{"children": [{"children": []}, {}]}"##).is_none());
    let failure = check(&schema, r##"{"children": [{"children": [5]}]}"##).unwrap();
    assert_eq!(failure.message, "expected type: object, actual: integer");
    assert_eq!(
        failure.instance_location.pointer.to_string(),
        "#/children/0/children/0"
    );
}

// ==== Pointer Fragment Tests ====

#[test]
fn forward_pointer_reference_into_defs() {
    let schema = load(
        r##"{
            "properties": {"a": {"$ref": "#/$defs/b"}},
            "$defs": {"b": {"type": "string"}}
        }"##,
    );
    assert!(check(&schema, r##"{"a": "x"}"##).is_none());
    let failure = check(&schema, r##"{"a": 1}"##).unwrap();
    assert_eq!(failure.message, "expected type: string, actual: integer");
    assert_eq!(
        failure.dynamic_path.to_string(),
        "#/properties/a/$ref/type"
    );
    assert_eq!(failure.schema_location.pointer.to_string(), "#/$defs/b/type");
}

#[test]
fn escaped_pointer_segments_resolve() {
    let schema = load(
        r##"{
            "$ref": "#/$defs/a~1b",
            "$defs": {"a/b": {"type": "integer"}}
        }"##,
    );
    assert!(check(&schema, "3").is_none());
    assert!(check(&schema, "\"x\"").is_some());
}

// ==== Anchor Tests ====

#[test]
fn anchor_reference_resolves() {
    let schema = load(
        r##"{
            "$ref": "#main",
            "$defs": {"x": {"$anchor": "main", "type": "integer"}}
        }"##,
    );
    assert!(check(&schema, "5").is_none());
    assert!(check(&schema, "\"x\"").is_some());
}

#[test]
fn missing_anchor_fails_loading() {
    let error = SchemaLoader::new(parse(r##"{"$ref": "#nowhere"}"##))
        .load()
        .unwrap_err();
    let SchemaLoadError::RefResolution { message, .. } = error else {
        panic!("expected a reference resolution failure, got {error}");
    };
    assert!(message.contains("anchor \"nowhere\" not found"));
}

// ==== Embedded Resource Tests ====

#[test]
fn embedded_id_creates_a_resolvable_resource() {
    let schema = load(
        r##"{
            "$id": "https://example.org/root.json",
            "properties": {"a": {"$ref": "item.json"}},
            "$defs": {"item": {"$id": "item.json", "type": "number"}}
        }"##,
    );
    assert!(check(&schema, r##"{"a": 3.5}"##).is_none());
    assert!(check(&schema, r##"{"a": "x"}"##).is_some());
}

#[test]
fn urn_base_concatenates_fragments() {
    let schema = load(
        r##"{
            "$id": "urn:uuid:f81d4fae-7dec-11d0-a765-00a0c91e6bf6",
            "$ref": "#int",
            "$defs": {"i": {"$anchor": "int", "type": "integer"}}
        }"##,
    );
    assert!(check(&schema, "5").is_none());
    assert!(check(&schema, "5.5").is_some());
}

// ==== Remote Document Tests ====

#[test]
fn remote_documents_load_through_the_client() {
    let client = PreloadedSchemaClient::new()
        .with_document("https://example.org/length.json", r##"{"minLength": 3}"##);
    let schema = SchemaLoader::new(parse(
        r##"{"$ref": "https://example.org/length.json"}"##,
    ))
    .with_client(client)
    .load()
    .unwrap();
    assert!(check(&schema, "\"abc\"").is_none());
    let failure = check(&schema, "\"ab\"").unwrap();
    assert_eq!(
        failure.message,
        "actual string length 2 is lower than minLength 3"
    );
}

#[test]
fn remote_yaml_documents_are_accepted() {
    let client = PreloadedSchemaClient::new()
        .with_document("https://example.org/s.yaml", "type: integer\nminimum: 2\n");
    let schema = SchemaLoader::new(parse(r##"{"$ref": "https://example.org/s.yaml"}"##))
        .with_client(client)
        .load()
        .unwrap();
    assert!(check(&schema, "3").is_none());
    assert!(check(&schema, "1").is_some());
}

#[test]
fn remote_pointer_into_fetched_document() {
    let client = PreloadedSchemaClient::new().with_document(
        "https://example.org/defs.json",
        r##"{"$defs": {"name": {"type": "string"}}}"##,
    );
    let schema = SchemaLoader::new(parse(
        r##"{"$ref": "https://example.org/defs.json#/$defs/name"}"##,
    ))
    .with_client(client)
    .load()
    .unwrap();
    assert!(check(&schema, "\"x\"").is_none());
    assert!(check(&schema, "1").is_some());
}

#[test]
fn unfetchable_document_fails_loading() {
    let error = SchemaLoader::new(parse(
        r##"{"$ref": "https://example.org/absent.json"}"##,
    ))
    .with_client(PreloadedSchemaClient::new())
    .load()
    .unwrap_err();
    assert!(matches!(error, SchemaLoadError::RefResolution { .. }));
}

// ==== Failure Aggregation Tests ====

#[test]
fn independent_refs_to_one_broken_target_each_surface() {
    let error = SchemaLoader::new(parse(
        r##"{
            "properties": {
                "a": {"$ref": "#/$defs/missing"},
                "b": {"$ref": "#/$defs/missing"}
            }
        }"##,
    ))
    .load()
    .unwrap_err();
    assert!(matches!(error, SchemaLoadError::Aggregate(_)));
    assert_eq!(error.causes().len(), 2);
    assert!(error
        .causes()
        .iter()
        .all(|c| matches!(c, SchemaLoadError::RefResolution { .. })));
}

#[test]
fn single_broken_ref_is_not_wrapped() {
    let error = SchemaLoader::new(parse(r##"{"$ref": "#/$defs/missing"}"##))
        .load()
        .unwrap_err();
    let SchemaLoadError::RefResolution { message, .. } = error else {
        panic!("expected a reference resolution failure, got {error}");
    };
    assert!(message.contains("could not resolve pointer segment \"$defs\""));
}

// ==== Schema Shape Tests ====

#[test]
fn non_schema_values_are_rejected() {
    let error = SchemaLoader::new(parse("[1, 2]")).load().unwrap_err();
    assert!(matches!(error, SchemaLoadError::TypeMismatch { .. }));

    let error = SchemaLoader::new(parse(r##"{"minLength": -1}"##))
        .load()
        .unwrap_err();
    assert!(matches!(error, SchemaLoadError::InvalidKeywordValue { .. }));

    let error = SchemaLoader::new(parse(r##"{"pattern": "(unclosed"}"##))
        .load()
        .unwrap_err();
    assert!(matches!(error, SchemaLoadError::InvalidKeywordValue { .. }));
}
