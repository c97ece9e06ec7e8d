use skema::{LoadedSchema, SchemaLoader, ValidationFailure, Validator};
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

// ==== Dynamic Anchor Resolution Tests ====

#[test]
fn caller_supplies_the_element_type() {
    // a generic list whose element type is bound by whichever schema in the
    // dynamic scope declares the "elemType" anchor
    let schema = load(
        r##"{
            "properties": {
                "intList": {
                    "$ref": "#/$defs/List",
                    "$defs": {
                        "elemType": {"$dynamicAnchor": "elemType", "type": "integer"}
                    }
                }
            },
            "$defs": {
                "List": {
                    "type": "array",
                    "items": {"$dynamicRef": "#elemType"},
                    "$defs": {
                        "default": {"$dynamicAnchor": "elemType"}
                    }
                }
            }
        }"##,
    );
    assert!(check(&schema, r##"{"intList": [1, 2, 3]}"##).is_none());
    let failure = check(&schema, r##"{"intList": [1, "x"]}"##).unwrap();
    assert_eq!(failure.message, "expected type: integer, actual: string");
    assert_eq!(failure.instance_location.pointer.to_string(), "#/intList/1");
    assert_eq!(
        failure.dynamic_path.to_string(),
        "#/properties/intList/$ref/items/1/$dynamicRef/type"
    );
}

#[test]
fn default_anchor_applies_without_a_caller_binding() {
    let schema = load(
        r##"{
            "$ref": "#/$defs/List",
            "$defs": {
                "List": {
                    "type": "array",
                    "items": {"$dynamicRef": "#elemType"},
                    "$defs": {
                        "default": {"$dynamicAnchor": "elemType", "type": "string"}
                    }
                }
            }
        }"##,
    );
    assert!(check(&schema, r##"["a", "b"]"##).is_none());
    let failure = check(&schema, "[1]").unwrap();
    assert_eq!(failure.message, "expected type: string, actual: integer");
}

#[test]
fn outermost_scope_overrides_the_local_anchor() {
    // the list resource carries its own unconstrained "items" anchor, but
    // the root resource entered the dynamic scope first and its anchor wins
    let schema = load(
        r##"{
            "$id": "https://example.test/root",
            "$ref": "list",
            "$defs": {
                "foo": {
                    "$dynamicAnchor": "items",
                    "type": "string"
                },
                "list": {
                    "$id": "list",
                    "type": "array",
                    "items": {"$dynamicRef": "#items"},
                    "$defs": {
                        "items": {"$dynamicAnchor": "items"}
                    }
                }
            }
        }"##,
    );
    assert!(check(&schema, r##"["a", "b"]"##).is_none());
    let failure = check(&schema, r##"["foo", 42]"##).unwrap();
    assert_eq!(failure.message, "expected type: string, actual: integer");
    assert_eq!(failure.instance_location.pointer.to_string(), "#/1");
    assert_eq!(
        failure.dynamic_path.to_string(),
        "#/$ref/items/1/$dynamicRef/type"
    );
}

// ==== Static Fallback Tests ====

#[test]
fn unmatched_dynamic_ref_falls_back_to_the_static_target() {
    // "#num" names a plain $anchor, so no dynamic anchor exists anywhere in
    // the scope and the reference behaves like an ordinary $ref
    let schema = load(
        r##"{
            "$ref": "#/$defs/wrapper",
            "$defs": {
                "wrapper": {"items": {"$dynamicRef": "#num"}},
                "num": {"$anchor": "num", "type": "number"}
            }
        }"##,
    );
    assert!(check(&schema, "[1.5, 2]").is_none());
    let failure = check(&schema, r##"["x"]"##).unwrap();
    assert_eq!(failure.message, "expected type: number, actual: string");
    assert_eq!(
        failure.dynamic_path.to_string(),
        "#/$ref/items/0/$dynamicRef/type"
    );
}
