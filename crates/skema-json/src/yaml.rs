//! YAML front end producing the same location-carrying [`JsonValue`] tree as
//! the JSON parser.
//!
//! Schemas and instances may both be written in YAML; everything downstream
//! of parsing only sees [`JsonValue`]. Scalar typing follows the YAML 1.2
//! core schema, except that quoted scalars always stay strings.

use crate::location::{SourceLocation, TextLocation};
use crate::pointer::JsonPointer;
use crate::value::{JsonNumber, JsonObject, JsonString, JsonValue};
use crate::JsonParser;
use thiserror::Error;
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser};
use yaml_rust2::scanner::{Marker, TScalarStyle};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum YamlParseError {
    #[error("invalid YAML: {0}")]
    Scan(#[from] yaml_rust2::ScanError),

    #[error("no YAML document found")]
    EmptyDocument,

    #[error("mapping key is not a scalar at {location}")]
    NonScalarKey { location: TextLocation },

    #[error("duplicate mapping key \"{key}\" at {location}")]
    DuplicateKey { key: String, location: TextLocation },

    #[error("YAML aliases are not supported ({location})")]
    UnsupportedAlias { location: TextLocation },
}

/// Parses a single YAML document into a [`JsonValue`]. If the input holds
/// multiple documents, only the first is read.
pub fn parse_yaml(content: &str, document_source: Option<&str>) -> Result<JsonValue, YamlParseError> {
    let mut parser = Parser::new_from_str(content);
    let mut builder = YamlBuilder::new(document_source);
    parser.load(&mut builder, false)?;
    let root = builder.result()?;
    Ok(assign_pointers(root, JsonPointer::new()))
}

/// Builder implementing [`MarkedEventReceiver`]. Pointers are left empty
/// during event processing and assigned in a single pass afterwards, once
/// the tree shape is known.
struct YamlBuilder {
    document_source: Option<String>,
    stack: Vec<BuildNode>,
    root: Option<JsonValue>,
    error: Option<YamlParseError>,
}

enum BuildNode {
    Sequence {
        location: SourceLocation,
        items: Vec<JsonValue>,
    },
    Mapping {
        location: SourceLocation,
        entries: Vec<(JsonString, Option<JsonValue>)>,
    },
}

impl YamlBuilder {
    fn new(document_source: Option<&str>) -> Self {
        YamlBuilder {
            document_source: document_source.map(|s| s.to_string()),
            stack: Vec::new(),
            root: None,
            error: None,
        }
    }

    fn result(self) -> Result<JsonValue, YamlParseError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        self.root.ok_or(YamlParseError::EmptyDocument)
    }

    fn location(&self, marker: &Marker) -> SourceLocation {
        SourceLocation::new(
            marker.line(),
            marker.col() + 1,
            JsonPointer::new(),
            self.document_source.clone(),
        )
    }

    fn push_complete(&mut self, node: JsonValue) {
        match self.stack.last_mut() {
            None => self.root = Some(node),
            Some(BuildNode::Sequence { items, .. }) => items.push(node),
            Some(BuildNode::Mapping { entries, .. }) => {
                match entries.last_mut() {
                    Some((_, slot @ None)) => *slot = Some(node),
                    _ => {
                        // a new key; mapping keys must be scalars
                        let key = match node {
                            JsonValue::String(s) => s,
                            JsonValue::Null(loc) => JsonString::new("null", loc),
                            JsonValue::Bool(b, loc) => JsonString::new(b.to_string(), loc),
                            JsonValue::Number(n, loc) => JsonString::new(n.to_string(), loc),
                            other => {
                                self.error = Some(YamlParseError::NonScalarKey {
                                    location: other.location().text_location(),
                                });
                                return;
                            }
                        };
                        if entries.iter().any(|(k, _)| k.value == key.value) {
                            self.error = Some(YamlParseError::DuplicateKey {
                                location: key.location.text_location(),
                                key: key.value,
                            });
                            return;
                        }
                        entries.push((key, None));
                    }
                }
            }
        }
    }
}

impl MarkedEventReceiver for YamlBuilder {
    fn on_event(&mut self, ev: Event, marker: Marker) {
        if self.error.is_some() {
            return;
        }
        match ev {
            Event::Nothing
            | Event::StreamStart
            | Event::StreamEnd
            | Event::DocumentStart
            | Event::DocumentEnd => {}

            Event::Scalar(value, style, _anchor_id, _tag) => {
                let location = self.location(&marker);
                let node = if style == TScalarStyle::Plain {
                    typed_scalar(&value, location)
                } else {
                    JsonValue::String(JsonString::new(value, location))
                };
                self.push_complete(node);
            }

            Event::SequenceStart(_anchor_id, _tag) => {
                self.stack.push(BuildNode::Sequence {
                    location: self.location(&marker),
                    items: Vec::new(),
                });
            }

            Event::SequenceEnd => {
                if let Some(BuildNode::Sequence { location, items }) = self.stack.pop() {
                    self.push_complete(JsonValue::Array(items, location));
                }
            }

            Event::MappingStart(_anchor_id, _tag) => {
                self.stack.push(BuildNode::Mapping {
                    location: self.location(&marker),
                    entries: Vec::new(),
                });
            }

            Event::MappingEnd => {
                if let Some(BuildNode::Mapping { location, entries }) = self.stack.pop() {
                    let entries = entries
                        .into_iter()
                        .map(|(key, value)| {
                            // a key with no value maps to null, as in `key:`
                            let value = value.unwrap_or_else(|| {
                                JsonValue::Null(key.location.clone())
                            });
                            (key, value)
                        })
                        .collect();
                    self.push_complete(JsonValue::Object(JsonObject { entries, location }));
                }
            }

            Event::Alias(_anchor_id) => {
                self.error = Some(YamlParseError::UnsupportedAlias {
                    location: TextLocation::new(marker.line(), marker.col() + 1),
                });
            }
        }
    }
}

/// YAML 1.2 core-schema typing for plain scalars.
fn typed_scalar(value: &str, location: SourceLocation) -> JsonValue {
    match value {
        "null" | "Null" | "NULL" | "~" | "" => return JsonValue::Null(location),
        "true" | "True" | "TRUE" => return JsonValue::Bool(true, location),
        "false" | "False" | "FALSE" => return JsonValue::Bool(false, location),
        _ => {}
    }
    if looks_numeric(value) {
        // strict JSON numbers reuse the exact-decimal classification
        if let Ok(JsonValue::Number(number, _)) = JsonParser::new(value).parse() {
            return JsonValue::Number(number, location);
        }
        // YAML permits forms JSON does not, such as `.5` or `1_000`
        if let Ok(double) = value.parse::<f64>() {
            return JsonValue::Number(JsonNumber::Double(double), location);
        }
    }
    JsonValue::String(JsonString::new(value, location))
}

fn looks_numeric(value: &str) -> bool {
    value
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || c == '-' || c == '+' || c == '.')
}

/// Rewrites every location in the tree with its JSON Pointer. Run once
/// after event-driven building, when the final shape is known.
fn assign_pointers(value: JsonValue, pointer: JsonPointer) -> JsonValue {
    match value {
        JsonValue::Null(loc) => JsonValue::Null(loc.with_pointer(pointer)),
        JsonValue::Bool(b, loc) => JsonValue::Bool(b, loc.with_pointer(pointer)),
        JsonValue::Number(n, loc) => JsonValue::Number(n, loc.with_pointer(pointer)),
        JsonValue::String(s) => {
            let location = s.location.with_pointer(pointer);
            JsonValue::String(JsonString {
                value: s.value,
                location,
            })
        }
        JsonValue::Array(items, loc) => {
            let items = items
                .into_iter()
                .enumerate()
                .map(|(i, item)| assign_pointers(item, pointer.join(i.to_string())))
                .collect();
            JsonValue::Array(items, loc.with_pointer(pointer))
        }
        JsonValue::Object(object) => {
            let entries = object
                .entries
                .into_iter()
                .map(|(key, entry)| {
                    let key = JsonString {
                        location: key.location.with_pointer(pointer.clone()),
                        value: key.value,
                    };
                    let entry_pointer = pointer.join(key.value.clone());
                    (key, assign_pointers(entry, entry_pointer))
                })
                .collect();
            JsonValue::Object(JsonObject {
                entries,
                location: object.location.with_pointer(pointer),
            })
        }
    }
}
