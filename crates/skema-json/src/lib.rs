//! # skema-json
//!
//! JSON document model with source location tracking.
//!
//! This crate provides [`JsonValue`], an immutable JSON tree in which every
//! node carries a [`SourceLocation`]: line, column, JSON Pointer from the
//! document root, and the URI of the owning document. This enables precise
//! error reporting through schema loading and instance validation.
//!
//! Two front ends produce the same tree: a hand-written JSON parser
//! ([`JsonParser`]) and a YAML reader ([`parse_yaml`]) built on `yaml-rust2`.
//!
//! ## Example
//!
//! ```rust
//! use skema_json::JsonParser;
//!
//! let doc = JsonParser::new(r#"{"title": "My Document"}"#).parse().unwrap();
//! let title = doc.require_object().unwrap().get("title").unwrap();
//! assert_eq!(title.location().pointer.to_string(), "#/title");
//! ```

mod error;
mod location;
mod parser;
mod pointer;
mod printer;
mod value;
mod yaml;

pub use error::{JsonParseError, JsonTypingError};
pub use location::{SourceLocation, TextLocation};
pub use parser::{DEFAULT_MAX_NESTING_DEPTH, JsonParser};
pub use pointer::JsonPointer;
pub use printer::JsonPrinter;
pub use value::{JsonNumber, JsonObject, JsonString, JsonValue};
pub use yaml::{YamlParseError, parse_yaml};
