//! JSON Schema draft 2020-12 loading and validation.
//!
//! The crate is split along the two phases of working with a schema:
//!
//! - **Loading** ([`SchemaLoader`]): parses the schema document, resolves
//!   every `$ref`, `$anchor`, `$dynamicAnchor` and `$id` across documents
//!   (fetching remote ones through a [`SchemaClient`]), and produces an
//!   immutable [`LoadedSchema`] graph. All reference errors are reported
//!   here; validation never encounters an unresolved reference.
//! - **Validation** ([`Validator`]): walks the graph and an instance tree
//!   in lockstep, maintaining the dynamic scope for `$dynamicRef` and the
//!   evaluation marks for `unevaluatedItems`/`unevaluatedProperties`, and
//!   returns a [`ValidationFailure`] tree on failure.
//!
//! Instance and schema documents are [`skema_json`] values, so every
//! failure carries the line, column and JSON Pointer of both the violated
//! keyword and the offending instance node.
//!
//! ```no_run
//! use skema::{SchemaLoader, Validator};
//! use skema_json::JsonParser;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let schema = SchemaLoader::new(
//!     JsonParser::new(r#"{"type": "object", "required": ["name"]}"#).parse()?,
//! )
//! .load()?;
//! let instance = JsonParser::new(r#"{"name": "ada"}"#).parse()?;
//! assert!(Validator::for_schema(&schema).validate(&instance).is_none());
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod failure;
mod formats;
mod keyword;
mod loader;
mod schema;
mod validator;

pub use client::{
    DefaultSchemaClient, MemoizingSchemaClient, PreloadedSchemaClient, SchemaClient,
};
pub use error::{DocumentFetchError, SchemaLoadError};
pub use failure::ValidationFailure;
pub use keyword::Keyword;
pub use loader::{DEFAULT_BASE_URI, SchemaLoader};
pub use schema::{
    CompositeSchema, DynamicReference, KeywordSchema, LoadedSchema, ReferenceSchema, SchemaGraph,
    SchemaIdx, SchemaMetadata, SchemaNode,
};
pub use validator::{FormatValidationPolicy, ReadWriteContext, Validator, ValidatorConfig};
