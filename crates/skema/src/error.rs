//! Loading-time error taxonomy.
//!
//! Validation failures are not errors; they are the return value of
//! [`crate::Validator::validate`]. Everything here is fatal to loading the
//! schema, though independent failures across sibling references are
//! collected into [`SchemaLoadError::Aggregate`] rather than aborting on the
//! first one.

use skema_json::{JsonParseError, JsonTypingError, SourceLocation, YamlParseError};
use thiserror::Error;

/// A transport-level failure fetching a schema document.
#[derive(Debug, Error)]
pub enum DocumentFetchError {
    #[error("failed to fetch {uri}: {message}")]
    Transport { uri: String, message: String },

    #[error("no document is registered for {uri}")]
    NotFound { uri: String },
}

#[derive(Debug, Error)]
pub enum SchemaLoadError {
    /// A fetched document is not valid JSON (and not valid YAML either).
    #[error("failed to parse document {uri}: {source}")]
    Parse {
        uri: String,
        #[source]
        source: JsonParseError,
    },

    /// A fetched document failed YAML parsing after JSON parsing had
    /// already been ruled out.
    #[error("failed to parse document {uri}: {source}")]
    Yaml {
        uri: String,
        #[source]
        source: YamlParseError,
    },

    /// A keyword value has the wrong JSON type, e.g. a string `minLength`.
    /// Aborts construction of the containing schema object.
    #[error("invalid schema: {source}")]
    TypeMismatch {
        #[from]
        source: JsonTypingError,
    },

    /// A keyword value is out of its domain, e.g. a negative `minLength`
    /// or an unparsable `pattern`.
    #[error("invalid schema: {message} ({location})")]
    InvalidKeywordValue {
        message: String,
        location: SourceLocation,
    },

    /// A `$ref` target could not be resolved: a pointer segment names a
    /// missing property or out-of-range index, or an anchor does not exist.
    #[error("failed to resolve reference {ref_uri}: {message}")]
    RefResolution {
        ref_uri: String,
        message: String,
        location: SourceLocation,
    },

    /// Transport failure fetching a referenced document.
    #[error("failed to load document: {source}")]
    DocumentLoading {
        #[from]
        source: DocumentFetchError,
    },

    /// Multiple independent failures discovered while loading sibling
    /// subschemas.
    #[error("{} schema loading failures", .0.len())]
    Aggregate(Vec<SchemaLoadError>),
}

impl SchemaLoadError {
    /// Wraps a list of failures, unwrapping the trivial single-element case.
    pub(crate) fn from_failures(mut failures: Vec<SchemaLoadError>) -> SchemaLoadError {
        if failures.len() == 1 {
            failures.remove(0)
        } else {
            SchemaLoadError::Aggregate(failures)
        }
    }

    pub fn causes(&self) -> &[SchemaLoadError] {
        match self {
            SchemaLoadError::Aggregate(causes) => causes,
            _ => &[],
        }
    }
}
