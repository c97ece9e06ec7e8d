//! Error types for parsing and for typed access to document nodes.

use crate::{SourceLocation, TextLocation};
use thiserror::Error;

/// A syntax error raised by [`crate::JsonParser`]. Every variant carries the
/// text position at which the problem was detected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum JsonParseError {
    #[error("unexpected character '{found}' at {location}")]
    UnexpectedCharacter { found: char, location: TextLocation },

    #[error("unexpected end of input at {location}")]
    UnexpectedEof { location: TextLocation },

    #[error("invalid unicode escape sequence '{sequence}' at {location}")]
    InvalidUnicodeEscape {
        sequence: String,
        location: TextLocation,
    },

    #[error("duplicate object key \"{key}\" at {location}")]
    DuplicateKey { key: String, location: TextLocation },

    #[error("document exceeds the maximum nesting depth of {limit} at {location}")]
    TooDeeplyNested { limit: usize, location: TextLocation },

    #[error("extraneous character '{found}' after the document at {location}")]
    ExtraneousCharacter { found: char, location: TextLocation },
}

impl JsonParseError {
    pub fn location(&self) -> &TextLocation {
        match self {
            JsonParseError::UnexpectedCharacter { location, .. }
            | JsonParseError::UnexpectedEof { location }
            | JsonParseError::InvalidUnicodeEscape { location, .. }
            | JsonParseError::DuplicateKey { location, .. }
            | JsonParseError::TooDeeplyNested { location, .. }
            | JsonParseError::ExtraneousCharacter { location, .. } => location,
        }
    }
}

/// Raised by the `require_*` accessors of [`crate::JsonValue`] when a node
/// has a different JSON type than the caller needs.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("expected {expected}, found {actual} ({location})")]
pub struct JsonTypingError {
    pub expected: String,
    pub actual: String,
    pub location: SourceLocation,
}
