//! Source locations for document nodes (1-indexed line/column).

use crate::JsonPointer;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A raw position in source text, before any document structure is known.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextLocation {
    /// Line number (1-indexed)
    pub line: usize,
    /// Character position within the line (1-indexed)
    pub column: usize,
}

impl TextLocation {
    pub fn new(line: usize, column: usize) -> Self {
        TextLocation { line, column }
    }
}

impl fmt::Display for TextLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, character {}", self.line, self.column)
    }
}

/// The full provenance of a document node: text position, JSON Pointer from
/// the document root, and the URI of the owning document.
///
/// Assigned once at construction. The only permitted changes are the explicit
/// re-pointing operations [`SourceLocation::with_pointer`] and
/// [`SourceLocation::trim_pointer_segments`], both of which return a new value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
    pub pointer: JsonPointer,
    /// URI of the document this node was parsed from, if known.
    pub document_source: Option<String>,
}

impl SourceLocation {
    pub fn new(
        line: usize,
        column: usize,
        pointer: JsonPointer,
        document_source: Option<String>,
    ) -> Self {
        SourceLocation {
            line,
            column,
            pointer,
            document_source,
        }
    }

    /// Placeholder for programmatically constructed values.
    pub fn unknown() -> Self {
        SourceLocation::default()
    }

    pub fn text_location(&self) -> TextLocation {
        TextLocation::new(self.line, self.column)
    }

    /// `"<uri>: Line L, character C"`, the form used in failure reports.
    pub fn location_string(&self) -> String {
        match &self.document_source {
            Some(uri) => format!("{}: Line {}, character {}", uri, self.line, self.column),
            None => format!("Line {}, character {}", self.line, self.column),
        }
    }

    /// Re-points this location at a different pointer, keeping the text
    /// position. Used when schema content is reused at another pointer depth.
    pub fn with_pointer(&self, pointer: JsonPointer) -> SourceLocation {
        SourceLocation {
            pointer,
            ..self.clone()
        }
    }

    /// Removes the first `n` pointer segments; panics are avoided by
    /// saturating at the pointer length.
    pub fn trim_pointer_segments(&self, n: usize) -> SourceLocation {
        self.with_pointer(self.pointer.trim_leading(n))
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}, character {}, pointer: {}",
            self.line, self.column, self.pointer
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointer::pointer;

    #[test]
    fn location_string_includes_document_source() {
        let loc = SourceLocation::new(3, 7, JsonPointer::new(), Some("mem://input".into()));
        assert_eq!(loc.location_string(), "mem://input: Line 3, character 7");
    }

    #[test]
    fn with_pointer_keeps_text_position() {
        let loc = SourceLocation::new(2, 5, pointer(&["a"]), None);
        let repointed = loc.with_pointer(pointer(&["b", "c"]));
        assert_eq!(repointed.line, 2);
        assert_eq!(repointed.column, 5);
        assert_eq!(repointed.pointer.to_string(), "#/b/c");
        // the original is untouched
        assert_eq!(loc.pointer.to_string(), "#/a");
    }
}
