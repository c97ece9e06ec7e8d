//! JSON Pointer (RFC 6901) represented as an ordered list of segments.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A JSON Pointer into a document: an ordered sequence of reference tokens.
/// Array indices are stored as decimal strings. Escaping (`~` -> `~0`,
/// `/` -> `~1`) happens only on serialization; segments are stored unescaped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JsonPointer {
    segments: Vec<String>,
}

impl JsonPointer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_segments(segments: Vec<String>) -> Self {
        JsonPointer { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns a new pointer with `segment` appended.
    pub fn join(&self, segment: impl Into<String>) -> JsonPointer {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        JsonPointer { segments }
    }

    /// Returns a new pointer with the first `n` segments removed.
    /// Used when a subschema is re-pointed to a shallower document position.
    pub fn trim_leading(&self, n: usize) -> JsonPointer {
        JsonPointer {
            segments: self.segments.iter().skip(n).cloned().collect(),
        }
    }
}

fn escape(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

impl fmt::Display for JsonPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#")?;
        for segment in &self.segments {
            write!(f, "/{}", escape(segment))?;
        }
        Ok(())
    }
}

/// Convenience constructor used pervasively in tests.
#[cfg(test)]
pub(crate) fn pointer(segments: &[&str]) -> JsonPointer {
    JsonPointer::from_segments(segments.iter().map(|s| (*s).to_string()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_pointer_displays_as_hash() {
        assert_eq!(JsonPointer::new().to_string(), "#");
    }

    #[test]
    fn segments_are_slash_separated() {
        assert_eq!(pointer(&["a", "b", "0"]).to_string(), "#/a/b/0");
    }

    #[test]
    fn tilde_and_slash_are_escaped() {
        assert_eq!(pointer(&["a~b", "c/d"]).to_string(), "#/a~0b/c~1d");
    }

    #[test]
    fn join_does_not_mutate_the_original() {
        let base = pointer(&["properties"]);
        let child = base.join("name");
        assert_eq!(base.len(), 1);
        assert_eq!(child.to_string(), "#/properties/name");
    }

    #[test]
    fn trim_leading_drops_prefix_segments() {
        let p = pointer(&["$defs", "item", "type"]);
        assert_eq!(p.trim_leading(2).to_string(), "#/type");
    }
}
