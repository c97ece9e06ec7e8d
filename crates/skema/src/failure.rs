//! The validation failure tree.
//!
//! Failures are values, not errors: `validate` returns `None` on success
//! and a failure tree otherwise. Sibling failures are merged bottom-up with
//! [`ValidationFailure::join`]; `None` is the identity of
//! [`accumulate`](ValidationFailure::accumulate).

use crate::keyword::Keyword;
use skema_json::{JsonPointer, SourceLocation};
use std::fmt;

const AGGREGATE_MESSAGE: &str = "multiple validation failures";

#[derive(Debug, Clone)]
pub struct ValidationFailure {
    pub message: String,
    pub keyword: Option<Keyword>,
    /// Lexical location of the violated keyword in the schema document.
    pub schema_location: SourceLocation,
    /// Location of the offending instance node.
    pub instance_location: SourceLocation,
    /// The keyword-based evaluation path actually taken, which differs from
    /// the lexical schema pointer when `$ref` is involved.
    pub dynamic_path: JsonPointer,
    pub causes: Vec<ValidationFailure>,
    aggregating: bool,
}

impl ValidationFailure {
    pub fn new(
        message: impl Into<String>,
        keyword: Option<Keyword>,
        schema_location: SourceLocation,
        instance_location: SourceLocation,
        dynamic_path: JsonPointer,
    ) -> Self {
        ValidationFailure {
            message: message.into(),
            keyword,
            schema_location,
            instance_location,
            dynamic_path,
            causes: Vec::new(),
            aggregating: false,
        }
    }

    pub fn with_causes(mut self, causes: Vec<ValidationFailure>) -> Self {
        self.causes = causes;
        self
    }

    pub fn is_aggregate(&self) -> bool {
        self.aggregating
    }

    /// Merges another failure into this one. Joining onto an existing
    /// aggregate extends its causes instead of nesting aggregates; joining
    /// two leaves creates an aggregate parent located at the first leaf.
    pub fn join(self, other: ValidationFailure) -> ValidationFailure {
        if self.aggregating {
            let mut joined = self;
            if other.aggregating {
                joined.causes.extend(other.causes);
            } else {
                joined.causes.push(other);
            }
            return joined;
        }
        if other.aggregating {
            // keep aggregate flatness, with self staying first
            let mut joined = ValidationFailure {
                message: AGGREGATE_MESSAGE.to_string(),
                keyword: None,
                schema_location: self.schema_location.clone(),
                instance_location: self.instance_location.clone(),
                dynamic_path: self.dynamic_path.clone(),
                causes: vec![self],
                aggregating: true,
            };
            joined.causes.extend(other.causes);
            return joined;
        }
        ValidationFailure {
            message: AGGREGATE_MESSAGE.to_string(),
            keyword: None,
            schema_location: self.schema_location.clone(),
            instance_location: self.instance_location.clone(),
            dynamic_path: self.dynamic_path.clone(),
            causes: vec![self, other],
            aggregating: true,
        }
    }

    /// Combines two optional failures; "no failure" is the identity.
    pub fn accumulate(
        previous: Option<ValidationFailure>,
        current: Option<ValidationFailure>,
    ) -> Option<ValidationFailure> {
        match (previous, current) {
            (None, current) => current,
            (previous, None) => previous,
            (Some(a), Some(b)) => Some(a.join(b)),
        }
    }

    /// Leaf failures of the tree, in document order.
    pub fn flatten(&self) -> Vec<&ValidationFailure> {
        if self.causes.is_empty() {
            return vec![self];
        }
        self.causes.iter().flat_map(|c| c.flatten()).collect()
    }

    /// JSON encoding:
    /// `{instanceRef, schemaRef, dynamicPath, message, keyword?, causes?}`.
    pub fn to_json(&self) -> serde_json::Value {
        let mut object = serde_json::Map::new();
        object.insert(
            "instanceRef".to_string(),
            serde_json::Value::String(self.instance_location.pointer.to_string()),
        );
        object.insert(
            "schemaRef".to_string(),
            serde_json::Value::String(self.schema_location.pointer.to_string()),
        );
        object.insert(
            "dynamicPath".to_string(),
            serde_json::Value::String(self.dynamic_path.to_string()),
        );
        object.insert(
            "message".to_string(),
            serde_json::Value::String(self.message.clone()),
        );
        if let Some(keyword) = self.keyword {
            object.insert(
                "keyword".to_string(),
                serde_json::Value::String(keyword.as_str().to_string()),
            );
        }
        if !self.causes.is_empty() {
            object.insert(
                "causes".to_string(),
                serde_json::Value::Array(self.causes.iter().map(|c| c.to_json()).collect()),
            );
        }
        serde_json::Value::Object(object)
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        for _ in 0..depth {
            write!(f, "  ")?;
        }
        write!(
            f,
            "{}: {} (instance: {}, schema: {}, evaluated at: {})",
            self.instance_location.location_string(),
            self.message,
            self.instance_location.pointer,
            self.schema_location.pointer,
            self.dynamic_path
        )?;
        for cause in &self.causes {
            writeln!(f)?;
            cause.write_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skema_json::JsonPointer;

    fn leaf(message: &str) -> ValidationFailure {
        ValidationFailure::new(
            message,
            Some(Keyword::Type),
            SourceLocation::unknown(),
            SourceLocation::unknown(),
            JsonPointer::new(),
        )
    }

    #[test]
    fn joining_two_leaves_creates_an_aggregate() {
        let joined = leaf("a").join(leaf("b"));
        assert!(joined.is_aggregate());
        assert_eq!(joined.message, "multiple validation failures");
        assert_eq!(joined.causes.len(), 2);
    }

    #[test]
    fn joining_onto_an_aggregate_extends_it() {
        let joined = leaf("a").join(leaf("b")).join(leaf("c"));
        assert!(joined.is_aggregate());
        assert_eq!(joined.causes.len(), 3);
        assert!(joined.causes.iter().all(|c| !c.is_aggregate()));
    }

    #[test]
    fn joining_two_aggregates_stays_flat() {
        let left = leaf("a").join(leaf("b"));
        let right = leaf("c").join(leaf("d"));
        let joined = left.join(right);
        assert_eq!(joined.causes.len(), 4);
    }

    #[test]
    fn accumulate_treats_none_as_identity() {
        assert!(ValidationFailure::accumulate(None, None).is_none());
        let only = ValidationFailure::accumulate(Some(leaf("a")), None).unwrap();
        assert_eq!(only.message, "a");
        let other = ValidationFailure::accumulate(None, Some(leaf("b"))).unwrap();
        assert_eq!(other.message, "b");
    }

    #[test]
    fn flatten_returns_leaves_in_order() {
        let tree = leaf("a").join(leaf("b")).join(leaf("c"));
        let messages: Vec<_> = tree.flatten().iter().map(|f| f.message.as_str()).collect();
        assert_eq!(messages, ["a", "b", "c"]);
    }

    #[test]
    fn joining_a_leaf_onto_an_aggregate_keeps_order() {
        let aggregate = leaf("b").join(leaf("c"));
        let joined = leaf("a").join(aggregate);
        let messages: Vec<_> = joined
            .flatten()
            .iter()
            .map(|f| f.message.as_str())
            .collect();
        assert_eq!(messages, ["a", "b", "c"]);
    }

    #[test]
    fn json_encoding_has_causes_only_on_aggregates() {
        let single = leaf("a").to_json();
        assert!(single.get("causes").is_none());
        assert_eq!(single["message"], "a");
        assert_eq!(single["keyword"], "type");

        let aggregate = leaf("a").join(leaf("b")).to_json();
        assert_eq!(aggregate["causes"].as_array().unwrap().len(), 2);
        assert!(aggregate.get("keyword").is_none());
    }
}
