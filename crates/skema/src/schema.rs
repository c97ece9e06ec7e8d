//! The resolved schema model: an arena of schema nodes with write-once
//! reference cells.
//!
//! JSON Schema permits forward, circular and self references, so the model
//! cannot be an owned recursive tree. Nodes live in a flat arena
//! ([`SchemaGraph`]) and refer to each other by index ([`SchemaIdx`]);
//! a [`ReferenceSchema`] holds a [`OnceLock`] target that the loader fills
//! in exactly once. After loading, the whole graph is immutable and can be
//! shared freely across threads.

use crate::keyword::Keyword;
use skema_json::{JsonNumber, JsonValue, SourceLocation};
use std::sync::OnceLock;

/// Index of a node in a [`SchemaGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SchemaIdx(pub(crate) usize);

/// Arena of schema nodes. Append-only during loading, read-only afterwards.
#[derive(Debug, Default)]
pub struct SchemaGraph {
    nodes: Vec<SchemaNode>,
}

impl SchemaGraph {
    pub(crate) fn push(&mut self, node: SchemaNode) -> SchemaIdx {
        self.nodes.push(node);
        SchemaIdx(self.nodes.len() - 1)
    }

    pub fn node(&self, idx: SchemaIdx) -> &SchemaNode {
        &self.nodes[idx.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// A schema node. `True` and `False` are the boolean schemas; `Composite`
/// aggregates every keyword that applied to one schema object; `Ref` is a
/// reference placeholder resolved by the loader.
#[derive(Debug)]
pub enum SchemaNode {
    True(SourceLocation),
    False(SourceLocation),
    Composite(CompositeSchema),
    Ref(ReferenceSchema),
}

impl SchemaNode {
    pub fn location(&self) -> &SourceLocation {
        match self {
            SchemaNode::True(loc) | SchemaNode::False(loc) => loc,
            SchemaNode::Composite(c) => &c.location,
            SchemaNode::Ref(r) => &r.location,
        }
    }
}

/// A `$ref` occurrence. Distinct textual occurrences get distinct nodes,
/// but once resolved they share the target node by index. The target cell
/// is set exactly once, by the loader.
#[derive(Debug)]
pub struct ReferenceSchema {
    pub ref_uri: String,
    pub location: SourceLocation,
    target: OnceLock<SchemaIdx>,
}

impl ReferenceSchema {
    pub(crate) fn new(ref_uri: String, location: SourceLocation) -> Self {
        ReferenceSchema {
            ref_uri,
            location,
            target: OnceLock::new(),
        }
    }

    pub(crate) fn resolve(&self, target: SchemaIdx) {
        // write-once; a second resolution attempt is a loader bug and is
        // ignored rather than able to repoint an already-shared target
        let _ = self.target.set(target);
    }

    pub fn target(&self) -> Option<SchemaIdx> {
        self.target.get().copied()
    }
}

/// A `$dynamicRef`: the anchor name to search for on the dynamic scope
/// stack, plus the statically resolved fallback computed at load time.
#[derive(Debug, Clone)]
pub struct DynamicReference {
    pub ref_uri: String,
    /// Fragment anchor name, when the reference carries one. Dynamic lookup
    /// only applies to anchor-shaped fragments.
    pub anchor_name: Option<String>,
    /// An ordinary reference node resolved as if this were a `$ref`.
    pub fallback: SchemaIdx,
    pub location: SourceLocation,
}

/// Non-assertion annotations carried on a composite schema.
#[derive(Debug, Default, Clone)]
pub struct SchemaMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub default: Option<JsonValue>,
    pub deprecated: bool,
}

/// Everything that applied to one schema object: the keyword set (at most
/// one variant per keyword name), the property maps, and the dynamic
/// reference metadata.
#[derive(Debug, Default)]
pub struct CompositeSchema {
    pub keywords: Vec<KeywordSchema>,
    pub property_schemas: Vec<(String, SchemaIdx)>,
    pub pattern_property_schemas: Vec<(regex::Regex, SchemaIdx)>,
    pub unevaluated_items: Option<SchemaIdx>,
    pub unevaluated_properties: Option<SchemaIdx>,
    pub dynamic_ref: Option<DynamicReference>,
    pub dynamic_anchor: Option<String>,
    /// `$dynamicAnchor` declarations lexically nested under this schema
    /// object (including `$defs`), each paired with a reference node that
    /// the loader resolves to the anchored schema. Consulted by the dynamic
    /// scope search, so an anchor supplied in a referencing context is
    /// visible while that context is on the scope stack.
    pub dynamic_anchors: Vec<(String, SchemaIdx)>,
    /// URIs declared `true` in `$vocabulary`. Empty when the schema declares
    /// no vocabulary, which counts as "all vocabularies active".
    pub vocabulary: Vec<String>,
    pub metadata: SchemaMetadata,
    pub location: SourceLocation,
}

/// One keyword's compiled form. Each variant carries the source location of
/// the keyword value for failure reporting.
#[derive(Debug)]
pub enum KeywordSchema {
    Type {
        allowed: Vec<String>,
        location: SourceLocation,
    },
    Const {
        value: JsonValue,
        location: SourceLocation,
    },
    Enum {
        values: Vec<JsonValue>,
        location: SourceLocation,
    },
    MinLength {
        limit: u64,
        location: SourceLocation,
    },
    MaxLength {
        limit: u64,
        location: SourceLocation,
    },
    Pattern {
        regex: regex::Regex,
        location: SourceLocation,
    },
    Format {
        name: String,
        location: SourceLocation,
    },
    Minimum {
        limit: JsonNumber,
        location: SourceLocation,
    },
    Maximum {
        limit: JsonNumber,
        location: SourceLocation,
    },
    ExclusiveMinimum {
        limit: JsonNumber,
        location: SourceLocation,
    },
    ExclusiveMaximum {
        limit: JsonNumber,
        location: SourceLocation,
    },
    MultipleOf {
        factor: JsonNumber,
        location: SourceLocation,
    },
    MinItems {
        limit: u64,
        location: SourceLocation,
    },
    MaxItems {
        limit: u64,
        location: SourceLocation,
    },
    UniqueItems {
        unique: bool,
        location: SourceLocation,
    },
    MinProperties {
        limit: u64,
        location: SourceLocation,
    },
    MaxProperties {
        limit: u64,
        location: SourceLocation,
    },
    Required {
        names: Vec<String>,
        location: SourceLocation,
    },
    DependentRequired {
        dependencies: Vec<(String, Vec<String>)>,
        location: SourceLocation,
    },
    DependentSchemas {
        dependencies: Vec<(String, SchemaIdx)>,
        location: SourceLocation,
    },
    AllOf {
        subschemas: Vec<SchemaIdx>,
        location: SourceLocation,
    },
    AnyOf {
        subschemas: Vec<SchemaIdx>,
        location: SourceLocation,
    },
    OneOf {
        subschemas: Vec<SchemaIdx>,
        location: SourceLocation,
    },
    Not {
        subschema: SchemaIdx,
        location: SourceLocation,
    },
    /// `if`/`then`/`else` collapse into one variant at load time.
    IfThenElse {
        if_schema: SchemaIdx,
        then_schema: Option<SchemaIdx>,
        else_schema: Option<SchemaIdx>,
        location: SourceLocation,
    },
    PrefixItems {
        subschemas: Vec<SchemaIdx>,
        location: SourceLocation,
    },
    /// `items` applies from `prefix_item_count` onwards; the count is
    /// captured at load time from the sibling `prefixItems`.
    Items {
        subschema: SchemaIdx,
        prefix_item_count: usize,
        location: SourceLocation,
    },
    /// `contains` with its sibling `minContains`/`maxContains` folded in.
    Contains {
        subschema: SchemaIdx,
        min_contains: u64,
        max_contains: Option<u64>,
        location: SourceLocation,
    },
    /// Sibling property names and pattern regexes are captured at load
    /// time, so evaluation is independent of keyword order in the source.
    AdditionalProperties {
        subschema: SchemaIdx,
        keys_in_properties: Vec<String>,
        pattern_keys: Vec<regex::Regex>,
        location: SourceLocation,
    },
    PropertyNames {
        subschema: SchemaIdx,
        location: SourceLocation,
    },
    Ref {
        reference: SchemaIdx,
        location: SourceLocation,
    },
    ReadOnly {
        location: SourceLocation,
    },
    WriteOnly {
        location: SourceLocation,
    },
}

impl KeywordSchema {
    /// The keyword this compiled form came from. `IfThenElse` reports `if`.
    pub fn keyword(&self) -> Keyword {
        match self {
            KeywordSchema::Type { .. } => Keyword::Type,
            KeywordSchema::Const { .. } => Keyword::Const,
            KeywordSchema::Enum { .. } => Keyword::Enum,
            KeywordSchema::MinLength { .. } => Keyword::MinLength,
            KeywordSchema::MaxLength { .. } => Keyword::MaxLength,
            KeywordSchema::Pattern { .. } => Keyword::Pattern,
            KeywordSchema::Format { .. } => Keyword::Format,
            KeywordSchema::Minimum { .. } => Keyword::Minimum,
            KeywordSchema::Maximum { .. } => Keyword::Maximum,
            KeywordSchema::ExclusiveMinimum { .. } => Keyword::ExclusiveMinimum,
            KeywordSchema::ExclusiveMaximum { .. } => Keyword::ExclusiveMaximum,
            KeywordSchema::MultipleOf { .. } => Keyword::MultipleOf,
            KeywordSchema::MinItems { .. } => Keyword::MinItems,
            KeywordSchema::MaxItems { .. } => Keyword::MaxItems,
            KeywordSchema::UniqueItems { .. } => Keyword::UniqueItems,
            KeywordSchema::MinProperties { .. } => Keyword::MinProperties,
            KeywordSchema::MaxProperties { .. } => Keyword::MaxProperties,
            KeywordSchema::Required { .. } => Keyword::Required,
            KeywordSchema::DependentRequired { .. } => Keyword::DependentRequired,
            KeywordSchema::DependentSchemas { .. } => Keyword::DependentSchemas,
            KeywordSchema::AllOf { .. } => Keyword::AllOf,
            KeywordSchema::AnyOf { .. } => Keyword::AnyOf,
            KeywordSchema::OneOf { .. } => Keyword::OneOf,
            KeywordSchema::Not { .. } => Keyword::Not,
            KeywordSchema::IfThenElse { .. } => Keyword::If,
            KeywordSchema::PrefixItems { .. } => Keyword::PrefixItems,
            KeywordSchema::Items { .. } => Keyword::Items,
            KeywordSchema::Contains { .. } => Keyword::Contains,
            KeywordSchema::AdditionalProperties { .. } => Keyword::AdditionalProperties,
            KeywordSchema::PropertyNames { .. } => Keyword::PropertyNames,
            KeywordSchema::Ref { .. } => Keyword::Ref,
            KeywordSchema::ReadOnly { .. } => Keyword::ReadOnly,
            KeywordSchema::WriteOnly { .. } => Keyword::WriteOnly,
        }
    }

    pub fn location(&self) -> &SourceLocation {
        match self {
            KeywordSchema::Type { location, .. }
            | KeywordSchema::Const { location, .. }
            | KeywordSchema::Enum { location, .. }
            | KeywordSchema::MinLength { location, .. }
            | KeywordSchema::MaxLength { location, .. }
            | KeywordSchema::Pattern { location, .. }
            | KeywordSchema::Format { location, .. }
            | KeywordSchema::Minimum { location, .. }
            | KeywordSchema::Maximum { location, .. }
            | KeywordSchema::ExclusiveMinimum { location, .. }
            | KeywordSchema::ExclusiveMaximum { location, .. }
            | KeywordSchema::MultipleOf { location, .. }
            | KeywordSchema::MinItems { location, .. }
            | KeywordSchema::MaxItems { location, .. }
            | KeywordSchema::UniqueItems { location, .. }
            | KeywordSchema::MinProperties { location, .. }
            | KeywordSchema::MaxProperties { location, .. }
            | KeywordSchema::Required { location, .. }
            | KeywordSchema::DependentRequired { location, .. }
            | KeywordSchema::DependentSchemas { location, .. }
            | KeywordSchema::AllOf { location, .. }
            | KeywordSchema::AnyOf { location, .. }
            | KeywordSchema::OneOf { location, .. }
            | KeywordSchema::Not { location, .. }
            | KeywordSchema::IfThenElse { location, .. }
            | KeywordSchema::PrefixItems { location, .. }
            | KeywordSchema::Items { location, .. }
            | KeywordSchema::Contains { location, .. }
            | KeywordSchema::AdditionalProperties { location, .. }
            | KeywordSchema::PropertyNames { location, .. }
            | KeywordSchema::Ref { location, .. }
            | KeywordSchema::ReadOnly { location }
            | KeywordSchema::WriteOnly { location } => location,
        }
    }
}

/// The output of a successful load: the arena plus the root index.
#[derive(Debug)]
pub struct LoadedSchema {
    pub(crate) graph: SchemaGraph,
    pub(crate) root: SchemaIdx,
}

impl LoadedSchema {
    pub fn graph(&self) -> &SchemaGraph {
        &self.graph
    }

    pub fn root(&self) -> SchemaIdx {
        self.root
    }
}
