//! The resolution loader: turns a raw document tree into a resolved
//! [`SchemaGraph`].
//!
//! Resolution is a worklist fixpoint over knots, keyed by normalized
//! absolute URI. A knot starts empty when first referenced, gains raw JSON
//! from the in-progress document or a fetched one, gains a schema when that
//! JSON is compiled, and finally back-fills every reference that was waiting
//! on it. The write-once reference cells make forward, circular and self
//! references safe without recursive construction.

use crate::client::{DefaultSchemaClient, MemoizingSchemaClient, SchemaClient};
use crate::error::SchemaLoadError;
use crate::keyword::Keyword;
use crate::schema::{
    CompositeSchema, DynamicReference, KeywordSchema, LoadedSchema, ReferenceSchema, SchemaGraph,
    SchemaIdx, SchemaNode,
};
use skema_json::{JsonObject, JsonTypingError, JsonValue, SourceLocation};
use std::collections::BTreeMap;
use tracing::{debug, trace};
use url::Url;

/// Base URI assigned to documents loaded from memory rather than a real
/// location.
pub const DEFAULT_BASE_URI: &str = "mem://input";

const VALID_TYPE_NAMES: [&str; 7] = [
    "null", "boolean", "string", "number", "integer", "array", "object",
];

/// Loads one schema document into an immutable [`LoadedSchema`].
pub struct SchemaLoader {
    document: JsonValue,
    client: Box<dyn SchemaClient>,
    default_base_uri: String,
}

impl SchemaLoader {
    pub fn new(document: JsonValue) -> Self {
        SchemaLoader {
            document,
            client: Box::new(MemoizingSchemaClient::new(DefaultSchemaClient)),
            default_base_uri: DEFAULT_BASE_URI.to_string(),
        }
    }

    pub fn with_client(mut self, client: impl SchemaClient + 'static) -> Self {
        self.client = Box::new(client);
        self
    }

    pub fn with_default_base_uri(mut self, uri: impl Into<String>) -> Self {
        self.default_base_uri = normalize(uri.into());
        self
    }

    pub fn load(self) -> Result<LoadedSchema, SchemaLoadError> {
        let mut loading = Loading {
            graph: SchemaGraph::default(),
            knots: BTreeMap::new(),
            documents: BTreeMap::new(),
            client: self.client,
            errors: Vec::new(),
        };

        let root_base = match root_id(&self.document) {
            Some(id) => resolve_uri(&self.default_base_uri, id),
            None => self.default_base_uri.clone(),
        };
        debug!(base = %root_base, "registering root schema document");
        loading
            .documents
            .insert(root_base.clone(), self.document.clone());
        loading.register_raw(root_base.clone(), self.document.clone(), root_base.clone());
        loading.prescan(&self.document, &root_base);

        let root_ref =
            loading.create_reference(&root_base, "#", self.document.location().clone());
        loading.run_worklist();

        if !loading.errors.is_empty() {
            return Err(SchemaLoadError::from_failures(loading.errors));
        }

        let root = match loading.graph.node(root_ref) {
            SchemaNode::Ref(r) => r.target().ok_or_else(|| SchemaLoadError::RefResolution {
                ref_uri: root_base.clone(),
                message: "root schema could not be resolved".to_string(),
                location: self.document.location().clone(),
            })?,
            _ => unreachable!("root reference is always a Ref node"),
        };
        Ok(LoadedSchema {
            graph: loading.graph,
            root,
        })
    }
}

fn root_id(document: &JsonValue) -> Option<&str> {
    document
        .as_object()
        .and_then(|o| o.get("$id"))
        .and_then(JsonValue::as_str)
}

/// One per-URI resolution unit.
struct Knot {
    raw_json: Option<JsonValue>,
    lexical_base_uri: String,
    schema: Option<SchemaIdx>,
    under_loading: bool,
    failed: bool,
    /// `Ref` nodes waiting for this knot's schema.
    pending: Vec<SchemaIdx>,
}

impl Knot {
    fn empty(base: String) -> Self {
        Knot {
            raw_json: None,
            lexical_base_uri: base,
            schema: None,
            under_loading: false,
            failed: false,
            pending: Vec::new(),
        }
    }
}

struct Loading {
    graph: SchemaGraph,
    knots: BTreeMap<String, Knot>,
    /// Fully fetched documents by document URI, for pointer-fragment
    /// evaluation.
    documents: BTreeMap<String, JsonValue>,
    client: Box<dyn SchemaClient>,
    errors: Vec<SchemaLoadError>,
}

impl Loading {
    // ---- worklist ----

    fn run_worklist(&mut self) {
        loop {
            if let Some(uri) = self.next_loadable() {
                self.load_knot(&uri);
                continue;
            }
            if let Some(uri) = self.next_unresolved() {
                if let Err(error) = self.resolve_knot_raw(&uri) {
                    self.fail_knot(&uri, error);
                }
                continue;
            }
            break;
        }
    }

    fn next_loadable(&self) -> Option<String> {
        self.knots
            .iter()
            .find(|(_, k)| {
                k.raw_json.is_some() && k.schema.is_none() && !k.under_loading && !k.failed
            })
            .map(|(uri, _)| uri.clone())
    }

    fn next_unresolved(&self) -> Option<String> {
        self.knots
            .iter()
            .find(|(_, k)| k.raw_json.is_none() && !k.failed)
            .map(|(uri, _)| uri.clone())
    }

    fn load_knot(&mut self, uri: &str) {
        let knot = self.knots.get_mut(uri).expect("loadable knot exists");
        knot.under_loading = true;
        let raw = knot.raw_json.clone().expect("loadable knot has raw JSON");
        let base = knot.lexical_base_uri.clone();

        trace!(uri, base = %base, "compiling knot");
        match self.build_schema(&raw, &base) {
            Ok(idx) => self.complete_knot(uri, idx),
            Err(error) => {
                let knot = self.knots.get_mut(uri).expect("knot exists");
                knot.under_loading = false;
                knot.failed = true;
                self.errors.push(error);
            }
        }
    }

    fn complete_knot(&mut self, uri: &str, idx: SchemaIdx) {
        let knot = self.knots.get_mut(uri).expect("knot exists");
        knot.under_loading = false;
        knot.schema = Some(idx);
        let pending = std::mem::take(&mut knot.pending);
        debug!(uri, waiting = pending.len(), "knot resolved");
        for ref_idx in pending {
            self.resolve_ref_node(ref_idx, idx);
        }
    }

    fn resolve_ref_node(&self, ref_idx: SchemaIdx, target: SchemaIdx) {
        if let SchemaNode::Ref(reference) = self.graph.node(ref_idx) {
            reference.resolve(target);
        }
    }

    /// Records resolution failure of a knot: one error per reference that
    /// was waiting on it, so independent `$ref`s to the same broken target
    /// each surface in the aggregate.
    fn fail_knot(&mut self, uri: &str, error: SchemaLoadError) {
        let knot = self.knots.get_mut(uri).expect("knot exists");
        knot.failed = true;
        let pending = std::mem::take(&mut knot.pending);
        if pending.is_empty() {
            self.errors.push(error);
            return;
        }
        let message = error.to_string();
        for ref_idx in pending {
            if let SchemaNode::Ref(reference) = self.graph.node(ref_idx) {
                self.errors.push(SchemaLoadError::RefResolution {
                    ref_uri: reference.ref_uri.clone(),
                    message: message.clone(),
                    location: reference.location.clone(),
                });
            }
        }
    }

    // ---- registration and pre-scan ----

    fn register_raw(&mut self, uri: String, raw: JsonValue, base: String) {
        let knot = self
            .knots
            .entry(uri.clone())
            .or_insert_with(|| Knot::empty(base.clone()));
        if knot.raw_json.is_none() {
            trace!(uri = %uri, base = %base, "registering raw schema content");
            knot.raw_json = Some(raw);
            knot.lexical_base_uri = base;
        }
    }

    /// Walks the whole document before any schema is constructed,
    /// registering every `$id`-rooted sub-document and every
    /// `$anchor`/`$dynamicAnchor`-bearing node, so that forward references
    /// resolve. The base URI changes on entering an object with `$id` and
    /// is restored on leaving it. Recursion only follows keywords known to
    /// hold subschemas; `enum`/`const` values and vocabulary-extension
    /// keywords are never scanned.
    fn prescan(&mut self, value: &JsonValue, base: &str) {
        let Some(object) = value.as_object() else {
            return;
        };
        let mut base = base.to_string();
        if let Some(id) = object.get("$id").and_then(JsonValue::as_str) {
            base = resolve_uri(&base, id);
            trace!(base = %base, "entering $id scope");
            self.register_raw(base.clone(), value.clone(), base.clone());
        }
        for anchor_keyword in ["$anchor", "$dynamicAnchor"] {
            if let Some(name) = object.get(anchor_keyword).and_then(JsonValue::as_str) {
                let uri = format!("{base}#{name}");
                self.register_raw(uri, value.clone(), base.clone());
            }
        }
        for (key, entry) in &object.entries {
            match Keyword::parse(&key.value) {
                Some(keyword) if keyword.has_map_like_semantics() => {
                    if let Some(map) = entry.as_object() {
                        for (_, subschema) in &map.entries {
                            self.prescan(subschema, &base);
                        }
                    }
                }
                Some(keyword) if keyword.takes_single_subschema() => {
                    self.prescan(entry, &base);
                }
                Some(keyword) if keyword.takes_subschema_array() => {
                    if let Some(subschemas) = entry.as_array() {
                        for subschema in subschemas {
                            self.prescan(subschema, &base);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    // ---- reference creation ----

    /// Creates a `Ref` node for a `$ref` occurrence and attaches it to the
    /// target knot: resolved immediately when the knot already has a
    /// schema, queued as pending otherwise.
    fn create_reference(
        &mut self,
        base: &str,
        ref_text: &str,
        location: SourceLocation,
    ) -> SchemaIdx {
        let uri = resolve_uri(base, ref_text);
        let idx = self
            .graph
            .push(SchemaNode::Ref(ReferenceSchema::new(uri.clone(), location)));
        let resolved = {
            let knot = self
                .knots
                .entry(uri)
                .or_insert_with(|| Knot::empty(base.to_string()));
            if knot.schema.is_none() {
                knot.pending.push(idx);
            }
            knot.schema
        };
        if let Some(target) = resolved {
            self.resolve_ref_node(idx, target);
        }
        idx
    }

    // ---- raw content resolution (fetch + fragment evaluation) ----

    fn resolve_knot_raw(&mut self, uri: &str) -> Result<(), SchemaLoadError> {
        let (document_uri, fragment) = split_fragment(uri);
        let document_uri = document_uri.to_string();

        let (document, document_base) = self.document_for(&document_uri)?;

        // fetching may already have filled this knot via the pre-scan
        if self
            .knots
            .get(uri)
            .is_some_and(|k| k.raw_json.is_some())
        {
            return Ok(());
        }

        let (target, target_base) = match fragment {
            None | Some("") => (document.clone(), document_base.clone()),
            Some(pointer) if pointer.starts_with('/') => {
                self.evaluate_pointer(&document, pointer, &document_base, uri)?
            }
            Some(anchor) => {
                // anchors were registered during pre-scan; when the document
                // declared its own $id, the anchor lives under that base
                let alias = format!("{document_base}#{anchor}");
                match self.knots.get(&alias).and_then(|k| {
                    k.raw_json
                        .as_ref()
                        .map(|raw| (raw.clone(), k.lexical_base_uri.clone()))
                }) {
                    Some(found) => found,
                    None => {
                        return Err(SchemaLoadError::RefResolution {
                            ref_uri: uri.to_string(),
                            message: format!(
                                "anchor \"{anchor}\" not found in {document_uri}"
                            ),
                            location: document.location().clone(),
                        });
                    }
                }
            }
        };

        let knot = self.knots.get_mut(uri).expect("knot exists");
        knot.raw_json = Some(target);
        knot.lexical_base_uri = target_base;
        Ok(())
    }

    /// Returns the parsed document for a URI, fetching it on first use and
    /// pre-scanning it under its own base URI.
    fn document_for(&mut self, document_uri: &str) -> Result<(JsonValue, String), SchemaLoadError> {
        if let Some(existing) = self.documents.get(document_uri) {
            let base = root_id(existing)
                .map(|id| resolve_uri(document_uri, id))
                .unwrap_or_else(|| document_uri.to_string());
            return Ok((existing.clone(), base));
        }
        if let Some(raw) = self
            .knots
            .get(document_uri)
            .and_then(|k| k.raw_json.as_ref().cloned())
        {
            let base = self.knots[document_uri].lexical_base_uri.clone();
            return Ok((raw, base));
        }

        debug!(uri = document_uri, "fetching referenced document");
        let fetched = self.client.get_parsed(document_uri)?;
        let base = root_id(&fetched)
            .map(|id| resolve_uri(document_uri, id))
            .unwrap_or_else(|| document_uri.to_string());
        self.documents
            .insert(document_uri.to_string(), fetched.clone());
        if base != document_uri {
            self.documents.insert(base.clone(), fetched.clone());
        }
        self.register_raw(document_uri.to_string(), fetched.clone(), base.clone());
        self.prescan(&fetched, &base);
        Ok((fetched, base))
    }

    /// JSON Pointer descent through a document, tracking `$id` bases along
    /// the path so that relative references inside the target resolve
    /// against the innermost enclosing `$id`.
    fn evaluate_pointer(
        &self,
        document: &JsonValue,
        fragment: &str,
        document_base: &str,
        ref_uri: &str,
    ) -> Result<(JsonValue, String), SchemaLoadError> {
        let mut current = document;
        let mut base = document_base.to_string();
        for raw_segment in fragment.split('/').skip(1) {
            let segment = unescape_pointer_segment(raw_segment);
            if let Some(object) = current.as_object() {
                if let Some(id) = object.get("$id").and_then(JsonValue::as_str) {
                    base = resolve_uri(&base, id);
                }
                current = object.get(&segment).ok_or_else(|| {
                    SchemaLoadError::RefResolution {
                        ref_uri: ref_uri.to_string(),
                        message: format!("could not resolve pointer segment \"{segment}\""),
                        location: current.location().clone(),
                    }
                })?;
            } else if let Some(elements) = current.as_array() {
                let index: usize =
                    segment
                        .parse()
                        .ok()
                        .filter(|i| *i < elements.len())
                        .ok_or_else(|| SchemaLoadError::RefResolution {
                            ref_uri: ref_uri.to_string(),
                            message: format!(
                                "could not resolve pointer segment \"{segment}\""
                            ),
                            location: current.location().clone(),
                        })?;
                current = &elements[index];
            } else {
                return Err(SchemaLoadError::RefResolution {
                    ref_uri: ref_uri.to_string(),
                    message: format!("could not resolve pointer segment \"{segment}\""),
                    location: current.location().clone(),
                });
            }
        }
        if let Some(id) = current
            .as_object()
            .and_then(|o| o.get("$id"))
            .and_then(JsonValue::as_str)
        {
            base = resolve_uri(&base, id);
        }
        Ok((current.clone(), base))
    }

    // ---- schema construction ----

    /// Compiles one schema value. Objects carrying `$id`/`$anchor`/
    /// `$dynamicAnchor` are identity-shared with their knots: inline
    /// construction and reference resolution always yield the same node.
    fn build_schema(
        &mut self,
        value: &JsonValue,
        base: &str,
    ) -> Result<SchemaIdx, SchemaLoadError> {
        match value {
            JsonValue::Bool(true, loc) => Ok(self.graph.push(SchemaNode::True(loc.clone()))),
            JsonValue::Bool(false, loc) => Ok(self.graph.push(SchemaNode::False(loc.clone()))),
            JsonValue::Object(object) => self.build_object_schema(value, object, base),
            other => Err(SchemaLoadError::TypeMismatch {
                source: JsonTypingError {
                    expected: "boolean or object".to_string(),
                    actual: other.type_name().to_string(),
                    location: other.location().clone(),
                },
            }),
        }
    }

    fn build_object_schema(
        &mut self,
        value: &JsonValue,
        object: &JsonObject,
        base: &str,
    ) -> Result<SchemaIdx, SchemaLoadError> {
        let mut new_base = base.to_string();
        let mut owned_uris = Vec::new();
        if let Some(id) = object.get("$id").and_then(JsonValue::as_str) {
            new_base = resolve_uri(&new_base, id);
            owned_uris.push(new_base.clone());
        }
        for anchor_keyword in ["$anchor", "$dynamicAnchor"] {
            if let Some(name) = object.get(anchor_keyword).and_then(JsonValue::as_str) {
                owned_uris.push(format!("{new_base}#{name}"));
            }
        }

        // identity sharing with knots built earlier
        for uri in &owned_uris {
            if let Some(idx) = self.knots.get(uri).and_then(|k| k.schema) {
                return Ok(idx);
            }
        }
        for uri in &owned_uris {
            let knot = self
                .knots
                .entry(uri.clone())
                .or_insert_with(|| Knot::empty(new_base.clone()));
            if knot.raw_json.is_none() {
                knot.raw_json = Some(value.clone());
                knot.lexical_base_uri = new_base.clone();
            }
            knot.under_loading = true;
        }

        let built = self.build_composite(object, &new_base);

        match built {
            Ok(idx) => {
                for uri in &owned_uris {
                    self.complete_knot(uri, idx);
                }
                Ok(idx)
            }
            Err(error) => {
                for uri in &owned_uris {
                    let knot = self.knots.get_mut(uri).expect("knot exists");
                    knot.under_loading = false;
                    knot.failed = true;
                }
                Err(error)
            }
        }
    }

    fn build_composite(
        &mut self,
        object: &JsonObject,
        base: &str,
    ) -> Result<SchemaIdx, SchemaLoadError> {
        let mut composite = CompositeSchema {
            location: object.location.clone(),
            ..CompositeSchema::default()
        };

        let mut nested_anchors = Vec::new();
        collect_dynamic_anchors(object, base, &mut nested_anchors);
        for (name, uri) in nested_anchors {
            let reference = self.create_reference(base, &uri, object.location.clone());
            composite.dynamic_anchors.push((name, reference));
        }

        // sibling data consulted by several keywords, captured up front so
        // evaluation is independent of keyword order in the source
        let prefix_item_count = object
            .get("prefixItems")
            .and_then(JsonValue::as_array)
            .map(|prefix| prefix.len())
            .unwrap_or(0);
        let min_contains = match object.get("minContains") {
            Some(v) => non_negative(v)?,
            None => 1,
        };
        let max_contains = match object.get("maxContains") {
            Some(v) => Some(non_negative(v)?),
            None => None,
        };

        for (key, entry) in &object.entries {
            let Some(keyword) = Keyword::parse(&key.value) else {
                continue;
            };
            let location = entry.location().clone();
            match keyword {
                // handled structurally or folded into another keyword
                Keyword::Id
                | Keyword::Schema
                | Keyword::Comment
                | Keyword::Defs
                | Keyword::Examples
                | Keyword::Then
                | Keyword::Else
                | Keyword::MinContains
                | Keyword::MaxContains => {}

                Keyword::Anchor => {
                    entry.require_str()?;
                }
                Keyword::DynamicAnchor => {
                    composite.dynamic_anchor = Some(entry.require_str()?.to_string());
                }
                Keyword::Vocabulary => {
                    let map = entry.require_object()?;
                    for (uri, enabled) in &map.entries {
                        if enabled.require_bool()? {
                            composite.vocabulary.push(uri.value.clone());
                        }
                    }
                }
                Keyword::Ref => {
                    let reference =
                        self.create_reference(base, entry.require_str()?, location.clone());
                    composite
                        .keywords
                        .push(KeywordSchema::Ref { reference, location });
                }
                Keyword::DynamicRef => {
                    let text = entry.require_str()?;
                    let fallback = self.create_reference(base, text, location.clone());
                    let anchor_name = text
                        .split_once('#')
                        .map(|(_, fragment)| fragment)
                        .filter(|f| !f.is_empty() && !f.starts_with('/'))
                        .map(str::to_string);
                    composite.dynamic_ref = Some(DynamicReference {
                        ref_uri: text.to_string(),
                        anchor_name,
                        fallback,
                        location,
                    });
                }

                Keyword::Type => {
                    let allowed = match entry {
                        JsonValue::String(s) => vec![s.value.clone()],
                        JsonValue::Array(elements, _) => elements
                            .iter()
                            .map(|e| e.require_str().map(str::to_string))
                            .collect::<Result<Vec<_>, _>>()?,
                        other => {
                            return Err(SchemaLoadError::TypeMismatch {
                                source: JsonTypingError {
                                    expected: "string or array".to_string(),
                                    actual: other.type_name().to_string(),
                                    location: other.location().clone(),
                                },
                            });
                        }
                    };
                    for name in &allowed {
                        if !VALID_TYPE_NAMES.contains(&name.as_str()) {
                            return Err(SchemaLoadError::InvalidKeywordValue {
                                message: format!("unknown type name \"{name}\""),
                                location: location.clone(),
                            });
                        }
                    }
                    composite
                        .keywords
                        .push(KeywordSchema::Type { allowed, location });
                }
                Keyword::Const => composite.keywords.push(KeywordSchema::Const {
                    value: entry.clone(),
                    location,
                }),
                Keyword::Enum => composite.keywords.push(KeywordSchema::Enum {
                    values: entry.require_array()?.to_vec(),
                    location,
                }),

                Keyword::MinLength => composite.keywords.push(KeywordSchema::MinLength {
                    limit: non_negative(entry)?,
                    location,
                }),
                Keyword::MaxLength => composite.keywords.push(KeywordSchema::MaxLength {
                    limit: non_negative(entry)?,
                    location,
                }),
                Keyword::Pattern => composite.keywords.push(KeywordSchema::Pattern {
                    regex: compile_regex(entry)?,
                    location,
                }),
                Keyword::Format => composite.keywords.push(KeywordSchema::Format {
                    name: entry.require_str()?.to_string(),
                    location,
                }),

                Keyword::Minimum => composite.keywords.push(KeywordSchema::Minimum {
                    limit: *entry.require_number()?,
                    location,
                }),
                Keyword::Maximum => composite.keywords.push(KeywordSchema::Maximum {
                    limit: *entry.require_number()?,
                    location,
                }),
                Keyword::ExclusiveMinimum => {
                    composite.keywords.push(KeywordSchema::ExclusiveMinimum {
                        limit: *entry.require_number()?,
                        location,
                    });
                }
                Keyword::ExclusiveMaximum => {
                    composite.keywords.push(KeywordSchema::ExclusiveMaximum {
                        limit: *entry.require_number()?,
                        location,
                    });
                }
                Keyword::MultipleOf => composite.keywords.push(KeywordSchema::MultipleOf {
                    factor: *entry.require_number()?,
                    location,
                }),

                Keyword::MinItems => composite.keywords.push(KeywordSchema::MinItems {
                    limit: non_negative(entry)?,
                    location,
                }),
                Keyword::MaxItems => composite.keywords.push(KeywordSchema::MaxItems {
                    limit: non_negative(entry)?,
                    location,
                }),
                Keyword::UniqueItems => composite.keywords.push(KeywordSchema::UniqueItems {
                    unique: entry.require_bool()?,
                    location,
                }),
                Keyword::MinProperties => composite.keywords.push(KeywordSchema::MinProperties {
                    limit: non_negative(entry)?,
                    location,
                }),
                Keyword::MaxProperties => composite.keywords.push(KeywordSchema::MaxProperties {
                    limit: non_negative(entry)?,
                    location,
                }),
                Keyword::Required => {
                    let names = entry
                        .require_array()?
                        .iter()
                        .map(|e| e.require_str().map(str::to_string))
                        .collect::<Result<Vec<_>, _>>()?;
                    composite
                        .keywords
                        .push(KeywordSchema::Required { names, location });
                }
                Keyword::DependentRequired => {
                    let map = entry.require_object()?;
                    let mut dependencies = Vec::new();
                    for (property, required) in &map.entries {
                        let names = required
                            .require_array()?
                            .iter()
                            .map(|e| e.require_str().map(str::to_string))
                            .collect::<Result<Vec<_>, _>>()?;
                        dependencies.push((property.value.clone(), names));
                    }
                    composite.keywords.push(KeywordSchema::DependentRequired {
                        dependencies,
                        location,
                    });
                }
                Keyword::DependentSchemas => {
                    let map = entry.require_object()?;
                    let mut dependencies = Vec::new();
                    for (property, subschema) in &map.entries {
                        let idx = self.build_schema(subschema, base)?;
                        dependencies.push((property.value.clone(), idx));
                    }
                    composite.keywords.push(KeywordSchema::DependentSchemas {
                        dependencies,
                        location,
                    });
                }

                Keyword::AllOf => composite.keywords.push(KeywordSchema::AllOf {
                    subschemas: self.build_schema_array(entry, base)?,
                    location,
                }),
                Keyword::AnyOf => composite.keywords.push(KeywordSchema::AnyOf {
                    subschemas: self.build_schema_array(entry, base)?,
                    location,
                }),
                Keyword::OneOf => composite.keywords.push(KeywordSchema::OneOf {
                    subschemas: self.build_schema_array(entry, base)?,
                    location,
                }),
                Keyword::Not => composite.keywords.push(KeywordSchema::Not {
                    subschema: self.build_schema(entry, base)?,
                    location,
                }),
                Keyword::If => {
                    let if_schema = self.build_schema(entry, base)?;
                    let then_schema = match object.get("then") {
                        Some(then) => Some(self.build_schema(then, base)?),
                        None => None,
                    };
                    let else_schema = match object.get("else") {
                        Some(els) => Some(self.build_schema(els, base)?),
                        None => None,
                    };
                    composite.keywords.push(KeywordSchema::IfThenElse {
                        if_schema,
                        then_schema,
                        else_schema,
                        location,
                    });
                }

                Keyword::PrefixItems => composite.keywords.push(KeywordSchema::PrefixItems {
                    subschemas: self.build_schema_array(entry, base)?,
                    location,
                }),
                Keyword::Items => composite.keywords.push(KeywordSchema::Items {
                    subschema: self.build_schema(entry, base)?,
                    prefix_item_count,
                    location,
                }),
                Keyword::Contains => composite.keywords.push(KeywordSchema::Contains {
                    subschema: self.build_schema(entry, base)?,
                    min_contains,
                    max_contains,
                    location,
                }),

                Keyword::Properties => {
                    let map = entry.require_object()?;
                    for (name, subschema) in &map.entries {
                        let idx = self.build_schema(subschema, base)?;
                        composite.property_schemas.push((name.value.clone(), idx));
                    }
                }
                Keyword::PatternProperties => {
                    let map = entry.require_object()?;
                    for (pattern, subschema) in &map.entries {
                        let regex = compile_regex_str(&pattern.value, &pattern.location)?;
                        let idx = self.build_schema(subschema, base)?;
                        composite.pattern_property_schemas.push((regex, idx));
                    }
                }
                Keyword::AdditionalProperties => {
                    let keys_in_properties = object
                        .get("properties")
                        .and_then(JsonValue::as_object)
                        .map(|m| m.keys().map(str::to_string).collect())
                        .unwrap_or_default();
                    let pattern_keys = match object
                        .get("patternProperties")
                        .and_then(JsonValue::as_object)
                    {
                        Some(m) => m
                            .entries
                            .iter()
                            .map(|(p, _)| compile_regex_str(&p.value, &p.location))
                            .collect::<Result<Vec<_>, _>>()?,
                        None => Vec::new(),
                    };
                    composite.keywords.push(KeywordSchema::AdditionalProperties {
                        subschema: self.build_schema(entry, base)?,
                        keys_in_properties,
                        pattern_keys,
                        location,
                    });
                }
                Keyword::PropertyNames => composite.keywords.push(KeywordSchema::PropertyNames {
                    subschema: self.build_schema(entry, base)?,
                    location,
                }),

                Keyword::UnevaluatedItems => {
                    composite.unevaluated_items = Some(self.build_schema(entry, base)?);
                }
                Keyword::UnevaluatedProperties => {
                    composite.unevaluated_properties = Some(self.build_schema(entry, base)?);
                }

                Keyword::Title => {
                    composite.metadata.title = Some(entry.require_str()?.to_string());
                }
                Keyword::Description => {
                    composite.metadata.description = Some(entry.require_str()?.to_string());
                }
                Keyword::Default => {
                    composite.metadata.default = Some(entry.clone());
                }
                Keyword::Deprecated => {
                    composite.metadata.deprecated = entry.require_bool()?;
                }
                Keyword::ReadOnly => {
                    if entry.require_bool()? {
                        composite.keywords.push(KeywordSchema::ReadOnly { location });
                    }
                }
                Keyword::WriteOnly => {
                    if entry.require_bool()? {
                        composite.keywords.push(KeywordSchema::WriteOnly { location });
                    }
                }
            }
        }

        Ok(self.graph.push(SchemaNode::Composite(composite)))
    }

    fn build_schema_array(
        &mut self,
        entry: &JsonValue,
        base: &str,
    ) -> Result<Vec<SchemaIdx>, SchemaLoadError> {
        entry
            .require_array()?
            .iter()
            .map(|subschema| self.build_schema(subschema, base))
            .collect()
    }
}

// ---- helpers ----

/// Collects `$dynamicAnchor` declarations lexically nested under a schema
/// object, paired with the absolute URI each one resolves to. `$id`s along
/// the descent shift the base the anchor URI is computed against.
fn collect_dynamic_anchors(object: &JsonObject, base: &str, found: &mut Vec<(String, String)>) {
    for (key, entry) in &object.entries {
        match Keyword::parse(&key.value) {
            Some(keyword) if keyword.has_map_like_semantics() => {
                if let Some(map) = entry.as_object() {
                    for (_, subschema) in &map.entries {
                        collect_anchors_from_value(subschema, base, found);
                    }
                }
            }
            Some(keyword) if keyword.takes_single_subschema() => {
                collect_anchors_from_value(entry, base, found);
            }
            Some(keyword) if keyword.takes_subschema_array() => {
                if let Some(subschemas) = entry.as_array() {
                    for subschema in subschemas {
                        collect_anchors_from_value(subschema, base, found);
                    }
                }
            }
            _ => {}
        }
    }
}

fn collect_anchors_from_value(value: &JsonValue, base: &str, found: &mut Vec<(String, String)>) {
    let Some(object) = value.as_object() else {
        return;
    };
    let mut base = base.to_string();
    if let Some(id) = object.get("$id").and_then(JsonValue::as_str) {
        base = resolve_uri(&base, id);
    }
    if let Some(name) = object.get("$dynamicAnchor").and_then(JsonValue::as_str) {
        found.push((name.to_string(), format!("{base}#{name}")));
    }
    collect_dynamic_anchors(object, &base, found);
}

fn non_negative(value: &JsonValue) -> Result<u64, SchemaLoadError> {
    let n = value.require_int()?;
    u64::try_from(n).map_err(|_| SchemaLoadError::InvalidKeywordValue {
        message: format!("expected a non-negative integer, found {n}"),
        location: value.location().clone(),
    })
}

fn compile_regex(value: &JsonValue) -> Result<regex::Regex, SchemaLoadError> {
    compile_regex_str(value.require_str()?, value.location())
}

fn compile_regex_str(
    pattern: &str,
    location: &SourceLocation,
) -> Result<regex::Regex, SchemaLoadError> {
    regex::Regex::new(pattern).map_err(|e| SchemaLoadError::InvalidKeywordValue {
        message: format!("invalid regular expression: {e}"),
        location: location.clone(),
    })
}

/// Strips a trailing empty fragment: `http://x/s#` and `http://x/s` name
/// the same knot.
fn normalize(mut uri: String) -> String {
    if uri.ends_with('#') {
        uri.pop();
    }
    uri
}

fn split_fragment(uri: &str) -> (&str, Option<&str>) {
    match uri.split_once('#') {
        Some((document, fragment)) => (document, Some(fragment)),
        None => (uri, None),
    }
}

/// Resolves a reference against a base URI. Absolute references stand
/// alone; `urn:` bases concatenate (they are not hierarchical); everything
/// else is RFC 3986 joining.
pub(crate) fn resolve_uri(base: &str, reference: &str) -> String {
    if let Ok(absolute) = Url::parse(reference) {
        return normalize(absolute.to_string());
    }
    if base.starts_with("urn:") {
        let (document, _) = split_fragment(base);
        return normalize(format!("{document}{reference}"));
    }
    match Url::parse(base).and_then(|b| b.join(reference)) {
        Ok(joined) => normalize(joined.to_string()),
        Err(_) => {
            let (document, _) = split_fragment(base);
            normalize(format!("{document}{reference}"))
        }
    }
}

/// RFC 6901 unescaping plus percent-decoding of a fragment segment.
fn unescape_pointer_segment(raw: &str) -> String {
    let mut decoded = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '%' {
            let hex: String = chars.by_ref().take(2).collect();
            if let Ok(byte) = u8::from_str_radix(&hex, 16) {
                decoded.push(byte as char);
            } else {
                decoded.push('%');
                decoded.push_str(&hex);
            }
        } else {
            decoded.push(ch);
        }
    }
    decoded.replace("~1", "/").replace("~0", "~")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_against_hierarchical_base() {
        assert_eq!(
            resolve_uri("http://example.org/root.json", "other.json"),
            "http://example.org/other.json"
        );
        assert_eq!(
            resolve_uri("http://example.org/root.json", "#frag"),
            "http://example.org/root.json#frag"
        );
        assert_eq!(resolve_uri("mem://input", "#"), "mem://input");
    }

    #[test]
    fn absolute_references_ignore_the_base() {
        assert_eq!(
            resolve_uri("mem://input", "https://example.org/s.json"),
            "https://example.org/s.json"
        );
    }

    #[test]
    fn urn_bases_concatenate() {
        assert_eq!(
            resolve_uri("urn:uuid:f81d4fae-7dec", "#x"),
            "urn:uuid:f81d4fae-7dec#x"
        );
    }

    #[test]
    fn pointer_segments_unescape() {
        assert_eq!(unescape_pointer_segment("a~1b"), "a/b");
        assert_eq!(unescape_pointer_segment("a~0b"), "a~b");
        assert_eq!(unescape_pointer_segment("a~01b"), "a~1b");
        assert_eq!(unescape_pointer_segment("a%20b"), "a b");
    }
}
