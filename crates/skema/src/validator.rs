//! Dynamic-scope-aware validation of instance documents against a loaded
//! schema graph.
//!
//! One `Validator` carries per-call mutable state (the dynamic scope stack,
//! the dynamic path and the evaluation tracker), so a single instance must
//! not be used for overlapping `validate` calls. The [`LoadedSchema`] it
//! reads is immutable and can back any number of validators.

use crate::failure::ValidationFailure;
use crate::formats::check_format;
use crate::keyword::Keyword;
use crate::schema::{
    CompositeSchema, DynamicReference, KeywordSchema, LoadedSchema, SchemaIdx, SchemaNode,
};
use skema_json::{JsonNumber, JsonPointer, JsonValue, SourceLocation};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

const FORMAT_ASSERTION_VOCABULARY: &str =
    "https://json-schema.org/draft/2020-12/vocab/format-assertion";

/// When `format` is enforced as an assertion rather than an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatValidationPolicy {
    Always,
    Never,
    /// Enforce when the active `$vocabulary` declares the format-assertion
    /// vocabulary, or declares no vocabulary at all.
    #[default]
    DependsOnVocabulary,
}

/// Gates `readOnly`/`writeOnly` enforcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadWriteContext {
    Read,
    Write,
    #[default]
    None,
}

#[derive(Default)]
pub struct ValidatorConfig {
    pub format_validation: FormatValidationPolicy,
    pub read_write_context: ReadWriteContext,
    /// Consulted before the built-in format predicates.
    pub additional_format_validators: HashMap<String, fn(&str) -> bool>,
}

impl ValidatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format_validation(mut self, policy: FormatValidationPolicy) -> Self {
        self.format_validation = policy;
        self
    }

    pub fn with_read_write_context(mut self, context: ReadWriteContext) -> Self {
        self.read_write_context = context;
        self
    }

    pub fn with_format_validator(mut self, name: impl Into<String>, f: fn(&str) -> bool) -> Self {
        self.additional_format_validators.insert(name.into(), f);
        self
    }
}

/// Evaluation-marking side table, keyed by instance node identity. Built
/// lazily: marks are only recorded for instance nodes explicitly armed by a
/// composite that carries an `unevaluated*` keyword.
#[derive(Default)]
struct EvalTracker {
    armed: HashSet<usize>,
    properties: HashMap<usize, HashSet<String>>,
    items: HashMap<usize, HashSet<usize>>,
}

fn identity(instance: &JsonValue) -> usize {
    instance as *const JsonValue as usize
}

impl EvalTracker {
    fn arm(&mut self, instance: &JsonValue) {
        self.armed.insert(identity(instance));
    }

    /// Marks a property as evaluated. Returns whether a new mark was set,
    /// so tentative marks can be rolled back precisely.
    fn mark_property(&mut self, instance: &JsonValue, name: &str) -> bool {
        let key = identity(instance);
        if !self.armed.contains(&key) {
            return false;
        }
        self.properties
            .entry(key)
            .or_default()
            .insert(name.to_string())
    }

    fn unmark_property(&mut self, instance: &JsonValue, name: &str) {
        if let Some(marks) = self.properties.get_mut(&identity(instance)) {
            marks.remove(name);
        }
    }

    fn is_property_marked(&self, instance: &JsonValue, name: &str) -> bool {
        self.properties
            .get(&identity(instance))
            .is_some_and(|marks| marks.contains(name))
    }

    fn mark_item(&mut self, instance: &JsonValue, index: usize) -> bool {
        let key = identity(instance);
        if !self.armed.contains(&key) {
            return false;
        }
        self.items.entry(key).or_default().insert(index)
    }

    fn unmark_item(&mut self, instance: &JsonValue, index: usize) {
        if let Some(marks) = self.items.get_mut(&identity(instance)) {
            marks.remove(&index);
        }
    }

    fn is_item_marked(&self, instance: &JsonValue, index: usize) -> bool {
        self.items
            .get(&identity(instance))
            .is_some_and(|marks| marks.contains(&index))
    }
}

/// Walks a schema graph and an instance tree in lockstep.
pub struct Validator<'g> {
    schema: &'g LoadedSchema,
    config: ValidatorConfig,
    dynamic_scope: Vec<SchemaIdx>,
    dynamic_path: Vec<String>,
    tracker: EvalTracker,
}

impl<'g> Validator<'g> {
    pub fn for_schema(schema: &'g LoadedSchema) -> Self {
        Validator::create(schema, ValidatorConfig::default())
    }

    pub fn create(schema: &'g LoadedSchema, config: ValidatorConfig) -> Self {
        Validator {
            schema,
            config,
            dynamic_scope: Vec::new(),
            dynamic_path: Vec::new(),
            tracker: EvalTracker::default(),
        }
    }

    /// Validates one instance. `None` means the instance conforms.
    pub fn validate(&mut self, instance: &JsonValue) -> Option<ValidationFailure> {
        self.dynamic_scope.clear();
        self.dynamic_path.clear();
        self.tracker = EvalTracker::default();
        self.validate_node(self.schema.root(), instance)
    }

    // ---- traversal ----

    fn node(&self, idx: SchemaIdx) -> &'g SchemaNode {
        self.schema.graph().node(idx)
    }

    fn validate_node(&mut self, idx: SchemaIdx, instance: &JsonValue) -> Option<ValidationFailure> {
        match self.node(idx) {
            SchemaNode::True(_) => None,
            SchemaNode::False(location) => Some(self.failure(
                "false schema always fails",
                None,
                location,
                instance,
            )),
            SchemaNode::Ref(reference) => {
                let target = reference
                    .target()
                    .unwrap_or_else(|| unreachable!("references are resolved during loading"));
                self.with_path(Keyword::Ref.as_str(), |v| v.validate_node(target, instance))
            }
            SchemaNode::Composite(composite) => self.validate_composite(idx, composite, instance),
        }
    }

    fn validate_composite(
        &mut self,
        idx: SchemaIdx,
        composite: &'g CompositeSchema,
        instance: &JsonValue,
    ) -> Option<ValidationFailure> {
        self.dynamic_scope.push(idx);
        if composite.unevaluated_items.is_some() || composite.unevaluated_properties.is_some() {
            self.tracker.arm(instance);
        }

        let mut failure = None;
        for keyword in &composite.keywords {
            // `if`/`then`/`else` and `$ref` manage their own path segments
            let current = match keyword {
                KeywordSchema::IfThenElse { .. } | KeywordSchema::Ref { .. } => {
                    self.validate_keyword(keyword, instance)
                }
                other => self.with_path(other.keyword().as_str(), |v| {
                    v.validate_keyword(other, instance)
                }),
            };
            failure = ValidationFailure::accumulate(failure, current);
        }
        let current = self.validate_properties(composite, instance);
        failure = ValidationFailure::accumulate(failure, current);
        let current = self.validate_pattern_properties(composite, instance);
        failure = ValidationFailure::accumulate(failure, current);
        if let Some(dynamic_ref) = &composite.dynamic_ref {
            let current = self.validate_dynamic_ref(dynamic_ref, instance);
            failure = ValidationFailure::accumulate(failure, current);
        }

        // unevaluated* runs last, and only when the sibling applicators of
        // this composite produced no failure
        if failure.is_none() {
            if let Some(subschema) = composite.unevaluated_items {
                let current = self.validate_unevaluated_items(subschema, instance);
                failure = ValidationFailure::accumulate(failure, current);
            }
            if let Some(subschema) = composite.unevaluated_properties {
                let current = self.validate_unevaluated_properties(subschema, instance);
                failure = ValidationFailure::accumulate(failure, current);
            }
        }

        self.dynamic_scope.pop();
        failure
    }

    fn with_path<T>(&mut self, segment: impl Into<String>, f: impl FnOnce(&mut Self) -> T) -> T {
        self.dynamic_path.push(segment.into());
        let result = f(self);
        self.dynamic_path.pop();
        result
    }

    fn failure(
        &self,
        message: impl Into<String>,
        keyword: Option<Keyword>,
        schema_location: &SourceLocation,
        instance: &JsonValue,
    ) -> ValidationFailure {
        ValidationFailure::new(
            message,
            keyword,
            schema_location.clone(),
            instance.location().clone(),
            JsonPointer::from_segments(self.dynamic_path.clone()),
        )
    }

    // ---- keyword dispatch ----

    fn validate_keyword(
        &mut self,
        keyword: &'g KeywordSchema,
        instance: &JsonValue,
    ) -> Option<ValidationFailure> {
        match keyword {
            KeywordSchema::Type { allowed, location } => {
                self.check_type(allowed, location, instance)
            }
            KeywordSchema::Const { value, location } => (instance != value).then(|| {
                self.failure(
                    "actual instance is not the same as the expected constant value",
                    Some(Keyword::Const),
                    location,
                    instance,
                )
            }),
            KeywordSchema::Enum { values, location } => {
                (!values.iter().any(|v| v == instance)).then(|| {
                    self.failure(
                        "the instance is not equal to any enum values",
                        Some(Keyword::Enum),
                        location,
                        instance,
                    )
                })
            }

            KeywordSchema::MinLength { limit, location } => {
                let length = instance.as_str()?.chars().count() as u64;
                (length < *limit).then(|| {
                    self.failure(
                        format!("actual string length {length} is lower than minLength {limit}"),
                        Some(Keyword::MinLength),
                        location,
                        instance,
                    )
                })
            }
            KeywordSchema::MaxLength { limit, location } => {
                let length = instance.as_str()?.chars().count() as u64;
                (length > *limit).then(|| {
                    self.failure(
                        format!(
                            "actual string length {length} is greater than maxLength {limit}"
                        ),
                        Some(Keyword::MaxLength),
                        location,
                        instance,
                    )
                })
            }
            KeywordSchema::Pattern { regex, location } => {
                let value = instance.as_str()?;
                (!regex.is_match(value)).then(|| {
                    self.failure(
                        format!("instance value did not match pattern {regex}"),
                        Some(Keyword::Pattern),
                        location,
                        instance,
                    )
                })
            }
            KeywordSchema::Format { name, location } => self.check_named_format(
                name,
                location,
                instance,
            ),

            KeywordSchema::Minimum { limit, location } => {
                self.check_bound(instance, limit, location, Keyword::Minimum, |ord| {
                    ord != Ordering::Less
                })
            }
            KeywordSchema::Maximum { limit, location } => {
                self.check_bound(instance, limit, location, Keyword::Maximum, |ord| {
                    ord != Ordering::Greater
                })
            }
            KeywordSchema::ExclusiveMinimum { limit, location } => self.check_bound(
                instance,
                limit,
                location,
                Keyword::ExclusiveMinimum,
                |ord| ord == Ordering::Greater,
            ),
            KeywordSchema::ExclusiveMaximum { limit, location } => self.check_bound(
                instance,
                limit,
                location,
                Keyword::ExclusiveMaximum,
                |ord| ord == Ordering::Less,
            ),
            KeywordSchema::MultipleOf { factor, location } => {
                let number = instance.as_number()?;
                (!number.is_multiple_of(factor)).then(|| {
                    self.failure(
                        format!("{number} is not a multiple of {factor}"),
                        Some(Keyword::MultipleOf),
                        location,
                        instance,
                    )
                })
            }

            KeywordSchema::MinItems { limit, location } => {
                let count = instance.as_array()?.len() as u64;
                (count < *limit).then(|| {
                    self.failure(
                        format!("expected minimum items: {limit}, found only {count}"),
                        Some(Keyword::MinItems),
                        location,
                        instance,
                    )
                })
            }
            KeywordSchema::MaxItems { limit, location } => {
                let count = instance.as_array()?.len() as u64;
                (count > *limit).then(|| {
                    self.failure(
                        format!("expected maximum items: {limit}, found {count}"),
                        Some(Keyword::MaxItems),
                        location,
                        instance,
                    )
                })
            }
            KeywordSchema::UniqueItems { unique, location } => {
                if !*unique {
                    return None;
                }
                let elements = instance.as_array()?;
                for (i, left) in elements.iter().enumerate() {
                    for (j, right) in elements.iter().enumerate().skip(i + 1) {
                        if left == right {
                            return Some(self.failure(
                                format!("array items {i} and {j} are equal"),
                                Some(Keyword::UniqueItems),
                                location,
                                instance,
                            ));
                        }
                    }
                }
                None
            }
            KeywordSchema::MinProperties { limit, location } => {
                let count = instance.as_object()?.len() as u64;
                (count < *limit).then(|| {
                    self.failure(
                        format!("expected minimum properties: {limit}, found only {count}"),
                        Some(Keyword::MinProperties),
                        location,
                        instance,
                    )
                })
            }
            KeywordSchema::MaxProperties { limit, location } => {
                let count = instance.as_object()?.len() as u64;
                (count > *limit).then(|| {
                    self.failure(
                        format!("expected maximum properties: {limit}, found {count}"),
                        Some(Keyword::MaxProperties),
                        location,
                        instance,
                    )
                })
            }
            KeywordSchema::Required { names, location } => {
                let object = instance.as_object()?;
                let missing: Vec<&str> = names
                    .iter()
                    .filter(|name| !object.contains_key(name.as_str()))
                    .map(String::as_str)
                    .collect();
                (!missing.is_empty()).then(|| {
                    self.failure(
                        format!("required properties are missing: {}", missing.join(", ")),
                        Some(Keyword::Required),
                        location,
                        instance,
                    )
                })
            }
            KeywordSchema::DependentRequired {
                dependencies,
                location,
            } => {
                let object = instance.as_object()?;
                let mut failure = None;
                for (property, required) in dependencies {
                    if !object.contains_key(property) {
                        continue;
                    }
                    let missing: Vec<&str> = required
                        .iter()
                        .filter(|name| !object.contains_key(name.as_str()))
                        .map(String::as_str)
                        .collect();
                    if !missing.is_empty() {
                        let current = self.failure(
                            format!(
                                "property \"{property}\" requires properties: {}",
                                missing.join(", ")
                            ),
                            Some(Keyword::DependentRequired),
                            location,
                            instance,
                        );
                        failure = ValidationFailure::accumulate(failure, Some(current));
                    }
                }
                failure
            }
            KeywordSchema::DependentSchemas { dependencies, .. } => {
                let object = instance.as_object()?;
                let mut failure = None;
                for (property, subschema) in dependencies {
                    if !object.contains_key(property) {
                        continue;
                    }
                    let subschema = *subschema;
                    let current =
                        self.with_path(property.clone(), |v| v.validate_node(subschema, instance));
                    failure = ValidationFailure::accumulate(failure, current);
                }
                failure
            }

            KeywordSchema::AllOf {
                subschemas,
                location,
            } => self.check_all_of(subschemas, location, instance),
            KeywordSchema::AnyOf {
                subschemas,
                location,
            } => self.check_any_of(subschemas, location, instance),
            KeywordSchema::OneOf {
                subschemas,
                location,
            } => self.check_one_of(subschemas, location, instance),
            KeywordSchema::Not {
                subschema,
                location,
            } => {
                let subschema = *subschema;
                let inner = self.validate_node(subschema, instance);
                inner.is_none().then(|| {
                    self.failure(
                        "negated subschema did not fail",
                        Some(Keyword::Not),
                        location,
                        instance,
                    )
                })
            }
            KeywordSchema::IfThenElse {
                if_schema,
                then_schema,
                else_schema,
                ..
            } => {
                let if_schema = *if_schema;
                let condition_holds = self
                    .with_path(Keyword::If.as_str(), |v| {
                        v.validate_node(if_schema, instance)
                    })
                    .is_none();
                if condition_holds {
                    let then_schema = (*then_schema)?;
                    self.with_path(Keyword::Then.as_str(), |v| {
                        v.validate_node(then_schema, instance)
                    })
                } else {
                    let else_schema = (*else_schema)?;
                    self.with_path(Keyword::Else.as_str(), |v| {
                        v.validate_node(else_schema, instance)
                    })
                }
            }

            KeywordSchema::PrefixItems { subschemas, .. } => {
                self.check_prefix_items(subschemas, instance)
            }
            KeywordSchema::Items {
                subschema,
                prefix_item_count,
                ..
            } => self.check_items(*subschema, *prefix_item_count, instance),
            KeywordSchema::Contains {
                subschema,
                min_contains,
                max_contains,
                location,
            } => self.check_contains(*subschema, *min_contains, *max_contains, location, instance),
            KeywordSchema::AdditionalProperties {
                subschema,
                keys_in_properties,
                pattern_keys,
                ..
            } => self.check_additional_properties(
                *subschema,
                keys_in_properties,
                pattern_keys,
                instance,
            ),
            KeywordSchema::PropertyNames { subschema, .. } => {
                self.check_property_names(*subschema, instance)
            }

            KeywordSchema::Ref { reference, .. } => {
                let reference = *reference;
                self.validate_node(reference, instance)
            }

            KeywordSchema::ReadOnly { location } => {
                (self.config.read_write_context == ReadWriteContext::Write).then(|| {
                    self.failure(
                        "read-only value must not be present in write context",
                        Some(Keyword::ReadOnly),
                        location,
                        instance,
                    )
                })
            }
            KeywordSchema::WriteOnly { location } => {
                (self.config.read_write_context == ReadWriteContext::Read).then(|| {
                    self.failure(
                        "write-only value must not be present in read context",
                        Some(Keyword::WriteOnly),
                        location,
                        instance,
                    )
                })
            }
        }
    }

    // ---- type ----

    fn check_type(
        &self,
        allowed: &[String],
        location: &SourceLocation,
        instance: &JsonValue,
    ) -> Option<ValidationFailure> {
        let actual = instance_type_name(instance);
        let matches = allowed.iter().any(|declared| {
            declared == actual || (declared == "number" && actual == "integer")
        });
        if matches {
            return None;
        }
        let message = if allowed.len() == 1 {
            format!("expected type: {}, actual: {actual}", allowed[0])
        } else {
            format!(
                "expected type: one of {}, actual: {actual}",
                allowed.join(", ")
            )
        };
        Some(self.failure(message, Some(Keyword::Type), location, instance))
    }

    // ---- numeric bounds ----

    fn check_bound(
        &self,
        instance: &JsonValue,
        limit: &JsonNumber,
        location: &SourceLocation,
        keyword: Keyword,
        ok: impl Fn(Ordering) -> bool,
    ) -> Option<ValidationFailure> {
        let number = instance.as_number()?;
        if ok(number.compare(limit)) {
            return None;
        }
        let message = match keyword {
            Keyword::Minimum => format!("{number} is lower than minimum {limit}"),
            Keyword::Maximum => format!("{number} is greater than maximum {limit}"),
            Keyword::ExclusiveMinimum => {
                format!("{number} is not greater than exclusiveMinimum {limit}")
            }
            _ => format!("{number} is not lower than exclusiveMaximum {limit}"),
        };
        Some(self.failure(message, Some(keyword), location, instance))
    }

    // ---- format ----

    fn check_named_format(
        &self,
        name: &str,
        location: &SourceLocation,
        instance: &JsonValue,
    ) -> Option<ValidationFailure> {
        let value = instance.as_str()?;
        let assert = match self.config.format_validation {
            FormatValidationPolicy::Always => true,
            FormatValidationPolicy::Never => false,
            FormatValidationPolicy::DependsOnVocabulary => {
                let vocabulary = self.active_vocabulary();
                vocabulary.is_empty()
                    || vocabulary.iter().any(|v| v == FORMAT_ASSERTION_VOCABULARY)
            }
        };
        if !assert {
            return None;
        }
        let valid = match self.config.additional_format_validators.get(name) {
            Some(custom) => custom(value),
            None => check_format(name, value),
        };
        (!valid).then(|| {
            self.failure(
                format!("instance does not match format '{name}'"),
                Some(Keyword::Format),
                location,
                instance,
            )
        })
    }

    /// The innermost non-empty `$vocabulary` declaration on the dynamic
    /// scope. Schema documents declare vocabularies at their root, so this
    /// finds the declaration of the containing document.
    fn active_vocabulary(&self) -> &'g [String] {
        for idx in self.dynamic_scope.iter().rev() {
            if let SchemaNode::Composite(composite) = self.node(*idx) {
                if !composite.vocabulary.is_empty() {
                    return &composite.vocabulary;
                }
            }
        }
        &[]
    }

    // ---- combinators ----

    fn check_all_of(
        &mut self,
        subschemas: &[SchemaIdx],
        location: &SourceLocation,
        instance: &JsonValue,
    ) -> Option<ValidationFailure> {
        let mut causes = Vec::new();
        for (i, subschema) in subschemas.iter().enumerate() {
            let subschema = *subschema;
            let result = self.with_path(i.to_string(), |v| v.validate_node(subschema, instance));
            if let Some(cause) = result {
                causes.push(cause);
            }
        }
        (!causes.is_empty()).then(|| {
            self.failure(
                format!(
                    "{} subschemas out of {} failed to validate",
                    causes.len(),
                    subschemas.len()
                ),
                Some(Keyword::AllOf),
                location,
                instance,
            )
            .with_causes(causes)
        })
    }

    fn check_any_of(
        &mut self,
        subschemas: &[SchemaIdx],
        location: &SourceLocation,
        instance: &JsonValue,
    ) -> Option<ValidationFailure> {
        let mut causes = Vec::new();
        for (i, subschema) in subschemas.iter().enumerate() {
            let subschema = *subschema;
            let result = self.with_path(i.to_string(), |v| v.validate_node(subschema, instance));
            match result {
                None => return None,
                Some(cause) => causes.push(cause),
            }
        }
        Some(
            self.failure(
                format!(
                    "no subschema out of {} matched the instance",
                    subschemas.len()
                ),
                Some(Keyword::AnyOf),
                location,
                instance,
            )
            .with_causes(causes),
        )
    }

    fn check_one_of(
        &mut self,
        subschemas: &[SchemaIdx],
        location: &SourceLocation,
        instance: &JsonValue,
    ) -> Option<ValidationFailure> {
        let mut matched = 0;
        let mut causes = Vec::new();
        for (i, subschema) in subschemas.iter().enumerate() {
            let subschema = *subschema;
            let result = self.with_path(i.to_string(), |v| v.validate_node(subschema, instance));
            match result {
                None => matched += 1,
                Some(cause) => causes.push(cause),
            }
        }
        if matched == 1 {
            return None;
        }
        Some(
            self.failure(
                format!("expected exactly 1 matching subschema, but {matched} matched"),
                Some(Keyword::OneOf),
                location,
                instance,
            )
            .with_causes(causes),
        )
    }

    // ---- array applicators ----

    fn check_prefix_items(
        &mut self,
        subschemas: &[SchemaIdx],
        instance: &JsonValue,
    ) -> Option<ValidationFailure> {
        let elements = instance.as_array()?;
        let mut failure = None;
        for (i, (subschema, element)) in subschemas.iter().zip(elements).enumerate() {
            let subschema = *subschema;
            let tentatively_marked = self.tracker.mark_item(instance, i);
            let result = self.with_path(i.to_string(), |v| v.validate_node(subschema, element));
            if result.is_some() && tentatively_marked {
                self.tracker.unmark_item(instance, i);
            }
            failure = ValidationFailure::accumulate(failure, result);
        }
        failure
    }

    fn check_items(
        &mut self,
        subschema: SchemaIdx,
        prefix_item_count: usize,
        instance: &JsonValue,
    ) -> Option<ValidationFailure> {
        let elements = instance.as_array()?;
        let mut failure = None;
        for (i, element) in elements.iter().enumerate().skip(prefix_item_count) {
            let tentatively_marked = self.tracker.mark_item(instance, i);
            let result = self.with_path(i.to_string(), |v| v.validate_node(subschema, element));
            if result.is_some() && tentatively_marked {
                self.tracker.unmark_item(instance, i);
            }
            failure = ValidationFailure::accumulate(failure, result);
        }
        failure
    }

    fn check_contains(
        &mut self,
        subschema: SchemaIdx,
        min_contains: u64,
        max_contains: Option<u64>,
        location: &SourceLocation,
        instance: &JsonValue,
    ) -> Option<ValidationFailure> {
        let elements = instance.as_array()?;
        let mut matched: u64 = 0;
        for (i, element) in elements.iter().enumerate() {
            let tentatively_marked = self.tracker.mark_item(instance, i);
            let result = self.with_path(i.to_string(), |v| v.validate_node(subschema, element));
            if result.is_none() {
                matched += 1;
            } else if tentatively_marked {
                self.tracker.unmark_item(instance, i);
            }
        }
        if matched < min_contains {
            let message = if matched == 0 {
                format!(
                    "no array items are valid against \"contains\" subschema, expected minimum is {min_contains}"
                )
            } else if matched == 1 {
                format!(
                    "only 1 array item is valid against \"contains\" subschema, expected minimum is {min_contains}"
                )
            } else {
                format!(
                    "only {matched} array items are valid against \"contains\" subschema, expected minimum is {min_contains}"
                )
            };
            return Some(self.failure(message, Some(Keyword::Contains), location, instance));
        }
        if let Some(max) = max_contains {
            if matched > max {
                return Some(self.failure(
                    format!(
                        "{matched} array items are valid against \"contains\" subschema, expected maximum is {max}"
                    ),
                    Some(Keyword::Contains),
                    location,
                    instance,
                ));
            }
        }
        None
    }

    // ---- object applicators ----

    fn validate_properties(
        &mut self,
        composite: &'g CompositeSchema,
        instance: &JsonValue,
    ) -> Option<ValidationFailure> {
        if composite.property_schemas.is_empty() {
            return None;
        }
        let object = instance.as_object()?;
        let mut failure = None;
        for (name, subschema) in &composite.property_schemas {
            let Some(value) = object.get(name) else {
                continue;
            };
            let subschema = *subschema;
            let tentatively_marked = self.tracker.mark_property(instance, name);
            let result = self.with_path(Keyword::Properties.as_str(), |v| {
                v.with_path(name.clone(), |v| v.validate_node(subschema, value))
            });
            if result.is_some() && tentatively_marked {
                self.tracker.unmark_property(instance, name);
            }
            failure = ValidationFailure::accumulate(failure, result);
        }
        failure
    }

    fn validate_pattern_properties(
        &mut self,
        composite: &'g CompositeSchema,
        instance: &JsonValue,
    ) -> Option<ValidationFailure> {
        if composite.pattern_property_schemas.is_empty() {
            return None;
        }
        let object = instance.as_object()?;
        let mut failure = None;
        for (regex, subschema) in &composite.pattern_property_schemas {
            let subschema = *subschema;
            for (key, value) in &object.entries {
                if !regex.is_match(&key.value) {
                    continue;
                }
                let tentatively_marked = self.tracker.mark_property(instance, &key.value);
                let result = self.with_path(Keyword::PatternProperties.as_str(), |v| {
                    v.with_path(key.value.clone(), |v| v.validate_node(subschema, value))
                });
                if result.is_some() && tentatively_marked {
                    self.tracker.unmark_property(instance, &key.value);
                }
                failure = ValidationFailure::accumulate(failure, result);
            }
        }
        failure
    }

    fn check_additional_properties(
        &mut self,
        subschema: SchemaIdx,
        keys_in_properties: &[String],
        pattern_keys: &[regex::Regex],
        instance: &JsonValue,
    ) -> Option<ValidationFailure> {
        let object = instance.as_object()?;
        let mut failure = None;
        for (key, value) in &object.entries {
            let covered = keys_in_properties.iter().any(|k| k == &key.value)
                || pattern_keys.iter().any(|p| p.is_match(&key.value));
            if covered {
                continue;
            }
            let tentatively_marked = self.tracker.mark_property(instance, &key.value);
            let result =
                self.with_path(key.value.clone(), |v| v.validate_node(subschema, value));
            if result.is_some() && tentatively_marked {
                self.tracker.unmark_property(instance, &key.value);
            }
            failure = ValidationFailure::accumulate(failure, result);
        }
        failure
    }

    fn check_property_names(
        &mut self,
        subschema: SchemaIdx,
        instance: &JsonValue,
    ) -> Option<ValidationFailure> {
        let object = instance.as_object()?;
        let mut failure = None;
        for (key, _) in &object.entries {
            // the property name itself is the instance for the subschema
            let name_instance = JsonValue::String(key.clone());
            let result =
                self.with_path(key.value.clone(), |v| v.validate_node(subschema, &name_instance));
            failure = ValidationFailure::accumulate(failure, result);
        }
        failure
    }

    // ---- unevaluated ----

    fn validate_unevaluated_items(
        &mut self,
        subschema: SchemaIdx,
        instance: &JsonValue,
    ) -> Option<ValidationFailure> {
        let elements = instance.as_array()?;
        let mut failure = None;
        for (i, element) in elements.iter().enumerate() {
            if self.tracker.is_item_marked(instance, i) {
                continue;
            }
            let result = self.with_path(Keyword::UnevaluatedItems.as_str(), |v| {
                v.with_path(i.to_string(), |v| v.validate_node(subschema, element))
            });
            if result.is_none() {
                self.tracker.mark_item(instance, i);
            }
            failure = ValidationFailure::accumulate(failure, result);
        }
        failure
    }

    fn validate_unevaluated_properties(
        &mut self,
        subschema: SchemaIdx,
        instance: &JsonValue,
    ) -> Option<ValidationFailure> {
        let object = instance.as_object()?;
        let mut failure = None;
        for (key, value) in &object.entries {
            if self.tracker.is_property_marked(instance, &key.value) {
                continue;
            }
            let result = self.with_path(Keyword::UnevaluatedProperties.as_str(), |v| {
                v.with_path(key.value.clone(), |v| v.validate_node(subschema, value))
            });
            if result.is_none() {
                self.tracker.mark_property(instance, &key.value);
            }
            failure = ValidationFailure::accumulate(failure, result);
        }
        failure
    }

    // ---- dynamic references ----

    /// The anchor name is searched on the dynamic scope stack outermost
    /// first; the statically resolved fallback applies when no scope
    /// carries a matching `$dynamicAnchor`.
    fn validate_dynamic_ref(
        &mut self,
        dynamic_ref: &'g DynamicReference,
        instance: &JsonValue,
    ) -> Option<ValidationFailure> {
        let target = dynamic_ref
            .anchor_name
            .as_deref()
            .and_then(|name| self.find_dynamic_anchor(name))
            .unwrap_or_else(|| match self.node(dynamic_ref.fallback) {
                SchemaNode::Ref(reference) => reference
                    .target()
                    .unwrap_or_else(|| unreachable!("references are resolved during loading")),
                _ => dynamic_ref.fallback,
            });
        self.with_path(Keyword::DynamicRef.as_str(), |v| {
            v.validate_node(target, instance)
        })
    }

    fn find_dynamic_anchor(&self, name: &str) -> Option<SchemaIdx> {
        for idx in &self.dynamic_scope {
            let SchemaNode::Composite(composite) = self.node(*idx) else {
                continue;
            };
            if composite.dynamic_anchor.as_deref() == Some(name) {
                return Some(*idx);
            }
            for (anchor, reference) in &composite.dynamic_anchors {
                if anchor == name {
                    if let SchemaNode::Ref(r) = self.node(*reference) {
                        return r.target();
                    }
                }
            }
        }
        None
    }
}

fn instance_type_name(instance: &JsonValue) -> &'static str {
    match instance {
        JsonValue::Number(number, _) if number.is_integral() => "integer",
        other => other.type_name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skema_json::JsonParser;

    fn parse(text: &str) -> JsonValue {
        JsonParser::new(text).parse().unwrap()
    }

    #[test]
    fn whole_numbers_classify_as_integer() {
        assert_eq!(instance_type_name(&parse("5")), "integer");
        assert_eq!(instance_type_name(&parse("5.0")), "integer");
        assert_eq!(instance_type_name(&parse("5.5")), "number");
        assert_eq!(instance_type_name(&parse("\"x\"")), "string");
    }

    #[test]
    fn tracker_only_marks_armed_instances() {
        let instance = parse("{\"a\": 1}");
        let mut tracker = EvalTracker::default();
        assert!(!tracker.mark_property(&instance, "a"));
        tracker.arm(&instance);
        assert!(tracker.mark_property(&instance, "a"));
        assert!(!tracker.mark_property(&instance, "a"));
        assert!(tracker.is_property_marked(&instance, "a"));
        tracker.unmark_property(&instance, "a");
        assert!(!tracker.is_property_marked(&instance, "a"));
    }
}
