//! The closed set of JSON Schema draft 2020-12 keywords.

use std::fmt;

/// A schema keyword name. The set is fixed by the specification, so this is
/// a closed enum: the loader and validator match on it exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    // core
    Id,
    Schema,
    Ref,
    Anchor,
    DynamicRef,
    DynamicAnchor,
    Vocabulary,
    Comment,
    Defs,
    // applicators
    AllOf,
    AnyOf,
    OneOf,
    Not,
    If,
    Then,
    Else,
    DependentSchemas,
    PrefixItems,
    Items,
    Contains,
    Properties,
    PatternProperties,
    AdditionalProperties,
    PropertyNames,
    // unevaluated
    UnevaluatedItems,
    UnevaluatedProperties,
    // validation
    Type,
    Enum,
    Const,
    MultipleOf,
    Maximum,
    ExclusiveMaximum,
    Minimum,
    ExclusiveMinimum,
    MaxLength,
    MinLength,
    Pattern,
    MaxItems,
    MinItems,
    UniqueItems,
    MaxContains,
    MinContains,
    MaxProperties,
    MinProperties,
    Required,
    DependentRequired,
    // format and content
    Format,
    // metadata
    Title,
    Description,
    Default,
    Deprecated,
    ReadOnly,
    WriteOnly,
    Examples,
}

impl Keyword {
    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Id => "$id",
            Keyword::Schema => "$schema",
            Keyword::Ref => "$ref",
            Keyword::Anchor => "$anchor",
            Keyword::DynamicRef => "$dynamicRef",
            Keyword::DynamicAnchor => "$dynamicAnchor",
            Keyword::Vocabulary => "$vocabulary",
            Keyword::Comment => "$comment",
            Keyword::Defs => "$defs",
            Keyword::AllOf => "allOf",
            Keyword::AnyOf => "anyOf",
            Keyword::OneOf => "oneOf",
            Keyword::Not => "not",
            Keyword::If => "if",
            Keyword::Then => "then",
            Keyword::Else => "else",
            Keyword::DependentSchemas => "dependentSchemas",
            Keyword::PrefixItems => "prefixItems",
            Keyword::Items => "items",
            Keyword::Contains => "contains",
            Keyword::Properties => "properties",
            Keyword::PatternProperties => "patternProperties",
            Keyword::AdditionalProperties => "additionalProperties",
            Keyword::PropertyNames => "propertyNames",
            Keyword::UnevaluatedItems => "unevaluatedItems",
            Keyword::UnevaluatedProperties => "unevaluatedProperties",
            Keyword::Type => "type",
            Keyword::Enum => "enum",
            Keyword::Const => "const",
            Keyword::MultipleOf => "multipleOf",
            Keyword::Maximum => "maximum",
            Keyword::ExclusiveMaximum => "exclusiveMaximum",
            Keyword::Minimum => "minimum",
            Keyword::ExclusiveMinimum => "exclusiveMinimum",
            Keyword::MaxLength => "maxLength",
            Keyword::MinLength => "minLength",
            Keyword::Pattern => "pattern",
            Keyword::MaxItems => "maxItems",
            Keyword::MinItems => "minItems",
            Keyword::UniqueItems => "uniqueItems",
            Keyword::MaxContains => "maxContains",
            Keyword::MinContains => "minContains",
            Keyword::MaxProperties => "maxProperties",
            Keyword::MinProperties => "minProperties",
            Keyword::Required => "required",
            Keyword::DependentRequired => "dependentRequired",
            Keyword::Format => "format",
            Keyword::Title => "title",
            Keyword::Description => "description",
            Keyword::Default => "default",
            Keyword::Deprecated => "deprecated",
            Keyword::ReadOnly => "readOnly",
            Keyword::WriteOnly => "writeOnly",
            Keyword::Examples => "examples",
        }
    }

    pub fn parse(name: &str) -> Option<Keyword> {
        Some(match name {
            "$id" => Keyword::Id,
            "$schema" => Keyword::Schema,
            "$ref" => Keyword::Ref,
            "$anchor" => Keyword::Anchor,
            "$dynamicRef" => Keyword::DynamicRef,
            "$dynamicAnchor" => Keyword::DynamicAnchor,
            "$vocabulary" => Keyword::Vocabulary,
            "$comment" => Keyword::Comment,
            "$defs" => Keyword::Defs,
            "allOf" => Keyword::AllOf,
            "anyOf" => Keyword::AnyOf,
            "oneOf" => Keyword::OneOf,
            "not" => Keyword::Not,
            "if" => Keyword::If,
            "then" => Keyword::Then,
            "else" => Keyword::Else,
            "dependentSchemas" => Keyword::DependentSchemas,
            "prefixItems" => Keyword::PrefixItems,
            "items" => Keyword::Items,
            "contains" => Keyword::Contains,
            "properties" => Keyword::Properties,
            "patternProperties" => Keyword::PatternProperties,
            "additionalProperties" => Keyword::AdditionalProperties,
            "propertyNames" => Keyword::PropertyNames,
            "unevaluatedItems" => Keyword::UnevaluatedItems,
            "unevaluatedProperties" => Keyword::UnevaluatedProperties,
            "type" => Keyword::Type,
            "enum" => Keyword::Enum,
            "const" => Keyword::Const,
            "multipleOf" => Keyword::MultipleOf,
            "maximum" => Keyword::Maximum,
            "exclusiveMaximum" => Keyword::ExclusiveMaximum,
            "minimum" => Keyword::Minimum,
            "exclusiveMinimum" => Keyword::ExclusiveMinimum,
            "maxLength" => Keyword::MaxLength,
            "minLength" => Keyword::MinLength,
            "pattern" => Keyword::Pattern,
            "maxItems" => Keyword::MaxItems,
            "minItems" => Keyword::MinItems,
            "uniqueItems" => Keyword::UniqueItems,
            "maxContains" => Keyword::MaxContains,
            "minContains" => Keyword::MinContains,
            "maxProperties" => Keyword::MaxProperties,
            "minProperties" => Keyword::MinProperties,
            "required" => Keyword::Required,
            "dependentRequired" => Keyword::DependentRequired,
            "format" => Keyword::Format,
            "title" => Keyword::Title,
            "description" => Keyword::Description,
            "default" => Keyword::Default,
            "deprecated" => Keyword::Deprecated,
            "readOnly" => Keyword::ReadOnly,
            "writeOnly" => Keyword::WriteOnly,
            "examples" => Keyword::Examples,
            _ => return None,
        })
    }

    /// Keywords whose value is a map of subschemas. The anchor pre-scan
    /// recurses into the member values of these, and only these, among the
    /// object-valued keywords.
    pub fn has_map_like_semantics(&self) -> bool {
        matches!(
            self,
            Keyword::Defs
                | Keyword::Properties
                | Keyword::PatternProperties
                | Keyword::DependentSchemas
        )
    }

    /// Keywords whose value is itself a single subschema.
    pub fn takes_single_subschema(&self) -> bool {
        matches!(
            self,
            Keyword::Not
                | Keyword::If
                | Keyword::Then
                | Keyword::Else
                | Keyword::Items
                | Keyword::Contains
                | Keyword::AdditionalProperties
                | Keyword::PropertyNames
                | Keyword::UnevaluatedItems
                | Keyword::UnevaluatedProperties
        )
    }

    /// Keywords whose value is an array of subschemas.
    pub fn takes_subschema_array(&self) -> bool {
        matches!(
            self,
            Keyword::AllOf | Keyword::AnyOf | Keyword::OneOf | Keyword::PrefixItems
        )
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
