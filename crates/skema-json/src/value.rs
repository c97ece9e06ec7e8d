//! The JSON document model: an immutable value tree where every node carries
//! its [`SourceLocation`].

use crate::{JsonTypingError, SourceLocation};
use std::cmp::Ordering;
use std::fmt;

/// A JSON number.
///
/// Integer literals that fit `i64` stay integers. Fractional or exponential
/// literals, and integers beyond `i64`, are kept as exact decimals
/// (`unscaled * 10^-scale`) so that keyword comparisons such as `multipleOf`
/// can be computed without floating-point rounding. `Double` exists only as
/// a fallback for literals whose digits exceed `i128` precision.
#[derive(Debug, Clone, Copy)]
pub enum JsonNumber {
    Int(i64),
    Decimal { unscaled: i128, scale: i32 },
    Double(f64),
}

fn pow10(exp: u32) -> Option<i128> {
    10i128.checked_pow(exp)
}

impl JsonNumber {
    /// Exact decimal form, when one exists.
    pub fn as_decimal(&self) -> Option<(i128, i32)> {
        match *self {
            JsonNumber::Int(v) => Some((v as i128, 0)),
            JsonNumber::Decimal { unscaled, scale } => Some((unscaled, scale)),
            JsonNumber::Double(_) => None,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            JsonNumber::Int(v) => v as f64,
            JsonNumber::Decimal { unscaled, scale } => {
                (unscaled as f64) * 10f64.powi(-scale)
            }
            JsonNumber::Double(v) => v,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            JsonNumber::Int(v) => Some(v),
            _ => {
                let (unscaled, scale) = self.as_decimal()?;
                let value = if scale == 0 {
                    unscaled
                } else if scale < 0 {
                    unscaled.checked_mul(pow10(scale.unsigned_abs())?)?
                } else {
                    let divisor = pow10(scale as u32)?;
                    if unscaled % divisor != 0 {
                        return None;
                    }
                    unscaled / divisor
                };
                i64::try_from(value).ok()
            }
        }
    }

    /// True when the value has an all-zero fractional part. Drives the
    /// integer/number reconciliation of the `type` keyword.
    pub fn is_integral(&self) -> bool {
        match *self {
            JsonNumber::Int(_) => true,
            JsonNumber::Decimal { unscaled, scale } => {
                if scale <= 0 {
                    true
                } else {
                    match pow10(scale as u32) {
                        Some(p) => unscaled % p == 0,
                        None => false,
                    }
                }
            }
            JsonNumber::Double(v) => v.fract() == 0.0,
        }
    }

    /// Both operands brought to a common scale, exactly. `None` on overflow
    /// or when either side is a `Double`.
    fn aligned(&self, other: &JsonNumber) -> Option<(i128, i128)> {
        let (ua, sa) = self.as_decimal()?;
        let (ub, sb) = other.as_decimal()?;
        let scale = sa.max(sb);
        let ua = ua.checked_mul(pow10((scale - sa) as u32)?)?;
        let ub = ub.checked_mul(pow10((scale - sb) as u32)?)?;
        Some((ua, ub))
    }

    pub fn compare(&self, other: &JsonNumber) -> Ordering {
        match self.aligned(other) {
            Some((a, b)) => a.cmp(&b),
            None => self
                .as_f64()
                .partial_cmp(&other.as_f64())
                .unwrap_or(Ordering::Equal),
        }
    }

    /// Exact-decimal remainder test used by `multipleOf`. Falls back to a
    /// quotient-integrality check when exact arithmetic overflows.
    pub fn is_multiple_of(&self, denominator: &JsonNumber) -> bool {
        match self.aligned(denominator) {
            Some((_, 0)) => false,
            Some((a, b)) => a % b == 0,
            None => {
                let d = denominator.as_f64();
                if d == 0.0 {
                    return false;
                }
                let quotient = self.as_f64() / d;
                (quotient - quotient.round()).abs() < f64::EPSILON
            }
        }
    }
}

impl PartialEq for JsonNumber {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl fmt::Display for JsonNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            JsonNumber::Int(v) => write!(f, "{}", v),
            JsonNumber::Decimal { unscaled, scale } => {
                if scale <= 0 {
                    write!(f, "{}", unscaled)?;
                    for _ in 0..(-scale) {
                        write!(f, "0")?;
                    }
                    Ok(())
                } else {
                    let sign = if unscaled < 0 { "-" } else { "" };
                    let digits = unscaled.unsigned_abs().to_string();
                    let scale = scale as usize;
                    if digits.len() <= scale {
                        write!(f, "{}0.{}{}", sign, "0".repeat(scale - digits.len()), digits)
                    } else {
                        let (int_part, frac_part) = digits.split_at(digits.len() - scale);
                        write!(f, "{}{}.{}", sign, int_part, frac_part)
                    }
                }
            }
            JsonNumber::Double(v) => write!(f, "{}", v),
        }
    }
}

/// A JSON string together with its own source location. Object property
/// names are `JsonString`s, which is how keyword locations are obtained
/// during schema loading.
#[derive(Debug, Clone)]
pub struct JsonString {
    pub value: String,
    pub location: SourceLocation,
}

impl JsonString {
    pub fn new(value: impl Into<String>, location: SourceLocation) -> Self {
        JsonString {
            value: value.into(),
            location,
        }
    }
}

impl PartialEq for JsonString {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

/// A JSON object, preserving the insertion order of the source document.
#[derive(Debug, Clone)]
pub struct JsonObject {
    pub entries: Vec<(JsonString, JsonValue)>,
    pub location: SourceLocation,
}

impl PartialEq for JsonObject {
    // same contract as JsonValue equality: property order and source
    // locations are irrelevant
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .entries
                .iter()
                .all(|(k, v)| other.get(&k.value).is_some_and(|ov| ov == v))
    }
}

impl JsonObject {
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.entries
            .iter()
            .find(|(k, _)| k.value == key)
            .map(|(_, v)| v)
    }

    pub fn get_key(&self, key: &str) -> Option<&JsonString> {
        self.entries
            .iter()
            .find(|(k, _)| k.value == key)
            .map(|(k, _)| k)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.value.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// An immutable JSON value. Equality ignores source locations and compares
/// numbers numerically (`1 == 1.0`), which is what `enum`, `const` and
/// `uniqueItems` need.
#[derive(Debug, Clone)]
pub enum JsonValue {
    Null(SourceLocation),
    Bool(bool, SourceLocation),
    Number(JsonNumber, SourceLocation),
    String(JsonString),
    Array(Vec<JsonValue>, SourceLocation),
    Object(JsonObject),
}

impl JsonValue {
    pub fn location(&self) -> &SourceLocation {
        match self {
            JsonValue::Null(loc)
            | JsonValue::Bool(_, loc)
            | JsonValue::Number(_, loc)
            | JsonValue::Array(_, loc) => loc,
            JsonValue::String(s) => &s.location,
            JsonValue::Object(o) => &o.location,
        }
    }

    /// The JSON type name used in error messages: `null`, `boolean`,
    /// `number`, `string`, `array` or `object`.
    pub fn type_name(&self) -> &'static str {
        match self {
            JsonValue::Null(_) => "null",
            JsonValue::Bool(..) => "boolean",
            JsonValue::Number(..) => "number",
            JsonValue::String(_) => "string",
            JsonValue::Array(..) => "array",
            JsonValue::Object(_) => "object",
        }
    }

    fn unexpected_type(&self, expected: &str) -> JsonTypingError {
        JsonTypingError {
            expected: expected.to_string(),
            actual: self.type_name().to_string(),
            location: self.location().clone(),
        }
    }

    pub fn require_bool(&self) -> Result<bool, JsonTypingError> {
        match self {
            JsonValue::Bool(b, _) => Ok(*b),
            _ => Err(self.unexpected_type("boolean")),
        }
    }

    pub fn require_string(&self) -> Result<&JsonString, JsonTypingError> {
        match self {
            JsonValue::String(s) => Ok(s),
            _ => Err(self.unexpected_type("string")),
        }
    }

    pub fn require_str(&self) -> Result<&str, JsonTypingError> {
        self.require_string().map(|s| s.value.as_str())
    }

    pub fn require_number(&self) -> Result<&JsonNumber, JsonTypingError> {
        match self {
            JsonValue::Number(n, _) => Ok(n),
            _ => Err(self.unexpected_type("number")),
        }
    }

    pub fn require_int(&self) -> Result<i64, JsonTypingError> {
        let number = self.require_number()?;
        number
            .as_i64()
            .ok_or_else(|| self.unexpected_type("integer"))
    }

    pub fn require_array(&self) -> Result<&[JsonValue], JsonTypingError> {
        match self {
            JsonValue::Array(elements, _) => Ok(elements),
            _ => Err(self.unexpected_type("array")),
        }
    }

    pub fn require_object(&self) -> Result<&JsonObject, JsonTypingError> {
        match self {
            JsonValue::Object(o) => Ok(o),
            _ => Err(self.unexpected_type("object")),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            JsonValue::Bool(b, _) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            JsonValue::String(s) => Some(&s.value),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<&JsonNumber> {
        match self {
            JsonValue::Number(n, _) => Some(n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[JsonValue]> {
        match self {
            JsonValue::Array(elements, _) => Some(elements),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&JsonObject> {
        match self {
            JsonValue::Object(o) => Some(o),
            _ => None,
        }
    }
}

impl PartialEq for JsonValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (JsonValue::Null(_), JsonValue::Null(_)) => true,
            (JsonValue::Bool(a, _), JsonValue::Bool(b, _)) => a == b,
            (JsonValue::Number(a, _), JsonValue::Number(b, _)) => a == b,
            (JsonValue::String(a), JsonValue::String(b)) => a.value == b.value,
            (JsonValue::Array(a, _), JsonValue::Array(b, _)) => a == b,
            (JsonValue::Object(a), JsonValue::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for JsonValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", crate::JsonPrinter::default().print(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JsonParser;

    fn parse(text: &str) -> JsonValue {
        JsonParser::new(text).parse().unwrap()
    }

    #[test]
    fn numbers_compare_numerically_across_representations() {
        assert_eq!(parse("1"), parse("1.0"));
        assert_eq!(parse("0.5"), parse("5e-1"));
        assert_ne!(parse("1"), parse("1.2"));
    }

    #[test]
    fn object_equality_ignores_property_order() {
        assert_eq!(parse(r#"{"a":1,"b":2}"#), parse(r#"{"b":2,"a":1}"#));
        assert_ne!(parse(r#"{"a":1}"#), parse(r#"{"a":1,"b":2}"#));
    }

    #[test]
    fn object_comparison_matches_value_comparison() {
        let a = parse("{\"a\": 1,\n \"b\": 2}");
        let b = parse(r#"{"b": 2.0, "a": 1}"#);
        assert_eq!(a.require_object().unwrap(), b.require_object().unwrap());
        assert_eq!(a, b);
    }

    #[test]
    fn equality_ignores_locations() {
        assert_eq!(parse("[1,\n2]"), parse("[ 1, 2 ]"));
    }

    #[test]
    fn integral_classification() {
        assert!(parse("12").require_number().unwrap().is_integral());
        assert!(parse("12.00").require_number().unwrap().is_integral());
        assert!(!parse("12.5").require_number().unwrap().is_integral());
    }

    #[test]
    fn multiple_of_is_exact_in_decimal() {
        let n = parse("0.0075").require_number().unwrap().clone();
        let d = parse("0.0001").require_number().unwrap().clone();
        // 0.0075 / 0.0001 = 75, exactly; f64 arithmetic would wobble here
        assert!(n.is_multiple_of(&d));
        let d3 = parse("0.002").require_number().unwrap().clone();
        assert!(!n.is_multiple_of(&d3));
    }

    #[test]
    fn zero_denominator_is_never_a_divisor() {
        let n = parse("5").require_number().unwrap().clone();
        let zero = parse("0").require_number().unwrap().clone();
        assert!(!n.is_multiple_of(&zero));
    }

    #[test]
    fn decimal_display_round_trips_the_literal() {
        assert_eq!(parse("3.14").require_number().unwrap().to_string(), "3.14");
        assert_eq!(parse("0.001").require_number().unwrap().to_string(), "0.001");
        assert_eq!(parse("-0.5").require_number().unwrap().to_string(), "-0.5");
    }
}
