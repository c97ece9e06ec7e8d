//! Hand-written recursive-descent JSON parser producing location-carrying
//! [`JsonValue`] trees.
//!
//! The parser exists because off-the-shelf JSON crates discard the line,
//! column and pointer information that schema loading and failure reporting
//! are built on. It accepts strict RFC 8259 JSON, with a configurable
//! nesting-depth limit as the only guard against adversarial input.

use crate::error::JsonParseError;
use crate::location::{SourceLocation, TextLocation};
use crate::pointer::JsonPointer;
use crate::value::{JsonNumber, JsonObject, JsonString, JsonValue};
use std::iter::Peekable;
use std::str::Chars;

/// Nesting depth at which parsing stops with
/// [`JsonParseError::TooDeeplyNested`] unless overridden with
/// [`JsonParser::with_max_depth`].
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 512;

/// Character cursor over the source text, tracking a 1-indexed line and
/// column. Columns count characters, not bytes.
struct SourceWalker<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    column: usize,
    last_was_cr: bool,
}

impl<'a> SourceWalker<'a> {
    fn new(text: &'a str) -> Self {
        SourceWalker {
            chars: text.chars().peekable(),
            line: 1,
            column: 1,
            last_was_cr: false,
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        match ch {
            '\r' => {
                self.line += 1;
                self.column = 1;
            }
            // the LF of a CRLF pair; the CR already advanced the line
            '\n' if self.last_was_cr => self.column = 1,
            '\n' => {
                self.line += 1;
                self.column = 1;
            }
            _ => self.column += 1,
        }
        self.last_was_cr = ch == '\r';
        Some(ch)
    }

    /// Position of the next unconsumed character.
    fn position(&self) -> TextLocation {
        TextLocation::new(self.line, self.column)
    }
}

/// Recursive-descent parser over a single JSON document.
///
/// ```rust
/// use skema_json::JsonParser;
///
/// let value = JsonParser::new("[1, 2.5]").parse().unwrap();
/// assert_eq!(value.require_array().unwrap().len(), 2);
/// ```
pub struct JsonParser<'a> {
    walker: SourceWalker<'a>,
    nesting_path: Vec<String>,
    document_source: Option<String>,
    max_depth: usize,
}

impl<'a> JsonParser<'a> {
    pub fn new(text: &'a str) -> Self {
        JsonParser {
            walker: SourceWalker::new(text),
            nesting_path: Vec::new(),
            document_source: None,
            max_depth: DEFAULT_MAX_NESTING_DEPTH,
        }
    }

    /// Records the URI the text was read from; it is propagated into every
    /// node location and into failure reports.
    pub fn with_document_source(mut self, uri: impl Into<String>) -> Self {
        self.document_source = Some(uri.into());
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Parses the complete document. Trailing whitespace is allowed, any
    /// other trailing character is an error.
    pub fn parse(mut self) -> Result<JsonValue, JsonParseError> {
        self.skip_whitespace();
        let value = self.parse_value()?;
        self.skip_whitespace();
        if let Some(found) = self.walker.peek() {
            return Err(JsonParseError::ExtraneousCharacter {
                found,
                location: self.walker.position(),
            });
        }
        Ok(value)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.walker.peek(), Some(' ' | '\t' | '\n' | '\r')) {
            self.walker.advance();
        }
    }

    /// Location of the token starting at the current position, with the
    /// pointer of the value currently being built.
    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(
            self.walker.line,
            self.walker.column,
            JsonPointer::from_segments(self.nesting_path.clone()),
            self.document_source.clone(),
        )
    }

    fn eof(&self) -> JsonParseError {
        JsonParseError::UnexpectedEof {
            location: self.walker.position(),
        }
    }

    fn unexpected(&self, found: char) -> JsonParseError {
        JsonParseError::UnexpectedCharacter {
            found,
            location: self.walker.position(),
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), JsonParseError> {
        match self.walker.peek() {
            Some(ch) if ch == expected => {
                self.walker.advance();
                Ok(())
            }
            Some(ch) => Err(self.unexpected(ch)),
            None => Err(self.eof()),
        }
    }

    fn parse_value(&mut self) -> Result<JsonValue, JsonParseError> {
        if self.nesting_path.len() >= self.max_depth {
            return Err(JsonParseError::TooDeeplyNested {
                limit: self.max_depth,
                location: self.walker.position(),
            });
        }
        match self.walker.peek() {
            Some('{') => self.parse_object(),
            Some('[') => self.parse_array(),
            Some('"') => {
                let string = self.parse_string()?;
                Ok(JsonValue::String(string))
            }
            Some('t') => self.parse_literal("true", |loc| JsonValue::Bool(true, loc)),
            Some('f') => self.parse_literal("false", |loc| JsonValue::Bool(false, loc)),
            Some('n') => self.parse_literal("null", JsonValue::Null),
            Some(ch) if ch == '-' || ch.is_ascii_digit() => self.parse_number(),
            Some(ch) => Err(self.unexpected(ch)),
            None => Err(self.eof()),
        }
    }

    fn parse_literal(
        &mut self,
        word: &str,
        build: impl FnOnce(SourceLocation) -> JsonValue,
    ) -> Result<JsonValue, JsonParseError> {
        let location = self.current_location();
        for expected in word.chars() {
            match self.walker.peek() {
                Some(ch) if ch == expected => {
                    self.walker.advance();
                }
                Some(ch) => return Err(self.unexpected(ch)),
                None => return Err(self.eof()),
            }
        }
        Ok(build(location))
    }

    fn parse_object(&mut self) -> Result<JsonValue, JsonParseError> {
        let location = self.current_location();
        self.expect('{')?;
        self.skip_whitespace();
        let mut entries: Vec<(JsonString, JsonValue)> = Vec::new();
        if self.walker.peek() == Some('}') {
            self.walker.advance();
            return Ok(JsonValue::Object(JsonObject { entries, location }));
        }
        loop {
            self.skip_whitespace();
            if self.walker.peek() != Some('"') {
                return match self.walker.peek() {
                    Some(ch) => Err(self.unexpected(ch)),
                    None => Err(self.eof()),
                };
            }
            let key = self.parse_string()?;
            if entries.iter().any(|(k, _)| k.value == key.value) {
                return Err(JsonParseError::DuplicateKey {
                    key: key.value,
                    location: key.location.text_location(),
                });
            }
            self.skip_whitespace();
            self.expect(':')?;
            self.skip_whitespace();
            self.nesting_path.push(key.value.clone());
            let value = self.parse_value()?;
            self.nesting_path.pop();
            entries.push((key, value));
            self.skip_whitespace();
            match self.walker.peek() {
                Some(',') => {
                    self.walker.advance();
                }
                Some('}') => {
                    self.walker.advance();
                    return Ok(JsonValue::Object(JsonObject { entries, location }));
                }
                Some(ch) => return Err(self.unexpected(ch)),
                None => return Err(self.eof()),
            }
        }
    }

    fn parse_array(&mut self) -> Result<JsonValue, JsonParseError> {
        let location = self.current_location();
        self.expect('[')?;
        self.skip_whitespace();
        let mut elements = Vec::new();
        if self.walker.peek() == Some(']') {
            self.walker.advance();
            return Ok(JsonValue::Array(elements, location));
        }
        loop {
            self.skip_whitespace();
            self.nesting_path.push(elements.len().to_string());
            let element = self.parse_value()?;
            self.nesting_path.pop();
            elements.push(element);
            self.skip_whitespace();
            match self.walker.peek() {
                Some(',') => {
                    self.walker.advance();
                }
                Some(']') => {
                    self.walker.advance();
                    return Ok(JsonValue::Array(elements, location));
                }
                Some(ch) => return Err(self.unexpected(ch)),
                None => return Err(self.eof()),
            }
        }
    }

    fn parse_string(&mut self) -> Result<JsonString, JsonParseError> {
        let location = self.current_location();
        self.expect('"')?;
        let mut value = String::new();
        loop {
            let ch = self.walker.advance().ok_or_else(|| self.eof())?;
            match ch {
                '"' => return Ok(JsonString { value, location }),
                '\\' => {
                    let escaped = self.walker.advance().ok_or_else(|| self.eof())?;
                    match escaped {
                        '"' => value.push('"'),
                        '\\' => value.push('\\'),
                        '/' => value.push('/'),
                        'b' => value.push('\u{0008}'),
                        'f' => value.push('\u{000C}'),
                        'n' => value.push('\n'),
                        'r' => value.push('\r'),
                        't' => value.push('\t'),
                        'u' => value.push(self.parse_unicode_escape()?),
                        other => return Err(self.unexpected(other)),
                    }
                }
                // unescaped control characters are not valid JSON
                c if (c as u32) < 0x20 => return Err(self.unexpected(c)),
                c => value.push(c),
            }
        }
    }

    fn read_hex4(&mut self) -> Result<u16, JsonParseError> {
        let start = self.walker.position();
        let mut sequence = String::with_capacity(4);
        for _ in 0..4 {
            let ch = self.walker.advance().ok_or_else(|| self.eof())?;
            sequence.push(ch);
        }
        u16::from_str_radix(&sequence, 16).map_err(|_| JsonParseError::InvalidUnicodeEscape {
            sequence,
            location: start,
        })
    }

    fn parse_unicode_escape(&mut self) -> Result<char, JsonParseError> {
        let start = self.walker.position();
        let first = self.read_hex4()?;
        if (0xD800..0xDC00).contains(&first) {
            // high surrogate, must be followed by \uXXXX low surrogate
            if self.walker.advance() != Some('\\') || self.walker.advance() != Some('u') {
                return Err(JsonParseError::InvalidUnicodeEscape {
                    sequence: format!("{:04x}", first),
                    location: start,
                });
            }
            let second = self.read_hex4()?;
            if !(0xDC00..0xE000).contains(&second) {
                return Err(JsonParseError::InvalidUnicodeEscape {
                    sequence: format!("{:04x}{:04x}", first, second),
                    location: start,
                });
            }
            let code =
                0x10000 + ((first as u32 - 0xD800) << 10) + (second as u32 - 0xDC00);
            char::from_u32(code).ok_or(JsonParseError::InvalidUnicodeEscape {
                sequence: format!("{:04x}{:04x}", first, second),
                location: start,
            })
        } else {
            char::from_u32(first as u32).ok_or(JsonParseError::InvalidUnicodeEscape {
                sequence: format!("{:04x}", first),
                location: start,
            })
        }
    }

    fn parse_number(&mut self) -> Result<JsonValue, JsonParseError> {
        let location = self.current_location();
        let mut integer_digits = String::new();
        let mut fraction_digits = String::new();
        let mut exponent: i32 = 0;
        let negative = if self.walker.peek() == Some('-') {
            self.walker.advance();
            true
        } else {
            false
        };

        match self.walker.peek() {
            Some('0') => {
                self.walker.advance();
                integer_digits.push('0');
                // leading zeros are not valid JSON
                if let Some(found) = self.walker.peek().filter(|c| c.is_ascii_digit()) {
                    return Err(self.unexpected(found));
                }
            }
            Some(c) if c.is_ascii_digit() => {
                while let Some(c) = self.walker.peek() {
                    if !c.is_ascii_digit() {
                        break;
                    }
                    integer_digits.push(c);
                    self.walker.advance();
                }
            }
            Some(c) => return Err(self.unexpected(c)),
            None => return Err(self.eof()),
        }

        let mut is_decimal = false;
        if self.walker.peek() == Some('.') {
            is_decimal = true;
            self.walker.advance();
            while let Some(c) = self.walker.peek() {
                if !c.is_ascii_digit() {
                    break;
                }
                fraction_digits.push(c);
                self.walker.advance();
            }
            if fraction_digits.is_empty() {
                return match self.walker.peek() {
                    Some(c) => Err(self.unexpected(c)),
                    None => Err(self.eof()),
                };
            }
        }

        if matches!(self.walker.peek(), Some('e' | 'E')) {
            is_decimal = true;
            self.walker.advance();
            let exp_negative = match self.walker.peek() {
                Some('-') => {
                    self.walker.advance();
                    true
                }
                Some('+') => {
                    self.walker.advance();
                    false
                }
                _ => false,
            };
            let mut exp_digits = String::new();
            while let Some(c) = self.walker.peek() {
                if !c.is_ascii_digit() {
                    break;
                }
                exp_digits.push(c);
                self.walker.advance();
            }
            if exp_digits.is_empty() {
                return match self.walker.peek() {
                    Some(c) => Err(self.unexpected(c)),
                    None => Err(self.eof()),
                };
            }
            let magnitude: i32 = exp_digits.parse().unwrap_or(i32::MAX);
            exponent = if exp_negative { -magnitude } else { magnitude };
        }

        let number = build_number(
            negative,
            &integer_digits,
            &fraction_digits,
            exponent,
            is_decimal,
        );
        Ok(JsonValue::Number(number, location))
    }
}

/// Classifies a parsed numeric literal. Plain integer literals that fit
/// `i64` become `Int`; everything else is kept as an exact decimal when the
/// digits fit `i128`, with `f64` as the overflow fallback.
fn build_number(
    negative: bool,
    integer_digits: &str,
    fraction_digits: &str,
    exponent: i32,
    is_decimal: bool,
) -> JsonNumber {
    let render = || {
        let mut text = String::new();
        if negative {
            text.push('-');
        }
        text.push_str(integer_digits);
        if !fraction_digits.is_empty() {
            text.push('.');
            text.push_str(fraction_digits);
        }
        if exponent != 0 {
            text.push('e');
            text.push_str(&exponent.to_string());
        }
        text
    };

    if !is_decimal {
        if let Ok(v) = render().parse::<i64>() {
            return JsonNumber::Int(v);
        }
    }

    let mut digits = String::with_capacity(integer_digits.len() + fraction_digits.len() + 1);
    if negative {
        digits.push('-');
    }
    digits.push_str(integer_digits);
    digits.push_str(fraction_digits);
    let scale = fraction_digits.len() as i64 - exponent as i64;
    match (digits.parse::<i128>(), i32::try_from(scale)) {
        (Ok(unscaled), Ok(scale)) => JsonNumber::Decimal { unscaled, scale },
        _ => JsonNumber::Double(render().parse::<f64>().unwrap_or(f64::NAN)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointer::pointer;

    fn parse(text: &str) -> JsonValue {
        JsonParser::new(text).parse().unwrap()
    }

    // ==== Location Tracking Tests ====

    #[test]
    fn root_value_is_at_line_one_column_one() {
        let value = parse("{}");
        assert_eq!(value.location().line, 1);
        assert_eq!(value.location().column, 1);
        assert!(value.location().pointer.is_empty());
    }

    #[test]
    fn nested_values_carry_their_pointer() {
        let value = parse(r#"{"a": {"b": [null, true]}}"#);
        let a = value.require_object().unwrap().get("a").unwrap();
        let b = a.require_object().unwrap().get("b").unwrap();
        let second = &b.require_array().unwrap()[1];
        assert_eq!(second.location().pointer, pointer(&["a", "b", "1"]));
        assert_eq!(second.location().column, 20);
    }

    #[test]
    fn lines_advance_on_newline() {
        let value = parse("{\n  \"x\": 1\n}");
        let x = value.require_object().unwrap().get("x").unwrap();
        assert_eq!(x.location().line, 2);
        assert_eq!(x.location().column, 8);
    }

    #[test]
    fn carriage_returns_advance_lines() {
        let value = parse("{\r  \"a\": 1,\r\n  \"b\": 2\n}");
        let object = value.require_object().unwrap();
        assert_eq!(object.get("a").unwrap().location().line, 2);
        assert_eq!(object.get("b").unwrap().location().line, 3);
        assert_eq!(object.get("b").unwrap().location().column, 8);
    }

    #[test]
    fn document_source_is_recorded_on_every_node() {
        let value = JsonParser::new(r#"{"a": 1}"#)
            .with_document_source("https://example.org/schema")
            .parse()
            .unwrap();
        let a = value.require_object().unwrap().get("a").unwrap();
        assert_eq!(
            a.location().document_source.as_deref(),
            Some("https://example.org/schema")
        );
    }

    #[test]
    fn object_keys_have_locations() {
        let value = parse(r#"{"title": "x"}"#);
        let key = value.require_object().unwrap().get_key("title").unwrap();
        assert_eq!(key.location.line, 1);
        assert_eq!(key.location.column, 2);
    }

    // ==== Number Classification Tests ====

    #[test]
    fn integer_literals_become_int() {
        assert!(matches!(
            parse("42").require_number().unwrap(),
            JsonNumber::Int(42)
        ));
        assert!(matches!(
            parse("-7").require_number().unwrap(),
            JsonNumber::Int(-7)
        ));
    }

    #[test]
    fn fractional_literals_become_exact_decimals() {
        assert!(matches!(
            parse("3.14").require_number().unwrap(),
            JsonNumber::Decimal {
                unscaled: 314,
                scale: 2
            }
        ));
    }

    #[test]
    fn exponents_fold_into_the_scale() {
        assert!(matches!(
            parse("5e-1").require_number().unwrap(),
            JsonNumber::Decimal {
                unscaled: 5,
                scale: 1
            }
        ));
        assert!(matches!(
            parse("12e2").require_number().unwrap(),
            JsonNumber::Decimal {
                unscaled: 12,
                scale: -2
            }
        ));
    }

    #[test]
    fn integers_beyond_i64_stay_exact() {
        let n = parse("170141183460469231731687303715884105727");
        assert!(matches!(
            n.require_number().unwrap(),
            JsonNumber::Decimal { scale: 0, .. }
        ));
    }

    #[test]
    fn leading_zero_is_rejected() {
        assert!(matches!(
            JsonParser::new("012").parse(),
            Err(JsonParseError::UnexpectedCharacter { found: '1', .. })
        ));
    }

    // ==== String Escape Tests ====

    #[test]
    fn basic_escapes() {
        assert_eq!(parse(r#""a\nb\t\"c\\""#).as_str().unwrap(), "a\nb\t\"c\\");
    }

    #[test]
    fn unicode_escape() {
        assert_eq!(parse("\"\\u00e9\"").as_str().unwrap(), "é");
    }

    #[test]
    fn surrogate_pair_escape() {
        assert_eq!(parse("\"\\ud83d\\ude00\"").as_str().unwrap(), "😀");
    }

    #[test]
    fn lone_high_surrogate_is_an_error() {
        assert!(matches!(
            JsonParser::new(r#""\ud83d""#).parse(),
            Err(JsonParseError::InvalidUnicodeEscape { .. })
        ));
    }

    #[test]
    fn invalid_hex_digits_are_an_error() {
        assert!(matches!(
            JsonParser::new(r#""\uZZZZ""#).parse(),
            Err(JsonParseError::InvalidUnicodeEscape { .. })
        ));
    }

    // ==== Structural Error Tests ====

    #[test]
    fn duplicate_keys_are_rejected() {
        let err = JsonParser::new(r#"{"a": 1, "a": 2}"#).parse().unwrap_err();
        match err {
            JsonParseError::DuplicateKey { key, location } => {
                assert_eq!(key, "a");
                assert_eq!(location.column, 10);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn truncated_document_reports_eof() {
        assert!(matches!(
            JsonParser::new(r#"{"a": "#).parse(),
            Err(JsonParseError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn trailing_garbage_is_rejected() {
        assert!(matches!(
            JsonParser::new("true false").parse(),
            Err(JsonParseError::ExtraneousCharacter { found: 'f', .. })
        ));
    }

    #[test]
    fn nesting_depth_is_bounded() {
        let text = format!("{}1{}", "[".repeat(6), "]".repeat(6));
        let err = JsonParser::new(&text)
            .with_max_depth(4)
            .parse()
            .unwrap_err();
        assert!(matches!(
            err,
            JsonParseError::TooDeeplyNested { limit: 4, .. }
        ));
        assert!(JsonParser::new(&text).parse().is_ok());
    }

    #[test]
    fn deeply_nested_default_limit_holds() {
        let text = format!(
            "{}1{}",
            "[".repeat(DEFAULT_MAX_NESTING_DEPTH + 1),
            "]".repeat(DEFAULT_MAX_NESTING_DEPTH + 1)
        );
        assert!(matches!(
            JsonParser::new(&text).parse(),
            Err(JsonParseError::TooDeeplyNested { .. })
        ));
    }

    #[test]
    fn whitespace_everywhere_is_fine() {
        let value = parse(" \t\n{ \"a\" : [ 1 , 2 ] }\r\n ");
        assert_eq!(
            value.require_object().unwrap().get("a").unwrap(),
            &parse("[1,2]")
        );
    }
}
