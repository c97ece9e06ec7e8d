//! Pretty-printer for [`JsonValue`] trees.

use crate::value::JsonValue;

/// Renders a [`JsonValue`] back to JSON text with two-space indentation.
/// Empty containers print as `{}` and `[]`.
#[derive(Debug, Default)]
pub struct JsonPrinter {
    buffer: String,
    indent: usize,
}

impl JsonPrinter {
    pub fn print(mut self, value: &JsonValue) -> String {
        self.write_value(value);
        self.buffer
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.buffer.push_str("  ");
        }
    }

    fn write_value(&mut self, value: &JsonValue) {
        match value {
            JsonValue::Null(_) => self.buffer.push_str("null"),
            JsonValue::Bool(b, _) => self.buffer.push_str(if *b { "true" } else { "false" }),
            JsonValue::Number(n, _) => self.buffer.push_str(&n.to_string()),
            JsonValue::String(s) => self.write_string(&s.value),
            JsonValue::Array(elements, _) => {
                if elements.is_empty() {
                    self.buffer.push_str("[]");
                    return;
                }
                self.buffer.push_str("[\n");
                self.indent += 1;
                for (i, element) in elements.iter().enumerate() {
                    self.write_indent();
                    self.write_value(element);
                    if i + 1 < elements.len() {
                        self.buffer.push(',');
                    }
                    self.buffer.push('\n');
                }
                self.indent -= 1;
                self.write_indent();
                self.buffer.push(']');
            }
            JsonValue::Object(object) => {
                if object.is_empty() {
                    self.buffer.push_str("{}");
                    return;
                }
                self.buffer.push_str("{\n");
                self.indent += 1;
                for (i, (key, entry)) in object.entries.iter().enumerate() {
                    self.write_indent();
                    self.write_string(&key.value);
                    self.buffer.push_str(": ");
                    self.write_value(entry);
                    if i + 1 < object.entries.len() {
                        self.buffer.push(',');
                    }
                    self.buffer.push('\n');
                }
                self.indent -= 1;
                self.write_indent();
                self.buffer.push('}');
            }
        }
    }

    fn write_string(&mut self, value: &str) {
        self.buffer.push('"');
        for ch in value.chars() {
            match ch {
                '"' => self.buffer.push_str("\\\""),
                '\\' => self.buffer.push_str("\\\\"),
                '\n' => self.buffer.push_str("\\n"),
                '\r' => self.buffer.push_str("\\r"),
                '\t' => self.buffer.push_str("\\t"),
                c if (c as u32) < 0x20 => {
                    self.buffer.push_str(&format!("\\u{:04x}", c as u32));
                }
                c => self.buffer.push(c),
            }
        }
        self.buffer.push('"');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JsonParser;

    fn reprint(text: &str) -> String {
        JsonPrinter::default().print(&JsonParser::new(text).parse().unwrap())
    }

    #[test]
    fn scalars_print_plainly() {
        assert_eq!(reprint("null"), "null");
        assert_eq!(reprint("true"), "true");
        assert_eq!(reprint("42"), "42");
        assert_eq!(reprint("1.25"), "1.25");
    }

    #[test]
    fn empty_containers_stay_on_one_line() {
        assert_eq!(reprint("{}"), "{}");
        assert_eq!(reprint("[]"), "[]");
    }

    #[test]
    fn objects_indent_two_spaces() {
        assert_eq!(
            reprint(r#"{"a": 1, "b": [true]}"#),
            "{\n  \"a\": 1,\n  \"b\": [\n    true\n  ]\n}"
        );
    }

    #[test]
    fn strings_are_escaped() {
        assert_eq!(reprint(r#""a\"b\\c\nd""#), "\"a\\\"b\\\\c\\nd\"");
    }

    #[test]
    fn printing_preserves_value_equality() {
        let source = r#"{"nested": {"list": [1, 2.5, "x", null], "flag": false}}"#;
        let original = JsonParser::new(source).parse().unwrap();
        let reparsed = JsonParser::new(&reprint(source)).parse().unwrap();
        assert_eq!(original, reparsed);
    }
}
