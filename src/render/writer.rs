//! Low-level HCL writer.

use crate::value::{AttrMap, AttrValue};

const INDENT: &str = "  ";

/// Escape a string for a quoted HCL template.
#[must_use]
pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '$' if chars.peek() == Some(&'{') => out.push_str("$$"),
            '%' if chars.peek() == Some(&'{') => out.push_str("%%"),
            other => out.push(other),
        }
    }
    out
}

/// Quoted HCL string literal.
#[must_use]
pub fn quote(s: &str) -> String {
    format!("\"{}\"", escape_string(s))
}

/// Serializes blocks and attributes into HCL text.
#[derive(Debug, Default)]
pub struct HclWriter {
    out: String,
    depth: usize,
}

impl HclWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `<kind> "<label>" ... {`
    pub fn open_block(&mut self, kind: &str, labels: &[&str]) -> &mut Self {
        self.pad();
        self.out.push_str(kind);
        for label in labels {
            self.out.push(' ');
            self.out.push_str(&quote(label));
        }
        self.out.push_str(" {\n");
        self.depth += 1;
        self
    }

    pub fn close_block(&mut self) -> &mut Self {
        self.depth = self.depth.saturating_sub(1);
        self.pad();
        self.out.push_str("}\n");
        self
    }

    /// `key = <expression>` with the expression written verbatim.
    pub fn raw_attribute(&mut self, key: &str, expression: &str) -> &mut Self {
        self.pad();
        self.out.push_str(key);
        self.out.push_str(" = ");
        self.out.push_str(expression);
        self.out.push('\n');
        self
    }

    /// Write one attribute. Nulls are skipped; non-empty lists of maps
    /// become repeated nested blocks.
    pub fn attribute(&mut self, key: &str, value: &AttrValue) -> &mut Self {
        match value {
            AttrValue::Null => {}
            AttrValue::List(items) if value.is_block_list() => {
                for item in items {
                    if let AttrValue::Map(map) = item {
                        self.open_block(key, &[]);
                        self.body(map);
                        self.close_block();
                    }
                }
            }
            other => {
                let rendered = format_value(other, self.depth);
                self.raw_attribute(key, &rendered);
            }
        }
        self
    }

    /// Write every attribute of `map` in key order.
    pub fn body(&mut self, map: &AttrMap) -> &mut Self {
        for (key, value) in map {
            self.attribute(key, value);
        }
        self
    }

    pub fn blank_line(&mut self) -> &mut Self {
        self.out.push('\n');
        self
    }

    #[must_use]
    pub fn finish(self) -> String {
        self.out
    }

    fn pad(&mut self) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
    }
}

/// Format a value as an HCL expression. `depth` is the indentation of the
/// line the expression starts on.
#[must_use]
pub fn format_value(value: &AttrValue, depth: usize) -> String {
    match value {
        AttrValue::Null => "null".to_string(),
        AttrValue::Bool(b) => b.to_string(),
        AttrValue::Int(i) => i.to_string(),
        AttrValue::Float(f) if f.is_finite() => f.to_string(),
        AttrValue::Float(_) => "null".to_string(),
        AttrValue::String(s) => quote(s),
        AttrValue::Interpolation(expr) => expr.clone(),
        AttrValue::List(items) => {
            let parts: Vec<String> = items.iter().map(|i| format_value(i, depth)).collect();
            format!("[{}]", parts.join(", "))
        }
        AttrValue::Map(map) if map.is_empty() => "{}".to_string(),
        AttrValue::Map(map) => {
            let inner = INDENT.repeat(depth + 1);
            let mut out = String::from("{\n");
            for (key, item) in map {
                if item.is_null() {
                    continue;
                }
                out.push_str(&inner);
                out.push_str(&quote(key));
                out.push_str(" = ");
                out.push_str(&format_value(item, depth + 1));
                out.push('\n');
            }
            out.push_str(&INDENT.repeat(depth));
            out.push('}');
            out
        }
    }
}
