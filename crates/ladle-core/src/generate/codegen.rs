//! JavaScript source emission.
//!
//! Every user-controlled string that ends up in generated code passes through
//! [`js_string`]; structured values go through [`js_value`]. Both produce JSON
//! text, which is valid JavaScript once U+2028 and U+2029 are escaped.

use serde_json::{Map, Value};
use std::fmt::Write;
use std::path::Path;

/// Quote `s` as a JavaScript string literal.
#[must_use]
pub fn js_string(s: &str) -> String {
    escape_line_separators(Value::from(s).to_string())
}

/// Serialize `value` as a JavaScript expression with object keys sorted.
#[must_use]
pub fn js_value(value: &Value) -> String {
    escape_line_separators(sorted(value).to_string())
}

/// JSON permits U+2028/U+2029 inside strings, older JavaScript engines do not.
fn escape_line_separators(json: String) -> String {
    if json.contains(['\u{2028}', '\u{2029}']) {
        json.replace('\u{2028}', "\\u2028")
            .replace('\u{2029}', "\\u2029")
    } else {
        json
    }
}

fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = Map::new();
            for key in keys {
                out.insert(key.clone(), sorted(&map[key.as_str()]));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

/// Import specifier the dev server understands for `path`.
///
/// Project-relative paths are served from the root (`/src/a.stories.tsx`);
/// absolute paths outside the root go through `/@fs`.
#[must_use]
pub fn module_specifier(path: &str) -> String {
    let path = path.replace('\\', "/");
    if Path::new(&path).is_absolute() || has_drive_prefix(&path) {
        if path.starts_with('/') {
            format!("/@fs{path}")
        } else {
            format!("/@fs/{path}")
        }
    } else {
        format!("/{}", path.trim_start_matches("./"))
    }
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && bytes[2] == b'/'
}

/// An object literal under construction. Keys are always quoted.
#[derive(Debug, Default)]
pub struct ObjectWriter {
    fields: Vec<(String, String)>,
}

impl ObjectWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `key: <expr>`; `expr` is emitted as-is.
    pub fn field(&mut self, key: &str, expr: impl Into<String>) -> &mut Self {
        self.fields.push((js_string(key), expr.into()));
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Render on one line: `{ "a": 1, "b": 2 }`.
    #[must_use]
    pub fn inline(&self) -> String {
        if self.fields.is_empty() {
            return "{}".to_string();
        }
        let body: Vec<String> = self
            .fields
            .iter()
            .map(|(key, expr)| format!("{key}: {expr}"))
            .collect();
        format!("{{ {} }}", body.join(", "))
    }

    /// Render one field per line at the given indentation depth.
    #[must_use]
    pub fn block(&self, depth: usize) -> String {
        if self.fields.is_empty() {
            return "{}".to_string();
        }
        let pad = "  ".repeat(depth + 1);
        let mut out = String::from("{\n");
        for (key, expr) in &self.fields {
            let _ = writeln!(out, "{pad}{key}: {expr},");
        }
        out.push_str(&"  ".repeat(depth));
        out.push('}');
        out
    }
}

/// Render `items` as an array literal of strings.
#[must_use]
pub fn js_string_array<'a>(items: impl IntoIterator<Item = &'a str>) -> String {
    let items: Vec<String> = items.into_iter().map(js_string).collect();
    format!("[{}]", items.join(", "))
}

/// Line-oriented builder for an ES module.
#[derive(Debug, Default)]
pub struct ModuleWriter {
    out: String,
}

impl ModuleWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `import <clause> from "<specifier>";`
    pub fn import(&mut self, clause: &str, specifier: &str) -> &mut Self {
        let _ = writeln!(self.out, "import {clause} from {};", js_string(specifier));
        self
    }

    /// `export const <name> = <expr>;`
    pub fn export_const(&mut self, name: &str, expr: &str) -> &mut Self {
        let _ = writeln!(self.out, "export const {name} = {expr};");
        self
    }

    #[must_use]
    pub fn finish(self) -> String {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_js_string_escapes_quotes_and_controls() {
        assert_eq!(js_string("plain"), r#""plain""#);
        assert_eq!(js_string(r#"say "hi""#), r#""say \"hi\"""#);
        assert_eq!(js_string("a\\b"), r#""a\\b""#);
        assert_eq!(js_string("line\nbreak"), r#""line\nbreak""#);
        assert_eq!(js_string("`${x}`"), r#""`${x}`""#);
        assert_eq!(js_string("</script>"), r#""</script>""#);
    }

    #[test]
    fn test_line_separators_are_escaped() {
        let quoted = js_string("a\u{2028}b\u{2029}c");
        assert_eq!(quoted, r#""a\u2028b\u2029c""#);
        assert!(!quoted.contains('\u{2028}'));

        let value = js_value(&json!({ "k": ["x\u{2029}"] }));
        assert_eq!(value, r#"{"k":["x\u2029"]}"#);
    }

    #[test]
    fn test_js_value_sorts_keys() {
        let value = json!({ "zeta": 1, "alpha": { "y": true, "b": null }, "mid": [ { "d": 1, "c": 2 } ] });
        assert_eq!(
            js_value(&value),
            r#"{"alpha":{"b":null,"y":true},"mid":[{"c":2,"d":1}],"zeta":1}"#
        );
    }

    #[test]
    fn test_module_specifier() {
        assert_eq!(module_specifier("src/a.stories.tsx"), "/src/a.stories.tsx");
        assert_eq!(module_specifier("./src/a.stories.tsx"), "/src/a.stories.tsx");
        assert_eq!(module_specifier("/opt/shared/x.stories.tsx"), "/@fs/opt/shared/x.stories.tsx");
        assert_eq!(module_specifier("C:\\work\\x.stories.tsx"), "/@fs/C:/work/x.stories.tsx");
    }

    #[test]
    fn test_object_writer() {
        let mut obj = ObjectWriter::new();
        assert_eq!(obj.inline(), "{}");
        assert_eq!(obj.block(0), "{}");

        obj.field("entry", js_string("src/a.tsx")).field("locStart", "3");
        assert_eq!(obj.inline(), r#"{ "entry": "src/a.tsx", "locStart": 3 }"#);
        assert_eq!(obj.block(1), "{\n    \"entry\": \"src/a.tsx\",\n    \"locStart\": 3,\n  }");

        let mut hostile = ObjectWriter::new();
        hostile.field("\"]; alert(1); //", "0");
        assert_eq!(hostile.inline(), r#"{ "\"]; alert(1); //": 0 }"#);
    }

    #[test]
    fn test_module_writer() {
        let mut module = ModuleWriter::new();
        module
            .import("{ lazy }", "react")
            .export_const("list", &js_string_array(["A", "B\"C"]));
        assert_eq!(
            module.finish(),
            "import { lazy } from \"react\";\nexport const list = [\"A\", \"B\\\"C\"];\n"
        );
    }
}
