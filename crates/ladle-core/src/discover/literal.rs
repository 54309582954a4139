//! Static evaluation of literal expressions.
//!
//! Story metadata and config objects are read without running any code, so
//! only literal values are accepted: strings, numbers, booleans, `null`,
//! arrays, objects and template literals without substitutions.

use serde_json::{Map, Number, Value};
use swc_ecma_ast::{Expr, ExprOrSpread, Lit, ObjectLit, Prop, PropName, PropOrSpread, UnaryOp};

/// Strip parentheses and TypeScript-only wrappers (`as`, `satisfies`, `!`, `<T>x`).
#[must_use]
pub fn unwrap_expr(expr: &Expr) -> &Expr {
    match expr {
        Expr::Paren(e) => unwrap_expr(&e.expr),
        Expr::TsAs(e) => unwrap_expr(&e.expr),
        Expr::TsSatisfies(e) => unwrap_expr(&e.expr),
        Expr::TsConstAssertion(e) => unwrap_expr(&e.expr),
        Expr::TsTypeAssertion(e) => unwrap_expr(&e.expr),
        Expr::TsNonNull(e) => unwrap_expr(&e.expr),
        other => other,
    }
}

/// Evaluate an expression that must be a static literal.
///
/// The error describes the first non-static part encountered.
pub fn eval_static(expr: &Expr) -> Result<Value, String> {
    match unwrap_expr(expr) {
        Expr::Lit(lit) => eval_lit(lit),
        Expr::Object(obj) => {
            let mut map = Map::new();
            for prop in &obj.props {
                let (key, value) = static_key_value(prop)?;
                map.insert(key, eval_static(value)?);
            }
            Ok(Value::Object(map))
        }
        Expr::Array(arr) => {
            let mut items = Vec::with_capacity(arr.elems.len());
            for elem in &arr.elems {
                match elem {
                    Some(ExprOrSpread { spread: None, expr }) => items.push(eval_static(expr)?),
                    Some(_) => return Err("spread elements are not static".to_string()),
                    // [1, , 2]
                    None => items.push(Value::Null),
                }
            }
            Ok(Value::Array(items))
        }
        Expr::Tpl(tpl) if tpl.exprs.is_empty() => {
            let text: String = tpl
                .quasis
                .iter()
                .map(|q| {
                    q.cooked
                        .as_ref()
                        .map_or_else(|| q.raw.to_string(), ToString::to_string)
                })
                .collect();
            Ok(Value::String(text))
        }
        Expr::Tpl(_) => Err("template literals with substitutions are not static".to_string()),
        Expr::Unary(unary) if matches!(unary.op, UnaryOp::Minus | UnaryOp::Plus) => {
            let Value::Number(n) = eval_static(&unary.arg)? else {
                return Err("unary +/- only applies to numbers".to_string());
            };
            let value = n.as_f64().unwrap_or_default();
            number(if matches!(unary.op, UnaryOp::Minus) {
                -value
            } else {
                value
            })
        }
        Expr::Ident(ident) if &*ident.sym == "undefined" => Ok(Value::Null),
        Expr::Ident(ident) => Err(format!("identifier `{}` is not static", ident.sym)),
        Expr::Arrow(_) | Expr::Fn(_) => Err("functions are not static".to_string()),
        Expr::Call(_) | Expr::New(_) => Err("calls are not static".to_string()),
        _ => Err("expression is not a static literal".to_string()),
    }
}

/// Like [`eval_static`], but drops object properties that are not static
/// instead of failing. Returns `None` when the expression itself is not static.
#[must_use]
pub fn eval_lenient(expr: &Expr) -> Option<Value> {
    match unwrap_expr(expr) {
        Expr::Object(obj) => Some(eval_object_lenient(obj)),
        other => eval_static(other).ok(),
    }
}

/// [`eval_lenient`] for an object literal, which always yields an object.
#[must_use]
pub fn eval_object_lenient(obj: &ObjectLit) -> Value {
    let mut map = Map::new();
    for prop in &obj.props {
        let Ok((key, value)) = static_key_value(prop) else {
            continue;
        };
        if let Some(value) = eval_lenient(value) {
            map.insert(key, value);
        }
    }
    Value::Object(map)
}

/// Find `name: <expr>` among an object literal's properties.
///
/// Properties whose key is not static are skipped; the last match wins, as at runtime.
#[must_use]
pub fn object_property<'a>(obj: &'a ObjectLit, name: &str) -> Option<&'a Expr> {
    obj.props
        .iter()
        .filter_map(|prop| static_key_value(prop).ok())
        .filter(|(key, _)| key == name)
        .map(|(_, value)| value)
        .last()
}

fn static_key_value(prop: &PropOrSpread) -> Result<(String, &Expr), String> {
    let PropOrSpread::Prop(prop) = prop else {
        return Err("spread properties are not static".to_string());
    };
    match &**prop {
        Prop::KeyValue(kv) => Ok((prop_name(&kv.key)?, &kv.value)),
        Prop::Shorthand(ident) => Err(format!("shorthand property `{}` is not static", ident.sym)),
        _ => Err("methods and accessors are not static".to_string()),
    }
}

fn prop_name(name: &PropName) -> Result<String, String> {
    match name {
        PropName::Ident(ident) => Ok(ident.sym.to_string()),
        PropName::Str(s) => Ok(s.value.to_string()),
        PropName::Num(n) => Ok(n.value.to_string()),
        PropName::Computed(computed) => match unwrap_expr(&computed.expr) {
            Expr::Lit(Lit::Str(s)) => Ok(s.value.to_string()),
            _ => Err("computed keys are not static".to_string()),
        },
        _ => Err("bigint keys are not supported".to_string()),
    }
}

fn eval_lit(lit: &Lit) -> Result<Value, String> {
    match lit {
        Lit::Str(s) => Ok(Value::String(s.value.to_string())),
        Lit::Bool(b) => Ok(Value::Bool(b.value)),
        Lit::Null(_) => Ok(Value::Null),
        Lit::Num(n) => number(n.value),
        Lit::BigInt(_) => Err("bigint literals are not supported".to_string()),
        Lit::Regex(_) => Err("regular expressions are not static".to_string()),
        _ => Err("literal kind is not supported".to_string()),
    }
}

fn number(value: f64) -> Result<Value, String> {
    // Integral values keep an integer representation so `1` stays `1`.
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        return Ok(Value::from(value as i64));
    }
    Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| "non-finite numbers are not supported".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use swc_common::{sync::Lrc, FileName, SourceMap};
    use swc_ecma_parser::{lexer::Lexer, Parser, StringInput, Syntax, TsSyntax};

    fn parse_expr(source: &str) -> Box<Expr> {
        let cm: Lrc<SourceMap> = Lrc::default();
        let fm = cm.new_source_file(
            Lrc::new(FileName::Custom("expr.ts".to_string())),
            source.to_string(),
        );
        let lexer = Lexer::new(
            Syntax::Typescript(TsSyntax::default()),
            Default::default(),
            StringInput::from(&*fm),
            None,
        );
        Parser::new_from(lexer).parse_expr().unwrap()
    }

    #[test]
    fn test_eval_literals() {
        assert_eq!(eval_static(&parse_expr("'hi'")).unwrap(), json!("hi"));
        assert_eq!(eval_static(&parse_expr("42")).unwrap(), json!(42));
        assert_eq!(eval_static(&parse_expr("-1.5")).unwrap(), json!(-1.5));
        assert_eq!(eval_static(&parse_expr("true")).unwrap(), json!(true));
        assert_eq!(eval_static(&parse_expr("null")).unwrap(), json!(null));
        assert_eq!(eval_static(&parse_expr("`plain`")).unwrap(), json!("plain"));
    }

    #[test]
    fn test_eval_nested_object() {
        let value = eval_static(&parse_expr(
            r#"({ width: 300, "tags": ["a", 'b'], nested: { ok: false }, 1: "one" }) as const"#,
        ))
        .unwrap();
        assert_eq!(
            value,
            json!({ "width": 300, "tags": ["a", "b"], "nested": { "ok": false }, "1": "one" })
        );
    }

    #[test]
    fn test_eval_rejects_dynamic_values() {
        let err = eval_static(&parse_expr("({ onClick: () => {} })")).unwrap_err();
        assert!(err.contains("functions"));

        let err = eval_static(&parse_expr("`a${b}`")).unwrap_err();
        assert!(err.contains("substitutions"));

        let err = eval_static(&parse_expr("({ ...base })")).unwrap_err();
        assert!(err.contains("spread"));

        let err = eval_static(&parse_expr("someVar")).unwrap_err();
        assert!(err.contains("someVar"));
    }

    #[test]
    fn test_eval_lenient_drops_dynamic_properties() {
        let value = eval_lenient(&parse_expr(
            "({ stories: 'src/**/*.stories.tsx', storyOrder: () => [], addons: { theme: { defaultState: 'dark' }, fn: x } })",
        ))
        .unwrap();
        assert_eq!(
            value,
            json!({ "stories": "src/**/*.stories.tsx", "addons": { "theme": { "defaultState": "dark" } } })
        );
    }

    #[test]
    fn test_object_property() {
        let expr = parse_expr("({ title: 'First', meta: { a: 1 }, title: 'Second', decorators: [x] })");
        let Expr::Object(obj) = unwrap_expr(&expr) else {
            panic!("expected object");
        };
        let title = object_property(obj, "title").unwrap();
        assert_eq!(eval_static(title).unwrap(), json!("Second"));
        assert!(object_property(obj, "missing").is_none());
    }
}
