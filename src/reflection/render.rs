//! String forms of reflection entities, laid out like PHP 8's
//! `Reflection*::__toString()`.

use std::sync::Arc;

use crate::engine::ReflectionEngine;
use crate::error::Result;
use crate::evaluator::{Scope, try_evaluate};
use crate::source_cache::ParsedFile;
use crate::types::{ArrayItem, Expr};
use crate::value::{ArrayKey, Value, format_float};

use super::function::Callable;
use super::{ReflectionClass, ReflectionClassConstant, ReflectionParameter, ReflectionProperty};

/// Render a default value the way PHP prints it after compilation.
///
/// Expressions PHP folds at compile time (literals and arithmetic on them)
/// are evaluated and formatted; anything that refers to a constant stays
/// as written.
pub(crate) fn default_value(
    engine: &ReflectionEngine,
    file: &Arc<ParsedFile>,
    expr: &Expr,
    source: Option<&str>,
    scope: &Scope,
) -> String {
    if !refers_to_constants(expr)
        && let Some(value) = try_evaluate(engine, file, expr, scope)
    {
        return format_default(&value);
    }
    source.map(str::to_string).unwrap_or_else(|| "<default>".to_string())
}

fn refers_to_constants(expr: &Expr) -> bool {
    match expr {
        Expr::Null | Expr::Bool(_) | Expr::Int(_) | Expr::Float(_) | Expr::String(_) => false,
        Expr::Magic(_) => false,
        Expr::ClassName(raw) => {
            let lower = raw.to_ascii_lowercase();
            matches!(lower.as_str(), "self" | "static" | "parent")
        }
        Expr::Constant(_) | Expr::ClassConstant { .. } | Expr::Unsupported { .. } => true,
        Expr::Array(items) => items.iter().any(|item| match item {
            ArrayItem::Value(v) | ArrayItem::Spread(v) => refers_to_constants(v),
            ArrayItem::KeyValue(k, v) => refers_to_constants(k) || refers_to_constants(v),
        }),
        Expr::Unary(_, operand) => refers_to_constants(operand),
        Expr::Binary(_, lhs, rhs) => refers_to_constants(lhs) || refers_to_constants(rhs),
        Expr::Ternary(cond, then, otherwise) => {
            refers_to_constants(cond)
                || then.as_deref().is_some_and(refers_to_constants)
                || refers_to_constants(otherwise)
        }
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\x0b' => out.push_str("\\v"),
            '\x0c' => out.push_str("\\f"),
            '\x1b' => out.push_str("\\e"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\x{:02X}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

pub(crate) fn format_default(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => format_float(*f),
        Value::String(s) => format!("'{}'", escape(s)),
        Value::Array(array) => {
            let is_list = array.is_list();
            let items: Vec<String> = array
                .iter()
                .map(|(key, item)| {
                    let item = format_default(item);
                    match (is_list, key) {
                        (true, _) => item,
                        (false, ArrayKey::Int(i)) => format!("{} => {}", i, item),
                        (false, ArrayKey::String(s)) => format!("'{}' => {}", escape(s), item),
                    }
                })
                .collect();
            format!("[{}]", items.join(", "))
        }
        Value::EnumCase { class, case } => format!("\\{}::{}", class, case),
        Value::Object { class, .. } => format!("object({})", class),
    }
}

/// `Parameter #0 [ <required> int $a ]`
pub(crate) fn parameter_string(param: &ReflectionParameter) -> String {
    let mut out = format!("Parameter #{} [ ", param.position());
    out.push_str(if param.is_optional() {
        "<optional> "
    } else {
        "<required> "
    });
    if let Some(ty) = param.ty() {
        out.push_str(&ty.to_string());
        out.push(' ');
    }
    if param.is_passed_by_reference() {
        out.push('&');
    }
    if param.is_variadic() {
        out.push_str("...");
    }
    out.push('$');
    out.push_str(param.name());
    if let Some(default) = param.default_repr() {
        out.push_str(" = ");
        out.push_str(&default);
    }
    out.push_str(" ]");
    out
}

/// A function or method block.  `annotations` are the extra entries of
/// the `<user, …>` tag (`inherits X`, `prototype Y`, `ctor`).
pub(crate) fn function_string(
    out: &mut String,
    engine: &ReflectionEngine,
    callable: &Callable,
    annotations: &[String],
    indent: &str,
) {
    let node = callable.node();
    let is_method = matches!(callable, Callable::Method(_));

    if let Some(doc) = &node.doc_comment {
        out.push_str(&format!("{}{}\n", indent, doc));
    }

    out.push_str(indent);
    out.push_str(if is_method { "Method [ <user" } else { "Function [ <user" });
    for note in annotations {
        out.push_str(", ");
        out.push_str(note);
    }
    out.push_str("> ");

    if let Callable::Method(slot) = callable {
        if slot.is_abstract() {
            out.push_str("abstract ");
        }
        if node.modifiers.is_final {
            out.push_str("final ");
        }
        if node.modifiers.is_static {
            out.push_str("static ");
        }
        out.push_str(slot.visibility.as_str());
        out.push_str(" method ");
    } else {
        out.push_str("function ");
    }
    if node.returns_reference {
        out.push('&');
    }
    out.push_str(&callable.name());
    out.push_str(" ] {\n");

    out.push_str(&format!(
        "{}  @@ {} {} - {}\n",
        indent,
        callable.file().path.display(),
        node.lines.start,
        node.lines.end
    ));

    if !node.parameters.is_empty() || node.return_type.is_some() {
        let params = callable.parameters(engine);
        out.push_str(&format!("\n{}  - Parameters [{}] {{\n", indent, params.len()));
        for param in &params {
            out.push_str(&format!("{}    {}\n", indent, parameter_string(param)));
        }
        out.push_str(&format!("{}  }}\n", indent));
    }

    if let Some(ty) = callable.return_type() {
        out.push_str(&format!("  {}- Return [ {} ]\n", indent, ty));
    }
    out.push_str(&format!("{}}}\n", indent));
}

/// `Property [ <default> public int $x = 1 ]`
pub(crate) fn property_string(out: &mut String, property: &ReflectionProperty, indent: &str) {
    out.push_str(indent);
    out.push_str("Property [ ");
    if !property.is_static() {
        out.push_str("<default> ");
    }
    out.push_str(property.visibility().as_str());
    out.push(' ');
    if property.is_static() {
        out.push_str("static ");
    }
    if property.is_readonly() {
        out.push_str("readonly ");
    }
    if let Some(ty) = property.ty() {
        out.push_str(&ty.to_string());
        out.push(' ');
    }
    out.push('$');
    out.push_str(property.name());
    if let Some(default) = property.default_repr() {
        out.push_str(" = ");
        out.push_str(&default);
    }
    out.push_str(" ]\n");
}

/// `Constant [ public int ANSWER ] { 42 }`.  Constants whose value cannot
/// be computed are left out, as PHP does when evaluation fails.
pub(crate) fn constant_string(out: &mut String, constant: &ReflectionClassConstant, indent: &str) {
    let value = match constant.value() {
        Ok(value) => value,
        Err(err) => {
            tracing::debug!("omitting {} from string form: {}", constant.name(), err);
            return;
        }
    };
    let shown = match &value {
        Value::Array(_) => "Array".to_string(),
        Value::EnumCase { .. } | Value::Object { .. } => "Object".to_string(),
        other => other.to_php_string().unwrap_or_default(),
    };
    out.push_str(&format!(
        "{}Constant [ {}{} {} {} ] {{ {} }}\n",
        indent,
        if constant.is_final() { "final " } else { "" },
        constant.visibility().as_str(),
        value.type_name(),
        constant.name(),
        shown
    ));
}

/// The full class block with its constant, property and method sections.
pub(crate) fn class_string(class: &ReflectionClass) -> Result<String> {
    let mut out = String::new();
    let indent = "";
    let sub_indent = "    ";

    if let Some(doc) = class.doc_comment() {
        out.push_str(&format!("{}{}\n", indent, doc));
    }

    let kind = if class.is_interface() {
        "Interface"
    } else if class.is_trait() {
        "Trait"
    } else if class.is_enum() {
        "Enum"
    } else {
        "Class"
    };
    out.push_str(&format!("{}{} [ <user> ", indent, kind));
    if class.is_iterable()? {
        out.push_str("<iterateable> ");
    }
    if class.is_interface() {
        out.push_str("interface ");
    } else if class.is_trait() {
        out.push_str("trait ");
    } else if class.is_enum() {
        out.push_str("enum ");
    } else {
        if class.is_abstract()? {
            out.push_str("abstract ");
        }
        if class.is_final() {
            out.push_str("final ");
        }
        if class.is_readonly() {
            out.push_str("readonly ");
        }
        out.push_str("class ");
    }
    out.push_str(&class.name());

    if let Some(parent) = class.parent_class_name()? {
        out.push_str(&format!(" extends {}", parent));
    }
    let interfaces = class.interface_names()?;
    if !interfaces.is_empty() {
        let keyword = if class.is_interface() { "extends" } else { "implements" };
        out.push_str(&format!(" {} {}", keyword, interfaces.join(", ")));
    }
    out.push_str(" ] {\n");
    out.push_str(&format!(
        "{}  @@ {} {}-{}\n",
        indent,
        class.file_name().display(),
        class.start_line(),
        class.end_line()
    ));

    let constants = class.reflection_constants()?;
    out.push_str(&format!("\n{}  - Constants [{}] {{\n", indent, constants.len()));
    for constant in &constants {
        constant_string(&mut out, constant, sub_indent);
    }
    out.push_str(&format!("{}  }}\n", indent));

    let properties = class.properties(None)?;
    let (statics, instance): (Vec<_>, Vec<_>) = properties.iter().partition(|p| p.is_static());
    out.push_str(&format!("\n{}  - Static properties [{}] {{\n", indent, statics.len()));
    for property in &statics {
        property_string(&mut out, property, sub_indent);
    }
    out.push_str(&format!("{}  }}\n", indent));

    // Private methods of ancestors are listed by methods() but not here.
    let methods: Vec<_> = class
        .methods(None)?
        .into_iter()
        .filter(|m| !m.is_private() || m.class().eq_ignore_ascii_case(&class.name()))
        .collect();
    let (static_methods, instance_methods): (Vec<_>, Vec<_>) =
        methods.iter().partition(|m| m.is_static());

    out.push_str(&format!("\n{}  - Static methods [{}] {{", indent, static_methods.len()));
    if static_methods.is_empty() {
        out.push('\n');
    }
    for method in &static_methods {
        out.push('\n');
        method.render(&mut out, sub_indent);
    }
    out.push_str(&format!("{}  }}\n", indent));

    out.push_str(&format!("\n{}  - Properties [{}] {{\n", indent, instance.len()));
    for property in &instance {
        property_string(&mut out, property, sub_indent);
    }
    out.push_str(&format!("{}  }}\n", indent));

    out.push_str(&format!("\n{}  - Methods [{}] {{", indent, instance_methods.len()));
    if instance_methods.is_empty() {
        out.push('\n');
    }
    for method in &instance_methods {
        out.push('\n');
        method.render(&mut out, sub_indent);
    }
    out.push_str(&format!("{}  }}\n", indent));
    out.push_str(&format!("{}}}\n", indent));

    Ok(out)
}
