//! Constant expression evaluation.
//!
//! Evaluates the expression subtrees the parser keeps for default values,
//! property initializers, and constant declarations.  Only PHP's constant
//! grammar is supported; anything else fails with
//! [`ReflectionError::UnsupportedExpression`] and callers that surface
//! defaults turn that into "unknown".
//!
//! Constants are looked up in indexed declarations first, then in the live
//! runtime (when one is attached), then in a small table of core constants.
//! A name found nowhere fails with [`ReflectionError::ConstantNotFound`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::engine::ReflectionEngine;
use crate::error::{ReflectionError, Result};
use crate::index::{constant_key, symbol_key};
use crate::inheritance::{ConstantSlot, InheritanceResolver};
use crate::resolution::NamespaceContext;
use crate::source_cache::ParsedFile;
use crate::types::{ArrayItem, BinaryOp, Expr, MagicConstant, NamespaceNode, UnaryOp};
use crate::value::{ArrayKey, Number, PhpArray, Value, float_to_int};

/// Where an expression was written.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub file: PathBuf,
    pub namespace: NamespaceContext,
    /// FQN of the enclosing class-like.
    pub class: Option<String>,
    pub parent: Option<String>,
    /// FQN of the enclosing trait, for `__TRAIT__`.
    pub trait_name: Option<String>,
    /// Name of the enclosing function or method.
    pub function: Option<String>,
}

impl Scope {
    /// Scope of a namespace block outside any class or function.
    pub fn for_namespace(file: &Path, namespace: &NamespaceNode) -> Self {
        Self {
            file: file.to_path_buf(),
            namespace: NamespaceContext::from_node(namespace),
            ..Self::default()
        }
    }
}

fn unsupported(message: impl Into<String>) -> ReflectionError {
    ReflectionError::UnsupportedExpression(message.into())
}

/// Evaluates expressions for one top-level request.
///
/// `active` holds the constants currently being evaluated; meeting one of
/// them again means the definition refers to itself.
pub struct Evaluator<'e> {
    engine: &'e ReflectionEngine,
    active: Vec<String>,
}

impl<'e> Evaluator<'e> {
    pub fn new(engine: &'e ReflectionEngine) -> Self {
        Self {
            engine,
            active: Vec::new(),
        }
    }

    pub fn evaluate(&mut self, expr: &Expr, scope: &Scope) -> Result<Value> {
        match expr {
            Expr::Null => Ok(Value::Null),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Int(i) => Ok(Value::Int(*i)),
            Expr::Float(f) => Ok(Value::Float(*f)),
            Expr::String(s) => Ok(Value::String(s.clone())),
            Expr::Array(items) => self.array(items, scope),
            Expr::Unary(op, operand) => {
                let value = self.evaluate(operand, scope)?;
                unary(*op, value)
            }
            Expr::Binary(op, lhs, rhs) => self.binary(*op, lhs, rhs, scope),
            Expr::Ternary(cond, then, otherwise) => {
                let cond = self.evaluate(cond, scope)?;
                match (cond.to_bool(), then) {
                    (true, Some(then)) => self.evaluate(then, scope),
                    (true, None) => Ok(cond),
                    (false, _) => self.evaluate(otherwise, scope),
                }
            }
            Expr::Constant(name) => self.constant(name, scope),
            Expr::ClassConstant { class, name } => self.class_constant(class, name, scope),
            Expr::ClassName(raw) => self.class_name(raw, scope).map(Value::String),
            Expr::Magic(magic) => Ok(magic_constant(*magic, scope)),
            Expr::Unsupported { kind, source } => {
                tracing::debug!("cannot evaluate {} expression `{}`", kind, source);
                Err(unsupported(format!("{} `{}`", kind, source)))
            }
        }
    }

    /// Evaluate the global constant `fqn` (no namespace fallback).
    pub fn global_constant(&mut self, fqn: &str) -> Result<Value> {
        let fqn = fqn.trim_start_matches('\\');
        self.constant(&format!("\\{}", fqn), &Scope::default())
    }

    fn array(&mut self, items: &[ArrayItem], scope: &Scope) -> Result<Value> {
        let mut array = PhpArray::new();
        for item in items {
            match item {
                ArrayItem::Value(expr) => {
                    let value = self.evaluate(expr, scope)?;
                    array.push(value);
                }
                ArrayItem::KeyValue(key, expr) => {
                    let key = array_key(self.evaluate(key, scope)?)?;
                    let value = self.evaluate(expr, scope)?;
                    array.insert(key, value);
                }
                ArrayItem::Spread(expr) => match self.evaluate(expr, scope)? {
                    Value::Array(inner) => {
                        for (key, value) in inner.iter() {
                            match key {
                                ArrayKey::Int(_) => array.push(value.clone()),
                                ArrayKey::String(_) => array.insert(key.clone(), value.clone()),
                            }
                        }
                    }
                    other => {
                        return Err(unsupported(format!(
                            "only arrays can be unpacked, {} given",
                            other.type_name()
                        )));
                    }
                },
            }
        }
        Ok(Value::Array(array))
    }

    fn binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr, scope: &Scope) -> Result<Value> {
        let left = self.evaluate(lhs, scope)?;

        // Short-circuiting operators decide before evaluating the right side.
        match op {
            BinaryOp::And if !left.to_bool() => return Ok(Value::Bool(false)),
            BinaryOp::Or if left.to_bool() => return Ok(Value::Bool(true)),
            BinaryOp::Coalesce if left != Value::Null => return Ok(left),
            _ => {}
        }

        let right = self.evaluate(rhs, scope)?;
        binary(op, left, right)
    }

    fn constant(&mut self, name: &str, scope: &Scope) -> Result<Value> {
        let bare = name.trim_start_matches('\\');
        if bare.eq_ignore_ascii_case("true") {
            return Ok(Value::Bool(true));
        }
        if bare.eq_ignore_ascii_case("false") {
            return Ok(Value::Bool(false));
        }
        if bare.eq_ignore_ascii_case("null") {
            return Ok(Value::Null);
        }

        let candidates = scope.namespace.resolve_constant(name);
        for fqn in &candidates {
            let (file, decl) = match self.engine.locate_constant(fqn) {
                Ok(found) => found,
                Err(err) if err.is_not_found() => continue,
                Err(err) => return Err(err),
            };
            let namespace = &file.ast.namespaces[decl.namespace];
            let node = &namespace.constants[decl.index];
            let scope = Scope::for_namespace(&file.path, namespace);
            return self.guarded(constant_key(fqn), |this| this.evaluate(&node.value, &scope));
        }

        if let Some(bridge) = self.engine.bridge() {
            for fqn in &candidates {
                if let Some(value) = bridge.constant(fqn) {
                    return Ok(value);
                }
            }
        }

        if self.engine.core_constants()
            && let Some(global) = candidates.last()
            && let Some(value) = core_constant(global)
        {
            return Ok(value);
        }

        Err(ReflectionError::ConstantNotFound(bare.to_string()))
    }

    fn class_constant(&mut self, class: &str, name: &str, scope: &Scope) -> Result<Value> {
        let fqn = self.class_name(class, scope)?;
        let decl = self.engine.locate_class(&fqn)?;
        let members = InheritanceResolver::new(self.engine).resolve(&decl)?;
        let slot = members
            .constant(name)
            .ok_or_else(|| ReflectionError::ClassConstantNotFound {
                class: decl.fqn(),
                constant: name.to_string(),
            })?;
        self.constant_slot(slot)
    }

    /// Value of a class constant (or enum case) found by the inheritance
    /// resolver.
    pub fn constant_slot(&mut self, slot: &ConstantSlot) -> Result<Value> {
        let node = slot.node();
        if node.is_enum_case {
            return Ok(Value::EnumCase {
                class: slot.declaring.fqn(),
                case: node.name.clone(),
            });
        }
        let Some(value) = &node.value else {
            return Err(unsupported(format!("{}::{} has no value", slot.declaring.fqn(), node.name)));
        };

        // `self::` inside a trait constant means the using class.
        let mut inner = slot.owner.scope(None);
        if !slot.owner.same(&slot.declaring) {
            inner.class = Some(slot.declaring.fqn());
            inner.parent = slot.declaring.parent_name();
        }
        let key = format!("{}::{}", symbol_key(&slot.declaring.fqn()), node.name);
        self.guarded(key, |this| this.evaluate(value, &inner))
    }

    fn class_name(&self, raw: &str, scope: &Scope) -> Result<String> {
        if raw.eq_ignore_ascii_case("self") || raw.eq_ignore_ascii_case("static") {
            return scope.class.clone().ok_or_else(|| {
                unsupported(format!("cannot use \"{}\" when no class scope is active", raw))
            });
        }
        if raw.eq_ignore_ascii_case("parent") {
            return scope.parent.clone().ok_or_else(|| {
                unsupported("cannot use \"parent\" when current class scope has no parent")
            });
        }
        Ok(scope.namespace.resolve_class(raw))
    }

    fn guarded<F>(&mut self, key: String, eval: F) -> Result<Value>
    where
        F: FnOnce(&mut Self) -> Result<Value>,
    {
        if self.active.contains(&key) {
            tracing::warn!("self-referencing constant {}", key);
            return Err(unsupported(format!("cannot declare self-referencing constant {}", key)));
        }
        self.active.push(key);
        let result = eval(self);
        self.active.pop();
        result
    }
}

fn magic_constant(magic: MagicConstant, scope: &Scope) -> Value {
    let string = |s: Option<&String>| Value::String(s.cloned().unwrap_or_default());
    match magic {
        MagicConstant::Class => string(scope.class.as_ref()),
        MagicConstant::Namespace => Value::String(scope.namespace.namespace.clone()),
        MagicConstant::Function => string(scope.function.as_ref()),
        MagicConstant::Method => match (&scope.class, &scope.function) {
            (Some(class), Some(function)) => Value::String(format!("{}::{}", class, function)),
            (_, function) => string(function.as_ref()),
        },
        MagicConstant::Trait => string(scope.trait_name.as_ref()),
        MagicConstant::Line(line) => Value::Int(i64::from(line)),
        MagicConstant::File => Value::String(scope.file.display().to_string()),
        MagicConstant::Dir => Value::String(
            scope
                .file
                .parent()
                .map(|dir| dir.display().to_string())
                .unwrap_or_default(),
        ),
    }
}

/// Normalise a value used as an array key.
fn array_key(value: Value) -> Result<ArrayKey> {
    match value {
        Value::Int(i) => Ok(ArrayKey::Int(i)),
        Value::String(s) => Ok(match canonical_int(&s) {
            Some(i) => ArrayKey::Int(i),
            None => ArrayKey::String(s),
        }),
        Value::Bool(b) => Ok(ArrayKey::Int(b as i64)),
        Value::Null => Ok(ArrayKey::String(String::new())),
        Value::Float(f) => Ok(ArrayKey::Int(float_to_int(f))),
        other => Err(unsupported(format!("illegal offset type {}", other.type_name()))),
    }
}

/// `"12"` is an integer key, `"012"`, `"-0"` and `"1.0"` are not.
fn canonical_int(s: &str) -> Option<i64> {
    let digits = s.strip_prefix('-').unwrap_or(s);
    if digits.is_empty()
        || !digits.bytes().all(|b| b.is_ascii_digit())
        || (digits.len() > 1 && digits.starts_with('0'))
        || s == "-0"
    {
        return None;
    }
    s.parse().ok()
}

fn number(value: &Value, op: &str) -> Result<Number> {
    value.to_number().ok_or_else(|| {
        unsupported(format!("unsupported operand type {} for {}", value.type_name(), op))
    })
}

fn int(value: &Value, op: &str) -> Result<i64> {
    value.to_int().ok_or_else(|| {
        unsupported(format!("unsupported operand type {} for {}", value.type_name(), op))
    })
}

fn unary(op: UnaryOp, value: Value) -> Result<Value> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!value.to_bool())),
        UnaryOp::Plus => Ok(number(&value, "+")?.into()),
        UnaryOp::Minus => Ok(match number(&value, "-")? {
            Number::Int(i) => i
                .checked_neg()
                .map(Value::Int)
                .unwrap_or(Value::Float(-(i as f64))),
            Number::Float(f) => Value::Float(-f),
        }),
        UnaryOp::BitNot => match value {
            Value::Int(i) => Ok(Value::Int(!i)),
            Value::Float(f) => Ok(Value::Int(!float_to_int(f))),
            Value::String(s) => Ok(Value::String(
                String::from_utf8_lossy(&s.bytes().map(|b| !b).collect::<Vec<_>>()).into_owned(),
            )),
            other => Err(unsupported(format!(
                "cannot perform bitwise not on {}",
                other.type_name()
            ))),
        },
    }
}

fn binary(op: BinaryOp, left: Value, right: Value) -> Result<Value> {
    use std::cmp::Ordering;

    match op {
        BinaryOp::Add => {
            if let (Value::Array(l), Value::Array(r)) = (&left, &right) {
                let mut union = l.clone();
                for (key, value) in r.iter() {
                    if union.get(key).is_none() {
                        union.insert(key.clone(), value.clone());
                    }
                }
                return Ok(Value::Array(union));
            }
            arithmetic(op, &left, &right, i64::checked_add, |a, b| a + b)
        }
        BinaryOp::Sub => arithmetic(op, &left, &right, i64::checked_sub, |a, b| a - b),
        BinaryOp::Mul => arithmetic(op, &left, &right, i64::checked_mul, |a, b| a * b),
        BinaryOp::Div => {
            let (l, r) = (number(&left, "/")?, number(&right, "/")?);
            if r.as_f64() == 0.0 {
                return Err(unsupported("division by zero"));
            }
            Ok(match (l, r) {
                (Number::Int(a), Number::Int(b)) if a.checked_rem(b) == Some(0) => {
                    a.checked_div(b).map(Value::Int).unwrap_or(Value::Float(a as f64 / b as f64))
                }
                _ => Value::Float(l.as_f64() / r.as_f64()),
            })
        }
        BinaryOp::Mod => {
            let (a, b) = (int(&left, "%")?, int(&right, "%")?);
            if b == 0 {
                return Err(unsupported("modulo by zero"));
            }
            Ok(Value::Int(a.checked_rem(b).unwrap_or(0)))
        }
        BinaryOp::Pow => {
            let (l, r) = (number(&left, "**")?, number(&right, "**")?);
            Ok(match (l, r) {
                (Number::Int(a), Number::Int(b)) if b >= 0 => u32::try_from(b)
                    .ok()
                    .and_then(|b| a.checked_pow(b))
                    .map(Value::Int)
                    .unwrap_or(Value::Float((a as f64).powf(b as f64))),
                _ => Value::Float(l.as_f64().powf(r.as_f64())),
            })
        }
        BinaryOp::Concat => {
            let l = left
                .to_php_string()
                .ok_or_else(|| unsupported("object could not be converted to string"))?;
            let r = right
                .to_php_string()
                .ok_or_else(|| unsupported("object could not be converted to string"))?;
            Ok(Value::String(l + &r))
        }
        BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => {
            if let (Value::String(l), Value::String(r)) = (&left, &right) {
                return Ok(Value::String(bytewise(op, l, r)));
            }
            let (a, b) = (int(&left, "bitwise operator")?, int(&right, "bitwise operator")?);
            Ok(Value::Int(match op {
                BinaryOp::BitAnd => a & b,
                BinaryOp::BitOr => a | b,
                _ => a ^ b,
            }))
        }
        BinaryOp::ShiftLeft | BinaryOp::ShiftRight => {
            let (a, b) = (int(&left, "shift")?, int(&right, "shift")?);
            if b < 0 {
                return Err(unsupported("bit shift by negative number"));
            }
            Ok(Value::Int(match (op, b >= 64) {
                (BinaryOp::ShiftLeft, true) => 0,
                (BinaryOp::ShiftLeft, false) => a.wrapping_shl(b as u32),
                (_, true) => if a < 0 { -1 } else { 0 },
                (_, false) => a >> b,
            }))
        }
        BinaryOp::And => Ok(Value::Bool(left.to_bool() && right.to_bool())),
        BinaryOp::Or => Ok(Value::Bool(left.to_bool() || right.to_bool())),
        BinaryOp::Xor => Ok(Value::Bool(left.to_bool() ^ right.to_bool())),
        BinaryOp::Equal => Ok(Value::Bool(left.loose_eq(&right))),
        BinaryOp::NotEqual => Ok(Value::Bool(!left.loose_eq(&right))),
        BinaryOp::Identical => Ok(Value::Bool(left.identical(&right))),
        BinaryOp::NotIdentical => Ok(Value::Bool(!left.identical(&right))),
        BinaryOp::Less => Ok(Value::Bool(left.compare(&right) == Some(Ordering::Less))),
        BinaryOp::LessOrEqual => Ok(Value::Bool(matches!(
            left.compare(&right),
            Some(Ordering::Less | Ordering::Equal)
        ))),
        BinaryOp::Greater => Ok(Value::Bool(left.compare(&right) == Some(Ordering::Greater))),
        BinaryOp::GreaterOrEqual => Ok(Value::Bool(matches!(
            left.compare(&right),
            Some(Ordering::Greater | Ordering::Equal)
        ))),
        BinaryOp::Spaceship => Ok(Value::Int(match left.compare(&right) {
            Some(Ordering::Less) => -1,
            Some(Ordering::Equal) => 0,
            Some(Ordering::Greater) | None => 1,
        })),
        // Left side was non-null, otherwise `binary` never gets here.
        BinaryOp::Coalesce => Ok(left),
    }
}

/// `+ - *` with int overflow promoting to float.
fn arithmetic(
    op: BinaryOp,
    left: &Value,
    right: &Value,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value> {
    let name = format!("{:?}", op);
    let (l, r) = (number(left, &name)?, number(right, &name)?);
    Ok(match (l, r) {
        (Number::Int(a), Number::Int(b)) => int_op(a, b)
            .map(Value::Int)
            .unwrap_or(Value::Float(float_op(a as f64, b as f64))),
        _ => Value::Float(float_op(l.as_f64(), r.as_f64())),
    })
}

fn bytewise(op: BinaryOp, l: &str, r: &str) -> String {
    let (l, r) = (l.as_bytes(), r.as_bytes());
    let bytes: Vec<u8> = match op {
        BinaryOp::BitOr => (0..l.len().max(r.len()))
            .map(|i| l.get(i).copied().unwrap_or(0) | r.get(i).copied().unwrap_or(0))
            .collect(),
        BinaryOp::BitAnd => l.iter().zip(r).map(|(a, b)| a & b).collect(),
        _ => l.iter().zip(r).map(|(a, b)| a ^ b).collect(),
    };
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Core PHP constants that are always defined.
pub fn core_constant(name: &str) -> Option<Value> {
    let name = name.trim_start_matches('\\');
    let int = |i: i64| Some(Value::Int(i));
    let float = |f: f64| Some(Value::Float(f));
    match name {
        "PHP_EOL" => Some(Value::String("\n".to_string())),
        "PHP_INT_MAX" => int(i64::MAX),
        "PHP_INT_MIN" => int(i64::MIN),
        "PHP_INT_SIZE" => int(8),
        "PHP_FLOAT_EPSILON" => float(f64::EPSILON),
        "PHP_FLOAT_MAX" => float(f64::MAX),
        "PHP_FLOAT_MIN" => float(f64::MIN_POSITIVE),
        "PHP_FLOAT_DIG" => int(15),
        "PHP_MAJOR_VERSION" => int(8),
        "DIRECTORY_SEPARATOR" => Some(Value::String(std::path::MAIN_SEPARATOR.to_string())),
        "PATH_SEPARATOR" => Some(Value::String(if cfg!(windows) { ";" } else { ":" }.to_string())),
        "INF" => float(f64::INFINITY),
        "NAN" => float(f64::NAN),
        "M_PI" => float(std::f64::consts::PI),
        "M_PI_2" => float(std::f64::consts::FRAC_PI_2),
        "M_PI_4" => float(std::f64::consts::FRAC_PI_4),
        "M_1_PI" => float(std::f64::consts::FRAC_1_PI),
        "M_2_PI" => float(std::f64::consts::FRAC_2_PI),
        "M_E" => float(std::f64::consts::E),
        "M_LN2" => float(std::f64::consts::LN_2),
        "M_LN10" => float(std::f64::consts::LN_10),
        "M_LOG2E" => float(std::f64::consts::LOG2_E),
        "M_LOG10E" => float(std::f64::consts::LOG10_E),
        "M_SQRT2" => float(std::f64::consts::SQRT_2),
        "M_SQRT1_2" => float(std::f64::consts::FRAC_1_SQRT_2),
        "E_ERROR" => int(1),
        "E_WARNING" => int(2),
        "E_PARSE" => int(4),
        "E_NOTICE" => int(8),
        "E_CORE_ERROR" => int(16),
        "E_CORE_WARNING" => int(32),
        "E_COMPILE_ERROR" => int(64),
        "E_COMPILE_WARNING" => int(128),
        "E_USER_ERROR" => int(256),
        "E_USER_WARNING" => int(512),
        "E_USER_NOTICE" => int(1024),
        "E_STRICT" => int(2048),
        "E_RECOVERABLE_ERROR" => int(4096),
        "E_DEPRECATED" => int(8192),
        "E_USER_DEPRECATED" => int(16384),
        "E_ALL" => int(32767),
        "SORT_REGULAR" => int(0),
        "SORT_NUMERIC" => int(1),
        "SORT_STRING" => int(2),
        "SORT_FLAG_CASE" => int(8),
        "COUNT_RECURSIVE" => int(1),
        "ARRAY_FILTER_USE_BOTH" => int(1),
        "ARRAY_FILTER_USE_KEY" => int(2),
        "JSON_HEX_TAG" => int(1),
        "JSON_HEX_QUOT" => int(8),
        "JSON_FORCE_OBJECT" => int(16),
        "JSON_UNESCAPED_SLASHES" => int(64),
        "JSON_PRETTY_PRINT" => int(128),
        "JSON_UNESCAPED_UNICODE" => int(256),
        "JSON_THROW_ON_ERROR" => int(4_194_304),
        "ENT_QUOTES" => int(3),
        "PREG_SPLIT_NO_EMPTY" => int(1),
        "PHP_ROUND_HALF_UP" => int(1),
        "PHP_ROUND_HALF_DOWN" => int(2),
        _ => None,
    }
}

/// Evaluate the value of `expr` written in `file`, for callers that only
/// want a best-effort result.
pub fn try_evaluate(
    engine: &ReflectionEngine,
    file: &Arc<ParsedFile>,
    expr: &Expr,
    scope: &Scope,
) -> Option<Value> {
    match Evaluator::new(engine).evaluate(expr, scope) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::debug!("unknown value in {}: {}", file.path.display(), err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    fn engine_with(path: &str, php: &str) -> ReflectionEngine {
        let engine = ReflectionEngine::builder().build();
        engine.parse_source(Path::new(path), php).unwrap();
        engine
    }

    fn eval(php_expr: &str) -> Result<Value> {
        let engine = engine_with(
            "/virtual/eval.php",
            &format!("<?php\nnamespace T;\nconst SUBJECT = {};\n", php_expr),
        );
        engine.constant_value("T\\SUBJECT")
    }

    #[test]
    fn arithmetic_follows_php() {
        assert_eq!(eval("1 + 2").unwrap(), Value::Int(3));
        assert_eq!(eval("7 / 2").unwrap(), Value::Float(3.5));
        assert_eq!(eval("6 / 3").unwrap(), Value::Int(2));
        assert_eq!(eval("-7 % 3").unwrap(), Value::Int(-1));
        assert_eq!(eval("2 ** 10").unwrap(), Value::Int(1024));
        assert_eq!(eval("2 ** -1").unwrap(), Value::Float(0.5));
        assert_eq!(
            eval("PHP_INT_MAX + 1").unwrap(),
            Value::Float(9_223_372_036_854_775_808.0)
        );
        assert_eq!(eval("1 << 3 | 1").unwrap(), Value::Int(9));
        assert_eq!(eval("-8 >> 70").unwrap(), Value::Int(-1));
        assert_eq!(eval("'a' . 1.5 . true").unwrap(), Value::String("a1.51".into()));
    }

    #[test]
    fn division_and_modulo_by_zero_fail() {
        assert!(matches!(eval("1 / 0"), Err(ReflectionError::UnsupportedExpression(_))));
        assert!(matches!(eval("1 % 0"), Err(ReflectionError::UnsupportedExpression(_))));
        assert!(matches!(eval("1 << -1"), Err(ReflectionError::UnsupportedExpression(_))));
    }

    #[test]
    fn logic_and_comparison() {
        assert_eq!(eval("1 < 2 && '10' == '1e1'").unwrap(), Value::Bool(true));
        assert_eq!(eval("null ?? 'fallback'").unwrap(), Value::String("fallback".into()));
        assert_eq!(eval("0 ?: 5").unwrap(), Value::Int(5));
        assert_eq!(eval("true ? 'y' : 'n'").unwrap(), Value::String("y".into()));
        assert_eq!(eval("[1, 2] <=> [1, 3]").unwrap(), Value::Int(-1));
        assert_eq!(eval("1 === 1.0").unwrap(), Value::Bool(false));
    }

    #[test]
    fn array_literals() {
        let value = eval("['a' => 1, 5 => 'x', 'y', '7' => 'z', ...[10, 'k' => 11]]").unwrap();
        let Value::Array(array) = value else {
            panic!("expected an array");
        };
        let keys: Vec<String> = array.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, vec!["a", "5", "6", "7", "8", "k"]);
        assert_eq!(array.get(&ArrayKey::Int(8)), Some(&Value::Int(10)));
    }

    #[test]
    fn namespaced_constants_fall_back_to_global() {
        let engine = engine_with(
            "/virtual/consts.php",
            concat!(
                "<?php\n",
                "namespace Lib { const LIMIT = 10; }\n",
                "namespace { const GLOBAL_ONE = 1; }\n",
                "namespace App {\n",
                "    use const Lib\\LIMIT as MAX;\n",
                "    const LOCAL = MAX + GLOBAL_ONE + \\Lib\\LIMIT;\n",
                "    const EOL = PHP_EOL;\n",
                "}\n",
            ),
        );
        assert_eq!(engine.constant_value("App\\LOCAL").unwrap(), Value::Int(21));
        assert_eq!(engine.constant_value("\\App\\EOL").unwrap(), Value::String("\n".into()));
    }

    #[test]
    fn class_constants_and_enum_cases() {
        let engine = engine_with(
            "/virtual/classes.php",
            concat!(
                "<?php\n",
                "namespace Shop;\n",
                "class Base { const RATE = 2; }\n",
                "class Item extends Base {\n",
                "    const PRICE = parent::RATE * 10;\n",
                "    const LABEL = self::class . ':' . self::PRICE;\n",
                "}\n",
                "enum Size { case Small; }\n",
                "const DEFAULT_SIZE = Size::Small;\n",
                "const TOTAL = Item::PRICE + Item::RATE;\n",
            ),
        );
        assert_eq!(engine.constant_value("Shop\\TOTAL").unwrap(), Value::Int(22));
        assert_eq!(
            engine.constant_value("Shop\\DEFAULT_SIZE").unwrap(),
            Value::EnumCase {
                class: "Shop\\Size".into(),
                case: "Small".into()
            }
        );
    }

    #[test]
    fn self_reference_is_detected() {
        let engine = engine_with(
            "/virtual/loop.php",
            "<?php\nclass Loop { const A = self::B; const B = self::A; }\nconst START = Loop::A;\n",
        );
        let err = engine.constant_value("START").unwrap_err();
        assert!(err.to_string().contains("self-referencing"));
    }

    #[test]
    fn unknown_names_and_calls_fail() {
        assert!(matches!(
            eval("UNDEFINED_THING"),
            Err(ReflectionError::ConstantNotFound(name)) if name == "UNDEFINED_THING"
        ));
        assert!(matches!(eval("strlen('x')"), Err(ReflectionError::UnsupportedExpression(_))));
    }

    #[test]
    fn magic_constants_use_declaration_context() {
        assert_eq!(eval("__NAMESPACE__").unwrap(), Value::String("T".into()));
        assert_eq!(eval("__DIR__").unwrap(), Value::String("/virtual".into()));
        assert_eq!(eval("__LINE__").unwrap(), Value::Int(3));
        assert_eq!(eval("__CLASS__").unwrap(), Value::String(String::new()));
    }
}
