//! PHP values produced by constant evaluation and the live runtime.
//!
//! Conversions follow PHP 8 semantics for the subset of operations that
//! constant expressions can perform (numeric coercion, string conversion,
//! truthiness, loose and strict comparison).

use std::cmp::Ordering;
use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};

/// An array key.  Integer-like strings are normalised to `Int` on insert.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArrayKey {
    Int(i64),
    String(String),
}

impl fmt::Display for ArrayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArrayKey::Int(i) => write!(f, "{}", i),
            ArrayKey::String(s) => f.write_str(s),
        }
    }
}

/// An ordered PHP array.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhpArray {
    entries: Vec<(ArrayKey, Value)>,
    next_index: i64,
}

impl PhpArray {
    pub fn new() -> Self {
        Self::default()
    }

    /// `$a[] = $value`
    pub fn push(&mut self, value: Value) {
        let key = ArrayKey::Int(self.next_index);
        self.insert(key, value);
    }

    /// `$a[$key] = $value`; an existing key keeps its position.
    pub fn insert(&mut self, key: ArrayKey, value: Value) {
        if let ArrayKey::Int(i) = key
            && i >= self.next_index
        {
            self.next_index = i.saturating_add(1);
        }
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &ArrayKey) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ArrayKey, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the keys are exactly `0..len` in order.
    pub fn is_list(&self) -> bool {
        self.entries
            .iter()
            .enumerate()
            .all(|(i, (k, _))| *k == ArrayKey::Int(i as i64))
    }
}

impl FromIterator<Value> for PhpArray {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        let mut array = PhpArray::new();
        for value in iter {
            array.push(value);
        }
        array
    }
}

/// A PHP value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(PhpArray),
    /// An enum case, referenced by class and case name.
    EnumCase { class: String, case: String },
    /// An object living in the live runtime.
    Object { class: String, id: u64 },
}

/// A number after numeric coercion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        match n {
            Number::Int(i) => Value::Int(i),
            Number::Float(f) => Value::Float(f),
        }
    }
}

impl Value {
    /// The type name `gettype()`-style, as used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::EnumCase { .. } | Value::Object { .. } => "object",
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::String(_)
        )
    }

    /// PHP truthiness.
    pub fn to_bool(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !(s.is_empty() || s == "0"),
            Value::Array(a) => !a.is_empty(),
            Value::EnumCase { .. } | Value::Object { .. } => true,
        }
    }

    /// Numeric coercion for arithmetic.  Returns `None` for arrays and
    /// objects, which PHP rejects with a `TypeError`.
    pub fn to_number(&self) -> Option<Number> {
        match self {
            Value::Null => Some(Number::Int(0)),
            Value::Bool(b) => Some(Number::Int(*b as i64)),
            Value::Int(i) => Some(Number::Int(*i)),
            Value::Float(f) => Some(Number::Float(*f)),
            Value::String(s) => Some(numeric_prefix(s).map(|(n, _)| n).unwrap_or(Number::Int(0))),
            Value::Array(_) | Value::EnumCase { .. } | Value::Object { .. } => None,
        }
    }

    /// Integer coercion, used by `%`, bitwise operators and shifts.
    pub fn to_int(&self) -> Option<i64> {
        self.to_number().map(|n| match n {
            Number::Int(i) => i,
            Number::Float(f) => float_to_int(f),
        })
    }

    /// String conversion (`(string) $value`).  `None` for values PHP cannot
    /// convert (objects without `__toString`).
    pub fn to_php_string(&self) -> Option<String> {
        match self {
            Value::Null => Some(String::new()),
            Value::Bool(true) => Some("1".to_string()),
            Value::Bool(false) => Some(String::new()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(format_float(*f)),
            Value::String(s) => Some(s.clone()),
            Value::Array(_) => Some("Array".to_string()),
            Value::EnumCase { .. } | Value::Object { .. } => None,
        }
    }

    /// `var_export`-style rendering used by the string representations of
    /// reflection entities.
    pub fn export(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => {
                let s = format_float(*f);
                if f.is_finite() && !s.contains(['.', 'E', 'N', 'I']) {
                    format!("{}.0", s)
                } else {
                    s
                }
            }
            Value::String(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
            Value::Array(a) if a.is_empty() => "[]".to_string(),
            Value::Array(a) => {
                let items: Vec<String> = a
                    .iter()
                    .map(|(k, v)| match k {
                        ArrayKey::Int(i) => format!("{} => {}", i, v.export()),
                        ArrayKey::String(s) => {
                            format!("{} => {}", Value::String(s.clone()).export(), v.export())
                        }
                    })
                    .collect();
                format!("[{}]", items.join(", "))
            }
            Value::EnumCase { class, case } => format!("\\{}::{}", class, case),
            Value::Object { class, .. } => format!("\\{}::__set_state(array())", class),
        }
    }

    /// `===`
    pub fn identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b.iter())
                        .all(|((ka, va), (kb, vb))| ka == kb && va.identical(vb))
            }
            (Value::Float(a), Value::Float(b)) => a == b,
            _ => self == other,
        }
    }

    /// `==`, following the PHP 8 comparison table.
    pub fn loose_eq(&self, other: &Value) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }

    /// `<=>`.  `None` when the operands are uncomparable (e.g. NAN, or
    /// arrays with different keys).
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        use Value::*;
        match (self, other) {
            (Null, Null) => Some(Ordering::Equal),
            (Bool(_) | Null, _) | (_, Bool(_) | Null) => {
                // null <=> string compares "" with the string.
                match (self, other) {
                    (Null, String(s)) => Some("".cmp(s.as_str())),
                    (String(s), Null) => Some(s.as_str().cmp("")),
                    _ => Some(self.to_bool().cmp(&other.to_bool())),
                }
            }
            (String(a), String(b)) => match (numeric_string(a), numeric_string(b)) {
                (Some(x), Some(y)) => compare_numbers(x, y),
                _ => Some(a.as_bytes().cmp(b.as_bytes())),
            },
            (Int(_) | Float(_), String(s)) => match numeric_string(s) {
                Some(n) => compare_numbers(self.to_number()?, n),
                None => Some(self.to_php_string()?.as_bytes().cmp(s.as_bytes())),
            },
            (String(s), Int(_) | Float(_)) => match numeric_string(s) {
                Some(n) => compare_numbers(n, other.to_number()?),
                None => Some(s.as_bytes().cmp(other.to_php_string()?.as_bytes())),
            },
            (Int(_) | Float(_), Int(_) | Float(_)) => {
                compare_numbers(self.to_number()?, other.to_number()?)
            }
            (Array(a), Array(b)) => {
                if a.len() != b.len() {
                    return Some(a.len().cmp(&b.len()));
                }
                for (key, va) in a.iter() {
                    let vb = b.get(key)?;
                    match va.compare(vb)? {
                        Ordering::Equal => continue,
                        unequal => return Some(unequal),
                    }
                }
                Some(Ordering::Equal)
            }
            (Array(_), _) => Some(Ordering::Greater),
            (_, Array(_)) => Some(Ordering::Less),
            (EnumCase { .. } | Object { .. }, _) | (_, EnumCase { .. } | Object { .. }) => {
                (self == other).then_some(Ordering::Equal)
            }
        }
    }
}

fn compare_numbers(a: Number, b: Number) -> Option<Ordering> {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => Some(x.cmp(&y)),
        _ => a.as_f64().partial_cmp(&b.as_f64()),
    }
}

/// Convert a float to int the way PHP 8 does: truncation, with
/// out-of-range and non-finite values becoming 0.
pub fn float_to_int(f: f64) -> i64 {
    if !f.is_finite() || f >= 9.223_372_036_854_776e18 || f < -9.223_372_036_854_776e18 {
        0
    } else {
        f.trunc() as i64
    }
}

/// The value of a fully numeric string (surrounding whitespace allowed).
pub fn numeric_string(s: &str) -> Option<Number> {
    match numeric_prefix(s) {
        Some((n, rest)) if rest.trim().is_empty() => Some(n),
        _ => None,
    }
}

/// Parse the leading numeric part of `s`, returning the rest.
fn numeric_prefix(s: &str) -> Option<(Number, &str)> {
    let trimmed = s.trim_start_matches([' ', '\t', '\n', '\r', '\x0b', '\x0c']);
    let bytes = trimmed.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let digits_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut is_float = false;
    if bytes.get(end) == Some(&b'.') {
        let mut frac = end + 1;
        while bytes.get(frac).is_some_and(u8::is_ascii_digit) {
            frac += 1;
        }
        if end > digits_start || frac > end + 1 {
            end = frac;
            is_float = true;
        }
    }
    if end == digits_start {
        return None;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_digits = exp;
        while bytes.get(exp).is_some_and(u8::is_ascii_digit) {
            exp += 1;
        }
        if exp > exp_digits {
            end = exp;
            is_float = true;
        }
    }

    let text = &trimmed[..end];
    let rest = &trimmed[end..];
    if !is_float && let Ok(i) = text.parse::<i64>() {
        return Some((Number::Int(i), rest));
    }
    text.parse::<f64>().ok().map(|f| (Number::Float(f), rest))
}

/// Render a float like PHP's `echo` (precision 17, shortest round-trip).
pub fn format_float(f: f64) -> String {
    if f.is_nan() {
        return "NAN".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "INF" } else { "-INF" }.to_string();
    }
    if f == 0.0 {
        return if f.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let exponent = f.abs().log10().floor() as i32;
    if (-4..15).contains(&exponent) {
        return format!("{}", f);
    }

    // Scientific: 1.0E+25, 1.5E-7
    let sci = format!("{:e}", f);
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let mantissa = if mantissa.contains('.') {
        mantissa.to_string()
    } else {
        format!("{}.0", mantissa)
    };
    let exp = exp.parse::<i32>().unwrap_or(0);
    format!("{}E{}{}", mantissa, if exp < 0 { '-' } else { '+' }, exp.abs())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.export())
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(array) => {
                let mut map = serializer.serialize_map(Some(array.len()))?;
                for (key, value) in array.iter() {
                    map.serialize_entry(&key.to_string(), value)?;
                }
                map.end()
            }
            Value::EnumCase { class, case } => {
                serializer.serialize_str(&format!("{}::{}", class, case))
            }
            Value::Object { class, id } => {
                serializer.serialize_str(&format!("object({})#{}", class, id))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_formatting_matches_php() {
        assert_eq!(format_float(1.5), "1.5");
        assert_eq!(format_float(3.0), "3");
        assert_eq!(format_float(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_float(1e15), "1.0E+15");
        assert_eq!(format_float(1e14), "100000000000000");
        assert_eq!(format_float(1.5e-7), "1.5E-7");
        assert_eq!(format_float(-2.5e20), "-2.5E+20");
        assert_eq!(format_float(f64::INFINITY), "INF");
    }

    #[test]
    fn numeric_strings() {
        assert_eq!(numeric_string("42"), Some(Number::Int(42)));
        assert_eq!(numeric_string(" 4.5 "), Some(Number::Float(4.5)));
        assert_eq!(numeric_string("1e3"), Some(Number::Float(1000.0)));
        assert_eq!(numeric_string("12abc"), None);
        assert_eq!(Value::String("12abc".into()).to_number(), Some(Number::Int(12)));
        assert_eq!(Value::String("abc".into()).to_number(), Some(Number::Int(0)));
    }

    #[test]
    fn loose_comparison_follows_php8() {
        let s = |v: &str| Value::String(v.to_string());
        assert!(Value::Int(0).loose_eq(&s("0")));
        assert!(!Value::Int(0).loose_eq(&s("foo")));
        assert!(s("1e3").loose_eq(&s("1000")));
        assert!(Value::Null.loose_eq(&Value::Bool(false)));
        assert!(Value::Null.loose_eq(&s("")));
        assert!(!Value::Int(1).identical(&Value::Float(1.0)));
        assert_eq!(Value::Int(2).compare(&Value::Float(1.5)), Some(Ordering::Greater));
    }

    #[test]
    fn arrays_keep_insertion_order() {
        let mut array = PhpArray::new();
        array.insert(ArrayKey::String("b".into()), Value::Int(1));
        array.insert(ArrayKey::Int(5), Value::Int(2));
        array.push(Value::Int(3));
        array.insert(ArrayKey::String("b".into()), Value::Int(4));

        let keys: Vec<String> = array.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, vec!["b", "5", "6"]);
        assert_eq!(array.get(&ArrayKey::String("b".into())), Some(&Value::Int(4)));
        assert!(!array.is_list());
        assert_eq!(
            serde_json::to_string(&Value::Array(array)).unwrap(),
            r#"{"b":4,"5":2,"6":3}"#
        );
    }

    #[test]
    fn export_rendering() {
        assert_eq!(Value::Null.export(), "NULL");
        assert_eq!(Value::String("it's".into()).export(), r"'it\'s'");
        assert_eq!(Value::Float(2.0).export(), "2.0");
        let list: PhpArray = vec![Value::Int(1), Value::Bool(true)].into_iter().collect();
        assert_eq!(Value::Array(list).export(), "[0 => 1, 1 => true]");
    }
}
