/// Constant-expression lowering.
///
/// Default values, property initializers, and constant declarations are
/// lowered into the small [`Expr`] grammar the evaluator understands.
/// Anything outside that grammar (calls, `new`, variables, closures) is
/// kept as [`Expr::Unsupported`] together with its source text, so that
/// the evaluator can report it and `__toString` can still print it.
use mago_span::HasSpan;
use mago_syntax::ast::MagicConstant as SyntaxMagic;
use mago_syntax::ast::*;

use crate::types::MagicConstant;
use crate::types::*;

use super::Lowering;

impl<'a> Lowering<'a> {
    pub(crate) fn lower_expression(&self, expr: &Expression) -> Expr {
        match expr {
            Expression::Parenthesized(paren) => self.lower_expression(paren.expression),
            Expression::Literal(literal) => self.lower_literal(literal, expr),
            Expression::Array(array) => Expr::Array(
                array
                    .elements
                    .iter()
                    .filter_map(|el| self.lower_array_element(el))
                    .collect(),
            ),
            Expression::LegacyArray(array) => Expr::Array(
                array
                    .elements
                    .iter()
                    .filter_map(|el| self.lower_array_element(el))
                    .collect(),
            ),
            Expression::UnaryPrefix(unary) => {
                let op = match &unary.operator {
                    UnaryPrefixOperator::Plus(_) => UnaryOp::Plus,
                    UnaryPrefixOperator::Negation(_) => UnaryOp::Minus,
                    UnaryPrefixOperator::Not(_) => UnaryOp::Not,
                    UnaryPrefixOperator::BitwiseNot(_) => UnaryOp::BitNot,
                    _ => return self.unsupported("unary operator", expr),
                };
                Expr::Unary(op, Box::new(self.lower_expression(unary.operand)))
            }
            Expression::Binary(binary) => {
                let Some(op) = binary_op(&binary.operator) else {
                    return self.unsupported("binary operator", expr);
                };
                Expr::Binary(
                    op,
                    Box::new(self.lower_expression(binary.lhs)),
                    Box::new(self.lower_expression(binary.rhs)),
                )
            }
            Expression::Conditional(cond) => Expr::Ternary(
                Box::new(self.lower_expression(cond.condition)),
                cond.then.map(|then| Box::new(self.lower_expression(then))),
                Box::new(self.lower_expression(cond.r#else)),
            ),
            Expression::Access(Access::ClassConstant(access)) => {
                let class = match access.class {
                    Expression::Identifier(ident) => ident.value().to_string(),
                    Expression::Self_(_) => "self".to_string(),
                    Expression::Static(_) => "static".to_string(),
                    Expression::Parent(_) => "parent".to_string(),
                    _ => return self.unsupported("dynamic class reference", expr),
                };
                let name = match &access.constant {
                    ClassLikeConstantSelector::Identifier(ident) => ident.value.to_string(),
                    _ => return self.unsupported("dynamic constant name", expr),
                };
                if name.eq_ignore_ascii_case("class") {
                    Expr::ClassName(class)
                } else {
                    Expr::ClassConstant { class, name }
                }
            }
            Expression::ConstantAccess(access) => constant_name(access.name.value()),
            Expression::Identifier(ident) => constant_name(ident.value()),
            Expression::MagicConstant(magic) => {
                let magic = match magic {
                    SyntaxMagic::Line(ident) => {
                        MagicConstant::Line(self.lines.line_of(ident.span().start.offset))
                    }
                    SyntaxMagic::File(_) => MagicConstant::File,
                    SyntaxMagic::Directory(_) => MagicConstant::Dir,
                    SyntaxMagic::Class(_) => MagicConstant::Class,
                    SyntaxMagic::Namespace(_) => MagicConstant::Namespace,
                    SyntaxMagic::Function(_) => MagicConstant::Function,
                    SyntaxMagic::Method(_) => MagicConstant::Method,
                    SyntaxMagic::Trait(_) => MagicConstant::Trait,
                    SyntaxMagic::Property(_) => {
                        return self.unsupported("magic constant", expr);
                    }
                };
                Expr::Magic(magic)
            }
            Expression::CompositeString(_) => self.unsupported("interpolated string", expr),
            Expression::Call(_) => self.unsupported("call", expr),
            Expression::Instantiation(_) => self.unsupported("new", expr),
            Expression::Variable(_) => self.unsupported("variable", expr),
            Expression::Closure(_) | Expression::ArrowFunction(_) => {
                self.unsupported("closure", expr)
            }
            _ => self.unsupported("expression", expr),
        }
    }

    fn lower_literal(&self, literal: &Literal, expr: &Expression) -> Expr {
        match literal {
            Literal::True(_) => Expr::Bool(true),
            Literal::False(_) => Expr::Bool(false),
            Literal::Null(_) => Expr::Null,
            Literal::Float(float) => Expr::Float(float.value.0),
            Literal::Integer(int) => match int.value.and_then(|v| i64::try_from(v).ok()) {
                Some(value) => Expr::Int(value),
                None => parse_int_literal(int.raw),
            },
            Literal::String(string) => match decode_string_literal(string.raw) {
                Some(value) => Expr::String(value),
                None => self.unsupported("string literal", expr),
            },
        }
    }

    fn lower_array_element(&self, element: &ArrayElement) -> Option<ArrayItem> {
        match element {
            ArrayElement::KeyValue(kv) => Some(ArrayItem::KeyValue(
                self.lower_expression(kv.key),
                self.lower_expression(kv.value),
            )),
            ArrayElement::Value(v) => Some(ArrayItem::Value(self.lower_expression(v.value))),
            ArrayElement::Variadic(v) => Some(ArrayItem::Spread(self.lower_expression(v.value))),
            ArrayElement::Missing(_) => None,
        }
    }

    fn unsupported(&self, kind: &'static str, expr: &Expression) -> Expr {
        Expr::Unsupported {
            kind,
            source: self.source_of(expr).trim().to_string(),
        }
    }
}

/// `true`, `false`, and `null` may be written as (fully qualified) names.
fn constant_name(name: &str) -> Expr {
    let bare = name.strip_prefix('\\').unwrap_or(name);
    if bare.eq_ignore_ascii_case("true") {
        Expr::Bool(true)
    } else if bare.eq_ignore_ascii_case("false") {
        Expr::Bool(false)
    } else if bare.eq_ignore_ascii_case("null") {
        Expr::Null
    } else {
        Expr::Constant(name.to_string())
    }
}

fn binary_op(op: &BinaryOperator) -> Option<BinaryOp> {
    let op = match op {
        BinaryOperator::Addition(_) => BinaryOp::Add,
        BinaryOperator::Subtraction(_) => BinaryOp::Sub,
        BinaryOperator::Multiplication(_) => BinaryOp::Mul,
        BinaryOperator::Division(_) => BinaryOp::Div,
        BinaryOperator::Modulo(_) => BinaryOp::Mod,
        BinaryOperator::Exponentiation(_) => BinaryOp::Pow,
        BinaryOperator::StringConcat(_) => BinaryOp::Concat,
        BinaryOperator::BitwiseAnd(_) => BinaryOp::BitAnd,
        BinaryOperator::BitwiseOr(_) => BinaryOp::BitOr,
        BinaryOperator::BitwiseXor(_) => BinaryOp::BitXor,
        BinaryOperator::LeftShift(_) => BinaryOp::ShiftLeft,
        BinaryOperator::RightShift(_) => BinaryOp::ShiftRight,
        BinaryOperator::And(_) | BinaryOperator::LowAnd(_) => BinaryOp::And,
        BinaryOperator::Or(_) | BinaryOperator::LowOr(_) => BinaryOp::Or,
        BinaryOperator::LowXor(_) => BinaryOp::Xor,
        BinaryOperator::Equal(_) => BinaryOp::Equal,
        BinaryOperator::NotEqual(_) | BinaryOperator::AngledNotEqual(_) => BinaryOp::NotEqual,
        BinaryOperator::Identical(_) => BinaryOp::Identical,
        BinaryOperator::NotIdentical(_) => BinaryOp::NotIdentical,
        BinaryOperator::LessThan(_) => BinaryOp::Less,
        BinaryOperator::LessThanOrEqual(_) => BinaryOp::LessOrEqual,
        BinaryOperator::GreaterThan(_) => BinaryOp::Greater,
        BinaryOperator::GreaterThanOrEqual(_) => BinaryOp::GreaterOrEqual,
        BinaryOperator::Spaceship(_) => BinaryOp::Spaceship,
        BinaryOperator::NullCoalesce(_) => BinaryOp::Coalesce,
        BinaryOperator::Instanceof(_) => return None,
    };
    Some(op)
}

/// Value of an integer literal that does not fit `i64`.  PHP turns those
/// into floats: decimal literals are converted as a whole, the other
/// radixes digit by digit.
pub(crate) fn parse_int_literal(raw: &str) -> Expr {
    let cleaned: String = raw.trim().chars().filter(|c| *c != '_').collect();
    let lower = cleaned.to_ascii_lowercase();

    let (digits, radix) = if let Some(hex) = lower.strip_prefix("0x") {
        (hex, 16)
    } else if let Some(bin) = lower.strip_prefix("0b") {
        (bin, 2)
    } else if let Some(oct) = lower.strip_prefix("0o") {
        (oct, 8)
    } else if lower.len() > 1 && lower.starts_with('0') {
        (&lower[1..], 8)
    } else {
        (lower.as_str(), 10)
    };

    let unsupported = || Expr::Unsupported {
        kind: "integer literal",
        source: raw.to_string(),
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return unsupported();
    }
    if let Ok(value) = i64::from_str_radix(digits, radix) {
        return Expr::Int(value);
    }
    if radix == 10 {
        return digits.parse::<f64>().map(Expr::Float).unwrap_or_else(|_| unsupported());
    }
    let value = digits
        .chars()
        .filter_map(|c| c.to_digit(radix))
        .fold(0f64, |acc, d| acc * radix as f64 + d as f64);
    Expr::Float(value)
}

/// Decode a single- or double-quoted string literal (optionally `b`
/// prefixed) from its source text.  Byte escapes that do not form UTF-8
/// are replaced with U+FFFD.
pub(crate) fn decode_string_literal(raw: &str) -> Option<String> {
    let raw = raw.strip_prefix(['b', 'B']).unwrap_or(raw);
    let quote = raw.chars().next().filter(|c| *c == '\'' || *c == '"')?;
    let inner = raw.strip_prefix(quote)?.strip_suffix(quote)?;
    let bytes = if quote == '\'' {
        unescape_single_quoted(inner.as_bytes())
    } else {
        unescape_double_quoted(inner.as_bytes())
    };
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

fn unescape_single_quoted(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match (bytes[i], bytes.get(i + 1)) {
            (b'\\', Some(&next @ (b'\\' | b'\''))) => {
                out.push(next);
                i += 2;
            }
            (b, _) => {
                out.push(b);
                i += 1;
            }
        }
    }
    out
}

fn unescape_double_quoted(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let (b'\\', Some(&next)) = (bytes[i], bytes.get(i + 1)) else {
            out.push(bytes[i]);
            i += 1;
            continue;
        };
        i += 2;
        match next {
            b'n' => out.push(b'\n'),
            b't' => out.push(b'\t'),
            b'r' => out.push(b'\r'),
            b'v' => out.push(0x0B),
            b'e' => out.push(0x1B),
            b'f' => out.push(0x0C),
            b'\\' | b'$' | b'"' => out.push(next),
            b'0'..=b'7' => {
                // Up to three octal digits; values above 0o377 wrap to a byte.
                let start = i - 1;
                let len = run_len(&bytes[start..], 3, |b| (b'0'..=b'7').contains(&b));
                out.push(digits_value(&bytes[start..start + len], 8) as u8);
                i = start + len;
            }
            b'x' => {
                let len = run_len(&bytes[i..], 2, |b| b.is_ascii_hexdigit());
                if len == 0 {
                    out.extend_from_slice(b"\\x");
                } else {
                    out.push(digits_value(&bytes[i..i + len], 16) as u8);
                    i += len;
                }
            }
            b'u' if bytes.get(i) == Some(&b'{') => {
                let digits = &bytes[i + 1..];
                let len = run_len(digits, usize::MAX, |b| b.is_ascii_hexdigit());
                let codepoint = (len > 0 && digits.get(len) == Some(&b'}'))
                    .then(|| char::from_u32(digits_value(&digits[..len], 16)))
                    .flatten();
                match codepoint {
                    Some(c) => {
                        let mut buf = [0; 4];
                        out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                        i += len + 2;
                    }
                    None => out.extend_from_slice(b"\\u"),
                }
            }
            other => {
                out.push(b'\\');
                out.push(other);
            }
        }
    }
    out
}

fn run_len(bytes: &[u8], max: usize, accept: impl Fn(u8) -> bool) -> usize {
    bytes.iter().take(max).take_while(|b| accept(**b)).count()
}

/// Saturates instead of overflowing; callers reject out-of-range values.
fn digits_value(digits: &[u8], radix: u32) -> u32 {
    digits.iter().fold(0u32, |acc, b| {
        let digit = (*b as char).to_digit(radix).unwrap_or(0);
        acc.saturating_mul(radix).saturating_add(digit)
    })
}
