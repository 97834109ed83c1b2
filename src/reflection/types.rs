//! `ReflectionType` and its PHP string form.

use std::fmt;

use crate::resolution::NamespaceContext;
use crate::types::TypeHint;

/// A single named type.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct NamedType {
    /// Lower-cased for builtins, fully qualified for classes.  `self`,
    /// `parent`, and `static` are kept as written.
    pub name: String,
    pub builtin: bool,
    pub nullable: bool,
}

/// A resolved parameter, property, or return type.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ReflectionType {
    Named(NamedType),
    Union { types: Vec<ReflectionType> },
    Intersection { types: Vec<ReflectionType> },
}

const BUILTINS: &[&str] = &[
    "int", "float", "string", "bool", "array", "object", "mixed", "void", "never", "null",
    "true", "false", "callable", "iterable",
];

fn named(raw: &str, ctx: &NamespaceContext) -> NamedType {
    let bare = raw.trim_start_matches('\\');
    let lower = bare.to_ascii_lowercase();
    if BUILTINS.contains(&lower.as_str()) {
        return NamedType {
            nullable: lower == "null" || lower == "mixed",
            name: lower,
            builtin: true,
        };
    }
    if matches!(lower.as_str(), "self" | "parent" | "static") {
        return NamedType {
            name: lower,
            builtin: false,
            nullable: false,
        };
    }
    NamedType {
        name: ctx.resolve_class(raw),
        builtin: false,
        nullable: false,
    }
}

impl ReflectionType {
    /// Resolve a type hint written in `ctx`.  `implicit_null` is set for
    /// parameters whose default value is `null`.
    pub(crate) fn from_hint(hint: &TypeHint, ctx: &NamespaceContext, implicit_null: bool) -> Self {
        match hint {
            TypeHint::Named(raw) => {
                let mut ty = named(raw, ctx);
                ty.nullable |= implicit_null;
                ReflectionType::Named(ty)
            }
            TypeHint::Nullable(inner) => match Self::from_hint(inner, ctx, true) {
                ReflectionType::Named(ty) => ReflectionType::Named(NamedType {
                    nullable: true,
                    ..ty
                }),
                other => other,
            },
            TypeHint::Union(members) => {
                let is_null = |m: &&TypeHint| matches!(m, TypeHint::Named(n) if n.eq_ignore_ascii_case("null"));
                let has_null = members.iter().any(|m| is_null(&m)) || implicit_null;
                let rest: Vec<&TypeHint> = members.iter().filter(|m| !is_null(m)).collect();

                if let [TypeHint::Named(only)] = rest.as_slice()
                    && has_null
                {
                    let mut ty = named(only, ctx);
                    ty.nullable = true;
                    return ReflectionType::Named(ty);
                }

                let mut types: Vec<ReflectionType> = rest
                    .into_iter()
                    .map(|m| Self::from_hint(m, ctx, false))
                    .collect();
                if has_null {
                    types.push(ReflectionType::Named(NamedType {
                        name: "null".to_string(),
                        builtin: true,
                        nullable: true,
                    }));
                }
                ReflectionType::Union { types }
            }
            TypeHint::Intersection(members) => ReflectionType::Intersection {
                types: members
                    .iter()
                    .map(|m| Self::from_hint(m, ctx, false))
                    .collect(),
            },
        }
    }

    pub fn allows_null(&self) -> bool {
        match self {
            ReflectionType::Named(ty) => ty.nullable,
            ReflectionType::Union { types } => types.iter().any(ReflectionType::allows_null),
            ReflectionType::Intersection { .. } => false,
        }
    }

    /// Only named builtin types are builtin.
    pub fn is_builtin(&self) -> bool {
        matches!(self, ReflectionType::Named(ty) if ty.builtin)
    }

    /// The name of a named type.
    pub fn name(&self) -> Option<&str> {
        match self {
            ReflectionType::Named(ty) => Some(&ty.name),
            _ => None,
        }
    }

    /// Member types of a union or intersection.
    pub fn types(&self) -> &[ReflectionType] {
        match self {
            ReflectionType::Named(_) => &[],
            ReflectionType::Union { types } | ReflectionType::Intersection { types } => types,
        }
    }
}

impl fmt::Display for ReflectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReflectionType::Named(ty) => {
                if ty.nullable && ty.name != "null" && ty.name != "mixed" {
                    f.write_str("?")?;
                }
                f.write_str(&ty.name)
            }
            ReflectionType::Union { types } => {
                for (i, ty) in types.iter().enumerate() {
                    if i > 0 {
                        f.write_str("|")?;
                    }
                    match ty {
                        ReflectionType::Intersection { .. } => write!(f, "({})", ty)?,
                        _ => write!(f, "{}", ty)?,
                    }
                }
                Ok(())
            }
            ReflectionType::Intersection { types } => {
                for (i, ty) in types.iter().enumerate() {
                    if i > 0 {
                        f.write_str("&")?;
                    }
                    write!(f, "{}", ty)?;
                }
                Ok(())
            }
        }
    }
}
