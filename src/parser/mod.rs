/// PHP parsing and lowering into the owned declaration tree.
///
/// This module contains the logic for parsing PHP source text using the
/// mago_syntax parser and lowering the arena-allocated AST into the owned
/// [`FileAst`] that the source cache stores.  Lowering happens once per
/// parse, while the arena is still alive; afterwards nothing in the crate
/// touches `mago_syntax` types.
///
/// Sub-modules:
/// - [`program`]: Namespace blocks, `declare`, and top-level dispatch
/// - [`classes`]: Class, interface, trait, and enum extraction
/// - [`functions`]: Standalone functions, `const`, and `define()` constants
/// - [`use_statements`]: `use` import extraction
/// - [`expressions`]: Constant-expression lowering
/// - [`lines`]: Byte offset to line number conversion
mod classes;
mod expressions;
mod functions;
mod generators;
pub(crate) mod lines;
mod program;
mod use_statements;

use std::panic;
use std::path::Path;

use mago_span::HasSpan;
use mago_syntax::ast::*;

use crate::error::{ReflectionError, Result};
use crate::types::*;

use lines::LineIndex;

/// Context shared by every lowering function during one parse.
///
/// Bundles the program's trivia (comments/whitespace), the raw source text
/// and a line index so that extraction functions can look up the
/// `/** ... */` comment preceding any AST node, slice the source text of
/// an expression, and convert spans to line numbers.
pub(crate) struct Lowering<'a> {
    pub trivias: &'a [Trivia<'a>],
    pub content: &'a str,
    pub lines: &'a LineIndex,
}

/// Parse PHP source text and lower it into an owned [`FileAst`].
///
/// The mago-syntax parser contains `unreachable!()` and `.expect()` calls
/// that can panic on malformed input (e.g. unterminated heredocs), so the
/// parse runs under `catch_unwind` and a panic is reported as a syntax
/// error for this file only.
pub fn parse_source(path: &Path, content: &str) -> Result<FileAst> {
    let result = panic::catch_unwind(panic::AssertUnwindSafe(|| parse_source_inner(path, content)));

    match result {
        Ok(parsed) => parsed,
        Err(_) => {
            tracing::error!("parser panicked while parsing {}", path.display());
            Err(ReflectionError::Syntax {
                path: path.to_path_buf(),
                line: 0,
                message: "the parser aborted on this file".to_string(),
            })
        }
    }
}

fn parse_source_inner(path: &Path, content: &str) -> Result<FileAst> {
    let arena = bumpalo::Bump::new();
    let file_name = path.to_string_lossy();
    let file_id = mago_database::file::FileId::new(file_name.as_ref());
    let program = mago_syntax::parser::parse_file_content(&arena, file_id, content);

    let lines = LineIndex::new(content);

    if let Some(error) = program.errors.iter().next() {
        return Err(ReflectionError::Syntax {
            path: path.to_path_buf(),
            line: lines.line_of(error.span().start.offset),
            message: error.to_string(),
        });
    }

    let ctx = Lowering {
        trivias: program.trivia.as_slice(),
        content,
        lines: &lines,
    };

    let mut file = ctx.lower_program(program.statements.iter());
    file.path = path.to_path_buf();
    file.line_count = lines.line_count(content);
    Ok(file)
}

impl<'a> Lowering<'a> {
    /// Convert a node's span to a 1-based line range.
    pub(crate) fn line_span(&self, node: &impl HasSpan) -> LineSpan {
        let span = node.span();
        LineSpan {
            start: self.lines.line_of(span.start.offset),
            end: self.lines.line_of(span.end.offset.saturating_sub(1).max(span.start.offset)),
        }
    }

    /// The exact source text covered by a node.
    pub(crate) fn source_of(&self, node: &impl HasSpan) -> &'a str {
        let span = node.span();
        self.content
            .get(span.start.offset as usize..span.end.offset as usize)
            .unwrap_or("")
    }

    /// Find the `/** ... */` doc comment directly preceding a node.
    ///
    /// Walks the trivia backwards from the node start.  Whitespace and
    /// regular comments are skipped; any other source text in between
    /// means the doc comment belongs to something else.
    pub(crate) fn doc_comment_for(&self, node: &impl HasSpan) -> Option<String> {
        let node_start = node.span().start.offset;
        let candidate_idx = self
            .trivias
            .partition_point(|t| t.span.start.offset < node_start);
        if candidate_idx == 0 {
            return None;
        }

        let content_bytes = self.content.as_bytes();
        let mut covered_from = node_start;

        for i in (0..candidate_idx).rev() {
            let t = &self.trivias[i];
            let t_end = t.span.end.offset;

            let gap = content_bytes
                .get(t_end as usize..covered_from as usize)
                .unwrap_or(&[]);
            if !gap.iter().all(u8::is_ascii_whitespace) {
                return None;
            }

            match t.kind {
                TriviaKind::DocBlockComment => return Some(t.value.to_string()),
                TriviaKind::WhiteSpace
                | TriviaKind::SingleLineComment
                | TriviaKind::MultiLineComment
                | TriviaKind::HashComment => {
                    covered_from = t.span.start.offset;
                }
            }
        }

        None
    }

    /// Lower a type hint.
    ///
    /// Unions and intersections are flattened, and `null` inside a union is
    /// kept as a named member so that `int|null` and `?int` stay
    /// distinguishable for string rendering.
    pub(crate) fn lower_hint(hint: &Hint) -> TypeHint {
        match hint {
            Hint::Identifier(ident) => TypeHint::Named(ident.value().to_string()),
            Hint::Nullable(nullable) => {
                TypeHint::Nullable(Box::new(Self::lower_hint(nullable.hint)))
            }
            Hint::Union(union) => {
                let mut members = Vec::new();
                for side in [union.left, union.right] {
                    match Self::lower_hint(side) {
                        TypeHint::Union(inner) => members.extend(inner),
                        other => members.push(other),
                    }
                }
                TypeHint::Union(members)
            }
            Hint::Intersection(intersection) => {
                let mut members = Vec::new();
                for side in [intersection.left, intersection.right] {
                    match Self::lower_hint(side) {
                        TypeHint::Intersection(inner) => members.extend(inner),
                        other => members.push(other),
                    }
                }
                TypeHint::Intersection(members)
            }
            Hint::Void(ident)
            | Hint::Never(ident)
            | Hint::Float(ident)
            | Hint::Bool(ident)
            | Hint::Integer(ident)
            | Hint::String(ident)
            | Hint::Object(ident)
            | Hint::Mixed(ident)
            | Hint::Iterable(ident) => TypeHint::Named(ident.value.to_string()),
            Hint::Null(keyword)
            | Hint::True(keyword)
            | Hint::False(keyword)
            | Hint::Array(keyword)
            | Hint::Callable(keyword)
            | Hint::Static(keyword)
            | Hint::Self_(keyword)
            | Hint::Parent(keyword) => TypeHint::Named(keyword.value.to_string()),
            Hint::Parenthesized(paren) => Self::lower_hint(paren.hint),
        }
    }

    /// Extract visibility from a set of modifiers.
    /// Defaults to `Public` if no visibility modifier is present.
    pub(crate) fn extract_visibility<'m>(
        modifiers: impl Iterator<Item = &'m Modifier<'m>>,
    ) -> Visibility {
        for m in modifiers {
            if m.is_private() {
                return Visibility::Private;
            }
            if m.is_protected() {
                return Visibility::Protected;
            }
            if m.is_public() {
                return Visibility::Public;
            }
        }
        Visibility::Public
    }

    /// Collapse a modifier list into [`MemberModifiers`].
    pub(crate) fn extract_modifiers<'m>(
        modifiers: impl Iterator<Item = &'m Modifier<'m>> + std::clone::Clone,
    ) -> MemberModifiers {
        let visibility = Self::extract_visibility(modifiers.clone());
        let mut result = MemberModifiers {
            visibility,
            ..MemberModifiers::default()
        };
        for m in modifiers {
            match m {
                Modifier::Static(_) => result.is_static = true,
                Modifier::Abstract(_) => result.is_abstract = true,
                Modifier::Final(_) => result.is_final = true,
                Modifier::Readonly(_) => result.is_readonly = true,
                _ => {}
            }
        }
        result
    }

    /// Extract parameter information from a function-like parameter list.
    pub(crate) fn lower_parameters(
        &self,
        parameter_list: &FunctionLikeParameterList,
    ) -> Vec<ParameterNode> {
        parameter_list
            .parameters
            .iter()
            .enumerate()
            .map(|(position, param)| {
                let raw_name = param.variable.name;
                let name = raw_name.strip_prefix('$').unwrap_or(raw_name).to_string();
                let (default, default_source) = match &param.default_value {
                    Some(dv) => (
                        Some(self.lower_expression(dv.value)),
                        Some(self.source_of(dv.value).trim().to_string()),
                    ),
                    None => (None, None),
                };
                let promoted = param
                    .is_promoted_property()
                    .then(|| Self::extract_visibility(param.modifiers.iter()));

                ParameterNode {
                    name,
                    position,
                    type_hint: param.hint.as_ref().map(|h| Self::lower_hint(h)),
                    default,
                    default_source,
                    is_variadic: param.ellipsis.is_some(),
                    is_reference: param.ampersand.is_some(),
                    promoted,
                    is_readonly: param
                        .modifiers
                        .iter()
                        .any(|m| matches!(m, Modifier::Readonly(_))),
                    lines: self.line_span(param),
                }
            })
            .collect()
    }
}
