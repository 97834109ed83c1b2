/// Standalone function, `const`, and `define()` constant lowering.
///
/// Functions declared inside `if` guards and block statements (the
/// common `if (!function_exists('x')) { function x() {} }` pattern) are
/// collected as well; the walk over those bodies lives in
/// [`super::program`].
use mago_syntax::ast::*;

use crate::types::*;

use super::Lowering;
use super::generators::body_yields;

impl<'a> Lowering<'a> {
    pub(crate) fn lower_function(&self, func: &Function) -> FunctionLikeNode {
        FunctionLikeNode {
            name: func.name.value.to_string(),
            parameters: self.lower_parameters(&func.parameter_list),
            return_type: func
                .return_type_hint
                .as_ref()
                .map(|rth| Self::lower_hint(&rth.hint)),
            returns_reference: func.ampersand.is_some(),
            modifiers: MemberModifiers::default(),
            has_body: true,
            is_generator: body_yields(&func.body),
            static_variables: self.lower_static_variables(func.body.statements.iter()),
            doc_comment: self.doc_comment_for(func),
            lines: self.line_span(func),
        }
    }

    /// Collect `static $x = …;` declarations from the top level of a
    /// function body.
    pub(crate) fn lower_static_variables<'s>(
        &self,
        statements: impl Iterator<Item = &'s Statement<'s>>,
    ) -> Vec<StaticVariable> {
        let mut vars = Vec::new();
        for statement in statements {
            let Statement::Static(stmt) = statement else {
                continue;
            };
            for item in stmt.items.iter() {
                let (raw_name, value) = match item {
                    StaticItem::Abstract(abs) => (abs.variable.name, None),
                    StaticItem::Concrete(concrete) => (
                        concrete.variable.name,
                        Some(self.lower_expression(concrete.value)),
                    ),
                };
                vars.push(StaticVariable {
                    name: raw_name.strip_prefix('$').unwrap_or(raw_name).to_string(),
                    value,
                });
            }
        }
        vars
    }

    /// Lower a `const A = 1, B = 2;` statement.
    pub(crate) fn lower_constant_statement(&self, decl: &Constant) -> Vec<ConstantNode> {
        let doc_comment = self.doc_comment_for(decl);
        let lines = self.line_span(decl);
        decl.items
            .iter()
            .map(|item| ConstantNode {
                name: item.name.value.to_string(),
                value: self.lower_expression(item.value),
                from_define: false,
                doc_comment: doc_comment.clone(),
                lines,
            })
            .collect()
    }

    /// Lower a `define('NAME', value)` call.  Returns `None` when the
    /// expression is anything else, or when the name is not a literal.
    ///
    /// The name of a `define()` constant is always fully qualified, so it
    /// is stored without its namespace prefix being applied later.
    pub(crate) fn lower_define(&self, expr: &Expression) -> Option<ConstantNode> {
        let Expression::Call(Call::Function(func_call)) = expr else {
            return None;
        };
        let func_name = match func_call.function {
            Expression::Identifier(ident) => ident.value(),
            _ => return None,
        };
        if !func_name
            .trim_start_matches('\\')
            .eq_ignore_ascii_case("define")
        {
            return None;
        }

        let mut args = func_call.argument_list.arguments.iter().map(|arg| match arg {
            Argument::Positional(pos) => pos.value,
            Argument::Named(named) => named.value,
        });
        let name_expr = args.next()?;
        let value_expr = args.next()?;

        let Expression::Literal(Literal::String(lit)) = name_expr else {
            return None;
        };
        let name = lit.value?.trim_start_matches('\\');
        if name.is_empty() {
            return None;
        }

        Some(ConstantNode {
            name: name.to_string(),
            value: self.lower_expression(value_expr),
            from_define: true,
            doc_comment: self.doc_comment_for(expr),
            lines: self.line_span(expr),
        })
    }
}
