/// Top-level statement dispatch.
///
/// Splits a program into namespace blocks and routes each declaration
/// statement to the matching lowering function.  Both the braced
/// (`namespace Foo { … }`) and the statement (`namespace Foo;`) forms are
/// handled by the parser's `statements()` accessor.  Code outside any
/// namespace forms an unnamed block, which is dropped when it declares
/// nothing and the file has named namespaces.
use mago_syntax::ast::*;

use crate::types::*;

use super::Lowering;

impl NamespaceNode {
    fn is_empty(&self) -> bool {
        self.imports.is_empty()
            && self.classes.is_empty()
            && self.functions.is_empty()
            && self.constants.is_empty()
    }
}

impl<'a> Lowering<'a> {
    pub(crate) fn lower_program<'s>(
        &self,
        statements: impl Iterator<Item = &'s Statement<'s>>,
    ) -> FileAst {
        let mut file = FileAst::default();
        let mut global = NamespaceNode::default();

        for statement in statements {
            match statement {
                Statement::Namespace(ns) => {
                    let mut node = NamespaceNode {
                        name: ns
                            .name
                            .as_ref()
                            .map(|ident| ident.value().trim_start_matches('\\').to_string())
                            .unwrap_or_default(),
                        doc_comment: self.doc_comment_for(ns),
                        lines: self.line_span(ns),
                        ..NamespaceNode::default()
                    };
                    for inner in ns.statements().iter() {
                        self.lower_statement(inner, &mut node, &mut file);
                    }
                    file.namespaces.push(node);
                }
                other => self.lower_statement(other, &mut global, &mut file),
            }
        }

        if file.namespaces.is_empty() || !global.is_empty() {
            global.lines = LineSpan {
                start: 1,
                end: self.lines.line_count(self.content).max(1),
            };
            file.namespaces.insert(0, global);
        }
        file
    }

    fn lower_statement<'s>(
        &self,
        statement: &'s Statement<'s>,
        ns: &mut NamespaceNode,
        file: &mut FileAst,
    ) {
        match statement {
            Statement::Use(use_stmt) => Self::lower_use_items(&use_stmt.items, &mut ns.imports),
            Statement::Class(_)
            | Statement::Interface(_)
            | Statement::Trait(_)
            | Statement::Enum(_) => {
                if let Some(class) = self.lower_class_like(statement) {
                    ns.classes.push(class);
                }
            }
            Statement::Function(func) => ns.functions.push(self.lower_function(func)),
            Statement::Constant(decl) => ns.constants.extend(self.lower_constant_statement(decl)),
            Statement::Expression(expr_stmt) => {
                if let Some(constant) = self.lower_define(expr_stmt.expression) {
                    ns.constants.push(constant);
                }
            }
            Statement::Declare(declare) => {
                let text: String = self
                    .source_of(declare)
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .collect();
                if text.to_ascii_lowercase().contains("strict_types=1") {
                    file.strict_types = true;
                }
            }
            // Conditional declarations:
            //   if (! function_exists('session')) {
            //       function session(...) { ... }
            //   }
            Statement::Block(block) => {
                for inner in block.statements.iter() {
                    self.lower_statement(inner, ns, file);
                }
            }
            Statement::If(if_stmt) => self.lower_if_body(&if_stmt.body, ns, file),
            _ => {}
        }
    }

    /// Handles both brace-delimited and colon-delimited `if` bodies,
    /// including `elseif` and `else` branches.
    fn lower_if_body<'s>(&self, body: &'s IfBody<'s>, ns: &mut NamespaceNode, file: &mut FileAst) {
        match body {
            IfBody::Statement(body) => {
                self.lower_statement(body.statement, ns, file);
                for else_if in body.else_if_clauses.iter() {
                    self.lower_statement(else_if.statement, ns, file);
                }
                if let Some(else_clause) = &body.else_clause {
                    self.lower_statement(else_clause.statement, ns, file);
                }
            }
            IfBody::ColonDelimited(body) => {
                let branches = body
                    .statements
                    .iter()
                    .chain(body.else_if_clauses.iter().flat_map(|c| c.statements.iter()))
                    .chain(body.else_clause.iter().flat_map(|c| c.statements.iter()));
                for inner in branches {
                    self.lower_statement(inner, ns, file);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::parser::parse_source;

    #[test]
    fn multiple_braced_namespaces() {
        let file = parse_source(
            &PathBuf::from("/virtual/multi.php"),
            concat!(
                "<?php\n",
                "declare(strict_types=1);\n",
                "namespace First {\n",
                "    class A {}\n",
                "}\n",
                "namespace Second {\n",
                "    use First\\A;\n",
                "    class B extends A {}\n",
                "}\n",
                "namespace {\n",
                "    function root() {}\n",
                "}\n",
            ),
        )
        .unwrap();

        assert!(file.strict_types);
        let names: Vec<_> = file.namespaces.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["First", "Second", ""]);
        assert_eq!(file.namespaces[1].imports[0].name, "First\\A");
        assert_eq!(file.namespaces[2].functions[0].name, "root");
        assert_eq!(file.namespaces[0].lines.start, 3);
    }

    #[test]
    fn statement_form_namespace_owns_following_declarations() {
        let file = parse_source(
            &PathBuf::from("/virtual/single.php"),
            "<?php\nnamespace App\\Models;\n\nclass User {}\ninterface Entity {}\n",
        )
        .unwrap();

        assert_eq!(file.namespaces.len(), 1);
        assert_eq!(file.namespaces[0].name, "App\\Models");
        assert_eq!(file.namespaces[0].classes.len(), 2);
        assert!(!file.strict_types);
        assert_eq!(file.line_count, 5);
    }
}
