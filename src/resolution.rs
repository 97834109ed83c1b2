/// Namespace-aware name resolution.
///
/// A [`NamespaceContext`] is built once per namespace block and turns a
/// name as written in source into the fully-qualified name PHP would
/// resolve it to.  It handles:
///
///   - Fully-qualified names (`\PDO`, `\Couchbase\Cluster`)
///   - Unqualified names resolved via the import table or current namespace
///   - Qualified names with alias expansion and namespace prefixing
///   - The `namespace\Foo` relative form
///
/// Class names never fall back to the global namespace.  Function and
/// constant names do, so their resolvers return an ordered candidate list
/// instead of a single name.  See
/// <https://www.php.net/manual/en/language.namespaces.fallback.php>.
use crate::composer::is_builtin_type;
use crate::types::{ImportKind, NamespaceNode, UseImport};

/// The resolved name context of one namespace block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceContext {
    /// Current namespace without leading `\`; empty for the global namespace.
    pub namespace: String,
    /// Class imports in declaration order: (alias, FQN).
    pub classes: Vec<(String, String)>,
    pub functions: Vec<(String, String)>,
    pub constants: Vec<(String, String)>,
}

impl NamespaceContext {
    pub fn new(namespace: &str, imports: &[UseImport]) -> Self {
        let mut ctx = Self {
            namespace: namespace.trim_matches('\\').to_string(),
            ..Self::default()
        };
        for import in imports {
            let pair = (import.alias.clone(), import.name.clone());
            match import.kind {
                ImportKind::Class => ctx.classes.push(pair),
                ImportKind::Function => ctx.functions.push(pair),
                ImportKind::Constant => ctx.constants.push(pair),
            }
        }
        ctx
    }

    pub fn from_node(node: &NamespaceNode) -> Self {
        Self::new(&node.name, &node.imports)
    }

    /// Class import aliases are case-insensitive; the last import of an
    /// alias wins.
    fn class_alias(&self, alias: &str) -> Option<&str> {
        self.classes
            .iter()
            .rev()
            .find(|(a, _)| a.eq_ignore_ascii_case(alias))
            .map(|(_, fqn)| fqn.as_str())
    }

    fn prefixed(&self, name: &str) -> String {
        if self.namespace.is_empty() {
            name.to_string()
        } else {
            format!("{}\\{}", self.namespace, name)
        }
    }

    /// Expand `namespace\Foo` and a leading import alias of a qualified
    /// name.  Returns `None` when neither form applies.
    fn expand_qualified(&self, name: &str) -> Option<String> {
        let (first, rest) = name.split_once('\\')?;
        if first.eq_ignore_ascii_case("namespace") {
            return Some(self.prefixed(rest));
        }
        self.class_alias(first)
            .map(|fqn| format!("{}\\{}", fqn, rest))
    }

    /// Resolve a class-like name to its FQN (without leading `\`).
    ///
    /// `self`, `static`, `parent`, and builtin type keywords are returned
    /// unchanged; the caller decides what they mean in context.
    pub fn resolve_class(&self, name: &str) -> String {
        if let Some(stripped) = name.strip_prefix('\\') {
            return stripped.to_string();
        }
        if is_builtin_type(name) {
            return name.to_string();
        }
        if name.contains('\\') {
            return self
                .expand_qualified(name)
                .unwrap_or_else(|| self.prefixed(name));
        }
        if let Some(fqn) = self.class_alias(name) {
            return fqn.to_string();
        }
        self.prefixed(name)
    }

    /// Candidate FQNs for a function name, most specific first.
    pub fn resolve_function(&self, name: &str) -> Vec<String> {
        if let Some(stripped) = name.strip_prefix('\\') {
            return vec![stripped.to_string()];
        }
        if name.contains('\\') {
            return vec![
                self.expand_qualified(name)
                    .unwrap_or_else(|| self.prefixed(name)),
            ];
        }
        if let Some((_, fqn)) = self
            .functions
            .iter()
            .rev()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(name))
        {
            return vec![fqn.clone()];
        }
        self.with_global_fallback(name)
    }

    /// Candidate FQNs for a constant name, most specific first.  Constant
    /// aliases are case-sensitive.
    pub fn resolve_constant(&self, name: &str) -> Vec<String> {
        if let Some(stripped) = name.strip_prefix('\\') {
            return vec![stripped.to_string()];
        }
        if name.contains('\\') {
            return vec![
                self.expand_qualified(name)
                    .unwrap_or_else(|| self.prefixed(name)),
            ];
        }
        if let Some((_, fqn)) = self.constants.iter().rev().find(|(alias, _)| alias == name) {
            return vec![fqn.clone()];
        }
        self.with_global_fallback(name)
    }

    fn with_global_fallback(&self, name: &str) -> Vec<String> {
        if self.namespace.is_empty() {
            vec![name.to_string()]
        } else {
            vec![self.prefixed(name), name.to_string()]
        }
    }

    /// Class import aliases as (alias, FQN) pairs, for
    /// `ReflectionFileNamespace::namespace_aliases`.
    pub fn class_aliases(&self) -> &[(String, String)] {
        &self.classes
    }
}

/// The last segment of a (possibly qualified) name.
pub fn short_name(name: &str) -> &str {
    name.rsplit('\\').next().unwrap_or(name)
}

/// The namespace part of a qualified name (empty for global names).
pub fn namespace_of(name: &str) -> &str {
    let name = name.trim_start_matches('\\');
    match name.rfind('\\') {
        Some(pos) => &name[..pos],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn import(kind: ImportKind, name: &str, alias: &str) -> UseImport {
        UseImport {
            kind,
            name: name.to_string(),
            alias: alias.to_string(),
        }
    }

    fn app_context() -> NamespaceContext {
        NamespaceContext::new(
            "App\\Http",
            &[
                import(ImportKind::Class, "Vendor\\Lib\\Client", "Client"),
                import(ImportKind::Class, "Swagger\\OpenAPI", "OA"),
                import(ImportKind::Function, "Vendor\\Lib\\helper", "helper"),
                import(ImportKind::Constant, "Vendor\\Lib\\LIMIT", "LIMIT"),
            ],
        )
    }

    #[test]
    fn class_names() {
        let ctx = app_context();
        assert_eq!(ctx.resolve_class("\\PDO"), "PDO");
        assert_eq!(ctx.resolve_class("Client"), "Vendor\\Lib\\Client");
        assert_eq!(ctx.resolve_class("client"), "Vendor\\Lib\\Client");
        assert_eq!(ctx.resolve_class("OA\\Endpoint"), "Swagger\\OpenAPI\\Endpoint");
        assert_eq!(ctx.resolve_class("Request"), "App\\Http\\Request");
        assert_eq!(ctx.resolve_class("Sub\\Thing"), "App\\Http\\Sub\\Thing");
        assert_eq!(ctx.resolve_class("namespace\\Local"), "App\\Http\\Local");
        assert_eq!(ctx.resolve_class("self"), "self");
        assert_eq!(ctx.resolve_class("int"), "int");
    }

    #[test]
    fn global_namespace_classes_are_not_prefixed() {
        let ctx = NamespaceContext::default();
        assert_eq!(ctx.resolve_class("Exception"), "Exception");
        assert_eq!(ctx.resolve_function("strlen"), vec!["strlen"]);
    }

    #[test]
    fn functions_fall_back_to_global() {
        let ctx = app_context();
        assert_eq!(ctx.resolve_function("helper"), vec!["Vendor\\Lib\\helper"]);
        assert_eq!(ctx.resolve_function("strlen"), vec!["App\\Http\\strlen", "strlen"]);
        assert_eq!(ctx.resolve_function("\\strlen"), vec!["strlen"]);
    }

    #[test]
    fn constant_aliases_are_case_sensitive() {
        let ctx = app_context();
        assert_eq!(ctx.resolve_constant("LIMIT"), vec!["Vendor\\Lib\\LIMIT"]);
        assert_eq!(ctx.resolve_constant("limit"), vec!["App\\Http\\limit", "limit"]);
        assert_eq!(ctx.resolve_constant("PHP_EOL"), vec!["App\\Http\\PHP_EOL", "PHP_EOL"]);
    }

    #[test]
    fn name_helpers() {
        assert_eq!(short_name("A\\B\\C"), "C");
        assert_eq!(short_name("C"), "C");
        assert_eq!(namespace_of("\\A\\B\\C"), "A\\B");
        assert_eq!(namespace_of("C"), "");
    }
}
