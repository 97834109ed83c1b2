//! Declaration index.
//!
//! [`index_file`] walks every namespace block of a parsed file once and
//! maps each declared symbol to the position of its node in the tree.
//! [`SymbolTable`] is the process-wide union of those indexes: once a file
//! has been parsed, the symbols it declares resolve without asking the
//! locator again.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::resolution::namespace_of;
use crate::types::{FileAst, qualify};

/// What a declared symbol is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    /// Classes, interfaces, traits, and enums share one symbol space.
    Class,
    Function,
    Constant,
}

/// Position of a declaration inside a [`FileAst`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclRef {
    pub namespace: usize,
    pub index: usize,
}

/// Lookup key for classes and functions: case-insensitive, no leading `\`.
pub fn symbol_key(fqn: &str) -> String {
    fqn.trim_start_matches('\\').to_ascii_lowercase()
}

/// Lookup key for constants: the namespace part is case-insensitive, the
/// constant name itself is not.
pub fn constant_key(fqn: &str) -> String {
    let fqn = fqn.trim_start_matches('\\');
    let ns = namespace_of(fqn);
    if ns.is_empty() {
        fqn.to_string()
    } else {
        format!("{}\\{}", ns.to_ascii_lowercase(), &fqn[ns.len() + 1..])
    }
}

fn key_for(kind: SymbolKind, fqn: &str) -> String {
    match kind {
        SymbolKind::Constant => constant_key(fqn),
        SymbolKind::Class | SymbolKind::Function => symbol_key(fqn),
    }
}

/// The declarations of one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileIndex {
    entries: HashMap<(SymbolKind, String), DeclRef>,
    /// Declared FQNs in scan order.
    order: Vec<(SymbolKind, String)>,
}

impl FileIndex {
    pub fn lookup(&self, kind: SymbolKind, fqn: &str) -> Option<DeclRef> {
        self.entries.get(&(kind, key_for(kind, fqn))).copied()
    }

    pub fn class(&self, fqn: &str) -> Option<DeclRef> {
        self.lookup(SymbolKind::Class, fqn)
    }

    pub fn function(&self, fqn: &str) -> Option<DeclRef> {
        self.lookup(SymbolKind::Function, fqn)
    }

    pub fn constant(&self, fqn: &str) -> Option<DeclRef> {
        self.lookup(SymbolKind::Constant, fqn)
    }

    /// Every declared symbol with its original-case FQN, in scan order.
    pub fn symbols(&self) -> impl Iterator<Item = (SymbolKind, &str)> {
        self.order.iter().map(|(kind, fqn)| (*kind, fqn.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, kind: SymbolKind, fqn: String, decl: DeclRef, path: &Path) {
        let key = (kind, key_for(kind, &fqn));
        if self.entries.insert(key, decl).is_some() {
            // Last declaration wins; PHP would refuse to load the file.
            tracing::warn!(
                "duplicate {:?} declaration of {} in {}",
                kind,
                fqn,
                path.display()
            );
            let folded = key_for(kind, &fqn);
            self.order
                .retain(|(k, existing)| !(*k == kind && key_for(kind, existing) == folded));
        }
        self.order.push((kind, fqn));
    }
}

/// Walk every namespace block and top-level declaration of `ast` once.
pub fn index_file(ast: &FileAst) -> FileIndex {
    let mut index = FileIndex::default();

    for (ns_idx, ns) in ast.namespaces.iter().enumerate() {
        for (i, class) in ns.classes.iter().enumerate() {
            index.insert(
                SymbolKind::Class,
                qualify(&ns.name, &class.name),
                DeclRef { namespace: ns_idx, index: i },
                &ast.path,
            );
        }
        for (i, func) in ns.functions.iter().enumerate() {
            index.insert(
                SymbolKind::Function,
                qualify(&ns.name, &func.name),
                DeclRef { namespace: ns_idx, index: i },
                &ast.path,
            );
        }
        for (i, constant) in ns.constants.iter().enumerate() {
            // `define()` names are already fully qualified.
            let fqn = if constant.from_define {
                constant.name.clone()
            } else {
                qualify(&ns.name, &constant.name)
            };
            index.insert(
                SymbolKind::Constant,
                fqn,
                DeclRef { namespace: ns_idx, index: i },
                &ast.path,
            );
        }
    }

    index
}

/// Process-wide symbol → file table, fed by every indexed file.
///
/// Each file is recorded once; recording it again is a no-op.  When two
/// files declare the same symbol, the one recorded last wins, so the
/// winner depends only on the order files were first recorded in.
#[derive(Debug, Default)]
pub struct SymbolTable {
    inner: RwLock<TableInner>,
}

#[derive(Debug, Default)]
struct TableInner {
    entries: HashMap<(SymbolKind, String), PathBuf>,
    recorded: HashSet<PathBuf>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the symbols of `path`.  Returns `false` when the file was
    /// already recorded.
    pub fn record(&self, path: &Path, index: &FileIndex) -> bool {
        let mut inner = self.inner.write();
        if !inner.recorded.insert(path.to_path_buf()) {
            return false;
        }
        for (kind, fqn) in index.symbols() {
            let key = (kind, key_for(kind, fqn));
            if let Some(previous) = inner.entries.insert(key, path.to_path_buf()) {
                tracing::warn!(
                    "{} is declared in both {} and {}; using the latter",
                    fqn,
                    previous.display(),
                    path.display()
                );
            }
        }
        true
    }

    pub fn lookup(&self, kind: SymbolKind, fqn: &str) -> Option<PathBuf> {
        self.inner.read().entries.get(&(kind, key_for(kind, fqn))).cloned()
    }

    pub fn forget_file(&self, path: &Path) {
        let mut inner = self.inner.write();
        inner.recorded.remove(path);
        inner.entries.retain(|_, p| p != path);
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::parser::parse_source;

    fn index(php: &str) -> FileIndex {
        let ast = parse_source(&PathBuf::from("/virtual/index.php"), php).unwrap();
        index_file(&ast)
    }

    #[test]
    fn classes_and_functions_are_case_insensitive() {
        let idx = index(concat!(
            "<?php\n",
            "namespace App\\Models;\n",
            "class User {}\n",
            "function make_user() {}\n",
        ));
        assert_eq!(
            idx.class("\\app\\models\\USER"),
            Some(DeclRef { namespace: 0, index: 0 })
        );
        assert!(idx.function("App\\Models\\MAKE_USER").is_some());
        assert!(idx.class("User").is_none());
    }

    #[test]
    fn constants_keep_case_in_their_name() {
        let idx = index(concat!(
            "<?php\n",
            "namespace Config;\n",
            "const Limit = 1;\n",
            "define('GLOBAL_LIMIT', 2);\n",
        ));
        assert!(idx.constant("config\\Limit").is_some());
        assert!(idx.constant("Config\\LIMIT").is_none());
        assert!(idx.constant("GLOBAL_LIMIT").is_some());
        assert!(idx.constant("Config\\GLOBAL_LIMIT").is_none());
    }

    #[test]
    fn duplicate_declarations_keep_the_last() {
        let idx = index(concat!(
            "<?php\n",
            "namespace A { class Dup {} }\n",
            "namespace A { class Dup {} class Other {} }\n",
        ));
        assert_eq!(idx.class("A\\Dup"), Some(DeclRef { namespace: 1, index: 0 }));
        assert_eq!(idx.len(), 2);
        let symbols: Vec<_> = idx.symbols().map(|(_, fqn)| fqn).collect();
        assert_eq!(symbols, vec!["A\\Dup", "A\\Other"]);
    }

    #[test]
    fn symbol_table_last_file_wins() {
        let table = SymbolTable::new();
        let first = index("<?php\nclass Shared {}\n");
        let second = index("<?php\nclass Shared {}\n");
        table.record(Path::new("/one.php"), &first);
        table.record(Path::new("/two.php"), &second);
        assert_eq!(
            table.lookup(SymbolKind::Class, "shared"),
            Some(PathBuf::from("/two.php"))
        );
        table.forget_file(Path::new("/two.php"));
        assert_eq!(table.lookup(SymbolKind::Class, "Shared"), None);
    }

    #[test]
    fn recording_a_file_again_does_not_change_the_winner() {
        let table = SymbolTable::new();
        let shared = index("<?php\nclass Shared {}\n");
        assert!(table.record(Path::new("/one.php"), &shared));
        assert!(table.record(Path::new("/two.php"), &shared));
        assert!(!table.record(Path::new("/one.php"), &shared));
        assert_eq!(
            table.lookup(SymbolKind::Class, "Shared"),
            Some(PathBuf::from("/two.php"))
        );
    }
}
