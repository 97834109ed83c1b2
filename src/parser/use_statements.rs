/// `use` import lowering.
///
/// Class, function, and constant imports are all kept, each tagged with
/// its [`ImportKind`], because function calls and constant references in
/// default values resolve through their own import tables.
use mago_syntax::ast::*;

use crate::types::*;

use super::Lowering;

fn import_kind(r#type: &UseType) -> ImportKind {
    if r#type.is_function() {
        ImportKind::Function
    } else if r#type.is_const() {
        ImportKind::Constant
    } else {
        ImportKind::Class
    }
}

impl<'a> Lowering<'a> {
    /// Extract individual imports from a `UseItems` node.
    pub(crate) fn lower_use_items(items: &UseItems, imports: &mut Vec<UseImport>) {
        match items {
            UseItems::Sequence(seq) => {
                // `use Foo\Bar;` or `use Foo\Bar, Baz\Qux;`
                for item in seq.items.iter() {
                    Self::push_import(item, None, ImportKind::Class, imports);
                }
            }
            UseItems::TypedSequence(seq) => {
                // `use function Foo\bar;` or `use const Foo\BAR;`
                let kind = import_kind(&seq.r#type);
                for item in seq.items.iter() {
                    Self::push_import(item, None, kind, imports);
                }
            }
            UseItems::TypedList(list) => {
                // `use function Foo\{bar, baz};`
                let kind = import_kind(&list.r#type);
                let prefix = list.namespace.value();
                for item in list.items.iter() {
                    Self::push_import(item, Some(prefix), kind, imports);
                }
            }
            UseItems::MixedList(list) => {
                // `use Foo\{Bar, function baz, const QUX};`
                let prefix = list.namespace.value();
                for maybe_typed in list.items.iter() {
                    let kind = maybe_typed
                        .r#type
                        .as_ref()
                        .map(import_kind)
                        .unwrap_or(ImportKind::Class);
                    Self::push_import(&maybe_typed.item, Some(prefix), kind, imports);
                }
            }
        }
    }

    /// If `group_prefix` is `Some`, the item name is relative to that prefix
    /// (for `use Foo\{Bar}` the prefix is `"Foo"`, giving `"Foo\Bar"`).
    fn push_import(
        item: &UseItem,
        group_prefix: Option<&str>,
        kind: ImportKind,
        imports: &mut Vec<UseImport>,
    ) {
        let item_name = item.name.value();
        let fqn = match group_prefix {
            Some(prefix) => format!(
                "{}\\{}",
                prefix.trim_end_matches('\\'),
                item_name.trim_start_matches('\\')
            ),
            None => item_name.to_string(),
        };
        let fqn = fqn.trim_start_matches('\\').to_string();

        let alias = match &item.alias {
            Some(alias) => alias.identifier.value.to_string(),
            None => fqn.rsplit('\\').next().unwrap_or(&fqn).to_string(),
        };

        imports.push(UseImport {
            kind,
            name: fqn,
            alias,
        });
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::parser::parse_source;
    use crate::types::*;

    #[test]
    fn all_import_forms_are_collected() {
        let file = parse_source(
            &PathBuf::from("/virtual/uses.php"),
            concat!(
                "<?php\n",
                "namespace App;\n",
                "use Foo\\Bar;\n",
                "use \\Baz\\Qux as Quux;\n",
                "use function Util\\helper;\n",
                "use const Util\\LIMIT;\n",
                "use Group\\{One, function two, const THREE};\n",
            ),
        )
        .unwrap();

        let imports = &file.namespaces[0].imports;
        let summary: Vec<_> = imports
            .iter()
            .map(|i| (i.kind, i.name.as_str(), i.alias.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (ImportKind::Class, "Foo\\Bar", "Bar"),
                (ImportKind::Class, "Baz\\Qux", "Quux"),
                (ImportKind::Function, "Util\\helper", "helper"),
                (ImportKind::Constant, "Util\\LIMIT", "LIMIT"),
                (ImportKind::Class, "Group\\One", "One"),
                (ImportKind::Function, "Group\\two", "two"),
                (ImportKind::Constant, "Group\\THREE", "THREE"),
            ]
        );
    }
}
