mod common;

use std::path::Path;
use std::sync::Arc;

use common::Workspace;
use phpantom_reflection::{EngineConfig, ReflectionEngine, ReflectionError, Value};

const COMPOSER_JSON: &str = r#"{
    "name": "acme/billing",
    "autoload": { "psr-4": { "Acme\\": "src/" } },
    "autoload-dev": { "psr-4": { "Acme\\Tests\\": "tests/" } }
}"#;

fn billing() -> Workspace {
    Workspace::with_files(&[
        (
            "src/Billing/Invoice.php",
            concat!(
                "<?php\n",
                "namespace Acme\\Billing;\n",
                "\n",
                "use Acme\\Billing\\Contracts\\Payable as PayableContract;\n",
                "\n",
                "final class Invoice implements PayableContract\n",
                "{\n",
                "    public function amount(): int { return self::MINIMUM; }\n",
                "}\n",
            ),
        ),
        (
            "src/Billing/Contracts/Payable.php",
            concat!(
                "<?php\n",
                "namespace Acme\\Billing\\Contracts;\n",
                "\n",
                "interface Payable\n",
                "{\n",
                "    const MINIMUM = 100;\n",
                "    public function amount(): int;\n",
                "}\n",
            ),
        ),
        (
            "tests/InvoiceTest.php",
            "<?php\nnamespace Acme\\Tests;\nclass InvoiceTest {}\n",
        ),
    ])
}

#[test]
fn composer_classes_are_parsed_on_demand() {
    let ws = billing();
    let engine = ws.composer_engine(COMPOSER_JSON);
    assert_eq!(engine.cache().parse_count(), 0);

    let invoice = engine.class("Acme\\Billing\\Invoice").unwrap();
    assert_eq!(engine.cache().parse_count(), 1);

    assert_eq!(
        invoice.interface_names().unwrap(),
        vec!["Acme\\Billing\\Contracts\\Payable"]
    );
    assert_eq!(engine.cache().parse_count(), 2);
    assert_eq!(invoice.constant("MINIMUM").unwrap(), Value::Int(100));

    // Everything parsed is now known under any casing.
    let again = engine.class("\\ACME\\billing\\invoice").unwrap();
    assert_eq!(again.name(), "Acme\\Billing\\Invoice");
    assert_eq!(engine.cache().parse_count(), 2);

    assert!(engine.class("Acme\\Tests\\InvoiceTest").is_ok());
    assert_eq!(engine.cache().parse_count(), 3);
}

#[test]
fn files_are_parsed_once() {
    let ws = billing();
    let engine = ws.composer_engine(COMPOSER_JSON);
    let path = ws.path("src/Billing/Invoice.php");

    let first = engine.file(&path).unwrap();
    let second = engine.file(&path).unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let class = engine.class("Acme\\Billing\\Invoice").unwrap();
    assert_eq!(class.file_name(), first.path.as_path());
    assert_eq!(engine.cache().parse_count(), 1);

    // Clones share the cache.
    let clone = engine.clone();
    clone.class("Acme\\Billing\\Invoice").unwrap();
    assert_eq!(engine.cache().parse_count(), 1);
}

#[test]
fn missing_symbols() {
    let ws = billing();
    let engine = ws.composer_engine(COMPOSER_JSON);

    let err = engine.class("Acme\\Billing\\Refund").unwrap_err();
    assert!(matches!(&err, ReflectionError::ClassNotFound(name) if name == "Acme\\Billing\\Refund"));
    assert_eq!(err.to_string(), "class \"Acme\\Billing\\Refund\" does not exist");
    assert!(err.is_not_found());

    assert!(matches!(
        engine.function("Acme\\helper"),
        Err(ReflectionError::FunctionNotFound(_))
    ));

    let invoice = engine.class("Acme\\Billing\\Invoice").unwrap();
    assert!(matches!(
        invoice.method("refund"),
        Err(ReflectionError::MethodNotFound { method, .. }) if method == "refund"
    ));
    assert!(matches!(
        invoice.property("total"),
        Err(ReflectionError::PropertyNotFound { .. })
    ));
    assert!(matches!(
        invoice.reflection_constant("MAXIMUM"),
        Err(ReflectionError::ClassConstantNotFound { .. })
    ));
    assert!(!invoice.has_method("refund").unwrap());
    assert!(invoice.has_method("AMOUNT").unwrap());
}

#[test]
fn missing_file_and_syntax_errors() {
    let ws = Workspace::with_files(&[("broken.php", "<?php\nclass Broken {\n")]);
    let engine = ReflectionEngine::default();

    assert!(matches!(
        engine.reflect_file(&ws.path("absent.php")),
        Err(ReflectionError::Io { .. })
    ));
    assert!(matches!(
        engine.reflect_file(&ws.path("broken.php")),
        Err(ReflectionError::Syntax { .. })
    ));
    assert_eq!(engine.cache().parse_count(), 0);
}

#[test]
fn namespace_resolution_in_files() {
    let ws = Workspace::with_files(&[(
        "app.php",
        concat!(
            "<?php\n",
            "namespace App\\Http;\n",
            "\n",
            "use App\\Models\\{User, Team as Group};\n",
            "use function App\\Support\\tap;\n",
            "use const App\\Support\\VERSION;\n",
            "\n",
            "class Controller\n",
            "{\n",
            "    public function show(User $user, Group $group, \\DateTime $at, Request $request) {}\n",
            "}\n",
            "\n",
            "class Orphan extends Base {}\n",
        ),
    )]);
    let engine = ReflectionEngine::default();
    let file = engine.reflect_file(&ws.path("app.php")).unwrap();
    let ns = file.namespace("App\\Http").unwrap();
    assert_eq!(
        ns.namespace_aliases(),
        vec![
            ("User".to_string(), "App\\Models\\User".to_string()),
            ("Group".to_string(), "App\\Models\\Team".to_string()),
        ]
    );

    let controller = ns.class("App\\Http\\Controller").unwrap();
    let types: Vec<String> = controller
        .method("show")
        .unwrap()
        .parameters()
        .iter()
        .map(|p| p.ty().unwrap().to_string())
        .collect();
    assert_eq!(
        types,
        vec!["App\\Models\\User", "App\\Models\\Team", "DateTime", "App\\Http\\Request"]
    );

    // The parent name is resolved in the namespace, then must exist.
    let orphan = ns.class("App\\Http\\Orphan").unwrap();
    assert!(matches!(
        orphan.parent_class_name(),
        Err(ReflectionError::ClassNotFound(name)) if name == "App\\Http\\Base"
    ));
}

#[test]
fn configuration_file_drives_the_engine() {
    let ws = Workspace::with_files(&[
        ("lib/Util.php", "<?php\nnamespace Lib;\nfunction util() {}\nconst MODE = 'fast';\n"),
        (
            ".phpantom-reflect.toml",
            "scan_paths = [\"lib\"]\ninclude_paths = [\"lib\"]\ncore_constants = false\n",
        ),
    ]);
    let config = EngineConfig::discover(ws.root()).unwrap();
    assert_eq!(config.scan_paths, vec![ws.path("lib")]);
    assert!(!config.core_constants);

    let engine = ReflectionEngine::from_config(&config).unwrap();
    assert!(engine.function("lib\\UTIL").is_ok());
    assert_eq!(
        engine.constant_value("Lib\\MODE").unwrap(),
        Value::String("fast".to_string())
    );
    assert!(matches!(
        engine.constant_value("PHP_EOL"),
        Err(ReflectionError::ConstantNotFound(_))
    ));

    // Relative paths go through the include path.
    let file = engine.reflect_file(Path::new("Util.php")).unwrap();
    assert!(file.name().ends_with("lib/Util.php"));
}

#[test]
fn duplicate_declarations_resolve_in_scan_order() {
    let ws = Workspace::new();
    for i in 0..6 {
        ws.write(
            &format!("src/dup{i}.php"),
            &format!("<?php\nclass Dup {{ const WHO = {i}; }}\n"),
        );
    }

    for _ in 0..5 {
        let engine = ws.scanning_engine();
        let who = || engine.class("Dup").unwrap().constant("WHO").unwrap();
        assert_eq!(who(), Value::Int(5));

        // Touching other declaring files does not move the winner.
        engine.file(&ws.path("src/dup0.php")).unwrap();
        engine.file(&ws.path("src/dup3.php")).unwrap();
        assert_eq!(who(), Value::Int(5));
    }
}

#[test]
fn in_memory_sources_are_reflected() {
    let engine = ReflectionEngine::default();
    engine
        .parse_source(
            Path::new("/virtual/mem.php"),
            "<?php\nnamespace Mem;\nclass Box { const SIZE = 2; }\nfunction open(): bool { return true; }\n",
        )
        .unwrap();

    let class = engine.class("Mem\\Box").unwrap();
    assert_eq!(class.file_name(), Path::new("/virtual/mem.php"));
    assert_eq!(class.constant("SIZE").unwrap(), Value::Int(2));
    assert_eq!(engine.function("Mem\\open").unwrap().name(), "Mem\\open");

    let file = engine.reflect_file(Path::new("/virtual/mem.php")).unwrap();
    assert_eq!(file.name(), Path::new("/virtual/mem.php"));
    assert_eq!(engine.cache().parse_count(), 1);
}
