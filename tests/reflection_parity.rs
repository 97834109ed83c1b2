mod common;

use common::Workspace;
use phpantom_reflection::reflection::{IS_EXPLICIT_ABSTRACT, IS_FINAL, IS_PROTECTED, IS_STATIC};
use phpantom_reflection::{ReflectionEngine, Value};

const ZOO: &str = concat!(
    "<?php\n",
    "namespace Zoo;\n",
    "\n",
    "use Countable;\n",
    "\n",
    "interface Feeds\n",
    "{\n",
    "    public function feed(string $food, int ...$portions): void;\n",
    "}\n",
    "\n",
    "/**\n",
    " * Something that lives in the zoo.\n",
    " */\n",
    "abstract class Animal implements Feeds\n",
    "{\n",
    "    public const LEGS = 4;\n",
    "    protected static int $population = 0;\n",
    "    protected ?string $name = null;\n",
    "\n",
    "    public function __construct(string $name = 'anon')\n",
    "    {\n",
    "        $this->name = $name;\n",
    "    }\n",
    "\n",
    "    abstract public function speak(): string;\n",
    "\n",
    "    public function feed(string $food, int ...$portions): void {}\n",
    "}\n",
    "\n",
    "trait Sleeps\n",
    "{\n",
    "    private bool $asleep = false;\n",
    "\n",
    "    public function sleep(int|float $hours = 8): static\n",
    "    {\n",
    "        return $this;\n",
    "    }\n",
    "}\n",
    "\n",
    "final class Dog extends Animal implements Countable\n",
    "{\n",
    "    use Sleeps;\n",
    "\n",
    "    public function speak(): string\n",
    "    {\n",
    "        return 'woof';\n",
    "    }\n",
    "\n",
    "    public function count(): int\n",
    "    {\n",
    "        return 1;\n",
    "    }\n",
    "\n",
    "    public function &fetch(?Animal $other, array $toys = [], callable $done = null)\n",
    "    {\n",
    "        static $calls = 0;\n",
    "        yield $other;\n",
    "    }\n",
    "}\n",
);

fn zoo() -> (Workspace, ReflectionEngine) {
    let ws = Workspace::with_files(&[("src/Zoo.php", ZOO)]);
    let engine = ws.scanning_engine();
    (ws, engine)
}

fn names<T>(items: &[T], name: impl Fn(&T) -> String) -> Vec<String> {
    items.iter().map(name).collect()
}

// ─── Classes ────────────────────────────────────────────────────────────────

#[test]
fn class_getters() {
    let (ws, engine) = zoo();

    let animal = engine.class("Zoo\\Animal").unwrap();
    assert_eq!(animal.short_name(), "Animal");
    assert_eq!(animal.namespace_name(), "Zoo");
    assert_eq!(
        animal.doc_comment(),
        Some("/**\n * Something that lives in the zoo.\n */")
    );
    assert_eq!((animal.start_line(), animal.end_line()), (14, 28));
    assert!(animal.is_abstract().unwrap());
    assert!(!animal.is_instantiable().unwrap());
    assert_eq!(animal.modifiers(), IS_EXPLICIT_ABSTRACT);
    assert!(animal.is_user_defined());
    assert!(!animal.is_internal());
    assert_eq!(animal.extension_name(), None);

    let dog = engine.class("\\zoo\\DOG").unwrap();
    assert_eq!(dog.name(), "Zoo\\Dog");
    assert_eq!(dog.file_name(), ws.path("src/Zoo.php").canonicalize().unwrap());
    assert_eq!(dog.doc_comment(), None);
    assert!(dog.is_final());
    assert_eq!(dog.modifiers(), IS_FINAL);
    assert!(dog.is_instantiable().unwrap());
    assert!(!dog.is_iterable().unwrap());
    assert_eq!(dog.parent_class().unwrap().unwrap().name(), "Zoo\\Animal");
    assert_eq!(dog.interface_names().unwrap(), vec!["Zoo\\Feeds", "Countable"]);
    assert_eq!(names(&dog.interfaces().unwrap(), |c| c.name()), vec!["Zoo\\Feeds"]);
    assert_eq!(dog.trait_names(), vec!["Zoo\\Sleeps"]);
    assert!(dog.is_subclass_of("zoo\\animal").unwrap());
    assert!(dog.implements_interface("Countable").unwrap());
    assert!(!dog.is_subclass_of("Zoo\\Dog").unwrap());

    let feeds = engine.class("Zoo\\Feeds").unwrap();
    assert!(feeds.is_interface());
    assert!(feeds.parent_class().unwrap().is_none());
    assert!(engine.class("Zoo\\Sleeps").unwrap().is_trait());
}

#[test]
fn merged_members() {
    let (_ws, engine) = zoo();
    let dog = engine.class("Zoo\\Dog").unwrap();

    let methods = dog.methods(None).unwrap();
    assert_eq!(
        names(&methods, |m| m.name().to_string()),
        vec!["speak", "count", "fetch", "sleep", "__construct", "feed"]
    );
    assert_eq!(
        names(&methods, |m| m.class()),
        vec!["Zoo\\Dog", "Zoo\\Dog", "Zoo\\Dog", "Zoo\\Dog", "Zoo\\Animal", "Zoo\\Animal"]
    );

    let properties = dog.properties(None).unwrap();
    assert_eq!(
        names(&properties, |p| p.name().to_string()),
        vec!["asleep", "population", "name"]
    );
    assert_eq!(dog.properties(Some(IS_STATIC)).unwrap().len(), 1);

    assert_eq!(dog.constant("LEGS").unwrap(), Value::Int(4));
    assert_eq!(dog.reflection_constant("LEGS").unwrap().class(), "Zoo\\Animal");
    assert_eq!(dog.constructor().unwrap().unwrap().class(), "Zoo\\Animal");
}

// ─── Methods ────────────────────────────────────────────────────────────────

#[test]
fn method_getters() {
    let (_ws, engine) = zoo();
    let dog = engine.class("Zoo\\Dog").unwrap();

    let speak = dog.method("SPEAK").unwrap();
    assert_eq!(speak.name(), "speak");
    assert_eq!(speak.short_name(), "speak");
    assert_eq!(speak.namespace_name(), "");
    assert!(!speak.in_namespace());
    assert!(speak.is_public());
    assert!(!speak.is_abstract());
    assert_eq!((speak.start_line(), speak.end_line()), (44, 47));
    assert_eq!(speak.return_type().unwrap().to_string(), "string");
    assert!(speak.has_return_type());
    assert!(!speak.is_closure());
    assert!(!speak.is_deprecated());
    assert!(speak.closure_this().is_none());
    assert!(speak.closure_scope_class().is_none());

    let abstract_speak = engine.class("Zoo\\Animal").unwrap().method("speak").unwrap();
    assert!(abstract_speak.is_abstract());
    assert_eq!(abstract_speak.modifiers() & 64, 64);

    let fetch = dog.method("fetch").unwrap();
    assert!(fetch.returns_reference());
    assert!(fetch.is_generator());
    assert!(!fetch.has_return_type());
    assert_eq!(fetch.number_of_parameters(), 3);
    assert_eq!(fetch.number_of_required_parameters(), 1);
    assert_eq!(fetch.static_variables(), vec![("calls".to_string(), Some(Value::Int(0)))]);

    let construct = dog.method("__construct").unwrap();
    assert!(construct.is_constructor());
    assert!(!construct.is_destructor());
    assert_eq!(construct.number_of_required_parameters(), 0);
}

#[test]
fn trait_methods_report_the_using_class() {
    let (_ws, engine) = zoo();
    let sleep = engine.class("Zoo\\Dog").unwrap().method("sleep").unwrap();
    assert_eq!(sleep.class(), "Zoo\\Dog");
    assert_eq!(sleep.declaring_class().name(), "Zoo\\Dog");
    assert!(sleep.is_from_trait());
    assert_eq!((sleep.start_line(), sleep.end_line()), (34, 37));
    assert_eq!(sleep.return_type().unwrap().to_string(), "static");
}

// ─── Parameters ─────────────────────────────────────────────────────────────

#[test]
fn variadic_parameter() {
    let (_ws, engine) = zoo();
    let feed = engine.class("Zoo\\Dog").unwrap().method("feed").unwrap();
    assert!(feed.is_variadic());
    assert_eq!(feed.number_of_parameters(), 2);
    assert_eq!(feed.number_of_required_parameters(), 1);

    let params = feed.parameters();
    let portions = &params[1];
    assert_eq!(portions.name(), "portions");
    assert_eq!(portions.position(), 1);
    assert!(portions.is_variadic());
    assert!(portions.is_optional());
    assert!(!portions.is_default_value_available());
    assert_eq!(portions.default_value(), None);
    assert_eq!(portions.ty().unwrap().to_string(), "int");
    assert_eq!(portions.declaring_function_name(), "feed");
    assert_eq!(portions.declaring_class().unwrap().name(), "Zoo\\Animal");
}

#[test]
fn nullable_and_union_parameters() {
    let (_ws, engine) = zoo();
    let dog = engine.class("Zoo\\Dog").unwrap();
    let params = dog.method("fetch").unwrap().parameters();

    let other = &params[0];
    assert_eq!(other.ty().unwrap().to_string(), "?Zoo\\Animal");
    assert!(other.allows_null());
    assert!(!other.is_optional());
    assert_eq!(other.class().unwrap().unwrap().name(), "Zoo\\Animal");

    let toys = &params[1];
    assert!(toys.is_array());
    assert!(toys.is_optional());
    assert_eq!(toys.default_value_source(), Some("[]"));

    let done = &params[2];
    assert!(done.is_callable());
    assert!(done.allows_null());
    assert_eq!(done.ty().unwrap().to_string(), "?callable");
    assert_eq!(done.default_value(), Some(Value::Null));
    assert!(done.class().unwrap().is_none());

    let hours = &dog.method("sleep").unwrap().parameters()[0];
    let ty = hours.ty().unwrap();
    assert_eq!(ty.to_string(), "int|float");
    assert!(!ty.allows_null());
    assert!(!ty.is_builtin());
    assert_eq!(hours.default_value(), Some(Value::Int(8)));
}

// ─── Properties ─────────────────────────────────────────────────────────────

#[test]
fn property_getters() {
    let (_ws, engine) = zoo();
    let dog = engine.class("Zoo\\Dog").unwrap();

    let population = dog.property("population").unwrap();
    assert_eq!(population.class(), "Zoo\\Animal");
    assert!(population.is_static());
    assert!(population.is_protected());
    assert!(population.is_default());
    assert_eq!(population.modifiers(), IS_PROTECTED | IS_STATIC);
    assert_eq!(population.ty().unwrap().to_string(), "int");
    assert_eq!(population.default_value(), Some(Value::Int(0)));

    let name = dog.property("$name").unwrap();
    assert!(name.has_type());
    assert!(name.has_default_value());
    assert_eq!(name.default_value(), Some(Value::Null));

    let asleep = dog.property("asleep").unwrap();
    assert_eq!(asleep.class(), "Zoo\\Dog");
    assert!(asleep.is_private());
    assert_eq!(asleep.default_value(), Some(Value::Bool(false)));
}

#[test]
fn promoted_and_untyped_properties() {
    let ws = Workspace::with_files(&[(
        "Point.php",
        concat!(
            "<?php\n",
            "class Point {\n",
            "    public $label;\n",
            "    public function __construct(public readonly int $x, protected int $y = 0) {}\n",
            "}\n",
        ),
    )]);
    let point = ws.scanning_engine().class("Point").unwrap();

    let label = point.property("label").unwrap();
    assert!(!label.has_type());
    assert!(label.has_default_value());
    assert_eq!(label.default_value(), Some(Value::Null));

    let x = point.property("x").unwrap();
    assert!(x.is_promoted());
    assert!(x.is_readonly());
    assert!(!x.has_default_value());

    let y = point.property("y").unwrap();
    assert!(y.is_protected());
    assert!(!y.has_default_value());

    let ctor = point.constructor().unwrap().unwrap();
    assert!(ctor.parameters()[0].is_promoted());
    assert_eq!(ctor.number_of_required_parameters(), 1);
}

#[test]
fn functions() {
    let ws = Workspace::with_files(&[(
        "helpers.php",
        concat!(
            "<?php\n",
            "namespace Util;\n",
            "\n",
            "/** Sum everything. */\n",
            "function sum(int|float ...$values): int|float\n",
            "{\n",
            "    return array_sum($values);\n",
            "}\n",
        ),
    )]);
    let engine = ws.scanning_engine();
    let sum = engine.function("\\util\\SUM").unwrap();
    assert_eq!(sum.name(), "Util\\sum");
    assert_eq!(sum.short_name(), "sum");
    assert_eq!(sum.namespace_name(), "Util");
    assert!(sum.in_namespace());
    assert_eq!(sum.doc_comment(), Some("/** Sum everything. */"));
    assert_eq!((sum.start_line(), sum.end_line()), (5, 8));
    assert!(sum.is_variadic());
    assert!(!sum.is_generator());
    assert_eq!(sum.return_type().unwrap().to_string(), "int|float");
    assert_eq!(sum.number_of_required_parameters(), 0);
}
