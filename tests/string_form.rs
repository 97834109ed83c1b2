mod common;

use common::Workspace;
use phpantom_reflection::Snapshot;

const SHAPES: &str = concat!(
    "<?php\n",
    "namespace Geo;\n",
    "\n",
    "interface Shape\n",
    "{\n",
    "    public function area(): float;\n",
    "}\n",
    "\n",
    "/** Four equal sides. */\n",
    "class Square implements Shape\n",
    "{\n",
    "    const SIDES = 4;\n",
    "    public static $made = 0;\n",
    "    protected int $side = 2 * 3;\n",
    "\n",
    "    /** Build a square. */\n",
    "    public function __construct(int $side = self::SIDES, private bool $flag = false)\n",
    "    {\n",
    "    }\n",
    "\n",
    "    public function area(): float\n",
    "    {\n",
    "        return $this->side ** 2;\n",
    "    }\n",
    "}\n",
    "\n",
    "function unit(?Square &$into = null, string ...$tags): Square\n",
    "{\n",
    "    return new Square(1);\n",
    "}\n",
);

fn shapes() -> (Workspace, phpantom_reflection::ReflectionEngine, String) {
    let ws = Workspace::with_files(&[("Shapes.php", SHAPES)]);
    let engine = ws.scanning_engine();
    let path = ws
        .path("Shapes.php")
        .canonicalize()
        .unwrap()
        .display()
        .to_string();
    (ws, engine, path)
}

#[test]
fn parameter_strings() {
    let (_ws, engine, _path) = shapes();
    let unit = engine.function("Geo\\unit").unwrap();
    let params = unit.parameters();
    assert_eq!(
        params[0].to_string(),
        "Parameter #0 [ <optional> ?Geo\\Square &$into = NULL ]"
    );
    assert_eq!(
        params[1].to_string(),
        "Parameter #1 [ <optional> string ...$tags ]"
    );

    let ctor = engine.class("Geo\\Square").unwrap().constructor().unwrap().unwrap();
    let params = ctor.parameters();
    assert_eq!(
        params[0].to_string(),
        "Parameter #0 [ <optional> int $side = self::SIDES ]"
    );
    assert_eq!(
        params[1].to_string(),
        "Parameter #1 [ <optional> bool $flag = false ]"
    );
}

#[test]
fn function_string() {
    let (_ws, engine, path) = shapes();
    let unit = engine.function("Geo\\unit").unwrap();
    let expected = format!(
        concat!(
            "Function [ <user> function Geo\\unit ] {{\n",
            "  @@ {} 27 - 30\n",
            "\n",
            "  - Parameters [2] {{\n",
            "    Parameter #0 [ <optional> ?Geo\\Square &$into = NULL ]\n",
            "    Parameter #1 [ <optional> string ...$tags ]\n",
            "  }}\n",
            "  - Return [ Geo\\Square ]\n",
            "}}\n",
        ),
        path
    );
    assert_eq!(unit.to_string(), expected);
}

#[test]
fn method_and_member_strings() {
    let (_ws, engine, path) = shapes();
    let square = engine.class("Geo\\Square").unwrap();

    let area = square.method("area").unwrap();
    let expected = format!(
        concat!(
            "Method [ <user, prototype Geo\\Shape> public method area ] {{\n",
            "  @@ {} 21 - 24\n",
            "\n",
            "  - Parameters [0] {{\n",
            "  }}\n",
            "  - Return [ float ]\n",
            "}}\n",
        ),
        path
    );
    assert_eq!(area.to_string(), expected);

    assert_eq!(
        square.property("side").unwrap().to_string(),
        "Property [ <default> protected int $side = 6 ]\n"
    );
    assert_eq!(
        square.property("made").unwrap().to_string(),
        "Property [ public static $made = 0 ]\n"
    );
    assert_eq!(
        square.property("flag").unwrap().to_string(),
        "Property [ <default> private bool $flag ]\n"
    );
    assert_eq!(
        square.reflection_constant("SIDES").unwrap().to_string(),
        "Constant [ public int SIDES ] { 4 }\n"
    );
}

#[test]
fn class_string() {
    let (_ws, engine, path) = shapes();
    let square = engine.class("Geo\\Square").unwrap();
    let expected = format!(
        concat!(
            "/** Four equal sides. */\n",
            "Class [ <user> class Geo\\Square implements Geo\\Shape ] {{\n",
            "  @@ {path} 10-25\n",
            "\n",
            "  - Constants [1] {{\n",
            "    Constant [ public int SIDES ] {{ 4 }}\n",
            "  }}\n",
            "\n",
            "  - Static properties [1] {{\n",
            "    Property [ public static $made = 0 ]\n",
            "  }}\n",
            "\n",
            "  - Static methods [0] {{\n",
            "  }}\n",
            "\n",
            "  - Properties [2] {{\n",
            "    Property [ <default> protected int $side = 6 ]\n",
            "    Property [ <default> private bool $flag ]\n",
            "  }}\n",
            "\n",
            "  - Methods [2] {{\n",
            "    /** Build a square. */\n",
            "    Method [ <user, ctor> public method __construct ] {{\n",
            "      @@ {path} 17 - 19\n",
            "\n",
            "      - Parameters [2] {{\n",
            "        Parameter #0 [ <optional> int $side = self::SIDES ]\n",
            "        Parameter #1 [ <optional> bool $flag = false ]\n",
            "      }}\n",
            "    }}\n",
            "\n",
            "    Method [ <user, prototype Geo\\Shape> public method area ] {{\n",
            "      @@ {path} 21 - 24\n",
            "\n",
            "      - Parameters [0] {{\n",
            "      }}\n",
            "      - Return [ float ]\n",
            "    }}\n",
            "  }}\n",
            "}}\n",
        ),
        path = path
    );
    assert_eq!(square.to_string().unwrap(), expected);
}

#[test]
fn interface_string_lists_abstract_methods() {
    let (_ws, engine, _path) = shapes();
    let shape = engine.class("Geo\\Shape").unwrap().to_string().unwrap();
    assert!(shape.starts_with("Interface [ <user> interface Geo\\Shape ] {\n"));
    assert!(shape.contains("Method [ <user> abstract public method area ] {\n"));
    assert!(shape.contains("  - Constants [0] {\n  }\n"));
}

#[test]
fn snapshots_are_ordered_json() {
    let (_ws, engine, _path) = shapes();
    let square = engine.class("geo\\square").unwrap();
    assert_eq!(square.snapshot_json().unwrap(), r#"{"name":"Geo\\Square"}"#);

    let area = square.method("AREA").unwrap();
    assert_eq!(area.snapshot_json().unwrap(), r#"{"name":"area","class":"Geo\\Square"}"#);

    let side = square.property("side").unwrap();
    assert_eq!(side.snapshot_json().unwrap(), r#"{"name":"side","class":"Geo\\Square"}"#);

    let sides = square.reflection_constant("SIDES").unwrap();
    assert_eq!(sides.snapshot_json().unwrap(), r#"{"name":"SIDES","class":"Geo\\Square"}"#);

    assert!(area.parameters().is_empty());
    let unit = engine.function("Geo\\unit").unwrap();
    assert_eq!(unit.snapshot_json().unwrap(), r#"{"name":"Geo\\unit"}"#);
    assert_eq!(unit.parameters()[1].snapshot_json().unwrap(), r#"{"name":"tags"}"#);
}
