use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::{Value as Json, json};
use tracing_subscriber::EnvFilter;

use phpantom_reflection::{
    EngineConfig, ReflectionClass, ReflectionEngine, ReflectionFunction, ReflectionMethod,
    ReflectionParameter, ReflectionProperty, Result,
};

/// Inspect PHP classes and functions without running them
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (defaults to `.phpantom-reflect.toml` in the root)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Project root used for configuration discovery
    #[arg(short, long, global = true, default_value = ".")]
    root: PathBuf,

    /// Log lookup and parse decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every namespace, class and function declared in a file
    Dump { file: PathBuf },
    /// Print one class with its inherited members
    Class { name: String },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(&args) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<String> {
    let output = inspect(args)?;
    Ok(serde_json::to_string_pretty(&output)?)
}

fn inspect(args: &Args) -> Result<Json> {
    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::discover(&args.root)?,
    };
    let engine = ReflectionEngine::from_config(&config)?;
    tracing::debug!("{:?}", engine);

    match &args.command {
        Command::Dump { file } => {
            let file = engine.reflect_file(file)?;
            let mut namespaces = Vec::new();
            for ns in file.namespaces() {
                let classes = ns
                    .classes()
                    .iter()
                    .map(class_json)
                    .collect::<Result<Vec<_>>>()?;
                let functions: Vec<Json> = ns.functions().iter().map(function_json).collect();
                let constants: Vec<Json> = ns
                    .constants()
                    .into_iter()
                    .map(|(name, value)| json!({ "name": name, "value": value }))
                    .collect();
                namespaces.push(json!({
                    "name": ns.name(),
                    "aliases": ns.namespace_aliases(),
                    "constants": constants,
                    "classes": classes,
                    "functions": functions,
                }));
            }
            Ok(json!({
                "file": file.name(),
                "strict_types": file.is_strict_mode(),
                "namespaces": namespaces,
            }))
        }
        Command::Class { name } => class_json(&engine.class(name)?),
    }
}

fn class_json(class: &ReflectionClass) -> Result<Json> {
    let constants: Vec<Json> = class
        .reflection_constants()?
        .iter()
        .map(|c| {
            json!({
                "name": c.name(),
                "class": c.class(),
                "visibility": c.visibility(),
                "final": c.is_final(),
                "enum_case": c.is_enum_case(),
                "value": c.value().ok(),
            })
        })
        .collect();
    let properties: Vec<Json> = class.properties(None)?.iter().map(property_json).collect();
    let methods: Vec<Json> = class.methods(None)?.iter().map(method_json).collect();

    Ok(json!({
        "name": class.name(),
        "kind": class.kind(),
        "file": class.file_name(),
        "lines": [class.start_line(), class.end_line()],
        "doc_comment": class.doc_comment(),
        "abstract": class.is_abstract()?,
        "final": class.is_final(),
        "readonly": class.is_readonly(),
        "modifiers": class.modifiers(),
        "parent": class.parent_class_name()?,
        "interfaces": class.interface_names()?,
        "traits": class.trait_names(),
        "constants": constants,
        "properties": properties,
        "methods": methods,
    }))
}

fn property_json(property: &ReflectionProperty) -> Json {
    json!({
        "name": property.name(),
        "class": property.class(),
        "visibility": property.visibility(),
        "static": property.is_static(),
        "readonly": property.is_readonly(),
        "promoted": property.is_promoted(),
        "type": property.ty().map(|t| t.to_string()),
        "default": property.default_value(),
    })
}

fn method_json(method: &ReflectionMethod) -> Json {
    let prototype = method.prototype().ok().flatten().map(|p| p.class());
    json!({
        "name": method.name(),
        "class": method.class(),
        "visibility": method.visibility(),
        "static": method.is_static(),
        "abstract": method.is_abstract(),
        "final": method.is_final(),
        "prototype": prototype,
        "lines": [method.start_line(), method.end_line()],
        "parameters": method.parameters().iter().map(parameter_json).collect::<Vec<_>>(),
        "return_type": method.return_type().map(|t| t.to_string()),
    })
}

fn function_json(function: &ReflectionFunction) -> Json {
    json!({
        "name": function.name(),
        "lines": [function.start_line(), function.end_line()],
        "parameters": function.parameters().iter().map(parameter_json).collect::<Vec<_>>(),
        "return_type": function.return_type().map(|t| t.to_string()),
    })
}

fn parameter_json(param: &ReflectionParameter) -> Json {
    json!({
        "name": param.name(),
        "type": param.ty().map(|t| t.to_string()),
        "optional": param.is_optional(),
        "variadic": param.is_variadic(),
        "by_reference": param.is_passed_by_reference(),
        "default": param.default_value_source(),
    })
}
