//! Data types used throughout the reflection engine.
//!
//! This module contains the owned declaration tree that the parser layer
//! lowers every `mago_syntax` program into.  The arena AST produced by the
//! parser borrows a `bumpalo::Bump` for the duration of one parse, so
//! everything the reflection layer needs later (names, modifiers, type
//! hints, doc comments, line spans, and constant-expression subtrees) is
//! copied into the structs below.  Reflection entities address these nodes
//! by index; they never own them.

use std::path::PathBuf;

/// Visibility of a class member (method, property, or constant).
///
/// In PHP, members without an explicit visibility modifier default to `Public`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

impl Visibility {
    /// The keyword as written in PHP source.
    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Protected => "protected",
            Visibility::Private => "private",
        }
    }
}

/// The kind of a class-like declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassLikeKind {
    Class,
    Interface,
    Trait,
    Enum,
}

impl ClassLikeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ClassLikeKind::Class => "class",
            ClassLikeKind::Interface => "interface",
            ClassLikeKind::Trait => "trait",
            ClassLikeKind::Enum => "enum",
        }
    }
}

/// First and last source line of a node (1-based, inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct LineSpan {
    pub start: u32,
    pub end: u32,
}

/// A type declaration exactly as written, before name resolution.
///
/// Class names are stored raw (`Foo`, `\Foo\Bar`, `self`); the reflection
/// layer resolves them against the namespace context of the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeHint {
    /// A single named type: builtin (`int`, `?` excluded) or class-like.
    Named(String),
    /// `?T`
    Nullable(Box<TypeHint>),
    /// `A|B|C`, flattened.
    Union(Vec<TypeHint>),
    /// `A&B`, flattened.
    Intersection(Vec<TypeHint>),
}

/// Unary operators allowed in constant expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
    BitNot,
}

/// Binary operators allowed in constant expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Concat,
    BitAnd,
    BitOr,
    BitXor,
    ShiftLeft,
    ShiftRight,
    And,
    Or,
    Xor,
    Equal,
    NotEqual,
    Identical,
    NotIdentical,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Spaceship,
    Coalesce,
}

/// Magic constants that are resolvable from declaration context alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MagicConstant {
    Class,
    Namespace,
    Function,
    Method,
    Trait,
    Line(u32),
    File,
    Dir,
}

/// One element of an array literal.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayItem {
    Value(Expr),
    KeyValue(Expr, Expr),
    Spread(Expr),
}

/// A constant-expression subtree lowered from a default value, property
/// initializer, or constant declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<ArrayItem>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// `cond ? then : else`; `then` is `None` for the short form `?:`.
    Ternary(Box<Expr>, Option<Box<Expr>>, Box<Expr>),
    /// A bare constant name as written (`FOO`, `\Foo\BAR`, `ns\BAZ`).
    Constant(String),
    /// `Class::NAME`; the class part is raw (`self`, `static`, `parent`, or a name).
    ClassConstant { class: String, name: String },
    /// `Class::class`
    ClassName(String),
    Magic(MagicConstant),
    /// Anything outside the constant grammar (calls, `new`, variables, …).
    Unsupported { kind: &'static str, source: String },
}

/// A `use` import inside a namespace block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportKind {
    Class,
    Function,
    Constant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UseImport {
    pub kind: ImportKind,
    /// Fully-qualified imported name without a leading `\`.
    pub name: String,
    /// The local alias (the last segment when no `as` clause is present).
    pub alias: String,
}

/// Extracted parameter information.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterNode {
    /// The parameter name WITHOUT the `$` prefix.
    pub name: String,
    pub position: usize,
    pub type_hint: Option<TypeHint>,
    pub default: Option<Expr>,
    /// Source text of the default value, used for string rendering.
    pub default_source: Option<String>,
    pub is_variadic: bool,
    pub is_reference: bool,
    /// Visibility when the parameter is a promoted constructor property.
    pub promoted: Option<Visibility>,
    pub is_readonly: bool,
    pub lines: LineSpan,
}

/// Modifiers shared by methods and functions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemberModifiers {
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_final: bool,
    pub is_readonly: bool,
}

/// A `static $var = …;` declaration at the top level of a function body.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticVariable {
    pub name: String,
    pub value: Option<Expr>,
}

/// A method or a standalone function.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionLikeNode {
    pub name: String,
    pub parameters: Vec<ParameterNode>,
    pub return_type: Option<TypeHint>,
    pub returns_reference: bool,
    pub modifiers: MemberModifiers,
    /// `false` for abstract and interface methods.
    pub has_body: bool,
    pub is_generator: bool,
    pub static_variables: Vec<StaticVariable>,
    pub doc_comment: Option<String>,
    pub lines: LineSpan,
}

/// A declared (or constructor-promoted) property.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyNode {
    /// The property name WITHOUT the `$` prefix.
    pub name: String,
    pub type_hint: Option<TypeHint>,
    pub default: Option<Expr>,
    pub default_source: Option<String>,
    pub modifiers: MemberModifiers,
    pub is_promoted: bool,
    pub doc_comment: Option<String>,
    pub lines: LineSpan,
}

/// A class constant or enum case.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassConstantNode {
    pub name: String,
    /// `None` only for pure (unbacked) enum cases.
    pub value: Option<Expr>,
    pub visibility: Visibility,
    pub is_final: bool,
    pub is_enum_case: bool,
    pub doc_comment: Option<String>,
    pub lines: LineSpan,
}

/// An `insteadof` rule inside a trait-use block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraitPrecedence {
    /// The trait that wins (raw name as written).
    pub trait_name: String,
    pub method_name: String,
    /// Traits whose version of the method is excluded.
    pub insteadof: Vec<String>,
}

/// An `as` rule inside a trait-use block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraitAlias {
    /// Raw trait name, when the rule is written `Trait::method as …`.
    pub trait_name: Option<String>,
    pub method_name: String,
    pub alias: Option<String>,
    pub visibility: Option<Visibility>,
}

/// A class-like declaration (class, interface, trait, or enum).
#[derive(Debug, Clone, PartialEq)]
pub struct ClassLikeNode {
    pub kind: ClassLikeKind,
    /// Short name as declared.
    pub name: String,
    pub is_abstract: bool,
    pub is_final: bool,
    pub is_readonly: bool,
    /// Raw `extends` name for classes.
    pub parent: Option<String>,
    /// Raw names from `implements` (classes, enums) or `extends` (interfaces).
    pub interfaces: Vec<String>,
    /// Raw names from `use` statements inside the body, in order.
    pub traits: Vec<String>,
    pub trait_precedences: Vec<TraitPrecedence>,
    pub trait_aliases: Vec<TraitAlias>,
    pub methods: Vec<FunctionLikeNode>,
    pub properties: Vec<PropertyNode>,
    pub constants: Vec<ClassConstantNode>,
    /// Backing type of a backed enum (`int` / `string`).
    pub enum_backing: Option<TypeHint>,
    pub doc_comment: Option<String>,
    pub lines: LineSpan,
}

/// A global or namespaced constant (`const X = …;` or `define('X', …)`).
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantNode {
    pub name: String,
    pub value: Expr,
    pub from_define: bool,
    pub doc_comment: Option<String>,
    pub lines: LineSpan,
}

/// One namespace block of a file.  Files without a `namespace` statement
/// have a single block with an empty name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamespaceNode {
    /// Namespace name without leading `\`; empty for the global namespace.
    pub name: String,
    pub imports: Vec<UseImport>,
    pub classes: Vec<ClassLikeNode>,
    pub functions: Vec<FunctionLikeNode>,
    pub constants: Vec<ConstantNode>,
    pub doc_comment: Option<String>,
    pub lines: LineSpan,
}

/// The owned syntax tree of one PHP file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileAst {
    pub path: PathBuf,
    pub strict_types: bool,
    pub namespaces: Vec<NamespaceNode>,
    pub line_count: u32,
}

impl FileAst {
    /// Iterate every class-like declaration together with its namespace.
    pub fn classes(&self) -> impl Iterator<Item = (&NamespaceNode, &ClassLikeNode)> {
        self.namespaces
            .iter()
            .flat_map(|ns| ns.classes.iter().map(move |c| (ns, c)))
    }

    /// Iterate every standalone function together with its namespace.
    pub fn functions(&self) -> impl Iterator<Item = (&NamespaceNode, &FunctionLikeNode)> {
        self.namespaces
            .iter()
            .flat_map(|ns| ns.functions.iter().map(move |f| (ns, f)))
    }
}

/// Join a namespace and a short name into a fully-qualified name.
pub fn qualify(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{}\\{}", namespace, name)
    }
}
