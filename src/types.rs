//! Semantic model of loaded packages.
//!
//! Everything the loader resolves ends up in one immutable [`Program`]
//! snapshot that the analysis passes borrow. Types are plain owned trees;
//! named types refer to their declaration by package path and name and are
//! looked up through the program when their underlying type is needed.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::convert::Infallible;
use std::fmt;
use std::path::PathBuf;

/// Predeclared type names.
const UNIVERSE: &[&str] = &[
    "any",
    "bool",
    "byte",
    "comparable",
    "complex64",
    "complex128",
    "error",
    "float32",
    "float64",
    "int",
    "int8",
    "int16",
    "int32",
    "int64",
    "rune",
    "string",
    "uint",
    "uint8",
    "uint16",
    "uint32",
    "uint64",
    "uintptr",
];

/// `unsafe.Pointer`. Kept as a basic type, but written through the
/// qualifier like any other package member.
pub const UNSAFE_POINTER: &str = "unsafe.Pointer";

pub const UNSAFE_PKG: &str = "unsafe";

pub fn universe_type(name: &str) -> Option<Type> {
    UNIVERSE
        .iter()
        .find(|&&n| n == name)
        .map(|&n| Type::Basic(n))
}

/// Guesses a package's name from its import path the way Go tooling does:
/// the last element, skipping a trailing `vN` element, minus a `go-` prefix,
/// cut at the first character that cannot appear in an identifier.
///
/// ```
/// use goclientgen::types::assumed_package_name;
/// assert_eq!(assumed_package_name("gopkg.in/httprequest.v1"), "httprequest");
/// assert_eq!(assumed_package_name("github.com/a/go-yaml/v3"), "yaml");
/// ```
pub fn assumed_package_name(path: &str) -> &str {
    let mut elems = path.rsplit('/');
    let mut base = elems.next().unwrap_or(path);
    let is_major = base
        .strip_prefix('v')
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()));
    if is_major {
        if let Some(parent) = elems.next() {
            base = parent;
        }
    }
    let base = base.strip_prefix("go-").unwrap_or(base);
    let end = base
        .char_indices()
        .find(|&(_, c)| !(c.is_alphanumeric() || c == '_'))
        .map_or(base.len(), |(i, _)| i);
    &base[..end]
}

// =============================================================================
// Types
// =============================================================================

/// A package as seen from a type reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PkgRef {
    pub path: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamedType {
    pub pkg: PkgRef,
    pub name: String,
    pub args: Vec<Type>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Param {
    pub name: Option<String>,
    pub typ: Type,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Signature {
    pub params: Vec<Param>,
    pub results: Vec<Param>,
    /// The last parameter was declared `...T`; its type is stored as `[]T`.
    pub variadic: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructField {
    pub name: String,
    pub typ: Type,
    pub embedded: bool,
    pub tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InterfaceMethod {
    pub name: String,
    pub sig: Signature,
    pub doc: Option<String>,
    pub pos: Position,
}

/// Interface literal. Type-set elements (`~int | string`) carry no methods and
/// are not kept.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct InterfaceType {
    pub methods: Vec<InterfaceMethod>,
    pub embeds: Vec<Type>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// Predeclared type (`int`, `error`, `any`, ...) or `unsafe.Pointer`.
    Basic(&'static str),
    Named(NamedType),
    /// Type parameter of the enclosing declaration.
    TypeParam(String),
    Pointer(Box<Type>),
    Slice(Box<Type>),
    /// `[N]T`; the length expression is kept as written.
    Array(String, Box<Type>),
    Map(Box<Type>, Box<Type>),
    Chan(ChanDir, Box<Type>),
    Func(Box<Signature>),
    Struct(Vec<StructField>),
    Interface(Box<InterfaceType>),
}

impl Type {
    pub fn pointer(elem: Type) -> Self {
        Type::Pointer(Box::new(elem))
    }

    pub fn as_named(&self) -> Option<&NamedType> {
        match self {
            Type::Named(n) => Some(n),
            _ => None,
        }
    }

    /// Replaces type parameters by the types bound to them.
    pub fn subst(&self, map: &HashMap<String, Type>) -> Type {
        if map.is_empty() {
            return self.clone();
        }
        let boxed = |t: &Type| Box::new(t.subst(map));
        match self {
            Type::TypeParam(name) => map.get(name).cloned().unwrap_or_else(|| self.clone()),
            Type::Basic(_) => self.clone(),
            Type::Named(n) => Type::Named(NamedType {
                pkg: n.pkg.clone(),
                name: n.name.clone(),
                args: n.args.iter().map(|a| a.subst(map)).collect(),
            }),
            Type::Pointer(t) => Type::Pointer(boxed(t)),
            Type::Slice(t) => Type::Slice(boxed(t)),
            Type::Array(len, t) => Type::Array(len.clone(), boxed(t)),
            Type::Map(k, v) => Type::Map(boxed(k), boxed(v)),
            Type::Chan(dir, t) => Type::Chan(*dir, boxed(t)),
            Type::Func(sig) => Type::Func(Box::new(sig.subst(map))),
            Type::Struct(fields) => Type::Struct(
                fields
                    .iter()
                    .map(|f| StructField {
                        typ: f.typ.subst(map),
                        ..f.clone()
                    })
                    .collect(),
            ),
            Type::Interface(it) => Type::Interface(Box::new(InterfaceType {
                methods: it
                    .methods
                    .iter()
                    .map(|m| InterfaceMethod {
                        sig: m.sig.subst(map),
                        ..m.clone()
                    })
                    .collect(),
                embeds: it.embeds.iter().map(|e| e.subst(map)).collect(),
            })),
        }
    }
}

impl Signature {
    pub fn subst(&self, map: &HashMap<String, Type>) -> Signature {
        let params = |ps: &[Param]| {
            ps.iter()
                .map(|p| Param {
                    name: p.name.clone(),
                    typ: p.typ.subst(map),
                })
                .collect()
        };
        Signature {
            params: params(&self.params),
            results: params(&self.results),
            variadic: self.variadic,
        }
    }
}

// =============================================================================
// Type strings
// =============================================================================

/// Decides how a package prefix is written in a type string.
///
/// Returning an empty string drops the prefix entirely.
pub trait Qualifier {
    type Error;

    fn qualify(&mut self, pkg: &PkgRef) -> Result<String, Self::Error>;
}

/// Qualifies every type by its full import path, as diagnostics print them.
pub struct FullPath;

impl Qualifier for FullPath {
    type Error = Infallible;

    fn qualify(&mut self, pkg: &PkgRef) -> Result<String, Infallible> {
        Ok(pkg.path.clone())
    }
}

/// Writes `t` in Go syntax. Packages are qualified in pre-order: an outer
/// named type before its type arguments, a map key before its value.
pub fn write_type<Q: Qualifier>(out: &mut String, t: &Type, q: &mut Q) -> Result<(), Q::Error> {
    match t {
        Type::Basic(name) if *name == UNSAFE_POINTER => {
            let prefix = q.qualify(&PkgRef {
                path: UNSAFE_PKG.to_string(),
                name: UNSAFE_PKG.to_string(),
            })?;
            if !prefix.is_empty() {
                out.push_str(&prefix);
                out.push('.');
            }
            out.push_str("Pointer");
        }
        Type::Basic(name) => out.push_str(name),
        Type::TypeParam(name) => out.push_str(name),
        Type::Named(n) => {
            let prefix = q.qualify(&n.pkg)?;
            if !prefix.is_empty() {
                out.push_str(&prefix);
                out.push('.');
            }
            out.push_str(&n.name);
            if !n.args.is_empty() {
                out.push('[');
                for (i, arg) in n.args.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    write_type(out, arg, q)?;
                }
                out.push(']');
            }
        }
        Type::Pointer(elem) => {
            out.push('*');
            write_type(out, elem, q)?;
        }
        Type::Slice(elem) => {
            out.push_str("[]");
            write_type(out, elem, q)?;
        }
        Type::Array(len, elem) => {
            out.push('[');
            out.push_str(len);
            out.push(']');
            write_type(out, elem, q)?;
        }
        Type::Map(key, val) => {
            out.push_str("map[");
            write_type(out, key, q)?;
            out.push(']');
            write_type(out, val, q)?;
        }
        Type::Chan(dir, elem) => {
            let parens = *dir == ChanDir::Both && matches!(**elem, Type::Chan(ChanDir::Recv, _));
            out.push_str(match dir {
                ChanDir::Both => "chan ",
                ChanDir::Send => "chan<- ",
                ChanDir::Recv => "<-chan ",
            });
            if parens {
                out.push('(');
            }
            write_type(out, elem, q)?;
            if parens {
                out.push(')');
            }
        }
        Type::Func(sig) => {
            out.push_str("func");
            write_signature(out, sig, q)?;
        }
        Type::Struct(fields) => {
            out.push_str("struct{");
            for (i, f) in fields.iter().enumerate() {
                if i > 0 {
                    out.push_str("; ");
                }
                if !f.embedded {
                    out.push_str(&f.name);
                    out.push(' ');
                }
                write_type(out, &f.typ, q)?;
                if let Some(tag) = &f.tag {
                    out.push(' ');
                    write_go_quoted(out, tag);
                }
            }
            out.push('}');
        }
        Type::Interface(it) => {
            out.push_str("interface{");
            let mut first = true;
            for m in &it.methods {
                if !first {
                    out.push_str("; ");
                }
                first = false;
                out.push_str(&m.name);
                write_signature(out, &m.sig, q)?;
            }
            for e in &it.embeds {
                if !first {
                    out.push_str("; ");
                }
                first = false;
                write_type(out, e, q)?;
            }
            out.push('}');
        }
    }
    Ok(())
}

/// Writes `(params) results` without the leading `func`.
pub fn write_signature<Q: Qualifier>(
    out: &mut String,
    sig: &Signature,
    q: &mut Q,
) -> Result<(), Q::Error> {
    write_params(out, &sig.params, sig.variadic, q)?;
    match sig.results.as_slice() {
        [] => {}
        [Param { name: None, typ }] => {
            out.push(' ');
            write_type(out, typ, q)?;
        }
        results => {
            out.push(' ');
            write_params(out, results, false, q)?;
        }
    }
    Ok(())
}

fn write_params<Q: Qualifier>(
    out: &mut String,
    params: &[Param],
    variadic: bool,
    q: &mut Q,
) -> Result<(), Q::Error> {
    out.push('(');
    for (i, p) in params.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        if let Some(name) = &p.name {
            out.push_str(name);
            out.push(' ');
        }
        match (&p.typ, variadic && i + 1 == params.len()) {
            (Type::Slice(elem), true) => {
                out.push_str("...");
                write_type(out, elem, q)?;
            }
            (typ, _) => write_type(out, typ, q)?,
        }
    }
    out.push(')');
    Ok(())
}

/// Writes `s` as a Go interpreted string literal, escaped the way
/// `strconv.Quote` does.
pub fn write_go_quoted(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '\u{07}' => out.push_str("\\a"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0b}' => out.push_str("\\v"),
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c if c.is_control() || matches!(c, '\u{ad}' | '\u{feff}' | '\u{2028}' | '\u{2029}') => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = String::new();
        match write_type(&mut s, self, &mut FullPath) {
            Ok(()) => f.write_str(&s),
            Err(never) => match never {},
        }
    }
}

// =============================================================================
// Declarations
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Position {
    pub file: PathBuf,
    pub line: u32,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.line)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub name: String,
    pub type_params: Vec<String>,
    /// `type A = B`: the declaration is a second name for `rhs`.
    pub alias: bool,
    pub rhs: Type,
    pub doc: Option<String>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecl {
    pub name: String,
    /// Receiver type parameter names, bound positionally to the base type's.
    pub recv_type_params: Vec<String>,
    pub pointer_recv: bool,
    pub sig: Signature,
    pub doc: Option<String>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Object {
    Type(TypeDecl),
    Const(Position),
    Var(Position),
    Func(Position),
}

impl Object {
    pub fn kind(&self) -> &'static str {
        match self {
            Object::Type(_) => "type",
            Object::Const(_) => "constant",
            Object::Var(_) => "variable",
            Object::Func(_) => "function",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageKind {
    /// Parsed from source.
    Source,
    /// Could not be located; its types are known by name only.
    Opaque,
}

#[derive(Debug, Clone)]
pub struct Package {
    pub path: String,
    pub name: String,
    pub dir: Option<PathBuf>,
    pub kind: PackageKind,
    pub scope: BTreeMap<String, Object>,
    /// Declared methods keyed by receiver base type name, in source order.
    pub methods: HashMap<String, Vec<MethodDecl>>,
    /// Import paths referenced by the package's files.
    pub imports: BTreeSet<String>,
}

impl Package {
    pub fn opaque(path: &str, name: &str) -> Self {
        Package {
            path: path.to_string(),
            name: name.to_string(),
            dir: None,
            kind: PackageKind::Opaque,
            scope: BTreeMap::new(),
            methods: HashMap::new(),
            imports: BTreeSet::new(),
        }
    }

    pub fn as_ref(&self) -> PkgRef {
        PkgRef {
            path: self.path.clone(),
            name: self.name.clone(),
        }
    }

    pub fn type_decl(&self, name: &str) -> Option<&TypeDecl> {
        match self.scope.get(name)? {
            Object::Type(decl) => Some(decl),
            _ => None,
        }
    }

    pub fn methods_of(&self, type_name: &str) -> &[MethodDecl] {
        self.methods.get(type_name).map_or(&[], Vec::as_slice)
    }
}

/// Every package one generation run loaded, keyed by import path.
#[derive(Debug, Clone, Default)]
pub struct Program {
    packages: BTreeMap<String, Package>,
}

/// Bound on alias and named-type chains; Go rejects cycles, broken input must not hang.
const MAX_CHAIN: usize = 64;

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pkg: Package) {
        self.packages.insert(pkg.path.clone(), pkg);
    }

    pub fn package(&self, path: &str) -> Option<&Package> {
        self.packages.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.packages.contains_key(path)
    }

    pub fn packages(&self) -> impl Iterator<Item = &Package> {
        self.packages.values()
    }

    pub fn is_opaque(&self, pkg: &PkgRef) -> bool {
        self.package(&pkg.path)
            .map_or(true, |p| p.kind == PackageKind::Opaque)
    }

    pub fn decl_of(&self, named: &NamedType) -> Option<&TypeDecl> {
        self.package(&named.pkg.path)?.type_decl(&named.name)
    }

    /// Right-hand side of a named type's declaration with its arguments substituted.
    fn expand(&self, named: &NamedType) -> Option<(bool, Type)> {
        let decl = self.decl_of(named)?;
        let map: HashMap<String, Type> = decl
            .type_params
            .iter()
            .cloned()
            .zip(named.args.iter().cloned())
            .collect();
        Some((decl.alias, decl.rhs.subst(&map)))
    }

    /// Follows alias declarations until a non-alias type is reached.
    pub fn unalias(&self, t: &Type) -> Type {
        let mut cur = t.clone();
        for _ in 0..MAX_CHAIN {
            let Type::Named(named) = &cur else { break };
            match self.expand(named) {
                Some((true, rhs)) => cur = rhs,
                _ => break,
            }
        }
        cur
    }

    /// The structural type behind any chain of named types and aliases.
    ///
    /// Named types from opaque packages stay as they are.
    pub fn underlying(&self, t: &Type) -> Type {
        let mut cur = t.clone();
        for _ in 0..MAX_CHAIN {
            match &cur {
                Type::Named(named) => match self.expand(named) {
                    Some((_, rhs)) => cur = rhs,
                    None => break,
                },
                Type::Basic("error") => return error_interface(),
                Type::Basic("any" | "comparable") => {
                    return Type::Interface(Box::default());
                }
                _ => break,
            }
        }
        cur
    }
}

/// `interface{ Error() string }`
pub fn error_interface() -> Type {
    Type::Interface(Box::new(InterfaceType {
        methods: vec![InterfaceMethod {
            name: "Error".to_string(),
            sig: Signature {
                params: Vec::new(),
                results: vec![Param {
                    name: None,
                    typ: Type::Basic("string"),
                }],
                variadic: false,
            },
            doc: None,
            pos: Position::default(),
        }],
        embeds: Vec::new(),
    }))
}
