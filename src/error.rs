use std::path::PathBuf;

use thiserror::Error;

use crate::types::Position;

/// Failures while locating, parsing or resolving packages. All are fatal.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("cannot find package {path:?} (searched from {from})")]
    NotFound { path: String, from: PathBuf },

    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}:{line}: {message}")]
    GoMod {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("no buildable Go source files in {dir}")]
    NoGoFiles { dir: PathBuf },

    #[error("found packages {first} and {second} in {dir}")]
    MultiplePackages {
        dir: PathBuf,
        first: String,
        second: String,
    },

    #[error("{pos}: {message}")]
    Syntax { pos: Position, message: String },

    #[error("import cycle not allowed: {}", .0.join(" -> "))]
    ImportCycle(Vec<String>),

    #[error("{pos}: undefined: {name}")]
    Undefined { pos: Position, name: String },

    #[error("{pos}: {name} is not a type")]
    NotAType { pos: Position, name: String },

    #[error("{pos}: name {name} not exported by package {pkg}")]
    Unexported {
        pos: Position,
        name: String,
        pkg: String,
    },

    #[error("{pos}: {name} redeclared in this block")]
    Redeclared { pos: Position, name: String },

    #[error("{pos}: cannot define new methods on non-local type {name}")]
    InvalidReceiver { pos: Position, name: String },
}

/// Fatal failures of a generation run.
#[derive(Error, Debug)]
pub enum GenError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("type {name} not found in {pkg}")]
    NotFound { name: String, pkg: String },

    #[error("{name} is not a type")]
    NotAType { name: String },

    #[error("duplicate package name {name}: {path} vs {existing}")]
    AliasCollision {
        name: String,
        path: String,
        existing: String,
    },

    #[error("cannot render client source")]
    Render(#[from] std::fmt::Error),

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Why one method does not fit the calling convention. Never fatal: the
/// method is skipped and the run goes on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("wrong argument count")]
    ArgumentCount,

    #[error("parameter is not a pointer")]
    NotPointer,

    #[error("parameter is {0}, not a pointer to struct")]
    NotStructPointer(String),

    #[error("parameter is {0}, a literal struct type")]
    LiteralParameter(String),

    #[error("parameter type {0} comes from a package that could not be loaded")]
    OpaqueParameter(String),

    #[error("wrong result count")]
    ResultCount,

    #[error("second result is {0}, not error")]
    SecondResult(String),

    #[error("response is {0}, a literal type")]
    LiteralResponse(String),
}

pub type Result<T> = std::result::Result<T, GenError>;
