//! Declaration-level Go front end: a Logos lexer with semicolon insertion and
//! a recursive-descent parser that builds an arena AST of everything a
//! package exposes (types, method signatures, imports, doc comments).
//!
//! Function bodies and initializers are skipped, so the parser stays cheap
//! enough to run over every file of every imported package.

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod walk;

pub use error::{Diag, DiagKind, ParseFailure, Span};
pub use lexer::Lexer;
pub use parser::{leading_comments, parse_source, unquote, LineIndex, ParsedFile};
