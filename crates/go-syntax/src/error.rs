use thiserror::Error;

/// Compact byte-span used across the front end.
///
/// Offsets are stored as `u32`; inputs past 4GiB clamp instead of panicking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: u32,
    pub end: u32, // exclusive
}

#[inline]
const fn clamp(pos: usize) -> u32 {
    if pos > u32::MAX as usize {
        u32::MAX
    } else {
        pos as u32
    }
}

impl Span {
    #[inline]
    pub const fn new(start: usize, end: usize) -> Self {
        Self {
            start: clamp(start),
            end: clamp(end),
        }
    }

    #[inline]
    pub const fn empty_at(pos: usize) -> Self {
        let p = clamp(pos);
        Self { start: p, end: p }
    }

    #[inline]
    pub const fn single_at(pos: usize) -> Self {
        let p = clamp(pos);
        Self {
            start: p,
            end: p.saturating_add(1),
        }
    }

    pub const fn from_range(range: std::ops::Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }

    /// Smallest span covering both `self` and `other`.
    #[inline]
    pub const fn to(self, other: Span) -> Self {
        let start = if self.start < other.start {
            self.start
        } else {
            other.start
        };
        let end = if self.end > other.end {
            self.end
        } else {
            other.end
        };
        Self { start, end }
    }

    #[inline]
    pub const fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start as usize..self.end as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagKind {
    Lex,
    Parse,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diag {
    pub kind: DiagKind,
    pub span: Span,
    pub message: String,
}

impl Diag {
    pub fn parse(span: Span, message: impl Into<String>) -> Self {
        Self {
            kind: DiagKind::Parse,
            span,
            message: message.into(),
        }
    }
}

/// Returned when a file produced any diagnostic.
///
/// `partial` holds whatever the parser managed to build before and around the errors.
#[derive(Debug)]
pub struct ParseFailure {
    pub partial: Option<crate::parser::ParsedFile>,
    pub diags: Vec<Diag>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq, Default)]
pub enum LexErrorKind {
    #[default]
    #[error("invalid token")]
    InvalidToken,
    #[error("invalid character in numeric literal")]
    InvalidNumber,
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unterminated rune literal")]
    UnterminatedRune,
    #[error("unterminated comment")]
    UnterminatedComment,
    #[error("invalid BOM in the middle of the file")]
    MisplacedBom,
}

#[derive(Debug, Error, Clone, PartialEq, Eq, Default)]
#[error("{kind}: {span:?}")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub span: Span,
}

impl LexError {
    #[inline]
    pub fn diag(&self) -> Diag {
        Diag {
            kind: DiagKind::Lex,
            span: self.span,
            message: self.kind.to_string(),
        }
    }
}
