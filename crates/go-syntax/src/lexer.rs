use crate::error::{Diag, LexError, LexErrorKind, Span};
use logos::{Lexer as LogosLexer, Logos};
use memchr::{memchr, memchr3};
use std::ops::Range;

// =============================================================================
// 0. Helpers
// =============================================================================

#[inline(always)]
const fn first_newline_offset(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if matches!(bytes[i], b'\n' | b'\r') {
            return Some(i);
        }
        i += 1;
    }

    None
}

// =============================================================================
// 1. Callbacks for comments and quoted literals
// =============================================================================

#[inline]
fn lex_block_comment(lex: &mut LogosLexer<'_, RawTok>) -> Result<(), LexErrorKind> {
    let rem = lex.remainder().as_bytes();
    let mut search_start = 0;

    while let Some(star_pos) = memchr(b'*', &rem[search_start..]) {
        let abs_pos = search_start + star_pos;
        if rem.get(abs_pos + 1) == Some(&b'/') {
            lex.bump(abs_pos + 2);
            return Ok(());
        }
        search_start = abs_pos + 1;
    }

    lex.bump(rem.len());
    Err(LexErrorKind::UnterminatedComment)
}

/// Scans the body of a `"..."` or `'...'` literal after its opening quote.
///
/// Escapes are skipped, not validated; a newline or EOF before the closing
/// quote is an error and the token stops before the newline.
#[inline]
fn scan_quoted(rem: &[u8], quote: u8) -> Result<usize, usize> {
    let mut i = 0;
    while let Some(off) = memchr3(quote, b'\\', b'\n', &rem[i..]) {
        let at = i + off;
        match rem[at] {
            b'\\' => {
                if rem.get(at + 1) == Some(&b'\n') {
                    return Err(at + 1);
                }
                i = (at + 2).min(rem.len());
            }
            b'\n' => return Err(at),
            _ => return Ok(at + 1),
        }
    }
    Err(rem.len())
}

#[inline]
fn lex_string(lex: &mut LogosLexer<'_, RawTok>) -> Result<(), LexErrorKind> {
    match scan_quoted(lex.remainder().as_bytes(), b'"') {
        Ok(n) => {
            lex.bump(n);
            Ok(())
        }
        Err(n) => {
            lex.bump(n);
            Err(LexErrorKind::UnterminatedString)
        }
    }
}

#[inline]
fn lex_rune(lex: &mut LogosLexer<'_, RawTok>) -> Result<(), LexErrorKind> {
    match scan_quoted(lex.remainder().as_bytes(), b'\'') {
        Ok(n) => {
            lex.bump(n);
            Ok(())
        }
        Err(n) => {
            lex.bump(n);
            Err(LexErrorKind::UnterminatedRune)
        }
    }
}

#[inline]
fn lex_raw_string(lex: &mut LogosLexer<'_, RawTok>) -> Result<(), LexErrorKind> {
    let rem = lex.remainder().as_bytes();
    match memchr(b'`', rem) {
        Some(end) => {
            lex.bump(end + 1);
            Ok(())
        }
        None => {
            lex.bump(rem.len());
            Err(LexErrorKind::UnterminatedString)
        }
    }
}

// =============================================================================
// 2. Numbers: maximal munch, then a light shape check
// =============================================================================

mod num {
    use super::*;

    /// Extends the token over every byte that can belong to a Go numeric literal.
    ///
    /// A sign is only taken right after an exponent marker (`e` for decimal,
    /// `p` for hex) and a second `.` ends the literal, so `x[1:]` and `0x1e+2`
    /// split where Go splits them.
    #[inline]
    pub fn lex_number(lex: &mut LogosLexer<'_, RawTok>) -> Result<(), LexErrorKind> {
        let src = lex.source().as_bytes();
        let start = lex.span().start;
        let n = src.len();

        let is_hex = src.get(start) == Some(&b'0')
            && matches!(src.get(start + 1), Some(b'x') | Some(b'X'));

        let mut i = start;
        let mut seen_dot = false;
        let mut seen_exp = false;
        while i < n {
            let b = src[i];
            let exp_marker = if is_hex { b'p' } else { b'e' };
            let take = match b {
                b'0'..=b'9' | b'_' => true,
                b'.' => {
                    let ok = !seen_dot && !seen_exp && src.get(i + 1) != Some(&b'.');
                    seen_dot |= ok;
                    ok
                }
                b'+' | b'-' => i > start && (src[i - 1] | 0x20) == exp_marker,
                b if b.is_ascii_alphabetic() => {
                    if (b | 0x20) == exp_marker && i > start {
                        seen_exp = true;
                    }
                    true
                }
                _ => false,
            };
            if !take {
                break;
            }
            i += 1;
        }

        let already = lex.span().end;
        if i > already {
            lex.bump(i - already);
        }

        if is_well_formed(&src[start..i]) {
            Ok(())
        } else {
            Err(LexErrorKind::InvalidNumber)
        }
    }

    fn is_well_formed(lit: &[u8]) -> bool {
        let body = lit.strip_suffix(b"i").unwrap_or(lit);
        if body.is_empty() || body.ends_with(b"_") || body.windows(2).any(|w| w == b"__") {
            return false;
        }

        let (digits, allowed): (&[u8], fn(u8) -> bool) = match body {
            [b'0', b'x' | b'X', rest @ ..] => (rest, hex_body),
            [b'0', b'b' | b'B', rest @ ..] => (rest, bin_body),
            [b'0', b'o' | b'O', rest @ ..] => (rest, oct_body),
            _ => (body, dec_body),
        };

        !digits.is_empty() && digits.iter().all(|&b| allowed(b))
    }

    fn hex_body(b: u8) -> bool {
        b.is_ascii_hexdigit() || matches!(b, b'_' | b'.' | b'p' | b'P' | b'+' | b'-')
    }

    fn bin_body(b: u8) -> bool {
        matches!(b, b'0' | b'1' | b'_')
    }

    fn oct_body(b: u8) -> bool {
        matches!(b, b'0'..=b'7' | b'_')
    }

    fn dec_body(b: u8) -> bool {
        b.is_ascii_digit() || matches!(b, b'_' | b'.' | b'e' | b'E' | b'+' | b'-')
    }
}

// =============================================================================
// 3. Token Definition (RawTok)
// =============================================================================

#[repr(u8)]
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(error = LexErrorKind)]
#[logos(skip r"[ \t\f]+")]
#[rustfmt::skip]
enum RawTok {
    #[token("\u{FEFF}")] Bom,

    // Trivia
    #[regex(r"\r\n|\n|\r")] Newline,
    #[regex(r"//[^\n\r]*", allow_greedy = true)] LineComment,
    #[token("/*", lex_block_comment)] BlockComment,

    // Keywords (before Ident)
    #[token("break")] KwBreak,
    #[token("case")] KwCase,
    #[token("chan")] KwChan,
    #[token("const")] KwConst,
    #[token("continue")] KwContinue,
    #[token("default")] KwDefault,
    #[token("defer")] KwDefer,
    #[token("else")] KwElse,
    #[token("fallthrough")] KwFallthrough,
    #[token("for")] KwFor,
    #[token("func")] KwFunc,
    #[token("go")] KwGo,
    #[token("goto")] KwGoto,
    #[token("if")] KwIf,
    #[token("import")] KwImport,
    #[token("interface")] KwInterface,
    #[token("map")] KwMap,
    #[token("package")] KwPackage,
    #[token("range")] KwRange,
    #[token("return")] KwReturn,
    #[token("select")] KwSelect,
    #[token("struct")] KwStruct,
    #[token("switch")] KwSwitch,
    #[token("type")] KwType,
    #[token("var")] KwVar,

    #[regex(r"[_\p{L}][_\p{L}\p{Nd}]*")] Ident,

    #[regex(r"[0-9]|\.[0-9]", num::lex_number)] Number,

    #[token("`", lex_raw_string)] RawString,
    #[token("\"", lex_string)] String,
    #[token("'", lex_rune)] Rune,

    // Operators the declaration parser looks at
    #[token("...")] Ellipsis,
    #[token("<-")] Arrow,
    #[token("=")] Assign,
    #[token("*")] Star,
    #[token("~")] Tilde,
    #[token("|")] Pipe,
    #[token("++")] #[token("--")] IncDec,

    // Everything else is opaque to declarations
    #[token("<<=")] #[token(">>=")] #[token("&^=")]
    #[token("+=")] #[token("-=")] #[token("*=")] #[token("/=")] #[token("%=")]
    #[token("&=")] #[token("|=")] #[token("^=")]
    #[token("<<")] #[token(">>")] #[token("&^")] #[token("&&")] #[token("||")]
    #[token("==")] #[token("!=")] #[token("<=")] #[token(">=")] #[token(":=")]
    #[token("+")] #[token("-")] #[token("/")] #[token("%")] #[token("&")]
    #[token("^")] #[token("!")] #[token("<")] #[token(">")]
    Op,

    // Delimiters
    #[token("(")] LParen,
    #[token(")")] RParen,
    #[token("[")] LBrack,
    #[token("]")] RBrack,
    #[token("{")] LBrace,
    #[token("}")] RBrace,
    #[token(",")] Comma,
    #[token(";")] Semi,
    #[token(":")] Colon,
    #[token(".")] Dot,

    // Catch-all (lowest priority)
    #[regex(r".", priority = 0)] Error,
}

// =============================================================================
// 4. Lookup tables
// =============================================================================

macro_rules! gen_lookup_table {
    (bool, $size:expr, $($variant:ident),* $(,)?) => {{
        let mut table = [false; $size];
        $(table[RawTok::$variant as usize] = true;)*
        table
    }};
}

const SEMI_INSERT_TABLE: [bool; 256] = gen_lookup_table!(
    bool,
    256,
    Ident,
    Number,
    Rune,
    String,
    RawString,
    KwBreak,
    KwContinue,
    KwFallthrough,
    KwReturn,
    IncDec,
    RParen,
    RBrack,
    RBrace,
);

impl RawTok {
    #[inline(always)]
    const fn can_insert_semicolon(self) -> bool {
        SEMI_INSERT_TABLE[self as usize]
    }

    #[rustfmt::skip]
    fn to_token(self, slice: &str) -> Tok<'_> {
        match self {
            Self::Ident => Tok::Ident(slice),
            Self::Number => Tok::Number(slice),
            Self::Rune => Tok::Rune(slice),
            Self::String => Tok::String(slice),
            Self::RawString => Tok::RawString(slice),
            Self::IncDec | Self::Op => Tok::Op(slice),

            Self::KwBreak => Tok::KwBreak, Self::KwCase => Tok::KwCase, Self::KwChan => Tok::KwChan,
            Self::KwConst => Tok::KwConst, Self::KwContinue => Tok::KwContinue,
            Self::KwDefault => Tok::KwDefault, Self::KwDefer => Tok::KwDefer, Self::KwElse => Tok::KwElse,
            Self::KwFallthrough => Tok::KwFallthrough, Self::KwFor => Tok::KwFor, Self::KwFunc => Tok::KwFunc,
            Self::KwGo => Tok::KwGo, Self::KwGoto => Tok::KwGoto, Self::KwIf => Tok::KwIf,
            Self::KwImport => Tok::KwImport, Self::KwInterface => Tok::KwInterface, Self::KwMap => Tok::KwMap,
            Self::KwPackage => Tok::KwPackage, Self::KwRange => Tok::KwRange, Self::KwReturn => Tok::KwReturn,
            Self::KwSelect => Tok::KwSelect, Self::KwStruct => Tok::KwStruct, Self::KwSwitch => Tok::KwSwitch,
            Self::KwType => Tok::KwType, Self::KwVar => Tok::KwVar,

            Self::Ellipsis => Tok::Ellipsis, Self::Arrow => Tok::Arrow, Self::Assign => Tok::Assign,
            Self::Star => Tok::Star, Self::Tilde => Tok::Tilde, Self::Pipe => Tok::Pipe,

            Self::LParen => Tok::LParen, Self::RParen => Tok::RParen, Self::LBrack => Tok::LBrack,
            Self::RBrack => Tok::RBrack, Self::LBrace => Tok::LBrace, Self::RBrace => Tok::RBrace,
            Self::Comma => Tok::Comma, Self::Semi => Tok::Semi, Self::Colon => Tok::Colon, Self::Dot => Tok::Dot,

            // trivia and BOM never reach here; the wrapper handles them
            Self::Bom | Self::Newline | Self::LineComment | Self::BlockComment | Self::Error => Tok::Error,
        }
    }
}

// =============================================================================
// 5. Public tokens and comments (zero-copy)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tok<'input> {
    Ident(&'input str),
    Number(&'input str),
    Rune(&'input str),
    /// Interpreted string literal, quotes included.
    String(&'input str),
    /// Raw string literal, backquotes included.
    RawString(&'input str),

    // Keywords
    KwBreak,
    KwCase,
    KwChan,
    KwConst,
    KwContinue,
    KwDefault,
    KwDefer,
    KwElse,
    KwFallthrough,
    KwFor,
    KwFunc,
    KwGo,
    KwGoto,
    KwIf,
    KwImport,
    KwInterface,
    KwMap,
    KwPackage,
    KwRange,
    KwReturn,
    KwSelect,
    KwStruct,
    KwSwitch,
    KwType,
    KwVar,

    Ellipsis,
    Arrow,
    Assign,
    Star,
    Tilde,
    Pipe,
    /// Any operator declarations never inspect (`+`, `:=`, `&&`, ...).
    Op(&'input str),

    LParen,
    RParen,
    LBrack,
    RBrack,
    LBrace,
    RBrace,
    Comma,
    Semi,
    Colon,
    Dot,

    Error,
}

impl<'input> std::fmt::Display for Tok<'input> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tok::Ident(s)
            | Tok::Number(s)
            | Tok::Rune(s)
            | Tok::String(s)
            | Tok::RawString(s)
            | Tok::Op(s) => f.write_str(s),
            Tok::Semi => f.write_str("';'"),
            other => write!(f, "{other:?}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentKind {
    Line,
    Block,
}

/// A comment seen while lexing; its text is `&src[span.range()]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Comment {
    pub kind: CommentKind,
    pub span: Span,
}

// =============================================================================
// 6. Lexer wrapper: semicolon insertion, comment capture, diags
// =============================================================================

pub struct Lexer<'src> {
    logos: LogosLexer<'src, RawTok>,
    pending: Option<(usize, Tok<'src>, usize)>,
    diags: Vec<Diag>,
    comments: Vec<Comment>,
    last_can_insert_semi: bool,
    src_len: usize,
    eof_done: bool,
}

impl<'src> Lexer<'src> {
    pub fn new(input: &'src str) -> Self {
        Self {
            logos: RawTok::lexer(input),
            pending: None,
            diags: Vec::with_capacity(4),
            comments: Vec::new(),
            last_can_insert_semi: false,
            src_len: input.len(),
            eof_done: false,
        }
    }

    pub fn take_diags(&mut self) -> Vec<Diag> {
        std::mem::take(&mut self.diags)
    }

    /// Comments seen so far, in source order.
    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn take_comments(&mut self) -> Vec<Comment> {
        std::mem::take(&mut self.comments)
    }

    #[inline]
    fn push_lex_diag(&mut self, kind: LexErrorKind, span: Range<usize>) {
        let span = Span::from_range(span);
        self.diags.push(LexError { kind, span }.diag());
    }

    #[inline]
    fn emit_semi_at(&mut self, pos: usize) {
        self.pending = Some((pos, Tok::Semi, pos));
    }

    #[inline]
    fn handle_trivia(&mut self, raw: RawTok, span: &Range<usize>, slice: &str) -> bool {
        match raw {
            RawTok::Newline => {
                if self.last_can_insert_semi {
                    self.last_can_insert_semi = false;
                    self.emit_semi_at(span.start);
                }
                true
            }
            RawTok::LineComment => {
                self.comments.push(Comment {
                    kind: CommentKind::Line,
                    span: Span::from_range(span.clone()),
                });
                true
            }
            RawTok::BlockComment => {
                self.comments.push(Comment {
                    kind: CommentKind::Block,
                    span: Span::from_range(span.clone()),
                });
                if self.last_can_insert_semi {
                    if let Some(off) = first_newline_offset(slice) {
                        self.last_can_insert_semi = false;
                        self.emit_semi_at(span.start + off);
                    }
                }
                true
            }
            _ => false,
        }
    }

    #[inline]
    fn handle_eof(&mut self) {
        self.eof_done = true;
        if self.last_can_insert_semi {
            self.last_can_insert_semi = false;
            self.emit_semi_at(self.src_len);
        }
    }

    #[inline]
    fn handle_lex_error(&mut self, kind: LexErrorKind) -> (usize, Tok<'src>, usize) {
        let span = self.logos.span();
        // an unterminated block comment is still a comment
        if kind == LexErrorKind::UnterminatedComment {
            self.comments.push(Comment {
                kind: CommentKind::Block,
                span: Span::from_range(span.clone()),
            });
        }
        self.push_lex_diag(kind, span.clone());
        self.last_can_insert_semi = false;
        (span.start, Tok::Error, span.end)
    }

    #[inline]
    fn handle_raw_token(&mut self, raw: RawTok) -> Option<(usize, Tok<'src>, usize)> {
        let span = self.logos.span();
        let slice = self.logos.slice();

        if raw == RawTok::Bom {
            if span.start == 0 {
                return None;
            }
            self.push_lex_diag(LexErrorKind::MisplacedBom, span.clone());
            self.last_can_insert_semi = false;
            return Some((span.start, Tok::Error, span.end));
        }

        if self.handle_trivia(raw, &span, slice) {
            return None;
        }

        if raw == RawTok::Error {
            self.push_lex_diag(LexErrorKind::InvalidToken, span.clone());
            self.last_can_insert_semi = false;
            return Some((span.start, Tok::Error, span.end));
        }

        self.last_can_insert_semi = raw.can_insert_semicolon();
        Some((span.start, raw.to_token(slice), span.end))
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = (usize, Tok<'src>, usize);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(tok) = self.pending.take() {
                return Some(tok);
            }

            if self.eof_done {
                return None;
            }

            match self.logos.next() {
                // don't return yet; a pending ';' may still be queued
                None => self.handle_eof(),
                Some(Err(kind)) => return Some(self.handle_lex_error(kind)),
                Some(Ok(raw)) => {
                    if let Some(item) = self.handle_raw_token(raw) {
                        return Some(item);
                    }
                }
            }
        }
    }
}
