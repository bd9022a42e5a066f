//! Recursive-descent parser for Go declarations.
//!
//! The parser works over the fully lexed token vector so it can look a few
//! tokens ahead to settle Go's two syntactic ambiguities at declaration level:
//! `Name[` (generic parameters/arguments vs. array) and parameter lists whose
//! entries are either names or types.

use std::collections::HashMap;

use memchr::memchr_iter;

use crate::ast::*;
use crate::error::{Diag, ParseFailure, Span};
use crate::lexer::{Comment as LexComment, Lexer, Tok};

type Spanned<'src> = (usize, Tok<'src>, usize);

/// Marker for "a diagnostic was recorded, unwind to the nearest declaration".
#[derive(Debug)]
struct Bail;

type PResult<T> = Result<T, Bail>;

// =============================================================================
// Results
// =============================================================================

/// Maps byte offsets to 1-based line numbers.
#[derive(Debug, Clone)]
pub struct LineIndex {
    starts: Vec<u32>,
}

impl LineIndex {
    pub fn new(src: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(memchr_iter(b'\n', src.as_bytes()).map(|i| (i + 1) as u32))
            .collect();
        Self { starts }
    }

    #[inline]
    pub fn line(&self, offset: u32) -> u32 {
        self.starts.partition_point(|&s| s <= offset) as u32
    }
}

/// A parsed file together with everything needed to read names and text back out.
#[derive(Debug)]
pub struct ParsedFile {
    pub source: String,
    pub arena: AstArena,
    pub interner: Interner,
    pub file: SourceFile,
    pub lines: LineIndex,
}

impl ParsedFile {
    #[inline]
    pub fn text(&self, span: Span) -> &str {
        self.source.get(span.range()).unwrap_or("")
    }

    #[inline]
    pub fn name(&self, ident: IdentName) -> &str {
        self.interner.resolve(ident.sym)
    }

    #[inline]
    pub fn line(&self, span: Span) -> u32 {
        self.lines.line(span.start)
    }

    pub fn package_name(&self) -> &str {
        self.name(self.file.name)
    }

    /// Raw text of every comment in the group (markers included), one per line.
    pub fn comment_text(&self, group: CommentGroupId) -> String {
        let ids = self
            .arena
            .comment_ids(self.arena.comment_groups[group].comments);
        let mut out = String::new();
        for (i, &id) in ids.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(self.text(self.arena.comments.span(id)));
        }
        out
    }

    /// Decoded value of a string literal, `None` if it is malformed.
    pub fn string_value(&self, lit: StringLit) -> Option<String> {
        unquote(self.text(lit.raw))
    }

    pub fn imports(&self) -> &[ImportSpec] {
        self.arena.imports(self.file.imports)
    }

    pub fn decls(&self) -> &[TopLevelDecl] {
        self.arena.top_decls(self.file.decls)
    }
}

/// Parses one Go source file.
///
/// Any lexical or syntax diagnostic turns the result into a `ParseFailure`;
/// the partially built file is still handed back when the package clause parsed.
pub fn parse_source(src: &str) -> Result<ParsedFile, ParseFailure> {
    let mut lexer = Lexer::new(src);
    let toks: Vec<_> = lexer.by_ref().collect();
    let comments = lexer.take_comments();
    let mut diags = lexer.take_diags();

    let mut p = Parser::new(src, toks, &comments);
    let file = p.parse_file();
    diags.append(&mut p.diags);

    let parsed = file.map(|file| ParsedFile {
        source: src.to_owned(),
        arena: p.arena,
        interner: p.interner,
        file,
        lines: p.lines,
    });

    match parsed {
        Some(parsed) if diags.is_empty() => Ok(parsed),
        partial => Err(ParseFailure { partial, diags }),
    }
}

/// Text of the comments that precede the package clause.
///
/// Cheap: lexing stops at the first real token.
pub fn leading_comments(src: &str) -> Vec<&str> {
    let mut lexer = Lexer::new(src);
    let _ = lexer.next();
    lexer
        .comments()
        .iter()
        .filter_map(|c| src.get(c.span.range()))
        .collect()
}

/// Decodes a Go string literal (interpreted or raw).
pub fn unquote(raw: &str) -> Option<String> {
    if let Some(body) = raw.strip_prefix('`').and_then(|r| r.strip_suffix('`')) {
        return Some(body.replace('\r', ""));
    }
    let body = raw.strip_prefix('"')?.strip_suffix('"')?;

    let mut out: Vec<u8> = Vec::with_capacity(body.len());
    let mut chars = body.char_indices();
    while let Some((i, c)) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        let (_, esc) = chars.next()?;
        let simple = match esc {
            'a' => Some(0x07),
            'b' => Some(0x08),
            'f' => Some(0x0C),
            'n' => Some(b'\n'),
            'r' => Some(b'\r'),
            't' => Some(b'\t'),
            'v' => Some(0x0B),
            '\\' => Some(b'\\'),
            '"' => Some(b'"'),
            _ => None,
        };
        if let Some(b) = simple {
            out.push(b);
            continue;
        }
        let digits = |n: usize| body.get(i + 2..i + 2 + n);
        match esc {
            'x' => {
                out.push(u8::from_str_radix(digits(2)?, 16).ok()?);
                chars.nth(1);
            }
            'u' | 'U' => {
                let n = if esc == 'u' { 4 } else { 8 };
                let cp = u32::from_str_radix(digits(n)?, 16).ok()?;
                let mut buf = [0u8; 4];
                out.extend_from_slice(char::from_u32(cp)?.encode_utf8(&mut buf).as_bytes());
                chars.nth(n - 1);
            }
            '0'..='7' => {
                let oct = body.get(i + 1..i + 4)?;
                let v = u32::from_str_radix(oct, 8).ok()?;
                out.push(u8::try_from(v).ok()?);
                chars.nth(1);
            }
            _ => return None,
        }
    }
    String::from_utf8(out).ok()
}

// =============================================================================
// Parser state
// =============================================================================

struct Parser<'src> {
    src: &'src str,
    toks: Vec<Spanned<'src>>,
    pos: usize,
    arena: AstArena,
    interner: Interner,
    diags: Vec<Diag>,
    lines: LineIndex,
    /// Last comment group before token index -> (group, first line, last line).
    lead: HashMap<usize, (CommentGroupId, u32, u32)>,
    groups: Vec<CommentGroupId>,
}

#[inline]
fn is_injected_semi(t: &Spanned<'_>) -> bool {
    matches!(t.1, Tok::Semi) && t.0 == t.2
}

impl<'src> Parser<'src> {
    fn new(src: &'src str, toks: Vec<Spanned<'src>>, comments: &[LexComment]) -> Self {
        let mut p = Self {
            src,
            toks,
            pos: 0,
            arena: AstArena::new(),
            interner: Interner::new(),
            diags: Vec::new(),
            lines: LineIndex::new(src),
            lead: HashMap::new(),
            groups: Vec::new(),
        };
        p.group_comments(comments);
        p
    }

    /// Index of the first real token starting at or after `offset`.
    fn next_real_token(&self, offset: usize) -> usize {
        let mut i = self.toks.partition_point(|t| t.0 < offset);
        while i < self.toks.len() && is_injected_semi(&self.toks[i]) {
            i += 1;
        }
        i
    }

    fn group_comments(&mut self, comments: &[LexComment]) {
        let mut i = 0;
        while i < comments.len() {
            let next = self.next_real_token(comments[i].span.end as usize);
            let mut j = i + 1;
            while j < comments.len() {
                let prev_end_line = self.lines.line(comments[j - 1].span.end);
                let adjacent = self.lines.line(comments[j].span.start) <= prev_end_line + 1;
                if !adjacent || self.next_real_token(comments[j].span.end as usize) != next {
                    break;
                }
                j += 1;
            }

            let ids: Vec<CommentId> = comments[i..j]
                .iter()
                .map(|c| self.arena.comments.alloc(Comment { kind: c.kind }, c.span))
                .collect();
            let span = comments[i].span.to(comments[j - 1].span);
            let list = self.arena.list_comment_ids(ids);
            let gid = self
                .arena
                .comment_groups
                .alloc(CommentGroup { comments: list }, span);
            self.groups.push(gid);

            let first_line = self.lines.line(span.start);
            let last_line = self.lines.line(span.end.saturating_sub(1));
            self.lead.insert(next, (gid, first_line, last_line));
            i = j;
        }
    }

    /// Doc comment for the declaration starting at token `idx`: the group must
    /// end on the line right above it and start below the previous token.
    fn doc_for(&self, idx: usize) -> Option<CommentGroupId> {
        let &(gid, first_line, last_line) = self.lead.get(&idx)?;
        let tok = self.toks.get(idx)?;
        if last_line + 1 != self.lines.line(tok.0 as u32) {
            return None;
        }
        let prev = self.toks[..idx].iter().rev().find(|t| !is_injected_semi(t));
        if let Some(prev) = prev {
            if self.lines.line(prev.2.saturating_sub(1) as u32) >= first_line {
                return None;
            }
        }
        Some(gid)
    }

    // -------------------------------------------------------------------------
    // Token cursor
    // -------------------------------------------------------------------------

    #[inline]
    fn tok(&self) -> Option<Tok<'src>> {
        self.peek_at(0)
    }

    #[inline]
    fn peek_at(&self, n: usize) -> Option<Tok<'src>> {
        self.toks.get(self.pos + n).map(|t| t.1)
    }

    #[inline]
    fn at(&self, t: Tok<'_>) -> bool {
        self.tok() == Some(t)
    }

    #[inline]
    fn at_eof(&self) -> bool {
        self.pos >= self.toks.len()
    }

    #[inline]
    fn cur_start(&self) -> usize {
        self.toks.get(self.pos).map_or(self.src.len(), |t| t.0)
    }

    #[inline]
    fn cur_span(&self) -> Span {
        self.toks
            .get(self.pos)
            .map_or(Span::empty_at(self.src.len()), |t| Span::new(t.0, t.2))
    }

    #[inline]
    fn prev_end(&self) -> usize {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.toks.get(i))
            .map_or(0, |t| t.2)
    }

    #[inline]
    fn finish(&self, start: usize) -> Span {
        Span::new(start, self.prev_end().max(start))
    }

    #[inline]
    fn bump(&mut self) -> Span {
        let span = self.cur_span();
        if !self.at_eof() {
            self.pos += 1;
        }
        span
    }

    #[inline]
    fn eat(&mut self, t: Tok<'_>) -> Option<Span> {
        if self.at(t) {
            Some(self.bump())
        } else {
            None
        }
    }

    fn describe_current(&self) -> String {
        match self.tok() {
            None => "EOF".to_string(),
            Some(Tok::Semi) if self.toks.get(self.pos).is_some_and(is_injected_semi) => {
                "newline".to_string()
            }
            Some(t) => t.to_string(),
        }
    }

    fn error_here(&mut self, message: impl Into<String>) -> Bail {
        let message = format!("{}, found {}", message.into(), self.describe_current());
        self.diags.push(Diag::parse(self.cur_span(), message));
        Bail
    }

    fn expect(&mut self, t: Tok<'_>, what: &str) -> PResult<Span> {
        match self.eat(t) {
            Some(span) => Ok(span),
            None => Err(self.error_here(format!("expected {what}"))),
        }
    }

    fn ident(&mut self) -> PResult<IdentName> {
        match self.tok() {
            Some(Tok::Ident(s)) => {
                let sym = self.interner.intern(s);
                let pos = self.bump();
                Ok(IdentName { sym, pos })
            }
            _ => Err(self.error_here("expected identifier")),
        }
    }

    fn ident_list(&mut self) -> PResult<ListRef<IdentName>> {
        let mut names = vec![self.ident()?];
        while self.eat(Tok::Comma).is_some() {
            names.push(self.ident()?);
        }
        Ok(self.arena.list_ident_names(names))
    }

    fn string_lit(&mut self) -> Option<StringLit> {
        match self.tok() {
            Some(Tok::String(_) | Tok::RawString(_)) => Some(StringLit { raw: self.bump() }),
            _ => None,
        }
    }

    /// Terminator after a declaration: `;`, or nothing before `)`/EOF.
    fn expect_semi(&mut self) -> PResult<()> {
        if self.eat(Tok::Semi).is_some() || self.at_eof() || self.at(Tok::RParen) {
            return Ok(());
        }
        Err(self.error_here("expected ';' after declaration"))
    }

    /// Index of the `]` matching the `[` at token index `open`.
    fn matching_bracket(&self, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        for (i, t) in self.toks.iter().enumerate().skip(open) {
            match t.1 {
                Tok::LBrack | Tok::LParen | Tok::LBrace => depth += 1,
                Tok::RBrack | Tok::RParen | Tok::RBrace => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// Skips a balanced `open ... close` run starting at the current token.
    fn skip_balanced(&mut self, open: Tok<'_>, close: Tok<'_>, what: &str) -> PResult<Span> {
        let start = self.cur_start();
        let mut depth = 0usize;
        loop {
            match self.tok() {
                None => return Err(self.error_here(format!("expected {what}"))),
                Some(t) if t == open => depth += 1,
                Some(t) if t == close => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.bump();
                        return Ok(self.finish(start));
                    }
                }
                _ => {}
            }
            self.bump();
        }
    }

    /// Skips an initializer expression list up to the `;` or `)` that ends the spec.
    fn skip_expr_list(&mut self) {
        let mut depth = 0usize;
        while let Some(t) = self.tok() {
            match t {
                Tok::LParen | Tok::LBrack | Tok::LBrace => depth += 1,
                Tok::RParen | Tok::RBrack | Tok::RBrace => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                }
                Tok::Semi if depth == 0 => return,
                _ => {}
            }
            self.bump();
        }
    }

    /// Recovery: drop tokens until a top-level `;` or the next declaration keyword.
    fn sync_top_level(&mut self, started_at: usize) {
        if self.pos == started_at {
            self.bump();
        }
        let mut depth = 0usize;
        while let Some(t) = self.tok() {
            match t {
                Tok::LParen | Tok::LBrack | Tok::LBrace => depth += 1,
                Tok::RParen | Tok::RBrack | Tok::RBrace => depth = depth.saturating_sub(1),
                Tok::Semi if depth == 0 => {
                    self.bump();
                    return;
                }
                Tok::KwFunc | Tok::KwType | Tok::KwVar | Tok::KwConst | Tok::KwImport
                    if depth == 0 =>
                {
                    return
                }
                _ => {}
            }
            self.bump();
        }
    }

    // -------------------------------------------------------------------------
    // File and declarations
    // -------------------------------------------------------------------------

    fn parse_file(&mut self) -> Option<SourceFile> {
        let doc = self.doc_for(self.pos);
        let package_pos = self.expect(Tok::KwPackage, "'package'").ok()?;
        let name = self.ident().ok()?;
        if self.expect_semi().is_err() {
            self.sync_top_level(self.pos);
        }

        let mut imports = Vec::new();
        while self.at(Tok::KwImport) {
            let start = self.pos;
            if self
                .import_decl(&mut imports)
                .and_then(|()| self.expect_semi())
                .is_err()
            {
                self.sync_top_level(start);
            }
        }

        let mut decls = Vec::new();
        while let Some(t) = self.tok() {
            let start = self.pos;
            let res = match t {
                Tok::Semi => {
                    self.bump();
                    continue;
                }
                Tok::KwType => self.type_decl(&mut decls),
                Tok::KwConst => self.value_decl(ValueKind::Const, &mut decls),
                Tok::KwVar => self.value_decl(ValueKind::Var, &mut decls),
                Tok::KwFunc => self.func_decl().map(|id| decls.push(TopLevelDecl::Func(id))),
                Tok::KwImport => {
                    let bail = self.error_here("imports must appear before other declarations");
                    self.import_decl(&mut imports).and(Err(bail))
                }
                _ => Err(self.error_here("non-declaration statement outside function body")),
            }
            .and_then(|()| self.expect_semi());

            if res.is_err() {
                self.sync_top_level(start);
            }
        }

        let imports = self.arena.list_imports(imports);
        let decls = self.arena.list_top_decls(decls);
        let comments = self.arena.list_comment_group_ids(self.groups.iter().copied());
        Some(SourceFile {
            package_pos,
            name,
            doc,
            imports,
            decls,
            comments,
        })
    }

    fn import_decl(&mut self, out: &mut Vec<ImportSpec>) -> PResult<()> {
        let kw_doc = self.doc_for(self.pos);
        self.bump();
        if self.eat(Tok::LParen).is_none() {
            out.push(self.import_spec(kw_doc)?);
            return Ok(());
        }
        while !self.at(Tok::RParen) && !self.at_eof() {
            if self.eat(Tok::Semi).is_some() {
                continue;
            }
            let doc = self.doc_for(self.pos);
            out.push(self.import_spec(doc)?);
            if !self.at(Tok::RParen) {
                self.expect(Tok::Semi, "';' between imports")?;
            }
        }
        self.expect(Tok::RParen, "')'")?;
        Ok(())
    }

    fn import_spec(&mut self, doc: Option<CommentGroupId>) -> PResult<ImportSpec> {
        let name = match self.tok() {
            Some(Tok::Dot) => Some(ImportName::Dot(self.bump())),
            Some(Tok::Ident("_")) => Some(ImportName::Blank(self.bump())),
            Some(Tok::Ident(_)) => Some(ImportName::Name(self.ident()?)),
            _ => None,
        };
        match self.string_lit() {
            Some(path) => Ok(ImportSpec { doc, name, path }),
            None => Err(self.error_here("expected import path")),
        }
    }

    fn type_decl(&mut self, out: &mut Vec<TopLevelDecl>) -> PResult<()> {
        let kw_doc = self.doc_for(self.pos);
        self.bump();
        if self.eat(Tok::LParen).is_none() {
            out.push(TopLevelDecl::Type(self.type_spec(kw_doc)?));
            return Ok(());
        }
        while !self.at(Tok::RParen) && !self.at_eof() {
            if self.eat(Tok::Semi).is_some() {
                continue;
            }
            let doc = self.doc_for(self.pos);
            out.push(TopLevelDecl::Type(self.type_spec(doc)?));
            if !self.at(Tok::RParen) {
                self.expect(Tok::Semi, "';' between type specs")?;
            }
        }
        self.expect(Tok::RParen, "')'")?;
        Ok(())
    }

    fn type_spec(&mut self, doc: Option<CommentGroupId>) -> PResult<TypeSpec> {
        let name = self.ident()?;
        let type_params = if self.at(Tok::LBrack) && self.looks_like_type_params() {
            Some(self.type_params()?)
        } else {
            None
        };
        let alias = self.eat(Tok::Assign).is_some();
        let typ = self.parse_type()?;
        Ok(TypeSpec {
            doc,
            name,
            type_params,
            alias,
            typ,
        })
    }

    /// `type A[T any] ...` vs `type A [N]T`: a parameter name is followed by
    /// something that can start a constraint.
    fn looks_like_type_params(&self) -> bool {
        matches!(self.peek_at(1), Some(Tok::Ident(_)))
            && matches!(
                self.peek_at(2),
                Some(
                    Tok::Ident(_)
                        | Tok::KwInterface
                        | Tok::KwFunc
                        | Tok::KwMap
                        | Tok::KwChan
                        | Tok::KwStruct
                        | Tok::LBrack
                        | Tok::LParen
                        | Tok::Tilde
                        | Tok::Arrow
                        | Tok::Comma
                )
            )
    }

    fn value_decl(&mut self, kind: ValueKind, out: &mut Vec<TopLevelDecl>) -> PResult<()> {
        let kw_doc = self.doc_for(self.pos);
        self.bump();
        if self.eat(Tok::LParen).is_none() {
            out.push(self.value_spec(kind, kw_doc)?);
            return Ok(());
        }
        while !self.at(Tok::RParen) && !self.at_eof() {
            if self.eat(Tok::Semi).is_some() {
                continue;
            }
            let doc = self.doc_for(self.pos);
            out.push(self.value_spec(kind, doc)?);
            if !self.at(Tok::RParen) {
                self.expect(Tok::Semi, "';' between specs")?;
            }
        }
        self.expect(Tok::RParen, "')'")?;
        Ok(())
    }

    fn value_spec(&mut self, kind: ValueKind, doc: Option<CommentGroupId>) -> PResult<TopLevelDecl> {
        let names = self.ident_list()?;
        let typ = match self.tok() {
            None | Some(Tok::Assign | Tok::Semi | Tok::RParen) => None,
            Some(_) => Some(self.parse_type()?),
        };
        if self.eat(Tok::Assign).is_some() {
            self.skip_expr_list();
        }
        Ok(TopLevelDecl::Value(ValueSpec {
            doc,
            kind,
            names,
            typ,
        }))
    }

    fn func_decl(&mut self) -> PResult<FuncDeclId> {
        let doc = self.doc_for(self.pos);
        let func_pos = self.bump();
        let recv = if self.at(Tok::LParen) {
            Some(self.receiver()?)
        } else {
            None
        };
        let name = self.ident()?;
        let type_params = if self.at(Tok::LBrack) {
            Some(self.type_params()?)
        } else {
            None
        };
        let signature = self.signature()?;
        let has_body = self.at(Tok::LBrace);
        if has_body {
            self.skip_balanced(Tok::LBrace, Tok::RBrace, "'}'")?;
        }
        let span = self.finish(func_pos.start as usize);
        Ok(self.arena.funcs.alloc(
            FuncDecl {
                doc,
                func_pos,
                recv,
                name,
                type_params,
                signature,
                has_body,
            },
            span,
        ))
    }

    fn receiver(&mut self) -> PResult<Receiver> {
        let open = self.cur_span();
        let fields = self.parameters()?;
        let fields = self.arena.fields_list(fields).to_vec();
        let [field] = fields.as_slice() else {
            self.diags
                .push(Diag::parse(open, "method has multiple receivers or none"));
            return Err(Bail);
        };
        let field = self.arena.fields[*field];
        let name = self.arena.ident_names(field.names).first().copied();

        let mut typ = self.arena.unparen(field.typ);
        let mut star = None;
        if let Type::Pointer { elem } = self.arena.types[typ] {
            star = Some(Span::single_at(self.arena.types.span(typ).start as usize));
            typ = self.arena.unparen(elem);
        }

        let invalid = |p: &mut Self| {
            let span = p.arena.types.span(typ);
            p.diags.push(Diag::parse(span, "invalid receiver type"));
            Bail
        };
        let Type::Named {
            pkg: None,
            name: base,
            args,
        } = self.arena.types[typ]
        else {
            return Err(invalid(self));
        };

        let mut type_params = Vec::new();
        for arg in self.arena.types_list(args).to_vec() {
            match self.arena.types[arg] {
                Type::Named {
                    pkg: None, name, ..
                } => type_params.push(name),
                _ => return Err(invalid(self)),
            }
        }
        let type_params = self.arena.list_ident_names(type_params);

        Ok(Receiver {
            name,
            star,
            base,
            type_params,
        })
    }

    // -------------------------------------------------------------------------
    // Generics
    // -------------------------------------------------------------------------

    fn type_params(&mut self) -> PResult<TypeParamsId> {
        let start = self.cur_start();
        self.expect(Tok::LBrack, "'['")?;
        let mut decls = Vec::new();
        while !self.at(Tok::RBrack) {
            let decl_start = self.cur_start();
            let names = self.ident_list()?;
            let constraint = self.type_elem()?;
            let span = self.finish(decl_start);
            decls.push(
                self.arena
                    .type_param_decls
                    .alloc(TypeParamDecl { names, constraint }, span),
            );
            if self.eat(Tok::Comma).is_none() {
                break;
            }
        }
        self.expect(Tok::RBrack, "']'")?;
        let params = self.arena.list_type_param_decl_ids(decls);
        let span = self.finish(start);
        Ok(self.arena.type_params.alloc(TypeParams { params }, span))
    }

    /// `TypeTerm { "|" TypeTerm }`; a lone plain term is returned as-is.
    fn type_elem(&mut self) -> PResult<TypeId> {
        let start = self.cur_start();
        let first = self.type_term()?;
        if first.tilde.is_none() && !self.at(Tok::Pipe) {
            return Ok(first.typ);
        }
        let mut terms = vec![first];
        while self.eat(Tok::Pipe).is_some() {
            terms.push(self.type_term()?);
        }
        let terms = self.arena.list_type_terms(terms);
        let span = self.finish(start);
        Ok(self.arena.types.alloc(Type::Union { terms }, span))
    }

    fn type_term(&mut self) -> PResult<TypeTerm> {
        let tilde = self.eat(Tok::Tilde);
        let typ = self.parse_type()?;
        Ok(TypeTerm { tilde, typ })
    }

    // -------------------------------------------------------------------------
    // Types
    // -------------------------------------------------------------------------

    fn starts_type(t: Option<Tok<'_>>) -> bool {
        matches!(
            t,
            Some(
                Tok::Ident(_)
                    | Tok::Star
                    | Tok::LBrack
                    | Tok::KwMap
                    | Tok::KwChan
                    | Tok::Arrow
                    | Tok::KwStruct
                    | Tok::KwInterface
                    | Tok::KwFunc
                    | Tok::LParen
            )
        )
    }

    fn parse_type(&mut self) -> PResult<TypeId> {
        let start = self.cur_start();
        let ty = match self.tok() {
            Some(Tok::Ident(_)) => return self.named_type(),
            Some(Tok::Star) => {
                self.bump();
                Type::Pointer {
                    elem: self.parse_type()?,
                }
            }
            Some(Tok::LBrack) => {
                self.bump();
                if self.eat(Tok::RBrack).is_some() {
                    Type::Slice {
                        elem: self.parse_type()?,
                    }
                } else {
                    let len = self.array_len()?;
                    Type::Array {
                        len,
                        elem: self.parse_type()?,
                    }
                }
            }
            Some(Tok::KwMap) => {
                self.bump();
                self.expect(Tok::LBrack, "'['")?;
                let key = self.parse_type()?;
                self.expect(Tok::RBrack, "']'")?;
                Type::Map {
                    key,
                    val: self.parse_type()?,
                }
            }
            Some(Tok::KwChan) => {
                self.bump();
                let dir = if self.eat(Tok::Arrow).is_some() {
                    ChanDir::Send
                } else {
                    ChanDir::Both
                };
                Type::Chan {
                    dir,
                    elem: self.parse_type()?,
                }
            }
            Some(Tok::Arrow) => {
                self.bump();
                self.expect(Tok::KwChan, "'chan'")?;
                Type::Chan {
                    dir: ChanDir::Recv,
                    elem: self.parse_type()?,
                }
            }
            Some(Tok::KwStruct) => {
                self.bump();
                self.struct_body()?
            }
            Some(Tok::KwInterface) => {
                self.bump();
                self.interface_body()?
            }
            Some(Tok::KwFunc) => {
                self.bump();
                Type::Func {
                    sig: self.signature()?,
                }
            }
            Some(Tok::LParen) => {
                self.bump();
                let typ = self.type_elem()?;
                self.expect(Tok::RParen, "')'")?;
                Type::Paren { typ }
            }
            _ => return Err(self.error_here("expected type")),
        };
        let span = self.finish(start);
        Ok(self.arena.types.alloc(ty, span))
    }

    fn named_type(&mut self) -> PResult<TypeId> {
        let start = self.cur_start();
        let first = self.ident()?;
        let (pkg, name) = if self.eat(Tok::Dot).is_some() {
            (Some(first), self.ident()?)
        } else {
            (None, first)
        };
        let args = if self.at(Tok::LBrack) {
            self.type_args()?
        } else {
            ListRef::EMPTY
        };
        let span = self.finish(start);
        Ok(self.arena.types.alloc(Type::Named { pkg, name, args }, span))
    }

    fn type_args(&mut self) -> PResult<ListRef<TypeId>> {
        self.expect(Tok::LBrack, "'['")?;
        let mut args = Vec::new();
        while !self.at(Tok::RBrack) {
            args.push(self.type_elem()?);
            if self.eat(Tok::Comma).is_none() {
                break;
            }
        }
        self.expect(Tok::RBrack, "']'")?;
        Ok(self.arena.list_types(args))
    }

    /// Length of `[N]T` after the `[`; consumes the closing `]`.
    fn array_len(&mut self) -> PResult<Span> {
        if let Some(span) = self.eat(Tok::Ellipsis) {
            self.expect(Tok::RBrack, "']'")?;
            return Ok(span);
        }
        let start = self.cur_start();
        let mut depth = 0usize;
        loop {
            match self.tok() {
                None => return Err(self.error_here("expected ']'")),
                Some(Tok::RBrack) if depth == 0 => break,
                Some(Tok::LBrack | Tok::LParen | Tok::LBrace) => depth += 1,
                Some(Tok::RBrack | Tok::RParen | Tok::RBrace) => depth = depth.saturating_sub(1),
                _ => {}
            }
            self.bump();
        }
        let len = self.finish(start);
        self.bump();
        Ok(len)
    }

    /// At `Ident [`: true when the bracket closes a type argument list of an
    /// embedded or anonymous generic type rather than opening an array or
    /// slice type for a named entry.
    fn bracket_is_type_args(&self, followers: fn(Option<Tok<'_>>) -> bool) -> bool {
        if matches!(self.peek_at(2), Some(Tok::RBrack)) {
            return false;
        }
        match self.matching_bracket(self.pos + 1) {
            Some(close) => followers(self.toks.get(close + 1).map(|t| t.1)),
            None => false,
        }
    }

    fn struct_body(&mut self) -> PResult<Type> {
        self.expect(Tok::LBrace, "'{'")?;
        let mut fields = Vec::new();
        while !self.at(Tok::RBrace) && !self.at_eof() {
            if self.eat(Tok::Semi).is_some() {
                continue;
            }
            let doc = self.doc_for(self.pos);
            fields.push(self.struct_field(doc)?);
            if !self.at(Tok::RBrace) {
                self.expect(Tok::Semi, "';' between fields")?;
            }
        }
        self.expect(Tok::RBrace, "'}'")?;
        Ok(Type::Struct {
            fields: self.arena.list_fields(fields),
        })
    }

    fn struct_field(&mut self, doc: Option<CommentGroupId>) -> PResult<FieldId> {
        fn ends_field(t: Option<Tok<'_>>) -> bool {
            matches!(
                t,
                None | Some(Tok::Semi | Tok::RBrace | Tok::String(_) | Tok::RawString(_))
            )
        }

        let start = self.cur_start();
        let (names, typ, is_embed) = match (self.tok(), self.peek_at(1)) {
            (Some(Tok::Star), _) => {
                self.bump();
                let elem = self.named_type()?;
                let span = self.finish(start);
                let ptr = self.arena.types.alloc(Type::Pointer { elem }, span);
                (ListRef::EMPTY, ptr, true)
            }
            (Some(Tok::Ident(_)), Some(Tok::Dot)) => (ListRef::EMPTY, self.named_type()?, true),
            (Some(Tok::Ident(_)), next) if ends_field(next) => {
                (ListRef::EMPTY, self.named_type()?, true)
            }
            (Some(Tok::Ident(_)), Some(Tok::LBrack)) if self.bracket_is_type_args(ends_field) => {
                (ListRef::EMPTY, self.named_type()?, true)
            }
            (Some(Tok::Ident(_)), _) => {
                let names = self.ident_list()?;
                (names, self.parse_type()?, false)
            }
            _ => return Err(self.error_here("expected field name or embedded type")),
        };
        let tag = self.string_lit();
        let span = self.finish(start);
        Ok(self.arena.fields.alloc(
            Field {
                doc,
                names,
                ellipsis_pos: None,
                typ,
                tag,
                is_embed,
            },
            span,
        ))
    }

    fn interface_body(&mut self) -> PResult<Type> {
        self.expect(Tok::LBrace, "'{'")?;
        let mut elems = Vec::new();
        while !self.at(Tok::RBrace) && !self.at_eof() {
            if self.eat(Tok::Semi).is_some() {
                continue;
            }
            let doc = self.doc_for(self.pos);
            let elem = match (self.tok(), self.peek_at(1)) {
                (Some(Tok::Ident(_)), Some(Tok::LParen)) => {
                    let name = self.ident()?;
                    let sig = self.signature()?;
                    InterfaceElem::Method { doc, name, sig }
                }
                _ => InterfaceElem::Embed(self.type_elem()?),
            };
            elems.push(elem);
            if !self.at(Tok::RBrace) {
                self.expect(Tok::Semi, "';' between interface elements")?;
            }
        }
        self.expect(Tok::RBrace, "'}'")?;
        Ok(Type::Interface {
            elems: self.arena.list_interface_elems(elems),
        })
    }

    // -------------------------------------------------------------------------
    // Signatures
    // -------------------------------------------------------------------------

    fn signature(&mut self) -> PResult<SignatureId> {
        let start = self.cur_start();
        let params = self.parameters()?;
        let results = if self.at(Tok::LParen) {
            self.parameters()?
        } else if Self::starts_type(self.tok()) {
            let typ_start = self.cur_start();
            let typ = self.parse_type()?;
            let span = self.finish(typ_start);
            let field = self.arena.fields.alloc(Field::anonymous(typ), span);
            self.arena.list_fields([field])
        } else {
            ListRef::EMPTY
        };
        let span = self.finish(start);
        Ok(self
            .arena
            .signatures
            .alloc(Signature { params, results }, span))
    }

    fn parameters(&mut self) -> PResult<ListRef<FieldId>> {
        self.expect(Tok::LParen, "'('")?;
        let mut decls = Vec::new();
        while !self.at(Tok::RParen) && !self.at_eof() {
            decls.push(self.param_decl()?);
            if self.eat(Tok::Comma).is_none() {
                break;
            }
        }
        self.expect(Tok::RParen, "')'")?;
        let fields = resolve_param_list(&mut self.arena, decls);
        Ok(self.arena.list_fields(fields))
    }

    fn param_decl(&mut self) -> PResult<ParamDecl> {
        fn ends_param(t: Option<Tok<'_>>) -> bool {
            matches!(t, Some(Tok::Comma | Tok::RParen))
        }

        let start = self.cur_start();
        let mut decl = ParamDecl::default();
        match (self.tok(), self.peek_at(1)) {
            (Some(Tok::Ident(_)), next) if ends_param(next) => decl.names.push(self.ident()?),
            (Some(Tok::Ident(_)), Some(Tok::Dot)) => decl.typ = Some(self.named_type()?),
            (Some(Tok::Ident(_)), Some(Tok::LBrack)) if self.bracket_is_type_args(ends_param) => {
                decl.typ = Some(self.named_type()?)
            }
            (Some(Tok::Ident(_)), Some(Tok::Ellipsis)) => {
                decl.names.push(self.ident()?);
                decl.ellipsis_pos = self.eat(Tok::Ellipsis);
                decl.typ = Some(self.parse_type()?);
            }
            (Some(Tok::Ident(_)), next) if Self::starts_type(next) => {
                decl.names.push(self.ident()?);
                decl.typ = Some(self.parse_type()?);
            }
            (Some(Tok::Ellipsis), _) => {
                decl.ellipsis_pos = self.eat(Tok::Ellipsis);
                decl.typ = Some(self.parse_type()?);
            }
            _ => decl.typ = Some(self.parse_type()?),
        }
        decl.span = self.finish(start);
        Ok(decl)
    }
}

impl Field {
    fn anonymous(typ: TypeId) -> Self {
        Field {
            doc: None,
            names: ListRef::EMPTY,
            ellipsis_pos: None,
            typ,
            tag: None,
            is_embed: false,
        }
    }
}

// =============================================================================
// Parameter grouping
// =============================================================================

/// One comma-separated entry of a parameter list before grouping.
#[derive(Clone, Debug, Default)]
struct ParamDecl {
    names: Vec<IdentName>,
    ellipsis_pos: Option<Span>,
    typ: Option<TypeId>,
    span: Span,
}

/// Groups `(a, b int, c string)` the way Go does: bare names wait for the
/// next typed entry; if none ever comes, every bare name was a type.
fn resolve_param_list(arena: &mut AstArena, params: Vec<ParamDecl>) -> Vec<FieldId> {
    let mut out = Vec::new();
    let mut pending: Vec<IdentName> = Vec::new();
    let mut pending_start: Option<u32> = None;

    for param in params {
        let Some(typ) = param.typ else {
            if pending.is_empty() {
                pending_start = Some(param.span.start);
            }
            pending.extend(param.names);
            continue;
        };

        let mut names = std::mem::take(&mut pending);
        names.extend(param.names);
        let start = pending_start.take().unwrap_or(param.span.start);
        let span = Span {
            start,
            end: param.span.end,
        };
        let names = arena.list_ident_names(names);
        let field = Field {
            names,
            ellipsis_pos: param.ellipsis_pos,
            ..Field::anonymous(typ)
        };
        out.push(arena.fields.alloc(field, span));
    }

    for name in pending {
        let typ = arena.types.alloc(
            Type::Named {
                pkg: None,
                name,
                args: ListRef::EMPTY,
            },
            name.pos,
        );
        out.push(arena.fields.alloc(Field::anonymous(typ), name.pos));
    }

    out
}
