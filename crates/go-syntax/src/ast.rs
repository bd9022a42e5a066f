//! # Declaration-level Go AST
//!
//! Only what a package's API surface needs is modeled: the package clause,
//! imports, type declarations, const/var names and function/method
//! signatures. Function bodies and initializer expressions are skipped by the
//! parser and never reach the tree.
//!
//! ## Architecture
//!
//! - **Nodes**: allocated in typed arenas (`SpannedArena<T>`) and referenced by `Id<T>`
//! - **Lists**: centralized buffers in `ExtraData`, referenced by `ListRef<T>`
//! - **Spans**: kept in side tables next to each arena
//! - **Symbols**: identifiers are interned once per file
//!
//! Walk/Visitor infrastructure lives in `walk.rs`; `#[derive(WalkAst)]`
//! generates `impl crate::walk::Walk`.

use ast_derive::WalkAst;
use core::marker::PhantomData;
use core::ops::{Index, IndexMut};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::hash::{BuildHasher, BuildHasherDefault, Hasher, RandomState};

pub use crate::error::Span;
pub use crate::lexer::CommentKind;

// =============================================================================
// Core Foundation Types
// =============================================================================

/// Type-safe identifier for arena-allocated nodes.
#[derive(Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Id<T> {
    raw: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Copy for Id<T> {}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Id<T> {
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self {
            raw,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub const fn to_usize(&self) -> usize {
        self.raw as usize
    }

    #[inline]
    pub const fn raw(&self) -> u32 {
        self.raw
    }
}

/// Typed reference into a centralized list buffer.
///
/// Each `ListRef` points to a contiguous slice of the matching buffer in
/// `AstArena::extras`.
#[derive(Debug, PartialEq, Eq)]
pub struct ListRef<T> {
    start: u32,
    len: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Copy for ListRef<T> {}

impl<T> Clone for ListRef<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Default for ListRef<T> {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl<T> ListRef<T> {
    pub const EMPTY: Self = Self {
        start: 0,
        len: 0,
        _marker: PhantomData,
    };

    #[inline]
    pub const fn new(start: u32, len: u32) -> Self {
        Self {
            start,
            len,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub const fn start(&self) -> u32 {
        self.start
    }

    #[inline]
    pub const fn len(&self) -> u32 {
        self.len
    }

    /// Exclusive end index.
    #[inline]
    pub const fn end(&self) -> u32 {
        self.start + self.len
    }
}

// =============================================================================
// Symbol Interning
// =============================================================================

/// Interned string symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Symbol(u32);

impl Symbol {
    #[inline]
    pub const fn from_raw(v: u32) -> Self {
        Self(v)
    }

    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

/// Identifier occurrence (interned symbol + source position).
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub struct IdentName {
    pub sym: Symbol,
    pub pos: Span,
}

#[derive(Default)]
struct U64IdentityHasher(u64);

impl Hasher for U64IdentityHasher {
    fn write(&mut self, bytes: &[u8]) {
        // only ever fed precomputed u64 hashes; fold anything else in
        for &b in bytes {
            self.0 = self.0.rotate_left(8) ^ u64::from(b);
        }
    }

    #[inline]
    fn write_u64(&mut self, i: u64) {
        self.0 = i;
    }

    #[inline]
    fn finish(&self) -> u64 {
        self.0
    }
}

type U64IdentityBuild = BuildHasherDefault<U64IdentityHasher>;

/// String interner: each distinct identifier is stored once per file.
#[derive(Debug, Default)]
pub struct Interner {
    strings: Vec<Box<str>>,
    buckets: HashMap<u64, SmallVec<[Symbol; 1]>, U64IdentityBuild>,
    state: RandomState,
}

impl Interner {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn intern(&mut self, s: &str) -> Symbol {
        let h = self.state.hash_one(s);
        let entry = self.buckets.entry(h).or_default();

        for &sym in entry.iter() {
            if self.strings[sym.0 as usize].as_ref() == s {
                return sym;
            }
        }

        let sym = Symbol(self.strings.len() as u32);
        self.strings.push(s.into());
        entry.push(sym);
        sym
    }

    /// Looks up an already interned string without inserting it.
    pub fn get(&self, s: &str) -> Option<Symbol> {
        let h = self.state.hash_one(s);
        self.buckets
            .get(&h)?
            .iter()
            .copied()
            .find(|sym| self.strings[sym.0 as usize].as_ref() == s)
    }

    /// Resolves a symbol from this interner back to its string.
    #[inline]
    pub fn resolve(&self, sym: Symbol) -> &str {
        self.strings.get(sym.0 as usize).map_or("", |s| s.as_ref())
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

// =============================================================================
// Arena Allocation
// =============================================================================

/// Nodes and their spans in parallel vectors.
#[derive(Debug)]
pub struct SpannedArena<T> {
    data: Vec<T>,
    spans: Vec<Span>,
}

impl<T> Default for SpannedArena<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            spans: Vec::new(),
        }
    }
}

impl<T> SpannedArena<T> {
    #[inline]
    pub fn alloc(&mut self, node: T, span: Span) -> Id<T> {
        let id = Id::from_raw(self.data.len() as u32);
        self.data.push(node);
        self.spans.push(span);
        id
    }

    #[inline]
    pub fn get(&self, id: Id<T>) -> &T {
        &self.data[id.to_usize()]
    }

    #[inline]
    pub fn get_mut(&mut self, id: Id<T>) -> &mut T {
        &mut self.data[id.to_usize()]
    }

    #[inline]
    pub fn span(&self, id: Id<T>) -> Span {
        self.spans[id.to_usize()]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl<T> Index<Id<T>> for SpannedArena<T> {
    type Output = T;
    fn index(&self, id: Id<T>) -> &T {
        self.get(id)
    }
}

impl<T> IndexMut<Id<T>> for SpannedArena<T> {
    fn index_mut(&mut self, id: Id<T>) -> &mut T {
        self.get_mut(id)
    }
}

// =============================================================================
// Node IDs
// =============================================================================

pub type TypeId = Id<Type>;
pub type FieldId = Id<Field>;
pub type SignatureId = Id<Signature>;
pub type FuncDeclId = Id<FuncDecl>;
pub type TypeParamsId = Id<TypeParams>;
pub type TypeParamDeclId = Id<TypeParamDecl>;
pub type CommentId = Id<Comment>;
pub type CommentGroupId = Id<CommentGroup>;

// =============================================================================
// Centralized List Storage
// =============================================================================

#[derive(Debug, Default)]
pub struct ExtraData {
    pub ident_names: Vec<IdentName>,
    pub types: Vec<TypeId>,
    pub fields: Vec<FieldId>,
    pub imports: Vec<ImportSpec>,
    pub top_decls: Vec<TopLevelDecl>,
    pub type_terms: Vec<TypeTerm>,
    pub interface_elems: Vec<InterfaceElem>,
    pub type_param_decl_ids: Vec<TypeParamDeclId>,
    pub comment_ids: Vec<CommentId>,
    pub comment_group_ids: Vec<CommentGroupId>,
}

// =============================================================================
// Main AST Arena
// =============================================================================

#[derive(Debug, Default)]
pub struct AstArena {
    pub types: SpannedArena<Type>,
    pub signatures: SpannedArena<Signature>,
    pub funcs: SpannedArena<FuncDecl>,
    pub fields: SpannedArena<Field>,
    pub type_params: SpannedArena<TypeParams>,
    pub type_param_decls: SpannedArena<TypeParamDecl>,
    pub comments: SpannedArena<Comment>,
    pub comment_groups: SpannedArena<CommentGroup>,
    pub extras: ExtraData,
}

macro_rules! list_api {
    ($($buf:ident: $t:ty => $build:ident, $get:ident;)*) => {
        impl AstArena {
            $(
                pub fn $build(&mut self, items: impl IntoIterator<Item = $t>) -> ListRef<$t> {
                    Self::push_list(&mut self.extras.$buf, items)
                }

                pub fn $get(&self, r: ListRef<$t>) -> &[$t] {
                    Self::slice(&self.extras.$buf, r)
                }
            )*
        }
    };
}

list_api! {
    ident_names: IdentName => list_ident_names, ident_names;
    types: TypeId => list_types, types_list;
    fields: FieldId => list_fields, fields_list;
    imports: ImportSpec => list_imports, imports;
    top_decls: TopLevelDecl => list_top_decls, top_decls;
    type_terms: TypeTerm => list_type_terms, type_terms;
    interface_elems: InterfaceElem => list_interface_elems, interface_elems;
    type_param_decl_ids: TypeParamDeclId => list_type_param_decl_ids, type_param_decl_ids;
    comment_ids: CommentId => list_comment_ids, comment_ids;
    comment_group_ids: CommentGroupId => list_comment_group_ids, comment_group_ids;
}

impl AstArena {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn push_list<T>(buf: &mut Vec<T>, items: impl IntoIterator<Item = T>) -> ListRef<T> {
        let start = buf.len();
        buf.extend(items);
        let len = buf.len() - start;
        debug_assert!(start <= u32::MAX as usize);
        ListRef::new(start as u32, len as u32)
    }

    #[inline]
    fn slice<T>(buf: &[T], r: ListRef<T>) -> &[T] {
        &buf[r.start() as usize..r.end() as usize]
    }

    /// Strips any number of redundant parentheses: `((T))` is `T`.
    pub fn unparen(&self, mut id: TypeId) -> TypeId {
        while let Type::Paren { typ } = self.types[id] {
            id = typ;
        }
        id
    }
}

// =============================================================================
// Comments
// =============================================================================

/// Comment token (text is recovered from source via its span).
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub struct Comment {
    pub kind: CommentKind,
}

/// Adjacent comments with no blank line and no token between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub struct CommentGroup {
    pub comments: ListRef<CommentId>,
}

// =============================================================================
// Source File (Root Node)
// =============================================================================

/// ```text
/// SourceFile = PackageClause ";" { ImportDecl ";" } { TopLevelDecl ";" }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub struct SourceFile {
    pub package_pos: Span,
    pub name: IdentName,
    /// Package doc comment (the group right above `package`).
    pub doc: Option<CommentGroupId>,
    pub imports: ListRef<ImportSpec>,
    pub decls: ListRef<TopLevelDecl>,
    /// Every comment group in the file, in source order. Doc groups also
    /// hang off their declarations, so walking skips this list.
    #[walk(skip)]
    pub comments: ListRef<CommentGroupId>,
}

// =============================================================================
// Declarations
// =============================================================================

/// `ImportSpec = [ "." | PackageName ] ImportPath`
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub struct ImportSpec {
    pub doc: Option<CommentGroupId>,
    pub name: Option<ImportName>,
    pub path: StringLit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub enum ImportName {
    /// `import . "pkg"`
    Dot(Span),
    /// `import _ "pkg"`
    Blank(Span),
    /// `import name "pkg"`
    Name(IdentName),
}

/// One spec per entry: a grouped `type ( A ...; B ... )` yields two `Type` decls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub enum TopLevelDecl {
    Type(TypeSpec),
    Value(ValueSpec),
    Func(FuncDeclId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Const,
    Var,
}

/// Names of a const or var spec. Initializers are skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub struct ValueSpec {
    pub doc: Option<CommentGroupId>,
    pub kind: ValueKind,
    pub names: ListRef<IdentName>,
    pub typ: Option<TypeId>,
}

/// `TypeSpec = AliasDecl | TypeDef`
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub struct TypeSpec {
    pub doc: Option<CommentGroupId>,
    pub name: IdentName,
    pub type_params: Option<TypeParamsId>,
    /// `type A = B`
    pub alias: bool,
    pub typ: TypeId,
}

/// ```text
/// FunctionDecl = "func" FunctionName [ TypeParameters ] Signature [ FunctionBody ]
/// MethodDecl   = "func" Receiver MethodName Signature [ FunctionBody ]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub struct FuncDecl {
    pub doc: Option<CommentGroupId>,
    pub func_pos: Span,
    pub recv: Option<Receiver>,
    pub name: IdentName,
    pub type_params: Option<TypeParamsId>,
    pub signature: SignatureId,
    pub has_body: bool,
}

/// Receiver normalized to `[name] [*] Base [ "[" P1, P2 "]" ]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub struct Receiver {
    pub name: Option<IdentName>,
    pub star: Option<Span>,
    pub base: IdentName,
    /// Receiver type parameter names, bound positionally to the base type's parameters.
    pub type_params: ListRef<IdentName>,
}

// =============================================================================
// Generics
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub struct TypeParams {
    pub params: ListRef<TypeParamDeclId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub struct TypeParamDecl {
    pub names: ListRef<IdentName>,
    pub constraint: TypeId,
}

/// Term of a union: `~T` or `T`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub struct TypeTerm {
    pub tilde: Option<Span>,
    pub typ: TypeId,
}

// =============================================================================
// Signatures and Fields
// =============================================================================

/// `Signature = Parameters [ Result ]`; an unparenthesized result is one unnamed field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub struct Signature {
    pub params: ListRef<FieldId>,
    pub results: ListRef<FieldId>,
}

/// Field in a parameter list, result list or struct.
///
/// `ParameterDecl = [ IdentifierList ] [ "..." ] Type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub struct Field {
    pub doc: Option<CommentGroupId>,
    /// Empty for anonymous parameters and embedded fields.
    pub names: ListRef<IdentName>,
    pub ellipsis_pos: Option<Span>,
    pub typ: TypeId,
    pub tag: Option<StringLit>,
    pub is_embed: bool,
}

/// String literal; the raw text (quotes included) is `src[raw]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringLit {
    pub raw: Span,
}

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub enum Type {
    /// `Name`, `pkg.Name`, `Name[A, B]`
    Named {
        pkg: Option<IdentName>,
        name: IdentName,
        args: ListRef<TypeId>,
    },

    /// `*T`
    Pointer { elem: TypeId },

    /// `[N]T`; `len` covers the raw length expression.
    Array { len: Span, elem: TypeId },

    /// `[]T`
    Slice { elem: TypeId },

    /// `map[K]V`
    Map { key: TypeId, val: TypeId },

    /// `chan T`, `<-chan T`, `chan<- T`
    Chan { dir: ChanDir, elem: TypeId },

    Struct { fields: ListRef<FieldId> },

    Interface { elems: ListRef<InterfaceElem> },

    Func { sig: SignatureId },

    /// `(T)`
    Paren { typ: TypeId },

    /// Constraint union `~int | string`; only legal in constraints.
    Union { terms: ListRef<TypeTerm> },

    /// Error recovery placeholder.
    Bad,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub enum InterfaceElem {
    Method {
        doc: Option<CommentGroupId>,
        name: IdentName,
        sig: SignatureId,
    },
    /// Embedded interface or type-set element (`io.Reader`, `~int | ~string`).
    Embed(TypeId),
}
