//! Turns one package's parsed files into a [`Package`]: collects the package
//! scope, then resolves every declared type and method signature against it.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use go_syntax::ast::{
    self, CommentGroupId, FieldId, IdentName, InterfaceElem, SignatureId, TopLevelDecl, TypeId,
    TypeSpec, ValueKind,
};
use go_syntax::{ParsedFile, Span};
use tracing::debug;

use crate::error::LoadError;
use crate::filter::is_exported;
use crate::types::{
    universe_type, ChanDir, InterfaceMethod, InterfaceType, MethodDecl, NamedType, Object,
    Package, PackageKind, Param, PkgRef, Position, Program, Signature, StructField, Type,
    TypeDecl, UNSAFE_POINTER,
};

/// A parsed file plus the package each of its import names refers to.
pub(crate) struct LoadedFile {
    pub path: PathBuf,
    pub parsed: ParsedFile,
    pub imports: HashMap<String, PkgRef>,
    pub dot_imports: Vec<PkgRef>,
}

impl LoadedFile {
    fn pos(&self, span: Span) -> Position {
        Position {
            file: self.path.clone(),
            line: self.parsed.line(span),
        }
    }

    fn doc(&self, group: Option<CommentGroupId>) -> Option<String> {
        group.map(|g| self.parsed.comment_text(g))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NameKind {
    Type,
    Other,
}

/// Where a package-level type is declared.
struct TypeSite<'f> {
    file: &'f LoadedFile,
    spec: TypeSpec,
}

struct MethodSite<'f> {
    file: &'f LoadedFile,
    decl: ast::FuncDecl,
}

/// Resolves `files` into the package `pkg`.
///
/// With `strict` a name declared twice is an error; otherwise the first
/// declaration wins, which keeps dependencies loadable when build
/// constraints were guessed wrong.
pub(crate) fn resolve_package(
    program: &Program,
    pkg: &PkgRef,
    dir: &Path,
    files: &[LoadedFile],
    strict: bool,
) -> Result<Package, LoadError> {
    let mut names: HashMap<String, NameKind> = HashMap::new();
    let mut type_sites: Vec<TypeSite<'_>> = Vec::new();
    let mut method_sites: Vec<MethodSite<'_>> = Vec::new();
    let mut scope: BTreeMap<String, Object> = BTreeMap::new();

    let mut declare = |name: &str, kind: NameKind, pos: Position| -> Result<bool, LoadError> {
        if name == "_" {
            return Ok(false);
        }
        if names.contains_key(name) {
            if strict {
                return Err(LoadError::Redeclared {
                    pos,
                    name: name.to_string(),
                });
            }
            debug!(package = %pkg.path, %name, %pos, "ignoring redeclaration");
            return Ok(false);
        }
        names.insert(name.to_string(), kind);
        Ok(true)
    };

    // pass 1: package scope
    for file in files {
        let p = &file.parsed;
        for decl in p.decls() {
            match *decl {
                TopLevelDecl::Type(spec) => {
                    let pos = file.pos(spec.name.pos);
                    if declare(p.name(spec.name), NameKind::Type, pos)? {
                        type_sites.push(TypeSite { file, spec });
                    }
                }
                TopLevelDecl::Value(spec) => {
                    for &name in p.arena.ident_names(spec.names) {
                        let pos = file.pos(name.pos);
                        if declare(p.name(name), NameKind::Other, pos.clone())? {
                            let obj = match spec.kind {
                                ValueKind::Const => Object::Const(pos),
                                ValueKind::Var => Object::Var(pos),
                            };
                            scope.insert(p.name(name).to_string(), obj);
                        }
                    }
                }
                TopLevelDecl::Func(id) => {
                    let decl = p.arena.funcs[id];
                    if decl.recv.is_some() {
                        method_sites.push(MethodSite { file, decl });
                        continue;
                    }
                    let name = p.name(decl.name);
                    if name == "init" {
                        continue;
                    }
                    let pos = file.pos(decl.name.pos);
                    if declare(name, NameKind::Other, pos.clone())? {
                        scope.insert(name.to_string(), Object::Func(pos));
                    }
                }
            }
        }
    }

    // pass 2: types
    for site in &type_sites {
        let file = site.file;
        let p = &file.parsed;
        let type_params = type_param_names(p, site.spec.type_params);
        let r = Resolver {
            program,
            pkg,
            names: &names,
            file,
            tparams: &type_params,
        };
        let rhs = r.resolve(site.spec.typ)?;
        let name = p.name(site.spec.name).to_string();
        scope.insert(
            name.clone(),
            Object::Type(TypeDecl {
                name,
                type_params,
                alias: site.spec.alias,
                rhs,
                doc: file.doc(site.spec.doc),
                pos: file.pos(site.spec.name.pos),
            }),
        );
    }

    // pass 3: methods, keyed by receiver base type
    let mut methods: HashMap<String, Vec<MethodDecl>> = HashMap::new();
    for site in &method_sites {
        let file = site.file;
        let p = &file.parsed;
        let Some(recv) = site.decl.recv else { continue };
        let base = receiver_base(&scope, pkg, file, recv.base)?;

        let recv_type_params: Vec<String> = p
            .arena
            .ident_names(recv.type_params)
            .iter()
            .map(|&n| p.name(n).to_string())
            .collect();
        let r = Resolver {
            program,
            pkg,
            names: &names,
            file,
            tparams: &recv_type_params,
        };
        let sig = r.signature(site.decl.signature)?;
        let name = p.name(site.decl.name).to_string();
        let pos = file.pos(site.decl.name.pos);

        let list = methods.entry(base).or_default();
        if name != "_" && list.iter().any(|m| m.name == name) {
            if strict {
                return Err(LoadError::Redeclared { pos, name });
            }
            debug!(package = %pkg.path, %name, %pos, "ignoring duplicate method");
            continue;
        }
        list.push(MethodDecl {
            name,
            recv_type_params,
            pointer_recv: recv.star.is_some(),
            sig,
            doc: file.doc(site.decl.doc),
            pos,
        });
    }

    let imports: BTreeSet<String> = files
        .iter()
        .flat_map(|f| f.imports.values().chain(&f.dot_imports))
        .map(|p| p.path.clone())
        .collect();

    Ok(Package {
        path: pkg.path.clone(),
        name: pkg.name.clone(),
        dir: Some(dir.to_path_buf()),
        kind: PackageKind::Source,
        scope,
        methods,
        imports,
    })
}

fn type_param_names(p: &ParsedFile, tparams: Option<ast::TypeParamsId>) -> Vec<String> {
    let Some(id) = tparams else {
        return Vec::new();
    };
    p.arena
        .type_param_decl_ids(p.arena.type_params[id].params)
        .iter()
        .flat_map(|&d| p.arena.ident_names(p.arena.type_param_decls[d].names))
        .map(|&n| p.name(n).to_string())
        .collect()
}

/// Receiver base types must be local defined types; aliases of those are followed.
fn receiver_base(
    scope: &BTreeMap<String, Object>,
    pkg: &PkgRef,
    file: &LoadedFile,
    base: IdentName,
) -> Result<String, LoadError> {
    let pos = file.pos(base.pos);
    let mut name = file.parsed.name(base).to_string();
    for _ in 0..scope.len() + 1 {
        match scope.get(&name) {
            Some(Object::Type(decl)) if !decl.alias => return Ok(name),
            Some(Object::Type(decl)) => match &decl.rhs {
                Type::Named(n) if n.pkg == *pkg && n.args.is_empty() => name = n.name.clone(),
                _ => break,
            },
            Some(_) => return Err(LoadError::NotAType { pos, name }),
            None => return Err(LoadError::Undefined { pos, name }),
        }
    }
    Err(LoadError::InvalidReceiver { pos, name })
}

struct Resolver<'a> {
    program: &'a Program,
    pkg: &'a PkgRef,
    names: &'a HashMap<String, NameKind>,
    file: &'a LoadedFile,
    tparams: &'a [String],
}

impl Resolver<'_> {
    fn parsed(&self) -> &ParsedFile {
        &self.file.parsed
    }

    fn resolve(&self, id: TypeId) -> Result<Type, LoadError> {
        let a = &self.parsed().arena;
        let span = a.types.span(id);
        let boxed = |t| self.resolve(t).map(Box::new);

        Ok(match a.types[id] {
            ast::Type::Named { pkg, name, args } => {
                let args = a
                    .types_list(args)
                    .iter()
                    .map(|&t| self.resolve(t))
                    .collect::<Result<Vec<_>, _>>()?;
                match pkg {
                    None => self.unqualified(name, args)?,
                    Some(q) => self.qualified(q, name, args)?,
                }
            }
            ast::Type::Pointer { elem } => Type::Pointer(boxed(elem)?),
            ast::Type::Slice { elem } => Type::Slice(boxed(elem)?),
            ast::Type::Array { len, elem } => {
                Type::Array(self.parsed().text(len).trim().to_string(), boxed(elem)?)
            }
            ast::Type::Map { key, val } => Type::Map(boxed(key)?, boxed(val)?),
            ast::Type::Chan { dir, elem } => {
                let dir = match dir {
                    ast::ChanDir::Both => ChanDir::Both,
                    ast::ChanDir::Send => ChanDir::Send,
                    ast::ChanDir::Recv => ChanDir::Recv,
                };
                Type::Chan(dir, boxed(elem)?)
            }
            ast::Type::Func { sig } => Type::Func(Box::new(self.signature(sig)?)),
            ast::Type::Struct { fields } => Type::Struct(self.struct_fields(fields)?),
            ast::Type::Interface { elems } => Type::Interface(Box::new(self.interface(elems)?)),
            ast::Type::Paren { typ } => self.resolve(typ)?,
            ast::Type::Union { .. } | ast::Type::Bad => {
                return Err(LoadError::Syntax {
                    pos: self.file.pos(span),
                    message: format!("{} is not a type", self.parsed().text(span)),
                })
            }
        })
    }

    fn unqualified(&self, ident: IdentName, args: Vec<Type>) -> Result<Type, LoadError> {
        let name = self.parsed().name(ident);
        let pos = || self.file.pos(ident.pos);

        if self.tparams.iter().any(|t| t == name) {
            return Ok(Type::TypeParam(name.to_string()));
        }
        match self.names.get(name) {
            Some(NameKind::Type) => {
                return Ok(Type::Named(NamedType {
                    pkg: self.pkg.clone(),
                    name: name.to_string(),
                    args,
                }))
            }
            Some(NameKind::Other) => {
                return Err(LoadError::NotAType {
                    pos: pos(),
                    name: name.to_string(),
                })
            }
            None => {}
        }
        if let Some(t) = universe_type(name) {
            return Ok(t);
        }
        for dot in &self.file.dot_imports {
            let found = match self.program.package(&dot.path) {
                Some(p) if p.kind == PackageKind::Source => p.type_decl(name).is_some(),
                _ => is_exported(name),
            };
            if found {
                return Ok(Type::Named(NamedType {
                    pkg: dot.clone(),
                    name: name.to_string(),
                    args,
                }));
            }
        }
        Err(LoadError::Undefined {
            pos: pos(),
            name: name.to_string(),
        })
    }

    fn qualified(&self, q: IdentName, ident: IdentName, args: Vec<Type>) -> Result<Type, LoadError> {
        let p = self.parsed();
        let (qual, name) = (p.name(q), p.name(ident));
        let pos = self.file.pos(q.pos.to(ident.pos));
        let full = || format!("{qual}.{name}");

        let Some(pkg) = self.file.imports.get(qual) else {
            return Err(LoadError::Undefined { pos, name: full() });
        };
        if pkg.path == "unsafe" && name == "Pointer" {
            return Ok(Type::Basic(UNSAFE_POINTER));
        }
        if !is_exported(name) {
            return Err(LoadError::Unexported {
                pos,
                name: name.to_string(),
                pkg: pkg.path.clone(),
            });
        }
        if let Some(source) = self
            .program
            .package(&pkg.path)
            .filter(|p| p.kind == PackageKind::Source)
        {
            match source.scope.get(name) {
                Some(Object::Type(_)) => {}
                Some(_) => return Err(LoadError::NotAType { pos, name: full() }),
                None => return Err(LoadError::Undefined { pos, name: full() }),
            }
        }
        Ok(Type::Named(NamedType {
            pkg: pkg.clone(),
            name: name.to_string(),
            args,
        }))
    }

    fn struct_fields(&self, fields: ast::ListRef<FieldId>) -> Result<Vec<StructField>, LoadError> {
        let p = self.parsed();
        let mut out = Vec::new();
        for &fid in p.arena.fields_list(fields) {
            let field = p.arena.fields[fid];
            let typ = self.resolve(field.typ)?;
            let tag = field.tag.and_then(|t| p.string_value(t));
            if field.is_embed {
                out.push(StructField {
                    name: embedded_name(&typ),
                    typ,
                    embedded: true,
                    tag,
                });
                continue;
            }
            for &n in p.arena.ident_names(field.names) {
                out.push(StructField {
                    name: p.name(n).to_string(),
                    typ: typ.clone(),
                    embedded: false,
                    tag: tag.clone(),
                });
            }
        }
        Ok(out)
    }

    fn interface(&self, elems: ast::ListRef<InterfaceElem>) -> Result<InterfaceType, LoadError> {
        let p = self.parsed();
        let mut out = InterfaceType::default();
        for elem in p.arena.interface_elems(elems) {
            match *elem {
                InterfaceElem::Method { doc, name, sig } => out.methods.push(InterfaceMethod {
                    name: p.name(name).to_string(),
                    sig: self.signature(sig)?,
                    doc: self.file.doc(doc),
                    pos: self.file.pos(name.pos),
                }),
                // type-set terms constrain, they add no methods
                InterfaceElem::Embed(t) => {
                    if !matches!(p.arena.types[p.arena.unparen(t)], ast::Type::Union { .. }) {
                        out.embeds.push(self.resolve(t)?);
                    }
                }
            }
        }
        Ok(out)
    }

    fn signature(&self, id: SignatureId) -> Result<Signature, LoadError> {
        let p = self.parsed();
        let sig = p.arena.signatures[id];
        let (params, variadic) = self.params(sig.params)?;
        let (results, _) = self.params(sig.results)?;
        Ok(Signature {
            params,
            results,
            variadic,
        })
    }

    fn params(&self, fields: ast::ListRef<FieldId>) -> Result<(Vec<Param>, bool), LoadError> {
        let p = self.parsed();
        let mut out = Vec::new();
        let mut variadic = false;
        for &fid in p.arena.fields_list(fields) {
            let field = p.arena.fields[fid];
            let mut typ = self.resolve(field.typ)?;
            if field.ellipsis_pos.is_some() {
                typ = Type::Slice(Box::new(typ));
                variadic = true;
            }
            let names = p.arena.ident_names(field.names);
            if names.is_empty() {
                out.push(Param { name: None, typ });
                continue;
            }
            for &n in names {
                out.push(Param {
                    name: Some(p.name(n).to_string()),
                    typ: typ.clone(),
                });
            }
        }
        Ok((out, variadic))
    }
}

/// Field name of an embedded `T`, `*T`, `pkg.T` or `T[A]`: the type name.
fn embedded_name(t: &Type) -> String {
    match t {
        Type::Pointer(elem) => embedded_name(elem),
        Type::Named(n) => n.name.clone(),
        Type::Basic(name) => name.rsplit('.').next().unwrap_or(name).to_string(),
        Type::TypeParam(name) => name.clone(),
        other => other.to_string(),
    }
}
