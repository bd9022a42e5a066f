//! Method set of `*T`, promoted methods included.
//!
//! Embedded fields are flattened breadth first, one depth at a time. An entry
//! found at a shallower depth shadows every deeper entry of the same name,
//! whether the shallow one is a method or a field. Two entries with the same
//! name at one depth collide and neither is promoted; a type embedded more
//! than once at one depth only ever contributes collisions.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::warn;

use crate::error::GenError;
use crate::types::{
    InterfaceMethod, InterfaceType, NamedType, Object, PkgRef, Position, Program, Signature, Type,
};

/// A method reachable through `*T`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub name: String,
    /// Signature with the declaring type's arguments substituted.
    pub sig: Signature,
    pub doc: Option<String>,
    pub pos: Position,
    /// The type declaring the method, as written in diagnostics.
    pub recv: String,
    pub pointer_recv: bool,
    /// 0 for methods declared on `T` itself.
    pub depth: usize,
}

/// Finds the type `name` in `pkg`.
///
/// Generic types come back instantiated with their own parameters.
pub fn lookup_type(program: &Program, pkg: &PkgRef, name: &str) -> Result<NamedType, GenError> {
    let not_found = || GenError::NotFound {
        name: name.to_string(),
        pkg: pkg.path.clone(),
    };
    let package = program.package(&pkg.path).ok_or_else(not_found)?;
    match package.scope.get(name) {
        Some(Object::Type(decl)) => Ok(NamedType {
            pkg: package.as_ref(),
            name: name.to_string(),
            args: decl
                .type_params
                .iter()
                .map(|p| Type::TypeParam(p.clone()))
                .collect(),
        }),
        Some(_) => Err(GenError::NotAType {
            name: name.to_string(),
        }),
        None => Err(not_found()),
    }
}

/// One embedded type waiting to be searched at the next depth.
#[derive(Debug, Clone)]
struct Embedded {
    /// Always unaliased, so two spellings of one type compare equal.
    typ: Type,
    /// Embedded more than once at its depth.
    multiples: bool,
}

/// `None` marks a collision.
type Level = HashMap<String, Option<Selection>>;

fn add_method(level: &mut Level, sel: Selection, multiples: bool) {
    match level.get_mut(&sel.name) {
        Some(slot) => *slot = None,
        None => {
            let name = sel.name.clone();
            level.insert(name, (!multiples).then_some(sel));
        }
    }
}

/// Methods of the pointer type `*named`, sorted by name.
pub fn pointer_method_set(program: &Program, named: &NamedType) -> Vec<Selection> {
    let start = program.unalias(&Type::Named(named.clone()));
    match program.underlying(&start) {
        Type::Interface(_) => {
            warn!("{start} is an interface type; a pointer to it has no methods");
            return Vec::new();
        }
        Type::Pointer(_) => {
            warn!("{start} is a pointer type; a pointer to it has no methods");
            return Vec::new();
        }
        _ => {}
    }

    let mut base: BTreeMap<String, Option<Selection>> = BTreeMap::new();
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut current = vec![Embedded {
        typ: start,
        multiples: false,
    }];
    let mut depth = 0;

    while !current.is_empty() {
        let mut methods: Level = HashMap::new();
        let mut fields: HashSet<String> = HashSet::new();
        let mut next: Vec<Embedded> = Vec::new();

        for e in &current {
            let typ = &e.typ;
            if let Type::Named(n) = typ {
                if !seen.insert((n.pkg.path.clone(), n.name.clone())) {
                    continue;
                }
                for sel in declared_methods(program, n, depth) {
                    add_method(&mut methods, sel, e.multiples);
                }
            }

            match program.underlying(typ) {
                Type::Struct(struct_fields) => {
                    for f in struct_fields {
                        // fields never promote, they only shadow deeper names
                        fields.insert(f.name.clone());
                        if f.embedded {
                            let typ = match f.typ {
                                Type::Pointer(elem) => *elem,
                                other => other,
                            };
                            next.push(Embedded {
                                typ: program.unalias(&typ),
                                multiples: e.multiples,
                            });
                        }
                    }
                }
                Type::Interface(it) => {
                    let recv = e.typ.to_string();
                    for m in interface_methods(program, &it) {
                        let sel = Selection {
                            name: m.name,
                            sig: m.sig,
                            doc: m.doc,
                            pos: m.pos,
                            recv: recv.clone(),
                            pointer_recv: false,
                            depth,
                        };
                        add_method(&mut methods, sel, e.multiples);
                    }
                }
                _ => {}
            }
        }

        for (name, sel) in methods {
            if base.contains_key(&name) {
                continue;
            }
            let sel = if fields.contains(&name) { None } else { sel };
            base.insert(name, sel);
        }
        for name in fields {
            base.entry(name).or_insert(None);
        }

        current = consolidate_multiples(next);
        depth += 1;
    }

    base.into_values().flatten().collect()
}

/// Declared methods of `n`, value receivers first, then pointer receivers.
/// A name declared with both keeps the pointer one.
fn declared_methods(program: &Program, n: &NamedType, depth: usize) -> Vec<Selection> {
    let Some(package) = program.package(&n.pkg.path) else {
        return Vec::new();
    };
    let recv = Type::Named(n.clone()).to_string();

    let mut out: Vec<Selection> = Vec::new();
    for pointer_pass in [false, true] {
        for m in package
            .methods_of(&n.name)
            .iter()
            .filter(|m| m.pointer_recv == pointer_pass)
        {
            let map: HashMap<String, Type> = m
                .recv_type_params
                .iter()
                .cloned()
                .zip(n.args.iter().cloned())
                .collect();
            let sel = Selection {
                name: m.name.clone(),
                sig: m.sig.subst(&map),
                doc: m.doc.clone(),
                pos: m.pos.clone(),
                recv: recv.clone(),
                pointer_recv: m.pointer_recv,
                depth,
            };
            match out.iter_mut().find(|s| s.name == sel.name) {
                Some(existing) => *existing = sel,
                None => out.push(sel),
            }
        }
    }
    out
}

/// Flattened methods of an interface, embedded interfaces included.
fn interface_methods(program: &Program, it: &InterfaceType) -> Vec<InterfaceMethod> {
    fn collect(
        program: &Program,
        it: &InterfaceType,
        seen: &mut HashSet<String>,
        out: &mut Vec<InterfaceMethod>,
    ) {
        for m in &it.methods {
            if !out.iter().any(|o| o.name == m.name) {
                out.push(m.clone());
            }
        }
        for embed in &it.embeds {
            if let Type::Named(n) = embed {
                if !seen.insert(format!("{}.{}", n.pkg.path, n.name)) {
                    continue;
                }
            }
            if let Type::Interface(inner) = program.underlying(embed) {
                collect(program, &inner, seen, out);
            }
        }
    }

    let mut out = Vec::new();
    collect(program, it, &mut HashSet::new(), &mut out);
    out
}

/// Merges entries for the same type; a type seen more than once is marked.
fn consolidate_multiples(list: Vec<Embedded>) -> Vec<Embedded> {
    let mut out: Vec<Embedded> = Vec::with_capacity(list.len());
    for e in list {
        match out.iter_mut().find(|o| o.typ == e.typ) {
            Some(existing) => existing.multiples = true,
            None => out.push(e),
        }
    }
    out
}
