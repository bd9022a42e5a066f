//! Import aliases of the generated file.
//!
//! Every package a type string mentions gets an alias: its declared name.
//! Two distinct import paths that would share one alias are an error; the
//! generated file would not compile otherwise.

use std::collections::BTreeMap;

use crate::config::GenConfig;
use crate::error::GenError;
use crate::types::{assumed_package_name, write_type, PkgRef, Qualifier, Type};

/// One line of the generated import block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub path: String,
    /// Written only when Go tooling would not guess the name from the path.
    pub alias: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ImportTable {
    /// Import path to alias. The destination package maps to `""`.
    aliases: BTreeMap<String, String>,
}

impl ImportTable {
    /// Table holding the transport and context packages, plus `local`, the
    /// package the code is generated into, whose types stay unqualified.
    pub fn seeded(config: &GenConfig, local: &PkgRef) -> Self {
        let mut aliases = BTreeMap::new();
        aliases.insert(config.transport.path.clone(), config.transport.name.clone());
        aliases.insert(config.context.path.clone(), config.context.name.clone());
        aliases.insert(local.path.clone(), String::new());
        Self { aliases }
    }

    pub fn alias(&self, path: &str) -> Option<&str> {
        self.aliases.get(path).map(String::as_str)
    }

    /// Drops an import nothing in the file ended up using.
    pub fn remove(&mut self, path: &str) {
        self.aliases.remove(path);
    }

    /// Prefix for types of `pkg`; empty for the destination package.
    pub fn qualify_pkg(&mut self, pkg: &PkgRef) -> Result<String, GenError> {
        if let Some(alias) = self.aliases.get(&pkg.path) {
            return Ok(alias.clone());
        }
        if let Some((existing, _)) = self.aliases.iter().find(|(_, a)| **a == pkg.name) {
            return Err(GenError::AliasCollision {
                name: pkg.name.clone(),
                path: pkg.path.clone(),
                existing: existing.clone(),
            });
        }
        self.aliases.insert(pkg.path.clone(), pkg.name.clone());
        Ok(pkg.name.clone())
    }

    /// `t` as the generated file spells it, registering its packages.
    pub fn type_string(&mut self, t: &Type) -> Result<String, GenError> {
        let mut out = String::new();
        write_type(&mut out, t, self)?;
        Ok(out)
    }

    /// The import block, sorted by path, without the destination package.
    pub fn into_imports(self) -> Vec<Import> {
        self.aliases
            .into_iter()
            .filter(|(_, alias)| !alias.is_empty())
            .map(|(path, alias)| {
                let alias = (alias != assumed_package_name(&path)).then_some(alias);
                Import { path, alias }
            })
            .collect()
    }
}

impl Qualifier for ImportTable {
    type Error = GenError;

    fn qualify(&mut self, pkg: &PkgRef) -> Result<String, GenError> {
        self.qualify_pkg(pkg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NamedType;

    fn pkg(path: &str, name: &str) -> PkgRef {
        PkgRef {
            path: path.to_string(),
            name: name.to_string(),
        }
    }

    fn named(pkg: PkgRef, name: &str) -> Type {
        Type::Named(NamedType {
            pkg,
            name: name.to_string(),
            args: Vec::new(),
        })
    }

    fn table() -> ImportTable {
        ImportTable::seeded(&GenConfig::default(), &pkg("example.com/client", "client"))
    }

    #[test]
    fn local_types_stay_unqualified() {
        let mut t = table();
        let s = t
            .type_string(&Type::pointer(named(pkg("example.com/client", "client"), "Resp")))
            .unwrap();
        assert_eq!(s, "*Resp");
    }

    #[test]
    fn registers_new_packages() {
        let mut t = table();
        let s = t
            .type_string(&Type::Map(
                Box::new(Type::Basic("string")),
                Box::new(named(pkg("example.com/server/params", "params"), "Req")),
            ))
            .unwrap();
        assert_eq!(s, "map[string]params.Req");
        assert_eq!(t.alias("example.com/server/params"), Some("params"));
    }

    #[test]
    fn same_name_different_path_collides() {
        let mut t = table();
        let err = t
            .type_string(&named(pkg("example.com/other/context", "context"), "Thing"))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "duplicate package name context: example.com/other/context vs context"
        );
    }

    #[test]
    fn imports_sorted_with_needed_aliases() {
        let mut t = table();
        t.qualify_pkg(&pkg("example.com/go-params/v2", "params")).unwrap();
        t.qualify_pkg(&pkg("example.com/weird-path", "real")).unwrap();
        let imports = t.into_imports();
        let lines: Vec<(&str, Option<&str>)> = imports
            .iter()
            .map(|i| (i.path.as_str(), i.alias.as_deref()))
            .collect();
        assert_eq!(
            lines,
            vec![
                ("context", None),
                ("example.com/go-params/v2", None),
                ("example.com/weird-path", Some("real")),
                ("gopkg.in/httprequest.v1", None),
            ]
        );
    }
}
