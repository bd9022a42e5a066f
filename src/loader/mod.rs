//! Type Graph Loader.
//!
//! Loads a package from source together with every package its declarations
//! refer to, and resolves them into one [`Program`]. Only imports that are
//! named in declarations (types, signatures, const/var types) are followed;
//! function bodies never pull in a dependency. Imports that cannot be located
//! on disk become opaque packages.

mod build;
mod module;
mod resolve;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use go_syntax::ast::{self, AstArena, ImportName, TypeId};
use go_syntax::walk::{Visitor, Walk};
use go_syntax::{leading_comments, parse_source, LineIndex, ParseFailure, ParsedFile};
use tracing::debug;

pub use build::{candidate_files, matches_constraints, matches_file_name, matches_tag};
pub use module::{
    absolutize, escape_module_path, find_module_root, is_std_path, parse_go_mod, GoMod, Replace,
    ReplaceTarget, Require, Workspace,
};

use crate::config::GoEnv;
use crate::error::LoadError;
use crate::types::{assumed_package_name, Package, PackageKind, PkgRef, Position, Program};
use resolve::{resolve_package, LoadedFile};

struct RawFile {
    path: PathBuf,
    parsed: ParsedFile,
}

pub struct Loader {
    ws: Workspace,
    program: Program,
    /// Packages whose dependencies are being loaded, outermost first.
    stack: Vec<String>,
}

impl Loader {
    pub fn new(ws: Workspace) -> Self {
        Self {
            ws,
            program: Program::new(),
            stack: Vec::new(),
        }
    }

    /// Loader for the module around `cwd`.
    pub fn discover(cwd: &Path, env: GoEnv) -> Result<Self, LoadError> {
        Ok(Self::new(Workspace::discover(cwd, env)?))
    }

    pub fn workspace(&self) -> &Workspace {
        &self.ws
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn into_program(self) -> Program {
        self.program
    }

    /// Loads `target` (an import path, or a `./dir` relative to the working
    /// directory) and its dependencies.
    pub fn load(&mut self, target: &str) -> Result<PkgRef, LoadError> {
        let (path, dir) = match self.ws.local_dir(target) {
            Some(dir) => (self.ws.import_path_of_dir(&dir), dir),
            None => {
                let dir = self
                    .ws
                    .locate(target, None)
                    .ok_or_else(|| LoadError::NotFound {
                        path: target.to_string(),
                        from: self.ws.cwd.clone(),
                    })?;
                (target.to_string(), dir)
            }
        };

        if !self.program.contains(&path) {
            self.load_dir(&path, &dir, true)?;
        }
        match self.program.package(&path) {
            Some(pkg) => Ok(pkg.as_ref()),
            None => Err(LoadError::NotFound {
                path,
                from: self.ws.cwd.clone(),
            }),
        }
    }

    /// Import path and name of the package in `dir`, read from its package
    /// clauses only. Dependencies are not loaded and syntax errors past the
    /// package clause are ignored.
    pub fn local_package(&self, dir: &Path) -> Result<PkgRef, LoadError> {
        let dir = absolutize(dir);
        let mut names = Vec::new();
        for path in candidate_files(&dir, &self.ws.env)? {
            let src = read_source(&path)?;
            if !matches_constraints(leading_comments(&src), &self.ws.env) {
                continue;
            }
            let parsed = match parse_source(&src) {
                Ok(parsed) => Some(parsed),
                Err(ParseFailure { partial, .. }) => partial,
            };
            if let Some(parsed) = parsed {
                names.push(parsed.package_name().to_string());
            }
        }
        let name = single_package_name(&dir, names)?;
        Ok(PkgRef {
            path: self.ws.import_path_of_dir(&dir),
            name,
        })
    }

    fn load_import(&mut self, path: &str, importer: &Path) -> Result<(), LoadError> {
        if self.program.contains(path) {
            return Ok(());
        }
        if let Some(i) = self.stack.iter().position(|p| p == path) {
            let mut cycle = self.stack[i..].to_vec();
            cycle.push(path.to_string());
            return Err(LoadError::ImportCycle(cycle));
        }
        if path == "unsafe" {
            self.program.insert(Package {
                kind: PackageKind::Source,
                ..Package::opaque("unsafe", "unsafe")
            });
            return Ok(());
        }

        match self.ws.locate(path, Some(importer)) {
            Some(dir) => self.load_dir(path, &dir, false),
            None => {
                let name = assumed_package_name(path);
                debug!(%path, %name, "package not found on disk; treating it as opaque");
                self.program.insert(Package::opaque(path, name));
                Ok(())
            }
        }
    }

    fn load_dir(&mut self, path: &str, dir: &Path, strict: bool) -> Result<(), LoadError> {
        debug!(%path, dir = %dir.display(), "loading package");
        let files = self.read_files(dir)?;
        let name = single_package_name(
            dir,
            files.iter().map(|f| f.parsed.package_name().to_string()),
        )?;

        self.stack.push(path.to_string());
        let deps = needed_imports(&files)
            .iter()
            .try_for_each(|import| self.load_import(import, dir));
        self.stack.pop();
        deps?;

        let files = bind_imports(&self.program, files);
        let pkg = PkgRef {
            path: path.to_string(),
            name,
        };
        let pkg = resolve_package(&self.program, &pkg, dir, &files, strict)?;
        debug!(
            %path,
            files = files.len(),
            decls = pkg.scope.len(),
            "loaded package"
        );
        self.program.insert(pkg);
        Ok(())
    }

    fn read_files(&self, dir: &Path) -> Result<Vec<RawFile>, LoadError> {
        let mut out = Vec::new();
        for path in candidate_files(dir, &self.ws.env)? {
            let src = read_source(&path)?;
            if !matches_constraints(leading_comments(&src), &self.ws.env) {
                debug!(file = %path.display(), "excluded by build constraints");
                continue;
            }
            let parsed = parse_source(&src).map_err(|f| syntax_error(&path, &src, f))?;
            let imports_c = parsed
                .imports()
                .iter()
                .any(|i| parsed.string_value(i.path).as_deref() == Some("C"));
            if imports_c {
                debug!(file = %path.display(), "skipping cgo file");
                continue;
            }
            out.push(RawFile { path, parsed });
        }
        Ok(out)
    }
}

fn read_source(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn syntax_error(path: &Path, src: &str, failure: ParseFailure) -> LoadError {
    let lines = LineIndex::new(src);
    let (line, message) = match failure.diags.first() {
        Some(d) if failure.diags.len() > 1 => (
            lines.line(d.span.start),
            format!("{} (and {} more errors)", d.message, failure.diags.len() - 1),
        ),
        Some(d) => (lines.line(d.span.start), d.message.clone()),
        None => (1, "syntax error".to_string()),
    };
    LoadError::Syntax {
        pos: Position {
            file: path.to_path_buf(),
            line,
        },
        message,
    }
}

fn single_package_name(
    dir: &Path,
    names: impl IntoIterator<Item = String>,
) -> Result<String, LoadError> {
    let mut found: Option<String> = None;
    for name in names {
        match &found {
            None => found = Some(name),
            Some(first) if *first != name => {
                return Err(LoadError::MultiplePackages {
                    dir: dir.to_path_buf(),
                    first: first.clone(),
                    second: name,
                })
            }
            Some(_) => {}
        }
    }
    found.ok_or_else(|| LoadError::NoGoFiles {
        dir: dir.to_path_buf(),
    })
}

/// Package qualifiers (`pkg` in `pkg.T`) named anywhere in a file's declarations.
struct Qualifiers<'p> {
    parsed: &'p ParsedFile,
    found: HashSet<String>,
}

impl<'ast> Visitor<'ast> for Qualifiers<'_> {
    fn visit_type(&mut self, a: &'ast AstArena, id: TypeId) {
        if let ast::Type::Named { pkg: Some(q), .. } = a.types[id] {
            self.found.insert(self.parsed.name(q).to_string());
        }
        a.types[id].walk(a, self);
    }
}

fn used_qualifiers(parsed: &ParsedFile) -> HashSet<String> {
    let mut v = Qualifiers {
        parsed,
        found: HashSet::new(),
    };
    v.visit_source_file(&parsed.arena, &parsed.file);
    v.found
}

/// Imports a package's declarations depend on, in first-use order.
///
/// An unaliased import is matched through the name guessed from its path;
/// when some qualifier matches no import that way, every unmatched
/// unaliased import is loaded so its real name can be learned.
fn needed_imports(files: &[RawFile]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut push = |path: String| {
        if !out.contains(&path) {
            out.push(path);
        }
    };

    for f in files {
        let p = &f.parsed;
        let used = used_qualifiers(p);
        let mut matched = HashSet::new();
        let mut unmatched = Vec::new();

        for spec in p.imports() {
            let Some(path) = p.string_value(spec.path) else {
                continue;
            };
            match spec.name {
                Some(ImportName::Blank(_)) => {}
                Some(ImportName::Dot(_)) => push(path),
                Some(ImportName::Name(n)) => {
                    let name = p.name(n);
                    if used.contains(name) {
                        matched.insert(name.to_string());
                        push(path);
                    }
                }
                None => {
                    let guess = assumed_package_name(&path).to_string();
                    if used.contains(&guess) {
                        matched.insert(guess);
                        push(path);
                    } else {
                        unmatched.push(path);
                    }
                }
            }
        }

        if used.iter().any(|q| !matched.contains(q)) {
            unmatched.into_iter().for_each(&mut push);
        }
    }
    out
}

/// Maps each file's import names to the loaded packages they denote.
fn bind_imports(program: &Program, files: Vec<RawFile>) -> Vec<LoadedFile> {
    files
        .into_iter()
        .map(|f| {
            let mut imports = std::collections::HashMap::new();
            let mut dot_imports = Vec::new();
            for spec in f.parsed.imports() {
                let Some(path) = f.parsed.string_value(spec.path) else {
                    continue;
                };
                let Some(pkg) = program.package(&path) else {
                    continue;
                };
                let pkg = pkg.as_ref();
                match spec.name {
                    Some(ImportName::Blank(_)) => {}
                    Some(ImportName::Dot(_)) => dot_imports.push(pkg),
                    Some(ImportName::Name(n)) => {
                        imports.insert(f.parsed.name(n).to_string(), pkg);
                    }
                    None => {
                        imports.insert(pkg.name.clone(), pkg);
                    }
                }
            }
            LoadedFile {
                path: f.path,
                parsed: f.parsed,
                imports,
                dot_imports,
            }
        })
        .collect()
}

/// Loads `target` as seen from `cwd` and returns the program with the target's reference.
pub fn load_program(cwd: &Path, env: GoEnv, target: &str) -> Result<(Program, PkgRef), LoadError> {
    let mut loader = Loader::discover(cwd, env)?;
    let pkg = loader.load(target)?;
    Ok((loader.into_program(), pkg))
}
