//! `go.mod` discovery and import path → directory resolution.

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::config::GoEnv;
use crate::error::LoadError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Require {
    pub path: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplaceTarget {
    /// Local directory, already joined onto the module root.
    Dir(PathBuf),
    Module { path: String, version: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replace {
    pub old: String,
    pub old_version: Option<String>,
    pub new: ReplaceTarget,
}

/// The parts of a `go.mod` file that affect where packages live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoMod {
    pub root: PathBuf,
    pub module: String,
    pub requires: Vec<Require>,
    pub replaces: Vec<Replace>,
}

/// Nearest ancestor of `start` (inclusive) containing a `go.mod` file.
pub fn find_module_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join("go.mod").is_file())
        .map(Path::to_path_buf)
}

/// Splits a go.mod line into fields, honouring quoted strings and `//` comments.
fn fields(line: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = line.trim();
    while !rest.is_empty() {
        if rest.starts_with("//") {
            break;
        }
        let (field, tail) = match rest.chars().next() {
            Some(q @ ('"' | '`')) => match rest[1..].find(q) {
                Some(end) => (&rest[1..end + 1], &rest[end + 2..]),
                None => (&rest[1..], ""),
            },
            _ => {
                let end = rest
                    .find(|c: char| c.is_whitespace())
                    .unwrap_or(rest.len());
                (&rest[..end], &rest[end..])
            }
        };
        out.push(field.to_string());
        rest = tail.trim_start();
    }
    out
}

pub fn parse_go_mod(path: &Path, src: &str) -> Result<GoMod, LoadError> {
    let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let err = |line: usize, message: String| LoadError::GoMod {
        path: path.to_path_buf(),
        line,
        message,
    };

    let mut module = None;
    let mut requires = Vec::new();
    let mut replaces = Vec::new();
    let mut block: Option<String> = None;

    for (idx, raw) in src.lines().enumerate() {
        let lineno = idx + 1;
        let mut f = fields(raw);
        if f.is_empty() {
            continue;
        }

        let verb = match &block {
            Some(_) if f[0] == ")" => {
                block = None;
                continue;
            }
            Some(verb) => verb.clone(),
            None => {
                let verb = f.remove(0);
                if f.len() == 1 && f[0] == "(" {
                    block = Some(verb);
                    continue;
                }
                verb
            }
        };

        match verb.as_str() {
            "module" => match f.as_slice() {
                [m] => module = Some(m.clone()),
                _ => return Err(err(lineno, "usage: module module/path".into())),
            },
            "require" => match f.as_slice() {
                [p, v, ..] => requires.push(Require {
                    path: p.clone(),
                    version: v.clone(),
                }),
                _ => return Err(err(lineno, "usage: require module/path v1.2.3".into())),
            },
            "replace" => {
                let arrow = f
                    .iter()
                    .position(|s| s == "=>")
                    .ok_or_else(|| err(lineno, "replacement requires =>".into()))?;
                let (old, new) = f.split_at(arrow);
                let new = &new[1..];
                let (old, old_version) = match old {
                    [p] => (p.clone(), None),
                    [p, v] => (p.clone(), Some(v.clone())),
                    _ => return Err(err(lineno, "usage: replace module/path [v] => target".into())),
                };
                let new = match new {
                    [p] if is_local_path(p) => ReplaceTarget::Dir(root.join(p)),
                    [p, v] => ReplaceTarget::Module {
                        path: p.clone(),
                        version: v.clone(),
                    },
                    _ => {
                        return Err(err(
                            lineno,
                            "replacement module without version must be a directory path".into(),
                        ))
                    }
                };
                replaces.push(Replace {
                    old,
                    old_version,
                    new,
                });
            }
            // go, toolchain, exclude, retract, godebug, tool: nothing to locate
            _ => {}
        }
    }

    let module = module.ok_or_else(|| err(1, "no module directive".into()))?;
    Ok(GoMod {
        root,
        module,
        requires,
        replaces,
    })
}

fn is_local_path(p: &str) -> bool {
    p.starts_with("./") || p.starts_with("../") || p == "." || p == ".." || Path::new(p).is_absolute()
}

/// Module cache directory escaping: upper-case letters become `!` + lower-case.
pub fn escape_module_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        if c.is_ascii_uppercase() {
            out.push('!');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Standard library paths have no dot in their first element.
pub fn is_std_path(path: &str) -> bool {
    !path.split('/').next().unwrap_or(path).contains('.')
}

/// `rest` of `path` below `prefix`, if `path` is `prefix` or inside it.
fn strip_path_prefix<'p>(path: &'p str, prefix: &str) -> Option<&'p str> {
    match path.strip_prefix(prefix)? {
        "" => Some(""),
        rest => rest.strip_prefix('/'),
    }
}

fn join_import(dir: &Path, rest: &str) -> PathBuf {
    rest.split('/')
        .filter(|e| !e.is_empty())
        .fold(dir.to_path_buf(), |d, e| d.join(e))
}

/// Where packages are searched for: the main module (if any) and the Go toolchain layout.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub cwd: PathBuf,
    pub env: GoEnv,
    pub module: Option<GoMod>,
}

impl Workspace {
    pub fn discover(cwd: &Path, env: GoEnv) -> Result<Self, LoadError> {
        let cwd = absolutize(cwd);
        let module = match find_module_root(&cwd) {
            Some(root) => {
                let path = root.join("go.mod");
                let src = fs::read_to_string(&path).map_err(|source| LoadError::Io {
                    path: path.clone(),
                    source,
                })?;
                let m = parse_go_mod(&path, &src)?;
                debug!(module = %m.module, root = %m.root.display(), "found go.mod");
                Some(m)
            }
            None => None,
        };
        Ok(Self { cwd, env, module })
    }

    /// Directory holding `import_path`. `importer` is the directory of the
    /// importing package, used for the standard library's own vendor tree.
    pub fn locate(&self, import_path: &str, importer: Option<&Path>) -> Option<PathBuf> {
        self.candidates(import_path, importer)
            .into_iter()
            .find(|dir| dir.is_dir())
    }

    fn candidates(&self, path: &str, importer: Option<&Path>) -> Vec<PathBuf> {
        let mut out = Vec::new();

        if let Some(m) = &self.module {
            if let Some(rest) = strip_path_prefix(path, &m.module) {
                out.push(join_import(&m.root, rest));
            }

            let replaced = m
                .replaces
                .iter()
                .filter_map(|r| strip_path_prefix(path, &r.old).map(|rest| (r, rest)))
                .max_by_key(|(r, _)| r.old.len());
            if let Some((r, rest)) = replaced {
                match &r.new {
                    ReplaceTarget::Dir(dir) => out.push(join_import(dir, rest)),
                    ReplaceTarget::Module { path, version } => {
                        if let Some(cache) = &self.env.gomodcache {
                            out.push(module_cache_dir(cache, path, version, rest));
                        }
                    }
                }
            }

            out.push(join_import(&m.root.join("vendor"), path));
        }

        if is_std_path(path) {
            if let Some(goroot) = &self.env.goroot {
                out.push(join_import(&goroot.join("src"), path));
            }
        } else if let (Some(goroot), Some(importer)) = (&self.env.goroot, importer) {
            let std_src = goroot.join("src");
            if importer.starts_with(&std_src) {
                out.push(join_import(&std_src.join("vendor"), path));
            }
        }

        if let (Some(m), Some(cache)) = (&self.module, &self.env.gomodcache) {
            let required = m
                .requires
                .iter()
                .filter_map(|r| strip_path_prefix(path, &r.path).map(|rest| (r, rest)))
                .max_by_key(|(r, _)| r.path.len());
            if let Some((r, rest)) = required {
                out.push(module_cache_dir(cache, &r.path, &r.version, rest));
            }
        }

        for gopath in &self.env.gopath {
            out.push(join_import(&gopath.join("src"), path));
        }

        out
    }

    /// Import path of the package in `dir`, from its position in the main
    /// module, a GOPATH tree or GOROOT. Directories outside all of them get
    /// the go command's `_/abs/dir` form.
    pub fn import_path_of_dir(&self, dir: &Path) -> String {
        let dir = absolutize(dir);
        if let Some(m) = &self.module {
            if let Ok(rel) = dir.strip_prefix(&m.root) {
                return join_rel(&m.module, rel);
            }
        }
        let trees = self
            .env
            .gopath
            .iter()
            .chain(self.env.goroot.iter())
            .map(|p| p.join("src"));
        for src in trees {
            if let Ok(rel) = dir.strip_prefix(&src) {
                return join_rel("", rel);
            }
        }
        format!("_{}", dir.display())
    }

    /// `./x` and `../x` name directories relative to the working directory.
    pub fn local_dir(&self, path: &str) -> Option<PathBuf> {
        is_local_path(path).then(|| absolutize(&self.cwd.join(path)))
    }
}

fn module_cache_dir(cache: &Path, module: &str, version: &str, rest: &str) -> PathBuf {
    let dir = format!(
        "{}@{}",
        escape_module_path(module),
        escape_module_path(version)
    );
    join_import(&join_import(cache, &dir), rest)
}

fn join_rel(base: &str, rel: &Path) -> String {
    let mut out = base.to_string();
    for comp in rel.components() {
        if let Component::Normal(c) = comp {
            if !out.is_empty() {
                out.push('/');
            }
            out.push_str(&c.to_string_lossy());
        }
    }
    out
}

/// Lexically normalized absolute path; symlinks are left alone.
pub fn absolutize(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    let mut out = PathBuf::new();
    for comp in joined.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const GO_MOD: &str = r#"
module example.com/app // the app

go 1.22

require (
	github.com/Foo/bar v1.2.3
	gopkg.in/httprequest.v1 v1.2.1 // indirect
)

require golang.org/x/net v0.20.0

replace (
	github.com/other/lib => ../lib
	golang.org/x/net v0.20.0 => golang.org/x/net v0.21.0
)
"#;

    #[test]
    fn parses_directives_in_both_forms() {
        let m = parse_go_mod(Path::new("/w/app/go.mod"), GO_MOD).unwrap();
        assert_eq!(m.module, "example.com/app");
        assert_eq!(m.root, PathBuf::from("/w/app"));
        assert_eq!(m.requires.len(), 3);
        assert_eq!(m.requires[2].path, "golang.org/x/net");
        assert_eq!(
            m.replaces[0].new,
            ReplaceTarget::Dir(PathBuf::from("/w/app/../lib"))
        );
        assert_eq!(m.replaces[1].old_version.as_deref(), Some("v0.20.0"));
    }

    #[test]
    fn missing_module_directive_is_an_error() {
        let err = parse_go_mod(Path::new("/w/go.mod"), "go 1.21\n").unwrap_err();
        assert!(err.to_string().contains("no module directive"), "{err}");
    }

    #[test]
    fn candidate_order() {
        let env = GoEnv {
            goroot: Some("/goroot".into()),
            gopath: vec!["/gopath".into()],
            gomodcache: Some("/cache".into()),
            ..GoEnv::default()
        };
        let ws = Workspace {
            cwd: "/w/app".into(),
            env,
            module: Some(parse_go_mod(Path::new("/w/app/go.mod"), GO_MOD).unwrap()),
        };

        assert_eq!(
            ws.candidates("example.com/app/server", None)[0],
            PathBuf::from("/w/app/server")
        );
        assert!(ws
            .candidates("github.com/Foo/bar/baz", None)
            .contains(&PathBuf::from("/cache/github.com/!foo/bar@v1.2.3/baz")));
        assert!(ws
            .candidates("golang.org/x/net/context", None)
            .contains(&PathBuf::from("/cache/golang.org/x/net@v0.21.0/context")));
        assert!(ws
            .candidates("context", None)
            .contains(&PathBuf::from("/goroot/src/context")));
        assert_eq!(
            ws.candidates("github.com/other/lib/x", None)[0],
            PathBuf::from("/w/app/../lib/x")
        );
    }

    #[test]
    fn import_path_of_dir_prefers_module() {
        let ws = Workspace {
            cwd: "/w/app".into(),
            env: GoEnv {
                gopath: vec!["/gopath".into()],
                ..GoEnv::default()
            },
            module: Some(parse_go_mod(Path::new("/w/app/go.mod"), GO_MOD).unwrap()),
        };
        assert_eq!(ws.import_path_of_dir(Path::new("/w/app")), "example.com/app");
        assert_eq!(
            ws.import_path_of_dir(Path::new("/w/app/a/b")),
            "example.com/app/a/b"
        );
        assert_eq!(
            ws.import_path_of_dir(Path::new("/gopath/src/x.org/y")),
            "x.org/y"
        );
        assert_eq!(ws.import_path_of_dir(Path::new("/tmp/z")), "_/tmp/z");
    }
}
