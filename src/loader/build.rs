//! Which `.go` files in a directory take part in the build.
//!
//! Mirrors the go command with cgo disabled: `_test.go`, `_x.go` and `.x.go`
//! files are never read, `_GOOS`/`_GOARCH` file name suffixes and
//! `//go:build` (or legacy `// +build`) lines are matched against the
//! configured platform.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::GoEnv;
use crate::error::LoadError;

const KNOWN_OS: &[&str] = &[
    "aix", "android", "darwin", "dragonfly", "freebsd", "hurd", "illumos", "ios", "js", "linux",
    "nacl", "netbsd", "openbsd", "plan9", "solaris", "wasip1", "windows", "zos",
];

const KNOWN_ARCH: &[&str] = &[
    "386", "amd64", "amd64p32", "arm", "armbe", "arm64", "arm64be", "loong64", "mips", "mipsle",
    "mips64", "mips64le", "mips64p32", "mips64p32le", "ppc", "ppc64", "ppc64le", "riscv",
    "riscv64", "s390", "s390x", "sparc", "sparc64", "wasm",
];

const UNIX_OS: &[&str] = &[
    "aix",
    "android",
    "darwin",
    "dragonfly",
    "freebsd",
    "hurd",
    "illumos",
    "ios",
    "linux",
    "netbsd",
    "openbsd",
    "solaris",
];

/// Sorted `.go` files of `dir` whose names fit the platform.
pub fn candidate_files(dir: &Path, env: &GoEnv) -> Result<Vec<PathBuf>, LoadError> {
    let io_err = |source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        if !entry.file_type().map_err(io_err)?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if is_source_name(name) && matches_file_name(name, env) {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

fn is_source_name(name: &str) -> bool {
    name.ends_with(".go")
        && !name.ends_with("_test.go")
        && !name.starts_with('_')
        && !name.starts_with('.')
}

/// `x_linux.go`, `x_arm64.go`, `x_linux_arm64.go` only build on that platform.
pub fn matches_file_name(name: &str, env: &GoEnv) -> bool {
    let stem = name.strip_suffix(".go").unwrap_or(name);
    let stem = stem.strip_suffix("_test").unwrap_or(stem);
    let Some(i) = stem.find('_') else {
        return true;
    };
    let parts: Vec<&str> = stem[i..].split('_').collect();
    let n = parts.len();

    if n >= 2 && KNOWN_OS.contains(&parts[n - 2]) && KNOWN_ARCH.contains(&parts[n - 1]) {
        return matches_tag(parts[n - 2], env) && matches_tag(parts[n - 1], env);
    }
    let last = parts[n - 1];
    if KNOWN_OS.contains(&last) || KNOWN_ARCH.contains(&last) {
        return matches_tag(last, env);
    }
    true
}

/// Evaluates the build constraint among `header` comments (those above the
/// package clause). `//go:build` wins over `// +build` lines.
pub fn matches_constraints<'a>(header: impl IntoIterator<Item = &'a str>, env: &GoEnv) -> bool {
    let mut plus_lines = Vec::new();
    for comment in header {
        for line in comment.lines() {
            let line = line.trim();
            if let Some(expr) = line.strip_prefix("//go:build") {
                if expr.starts_with(|c: char| c.is_whitespace()) {
                    return eval_expr(expr, env).unwrap_or(false);
                }
            } else if let Some(expr) = line.strip_prefix("//") {
                if let Some(opts) = expr.trim_start().strip_prefix("+build") {
                    plus_lines.push(opts.to_string());
                }
            }
        }
    }
    plus_lines.iter().all(|line| eval_plus_build(line, env))
}

/// Whether a single tag holds for the platform. `cgo`, `ignore` and custom
/// tags never do; release tags `go1.N` always do.
pub fn matches_tag(tag: &str, env: &GoEnv) -> bool {
    let goos = env.goos.as_str();
    match tag {
        "gc" => true,
        "unix" => UNIX_OS.contains(&goos),
        t if t == goos => true,
        t if t == env.goarch => true,
        "linux" => goos == "android",
        "solaris" => goos == "illumos",
        "darwin" => goos == "ios",
        t => t
            .strip_prefix("go1.")
            .is_some_and(|v| !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit())),
    }
}

/// `// +build a,b !c` : lines of space-separated alternatives of comma-joined terms.
fn eval_plus_build(line: &str, env: &GoEnv) -> bool {
    line.split_whitespace().any(|alt| {
        alt.split(',').all(|term| match term.strip_prefix('!') {
            Some(t) => !t.is_empty() && !matches_tag(t, env),
            None => matches_tag(term, env),
        })
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ExprTok<'a> {
    Tag(&'a str),
    Not,
    And,
    Or,
    LParen,
    RParen,
}

fn tokenize(expr: &str) -> Option<Vec<ExprTok<'_>>> {
    let mut out = Vec::new();
    let bytes = expr.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let rest = &expr[i..];
        let (tok, len) = match bytes[i] {
            b' ' | b'\t' => {
                i += 1;
                continue;
            }
            b'!' => (ExprTok::Not, 1),
            b'(' => (ExprTok::LParen, 1),
            b')' => (ExprTok::RParen, 1),
            b'&' if rest.starts_with("&&") => (ExprTok::And, 2),
            b'|' if rest.starts_with("||") => (ExprTok::Or, 2),
            b if b.is_ascii_alphanumeric() || b == b'_' || b == b'.' => {
                let len = rest
                    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '.'))
                    .unwrap_or(rest.len());
                (ExprTok::Tag(&rest[..len]), len)
            }
            _ => return None,
        };
        out.push(tok);
        i += len;
    }
    Some(out)
}

/// `//go:build` expression; `None` when it does not parse.
fn eval_expr(expr: &str, env: &GoEnv) -> Option<bool> {
    struct P<'t, 'a> {
        toks: &'t [ExprTok<'a>],
        pos: usize,
        env: &'t GoEnv,
    }

    impl P<'_, '_> {
        fn eat(&mut self, t: &ExprTok<'_>) -> bool {
            if self.toks.get(self.pos) == Some(t) {
                self.pos += 1;
                true
            } else {
                false
            }
        }

        fn or(&mut self) -> Option<bool> {
            let mut v = self.and()?;
            while self.eat(&ExprTok::Or) {
                let rhs = self.and()?;
                v = v || rhs;
            }
            Some(v)
        }

        fn and(&mut self) -> Option<bool> {
            let mut v = self.not()?;
            while self.eat(&ExprTok::And) {
                let rhs = self.not()?;
                v = v && rhs;
            }
            Some(v)
        }

        fn not(&mut self) -> Option<bool> {
            if self.eat(&ExprTok::Not) {
                return self.not().map(|v| !v);
            }
            if self.eat(&ExprTok::LParen) {
                let v = self.or()?;
                return self.eat(&ExprTok::RParen).then_some(v);
            }
            match self.toks.get(self.pos)? {
                ExprTok::Tag(tag) => {
                    self.pos += 1;
                    Some(matches_tag(tag, self.env))
                }
                _ => None,
            }
        }
    }

    let toks = tokenize(expr)?;
    let mut p = P {
        toks: &toks,
        pos: 0,
        env,
    };
    let v = p.or()?;
    (p.pos == toks.len()).then_some(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linux_amd64() -> GoEnv {
        GoEnv {
            goos: "linux".into(),
            goarch: "amd64".into(),
            ..GoEnv::default()
        }
    }

    #[test]
    fn file_name_suffixes() {
        let env = linux_amd64();
        assert!(matches_file_name("server.go", &env));
        assert!(matches_file_name("linux.go", &env));
        assert!(matches_file_name("x_linux.go", &env));
        assert!(matches_file_name("x_linux_amd64.go", &env));
        assert!(!matches_file_name("x_windows.go", &env));
        assert!(!matches_file_name("x_linux_arm64.go", &env));
        assert!(!matches_file_name("x_arm.go", &env));
        assert!(matches_file_name("x_unknown.go", &env));
    }

    #[test]
    fn go_build_expressions() {
        let env = linux_amd64();
        let check = |line: &str| matches_constraints([line], &env);
        assert!(check("//go:build linux && amd64"));
        assert!(check("//go:build unix && !cgo"));
        assert!(check("//go:build (windows || linux) && go1.21"));
        assert!(!check("//go:build ignore"));
        assert!(!check("//go:build !linux"));
        assert!(!check("//go:build linux &&"));
        assert!(check("// just a comment"));
    }

    #[test]
    fn plus_build_lines() {
        let env = linux_amd64();
        assert!(matches_constraints(["// +build linux darwin"], &env));
        assert!(!matches_constraints(["// +build ignore"], &env));
        assert!(!matches_constraints(
            ["// +build linux", "// +build !amd64"],
            &env
        ));
        // go:build takes precedence
        assert!(matches_constraints(
            ["//go:build linux", "// +build windows"],
            &env
        ));
    }
}
