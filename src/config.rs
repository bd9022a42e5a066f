use std::env;
use std::path::{Path, PathBuf};

use clap::Parser;

use crate::types::{assumed_package_name, PkgRef};

pub const DEFAULT_TRANSPORT_PKG: &str = "gopkg.in/httprequest.v1";
pub const DEFAULT_TRANSPORT_NAME: &str = "httprequest";
pub const DEFAULT_CONTEXT_PKG: &str = "context";

/// Suffix of the generated file, after the lower-cased client type name.
pub const OUTPUT_SUFFIX: &str = "_generated.go";

#[derive(Debug, Clone, Parser)]
#[command(name = "goclientgen")]
#[command(about = "Generates a Go RPC client type that mirrors a server type's methods")]
pub struct Args {
    /// Import path of the server package, or a directory relative to the current one (./server)
    pub server_pkg: String,

    /// Name of the server type whose methods are mirrored
    pub server_type: String,

    /// Name of the generated client type
    pub client_type: String,

    #[arg(long, default_value = DEFAULT_TRANSPORT_PKG)]
    pub transport_pkg: String,

    /// Package name the transport package declares
    #[arg(long, default_value = DEFAULT_TRANSPORT_NAME)]
    pub transport_name: String,

    #[arg(long, default_value = DEFAULT_CONTEXT_PKG)]
    pub context_pkg: String,

    /// Directory holding the package the client is generated into
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    #[arg(long, help = "Print the generated file instead of writing it")]
    pub stdout: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl Args {
    pub fn gen_config(&self) -> GenConfig {
        GenConfig {
            transport: PkgRef {
                path: self.transport_pkg.clone(),
                name: self.transport_name.clone(),
            },
            context: PkgRef {
                path: self.context_pkg.clone(),
                name: assumed_package_name(&self.context_pkg).to_string(),
            },
        }
    }
}

/// Packages the generated code is written against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenConfig {
    /// Declares `Client` with `Call(ctx, params, resp) error`.
    pub transport: PkgRef,
    /// Declares `Context`.
    pub context: PkgRef,
}

impl Default for GenConfig {
    fn default() -> Self {
        Self {
            transport: PkgRef {
                path: DEFAULT_TRANSPORT_PKG.to_string(),
                name: DEFAULT_TRANSPORT_NAME.to_string(),
            },
            context: PkgRef {
                path: DEFAULT_CONTEXT_PKG.to_string(),
                name: DEFAULT_CONTEXT_PKG.to_string(),
            },
        }
    }
}

/// Go toolchain layout the loader searches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoEnv {
    pub goroot: Option<PathBuf>,
    pub gopath: Vec<PathBuf>,
    pub gomodcache: Option<PathBuf>,
    pub goos: String,
    pub goarch: String,
}

impl Default for GoEnv {
    /// No toolchain at all: only the main module, its replacements and
    /// vendor directory can be found. Targets the host platform.
    fn default() -> Self {
        Self {
            goroot: None,
            gopath: Vec::new(),
            gomodcache: None,
            goos: host_goos().to_string(),
            goarch: host_goarch().to_string(),
        }
    }
}

impl GoEnv {
    /// Reads `GOROOT`, `GOPATH`, `GOMODCACHE`, `GOOS` and `GOARCH` with the
    /// go command's defaults.
    pub fn from_env() -> Self {
        let goroot = env_path("GOROOT").or_else(guess_goroot);

        let gopath: Vec<PathBuf> = match env::var_os("GOPATH") {
            Some(v) if !v.is_empty() => env::split_paths(&v).collect(),
            _ => dirs::home_dir()
                .map(|home| vec![home.join("go")])
                .unwrap_or_default(),
        };

        let gomodcache = env_path("GOMODCACHE")
            .or_else(|| gopath.first().map(|p| p.join("pkg").join("mod")));

        Self {
            goroot,
            gopath,
            gomodcache,
            goos: env_string("GOOS").unwrap_or_else(|| host_goos().to_string()),
            goarch: env_string("GOARCH").unwrap_or_else(|| host_goarch().to_string()),
        }
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn guess_goroot() -> Option<PathBuf> {
    ["/usr/local/go", "/usr/lib/go", "/opt/homebrew/opt/go/libexec"]
        .iter()
        .map(Path::new)
        .find(|p| p.join("src").join("runtime").is_dir())
        .map(Path::to_path_buf)
}

fn host_goos() -> &'static str {
    match env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}

fn host_goarch() -> &'static str {
    match env::consts::ARCH {
        "x86_64" => "amd64",
        "x86" => "386",
        "aarch64" => "arm64",
        "powerpc64" => "ppc64",
        "loongarch64" => "loong64",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_defaults() {
        let args = Args::try_parse_from(["goclientgen", "example.com/srv", "Server", "Client"])
            .unwrap();
        assert_eq!(args.gen_config(), GenConfig::default());
        assert_eq!(args.out_dir, PathBuf::from("."));
        assert!(!args.stdout);
    }

    #[test]
    fn context_name_is_guessed_from_path() {
        let args = Args::try_parse_from([
            "goclientgen",
            "--context-pkg",
            "golang.org/x/net/context",
            "p",
            "S",
            "C",
        ])
        .unwrap();
        assert_eq!(args.gen_config().context.name, "context");
    }

    #[test]
    fn positionals_are_required() {
        assert!(Args::try_parse_from(["goclientgen", "p", "S"]).is_err());
        assert!(Args::try_parse_from(["goclientgen", "p", "S", "C", "extra"]).is_err());
    }
}
