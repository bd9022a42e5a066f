#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use goclientgen::config::GoEnv;
use goclientgen::loader::load_program;
use goclientgen::types::{PkgRef, Program};
use tempfile::TempDir;

/// A scratch directory holding Go sources, removed on drop.
pub struct Sandbox {
    tmp: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        Self {
            tmp: tempfile::tempdir().expect("create temp dir"),
        }
    }

    /// Sandbox whose root is the module `module`.
    pub fn module(module: &str) -> Self {
        let s = Self::new();
        s.file("go.mod", &format!("module {module}\n\ngo 1.22\n"));
        s
    }

    pub fn file(&self, rel: &str, contents: &str) -> &Self {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, contents).expect("write file");
        self
    }

    pub fn root(&self) -> &Path {
        self.tmp.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.tmp.path().join(rel)
    }
}

/// A fixed platform with no Go toolchain installed.
pub fn env() -> GoEnv {
    GoEnv {
        goos: "linux".into(),
        goarch: "amd64".into(),
        ..GoEnv::default()
    }
}

pub fn load(sb: &Sandbox, target: &str) -> (Program, PkgRef) {
    match load_program(sb.root(), env(), target) {
        Ok(loaded) => loaded,
        Err(e) => panic!("loading {target}: {e}"),
    }
}

/// A module with a server package, a params package and an empty client
/// package, the layout most generation tests start from.
pub fn service_module() -> Sandbox {
    let sb = Sandbox::module("example.com/app");
    sb.file(
        "params/params.go",
        r#"package params

type GetReq struct {
	ID string `httprequest:"id,path"`
}

type PingReq struct{}

type Thing struct {
	Name string
}
"#,
    )
    .file(
        "server/server.go",
        r#"package server

import (
	"context"

	"example.com/app/params"
)

// Server is the service.
type Server struct {
	Base
}

type Base struct{}

// Ping checks liveness.
func (b *Base) Ping(ctx context.Context, p *params.PingReq) error { return nil }

// Get fetches a thing.
func (s *Server) Get(ctx context.Context, p *params.GetReq) (*params.Thing, error) {
	return nil, nil
}

// Put stores.
func (s Server) Put(p *PutReq) (Count, error) { return 0, nil }

func (s *Server) Close() error { return nil }

func (s *Server) internal(p *PutReq) error { return nil }

func (s *Server) Bad(ctx context.Context, a, b *PutReq) error { return nil }

func (s *Server) NotPtr(p PutReq) error { return nil }

type PutReq struct {
	N int
}

type Count int
"#,
    )
    .file("client/client.go", "package client\n");
    sb
}
