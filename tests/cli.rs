mod common;

use std::fs;

use assert_cmd::Command;
use common::{service_module, Sandbox};
use predicates::prelude::*;

/// The binary run inside `sb` with the toolchain pointed at nothing.
fn goclientgen(sb: &Sandbox) -> Command {
    let mut cmd = Command::cargo_bin("goclientgen").unwrap();
    cmd.current_dir(sb.root())
        .env("GOROOT", sb.path("no-goroot"))
        .env("GOPATH", sb.path("no-gopath"))
        .env("GOOS", "linux")
        .env("GOARCH", "amd64")
        .env_remove("GOMODCACHE")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn writes_client_file() {
    let sb = service_module();
    goclientgen(&sb)
        .args(["--out-dir", "client", "./server", "Server", "Client"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let written = fs::read_to_string(sb.path("client/client_generated.go")).unwrap();
    assert!(written.starts_with("// Code generated by goclientgen. DO NOT EDIT.\n"));
    assert!(written.contains("func (c *Client) Get(ctx context.Context, p *params.GetReq)"));
}

#[test]
fn stdout_flag_prints_instead_of_writing() {
    let sb = service_module();
    goclientgen(&sb)
        .args(["--stdout", "--out-dir", "client"])
        .args(["example.com/app/server", "Server", "Client"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "// Code generated by goclientgen. DO NOT EDIT.\n\npackage client\n",
        ));
    assert!(!sb.path("client/client_generated.go").exists());
}

#[test]
fn skipped_methods_are_reported() {
    let sb = service_module();
    goclientgen(&sb)
        .args(["--stdout", "--out-dir", "client", "./server", "Server", "Client"])
        .assert()
        .success()
        .stderr(predicate::str::contains("ignoring method NotPtr: parameter is not a pointer"))
        .stderr(predicate::str::contains("ignoring method Bad"));
}

#[test]
fn missing_arguments_are_a_usage_error() {
    let sb = service_module();
    goclientgen(&sb)
        .arg("./server")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn fatal_errors_exit_nonzero() {
    let sb = service_module();
    goclientgen(&sb)
        .args(["--out-dir", "client", "./server", "Nope", "Client"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "cannot generate client for ./server.Nope",
        ))
        .stderr(predicate::str::contains("type Nope not found"));
    assert!(!sb.path("client/client_generated.go").exists());
}
