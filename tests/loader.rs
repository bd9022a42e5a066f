mod common;

use common::{env, load, Sandbox};
use goclientgen::error::LoadError;
use goclientgen::loader::{load_program, Loader};
use goclientgen::types::{Object, PackageKind, Type};

fn load_err(sb: &Sandbox, target: &str) -> LoadError {
    match load_program(sb.root(), env(), target) {
        Ok(_) => panic!("loading {target} should fail"),
        Err(e) => e,
    }
}

#[test]
fn loads_only_declaration_dependencies() {
    let sb = Sandbox::module("example.com/m");
    sb.file("dep/dep.go", "package dep\n\ntype T struct{}\n")
        .file(
            "p/p.go",
            r#"package p

import (
	"fmt"

	"example.com/m/dep"
	"example.com/m/nowhere"
)

type S struct {
	D dep.T
}

func helper() { fmt.Println(nowhere.Thing) }
"#,
        );
    let (program, pkg) = load(&sb, "example.com/m/p");
    assert_eq!(pkg.name, "p");
    assert!(program.contains("example.com/m/dep"));
    assert!(!program.contains("example.com/m/nowhere"));
    assert!(!program.contains("fmt"));

    let p = program.package("example.com/m/p").unwrap();
    assert_eq!(p.kind, PackageKind::Source);
    assert!(matches!(p.scope.get("helper"), Some(Object::Func(_))));
}

#[test]
fn unlocatable_imports_are_opaque() {
    let sb = Sandbox::module("example.com/m");
    sb.file(
        "p/p.go",
        "package p\n\nimport \"github.com/x/go-thing/v3\"\n\ntype S struct{ T thing.T }\n",
    );
    let (program, _) = load(&sb, "example.com/m/p");
    let dep = program.package("github.com/x/go-thing/v3").unwrap();
    assert_eq!(dep.kind, PackageKind::Opaque);
    assert_eq!(dep.name, "thing");
}

#[test]
fn build_constraints_pick_files() {
    let sb = Sandbox::module("example.com/m");
    sb.file("p/a.go", "package p\n\ntype A int\n")
        .file("p/a_windows.go", "package p\n\ntype A string\n")
        .file("p/b_linux.go", "package p\n\ntype B int\n")
        .file("p/gen.go", "//go:build ignore\n\npackage main\n")
        .file("p/old.go", "// +build darwin\n\npackage p\n\ntype A bool\n")
        .file("p/cgo.go", "package p\n\nimport \"C\"\n\ntype A float64\n")
        .file("p/a_test.go", "package p_test\n")
        .file("p/_hidden.go", "package hidden\n");
    let (program, _) = load(&sb, "example.com/m/p");
    let p = program.package("example.com/m/p").unwrap();
    let a = p.type_decl("A").unwrap();
    assert_eq!(a.rhs, Type::Basic("int"));
    assert!(p.type_decl("B").is_some());
}

#[test]
fn replace_directive_points_at_local_dir() {
    let sb = Sandbox::new();
    sb.file(
        "app/go.mod",
        "module example.com/app\n\nrequire example.com/lib v1.2.3\n\nreplace example.com/lib => ../lib\n",
    )
    .file("lib/go.mod", "module example.com/lib\n")
    .file("lib/sub/sub.go", "package sub\n\ntype X struct{}\n")
    .file(
        "app/p/p.go",
        "package p\n\nimport \"example.com/lib/sub\"\n\ntype S struct{ sub.X }\n",
    );
    let (program, _) = load_program(&sb.path("app"), env(), "./p").unwrap();
    assert_eq!(
        program.package("example.com/lib/sub").unwrap().kind,
        PackageKind::Source
    );
    assert!(program.contains("example.com/app/p"));
}

#[test]
fn vendored_packages_are_found() {
    let sb = Sandbox::module("example.com/m");
    sb.file("vendor/golang.org/x/v/v.go", "package v\n\ntype V int\n")
        .file(
            "p/p.go",
            "package p\n\nimport \"golang.org/x/v\"\n\ntype S struct{ F v.V }\n",
        );
    let (program, _) = load(&sb, "example.com/m/p");
    assert_eq!(
        program.package("golang.org/x/v").unwrap().kind,
        PackageKind::Source
    );
}

#[test]
fn local_package_reads_package_clause() {
    let sb = Sandbox::module("example.com/m");
    sb.file("out/x.go", "package client\n\nthis is not Go at all\n");
    let loader = Loader::discover(sb.root(), env()).unwrap();
    let pkg = loader.local_package(&sb.path("out")).unwrap();
    assert_eq!(pkg.path, "example.com/m/out");
    assert_eq!(pkg.name, "client");
}

#[test]
fn fatal_load_errors() {
    let sb = Sandbox::module("example.com/m");
    sb.file("syntax/s.go", "package syntax\n\ntype T struct {\n")
        .file("undef/u.go", "package undef\n\ntype T struct{ X Missing }\n")
        .file("notype/n.go", "package notype\n\nvar V int\n\ntype T []V\n")
        .file("two/a.go", "package a\n")
        .file("two/b.go", "package b\n")
        .file("empty/README", "nothing here\n")
        .file("redecl/r.go", "package redecl\n\ntype T int\n\nfunc T() {}\n")
        .file(
            "recv/r.go",
            "package recv\n\nimport \"strings\"\n\nfunc (b *strings.Builder) X() {}\n",
        );

    assert!(matches!(
        load_err(&sb, "./syntax"),
        LoadError::Syntax { .. }
    ));
    let err = load_err(&sb, "./undef");
    assert!(err.to_string().ends_with("undefined: Missing"), "{err}");
    assert!(matches!(load_err(&sb, "./notype"), LoadError::NotAType { .. }));
    assert!(matches!(
        load_err(&sb, "./two"),
        LoadError::MultiplePackages { .. }
    ));
    assert!(matches!(load_err(&sb, "./empty"), LoadError::NoGoFiles { .. }));
    assert!(matches!(
        load_err(&sb, "./redecl"),
        LoadError::Redeclared { .. }
    ));
    assert!(matches!(load_err(&sb, "./recv"), LoadError::Syntax { .. }));
    assert!(matches!(
        load_err(&sb, "example.com/m/missing"),
        LoadError::NotFound { .. }
    ));
}

#[test]
fn import_cycles_are_fatal() {
    let sb = Sandbox::module("example.com/m");
    sb.file(
        "a/a.go",
        "package a\n\nimport \"example.com/m/b\"\n\ntype A struct{ B *b.B }\n",
    )
    .file(
        "b/b.go",
        "package b\n\nimport \"example.com/m/a\"\n\ntype B struct{ A *a.A }\n",
    );
    match load_err(&sb, "example.com/m/a") {
        LoadError::ImportCycle(cycle) => assert_eq!(
            cycle,
            vec!["example.com/m/a", "example.com/m/b", "example.com/m/a"]
        ),
        other => panic!("unexpected {other}"),
    }
}

#[test]
fn syntax_errors_carry_file_and_line() {
    let sb = Sandbox::module("example.com/m");
    sb.file("p/p.go", "package p\n\ntype T int\n\ntype = 3\n");
    let err = load_err(&sb, "./p");
    let msg = err.to_string();
    assert!(msg.contains("p.go:5:"), "{msg}");
}
