use go_syntax::ast::{ImportName, TopLevelDecl, Type, ValueKind};
use go_syntax::{parse_source, ParsedFile};

fn parse(src: &str) -> ParsedFile {
    match parse_source(src) {
        Ok(f) => f,
        Err(e) => panic!("parse failed: {:?}", e.diags),
    }
}

fn type_specs(f: &ParsedFile) -> Vec<(&str, bool, Option<String>)> {
    f.decls()
        .iter()
        .filter_map(|d| match d {
            TopLevelDecl::Type(ts) => Some((
                f.name(ts.name),
                ts.alias,
                ts.doc.map(|g| f.comment_text(g)),
            )),
            _ => None,
        })
        .collect()
}

#[test]
fn package_clause_and_imports() {
    let f = parse(
        r#"// Package p does things.
package p

import "fmt"

import (
	ctx "context"
	. "strings"
	_ "embed"
	"gopkg.in/errgo.v1"
)
"#,
    );
    assert_eq!(f.package_name(), "p");
    let imports: Vec<(Option<String>, String)> = f
        .imports()
        .iter()
        .map(|i| {
            let name = i.name.map(|n| match n {
                ImportName::Dot(_) => ".".to_string(),
                ImportName::Blank(_) => "_".to_string(),
                ImportName::Name(id) => f.name(id).to_string(),
            });
            (name, f.string_value(i.path).unwrap())
        })
        .collect();
    assert_eq!(
        imports,
        vec![
            (None, "fmt".into()),
            (Some("ctx".into()), "context".into()),
            (Some(".".into()), "strings".into()),
            (Some("_".into()), "embed".into()),
            (None, "gopkg.in/errgo.v1".into()),
        ]
    );
}

#[test]
fn type_declarations_with_docs() {
    let f = parse(
        r#"package p

// Server serves.
// It has two lines.
type Server struct {
	db *DB
}

// detached comment

type Plain int

type (
	// Alias is another name.
	Alias = Server
	Other []string
)
"#,
    );
    assert_eq!(
        type_specs(&f),
        vec![
            (
                "Server",
                false,
                Some("// Server serves.\n// It has two lines.".to_string())
            ),
            ("Plain", false, None),
            ("Alias", true, Some("// Alias is another name.".to_string())),
            ("Other", false, None),
        ]
    );
}

#[test]
fn generic_type_versus_array() {
    let f = parse(
        "package p\n\ntype Box[T any] struct{ v T }\n\ntype Arr [N]int\n\ntype Pair[K comparable, V any] map[K]V\n",
    );
    let decls = f.decls();
    let TopLevelDecl::Type(boxed) = decls[0] else {
        panic!("not a type")
    };
    assert!(boxed.type_params.is_some());

    let TopLevelDecl::Type(arr) = decls[1] else {
        panic!("not a type")
    };
    assert!(arr.type_params.is_none());
    match f.arena.types[arr.typ] {
        Type::Array { len, .. } => assert_eq!(f.text(len), "N"),
        other => panic!("expected array, got {other:?}"),
    }

    let TopLevelDecl::Type(pair) = decls[2] else {
        panic!("not a type")
    };
    let tp = f.arena.type_params[pair.type_params.unwrap()];
    assert_eq!(f.arena.type_param_decl_ids(tp.params).len(), 2);
}

#[test]
fn methods_and_bodies() {
    let f = parse(
        r#"package p

// Get fetches a thing.
func (s *Server) Get(ctx context.Context, p *GetParams) (*Thing, error) {
	if p == nil {
		return nil, errors.New("}")
	}
	return &Thing{}, nil
}

func (b Box[T]) Value() T { return b.v }

func helper(a, b int, rest ...string) {}
"#,
    );
    let funcs: Vec<_> = f
        .decls()
        .iter()
        .filter_map(|d| match d {
            TopLevelDecl::Func(id) => Some(f.arena.funcs[*id]),
            _ => None,
        })
        .collect();
    assert_eq!(funcs.len(), 3);

    let get = funcs[0];
    let recv = get.recv.unwrap();
    assert_eq!(f.name(recv.base), "Server");
    assert!(recv.star.is_some());
    assert_eq!(f.name(get.name), "Get");
    assert_eq!(
        get.doc.map(|g| f.comment_text(g)).as_deref(),
        Some("// Get fetches a thing.")
    );
    let sig = f.arena.signatures[get.signature];
    assert_eq!(f.arena.fields_list(sig.params).len(), 2);
    assert_eq!(f.arena.fields_list(sig.results).len(), 2);
    assert!(get.has_body);

    let value = funcs[1].recv.unwrap();
    assert_eq!(f.name(value.base), "Box");
    assert!(value.star.is_none());
    let tparams: Vec<&str> = f
        .arena
        .ident_names(value.type_params)
        .iter()
        .map(|n| f.name(*n))
        .collect();
    assert_eq!(tparams, vec!["T"]);

    let helper = funcs[2];
    assert!(helper.recv.is_none());
    let sig = f.arena.signatures[helper.signature];
    let params = f.arena.fields_list(sig.params);
    // `a, b int` is one field with two names
    assert_eq!(params.len(), 2);
    assert_eq!(f.arena.ident_names(f.arena.fields[params[0]].names).len(), 2);
    assert!(f.arena.fields[params[1]].ellipsis_pos.is_some());
}

#[test]
fn unnamed_parameter_lists_are_types() {
    let f = parse("package p\n\ntype F func(int, string) (bool, error)\n");
    let TopLevelDecl::Type(ts) = f.decls()[0] else {
        panic!("not a type")
    };
    let Type::Func { sig } = f.arena.types[ts.typ] else {
        panic!("not a func type")
    };
    let sig = f.arena.signatures[sig];
    for &field in f.arena.fields_list(sig.params) {
        assert!(f.arena.fields[field].names.is_empty());
    }
}

#[test]
fn values_keep_names_and_types() {
    let f = parse(
        "package p\n\nconst (\n\tA = iota\n\tB\n)\n\nvar x, y map[string]int = nil, nil\n",
    );
    let values: Vec<(ValueKind, Vec<&str>, bool)> = f
        .decls()
        .iter()
        .filter_map(|d| match d {
            TopLevelDecl::Value(v) => Some((
                v.kind,
                f.arena
                    .ident_names(v.names)
                    .iter()
                    .map(|n| f.name(*n))
                    .collect(),
                v.typ.is_some(),
            )),
            _ => None,
        })
        .collect();
    assert_eq!(
        values,
        vec![
            (ValueKind::Const, vec!["A"], false),
            (ValueKind::Const, vec!["B"], false),
            (ValueKind::Var, vec!["x", "y"], true),
        ]
    );
}

#[test]
fn errors_are_collected_and_partial_file_kept() {
    let err = parse_source("package p\n\ntype T struct {\n\tA int\n\ntype U int\n").unwrap_err();
    assert!(!err.diags.is_empty());
    let partial = err.partial.expect("package clause parsed");
    assert_eq!(partial.package_name(), "p");

    let err = parse_source("func main() {}\n").unwrap_err();
    assert!(err.partial.is_none());
}
