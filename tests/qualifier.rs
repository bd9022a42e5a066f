use goclientgen::config::GenConfig;
use goclientgen::error::GenError;
use goclientgen::qualifier::{Import, ImportTable};
use goclientgen::types::{NamedType, PkgRef, Type};

fn pkg(path: &str, name: &str) -> PkgRef {
    PkgRef {
        path: path.into(),
        name: name.into(),
    }
}

fn named(p: &PkgRef, name: &str, args: Vec<Type>) -> Type {
    Type::Named(NamedType {
        pkg: p.clone(),
        name: name.into(),
        args,
    })
}

fn table() -> ImportTable {
    ImportTable::seeded(&GenConfig::default(), &pkg("example.com/app/client", "client"))
}

#[test]
fn outer_types_are_qualified_before_their_arguments() {
    let outer = pkg("example.com/a/coll", "coll");
    let inner = pkg("example.com/b/coll", "coll");
    let t = Type::pointer(named(&outer, "Box", vec![named(&inner, "Item", vec![])]));

    let mut imports = table();
    let err = imports.type_string(&t).unwrap_err();
    assert!(matches!(
        err,
        GenError::AliasCollision { ref path, ref existing, .. }
            if path == "example.com/b/coll" && existing == "example.com/a/coll"
    ));
}

#[test]
fn aliases_are_stable_across_calls() {
    let models = pkg("example.com/models", "models");
    let mut imports = table();
    let first = imports
        .type_string(&Type::Slice(Box::new(named(&models, "A", vec![]))))
        .unwrap();
    let second = imports
        .type_string(&Type::Map(
            Box::new(Type::Basic("string")),
            Box::new(named(&models, "B", vec![])),
        ))
        .unwrap();
    assert_eq!(first, "[]models.A");
    assert_eq!(second, "map[string]models.B");

    let imports = imports.into_imports();
    assert_eq!(
        imports.iter().filter(|i| i.path == "example.com/models").count(),
        1
    );
}

#[test]
fn every_used_alias_is_imported_once() {
    let a = pkg("example.com/x/alpha", "alpha");
    let b = pkg("example.com/x/beta.v2", "beta");
    let mut imports = table();
    let s = imports
        .type_string(&Type::Func(Box::new(goclientgen::types::Signature {
            params: vec![goclientgen::types::Param {
                name: None,
                typ: named(&a, "In", vec![]),
            }],
            results: vec![goclientgen::types::Param {
                name: None,
                typ: named(&b, "Out", vec![]),
            }],
            variadic: false,
        })))
        .unwrap();
    assert_eq!(s, "func(alpha.In) beta.Out");

    assert_eq!(
        imports.into_imports(),
        vec![
            Import {
                path: "context".into(),
                alias: None
            },
            Import {
                path: "example.com/x/alpha".into(),
                alias: None
            },
            Import {
                path: "example.com/x/beta.v2".into(),
                alias: None
            },
            Import {
                path: "gopkg.in/httprequest.v1".into(),
                alias: None
            },
        ]
    );
}

#[test]
fn seeded_packages_win_their_names() {
    let mut imports = table();
    assert_eq!(imports.alias("gopkg.in/httprequest.v1"), Some("httprequest"));
    assert_eq!(imports.alias("example.com/app/client"), Some(""));
    let clash = pkg("example.com/fake/httprequest", "httprequest");
    assert!(imports.qualify_pkg(&clash).is_err());
}
