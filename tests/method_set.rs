mod common;

use common::{load, Sandbox};
use goclientgen::error::GenError;
use goclientgen::methodset::{lookup_type, pointer_method_set, Selection};
use goclientgen::types::Type;

fn method_set(src: &str, type_name: &str) -> Vec<Selection> {
    let sb = Sandbox::module("example.com/m");
    sb.file("p/p.go", src);
    let (program, pkg) = load(&sb, "example.com/m/p");
    let named = lookup_type(&program, &pkg, type_name).unwrap();
    pointer_method_set(&program, &named)
}

fn names(sels: &[Selection]) -> Vec<&str> {
    sels.iter().map(|s| s.name.as_str()).collect()
}

#[test]
fn value_and_pointer_receivers_sorted_by_name() {
    let sels = method_set(
        r#"package p

type T struct{}

func (T) Zed()   {}
func (*T) Alpha() {}
func (t T) mid() {}
"#,
        "T",
    );
    assert_eq!(names(&sels), vec!["Alpha", "Zed", "mid"]);
    assert!(sels[0].pointer_recv);
    assert!(!sels[1].pointer_recv);
    assert!(sels.iter().all(|s| s.depth == 0));
}

#[test]
fn promoted_through_value_and_pointer_embedding() {
    let sels = method_set(
        r#"package p

type Inner struct{}

// Hello greets.
func (i *Inner) Hello() {}

type Other struct{}

func (Other) World() {}

type T struct {
	*Inner
	Other
}
"#,
        "T",
    );
    assert_eq!(names(&sels), vec!["Hello", "World"]);
    assert_eq!(sels[0].depth, 1);
    assert_eq!(sels[0].recv, "example.com/m/p.Inner");
    assert_eq!(sels[0].doc.as_deref(), Some("// Hello greets."));
}

#[test]
fn shallower_names_shadow_deeper_ones() {
    let sels = method_set(
        r#"package p

type Deep struct{}

func (Deep) Get()  {}
func (Deep) Name() {}
func (Deep) Keep() {}

type T struct {
	Deep
	Name string
}

func (T) Get() {}
"#,
        "T",
    );
    // Get is T's own, Name is hidden by the field
    assert_eq!(names(&sels), vec!["Get", "Keep"]);
    assert_eq!(sels[0].depth, 0);
}

#[test]
fn same_depth_collisions_promote_nothing() {
    let sels = method_set(
        r#"package p

type A struct{}

func (A) Shared() {}
func (A) OnlyA()  {}

type B struct{}

func (B) Shared() {}

type T struct {
	A
	B
}
"#,
        "T",
    );
    assert_eq!(names(&sels), vec!["OnlyA"]);
}

#[test]
fn type_embedded_twice_at_one_depth_contributes_nothing() {
    let sels = method_set(
        r#"package p

type C struct{}

func (C) FromC() {}

type A struct{ C }
type B struct{ C }

func (A) FromA() {}

type T struct {
	A
	B
}
"#,
        "T",
    );
    assert_eq!(names(&sels), vec!["FromA"]);
}

#[test]
fn type_embedded_under_an_alias_counts_as_the_same_type() {
    let sels = method_set(
        r#"package p

type B struct{}

func (B) Ping() {}

type A = B

type S struct {
	A
	B
}
"#,
        "S",
    );
    assert!(sels.is_empty(), "{:?}", names(&sels));
}

#[test]
fn embedded_interfaces_promote_their_methods() {
    let sels = method_set(
        r#"package p

type Reader interface {
	// Read reads.
	Read(p []byte) (int, error)
}

type ReadCloser interface {
	Reader
	Close() error
}

type T struct {
	ReadCloser
}
"#,
        "T",
    );
    assert_eq!(names(&sels), vec!["Close", "Read"]);
    assert_eq!(sels[1].doc.as_deref(), Some("// Read reads."));
    assert_eq!(sels[1].depth, 1);
}

#[test]
fn generic_embedding_substitutes_type_arguments() {
    let sels = method_set(
        r#"package p

type Req struct{}

type Base[T any] struct{}

func (b *Base[T]) Do(p *T) error { return nil }

type T struct {
	Base[Req]
}
"#,
        "T",
    );
    assert_eq!(names(&sels), vec!["Do"]);
    assert_eq!(sels[0].sig.params[0].typ.to_string(), "*example.com/m/p.Req");
}

#[test]
fn generic_server_keeps_its_parameters() {
    let sels = method_set(
        r#"package p

type S[R any] struct{}

func (s *S[X]) Handle(p *X) {}
"#,
        "S",
    );
    assert_eq!(
        sels[0].sig.params[0].typ,
        Type::pointer(Type::TypeParam("R".into()))
    );
}

#[test]
fn alias_targets_are_followed() {
    let sels = method_set(
        r#"package p

type Real struct{}

func (*Real) M() {}

type Alias = Real
"#,
        "Alias",
    );
    assert_eq!(names(&sels), vec!["M"]);
}

#[test]
fn interface_and_pointer_types_have_empty_sets() {
    let src = r#"package p

type I interface{ M() }

type S struct{}

func (S) M() {}

type P *S
"#;
    assert!(method_set(src, "I").is_empty());
    assert!(method_set(src, "P").is_empty());
}

#[test]
fn lookup_failures() {
    let sb = Sandbox::module("example.com/m");
    sb.file("p/p.go", "package p\n\nfunc F() {}\n");
    let (program, pkg) = load(&sb, "example.com/m/p");
    assert!(matches!(
        lookup_type(&program, &pkg, "Nope"),
        Err(GenError::NotFound { .. })
    ));
    assert!(matches!(
        lookup_type(&program, &pkg, "F"),
        Err(GenError::NotAType { .. })
    ));
}
