use dynidl::{TypeDetail, TypeKind};
use pretty_assertions::assert_eq;

fn parse_ok(idl: &str) -> dynidl::Context {
    let ctx = dynidl::parse(idl);
    assert!(ctx.success(), "parse failed: {:?}", ctx.diagnostics());
    assert_eq!(ctx.errors().count(), 0);
    ctx
}

#[test]
fn simple_typedef_points_at_the_referent() {
    let ctx = parse_ok("typedef long Meters;");
    let meters = ctx.find_type("Meters").unwrap();
    assert_eq!(meters.kind(), TypeKind::Alias);
    assert_eq!(meters.referent().unwrap().kind(), TypeKind::Int32);
}

#[test]
fn array_typedef_wraps_the_referent() {
    let ctx = parse_ok("typedef long Matrix[3][4];");
    let matrix = ctx.find_type("Matrix").unwrap();
    let TypeDetail::Array { element, dims } = matrix.referent().unwrap().detail() else {
        panic!("expected an array referent");
    };
    assert_eq!(element.kind(), TypeKind::Int32);
    assert_eq!(dims.as_slice(), &[3u32, 4][..]);
}

#[test]
fn multiple_declarators_create_multiple_aliases() {
    let ctx = parse_ok("typedef short Small, Tiny[2];");
    assert_eq!(ctx.find_type("Small").unwrap().referent().unwrap().kind(), TypeKind::Int16);
    assert_eq!(ctx.find_type("Tiny").unwrap().referent().unwrap().kind(), TypeKind::Array);
}

#[test]
fn aliases_chain_and_unalias_reaches_the_bottom() {
    let ctx = parse_ok("typedef long A; typedef A B; struct S { B value; };");
    let member_type = ctx.find_type("S").unwrap().member("value").unwrap().member_type().clone();
    assert_eq!(member_type.kind(), TypeKind::Alias);
    assert_eq!(member_type.unalias().kind(), TypeKind::Int32);
}

#[test]
fn typedef_of_template_types() {
    let ctx = parse_ok("typedef sequence<string<16>, 8> Names;");
    let names = ctx.find_type("Names").unwrap();
    let TypeDetail::Sequence { element, bound } = names.referent().unwrap().detail() else {
        panic!("expected a sequence referent");
    };
    assert_eq!(*bound, Some(8));
    assert_eq!(element.detail(), &TypeDetail::String { bound: Some(16) });
}

#[test]
fn typedef_of_an_inline_constructed_enum() {
    let ctx = parse_ok("typedef enum Color { RED, GREEN } ColorAlias;");
    // the constructed type registers on its own
    assert_eq!(ctx.find_type("Color").unwrap().kind(), TypeKind::Enum);
    // and the alias points at it
    let alias = ctx.find_type("ColorAlias").unwrap();
    assert_eq!(alias.kind(), TypeKind::Alias);
    assert_eq!(alias.referent().unwrap().kind(), TypeKind::Enum);
}

#[test]
fn alias_to_unknown_type_is_a_resolve_error() {
    let ctx = dynidl::parse("typedef Missing Alias;");
    assert!(!ctx.success());
    assert!(ctx.errors().next().unwrap().message().starts_with("ResolveError"));
}

#[test]
fn fixed_point_member_types_carry_digits_and_scale() {
    let ctx = parse_ok("struct Money { fixed<9, 2> amount; };");
    let amount = ctx.find_type("Money").unwrap().member("amount").unwrap().member_type().clone();
    assert_eq!(amount.detail(), &TypeDetail::Fixed { digits: 9, scale: 2 });
}
