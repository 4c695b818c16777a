use dynidl::{DynData, TypeDetail, TypeKind};
use pretty_assertions::assert_eq;

fn parse_ok(idl: &str) -> dynidl::Context {
    let ctx = dynidl::parse(idl);
    assert!(ctx.success(), "parse failed: {:?}", ctx.diagnostics());
    assert_eq!(ctx.errors().count(), 0);
    ctx
}

#[test]
fn literals_count_up_from_zero() {
    let ctx = parse_ok("enum Color { RED, GREEN, BLUE };");
    let color = ctx.find_type("Color").unwrap();
    assert_eq!(color.kind(), TypeKind::Enum);
    let literals = color.literals();
    assert_eq!(literals.len(), 3);
    assert_eq!((literals[0].name.as_str(), literals[0].value), ("RED", 0));
    assert_eq!((literals[1].name.as_str(), literals[1].value), ("GREEN", 1));
    assert_eq!((literals[2].name.as_str(), literals[2].value), ("BLUE", 2));
}

#[test]
fn enumerators_become_module_constants_marked_from_enum() {
    let ctx = parse_ok("enum Color { RED, GREEN, BLUE };");
    assert_eq!(ctx.find_constant("RED"), Some(&DynData::UInt32(0)));
    assert_eq!(ctx.find_constant("GREEN"), Some(&DynData::UInt32(1)));
    assert_eq!(ctx.find_constant("BLUE"), Some(&DynData::UInt32(2)));
    assert!(ctx.constant_is_from_enum("RED"));
    assert!(ctx.constant_is_from_enum("BLUE"));
}

#[test]
fn enumerators_participate_in_later_expressions() {
    let ctx = parse_ok("enum Color { RED, GREEN, BLUE }; const long PICK = BLUE + 1;");
    assert_eq!(ctx.find_constant("PICK"), Some(&DynData::Int32(3)));
    assert!(!ctx.constant_is_from_enum("PICK"));
}

#[test]
fn scoped_enumerators_resolve_across_modules() {
    let ctx = parse_ok("module palette { enum Color { RED, GREEN }; }; const long G = palette::GREEN;");
    assert_eq!(ctx.find_constant("G"), Some(&DynData::Int32(1)));
    assert!(ctx.constant_is_from_enum("palette::GREEN"));
}

#[test]
fn value_annotation_overrides_and_continues() {
    let ctx = parse_ok("enum Status { OK, @value(10) WARN, ERROR };");
    let literals = ctx.find_type("Status").unwrap().literals().to_vec();
    assert_eq!(literals[0].value, 0);
    assert_eq!(literals[1].value, 10);
    assert_eq!(literals[2].value, 11);
    assert_eq!(ctx.find_constant("ERROR"), Some(&DynData::UInt32(11)));
}

#[test]
fn duplicate_values_after_value_annotation_are_rejected() {
    let ctx = dynidl::parse("enum Bad { A, @value(0) B };");
    assert!(!ctx.success());
    assert!(ctx.errors().next().unwrap().message().starts_with("RedefinitionError"));
}

#[test]
fn default_literal_marks_one_enumerator() {
    let ctx = parse_ok("enum Mode { @default_literal IDLE, ACTIVE };");
    let literals = ctx.find_type("Mode").unwrap().literals().to_vec();
    assert!(literals[0].is_default);
    assert!(!literals[1].is_default);
}

#[test]
fn two_default_literals_are_rejected() {
    let ctx = dynidl::parse("enum Bad { @default_literal A, @default_literal B };");
    assert!(!ctx.success());
    assert!(ctx.errors().next().unwrap().message().starts_with("AnnotationParamError"));
}

#[test]
fn bit_bound_sets_the_storage_width() {
    let ctx = parse_ok("@bit_bound(16) enum Small { A, B };");
    let small = ctx.find_type("Small").unwrap();
    assert_eq!(small.bit_bound(), Some(16));
    let TypeDetail::Enum { bit_bound, .. } = small.build().detail().clone() else {
        panic!("expected enum detail");
    };
    assert_eq!(bit_bound, Some(16));
}

#[test]
fn enum_name_collision_with_constant_is_rejected() {
    let ctx = dynidl::parse("const long RED = 1; enum Color { RED };");
    assert!(!ctx.success());
    assert!(ctx.errors().next().unwrap().message().starts_with("RedefinitionError"));
}
