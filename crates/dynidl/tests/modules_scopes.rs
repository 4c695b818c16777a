use dynidl::{DynData, TypeKind};
use pretty_assertions::assert_eq;

fn parse_ok(idl: &str) -> dynidl::Context {
    let ctx = dynidl::parse(idl);
    assert!(ctx.success(), "parse failed: {:?}", ctx.diagnostics());
    assert_eq!(ctx.errors().count(), 0);
    ctx
}

#[test]
fn nested_modules_qualify_names() {
    let ctx = parse_ok("module A { module B { struct S { long x; }; }; };");
    let s = ctx.find_type("A::B::S").unwrap();
    assert_eq!(s.name(), "A::B::S");
    assert_eq!(s.kind(), TypeKind::Structure);
    assert!(ctx.find_type("S").is_none(), "unqualified lookup must not hit nested types");
}

#[test]
fn sibling_scopes_resolve_through_the_root() {
    let ctx = parse_ok(
        "module A { const long K = 5; };
         module B { const long J = A::K + 1; };",
    );
    assert_eq!(ctx.find_constant("B::J"), Some(&DynData::Int32(6)));
}

#[test]
fn inner_scopes_see_outer_constants_unqualified() {
    let ctx = parse_ok(
        "module A {
             const long K = 5;
             module B { const long J = K * 2; };
         };",
    );
    assert_eq!(ctx.find_constant("A::B::J"), Some(&DynData::Int32(10)));
}

#[test]
fn absolute_names_restart_at_the_root() {
    let ctx = parse_ok(
        "const long TOP = 1;
         module A { const long COPY = ::TOP + 1; };",
    );
    assert_eq!(ctx.find_constant("A::COPY"), Some(&DynData::Int32(2)));
}

#[test]
fn reopened_modules_accumulate() {
    let ctx = parse_ok(
        "module A { const long FIRST = 1; };
         module A { const long SECOND = FIRST + 1; };",
    );
    assert_eq!(ctx.find_constant("A::FIRST"), Some(&DynData::Int32(1)));
    assert_eq!(ctx.find_constant("A::SECOND"), Some(&DynData::Int32(2)));
}

#[test]
fn types_resolve_across_module_boundaries() {
    let ctx = parse_ok(
        "module common { struct Header { long seq; }; };
         module app { struct Msg { common::Header h; }; };",
    );
    let msg = ctx.find_type("app::Msg").unwrap();
    let header = msg.member("h").unwrap().member_type().clone();
    assert_eq!(header.name(), "common::Header");
}

#[test]
fn module_name_collision_with_type_is_rejected() {
    let ctx = dynidl::parse("struct X { long a; }; module X { const long K = 1; };");
    assert!(!ctx.success());
    assert!(ctx.errors().next().unwrap().message().starts_with("RedefinitionError"));
}

#[test]
fn appending_into_an_existing_context_matches_one_shot_parsing() {
    let one_shot = parse_ok("module A { const long K = 5; }; struct S { long x; };");

    let mut appended = dynidl::Context::new();
    assert!(dynidl::parse_with_context("module A { const long K = 5; };", &mut appended));
    assert!(dynidl::parse_with_context("struct S { long x; };", &mut appended));

    assert_eq!(one_shot.find_constant("A::K"), appended.find_constant("A::K"));
    assert_eq!(one_shot.find_type("S"), appended.find_type("S"));
}

#[test]
fn second_parse_can_reference_earlier_registrations() {
    let mut ctx = dynidl::Context::new();
    assert!(dynidl::parse_with_context("const long BASE = 10;", &mut ctx));
    assert!(dynidl::parse_with_context("const long DERIVED = BASE * 3;", &mut ctx));
    assert_eq!(ctx.find_constant("DERIVED"), Some(&DynData::Int32(30)));
}

#[test]
fn resolution_is_stable_under_later_declarations() {
    // resolving the same name before and after unrelated declarations
    // lands on the same entity
    let mut ctx = dynidl::Context::new();
    assert!(dynidl::parse_with_context("module A { const long K = 5; };", &mut ctx));
    let before = ctx.find_constant("A::K").cloned();
    assert!(dynidl::parse_with_context("module Other { const long X = 1; };", &mut ctx));
    assert_eq!(ctx.find_constant("A::K").cloned(), before);
}

#[test]
fn ignore_case_treats_spellings_as_one_symbol() {
    let mut ctx = dynidl::Context::new();
    ctx.ignore_case = true;
    assert!(dynidl::parse_with_context("struct Point { long x; };", &mut ctx));
    assert!(ctx.find_type("POINT").is_some());

    let ok = dynidl::parse_with_context("struct POINT { long y; };", &mut ctx);
    assert!(!ok, "case-insensitive redefinition must fail");
}

#[test]
fn keyword_identifiers_require_the_option() {
    let strict = dynidl::parse("struct S { long int8; };");
    assert!(!strict.success());

    let mut lenient = dynidl::Context::new();
    lenient.allow_keyword_identifiers = true;
    assert!(dynidl::parse_with_context("struct S { long int8; };", &mut lenient));
    assert!(lenient.find_type("S").unwrap().member("int8").is_some());
}

#[test]
fn same_name_module_inside_module_resolves() {
    let ctx = parse_ok(
        "module A {
             module A { const long x = 1; };
             const long y = A::A::x + 1;
         };",
    );
    assert_eq!(ctx.find_constant("A::y"), Some(&DynData::Int32(2)));
}
