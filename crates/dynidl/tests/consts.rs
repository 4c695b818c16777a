use dynidl::{DynData, ParseErrorKind, Severity};
use pretty_assertions::assert_eq;

fn parse_ok(idl: &str) -> dynidl::Context {
    let ctx = dynidl::parse(idl);
    assert!(ctx.success(), "parse failed: {:?}", ctx.diagnostics());
    assert_eq!(ctx.errors().count(), 0);
    ctx
}

/// Asserts the parse failed and the first error carries the expected kind.
fn parse_err(idl: &str, kind: ParseErrorKind) {
    let ctx = dynidl::parse(idl);
    assert!(!ctx.success(), "parse unexpectedly succeeded");
    let error = ctx
        .diagnostics()
        .iter()
        .find(|d| d.severity() == Severity::Error)
        .expect("an error diagnostic");
    assert!(
        error.message().starts_with(&kind.to_string()),
        "expected {kind}, got: {}",
        error.message()
    );
}

#[test]
fn arithmetic_with_precedence() {
    let ctx = parse_ok("const long N = 1 + 2 * 3;");
    assert_eq!(ctx.find_constant("N"), Some(&DynData::Int32(7)));
}

#[test]
fn parentheses_override_precedence() {
    let ctx = parse_ok("const long N = (1 + 2) * 3;");
    assert_eq!(ctx.find_constant("N"), Some(&DynData::Int32(9)));
}

#[test]
fn scoped_constant_reference() {
    let ctx = parse_ok("module A { const long K = 5; }; const long J = A::K + 1;");
    assert_eq!(ctx.find_constant("A::K"), Some(&DynData::Int32(5)));
    assert_eq!(ctx.find_constant("J"), Some(&DynData::Int32(6)));
}

#[test]
fn integer_radixes_and_widths() {
    let ctx = parse_ok(
        "const octet O = 255;
         const unsigned long H = 0xFFFFFFFF;
         const short OCT = 017;
         const long long BIG = 1 << 40;
         const unsigned long long ALL = 0xFFFFFFFFFFFFFFFF;",
    );
    assert_eq!(ctx.find_constant("O"), Some(&DynData::Byte(255)));
    assert_eq!(ctx.find_constant("H"), Some(&DynData::UInt32(u32::MAX)));
    assert_eq!(ctx.find_constant("OCT"), Some(&DynData::Int16(15)));
    assert_eq!(ctx.find_constant("BIG"), Some(&DynData::Int64(1 << 40)));
    assert_eq!(ctx.find_constant("ALL"), Some(&DynData::UInt64(u64::MAX)));
}

#[test]
fn unary_operators() {
    let ctx = parse_ok(
        "const long NEG = -(2 + 3);
         const long INV = ~0;
         const long POS = +42;",
    );
    assert_eq!(ctx.find_constant("NEG"), Some(&DynData::Int32(-5)));
    assert_eq!(ctx.find_constant("INV"), Some(&DynData::Int32(-1)));
    assert_eq!(ctx.find_constant("POS"), Some(&DynData::Int32(42)));
}

#[test]
fn division_modulo_and_shifts() {
    let ctx = parse_ok(
        "const long D = 7 / 2;
         const long M = 7 % 3;
         const long L = 1 << 4;
         const long R = 256 >> 4;",
    );
    assert_eq!(ctx.find_constant("D"), Some(&DynData::Int32(3)));
    assert_eq!(ctx.find_constant("M"), Some(&DynData::Int32(1)));
    assert_eq!(ctx.find_constant("L"), Some(&DynData::Int32(16)));
    assert_eq!(ctx.find_constant("R"), Some(&DynData::Int32(16)));
}

#[test]
fn bitwise_operators() {
    let ctx = parse_ok(
        "const long AND = 12 & 10;
         const long OR = 12 | 10;
         const long XOR = 12 ^ 10;
         const boolean B = TRUE & FALSE;",
    );
    assert_eq!(ctx.find_constant("AND"), Some(&DynData::Int32(8)));
    assert_eq!(ctx.find_constant("OR"), Some(&DynData::Int32(14)));
    assert_eq!(ctx.find_constant("XOR"), Some(&DynData::Int32(6)));
    assert_eq!(ctx.find_constant("B"), Some(&DynData::Boolean(false)));
}

#[test]
fn float_and_fixed_constants() {
    let ctx = parse_ok(
        "const double D = 1.5;
         const float F = 2.5;
         const long double LD = 1e3;
         const fixed PI = 3.5d;",
    );
    assert_eq!(ctx.find_constant("D"), Some(&DynData::Float64(1.5)));
    assert_eq!(ctx.find_constant("F"), Some(&DynData::Float32(2.5)));
    assert_eq!(ctx.find_constant("LD"), Some(&DynData::Float128(1000.0)));
    assert_eq!(ctx.find_constant("PI"), Some(&DynData::Float128(3.5)));
}

#[test]
fn char_string_and_wide_constants() {
    let ctx = parse_ok(
        "const char C = 'x';
         const char NL = '\\n';
         const string S = \"a\" \"b\";
         const string<5> SHORT = \"hi\";
         const wchar WC = L'w';
         const wstring WS = L\"wide\";",
    );
    assert_eq!(ctx.find_constant("C"), Some(&DynData::Char8('x')));
    assert_eq!(ctx.find_constant("NL"), Some(&DynData::Char8('\n')));
    assert_eq!(ctx.find_constant("S"), Some(&DynData::String8("ab".to_owned())));
    assert_eq!(ctx.find_constant("SHORT"), Some(&DynData::String8("hi".to_owned())));
    assert_eq!(ctx.find_constant("WC"), Some(&DynData::Char16('w')));
    assert_eq!(ctx.find_constant("WS"), Some(&DynData::String16("wide".to_owned())));
}

#[test]
fn constants_chain_through_earlier_declarations() {
    let ctx = parse_ok("const long A = 2; const long B = A * A; const long C = B + A;");
    assert_eq!(ctx.find_constant("B"), Some(&DynData::Int32(4)));
    assert_eq!(ctx.find_constant("C"), Some(&DynData::Int32(6)));
}

#[test]
fn alias_and_enum_typed_constants() {
    let ctx = parse_ok(
        "typedef long MyLong;
         const MyLong X = 3;
         enum Color { RED, GREEN };
         const Color FAV = GREEN;",
    );
    assert_eq!(ctx.find_constant("X"), Some(&DynData::Int32(3)));
    assert_eq!(ctx.find_constant("FAV"), Some(&DynData::UInt32(1)));
}

#[test]
fn boolean_operand_to_division_is_a_type_error() {
    parse_err("const long X = TRUE / 2;", ParseErrorKind::EvalTypeError);
}

#[test]
fn float_operand_to_modulo_is_a_type_error() {
    parse_err("const long X = 1.5 % 2;", ParseErrorKind::EvalTypeError);
}

#[test]
fn unknown_scoped_name_is_a_resolve_error() {
    parse_err("const long Y = ::Unknown;", ParseErrorKind::ResolveError);
}

#[test]
fn narrowing_out_of_range_is_a_range_error() {
    parse_err("const short SMALL = 40000;", ParseErrorKind::EvalRangeError);
    parse_err("const octet O = 256;", ParseErrorKind::EvalRangeError);
}

#[test]
fn string_bound_overflow_is_a_range_error() {
    parse_err(
        "const string<3> LONG_TEXT = \"too long\";",
        ParseErrorKind::EvalRangeError,
    );
}

#[test]
fn division_by_zero_is_a_range_error() {
    parse_err("const long Z = 1 / 0;", ParseErrorKind::EvalRangeError);
}

#[test]
fn stored_kind_matches_declared_type() {
    let ctx = parse_ok("const unsigned short U = 7;");
    let value = ctx.find_constant("U").unwrap();
    assert_eq!(value.kind(), dynidl::TypeKind::UInt16);
}
