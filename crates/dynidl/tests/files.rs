use std::io::Write;

use dynidl::{DynData, ParseErrorKind};
use pretty_assertions::assert_eq;

fn idl_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .prefix("dynidl_test_")
        .suffix(".idl")
        .tempfile()
        .expect("temp file");
    file.write_all(content.as_bytes()).expect("write idl");
    file.flush().expect("flush idl");
    file
}

#[test]
fn parse_file_reads_without_preprocessing_by_default() {
    let file = idl_file("const long N = 2 + 2;");
    let ctx = dynidl::parse_file(file.path());
    assert!(ctx.success(), "diagnostics: {:?}", ctx.diagnostics());
    assert_eq!(ctx.find_constant("N"), Some(&DynData::Int32(4)));
}

#[test]
fn parse_file_with_context_appends() {
    let first = idl_file("const long A = 1;");
    let second = idl_file("const long B = A + 1;");
    let mut ctx = dynidl::Context::new();
    assert!(dynidl::parse_file_with_context(first.path(), &mut ctx));
    assert!(dynidl::parse_file_with_context(second.path(), &mut ctx));
    assert_eq!(ctx.find_constant("B"), Some(&DynData::Int32(2)));
}

#[test]
fn missing_file_is_a_preprocessor_error() {
    let ctx = dynidl::parse_file("/definitely/not/here.idl");
    assert!(!ctx.success());
    let error = ctx.errors().next().unwrap();
    assert!(
        error.message().starts_with(&ParseErrorKind::PreprocessorError.to_string()),
        "got: {}",
        error.message()
    );
}

#[test]
fn targeted_parse_stops_after_the_named_type() {
    let file = idl_file(
        "struct First { long a; };
         struct Second { long b; };
         struct Third { long c; };",
    );
    let ctx = dynidl::parse_file_for_type(file.path(), "First", &[], None);
    assert!(ctx.success(), "diagnostics: {:?}", ctx.diagnostics());
    assert!(ctx.find_type("First").is_some());
    assert!(ctx.find_type("Second").is_none(), "parsing stopped cooperatively");
    assert!(ctx.find_type("Third").is_none());
}

#[test]
fn targeted_parse_accepts_garbage_after_the_target() {
    let file = idl_file("struct Wanted { long a; }; this is not idl at all ~~~");
    let ctx = dynidl::parse_file_for_type(file.path(), "Wanted", &[], None);
    assert!(ctx.success(), "the remaining input is accepted without semantic action");
    assert!(ctx.find_type("Wanted").is_some());
}

#[test]
fn targeted_parse_matches_fully_qualified_names() {
    let file = idl_file(
        "module app { struct Inner { long a; }; };
         struct After { long b; };",
    );
    let ctx = dynidl::parse_file_for_type(file.path(), "app::Inner", &[], None);
    assert!(ctx.success());
    assert!(ctx.find_type("app::Inner").is_some());
    assert!(ctx.find_type("After").is_none());
}

#[test]
fn targeted_parse_processes_the_whole_file_when_the_type_is_absent() {
    let file = idl_file("struct Only { long a; };");
    let ctx = dynidl::parse_file_for_type(file.path(), "Nope", &[], None);
    assert!(ctx.success());
    assert!(ctx.find_type("Only").is_some());
}

#[cfg(unix)]
#[test]
fn preprocessing_pipes_through_the_configured_executable() {
    // `cat` is an identity preprocessor, good enough to prove the bridge
    // feeds the parser
    let mut ctx = dynidl::Context::new();
    ctx.preprocessor.preprocess = true;
    ctx.preprocessor.preprocessor_exec = "cat".to_owned();
    ctx.preprocessor.preprocessor_flags = String::new();
    assert!(dynidl::parse_with_context("const long N = 7;", &mut ctx));
    assert_eq!(ctx.find_constant("N"), Some(&DynData::Int32(7)));
}

#[test]
fn preprocess_failure_surfaces_as_preprocessor_error() {
    let mut ctx = dynidl::Context::new();
    ctx.preprocessor.preprocess = true;
    ctx.preprocessor.preprocessor_exec = "dynidl-missing-preprocessor".to_owned();
    assert!(!dynidl::parse_with_context("const long N = 1;", &mut ctx));
    assert!(
        ctx.errors()
            .next()
            .unwrap()
            .message()
            .starts_with(&ParseErrorKind::PreprocessorError.to_string())
    );
}

#[test]
fn preprocessing_off_passes_hash_lines_to_the_grammar() {
    // equivalence: with preprocess=false a directive-free text parses the
    // same as its "preprocessed" self, and `#` lines are consumed as
    // directives
    let plain = dynidl::parse("const long N = 1;");
    let with_marker = dynidl::parse("# 1 \"x.idl\"\nconst long N = 1;");
    assert_eq!(plain.find_constant("N"), with_marker.find_constant("N"));
}
