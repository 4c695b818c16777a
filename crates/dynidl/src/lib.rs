#![doc = include_str!("../../../README.md")]
#![expect(clippy::cast_possible_truncation, reason = "numeric narrowing is range-checked first")]
#![expect(clippy::cast_sign_loss, reason = "sign-changing casts reinterpret two's-complement bits")]
#![expect(clippy::cast_possible_wrap, reason = "wrap behavior mirrors the uint64 evaluation domain")]

mod annotations;
mod ast;
mod context;
mod error;
mod expr;
mod grammar;
mod module;
mod parser;
mod preprocessor;
mod registry;

use std::path::Path;

pub use crate::{
    annotations::{AnnotationDecl, AnnotationDescriptor},
    context::{CharTranslation, Context, WideCharKind},
    error::{Diagnostic, ParseError, ParseErrorKind, ParseResult, Severity},
    expr::DynData,
    module::{Module, ModuleId, ModuleTree, TypeCategory},
    preprocessor::{ErrorRedir, PreprocessStrategy, PreprocessorConfig},
    registry::{
        BitfieldDescriptor, BitflagDescriptor, DynamicType, EnumLiteral, ExtensibilityKind, MemberDescriptor,
        TryConstructKind, TypeBuilder, TypeDetail, TypeKind,
    },
};

/// Parse an IDL string into a fresh context.
///
/// ```
/// let ctx = dynidl::parse("const long N = 1 + 2 * 3;");
/// assert!(ctx.success());
/// assert_eq!(ctx.find_constant("N"), Some(&dynidl::DynData::Int32(7)));
/// ```
pub fn parse(idl: &str) -> Context {
    let mut context = Context::new();
    parse_with_context(idl, &mut context);
    context
}

/// Parse an IDL string into an existing context, appending to its registry.
/// Returns the success flag (also available as `context.success()`).
pub fn parse_with_context(idl: &str, context: &mut Context) -> bool {
    parser::parse_into(context, idl, None)
}

/// Parse an IDL file into a fresh context, preprocessing it first when the
/// context default enables preprocessing.
pub fn parse_file(idl_file: impl AsRef<Path>) -> Context {
    let mut context = Context::new();
    parse_file_with_context(idl_file, &mut context);
    context
}

/// Parse an IDL file into an existing context.
pub fn parse_file_with_context(idl_file: impl AsRef<Path>, context: &mut Context) -> bool {
    let path = idl_file.as_ref();
    let text = if context.preprocessor.preprocess {
        context.preprocessor.preprocess_file(path)
    } else {
        std::fs::read_to_string(path)
            .map_err(|e| ParseError::preprocessor(format!("cannot read '{}': {e}", path.display())))
    };
    match text {
        Ok(text) => {
            // the text is already preprocessed (or preprocessing is off)
            let preprocess = std::mem::replace(&mut context.preprocessor.preprocess, false);
            let ok = parser::parse_into(context, &text, None);
            context.preprocessor.preprocess = preprocess;
            ok
        }
        Err(err) => {
            context.record_parse_failure(&err);
            false
        }
    }
}

/// Parse an IDL file until the type with the given fully-qualified name has
/// been registered, then stop cooperatively: the rest of the file is
/// accepted without further semantic action.
///
/// `preprocessor` overrides the preprocessor executable; preprocessing is
/// enabled when either an override or include paths are supplied.
pub fn parse_file_for_type(
    idl_file: impl AsRef<Path>,
    type_name: &str,
    include_paths: &[String],
    preprocessor: Option<&str>,
) -> Context {
    let mut context = Context::new();
    context.preprocessor.include_paths = include_paths.to_vec();
    if let Some(exec) = preprocessor {
        context.preprocessor.preprocessor_exec = exec.to_owned();
    }
    context.preprocessor.preprocess = preprocessor.is_some() || !include_paths.is_empty();

    let path = idl_file.as_ref();
    let text = if context.preprocessor.preprocess {
        context.preprocessor.preprocess_file(path)
    } else {
        std::fs::read_to_string(path)
            .map_err(|e| ParseError::preprocessor(format!("cannot read '{}': {e}", path.display())))
    };
    match text {
        Ok(text) => {
            let preprocess = std::mem::replace(&mut context.preprocessor.preprocess, false);
            parser::parse_into(&mut context, &text, Some(type_name.to_owned()));
            context.preprocessor.preprocess = preprocess;
        }
        Err(err) => context.record_parse_failure(&err),
    }
    context
}

/// Run the preprocessor alone over a file, with the platform-default
/// command and the given include paths.
pub fn preprocess(idl_file: impl AsRef<Path>, include_paths: &[String]) -> ParseResult<String> {
    let mut config = PreprocessorConfig::default();
    config.include_paths = include_paths.to_vec();
    config.preprocess_file(idl_file.as_ref())
}
