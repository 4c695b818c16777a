use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// Result type alias for operations that can fail while parsing IDL.
pub type ParseResult<T> = Result<T, ParseError>;

/// The failure categories a parse can surface.
///
/// Uses strum derives for automatic `Display`, `FromStr`, and `Into<&'static str>`
/// implementations. The string representation matches the variant name exactly
/// (e.g., `SyntaxError` -> "SyntaxError").
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize,
)]
pub enum ParseErrorKind {
    /// The external preprocessor failed to spawn or reported a non-zero exit.
    PreprocessorError,
    /// The grammar failed to match at a given byte offset.
    SyntaxError,
    /// A scoped name did not resolve to an entity of the expected kind.
    ResolveError,
    /// A declaration would shadow an existing symbol and the policy disallows it.
    RedefinitionError,
    /// A constant expression used an operator against incompatible operand kinds.
    EvalTypeError,
    /// A reduced constant will not fit into its declared type.
    EvalRangeError,
    /// Annotation parameters did not match the declared annotation's members.
    AnnotationParamError,
    /// The grammar matched a construct whose semantic mapping is not implemented.
    UnsupportedError,
}

/// A fatal parse failure: the kind, a human-readable message, and the byte
/// offset into the (preprocessed) input at which the offending construct
/// started.
///
/// Raising one of these from a semantic action aborts the parse: the context
/// is marked unsuccessful and the module tree is left as it was at the last
/// completed declaration boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseError {
    kind: ParseErrorKind,
    message: String,
    offset: usize,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            offset: 0,
        }
    }

    /// Attach the byte offset of the construct that produced this error.
    ///
    /// Semantic errors are created deep inside the evaluator or the symbol
    /// table where the source position is unknown; the driver stamps the
    /// offset of the enclosing definition before recording the error.
    #[must_use]
    pub fn at_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn kind(&self) -> ParseErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at byte {}: {}", self.kind, self.offset, self.message)
    }
}

impl std::error::Error for ParseError {}

/// Severity of a recorded diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum Severity {
    Warning,
    Error,
}

/// A single entry in the context's diagnostic list.
///
/// Errors mirror the `ParseError` that aborted the parse; warnings are
/// non-fatal (silenced redefinitions, duplicate annotation declarations,
/// unknown annotation applications, unparseable line directives).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    severity: Severity,
    message: String,
    offset: usize,
}

impl Diagnostic {
    pub fn warning(message: impl Into<String>, offset: usize) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            offset,
        }
    }

    pub fn error(err: &ParseError) -> Self {
        Self {
            severity: Severity::Error,
            message: format!("{}: {}", err.kind(), err.message()),
            offset: err.offset(),
        }
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at byte {}: {}", self.severity, self.offset, self.message)
    }
}

/// Shorthand constructors used across the semantic actions.
macro_rules! error_ctor {
    ($fn_name:ident, $kind:ident) => {
        impl ParseError {
            pub(crate) fn $fn_name(message: impl Into<String>) -> Self {
                Self::new(ParseErrorKind::$kind, message)
            }
        }
    };
}

error_ctor!(preprocessor, PreprocessorError);
error_ctor!(syntax, SyntaxError);
error_ctor!(resolve, ResolveError);
error_ctor!(redefinition, RedefinitionError);
error_ctor!(eval_type, EvalTypeError);
error_ctor!(eval_range, EvalRangeError);
error_ctor!(annotation_param, AnnotationParamError);
error_ctor!(unsupported, UnsupportedError);
