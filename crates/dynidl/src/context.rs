//! Parse configuration and results.
//!
//! A [`Context`] carries the recognized options in, and the success flag,
//! module tree and diagnostic list out. The same context can be fed to
//! several parse calls to append declarations into one registry.

use serde::{Deserialize, Serialize};

use crate::{
    error::{Diagnostic, ParseError, Severity},
    expr::DynData,
    module::{Module, ModuleTree},
    preprocessor::PreprocessorConfig,
    registry::{TypeBuilder, TypeKind},
};

/// What the `char` keyword means, per the `char_translation` option.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CharTranslation {
    /// `char` is an 8-bit character.
    #[default]
    Char,
    /// `char` is an unsigned byte.
    UInt8,
    /// `char` is a signed byte.
    Int8,
}

impl CharTranslation {
    pub(crate) fn kind(self) -> TypeKind {
        match self {
            Self::Char => TypeKind::Char8,
            Self::UInt8 => TypeKind::UInt8,
            Self::Int8 => TypeKind::Int8,
        }
    }
}

/// What the `wchar` keyword means, per the `wchar_type` option.
///
/// Both choices produce the char16 registry kind (as the original does when
/// building dynamic types); the option records the declared intent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WideCharKind {
    #[default]
    WCharT,
    Char16T,
}

impl WideCharKind {
    pub(crate) fn kind(self) -> TypeKind {
        match self {
            Self::WCharT | Self::Char16T => TypeKind::Char16,
        }
    }
}

/// Configuration in, results out.
///
/// Option fields are plain public data, set before the first parse call.
/// `ignore_case` is latched when the module tree is created (the first
/// parse); flipping it afterwards has no effect on an existing registry.
#[derive(Debug)]
pub struct Context {
    /// External-preprocessor options; see [`PreprocessorConfig`].
    pub preprocessor: PreprocessorConfig,
    /// Case-insensitive identifier handling.
    pub ignore_case: bool,
    /// Reset transient parser state (pending annotations, operand stack)
    /// when a parse completes. The registry itself is always kept.
    pub clear: bool,
    /// Permit identifiers that collide with non-structural keywords.
    pub allow_keyword_identifiers: bool,
    /// Downgrade redefinitions to warnings, keeping the original symbol.
    pub ignore_redefinition: bool,
    pub char_translation: CharTranslation,
    pub wchar_type: WideCharKind,

    success: bool,
    modules: Option<ModuleTree>,
    diagnostics: Vec<Diagnostic>,
    /// Fully-qualified name that stops the parse once registered.
    target_type: Option<String>,
    should_continue: bool,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            preprocessor: PreprocessorConfig::default(),
            ignore_case: false,
            clear: true,
            allow_keyword_identifiers: false,
            ignore_redefinition: false,
            char_translation: CharTranslation::default(),
            wchar_type: WideCharKind::default(),
            success: false,
            modules: None,
            diagnostics: Vec::new(),
            target_type: None,
            should_continue: true,
        }
    }
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the last parse into this context succeeded.
    pub fn success(&self) -> bool {
        self.success
    }

    /// The module tree, if any parse has run.
    pub fn module_tree(&self) -> Option<&ModuleTree> {
        self.modules.as_ref()
    }

    /// The root module, if any parse has run.
    pub fn root_module(&self) -> Option<&Module> {
        self.modules.as_ref().map(|tree| tree.module(tree.root()))
    }

    /// Look up a registered type by fully-qualified name (`A::B::Name`).
    pub fn find_type(&self, qualified_name: &str) -> Option<&TypeBuilder> {
        self.modules.as_ref()?.find_type(qualified_name)
    }

    /// Look up a constant by fully-qualified name.
    pub fn find_constant(&self, qualified_name: &str) -> Option<&DynData> {
        self.modules.as_ref()?.find_constant(qualified_name)
    }

    /// Whether a constant was synthesized from an enumeration literal.
    pub fn constant_is_from_enum(&self, qualified_name: &str) -> bool {
        let Some(tree) = self.modules.as_ref() else {
            return false;
        };
        let path = qualified_name.trim_start_matches("::");
        let (module_path, leaf) = match path.rsplit_once("::") {
            Some((m, l)) => (m, l),
            None => ("", path),
        };
        tree.find_module(module_path)
            .is_some_and(|id| tree.module(id).constant_is_from_enum(leaf))
    }

    /// Every diagnostic recorded so far, warnings and errors alike.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity() == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity() == Severity::Warning)
    }

    pub(crate) fn module_tree_mut(&mut self) -> &mut ModuleTree {
        let ignore_case = self.ignore_case;
        self.modules.get_or_insert_with(|| ModuleTree::new(ignore_case))
    }

    pub(crate) fn warn(&mut self, message: impl Into<String>, offset: usize) {
        self.diagnostics.push(Diagnostic::warning(message, offset));
    }

    pub(crate) fn record_error(&mut self, error: &ParseError) {
        self.diagnostics.push(Diagnostic::error(error));
    }

    /// Record a failure that happened before the parse loop could start
    /// (unreadable input, preprocessor failure).
    pub(crate) fn record_parse_failure(&mut self, error: &ParseError) {
        self.record_error(error);
        self.success = false;
    }

    pub(crate) fn begin_parse(&mut self, target_type: Option<String>) {
        self.success = false;
        self.should_continue = true;
        self.target_type = target_type;
    }

    pub(crate) fn finish_parse(&mut self, success: bool) {
        self.success = success;
        self.target_type = None;
        self.should_continue = true;
    }

    /// Cooperative-stop check, consulted by the driver after each top-level
    /// definition.
    pub(crate) fn should_continue(&self) -> bool {
        self.should_continue
    }

    /// Called whenever a type declaration registers a builder; clears the
    /// continue flag when the builder is the targeted type.
    pub(crate) fn notify_type_registered(&mut self, qualified_name: &str) {
        if let Some(target) = &self.target_type {
            let target = target.trim_start_matches("::");
            if target == qualified_name.trim_start_matches("::") {
                self.should_continue = false;
            }
        }
    }
}
