//! The parser driver.
//!
//! Consumes the input one top-level definition at a time: the grammar
//! reduces a definition to its AST, the driver immediately performs the
//! semantic actions (evaluation, resolution, registration, annotation
//! draining), then the cooperative-stop flag is consulted before the next
//! definition is parsed. Semantic effects therefore land in exact source
//! order, and once a targeted parse has found its type the remaining input
//! is never semantically processed.
//!
//! All state is exclusively owned here for the duration of one parse call:
//! the operand stack, the pending-annotation queues, and the module stack
//! (carried implicitly by recursion into module bodies).

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::{
    annotations::{
        AnnotationDecl, AnnotationMember, AnnotationMemberKind, PendingAnnotation, PendingAnnotations,
        apply_builtin_to_member, apply_builtin_to_type, resolve_parameters,
    },
    ast::{
        AnnotationAppl, AnnotationBodyItem, AnnotationDef, BitmaskDef, BitsetDef, ConstDcl, ConstExpr, Declarator,
        Definition, DefinitionBody, EnumDef, ModuleDcl, ScopedName, StructDef, TypeSpec, TypedefBase, TypedefDcl,
        UnionDef,
    },
    context::Context,
    error::{ParseError, ParseResult},
    expr::{ConstantScope, DynData, Evaluator, convert_for_const, to_label_value, to_positive_u32, to_u16},
    grammar::{self, GrammarConfig},
    module::{InsertOutcome, ModuleId, ModuleScope, TypeCategory},
    registry::{
        BitfieldDescriptor, BitflagDescriptor, DynamicType, EnumLiteral, MemberDescriptor, TypeBuilder, TypeDetail,
        TypeKind,
    },
};

/// Evaluation scope inside an annotation application or body: the
/// annotation's local constants shadow the module scope.
struct AnnotationEvalScope<'a> {
    module: ModuleScope<'a>,
    decl: &'a AnnotationDecl,
}

impl ConstantScope for AnnotationEvalScope<'_> {
    fn lookup_constant(&self, name: &ScopedName) -> Option<DynData> {
        if let Some(ident) = name.as_identifier() {
            if let Some(value) = self.decl.local_constant(ident) {
                return Some(value.clone());
            }
        }
        self.module.lookup_constant(name)
    }
}

/// One parse invocation's worth of driver state.
struct ParseRun<'a> {
    ctx: &'a mut Context,
    evaluator: Evaluator,
    pending: PendingAnnotations,
    current_module: ModuleId,
    cfg: GrammarConfig,
    /// Byte offset of the definition currently being processed; stamped
    /// onto semantic errors.
    current_offset: usize,
}

/// Parse `text` into the context's registry. Returns the success flag.
///
/// `target_type` enables the cooperative stop: once a builder with that
/// fully-qualified name registers, the rest of the input is accepted
/// without further semantic action.
pub(crate) fn parse_into(ctx: &mut Context, text: &str, target_type: Option<String>) -> bool {
    ctx.begin_parse(target_type);

    let preprocessed;
    let input: &str = if ctx.preprocessor.preprocess {
        match ctx.preprocessor.preprocess_string(text) {
            Ok(processed) => {
                preprocessed = processed;
                &preprocessed
            }
            Err(err) => {
                ctx.record_error(&err);
                ctx.finish_parse(false);
                return false;
            }
        }
    } else {
        text
    };

    let cfg = GrammarConfig {
        allow_keyword_identifiers: ctx.allow_keyword_identifiers,
    };
    // make sure the tree (and the builtin annotations) exist before the
    // first definition
    let root = {
        let tree = ctx.module_tree_mut();
        tree.root()
    };
    let mut run = ParseRun {
        ctx,
        evaluator: Evaluator::default(),
        pending: PendingAnnotations::default(),
        current_module: root,
        cfg,
        current_offset: 0,
    };

    let mut rest = input;
    let success = loop {
        if grammar::at_end(rest) {
            break true;
        }
        match grammar::definition(rest, &run.cfg, input) {
            Ok((after, definition)) => {
                if let Err(err) = run.process_definition(&definition) {
                    // current_offset tracks the innermost definition being
                    // processed, which is where the failure belongs
                    let err = if err.offset() == 0 {
                        err.at_offset(run.current_offset)
                    } else {
                        err
                    };
                    run.ctx.record_error(&err);
                    break false;
                }
                debug_assert!(run.evaluator.is_empty(), "operand stack drains between definitions");
                rest = after;
                if !run.ctx.should_continue() {
                    // targeted parse found its type: accept the rest of the
                    // input without semantic action
                    break true;
                }
            }
            Err(_) => {
                let base = input.len() - rest.len();
                let skipped = rest.len() - rest.trim_start().len();
                let err = ParseError::syntax("no IDL definition matches here").at_offset(base + skipped);
                run.ctx.record_error(&err);
                break false;
            }
        }
    };

    if run.ctx.clear {
        run.evaluator.clear();
        run.pending.clear();
    }
    run.ctx.finish_parse(success);
    success
}

impl ParseRun<'_> {
    // -- evaluation helpers -------------------------------------------------

    fn eval(&mut self, expr: &ConstExpr) -> ParseResult<DynData> {
        let tree = self.ctx.module_tree_mut();
        let scope = ModuleScope {
            tree,
            current: self.current_module,
        };
        self.evaluator.evaluate(expr, &scope)
    }

    fn eval_in_annotation(&mut self, expr: &ConstExpr, decl: &AnnotationDecl) -> ParseResult<DynData> {
        let tree = self.ctx.module_tree_mut();
        let scope = AnnotationEvalScope {
            module: ModuleScope {
                tree,
                current: self.current_module,
            },
            decl,
        };
        self.evaluator.evaluate(expr, &scope)
    }

    fn eval_bound(&mut self, expr: &ConstExpr) -> ParseResult<u32> {
        let value = self.eval(expr)?;
        to_positive_u32(&value)
    }

    // -- type resolution ----------------------------------------------------

    /// Resolve a type mention to a frozen type, evaluating any embedded
    /// bounds in the current scope.
    fn resolve_type_spec(&mut self, spec: &TypeSpec) -> ParseResult<DynamicType> {
        match spec {
            TypeSpec::Primitive(kind) => Ok(DynamicType::primitive(*kind)),
            TypeSpec::Char => Ok(DynamicType::primitive(self.ctx.char_translation.kind())),
            TypeSpec::WChar => Ok(DynamicType::primitive(self.ctx.wchar_type.kind())),
            TypeSpec::String { bound } => {
                let bound = bound.as_ref().map(|b| self.eval_bound(b)).transpose()?;
                Ok(DynamicType::string(bound))
            }
            TypeSpec::WString { bound } => {
                let bound = bound.as_ref().map(|b| self.eval_bound(b)).transpose()?;
                Ok(DynamicType::wstring(bound))
            }
            TypeSpec::Sequence { element, bound } => {
                let element = self.resolve_type_spec(element)?;
                let bound = bound.as_ref().map(|b| self.eval_bound(b)).transpose()?;
                Ok(DynamicType::sequence(element, bound))
            }
            TypeSpec::Map { key, value, bound } => {
                let key = self.resolve_type_spec(key)?;
                let value = self.resolve_type_spec(value)?;
                let bound = bound.as_ref().map(|b| self.eval_bound(b)).transpose()?;
                Ok(DynamicType::map(key, value, bound))
            }
            TypeSpec::Fixed { digits, scale } => {
                let digits = self.eval_bound(digits)?;
                let scale_value = self.eval(scale)?;
                let scale = to_u16(&scale_value)?;
                let digits =
                    u16::try_from(digits).map_err(|_| ParseError::eval_range("fixed digits exceed uint16"))?;
                if u32::from(scale) > u32::from(digits) {
                    return Err(ParseError::eval_range(format!(
                        "fixed<{digits}, {scale}>: scale exceeds total digits"
                    )));
                }
                Ok(DynamicType::fixed(digits, scale))
            }
            TypeSpec::Scoped(name) => {
                let tree = self.ctx.module_tree_mut();
                match tree.lookup_builder(self.current_module, name) {
                    Some(builder) => Ok(builder.build()),
                    None => Err(ParseError::resolve(format!("'{name}' does not name a type in this scope"))),
                }
            }
            TypeSpec::Any => Err(ParseError::resolve("'any' is only valid for annotation members")),
        }
    }

    /// Wrap array-declarator dimensions around a member type.
    fn wrap_arrays(&mut self, base: DynamicType, declarator: &Declarator) -> ParseResult<DynamicType> {
        if declarator.array_dims.is_empty() {
            return Ok(base);
        }
        let mut dims: SmallVec<[u32; 2]> = SmallVec::new();
        for dim in &declarator.array_dims {
            dims.push(self.eval_bound(dim)?);
        }
        Ok(DynamicType::array(base, dims))
    }

    // -- annotation staging and draining ------------------------------------

    /// Classify, resolve and stage one batch of `@...` applications.
    ///
    /// Unknown annotations are a warning, not an error; the application is
    /// skipped.
    fn stage_annotations(&mut self, applications: &[AnnotationAppl], target: AnnotationTarget<'_>) -> ParseResult<()> {
        for application in applications {
            let decl = {
                let tree = self.ctx.module_tree_mut();
                tree.find_annotation_scoped(self.current_module, &application.name).cloned()
            };
            let Some(decl) = decl else {
                let offset = self.current_offset;
                self.ctx.warn(
                    format!("unknown annotation '@{}' ignored", application.name),
                    offset,
                );
                continue;
            };
            let values = resolve_parameters(&decl, &application.params, &mut |expr| {
                self.eval_in_annotation(expr, &decl)
            })?;
            let pending = PendingAnnotation {
                name: decl.name().to_owned(),
                values,
                builtin: decl.is_builtin(),
            };
            match target {
                AnnotationTarget::Type => self.pending.push_type(pending),
                AnnotationTarget::Member(name) => self.pending.push_member(name, pending),
                AnnotationTarget::Discriminator => self.pending.push_discriminator(pending),
            }
        }
        Ok(())
    }

    /// Drain staged type-level annotations into a builder.
    fn drain_type_annotations(&mut self, builder: &mut TypeBuilder) -> ParseResult<()> {
        for pending in self.pending.take_type() {
            if !apply_builtin_to_type(builder, &pending)? {
                builder.apply_annotation(pending.descriptor());
            }
        }
        Ok(())
    }

    /// Drain staged member-level annotations into a member descriptor.
    fn drain_member_annotations(&mut self, member_name: &str, descriptor: &mut MemberDescriptor) -> ParseResult<()> {
        for pending in self.pending.take_member(member_name) {
            if !apply_builtin_to_member(descriptor, &pending)? {
                descriptor.push_annotation(pending.descriptor());
            }
        }
        Ok(())
    }

    /// Warn about and clear any annotations that found no target.
    fn discard_unconsumed_annotations(&mut self, what: &str) {
        if !self.pending.is_empty() {
            let offset = self.current_offset;
            self.ctx.warn(format!("annotations on {what} have no effect and were ignored"), offset);
            self.pending.clear();
        }
    }

    // -- registration -------------------------------------------------------

    /// Drain type-level annotations, then register the builder in the
    /// current module, handling forward-declaration completion and the
    /// redefinition policy. Notifies the cooperative-stop check.
    fn register_type(&mut self, category: TypeCategory, mut builder: TypeBuilder) -> ParseResult<()> {
        self.drain_type_annotations(&mut builder)?;

        let declared_name = builder.name().to_owned();
        let (replace, qualified) = {
            let tree = self.ctx.module_tree_mut();
            let replace = !builder.is_incomplete()
                && tree
                    .local_builder(self.current_module, &declared_name)
                    .is_some_and(|existing| existing.is_incomplete() && existing.kind() == builder.kind());
            (replace, tree.qualified_name(self.current_module, &declared_name))
        };

        let ignore_redefinition = self.ctx.ignore_redefinition;
        let outcome = {
            let tree = self.ctx.module_tree_mut();
            tree.insert_builder(self.current_module, category, builder, replace, ignore_redefinition)?
        };
        match outcome {
            InsertOutcome::Inserted => self.ctx.notify_type_registered(&qualified),
            InsertOutcome::Ignored(message) => {
                let offset = self.current_offset;
                self.ctx.warn(message, offset);
            }
        }
        Ok(())
    }

    fn register_constant(&mut self, name: &str, value: DynData, from_enumeration: bool) -> ParseResult<()> {
        let ignore_redefinition = self.ctx.ignore_redefinition;
        let outcome = {
            let tree = self.ctx.module_tree_mut();
            tree.insert_constant(self.current_module, name, value, from_enumeration, ignore_redefinition)?
        };
        if let InsertOutcome::Ignored(message) = outcome {
            let offset = self.current_offset;
            self.ctx.warn(message, offset);
        }
        Ok(())
    }

    // -- definitions --------------------------------------------------------

    /// Process one definition; offsets on the AST are absolute already.
    fn process_definition(&mut self, definition: &Definition) -> ParseResult<()> {
        self.current_offset = definition.offset;
        let result = match &definition.body {
            DefinitionBody::Directive(text) => {
                self.handle_directive(text);
                Ok(())
            }
            DefinitionBody::Module(dcl) => self.handle_module(&definition.annotations, dcl),
            DefinitionBody::Const(dcl) => self.handle_const(&definition.annotations, dcl),
            DefinitionBody::Struct(def) => self.handle_struct(&definition.annotations, def),
            DefinitionBody::StructForward(name) => self.handle_struct_forward(&definition.annotations, name),
            DefinitionBody::Union(def) => self.handle_union(&definition.annotations, def),
            DefinitionBody::UnionForward(name) => self.handle_union_forward(&definition.annotations, name),
            DefinitionBody::Enum(def) => self.handle_enum(&definition.annotations, def),
            DefinitionBody::Typedef(dcl) => self.handle_typedef(&definition.annotations, dcl),
            DefinitionBody::Native(name) => self.handle_native(&definition.annotations, name),
            DefinitionBody::Bitset(def) => self.handle_bitset(&definition.annotations, def),
            DefinitionBody::Bitmask(def) => self.handle_bitmask(&definition.annotations, def),
            DefinitionBody::Annotation(def) => self.handle_annotation_def(&definition.annotations, def),
        };
        if result.is_ok() {
            self.discard_unconsumed_annotations("this declaration");
        } else {
            self.pending.clear();
        }
        result
    }

    /// Line directives surviving preprocessing (`# 1 "file.idl"`, `#line
    /// 5`) are consumed; anything else `#`-shaped is consumed with a
    /// warning.
    fn handle_directive(&mut self, text: &str) {
        let body = text.trim();
        let recognized = body.is_empty()
            || body.starts_with(|c: char| c.is_ascii_digit())
            || body.starts_with("line")
            || body.starts_with("pragma")
            || body.starts_with("include")
            || body.starts_with("define")
            || body.starts_with("undef")
            || body.starts_with("if")
            || body.starts_with("else")
            || body.starts_with("elif")
            || body.starts_with("endif");
        if !recognized {
            let offset = self.current_offset;
            self.ctx.warn(format!("unparsed preprocessor directive '#{body}'"), offset);
        }
    }

    fn handle_module(&mut self, annotations: &[AnnotationAppl], dcl: &ModuleDcl) -> ParseResult<()> {
        if !annotations.is_empty() {
            let offset = self.current_offset;
            self.ctx
                .warn("annotations on module declarations have no effect and were ignored", offset);
        }
        let child = {
            let tree = self.ctx.module_tree_mut();
            tree.create_or_enter_submodule(self.current_module, &dcl.name)
        };
        let child = match child {
            Ok(id) => id,
            Err(err) if self.ctx.ignore_redefinition => {
                let offset = self.current_offset;
                self.ctx.warn(
                    format!("{}; skipping module '{}'", err.message(), dcl.name),
                    offset,
                );
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        let saved = self.current_module;
        self.current_module = child;
        let mut result = Ok(());
        for inner in &dcl.definitions {
            result = self.process_definition(inner);
            if result.is_err() {
                break;
            }
        }
        self.current_module = saved;
        result
    }

    /// The const-dcl result sink: evaluate, convert to the declared type,
    /// deposit in the module's constant map.
    fn handle_const(&mut self, annotations: &[AnnotationAppl], dcl: &ConstDcl) -> ParseResult<()> {
        if !annotations.is_empty() {
            let offset = self.current_offset;
            self.ctx
                .warn("annotations on constant declarations have no effect and were ignored", offset);
        }
        let declared = self.resolve_const_type(&dcl.const_type)?;
        let value = self.eval(&dcl.expr)?;
        let converted = convert_for_const(value, &declared)?;
        self.register_constant(&dcl.name, converted, false)
    }

    /// The declared type of a constant: primitives, strings, or a scoped
    /// name denoting an enum or an alias of a constant-capable type.
    fn resolve_const_type(&mut self, spec: &TypeSpec) -> ParseResult<DynamicType> {
        let resolved = self.resolve_type_spec(spec)?;
        let target = resolved.unalias();
        let valid = target.kind().is_primitive()
            || matches!(
                target.kind(),
                TypeKind::String8 | TypeKind::String16 | TypeKind::Enum | TypeKind::Fixed
            );
        if !valid {
            return Err(ParseError::resolve(format!(
                "'{}' is not a valid constant type",
                resolved.name()
            )));
        }
        Ok(resolved)
    }

    fn handle_struct(&mut self, annotations: &[AnnotationAppl], def: &StructDef) -> ParseResult<()> {
        self.stage_annotations(annotations, AnnotationTarget::Type)?;

        let mut builder = TypeBuilder::structure(&def.name);
        if let Some(base_name) = &def.base {
            let base = {
                let tree = self.ctx.module_tree_mut();
                tree.lookup_builder(self.current_module, base_name).map(TypeBuilder::build)
            };
            match base {
                Some(base) if base.kind() == TypeKind::Structure => builder.set_base(base),
                Some(base) => {
                    return Err(ParseError::resolve(format!(
                        "base '{base_name}' of struct '{}' is a {}, not a struct",
                        def.name,
                        base.kind()
                    )));
                }
                None => {
                    return Err(ParseError::resolve(format!(
                        "base '{base_name}' of struct '{}' is not declared",
                        def.name
                    )));
                }
            }
        }

        let mut next_id: u32 = 0;
        for member in &def.members {
            let base_type = self.resolve_type_spec(&member.type_spec)?;
            for declarator in &member.declarators {
                self.stage_annotations(&member.annotations, AnnotationTarget::Member(&declarator.name))?;
                let member_type = self.wrap_arrays(base_type.clone(), declarator)?;
                let mut descriptor = MemberDescriptor::new(&declarator.name, member_type);
                descriptor.set_id(next_id);
                self.drain_member_annotations(&declarator.name, &mut descriptor)?;
                next_id = descriptor.id() + 1;
                builder.add_member(descriptor)?;
            }
        }

        self.register_type(TypeCategory::Structure, builder)
    }

    fn handle_struct_forward(&mut self, annotations: &[AnnotationAppl], name: &str) -> ParseResult<()> {
        self.stage_annotations(annotations, AnnotationTarget::Type)?;
        let already_known = {
            let tree = self.ctx.module_tree_mut();
            tree.has_local(self.current_module, name)
        };
        if already_known {
            return Err(ParseError::redefinition(format!("struct '{name}' was already declared")));
        }
        let mut builder = TypeBuilder::structure(name);
        builder.mark_incomplete();
        self.register_type(TypeCategory::Structure, builder)
    }

    fn handle_union_forward(&mut self, annotations: &[AnnotationAppl], name: &str) -> ParseResult<()> {
        self.stage_annotations(annotations, AnnotationTarget::Type)?;
        let already_known = {
            let tree = self.ctx.module_tree_mut();
            tree.has_local(self.current_module, name)
        };
        if already_known {
            return Err(ParseError::redefinition(format!("union '{name}' was already declared")));
        }
        // the discriminant is unknown until the full definition; int32 is
        // the placeholder the full definition replaces
        let mut builder = TypeBuilder::union(name, DynamicType::primitive(TypeKind::Int32));
        builder.mark_incomplete();
        self.register_type(TypeCategory::Union, builder)
    }

    fn handle_union(&mut self, annotations: &[AnnotationAppl], def: &UnionDef) -> ParseResult<()> {
        self.stage_annotations(annotations, AnnotationTarget::Type)?;

        let discriminant = self.resolve_type_spec(&def.discriminant)?;
        let disc_kind = discriminant.unalias().kind();
        let discriminates = disc_kind.is_integer()
            || matches!(
                disc_kind,
                TypeKind::Boolean | TypeKind::Char8 | TypeKind::Char16 | TypeKind::Byte | TypeKind::Enum
            );
        if !discriminates {
            return Err(ParseError::resolve(format!(
                "'{}' cannot be a union discriminant",
                discriminant.name()
            )));
        }

        let mut builder = TypeBuilder::union(&def.name, discriminant.clone());

        self.stage_annotations(&def.discriminator_annotations, AnnotationTarget::Discriminator)?;
        for pending in self.pending.take_discriminator() {
            if pending.builtin && pending.name == "key" {
                builder.set_discriminator_key(pending.bool_value()?);
            } else {
                builder.push_discriminator_annotation(pending.descriptor());
            }
        }

        let mut seen_labels: Vec<i64> = Vec::new();
        let mut has_default = false;
        let mut next_id: u32 = 0;
        for case in &def.cases {
            let mut labels: SmallVec<[i64; 2]> = SmallVec::new();
            let mut is_default = false;
            for label in &case.labels {
                match label {
                    crate::ast::CaseLabel::Default => {
                        if has_default {
                            return Err(ParseError::redefinition(format!(
                                "union '{}' has more than one default case",
                                def.name
                            )));
                        }
                        has_default = true;
                        is_default = true;
                    }
                    crate::ast::CaseLabel::Value(expr) => {
                        let value = self.eval(expr)?;
                        let label_value = to_label_value(&value, &discriminant)?;
                        if seen_labels.contains(&label_value) {
                            return Err(ParseError::redefinition(format!(
                                "case label {label_value} appears twice in union '{}'",
                                def.name
                            )));
                        }
                        seen_labels.push(label_value);
                        labels.push(label_value);
                    }
                }
            }

            let declarator = &case.declarator;
            self.stage_annotations(&case.annotations, AnnotationTarget::Member(&declarator.name))?;
            let base_type = self.resolve_type_spec(&case.type_spec)?;
            let member_type = self.wrap_arrays(base_type, declarator)?;
            let mut descriptor = MemberDescriptor::new(&declarator.name, member_type);
            descriptor.set_id(next_id);
            descriptor.set_labels(labels, is_default);
            self.drain_member_annotations(&declarator.name, &mut descriptor)?;
            next_id = descriptor.id() + 1;
            builder.add_member(descriptor)?;
        }

        self.register_type(TypeCategory::Union, builder)
    }

    fn handle_enum(&mut self, annotations: &[AnnotationAppl], def: &EnumDef) -> ParseResult<()> {
        self.stage_annotations(annotations, AnnotationTarget::Type)?;

        let mut builder = TypeBuilder::enumeration(&def.name);
        let mut next_value: i32 = 0;
        let mut has_default = false;
        let mut literal_values: Vec<(String, i32)> = Vec::new();
        for enumerator in &def.enumerators {
            self.stage_annotations(&enumerator.annotations, AnnotationTarget::Member(&enumerator.name))?;
            let mut value = next_value;
            let mut is_default = false;
            for pending in self.pending.take_member(&enumerator.name) {
                match (pending.builtin, pending.name.as_str()) {
                    (true, "value") => {
                        let raw = pending.data_value()?.clone();
                        let raw_value = raw.as_i64().ok_or_else(|| {
                            ParseError::annotation_param("@value expects an integer constant")
                        })?;
                        value = i32::try_from(raw_value).map_err(|_| {
                            ParseError::eval_range(format!("@value({raw_value}) does not fit in int32"))
                        })?;
                    }
                    (true, "default_literal") => {
                        if has_default {
                            return Err(ParseError::annotation_param(format!(
                                "enumeration '{}' has more than one @default_literal",
                                def.name
                            )));
                        }
                        has_default = true;
                        is_default = true;
                    }
                    _ => {
                        let offset = self.current_offset;
                        self.ctx.warn(
                            format!(
                                "annotation '@{}' on enumerator '{}' has no effect and was ignored",
                                pending.name, enumerator.name
                            ),
                            offset,
                        );
                    }
                }
            }
            builder.add_literal(EnumLiteral {
                name: enumerator.name.clone(),
                value,
                is_default,
            })?;
            literal_values.push((enumerator.name.clone(), value));
            next_value = value + 1;
        }

        self.register_type(TypeCategory::Enum, builder)?;

        // enumerator names become module constants, marked "from enum", so
        // later constant expressions can reference them
        for (name, value) in literal_values {
            self.register_constant(&name, DynData::UInt32(value as u32), true)?;
        }
        Ok(())
    }

    fn handle_typedef(&mut self, annotations: &[AnnotationAppl], dcl: &TypedefDcl) -> ParseResult<()> {
        self.stage_annotations(annotations, AnnotationTarget::Type)?;

        let referent = match &dcl.base {
            TypedefBase::Spec(spec) => self.resolve_type_spec(spec)?,
            TypedefBase::Struct(def) => {
                self.handle_struct(&[], def)?;
                self.constructed_referent(&def.name)?
            }
            TypedefBase::Union(def) => {
                self.handle_union(&[], def)?;
                self.constructed_referent(&def.name)?
            }
            TypedefBase::Enum(def) => {
                self.handle_enum(&[], def)?;
                self.constructed_referent(&def.name)?
            }
            TypedefBase::Bitset(def) => {
                self.handle_bitset(&[], def)?;
                self.constructed_referent(&def.name)?
            }
            TypedefBase::Bitmask(def) => {
                self.handle_bitmask(&[], def)?;
                self.constructed_referent(&def.name)?
            }
        };

        for declarator in &dcl.declarators {
            let aliased = self.wrap_arrays(referent.clone(), declarator)?;
            let builder = TypeBuilder::alias(&declarator.name, aliased);
            self.register_type(TypeCategory::Alias, builder)?;
        }
        Ok(())
    }

    /// The frozen type of an inline-constructed typedef referent, fetched
    /// back from the module it just registered into.
    fn constructed_referent(&mut self, name: &str) -> ParseResult<DynamicType> {
        let tree = self.ctx.module_tree_mut();
        tree.local_builder(self.current_module, name)
            .map(TypeBuilder::build)
            .ok_or_else(|| ParseError::resolve(format!("constructed type '{name}' did not register")))
    }

    fn handle_native(&mut self, annotations: &[AnnotationAppl], name: &str) -> ParseResult<()> {
        if !annotations.is_empty() {
            let offset = self.current_offset;
            self.ctx
                .warn("annotations on native declarations have no effect and were ignored", offset);
        }
        let offset = self.current_offset;
        self.ctx.warn(
            format!("native declaration '{name}' has no dynamic-type mapping and was ignored"),
            offset,
        );
        Ok(())
    }

    fn handle_bitset(&mut self, annotations: &[AnnotationAppl], def: &BitsetDef) -> ParseResult<()> {
        self.stage_annotations(annotations, AnnotationTarget::Type)?;

        let mut builder = TypeBuilder::bitset(&def.name);
        if let Some(base_name) = &def.base {
            let base = {
                let tree = self.ctx.module_tree_mut();
                tree.lookup_builder(self.current_module, base_name).map(TypeBuilder::build)
            };
            match base {
                Some(base) if base.kind() == TypeKind::Bitset => builder.set_base(base),
                Some(base) => {
                    return Err(ParseError::resolve(format!(
                        "base '{base_name}' of bitset '{}' is a {}, not a bitset",
                        def.name,
                        base.kind()
                    )));
                }
                None => {
                    return Err(ParseError::resolve(format!(
                        "base '{base_name}' of bitset '{}' is not declared",
                        def.name
                    )));
                }
            }
        }

        let mut position: u16 = 0;
        for bitfield in &def.bitfields {
            let width_value = self.eval(&bitfield.width)?;
            let width = to_positive_u32(&width_value)?;
            if width > 64 {
                return Err(ParseError::eval_range(format!("bitfield width {width} exceeds 64")));
            }
            let width = width as u16;
            let holder = match &bitfield.holder {
                Some(spec) => Some(self.resolve_type_spec(spec)?.kind()),
                None => None,
            };

            if bitfield.names.is_empty() {
                // anonymous padding still advances the position
                builder.add_bitfield(BitfieldDescriptor {
                    name: None,
                    position,
                    width,
                    holder,
                })?;
                position = advance_bit_position(position, width, &def.name)?;
            }
            for name in &bitfield.names {
                self.stage_annotations(&bitfield.annotations, AnnotationTarget::Member(name))?;
                let mut explicit_position = None;
                for pending in self.pending.take_member(name) {
                    if pending.builtin && pending.name == "position" {
                        explicit_position = Some(to_u16(pending.data_value()?)?);
                    } else {
                        let offset = self.current_offset;
                        self.ctx.warn(
                            format!("annotation '@{}' on bitfield '{name}' has no effect and was ignored", pending.name),
                            offset,
                        );
                    }
                }
                if let Some(p) = explicit_position {
                    position = p;
                }
                builder.add_bitfield(BitfieldDescriptor {
                    name: Some(name.clone()),
                    position,
                    width,
                    holder,
                })?;
                position = advance_bit_position(position, width, &def.name)?;
            }
        }

        self.register_type(TypeCategory::Bitset, builder)
    }

    fn handle_bitmask(&mut self, annotations: &[AnnotationAppl], def: &BitmaskDef) -> ParseResult<()> {
        self.stage_annotations(annotations, AnnotationTarget::Type)?;

        let mut builder = TypeBuilder::bitmask(&def.name);
        let mut position: u16 = 0;
        for value in &def.values {
            self.stage_annotations(&value.annotations, AnnotationTarget::Member(&value.name))?;
            let mut explicit_position = None;
            for pending in self.pending.take_member(&value.name) {
                if pending.builtin && pending.name == "position" {
                    explicit_position = Some(to_u16(pending.data_value()?)?);
                } else {
                    let offset = self.current_offset;
                    self.ctx.warn(
                        format!(
                            "annotation '@{}' on bit flag '{}' has no effect and was ignored",
                            pending.name, value.name
                        ),
                        offset,
                    );
                }
            }
            if let Some(p) = explicit_position {
                position = p;
            }
            if position >= 64 {
                return Err(ParseError::eval_range(format!(
                    "bit position {position} of flag '{}' exceeds 63",
                    value.name
                )));
            }
            builder.add_flag(BitflagDescriptor {
                name: value.name.clone(),
                position,
            })?;
            position += 1;
        }

        self.register_type(TypeCategory::Bitmask, builder)
    }

    /// `@annotation Name { ... }`: build the declaration, its members and
    /// its private constants, then register it (duplicates warn and keep
    /// the first declaration).
    fn handle_annotation_def(&mut self, annotations: &[AnnotationAppl], def: &AnnotationDef) -> ParseResult<()> {
        if !annotations.is_empty() {
            let offset = self.current_offset;
            self.ctx.warn(
                "annotations on annotation declarations have no effect and were ignored",
                offset,
            );
        }

        let mut decl = AnnotationDecl::user(&def.name);
        // enums and aliases declared in the body, visible only to member
        // types of this annotation
        let mut local_enums: IndexMap<String, Vec<String>> = IndexMap::new();
        let mut local_aliases: IndexMap<String, DynamicType> = IndexMap::new();

        for item in &def.body {
            match item {
                AnnotationBodyItem::Enum(enum_def) => {
                    let mut literals = Vec::new();
                    for (index, enumerator) in enum_def.enumerators.iter().enumerate() {
                        if !enumerator.annotations.is_empty() {
                            let offset = self.current_offset;
                            self.ctx.warn(
                                "annotations inside annotation bodies have no effect and were ignored",
                                offset,
                            );
                        }
                        let value = u32::try_from(index).expect("enumerator count fits u32");
                        decl.add_local_constant(&enumerator.name, DynData::UInt32(value))?;
                        literals.push(enumerator.name.clone());
                    }
                    if local_enums.insert(enum_def.name.clone(), literals).is_some() {
                        return Err(ParseError::redefinition(format!(
                            "'{}' is already declared inside annotation '{}'",
                            enum_def.name, def.name
                        )));
                    }
                }
                AnnotationBodyItem::Const(const_dcl) => {
                    let declared = self.resolve_const_type(&const_dcl.const_type)?;
                    let value = self.eval_in_annotation(&const_dcl.expr, &decl)?;
                    let converted = convert_for_const(value, &declared)?;
                    decl.add_local_constant(&const_dcl.name, converted)?;
                }
                AnnotationBodyItem::Typedef(typedef) => {
                    let TypedefBase::Spec(spec) = &typedef.base else {
                        return Err(ParseError::unsupported(
                            "constructed types are not supported inside annotation bodies",
                        ));
                    };
                    let referent = self.resolve_type_spec(spec)?;
                    for declarator in &typedef.declarators {
                        let aliased = self.wrap_arrays(referent.clone(), declarator)?;
                        if local_aliases.insert(declarator.name.clone(), aliased).is_some() {
                            return Err(ParseError::redefinition(format!(
                                "'{}' is already declared inside annotation '{}'",
                                declarator.name, def.name
                            )));
                        }
                    }
                }
                AnnotationBodyItem::Member {
                    type_spec,
                    name,
                    default,
                } => {
                    let kind = self.annotation_member_kind(type_spec, &local_enums, &local_aliases)?;
                    let default = match default {
                        Some(expr) => Some(self.annotation_member_default(&decl, &kind, expr)?),
                        None => None,
                    };
                    decl.add_member(AnnotationMember {
                        name: name.clone(),
                        kind,
                        default,
                    })?;
                }
            }
        }

        let outcome = {
            let tree = self.ctx.module_tree_mut();
            tree.insert_annotation(self.current_module, decl)
        };
        if let InsertOutcome::Ignored(message) = outcome {
            let offset = self.current_offset;
            self.ctx.warn(message, offset);
        }
        Ok(())
    }

    /// Classify an annotation member's type: `any`, a local enum (token
    /// member), a local alias, or a regular constant-capable type.
    fn annotation_member_kind(
        &mut self,
        spec: &TypeSpec,
        local_enums: &IndexMap<String, Vec<String>>,
        local_aliases: &IndexMap<String, DynamicType>,
    ) -> ParseResult<AnnotationMemberKind> {
        if matches!(spec, TypeSpec::Any) {
            return Ok(AnnotationMemberKind::Any);
        }
        if let TypeSpec::Scoped(name) = spec {
            if let Some(ident) = name.as_identifier() {
                if let Some(literals) = local_enums.get(ident) {
                    return Ok(AnnotationMemberKind::Token {
                        allowed: literals.clone(),
                    });
                }
                if let Some(aliased) = local_aliases.get(ident) {
                    return Ok(AnnotationMemberKind::Value(aliased.clone()));
                }
            }
            // module-level enums also behave as token members
            let resolved = self.resolve_type_spec(spec)?;
            if let TypeDetail::Enum { literals, .. } = resolved.unalias().detail() {
                return Ok(AnnotationMemberKind::Token {
                    allowed: literals.iter().map(|l| l.name.clone()).collect(),
                });
            }
            return Ok(AnnotationMemberKind::Value(resolved));
        }
        let resolved = self.resolve_type_spec(spec)?;
        Ok(AnnotationMemberKind::Value(resolved))
    }

    fn annotation_member_default(
        &mut self,
        decl: &AnnotationDecl,
        kind: &AnnotationMemberKind,
        expr: &ConstExpr,
    ) -> ParseResult<DynData> {
        match kind {
            AnnotationMemberKind::Token { allowed } => {
                let Some(name) = expr.as_scoped_name() else {
                    return Err(ParseError::annotation_param(format!(
                        "default value must be one of {allowed:?}"
                    )));
                };
                let token = name.last_segment();
                if !allowed.iter().any(|a| a == token) {
                    return Err(ParseError::annotation_param(format!(
                        "'{token}' is not one of {allowed:?}"
                    )));
                }
                Ok(DynData::String8(token.to_owned()))
            }
            AnnotationMemberKind::Value(member_type) => {
                let value = self.eval_in_annotation(expr, decl)?;
                convert_for_const(value, member_type)
            }
            AnnotationMemberKind::Any => self.eval_in_annotation(expr, decl),
        }
    }
}

/// Where a batch of annotation applications is headed.
#[derive(Clone, Copy)]
enum AnnotationTarget<'a> {
    Type,
    Member(&'a str),
    Discriminator,
}

/// Bitsets hold at most 64 bits; the running position may not pass that.
fn advance_bit_position(position: u16, width: u16, bitset: &str) -> ParseResult<u16> {
    let next = position + width;
    if next > 64 {
        return Err(ParseError::eval_range(format!("bitset '{bitset}' exceeds 64 bits")));
    }
    Ok(next)
}
