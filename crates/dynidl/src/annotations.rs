//! The annotation engine.
//!
//! Two populations of annotation declarations coexist: the builtins, seeded
//! into the root module when the tree is created, and user declarations
//! from `@annotation Name { ... }` bodies. Applications (`@name(args)`)
//! are resolved against the declaration — shorthand vs. keyword parameters,
//! defaults, unknown-member and collision checks — and either mutate the
//! descriptor under construction (builtins whose effect is a descriptor
//! field) or attach a generic [`AnnotationDescriptor`] record.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    error::{ParseError, ParseResult},
    expr::DynData,
    registry::{
        DynamicType, ExtensibilityKind, MemberDescriptor, TryConstructKind, TypeBuilder, TypeKind,
    },
};

/// A resolved annotation application attached to a type or member.
///
/// Values are keyed by the annotation's member names, in declaration order,
/// with defaults already filled in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationDescriptor {
    name: String,
    values: IndexMap<String, DynData>,
}

impl AnnotationDescriptor {
    pub(crate) fn new(name: impl Into<String>, values: IndexMap<String, DynData>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self, member: &str) -> Option<&DynData> {
        self.values.get(member)
    }

    pub fn values(&self) -> impl Iterator<Item = (&str, &DynData)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// How one annotation member interprets its argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) enum AnnotationMemberKind {
    /// A typed value, evaluated and range-checked against the member type.
    Value(DynamicType),
    /// An enumerated token matched against the allowed spellings
    /// (`@extensibility(MUTABLE)`, user annotation members of local enum
    /// type). Stored as a string value.
    Token { allowed: Vec<String> },
    /// `any`: the evaluated value is stored as-is.
    Any,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct AnnotationMember {
    pub name: String,
    pub kind: AnnotationMemberKind,
    pub default: Option<DynData>,
}

/// A declared annotation: its name, its ordered members, and any constants
/// declared in its body (enum literals included), visible only when
/// resolving this annotation's parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationDecl {
    name: String,
    members: Vec<AnnotationMember>,
    local_constants: IndexMap<String, DynData>,
    builtin: bool,
}

impl AnnotationDecl {
    pub(crate) fn user(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            local_constants: IndexMap::new(),
            builtin: false,
        }
    }

    fn builtin(name: &str, members: Vec<AnnotationMember>) -> Self {
        Self {
            name: name.to_owned(),
            members,
            local_constants: IndexMap::new(),
            builtin: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_builtin(&self) -> bool {
        self.builtin
    }

    pub(crate) fn members(&self) -> &[AnnotationMember] {
        &self.members
    }

    pub(crate) fn add_member(&mut self, member: AnnotationMember) -> ParseResult<()> {
        if self.members.iter().any(|m| m.name == member.name) {
            return Err(ParseError::redefinition(format!(
                "member '{}' already exists in annotation '{}'",
                member.name, self.name
            )));
        }
        self.members.push(member);
        Ok(())
    }

    pub(crate) fn add_local_constant(&mut self, name: &str, value: DynData) -> ParseResult<()> {
        if self.local_constants.contains_key(name) {
            return Err(ParseError::redefinition(format!(
                "'{name}' is already declared inside annotation '{}'",
                self.name
            )));
        }
        self.local_constants.insert(name.to_owned(), value);
        Ok(())
    }

    pub(crate) fn local_constant(&self, name: &str) -> Option<&DynData> {
        self.local_constants.get(name)
    }
}

fn value_member(name: &str, kind: TypeKind, default: Option<DynData>) -> AnnotationMember {
    AnnotationMember {
        name: name.to_owned(),
        kind: AnnotationMemberKind::Value(DynamicType::primitive(kind)),
        default,
    }
}

fn token_member(name: &str, allowed: &[&str], default: Option<&str>) -> AnnotationMember {
    AnnotationMember {
        name: name.to_owned(),
        kind: AnnotationMemberKind::Token {
            allowed: allowed.iter().map(|s| (*s).to_owned()).collect(),
        },
        default: default.map(|d| DynData::String8(d.to_owned())),
    }
}

fn any_member(name: &str) -> AnnotationMember {
    AnnotationMember {
        name: name.to_owned(),
        kind: AnnotationMemberKind::Any,
        default: None,
    }
}

/// The builtin annotations present in every parse context. They are seeded
/// into the root module on creation and can never be replaced.
pub(crate) fn builtin_annotations() -> Vec<AnnotationDecl> {
    vec![
        AnnotationDecl::builtin("id", vec![value_member("value", TypeKind::UInt32, None)]),
        AnnotationDecl::builtin(
            "optional",
            vec![value_member("value", TypeKind::Boolean, Some(DynData::Boolean(true)))],
        ),
        AnnotationDecl::builtin("position", vec![value_member("value", TypeKind::UInt16, None)]),
        AnnotationDecl::builtin(
            "extensibility",
            vec![token_member("value", &["FINAL", "APPENDABLE", "MUTABLE"], None)],
        ),
        AnnotationDecl::builtin("final", Vec::new()),
        AnnotationDecl::builtin("appendable", Vec::new()),
        AnnotationDecl::builtin("mutable", Vec::new()),
        AnnotationDecl::builtin(
            "key",
            vec![value_member("value", TypeKind::Boolean, Some(DynData::Boolean(true)))],
        ),
        AnnotationDecl::builtin("default_literal", Vec::new()),
        AnnotationDecl::builtin("default", vec![any_member("value")]),
        AnnotationDecl::builtin("bit_bound", vec![value_member("value", TypeKind::UInt16, None)]),
        AnnotationDecl::builtin("external", Vec::new()),
        AnnotationDecl::builtin(
            "nested",
            vec![value_member("value", TypeKind::Boolean, Some(DynData::Boolean(true)))],
        ),
        AnnotationDecl::builtin(
            "try_construct",
            vec![token_member(
                "value",
                &["DISCARD", "USE_DEFAULT", "TRIM"],
                Some("USE_DEFAULT"),
            )],
        ),
        AnnotationDecl::builtin("value", vec![any_member("value")]),
        AnnotationDecl::builtin(
            "must_understand",
            vec![value_member("value", TypeKind::Boolean, Some(DynData::Boolean(true)))],
        ),
    ]
}

/// Resolve the arguments of one application against the declared
/// annotation.
///
/// 1. If the annotation takes exactly one member and the input is a single
///    bare expression, that expression is assigned to it.
/// 2. Otherwise inputs are keyword-only: each must name an existing member,
///    and duplicates fail.
/// 3. Missing inputs are filled from member defaults; a missing required
///    member fails.
///
/// `eval` is supplied by the driver and evaluates a constant expression in
/// the scope of the application (module constants plus this annotation's
/// local constants).
pub(crate) fn resolve_parameters(
    decl: &AnnotationDecl,
    params: &[crate::ast::ApplParam],
    eval: &mut dyn FnMut(&crate::ast::ConstExpr) -> ParseResult<DynData>,
) -> ParseResult<IndexMap<String, DynData>> {
    let mut resolved: IndexMap<String, DynData> = IndexMap::new();

    let shorthand = params.len() == 1 && params[0].name.is_none();
    if shorthand {
        if decl.members.len() != 1 {
            return Err(ParseError::annotation_param(format!(
                "annotation '@{}' takes {} members; a bare parameter needs exactly one",
                decl.name,
                decl.members.len()
            )));
        }
        let member = &decl.members[0];
        let value = member_value(decl, member, &params[0].value, eval)?;
        resolved.insert(member.name.clone(), value);
    } else {
        for param in params {
            let Some(param_name) = &param.name else {
                return Err(ParseError::annotation_param(format!(
                    "annotation '@{}' requires keyword parameters (name = value)",
                    decl.name
                )));
            };
            let Some(member) = decl.members.iter().find(|m| &m.name == param_name) else {
                return Err(ParseError::annotation_param(format!(
                    "annotation '@{}' has no member named '{param_name}'",
                    decl.name
                )));
            };
            if resolved.contains_key(param_name) {
                return Err(ParseError::annotation_param(format!(
                    "parameter '{param_name}' of annotation '@{}' is specified multiple times",
                    decl.name
                )));
            }
            let value = member_value(decl, member, &param.value, eval)?;
            resolved.insert(param_name.clone(), value);
        }
    }

    // fill in defaults, in member declaration order
    let mut ordered: IndexMap<String, DynData> = IndexMap::new();
    for member in &decl.members {
        if let Some(value) = resolved.shift_remove(&member.name) {
            ordered.insert(member.name.clone(), value);
        } else if let Some(default) = &member.default {
            ordered.insert(member.name.clone(), default.clone());
        } else {
            return Err(ParseError::annotation_param(format!(
                "missing required parameter '{}' of annotation '@{}'",
                member.name, decl.name
            )));
        }
    }
    Ok(ordered)
}

fn member_value(
    decl: &AnnotationDecl,
    member: &AnnotationMember,
    expr: &crate::ast::ConstExpr,
    eval: &mut dyn FnMut(&crate::ast::ConstExpr) -> ParseResult<DynData>,
) -> ParseResult<DynData> {
    match &member.kind {
        AnnotationMemberKind::Token { allowed } => {
            let Some(name) = expr.as_scoped_name() else {
                return Err(ParseError::annotation_param(format!(
                    "parameter '{}' of annotation '@{}' expects one of {allowed:?}",
                    member.name, decl.name
                )));
            };
            let token = name.last_segment();
            if !allowed.iter().any(|a| a == token) {
                return Err(ParseError::annotation_param(format!(
                    "'{token}' is not a valid value for parameter '{}' of annotation '@{}' (expected one of {allowed:?})",
                    member.name, decl.name
                )));
            }
            Ok(DynData::String8(token.to_owned()))
        }
        AnnotationMemberKind::Value(member_type) => {
            let value = eval(expr)?;
            crate::expr::convert_for_const(value, member_type)
        }
        AnnotationMemberKind::Any => eval(expr),
    }
}

/// One staged application: the declared annotation's name, its resolved
/// member values, and whether it is a builtin.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PendingAnnotation {
    pub name: String,
    pub values: IndexMap<String, DynData>,
    pub builtin: bool,
}

impl PendingAnnotation {
    pub fn descriptor(&self) -> AnnotationDescriptor {
        AnnotationDescriptor::new(self.name.clone(), self.values.clone())
    }

    fn single_value(&self) -> ParseResult<&DynData> {
        self.values.get("value").ok_or_else(|| {
            ParseError::annotation_param(format!("annotation '@{}' is missing its value", self.name))
        })
    }

    pub fn bool_value(&self) -> ParseResult<bool> {
        match self.single_value()? {
            DynData::Boolean(v) => Ok(*v),
            other => Err(ParseError::annotation_param(format!(
                "annotation '@{}' expects a boolean, got {}",
                self.name,
                other.kind()
            ))),
        }
    }

    pub fn u64_value(&self) -> ParseResult<u64> {
        self.single_value()?.as_u64().ok_or_else(|| {
            ParseError::annotation_param(format!("annotation '@{}' expects an unsigned integer", self.name))
        })
    }

    pub fn token_value(&self) -> ParseResult<&str> {
        match self.single_value()? {
            DynData::String8(v) => Ok(v),
            other => Err(ParseError::annotation_param(format!(
                "annotation '@{}' expects an enumerated token, got {}",
                self.name,
                other.kind()
            ))),
        }
    }

    pub fn data_value(&self) -> ParseResult<&DynData> {
        self.single_value()
    }
}

/// The parser-scoped staging area for `@...` applications seen before their
/// target declaration is complete. Three slots: type-level, member-level
/// (keyed by the member name, filled when the declarator is parsed), and
/// discriminator-level. Entries are drained by the next matching
/// declaration and the queue is cleared between declarations.
#[derive(Debug, Default)]
pub(crate) struct PendingAnnotations {
    type_level: Vec<PendingAnnotation>,
    member_level: IndexMap<String, Vec<PendingAnnotation>>,
    discriminator_level: Vec<PendingAnnotation>,
}

impl PendingAnnotations {
    pub fn push_type(&mut self, pending: PendingAnnotation) {
        self.type_level.push(pending);
    }

    pub fn push_member(&mut self, member: &str, pending: PendingAnnotation) {
        self.member_level.entry(member.to_owned()).or_default().push(pending);
    }

    pub fn push_discriminator(&mut self, pending: PendingAnnotation) {
        self.discriminator_level.push(pending);
    }

    pub fn take_type(&mut self) -> Vec<PendingAnnotation> {
        std::mem::take(&mut self.type_level)
    }

    pub fn take_member(&mut self, member: &str) -> Vec<PendingAnnotation> {
        self.member_level.shift_remove(member).unwrap_or_default()
    }

    pub fn take_discriminator(&mut self) -> Vec<PendingAnnotation> {
        std::mem::take(&mut self.discriminator_level)
    }

    pub fn clear(&mut self) {
        self.type_level.clear();
        self.member_level.clear();
        self.discriminator_level.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.type_level.is_empty() && self.member_level.is_empty() && self.discriminator_level.is_empty()
    }
}

/// Apply a builtin annotation's effect to a type builder.
///
/// Returns `true` when the annotation was a builtin with a type-level
/// descriptor effect; `false` means the caller should attach the
/// application as a generic annotation record instead.
pub(crate) fn apply_builtin_to_type(builder: &mut TypeBuilder, pending: &PendingAnnotation) -> ParseResult<bool> {
    if !pending.builtin {
        return Ok(false);
    }
    match pending.name.as_str() {
        "extensibility" => {
            let token = pending.token_value()?;
            let kind: ExtensibilityKind = token.parse().map_err(|_| {
                ParseError::annotation_param(format!("'{token}' is not an extensibility kind"))
            })?;
            builder.set_extensibility(kind);
        }
        "final" => builder.set_extensibility(ExtensibilityKind::Final),
        "appendable" => builder.set_extensibility(ExtensibilityKind::Appendable),
        "mutable" => builder.set_extensibility(ExtensibilityKind::Mutable),
        "nested" => builder.set_nested(pending.bool_value()?),
        "bit_bound" => {
            let bits = pending.u64_value()?;
            if !(1..=64).contains(&bits) {
                return Err(ParseError::annotation_param(format!(
                    "@bit_bound({bits}) is outside the 1..64 range"
                )));
            }
            // bitset fields carry their own widths; only enums and
            // bitmasks have a storage width to set
            if !matches!(builder.kind(), TypeKind::Enum | TypeKind::Bitmask) {
                return Err(ParseError::annotation_param(format!(
                    "@bit_bound does not apply to a {} type",
                    builder.kind()
                )));
            }
            builder.set_bit_bound(bits as u16);
        }
        // builtins without a type-level descriptor effect are attached as
        // generic records (e.g. @try_construct on a type)
        "try_construct" => return Ok(false),
        "id" | "optional" | "position" | "key" | "default_literal" | "default" | "external" | "value"
        | "must_understand" => {
            return Err(ParseError::annotation_param(format!(
                "annotation '@{}' does not apply to a type declaration",
                pending.name
            )));
        }
        _ => return Ok(false),
    }
    Ok(true)
}

/// Apply a builtin annotation's effect to a member descriptor.
///
/// Same contract as [`apply_builtin_to_type`]: `false` means "attach a
/// generic record".
pub(crate) fn apply_builtin_to_member(
    member: &mut MemberDescriptor,
    pending: &PendingAnnotation,
) -> ParseResult<bool> {
    if !pending.builtin {
        return Ok(false);
    }
    match pending.name.as_str() {
        "id" => {
            let id = pending.u64_value()?;
            let id = u32::try_from(id)
                .map_err(|_| ParseError::annotation_param(format!("@id({id}) does not fit in uint32")))?;
            member.set_id(id);
        }
        "key" => member.set_key(pending.bool_value()?),
        "optional" => member.set_optional(pending.bool_value()?),
        "external" => member.set_external(),
        "must_understand" => member.set_must_understand(pending.bool_value()?),
        "default" => member.set_default_value(pending.data_value()?.clone()),
        "try_construct" => {
            let token = pending.token_value()?;
            let kind: TryConstructKind = token.parse().map_err(|_| {
                ParseError::annotation_param(format!("'{token}' is not a try-construct kind"))
            })?;
            member.set_try_construct(kind);
        }
        "extensibility" | "final" | "appendable" | "mutable" | "nested" | "bit_bound" | "position"
        | "default_literal" | "value" => {
            return Err(ParseError::annotation_param(format!(
                "annotation '@{}' does not apply to an aggregate member",
                pending.name
            )));
        }
        _ => return Ok(false),
    }
    Ok(true)
}
