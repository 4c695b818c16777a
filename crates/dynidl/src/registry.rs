use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use strum::{Display, EnumString, IntoStaticStr};

use crate::{
    annotations::AnnotationDescriptor,
    error::{ParseError, ParseResult},
    expr::DynData,
};

/// The tag of every type representable in the registry.
///
/// Primitive kinds double as complete type descriptions; constructed kinds
/// (`Sequence`, `Structure`, ...) carry their detail in [`TypeDetail`].
/// The string representation is the canonical IDL spelling used in
/// diagnostics and in the names of anonymous collection types.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize,
)]
pub enum TypeKind {
    #[strum(serialize = "boolean")]
    Boolean,
    #[strum(serialize = "int8")]
    Int8,
    #[strum(serialize = "uint8")]
    UInt8,
    #[strum(serialize = "int16")]
    Int16,
    #[strum(serialize = "uint16")]
    UInt16,
    #[strum(serialize = "int32")]
    Int32,
    #[strum(serialize = "uint32")]
    UInt32,
    #[strum(serialize = "int64")]
    Int64,
    #[strum(serialize = "uint64")]
    UInt64,
    #[strum(serialize = "float32")]
    Float32,
    #[strum(serialize = "float64")]
    Float64,
    #[strum(serialize = "float128")]
    Float128,
    #[strum(serialize = "char8")]
    Char8,
    #[strum(serialize = "char16")]
    Char16,
    #[strum(serialize = "byte")]
    Byte,
    #[strum(serialize = "string")]
    String8,
    #[strum(serialize = "wstring")]
    String16,
    #[strum(serialize = "sequence")]
    Sequence,
    #[strum(serialize = "array")]
    Array,
    #[strum(serialize = "map")]
    Map,
    #[strum(serialize = "fixed")]
    Fixed,
    #[strum(serialize = "struct")]
    Structure,
    #[strum(serialize = "union")]
    Union,
    #[strum(serialize = "enum")]
    Enum,
    #[strum(serialize = "bitset")]
    Bitset,
    #[strum(serialize = "bitmask")]
    Bitmask,
    #[strum(serialize = "alias")]
    Alias,
    #[strum(serialize = "annotation")]
    Annotation,
}

impl TypeKind {
    /// Whether this kind is a complete type on its own, with no detail
    /// beyond the tag.
    pub fn is_primitive(self) -> bool {
        matches!(
            self,
            Self::Boolean
                | Self::Int8
                | Self::UInt8
                | Self::Int16
                | Self::UInt16
                | Self::Int32
                | Self::UInt32
                | Self::Int64
                | Self::UInt64
                | Self::Float32
                | Self::Float64
                | Self::Float128
                | Self::Char8
                | Self::Char16
                | Self::Byte
        )
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            Self::Int8
                | Self::UInt8
                | Self::Int16
                | Self::UInt16
                | Self::Int32
                | Self::UInt32
                | Self::Int64
                | Self::UInt64
        )
    }
}

/// Type extensibility, settable through `@extensibility`, `@final`,
/// `@appendable` and `@mutable`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
pub enum ExtensibilityKind {
    #[strum(serialize = "FINAL")]
    Final,
    #[default]
    #[strum(serialize = "APPENDABLE")]
    Appendable,
    #[strum(serialize = "MUTABLE")]
    Mutable,
}

/// Policy recorded by `@try_construct`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
pub enum TryConstructKind {
    #[strum(serialize = "DISCARD")]
    Discard,
    #[default]
    #[strum(serialize = "USE_DEFAULT")]
    UseDefault,
    #[strum(serialize = "TRIM")]
    Trim,
}

/// A member of a structure, union case, or annotation.
///
/// Union cases additionally carry their evaluated label values and the
/// default-case flag; both stay empty for the other aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberDescriptor {
    name: String,
    member_type: DynamicType,
    id: u32,
    default_value: Option<DynData>,
    is_key: bool,
    is_optional: bool,
    is_external: bool,
    is_must_understand: bool,
    try_construct: TryConstructKind,
    labels: SmallVec<[i64; 2]>,
    is_default_case: bool,
    annotations: Vec<AnnotationDescriptor>,
}

impl MemberDescriptor {
    pub fn new(name: impl Into<String>, member_type: DynamicType) -> Self {
        Self {
            name: name.into(),
            member_type,
            id: 0,
            default_value: None,
            is_key: false,
            is_optional: false,
            is_external: false,
            is_must_understand: false,
            try_construct: TryConstructKind::default(),
            labels: SmallVec::new(),
            is_default_case: false,
            annotations: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn member_type(&self) -> &DynamicType {
        &self.member_type
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn default_value(&self) -> Option<&DynData> {
        self.default_value.as_ref()
    }

    pub fn is_key(&self) -> bool {
        self.is_key
    }

    pub fn is_optional(&self) -> bool {
        self.is_optional
    }

    pub fn is_external(&self) -> bool {
        self.is_external
    }

    pub fn is_must_understand(&self) -> bool {
        self.is_must_understand
    }

    pub fn try_construct(&self) -> TryConstructKind {
        self.try_construct
    }

    /// The evaluated case-label values of a union member, widened to i64.
    pub fn labels(&self) -> &[i64] {
        &self.labels
    }

    pub fn is_default_case(&self) -> bool {
        self.is_default_case
    }

    pub fn annotations(&self) -> &[AnnotationDescriptor] {
        &self.annotations
    }

    pub(crate) fn set_id(&mut self, id: u32) {
        self.id = id;
    }

    pub(crate) fn set_default_value(&mut self, value: DynData) {
        self.default_value = Some(value);
    }

    pub(crate) fn set_key(&mut self, key: bool) {
        self.is_key = key;
    }

    pub(crate) fn set_optional(&mut self, optional: bool) {
        self.is_optional = optional;
    }

    pub(crate) fn set_external(&mut self) {
        self.is_external = true;
    }

    pub(crate) fn set_must_understand(&mut self, must_understand: bool) {
        self.is_must_understand = must_understand;
    }

    pub(crate) fn set_try_construct(&mut self, kind: TryConstructKind) {
        self.try_construct = kind;
    }

    pub(crate) fn set_labels(&mut self, labels: SmallVec<[i64; 2]>, is_default: bool) {
        self.labels = labels;
        self.is_default_case = is_default;
    }

    pub(crate) fn push_annotation(&mut self, descriptor: AnnotationDescriptor) {
        self.annotations.push(descriptor);
    }
}

/// A single enumeration literal with its resolved numeric value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumLiteral {
    pub name: String,
    pub value: i32,
    pub is_default: bool,
}

/// A bitfield inside a bitset. Anonymous bitfields (pure padding) have no name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitfieldDescriptor {
    pub name: Option<String>,
    pub position: u16,
    pub width: u16,
    /// Optional destination type the field is surfaced as (`bitfield<3, octet>`).
    pub holder: Option<TypeKind>,
}

/// A single-bit flag inside a bitmask.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitflagDescriptor {
    pub name: String,
    pub position: u16,
}

/// Kind-specific payload of a frozen [`DynamicType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeDetail {
    Primitive,
    String {
        bound: Option<u32>,
    },
    Sequence {
        element: Box<DynamicType>,
        bound: Option<u32>,
    },
    Array {
        element: Box<DynamicType>,
        dims: SmallVec<[u32; 2]>,
    },
    Map {
        key: Box<DynamicType>,
        value: Box<DynamicType>,
        bound: Option<u32>,
    },
    Fixed {
        digits: u16,
        scale: u16,
    },
    Structure {
        base: Option<Box<DynamicType>>,
        extensibility: ExtensibilityKind,
        members: Vec<MemberDescriptor>,
    },
    Union {
        discriminant: Box<DynamicType>,
        discriminator_is_key: bool,
        discriminator_annotations: Vec<AnnotationDescriptor>,
        extensibility: ExtensibilityKind,
        members: Vec<MemberDescriptor>,
    },
    Enum {
        literals: Vec<EnumLiteral>,
        bit_bound: Option<u16>,
    },
    Bitset {
        base: Option<Box<DynamicType>>,
        bitfields: Vec<BitfieldDescriptor>,
    },
    Bitmask {
        flags: Vec<BitflagDescriptor>,
        bit_bound: u16,
    },
    Alias {
        referent: Box<DynamicType>,
    },
    Annotation {
        members: Vec<MemberDescriptor>,
    },
}

/// An immutable, fully-built type.
///
/// Produced by [`TypeBuilder::build`] or by the factory constructors for
/// primitive and collection types. The `name` of a registered type is fully
/// qualified with its module scope (`A::B::Name`); anonymous collection
/// types use a synthesized spelling (`sequence<int32, 4>`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicType {
    name: String,
    kind: TypeKind,
    is_nested: bool,
    detail: TypeDetail,
    annotations: Vec<AnnotationDescriptor>,
}

impl DynamicType {
    /// Create a primitive type for one of the primitive kinds.
    pub fn primitive(kind: TypeKind) -> Self {
        debug_assert!(kind.is_primitive(), "not a primitive kind: {kind}");
        Self {
            name: kind.to_string(),
            kind,
            is_nested: false,
            detail: TypeDetail::Primitive,
            annotations: Vec::new(),
        }
    }

    pub fn string(bound: Option<u32>) -> Self {
        let name = match bound {
            Some(b) => format!("string<{b}>"),
            None => "string".to_owned(),
        };
        Self {
            name,
            kind: TypeKind::String8,
            is_nested: false,
            detail: TypeDetail::String { bound },
            annotations: Vec::new(),
        }
    }

    pub fn wstring(bound: Option<u32>) -> Self {
        let name = match bound {
            Some(b) => format!("wstring<{b}>"),
            None => "wstring".to_owned(),
        };
        Self {
            name,
            kind: TypeKind::String16,
            is_nested: false,
            detail: TypeDetail::String { bound },
            annotations: Vec::new(),
        }
    }

    pub fn sequence(element: DynamicType, bound: Option<u32>) -> Self {
        let name = match bound {
            Some(b) => format!("sequence<{}, {b}>", element.name),
            None => format!("sequence<{}>", element.name),
        };
        Self {
            name,
            kind: TypeKind::Sequence,
            is_nested: false,
            detail: TypeDetail::Sequence {
                element: Box::new(element),
                bound,
            },
            annotations: Vec::new(),
        }
    }

    pub fn array(element: DynamicType, dims: SmallVec<[u32; 2]>) -> Self {
        let mut name = format!("array<{}", element.name);
        for dim in &dims {
            name.push_str(&format!(", {dim}"));
        }
        name.push('>');
        Self {
            name,
            kind: TypeKind::Array,
            is_nested: false,
            detail: TypeDetail::Array {
                element: Box::new(element),
                dims,
            },
            annotations: Vec::new(),
        }
    }

    pub fn map(key: DynamicType, value: DynamicType, bound: Option<u32>) -> Self {
        let name = match bound {
            Some(b) => format!("map<{}, {}, {b}>", key.name, value.name),
            None => format!("map<{}, {}>", key.name, value.name),
        };
        Self {
            name,
            kind: TypeKind::Map,
            is_nested: false,
            detail: TypeDetail::Map {
                key: Box::new(key),
                value: Box::new(value),
                bound,
            },
            annotations: Vec::new(),
        }
    }

    pub fn fixed(digits: u16, scale: u16) -> Self {
        Self {
            name: format!("fixed<{digits}, {scale}>"),
            kind: TypeKind::Fixed,
            is_nested: false,
            detail: TypeDetail::Fixed { digits, scale },
            annotations: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn is_nested(&self) -> bool {
        self.is_nested
    }

    pub fn detail(&self) -> &TypeDetail {
        &self.detail
    }

    pub fn annotations(&self) -> &[AnnotationDescriptor] {
        &self.annotations
    }

    /// Follow alias indirections down to the first non-alias type.
    pub fn unalias(&self) -> &DynamicType {
        let mut current = self;
        while let TypeDetail::Alias { referent } = &current.detail {
            current = referent;
        }
        current
    }

    /// The struct members of a structure type, if this is one.
    pub fn members(&self) -> Option<&[MemberDescriptor]> {
        match &self.detail {
            TypeDetail::Structure { members, .. }
            | TypeDetail::Union { members, .. }
            | TypeDetail::Annotation { members } => Some(members),
            _ => None,
        }
    }
}

/// Kind-specific payload of a [`TypeBuilder`], mutated by the driver while
/// the declaration is being assembled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) enum BuilderContent {
    Structure {
        base: Option<DynamicType>,
        members: Vec<MemberDescriptor>,
    },
    Union {
        discriminant: DynamicType,
        discriminator_is_key: bool,
        discriminator_annotations: Vec<AnnotationDescriptor>,
        members: Vec<MemberDescriptor>,
    },
    Enum {
        literals: Vec<EnumLiteral>,
    },
    Bitset {
        base: Option<DynamicType>,
        bitfields: Vec<BitfieldDescriptor>,
    },
    Bitmask {
        flags: Vec<BitflagDescriptor>,
    },
    Alias {
        referent: DynamicType,
    },
    Annotation {
        members: Vec<MemberDescriptor>,
    },
}

/// A mutable, partially-built type handle.
///
/// Builders are created by the parser driver, filled member by member, then
/// registered into their module. `build()` produces the frozen
/// [`DynamicType`]; by convention a builder is not mutated after its first
/// `build()` call (the driver only ever mutates builders that are still
/// being declared).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeBuilder {
    name: String,
    kind: TypeKind,
    content: BuilderContent,
    extensibility: ExtensibilityKind,
    is_nested: bool,
    bit_bound: Option<u16>,
    annotations: Vec<AnnotationDescriptor>,
    /// Set for forward declarations; the full definition later replaces the
    /// builder wholesale.
    incomplete: bool,
}

impl TypeBuilder {
    pub(crate) fn structure(name: impl Into<String>) -> Self {
        Self::new(
            name,
            TypeKind::Structure,
            BuilderContent::Structure {
                base: None,
                members: Vec::new(),
            },
        )
    }

    pub(crate) fn union(name: impl Into<String>, discriminant: DynamicType) -> Self {
        Self::new(
            name,
            TypeKind::Union,
            BuilderContent::Union {
                discriminant,
                discriminator_is_key: false,
                discriminator_annotations: Vec::new(),
                members: Vec::new(),
            },
        )
    }

    pub(crate) fn enumeration(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Enum, BuilderContent::Enum { literals: Vec::new() })
    }

    pub(crate) fn bitset(name: impl Into<String>) -> Self {
        Self::new(
            name,
            TypeKind::Bitset,
            BuilderContent::Bitset {
                base: None,
                bitfields: Vec::new(),
            },
        )
    }

    pub(crate) fn bitmask(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Bitmask, BuilderContent::Bitmask { flags: Vec::new() })
    }

    pub(crate) fn alias(name: impl Into<String>, referent: DynamicType) -> Self {
        Self::new(name, TypeKind::Alias, BuilderContent::Alias { referent })
    }

    fn new(name: impl Into<String>, kind: TypeKind, content: BuilderContent) -> Self {
        Self {
            name: name.into(),
            kind,
            content,
            extensibility: ExtensibilityKind::default(),
            is_nested: false,
            bit_bound: None,
            annotations: Vec::new(),
            incomplete: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn extensibility(&self) -> ExtensibilityKind {
        self.extensibility
    }

    pub fn is_nested(&self) -> bool {
        self.is_nested
    }

    pub fn bit_bound(&self) -> Option<u16> {
        self.bit_bound
    }

    pub fn annotations(&self) -> &[AnnotationDescriptor] {
        &self.annotations
    }

    pub fn is_incomplete(&self) -> bool {
        self.incomplete
    }

    /// The members added so far (structures, unions).
    pub fn members(&self) -> &[MemberDescriptor] {
        match &self.content {
            BuilderContent::Structure { members, .. }
            | BuilderContent::Union { members, .. }
            | BuilderContent::Annotation { members } => members,
            _ => &[],
        }
    }

    pub fn member(&self, name: &str) -> Option<&MemberDescriptor> {
        self.members().iter().find(|m| m.name() == name)
    }

    pub fn literals(&self) -> &[EnumLiteral] {
        match &self.content {
            BuilderContent::Enum { literals } => literals,
            _ => &[],
        }
    }

    pub fn base_type(&self) -> Option<&DynamicType> {
        match &self.content {
            BuilderContent::Structure { base, .. } | BuilderContent::Bitset { base, .. } => base.as_ref(),
            _ => None,
        }
    }

    pub fn discriminant(&self) -> Option<&DynamicType> {
        match &self.content {
            BuilderContent::Union { discriminant, .. } => Some(discriminant),
            _ => None,
        }
    }

    /// Whether `@key` was applied to the union's discriminator.
    pub fn discriminator_is_key(&self) -> bool {
        matches!(
            &self.content,
            BuilderContent::Union {
                discriminator_is_key: true,
                ..
            }
        )
    }

    /// Annotation records applied to the union's discriminator.
    pub fn discriminator_annotations(&self) -> &[AnnotationDescriptor] {
        match &self.content {
            BuilderContent::Union {
                discriminator_annotations,
                ..
            } => discriminator_annotations,
            _ => &[],
        }
    }

    pub fn bitfields(&self) -> &[BitfieldDescriptor] {
        match &self.content {
            BuilderContent::Bitset { bitfields, .. } => bitfields,
            _ => &[],
        }
    }

    pub fn flags(&self) -> &[BitflagDescriptor] {
        match &self.content {
            BuilderContent::Bitmask { flags } => flags,
            _ => &[],
        }
    }

    pub fn referent(&self) -> Option<&DynamicType> {
        match &self.content {
            BuilderContent::Alias { referent } => Some(referent),
            _ => None,
        }
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn mark_incomplete(&mut self) {
        self.incomplete = true;
    }

    pub(crate) fn set_base(&mut self, base_type: DynamicType) {
        match &mut self.content {
            BuilderContent::Structure { base, .. } | BuilderContent::Bitset { base, .. } => {
                *base = Some(base_type);
            }
            _ => debug_assert!(false, "set_base on a non-inheriting builder"),
        }
    }

    pub(crate) fn set_extensibility(&mut self, kind: ExtensibilityKind) {
        self.extensibility = kind;
    }

    pub(crate) fn set_nested(&mut self, nested: bool) {
        self.is_nested = nested;
    }

    pub(crate) fn set_bit_bound(&mut self, bits: u16) {
        self.bit_bound = Some(bits);
    }

    pub(crate) fn set_discriminator_key(&mut self, key: bool) {
        if let BuilderContent::Union { discriminator_is_key, .. } = &mut self.content {
            *discriminator_is_key = key;
        }
    }

    pub(crate) fn push_discriminator_annotation(&mut self, descriptor: AnnotationDescriptor) {
        if let BuilderContent::Union {
            discriminator_annotations, ..
        } = &mut self.content
        {
            discriminator_annotations.push(descriptor);
        }
    }

    /// Append a member, rejecting duplicate member names within the type.
    pub(crate) fn add_member(&mut self, descriptor: MemberDescriptor) -> ParseResult<()> {
        let members = match &mut self.content {
            BuilderContent::Structure { members, .. }
            | BuilderContent::Union { members, .. }
            | BuilderContent::Annotation { members } => members,
            _ => {
                return Err(ParseError::unsupported(format!(
                    "cannot add a member to a {} type",
                    self.kind
                )));
            }
        };
        if members.iter().any(|m| m.name() == descriptor.name()) {
            return Err(ParseError::redefinition(format!(
                "member '{}' already exists in '{}'",
                descriptor.name(),
                self.name
            )));
        }
        members.push(descriptor);
        Ok(())
    }

    /// Append an enumeration literal, rejecting duplicate names and values.
    pub(crate) fn add_literal(&mut self, literal: EnumLiteral) -> ParseResult<()> {
        let BuilderContent::Enum { literals } = &mut self.content else {
            return Err(ParseError::unsupported(format!(
                "cannot add an enumerator to a {} type",
                self.kind
            )));
        };
        if literals.iter().any(|l| l.name == literal.name) {
            return Err(ParseError::redefinition(format!(
                "enumerator '{}' already exists in '{}'",
                literal.name, self.name
            )));
        }
        if literals.iter().any(|l| l.value == literal.value) {
            return Err(ParseError::redefinition(format!(
                "enumerator value {} already used in '{}'",
                literal.value, self.name
            )));
        }
        literals.push(literal);
        Ok(())
    }

    pub(crate) fn add_bitfield(&mut self, bitfield: BitfieldDescriptor) -> ParseResult<()> {
        let BuilderContent::Bitset { bitfields, .. } = &mut self.content else {
            return Err(ParseError::unsupported(format!(
                "cannot add a bitfield to a {} type",
                self.kind
            )));
        };
        if let Some(name) = &bitfield.name {
            if bitfields.iter().any(|b| b.name.as_deref() == Some(name)) {
                return Err(ParseError::redefinition(format!(
                    "bitfield '{name}' already exists in '{}'",
                    self.name
                )));
            }
        }
        bitfields.push(bitfield);
        Ok(())
    }

    pub(crate) fn add_flag(&mut self, flag: BitflagDescriptor) -> ParseResult<()> {
        let BuilderContent::Bitmask { flags } = &mut self.content else {
            return Err(ParseError::unsupported(format!(
                "cannot add a bit flag to a {} type",
                self.kind
            )));
        };
        if flags.iter().any(|f| f.name == flag.name) {
            return Err(ParseError::redefinition(format!(
                "bit flag '{}' already exists in '{}'",
                flag.name, self.name
            )));
        }
        if flags.iter().any(|f| f.position == flag.position) {
            return Err(ParseError::redefinition(format!(
                "bit position {} already used in '{}'",
                flag.position, self.name
            )));
        }
        flags.push(flag);
        Ok(())
    }

    pub(crate) fn apply_annotation(&mut self, descriptor: AnnotationDescriptor) {
        self.annotations.push(descriptor);
    }

    /// Attach an annotation record to an already-added member.
    pub fn apply_annotation_to_member(
        &mut self,
        member_name: &str,
        descriptor: AnnotationDescriptor,
    ) -> ParseResult<()> {
        let members = match &mut self.content {
            BuilderContent::Structure { members, .. }
            | BuilderContent::Union { members, .. }
            | BuilderContent::Annotation { members } => members,
            _ => {
                return Err(ParseError::unsupported(format!(
                    "type '{}' has no members to annotate",
                    self.name
                )));
            }
        };
        let Some(member) = members.iter_mut().find(|m| m.name() == member_name) else {
            return Err(ParseError::annotation_param(format!(
                "member '{member_name}' not found in '{}'",
                self.name
            )));
        };
        member.push_annotation(descriptor);
        Ok(())
    }

    /// Freeze the builder into an immutable [`DynamicType`].
    pub fn build(&self) -> DynamicType {
        let detail = match &self.content {
            BuilderContent::Structure { base, members } => TypeDetail::Structure {
                base: base.clone().map(Box::new),
                extensibility: self.extensibility,
                members: members.clone(),
            },
            BuilderContent::Union {
                discriminant,
                discriminator_is_key,
                discriminator_annotations,
                members,
            } => TypeDetail::Union {
                discriminant: Box::new(discriminant.clone()),
                discriminator_is_key: *discriminator_is_key,
                discriminator_annotations: discriminator_annotations.clone(),
                extensibility: self.extensibility,
                members: members.clone(),
            },
            BuilderContent::Enum { literals } => TypeDetail::Enum {
                literals: literals.clone(),
                bit_bound: self.bit_bound,
            },
            BuilderContent::Bitset { base, bitfields } => TypeDetail::Bitset {
                base: base.clone().map(Box::new),
                bitfields: bitfields.clone(),
            },
            BuilderContent::Bitmask { flags } => TypeDetail::Bitmask {
                flags: flags.clone(),
                bit_bound: self.bit_bound.unwrap_or(32),
            },
            BuilderContent::Alias { referent } => TypeDetail::Alias {
                referent: Box::new(referent.clone()),
            },
            BuilderContent::Annotation { members } => TypeDetail::Annotation {
                members: members.clone(),
            },
        };
        DynamicType {
            name: self.name.clone(),
            kind: self.kind,
            is_nested: self.is_nested,
            detail,
            annotations: self.annotations.clone(),
        }
    }
}
