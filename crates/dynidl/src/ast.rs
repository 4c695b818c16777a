//! Typed parse results.
//!
//! The grammar reduces matched text into these small values; the parser
//! driver consumes them one top-level definition at a time and performs all
//! semantic work (evaluation, resolution, registration). Nothing in here
//! touches the registry.

use std::fmt;

use smallvec::SmallVec;

use crate::registry::TypeKind;

/// A possibly-qualified name (`A::B::C`), absolute when written with a
/// leading `::`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct ScopedName {
    pub absolute: bool,
    pub segments: SmallVec<[String; 2]>,
}

impl ScopedName {
    pub fn plain(name: impl Into<String>) -> Self {
        let mut segments = SmallVec::new();
        segments.push(name.into());
        Self {
            absolute: false,
            segments,
        }
    }

    /// The bare identifier when the name has a single, relative segment.
    pub fn as_identifier(&self) -> Option<&str> {
        if !self.absolute && self.segments.len() == 1 {
            Some(&self.segments[0])
        } else {
            None
        }
    }

    pub fn last_segment(&self) -> &str {
        self.segments.last().expect("scoped name has at least one segment")
    }
}

impl fmt::Display for ScopedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.absolute {
            f.write_str("::")?;
        }
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("::")?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

/// A literal token, already unescaped and numerically decoded.
///
/// Integer literals are always non-negative here: a leading `-` belongs to
/// the unary-minus expression that wraps the literal.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Literal {
    Bool(bool),
    /// Decimal, octal or hex integer, accumulated as u64.
    UInt(u64),
    /// Float literal, accumulated as the float128 evaluation kind.
    Float(f64),
    /// Fixed-point literal (`1.5d`); evaluated as float128, see `DynData`.
    Fixed(f64),
    Char(char),
    WChar(char),
    String(String),
    WString(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnaryOp {
    /// `-`, two's-complement negate for uint64 operands.
    Minus,
    /// `+`, identity.
    Plus,
    /// `~`, bitwise for uint64, logical for bool.
    Invert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Or,
    Xor,
    And,
    Shl,
    Shr,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Or => "|",
            Self::Xor => "^",
            Self::And => "&",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
        };
        f.write_str(symbol)
    }
}

/// A constant expression tree. Evaluation order is post-order, matching the
/// depth-first firing order of the grammar's operator rules.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ConstExpr {
    Literal(Literal),
    Scoped(ScopedName),
    Unary(UnaryOp, Box<ConstExpr>),
    Binary(BinaryOp, Box<ConstExpr>, Box<ConstExpr>),
}

impl ConstExpr {
    /// The scoped name when the whole expression is one bare name.
    ///
    /// Annotation parameters use this to accept enumerator tokens
    /// (`@extensibility(MUTABLE)`) that are not module constants.
    pub fn as_scoped_name(&self) -> Option<&ScopedName> {
        match self {
            Self::Scoped(name) => Some(name),
            _ => None,
        }
    }
}

/// A type mention, not yet resolved against the registry.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TypeSpec {
    Primitive(TypeKind),
    /// `char` before applying the context's `char_translation` option.
    Char,
    /// `wchar` before applying the context's `wchar_type` option.
    WChar,
    String {
        bound: Option<ConstExpr>,
    },
    WString {
        bound: Option<ConstExpr>,
    },
    Sequence {
        element: Box<TypeSpec>,
        bound: Option<ConstExpr>,
    },
    Map {
        key: Box<TypeSpec>,
        value: Box<TypeSpec>,
        bound: Option<ConstExpr>,
    },
    Fixed {
        digits: ConstExpr,
        scale: ConstExpr,
    },
    /// A previously-declared type, found by scoped-name lookup.
    Scoped(ScopedName),
    /// `any`, valid only for annotation members.
    Any,
}

/// One declarator of a member or typedef: a name plus optional fixed-array
/// dimensions (`matrix[3][4]`).
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Declarator {
    pub name: String,
    pub array_dims: Vec<ConstExpr>,
}

/// `@name(...)` as applied before a declaration or member.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AnnotationAppl {
    pub name: ScopedName,
    pub params: Vec<ApplParam>,
}

/// A single annotation argument: positional (`@id(7)`) or keyword
/// (`@annotation_name(member = 7)`).
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ApplParam {
    pub name: Option<String>,
    pub value: ConstExpr,
}

/// A struct member line: `@key long a, b[4];`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Member {
    pub annotations: Vec<AnnotationAppl>,
    pub type_spec: TypeSpec,
    pub declarators: Vec<Declarator>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StructDef {
    pub name: String,
    pub base: Option<ScopedName>,
    pub members: Vec<Member>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CaseLabel {
    Value(ConstExpr),
    Default,
}

/// One `case ...:`/`default:` group with its element member.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SwitchCase {
    pub labels: Vec<CaseLabel>,
    pub annotations: Vec<AnnotationAppl>,
    pub type_spec: TypeSpec,
    pub declarator: Declarator,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct UnionDef {
    pub name: String,
    pub discriminator_annotations: Vec<AnnotationAppl>,
    pub discriminant: TypeSpec,
    pub cases: Vec<SwitchCase>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Enumerator {
    pub annotations: Vec<AnnotationAppl>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EnumDef {
    pub name: String,
    pub enumerators: Vec<Enumerator>,
}

/// A bitfield line inside a bitset; `names` may be empty (padding) or hold
/// several flags sharing one spec.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Bitfield {
    pub annotations: Vec<AnnotationAppl>,
    pub width: ConstExpr,
    pub holder: Option<TypeSpec>,
    pub names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BitsetDef {
    pub name: String,
    pub base: Option<ScopedName>,
    pub bitfields: Vec<Bitfield>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BitValue {
    pub annotations: Vec<AnnotationAppl>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BitmaskDef {
    pub name: String,
    pub values: Vec<BitValue>,
}

/// The referent side of a `typedef`. IDL allows constructing a type inline
/// (`typedef enum Color { RED } ColorAlias;`), in which case the constructed
/// type is registered first and the alias points at it.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TypedefBase {
    Spec(TypeSpec),
    Struct(StructDef),
    Union(UnionDef),
    Enum(EnumDef),
    Bitset(BitsetDef),
    Bitmask(BitmaskDef),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TypedefDcl {
    pub base: TypedefBase,
    pub declarators: Vec<Declarator>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ConstDcl {
    pub const_type: TypeSpec,
    pub name: String,
    pub expr: ConstExpr,
}

/// An item inside an `@annotation` body.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum AnnotationBodyItem {
    Member {
        type_spec: TypeSpec,
        name: String,
        default: Option<ConstExpr>,
    },
    Enum(EnumDef),
    Const(ConstDcl),
    Typedef(TypedefDcl),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AnnotationDef {
    pub name: String,
    pub body: Vec<AnnotationBodyItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ModuleDcl {
    pub name: String,
    pub definitions: Vec<Definition>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DefinitionBody {
    Module(ModuleDcl),
    Const(ConstDcl),
    Struct(StructDef),
    StructForward(String),
    Union(UnionDef),
    UnionForward(String),
    Enum(EnumDef),
    Typedef(TypedefDcl),
    Native(String),
    Bitset(BitsetDef),
    Bitmask(BitmaskDef),
    Annotation(AnnotationDef),
    /// A `#...` line, consumed and handled (or warned about) by the driver.
    Directive(String),
}

/// One definition, with the annotation applications that preceded it and the
/// byte offset at which it started (for error reporting).
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Definition {
    pub annotations: Vec<AnnotationAppl>,
    pub body: DefinitionBody,
    pub offset: usize,
}
