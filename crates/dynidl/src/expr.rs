//! Constant values and the compile-time expression evaluator.
//!
//! Operands live on an explicit stack of [`DynData`]. Evaluation walks the
//! expression tree post-order — the same order in which the grammar's
//! literal and operator rules match — pushing a value for every literal or
//! resolved scoped name and popping/combining for every operator.
//!
//! Binary operators promote both operands to a common evaluation kind
//! (`bool` < `uint64` < `float128`); the operator-to-kind matrix decides
//! which promoted kinds are legal for each operator.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    ast::{BinaryOp, ConstExpr, Literal, ScopedName, UnaryOp},
    error::{ParseError, ParseResult},
    registry::{DynamicType, TypeDetail, TypeKind},
};

/// A typed constant value.
///
/// Mid-evaluation only the three promotion kinds appear (`Boolean`,
/// `UInt64`, `Float128`) plus the character/string kinds pushed by their
/// literals. The concrete narrower kinds appear once a finished constant has
/// been converted to its declared type and stored in a module.
///
/// `Float128` is stored as `f64`: the language level guarantees of IDL
/// `long double` exceed what the platform ABI provides, and the original
/// implementation performs all evaluation in the host's long-double type
/// anyway. Fixed-point literals also evaluate into `Float128`; the
/// digits/scale of the literal are not preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DynData {
    Boolean(bool),
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    Float128(f64),
    Char8(char),
    Char16(char),
    Byte(u8),
    String8(String),
    String16(String),
}

impl DynData {
    pub fn kind(&self) -> TypeKind {
        match self {
            Self::Boolean(_) => TypeKind::Boolean,
            Self::Int8(_) => TypeKind::Int8,
            Self::UInt8(_) => TypeKind::UInt8,
            Self::Int16(_) => TypeKind::Int16,
            Self::UInt16(_) => TypeKind::UInt16,
            Self::Int32(_) => TypeKind::Int32,
            Self::UInt32(_) => TypeKind::UInt32,
            Self::Int64(_) => TypeKind::Int64,
            Self::UInt64(_) => TypeKind::UInt64,
            Self::Float32(_) => TypeKind::Float32,
            Self::Float64(_) => TypeKind::Float64,
            Self::Float128(_) => TypeKind::Float128,
            Self::Char8(_) => TypeKind::Char8,
            Self::Char16(_) => TypeKind::Char16,
            Self::Byte(_) => TypeKind::Byte,
            Self::String8(_) => TypeKind::String8,
            Self::String16(_) => TypeKind::String16,
        }
    }

    /// The value as u64 when it holds any unsigned integer kind.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::UInt8(v) | Self::Byte(v) => Some(u64::from(*v)),
            Self::UInt16(v) => Some(u64::from(*v)),
            Self::UInt32(v) => Some(u64::from(*v)),
            Self::UInt64(v) => Some(*v),
            _ => None,
        }
    }

    /// The value as i64 when it holds any integer kind (sign-extended).
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int8(v) => Some(i64::from(*v)),
            Self::Int16(v) => Some(i64::from(*v)),
            Self::Int32(v) => Some(i64::from(*v)),
            Self::Int64(v) => Some(*v),
            Self::UInt8(v) | Self::Byte(v) => Some(i64::from(*v)),
            Self::UInt16(v) => Some(i64::from(*v)),
            Self::UInt32(v) => Some(i64::from(*v)),
            Self::UInt64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float32(v) => Some(f64::from(*v)),
            Self::Float64(v) | Self::Float128(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String8(v) | Self::String16(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for DynData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Int8(v) => write!(f, "{v}"),
            Self::UInt8(v) | Self::Byte(v) => write!(f, "{v}"),
            Self::Int16(v) => write!(f, "{v}"),
            Self::UInt16(v) => write!(f, "{v}"),
            Self::Int32(v) => write!(f, "{v}"),
            Self::UInt32(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::UInt64(v) => write!(f, "{v}"),
            Self::Float32(v) => write!(f, "{v}"),
            Self::Float64(v) | Self::Float128(v) => write!(f, "{v}"),
            Self::Char8(v) | Self::Char16(v) => write!(f, "'{v}'"),
            Self::String8(v) | Self::String16(v) => write!(f, "\"{v}\""),
        }
    }
}

/// Where scoped names inside constant expressions are looked up.
///
/// The module tree implements this for module constants; the annotation
/// engine implements it for annotation-local constants and enumerators.
pub(crate) trait ConstantScope {
    fn lookup_constant(&self, name: &ScopedName) -> Option<DynData>;
}

/// An operand promoted to one of the three evaluation kinds.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Promoted {
    Bool(bool),
    UInt(u64),
    Float(f64),
}

impl Promoted {
    /// Promotion priority: `bool` < `uint64` < `float128`.
    fn priority(self) -> u8 {
        match self {
            Self::Bool(_) => 0,
            Self::UInt(_) => 1,
            Self::Float(_) => 2,
        }
    }

    fn as_u64(self) -> u64 {
        match self {
            Self::Bool(b) => u64::from(b),
            Self::UInt(v) => v,
            Self::Float(v) => v as u64,
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Self::Bool(b) => f64::from(u8::from(b)),
            Self::UInt(v) => v as f64,
            Self::Float(v) => v,
        }
    }
}

/// Promote a stored constant to an evaluation operand.
///
/// Signed integers are widened through i64 so their two's-complement bit
/// pattern is preserved in the uint64 evaluation domain (`-1` becomes
/// `u64::MAX`, and `-1 + 1` wraps back to `0`). Characters participate as
/// their code points. Strings never take part in arithmetic.
fn promote(value: &DynData) -> ParseResult<Promoted> {
    let promoted = match value {
        DynData::Boolean(v) => Promoted::Bool(*v),
        DynData::Int8(v) => Promoted::UInt(i64::from(*v) as u64),
        DynData::Int16(v) => Promoted::UInt(i64::from(*v) as u64),
        DynData::Int32(v) => Promoted::UInt(i64::from(*v) as u64),
        DynData::Int64(v) => Promoted::UInt(*v as u64),
        DynData::UInt8(v) | DynData::Byte(v) => Promoted::UInt(u64::from(*v)),
        DynData::UInt16(v) => Promoted::UInt(u64::from(*v)),
        DynData::UInt32(v) => Promoted::UInt(u64::from(*v)),
        DynData::UInt64(v) => Promoted::UInt(*v),
        DynData::Float32(v) => Promoted::Float(f64::from(*v)),
        DynData::Float64(v) | DynData::Float128(v) => Promoted::Float(*v),
        DynData::Char8(v) | DynData::Char16(v) => Promoted::UInt(u64::from(u32::from(*v))),
        DynData::String8(_) | DynData::String16(_) => {
            return Err(ParseError::eval_type("string constant used as a numeric operand"));
        }
    };
    Ok(promoted)
}

/// The operand stack plus the reduction rules of the constant-expression
/// evaluator.
#[derive(Debug, Default)]
pub(crate) struct Evaluator {
    stack: Vec<DynData>,
}

impl Evaluator {
    /// Reduce an expression to a single value.
    ///
    /// The stack returns to its previous depth on success, so the driver's
    /// invariant — an empty operand stack between top-level definitions —
    /// holds as long as every evaluation goes through here.
    pub fn evaluate(&mut self, expr: &ConstExpr, scope: &dyn ConstantScope) -> ParseResult<DynData> {
        let depth = self.stack.len();
        match self.reduce(expr, scope) {
            Ok(()) => Ok(self.stack.pop().expect("reduce pushed a result")),
            Err(err) => {
                self.stack.truncate(depth);
                Err(err)
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.stack.clear();
    }

    fn reduce(&mut self, expr: &ConstExpr, scope: &dyn ConstantScope) -> ParseResult<()> {
        match expr {
            ConstExpr::Literal(literal) => {
                self.stack.push(literal_value(literal));
                Ok(())
            }
            ConstExpr::Scoped(name) => {
                let Some(value) = scope.lookup_constant(name) else {
                    return Err(ParseError::resolve(format!(
                        "'{name}' does not name a constant in this scope"
                    )));
                };
                self.stack.push(value);
                Ok(())
            }
            ConstExpr::Unary(op, inner) => {
                self.reduce(inner, scope)?;
                self.apply_unary(*op)
            }
            ConstExpr::Binary(op, lhs, rhs) => {
                self.reduce(lhs, scope)?;
                self.reduce(rhs, scope)?;
                self.apply_binary(*op)
            }
        }
    }

    fn apply_unary(&mut self, op: UnaryOp) -> ParseResult<()> {
        if op == UnaryOp::Plus {
            // identity
            return Ok(());
        }
        let operand = self.stack.pop().expect("unary operator has an operand");
        let result = match (op, promote(&operand)?) {
            (UnaryOp::Minus, Promoted::UInt(v)) => DynData::UInt64(v.wrapping_neg()),
            (UnaryOp::Minus, Promoted::Float(v)) => DynData::Float128(-v),
            (UnaryOp::Invert, Promoted::UInt(v)) => DynData::UInt64(!v),
            (UnaryOp::Invert, Promoted::Bool(v)) => DynData::Boolean(!v),
            _ => {
                return Err(ParseError::eval_type(format!(
                    "invalid operand kind {} for unary operator",
                    operand.kind()
                )));
            }
        };
        self.stack.push(result);
        Ok(())
    }

    fn apply_binary(&mut self, op: BinaryOp) -> ParseResult<()> {
        let rhs = self.stack.pop().expect("binary operator has a right operand");
        let lhs = self.stack.pop().expect("binary operator has a left operand");
        let a = promote(&lhs)?;
        let b = promote(&rhs)?;

        let result = match op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
                if matches!(a, Promoted::Bool(_)) || matches!(b, Promoted::Bool(_)) {
                    return Err(ParseError::eval_type(format!("boolean operand for operator '{op}'")));
                }
                if a.priority().max(b.priority()) == 2 {
                    let (x, y) = (a.as_f64(), b.as_f64());
                    let value = match op {
                        BinaryOp::Add => x + y,
                        BinaryOp::Sub => x - y,
                        BinaryOp::Mul => x * y,
                        BinaryOp::Div => x / y,
                        _ => unreachable!(),
                    };
                    DynData::Float128(value)
                } else {
                    let (x, y) = (a.as_u64(), b.as_u64());
                    let value = match op {
                        BinaryOp::Add => x.wrapping_add(y),
                        BinaryOp::Sub => x.wrapping_sub(y),
                        BinaryOp::Mul => x.wrapping_mul(y),
                        BinaryOp::Div => {
                            if y == 0 {
                                return Err(ParseError::eval_range("integer division by zero"));
                            }
                            x / y
                        }
                        _ => unreachable!(),
                    };
                    DynData::UInt64(value)
                }
            }
            BinaryOp::Mod | BinaryOp::Shl | BinaryOp::Shr => {
                let (Promoted::UInt(x), Promoted::UInt(y)) = (a, b) else {
                    return Err(ParseError::eval_type(format!(
                        "operator '{op}' requires integer operands, got {} and {}",
                        lhs.kind(),
                        rhs.kind()
                    )));
                };
                let value = match op {
                    BinaryOp::Mod => {
                        if y == 0 {
                            return Err(ParseError::eval_range("modulo by zero"));
                        }
                        x % y
                    }
                    BinaryOp::Shl => x.wrapping_shl(y as u32),
                    BinaryOp::Shr => x.wrapping_shr(y as u32),
                    _ => unreachable!(),
                };
                DynData::UInt64(value)
            }
            BinaryOp::And | BinaryOp::Or | BinaryOp::Xor => match (a, b) {
                (Promoted::Bool(x), Promoted::Bool(y)) => {
                    let value = match op {
                        BinaryOp::And => x & y,
                        BinaryOp::Or => x | y,
                        BinaryOp::Xor => x ^ y,
                        _ => unreachable!(),
                    };
                    DynData::Boolean(value)
                }
                (Promoted::Float(_), _) | (_, Promoted::Float(_)) => {
                    return Err(ParseError::eval_type(format!(
                        "operator '{op}' requires integer or boolean operands, got {} and {}",
                        lhs.kind(),
                        rhs.kind()
                    )));
                }
                (x, y) => {
                    let (x, y) = (x.as_u64(), y.as_u64());
                    let value = match op {
                        BinaryOp::And => x & y,
                        BinaryOp::Or => x | y,
                        BinaryOp::Xor => x ^ y,
                        _ => unreachable!(),
                    };
                    DynData::UInt64(value)
                }
            },
        };
        self.stack.push(result);
        Ok(())
    }
}

fn literal_value(literal: &Literal) -> DynData {
    match literal {
        Literal::Bool(v) => DynData::Boolean(*v),
        Literal::UInt(v) => DynData::UInt64(*v),
        Literal::Float(v) | Literal::Fixed(v) => DynData::Float128(*v),
        Literal::Char(v) => DynData::Char8(*v),
        Literal::WChar(v) => DynData::Char16(*v),
        Literal::String(v) => DynData::String8(v.clone()),
        Literal::WString(v) => DynData::String16(v.clone()),
    }
}

fn int_range_error(value: impl fmt::Display, target: TypeKind) -> ParseError {
    ParseError::eval_range(format!("value {value} does not fit in {target}"))
}

fn signed_target(value: &DynData, target: TypeKind, min: i64, max: i64) -> ParseResult<i64> {
    match promote(value)? {
        Promoted::UInt(raw) => {
            // two's-complement reinterpretation keeps `-1` working
            let v = raw as i64;
            if v < min || v > max {
                return Err(int_range_error(v, target));
            }
            Ok(v)
        }
        Promoted::Float(f) => {
            if f.fract() != 0.0 {
                return Err(ParseError::eval_range(format!(
                    "fractional value {f} cannot initialize a {target} constant"
                )));
            }
            let v = f as i64;
            if (v as f64 - f).abs() > f64::EPSILON || v < min || v > max {
                return Err(int_range_error(f, target));
            }
            Ok(v)
        }
        Promoted::Bool(_) => Err(ParseError::eval_type(format!(
            "boolean value cannot initialize a {target} constant"
        ))),
    }
}

fn unsigned_target(value: &DynData, target: TypeKind, max: u64) -> ParseResult<u64> {
    match promote(value)? {
        Promoted::UInt(v) => {
            if v > max {
                return Err(int_range_error(v, target));
            }
            Ok(v)
        }
        Promoted::Float(f) => {
            if f.fract() != 0.0 || f < 0.0 {
                return Err(ParseError::eval_range(format!(
                    "value {f} cannot initialize a {target} constant"
                )));
            }
            let v = f as u64;
            if v > max {
                return Err(int_range_error(f, target));
            }
            Ok(v)
        }
        Promoted::Bool(_) => Err(ParseError::eval_type(format!(
            "boolean value cannot initialize a {target} constant"
        ))),
    }
}

fn float_target(value: &DynData, target: TypeKind) -> ParseResult<f64> {
    match promote(value)? {
        Promoted::UInt(v) => Ok(v as f64),
        Promoted::Float(v) => Ok(v),
        Promoted::Bool(_) => Err(ParseError::eval_type(format!(
            "boolean value cannot initialize a {target} constant"
        ))),
    }
}

/// Convert an evaluated constant to its declared type, range-checked.
///
/// This is the result sink of a completed const-dcl: the returned value's
/// kind matches the declared type's kind and is what gets stored in the
/// module's constant map. Enum-typed constants are stored as `UInt32`
/// carrying the literal's value; `const fixed` constants keep the
/// `Float128` evaluation kind (the digits/scale of the literal are gone by
/// evaluation time).
pub(crate) fn convert_for_const(value: DynData, declared: &DynamicType) -> ParseResult<DynData> {
    let target = declared.unalias();
    let converted = match target.kind() {
        TypeKind::Boolean => match value {
            DynData::Boolean(v) => DynData::Boolean(v),
            other => {
                return Err(ParseError::eval_type(format!(
                    "{} value cannot initialize a boolean constant",
                    other.kind()
                )));
            }
        },
        TypeKind::Int8 => {
            DynData::Int8(signed_target(&value, TypeKind::Int8, i64::from(i8::MIN), i64::from(i8::MAX))? as i8)
        }
        TypeKind::Int16 => DynData::Int16(signed_target(
            &value,
            TypeKind::Int16,
            i64::from(i16::MIN),
            i64::from(i16::MAX),
        )? as i16),
        TypeKind::Int32 => DynData::Int32(signed_target(
            &value,
            TypeKind::Int32,
            i64::from(i32::MIN),
            i64::from(i32::MAX),
        )? as i32),
        TypeKind::Int64 => DynData::Int64(signed_target(&value, TypeKind::Int64, i64::MIN, i64::MAX)?),
        TypeKind::UInt8 => DynData::UInt8(unsigned_target(&value, TypeKind::UInt8, u64::from(u8::MAX))? as u8),
        TypeKind::Byte => DynData::Byte(unsigned_target(&value, TypeKind::Byte, u64::from(u8::MAX))? as u8),
        TypeKind::UInt16 => DynData::UInt16(unsigned_target(&value, TypeKind::UInt16, u64::from(u16::MAX))? as u16),
        TypeKind::UInt32 => DynData::UInt32(unsigned_target(&value, TypeKind::UInt32, u64::from(u32::MAX))? as u32),
        TypeKind::UInt64 => DynData::UInt64(unsigned_target(&value, TypeKind::UInt64, u64::MAX)?),
        TypeKind::Float32 => {
            let v = float_target(&value, TypeKind::Float32)?;
            let narrowed = v as f32;
            if v.is_finite() && !narrowed.is_finite() {
                return Err(int_range_error(v, TypeKind::Float32));
            }
            DynData::Float32(narrowed)
        }
        TypeKind::Float64 => DynData::Float64(float_target(&value, TypeKind::Float64)?),
        TypeKind::Float128 | TypeKind::Fixed => DynData::Float128(float_target(&value, TypeKind::Float128)?),
        TypeKind::Char8 => match value {
            DynData::Char8(c) => DynData::Char8(c),
            other => {
                return Err(ParseError::eval_type(format!(
                    "{} value cannot initialize a char constant",
                    other.kind()
                )));
            }
        },
        TypeKind::Char16 => match value {
            DynData::Char8(c) | DynData::Char16(c) => DynData::Char16(c),
            other => {
                return Err(ParseError::eval_type(format!(
                    "{} value cannot initialize a wchar constant",
                    other.kind()
                )));
            }
        },
        TypeKind::String8 => match value {
            DynData::String8(s) => {
                check_string_bound(&s, target)?;
                DynData::String8(s)
            }
            other => {
                return Err(ParseError::eval_type(format!(
                    "{} value cannot initialize a string constant",
                    other.kind()
                )));
            }
        },
        TypeKind::String16 => match value {
            DynData::String8(s) | DynData::String16(s) => {
                check_string_bound(&s, target)?;
                DynData::String16(s)
            }
            other => {
                return Err(ParseError::eval_type(format!(
                    "{} value cannot initialize a wstring constant",
                    other.kind()
                )));
            }
        },
        TypeKind::Enum => {
            let raw = unsigned_target(&value, TypeKind::UInt32, u64::from(u32::MAX))? as u32;
            let TypeDetail::Enum { literals, .. } = target.detail() else {
                unreachable!("enum kind carries enum detail");
            };
            if !literals.iter().any(|l| l.value == raw as i32) {
                return Err(ParseError::eval_range(format!(
                    "value {raw} is not a literal of enumeration '{}'",
                    target.name()
                )));
            }
            DynData::UInt32(raw)
        }
        other => {
            return Err(ParseError::eval_type(format!(
                "a constant cannot be declared with {other} type"
            )));
        }
    };
    Ok(converted)
}

fn check_string_bound(s: &str, target: &DynamicType) -> ParseResult<()> {
    if let TypeDetail::String { bound: Some(bound) } = target.detail() {
        let len = s.chars().count();
        if len > *bound as usize {
            return Err(ParseError::eval_range(format!(
                "string of length {len} exceeds bound {bound}"
            )));
        }
    }
    Ok(())
}

/// Evaluate a `positive_int_const` context: the value must be a positive
/// integer that fits in u32 (collection bounds, array dimensions, bitfield
/// widths).
pub(crate) fn to_positive_u32(value: &DynData) -> ParseResult<u32> {
    match promote(value)? {
        Promoted::UInt(v) => {
            if v == 0 {
                return Err(ParseError::eval_range("bound must be strictly positive"));
            }
            u32::try_from(v).map_err(|_| int_range_error(v, TypeKind::UInt32))
        }
        other => Err(ParseError::eval_type(format!(
            "bound must be an integer constant, got {}",
            match other {
                Promoted::Bool(_) => "a boolean",
                Promoted::Float(_) => "a float",
                Promoted::UInt(_) => unreachable!(),
            }
        ))),
    }
}

/// Evaluate a small unsigned context that tolerates zero (fixed-point
/// scale, explicit bit positions).
pub(crate) fn to_u16(value: &DynData) -> ParseResult<u16> {
    let raw = unsigned_target(value, TypeKind::UInt16, u64::from(u16::MAX))?;
    Ok(raw as u16)
}

/// Narrow an evaluated union case label to the discriminant's value space.
pub(crate) fn to_label_value(value: &DynData, discriminant: &DynamicType) -> ParseResult<i64> {
    let disc = discriminant.unalias();
    match disc.kind() {
        TypeKind::Boolean => match value {
            DynData::Boolean(v) => Ok(i64::from(*v)),
            other => Err(ParseError::eval_type(format!(
                "{} label for a boolean discriminant",
                other.kind()
            ))),
        },
        TypeKind::Char8 | TypeKind::Char16 => match value {
            DynData::Char8(c) | DynData::Char16(c) => Ok(i64::from(u32::from(*c))),
            other => Err(ParseError::eval_type(format!(
                "{} label for a character discriminant",
                other.kind()
            ))),
        },
        TypeKind::Int8 => signed_target(value, TypeKind::Int8, i64::from(i8::MIN), i64::from(i8::MAX)),
        TypeKind::Int16 => signed_target(value, TypeKind::Int16, i64::from(i16::MIN), i64::from(i16::MAX)),
        TypeKind::Int32 => signed_target(value, TypeKind::Int32, i64::from(i32::MIN), i64::from(i32::MAX)),
        TypeKind::Int64 => signed_target(value, TypeKind::Int64, i64::MIN, i64::MAX),
        TypeKind::UInt8 | TypeKind::Byte => {
            Ok(unsigned_target(value, TypeKind::UInt8, u64::from(u8::MAX))? as i64)
        }
        TypeKind::UInt16 => Ok(unsigned_target(value, TypeKind::UInt16, u64::from(u16::MAX))? as i64),
        TypeKind::UInt32 => Ok(unsigned_target(value, TypeKind::UInt32, u64::from(u32::MAX))? as i64),
        TypeKind::UInt64 => {
            let v = unsigned_target(value, TypeKind::UInt64, u64::MAX)?;
            i64::try_from(v).map_err(|_| int_range_error(v, TypeKind::Int64))
        }
        TypeKind::Enum => {
            let raw = unsigned_target(value, TypeKind::UInt32, u64::from(u32::MAX))? as i64;
            let TypeDetail::Enum { literals, .. } = disc.detail() else {
                unreachable!("enum kind carries enum detail");
            };
            if !literals.iter().any(|l| i64::from(l.value) == raw) {
                return Err(ParseError::eval_range(format!(
                    "label {raw} is not a literal of enumeration '{}'",
                    disc.name()
                )));
            }
            Ok(raw)
        }
        other => Err(ParseError::eval_type(format!(
            "{other} is not a valid union discriminant kind"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use smallvec::smallvec;

    use super::*;

    struct NoConstants;

    impl ConstantScope for NoConstants {
        fn lookup_constant(&self, _name: &ScopedName) -> Option<DynData> {
            None
        }
    }

    struct OneConstant(&'static str, DynData);

    impl ConstantScope for OneConstant {
        fn lookup_constant(&self, name: &ScopedName) -> Option<DynData> {
            (name.as_identifier() == Some(self.0)).then(|| self.1.clone())
        }
    }

    fn uint(v: u64) -> ConstExpr {
        ConstExpr::Literal(Literal::UInt(v))
    }

    fn binary(op: BinaryOp, lhs: ConstExpr, rhs: ConstExpr) -> ConstExpr {
        ConstExpr::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    #[test]
    fn addition_and_precedence_shape() {
        // 1 + 2 * 3, already shaped by the grammar
        let expr = binary(BinaryOp::Add, uint(1), binary(BinaryOp::Mul, uint(2), uint(3)));
        let mut evaluator = Evaluator::default();
        let value = evaluator.evaluate(&expr, &NoConstants).unwrap();
        assert_eq!(value, DynData::UInt64(7));
        assert!(evaluator.is_empty());
    }

    #[test]
    fn unary_minus_wraps_through_uint64() {
        let expr = binary(
            BinaryOp::Add,
            ConstExpr::Unary(UnaryOp::Minus, Box::new(uint(1))),
            uint(1),
        );
        let mut evaluator = Evaluator::default();
        let value = evaluator.evaluate(&expr, &NoConstants).unwrap();
        assert_eq!(value, DynData::UInt64(0));
    }

    #[test]
    fn division_by_boolean_is_a_type_error() {
        let expr = binary(BinaryOp::Div, ConstExpr::Literal(Literal::Bool(true)), uint(2));
        let mut evaluator = Evaluator::default();
        let err = evaluator.evaluate(&expr, &NoConstants).unwrap_err();
        assert_eq!(err.kind(), crate::error::ParseErrorKind::EvalTypeError);
        assert!(evaluator.is_empty(), "stack is unwound on error");
    }

    #[test]
    fn modulo_rejects_float_operands() {
        let expr = binary(BinaryOp::Mod, ConstExpr::Literal(Literal::Float(1.5)), uint(2));
        let mut evaluator = Evaluator::default();
        let err = evaluator.evaluate(&expr, &NoConstants).unwrap_err();
        assert_eq!(err.kind(), crate::error::ParseErrorKind::EvalTypeError);
    }

    #[test]
    fn mixed_bool_integer_bitwise_promotes_to_uint64() {
        let expr = binary(BinaryOp::Or, ConstExpr::Literal(Literal::Bool(true)), uint(4));
        let mut evaluator = Evaluator::default();
        let value = evaluator.evaluate(&expr, &NoConstants).unwrap();
        assert_eq!(value, DynData::UInt64(5));
    }

    #[test]
    fn scoped_name_resolves_through_the_scope() {
        let expr = binary(
            BinaryOp::Add,
            ConstExpr::Scoped(ScopedName::plain("K")),
            uint(1),
        );
        let mut evaluator = Evaluator::default();
        let value = evaluator
            .evaluate(&expr, &OneConstant("K", DynData::Int32(5)))
            .unwrap();
        assert_eq!(value, DynData::UInt64(6));
    }

    #[test]
    fn unresolved_scoped_name_is_a_resolve_error() {
        let expr = ConstExpr::Scoped(ScopedName {
            absolute: true,
            segments: smallvec!["Unknown".to_owned()],
        });
        let mut evaluator = Evaluator::default();
        let err = evaluator.evaluate(&expr, &NoConstants).unwrap_err();
        assert_eq!(err.kind(), crate::error::ParseErrorKind::ResolveError);
    }

    #[test]
    fn const_sink_range_checks_the_declared_type() {
        let declared = DynamicType::primitive(TypeKind::Int8);
        let err = convert_for_const(DynData::UInt64(400), &declared).unwrap_err();
        assert_eq!(err.kind(), crate::error::ParseErrorKind::EvalRangeError);

        let ok = convert_for_const(DynData::UInt64(7), &declared).unwrap();
        assert_eq!(ok, DynData::Int8(7));
    }

    #[test]
    fn const_sink_reinterprets_negatives_for_signed_targets() {
        let declared = DynamicType::primitive(TypeKind::Int32);
        let negative_one = DynData::UInt64(u64::MAX);
        assert_eq!(convert_for_const(negative_one, &declared).unwrap(), DynData::Int32(-1));
    }

    #[test]
    fn string_bound_is_enforced() {
        let declared = DynamicType::string(Some(3));
        let err = convert_for_const(DynData::String8("toolong".to_owned()), &declared).unwrap_err();
        assert_eq!(err.kind(), crate::error::ParseErrorKind::EvalRangeError);
    }
}
