//! The IDL 4.2 rule set.
//!
//! One function per grammar production, composed with nom. The layering
//! follows the language: lexical rules (whitespace, comments, literals),
//! type specifiers, the constant-expression tower, declarations, annotation
//! applications, and the top-level `definition` rule that the driver calls
//! in a loop.
//!
//! The grammar is purely syntactic: it produces [`crate::ast`] values and
//! never touches the registry. Ordered choice and backtracking behave like
//! the PEG formalism: every alternative is tried in source order and a
//! failed alternative consumes nothing.

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_until, take_while, take_while1, take_while_m_n},
    character::complete::{char as ch, multispace1, one_of},
    combinator::{opt, peek, recognize, value},
    error::{Error, ErrorKind},
    multi::{many0, many1},
    sequence::{pair, tuple},
};
use smallvec::SmallVec;

use crate::{
    ast::{
        AnnotationAppl, AnnotationBodyItem, AnnotationDef, ApplParam, BinaryOp, BitValue, Bitfield, BitmaskDef,
        BitsetDef, CaseLabel, ConstDcl, ConstExpr, Declarator, Definition, DefinitionBody, EnumDef, Enumerator,
        Literal, Member, ModuleDcl, ScopedName, StructDef, SwitchCase, TypeSpec, TypedefBase, TypedefDcl, UnaryOp,
        UnionDef,
    },
    registry::TypeKind,
};

pub(crate) type PResult<'a, T> = IResult<&'a str, T>;

/// Options the grammar itself needs; everything else about the input is
/// handled semantically by the driver.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct GrammarConfig {
    /// Permit identifiers that collide with the non-structural keywords
    /// (`int8`..`uint64`, `bitfield`, `any`).
    pub allow_keyword_identifiers: bool,
}

/// Keywords that can never be identifiers: they steer the parse itself.
const HARD_KEYWORDS: &[&str] = &[
    "module", "struct", "union", "enum", "const", "typedef", "native", "switch", "case", "default", "bitset",
    "bitmask", "sequence", "map", "string", "wstring", "fixed", "short", "long", "unsigned", "double", "float",
    "char", "wchar", "boolean", "octet", "true", "false",
];

/// Keywords released for use as identifiers by `allow_keyword_identifiers`.
const SOFT_KEYWORDS: &[&str] = &[
    "int8", "uint8", "int16", "uint16", "int32", "uint32", "int64", "uint64", "bitfield", "any",
];

fn err<T>(input: &str, kind: ErrorKind) -> PResult<'_, T> {
    Err(nom::Err::Error(Error::new(input, kind)))
}

// ---------------------------------------------------------------------------
// lexical layer
// ---------------------------------------------------------------------------

fn line_comment(input: &str) -> PResult<'_, ()> {
    value((), pair(tag("//"), take_while(|c| c != '\n')))(input)
}

fn block_comment(input: &str) -> PResult<'_, ()> {
    value((), tuple((tag("/*"), take_until("*/"), tag("*/"))))(input)
}

/// Zero or more spaces and comments.
pub(crate) fn ws0(input: &str) -> PResult<'_, ()> {
    value((), many0(alt((value((), multispace1), line_comment, block_comment))))(input)
}

fn ws1(input: &str) -> PResult<'_, ()> {
    value((), many1(alt((value((), multispace1), line_comment, block_comment))))(input)
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// A bare word, before any keyword filtering.
fn word(input: &str) -> PResult<'_, &str> {
    recognize(pair(take_while_m_n(1, 1, is_ident_start), take_while(is_ident_char)))(input)
}

/// Match a keyword token: the exact word, not merely a prefix of a longer
/// identifier. Surrounding whitespace is consumed.
fn keyword<'a>(kw: &'static str) -> impl FnMut(&'a str) -> PResult<'a, ()> {
    move |input| {
        let (rest, _) = ws0(input)?;
        let (rest, w) = word(rest)?;
        if w == kw {
            let (rest, _) = ws0(rest)?;
            Ok((rest, ()))
        } else {
            err(input, ErrorKind::Tag)
        }
    }
}

/// Punctuation token with surrounding whitespace.
fn sym<'a>(t: &'static str) -> impl FnMut(&'a str) -> PResult<'a, ()> {
    move |input| {
        let (rest, _) = ws0(input)?;
        let (rest, _) = tag(t)(rest)?;
        let (rest, _) = ws0(rest)?;
        Ok((rest, ()))
    }
}

/// A single `:` that is not the start of `::`.
fn colon(input: &str) -> PResult<'_, ()> {
    let (rest, _) = ws0(input)?;
    let (rest, _) = ch(':')(rest)?;
    if rest.starts_with(':') {
        return err(input, ErrorKind::Tag);
    }
    let (rest, _) = ws0(rest)?;
    Ok((rest, ()))
}

/// An identifier, honoring the keyword policy.
pub(crate) fn identifier<'a>(input: &'a str, cfg: &GrammarConfig) -> PResult<'a, &'a str> {
    let (rest, _) = ws0(input)?;
    let (rest, w) = word(rest)?;
    let lowered = w.to_ascii_lowercase();
    if HARD_KEYWORDS.contains(&lowered.as_str()) {
        return err(input, ErrorKind::Verify);
    }
    if !cfg.allow_keyword_identifiers && SOFT_KEYWORDS.contains(&lowered.as_str()) {
        return err(input, ErrorKind::Verify);
    }
    let (rest, _) = ws0(rest)?;
    Ok((rest, w))
}

pub(crate) fn scoped_name<'a>(input: &'a str, cfg: &GrammarConfig) -> PResult<'a, ScopedName> {
    let (rest, _) = ws0(input)?;
    let (rest, absolute) = opt(tag("::"))(rest)?;
    let (mut rest, first) = identifier(rest, cfg)?;
    let mut segments: SmallVec<[String; 2]> = SmallVec::new();
    segments.push(first.to_owned());
    loop {
        let checkpoint = rest;
        let Ok((after, _)) = tag::<_, _, Error<&str>>("::")(checkpoint) else {
            break;
        };
        let Ok((after, segment)) = identifier(after, cfg) else {
            // `A::` with no trailing identifier is not a longer scoped name
            break;
        };
        segments.push(segment.to_owned());
        rest = after;
    }
    let (rest, _) = ws0(rest)?;
    Ok((
        rest,
        ScopedName {
            absolute: absolute.is_some(),
            segments,
        },
    ))
}

// ---------------------------------------------------------------------------
// literals
// ---------------------------------------------------------------------------

fn boolean_literal(input: &str) -> PResult<'_, Literal> {
    let (rest, w) = word(input)?;
    match w {
        "TRUE" => Ok((rest, Literal::Bool(true))),
        "FALSE" => Ok((rest, Literal::Bool(false))),
        _ => err(input, ErrorKind::Tag),
    }
}

fn hex_literal(input: &str) -> PResult<'_, Literal> {
    let (rest, _) = alt((tag("0x"), tag("0X")))(input)?;
    let (rest, digits) = take_while1(|c: char| c.is_ascii_hexdigit())(rest)?;
    match u64::from_str_radix(digits, 16) {
        Ok(v) => Ok((rest, Literal::UInt(v))),
        Err(_) => err(input, ErrorKind::Verify),
    }
}

fn oct_literal(input: &str) -> PResult<'_, Literal> {
    let (rest, _) = ch('0')(input)?;
    let (rest, digits) = take_while1(|c: char| ('0'..='7').contains(&c))(rest)?;
    match u64::from_str_radix(digits, 8) {
        Ok(v) => Ok((rest, Literal::UInt(v))),
        Err(_) => err(input, ErrorKind::Verify),
    }
}

fn dec_literal(input: &str) -> PResult<'_, Literal> {
    let (rest, digits) = take_while1(|c: char| c.is_ascii_digit())(input)?;
    match digits.parse::<u64>() {
        Ok(v) => Ok((rest, Literal::UInt(v))),
        Err(_) => err(input, ErrorKind::Verify),
    }
}

/// `1.5d`, `10d`, `.5D` — a fixed-point literal carries the `d` suffix.
fn fixed_pt_literal(input: &str) -> PResult<'_, Literal> {
    let (rest, text) = recognize(tuple((
        take_while(|c: char| c.is_ascii_digit()),
        opt(pair(ch('.'), take_while(|c: char| c.is_ascii_digit()))),
        one_of("dD"),
    )))(input)?;
    let digits = &text[..text.len() - 1];
    if !digits.chars().any(|c| c.is_ascii_digit()) {
        return err(input, ErrorKind::Verify);
    }
    match parse_float_text(digits) {
        Some(v) => Ok((rest, Literal::Fixed(v))),
        None => err(input, ErrorKind::Verify),
    }
}

/// A float literal must carry a dot or an exponent; bare integers fall
/// through to the integer rules.
fn float_literal(input: &str) -> PResult<'_, Literal> {
    let (rest, text) = recognize(tuple((
        take_while(|c: char| c.is_ascii_digit()),
        opt(pair(ch('.'), take_while(|c: char| c.is_ascii_digit()))),
        opt(tuple((
            one_of("eE"),
            opt(one_of("+-")),
            take_while1(|c: char| c.is_ascii_digit()),
        ))),
    )))(input)?;
    let has_digits = text.chars().any(|c| c.is_ascii_digit());
    let has_dot = text.contains('.');
    let has_exp = text.contains(['e', 'E']);
    if !has_digits || (!has_dot && !has_exp) {
        return err(input, ErrorKind::Verify);
    }
    match parse_float_text(text) {
        Some(v) => Ok((rest, Literal::Float(v))),
        None => err(input, ErrorKind::Verify),
    }
}

/// Parse a float spelling, tolerating bare-leading-dot and trailing-dot
/// forms that `f64::from_str` may reject.
fn parse_float_text(text: &str) -> Option<f64> {
    let mut normalized = String::with_capacity(text.len() + 2);
    if text.starts_with('.') || text.starts_with(['e', 'E']) {
        normalized.push('0');
    }
    normalized.push_str(text);
    if let Some(pos) = normalized.find('.') {
        let after = normalized.as_bytes().get(pos + 1);
        if after.is_none() || !after.unwrap().is_ascii_digit() {
            normalized.insert(pos + 1, '0');
        }
    }
    normalized.parse::<f64>().ok()
}

/// One character of a char/string literal, decoding the escape sequences
/// `\n \t \v \b \r \f \a \\ \? \' \" \ooo \xhh \uhhhh`.
fn literal_character(input: &str, delimiter: char) -> PResult<'_, char> {
    let mut chars = input.char_indices();
    let Some((_, first)) = chars.next() else {
        return err(input, ErrorKind::Eof);
    };
    if first == delimiter || first == '\n' {
        return err(input, ErrorKind::Verify);
    }
    if first != '\\' {
        let rest = &input[first.len_utf8()..];
        return Ok((rest, first));
    }

    let after_backslash = &input[1..];
    let Some(escape) = after_backslash.chars().next() else {
        return err(input, ErrorKind::Eof);
    };
    let simple = match escape {
        'n' => Some('\n'),
        't' => Some('\t'),
        'v' => Some('\u{0B}'),
        'b' => Some('\u{08}'),
        'r' => Some('\r'),
        'f' => Some('\u{0C}'),
        'a' => Some('\u{07}'),
        '\\' => Some('\\'),
        '?' => Some('?'),
        '\'' => Some('\''),
        '"' => Some('"'),
        _ => None,
    };
    if let Some(c) = simple {
        return Ok((&after_backslash[escape.len_utf8()..], c));
    }
    match escape {
        'x' => {
            let (rest, digits) = take_while_m_n(1, 2, |c: char| c.is_ascii_hexdigit())(&after_backslash[1..])?;
            let code = u32::from_str_radix(digits, 16).expect("hex digits");
            match char::from_u32(code) {
                Some(c) => Ok((rest, c)),
                None => err(input, ErrorKind::Verify),
            }
        }
        'u' => {
            let (rest, digits) = take_while_m_n(1, 4, |c: char| c.is_ascii_hexdigit())(&after_backslash[1..])?;
            let code = u32::from_str_radix(digits, 16).expect("hex digits");
            match char::from_u32(code) {
                Some(c) => Ok((rest, c)),
                None => err(input, ErrorKind::Verify),
            }
        }
        '0'..='7' => {
            let (rest, digits) = take_while_m_n(1, 3, |c: char| ('0'..='7').contains(&c))(after_backslash)?;
            let code = u32::from_str_radix(digits, 8).expect("octal digits");
            match char::from_u32(code) {
                Some(c) => Ok((rest, c)),
                None => err(input, ErrorKind::Verify),
            }
        }
        _ => err(input, ErrorKind::Verify),
    }
}

fn character_literal(input: &str) -> PResult<'_, Literal> {
    let (rest, _) = ch('\'')(input)?;
    let (rest, c) = literal_character(rest, '\'')?;
    let (rest, _) = ch('\'')(rest)?;
    Ok((rest, Literal::Char(c)))
}

fn wide_character_literal(input: &str) -> PResult<'_, Literal> {
    let (rest, _) = ch('L')(input)?;
    let (rest, _) = ch('\'')(rest)?;
    let (rest, c) = literal_character(rest, '\'')?;
    let (rest, _) = ch('\'')(rest)?;
    Ok((rest, Literal::WChar(c)))
}

fn substring_literal(input: &str) -> PResult<'_, String> {
    let (mut rest, _) = ch('"')(input)?;
    let mut out = String::new();
    loop {
        if rest.starts_with('"') {
            return Ok((&rest[1..], out));
        }
        let (after, c) = literal_character(rest, '"')?;
        out.push(c);
        rest = after;
    }
}

/// Adjacent string literals concatenate: `"ab" "cd"` is `"abcd"`.
fn string_literal(input: &str) -> PResult<'_, Literal> {
    let (mut rest, mut text) = substring_literal(input)?;
    loop {
        let checkpoint = rest;
        let Ok((after, _)) = ws1(checkpoint) else { break };
        let Ok((after, more)) = substring_literal(after) else { break };
        text.push_str(&more);
        rest = after;
    }
    Ok((rest, Literal::String(text)))
}

fn wide_substring_literal(input: &str) -> PResult<'_, String> {
    let (rest, _) = ch('L')(input)?;
    substring_literal(rest)
}

fn wide_string_literal(input: &str) -> PResult<'_, Literal> {
    let (mut rest, mut text) = wide_substring_literal(input)?;
    loop {
        let checkpoint = rest;
        let Ok((after, _)) = ws1(checkpoint) else { break };
        let Ok((after, more)) = wide_substring_literal(after) else { break };
        text.push_str(&more);
        rest = after;
    }
    Ok((rest, Literal::WString(text)))
}

/// Any literal. Fixed-point is tried before float (both may start with the
/// same digits, the `d` suffix disambiguates), hex before octal before
/// decimal (`0x` shares the leading zero).
pub(crate) fn literal(input: &str) -> PResult<'_, Literal> {
    let (input, _) = ws0(input)?;
    let (rest, lit) = alt((
        boolean_literal,
        fixed_pt_literal,
        float_literal,
        hex_literal,
        oct_literal,
        dec_literal,
        wide_character_literal,
        wide_string_literal,
        character_literal,
        string_literal,
    ))(input)?;
    let (rest, _) = ws0(rest)?;
    Ok((rest, lit))
}

// ---------------------------------------------------------------------------
// constant expressions
// ---------------------------------------------------------------------------
//
// A recursive-descent tower with right-associative precedence, matching the
// rule shapes of the source grammar:
//   or < xor < and < shift < add < mul < unary < primary

fn primary_expr<'a>(input: &'a str, cfg: &GrammarConfig) -> PResult<'a, ConstExpr> {
    let (rest, _) = ws0(input)?;
    if let Ok((rest, _)) = sym("(")(rest) {
        let (rest, inner) = const_expr(rest, cfg)?;
        let (rest, _) = sym(")")(rest)?;
        return Ok((rest, inner));
    }
    if let Ok((rest, lit)) = literal(rest) {
        return Ok((rest, ConstExpr::Literal(lit)));
    }
    let (rest, name) = scoped_name(rest, cfg)?;
    Ok((rest, ConstExpr::Scoped(name)))
}

fn unary_expr<'a>(input: &'a str, cfg: &GrammarConfig) -> PResult<'a, ConstExpr> {
    let (rest, _) = ws0(input)?;
    let ops: [(&str, UnaryOp); 3] = [("~", UnaryOp::Invert), ("+", UnaryOp::Plus), ("-", UnaryOp::Minus)];
    for (symbol, op) in ops {
        if let Ok((after, _)) = sym(symbol)(rest) {
            if let Ok((after, inner)) = primary_expr(after, cfg) {
                return Ok((after, ConstExpr::Unary(op, Box::new(inner))));
            }
        }
    }
    primary_expr(rest, cfg)
}

/// Build one right-associative level of the tower.
macro_rules! binary_level {
    ($name:ident, $next:ident, $(($symbol:literal, $op:expr)),+ $(,)?) => {
        fn $name<'a>(input: &'a str, cfg: &GrammarConfig) -> PResult<'a, ConstExpr> {
            let (rest, lhs) = $next(input, cfg)?;
            $(
                if let Ok((after, _)) = sym($symbol)(rest) {
                    if let Ok((after, rhs)) = $name(after, cfg) {
                        return Ok((after, ConstExpr::Binary($op, Box::new(lhs), Box::new(rhs))));
                    }
                }
            )+
            Ok((rest, lhs))
        }
    };
}

binary_level!(
    mult_expr,
    unary_expr,
    ("%", BinaryOp::Mod),
    ("/", BinaryOp::Div),
    ("*", BinaryOp::Mul),
);
binary_level!(add_expr, mult_expr, ("-", BinaryOp::Sub), ("+", BinaryOp::Add));
binary_level!(shift_expr, add_expr, ("<<", BinaryOp::Shl), (">>", BinaryOp::Shr));
binary_level!(and_expr, shift_expr, ("&", BinaryOp::And));
binary_level!(xor_expr, and_expr, ("^", BinaryOp::Xor));
binary_level!(or_expr, xor_expr, ("|", BinaryOp::Or));

pub(crate) fn const_expr<'a>(input: &'a str, cfg: &GrammarConfig) -> PResult<'a, ConstExpr> {
    or_expr(input, cfg)
}

// ---------------------------------------------------------------------------
// type specifiers
// ---------------------------------------------------------------------------

/// The primitive keywords, old and new spellings alike. Multi-word forms
/// are matched longest-first (`unsigned long long` before `unsigned long`,
/// `long double` before `long long` before `long`).
fn base_type_spec(input: &str) -> PResult<'_, TypeSpec> {
    let table: [(&[&str], TypeSpec); 22] = [
        (&["float"], TypeSpec::Primitive(TypeKind::Float32)),
        (&["long", "double"], TypeSpec::Primitive(TypeKind::Float128)),
        (&["double"], TypeSpec::Primitive(TypeKind::Float64)),
        (&["int8"], TypeSpec::Primitive(TypeKind::Int8)),
        (&["uint8"], TypeSpec::Primitive(TypeKind::UInt8)),
        (&["unsigned", "short"], TypeSpec::Primitive(TypeKind::UInt16)),
        (&["uint16"], TypeSpec::Primitive(TypeKind::UInt16)),
        (&["short"], TypeSpec::Primitive(TypeKind::Int16)),
        (&["int16"], TypeSpec::Primitive(TypeKind::Int16)),
        (&["unsigned", "long", "long"], TypeSpec::Primitive(TypeKind::UInt64)),
        (&["uint64"], TypeSpec::Primitive(TypeKind::UInt64)),
        (&["unsigned", "long"], TypeSpec::Primitive(TypeKind::UInt32)),
        (&["uint32"], TypeSpec::Primitive(TypeKind::UInt32)),
        (&["long", "long"], TypeSpec::Primitive(TypeKind::Int64)),
        (&["int64"], TypeSpec::Primitive(TypeKind::Int64)),
        (&["long"], TypeSpec::Primitive(TypeKind::Int32)),
        (&["int32"], TypeSpec::Primitive(TypeKind::Int32)),
        (&["char"], TypeSpec::Char),
        (&["wchar"], TypeSpec::WChar),
        (&["boolean"], TypeSpec::Primitive(TypeKind::Boolean)),
        (&["octet"], TypeSpec::Primitive(TypeKind::Byte)),
        (&["float128"], TypeSpec::Primitive(TypeKind::Float128)),
    ];
    'candidates: for (words, spec) in table {
        let mut rest = input;
        for w in words {
            match keyword(w)(rest) {
                Ok((after, ())) => rest = after,
                Err(_) => continue 'candidates,
            }
        }
        return Ok((rest, spec.clone()));
    }
    err(input, ErrorKind::Alt)
}

fn string_size<'a>(input: &'a str, cfg: &GrammarConfig) -> PResult<'a, ConstExpr> {
    let (rest, _) = sym("<")(input)?;
    let (rest, bound) = const_expr(rest, cfg)?;
    let (rest, _) = sym(">")(rest)?;
    Ok((rest, bound))
}

fn string_type<'a>(input: &'a str, cfg: &GrammarConfig) -> PResult<'a, TypeSpec> {
    let (rest, _) = keyword("string")(input)?;
    let (rest, bound) = opt(|i| string_size(i, cfg))(rest)?;
    Ok((rest, TypeSpec::String { bound }))
}

fn wide_string_type<'a>(input: &'a str, cfg: &GrammarConfig) -> PResult<'a, TypeSpec> {
    let (rest, _) = keyword("wstring")(input)?;
    let (rest, bound) = opt(|i| string_size(i, cfg))(rest)?;
    Ok((rest, TypeSpec::WString { bound }))
}

fn collection_size<'a>(input: &'a str, cfg: &GrammarConfig) -> PResult<'a, ConstExpr> {
    let (rest, _) = sym(",")(input)?;
    const_expr(rest, cfg)
}

fn sequence_type<'a>(input: &'a str, cfg: &GrammarConfig) -> PResult<'a, TypeSpec> {
    let (rest, _) = keyword("sequence")(input)?;
    let (rest, _) = sym("<")(rest)?;
    let (rest, element) = type_spec(rest, cfg)?;
    let (rest, bound) = opt(|i| collection_size(i, cfg))(rest)?;
    let (rest, _) = sym(">")(rest)?;
    Ok((
        rest,
        TypeSpec::Sequence {
            element: Box::new(element),
            bound,
        },
    ))
}

fn map_type<'a>(input: &'a str, cfg: &GrammarConfig) -> PResult<'a, TypeSpec> {
    let (rest, _) = keyword("map")(input)?;
    let (rest, _) = sym("<")(rest)?;
    let (rest, key) = type_spec(rest, cfg)?;
    let (rest, _) = sym(",")(rest)?;
    let (rest, value_type) = type_spec(rest, cfg)?;
    let (rest, bound) = opt(|i| collection_size(i, cfg))(rest)?;
    let (rest, _) = sym(">")(rest)?;
    Ok((
        rest,
        TypeSpec::Map {
            key: Box::new(key),
            value: Box::new(value_type),
            bound,
        },
    ))
}

fn fixed_pt_type<'a>(input: &'a str, cfg: &GrammarConfig) -> PResult<'a, TypeSpec> {
    let (rest, _) = keyword("fixed")(input)?;
    let (rest, _) = sym("<")(rest)?;
    let (rest, digits) = const_expr(rest, cfg)?;
    let (rest, _) = sym(",")(rest)?;
    let (rest, scale) = const_expr(rest, cfg)?;
    let (rest, _) = sym(">")(rest)?;
    Ok((rest, TypeSpec::Fixed { digits, scale }))
}

fn template_type_spec<'a>(input: &'a str, cfg: &GrammarConfig) -> PResult<'a, TypeSpec> {
    if let Ok(result) = map_type(input, cfg) {
        return Ok(result);
    }
    if let Ok(result) = sequence_type(input, cfg) {
        return Ok(result);
    }
    if let Ok(result) = string_type(input, cfg) {
        return Ok(result);
    }
    if let Ok(result) = wide_string_type(input, cfg) {
        return Ok(result);
    }
    fixed_pt_type(input, cfg)
}

pub(crate) fn type_spec<'a>(input: &'a str, cfg: &GrammarConfig) -> PResult<'a, TypeSpec> {
    let (input, _) = ws0(input)?;
    if let Ok(result) = template_type_spec(input, cfg) {
        return Ok(result);
    }
    if let Ok(result) = base_type_spec(input) {
        return Ok(result);
    }
    let (rest, name) = scoped_name(input, cfg)?;
    Ok((rest, TypeSpec::Scoped(name)))
}

/// The type of a `const` declaration: primitives, strings, `fixed`, or a
/// scoped name resolving to an enum or alias.
fn const_type<'a>(input: &'a str, cfg: &GrammarConfig) -> PResult<'a, TypeSpec> {
    let (input, _) = ws0(input)?;
    if let Ok(result) = base_type_spec(input) {
        return Ok(result);
    }
    if let Ok(result) = string_type(input, cfg) {
        return Ok(result);
    }
    if let Ok(result) = wide_string_type(input, cfg) {
        return Ok(result);
    }
    // `const fixed` has no digits/scale; the value keeps the float128
    // evaluation kind
    if let Ok((rest, _)) = keyword("fixed")(input) {
        if !rest.trim_start().starts_with('<') {
            return Ok((rest, TypeSpec::Primitive(TypeKind::Float128)));
        }
    }
    let (rest, name) = scoped_name(input, cfg)?;
    Ok((rest, TypeSpec::Scoped(name)))
}

// ---------------------------------------------------------------------------
// annotation applications
// ---------------------------------------------------------------------------

fn annotation_appl_param<'a>(input: &'a str, cfg: &GrammarConfig) -> PResult<'a, ApplParam> {
    // keyword form first: `name = expr`
    if let Ok((rest, name)) = identifier(input, cfg) {
        if let Ok((rest, _)) = sym("=")(rest) {
            // `==` is not an IDL operator, no ambiguity here
            let (rest, expr) = const_expr(rest, cfg)?;
            return Ok((
                rest,
                ApplParam {
                    name: Some(name.to_owned()),
                    value: expr,
                },
            ));
        }
    }
    let (rest, expr) = const_expr(input, cfg)?;
    Ok((rest, ApplParam { name: None, value: expr }))
}

/// A scoped name with no keyword filtering. Annotation names live in their
/// own namespace and several builtins (`@default`, `@default_literal`)
/// collide with reserved words.
fn lenient_scoped_name(input: &str) -> PResult<'_, ScopedName> {
    let (rest, _) = ws0(input)?;
    let (rest, absolute) = opt(tag("::"))(rest)?;
    let (mut rest, first) = word(rest)?;
    let mut segments: SmallVec<[String; 2]> = SmallVec::new();
    segments.push(first.to_owned());
    loop {
        let checkpoint = rest;
        let Ok((after, _)) = tag::<_, _, Error<&str>>("::")(checkpoint) else {
            break;
        };
        let Ok((after, segment)) = word(after) else {
            break;
        };
        segments.push(segment.to_owned());
        rest = after;
    }
    let (rest, _) = ws0(rest)?;
    Ok((
        rest,
        ScopedName {
            absolute: absolute.is_some(),
            segments,
        },
    ))
}

/// `@name` or `@name(p1, p2 = v)`. The spelling `@annotation` is the start
/// of an annotation declaration, never an application.
pub(crate) fn annotation_appl<'a>(input: &'a str, cfg: &GrammarConfig) -> PResult<'a, AnnotationAppl> {
    let (rest, _) = ws0(input)?;
    let (rest, _) = ch('@')(rest)?;
    let (rest, name) = lenient_scoped_name(rest)?;
    if name.as_identifier() == Some("annotation") {
        return err(input, ErrorKind::Verify);
    }
    let mut params = Vec::new();
    let mut rest = rest;
    if let Ok((after, _)) = sym("(")(rest) {
        let (after, first) = annotation_appl_param(after, cfg)?;
        params.push(first);
        let (after, more) = many0(|i| {
            let (i, _) = sym(",")(i)?;
            annotation_appl_param(i, cfg)
        })(after)?;
        params.extend(more);
        let (after, _) = sym(")")(after)?;
        rest = after;
    }
    let (rest, _) = ws0(rest)?;
    Ok((rest, AnnotationAppl { name, params }))
}

fn annotation_appls<'a>(input: &'a str, cfg: &GrammarConfig) -> PResult<'a, Vec<AnnotationAppl>> {
    many0(|i| annotation_appl(i, cfg))(input)
}

// ---------------------------------------------------------------------------
// declarators and members
// ---------------------------------------------------------------------------

fn fixed_array_size<'a>(input: &'a str, cfg: &GrammarConfig) -> PResult<'a, ConstExpr> {
    let (rest, _) = sym("[")(input)?;
    let (rest, size) = const_expr(rest, cfg)?;
    let (rest, _) = sym("]")(rest)?;
    Ok((rest, size))
}

fn declarator<'a>(input: &'a str, cfg: &GrammarConfig) -> PResult<'a, Declarator> {
    let (rest, name) = identifier(input, cfg)?;
    let (rest, dims) = many0(|i| fixed_array_size(i, cfg))(rest)?;
    Ok((
        rest,
        Declarator {
            name: name.to_owned(),
            array_dims: dims,
        },
    ))
}

fn declarators<'a>(input: &'a str, cfg: &GrammarConfig) -> PResult<'a, Vec<Declarator>> {
    let (rest, first) = declarator(input, cfg)?;
    let (rest, mut more) = many0(|i| {
        let (i, _) = sym(",")(i)?;
        declarator(i, cfg)
    })(rest)?;
    more.insert(0, first);
    Ok((rest, more))
}

fn member<'a>(input: &'a str, cfg: &GrammarConfig) -> PResult<'a, Member> {
    let (rest, annotations) = annotation_appls(input, cfg)?;
    let (rest, spec) = type_spec(rest, cfg)?;
    let (rest, decls) = declarators(rest, cfg)?;
    let (rest, _) = sym(";")(rest)?;
    Ok((
        rest,
        Member {
            annotations,
            type_spec: spec,
            declarators: decls,
        },
    ))
}

// ---------------------------------------------------------------------------
// declarations
// ---------------------------------------------------------------------------

fn inheritance<'a>(input: &'a str, cfg: &GrammarConfig) -> PResult<'a, ScopedName> {
    let (rest, _) = colon(input)?;
    scoped_name(rest, cfg)
}

fn struct_def<'a>(input: &'a str, cfg: &GrammarConfig) -> PResult<'a, StructDef> {
    let (rest, _) = keyword("struct")(input)?;
    let (rest, name) = identifier(rest, cfg)?;
    let (rest, base) = opt(|i| inheritance(i, cfg))(rest)?;
    let (rest, _) = sym("{")(rest)?;
    let (rest, members) = many0(|i| member(i, cfg))(rest)?;
    let (rest, _) = sym("}")(rest)?;
    Ok((
        rest,
        StructDef {
            name: name.to_owned(),
            base,
            members,
        },
    ))
}

fn struct_forward_dcl<'a>(input: &'a str, cfg: &GrammarConfig) -> PResult<'a, String> {
    let (rest, _) = keyword("struct")(input)?;
    let (rest, name) = identifier(rest, cfg)?;
    // a `{` would make this a definition
    if rest.trim_start().starts_with('{') {
        return err(input, ErrorKind::Verify);
    }
    Ok((rest, name.to_owned()))
}

fn case_label<'a>(input: &'a str, cfg: &GrammarConfig) -> PResult<'a, CaseLabel> {
    if let Ok((rest, _)) = keyword("case")(input) {
        let (rest, expr) = const_expr(rest, cfg)?;
        let (rest, _) = colon(rest)?;
        return Ok((rest, CaseLabel::Value(expr)));
    }
    let (rest, _) = keyword("default")(input)?;
    let (rest, _) = colon(rest)?;
    Ok((rest, CaseLabel::Default))
}

fn switch_case<'a>(input: &'a str, cfg: &GrammarConfig) -> PResult<'a, SwitchCase> {
    let (rest, labels) = many1(|i| case_label(i, cfg))(input)?;
    let (rest, annotations) = annotation_appls(rest, cfg)?;
    let (rest, spec) = type_spec(rest, cfg)?;
    let (rest, decl) = declarator(rest, cfg)?;
    let (rest, _) = sym(";")(rest)?;
    Ok((
        rest,
        SwitchCase {
            labels,
            annotations,
            type_spec: spec,
            declarator: decl,
        },
    ))
}

/// The discriminant of a union: integers, characters, boolean, octet, or a
/// scoped name (enum or alias). Floating-point kinds are not in this rule,
/// so `switch(float)` is a syntax error.
fn switch_type_spec<'a>(input: &'a str, cfg: &GrammarConfig) -> PResult<'a, TypeSpec> {
    let (input, _) = ws0(input)?;
    if let Ok((rest, spec)) = base_type_spec(input) {
        return match &spec {
            TypeSpec::Char | TypeSpec::WChar => Ok((rest, spec)),
            TypeSpec::Primitive(kind) if kind.is_integer() || matches!(kind, TypeKind::Boolean | TypeKind::Byte) => {
                Ok((rest, spec))
            }
            _ => err(input, ErrorKind::Verify),
        };
    }
    let (rest, name) = scoped_name(input, cfg)?;
    Ok((rest, TypeSpec::Scoped(name)))
}

fn union_def<'a>(input: &'a str, cfg: &GrammarConfig) -> PResult<'a, UnionDef> {
    let (rest, _) = keyword("union")(input)?;
    let (rest, name) = identifier(rest, cfg)?;
    let (rest, _) = keyword("switch")(rest)?;
    let (rest, _) = sym("(")(rest)?;
    let (rest, discriminator_annotations) = annotation_appls(rest, cfg)?;
    let (rest, discriminant) = switch_type_spec(rest, cfg)?;
    let (rest, _) = sym(")")(rest)?;
    let (rest, _) = sym("{")(rest)?;
    let (rest, cases) = many1(|i| switch_case(i, cfg))(rest)?;
    let (rest, _) = sym("}")(rest)?;
    Ok((
        rest,
        UnionDef {
            name: name.to_owned(),
            discriminator_annotations,
            discriminant,
            cases,
        },
    ))
}

fn union_forward_dcl<'a>(input: &'a str, cfg: &GrammarConfig) -> PResult<'a, String> {
    let (rest, _) = keyword("union")(input)?;
    let (rest, name) = identifier(rest, cfg)?;
    if rest.trim_start().starts_with('{') || keyword("switch")(rest).is_ok() {
        return err(input, ErrorKind::Verify);
    }
    Ok((rest, name.to_owned()))
}

fn enumerator<'a>(input: &'a str, cfg: &GrammarConfig) -> PResult<'a, Enumerator> {
    let (rest, annotations) = annotation_appls(input, cfg)?;
    let (rest, name) = identifier(rest, cfg)?;
    Ok((
        rest,
        Enumerator {
            annotations,
            name: name.to_owned(),
        },
    ))
}

fn enum_dcl<'a>(input: &'a str, cfg: &GrammarConfig) -> PResult<'a, EnumDef> {
    let (rest, _) = keyword("enum")(input)?;
    let (rest, name) = identifier(rest, cfg)?;
    let (rest, _) = sym("{")(rest)?;
    let (rest, first) = enumerator(rest, cfg)?;
    let (rest, mut enumerators) = many0(|i| {
        let (i, _) = sym(",")(i)?;
        enumerator(i, cfg)
    })(rest)?;
    enumerators.insert(0, first);
    let (rest, _) = sym("}")(rest)?;
    Ok((
        rest,
        EnumDef {
            name: name.to_owned(),
            enumerators,
        },
    ))
}

fn bit_value<'a>(input: &'a str, cfg: &GrammarConfig) -> PResult<'a, BitValue> {
    let (rest, annotations) = annotation_appls(input, cfg)?;
    let (rest, name) = identifier(rest, cfg)?;
    Ok((
        rest,
        BitValue {
            annotations,
            name: name.to_owned(),
        },
    ))
}

fn bitmask_dcl<'a>(input: &'a str, cfg: &GrammarConfig) -> PResult<'a, BitmaskDef> {
    let (rest, _) = keyword("bitmask")(input)?;
    let (rest, name) = identifier(rest, cfg)?;
    let (rest, _) = sym("{")(rest)?;
    let (rest, first) = bit_value(rest, cfg)?;
    let (rest, mut values) = many0(|i| {
        let (i, _) = sym(",")(i)?;
        bit_value(i, cfg)
    })(rest)?;
    values.insert(0, first);
    let (rest, _) = sym("}")(rest)?;
    Ok((
        rest,
        BitmaskDef {
            name: name.to_owned(),
            values,
        },
    ))
}

/// Bitfield destination types: boolean, octet, or any integer kind.
fn destination_type(input: &str) -> PResult<'_, TypeSpec> {
    let (rest, spec) = base_type_spec(input)?;
    match &spec {
        TypeSpec::Primitive(kind) if kind.is_integer() || matches!(kind, TypeKind::Boolean | TypeKind::Byte) => {
            Ok((rest, spec))
        }
        _ => err(input, ErrorKind::Verify),
    }
}

fn bitfield<'a>(input: &'a str, cfg: &GrammarConfig) -> PResult<'a, Bitfield> {
    let (rest, annotations) = annotation_appls(input, cfg)?;
    let (rest, _) = keyword("bitfield")(rest)?;
    let (rest, _) = sym("<")(rest)?;
    let (rest, width) = const_expr(rest, cfg)?;
    let (rest, holder) = opt(|i| {
        let (i, _) = sym(",")(i)?;
        destination_type(i)
    })(rest)?;
    let (rest, _) = sym(">")(rest)?;
    let (rest, names) = many0(|i| identifier(i, cfg))(rest)?;
    let (rest, _) = sym(";")(rest)?;
    Ok((
        rest,
        Bitfield {
            annotations,
            width,
            holder,
            names: names.into_iter().map(str::to_owned).collect(),
        },
    ))
}

fn bitset_dcl<'a>(input: &'a str, cfg: &GrammarConfig) -> PResult<'a, BitsetDef> {
    let (rest, _) = keyword("bitset")(input)?;
    let (rest, name) = identifier(rest, cfg)?;
    let (rest, base) = opt(|i| inheritance(i, cfg))(rest)?;
    let (rest, _) = sym("{")(rest)?;
    let (rest, bitfields) = many0(|i| bitfield(i, cfg))(rest)?;
    let (rest, _) = sym("}")(rest)?;
    Ok((
        rest,
        BitsetDef {
            name: name.to_owned(),
            base,
            bitfields,
        },
    ))
}

/// The referent of a typedef: an inline constructed type, a template type,
/// or a simple type spec.
fn typedef_dcl<'a>(input: &'a str, cfg: &GrammarConfig) -> PResult<'a, TypedefDcl> {
    let (rest, _) = keyword("typedef")(input)?;
    let (rest, base) = if let Ok((after, def)) = struct_def(rest, cfg) {
        (after, TypedefBase::Struct(def))
    } else if let Ok((after, def)) = union_def(rest, cfg) {
        (after, TypedefBase::Union(def))
    } else if let Ok((after, def)) = enum_dcl(rest, cfg) {
        (after, TypedefBase::Enum(def))
    } else if let Ok((after, def)) = bitset_dcl(rest, cfg) {
        (after, TypedefBase::Bitset(def))
    } else if let Ok((after, def)) = bitmask_dcl(rest, cfg) {
        (after, TypedefBase::Bitmask(def))
    } else {
        let (after, spec) = type_spec(rest, cfg)?;
        (after, TypedefBase::Spec(spec))
    };
    let (rest, decls) = declarators(rest, cfg)?;
    Ok((
        rest,
        TypedefDcl {
            base,
            declarators: decls,
        },
    ))
}

fn native_dcl<'a>(input: &'a str, cfg: &GrammarConfig) -> PResult<'a, String> {
    let (rest, _) = keyword("native")(input)?;
    let (rest, name) = identifier(rest, cfg)?;
    Ok((rest, name.to_owned()))
}

fn const_dcl<'a>(input: &'a str, cfg: &GrammarConfig) -> PResult<'a, ConstDcl> {
    let (rest, _) = keyword("const")(input)?;
    let (rest, const_type_spec) = const_type(rest, cfg)?;
    let (rest, name) = identifier(rest, cfg)?;
    let (rest, _) = sym("=")(rest)?;
    let (rest, expr) = const_expr(rest, cfg)?;
    Ok((
        rest,
        ConstDcl {
            const_type: const_type_spec,
            name: name.to_owned(),
            expr,
        },
    ))
}

// ---------------------------------------------------------------------------
// annotation declarations
// ---------------------------------------------------------------------------

fn annotation_member_type<'a>(input: &'a str, cfg: &GrammarConfig) -> PResult<'a, TypeSpec> {
    let (input, _) = ws0(input)?;
    if let Ok((rest, _)) = keyword("any")(input) {
        return Ok((rest, TypeSpec::Any));
    }
    const_type(input, cfg)
}

fn annotation_member<'a>(input: &'a str, cfg: &GrammarConfig) -> PResult<'a, AnnotationBodyItem> {
    let (rest, spec) = annotation_member_type(input, cfg)?;
    let (rest, name) = identifier(rest, cfg)?;
    let (rest, default) = opt(|i| {
        let (i, _) = keyword("default")(i)?;
        const_expr(i, cfg)
    })(rest)?;
    let (rest, _) = sym(";")(rest)?;
    Ok((
        rest,
        AnnotationBodyItem::Member {
            type_spec: spec,
            name: name.to_owned(),
            default,
        },
    ))
}

fn annotation_body_item<'a>(input: &'a str, cfg: &GrammarConfig) -> PResult<'a, AnnotationBodyItem> {
    if let Ok((rest, def)) = enum_dcl(input, cfg) {
        let (rest, _) = sym(";")(rest)?;
        return Ok((rest, AnnotationBodyItem::Enum(def)));
    }
    if let Ok((rest, dcl)) = const_dcl(input, cfg) {
        let (rest, _) = sym(";")(rest)?;
        return Ok((rest, AnnotationBodyItem::Const(dcl)));
    }
    if let Ok((rest, dcl)) = typedef_dcl(input, cfg) {
        let (rest, _) = sym(";")(rest)?;
        return Ok((rest, AnnotationBodyItem::Typedef(dcl)));
    }
    annotation_member(input, cfg)
}

fn annotation_dcl<'a>(input: &'a str, cfg: &GrammarConfig) -> PResult<'a, AnnotationDef> {
    let (rest, _) = ws0(input)?;
    let (rest, _) = ch('@')(rest)?;
    let (rest, _) = tag("annotation")(rest)?;
    let (rest, _) = peek(take_while_m_n(1, 1, |c: char| !is_ident_char(c)))(rest)?;
    let (rest, name) = identifier(rest, cfg)?;
    let (rest, _) = sym("{")(rest)?;
    let (rest, body) = many0(|i| annotation_body_item(i, cfg))(rest)?;
    let (rest, _) = sym("}")(rest)?;
    Ok((
        rest,
        AnnotationDef {
            name: name.to_owned(),
            body,
        },
    ))
}

// ---------------------------------------------------------------------------
// top level
// ---------------------------------------------------------------------------

fn preprocessor_directive(input: &str) -> PResult<'_, String> {
    let (rest, _) = ws0(input)?;
    let (rest, _) = ch('#')(rest)?;
    let (rest, text) = take_while(|c| c != '\n')(rest)?;
    Ok((rest, text.trim().to_owned()))
}

fn module_dcl<'a>(input: &'a str, cfg: &GrammarConfig, full: &'a str) -> PResult<'a, ModuleDcl> {
    let (rest, _) = keyword("module")(input)?;
    let (rest, name) = identifier(rest, cfg)?;
    let (rest, _) = sym("{")(rest)?;
    let (rest, definitions) = many1(|i| definition_in(i, cfg, full))(rest)?;
    let (rest, _) = sym("}")(rest)?;
    Ok((
        rest,
        ModuleDcl {
            name: name.to_owned(),
            definitions,
        },
    ))
}

/// Byte offset of `rest` within `full`. All slices handed around by the
/// grammar are subslices of the one input string, so plain pointer
/// arithmetic is exact. Falls back to 0 for foreign slices (unit tests).
fn offset_within(full: &str, rest: &str) -> usize {
    let base = full.as_ptr() as usize;
    let here = rest.as_ptr() as usize;
    here.checked_sub(base).filter(|o| *o <= full.len()).unwrap_or(0)
}

/// One definition: optional annotation applications, a declaration body,
/// and the terminating `;` — or a preprocessor line directive.
///
/// The recorded byte offset is absolute within `full`, the complete input
/// the parse started from (nested module-body definitions included).
pub(crate) fn definition<'a>(input: &'a str, cfg: &GrammarConfig, full: &'a str) -> PResult<'a, Definition> {
    definition_in(input, cfg, full)
}

fn definition_in<'a>(input: &'a str, cfg: &GrammarConfig, full: &'a str) -> PResult<'a, Definition> {
    let (rest, _) = ws0(input)?;
    let offset = offset_within(full, rest);

    if let Ok((after, text)) = preprocessor_directive(rest) {
        return Ok((
            after,
            Definition {
                annotations: Vec::new(),
                body: DefinitionBody::Directive(text),
                offset,
            },
        ));
    }

    let (rest, annotations) = annotation_appls(rest, cfg)?;

    let (rest, body) = if let Ok((after, dcl)) = module_dcl(rest, cfg, full) {
        (after, DefinitionBody::Module(dcl))
    } else if let Ok((after, dcl)) = const_dcl(rest, cfg) {
        (after, DefinitionBody::Const(dcl))
    } else if let Ok((after, def)) = struct_def(rest, cfg) {
        (after, DefinitionBody::Struct(def))
    } else if let Ok((after, name)) = struct_forward_dcl(rest, cfg) {
        (after, DefinitionBody::StructForward(name))
    } else if let Ok((after, def)) = union_def(rest, cfg) {
        (after, DefinitionBody::Union(def))
    } else if let Ok((after, name)) = union_forward_dcl(rest, cfg) {
        (after, DefinitionBody::UnionForward(name))
    } else if let Ok((after, def)) = enum_dcl(rest, cfg) {
        (after, DefinitionBody::Enum(def))
    } else if let Ok((after, def)) = bitset_dcl(rest, cfg) {
        (after, DefinitionBody::Bitset(def))
    } else if let Ok((after, def)) = bitmask_dcl(rest, cfg) {
        (after, DefinitionBody::Bitmask(def))
    } else if let Ok((after, name)) = native_dcl(rest, cfg) {
        (after, DefinitionBody::Native(name))
    } else if let Ok((after, dcl)) = typedef_dcl(rest, cfg) {
        (after, DefinitionBody::Typedef(dcl))
    } else if let Ok((after, def)) = annotation_dcl(rest, cfg) {
        (after, DefinitionBody::Annotation(def))
    } else {
        return err(rest, ErrorKind::Alt);
    };

    let (rest, _) = sym(";")(rest)?;
    Ok((
        rest,
        Definition {
            annotations,
            body,
            offset,
        },
    ))
}

/// Whether only whitespace and comments remain.
pub(crate) fn at_end(input: &str) -> bool {
    match ws0(input) {
        Ok((rest, ())) => rest.is_empty(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CFG: GrammarConfig = GrammarConfig {
        allow_keyword_identifiers: false,
    };

    fn parse_def(input: &str) -> PResult<'_, Definition> {
        definition(input, &CFG, input)
    }

    fn parse_expr(text: &str) -> ConstExpr {
        let (rest, expr) = const_expr(text, &CFG).expect("expression parses");
        assert!(rest.trim().is_empty(), "unparsed input: {rest:?}");
        expr
    }

    #[test]
    fn comments_count_as_whitespace() {
        let (rest, _) = ws0("  // line\n /* block */ x").unwrap();
        assert_eq!(rest, "x");
    }

    #[test]
    fn keywords_are_not_identifiers() {
        assert!(identifier("struct", &CFG).is_err());
        assert!(identifier("structure", &CFG).is_ok(), "prefix of a keyword is fine");
        assert!(identifier("int32", &CFG).is_err(), "soft keyword rejected by default");
        let lenient = GrammarConfig {
            allow_keyword_identifiers: true,
        };
        assert!(identifier("int32", &lenient).is_ok());
        assert!(identifier("struct", &lenient).is_err(), "hard keywords stay reserved");
    }

    #[test]
    fn scoped_names_parse_in_all_forms() {
        let (_, name) = scoped_name("A::B::C", &CFG).unwrap();
        assert_eq!(name.to_string(), "A::B::C");
        let (_, name) = scoped_name("::Root", &CFG).unwrap();
        assert!(name.absolute);
        assert_eq!(name.segments.len(), 1);
    }

    #[test]
    fn integer_literal_radixes() {
        assert_eq!(literal("42").unwrap().1, Literal::UInt(42));
        assert_eq!(literal("017").unwrap().1, Literal::UInt(15));
        assert_eq!(literal("0x1F").unwrap().1, Literal::UInt(31));
        assert_eq!(literal("0").unwrap().1, Literal::UInt(0));
    }

    #[test]
    fn float_and_fixed_literals() {
        assert_eq!(literal("1.5").unwrap().1, Literal::Float(1.5));
        assert_eq!(literal(".5").unwrap().1, Literal::Float(0.5));
        assert_eq!(literal("2e3").unwrap().1, Literal::Float(2000.0));
        assert_eq!(literal("1.5d").unwrap().1, Literal::Fixed(1.5));
        assert_eq!(literal("10D").unwrap().1, Literal::Fixed(10.0));
    }

    #[test]
    fn char_and_string_literals_unescape() {
        assert_eq!(literal("'a'").unwrap().1, Literal::Char('a'));
        assert_eq!(literal(r"'\n'").unwrap().1, Literal::Char('\n'));
        assert_eq!(literal(r"'\x41'").unwrap().1, Literal::Char('A'));
        assert_eq!(literal(r"'\101'").unwrap().1, Literal::Char('A'));
        assert_eq!(literal(r"'A'").unwrap().1, Literal::Char('A'));
        assert_eq!(
            literal(r#""a\tb""#).unwrap().1,
            Literal::String("a\tb".to_owned())
        );
        assert_eq!(
            literal("\"ab\" \"cd\"").unwrap().1,
            Literal::String("abcd".to_owned())
        );
        assert_eq!(literal("L'x'").unwrap().1, Literal::WChar('x'));
        assert_eq!(literal("L\"wide\"").unwrap().1, Literal::WString("wide".to_owned()));
    }

    #[test]
    fn boolean_literals_are_uppercase() {
        assert_eq!(literal("TRUE").unwrap().1, Literal::Bool(true));
        assert_eq!(literal("FALSE").unwrap().1, Literal::Bool(false));
        assert!(literal("true").is_err());
    }

    #[test]
    fn expression_precedence_mul_binds_tighter() {
        let expr = parse_expr("1 + 2 * 3");
        let ConstExpr::Binary(BinaryOp::Add, lhs, rhs) = expr else {
            panic!("expected addition at the top");
        };
        assert_eq!(*lhs, ConstExpr::Literal(Literal::UInt(1)));
        assert!(matches!(*rhs, ConstExpr::Binary(BinaryOp::Mul, _, _)));
    }

    #[test]
    fn parenthesized_expressions_override_precedence() {
        let expr = parse_expr("(1 + 2) * 3");
        assert!(matches!(expr, ConstExpr::Binary(BinaryOp::Mul, _, _)));
    }

    #[test]
    fn unary_minus_wraps_a_literal() {
        let expr = parse_expr("-1");
        let ConstExpr::Unary(UnaryOp::Minus, inner) = expr else {
            panic!("expected unary minus");
        };
        assert_eq!(*inner, ConstExpr::Literal(Literal::UInt(1)));
    }

    #[test]
    fn multiword_primitive_spellings() {
        let (_, spec) = type_spec("unsigned long long", &CFG).unwrap();
        assert_eq!(spec, TypeSpec::Primitive(TypeKind::UInt64));
        let (_, spec) = type_spec("long double", &CFG).unwrap();
        assert_eq!(spec, TypeSpec::Primitive(TypeKind::Float128));
        let (_, spec) = type_spec("long", &CFG).unwrap();
        assert_eq!(spec, TypeSpec::Primitive(TypeKind::Int32));
        let (_, spec) = type_spec("int16", &CFG).unwrap();
        assert_eq!(spec, TypeSpec::Primitive(TypeKind::Int16));
    }

    #[test]
    fn nested_template_types_close_with_single_brackets() {
        let (rest, spec) = type_spec("sequence<sequence<long>>", &CFG).unwrap();
        assert!(rest.is_empty());
        let TypeSpec::Sequence { element, bound } = spec else {
            panic!("expected a sequence");
        };
        assert!(bound.is_none());
        assert!(matches!(*element, TypeSpec::Sequence { .. }));
    }

    #[test]
    fn bounded_collections_carry_their_bounds() {
        let (_, spec) = type_spec("sequence<long, 4>", &CFG).unwrap();
        let TypeSpec::Sequence { bound, .. } = spec else {
            panic!("expected a sequence");
        };
        assert_eq!(bound, Some(ConstExpr::Literal(Literal::UInt(4))));

        let (_, spec) = type_spec("map<string, long, 8>", &CFG).unwrap();
        assert!(matches!(spec, TypeSpec::Map { bound: Some(_), .. }));
    }

    #[test]
    fn annotation_applications_parse_both_param_forms() {
        let (_, appl) = annotation_appl("@id(7)", &CFG).unwrap();
        assert_eq!(appl.name.to_string(), "id");
        assert_eq!(appl.params.len(), 1);
        assert!(appl.params[0].name.is_none());

        let (_, appl) = annotation_appl("@mine(a = 1, b = 2)", &CFG).unwrap();
        assert_eq!(appl.params.len(), 2);
        assert_eq!(appl.params[0].name.as_deref(), Some("a"));

        let (_, appl) = annotation_appl("@mutable", &CFG).unwrap();
        assert!(appl.params.is_empty());

        // builtin names may collide with reserved words
        let (_, appl) = annotation_appl("@default(42)", &CFG).unwrap();
        assert_eq!(appl.name.to_string(), "default");
        let (_, appl) = annotation_appl("@default_literal", &CFG).unwrap();
        assert_eq!(appl.name.to_string(), "default_literal");
    }

    #[test]
    fn definition_parses_a_struct_with_annotations() {
        let input = "@mutable struct M { @id(7) @key long k; long v; };";
        let (rest, def) = definition(input, &CFG, input).unwrap();
        assert!(rest.is_empty());
        assert_eq!(def.annotations.len(), 1);
        let DefinitionBody::Struct(s) = def.body else {
            panic!("expected a struct definition");
        };
        assert_eq!(s.name, "M");
        assert_eq!(s.members.len(), 2);
        assert_eq!(s.members[0].annotations.len(), 2);
    }

    #[test]
    fn struct_forward_is_distinguished_from_definition() {
        let (_, def) = parse_def("struct Fwd;").unwrap();
        assert!(matches!(def.body, DefinitionBody::StructForward(name) if name == "Fwd"));
    }

    #[test]
    fn union_definition_with_multiple_labels() {
        let input = "union U switch(long) { case 1: long a; case 2: case 3: string b; default: boolean c; };";
        let (rest, def) = definition(input, &CFG, input).unwrap();
        assert!(rest.is_empty());
        let DefinitionBody::Union(u) = def.body else {
            panic!("expected a union definition");
        };
        assert_eq!(u.cases.len(), 3);
        assert_eq!(u.cases[1].labels.len(), 2);
        assert!(matches!(u.cases[2].labels[0], CaseLabel::Default));
    }

    #[test]
    fn typedef_with_array_declarator() {
        let (_, def) = parse_def("typedef long Matrix[3][4];").unwrap();
        let DefinitionBody::Typedef(t) = def.body else {
            panic!("expected a typedef");
        };
        assert_eq!(t.declarators.len(), 1);
        assert_eq!(t.declarators[0].array_dims.len(), 2);
    }

    #[test]
    fn annotation_declaration_is_not_an_application() {
        let input = "@annotation MyAnn { long value default 0; };";
        let (rest, def) = definition(input, &CFG, input).unwrap();
        assert!(rest.is_empty());
        assert!(def.annotations.is_empty());
        let DefinitionBody::Annotation(a) = def.body else {
            panic!("expected an annotation declaration");
        };
        assert_eq!(a.name, "MyAnn");
        assert_eq!(a.body.len(), 1);
    }

    #[test]
    fn module_nests_definitions() {
        let input = "module A { module B { const long K = 1; }; };";
        let (rest, def) = definition(input, &CFG, input).unwrap();
        assert!(rest.is_empty());
        let DefinitionBody::Module(m) = def.body else {
            panic!("expected a module");
        };
        assert_eq!(m.name, "A");
        assert_eq!(m.definitions.len(), 1);
    }

    #[test]
    fn preprocessor_directives_are_definitions() {
        let (rest, def) = parse_def("# 1 \"file.idl\"\nstruct S {};").unwrap();
        assert!(matches!(def.body, DefinitionBody::Directive(_)));
        assert!(rest.contains("struct"));
    }

    #[test]
    fn struct_inheritance_allows_absolute_base() {
        let (_, def) = parse_def("struct D : ::base::B { long x; };").unwrap();
        let DefinitionBody::Struct(s) = def.body else {
            panic!("expected a struct definition");
        };
        let base = s.base.expect("base parsed");
        assert!(base.absolute);
        assert_eq!(base.to_string(), "::base::B");
    }

    #[test]
    fn bitset_and_bitmask_parse() {
        let input = "bitset B { bitfield<3> a; bitfield<1, boolean> b; bitfield<4>; };";
        let (_, def) = definition(input, &CFG, input).unwrap();
        let DefinitionBody::Bitset(b) = def.body else {
            panic!("expected a bitset");
        };
        assert_eq!(b.bitfields.len(), 3);
        assert!(b.bitfields[2].names.is_empty(), "padding bitfield has no name");

        let (_, def) = parse_def("bitmask Flags { A, B, @position(5) C };").unwrap();
        let DefinitionBody::Bitmask(m) = def.body else {
            panic!("expected a bitmask");
        };
        assert_eq!(m.values.len(), 3);
        assert_eq!(m.values[2].annotations.len(), 1);
    }
}
