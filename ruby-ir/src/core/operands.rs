//! Operand definitions for Ruby IR instructions
//!
//! Operands form a closed tagged union: constants, variable references,
//! composite values built from nested operands, and scope-relative values.
//! Every variant has a one-byte [`OperandType`] tag used by the persistence
//! layer.

use crate::core::scope::ScopeRef;
use crate::error::{IrError, Result};
use bitflags::bitflags;
use num_bigint::BigInt;
use std::fmt;

/// Wire tag for each operand variant (8 bits)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[allow(non_camel_case_types)]
pub enum OperandType {
    // Constants (0x00 - 0x1F)
    NIL = 0x00,
    FIXNUM = 0x01,
    BIGNUM = 0x02,
    FLOAT = 0x03,
    BOOLEAN = 0x04,
    UNBOXED_BOOLEAN = 0x05,
    UNBOXED_FIXNUM = 0x06,
    UNBOXED_FLOAT = 0x07,
    STRING_LITERAL = 0x08,
    FROZEN_STRING = 0x09,
    SYMBOL = 0x0A,
    DYNAMIC_SYMBOL = 0x0B,
    REGEXP = 0x0C,
    STANDARD_ERROR = 0x0D,
    UNDEFINED_VALUE = 0x0E,
    GLOBAL_VARIABLE = 0x0F,
    NTH_REF = 0x10,
    BACKREF = 0x11,

    // Variables (0x20 - 0x2F)
    LOCAL_VARIABLE = 0x20,
    TEMPORARY_VARIABLE = 0x21,
    TEMPORARY_BOOLEAN_VARIABLE = 0x22,
    TEMPORARY_FIXNUM_VARIABLE = 0x23,
    TEMPORARY_FLOAT_VARIABLE = 0x24,
    TEMPORARY_CLOSURE_VARIABLE = 0x25,
    SELF = 0x26,

    // Composite (0x30 - 0x3F)
    ARRAY = 0x30,
    HASH = 0x31,
    SPLAT = 0x32,
    COMPOUND_STRING = 0x33,
    AS_STRING = 0x34,
    RANGE = 0x35,

    // Scope-relative (0x40 - 0x4F)
    CURRENT_SCOPE = 0x40,
    SCOPE_MODULE = 0x41,
    WRAPPED_CLOSURE = 0x42,
    LABEL = 0x43,
}

impl OperandType {
    /// Parse an operand tag from byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        let ty = match byte {
            0x00 => OperandType::NIL,
            0x01 => OperandType::FIXNUM,
            0x02 => OperandType::BIGNUM,
            0x03 => OperandType::FLOAT,
            0x04 => OperandType::BOOLEAN,
            0x05 => OperandType::UNBOXED_BOOLEAN,
            0x06 => OperandType::UNBOXED_FIXNUM,
            0x07 => OperandType::UNBOXED_FLOAT,
            0x08 => OperandType::STRING_LITERAL,
            0x09 => OperandType::FROZEN_STRING,
            0x0A => OperandType::SYMBOL,
            0x0B => OperandType::DYNAMIC_SYMBOL,
            0x0C => OperandType::REGEXP,
            0x0D => OperandType::STANDARD_ERROR,
            0x0E => OperandType::UNDEFINED_VALUE,
            0x0F => OperandType::GLOBAL_VARIABLE,
            0x10 => OperandType::NTH_REF,
            0x11 => OperandType::BACKREF,

            0x20 => OperandType::LOCAL_VARIABLE,
            0x21 => OperandType::TEMPORARY_VARIABLE,
            0x22 => OperandType::TEMPORARY_BOOLEAN_VARIABLE,
            0x23 => OperandType::TEMPORARY_FIXNUM_VARIABLE,
            0x24 => OperandType::TEMPORARY_FLOAT_VARIABLE,
            0x25 => OperandType::TEMPORARY_CLOSURE_VARIABLE,
            0x26 => OperandType::SELF,

            0x30 => OperandType::ARRAY,
            0x31 => OperandType::HASH,
            0x32 => OperandType::SPLAT,
            0x33 => OperandType::COMPOUND_STRING,
            0x34 => OperandType::AS_STRING,
            0x35 => OperandType::RANGE,

            0x40 => OperandType::CURRENT_SCOPE,
            0x41 => OperandType::SCOPE_MODULE,
            0x42 => OperandType::WRAPPED_CLOSURE,
            0x43 => OperandType::LABEL,

            _ => return None,
        };
        Some(ty)
    }

    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

/// Character encodings a persisted string may carry, looked up by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Encoding {
    #[default]
    Utf8,
    Ascii8Bit,
    UsAscii,
    Utf16Le,
    Utf16Be,
    Utf32Le,
    Utf32Be,
    EucJp,
    ShiftJis,
    Windows31J,
    Iso8859_1,
}

impl Encoding {
    pub const ALL: [Encoding; 11] = [
        Encoding::Utf8,
        Encoding::Ascii8Bit,
        Encoding::UsAscii,
        Encoding::Utf16Le,
        Encoding::Utf16Be,
        Encoding::Utf32Le,
        Encoding::Utf32Be,
        Encoding::EucJp,
        Encoding::ShiftJis,
        Encoding::Windows31J,
        Encoding::Iso8859_1,
    ];

    /// Canonical encoding name, as persisted.
    pub fn name(&self) -> &'static str {
        match self {
            Encoding::Utf8 => "UTF-8",
            Encoding::Ascii8Bit => "ASCII-8BIT",
            Encoding::UsAscii => "US-ASCII",
            Encoding::Utf16Le => "UTF-16LE",
            Encoding::Utf16Be => "UTF-16BE",
            Encoding::Utf32Le => "UTF-32LE",
            Encoding::Utf32Be => "UTF-32BE",
            Encoding::EucJp => "EUC-JP",
            Encoding::ShiftJis => "Shift_JIS",
            Encoding::Windows31J => "Windows-31J",
            Encoding::Iso8859_1 => "ISO-8859-1",
        }
    }

    /// Look up an encoding by name. Matching is case-insensitive and accepts
    /// the `BINARY` and `ASCII` aliases.
    pub fn from_name(name: &str) -> Result<Self> {
        if name.eq_ignore_ascii_case("BINARY") {
            return Ok(Encoding::Ascii8Bit);
        }
        if name.eq_ignore_ascii_case("ASCII") {
            return Ok(Encoding::UsAscii);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|enc| enc.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| IrError::UnknownEncoding(name.to_string()))
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw string bytes tagged with their character encoding
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ByteStr {
    pub bytes: Vec<u8>,
    pub encoding: Encoding,
}

impl ByteStr {
    pub fn new(bytes: impl Into<Vec<u8>>, encoding: Encoding) -> Self {
        Self {
            bytes: bytes.into(),
            encoding,
        }
    }

    pub fn utf8(s: &str) -> Self {
        Self::new(s.as_bytes(), Encoding::Utf8)
    }

    pub fn binary(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(bytes, Encoding::Ascii8Bit)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Display for ByteStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(&self.bytes))
    }
}

bitflags! {
    /// Regular expression compile options
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RegexpOptions: u32 {
        const IGNORECASE = 0b0000_0001;
        const EXTENDED = 0b0000_0010;
        const MULTILINE = 0b0000_0100;
        /// `/o`: interpolate only once
        const ONCE = 0b0000_1000;
        const FIXED_ENCODING = 0b0001_0000;
        const NO_ENCODING = 0b0010_0000;
        const LITERAL = 0b0100_0000;
    }
}

impl fmt::Display for RegexpOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.contains(RegexpOptions::MULTILINE) {
            f.write_str("m")?;
        }
        if self.contains(RegexpOptions::IGNORECASE) {
            f.write_str("i")?;
        }
        if self.contains(RegexpOptions::EXTENDED) {
            f.write_str("x")?;
        }
        if self.contains(RegexpOptions::ONCE) {
            f.write_str("o")?;
        }
        if self.contains(RegexpOptions::NO_ENCODING) {
            f.write_str("n")?;
        }
        Ok(())
    }
}

/// Named local variable: `depth` counts lexical scopes outward from the
/// using scope, `offset` is the slot within that scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocalVariable {
    pub name: String,
    pub depth: u32,
    pub offset: u32,
}

impl LocalVariable {
    pub fn new(name: impl Into<String>, depth: u32, offset: u32) -> Self {
        Self {
            name: name.into(),
            depth,
            offset,
        }
    }
}

impl fmt::Display for LocalVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}:{})", self.name, self.depth, self.offset)
    }
}

/// Kinds of compiler temporaries; each kind is numbered independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TempKind {
    Local,
    Boolean,
    Fixnum,
    Float,
    Closure,
}

impl TempKind {
    fn prefix(&self) -> &'static str {
        match self {
            TempKind::Local => "t",
            TempKind::Boolean => "tbool",
            TempKind::Fixnum => "tfix",
            TempKind::Float => "tflo",
            TempKind::Closure => "tcl",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TemporaryVariable {
    pub kind: TempKind,
    pub offset: u32,
}

impl TemporaryVariable {
    pub const fn new(kind: TempKind, offset: u32) -> Self {
        Self { kind, offset }
    }

    pub const fn local(offset: u32) -> Self {
        Self::new(TempKind::Local, offset)
    }
}

impl fmt::Display for TemporaryVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.prefix(), self.offset)
    }
}

/// Jump target within one scope
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Label {
    pub prefix: String,
    pub id: u32,
}

impl Label {
    pub fn new(prefix: impl Into<String>, id: u32) -> Self {
        Self {
            prefix: prefix.into(),
            id,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.prefix, self.id)
    }
}

/// The subset of operands an instruction may bind its result to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Variable {
    Local(LocalVariable),
    Temp(TemporaryVariable),
    SelfValue,
}

impl Variable {
    pub const fn temp(offset: u32) -> Self {
        Variable::Temp(TemporaryVariable::local(offset))
    }

    pub fn local(name: impl Into<String>, depth: u32, offset: u32) -> Self {
        Variable::Local(LocalVariable::new(name, depth, offset))
    }
}

impl From<Variable> for Operand {
    fn from(var: Variable) -> Self {
        match var {
            Variable::Local(local) => Operand::Local(local),
            Variable::Temp(temp) => Operand::Temp(temp),
            Variable::SelfValue => Operand::SelfValue,
        }
    }
}

impl TryFrom<Operand> for Variable {
    /// The operand is handed back when it is not a variable.
    type Error = Operand;

    fn try_from(operand: Operand) -> std::result::Result<Self, Self::Error> {
        match operand {
            Operand::Local(local) => Ok(Variable::Local(local)),
            Operand::Temp(temp) => Ok(Variable::Temp(temp)),
            Operand::SelfValue => Ok(Variable::SelfValue),
            other => Err(other),
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variable::Local(local) => local.fmt(f),
            Variable::Temp(temp) => temp.fmt(f),
            Variable::SelfValue => f.write_str("%self"),
        }
    }
}

/// A value or reference consumed by instructions
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    // Constants
    Nil,
    Fixnum(i64),
    Bignum(BigInt),
    Float(f64),
    Boolean(bool),
    UnboxedBoolean(bool),
    UnboxedFixnum(i64),
    UnboxedFloat(f64),
    Str(ByteStr),
    FrozenStr(ByteStr),
    Symbol(ByteStr),
    /// Symbol built at runtime from a compound string
    DynamicSymbol(Box<Operand>),
    Regexp {
        source: ByteStr,
        options: RegexpOptions,
    },
    StandardError,
    UndefinedValue,
    GlobalVariable(String),
    /// `$1`, `$2`, ...
    NthRef(u32),
    /// `$&`, `` $` ``, `$'`, `$+`
    Backref(u8),

    // Variables
    Local(LocalVariable),
    Temp(TemporaryVariable),
    SelfValue,

    // Composite
    Array(Vec<Operand>),
    Hash(Vec<(Operand, Operand)>),
    Splat(Box<Operand>),
    CompoundString {
        pieces: Vec<Operand>,
        encoding: Option<Encoding>,
    },
    AsString(Box<Operand>),
    Range {
        begin: Box<Operand>,
        end: Box<Operand>,
        exclusive: bool,
    },

    // Scope-relative
    CurrentScope {
        depth: u32,
    },
    ScopeModule {
        depth: u32,
    },
    WrappedClosure(ScopeRef),
    Label(Label),
}

impl Operand {
    pub fn string(s: &str) -> Self {
        Operand::Str(ByteStr::utf8(s))
    }

    pub fn frozen_string(s: &str) -> Self {
        Operand::FrozenStr(ByteStr::utf8(s))
    }

    pub fn symbol(s: &str) -> Self {
        Operand::Symbol(ByteStr::utf8(s))
    }

    pub const fn temp(offset: u32) -> Self {
        Operand::Temp(TemporaryVariable::local(offset))
    }

    pub fn local(name: impl Into<String>, depth: u32, offset: u32) -> Self {
        Operand::Local(LocalVariable::new(name, depth, offset))
    }

    pub fn splat(inner: Operand) -> Self {
        Operand::Splat(Box::new(inner))
    }

    /// Wire tag for this operand
    pub fn operand_type(&self) -> OperandType {
        match self {
            Operand::Nil => OperandType::NIL,
            Operand::Fixnum(_) => OperandType::FIXNUM,
            Operand::Bignum(_) => OperandType::BIGNUM,
            Operand::Float(_) => OperandType::FLOAT,
            Operand::Boolean(_) => OperandType::BOOLEAN,
            Operand::UnboxedBoolean(_) => OperandType::UNBOXED_BOOLEAN,
            Operand::UnboxedFixnum(_) => OperandType::UNBOXED_FIXNUM,
            Operand::UnboxedFloat(_) => OperandType::UNBOXED_FLOAT,
            Operand::Str(_) => OperandType::STRING_LITERAL,
            Operand::FrozenStr(_) => OperandType::FROZEN_STRING,
            Operand::Symbol(_) => OperandType::SYMBOL,
            Operand::DynamicSymbol(_) => OperandType::DYNAMIC_SYMBOL,
            Operand::Regexp { .. } => OperandType::REGEXP,
            Operand::StandardError => OperandType::STANDARD_ERROR,
            Operand::UndefinedValue => OperandType::UNDEFINED_VALUE,
            Operand::GlobalVariable(_) => OperandType::GLOBAL_VARIABLE,
            Operand::NthRef(_) => OperandType::NTH_REF,
            Operand::Backref(_) => OperandType::BACKREF,
            Operand::Local(_) => OperandType::LOCAL_VARIABLE,
            Operand::Temp(temp) => match temp.kind {
                TempKind::Local => OperandType::TEMPORARY_VARIABLE,
                TempKind::Boolean => OperandType::TEMPORARY_BOOLEAN_VARIABLE,
                TempKind::Fixnum => OperandType::TEMPORARY_FIXNUM_VARIABLE,
                TempKind::Float => OperandType::TEMPORARY_FLOAT_VARIABLE,
                TempKind::Closure => OperandType::TEMPORARY_CLOSURE_VARIABLE,
            },
            Operand::SelfValue => OperandType::SELF,
            Operand::Array(_) => OperandType::ARRAY,
            Operand::Hash(_) => OperandType::HASH,
            Operand::Splat(_) => OperandType::SPLAT,
            Operand::CompoundString { .. } => OperandType::COMPOUND_STRING,
            Operand::AsString(_) => OperandType::AS_STRING,
            Operand::Range { .. } => OperandType::RANGE,
            Operand::CurrentScope { .. } => OperandType::CURRENT_SCOPE,
            Operand::ScopeModule { .. } => OperandType::SCOPE_MODULE,
            Operand::WrappedClosure(_) => OperandType::WRAPPED_CLOSURE,
            Operand::Label(_) => OperandType::LABEL,
        }
    }

    pub fn is_variable(&self) -> bool {
        matches!(
            self,
            Operand::Local(_) | Operand::Temp(_) | Operand::SelfValue
        )
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Nil => f.write_str("nil"),
            Operand::Fixnum(v) => write!(f, "{v}"),
            Operand::Bignum(v) => write!(f, "{v}"),
            Operand::Float(v) => write!(f, "{v:?}"),
            Operand::Boolean(v) => write!(f, "{v}"),
            Operand::UnboxedBoolean(v) => write!(f, "{v}<unboxed>"),
            Operand::UnboxedFixnum(v) => write!(f, "{v}<unboxed>"),
            Operand::UnboxedFloat(v) => write!(f, "{v:?}<unboxed>"),
            Operand::Str(s) => write!(f, "{s}"),
            Operand::FrozenStr(s) => write!(f, "frozen:{s}"),
            Operand::Symbol(s) => write!(f, ":{}", String::from_utf8_lossy(&s.bytes)),
            Operand::DynamicSymbol(inner) => write!(f, ":{inner}"),
            Operand::Regexp { source, options } => {
                write!(f, "/{}/{options}", String::from_utf8_lossy(&source.bytes))
            }
            Operand::StandardError => f.write_str("StandardError"),
            Operand::UndefinedValue => f.write_str("%undefined"),
            Operand::GlobalVariable(name) => write!(f, "{name}"),
            Operand::NthRef(n) => write!(f, "${n}"),
            Operand::Backref(c) => write!(f, "${}", *c as char),
            Operand::Local(local) => local.fmt(f),
            Operand::Temp(temp) => temp.fmt(f),
            Operand::SelfValue => f.write_str("%self"),
            Operand::Array(elts) => {
                f.write_str("[")?;
                write_list(f, elts)?;
                f.write_str("]")
            }
            Operand::Hash(pairs) => {
                f.write_str("{")?;
                for (idx, (key, value)) in pairs.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key} => {value}")?;
                }
                f.write_str("}")
            }
            Operand::Splat(inner) => write!(f, "*{inner}"),
            Operand::CompoundString { pieces, .. } => {
                f.write_str("str(")?;
                write_list(f, pieces)?;
                f.write_str(")")
            }
            Operand::AsString(inner) => write!(f, "to_s({inner})"),
            Operand::Range {
                begin,
                end,
                exclusive,
            } => {
                let dots = if *exclusive { "..." } else { ".." };
                write!(f, "({begin}{dots}{end})")
            }
            Operand::CurrentScope { depth } => write!(f, "%scope<{depth}>"),
            Operand::ScopeModule { depth } => write!(f, "%module<{depth}>"),
            Operand::WrappedClosure(scope) => write!(f, "closure<{scope}>"),
            Operand::Label(label) => label.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operand_tags_are_distinct_and_parse_back() {
        let mut seen = 0;
        for byte in 0..=u8::MAX {
            if let Some(ty) = OperandType::from_byte(byte) {
                assert_eq!(ty.to_byte(), byte);
                seen += 1;
            }
        }
        assert_eq!(seen, 35);
    }

    #[test]
    fn test_temp_kind_selects_tag() {
        let op = Operand::Temp(TemporaryVariable::new(TempKind::Float, 3));
        assert_eq!(op.operand_type(), OperandType::TEMPORARY_FLOAT_VARIABLE);
        assert_eq!(op.to_string(), "tflo3");
    }

    #[test]
    fn test_encoding_lookup() {
        assert_eq!(Encoding::from_name("UTF-8").unwrap(), Encoding::Utf8);
        assert_eq!(Encoding::from_name("utf-8").unwrap(), Encoding::Utf8);
        assert_eq!(Encoding::from_name("BINARY").unwrap(), Encoding::Ascii8Bit);
        for enc in Encoding::ALL {
            assert_eq!(Encoding::from_name(enc.name()).unwrap(), enc);
        }
        assert!(matches!(
            Encoding::from_name("KLINGON"),
            Err(IrError::UnknownEncoding(_))
        ));
    }

    #[test]
    fn test_variable_conversion() {
        let var = Variable::temp(0);
        let op: Operand = var.clone().into();
        assert_eq!(Variable::try_from(op).unwrap(), var);
        assert_eq!(Variable::try_from(Operand::Nil), Err(Operand::Nil));
    }

    #[test]
    fn test_operand_display() {
        let hash = Operand::Hash(vec![(Operand::symbol("a"), Operand::Fixnum(1))]);
        assert_eq!(hash.to_string(), "{:a => 1}");
        let arr = Operand::Array(vec![Operand::Nil, Operand::splat(Operand::temp(2))]);
        assert_eq!(arr.to_string(), "[nil, *t2]");
        let re = Operand::Regexp {
            source: ByteStr::utf8("a+"),
            options: RegexpOptions::IGNORECASE,
        };
        assert_eq!(re.to_string(), "/a+/i");
    }
}
