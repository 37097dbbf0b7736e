//! Operand codec
//!
//! Every operand is a one-byte [`OperandType`] tag followed by its
//! variant-specific fields. Composite operands recurse through the same entry
//! point, so nesting depth is bounded by the context's limit on both sides.

use crate::error::{EncodingError, FormatError, Result};
use crate::ids::ScopeIds;
use crate::primitive::{IrDecoder, IrEncoder};
use ruby_ir::{
    Label, LocalVariable, Operand, OperandType, RegexpOptions, ScopeRef, TempKind,
    TemporaryVariable, Variable,
};

/// Write-side state for one encode run
#[derive(Debug, Clone, Copy)]
pub struct EncodeContext<'a> {
    ids: &'a ScopeIds,
    max_depth: usize,
}

impl<'a> EncodeContext<'a> {
    pub fn new(ids: &'a ScopeIds, max_depth: usize) -> Self {
        Self { ids, max_depth }
    }

    pub fn encode_scope(&self, enc: &mut IrEncoder, scope: ScopeRef) -> Result<()> {
        let id = self.ids.id_of(scope)?;
        enc.encode_u32(id, "scope id")
    }
}

/// Read-side state for decoding one instruction block
#[derive(Debug, Clone, Copy)]
pub struct DecodeContext {
    scope_count: usize,
    max_depth: usize,
}

impl DecodeContext {
    pub fn new(scope_count: usize, max_depth: usize) -> Self {
        Self {
            scope_count,
            max_depth,
        }
    }

    /// Scope ids resolve against the full header table.
    pub fn decode_scope(&self, dec: &mut IrDecoder<'_>) -> Result<ScopeRef> {
        let offset = dec.position();
        let id = dec.decode_int()?;
        match u32::try_from(id) {
            Ok(index) if (index as usize) < self.scope_count => Ok(ScopeRef::new(index)),
            _ => Err(FormatError::UnknownScope {
                id,
                count: self.scope_count,
                offset,
            }
            .into()),
        }
    }
}

pub fn encode_operand(enc: &mut IrEncoder, ctx: &EncodeContext<'_>, operand: &Operand) -> Result<()> {
    encode_nested(enc, ctx, operand, 0)
}

pub fn encode_operands(
    enc: &mut IrEncoder,
    ctx: &EncodeContext<'_>,
    operands: &[Operand],
) -> Result<()> {
    enc.encode_count(operands.len(), "operand list")?;
    for operand in operands {
        encode_operand(enc, ctx, operand)?;
    }
    Ok(())
}

pub fn encode_variable(enc: &mut IrEncoder, ctx: &EncodeContext<'_>, var: &Variable) -> Result<()> {
    encode_operand(enc, ctx, &Operand::from(var.clone()))
}

pub fn encode_label(enc: &mut IrEncoder, label: &Label) -> Result<()> {
    enc.encode_string(&label.prefix)?;
    enc.encode_u32(label.id, "label id")
}

pub fn encode_local(enc: &mut IrEncoder, local: &LocalVariable) -> Result<()> {
    enc.encode_string(&local.name)?;
    enc.encode_u32(local.depth, "local variable depth")?;
    enc.encode_u32(local.offset, "local variable offset")
}

fn encode_nested(
    enc: &mut IrEncoder,
    ctx: &EncodeContext<'_>,
    operand: &Operand,
    depth: usize,
) -> Result<()> {
    if depth >= ctx.max_depth {
        return Err(EncodingError::NestingTooDeep {
            limit: ctx.max_depth,
        }
        .into());
    }
    enc.write_u8(operand.operand_type().to_byte());
    let inner = depth + 1;

    match operand {
        Operand::Nil
        | Operand::StandardError
        | Operand::UndefinedValue
        | Operand::SelfValue => {}

        Operand::Fixnum(value) | Operand::UnboxedFixnum(value) => enc.encode_long(*value),
        Operand::Bignum(value) => enc.encode_bignum(value)?,
        Operand::Float(value) | Operand::UnboxedFloat(value) => enc.encode_double(*value),
        Operand::Boolean(value) | Operand::UnboxedBoolean(value) => enc.encode_bool(*value),
        Operand::Str(s) | Operand::FrozenStr(s) | Operand::Symbol(s) => enc.encode_byte_str(s)?,
        Operand::DynamicSymbol(inner_op) | Operand::Splat(inner_op) | Operand::AsString(inner_op) => {
            encode_nested(enc, ctx, inner_op, inner)?
        }
        Operand::Regexp { source, options } => {
            enc.encode_byte_str(source)?;
            enc.encode_u32(options.bits(), "regexp options")?;
        }
        Operand::GlobalVariable(name) => enc.encode_string(name)?,
        Operand::NthRef(n) => enc.encode_u32(*n, "nth-ref index")?,
        Operand::Backref(c) => enc.write_u8(*c),

        Operand::Local(local) => encode_local(enc, local)?,
        // The tag already carries the temporary's kind
        Operand::Temp(temp) => enc.encode_u32(temp.offset, "temporary offset")?,

        Operand::Array(elts) => {
            enc.encode_count(elts.len(), "array")?;
            for elt in elts {
                encode_nested(enc, ctx, elt, inner)?;
            }
        }
        Operand::Hash(pairs) => {
            enc.encode_count(pairs.len(), "hash")?;
            for (key, value) in pairs {
                encode_nested(enc, ctx, key, inner)?;
                encode_nested(enc, ctx, value, inner)?;
            }
        }
        Operand::CompoundString { pieces, encoding } => {
            enc.encode_encoding(*encoding)?;
            enc.encode_count(pieces.len(), "compound string")?;
            for piece in pieces {
                encode_nested(enc, ctx, piece, inner)?;
            }
        }
        Operand::Range {
            begin,
            end,
            exclusive,
        } => {
            encode_nested(enc, ctx, begin, inner)?;
            encode_nested(enc, ctx, end, inner)?;
            enc.encode_bool(*exclusive);
        }

        Operand::CurrentScope { depth: levels } | Operand::ScopeModule { depth: levels } => {
            enc.encode_u32(*levels, "scope depth")?
        }
        Operand::WrappedClosure(scope) => ctx.encode_scope(enc, *scope)?,
        Operand::Label(label) => encode_label(enc, label)?,
    }
    Ok(())
}

pub fn decode_operand(dec: &mut IrDecoder<'_>, ctx: &DecodeContext) -> Result<Operand> {
    decode_nested(dec, ctx, 0)
}

pub fn decode_operands(dec: &mut IrDecoder<'_>, ctx: &DecodeContext) -> Result<Vec<Operand>> {
    let count = dec.decode_count(1)?;
    (0..count).map(|_| decode_operand(dec, ctx)).collect()
}

/// A result slot: any operand tag that names a variable
pub fn decode_variable(dec: &mut IrDecoder<'_>, ctx: &DecodeContext) -> Result<Variable> {
    let offset = dec.position();
    let operand = decode_operand(dec, ctx)?;
    let tag = operand.operand_type().to_byte();
    Variable::try_from(operand).map_err(|_| FormatError::NotAVariable { tag, offset }.into())
}

pub fn decode_label(dec: &mut IrDecoder<'_>) -> Result<Label> {
    let prefix = dec.decode_string()?;
    let id = dec.decode_u32("label id")?;
    Ok(Label::new(prefix, id))
}

pub fn decode_local(dec: &mut IrDecoder<'_>) -> Result<LocalVariable> {
    let name = dec.decode_string()?;
    let depth = dec.decode_u32("local variable depth")?;
    let offset = dec.decode_u32("local variable offset")?;
    Ok(LocalVariable::new(name, depth, offset))
}

fn temp(kind: TempKind, dec: &mut IrDecoder<'_>) -> Result<Operand> {
    let offset = dec.decode_u32("temporary offset")?;
    Ok(Operand::Temp(TemporaryVariable::new(kind, offset)))
}

fn decode_boxed(dec: &mut IrDecoder<'_>, ctx: &DecodeContext, depth: usize) -> Result<Box<Operand>> {
    decode_nested(dec, ctx, depth).map(Box::new)
}

fn decode_nested(dec: &mut IrDecoder<'_>, ctx: &DecodeContext, depth: usize) -> Result<Operand> {
    let offset = dec.position();
    if depth >= ctx.max_depth {
        return Err(FormatError::NestingTooDeep {
            limit: ctx.max_depth,
            offset,
        }
        .into());
    }
    let tag = dec.read_u8()?;
    let ty = OperandType::from_byte(tag).ok_or(FormatError::UnknownOperandTag { tag, offset })?;
    let inner = depth + 1;

    let operand = match ty {
        OperandType::NIL => Operand::Nil,
        OperandType::FIXNUM => Operand::Fixnum(dec.decode_long()?),
        OperandType::BIGNUM => Operand::Bignum(dec.decode_bignum()?),
        OperandType::FLOAT => Operand::Float(dec.decode_double()?),
        OperandType::BOOLEAN => Operand::Boolean(dec.decode_bool()?),
        OperandType::UNBOXED_BOOLEAN => Operand::UnboxedBoolean(dec.decode_bool()?),
        OperandType::UNBOXED_FIXNUM => Operand::UnboxedFixnum(dec.decode_long()?),
        OperandType::UNBOXED_FLOAT => Operand::UnboxedFloat(dec.decode_double()?),
        OperandType::STRING_LITERAL => Operand::Str(dec.decode_byte_str()?),
        OperandType::FROZEN_STRING => Operand::FrozenStr(dec.decode_byte_str()?),
        OperandType::SYMBOL => Operand::Symbol(dec.decode_byte_str()?),
        OperandType::DYNAMIC_SYMBOL => Operand::DynamicSymbol(decode_boxed(dec, ctx, inner)?),
        OperandType::REGEXP => {
            let source = dec.decode_byte_str()?;
            let bits_at = dec.position();
            let bits = dec.decode_u32("regexp options")?;
            let options = RegexpOptions::from_bits(bits).ok_or(FormatError::UnknownFlags {
                bits,
                offset: bits_at,
            })?;
            Operand::Regexp { source, options }
        }
        OperandType::STANDARD_ERROR => Operand::StandardError,
        OperandType::UNDEFINED_VALUE => Operand::UndefinedValue,
        OperandType::GLOBAL_VARIABLE => Operand::GlobalVariable(dec.decode_string()?),
        OperandType::NTH_REF => Operand::NthRef(dec.decode_u32("nth-ref index")?),
        OperandType::BACKREF => Operand::Backref(dec.read_u8()?),

        OperandType::LOCAL_VARIABLE => Operand::Local(decode_local(dec)?),
        OperandType::TEMPORARY_VARIABLE => temp(TempKind::Local, dec)?,
        OperandType::TEMPORARY_BOOLEAN_VARIABLE => temp(TempKind::Boolean, dec)?,
        OperandType::TEMPORARY_FIXNUM_VARIABLE => temp(TempKind::Fixnum, dec)?,
        OperandType::TEMPORARY_FLOAT_VARIABLE => temp(TempKind::Float, dec)?,
        OperandType::TEMPORARY_CLOSURE_VARIABLE => temp(TempKind::Closure, dec)?,
        OperandType::SELF => Operand::SelfValue,

        OperandType::ARRAY => {
            let count = dec.decode_count(1)?;
            let elts = (0..count)
                .map(|_| decode_nested(dec, ctx, inner))
                .collect::<Result<Vec<_>>>()?;
            Operand::Array(elts)
        }
        OperandType::HASH => {
            let count = dec.decode_count(2)?;
            let mut pairs = Vec::with_capacity(count);
            for _ in 0..count {
                let key = decode_nested(dec, ctx, inner)?;
                let value = decode_nested(dec, ctx, inner)?;
                pairs.push((key, value));
            }
            Operand::Hash(pairs)
        }
        OperandType::SPLAT => Operand::Splat(decode_boxed(dec, ctx, inner)?),
        OperandType::COMPOUND_STRING => {
            let encoding = dec.decode_encoding()?;
            let count = dec.decode_count(1)?;
            let pieces = (0..count)
                .map(|_| decode_nested(dec, ctx, inner))
                .collect::<Result<Vec<_>>>()?;
            Operand::CompoundString { pieces, encoding }
        }
        OperandType::AS_STRING => Operand::AsString(decode_boxed(dec, ctx, inner)?),
        OperandType::RANGE => {
            let begin = decode_boxed(dec, ctx, inner)?;
            let end = decode_boxed(dec, ctx, inner)?;
            let exclusive = dec.decode_bool()?;
            Operand::Range {
                begin,
                end,
                exclusive,
            }
        }

        OperandType::CURRENT_SCOPE => Operand::CurrentScope {
            depth: dec.decode_u32("scope depth")?,
        },
        OperandType::SCOPE_MODULE => Operand::ScopeModule {
            depth: dec.decode_u32("scope depth")?,
        },
        OperandType::WRAPPED_CLOSURE => Operand::WrappedClosure(ctx.decode_scope(dec)?),
        OperandType::LABEL => Operand::Label(decode_label(dec)?),
    };
    Ok(operand)
}
