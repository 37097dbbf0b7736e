//! Instruction codec
//!
//! An instruction is its operation byte, the result variable when the
//! operation binds one, then that operation's fixed field sequence. Field
//! order is the declaration order of the matching [`InstrKind`] variant.
//!
//! Call-like instructions pack their argument count with the presence of a
//! closure: `n` plain arguments are written as `n`, and as `-(n + 1)` when a
//! closure operand follows the arguments.

use crate::error::{EncodingError, FormatError, PersistError, Result};
use crate::operand::{
    DecodeContext, EncodeContext, decode_label, decode_local, decode_operand, decode_operands,
    decode_variable, encode_label, encode_local, encode_operand, encode_operands, encode_variable,
};
use crate::primitive::{IrDecoder, IrEncoder};
use ruby_ir::{
    CallBase, CallType, Encoding, Instr, InstrKind, Label, LocalVariable, Operand, Operation,
    RegexpOptions, RuntimeHelper, ScopeRef, Variable,
};

/// Instruction count followed by the instructions
pub fn encode_block(enc: &mut IrEncoder, ctx: &EncodeContext<'_>, instrs: &[Instr]) -> Result<()> {
    enc.encode_count(instrs.len(), "instruction block")?;
    for instr in instrs {
        encode_instr(enc, ctx, instr)?;
    }
    Ok(())
}

pub fn decode_block(dec: &mut IrDecoder<'_>, ctx: &DecodeContext) -> Result<Vec<Instr>> {
    let count = dec.decode_count(1)?;
    (0..count).map(|_| decode_instr(dec, ctx)).collect()
}

pub fn encode_instr(enc: &mut IrEncoder, ctx: &EncodeContext<'_>, instr: &Instr) -> Result<()> {
    let op = instr.operation();
    match (op.has_result(), &instr.result) {
        (true, None) => return Err(EncodingError::MissingResult(op).into()),
        (false, Some(_)) => return Err(EncodingError::UnexpectedResult(op).into()),
        _ => {}
    }

    enc.write_u8(op.to_byte());
    if let Some(result) = &instr.result {
        encode_variable(enc, ctx, result)?;
    }
    FieldWriter { enc, ctx }.write(&instr.kind)
}

pub fn decode_instr(dec: &mut IrDecoder<'_>, ctx: &DecodeContext) -> Result<Instr> {
    let offset = dec.position();
    let byte = dec.read_u8()?;
    let op = Operation::from_byte(byte).map_err(|err| PersistError::from_code_lookup(err, offset))?;

    let result: Option<Variable> = if op.has_result() {
        Some(decode_variable(dec, ctx)?)
    } else {
        None
    };
    let kind = FieldReader { dec, ctx }.read(op)?;
    Ok(Instr { result, kind })
}

struct FieldWriter<'a, 'c> {
    enc: &'a mut IrEncoder,
    ctx: &'a EncodeContext<'c>,
}

impl FieldWriter<'_, '_> {
    fn operand(&mut self, operand: &Operand) -> Result<()> {
        encode_operand(self.enc, self.ctx, operand)
    }

    fn operands(&mut self, operands: &[Operand]) -> Result<()> {
        encode_operands(self.enc, self.ctx, operands)
    }

    fn label(&mut self, label: &Label) -> Result<()> {
        encode_label(self.enc, label)
    }

    fn local(&mut self, local: &LocalVariable) -> Result<()> {
        encode_local(self.enc, local)
    }

    fn scope(&mut self, scope: ScopeRef) -> Result<()> {
        self.ctx.encode_scope(self.enc, scope)
    }

    fn string(&mut self, value: &str) -> Result<()> {
        self.enc.encode_string(value)
    }

    fn u32(&mut self, value: u32, what: &'static str) -> Result<()> {
        self.enc.encode_u32(value, what)
    }

    fn bool(&mut self, value: bool) {
        self.enc.encode_bool(value)
    }

    fn call_args(&mut self, args: &[Operand], closure: Option<&Operand>) -> Result<()> {
        let count = i32::try_from(args.len())
            .ok()
            .filter(|n| *n < i32::MAX)
            .ok_or(EncodingError::TooLarge {
                what: "call arguments",
                len: args.len() as u64,
            })?;
        let arity = if closure.is_some() { -(count + 1) } else { count };
        self.enc.encode_int(arity);
        for arg in args {
            self.operand(arg)?;
        }
        if let Some(closure) = closure {
            self.operand(closure)?;
        }
        Ok(())
    }

    fn call(&mut self, call: &CallBase) -> Result<()> {
        self.enc.write_u8(call.call_type.to_byte());
        self.string(&call.name)?;
        self.operand(&call.receiver)?;
        self.call_args(&call.args, call.closure.as_ref())
    }

    fn write(mut self, kind: &InstrKind) -> Result<()> {
        match kind {
            InstrKind::Nop
            | InstrKind::RecvSelf
            | InstrKind::RecvClosure
            | InstrKind::RecvRubyExc
            | InstrKind::RecvJrubyExc
            | InstrKind::ArgScopeDepth
            | InstrKind::PushFrame
            | InstrKind::PopFrame
            | InstrKind::PushBinding
            | InstrKind::PopBinding
            | InstrKind::ExcRegionEnd
            | InstrKind::GetErrorInfo
            | InstrKind::LoadFrameClosure
            | InstrKind::LoadImplicitClosure => {}

            // Control flow
            InstrKind::Jump { target } => self.label(target)?,
            InstrKind::Label { label } => self.label(label)?,
            InstrKind::BEq { arg1, arg2, target } | InstrKind::BNe { arg1, arg2, target } => {
                self.operand(arg1)?;
                self.operand(arg2)?;
                self.label(target)?;
            }
            InstrKind::BFalse { arg, target }
            | InstrKind::BTrue { arg, target }
            | InstrKind::BNil { arg, target }
            | InstrKind::BUndef { arg, target } => {
                self.operand(arg)?;
                self.label(target)?;
            }
            InstrKind::Return { value } | InstrKind::ClosureReturn { value } => {
                self.operand(value)?
            }
            InstrKind::Break { value, scope_name } => {
                self.operand(value)?;
                self.string(scope_name)?;
            }
            InstrKind::NonlocalReturn { value, method_name } => {
                self.operand(value)?;
                self.string(method_name)?;
            }
            InstrKind::Throw { exception } => self.operand(exception)?,
            InstrKind::ThreadPoll { on_back_edge } => self.bool(*on_back_edge),
            InstrKind::LineNum { line } => self.u32(*line, "line number")?,

            // Values and builders
            InstrKind::Copy { source } | InstrKind::ReifyClosure { source } => {
                self.operand(source)?
            }
            InstrKind::LoadConst { value } => self.operand(value)?,
            InstrKind::Not { arg } | InstrKind::RestoreErrorInfo { arg } => self.operand(arg)?,
            InstrKind::BuildCompoundArray {
                appending,
                appended,
                is_args_push,
            } => {
                self.operand(appending)?;
                self.operand(appended)?;
                self.bool(*is_args_push);
            }
            InstrKind::BuildCompoundString { encoding, pieces } => {
                self.enc.encode_encoding(*encoding)?;
                self.operands(pieces)?;
            }
            InstrKind::BuildDynRegexp { pieces, options } => {
                self.operands(pieces)?;
                self.u32(options.bits(), "regexp options")?;
            }
            InstrKind::BuildRange {
                begin,
                end,
                exclusive,
            } => {
                self.operand(begin)?;
                self.operand(end)?;
                self.bool(*exclusive);
            }
            InstrKind::BuildSplat { array } | InstrKind::ToAry { array } => self.operand(array)?,
            InstrKind::BacktickString { pieces } => self.operands(pieces)?,
            InstrKind::Eqq { arg1, arg2 } | InstrKind::RescueEqq { arg1, arg2 } => {
                self.operand(arg1)?;
                self.operand(arg2)?;
            }
            InstrKind::GetEncoding { encoding } => self.enc.encode_encoding(Some(*encoding))?,

            // Calls
            InstrKind::Call(call)
            | InstrKind::NoResultCall(call)
            | InstrKind::ClassSuper(call)
            | InstrKind::InstanceSuper(call) => self.call(call)?,
            InstrKind::AttrAssign {
                receiver,
                name,
                args,
            } => {
                self.operand(receiver)?;
                self.string(name)?;
                self.operands(args)?;
            }
            InstrKind::UnresolvedSuper {
                call_type,
                receiver,
                args,
                closure,
            } => {
                self.enc.write_u8(call_type.to_byte());
                self.operand(receiver)?;
                self.call_args(args, closure.as_ref())?;
            }
            InstrKind::ZSuper {
                receiver,
                args,
                closure,
            } => {
                self.operand(receiver)?;
                self.call_args(args, closure.as_ref())?;
            }
            InstrKind::Yield {
                block,
                arg,
                unwrap_array,
            } => {
                self.operand(block)?;
                self.operand(arg)?;
                self.bool(*unwrap_array);
            }
            InstrKind::RuntimeHelper { helper, args } => {
                self.enc.write_u8(helper.to_byte());
                self.operands(args)?;
            }
            InstrKind::BlockGiven { block } => self.operand(block)?,
            InstrKind::CheckForLje { maybe_lambda } => self.bool(*maybe_lambda),
            InstrKind::Lambda { body, file, line } => {
                self.operand(body)?;
                self.string(file)?;
                self.u32(*line, "line number")?;
            }

            // Argument receiving
            InstrKind::RecvPreReqdArg { index } => self.u32(*index, "argument index")?,
            InstrKind::RecvPostReqdArg {
                index,
                pre_reqd,
                post_reqd,
            } => {
                self.u32(*index, "argument index")?;
                self.u32(*pre_reqd, "required count")?;
                self.u32(*post_reqd, "required count")?;
            }
            InstrKind::RecvOptArg {
                required_args,
                pre_args,
                index,
            } => {
                self.u32(*required_args, "required count")?;
                self.u32(*pre_args, "required count")?;
                self.u32(*index, "argument index")?;
            }
            InstrKind::RecvRestArg { required, index } => {
                self.u32(*required, "required count")?;
                self.u32(*index, "argument index")?;
            }
            InstrKind::RecvKwArg { name, required } => {
                self.string(name)?;
                self.u32(*required, "required count")?;
            }
            InstrKind::RecvKwRestArg { required } => self.u32(*required, "required count")?,
            InstrKind::CheckArity {
                required,
                opt,
                rest,
                receives_keywords,
            } => {
                self.u32(*required, "required count")?;
                self.u32(*opt, "optional count")?;
                self.bool(*rest);
                self.bool(*receives_keywords);
            }
            InstrKind::CheckArgsArrayArity {
                args_array,
                required,
                opt,
                rest,
            } => {
                self.operand(args_array)?;
                self.u32(*required, "required count")?;
                self.u32(*opt, "optional count")?;
                self.bool(*rest);
            }
            InstrKind::RaiseArgumentError {
                required,
                opt,
                rest,
                num_args,
            } => {
                self.u32(*required, "required count")?;
                self.u32(*opt, "optional count")?;
                self.enc.encode_int(*rest);
                self.u32(*num_args, "argument count")?;
            }

            // Multiple assignment
            InstrKind::MasgnOpt {
                array,
                index,
                min_args_length,
            } => {
                self.operand(array)?;
                self.u32(*index, "element index")?;
                self.u32(*min_args_length, "argument count")?;
            }
            InstrKind::MasgnReqd {
                array,
                pre,
                post,
                index,
            }
            | InstrKind::MasgnRest {
                array,
                pre,
                post,
                index,
            } => {
                self.operand(array)?;
                self.u32(*pre, "required count")?;
                self.u32(*post, "required count")?;
                self.u32(*index, "element index")?;
            }

            // Variable access
            InstrKind::BindingLoad { scope, local } => {
                self.scope(*scope)?;
                self.local(local)?;
            }
            InstrKind::BindingStore {
                scope,
                local,
                value,
            } => {
                self.scope(*scope)?;
                self.local(local)?;
                self.operand(value)?;
            }
            InstrKind::GetField { source, name } | InstrKind::GetCvar { source, name } => {
                self.operand(source)?;
                self.string(name)?;
            }
            InstrKind::PutField {
                target,
                name,
                value,
            }
            | InstrKind::PutCvar {
                target,
                name,
                value,
            }
            | InstrKind::PutConst {
                target,
                name,
                value,
            } => {
                self.operand(target)?;
                self.string(name)?;
                self.operand(value)?;
            }
            InstrKind::ClassVarModule {
                starting_scope,
                object,
            } => {
                self.operand(starting_scope)?;
                self.operand(object)?;
            }
            InstrKind::GetGlobalVar { name } => self.string(name)?,
            InstrKind::PutGlobalVar { name, value } => {
                self.string(name)?;
                self.operand(value)?;
            }
            InstrKind::GvarAlias { new_name, old_name } | InstrKind::Alias { new_name, old_name } => {
                self.operand(new_name)?;
                self.operand(old_name)?;
            }
            InstrKind::SetCapturedVar {
                match2_result,
                var_name,
            } => {
                self.operand(match2_result)?;
                self.string(var_name)?;
            }

            // Constants
            InstrKind::SearchConst {
                name,
                starting_scope,
                no_private_consts,
            } => {
                self.string(name)?;
                self.operand(starting_scope)?;
                self.bool(*no_private_consts);
            }
            InstrKind::LexicalSearchConst {
                defining_scope,
                name,
            } => {
                self.operand(defining_scope)?;
                self.string(name)?;
            }
            InstrKind::InheritanceSearchConst {
                current_module,
                name,
                no_private_consts,
            } => {
                self.operand(current_module)?;
                self.string(name)?;
                self.bool(*no_private_consts);
            }
            InstrKind::ConstMissing {
                receiver,
                missing_const,
            } => {
                self.operand(receiver)?;
                self.string(missing_const)?;
            }

            // Definitions
            InstrKind::DefClass {
                body,
                container,
                superclass,
            } => {
                self.scope(*body)?;
                self.operand(container)?;
                self.operand(superclass)?;
            }
            InstrKind::DefModule { body, container } => {
                self.scope(*body)?;
                self.operand(container)?;
            }
            InstrKind::DefMetaClass { object, body } => {
                self.operand(object)?;
                self.scope(*body)?;
            }
            InstrKind::DefInstMeth { method } => self.scope(*method)?,
            InstrKind::DefClassMeth { container, method } => {
                self.operand(container)?;
                self.scope(*method)?;
            }
            InstrKind::ProcessModuleBody { module_body, block } => {
                self.operand(module_body)?;
                self.operand(block)?;
            }
            InstrKind::UndefMethod { method_name } => self.operand(method_name)?,
            InstrKind::RecordEndBlock {
                declaring_scope,
                end_block,
            } => {
                self.scope(*declaring_scope)?;
                self.operand(end_block)?;
            }

            InstrKind::ExcRegionStart { first_rescue } => self.label(first_rescue)?,

            // Regexp matching
            InstrKind::Match { receiver } => self.operand(receiver)?,
            InstrKind::Match2 { receiver, arg } | InstrKind::Match3 { receiver, arg } => {
                self.operand(receiver)?;
                self.operand(arg)?;
            }
        }
        Ok(())
    }
}

struct FieldReader<'a, 'b> {
    dec: &'a mut IrDecoder<'b>,
    ctx: &'a DecodeContext,
}

impl FieldReader<'_, '_> {
    fn operand(&mut self) -> Result<Operand> {
        decode_operand(self.dec, self.ctx)
    }

    fn operands(&mut self) -> Result<Vec<Operand>> {
        decode_operands(self.dec, self.ctx)
    }

    fn label(&mut self) -> Result<Label> {
        decode_label(self.dec)
    }

    fn local(&mut self) -> Result<LocalVariable> {
        decode_local(self.dec)
    }

    fn scope(&mut self) -> Result<ScopeRef> {
        self.ctx.decode_scope(self.dec)
    }

    fn string(&mut self) -> Result<String> {
        self.dec.decode_string()
    }

    fn u32(&mut self, what: &'static str) -> Result<u32> {
        self.dec.decode_u32(what)
    }

    fn bool(&mut self) -> Result<bool> {
        self.dec.decode_bool()
    }

    fn call_type(&mut self) -> Result<CallType> {
        let offset = self.dec.position();
        CallType::from_byte(self.dec.read_u8()?)
            .map_err(|err| PersistError::from_code_lookup(err, offset))
    }

    fn call_args(&mut self) -> Result<(Vec<Operand>, Option<Operand>)> {
        let offset = self.dec.position();
        let arity = i64::from(self.dec.decode_int()?);
        let (count, has_closure) = if arity < 0 {
            (-arity - 1, true)
        } else {
            (arity, false)
        };
        let count = count as usize;
        if count > self.dec.remaining() {
            return Err(FormatError::LengthOverrun { len: count, offset }.into());
        }

        let args = (0..count)
            .map(|_| self.operand())
            .collect::<Result<Vec<_>>>()?;
        let closure = if has_closure {
            Some(self.operand()?)
        } else {
            None
        };
        Ok((args, closure))
    }

    fn call(&mut self) -> Result<CallBase> {
        let call_type = self.call_type()?;
        let name = self.string()?;
        let receiver = self.operand()?;
        let (args, closure) = self.call_args()?;
        Ok(CallBase {
            call_type,
            name,
            receiver,
            args,
            closure,
        })
    }

    fn regexp_options(&mut self) -> Result<RegexpOptions> {
        let offset = self.dec.position();
        let bits = self.u32("regexp options")?;
        RegexpOptions::from_bits(bits)
            .ok_or_else(|| FormatError::UnknownFlags { bits, offset }.into())
    }

    fn runtime_helper(&mut self) -> Result<RuntimeHelper> {
        let offset = self.dec.position();
        RuntimeHelper::from_byte(self.dec.read_u8()?)
            .map_err(|err| PersistError::from_code_lookup(err, offset))
    }

    fn encoding(&mut self) -> Result<Encoding> {
        self.dec.decode_required_encoding()
    }

    fn read(mut self, op: Operation) -> Result<InstrKind> {
        let kind = match op {
            // Control flow
            Operation::NOP => InstrKind::Nop,
            Operation::JUMP => InstrKind::Jump {
                target: self.label()?,
            },
            Operation::LABEL => InstrKind::Label {
                label: self.label()?,
            },
            Operation::BEQ => InstrKind::BEq {
                arg1: self.operand()?,
                arg2: self.operand()?,
                target: self.label()?,
            },
            Operation::BNE => InstrKind::BNe {
                arg1: self.operand()?,
                arg2: self.operand()?,
                target: self.label()?,
            },
            Operation::B_FALSE => InstrKind::BFalse {
                arg: self.operand()?,
                target: self.label()?,
            },
            Operation::B_TRUE => InstrKind::BTrue {
                arg: self.operand()?,
                target: self.label()?,
            },
            Operation::B_NIL => InstrKind::BNil {
                arg: self.operand()?,
                target: self.label()?,
            },
            Operation::B_UNDEF => InstrKind::BUndef {
                arg: self.operand()?,
                target: self.label()?,
            },
            Operation::RETURN => InstrKind::Return {
                value: self.operand()?,
            },
            Operation::BREAK => InstrKind::Break {
                value: self.operand()?,
                scope_name: self.string()?,
            },
            Operation::NONLOCAL_RETURN => InstrKind::NonlocalReturn {
                value: self.operand()?,
                method_name: self.string()?,
            },
            Operation::THROW => InstrKind::Throw {
                exception: self.operand()?,
            },
            Operation::THREAD_POLL => InstrKind::ThreadPoll {
                on_back_edge: self.bool()?,
            },
            Operation::LINE_NUM => InstrKind::LineNum {
                line: self.u32("line number")?,
            },
            Operation::CLOSURE_RETURN => InstrKind::ClosureReturn {
                value: self.operand()?,
            },

            // Values and builders
            Operation::COPY => InstrKind::Copy {
                source: self.operand()?,
            },
            Operation::LOAD_CONST => InstrKind::LoadConst {
                value: self.operand()?,
            },
            Operation::NOT => InstrKind::Not {
                arg: self.operand()?,
            },
            Operation::BUILD_COMPOUND_ARRAY => InstrKind::BuildCompoundArray {
                appending: self.operand()?,
                appended: self.operand()?,
                is_args_push: self.bool()?,
            },
            Operation::BUILD_COMPOUND_STRING => InstrKind::BuildCompoundString {
                encoding: self.dec.decode_encoding()?,
                pieces: self.operands()?,
            },
            Operation::BUILD_DREGEXP => InstrKind::BuildDynRegexp {
                pieces: self.operands()?,
                options: self.regexp_options()?,
            },
            Operation::BUILD_RANGE => InstrKind::BuildRange {
                begin: self.operand()?,
                end: self.operand()?,
                exclusive: self.bool()?,
            },
            Operation::BUILD_SPLAT => InstrKind::BuildSplat {
                array: self.operand()?,
            },
            Operation::BACKTICK_STRING => InstrKind::BacktickString {
                pieces: self.operands()?,
            },
            Operation::TO_ARY => InstrKind::ToAry {
                array: self.operand()?,
            },
            Operation::EQQ => InstrKind::Eqq {
                arg1: self.operand()?,
                arg2: self.operand()?,
            },
            Operation::RESCUE_EQQ => InstrKind::RescueEqq {
                arg1: self.operand()?,
                arg2: self.operand()?,
            },
            Operation::REIFY_CLOSURE => InstrKind::ReifyClosure {
                source: self.operand()?,
            },
            Operation::GET_ENCODING => InstrKind::GetEncoding {
                encoding: self.encoding()?,
            },

            // Calls
            Operation::CALL => InstrKind::Call(self.call()?),
            Operation::NORESULT_CALL => InstrKind::NoResultCall(self.call()?),
            Operation::ATTR_ASSIGN => InstrKind::AttrAssign {
                receiver: self.operand()?,
                name: self.string()?,
                args: self.operands()?,
            },
            Operation::CLASS_SUPER => InstrKind::ClassSuper(self.call()?),
            Operation::INSTANCE_SUPER => InstrKind::InstanceSuper(self.call()?),
            Operation::UNRESOLVED_SUPER => {
                let call_type = self.call_type()?;
                let receiver = self.operand()?;
                let (args, closure) = self.call_args()?;
                InstrKind::UnresolvedSuper {
                    call_type,
                    receiver,
                    args,
                    closure,
                }
            }
            Operation::ZSUPER => {
                let receiver = self.operand()?;
                let (args, closure) = self.call_args()?;
                InstrKind::ZSuper {
                    receiver,
                    args,
                    closure,
                }
            }
            Operation::YIELD => InstrKind::Yield {
                block: self.operand()?,
                arg: self.operand()?,
                unwrap_array: self.bool()?,
            },
            Operation::RUNTIME_HELPER => InstrKind::RuntimeHelper {
                helper: self.runtime_helper()?,
                args: self.operands()?,
            },
            Operation::BLOCK_GIVEN => InstrKind::BlockGiven {
                block: self.operand()?,
            },
            Operation::CHECK_FOR_LJE => InstrKind::CheckForLje {
                maybe_lambda: self.bool()?,
            },
            Operation::LAMBDA => InstrKind::Lambda {
                body: self.operand()?,
                file: self.string()?,
                line: self.u32("line number")?,
            },

            // Argument receiving
            Operation::RECV_SELF => InstrKind::RecvSelf,
            Operation::RECV_PRE_REQD_ARG => InstrKind::RecvPreReqdArg {
                index: self.u32("argument index")?,
            },
            Operation::RECV_POST_REQD_ARG => InstrKind::RecvPostReqdArg {
                index: self.u32("argument index")?,
                pre_reqd: self.u32("required count")?,
                post_reqd: self.u32("required count")?,
            },
            Operation::RECV_OPT_ARG => InstrKind::RecvOptArg {
                required_args: self.u32("required count")?,
                pre_args: self.u32("required count")?,
                index: self.u32("argument index")?,
            },
            Operation::RECV_REST_ARG => InstrKind::RecvRestArg {
                required: self.u32("required count")?,
                index: self.u32("argument index")?,
            },
            Operation::RECV_KW_ARG => InstrKind::RecvKwArg {
                name: self.string()?,
                required: self.u32("required count")?,
            },
            Operation::RECV_KW_REST_ARG => InstrKind::RecvKwRestArg {
                required: self.u32("required count")?,
            },
            Operation::RECV_CLOSURE => InstrKind::RecvClosure,
            Operation::RECV_RUBY_EXC => InstrKind::RecvRubyExc,
            Operation::RECV_JRUBY_EXC => InstrKind::RecvJrubyExc,
            Operation::CHECK_ARITY => InstrKind::CheckArity {
                required: self.u32("required count")?,
                opt: self.u32("optional count")?,
                rest: self.bool()?,
                receives_keywords: self.bool()?,
            },
            Operation::CHECK_ARGS_ARRAY_ARITY => InstrKind::CheckArgsArrayArity {
                args_array: self.operand()?,
                required: self.u32("required count")?,
                opt: self.u32("optional count")?,
                rest: self.bool()?,
            },
            Operation::RAISE_ARGUMENT_ERROR => InstrKind::RaiseArgumentError {
                required: self.u32("required count")?,
                opt: self.u32("optional count")?,
                rest: self.dec.decode_int()?,
                num_args: self.u32("argument count")?,
            },

            // Multiple assignment
            Operation::MASGN_OPT => InstrKind::MasgnOpt {
                array: self.operand()?,
                index: self.u32("element index")?,
                min_args_length: self.u32("argument count")?,
            },
            Operation::MASGN_REQD => InstrKind::MasgnReqd {
                array: self.operand()?,
                pre: self.u32("required count")?,
                post: self.u32("required count")?,
                index: self.u32("element index")?,
            },
            Operation::MASGN_REST => InstrKind::MasgnRest {
                array: self.operand()?,
                pre: self.u32("required count")?,
                post: self.u32("required count")?,
                index: self.u32("element index")?,
            },

            // Variable access
            Operation::BINDING_LOAD => InstrKind::BindingLoad {
                scope: self.scope()?,
                local: self.local()?,
            },
            Operation::BINDING_STORE => InstrKind::BindingStore {
                scope: self.scope()?,
                local: self.local()?,
                value: self.operand()?,
            },
            Operation::GET_FIELD => InstrKind::GetField {
                source: self.operand()?,
                name: self.string()?,
            },
            Operation::PUT_FIELD => InstrKind::PutField {
                target: self.operand()?,
                name: self.string()?,
                value: self.operand()?,
            },
            Operation::GET_CVAR => InstrKind::GetCvar {
                source: self.operand()?,
                name: self.string()?,
            },
            Operation::PUT_CVAR => InstrKind::PutCvar {
                target: self.operand()?,
                name: self.string()?,
                value: self.operand()?,
            },
            Operation::CLASS_VAR_MODULE => InstrKind::ClassVarModule {
                starting_scope: self.operand()?,
                object: self.operand()?,
            },
            Operation::GET_GLOBAL_VAR => InstrKind::GetGlobalVar {
                name: self.string()?,
            },
            Operation::PUT_GLOBAL_VAR => InstrKind::PutGlobalVar {
                name: self.string()?,
                value: self.operand()?,
            },
            Operation::GVAR_ALIAS => InstrKind::GvarAlias {
                new_name: self.operand()?,
                old_name: self.operand()?,
            },
            Operation::SET_CAPTURED_VAR => InstrKind::SetCapturedVar {
                match2_result: self.operand()?,
                var_name: self.string()?,
            },
            Operation::ARG_SCOPE_DEPTH => InstrKind::ArgScopeDepth,

            // Constants
            Operation::SEARCH_CONST => InstrKind::SearchConst {
                name: self.string()?,
                starting_scope: self.operand()?,
                no_private_consts: self.bool()?,
            },
            Operation::LEXICAL_SEARCH_CONST => InstrKind::LexicalSearchConst {
                defining_scope: self.operand()?,
                name: self.string()?,
            },
            Operation::INHERITANCE_SEARCH_CONST => InstrKind::InheritanceSearchConst {
                current_module: self.operand()?,
                name: self.string()?,
                no_private_consts: self.bool()?,
            },
            Operation::CONST_MISSING => InstrKind::ConstMissing {
                receiver: self.operand()?,
                missing_const: self.string()?,
            },
            Operation::PUT_CONST => InstrKind::PutConst {
                target: self.operand()?,
                name: self.string()?,
                value: self.operand()?,
            },

            // Definitions
            Operation::DEF_CLASS => InstrKind::DefClass {
                body: self.scope()?,
                container: self.operand()?,
                superclass: self.operand()?,
            },
            Operation::DEF_MODULE => InstrKind::DefModule {
                body: self.scope()?,
                container: self.operand()?,
            },
            Operation::DEF_META_CLASS => InstrKind::DefMetaClass {
                object: self.operand()?,
                body: self.scope()?,
            },
            Operation::DEF_INST_METH => InstrKind::DefInstMeth {
                method: self.scope()?,
            },
            Operation::DEF_CLASS_METH => InstrKind::DefClassMeth {
                container: self.operand()?,
                method: self.scope()?,
            },
            Operation::PROCESS_MODULE_BODY => InstrKind::ProcessModuleBody {
                module_body: self.operand()?,
                block: self.operand()?,
            },
            Operation::ALIAS => InstrKind::Alias {
                new_name: self.operand()?,
                old_name: self.operand()?,
            },
            Operation::UNDEF_METHOD => InstrKind::UndefMethod {
                method_name: self.operand()?,
            },
            Operation::RECORD_END_BLOCK => InstrKind::RecordEndBlock {
                declaring_scope: self.scope()?,
                end_block: self.operand()?,
            },

            // Frames, bindings and exception regions
            Operation::PUSH_FRAME => InstrKind::PushFrame,
            Operation::POP_FRAME => InstrKind::PopFrame,
            Operation::PUSH_BINDING => InstrKind::PushBinding,
            Operation::POP_BINDING => InstrKind::PopBinding,
            Operation::EXC_REGION_START => InstrKind::ExcRegionStart {
                first_rescue: self.label()?,
            },
            Operation::EXC_REGION_END => InstrKind::ExcRegionEnd,
            Operation::GET_ERROR_INFO => InstrKind::GetErrorInfo,
            Operation::RESTORE_ERROR_INFO => InstrKind::RestoreErrorInfo {
                arg: self.operand()?,
            },
            Operation::LOAD_FRAME_CLOSURE => InstrKind::LoadFrameClosure,
            Operation::LOAD_IMPLICIT_CLOSURE => InstrKind::LoadImplicitClosure,

            // Regexp matching
            Operation::MATCH => InstrKind::Match {
                receiver: self.operand()?,
            },
            Operation::MATCH2 => InstrKind::Match2 {
                receiver: self.operand()?,
                arg: self.operand()?,
            },
            Operation::MATCH3 => InstrKind::Match3 {
                receiver: self.operand()?,
                arg: self.operand()?,
            },
        };
        Ok(kind)
    }
}
