//! Instruction definitions for Ruby IR
//!
//! An [`Instr`] pairs an optional result variable with an [`InstrKind`], one
//! variant per [`Operation`]. The fields of each variant are exactly what the
//! persistence layer writes for that operation, in declaration order.

use crate::core::opcodes::Operation;
use crate::core::operands::{Encoding, Label, LocalVariable, Operand, RegexpOptions, Variable};
use crate::core::scope::ScopeRef;
use crate::error::{IrError, Result};
use std::fmt;

/// How a call site was written in source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CallType {
    /// `recv.foo`
    Normal = 0,
    /// `foo()` with implicit self
    Functional = 1,
    /// bare `foo`, which may have been a variable
    Variable = 2,
    Super = 3,
    Unknown = 4,
}

impl CallType {
    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            0 => Ok(CallType::Normal),
            1 => Ok(CallType::Functional),
            2 => Ok(CallType::Variable),
            3 => Ok(CallType::Super),
            4 => Ok(CallType::Unknown),
            code => Err(IrError::InvalidCode {
                what: "call type",
                code,
            }),
        }
    }

    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

/// Runtime support routines invoked through `RUNTIME_HELPER`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RuntimeHelper {
    HandlePropagatedBreak = 0,
    HandleNonlocalReturn = 1,
    HandleBreakAndReturnsInLambda = 2,
    IsDefinedBackref = 3,
    IsDefinedNthRef = 4,
    IsDefinedGlobal = 5,
    IsDefinedInstanceVar = 6,
    IsDefinedClassVar = 7,
    IsDefinedSuper = 8,
    IsDefinedMethod = 9,
    IsDefinedCall = 10,
    IsDefinedConstantOrMethod = 11,
    MergeKwargs = 12,
    RestoreExceptionVar = 13,
}

impl RuntimeHelper {
    pub fn from_byte(byte: u8) -> Result<Self> {
        let helper = match byte {
            0 => RuntimeHelper::HandlePropagatedBreak,
            1 => RuntimeHelper::HandleNonlocalReturn,
            2 => RuntimeHelper::HandleBreakAndReturnsInLambda,
            3 => RuntimeHelper::IsDefinedBackref,
            4 => RuntimeHelper::IsDefinedNthRef,
            5 => RuntimeHelper::IsDefinedGlobal,
            6 => RuntimeHelper::IsDefinedInstanceVar,
            7 => RuntimeHelper::IsDefinedClassVar,
            8 => RuntimeHelper::IsDefinedSuper,
            9 => RuntimeHelper::IsDefinedMethod,
            10 => RuntimeHelper::IsDefinedCall,
            11 => RuntimeHelper::IsDefinedConstantOrMethod,
            12 => RuntimeHelper::MergeKwargs,
            13 => RuntimeHelper::RestoreExceptionVar,
            code => {
                return Err(IrError::InvalidCode {
                    what: "runtime helper",
                    code,
                });
            }
        };
        Ok(helper)
    }

    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

/// Shared shape of the call family (`CALL`, `NORESULT_CALL`, `CLASS_SUPER`,
/// `INSTANCE_SUPER`)
#[derive(Debug, Clone, PartialEq)]
pub struct CallBase {
    pub call_type: CallType,
    pub name: String,
    pub receiver: Operand,
    pub args: Vec<Operand>,
    pub closure: Option<Operand>,
}

impl CallBase {
    pub fn new(call_type: CallType, name: impl Into<String>, receiver: Operand) -> Self {
        Self {
            call_type,
            name: name.into(),
            receiver,
            args: Vec::new(),
            closure: None,
        }
    }

    pub fn with_args(mut self, args: Vec<Operand>) -> Self {
        self.args = args;
        self
    }

    pub fn with_closure(mut self, closure: Operand) -> Self {
        self.closure = Some(closure);
        self
    }
}

impl fmt::Display for CallBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}(", self.receiver, self.name)?;
        write_joined(f, &self.args)?;
        f.write_str(")")?;
        if let Some(closure) = &self.closure {
            write!(f, " &{closure}")?;
        }
        Ok(())
    }
}

/// Operation-specific payload of an instruction
#[derive(Debug, Clone, PartialEq)]
pub enum InstrKind {
    // Control flow
    Nop,
    Jump { target: Label },
    Label { label: Label },
    BEq { arg1: Operand, arg2: Operand, target: Label },
    BNe { arg1: Operand, arg2: Operand, target: Label },
    BFalse { arg: Operand, target: Label },
    BTrue { arg: Operand, target: Label },
    BNil { arg: Operand, target: Label },
    BUndef { arg: Operand, target: Label },
    Return { value: Operand },
    Break { value: Operand, scope_name: String },
    NonlocalReturn { value: Operand, method_name: String },
    Throw { exception: Operand },
    ThreadPoll { on_back_edge: bool },
    LineNum { line: u32 },
    ClosureReturn { value: Operand },

    // Values and builders
    Copy { source: Operand },
    LoadConst { value: Operand },
    Not { arg: Operand },
    BuildCompoundArray { appending: Operand, appended: Operand, is_args_push: bool },
    BuildCompoundString { encoding: Option<Encoding>, pieces: Vec<Operand> },
    BuildDynRegexp { pieces: Vec<Operand>, options: RegexpOptions },
    BuildRange { begin: Operand, end: Operand, exclusive: bool },
    BuildSplat { array: Operand },
    BacktickString { pieces: Vec<Operand> },
    ToAry { array: Operand },
    Eqq { arg1: Operand, arg2: Operand },
    RescueEqq { arg1: Operand, arg2: Operand },
    ReifyClosure { source: Operand },
    GetEncoding { encoding: Encoding },

    // Calls
    Call(CallBase),
    NoResultCall(CallBase),
    AttrAssign { receiver: Operand, name: String, args: Vec<Operand> },
    ClassSuper(CallBase),
    InstanceSuper(CallBase),
    UnresolvedSuper {
        call_type: CallType,
        receiver: Operand,
        args: Vec<Operand>,
        closure: Option<Operand>,
    },
    ZSuper { receiver: Operand, args: Vec<Operand>, closure: Option<Operand> },
    Yield { block: Operand, arg: Operand, unwrap_array: bool },
    RuntimeHelper { helper: RuntimeHelper, args: Vec<Operand> },
    BlockGiven { block: Operand },
    CheckForLje { maybe_lambda: bool },
    Lambda { body: Operand, file: String, line: u32 },

    // Argument receiving
    RecvSelf,
    RecvPreReqdArg { index: u32 },
    RecvPostReqdArg { index: u32, pre_reqd: u32, post_reqd: u32 },
    RecvOptArg { required_args: u32, pre_args: u32, index: u32 },
    RecvRestArg { required: u32, index: u32 },
    RecvKwArg { name: String, required: u32 },
    RecvKwRestArg { required: u32 },
    RecvClosure,
    RecvRubyExc,
    RecvJrubyExc,
    CheckArity { required: u32, opt: u32, rest: bool, receives_keywords: bool },
    CheckArgsArrayArity { args_array: Operand, required: u32, opt: u32, rest: bool },
    /// `rest` is negative when the method takes no rest argument
    RaiseArgumentError { required: u32, opt: u32, rest: i32, num_args: u32 },

    // Multiple assignment
    MasgnOpt { array: Operand, index: u32, min_args_length: u32 },
    MasgnReqd { array: Operand, pre: u32, post: u32, index: u32 },
    MasgnRest { array: Operand, pre: u32, post: u32, index: u32 },

    // Variable access
    BindingLoad { scope: ScopeRef, local: LocalVariable },
    BindingStore { scope: ScopeRef, local: LocalVariable, value: Operand },
    GetField { source: Operand, name: String },
    PutField { target: Operand, name: String, value: Operand },
    GetCvar { source: Operand, name: String },
    PutCvar { target: Operand, name: String, value: Operand },
    ClassVarModule { starting_scope: Operand, object: Operand },
    GetGlobalVar { name: String },
    PutGlobalVar { name: String, value: Operand },
    GvarAlias { new_name: Operand, old_name: Operand },
    SetCapturedVar { match2_result: Operand, var_name: String },
    ArgScopeDepth,

    // Constants
    SearchConst { name: String, starting_scope: Operand, no_private_consts: bool },
    LexicalSearchConst { defining_scope: Operand, name: String },
    InheritanceSearchConst { current_module: Operand, name: String, no_private_consts: bool },
    ConstMissing { receiver: Operand, missing_const: String },
    PutConst { target: Operand, name: String, value: Operand },

    // Definitions
    DefClass { body: ScopeRef, container: Operand, superclass: Operand },
    DefModule { body: ScopeRef, container: Operand },
    DefMetaClass { object: Operand, body: ScopeRef },
    DefInstMeth { method: ScopeRef },
    DefClassMeth { container: Operand, method: ScopeRef },
    ProcessModuleBody { module_body: Operand, block: Operand },
    Alias { new_name: Operand, old_name: Operand },
    UndefMethod { method_name: Operand },
    RecordEndBlock { declaring_scope: ScopeRef, end_block: Operand },

    // Frames, bindings and exception regions
    PushFrame,
    PopFrame,
    PushBinding,
    PopBinding,
    ExcRegionStart { first_rescue: Label },
    ExcRegionEnd,
    GetErrorInfo,
    RestoreErrorInfo { arg: Operand },
    LoadFrameClosure,
    LoadImplicitClosure,

    // Regexp matching
    Match { receiver: Operand },
    Match2 { receiver: Operand, arg: Operand },
    Match3 { receiver: Operand, arg: Operand },
}

impl InstrKind {
    pub fn operation(&self) -> Operation {
        match self {
            InstrKind::Nop => Operation::NOP,
            InstrKind::Jump { .. } => Operation::JUMP,
            InstrKind::Label { .. } => Operation::LABEL,
            InstrKind::BEq { .. } => Operation::BEQ,
            InstrKind::BNe { .. } => Operation::BNE,
            InstrKind::BFalse { .. } => Operation::B_FALSE,
            InstrKind::BTrue { .. } => Operation::B_TRUE,
            InstrKind::BNil { .. } => Operation::B_NIL,
            InstrKind::BUndef { .. } => Operation::B_UNDEF,
            InstrKind::Return { .. } => Operation::RETURN,
            InstrKind::Break { .. } => Operation::BREAK,
            InstrKind::NonlocalReturn { .. } => Operation::NONLOCAL_RETURN,
            InstrKind::Throw { .. } => Operation::THROW,
            InstrKind::ThreadPoll { .. } => Operation::THREAD_POLL,
            InstrKind::LineNum { .. } => Operation::LINE_NUM,
            InstrKind::ClosureReturn { .. } => Operation::CLOSURE_RETURN,

            InstrKind::Copy { .. } => Operation::COPY,
            InstrKind::LoadConst { .. } => Operation::LOAD_CONST,
            InstrKind::Not { .. } => Operation::NOT,
            InstrKind::BuildCompoundArray { .. } => Operation::BUILD_COMPOUND_ARRAY,
            InstrKind::BuildCompoundString { .. } => Operation::BUILD_COMPOUND_STRING,
            InstrKind::BuildDynRegexp { .. } => Operation::BUILD_DREGEXP,
            InstrKind::BuildRange { .. } => Operation::BUILD_RANGE,
            InstrKind::BuildSplat { .. } => Operation::BUILD_SPLAT,
            InstrKind::BacktickString { .. } => Operation::BACKTICK_STRING,
            InstrKind::ToAry { .. } => Operation::TO_ARY,
            InstrKind::Eqq { .. } => Operation::EQQ,
            InstrKind::RescueEqq { .. } => Operation::RESCUE_EQQ,
            InstrKind::ReifyClosure { .. } => Operation::REIFY_CLOSURE,
            InstrKind::GetEncoding { .. } => Operation::GET_ENCODING,

            InstrKind::Call(_) => Operation::CALL,
            InstrKind::NoResultCall(_) => Operation::NORESULT_CALL,
            InstrKind::AttrAssign { .. } => Operation::ATTR_ASSIGN,
            InstrKind::ClassSuper(_) => Operation::CLASS_SUPER,
            InstrKind::InstanceSuper(_) => Operation::INSTANCE_SUPER,
            InstrKind::UnresolvedSuper { .. } => Operation::UNRESOLVED_SUPER,
            InstrKind::ZSuper { .. } => Operation::ZSUPER,
            InstrKind::Yield { .. } => Operation::YIELD,
            InstrKind::RuntimeHelper { .. } => Operation::RUNTIME_HELPER,
            InstrKind::BlockGiven { .. } => Operation::BLOCK_GIVEN,
            InstrKind::CheckForLje { .. } => Operation::CHECK_FOR_LJE,
            InstrKind::Lambda { .. } => Operation::LAMBDA,

            InstrKind::RecvSelf => Operation::RECV_SELF,
            InstrKind::RecvPreReqdArg { .. } => Operation::RECV_PRE_REQD_ARG,
            InstrKind::RecvPostReqdArg { .. } => Operation::RECV_POST_REQD_ARG,
            InstrKind::RecvOptArg { .. } => Operation::RECV_OPT_ARG,
            InstrKind::RecvRestArg { .. } => Operation::RECV_REST_ARG,
            InstrKind::RecvKwArg { .. } => Operation::RECV_KW_ARG,
            InstrKind::RecvKwRestArg { .. } => Operation::RECV_KW_REST_ARG,
            InstrKind::RecvClosure => Operation::RECV_CLOSURE,
            InstrKind::RecvRubyExc => Operation::RECV_RUBY_EXC,
            InstrKind::RecvJrubyExc => Operation::RECV_JRUBY_EXC,
            InstrKind::CheckArity { .. } => Operation::CHECK_ARITY,
            InstrKind::CheckArgsArrayArity { .. } => Operation::CHECK_ARGS_ARRAY_ARITY,
            InstrKind::RaiseArgumentError { .. } => Operation::RAISE_ARGUMENT_ERROR,

            InstrKind::MasgnOpt { .. } => Operation::MASGN_OPT,
            InstrKind::MasgnReqd { .. } => Operation::MASGN_REQD,
            InstrKind::MasgnRest { .. } => Operation::MASGN_REST,

            InstrKind::BindingLoad { .. } => Operation::BINDING_LOAD,
            InstrKind::BindingStore { .. } => Operation::BINDING_STORE,
            InstrKind::GetField { .. } => Operation::GET_FIELD,
            InstrKind::PutField { .. } => Operation::PUT_FIELD,
            InstrKind::GetCvar { .. } => Operation::GET_CVAR,
            InstrKind::PutCvar { .. } => Operation::PUT_CVAR,
            InstrKind::ClassVarModule { .. } => Operation::CLASS_VAR_MODULE,
            InstrKind::GetGlobalVar { .. } => Operation::GET_GLOBAL_VAR,
            InstrKind::PutGlobalVar { .. } => Operation::PUT_GLOBAL_VAR,
            InstrKind::GvarAlias { .. } => Operation::GVAR_ALIAS,
            InstrKind::SetCapturedVar { .. } => Operation::SET_CAPTURED_VAR,
            InstrKind::ArgScopeDepth => Operation::ARG_SCOPE_DEPTH,

            InstrKind::SearchConst { .. } => Operation::SEARCH_CONST,
            InstrKind::LexicalSearchConst { .. } => Operation::LEXICAL_SEARCH_CONST,
            InstrKind::InheritanceSearchConst { .. } => Operation::INHERITANCE_SEARCH_CONST,
            InstrKind::ConstMissing { .. } => Operation::CONST_MISSING,
            InstrKind::PutConst { .. } => Operation::PUT_CONST,

            InstrKind::DefClass { .. } => Operation::DEF_CLASS,
            InstrKind::DefModule { .. } => Operation::DEF_MODULE,
            InstrKind::DefMetaClass { .. } => Operation::DEF_META_CLASS,
            InstrKind::DefInstMeth { .. } => Operation::DEF_INST_METH,
            InstrKind::DefClassMeth { .. } => Operation::DEF_CLASS_METH,
            InstrKind::ProcessModuleBody { .. } => Operation::PROCESS_MODULE_BODY,
            InstrKind::Alias { .. } => Operation::ALIAS,
            InstrKind::UndefMethod { .. } => Operation::UNDEF_METHOD,
            InstrKind::RecordEndBlock { .. } => Operation::RECORD_END_BLOCK,

            InstrKind::PushFrame => Operation::PUSH_FRAME,
            InstrKind::PopFrame => Operation::POP_FRAME,
            InstrKind::PushBinding => Operation::PUSH_BINDING,
            InstrKind::PopBinding => Operation::POP_BINDING,
            InstrKind::ExcRegionStart { .. } => Operation::EXC_REGION_START,
            InstrKind::ExcRegionEnd => Operation::EXC_REGION_END,
            InstrKind::GetErrorInfo => Operation::GET_ERROR_INFO,
            InstrKind::RestoreErrorInfo { .. } => Operation::RESTORE_ERROR_INFO,
            InstrKind::LoadFrameClosure => Operation::LOAD_FRAME_CLOSURE,
            InstrKind::LoadImplicitClosure => Operation::LOAD_IMPLICIT_CLOSURE,

            InstrKind::Match { .. } => Operation::MATCH,
            InstrKind::Match2 { .. } => Operation::MATCH2,
            InstrKind::Match3 { .. } => Operation::MATCH3,
        }
    }

    /// Scopes this instruction names directly (not through operands)
    pub fn scope_refs(&self) -> Vec<ScopeRef> {
        match self {
            InstrKind::BindingLoad { scope, .. } | InstrKind::BindingStore { scope, .. } => {
                vec![*scope]
            }
            InstrKind::DefClass { body, .. }
            | InstrKind::DefModule { body, .. }
            | InstrKind::DefMetaClass { body, .. } => vec![*body],
            InstrKind::DefInstMeth { method } | InstrKind::DefClassMeth { method, .. } => {
                vec![*method]
            }
            InstrKind::RecordEndBlock {
                declaring_scope, ..
            } => vec![*declaring_scope],
            _ => Vec::new(),
        }
    }

    fn args(&self) -> Vec<String> {
        macro_rules! args {
            ($($arg:expr),* $(,)?) => { vec![$($arg.to_string()),*] };
        }

        match self {
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
            | InstrKind::LoadImplicitClosure => Vec::new(),

            InstrKind::Jump { target } => args![target],
            InstrKind::Label { label } => args![label],
            InstrKind::BEq { arg1, arg2, target } | InstrKind::BNe { arg1, arg2, target } => {
                args![arg1, arg2, target]
            }
            InstrKind::BFalse { arg, target }
            | InstrKind::BTrue { arg, target }
            | InstrKind::BNil { arg, target }
            | InstrKind::BUndef { arg, target } => args![arg, target],
            InstrKind::Return { value } | InstrKind::ClosureReturn { value } => args![value],
            InstrKind::Break { value, scope_name } => args![value, scope_name],
            InstrKind::NonlocalReturn { value, method_name } => args![value, method_name],
            InstrKind::Throw { exception } => args![exception],
            InstrKind::ThreadPoll { on_back_edge } => args![on_back_edge],
            InstrKind::LineNum { line } => args![line],

            InstrKind::Copy { source } | InstrKind::ReifyClosure { source } => args![source],
            InstrKind::LoadConst { value } => args![value],
            InstrKind::Not { arg } | InstrKind::RestoreErrorInfo { arg } => args![arg],
            InstrKind::BuildCompoundArray {
                appending,
                appended,
                is_args_push,
            } => args![appending, appended, is_args_push],
            InstrKind::BuildCompoundString { encoding, pieces } => {
                let mut out = joined_args(pieces);
                if let Some(encoding) = encoding {
                    out.push(encoding.to_string());
                }
                out
            }
            InstrKind::BuildDynRegexp { pieces, options } => {
                let mut out = joined_args(pieces);
                out.push(format!("/{options}"));
                out
            }
            InstrKind::BuildRange {
                begin,
                end,
                exclusive,
            } => args![begin, end, exclusive],
            InstrKind::BuildSplat { array } | InstrKind::ToAry { array } => args![array],
            InstrKind::BacktickString { pieces } => joined_args(pieces),
            InstrKind::Eqq { arg1, arg2 } | InstrKind::RescueEqq { arg1, arg2 } => {
                args![arg1, arg2]
            }
            InstrKind::GetEncoding { encoding } => args![encoding],

            InstrKind::Call(call)
            | InstrKind::NoResultCall(call)
            | InstrKind::ClassSuper(call)
            | InstrKind::InstanceSuper(call) => args![call],
            InstrKind::AttrAssign {
                receiver,
                name,
                args,
            } => {
                let mut out = args![receiver, name];
                out.extend(joined_args(args));
                out
            }
            InstrKind::UnresolvedSuper {
                receiver,
                args,
                closure,
                ..
            }
            | InstrKind::ZSuper {
                receiver,
                args,
                closure,
            } => {
                let mut out = args![receiver];
                out.extend(joined_args(args));
                if let Some(closure) = closure {
                    out.push(format!("&{closure}"));
                }
                out
            }
            InstrKind::Yield {
                block,
                arg,
                unwrap_array,
            } => args![block, arg, unwrap_array],
            InstrKind::RuntimeHelper { helper, args } => {
                let mut out = vec![format!("{helper:?}")];
                out.extend(joined_args(args));
                out
            }
            InstrKind::BlockGiven { block } => args![block],
            InstrKind::CheckForLje { maybe_lambda } => args![maybe_lambda],
            InstrKind::Lambda { body, file, line } => args![body, format!("{file}:{line}")],

            InstrKind::RecvPreReqdArg { index } => args![index],
            InstrKind::RecvPostReqdArg {
                index,
                pre_reqd,
                post_reqd,
            } => args![index, pre_reqd, post_reqd],
            InstrKind::RecvOptArg {
                required_args,
                pre_args,
                index,
            } => args![required_args, pre_args, index],
            InstrKind::RecvRestArg { required, index } => args![required, index],
            InstrKind::RecvKwArg { name, required } => args![name, required],
            InstrKind::RecvKwRestArg { required } => args![required],
            InstrKind::CheckArity {
                required,
                opt,
                rest,
                receives_keywords,
            } => args![required, opt, rest, receives_keywords],
            InstrKind::CheckArgsArrayArity {
                args_array,
                required,
                opt,
                rest,
            } => args![args_array, required, opt, rest],
            InstrKind::RaiseArgumentError {
                required,
                opt,
                rest,
                num_args,
            } => args![required, opt, rest, num_args],

            InstrKind::MasgnOpt {
                array,
                index,
                min_args_length,
            } => args![array, index, min_args_length],
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
            } => args![array, pre, post, index],

            InstrKind::BindingLoad { scope, local } => args![scope, local],
            InstrKind::BindingStore {
                scope,
                local,
                value,
            } => args![scope, local, value],
            InstrKind::GetField { source, name } | InstrKind::GetCvar { source, name } => {
                args![source, name]
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
            } => args![target, name, value],
            InstrKind::ClassVarModule {
                starting_scope,
                object,
            } => args![starting_scope, object],
            InstrKind::GetGlobalVar { name } => args![name],
            InstrKind::PutGlobalVar { name, value } => args![name, value],
            InstrKind::GvarAlias { new_name, old_name } | InstrKind::Alias { new_name, old_name } => {
                args![new_name, old_name]
            }
            InstrKind::SetCapturedVar {
                match2_result,
                var_name,
            } => args![match2_result, var_name],

            InstrKind::SearchConst {
                name,
                starting_scope,
                no_private_consts,
            } => args![name, starting_scope, no_private_consts],
            InstrKind::LexicalSearchConst {
                defining_scope,
                name,
            } => args![defining_scope, name],
            InstrKind::InheritanceSearchConst {
                current_module,
                name,
                no_private_consts,
            } => args![current_module, name, no_private_consts],
            InstrKind::ConstMissing {
                receiver,
                missing_const,
            } => args![receiver, missing_const],

            InstrKind::DefClass {
                body,
                container,
                superclass,
            } => args![body, container, superclass],
            InstrKind::DefModule { body, container } => args![body, container],
            InstrKind::DefMetaClass { object, body } => args![object, body],
            InstrKind::DefInstMeth { method } => args![method],
            InstrKind::DefClassMeth { container, method } => args![container, method],
            InstrKind::ProcessModuleBody { module_body, block } => args![module_body, block],
            InstrKind::UndefMethod { method_name } => args![method_name],
            InstrKind::RecordEndBlock {
                declaring_scope,
                end_block,
            } => args![declaring_scope, end_block],

            InstrKind::ExcRegionStart { first_rescue } => args![first_rescue],

            InstrKind::Match { receiver } => args![receiver],
            InstrKind::Match2 { receiver, arg } | InstrKind::Match3 { receiver, arg } => {
                args![receiver, arg]
            }
        }
    }
}

fn joined_args(operands: &[Operand]) -> Vec<String> {
    operands.iter().map(ToString::to_string).collect()
}

fn write_joined<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for InstrKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.operation())?;
        let args = self.args();
        if !args.is_empty() {
            f.write_str(" ")?;
            write_joined(f, &args)?;
        }
        Ok(())
    }
}

/// One IR instruction: an operation payload plus the variable it binds, if
/// its operation binds one.
#[derive(Debug, Clone, PartialEq)]
pub struct Instr {
    pub result: Option<Variable>,
    pub kind: InstrKind,
}

impl Instr {
    pub fn new(kind: InstrKind) -> Self {
        Self { result: None, kind }
    }

    pub fn with_result(result: Variable, kind: InstrKind) -> Self {
        Self {
            result: Some(result),
            kind,
        }
    }

    pub fn operation(&self) -> Operation {
        self.kind.operation()
    }

    pub fn result(&self) -> Option<&Variable> {
        self.result.as_ref()
    }
}

impl From<InstrKind> for Instr {
    fn from(kind: InstrKind) -> Self {
        Instr::new(kind)
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(result) = &self.result {
            write!(f, "{result} := ")?;
        }
        write!(f, "{}", self.kind)
    }
}

/// Indexed one-line rendering of an instruction list:
/// `[0: t0 := LOAD_CONST 42, 1: RETURN t0]`
pub struct Listing<'a>(pub &'a [Instr]);

impl fmt::Display for Listing<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (idx, instr) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{idx}: {instr}")?;
        }
        f.write_str("]")
    }
}
