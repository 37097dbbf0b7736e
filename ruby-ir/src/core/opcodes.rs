//! Operation codes for Ruby IR instructions

use crate::error::{IrError, Result};
use std::fmt;

/// Primary operation enumeration (8 bits)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[allow(non_camel_case_types)] // Operations follow IR listing naming convention
pub enum Operation {
    // Control flow (0x00 - 0x0F)
    NOP = 0x00,
    JUMP = 0x01,
    LABEL = 0x02,
    BEQ = 0x03,
    BNE = 0x04,
    B_FALSE = 0x05,
    B_TRUE = 0x06,
    B_NIL = 0x07,
    B_UNDEF = 0x08,
    RETURN = 0x09,
    BREAK = 0x0A,
    NONLOCAL_RETURN = 0x0B,
    THROW = 0x0C,
    THREAD_POLL = 0x0D,
    LINE_NUM = 0x0E,
    CLOSURE_RETURN = 0x0F,

    // Values and builders (0x10 - 0x1F)
    COPY = 0x10,
    LOAD_CONST = 0x11,
    NOT = 0x12,
    BUILD_COMPOUND_ARRAY = 0x13,
    BUILD_COMPOUND_STRING = 0x14,
    BUILD_DREGEXP = 0x15,
    BUILD_RANGE = 0x16,
    BUILD_SPLAT = 0x17,
    BACKTICK_STRING = 0x18,
    TO_ARY = 0x19,
    EQQ = 0x1A,
    RESCUE_EQQ = 0x1B,
    REIFY_CLOSURE = 0x1C,
    GET_ENCODING = 0x1D,

    // Calls (0x20 - 0x2F)
    CALL = 0x20,
    NORESULT_CALL = 0x21,
    ATTR_ASSIGN = 0x22,
    CLASS_SUPER = 0x23,
    INSTANCE_SUPER = 0x24,
    UNRESOLVED_SUPER = 0x25,
    ZSUPER = 0x26,
    YIELD = 0x27,
    RUNTIME_HELPER = 0x28,
    BLOCK_GIVEN = 0x29,
    CHECK_FOR_LJE = 0x2A,
    LAMBDA = 0x2B,

    // Argument receiving (0x30 - 0x3F)
    RECV_SELF = 0x30,
    RECV_PRE_REQD_ARG = 0x31,
    RECV_POST_REQD_ARG = 0x32,
    RECV_OPT_ARG = 0x33,
    RECV_REST_ARG = 0x34,
    RECV_KW_ARG = 0x35,
    RECV_KW_REST_ARG = 0x36,
    RECV_CLOSURE = 0x37,
    RECV_RUBY_EXC = 0x38,
    RECV_JRUBY_EXC = 0x39,
    CHECK_ARITY = 0x3A,
    CHECK_ARGS_ARRAY_ARITY = 0x3B,
    RAISE_ARGUMENT_ERROR = 0x3C,

    // Multiple assignment (0x40 - 0x4F)
    MASGN_OPT = 0x40,
    MASGN_REQD = 0x41,
    MASGN_REST = 0x42,

    // Variable access (0x50 - 0x5F)
    BINDING_LOAD = 0x50,
    BINDING_STORE = 0x51,
    GET_FIELD = 0x52,
    PUT_FIELD = 0x53,
    GET_CVAR = 0x54,
    PUT_CVAR = 0x55,
    CLASS_VAR_MODULE = 0x56,
    GET_GLOBAL_VAR = 0x57,
    PUT_GLOBAL_VAR = 0x58,
    GVAR_ALIAS = 0x59,
    SET_CAPTURED_VAR = 0x5A,
    ARG_SCOPE_DEPTH = 0x5B,

    // Constants (0x60 - 0x6F)
    SEARCH_CONST = 0x60,
    LEXICAL_SEARCH_CONST = 0x61,
    INHERITANCE_SEARCH_CONST = 0x62,
    CONST_MISSING = 0x63,
    PUT_CONST = 0x64,

    // Definitions (0x70 - 0x7F)
    DEF_CLASS = 0x70,
    DEF_MODULE = 0x71,
    DEF_META_CLASS = 0x72,
    DEF_INST_METH = 0x73,
    DEF_CLASS_METH = 0x74,
    PROCESS_MODULE_BODY = 0x75,
    ALIAS = 0x76,
    UNDEF_METHOD = 0x77,
    RECORD_END_BLOCK = 0x78,

    // Frames, bindings and exception regions (0x80 - 0x8F)
    PUSH_FRAME = 0x80,
    POP_FRAME = 0x81,
    PUSH_BINDING = 0x82,
    POP_BINDING = 0x83,
    EXC_REGION_START = 0x84,
    EXC_REGION_END = 0x85,
    GET_ERROR_INFO = 0x86,
    RESTORE_ERROR_INFO = 0x87,
    LOAD_FRAME_CLOSURE = 0x88,
    LOAD_IMPLICIT_CLOSURE = 0x89,

    // Regexp matching (0x90 - 0x9F)
    MATCH = 0x90,
    MATCH2 = 0x91,
    MATCH3 = 0x92,
}

impl Operation {
    /// Parse operation from byte
    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            0x00 => Ok(Operation::NOP),
            0x01 => Ok(Operation::JUMP),
            0x02 => Ok(Operation::LABEL),
            0x03 => Ok(Operation::BEQ),
            0x04 => Ok(Operation::BNE),
            0x05 => Ok(Operation::B_FALSE),
            0x06 => Ok(Operation::B_TRUE),
            0x07 => Ok(Operation::B_NIL),
            0x08 => Ok(Operation::B_UNDEF),
            0x09 => Ok(Operation::RETURN),
            0x0A => Ok(Operation::BREAK),
            0x0B => Ok(Operation::NONLOCAL_RETURN),
            0x0C => Ok(Operation::THROW),
            0x0D => Ok(Operation::THREAD_POLL),
            0x0E => Ok(Operation::LINE_NUM),
            0x0F => Ok(Operation::CLOSURE_RETURN),

            0x10 => Ok(Operation::COPY),
            0x11 => Ok(Operation::LOAD_CONST),
            0x12 => Ok(Operation::NOT),
            0x13 => Ok(Operation::BUILD_COMPOUND_ARRAY),
            0x14 => Ok(Operation::BUILD_COMPOUND_STRING),
            0x15 => Ok(Operation::BUILD_DREGEXP),
            0x16 => Ok(Operation::BUILD_RANGE),
            0x17 => Ok(Operation::BUILD_SPLAT),
            0x18 => Ok(Operation::BACKTICK_STRING),
            0x19 => Ok(Operation::TO_ARY),
            0x1A => Ok(Operation::EQQ),
            0x1B => Ok(Operation::RESCUE_EQQ),
            0x1C => Ok(Operation::REIFY_CLOSURE),
            0x1D => Ok(Operation::GET_ENCODING),

            0x20 => Ok(Operation::CALL),
            0x21 => Ok(Operation::NORESULT_CALL),
            0x22 => Ok(Operation::ATTR_ASSIGN),
            0x23 => Ok(Operation::CLASS_SUPER),
            0x24 => Ok(Operation::INSTANCE_SUPER),
            0x25 => Ok(Operation::UNRESOLVED_SUPER),
            0x26 => Ok(Operation::ZSUPER),
            0x27 => Ok(Operation::YIELD),
            0x28 => Ok(Operation::RUNTIME_HELPER),
            0x29 => Ok(Operation::BLOCK_GIVEN),
            0x2A => Ok(Operation::CHECK_FOR_LJE),
            0x2B => Ok(Operation::LAMBDA),

            0x30 => Ok(Operation::RECV_SELF),
            0x31 => Ok(Operation::RECV_PRE_REQD_ARG),
            0x32 => Ok(Operation::RECV_POST_REQD_ARG),
            0x33 => Ok(Operation::RECV_OPT_ARG),
            0x34 => Ok(Operation::RECV_REST_ARG),
            0x35 => Ok(Operation::RECV_KW_ARG),
            0x36 => Ok(Operation::RECV_KW_REST_ARG),
            0x37 => Ok(Operation::RECV_CLOSURE),
            0x38 => Ok(Operation::RECV_RUBY_EXC),
            0x39 => Ok(Operation::RECV_JRUBY_EXC),
            0x3A => Ok(Operation::CHECK_ARITY),
            0x3B => Ok(Operation::CHECK_ARGS_ARRAY_ARITY),
            0x3C => Ok(Operation::RAISE_ARGUMENT_ERROR),

            0x40 => Ok(Operation::MASGN_OPT),
            0x41 => Ok(Operation::MASGN_REQD),
            0x42 => Ok(Operation::MASGN_REST),

            0x50 => Ok(Operation::BINDING_LOAD),
            0x51 => Ok(Operation::BINDING_STORE),
            0x52 => Ok(Operation::GET_FIELD),
            0x53 => Ok(Operation::PUT_FIELD),
            0x54 => Ok(Operation::GET_CVAR),
            0x55 => Ok(Operation::PUT_CVAR),
            0x56 => Ok(Operation::CLASS_VAR_MODULE),
            0x57 => Ok(Operation::GET_GLOBAL_VAR),
            0x58 => Ok(Operation::PUT_GLOBAL_VAR),
            0x59 => Ok(Operation::GVAR_ALIAS),
            0x5A => Ok(Operation::SET_CAPTURED_VAR),
            0x5B => Ok(Operation::ARG_SCOPE_DEPTH),

            0x60 => Ok(Operation::SEARCH_CONST),
            0x61 => Ok(Operation::LEXICAL_SEARCH_CONST),
            0x62 => Ok(Operation::INHERITANCE_SEARCH_CONST),
            0x63 => Ok(Operation::CONST_MISSING),
            0x64 => Ok(Operation::PUT_CONST),

            0x70 => Ok(Operation::DEF_CLASS),
            0x71 => Ok(Operation::DEF_MODULE),
            0x72 => Ok(Operation::DEF_META_CLASS),
            0x73 => Ok(Operation::DEF_INST_METH),
            0x74 => Ok(Operation::DEF_CLASS_METH),
            0x75 => Ok(Operation::PROCESS_MODULE_BODY),
            0x76 => Ok(Operation::ALIAS),
            0x77 => Ok(Operation::UNDEF_METHOD),
            0x78 => Ok(Operation::RECORD_END_BLOCK),

            0x80 => Ok(Operation::PUSH_FRAME),
            0x81 => Ok(Operation::POP_FRAME),
            0x82 => Ok(Operation::PUSH_BINDING),
            0x83 => Ok(Operation::POP_BINDING),
            0x84 => Ok(Operation::EXC_REGION_START),
            0x85 => Ok(Operation::EXC_REGION_END),
            0x86 => Ok(Operation::GET_ERROR_INFO),
            0x87 => Ok(Operation::RESTORE_ERROR_INFO),
            0x88 => Ok(Operation::LOAD_FRAME_CLOSURE),
            0x89 => Ok(Operation::LOAD_IMPLICIT_CLOSURE),

            0x90 => Ok(Operation::MATCH),
            0x91 => Ok(Operation::MATCH2),
            0x92 => Ok(Operation::MATCH3),

            _ => Err(IrError::InvalidOpcode(byte)),
        }
    }

    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Whether instructions of this kind bind a result variable.
    ///
    /// The result is persisted right after the operation byte, so this table is
    /// part of the wire format.
    pub fn has_result(&self) -> bool {
        !matches!(
            self,
            Operation::NOP
                | Operation::JUMP
                | Operation::LABEL
                | Operation::BEQ
                | Operation::BNE
                | Operation::B_FALSE
                | Operation::B_TRUE
                | Operation::B_NIL
                | Operation::B_UNDEF
                | Operation::RETURN
                | Operation::BREAK
                | Operation::NONLOCAL_RETURN
                | Operation::THROW
                | Operation::THREAD_POLL
                | Operation::LINE_NUM
                | Operation::CLOSURE_RETURN
                | Operation::NORESULT_CALL
                | Operation::ATTR_ASSIGN
                | Operation::CHECK_FOR_LJE
                | Operation::CHECK_ARITY
                | Operation::CHECK_ARGS_ARRAY_ARITY
                | Operation::RAISE_ARGUMENT_ERROR
                | Operation::BINDING_STORE
                | Operation::PUT_FIELD
                | Operation::PUT_CVAR
                | Operation::PUT_GLOBAL_VAR
                | Operation::GVAR_ALIAS
                | Operation::PUT_CONST
                | Operation::DEF_INST_METH
                | Operation::DEF_CLASS_METH
                | Operation::ALIAS
                | Operation::RECORD_END_BLOCK
                | Operation::PUSH_FRAME
                | Operation::POP_FRAME
                | Operation::PUSH_BINDING
                | Operation::POP_BINDING
                | Operation::EXC_REGION_START
                | Operation::EXC_REGION_END
                | Operation::RESTORE_ERROR_INFO
        )
    }

    /// Check if this operation modifies control flow
    pub fn is_control_flow(&self) -> bool {
        matches!(
            self,
            Operation::JUMP
                | Operation::BEQ
                | Operation::BNE
                | Operation::B_FALSE
                | Operation::B_TRUE
                | Operation::B_NIL
                | Operation::B_UNDEF
                | Operation::RETURN
                | Operation::BREAK
                | Operation::NONLOCAL_RETURN
                | Operation::THROW
                | Operation::CLOSURE_RETURN
        )
    }

    /// Check if this operation dispatches a method call
    pub fn is_call(&self) -> bool {
        matches!(
            self,
            Operation::CALL
                | Operation::NORESULT_CALL
                | Operation::ATTR_ASSIGN
                | Operation::CLASS_SUPER
                | Operation::INSTANCE_SUPER
                | Operation::UNRESOLVED_SUPER
                | Operation::ZSUPER
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
