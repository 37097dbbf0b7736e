//! Ruby IR data model
//!
//! The in-memory graph the compiler front end produces and the persistence
//! layer saves and reloads: a tree of lexical scopes, each owning an ordered
//! instruction list built from a closed set of typed operands.

#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod core;
pub mod error;

// Re-export commonly used types
pub use crate::core::{
    instructions::{CallBase, CallType, Instr, InstrKind, Listing, RuntimeHelper},
    opcodes::Operation,
    operands::{
        ByteStr, Encoding, Label, LocalVariable, Operand, OperandType, RegexpOptions, TempKind,
        TemporaryVariable, Variable,
    },
    scope::{
        InstrLoader, Rest, Scope, ScopeFlags, ScopeKind, ScopeRef, ScopeTree, Signature,
        StaticScope, StaticScopeKind,
    },
};

pub use crate::error::{IrError, Result};
