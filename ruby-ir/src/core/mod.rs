pub mod instructions;
pub mod opcodes;
pub mod operands;
pub mod scope;

// Re-export core types
pub use self::instructions::{CallBase, CallType, Instr, InstrKind, Listing, RuntimeHelper};
pub use self::opcodes::Operation;
pub use self::operands::{
    ByteStr, Encoding, Label, LocalVariable, Operand, OperandType, RegexpOptions, TempKind,
    TemporaryVariable,
    Variable,
};
pub use self::scope::{
    InstrLoader, Rest, Scope, ScopeFlags, ScopeKind, ScopeRef, ScopeTree, Signature, StaticScope,
    StaticScopeKind,
};
