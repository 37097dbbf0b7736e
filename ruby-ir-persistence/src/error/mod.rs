//! Error types for IR persistence

use ruby_ir::{IrError, Operation, ScopeRef};
use thiserror::Error;

/// Main error type for saving and loading a compiled unit
#[derive(Error, Debug)]
pub enum PersistError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Raised by the IR model itself, e.g. a deferred instruction list that
    /// failed to load while being re-persisted
    #[error(transparent)]
    Ir(#[from] IrError),
}

/// The byte stream is not a well-formed compiled unit
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("Incompatible format version: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("Stream of {len} bytes is too short, at least {needed} needed")]
    Truncated { needed: usize, len: usize },

    #[error("Unexpected end of data at offset {offset:#x}")]
    UnexpectedEof { offset: usize },

    #[error("Malformed integer prefix {byte:#04x} at offset {offset:#x}")]
    InvalidVarint { byte: u8, offset: usize },

    #[error("Invalid boolean byte {byte:#04x} at offset {offset:#x}")]
    InvalidBool { byte: u8, offset: usize },

    #[error("Unknown operand tag {tag:#04x} at offset {offset:#x}")]
    UnknownOperandTag { tag: u8, offset: usize },

    #[error("Unknown operation code {opcode:#04x} at offset {offset:#x}")]
    UnknownOpcode { opcode: u8, offset: usize },

    #[error("Unknown {what} code {code:#04x} at offset {offset:#x}")]
    UnknownCode {
        what: &'static str,
        code: u8,
        offset: usize,
    },

    #[error("Unknown character encoding {name:?} at offset {offset:#x}")]
    UnknownEncoding { name: String, offset: usize },

    #[error("Unknown flag bits {bits:#x} at offset {offset:#x}")]
    UnknownFlags { bits: u32, offset: usize },

    #[error("Negative length {len} at offset {offset:#x}")]
    NegativeLength { len: i32, offset: usize },

    #[error("Length {len} at offset {offset:#x} runs past the end of the data")]
    LengthOverrun { len: usize, offset: usize },

    #[error("{what} value {value} out of range at offset {offset:#x}")]
    OutOfRange {
        what: &'static str,
        value: i64,
        offset: usize,
    },

    #[error("Invalid UTF-8 text at offset {offset:#x}")]
    InvalidUtf8 { offset: usize },

    #[error("Operand tag {tag:#04x} at offset {offset:#x} is not a variable")]
    NotAVariable { tag: u8, offset: usize },

    #[error("Operand nesting deeper than {limit} at offset {offset:#x}")]
    NestingTooDeep { limit: usize, offset: usize },

    #[error("Scope id {id} at offset {offset:#x} is not below the scope count {count}")]
    UnknownScope { id: i32, count: usize, offset: usize },

    #[error("Header offset {offset:#x} lies outside the {len}-byte stream")]
    InvalidHeaderOffset { offset: u32, len: usize },

    #[error("Instruction block offset {offset:#x} of scope {scope} lies outside the instruction section")]
    InvalidBlockOffset { scope: u32, offset: u32 },

    #[error("Scope {scope} names parent {parent}, which has not been read yet")]
    ForwardParent { scope: u32, parent: u32 },

    #[error("Compiled unit holds no scopes")]
    EmptyUnit,

    #[error("{len} trailing bytes after the header section at offset {offset:#x}")]
    TrailingBytes { offset: usize, len: usize },
}

impl PersistError {
    /// Attach a stream offset to a code-table lookup failure from the model.
    pub(crate) fn from_code_lookup(err: IrError, offset: usize) -> Self {
        let format = match err {
            IrError::InvalidOpcode(opcode) => FormatError::UnknownOpcode { opcode, offset },
            IrError::InvalidCode { what, code } => FormatError::UnknownCode { what, code, offset },
            IrError::UnknownEncoding(name) => FormatError::UnknownEncoding { name, offset },
            other => return PersistError::Ir(other),
        };
        PersistError::Format(format)
    }
}

/// The in-memory graph holds something the format cannot represent
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("{0} binds a result but the instruction has none")]
    MissingResult(Operation),

    #[error("{0} does not bind a result but the instruction has one")]
    UnexpectedResult(Operation),

    #[error("{what} of {len} does not fit the format")]
    TooLarge { what: &'static str, len: u64 },

    #[error("Operand nesting deeper than {limit}")]
    NestingTooDeep { limit: usize },
}

/// The scope graph violates an invariant of the writer pipeline
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Scope {0} is referenced but was never assigned an id")]
    UnassignedScope(ScopeRef),
}

/// Convenient Result type
pub type Result<T> = std::result::Result<T, PersistError>;
