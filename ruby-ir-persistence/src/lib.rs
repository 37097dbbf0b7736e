//! Binary persistence for Ruby IR
//!
//! Saves a [`ScopeTree`] to a compact byte stream and loads it back. Loading
//! decodes scope headers only; each scope's instructions are decoded the
//! first time [`ruby_ir::Scope::instrs`] is called on it.
//!
//! ```no_run
//! use ruby_ir_persistence::{load, persist};
//! # fn demo(tree: &ruby_ir::ScopeTree) -> ruby_ir_persistence::Result<()> {
//! let mut bytes = Vec::new();
//! persist(tree, &mut bytes)?;
//! let copy = load(bytes)?;
//! assert_eq!(copy.len(), tree.len());
//! # Ok(())
//! # }
//! ```

#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod ids;
pub mod instr;
pub mod operand;
pub mod primitive;
pub mod reader;
pub mod writer;

pub use crate::config::{ReaderConfig, WriterConfig};
pub use crate::error::{EncodingError, FormatError, GraphError, PersistError, Result};
pub use crate::ids::{ScopeIds, assign_scope_ids};
pub use crate::reader::{BlockLoader, IrReader, ReadStats};
pub use crate::writer::{IrWriter, PersistStats};

use ruby_ir::ScopeTree;
use std::io::Write;
use std::sync::Arc;

/// Version word at the start of every compiled unit
pub const FORMAT_VERSION: u32 = 1;

/// Persist `tree` to `sink` with the default configuration.
pub fn persist<W: Write>(tree: &ScopeTree, sink: &mut W) -> Result<PersistStats> {
    IrWriter::new().write(tree, sink)
}

pub fn to_bytes(tree: &ScopeTree) -> Result<Vec<u8>> {
    IrWriter::new().encode(tree).map(|(bytes, _)| bytes)
}

/// Load a unit with lazily decoded instruction blocks.
pub fn load(bytes: impl Into<Arc<[u8]>>) -> Result<ScopeTree> {
    IrReader::new(bytes).read()
}
