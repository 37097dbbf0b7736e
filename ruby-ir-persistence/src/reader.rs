//! Reader pipeline
//!
//! Reading a unit decodes the prefix and the header section only. Each scope
//! gets a [`BlockLoader`] holding the shared bytes and its block offset; the
//! block is decoded on first access through [`Scope::instrs`] with a cursor of
//! its own, so blocks can be materialized in any order and from any thread.

use crate::FORMAT_VERSION;
use crate::config::ReaderConfig;
use crate::error::{FormatError, PersistError, Result};
use crate::instr::decode_block;
use crate::operand::DecodeContext;
use crate::primitive::IrDecoder;
use crate::writer::PREFIX_LEN;
use byteorder::{BigEndian, ByteOrder};
use parking_lot::Mutex;
use ruby_ir::{
    Instr, InstrLoader, IrError, Rest, Scope, ScopeFlags, ScopeKind, ScopeRef, ScopeTree,
    Signature, StaticScope, StaticScopeKind,
};
use std::io::Read;
use std::sync::Arc;
use tracing::{debug, trace};

/// Decoding counters, shared with every loader of one reader
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadStats {
    pub header_bytes: usize,
    pub instruction_bytes: usize,
    pub blocks_loaded: usize,
}

#[derive(Debug, Clone)]
pub struct IrReader {
    bytes: Arc<[u8]>,
    config: ReaderConfig,
    stats: Arc<Mutex<ReadStats>>,
}

impl IrReader {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
            config: ReaderConfig::default(),
            stats: Arc::default(),
        }
    }

    /// Buffer the whole source up front.
    pub fn from_reader<R: Read>(source: &mut R) -> Result<Self> {
        let mut bytes = Vec::new();
        source.read_to_end(&mut bytes)?;
        Ok(Self::new(bytes))
    }

    pub fn with_config(mut self, config: ReaderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn stats(&self) -> ReadStats {
        *self.stats.lock()
    }

    /// Check the prefix and decode every scope header. Instruction blocks are
    /// left to the per-scope loaders unless the reader is configured eager.
    pub fn read(&self) -> Result<ScopeTree> {
        let len = self.bytes.len();
        if len < PREFIX_LEN {
            return Err(FormatError::Truncated {
                needed: PREFIX_LEN,
                len,
            }
            .into());
        }
        let version = BigEndian::read_u32(&self.bytes[0..4]);
        if version != FORMAT_VERSION {
            return Err(FormatError::VersionMismatch {
                expected: FORMAT_VERSION,
                found: version,
            }
            .into());
        }
        let header_offset = BigEndian::read_u32(&self.bytes[4..8]);
        let header_start = header_offset as usize;
        if header_start < PREFIX_LEN || header_start >= len {
            return Err(FormatError::InvalidHeaderOffset {
                offset: header_offset,
                len,
            }
            .into());
        }

        let mut dec = IrDecoder::at(&self.bytes, header_start)?;
        let scope_count = dec.decode_count(1)?;
        if scope_count == 0 {
            return Err(FormatError::EmptyUnit.into());
        }
        debug!(scopes = scope_count, header_offset, "reading scope headers");

        let mut tree: Option<ScopeTree> = None;
        for index in 0..scope_count {
            let header = read_header(&mut dec, index as u32)?;
            if header.block_offset < PREFIX_LEN || header.block_offset >= header_start {
                return Err(FormatError::InvalidBlockOffset {
                    scope: index as u32,
                    offset: header.block_offset as u32,
                }
                .into());
            }

            let loader = BlockLoader {
                bytes: Arc::clone(&self.bytes),
                section_end: header_start,
                offset: header.block_offset,
                scope: ScopeRef::new(index as u32),
                ctx: DecodeContext::new(scope_count, self.config.max_operand_depth),
                stats: Arc::clone(&self.stats),
            };
            let scope = if self.config.lazy {
                header.scope.with_loader(Arc::new(loader))
            } else {
                header.scope.with_instrs(loader.decode()?)
            };

            if let Some(tree) = tree.as_mut() {
                let parent = header.parent.ok_or_else(|| {
                    IrError::InvalidTree(format!("scope {index} has no parent"))
                })?;
                tree.add_child(ScopeRef::new(parent), scope)?;
            } else {
                tree = Some(ScopeTree::new(scope));
            }
        }

        let header_end = dec.position();
        if self.config.reject_trailing_bytes && header_end != len {
            return Err(FormatError::TrailingBytes {
                offset: header_end,
                len: len - header_end,
            }
            .into());
        }
        self.stats.lock().header_bytes += header_end - header_start;

        tree.ok_or_else(|| FormatError::EmptyUnit.into())
    }
}

struct Header {
    scope: Scope,
    parent: Option<u32>,
    block_offset: usize,
}

/// The root header (index 0) has no parent field; every other header names
/// a parent that was read before it.
fn read_header(dec: &mut IrDecoder<'_>, index: u32) -> Result<Header> {
    let kind_at = dec.position();
    let kind = ScopeKind::from_byte(dec.read_u8()?)
        .map_err(|err| PersistError::from_code_lookup(err, kind_at))?;
    let line = dec.decode_u32("line number")?;
    let name = dec.decode_string()?;
    let parent = if index == 0 {
        None
    } else {
        let parent = dec.decode_u32("parent id")?;
        if parent >= index {
            return Err(FormatError::ForwardParent {
                scope: index,
                parent,
            }
            .into());
        }
        Some(parent)
    };
    let static_scope = read_static_scope(dec)?;

    let flags_at = dec.position();
    let bits = dec.decode_u32("scope flags")?;
    let flags = ScopeFlags::from_bits(bits).ok_or(FormatError::UnknownFlags {
        bits,
        offset: flags_at,
    })?;
    let temp_variable_count = dec.decode_u32("temporary variable count")?;
    let next_label = dec.decode_u32("label counter")?;
    let block_offset = dec.decode_u32("block offset")? as usize;

    let scope = Scope::new(kind, name, line, static_scope)
        .with_flags(flags)
        .with_counters(temp_variable_count, next_label);
    Ok(Header {
        scope,
        parent,
        block_offset,
    })
}

fn read_static_scope(dec: &mut IrDecoder<'_>) -> Result<StaticScope> {
    let kind_at = dec.position();
    let kind = StaticScopeKind::from_byte(dec.read_u8()?)
        .map_err(|err| PersistError::from_code_lookup(err, kind_at))?;
    let variables = dec.decode_string_array()?;
    let first_keyword_index = dec.decode_optional_index("first keyword index")?;
    let signature = read_signature(dec)?;
    Ok(StaticScope {
        kind,
        variables,
        first_keyword_index,
        signature,
    })
}

fn read_signature(dec: &mut IrDecoder<'_>) -> Result<Signature> {
    let pre = dec.decode_u32("signature")?;
    let opt = dec.decode_u32("signature")?;
    let post = dec.decode_u32("signature")?;
    let rest_at = dec.position();
    let rest = Rest::from_byte(dec.read_u8()?)
        .map_err(|err| PersistError::from_code_lookup(err, rest_at))?;
    Ok(Signature {
        pre,
        opt,
        post,
        rest,
        kwargs: dec.decode_u32("signature")?,
        required_kwargs: dec.decode_u32("signature")?,
        keyword_rest: dec.decode_optional_index("keyword rest index")?,
    })
}

/// Deferred decode of one scope's instruction block
#[derive(Debug)]
pub struct BlockLoader {
    bytes: Arc<[u8]>,
    /// Blocks may not run into the header section
    section_end: usize,
    offset: usize,
    scope: ScopeRef,
    ctx: DecodeContext,
    stats: Arc<Mutex<ReadStats>>,
}

impl BlockLoader {
    pub fn decode(&self) -> Result<Vec<Instr>> {
        let mut dec = IrDecoder::at(&self.bytes[..self.section_end], self.offset)?;
        let instrs = decode_block(&mut dec, &self.ctx)?;

        let consumed = dec.position() - self.offset;
        let mut stats = self.stats.lock();
        stats.instruction_bytes += consumed;
        stats.blocks_loaded += 1;
        trace!(scope = %self.scope, offset = self.offset, bytes = consumed, "loaded instruction block");
        Ok(instrs)
    }
}

impl InstrLoader for BlockLoader {
    fn load(&self) -> ruby_ir::Result<Vec<Instr>> {
        self.decode().map_err(|err| IrError::Load(Box::new(err)))
    }
}
