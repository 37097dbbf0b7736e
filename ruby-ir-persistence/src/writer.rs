//! Writer pipeline
//!
//! Layout of a compiled unit:
//!
//! ```text
//! [u32 format version][u32 header offset]
//! [instruction block]*      one per scope, in id order
//! [scope count][header]*    one per scope, in id order
//! ```
//!
//! The two leading words are reserved while the body is produced and filled
//! in last. The whole unit is buffered and handed to the sink in one write.

use crate::FORMAT_VERSION;
use crate::config::WriterConfig;
use crate::error::{EncodingError, Result};
use crate::ids::{ScopeIds, assign_scope_ids};
use crate::instr::encode_block;
use crate::operand::EncodeContext;
use crate::primitive::IrEncoder;
use ruby_ir::{Scope, ScopeTree, Signature, StaticScope};
use std::io::Write;
use tracing::{debug, trace};

/// Bytes taken by the version and header-offset words
pub const PREFIX_LEN: usize = 8;

/// Summary of one persisted unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistStats {
    pub scope_count: usize,
    pub instruction_count: usize,
    pub header_offset: u32,
    pub total_bytes: usize,
}

#[derive(Debug, Clone, Default)]
pub struct IrWriter {
    config: WriterConfig,
}

impl IrWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: WriterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Encode `tree` and write it to `sink`. Nothing reaches the sink unless
    /// encoding succeeded.
    pub fn write<W: Write>(&self, tree: &ScopeTree, sink: &mut W) -> Result<PersistStats> {
        let (bytes, stats) = self.encode(tree)?;
        sink.write_all(&bytes)?;
        Ok(stats)
    }

    pub fn encode(&self, tree: &ScopeTree) -> Result<(Vec<u8>, PersistStats)> {
        let ids = assign_scope_ids(tree);
        let ctx = EncodeContext::new(&ids, self.config.max_operand_depth);
        debug!(scopes = ids.len(), file = tree.file_name(), "persisting scope tree");

        let mut enc = IrEncoder::new();
        enc.write_raw(&[0; PREFIX_LEN]);

        let mut block_offsets = Vec::with_capacity(ids.len());
        let mut instruction_count = 0;
        for &scope in ids.order() {
            let offset = enc.position();
            let instrs = tree.get(scope)?.instrs()?;
            trace!(scope = %scope, offset, instrs = instrs.len(), "instruction block");
            encode_block(&mut enc, &ctx, instrs)?;
            block_offsets.push(offset);
            instruction_count += instrs.len();
        }

        let header_offset = offset_u32(enc.position(), "header offset")?;
        self.write_headers(&mut enc, tree, &ids, &block_offsets)?;

        enc.patch_u32(0, FORMAT_VERSION)?;
        enc.patch_u32(4, header_offset)?;

        let stats = PersistStats {
            scope_count: ids.len(),
            instruction_count,
            header_offset,
            total_bytes: enc.position(),
        };
        debug!(
            instructions = stats.instruction_count,
            header_offset = stats.header_offset,
            bytes = stats.total_bytes,
            "scope tree persisted"
        );
        Ok((enc.into_bytes(), stats))
    }

    fn write_headers(
        &self,
        enc: &mut IrEncoder,
        tree: &ScopeTree,
        ids: &ScopeIds,
        block_offsets: &[usize],
    ) -> Result<()> {
        enc.encode_count(ids.len(), "scope count")?;
        for (&scope_ref, &block_offset) in ids.order().iter().zip(block_offsets) {
            let scope = tree.get(scope_ref)?;
            let parent = scope.parent().map(|parent| ids.id_of(parent)).transpose()?;
            write_header(enc, scope, parent, block_offset)?;
        }
        Ok(())
    }
}

fn offset_u32(offset: usize, what: &'static str) -> Result<u32> {
    // Offsets are persisted in the int form as well as the u32 prefix
    i32::try_from(offset)
        .map(|offset| offset as u32)
        .map_err(|_| {
            EncodingError::TooLarge {
                what,
                len: offset as u64,
            }
            .into()
        })
}

fn write_header(
    enc: &mut IrEncoder,
    scope: &Scope,
    parent: Option<u32>,
    block_offset: usize,
) -> Result<()> {
    enc.write_u8(scope.kind.to_byte());
    enc.encode_u32(scope.line, "line number")?;
    // The root's name is the source file name
    enc.encode_string(&scope.name)?;
    if let Some(parent) = parent {
        enc.encode_u32(parent, "parent id")?;
    }
    write_static_scope(enc, &scope.static_scope)?;
    enc.encode_u32(scope.flags.bits(), "scope flags")?;
    enc.encode_u32(scope.temp_variable_count, "temporary variable count")?;
    enc.encode_u32(scope.next_label, "label counter")?;
    enc.encode_u32(offset_u32(block_offset, "block offset")?, "block offset")
}

fn write_static_scope(enc: &mut IrEncoder, static_scope: &StaticScope) -> Result<()> {
    enc.write_u8(static_scope.kind.to_byte());
    enc.encode_string_array(&static_scope.variables)?;
    enc.encode_optional_index(static_scope.first_keyword_index, "first keyword index")?;
    write_signature(enc, &static_scope.signature)
}

fn write_signature(enc: &mut IrEncoder, signature: &Signature) -> Result<()> {
    enc.encode_u32(signature.pre, "signature")?;
    enc.encode_u32(signature.opt, "signature")?;
    enc.encode_u32(signature.post, "signature")?;
    enc.write_u8(signature.rest.to_byte());
    enc.encode_u32(signature.kwargs, "signature")?;
    enc.encode_u32(signature.required_kwargs, "signature")?;
    enc.encode_optional_index(signature.keyword_rest, "keyword rest index")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GraphError, PersistError};
    use ruby_ir::{Instr, InstrKind, Operand, ScopeKind, ScopeRef, Variable};

    fn script(instrs: Vec<Instr>) -> ScopeTree {
        ScopeTree::new(
            Scope::new(ScopeKind::ScriptBody, "w.rb", 1, StaticScope::default())
                .with_instrs(instrs),
        )
    }

    #[test]
    fn test_prefix_is_filled_last() {
        let tree = script(vec![Instr::new(InstrKind::Nop)]);
        let (bytes, stats) = IrWriter::new().encode(&tree).unwrap();

        assert_eq!(&bytes[..4], &FORMAT_VERSION.to_be_bytes());
        assert_eq!(&bytes[4..8], &stats.header_offset.to_be_bytes());
        // count 1, NOP
        assert_eq!(&bytes[8..10], &[1, 0x00]);
        assert_eq!(stats.header_offset, 10);
        assert_eq!(stats.total_bytes, bytes.len());
        assert_eq!(stats.instruction_count, 1);
    }

    #[test]
    fn test_failed_write_leaves_sink_untouched() {
        let tree = script(vec![Instr::new(InstrKind::DefInstMeth {
            method: ScopeRef::new(5),
        })]);
        let mut sink = Vec::new();
        let err = IrWriter::new().write(&tree, &mut sink).unwrap_err();

        assert!(matches!(
            err,
            PersistError::Graph(GraphError::UnassignedScope(r)) if r == ScopeRef::new(5)
        ));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_result_variable_is_validated() {
        let tree = script(vec![Instr::with_result(
            Variable::temp(0),
            InstrKind::Return {
                value: Operand::Nil,
            },
        )]);
        assert!(matches!(
            IrWriter::new().encode(&tree),
            Err(PersistError::Encoding(EncodingError::UnexpectedResult(_)))
        ));
    }
}
