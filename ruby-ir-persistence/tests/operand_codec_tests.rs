mod common;

use anyhow::Result;
use num_bigint::BigInt;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use ruby_ir::*;
use ruby_ir_persistence::config::DEFAULT_MAX_OPERAND_DEPTH;
use ruby_ir_persistence::operand::{DecodeContext, EncodeContext, decode_operand, encode_operand};
use ruby_ir_persistence::primitive::{IrDecoder, IrEncoder};
use ruby_ir_persistence::{EncodingError, FormatError, GraphError, PersistError, assign_scope_ids};
use rstest::rstest;

/// Root plus one closure, so closure operands have somewhere to point.
fn two_scope_tree() -> (ScopeTree, ScopeRef) {
    let mut tree = ScopeTree::new(Scope::new(
        ScopeKind::ScriptBody,
        "ops.rb",
        0,
        StaticScope::default(),
    ));
    let root = tree.root();
    let closure = tree
        .add_child(
            root,
            Scope::new(ScopeKind::Closure, "_CLOSURE_1", 1, StaticScope::default()),
        )
        .unwrap();
    (tree, closure)
}

fn encode_with_depth(operand: &Operand, max_depth: usize) -> ruby_ir_persistence::Result<Vec<u8>> {
    let (tree, _) = two_scope_tree();
    let ids = assign_scope_ids(&tree);
    let mut enc = IrEncoder::new();
    encode_operand(&mut enc, &EncodeContext::new(&ids, max_depth), operand)?;
    Ok(enc.into_bytes())
}

fn decode_with_depth(bytes: &[u8], max_depth: usize) -> ruby_ir_persistence::Result<Operand> {
    let mut dec = IrDecoder::new(bytes);
    let operand = decode_operand(&mut dec, &DecodeContext::new(2, max_depth))?;
    assert!(dec.is_at_end(), "operand left {} bytes", dec.remaining());
    Ok(operand)
}

fn roundtrip(operand: &Operand) -> ruby_ir_persistence::Result<Operand> {
    let bytes = encode_with_depth(operand, DEFAULT_MAX_OPERAND_DEPTH)?;
    decode_with_depth(&bytes, DEFAULT_MAX_OPERAND_DEPTH)
}

fn splat_chain(levels: usize) -> Operand {
    (0..levels).fold(Operand::Nil, |inner, _| Operand::splat(inner))
}

#[test]
fn test_every_operand_variant_roundtrips() -> Result<()> {
    let (_, closure) = two_scope_tree();
    let operands = common::every_operand(closure);

    let mut tags: Vec<u8> = operands.iter().map(|op| op.operand_type().to_byte()).collect();
    tags.sort_unstable();
    tags.dedup();
    assert_eq!(tags.len(), 35, "fixture should cover every operand tag");

    for operand in &operands {
        assert_eq!(&roundtrip(operand)?, operand);
    }
    Ok(())
}

#[test]
fn test_nan_float_keeps_its_bits() -> Result<()> {
    let nan = f64::from_bits(0x7FF8_0000_0000_0001);
    match roundtrip(&Operand::Float(nan))? {
        Operand::Float(value) => assert_eq!(value.to_bits(), nan.to_bits()),
        other => panic!("expected a float, got {other:?}"),
    }
    Ok(())
}

#[rstest]
#[case::zero(BigInt::from(0))]
#[case::positive(BigInt::from(u128::MAX))]
#[case::negative(-BigInt::from(u128::MAX) * 7)]
#[case::minus_one(BigInt::from(-1))]
fn test_bignum_roundtrip(#[case] value: BigInt) -> Result<()> {
    let operand = Operand::Bignum(value);
    assert_eq!(roundtrip(&operand)?, operand);
    Ok(())
}

#[test]
fn test_nesting_at_the_limit() -> Result<()> {
    let deepest_allowed = splat_chain(DEFAULT_MAX_OPERAND_DEPTH - 1);
    assert_eq!(roundtrip(&deepest_allowed)?, deepest_allowed);

    let too_deep = splat_chain(DEFAULT_MAX_OPERAND_DEPTH);
    assert!(matches!(
        encode_with_depth(&too_deep, DEFAULT_MAX_OPERAND_DEPTH),
        Err(PersistError::Encoding(EncodingError::NestingTooDeep { limit })) if limit == DEFAULT_MAX_OPERAND_DEPTH
    ));
    Ok(())
}

#[test]
fn test_decoder_limit_is_independent_of_writer() -> Result<()> {
    let bytes = encode_with_depth(&splat_chain(10), 64)?;
    assert!(matches!(
        decode_with_depth(&bytes, 4),
        Err(PersistError::Format(FormatError::NestingTooDeep { limit: 4, offset: 4 }))
    ));
    assert_eq!(decode_with_depth(&bytes, 64)?, splat_chain(10));
    Ok(())
}

#[test]
fn test_closure_outside_tree_is_rejected() {
    let foreign = Operand::Array(vec![Operand::WrappedClosure(ScopeRef::new(7))]);
    assert!(matches!(
        encode_with_depth(&foreign, DEFAULT_MAX_OPERAND_DEPTH),
        Err(PersistError::Graph(GraphError::UnassignedScope(scope))) if scope == ScopeRef::new(7)
    ));
}

#[rstest]
#[case::truncated_fixnum(&[0x01, 0xFF, 0x00])]
#[case::array_count_overrun(&[0x30, 0x7F])]
#[case::bad_bool(&[0x04, 0x02])]
#[case::bad_varint(&[0x01, 0x80])]
#[case::unknown_tag(&[0x12])]
#[case::unknown_encoding(&[0x08, 0x01, b'a', 0x03, b'X', b'Y', b'Z'])]
fn test_malformed_operand_is_a_format_error(#[case] bytes: &[u8]) {
    assert!(matches!(
        decode_with_depth(bytes, DEFAULT_MAX_OPERAND_DEPTH),
        Err(PersistError::Format(_))
    ));
}

fn byte_str() -> impl Strategy<Value = ByteStr> {
    (
        prop::collection::vec(any::<u8>(), 0..12),
        prop::sample::select(Encoding::ALL.to_vec()),
    )
        .prop_map(|(bytes, encoding)| ByteStr::new(bytes, encoding))
}

fn constant() -> impl Strategy<Value = Operand> {
    prop_oneof![
        Just(Operand::Nil),
        Just(Operand::StandardError),
        any::<i64>().prop_map(Operand::Fixnum),
        any::<i64>().prop_map(Operand::UnboxedFixnum),
        any::<i128>().prop_map(|v| Operand::Bignum(BigInt::from(v))),
        prop::num::f64::NORMAL.prop_map(Operand::Float),
        any::<bool>().prop_map(Operand::Boolean),
        byte_str().prop_map(Operand::Str),
        byte_str().prop_map(Operand::Symbol),
    ]
}

fn reference() -> impl Strategy<Value = Operand> {
    prop_oneof![
        Just(Operand::SelfValue),
        "[a-z_]{1,8}".prop_map(|name| Operand::GlobalVariable(format!("${name}"))),
        (0..=i32::MAX as u32).prop_map(Operand::NthRef),
        ("[a-z]{1,6}", 0u32..4, 0u32..40).prop_map(|(n, d, o)| Operand::local(n, d, o)),
        (0u32..1_000).prop_map(Operand::temp),
        (0u32..8).prop_map(|depth| Operand::ScopeModule { depth }),
        (0u32..2).prop_map(|id| Operand::WrappedClosure(ScopeRef::new(id))),
        ("[A-Z]{1,4}", 0..=i32::MAX as u32).prop_map(|(p, id)| Operand::Label(Label::new(p, id))),
    ]
}

fn leaf() -> impl Strategy<Value = Operand> {
    prop_oneof![constant(), reference()]
}

fn operand() -> impl Strategy<Value = Operand> {
    leaf().prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Operand::Array),
            prop::collection::vec((inner.clone(), inner.clone()), 0..4).prop_map(Operand::Hash),
            inner.clone().prop_map(Operand::splat),
            inner.clone().prop_map(|op| Operand::AsString(Box::new(op))),
            (
                prop::collection::vec(inner.clone(), 0..4),
                prop::option::of(prop::sample::select(Encoding::ALL.to_vec())),
            )
                .prop_map(|(pieces, encoding)| Operand::CompoundString { pieces, encoding }),
            (inner.clone(), inner, any::<bool>()).prop_map(|(begin, end, exclusive)| {
                Operand::Range {
                    begin: Box::new(begin),
                    end: Box::new(end),
                    exclusive,
                }
            }),
        ]
    })
}

proptest! {
    #[test]
    fn prop_operand_roundtrip(op in operand()) {
        prop_assert_eq!(roundtrip(&op).unwrap(), op);
    }

    #[test]
    fn prop_truncated_operand_never_decodes(op in operand(), cut in any::<prop::sample::Index>()) {
        let bytes = encode_with_depth(&op, DEFAULT_MAX_OPERAND_DEPTH).unwrap();
        let cut = cut.index(bytes.len());
        let mut dec = IrDecoder::new(&bytes[..cut]);
        let result = decode_operand(&mut dec, &DecodeContext::new(2, DEFAULT_MAX_OPERAND_DEPTH));
        prop_assert!(matches!(result, Err(PersistError::Format(_))));
    }
}
