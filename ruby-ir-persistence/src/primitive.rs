//! Primitive encoder and decoder
//!
//! Integers 0..=127 take a single byte. Anything else is written as
//! [`VARINT_SENTINEL`] followed by the big-endian fixed-width value (4 bytes
//! for ints, 8 for longs). Lengths and counts use the int form; byte strings
//! are a length followed by raw bytes.

use crate::error::{EncodingError, FormatError, PersistError, Result};
use byteorder::{BigEndian, ByteOrder};
use num_bigint::BigInt;
use ruby_ir::{ByteStr, Encoding};

/// Prefix byte announcing a fixed-width integer
pub const VARINT_SENTINEL: u8 = 0xFF;

pub const TRUE_BYTE: u8 = 0x01;
pub const FALSE_BYTE: u8 = 0x00;

const MAX_INLINE: i64 = 0x7F;

/// Growable output buffer with the primitive encodings
#[derive(Debug, Default)]
pub struct IrEncoder {
    buf: Vec<u8>,
}

impl IrEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current write offset
    pub fn position(&self) -> usize {
        self.buf.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_u8(&mut self, byte: u8) {
        self.buf.push(byte);
    }

    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Overwrite four bytes at `at` with a big-endian u32.
    pub fn patch_u32(&mut self, at: usize, value: u32) -> Result<()> {
        let slot = self
            .buf
            .get_mut(at..at + 4)
            .ok_or(EncodingError::TooLarge {
                what: "patch offset",
                len: at as u64,
            })?;
        BigEndian::write_u32(slot, value);
        Ok(())
    }

    pub fn encode_int(&mut self, value: i32) {
        if (0..=MAX_INLINE as i32).contains(&value) {
            self.buf.push(value as u8);
        } else {
            let mut fixed = [0u8; 4];
            BigEndian::write_i32(&mut fixed, value);
            self.buf.push(VARINT_SENTINEL);
            self.buf.extend_from_slice(&fixed);
        }
    }

    pub fn encode_long(&mut self, value: i64) {
        if (0..=MAX_INLINE).contains(&value) {
            self.buf.push(value as u8);
        } else {
            let mut fixed = [0u8; 8];
            BigEndian::write_i64(&mut fixed, value);
            self.buf.push(VARINT_SENTINEL);
            self.buf.extend_from_slice(&fixed);
        }
    }

    /// Unsigned model field stored in the int form
    pub fn encode_u32(&mut self, value: u32, what: &'static str) -> Result<()> {
        let value = i32::try_from(value).map_err(|_| EncodingError::TooLarge {
            what,
            len: u64::from(value),
        })?;
        self.encode_int(value);
        Ok(())
    }

    /// Optional index; absent is written as -1.
    pub fn encode_optional_index(&mut self, value: Option<u32>, what: &'static str) -> Result<()> {
        match value {
            Some(index) => self.encode_u32(index, what),
            None => {
                self.encode_int(-1);
                Ok(())
            }
        }
    }

    pub fn encode_count(&mut self, count: usize, what: &'static str) -> Result<()> {
        let count = i32::try_from(count).map_err(|_| EncodingError::TooLarge {
            what,
            len: count as u64,
        })?;
        self.encode_int(count);
        Ok(())
    }

    pub fn encode_bool(&mut self, value: bool) {
        self.buf.push(if value { TRUE_BYTE } else { FALSE_BYTE });
    }

    pub fn encode_double(&mut self, value: f64) {
        let mut fixed = [0u8; 8];
        BigEndian::write_f64(&mut fixed, value);
        self.buf.extend_from_slice(&fixed);
    }

    pub fn encode_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.encode_count(bytes.len(), "byte string")?;
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    pub fn encode_string(&mut self, value: &str) -> Result<()> {
        self.encode_bytes(value.as_bytes())
    }

    pub fn encode_string_array(&mut self, values: &[String]) -> Result<()> {
        self.encode_count(values.len(), "string array")?;
        for value in values {
            self.encode_string(value)?;
        }
        Ok(())
    }

    /// An absent encoding is written as an empty name.
    pub fn encode_encoding(&mut self, encoding: Option<Encoding>) -> Result<()> {
        self.encode_string(encoding.map_or("", |enc| enc.name()))
    }

    /// Byte record followed by the encoding-name record
    pub fn encode_byte_str(&mut self, value: &ByteStr) -> Result<()> {
        self.encode_bytes(&value.bytes)?;
        self.encode_encoding(Some(value.encoding))
    }

    /// Two's-complement big-endian magnitude as a byte record
    pub fn encode_bignum(&mut self, value: &BigInt) -> Result<()> {
        self.encode_bytes(&value.to_signed_bytes_be())
    }
}

/// Cursor over an immutable byte slice.
///
/// Offsets are absolute within the slice. Reading past the end is a
/// [`FormatError::UnexpectedEof`].
#[derive(Debug, Clone)]
pub struct IrDecoder<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> IrDecoder<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Independent cursor positioned at `pos`
    pub fn at(bytes: &'a [u8], pos: usize) -> Result<Self> {
        if pos > bytes.len() {
            return Err(FormatError::UnexpectedEof { offset: pos }.into());
        }
        Ok(Self { bytes, pos })
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.pos)
    }

    pub fn is_at_end(&self) -> bool {
        self.remaining() == 0
    }

    fn read_exact(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(FormatError::UnexpectedEof { offset: self.pos })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_exact(1)?[0])
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(BigEndian::read_u32(self.read_exact(4)?))
    }

    /// Reads the one-byte prefix: `Ok(Some(v))` for an inline value,
    /// `Ok(None)` when the fixed-width form follows.
    fn read_prefix(&mut self) -> Result<Option<u8>> {
        let offset = self.pos;
        match self.read_u8()? {
            VARINT_SENTINEL => Ok(None),
            byte if i64::from(byte) <= MAX_INLINE => Ok(Some(byte)),
            byte => Err(FormatError::InvalidVarint { byte, offset }.into()),
        }
    }

    pub fn decode_int(&mut self) -> Result<i32> {
        match self.read_prefix()? {
            Some(byte) => Ok(i32::from(byte)),
            None => Ok(BigEndian::read_i32(self.read_exact(4)?)),
        }
    }

    pub fn decode_long(&mut self) -> Result<i64> {
        match self.read_prefix()? {
            Some(byte) => Ok(i64::from(byte)),
            None => Ok(BigEndian::read_i64(self.read_exact(8)?)),
        }
    }

    pub fn decode_u32(&mut self, what: &'static str) -> Result<u32> {
        let offset = self.pos;
        let value = self.decode_int()?;
        u32::try_from(value).map_err(|_| {
            FormatError::OutOfRange {
                what,
                value: i64::from(value),
                offset,
            }
            .into()
        })
    }

    pub fn decode_optional_index(&mut self, what: &'static str) -> Result<Option<u32>> {
        let offset = self.pos;
        match self.decode_int()? {
            -1 => Ok(None),
            value => u32::try_from(value).map(Some).map_err(|_| {
                FormatError::OutOfRange {
                    what,
                    value: i64::from(value),
                    offset,
                }
                .into()
            }),
        }
    }

    /// Element count of a following sequence. Every element takes at least
    /// `min_element_len` bytes, so larger counts are rejected before any
    /// allocation happens.
    pub fn decode_count(&mut self, min_element_len: usize) -> Result<usize> {
        let offset = self.pos;
        let len = self.decode_int()?;
        let count =
            usize::try_from(len).map_err(|_| FormatError::NegativeLength { len, offset })?;
        if count.saturating_mul(min_element_len) > self.remaining() {
            return Err(FormatError::LengthOverrun { len: count, offset }.into());
        }
        Ok(count)
    }

    pub fn decode_bool(&mut self) -> Result<bool> {
        let offset = self.pos;
        match self.read_u8()? {
            TRUE_BYTE => Ok(true),
            FALSE_BYTE => Ok(false),
            byte => Err(FormatError::InvalidBool { byte, offset }.into()),
        }
    }

    pub fn decode_double(&mut self) -> Result<f64> {
        Ok(BigEndian::read_f64(self.read_exact(8)?))
    }

    pub fn decode_bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.decode_count(1)?;
        self.read_exact(len)
    }

    pub fn decode_string(&mut self) -> Result<String> {
        let offset = self.pos;
        let bytes = self.decode_bytes()?;
        String::from_utf8(bytes.to_vec()).map_err(|_| FormatError::InvalidUtf8 { offset }.into())
    }

    pub fn decode_string_array(&mut self) -> Result<Vec<String>> {
        let count = self.decode_count(1)?;
        (0..count).map(|_| self.decode_string()).collect()
    }

    /// `None` for the empty name
    pub fn decode_encoding(&mut self) -> Result<Option<Encoding>> {
        let offset = self.pos;
        let name = self.decode_string()?;
        if name.is_empty() {
            return Ok(None);
        }
        Encoding::from_name(&name)
            .map(Some)
            .map_err(|err| PersistError::from_code_lookup(err, offset))
    }

    pub fn decode_required_encoding(&mut self) -> Result<Encoding> {
        let offset = self.pos;
        self.decode_encoding()?.ok_or_else(|| {
            FormatError::UnknownEncoding {
                name: String::new(),
                offset,
            }
            .into()
        })
    }

    pub fn decode_byte_str(&mut self) -> Result<ByteStr> {
        let bytes = self.decode_bytes()?.to_vec();
        let encoding = self.decode_required_encoding()?;
        Ok(ByteStr::new(bytes, encoding))
    }

    pub fn decode_bignum(&mut self) -> Result<BigInt> {
        Ok(BigInt::from_signed_bytes_be(self.decode_bytes()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, vec![0x00])]
    #[case(1, vec![0x01])]
    #[case(127, vec![0x7F])]
    #[case(128, vec![0xFF, 0x00, 0x00, 0x00, 0x80])]
    #[case(-1, vec![0xFF, 0xFF, 0xFF, 0xFF, 0xFF])]
    #[case(i32::MIN, vec![0xFF, 0x80, 0x00, 0x00, 0x00])]
    #[case(i32::MAX, vec![0xFF, 0x7F, 0xFF, 0xFF, 0xFF])]
    fn test_int_layout(#[case] value: i32, #[case] expected: Vec<u8>) {
        let mut enc = IrEncoder::new();
        enc.encode_int(value);
        assert_eq!(enc.as_bytes(), expected.as_slice());

        let mut dec = IrDecoder::new(enc.as_bytes());
        assert_eq!(dec.decode_int().unwrap(), value);
        assert!(dec.is_at_end());
    }

    #[rstest]
    #[case(0, 1)]
    #[case(127, 1)]
    #[case(128, 9)]
    #[case(-1, 9)]
    #[case(i64::MIN, 9)]
    #[case(i64::MAX, 9)]
    fn test_long_width(#[case] value: i64, #[case] width: usize) {
        let mut enc = IrEncoder::new();
        enc.encode_long(value);
        assert_eq!(enc.position(), width);
        assert_eq!(IrDecoder::new(enc.as_bytes()).decode_long().unwrap(), value);
    }

    #[test]
    fn test_non_canonical_prefix_rejected() {
        let err = IrDecoder::new(&[0x80]).decode_int().unwrap_err();
        assert!(matches!(
            err,
            PersistError::Format(FormatError::InvalidVarint { byte: 0x80, offset: 0 })
        ));
    }

    #[test]
    fn test_truncated_fixed_width() {
        let err = IrDecoder::new(&[0xFF, 0x00, 0x01]).decode_int().unwrap_err();
        assert!(matches!(
            err,
            PersistError::Format(FormatError::UnexpectedEof { offset: 1 })
        ));
    }

    #[test]
    fn test_bool_alphabet() {
        let mut dec = IrDecoder::new(&[0x01, 0x00, 0x02]);
        assert!(dec.decode_bool().unwrap());
        assert!(!dec.decode_bool().unwrap());
        assert!(matches!(
            dec.decode_bool(),
            Err(PersistError::Format(FormatError::InvalidBool { byte: 2, offset: 2 }))
        ));
    }

    #[test]
    fn test_length_past_end_rejected() {
        // Claims 100 bytes, provides 2
        let err = IrDecoder::new(&[0x64, b'a', b'b']).decode_bytes().unwrap_err();
        assert!(matches!(
            err,
            PersistError::Format(FormatError::LengthOverrun { len: 100, .. })
        ));

        let err = IrDecoder::new(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFE])
            .decode_bytes()
            .unwrap_err();
        assert!(matches!(
            err,
            PersistError::Format(FormatError::NegativeLength { len: -2, .. })
        ));
    }

    #[test]
    fn test_strings_with_encoding() {
        let mut enc = IrEncoder::new();
        enc.encode_byte_str(&ByteStr::new(vec![0xE3, 0x81, 0x82], Encoding::EucJp))
            .unwrap();
        enc.encode_encoding(None).unwrap();
        enc.encode_string_array(&["a".to_string(), "bb".to_string()])
            .unwrap();

        let mut dec = IrDecoder::new(enc.as_bytes());
        let s = dec.decode_byte_str().unwrap();
        assert_eq!(s.encoding, Encoding::EucJp);
        assert_eq!(s.as_bytes(), &[0xE3, 0x81, 0x82]);
        assert_eq!(dec.decode_encoding().unwrap(), None);
        assert_eq!(dec.decode_string_array().unwrap(), vec!["a", "bb"]);
        assert!(dec.is_at_end());
    }

    #[test]
    fn test_unknown_encoding_name() {
        let mut enc = IrEncoder::new();
        enc.encode_string("KLINGON").unwrap();
        let err = IrDecoder::new(enc.as_bytes()).decode_encoding().unwrap_err();
        assert!(matches!(
            err,
            PersistError::Format(FormatError::UnknownEncoding { ref name, offset: 0 }) if name == "KLINGON"
        ));
    }

    #[test]
    fn test_optional_index() {
        let mut enc = IrEncoder::new();
        enc.encode_optional_index(None, "index").unwrap();
        enc.encode_optional_index(Some(3), "index").unwrap();
        let mut dec = IrDecoder::new(enc.as_bytes());
        assert_eq!(dec.decode_optional_index("index").unwrap(), None);
        assert_eq!(dec.decode_optional_index("index").unwrap(), Some(3));
    }

    #[test]
    fn test_u32_beyond_int_range() {
        let mut enc = IrEncoder::new();
        let err = enc.encode_u32(u32::MAX, "line").unwrap_err();
        assert!(matches!(
            err,
            PersistError::Encoding(EncodingError::TooLarge { what: "line", .. })
        ));
    }

    #[test]
    fn test_patch_u32() {
        let mut enc = IrEncoder::new();
        enc.write_raw(&[0; 8]);
        enc.patch_u32(4, 0x0102_0304).unwrap();
        assert_eq!(enc.as_bytes(), &[0, 0, 0, 0, 1, 2, 3, 4]);
        assert!(enc.patch_u32(6, 1).is_err());
    }

    proptest! {
        #[test]
        fn prop_int_roundtrip(value in any::<i32>()) {
            let mut enc = IrEncoder::new();
            enc.encode_int(value);
            prop_assert_eq!(IrDecoder::new(enc.as_bytes()).decode_int().unwrap(), value);
        }

        #[test]
        fn prop_long_roundtrip(value in any::<i64>()) {
            let mut enc = IrEncoder::new();
            enc.encode_long(value);
            prop_assert_eq!(IrDecoder::new(enc.as_bytes()).decode_long().unwrap(), value);
        }

        #[test]
        fn prop_double_bits_roundtrip(value in any::<f64>()) {
            let mut enc = IrEncoder::new();
            enc.encode_double(value);
            let back = IrDecoder::new(enc.as_bytes()).decode_double().unwrap();
            prop_assert_eq!(back.to_bits(), value.to_bits());
        }

        #[test]
        fn prop_bignum_roundtrip(value in any::<i128>()) {
            let big = BigInt::from(value) * BigInt::from(u64::MAX);
            let mut enc = IrEncoder::new();
            enc.encode_bignum(&big).unwrap();
            prop_assert_eq!(IrDecoder::new(enc.as_bytes()).decode_bignum().unwrap(), big);
        }
    }
}
