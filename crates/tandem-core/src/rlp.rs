//! RLP (Recursive Length Prefix) codec.
//!
//! Canonical, minimal-length encoding for scalars, byte strings and nested
//! lists, plus a strict decoder.
//!
//! # Encoding rules
//!
//! - Single byte [0x00, 0x7f]: itself
//! - String [0x80, 0xb7]: 0x80 + len, then data
//! - String [0xb8, 0xbf]: 0xb7 + len_of_len, then len, then data
//! - List [0xc0, 0xf7]: 0xc0 + len, then items
//! - List [0xf8, 0xff]: 0xf7 + len_of_len, then len, then items
//!
//! Scalars are big-endian with no leading zero bytes; zero is the empty
//! string.
//!
//! # Decoding
//!
//! Every value has exactly one accepted encoding. The decoder rejects
//! truncated input, length headers that are not the shortest form, one-byte
//! strings below 0x80 that carry a header, scalars with leading zeros, and
//! nesting deeper than 16 levels.

use num_bigint::BigUint;
use num_traits::Zero;
use thiserror::Error;

/// Header offset for byte strings
pub const STRING_OFFSET: u8 = 0x80;

/// Header offset for lists
pub const LIST_OFFSET: u8 = 0xc0;

/// Payloads shorter than this use a single header byte.
const SHORT_LIMIT: usize = 56;

/// Maximum RLP nesting depth.
const MAX_DEPTH: usize = 16;

/// RLP decoding errors.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RlpError {
    /// Input is empty when data expected.
    #[error("empty input")]
    EmptyInput,

    /// Input too short for declared length.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// Length header is not the shortest possible form.
    #[error("non-canonical length header")]
    NonCanonicalLength,

    /// Single byte below 0x80 should be encoded as itself.
    #[error("single byte below 0x80 wrapped in a string header")]
    SingleByteMismatch,

    /// Scalar has leading zero bytes.
    #[error("scalar has a leading zero byte")]
    LeadingZero,

    /// Scalar does not fit the target integer type.
    #[error("scalar of {bytes} bytes exceeds {max} bytes")]
    ScalarOverflow { bytes: usize, max: usize },

    /// Length field is too large.
    #[error("length field overflows")]
    LengthOverflow,

    /// Exceeded maximum nesting depth.
    #[error("nesting exceeds 16 levels")]
    TooDeep,

    /// Expected list but got string.
    #[error("expected list, found string")]
    ExpectedList,

    /// Expected string but got list.
    #[error("expected string, found list")]
    ExpectedString,

    /// Extra data after RLP item.
    #[error("trailing bytes after item")]
    TrailingData,
}

// =============================================================================
// Encoding
// =============================================================================

/// Encodes a payload length header.
///
/// `offset` is [`STRING_OFFSET`] for byte strings and [`LIST_OFFSET`] for
/// lists; the disjoint ranges are what lets a decoder tell them apart.
pub fn encode_length(len: usize, offset: u8) -> Vec<u8> {
    if len < SHORT_LIMIT {
        return vec![offset + len as u8];
    }
    let len_bytes = minimal_be_bytes(len as u64);
    let mut result = Vec::with_capacity(1 + len_bytes.len());
    result.push(offset + 55 + len_bytes.len() as u8);
    result.extend_from_slice(&len_bytes);
    result
}

/// Encodes a byte slice as RLP.
pub fn encode_bytes(data: &[u8]) -> Vec<u8> {
    if data.len() == 1 && data[0] < STRING_OFFSET {
        return data.to_vec();
    }
    let mut result = encode_length(data.len(), STRING_OFFSET);
    result.extend_from_slice(data);
    result
}

/// Minimal big-endian bytes of an arbitrary-precision scalar (zero is empty).
pub fn scalar_to_bytes(value: &BigUint) -> Vec<u8> {
    if value.is_zero() {
        Vec::new()
    } else {
        value.to_bytes_be()
    }
}

/// Encodes an arbitrary-precision scalar as RLP.
pub fn encode_scalar(value: &BigUint) -> Vec<u8> {
    encode_bytes(&scalar_to_bytes(value))
}

/// Encodes a u64 as RLP.
pub fn encode_u64(value: u64) -> Vec<u8> {
    encode_bytes(&minimal_be_bytes(value))
}

/// Encodes a list of already-encoded items.
///
/// Nested lists are built by encoding the inner list first and passing the
/// result as one item.
pub fn encode_list<T: AsRef<[u8]>>(items: &[T]) -> Vec<u8> {
    let total: usize = items.iter().map(|item| item.as_ref().len()).sum();
    let mut result = encode_length(total, LIST_OFFSET);
    result.reserve(total);
    for item in items {
        result.extend_from_slice(item.as_ref());
    }
    result
}

/// Big-endian bytes with leading zeros stripped.
fn minimal_be_bytes(value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    bytes[start..].to_vec()
}

// =============================================================================
// Decoding
// =============================================================================

/// A decoded RLP item borrowing from the input buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RlpItem<'a> {
    /// A byte string (may be empty).
    String(&'a [u8]),
    /// A list of items.
    List(Vec<RlpItem<'a>>),
}

impl<'a> RlpItem<'a> {
    /// Returns the string payload.
    pub fn as_bytes(&self) -> Result<&'a [u8], RlpError> {
        match self {
            RlpItem::String(data) => Ok(data),
            RlpItem::List(_) => Err(RlpError::ExpectedString),
        }
    }

    /// Returns the list items.
    pub fn as_list(&self) -> Result<&[RlpItem<'a>], RlpError> {
        match self {
            RlpItem::List(items) => Ok(items),
            RlpItem::String(_) => Err(RlpError::ExpectedList),
        }
    }

    /// Interprets the string payload as a canonical arbitrary-precision scalar.
    pub fn as_scalar(&self) -> Result<BigUint, RlpError> {
        let data = canonical_scalar_bytes(self.as_bytes()?)?;
        Ok(BigUint::from_bytes_be(data))
    }

    /// Interprets the string payload as a canonical u64.
    pub fn as_u64(&self) -> Result<u64, RlpError> {
        let data = canonical_scalar_bytes(self.as_bytes()?)?;
        if data.len() > 8 {
            return Err(RlpError::ScalarOverflow {
                bytes: data.len(),
                max: 8,
            });
        }
        Ok(data.iter().fold(0u64, |acc, &byte| acc << 8 | byte as u64))
    }
}

fn canonical_scalar_bytes(data: &[u8]) -> Result<&[u8], RlpError> {
    if data.first() == Some(&0) {
        return Err(RlpError::LeadingZero);
    }
    Ok(data)
}

/// Decodes one RLP item from the front of `input`, returning the rest.
pub fn decode(input: &[u8]) -> Result<(RlpItem<'_>, &[u8]), RlpError> {
    decode_internal(input, 0)
}

/// Decodes a complete RLP item, rejecting trailing data.
pub fn decode_exact(input: &[u8]) -> Result<RlpItem<'_>, RlpError> {
    let (item, rest) = decode(input)?;
    if !rest.is_empty() {
        return Err(RlpError::TrailingData);
    }
    Ok(item)
}

fn decode_internal(input: &[u8], depth: usize) -> Result<(RlpItem<'_>, &[u8]), RlpError> {
    if depth > MAX_DEPTH {
        return Err(RlpError::TooDeep);
    }

    let first = *input.first().ok_or(RlpError::EmptyInput)?;

    match first {
        0x00..=0x7f => Ok((RlpItem::String(&input[..1]), &input[1..])),

        0x80..=0xb7 => {
            let len = (first - STRING_OFFSET) as usize;
            let (data, rest) = split_payload(input, 1, len)?;
            if len == 1 && data[0] < STRING_OFFSET {
                return Err(RlpError::SingleByteMismatch);
            }
            Ok((RlpItem::String(data), rest))
        }

        0xb8..=0xbf => {
            let len_of_len = (first - 0xb7) as usize;
            let len = decode_long_length(input, len_of_len)?;
            let (data, rest) = split_payload(input, 1 + len_of_len, len)?;
            Ok((RlpItem::String(data), rest))
        }

        0xc0..=0xf7 => {
            let len = (first - LIST_OFFSET) as usize;
            let (data, rest) = split_payload(input, 1, len)?;
            Ok((RlpItem::List(decode_list_items(data, depth + 1)?), rest))
        }

        0xf8..=0xff => {
            let len_of_len = (first - 0xf7) as usize;
            let len = decode_long_length(input, len_of_len)?;
            let (data, rest) = split_payload(input, 1 + len_of_len, len)?;
            Ok((RlpItem::List(decode_list_items(data, depth + 1)?), rest))
        }
    }
}

/// Reads the big-endian length that follows a long-form header byte.
fn decode_long_length(input: &[u8], len_of_len: usize) -> Result<usize, RlpError> {
    let len_bytes = input.get(1..1 + len_of_len).ok_or(RlpError::UnexpectedEof)?;

    if len_bytes[0] == 0 {
        return Err(RlpError::NonCanonicalLength);
    }

    let mut len = 0usize;
    for &byte in len_bytes {
        len = len.checked_mul(256).ok_or(RlpError::LengthOverflow)?;
        len = len.checked_add(byte as usize).ok_or(RlpError::LengthOverflow)?;
    }

    // Long form is only valid for payloads the short form cannot express
    if len < SHORT_LIMIT {
        return Err(RlpError::NonCanonicalLength);
    }
    Ok(len)
}

fn split_payload(input: &[u8], start: usize, len: usize) -> Result<(&[u8], &[u8]), RlpError> {
    let end = start.checked_add(len).ok_or(RlpError::LengthOverflow)?;
    if input.len() < end {
        return Err(RlpError::UnexpectedEof);
    }
    Ok((&input[start..end], &input[end..]))
}

fn decode_list_items(mut data: &[u8], depth: usize) -> Result<Vec<RlpItem<'_>>, RlpError> {
    let mut items = Vec::new();
    while !data.is_empty() {
        let (item, rest) = decode_internal(data, depth)?;
        items.push(item);
        data = rest;
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_length_boundaries() {
        assert_eq!(encode_length(0, STRING_OFFSET), vec![0x80]);
        assert_eq!(encode_length(55, STRING_OFFSET), vec![0xb7]);
        assert_eq!(encode_length(56, STRING_OFFSET), vec![0xb8, 0x38]);
        assert_eq!(encode_length(1024, LIST_OFFSET), vec![0xf9, 0x04, 0x00]);
    }

    #[test]
    fn test_encode_bytes() {
        assert_eq!(encode_bytes(b""), vec![0x80]);
        assert_eq!(encode_bytes(&[0x42]), vec![0x42]);
        assert_eq!(encode_bytes(&[0x00]), vec![0x00]);
        assert_eq!(encode_bytes(&[0x80]), vec![0x81, 0x80]);
        assert_eq!(encode_bytes(b"cat"), vec![0x83, b'c', b'a', b't']);
    }

    #[test]
    fn test_encode_long_bytes() {
        let data = vec![0xaa; 60];
        let encoded = encode_bytes(&data);
        assert_eq!(&encoded[..2], &[0xb8, 60]);
        assert_eq!(&encoded[2..], &data[..]);
    }

    #[test]
    fn test_encode_scalar() {
        assert_eq!(encode_scalar(&BigUint::zero()), vec![0x80]);
        assert_eq!(encode_scalar(&BigUint::from(127u8)), vec![0x7f]);
        assert_eq!(encode_scalar(&BigUint::from(128u8)), vec![0x81, 0x80]);
        assert_eq!(encode_scalar(&BigUint::from(1024u16)), vec![0x82, 0x04, 0x00]);
    }

    #[test]
    fn test_encode_scalar_wider_than_u64() {
        let value = BigUint::from(1u8) << 100;
        let encoded = encode_scalar(&value);
        assert_eq!(encoded[0], 0x80 + 13);
        assert_eq!(encoded[1], 0x10);
        assert!(encoded[2..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_encode_u64_matches_scalar() {
        for value in [0u64, 1, 0x7f, 0x80, 0xff, 0x100, 100_000, u64::MAX] {
            assert_eq!(encode_u64(value), encode_scalar(&BigUint::from(value)));
        }
    }

    #[test]
    fn test_encode_nested_list() {
        let inner = encode_list::<Vec<u8>>(&[]);
        assert_eq!(inner, vec![0xc0]);
        assert_eq!(encode_list(&[inner]), vec![0xc1, 0xc0]);
    }

    #[test]
    fn test_decode_single_byte() {
        let (item, rest) = decode(&[0x42]).unwrap();
        assert_eq!(item.as_bytes(), Ok(&[0x42][..]));
        assert!(rest.is_empty());
    }

    #[test]
    fn test_decode_empty_string() {
        let (item, rest) = decode(&[0x80]).unwrap();
        assert_eq!(item.as_bytes(), Ok(&[][..]));
        assert!(rest.is_empty());
    }

    #[test]
    fn test_decode_short_string() {
        let data = [0x83, b'c', b'a', b't'];
        let (item, _) = decode(&data).unwrap();
        assert_eq!(item.as_bytes(), Ok(&b"cat"[..]));
    }

    #[test]
    fn test_decode_nested_list() {
        let (item, _) = decode(&[0xc1, 0xc0]).unwrap();
        let list = item.as_list().unwrap();
        assert_eq!(list.len(), 1);
        assert!(list[0].as_list().unwrap().is_empty());
    }

    #[test]
    fn test_decode_long_list() {
        let items: Vec<Vec<u8>> = (0..30).map(|i| encode_bytes(&[0x80, i])).collect();
        let encoded = encode_list(&items);
        assert_eq!(encoded[0], 0xf8);

        let item = decode_exact(&encoded).unwrap();
        assert_eq!(item.as_list().unwrap().len(), 30);
    }

    #[test]
    fn test_as_scalar() {
        let (item, _) = decode(&[0x82, 0x04, 0x00]).unwrap();
        assert_eq!(item.as_scalar().unwrap(), BigUint::from(1024u16));
        assert_eq!(item.as_u64().unwrap(), 1024);

        let (item, _) = decode(&[0x80]).unwrap();
        assert!(item.as_scalar().unwrap().is_zero());
    }

    #[test]
    fn test_leading_zero_scalar_rejected() {
        let (item, _) = decode(&[0x82, 0x00, 0x01]).unwrap();
        assert_eq!(item.as_scalar(), Err(RlpError::LeadingZero));
        assert_eq!(item.as_u64(), Err(RlpError::LeadingZero));

        // Zero must be the empty string, not a literal 0x00
        let (item, _) = decode(&[0x00]).unwrap();
        assert_eq!(item.as_scalar(), Err(RlpError::LeadingZero));
    }

    #[test]
    fn test_u64_overflow() {
        let encoded = encode_bytes(&[0x01; 9]);
        let item = decode_exact(&encoded).unwrap();
        assert_eq!(item.as_u64(), Err(RlpError::ScalarOverflow { bytes: 9, max: 8 }));
        assert!(item.as_scalar().is_ok());
    }

    #[test]
    fn test_non_canonical_single_byte() {
        assert_eq!(decode(&[0x81, 0x42]), Err(RlpError::SingleByteMismatch));
    }

    #[test]
    fn test_long_form_for_short_payload_rejected() {
        let mut data = vec![0xb8, 0x05];
        data.extend_from_slice(b"hello");
        assert_eq!(decode(&data), Err(RlpError::NonCanonicalLength));

        let mut list = vec![0xf8, 0x01];
        list.push(0x01);
        assert_eq!(decode(&list), Err(RlpError::NonCanonicalLength));
    }

    #[test]
    fn test_leading_zero_length_rejected() {
        let mut data = vec![0xb9, 0x00, 0x40];
        data.extend_from_slice(&[0xaa; 64]);
        assert_eq!(decode(&data), Err(RlpError::NonCanonicalLength));
    }

    #[test]
    fn test_truncated_input() {
        assert_eq!(decode(&[]), Err(RlpError::EmptyInput));
        assert_eq!(decode(&[0x83, b'c', b'a']), Err(RlpError::UnexpectedEof));
        assert_eq!(decode(&[0xb8]), Err(RlpError::UnexpectedEof));
        assert_eq!(decode(&[0xc2, 0x80]), Err(RlpError::UnexpectedEof));
    }

    #[test]
    fn test_trailing_data() {
        assert_eq!(decode_exact(&[0x80, 0x80]), Err(RlpError::TrailingData));
    }

    #[test]
    fn test_depth_limit() {
        let mut encoded = encode_list::<Vec<u8>>(&[]);
        for _ in 0..=MAX_DEPTH {
            encoded = encode_list(&[encoded]);
        }
        assert_eq!(decode(&encoded), Err(RlpError::TooDeep));
    }

    #[test]
    fn test_type_mismatch() {
        let (item, _) = decode(&[0xc0]).unwrap();
        assert_eq!(item.as_bytes(), Err(RlpError::ExpectedString));

        let (item, _) = decode(&[0x80]).unwrap();
        assert_eq!(item.as_list().map(|l| l.len()), Err(RlpError::ExpectedList));
    }
}
