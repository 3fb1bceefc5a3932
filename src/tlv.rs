//! BER-TLV (tag-length-value) decoding

// Adapted from yubico-piv-tool:
// <https://github.com/Yubico/yubico-piv-tool/>
//
// Copyright (c) 2014-2016 Yubico AB
// All rights reserved.
//
// Redistribution and use in source and binary forms, with or without
// modification, are permitted provided that the following conditions are
// met:
//
//   * Redistributions of source code must retain the above copyright
//     notice, this list of conditions and the following disclaimer.
//
//   * Redistributions in binary form must reproduce the above
//     copyright notice, this list of conditions and the following
//     disclaimer in the documentation and/or other materials provided
//     with the distribution.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS
// "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT
// LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR
// A PARTICULAR PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT
// OWNER OR CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL,
// SPECIAL, EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT
// LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE,
// DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY
// THEORY OF LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT
// (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE
// OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

use crate::{Error, Result};
use nom::{
    bytes::complete::{take, take_while},
    combinator::map,
    error::{Error as NomError, ErrorKind},
    number::complete::{be_u16, u8},
    IResult,
};

/// Maximum nesting of constructed data objects which will be descended into.
pub const MAX_DEPTH: usize = 100;

/// Is the given (one or two byte) tag a constructed data object?
pub fn is_constructed(tag: u16) -> bool {
    let lead = if tag > 0xff { (tag >> 8) as u8 } else { tag as u8 };
    lead & 0x20 != 0
}

/// Search `buffer` for the data object with the given tag and return its value.
///
/// Constructed data objects are searched before their own tag is compared,
/// down to [`MAX_DEPTH`] levels. Filler bytes (`00` or `FF`) between data
/// objects are skipped. Returns `None` if the tag is absent or if any
/// tag/length/value in the way is truncated or malformed.
pub fn find(tag: u16, buffer: &[u8]) -> Option<&[u8]> {
    find_nested(tag, buffer, 0)
}

fn find_nested(tag: u16, mut buffer: &[u8], depth: usize) -> Option<&[u8]> {
    loop {
        let (rest, (this_tag, constructed, value)) = record(buffer).ok()?;

        if constructed && depth < MAX_DEPTH {
            if let Some(found) = find_nested(tag, value, depth + 1) {
                return Some(found);
            }
        }

        if this_tag == tag {
            return Some(value);
        }

        buffer = rest;
    }
}

/// Parse a single data object, skipping any filler before it.
fn record(input: &[u8]) -> IResult<&[u8], (u16, bool, &[u8])> {
    let (input, _) = take_while(|b: u8| b == 0x00 || b == 0xff)(input)?;
    let (input, (tag, constructed)) = parse_tag(input)?;
    let (input, len) = parse_length(input)?;
    let (input, value) = take(len)(input)?;
    Ok((input, (tag, constructed, value)))
}

/// Parse a one or two byte tag, returning it with its constructed bit.
fn parse_tag(input: &[u8]) -> IResult<&[u8], (u16, bool)> {
    let (rest, first) = u8(input)?;
    let constructed = first & 0x20 != 0;

    if first & 0x1f != 0x1f {
        return Ok((rest, (first.into(), constructed)));
    }

    let (rest, second) = u8(rest)?;

    // only tags up to 2 bytes are supported
    if second & 0x80 != 0 {
        return Err(nom::Err::Error(NomError::new(input, ErrorKind::Tag)));
    }

    Ok((rest, (u16::from_be_bytes([first, second]), constructed)))
}

/// Parse a length field.
///
/// APDU responses are limited to 65535 bytes, so anything past `82 xx xx`
/// is rejected.
fn parse_length(input: &[u8]) -> IResult<&[u8], usize> {
    let (rest, first) = u8(input)?;

    match first {
        len if len < 0x80 => Ok((rest, len.into())),
        0x81 => map(u8, usize::from)(rest),
        0x82 => map(be_u16, usize::from)(rest),
        _ => Err(nom::Err::Error(NomError::new(input, ErrorKind::LengthValue))),
    }
}

/// Append a length field for `length` to `buffer`.
fn write_length(buffer: &mut Vec<u8>, length: usize) -> Result<()> {
    if length < 0x80 {
        buffer.push(length as u8);
    } else if length < 0x100 {
        buffer.extend_from_slice(&[0x81, length as u8]);
    } else if length <= 0xffff {
        buffer.push(0x82);
        buffer.extend_from_slice(&(length as u16).to_be_bytes());
    } else {
        return Err(Error::SizeError);
    }

    Ok(())
}

/// Append a data object with the given tag and value to `buffer`.
pub fn write(buffer: &mut Vec<u8>, tag: u16, value: &[u8]) -> Result<()> {
    if tag > 0xff {
        buffer.extend_from_slice(&tag.to_be_bytes());
    } else {
        buffer.push(tag as u8);
    }

    write_length(buffer, value.len())?;
    buffer.extend_from_slice(value);
    Ok(())
}

/// A decoded data object.
///
/// Only constructed data objects have children. Two data objects are equal
/// when their tags match and either their values match (primitive) or their
/// children match pairwise in order (constructed). Constructed data objects
/// left undecoded past [`MAX_DEPTH`] are compared by value.
#[derive(Clone, Debug)]
pub struct Tlv {
    tag: u16,
    value: Vec<u8>,
    children: Vec<Tlv>,
}

impl Tlv {
    /// Create a primitive data object.
    ///
    /// Returns [`Error::ParseError`] if `tag` is a constructed tag; use
    /// [`Tlv::constructed`] for those.
    pub fn new(tag: u16, value: impl Into<Vec<u8>>) -> Result<Self> {
        if is_constructed(tag) {
            return Err(Error::ParseError);
        }

        Ok(Self {
            tag,
            value: value.into(),
            children: vec![],
        })
    }

    /// Create a constructed data object out of its children.
    ///
    /// Returns [`Error::ParseError`] if `tag` is not a constructed tag.
    pub fn constructed(tag: u16, children: Vec<Tlv>) -> Result<Self> {
        if !is_constructed(tag) {
            return Err(Error::ParseError);
        }

        let mut value = vec![];
        for child in &children {
            child.encode_into(&mut value)?;
        }

        Ok(Self {
            tag,
            value,
            children,
        })
    }

    /// Decode every data object in `buffer`.
    ///
    /// Values of constructed data objects are decoded recursively; beyond
    /// [`MAX_DEPTH`] they are kept as raw values without children.
    pub fn decode(buffer: &[u8]) -> Result<Vec<Tlv>> {
        Self::decode_nested(buffer, 0)
    }

    fn decode_nested(mut buffer: &[u8], depth: usize) -> Result<Vec<Tlv>> {
        let mut objects = vec![];

        loop {
            let (rest, _) = take_while::<_, _, NomError<&[u8]>>(|b: u8| b == 0x00 || b == 0xff)(
                buffer,
            )
            .map_err(|_| Error::ParseError)?;

            if rest.is_empty() {
                return Ok(objects);
            }

            let (rest, (tag, constructed, value)) = record(rest).map_err(|_| Error::ParseError)?;

            let children = if constructed && depth < MAX_DEPTH {
                Self::decode_nested(value, depth + 1)?
            } else {
                vec![]
            };

            objects.push(Tlv {
                tag,
                value: value.to_vec(),
                children,
            });

            buffer = rest;
        }
    }

    /// Tag of this data object
    pub fn tag(&self) -> u16 {
        self.tag
    }

    /// Raw value of this data object
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Children of this data object (empty for primitive data objects)
    pub fn children(&self) -> &[Tlv] {
        &self.children
    }

    /// Is this a constructed data object?
    pub fn is_constructed(&self) -> bool {
        is_constructed(self.tag)
    }

    /// Get the first direct child with the given tag
    pub fn get(&self, tag: u16) -> Option<&Tlv> {
        self.children.iter().find(|child| child.tag == tag)
    }

    /// Follow a path of tags through direct children
    pub fn get_path(&self, path: &[u16]) -> Option<&Tlv> {
        path.iter().try_fold(self, |node, &tag| node.get(tag))
    }

    /// Search all descendants depth-first for the given tag
    pub fn find(&self, tag: u16) -> Option<&Tlv> {
        self.children
            .iter()
            .find_map(|child| child.find(tag).or_else(|| (child.tag == tag).then_some(child)))
    }

    /// Serialize this data object
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buffer = vec![];
        self.encode_into(&mut buffer)?;
        Ok(buffer)
    }

    fn encode_into(&self, buffer: &mut Vec<u8>) -> Result<()> {
        write(buffer, self.tag, &self.value)
    }
}

impl PartialEq for Tlv {
    fn eq(&self, other: &Self) -> bool {
        if self.tag != other.tag {
            return false;
        }

        // constructed values past the depth limit were never decoded
        let decoded = !self.children.is_empty() || !other.children.is_empty();

        if self.is_constructed() && decoded {
            self.children == other.children
        } else {
            self.value == other.value
        }
    }
}

impl Eq for Tlv {}

/// A data object in the "simple TLV" format used by management commands:
/// one byte tag and one byte length, or `FF` followed by a two byte length.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SimpleTlv<'a> {
    /// Tag
    pub tag: u8,

    /// Value
    pub value: &'a [u8],
}

impl<'a> SimpleTlv<'a> {
    /// Parse a single `SimpleTlv`, returning the remainder of the buffer.
    fn parse(input: &'a [u8]) -> IResult<&'a [u8], Self> {
        let (input, tag) = u8(input)?;
        let (input, len) = match u8(input)? {
            (input, 0xff) => map(be_u16, usize::from)(input)?,
            (input, len) => (input, len.into()),
        };
        let (input, value) = take(len)(input)?;
        Ok((input, SimpleTlv { tag, value }))
    }
}

/// Decode a buffer consisting entirely of [`SimpleTlv`] data objects.
pub fn decode_simple(mut buffer: &[u8]) -> Result<Vec<SimpleTlv<'_>>> {
    let mut objects = vec![];

    while !buffer.is_empty() {
        let (rest, object) = SimpleTlv::parse(buffer).map_err(|_| Error::ParseError)?;
        objects.push(object);
        buffer = rest;
    }

    Ok(objects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn find_two_byte_tag() {
        let mut buffer = vec![];
        write(&mut buffer, 0x5f50, b"https://example.com").unwrap();
        assert_eq!(buffer[..3], hex!("5f 50 13"));
        assert_eq!(find(0x5f50, &buffer), Some(&b"https://example.com"[..]));
        assert_eq!(find(0x5f52, &buffer), None);
    }

    #[test]
    fn find_nested() {
        // 6E { 4F <aid>, 73 { C0 <caps> } }
        let buffer = hex!("6e 0d 4f 03 d2 76 00 73 06 c0 04 01 02 03 04");
        assert_eq!(find(0xc0, &buffer), Some(&hex!("01 02 03 04")[..]));
        assert_eq!(find(0x4f, &buffer), Some(&hex!("d2 76 00")[..]));
        assert_eq!(find(0x73, &buffer), Some(&hex!("c0 04 01 02 03 04")[..]));
    }

    #[test]
    fn find_skips_filler() {
        let buffer = hex!("00 ff 00 5e 02 61 62 ff ff 93 03 00 00 07");
        assert_eq!(find(0x5e, &buffer), Some(&b"ab"[..]));
        assert_eq!(find(0x93, &buffer), Some(&hex!("00 00 07")[..]));
    }

    #[test]
    fn find_long_lengths() {
        let mut value = vec![0xaa; 0x90];
        let mut buffer = hex!("5f 2d 81 90").to_vec();
        buffer.extend_from_slice(&value);
        assert_eq!(find(0x5f2d, &buffer), Some(&value[..]));

        value.resize(0x123, 0xbb);
        let mut buffer = hex!("7f 21 82 01 23").to_vec();
        buffer.extend_from_slice(&value);
        assert_eq!(find(0x7f21, &buffer).map(<[u8]>::len), Some(0x123));
    }

    #[test]
    fn find_rejects_malformed_length() {
        assert_eq!(find(0x5e, &hex!("5e 83 00 00 01 aa")), None);
        assert_eq!(find(0x5e, &hex!("5e 84")), None);
        assert_eq!(find(0x5e, &hex!("5e 80")), None);
        // a malformed sibling poisons the whole parse
        assert_eq!(find(0x93, &hex!("5e 01 aa 4f ff 93 01 01")), None);
    }

    #[test]
    fn find_rejects_truncated_input() {
        assert_eq!(find(0x5e, &[]), None);
        assert_eq!(find(0x5e, &hex!("5e")), None);
        assert_eq!(find(0x5e, &hex!("5e 05 01 02")), None);
        assert_eq!(find(0x5e, &hex!("5e 81")), None);
        assert_eq!(find(0x5e, &hex!("5e 82 01")), None);
        assert_eq!(find(0x5f50, &hex!("5f")), None);
    }

    #[test]
    fn find_depth_limit() {
        // MAX_DEPTH + 2 levels of nested 0x70 templates around a 0x93 leaf
        let mut buffer = hex!("93 01 2a").to_vec();
        for _ in 0..MAX_DEPTH + 2 {
            let mut outer = vec![];
            write(&mut outer, 0x70, &buffer).unwrap();
            buffer = outer;
        }
        assert_eq!(find(0x93, &buffer), None);

        let mut buffer = hex!("93 01 2a").to_vec();
        for _ in 0..MAX_DEPTH {
            let mut outer = vec![];
            write(&mut outer, 0x70, &buffer).unwrap();
            buffer = outer;
        }
        assert_eq!(find(0x93, &buffer), Some(&[0x2a][..]));
    }

    #[test]
    fn constructed_bit() {
        assert!(is_constructed(0x65));
        assert!(is_constructed(0x7f21));
        assert!(!is_constructed(0x5f50));
        assert!(!is_constructed(0xc4));
    }

    #[test]
    fn decode_tree() {
        let buffer = hex!("65 10 5b 05 41 6c 69 63 65 5f 2d 02 65 6e 5f 35 01 32 00 00 93 01 05");
        let objects = Tlv::decode(&buffer).unwrap();
        assert_eq!(objects.len(), 2);

        let cardholder = &objects[0];
        assert_eq!(cardholder.tag(), 0x65);
        assert_eq!(cardholder.children().len(), 3);
        assert_eq!(cardholder.get(0x5b).unwrap().value(), b"Alice");
        assert_eq!(cardholder.find(0x5f35).unwrap().value(), b"2");
        assert!(objects[1].children().is_empty());

        let expected = Tlv::constructed(
            0x65,
            vec![
                Tlv::new(0x5b, &b"Alice"[..]).unwrap(),
                Tlv::new(0x5f2d, &b"en"[..]).unwrap(),
                Tlv::new(0x5f35, &b"2"[..]).unwrap(),
            ],
        )
        .unwrap();
        assert_eq!(cardholder, &expected);
        assert_eq!(expected.encode().unwrap(), buffer[..18]);
    }

    #[test]
    fn equality_is_order_sensitive() {
        let c0 = Tlv::new(0xc0, [1]).unwrap();
        let c1 = Tlv::new(0xc1, [2]).unwrap();
        let a = Tlv::constructed(0x73, vec![c0.clone(), c1.clone()]).unwrap();
        let b = Tlv::constructed(0x73, vec![c1, c0]).unwrap();
        assert_ne!(a, b);
        assert_ne!(Tlv::new(0xc0, [1]), Tlv::new(0xc0, [2]));
        assert!(Tlv::constructed(0xc0, vec![]).is_err());
    }

    #[test]
    fn primitive_constructor_rejects_templates() {
        assert_eq!(Tlv::new(0x73, [0xc0, 0x00]), Err(Error::ParseError));
        assert_eq!(Tlv::new(0x7f21, Vec::new()), Err(Error::ParseError));
        assert!(Tlv::new(0x5f50, *b"url").is_ok());
    }

    #[test]
    fn equality_past_depth_limit() {
        let nest = |leaf: u8| {
            let mut buffer = vec![0x93, 0x01, leaf];
            for _ in 0..MAX_DEPTH + 2 {
                let mut outer = vec![];
                write(&mut outer, 0x70, &buffer).unwrap();
                buffer = outer;
            }
            Tlv::decode(&buffer).unwrap()
        };

        assert_eq!(nest(1), nest(1));
        assert_ne!(nest(1), nest(2));
    }

    #[test]
    fn decode_rejects_malformed() {
        assert_eq!(Tlv::decode(&hex!("65 03 5b 05 41")), Err(Error::ParseError));
        assert_eq!(Tlv::decode(&hex!("5b 83 01")), Err(Error::ParseError));
        assert_eq!(Tlv::decode(&hex!("00 ff")), Ok(vec![]));
    }

    #[test]
    fn simple_tlv() {
        let buffer = hex!("02 04 00 bc 61 4e 05 03 05 04 03 0f ff 00 02 ab cd");
        let objects = decode_simple(&buffer).unwrap();
        assert_eq!(
            objects,
            [
                SimpleTlv { tag: 0x02, value: &hex!("00 bc 61 4e") },
                SimpleTlv { tag: 0x05, value: &hex!("05 04 03") },
                SimpleTlv { tag: 0x0f, value: &hex!("ab cd") },
            ]
        );
        assert_eq!(decode_simple(&hex!("02 04 00")), Err(Error::ParseError));
        assert_eq!(decode_simple(&hex!("02")), Err(Error::ParseError));
    }
}
