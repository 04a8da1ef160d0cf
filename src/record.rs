// SPDX-License-Identifier: MIT
//! Record codec
//!
//! Serializes one node to / from a byte stream in the exact BNL record
//! layout. Alignment padding is computed against the stream-local position,
//! which the stream codec threads through these functions; every record
//! therefore ends on a 16-byte boundary, both after the name section and
//! after the payload section.

use crate::format::{padding_after, NodeType, MAX_NAME_LEN, MAX_PAYLOAD_LEN, RECORD_ALIGN};
use crate::node::Node;
use crate::reader::ReadError;
use crate::writer::WriteError;
use std::io::{Read, Write};
use tracing::trace;

/// Internal chunk size for streaming payload bytes. Not a wire concern.
const PAYLOAD_CHUNK: usize = 64 * 1024;

const ZERO_PAD: [u8; RECORD_ALIGN as usize] = [0u8; RECORD_ALIGN as usize];

/// Encode one node at stream position `pos`, returning the new position.
///
/// Layout: `type:i32, index:i32, nameLen:i32, size:i32` (little-endian),
/// name bytes, zero padding to the next 16-byte boundary, payload bytes,
/// the same padding again. When a section already ends on a boundary a full
/// 16 zero bytes are still written (wire-compat rule, see
/// [`padding_after`]).
pub fn encode_node<W: Write>(node: &Node, sink: &mut W, mut pos: u64) -> Result<u64, WriteError> {
    let name_bytes = node.name().as_bytes();
    if name_bytes.len() > MAX_NAME_LEN {
        return Err(WriteError::NameTooLong {
            len: name_bytes.len(),
            max: MAX_NAME_LEN,
        });
    }
    if node.len() > MAX_PAYLOAD_LEN {
        return Err(WriteError::PayloadTooLarge {
            len: node.len(),
            max: MAX_PAYLOAD_LEN,
        });
    }

    sink.write_all(&(node.node_type() as i32).to_le_bytes())?;
    sink.write_all(&node.index().to_le_bytes())?;
    sink.write_all(&(name_bytes.len() as i32).to_le_bytes())?;
    sink.write_all(&(node.len() as i32).to_le_bytes())?;
    pos += 16;

    sink.write_all(name_bytes)?;
    pos += name_bytes.len() as u64;
    pos = write_padding(sink, pos)?;

    for chunk in node.as_slice().chunks(PAYLOAD_CHUNK) {
        sink.write_all(chunk)?;
    }
    pos += node.len() as u64;
    pos = write_padding(sink, pos)?;

    trace!(
        name = node.name(),
        index = node.index(),
        size = node.len(),
        pos,
        "encoded record"
    );
    Ok(pos)
}

/// Decode one node at stream position `pos`, returning it and the new
/// position.
///
/// The four leading fields are consumed in encode order; the payload
/// allocation happens before the name bytes are read, so an oversized
/// declared size fails before anything else is pulled off the stream.
pub fn decode_node<R: Read>(source: &mut R, mut pos: u64) -> Result<(Node, u64), ReadError> {
    let tag = read_i32(source)?;
    let index = read_i32(source)?;
    let name_len = read_i32(source)?;
    let size = read_i32(source)?;
    pos += 16;

    let node_type = NodeType::from_i32(tag).ok_or(ReadError::InvalidNodeType(tag))?;
    if name_len < 0 || name_len as usize > MAX_NAME_LEN {
        return Err(ReadError::FieldOutOfRange {
            field: "nameLen",
            value: name_len as i64,
        });
    }
    if size < 0 || size as usize > MAX_PAYLOAD_LEN {
        return Err(ReadError::FieldOutOfRange {
            field: "size",
            value: size as i64,
        });
    }
    let name_len = name_len as usize;
    let size = size as usize;

    let mut payload = Vec::new();
    payload
        .try_reserve_exact(size)
        .map_err(|_| ReadError::Allocation(size))?;
    payload.resize(size, 0);

    let mut name_bytes = vec![0u8; name_len];
    source.read_exact(&mut name_bytes)?;
    pos += name_len as u64;
    let name = String::from_utf8(name_bytes)?;
    pos = skip_padding(source, pos)?;

    source.read_exact(&mut payload)?;
    pos += size as u64;
    pos = skip_padding(source, pos)?;

    trace!(name = name.as_str(), index, size, pos, "decoded record");
    Ok((Node::with_payload(name, index, node_type, payload), pos))
}

/// Write the zero padding owed after position `pos`
fn write_padding<W: Write>(sink: &mut W, pos: u64) -> Result<u64, WriteError> {
    let pad = padding_after(pos);
    sink.write_all(&ZERO_PAD[..pad])?;
    Ok(pos + pad as u64)
}

/// Consume the zero padding owed after position `pos`.
///
/// The padding bytes are skipped, not verified.
fn skip_padding<R: Read>(source: &mut R, pos: u64) -> Result<u64, ReadError> {
    let pad = padding_after(pos);
    let mut scratch = [0u8; RECORD_ALIGN as usize];
    source.read_exact(&mut scratch[..pad])?;
    Ok(pos + pad as u64)
}

fn read_i32<R: Read>(source: &mut R) -> Result<i32, ReadError> {
    let mut buf = [0u8; 4];
    source.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}
