// SPDX-License-Identifier: MIT
//! Node buffer engine
//!
//! A [`Node`] owns one contiguous byte payload and exposes bounds-checked
//! byte-level and typed element-level read/write/insert/trim operations.
//! Every mutation that changes the payload size reallocates to the exact new
//! size; no spare capacity is retained across mutations. Repeated small
//! inserts are therefore O(n) each, which is the documented trade-off of the
//! format.
//!
//! All failures are check-then-act: a bounds violation is detected before
//! any byte is touched, and the buffer is left unchanged.

use crate::format::NodeType;
use std::io::Cursor;

/// Errors from buffer operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NodeError {
    #[error("range {offset}..{offset}+{count} out of bounds for buffer of {len} bytes")]
    OutOfRange {
        offset: usize,
        count: usize,
        len: usize,
    },

    #[error("failed to allocate payload of {0} bytes")]
    Allocation(usize),

    #[error("buffer length {len} is not a multiple of element size {elem}")]
    Misaligned { len: usize, elem: usize },

    #[error("payload bytes are not valid UTF-8")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}

mod sealed {
    pub trait Sealed {}
}

/// Fixed-size element type usable with the typed buffer operations.
///
/// Elements cross the buffer boundary as little-endian bytes, matching the
/// wire byte order of the format. Implemented for the 8/16/32/64-bit
/// integer and floating-point primitives; not implementable outside this
/// crate.
pub trait Element: sealed::Sealed + Copy {
    /// Encoded size in bytes
    const SIZE: usize;

    /// Encode into `dst`, which is exactly `SIZE` bytes
    fn write_le(&self, dst: &mut [u8]);

    /// Decode from `src`, which is exactly `SIZE` bytes
    fn read_le(src: &[u8]) -> Self;
}

macro_rules! impl_element {
    ($($ty:ty),*) => {
        $(
            impl sealed::Sealed for $ty {}

            impl Element for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                #[inline]
                fn write_le(&self, dst: &mut [u8]) {
                    dst.copy_from_slice(&self.to_le_bytes());
                }

                #[inline]
                fn read_le(src: &[u8]) -> Self {
                    <$ty>::from_le_bytes(src.try_into().unwrap())
                }
            }
        )*
    };
}

impl_element!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

/// One named, indexed, typed, variable-length byte record
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    name: String,
    index: i32,
    node_type: NodeType,
    payload: Vec<u8>,
}

impl Node {
    /// Create an empty node with no backing allocation
    pub fn new(name: impl Into<String>, index: i32, node_type: NodeType) -> Self {
        Self {
            name: name.into(),
            index,
            node_type,
            payload: Vec::new(),
        }
    }

    /// Create a node around an existing payload.
    ///
    /// The payload is shrunk to its exact length to uphold the
    /// no-spare-capacity invariant.
    pub fn with_payload(
        name: impl Into<String>,
        index: i32,
        node_type: NodeType,
        mut payload: Vec<u8>,
    ) -> Self {
        payload.shrink_to_fit();
        Self {
            name: name.into(),
            index,
            node_type,
            payload,
        }
    }

    /// Node name (first identity component)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Node index (second identity component)
    pub fn index(&self) -> i32 {
        self.index
    }

    /// Declared content shape
    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    /// Re-tag the declared content shape (the payload is untouched)
    pub fn set_node_type(&mut self, node_type: NodeType) {
        self.node_type = node_type;
    }

    /// Current payload size in bytes
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Zero-copy view of the full payload
    pub fn as_slice(&self) -> &[u8] {
        &self.payload
    }

    /// `Read`-able cursor over the payload, without copying
    pub fn as_cursor(&self) -> Cursor<&[u8]> {
        Cursor::new(&self.payload)
    }

    /// Drop the backing allocation and reset the size to zero.
    ///
    /// Idempotent: releasing an already-released node is a no-op. The same
    /// release also happens automatically on drop.
    pub fn release(&mut self) {
        self.payload = Vec::new();
    }

    /// Bounds check shared by read and strict write: `offset` must lie in
    /// `[0, len)` and `offset + count` must not exceed `len`.
    #[inline]
    fn check_range(&self, offset: usize, count: usize) -> Result<(), NodeError> {
        let len = self.payload.len();
        if offset >= len || count > len - offset {
            return Err(NodeError::OutOfRange { offset, count, len });
        }
        Ok(())
    }

    /// Grow the payload to exactly `new_len` bytes, zero-filling the tail
    fn grow_exact(&mut self, new_len: usize) -> Result<(), NodeError> {
        let additional = new_len - self.payload.len();
        if additional == 0 {
            return Ok(());
        }
        self.payload
            .try_reserve_exact(additional)
            .map_err(|_| NodeError::Allocation(new_len))?;
        self.payload.resize(new_len, 0);
        Ok(())
    }

    /// Shrink the payload to exactly `new_len` bytes
    fn shrink_exact(&mut self, new_len: usize) {
        self.payload.truncate(new_len);
        self.payload.shrink_to_fit();
    }

    /// Copy `dst.len()` bytes out of the payload starting at `offset`.
    ///
    /// Fails `OutOfRange` if `offset` is outside `[0, len)` or the range
    /// runs past the end. No side effects on the node.
    pub fn read_bytes(&self, offset: usize, dst: &mut [u8]) -> Result<(), NodeError> {
        self.check_range(offset, dst.len())?;
        dst.copy_from_slice(&self.payload[offset..offset + dst.len()]);
        Ok(())
    }

    /// Copy `src` into the payload at `offset` without growing.
    ///
    /// Bounds are checked against the current size exactly like
    /// [`read_bytes`](Self::read_bytes).
    pub fn write_bytes(&mut self, offset: usize, src: &[u8]) -> Result<(), NodeError> {
        self.check_range(offset, src.len())?;
        self.payload[offset..offset + src.len()].copy_from_slice(src);
        Ok(())
    }

    /// Copy `src` into the payload at `offset`, growing the buffer when the
    /// write runs past the current end.
    ///
    /// `offset` may be anywhere in `[0, len]`; `offset == len` appends. When
    /// growth skips over bytes between the old end and `offset`, those gap
    /// bytes are zero-filled here, but callers must not rely on their value.
    pub fn write_bytes_expanding(&mut self, offset: usize, src: &[u8]) -> Result<(), NodeError> {
        let len = self.payload.len();
        if offset > len {
            return Err(NodeError::OutOfRange {
                offset,
                count: src.len(),
                len,
            });
        }
        let end = offset
            .checked_add(src.len())
            .ok_or(NodeError::OutOfRange {
                offset,
                count: src.len(),
                len,
            })?;
        if end > len {
            self.grow_exact(end)?;
        }
        self.payload[offset..end].copy_from_slice(src);
        Ok(())
    }

    /// Insert `src` at `offset`, shifting existing bytes at or beyond
    /// `offset` rightward.
    ///
    /// `offset` may be anywhere in `[0, len]`; inserting at the end appends.
    pub fn insert_bytes(&mut self, offset: usize, src: &[u8]) -> Result<(), NodeError> {
        let old_len = self.payload.len();
        if offset > old_len {
            return Err(NodeError::OutOfRange {
                offset,
                count: src.len(),
                len: old_len,
            });
        }
        if src.is_empty() {
            return Ok(());
        }

        // Grow first, then move the tail right with an overlap-safe copy,
        // then fill the gap.
        self.grow_exact(old_len + src.len())?;
        self.payload.copy_within(offset..old_len, offset + src.len());
        self.payload[offset..offset + src.len()].copy_from_slice(src);
        Ok(())
    }

    /// Delete `count` bytes starting at `offset`, shifting the tail left and
    /// shrinking the buffer.
    ///
    /// `offset` must lie in `[0, len)` and `offset + count` must not exceed
    /// `len`.
    pub fn trim_bytes(&mut self, offset: usize, count: usize) -> Result<(), NodeError> {
        self.check_range(offset, count)?;
        let len = self.payload.len();
        self.payload.copy_within(offset + count..len, offset);
        self.shrink_exact(len - count);
        Ok(())
    }

    /// Decode `count` payload bytes at `offset` as UTF-8
    pub fn read_string(&self, offset: usize, count: usize) -> Result<String, NodeError> {
        self.check_range(offset, count)?;
        let text = std::str::from_utf8(&self.payload[offset..offset + count])?;
        Ok(text.to_string())
    }

    /// Decode a null-terminated UTF-8 string starting at `offset`.
    ///
    /// Scans forward until the first zero byte or the end of the buffer,
    /// whichever comes first, and returns the decoded text together with the
    /// number of bytes scanned (the terminator, if any, is not counted).
    /// `offset == len` is allowed and yields an empty string.
    pub fn read_string_nul(&self, offset: usize) -> Result<(String, usize), NodeError> {
        let len = self.payload.len();
        if offset > len {
            return Err(NodeError::OutOfRange {
                offset,
                count: 0,
                len,
            });
        }
        let tail = &self.payload[offset..];
        let scanned = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
        let text = std::str::from_utf8(&tail[..scanned])?;
        Ok((text.to_string(), scanned))
    }

    /// Convert an element offset/count into a byte offset/count
    #[inline]
    fn elem_range<T: Element>(
        &self,
        elem_offset: usize,
        elem_count: usize,
    ) -> Result<(usize, usize), NodeError> {
        let offset = elem_offset
            .checked_mul(T::SIZE)
            .ok_or(NodeError::OutOfRange {
                offset: elem_offset,
                count: elem_count,
                len: self.payload.len(),
            })?;
        let count = elem_count
            .checked_mul(T::SIZE)
            .ok_or(NodeError::OutOfRange {
                offset: elem_offset,
                count: elem_count,
                len: self.payload.len(),
            })?;
        Ok((offset, count))
    }

    /// Read `dst.len()` elements starting at element index `elem_offset`
    pub fn read_elements<T: Element>(
        &self,
        elem_offset: usize,
        dst: &mut [T],
    ) -> Result<(), NodeError> {
        let (offset, count) = self.elem_range::<T>(elem_offset, dst.len())?;
        self.check_range(offset, count)?;
        for (i, slot) in dst.iter_mut().enumerate() {
            let at = offset + i * T::SIZE;
            *slot = T::read_le(&self.payload[at..at + T::SIZE]);
        }
        Ok(())
    }

    /// Write `src` starting at element index `elem_offset`, without growing
    pub fn write_elements<T: Element>(
        &mut self,
        elem_offset: usize,
        src: &[T],
    ) -> Result<(), NodeError> {
        let (offset, count) = self.elem_range::<T>(elem_offset, src.len())?;
        self.check_range(offset, count)?;
        for (i, value) in src.iter().enumerate() {
            let at = offset + i * T::SIZE;
            value.write_le(&mut self.payload[at..at + T::SIZE]);
        }
        Ok(())
    }

    /// Write `src` starting at element index `elem_offset`, growing the
    /// buffer when the write runs past the current end
    pub fn write_elements_expanding<T: Element>(
        &mut self,
        elem_offset: usize,
        src: &[T],
    ) -> Result<(), NodeError> {
        let (offset, _) = self.elem_range::<T>(elem_offset, src.len())?;
        self.write_bytes_expanding(offset, &encode_elements(src))
    }

    /// Insert `src` at element index `elem_offset`, shifting the tail right
    pub fn insert_elements<T: Element>(
        &mut self,
        elem_offset: usize,
        src: &[T],
    ) -> Result<(), NodeError> {
        let (offset, _) = self.elem_range::<T>(elem_offset, src.len())?;
        self.insert_bytes(offset, &encode_elements(src))
    }

    /// Copy the full payload out as a vector of elements.
    ///
    /// Fails `Misaligned` when the payload length is not a whole multiple of
    /// the element size; trailing bytes are never silently dropped.
    pub fn to_element_vec<T: Element>(&self) -> Result<Vec<T>, NodeError> {
        let len = self.payload.len();
        if len % T::SIZE != 0 {
            return Err(NodeError::Misaligned { len, elem: T::SIZE });
        }
        let mut out = Vec::with_capacity(len / T::SIZE);
        for chunk in self.payload.chunks_exact(T::SIZE) {
            out.push(T::read_le(chunk));
        }
        Ok(out)
    }
}

/// Encode a slice of elements into a little-endian byte vector
fn encode_elements<T: Element>(src: &[T]) -> Vec<u8> {
    let mut bytes = vec![0u8; src.len() * T::SIZE];
    for (i, value) in src.iter().enumerate() {
        value.write_le(&mut bytes[i * T::SIZE..(i + 1) * T::SIZE]);
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_with(bytes: &[u8]) -> Node {
        Node::with_payload("test", 0, NodeType::Any, bytes.to_vec())
    }

    #[test]
    fn test_new_node_is_empty() {
        let node = Node::new("empty", 3, NodeType::String);
        assert_eq!(node.len(), 0);
        assert!(node.is_empty());
        assert_eq!(node.name(), "empty");
        assert_eq!(node.index(), 3);
        assert_eq!(node.node_type(), NodeType::String);
    }

    #[test]
    fn test_set_node_type_leaves_payload_untouched() {
        let mut node = node_with(&[1, 2, 3, 4]);
        assert_eq!(node.node_type(), NodeType::Any);

        node.set_node_type(NodeType::Vec4i8);
        assert_eq!(node.node_type(), NodeType::Vec4i8);
        assert_eq!(node.as_slice(), &[1, 2, 3, 4]);
        assert_eq!(node.to_element_vec::<i8>().unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_read_bytes() {
        let node = node_with(b"hello world");
        let mut dst = [0u8; 5];
        node.read_bytes(6, &mut dst).unwrap();
        assert_eq!(&dst, b"world");
    }

    #[test]
    fn test_read_bounds_enforced() {
        let node = node_with(b"abcd");
        let mut dst = [0u8; 2];

        // offset == len always fails, even for zero-length reads
        assert!(matches!(
            node.read_bytes(4, &mut []),
            Err(NodeError::OutOfRange { .. })
        ));
        // range running past the end fails
        assert!(matches!(
            node.read_bytes(3, &mut dst),
            Err(NodeError::OutOfRange { .. })
        ));
        // empty buffer rejects everything
        let empty = Node::new("e", 0, NodeType::Any);
        assert!(empty.read_bytes(0, &mut []).is_err());
    }

    #[test]
    fn test_write_strict_no_growth() {
        let mut node = node_with(b"aaaa");
        node.write_bytes(1, b"bb").unwrap();
        assert_eq!(node.as_slice(), b"abba");

        // a strict write may not touch offset == len
        assert!(node.write_bytes(4, b"x").is_err());
        assert_eq!(node.as_slice(), b"abba");
        assert_eq!(node.len(), 4);
    }

    #[test]
    fn test_write_expanding_appends() {
        let mut node = node_with(b"abc");
        node.write_bytes_expanding(3, b"def").unwrap();
        assert_eq!(node.len(), 6);

        let mut back = [0u8; 3];
        node.read_bytes(3, &mut back).unwrap();
        assert_eq!(&back, b"def");
    }

    #[test]
    fn test_write_expanding_partial_overlap() {
        let mut node = node_with(b"abcdef");
        node.write_bytes_expanding(4, b"XYZ!").unwrap();
        assert_eq!(node.as_slice(), b"abcdXYZ!");
    }

    #[test]
    fn test_write_expanding_rejects_gap_offset() {
        let mut node = node_with(b"ab");
        // offset beyond len is out of range even in expanding mode
        assert!(node.write_bytes_expanding(3, b"x").is_err());
        assert_eq!(node.as_slice(), b"ab");
    }

    #[test]
    fn test_insert_middle() {
        let mut node = node_with(b"hed");
        node.insert_bytes(2, b"llo worl").unwrap();
        assert_eq!(node.as_slice(), b"hello world");
    }

    #[test]
    fn test_insert_at_ends() {
        let mut node = node_with(b"bc");
        node.insert_bytes(0, b"a").unwrap();
        node.insert_bytes(3, b"d").unwrap();
        assert_eq!(node.as_slice(), b"abcd");

        assert!(node.insert_bytes(5, b"x").is_err());
    }

    #[test]
    fn test_trim_middle() {
        let mut node = node_with(b"hello world");
        node.trim_bytes(5, 6).unwrap();
        assert_eq!(node.as_slice(), b"hello");
        assert_eq!(node.len(), 5);
    }

    #[test]
    fn test_trim_bounds() {
        let mut node = node_with(b"abcd");
        assert!(node.trim_bytes(4, 0).is_err());
        assert!(node.trim_bytes(2, 3).is_err());
        assert_eq!(node.as_slice(), b"abcd");
    }

    #[test]
    fn test_insert_trim_inverse() {
        let original = b"some payload bytes".to_vec();
        for offset in 0..=original.len() {
            let mut node = node_with(&original);
            node.insert_bytes(offset, b"INSERTED").unwrap();
            node.trim_bytes(offset, 8).unwrap();
            assert_eq!(node.as_slice(), &original[..], "offset {offset}");
        }
    }

    #[test]
    fn test_exact_size_after_mutations() {
        let mut node = node_with(&[1u8; 64]);
        node.trim_bytes(0, 48).unwrap();
        assert_eq!(node.len(), 16);
        node.insert_bytes(8, &[2u8; 8]).unwrap();
        assert_eq!(node.len(), 24);
    }

    #[test]
    fn test_release_idempotent() {
        let mut node = node_with(b"payload");
        node.release();
        assert_eq!(node.len(), 0);
        node.release();
        assert_eq!(node.len(), 0);
    }

    #[test]
    fn test_read_string() {
        let node = node_with("héllo".as_bytes());
        assert_eq!(node.read_string(0, 6).unwrap(), "héllo");
        // slicing through a multi-byte scalar fails
        assert!(matches!(
            node.read_string(0, 2),
            Err(NodeError::InvalidUtf8(_))
        ));
    }

    #[test]
    fn test_read_string_nul() {
        let node = node_with(b"key\0value");
        let (text, scanned) = node.read_string_nul(0).unwrap();
        assert_eq!(text, "key");
        assert_eq!(scanned, 3);

        // no terminator: scan runs to the end of the buffer
        let (text, scanned) = node.read_string_nul(4).unwrap();
        assert_eq!(text, "value");
        assert_eq!(scanned, 5);

        let (text, scanned) = node.read_string_nul(9).unwrap();
        assert_eq!(text, "");
        assert_eq!(scanned, 0);

        assert!(node.read_string_nul(10).is_err());
    }

    #[test]
    fn test_typed_roundtrip_f32() {
        let mut node = Node::new("vecs", 0, NodeType::Vec3f);
        let lanes = [1.0f32, -2.5, 0.125, 7.0, 8.0, 9.0];
        node.write_elements_expanding(0, &lanes).unwrap();
        assert_eq!(node.len(), 24);

        let mut back = [0.0f32; 6];
        node.read_elements(0, &mut back).unwrap();
        assert_eq!(back, lanes);

        // element offsets are in elements, not bytes
        let mut one = [0.0f32; 1];
        node.read_elements(5, &mut one).unwrap();
        assert_eq!(one[0], 9.0);
    }

    #[test]
    fn test_typed_write_strict_bounds() {
        let mut node = node_with(&[0u8; 8]);
        assert!(node.write_elements(0, &[1u32, 2]).is_ok());
        assert!(node.write_elements(1, &[3u32, 4]).is_err());
        assert_eq!(node.to_element_vec::<u32>().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_typed_insert() {
        let mut node = Node::new("ints", 0, NodeType::Int16);
        node.write_elements_expanding(0, &[10i16, 40]).unwrap();
        node.insert_elements(1, &[20i16, 30]).unwrap();
        assert_eq!(node.to_element_vec::<i16>().unwrap(), vec![10, 20, 30, 40]);
    }

    #[test]
    fn test_to_element_vec_strict() {
        let node = node_with(&[0u8; 10]);
        assert_eq!(node.to_element_vec::<u16>().unwrap().len(), 5);
        assert_eq!(
            node.to_element_vec::<u32>(),
            Err(NodeError::Misaligned { len: 10, elem: 4 })
        );
    }

    #[test]
    fn test_elements_are_little_endian() {
        let mut node = Node::new("le", 0, NodeType::Int32);
        node.write_elements_expanding(0, &[0x04030201u32]).unwrap();
        assert_eq!(node.as_slice(), &[0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_cursor_view() {
        use std::io::Read;
        let node = node_with(b"stream me");
        let mut text = String::new();
        node.as_cursor().read_to_string(&mut text).unwrap();
        assert_eq!(text, "stream me");
    }
}
