// SPDX-License-Identifier: MIT
//! Stream reader for consuming BNL streams
//!
//! The header is read and validated lazily on the first record request.
//! `left` tracks how many declared records remain; callers should loop
//! `while reader.left() > 0`. After any error the reader's position and
//! counters are indeterminate and the reader must be discarded.

use crate::format::{BnlHeader, HeaderError, BNL_HEADER_SIZE};
use crate::node::Node;
use crate::record::decode_node;
use std::io::Read;
use tracing::debug;

/// Errors that can occur during reading
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Header(#[from] HeaderError),

    #[error("no more nodes left in the stream")]
    NoMoreNodes,

    #[error("unknown node type tag {0}")]
    InvalidNodeType(i32),

    #[error("record field out of range: {field} = {value}")]
    FieldOutOfRange { field: &'static str, value: i64 },

    #[error("failed to allocate payload of {0} bytes")]
    Allocation(usize),

    #[error("record name is not valid UTF-8")]
    InvalidName(#[from] std::string::FromUtf8Error),
}

/// Reader for BNL streams
pub struct NodeStreamReader<R: Read> {
    source: R,
    header: Option<BnlHeader>,
    /// Stream-local position, drives record alignment
    pos: u64,
    /// Declared records remaining. Starts at 1 as a "header not yet read"
    /// sentinel; set to the declared count once the header is in.
    left: i64,
    count: i64,
}

impl<R: Read> NodeStreamReader<R> {
    /// Create a reader over `source`. Nothing is read until the header or
    /// a record is requested.
    pub fn new(source: R) -> Self {
        Self {
            source,
            header: None,
            pos: 0,
            left: 1,
            count: 0,
        }
    }

    /// Declared records remaining.
    ///
    /// Before the header has been read this is the sentinel value 1.
    pub fn left(&self) -> i64 {
        self.left
    }

    /// Declared record count from the header; 0 before the header is read
    pub fn count(&self) -> i64 {
        self.count
    }

    /// Read and validate the header if it has not been read yet
    pub fn header(&mut self) -> Result<BnlHeader, ReadError> {
        if let Some(header) = self.header {
            return Ok(header);
        }

        let mut raw = [0u8; BNL_HEADER_SIZE];
        self.source.read_exact(&mut raw)?;
        let header = BnlHeader::from_bytes(&raw)?;
        header.validate()?;

        self.count = header.count as i64;
        self.left = header.count as i64;
        self.pos = BNL_HEADER_SIZE as u64;
        self.header = Some(header);
        debug!(count = header.count, version = header.version, "read stream header");
        Ok(header)
    }

    /// Decode the next record.
    ///
    /// The first call reads and validates the header. The entry check fails
    /// `NoMoreNodes` only when `left` is strictly negative, so a call at
    /// `left == 0` is permitted; it then fails `NoMoreNodes` after the
    /// internal decrement, without touching the stream. Check `left() > 0`
    /// before calling to avoid relying on that edge.
    pub fn next(&mut self) -> Result<Node, ReadError> {
        if self.left < 0 {
            return Err(ReadError::NoMoreNodes);
        }
        self.header()?;

        self.left -= 1;
        if self.left < 0 {
            return Err(ReadError::NoMoreNodes);
        }

        let (node, pos) = decode_node(&mut self.source, self.pos)?;
        self.pos = pos;
        Ok(node)
    }

    /// Consume the reader and return the underlying source
    pub fn into_inner(self) -> R {
        self.source
    }
}
