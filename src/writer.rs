// SPDX-License-Identifier: MIT
//! Stream writer for producing BNL streams
//!
//! The header is reserved lazily on the first record write and back-patched
//! with the final record count on [`finish`](NodeStreamWriter::finish). A
//! writer that never saw a record writes nothing at all: the only valid
//! empty BNL stream is zero bytes, never "header + zero records".

use crate::format::BnlHeader;
use crate::node::Node;
use crate::record::encode_node;
use std::io::{Seek, SeekFrom, Write};
use tracing::debug;

/// Errors that can occur during writing
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("node name of {len} bytes exceeds the {max}-byte limit")]
    NameTooLong { len: usize, max: usize },

    #[error("payload of {len} bytes exceeds the {max}-byte limit")]
    PayloadTooLarge { len: usize, max: usize },
}

/// Writer for BNL streams.
///
/// The sink must be seekable so the header can be back-patched once the
/// final record count is known; the bound rules out non-seekable sinks at
/// compile time. The writer owns the sink and hands it back from `finish`.
pub struct NodeStreamWriter<W: Write + Seek> {
    sink: W,
    /// Sink position where the header was reserved, set on first write
    header_at: Option<u64>,
    /// Stream-local position, drives record alignment
    pos: u64,
    written: u32,
}

impl<W: Write + Seek> NodeStreamWriter<W> {
    /// Create a writer over `sink`. Nothing is written until the first
    /// record arrives.
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            header_at: None,
            pos: 0,
            written: 0,
        }
    }

    /// Number of records written so far
    pub fn written(&self) -> u32 {
        self.written
    }

    /// Append one record to the stream.
    ///
    /// The first call reserves 16 bytes for the header at the sink's
    /// current position; the stream may therefore be embedded at any offset
    /// of a larger file.
    pub fn write_node(&mut self, node: &Node) -> Result<(), WriteError> {
        if self.header_at.is_none() {
            let at = self.sink.stream_position()?;
            self.sink.write_all(&[0u8; crate::format::BNL_HEADER_SIZE])?;
            self.header_at = Some(at);
            self.pos = crate::format::BNL_HEADER_SIZE as u64;
        }

        self.pos = encode_node(node, &mut self.sink, self.pos)?;
        self.written += 1;
        Ok(())
    }

    /// Finalize the stream and return the sink.
    ///
    /// Seeks back to the reserved header slot, writes the magic, the
    /// minimum supported version, the final record count and a zero
    /// reserved word, then restores the sink position to the stream end.
    /// When no record was written the sink is returned untouched.
    pub fn finish(mut self) -> Result<W, WriteError> {
        let Some(header_at) = self.header_at else {
            debug!("finalized empty stream, no header written");
            return Ok(self.sink);
        };

        let end = self.sink.stream_position()?;
        self.sink.seek(SeekFrom::Start(header_at))?;
        BnlHeader::new(self.written as i32).write_to(&mut self.sink)?;
        self.sink.seek(SeekFrom::Start(end))?;

        debug!(count = self.written, bytes = self.pos, "finalized stream");
        Ok(self.sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{NodeType, BNL_MAGIC, BNL_VERSION_MIN};
    use std::io::Cursor;

    #[test]
    fn test_empty_stream_writes_nothing() {
        let writer = NodeStreamWriter::new(Cursor::new(Vec::new()));
        let sink = writer.finish().unwrap();
        assert!(sink.into_inner().is_empty());
    }

    #[test]
    fn test_header_back_patched() {
        let mut writer = NodeStreamWriter::new(Cursor::new(Vec::new()));
        writer
            .write_node(&Node::with_payload("a", 0, NodeType::Any, vec![1, 2, 3]))
            .unwrap();
        writer.write_node(&Node::new("b", 1, NodeType::String)).unwrap();
        assert_eq!(writer.written(), 2);

        let bytes = writer.finish().unwrap().into_inner();
        assert_eq!(&bytes[0..4], &BNL_MAGIC.to_le_bytes());
        assert_eq!(&bytes[4..8], &BNL_VERSION_MIN.to_le_bytes());
        assert_eq!(&bytes[8..12], &2i32.to_le_bytes());
        assert_eq!(&bytes[12..16], &0i32.to_le_bytes());
        // every record section is 16-aligned, so the whole stream is too
        assert_eq!(bytes.len() % 16, 0);
    }

    #[test]
    fn test_stream_embedded_at_offset() {
        // A stream appended behind existing bytes reserves its header at
        // the current sink position, not at zero.
        let mut sink = Cursor::new(b"PREFIX--".to_vec());
        sink.seek(SeekFrom::End(0)).unwrap();

        let mut writer = NodeStreamWriter::new(sink);
        writer
            .write_node(&Node::with_payload("x", 0, NodeType::Any, vec![9u8; 4]))
            .unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        assert_eq!(&bytes[0..8], b"PREFIX--");
        assert_eq!(&bytes[8..12], &BNL_MAGIC.to_le_bytes());
        assert_eq!(&bytes[16..20], &1i32.to_le_bytes());
    }

    #[test]
    fn test_finish_restores_end_position() {
        let mut writer = NodeStreamWriter::new(Cursor::new(Vec::new()));
        writer.write_node(&Node::new("a", 0, NodeType::Any)).unwrap();
        let mut sink = writer.finish().unwrap();
        let at = sink.stream_position().unwrap();
        assert_eq!(at, sink.get_ref().len() as u64);
    }
}
