// SPDX-License-Identifier: MIT
//! Ordered node collection keyed by `(name, index)`
//!
//! The document layer sits above the stream codec: it enforces node
//! identity uniqueness (the reader/writer do not) and forwards whole-stream
//! serialization to the codec. Iteration follows insertion order, which is
//! also the order nodes go out on the wire.

use crate::format::BNL_HEADER_SIZE;
use crate::node::Node;
use crate::reader::{NodeStreamReader, ReadError};
use crate::writer::{NodeStreamWriter, WriteError};
use indexmap::IndexMap;
use serde::Serialize;
use std::io::{Cursor, Read, Seek, Write};

/// Errors from document-level operations
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("duplicate node identity ({name}, {index})")]
    DuplicateNode { name: String, index: i32 },

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Write(#[from] WriteError),
}

/// Node identity: name plus index, disambiguating repeated names
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct NodeKey {
    name: String,
    index: i32,
}

impl indexmap::Equivalent<NodeKey> for (&str, i32) {
    fn equivalent(&self, key: &NodeKey) -> bool {
        self.0 == key.name && self.1 == key.index
    }
}

/// An ordered collection of nodes with unique `(name, index)` identities
#[derive(Debug, Default)]
pub struct NodeDocument {
    nodes: IndexMap<NodeKey, Node>,
}

impl NodeDocument {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the document holds no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add a node, rejecting a duplicate `(name, index)` identity
    pub fn add(&mut self, node: Node) -> Result<(), DocumentError> {
        let key = NodeKey {
            name: node.name().to_string(),
            index: node.index(),
        };
        if self.nodes.contains_key(&key) {
            return Err(DocumentError::DuplicateNode {
                name: key.name,
                index: key.index,
            });
        }
        self.nodes.insert(key, node);
        Ok(())
    }

    /// Whether a node with this identity exists
    pub fn contains(&self, name: &str, index: i32) -> bool {
        self.nodes.contains_key(&(name, index))
    }

    /// Look up a node by identity
    pub fn get(&self, name: &str, index: i32) -> Option<&Node> {
        self.nodes.get(&(name, index))
    }

    /// Look up a node by identity, mutably
    pub fn get_mut(&mut self, name: &str, index: i32) -> Option<&mut Node> {
        self.nodes.get_mut(&(name, index))
    }

    /// Remove a node by identity, returning it.
    ///
    /// Insertion order of the remaining nodes is preserved.
    pub fn remove(&mut self, name: &str, index: i32) -> Option<Node> {
        self.nodes.shift_remove(&(name, index))
    }

    /// Drop all nodes
    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Iterate nodes in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Serialize all nodes to `sink` in document order and finalize the
    /// stream, returning the sink
    pub fn write_to<W: Write + Seek>(&self, sink: W) -> Result<W, DocumentError> {
        let mut writer = NodeStreamWriter::new(sink);
        for node in self.nodes.values() {
            writer.write_node(node)?;
        }
        Ok(writer.finish()?)
    }

    /// Serialize the document to an in-memory byte vector
    pub fn to_vec(&self) -> Result<Vec<u8>, DocumentError> {
        Ok(self.write_to(Cursor::new(Vec::new()))?.into_inner())
    }

    /// Deserialize a document from `source`.
    ///
    /// A zero-byte source decodes to an empty document, mirroring the
    /// writer's empty-stream form. A source that starts but cannot finish a
    /// header, or that holds fewer records than its header declares, is a
    /// hard error.
    pub fn read_from<R: Read>(mut source: R) -> Result<Self, DocumentError> {
        // Pull the header bytes by hand so a genuinely empty source can be
        // told apart from a truncated one.
        let mut raw = [0u8; BNL_HEADER_SIZE];
        let mut filled = 0;
        while filled < raw.len() {
            let n = source.read(&mut raw[filled..]).map_err(ReadError::Io)?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            return Ok(Self::new());
        }
        if filled < BNL_HEADER_SIZE {
            return Err(ReadError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "stream ended inside the header",
            ))
            .into());
        }
        // Hand the header bytes back to the reader, which validates them.
        let mut reader = NodeStreamReader::new(Cursor::new(raw).chain(source));
        reader.header()?;

        let mut document = Self::new();
        while reader.left() > 0 {
            document.add(reader.next()?)?;
        }
        Ok(document)
    }

    /// Deserialize a document from an in-memory byte slice
    pub fn from_slice(bytes: &[u8]) -> Result<Self, DocumentError> {
        Self::read_from(Cursor::new(bytes))
    }

    /// Summary of the document's contents
    pub fn stats(&self) -> DocumentStats {
        DocumentStats {
            node_count: self.nodes.len(),
            payload_bytes: self.nodes.values().map(Node::len).sum(),
            name_bytes: self.nodes.keys().map(|k| k.name.len()).sum(),
        }
    }
}

/// Document statistics
#[derive(Debug, Clone, Serialize)]
pub struct DocumentStats {
    pub node_count: usize,
    pub payload_bytes: usize,
    pub name_bytes: usize,
}

impl DocumentStats {
    /// Fraction of the tracked bytes that is payload rather than naming
    pub fn payload_share(&self) -> f64 {
        let total = self.payload_bytes + self.name_bytes;
        if total == 0 {
            return 0.0;
        }
        self.payload_bytes as f64 / total as f64
    }
}
