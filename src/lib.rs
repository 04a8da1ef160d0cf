// SPDX-License-Identifier: MIT
//! # Binary Node List
//!
//! A compact, seekable binary container holding an ordered collection of
//! named, typed, variable-length byte records ("nodes"). Each node is
//! independently readable and mutable without re-parsing the rest of the
//! stream's payloads.
//!
//! ## Format Overview
//!
//! A BNL stream is a 16-byte header followed by one record per node. The
//! writer reserves the header up front and back-patches the final record
//! count on finalize, so records can be appended without knowing the total
//! in advance. Name and payload sections are padded to 16-byte boundaries,
//! keeping payloads alignment-friendly for memory-mapped and typed access.
//!
//! ## Format Specification
//!
//! ```text
//! Binary Node List (BNL) Format v1
//! ================================
//!
//! All integers little-endian.
//!
//! Header (16 bytes):
//! - Magic: "BNL\x01" (4 bytes)
//! - Version: 1 (4 bytes)
//! - Count: number of records (4 bytes)
//! - Reserved: round-tripped, unused (4 bytes)
//!
//! Record (per node):
//! - Type tag (4 bytes)
//! - Index (4 bytes)
//! - Name byte length (4 bytes)
//! - Payload byte length (4 bytes)
//! - Name: UTF-8 bytes
//! - Padding: zero bytes to the next 16-byte boundary (always 1..=16,
//!   a full 16 when already aligned)
//! - Payload bytes
//! - Padding: same rule
//! ```
//!
//! An empty stream is zero bytes; a finalized stream never carries a
//! header with a zero count.
//!
//! ## Usage
//!
//! ```rust
//! use binary_node_list::{Node, NodeDocument, NodeType};
//!
//! let mut doc = NodeDocument::new();
//! doc.add(Node::with_payload("title", 0, NodeType::String, b"hello".to_vec())).unwrap();
//!
//! let mut positions = Node::new("positions", 0, NodeType::Vec3f);
//! positions.write_elements_expanding(0, &[1.0f32, 2.0, 3.0]).unwrap();
//! doc.add(positions).unwrap();
//!
//! let bytes = doc.to_vec().unwrap();
//! let back = NodeDocument::from_slice(&bytes).unwrap();
//! assert_eq!(back.get("title", 0).unwrap().as_slice(), b"hello");
//! ```
//!
//! ## Concurrency
//!
//! Everything here is single-threaded, synchronous and blocking. A node,
//! reader or writer assumes exclusive access; distinct nodes and unrelated
//! streams own disjoint memory and need no coordination.

pub mod document;
pub mod format;
pub mod node;
pub mod reader;
pub mod record;
pub mod writer;

// Re-export main types
pub use document::{DocumentError, DocumentStats, NodeDocument};
pub use format::{
    BnlHeader, HeaderError, NodeType, BNL_HEADER_SIZE, BNL_MAGIC, BNL_VERSION_MAX, BNL_VERSION_MIN,
};
pub use node::{Element, Node, NodeError};
pub use reader::{NodeStreamReader, ReadError};
pub use writer::{NodeStreamWriter, WriteError};
