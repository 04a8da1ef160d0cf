// SPDX-License-Identifier: MIT
//! Binary Node List (BNL) format specification
//!
//! Defines the wire constants, the 16-byte stream header and the node type
//! registry. All multi-byte fields are little-endian.

use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// BNL stream magic, "BNL\x01" read as a little-endian u32
pub const BNL_MAGIC: u32 = u32::from_le_bytes(*b"BNL\x01");

/// Lowest format version this implementation understands.
///
/// The writer always emits this version.
pub const BNL_VERSION_MIN: i32 = 1;

/// Highest format version this implementation understands
pub const BNL_VERSION_MAX: i32 = 1;

/// Header size in bytes
pub const BNL_HEADER_SIZE: usize = 16;

/// Record fields are padded so the name and payload sections each end on a
/// multiple of this boundary
pub const RECORD_ALIGN: u64 = 16;

/// Upper bound accepted for a decoded name length
pub const MAX_NAME_LEN: usize = 64 * 1024;

/// Upper bound accepted for a decoded payload size
pub const MAX_PAYLOAD_LEN: usize = 1024 * 1024 * 1024;

/// Number of zero bytes required after stream position `pos`.
///
/// Always in `1..=16`: when `pos` already sits on a 16-byte boundary a full
/// 16 bytes of padding are still emitted. Decoders consume the same amount.
/// This matches the shipped streams bit-for-bit and must not be changed
/// without a format version bump.
#[inline]
pub fn padding_after(pos: u64) -> usize {
    (RECORD_ALIGN - (pos % RECORD_ALIGN)) as usize
}

/// Errors detected while validating a stream header
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HeaderError {
    #[error("invalid magic: expected {BNL_MAGIC:#010x}, got {0:#010x}")]
    BadMagic(u32),

    #[error("unsupported version {0} (supported: {BNL_VERSION_MIN}..={BNL_VERSION_MAX})")]
    UnsupportedVersion(i32),

    #[error("header must be {BNL_HEADER_SIZE} bytes, got {0}")]
    Truncated(usize),
}

/// BNL stream header (16 bytes, little-endian)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BnlHeader {
    /// Magic constant, must equal [`BNL_MAGIC`]
    pub magic: u32,

    /// Format version, within `[BNL_VERSION_MIN, BNL_VERSION_MAX]`
    pub version: i32,

    /// Declared number of records following the header
    pub count: i32,

    /// Reserved word; round-tripped, never interpreted
    pub reserved: i32,
}

impl BnlHeader {
    /// Create a header for a stream of `count` records.
    ///
    /// The version is always the minimum supported version; the reserved
    /// word is zero.
    pub fn new(count: i32) -> Self {
        Self {
            magic: BNL_MAGIC,
            version: BNL_VERSION_MIN,
            count,
            reserved: 0,
        }
    }

    /// Parse a header from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HeaderError> {
        if bytes.len() != BNL_HEADER_SIZE {
            return Err(HeaderError::Truncated(bytes.len()));
        }

        let magic = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
        let version = i32::from_le_bytes(bytes[4..8].try_into().unwrap());
        let count = i32::from_le_bytes(bytes[8..12].try_into().unwrap());
        let reserved = i32::from_le_bytes(bytes[12..16].try_into().unwrap());

        Ok(Self {
            magic,
            version,
            count,
            reserved,
        })
    }

    /// Validate magic and version
    pub fn validate(&self) -> Result<(), HeaderError> {
        if self.magic != BNL_MAGIC {
            return Err(HeaderError::BadMagic(self.magic));
        }

        if self.version < BNL_VERSION_MIN || self.version > BNL_VERSION_MAX {
            return Err(HeaderError::UnsupportedVersion(self.version));
        }

        Ok(())
    }

    /// Convert to wire bytes
    pub fn to_bytes(&self) -> [u8; BNL_HEADER_SIZE] {
        let mut bytes = [0u8; BNL_HEADER_SIZE];

        bytes[0..4].copy_from_slice(&self.magic.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.version.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.count.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.reserved.to_le_bytes());

        bytes
    }

    /// Read a header from a reader
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, std::io::Error> {
        let mut header = [0u8; BNL_HEADER_SIZE];
        reader.read_exact(&mut header)?;
        Self::from_bytes(&header)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Write the header to a writer
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), std::io::Error> {
        writer.write_all(&self.to_bytes())
    }
}

impl Default for BnlHeader {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Declared content shape of a node's payload.
///
/// Purely descriptive metadata carried in each record's type tag. The codec
/// stores it but never uses it to size or validate the payload bytes.
///
/// Discriminants are the on-wire i32 values and must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum NodeType {
    /// Opaque bytes, no declared shape
    Any = 0,

    /// UTF-8 text
    String = 1,

    Int8 = 2,
    Vec2i8 = 3,
    Vec3i8 = 4,
    Vec4i8 = 5,

    Int16 = 6,
    Vec2i16 = 7,
    Vec3i16 = 8,
    Vec4i16 = 9,

    Int32 = 10,
    Vec2i32 = 11,
    Vec3i32 = 12,
    Vec4i32 = 13,

    Int64 = 14,
    Vec2i64 = 15,
    Vec3i64 = 16,
    Vec4i64 = 17,

    Float = 18,
    Vec2f = 19,
    Vec3f = 20,
    Vec4f = 21,

    Double = 22,
    Vec2d = 23,
    Vec3d = 24,
    Vec4d = 25,
}

impl NodeType {
    /// Map a wire tag back to a registry entry
    pub fn from_i32(tag: i32) -> Option<Self> {
        match tag {
            0 => Some(Self::Any),
            1 => Some(Self::String),
            2 => Some(Self::Int8),
            3 => Some(Self::Vec2i8),
            4 => Some(Self::Vec3i8),
            5 => Some(Self::Vec4i8),
            6 => Some(Self::Int16),
            7 => Some(Self::Vec2i16),
            8 => Some(Self::Vec3i16),
            9 => Some(Self::Vec4i16),
            10 => Some(Self::Int32),
            11 => Some(Self::Vec2i32),
            12 => Some(Self::Vec3i32),
            13 => Some(Self::Vec4i32),
            14 => Some(Self::Int64),
            15 => Some(Self::Vec2i64),
            16 => Some(Self::Vec3i64),
            17 => Some(Self::Vec4i64),
            18 => Some(Self::Float),
            19 => Some(Self::Vec2f),
            20 => Some(Self::Vec3f),
            21 => Some(Self::Vec4f),
            22 => Some(Self::Double),
            23 => Some(Self::Vec2d),
            24 => Some(Self::Vec3d),
            25 => Some(Self::Vec4d),
            _ => None,
        }
    }

    /// Number of lanes in a vector type, `None` for `Any`/`String`
    pub fn lane_count(&self) -> Option<usize> {
        let lanes = match self {
            Self::Any | Self::String => return None,
            Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64 | Self::Float | Self::Double => 1,
            Self::Vec2i8 | Self::Vec2i16 | Self::Vec2i32 | Self::Vec2i64 | Self::Vec2f
            | Self::Vec2d => 2,
            Self::Vec3i8 | Self::Vec3i16 | Self::Vec3i32 | Self::Vec3i64 | Self::Vec3f
            | Self::Vec3d => 3,
            Self::Vec4i8 | Self::Vec4i16 | Self::Vec4i32 | Self::Vec4i64 | Self::Vec4f
            | Self::Vec4d => 4,
        };
        Some(lanes)
    }

    /// Width of one lane in bytes, `None` for `Any`/`String`
    pub fn lane_width(&self) -> Option<usize> {
        let width = match self {
            Self::Any | Self::String => return None,
            Self::Int8 | Self::Vec2i8 | Self::Vec3i8 | Self::Vec4i8 => 1,
            Self::Int16 | Self::Vec2i16 | Self::Vec3i16 | Self::Vec4i16 => 2,
            Self::Int32 | Self::Vec2i32 | Self::Vec3i32 | Self::Vec4i32 => 4,
            Self::Int64 | Self::Vec2i64 | Self::Vec3i64 | Self::Vec4i64 => 8,
            Self::Float | Self::Vec2f | Self::Vec3f | Self::Vec4f => 4,
            Self::Double | Self::Vec2d | Self::Vec3d | Self::Vec4d => 8,
        };
        Some(width)
    }

    /// Size of one full element (all lanes) in bytes, `None` for `Any`/`String`
    pub fn element_size(&self) -> Option<usize> {
        Some(self.lane_count()? * self.lane_width()?)
    }

    /// Get all registry entries in discriminant order
    pub fn all() -> &'static [NodeType] {
        &[
            Self::Any,
            Self::String,
            Self::Int8,
            Self::Vec2i8,
            Self::Vec3i8,
            Self::Vec4i8,
            Self::Int16,
            Self::Vec2i16,
            Self::Vec3i16,
            Self::Vec4i16,
            Self::Int32,
            Self::Vec2i32,
            Self::Vec3i32,
            Self::Vec4i32,
            Self::Int64,
            Self::Vec2i64,
            Self::Vec3i64,
            Self::Vec4i64,
            Self::Float,
            Self::Vec2f,
            Self::Vec3f,
            Self::Vec4f,
            Self::Double,
            Self::Vec2d,
            Self::Vec3d,
            Self::Vec4d,
        ]
    }

    /// Get the name of the type
    pub fn name(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::String => "string",
            Self::Int8 => "int8",
            Self::Vec2i8 => "vec2i8",
            Self::Vec3i8 => "vec3i8",
            Self::Vec4i8 => "vec4i8",
            Self::Int16 => "int16",
            Self::Vec2i16 => "vec2i16",
            Self::Vec3i16 => "vec3i16",
            Self::Vec4i16 => "vec4i16",
            Self::Int32 => "int32",
            Self::Vec2i32 => "vec2i32",
            Self::Vec3i32 => "vec3i32",
            Self::Vec4i32 => "vec4i32",
            Self::Int64 => "int64",
            Self::Vec2i64 => "vec2i64",
            Self::Vec3i64 => "vec3i64",
            Self::Vec4i64 => "vec4i64",
            Self::Float => "float",
            Self::Vec2f => "vec2f",
            Self::Vec3f => "vec3f",
            Self::Vec4f => "vec4f",
            Self::Double => "double",
            Self::Vec2d => "vec2d",
            Self::Vec3d => "vec3d",
            Self::Vec4d => "vec4d",
        }
    }
}
