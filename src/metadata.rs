//! Metadata key/value decoding and the `Metadata` ordered map.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::GgufError;
use crate::primitive::{Reader, StringWidth};

const TYPE_UINT8: u32 = 0;
const TYPE_INT8: u32 = 1;
const TYPE_UINT16: u32 = 2;
const TYPE_INT16: u32 = 3;
const TYPE_UINT32: u32 = 4;
const TYPE_INT32: u32 = 5;
const TYPE_FLOAT32: u32 = 6;
const TYPE_BOOL: u32 = 7;
const TYPE_STRING: u32 = 8;
const TYPE_ARRAY: u32 = 9;
const TYPE_UINT64: u32 = 10;
const TYPE_INT64: u32 = 11;
const TYPE_FLOAT64: u32 = 12;

/// A single typed metadata value. Arrays may nest arbitrarily deep, each level
/// carrying its own element-type tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetadataValue {
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    F32(f32),
    F64(f64),
    Bool(bool),
    String(String),
    Array(Vec<MetadataValue>),
}

impl MetadataValue {
    /// Widen to `u64` when the value is an unsigned or non-negative signed
    /// integer; used by callers that need a plain count or flag (for example
    /// `general.alignment`).
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            MetadataValue::U8(v) => Some(*v as u64),
            MetadataValue::U16(v) => Some(*v as u64),
            MetadataValue::U32(v) => Some(*v as u64),
            MetadataValue::U64(v) => Some(*v),
            MetadataValue::I8(v) if *v >= 0 => Some(*v as u64),
            MetadataValue::I16(v) if *v >= 0 => Some(*v as u64),
            MetadataValue::I32(v) if *v >= 0 => Some(*v as u64),
            MetadataValue::I64(v) if *v >= 0 => Some(*v as u64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[MetadataValue]> {
        match self {
            MetadataValue::Array(items) => Some(items),
            _ => None,
        }
    }
}

/// Ordered string -> MetadataValue map. Duplicate keys: last value wins, while
/// the key's position reflects its first insertion (see DESIGN.md's Open
/// Question resolution on ordering).
pub type Metadata = IndexMap<String, MetadataValue>;

fn read_value(reader: &mut Reader, width: StringWidth, value_type: u32) -> Result<MetadataValue, GgufError> {
    match value_type {
        TYPE_UINT8 => Ok(MetadataValue::U8(reader.read_u8()?)),
        TYPE_INT8 => Ok(MetadataValue::I8(reader.read_i8()?)),
        TYPE_UINT16 => Ok(MetadataValue::U16(reader.read_u16()?)),
        TYPE_INT16 => Ok(MetadataValue::I16(reader.read_i16()?)),
        TYPE_UINT32 => Ok(MetadataValue::U32(reader.read_u32()?)),
        TYPE_INT32 => Ok(MetadataValue::I32(reader.read_i32()?)),
        TYPE_FLOAT32 => Ok(MetadataValue::F32(reader.read_f32()?)),
        TYPE_BOOL => Ok(MetadataValue::Bool(reader.read_bool()?)),
        TYPE_STRING => Ok(MetadataValue::String(reader.read_string(width)?)),
        TYPE_ARRAY => {
            let elem_type = reader.read_u32()?;
            let count = reader.read_u64()?;
            if elem_type == TYPE_ARRAY {
                log::trace!("decoding nested array of {count} arrays");
            }
            let mut items = Vec::with_capacity(count.min(1024) as usize);
            for _ in 0..count {
                items.push(read_value(reader, width, elem_type)?);
            }
            Ok(MetadataValue::Array(items))
        }
        TYPE_UINT64 => Ok(MetadataValue::U64(reader.read_u64()?)),
        TYPE_INT64 => Ok(MetadataValue::I64(reader.read_i64()?)),
        TYPE_FLOAT64 => Ok(MetadataValue::F64(reader.read_f64()?)),
        id => Err(GgufError::UnknownMetadataType { id }),
    }
}

/// Decode `kv_count` metadata key/value pairs sequentially from `reader`.
pub fn decode_metadata(
    reader: &mut Reader,
    width: StringWidth,
    kv_count: u64,
) -> Result<Metadata, GgufError> {
    let mut map = Metadata::with_capacity(kv_count as usize);
    for _ in 0..kv_count {
        let key = reader.read_string(width)?;
        let value_type = reader.read_u32()?;
        let value = read_value(reader, width, value_type)?;
        map.insert(key, value);
    }
    Ok(map)
}
