//! Dequantization kernels: expand packed GGML blocks into f32.

mod k_quants;

use half::{bf16, f16};
use serde::{Deserialize, Serialize};

use crate::error::GgufError;
use crate::types::{GgmlTypeTag, NativeNumericType};

/// A decoded tensor's element buffer. Native numeric types that aren't f32
/// keep their own width (the loader decides whether to widen to f32 based on
/// `LoadOptions::dequantize`); quantized types always decode to `F32`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DecodedBuffer {
    F32(Vec<f32>),
    F64(Vec<f64>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    /// Raw packed bytes, surfaced as-is when `LoadOptions::dequantize` is
    /// false and the tag is quantized.
    Raw(Vec<u8>),
}

fn check_len(tag: GgmlTypeTag, bytes: &[u8], n_elements: u64) -> Result<u64, GgufError> {
    let block_size = tag.block_size();
    if n_elements % block_size != 0 {
        return Err(GgufError::InvalidSize {
            tag,
            n_elements,
            block_size,
        });
    }
    let n_blocks = n_elements / block_size;
    let need = n_blocks * tag.bytes_per_block();
    if (bytes.len() as u64) < need {
        return Err(GgufError::Truncated {
            context: format!("{:?} block data", tag),
            need_bytes: need as usize,
        });
    }
    Ok(n_blocks)
}

/// Decode a native (non-quantized) element buffer by reinterpreting the
/// packed little-endian bytes directly.
pub fn decode_native(native: NativeNumericType, bytes: &[u8], n_elements: u64) -> Result<DecodedBuffer, GgufError> {
    let n = n_elements as usize;
    Ok(match native {
        NativeNumericType::F32 => {
            require_bytes(bytes, n * 4)?;
            DecodedBuffer::F32(bytes.chunks_exact(4).take(n).map(|b| f32::from_le_bytes(b.try_into().unwrap())).collect())
        }
        NativeNumericType::F64 => {
            require_bytes(bytes, n * 8)?;
            DecodedBuffer::F64(bytes.chunks_exact(8).take(n).map(|b| f64::from_le_bytes(b.try_into().unwrap())).collect())
        }
        NativeNumericType::I8 => {
            require_bytes(bytes, n)?;
            DecodedBuffer::I8(bytes[..n].iter().map(|&b| b as i8).collect())
        }
        NativeNumericType::I16 => {
            require_bytes(bytes, n * 2)?;
            DecodedBuffer::I16(bytes.chunks_exact(2).take(n).map(|b| i16::from_le_bytes(b.try_into().unwrap())).collect())
        }
        NativeNumericType::I32 => {
            require_bytes(bytes, n * 4)?;
            DecodedBuffer::I32(bytes.chunks_exact(4).take(n).map(|b| i32::from_le_bytes(b.try_into().unwrap())).collect())
        }
        NativeNumericType::I64 => {
            require_bytes(bytes, n * 8)?;
            DecodedBuffer::I64(bytes.chunks_exact(8).take(n).map(|b| i64::from_le_bytes(b.try_into().unwrap())).collect())
        }
        NativeNumericType::F16 => DecodedBuffer::F32(decode_f16(bytes, n_elements)?),
        NativeNumericType::BF16 => DecodedBuffer::F32(decode_bf16(bytes, n_elements)?),
    })
}

fn require_bytes(bytes: &[u8], need: usize) -> Result<(), GgufError> {
    if bytes.len() < need {
        return Err(GgufError::Truncated {
            context: "native element buffer".to_string(),
            need_bytes: need,
        });
    }
    Ok(())
}

/// Decode `n_elements` IEEE 754 binary16 values to f32.
pub fn decode_f16(bytes: &[u8], n_elements: u64) -> Result<Vec<f32>, GgufError> {
    let n = n_elements as usize;
    require_bytes(bytes, n * 2)?;
    Ok(bytes
        .chunks_exact(2)
        .take(n)
        .map(|b| f16::from_le_bytes([b[0], b[1]]).to_f32())
        .collect())
}

/// Decode `n_elements` bfloat16 values to f32 (left-shift by 16, reinterpret).
pub fn decode_bf16(bytes: &[u8], n_elements: u64) -> Result<Vec<f32>, GgufError> {
    let n = n_elements as usize;
    require_bytes(bytes, n * 2)?;
    Ok(bytes
        .chunks_exact(2)
        .take(n)
        .map(|b| bf16::from_le_bytes([b[0], b[1]]).to_f32())
        .collect())
}

/// Dequantize Q4_0: block = 32 values, 18 bytes (f16 scale + 16 packed bytes).
pub fn dequantize_q4_0(bytes: &[u8], n_elements: u64) -> Result<Vec<f32>, GgufError> {
    let n_blocks = check_len(GgmlTypeTag::Q4_0, bytes, n_elements)?;
    let mut out = Vec::with_capacity(n_elements as usize);

    for block in 0..n_blocks as usize {
        let base = block * 18;
        let scale = f16::from_le_bytes([bytes[base], bytes[base + 1]]).to_f32();
        let quants = &bytes[base + 2..base + 18];

        // low nibbles (all 16), then high nibbles (all 16)
        for &byte in quants {
            let lo = (byte & 0x0F) as i32 - 8;
            out.push(lo as f32 * scale);
        }
        for &byte in quants {
            let hi = ((byte >> 4) & 0x0F) as i32 - 8;
            out.push(hi as f32 * scale);
        }
    }

    out.truncate(n_elements as usize);
    Ok(out)
}

/// Dequantize Q8_0: block = 32 values, 34 bytes (f16 scale + 32 signed int8).
pub fn dequantize_q8_0(bytes: &[u8], n_elements: u64) -> Result<Vec<f32>, GgufError> {
    let n_blocks = check_len(GgmlTypeTag::Q8_0, bytes, n_elements)?;
    let mut out = Vec::with_capacity(n_elements as usize);

    for block in 0..n_blocks as usize {
        let base = block * 34;
        let scale = f16::from_le_bytes([bytes[base], bytes[base + 1]]).to_f32();
        let quants = &bytes[base + 2..base + 34];
        for &byte in quants {
            out.push((byte as i8) as f32 * scale);
        }
    }

    out.truncate(n_elements as usize);
    Ok(out)
}

pub use k_quants::{dequantize_q4_k, dequantize_q6_k};

/// Dispatch to the kernel for `tag`, or `UnsupportedQuant` when none exists.
pub fn dequantize(tag: GgmlTypeTag, bytes: &[u8], n_elements: u64) -> Result<Vec<f32>, GgufError> {
    match tag {
        GgmlTypeTag::F16 => decode_f16(bytes, n_elements),
        GgmlTypeTag::BF16 => decode_bf16(bytes, n_elements),
        GgmlTypeTag::Q4_0 => dequantize_q4_0(bytes, n_elements),
        GgmlTypeTag::Q8_0 => dequantize_q8_0(bytes, n_elements),
        GgmlTypeTag::Q4_K => dequantize_q4_k(bytes, n_elements),
        GgmlTypeTag::Q6_K => dequantize_q6_k(bytes, n_elements),
        other => Err(GgufError::UnsupportedQuant { tag: other }),
    }
}
