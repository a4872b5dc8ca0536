//! Static GGML type registry: id <-> tag mapping, block sizes, byte sizes.

use serde::{Deserialize, Serialize};

use crate::error::GgufError;

/// Symbolic GGML element type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GgmlTypeTag {
    F32,
    F16,
    Q4_0,
    Q4_1,
    Q5_0,
    Q5_1,
    Q8_0,
    Q8_1,
    Q2_K,
    Q3_K,
    Q4_K,
    Q5_K,
    Q6_K,
    Q8_K,
    IQ2_XXS,
    IQ2_XS,
    IQ3_XXS,
    IQ1_S,
    IQ4_NL,
    IQ3_S,
    IQ2_S,
    IQ4_XS,
    I8,
    I16,
    I32,
    I64,
    F64,
    IQ1_M,
    BF16,
}

/// A numeric element width for tags that need no dequantization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NativeNumericType {
    F32,
    F16,
    BF16,
    F64,
    I8,
    I16,
    I32,
    I64,
}

impl GgmlTypeTag {
    /// Look up the symbolic tag for an on-disk GGML type id.
    pub fn from_id(id: u32) -> Result<Self, GgufError> {
        use GgmlTypeTag::*;
        Ok(match id {
            0 => F32,
            1 => F16,
            2 => Q4_0,
            3 => Q4_1,
            6 => Q5_0,
            7 => Q5_1,
            8 => Q8_0,
            9 => Q8_1,
            10 => Q2_K,
            11 => Q3_K,
            12 => Q4_K,
            13 => Q5_K,
            14 => Q6_K,
            15 => Q8_K,
            16 => IQ2_XXS,
            17 => IQ2_XS,
            18 => IQ3_XXS,
            19 => IQ1_S,
            20 => IQ4_NL,
            21 => IQ3_S,
            22 => IQ2_S,
            23 => IQ4_XS,
            24 => I8,
            25 => I16,
            26 => I32,
            27 => I64,
            28 => F64,
            29 => IQ1_M,
            30 => BF16,
            _ => return Err(GgufError::UnknownTensorType { id }),
        })
    }

    /// Number of values sharing a block's scale factor(s).
    pub fn block_size(self) -> u64 {
        use GgmlTypeTag::*;
        match self {
            F32 | F16 | F64 | BF16 | I8 | I16 | I32 | I64 => 1,
            Q4_0 | Q4_1 | Q5_0 | Q5_1 | Q8_0 | Q8_1 => 32,
            Q2_K | Q3_K | Q4_K | Q5_K | Q6_K | Q8_K => 256,
            IQ2_XXS | IQ2_XS | IQ2_S => 256,
            IQ3_XXS | IQ3_S => 256,
            IQ1_S | IQ1_M => 256,
            IQ4_NL => 32,
            IQ4_XS => 256,
        }
    }

    /// On-disk byte size of a single block for this type.
    pub fn bytes_per_block(self) -> u64 {
        use GgmlTypeTag::*;
        match self {
            F32 => 4,
            F16 => 2,
            Q4_0 => 18,
            Q4_1 => 20,
            Q5_0 => 22,
            Q5_1 => 24,
            Q8_0 => 34,
            Q8_1 => 36,
            Q2_K => 84,
            Q3_K => 110,
            Q4_K => 144,
            Q5_K => 176,
            Q6_K => 210,
            Q8_K => 292,
            IQ2_XXS => 66,
            IQ2_XS => 74,
            IQ3_XXS => 98,
            IQ1_S => 50,
            IQ4_NL => 18,
            IQ3_S => 110,
            IQ2_S => 82,
            IQ4_XS => 136,
            I8 => 1,
            I16 => 2,
            I32 => 4,
            I64 => 8,
            F64 => 8,
            IQ1_M => 56,
            BF16 => 2,
        }
    }

    /// Exact on-disk byte size of a tensor with `n_elements` values of this type.
    ///
    /// Fails if `n_elements` is not a multiple of `block_size`.
    pub fn byte_size_for(self, n_elements: u64) -> Result<u64, GgufError> {
        let block_size = self.block_size();
        if n_elements % block_size != 0 {
            return Err(GgufError::InvalidSize {
                tag: self,
                n_elements,
                block_size,
            });
        }
        let n_blocks = n_elements / block_size;
        Ok(n_blocks * self.bytes_per_block())
    }

    /// For tags that require no dequantization, the native numeric element type.
    /// Returns `None` for quantized types, which must go through a dequantize kernel.
    pub fn maybe_native_numeric_type(self) -> Option<NativeNumericType> {
        use GgmlTypeTag::*;
        Some(match self {
            F32 => NativeNumericType::F32,
            F16 => NativeNumericType::F16,
            BF16 => NativeNumericType::BF16,
            F64 => NativeNumericType::F64,
            I8 => NativeNumericType::I8,
            I16 => NativeNumericType::I16,
            I32 => NativeNumericType::I32,
            I64 => NativeNumericType::I64,
            _ => return None,
        })
    }
}
