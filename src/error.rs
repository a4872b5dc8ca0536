use thiserror::Error;

use crate::types::GgmlTypeTag;

/// Errors produced while parsing or decoding a GGUF file.
#[derive(Debug, Error)]
pub enum GgufError {
    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("invalid magic bytes: expected \"GGUF\"")]
    InvalidMagic,

    #[error("unsupported GGUF version: {version} (supported: 2, 3)")]
    UnsupportedVersion { version: u32 },

    #[error("unknown metadata value type: {id}")]
    UnknownMetadataType { id: u32 },

    #[error("unknown tensor type id: {id}")]
    UnknownTensorType { id: u32 },

    #[error("no dequantization kernel for {tag:?}")]
    UnsupportedQuant { tag: GgmlTypeTag },

    #[error("{n_elements} elements is not a multiple of block size {block_size} for {tag:?}")]
    InvalidSize {
        tag: GgmlTypeTag,
        n_elements: u64,
        block_size: u64,
    },

    #[error("tensor not found: {0}")]
    TensorNotFound(String),

    #[error("truncated {context}: need {need_bytes} bytes")]
    Truncated { context: String, need_bytes: usize },
}
