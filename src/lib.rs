//! Reader for the GGUF binary container: header, metadata, and tensor
//! directory decoding, plus dequantization of the packed tensor formats GGML
//! defines.

pub mod dequantize;
pub mod error;
pub mod loader;
pub mod metadata;
pub mod model;
pub mod primitive;
pub mod tensor_info;
pub mod types;

#[cfg(test)]
mod test_fixtures;

pub use error::GgufError;
pub use loader::{fetch_tensor, load, peek};
pub use metadata::{Metadata, MetadataValue};
pub use model::{DecodedTensor, Header, LoadOptions, Model};
pub use tensor_info::{TensorDirectory, TensorInfo};
pub use types::{GgmlTypeTag, NativeNumericType};
