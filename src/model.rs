//! Core data model: `Header`, `Model`, `LoadOptions`, `DecodedTensor`.

use serde::{Deserialize, Serialize};

use crate::dequantize::DecodedBuffer;
use crate::error::GgufError;
use crate::loader;
use crate::metadata::Metadata;
use crate::tensor_info::TensorDirectory;

/// The 24-byte fixed header: magic (validated, not stored), version, and the
/// two entry counts that drive metadata/tensor-info decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub version: u32,
    pub tensor_count: u64,
    pub metadata_kv_count: u64,
}

/// A fully materialized tensor: its element buffer plus the row-major shape
/// it should be reshaped into by the consuming tensor runtime. Packaging that
/// buffer into a first-class tensor type is left to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedTensor {
    pub shape: Vec<u64>,
    pub data: DecodedBuffer,
}

/// Options accepted by [`crate::loader::load`].
#[derive(Clone)]
pub struct LoadOptions {
    /// When true, no tensor bytes are read during `load`; tensors are
    /// materialized later via `fetch_tensor`.
    pub lazy: bool,
    /// Only tensors whose name passes this predicate are materialized
    /// during eager `load`. Rejected tensors still appear in the
    /// `TensorDirectory`; only their data is skipped. Defaults to accept-all.
    pub tensor_filter: std::sync::Arc<dyn Fn(&str) -> bool + Send + Sync>,
    /// When false, quantized tensors are surfaced as raw byte buffers
    /// instead of being expanded to f32. Native numeric tensors are
    /// unaffected.
    pub dequantize: bool,
}

impl std::fmt::Debug for LoadOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadOptions")
            .field("lazy", &self.lazy)
            .field("tensor_filter", &"<fn>")
            .field("dequantize", &self.dequantize)
            .finish()
    }
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            lazy: false,
            tensor_filter: std::sync::Arc::new(|_| true),
            dequantize: true,
        }
    }
}

/// A parsed GGUF file: header, metadata, tensor directory, and (in eager
/// mode) the decoded tensors themselves.
#[derive(Debug)]
pub struct Model {
    pub header: Header,
    pub metadata: Metadata,
    pub tensor_directory: TensorDirectory,
    /// Present in eager mode; absent in lazy mode.
    pub(crate) tensors: Option<indexmap::IndexMap<String, DecodedTensor>>,
    /// Present iff the model was loaded lazily; used by `fetch_tensor` to
    /// reopen the file for positioned reads.
    pub(crate) source_path: Option<std::path::PathBuf>,
    pub(crate) dequantize: bool,
    /// Absolute file offset where the packed tensor-data section begins.
    pub tensor_data_base_offset: u64,
}

impl Model {
    pub fn version(&self) -> u32 {
        self.header.version
    }

    pub fn tensor_names(&self) -> impl Iterator<Item = &str> {
        self.tensor_directory.keys().map(String::as_str)
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn is_lazy(&self) -> bool {
        self.source_path.is_some()
    }

    /// Already-materialized tensor, if this is an eager model and the tensor
    /// passed its load-time filter.
    pub fn tensor(&self, name: &str) -> Option<&DecodedTensor> {
        self.tensors.as_ref().and_then(|t| t.get(name))
    }

    /// Fetch and decode a tensor by name. For an eager model this returns the
    /// already-materialized tensor; for a lazy model it performs a single
    /// positioned read against the source file.
    pub fn fetch_tensor(&self, name: &str) -> Result<DecodedTensor, GgufError> {
        loader::fetch_tensor(self, name)
    }
}
