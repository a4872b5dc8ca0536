//! Tensor-directory decoding.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::GgufError;
use crate::primitive::{Reader, StringWidth};
use crate::types::GgmlTypeTag;

/// One tensor's directory entry: name, row-major shape, element type, and its
/// location/size within the tensor-data section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TensorInfo {
    pub name: String,
    /// Row-major (outermost-first) shape. GGUF stores dims innermost-first;
    /// this reverses them to row-major order.
    pub shape: Vec<u64>,
    pub tag: GgmlTypeTag,
    /// Byte offset relative to the start of the tensor-data section.
    pub offset: u64,
    /// Exact on-disk byte size of this tensor's packed data.
    pub byte_size: u64,
}

impl TensorInfo {
    pub fn element_count(&self) -> u64 {
        self.shape.iter().product()
    }
}

/// Name -> TensorInfo directory. Iteration order is insertion order but is
/// not semantically significant.
pub type TensorDirectory = IndexMap<String, TensorInfo>;

/// Decode `tensor_count` tensor-info entries from `reader`.
///
/// Returns the directory plus the cursor position immediately after the last
/// entry, which the loader combines with the alignment to compute the
/// tensor-data base offset.
pub fn decode_tensor_infos(
    reader: &mut Reader,
    width: StringWidth,
    tensor_count: u64,
) -> Result<(TensorDirectory, usize), GgufError> {
    let mut dir = TensorDirectory::with_capacity(tensor_count as usize);

    for _ in 0..tensor_count {
        let name = reader.read_string(width)?;
        let n_dims = reader.read_u32()?;

        let mut dims_on_disk = Vec::with_capacity(n_dims as usize);
        for _ in 0..n_dims {
            dims_on_disk.push(reader.read_u64()?);
        }

        let type_id = reader.read_u32()?;
        let offset = reader.read_u64()?;

        let tag = GgmlTypeTag::from_id(type_id)?;
        let mut shape = dims_on_disk;
        shape.reverse();

        let element_count: u64 = if shape.is_empty() { 0 } else { shape.iter().product() };
        let byte_size = tag.byte_size_for(element_count)?;

        dir.insert(
            name.clone(),
            TensorInfo {
                name,
                shape,
                tag,
                offset,
                byte_size,
            },
        );
    }

    Ok((dir, reader.position()))
}
