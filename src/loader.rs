//! Ties the header/metadata/tensor-info decoders together, computes the
//! tensor-data base offset, and serves tensors eagerly or lazily.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::dequantize::{self, decode_native, DecodedBuffer};
use crate::error::GgufError;
use crate::metadata;
use crate::model::{DecodedTensor, Header, LoadOptions, Model};
use crate::primitive::{Reader, StringWidth};
use crate::tensor_info::{self, TensorDirectory, TensorInfo};

const MAGIC: &[u8; 4] = b"GGUF";
const DEFAULT_ALIGNMENT: u64 = 32;

fn string_width_for(version: u32) -> StringWidth {
    if version >= 3 {
        StringWidth::U64Length
    } else {
        StringWidth::U32Length
    }
}

fn align_up(offset: u64, alignment: u64) -> u64 {
    (offset + alignment - 1) / alignment * alignment
}

/// Resolve the effective tensor-data alignment from metadata, falling back
/// to 32 when `general.alignment` is absent, non-positive, or not an
/// integer type. The fallback is intentional, not an error condition.
fn effective_alignment(metadata: &metadata::Metadata) -> u64 {
    match metadata.get("general.alignment") {
        Some(value) => match value.as_u64() {
            Some(v) if v > 0 => v,
            Some(_) => {
                log::warn!("general.alignment present but non-positive; falling back to 32");
                DEFAULT_ALIGNMENT
            }
            None => {
                log::warn!("general.alignment present but not an unsigned integer type; falling back to 32");
                DEFAULT_ALIGNMENT
            }
        },
        None => DEFAULT_ALIGNMENT,
    }
}

#[derive(Debug)]
struct ParsedHeader {
    header: Header,
    metadata: metadata::Metadata,
    tensor_directory: TensorDirectory,
    tensor_data_base_offset: u64,
}

fn parse_header_and_directory(bytes: &[u8]) -> Result<ParsedHeader, GgufError> {
    let mut reader = Reader::new(bytes);

    let magic = reader.read_bytes(4)?;
    if magic != MAGIC {
        return Err(GgufError::InvalidMagic);
    }

    let version = reader.read_u32()?;
    if version != 2 && version != 3 {
        return Err(GgufError::UnsupportedVersion { version });
    }
    log::debug!("GGUF version {version}");

    let width = string_width_for(version);

    let (tensor_count, metadata_kv_count) = if version >= 3 {
        (reader.read_u64()?, reader.read_u64()?)
    } else {
        (reader.read_u32()? as u64, reader.read_u32()? as u64)
    };

    let metadata = metadata::decode_metadata(&mut reader, width, metadata_kv_count)?;
    let (tensor_directory, end_of_prefix) = tensor_info::decode_tensor_infos(&mut reader, width, tensor_count)?;

    let alignment = effective_alignment(&metadata);
    let tensor_data_base_offset = align_up(end_of_prefix as u64, alignment);

    Ok(ParsedHeader {
        header: Header {
            version,
            tensor_count,
            metadata_kv_count,
        },
        metadata,
        tensor_directory,
        tensor_data_base_offset,
    })
}

fn decode_tensor_bytes(info: &TensorInfo, bytes: &[u8], dequantize: bool) -> Result<DecodedTensor, GgufError> {
    let element_count = info.element_count();
    let data = match (info.tag.maybe_native_numeric_type(), dequantize) {
        (Some(native), _) => decode_native(native, bytes, element_count)?,
        (None, true) => DecodedBuffer::F32(dequantize::dequantize(info.tag, bytes, element_count)?),
        (None, false) => {
            // Still validate the byte count even though we don't decode.
            let block_size = info.tag.block_size();
            if element_count % block_size != 0 {
                return Err(GgufError::InvalidSize {
                    tag: info.tag,
                    n_elements: element_count,
                    block_size,
                });
            }
            DecodedBuffer::Raw(bytes.to_vec())
        }
    };
    Ok(DecodedTensor {
        shape: info.shape.clone(),
        data,
    })
}

fn open_existing(path: &Path) -> Result<File, GgufError> {
    File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            GgufError::FileNotFound(path.display().to_string())
        } else {
            GgufError::IoError(e)
        }
    })
}

/// Read exactly `len` bytes at absolute file offset `offset`. The file handle
/// is opened for this call alone and dropped on every exit path, including
/// errors — no handle outlives a single positioned read.
fn positioned_read(path: &Path, offset: u64, len: usize) -> Result<Vec<u8>, GgufError> {
    let mut file = open_existing(path)?;
    file.seek(SeekFrom::Start(offset))?;
    let mut buf = vec![0u8; len];
    file.read_exact(&mut buf)?;
    Ok(buf)
}

/// Parse and, by default, eagerly decode a GGUF file at `path`.
///
/// See [`LoadOptions`] for lazy loading, tensor filtering, and the
/// dequantize toggle.
pub fn load(path: impl AsRef<Path>, options: LoadOptions) -> Result<Model, GgufError> {
    let path = path.as_ref();
    let mut file = open_existing(path)?;
    let mut file_bytes = Vec::new();
    file.read_to_end(&mut file_bytes)?;
    drop(file);

    let parsed = parse_header_and_directory(&file_bytes)?;

    if options.lazy {
        log::debug!(
            "loaded {} lazily: {} tensors, {} metadata entries",
            path.display(),
            parsed.tensor_directory.len(),
            parsed.metadata.len()
        );
        return Ok(Model {
            header: parsed.header,
            metadata: parsed.metadata,
            tensor_directory: parsed.tensor_directory,
            tensors: None,
            source_path: Some(path.to_path_buf()),
            dequantize: options.dequantize,
            tensor_data_base_offset: parsed.tensor_data_base_offset,
        });
    }

    let mut tensors = IndexMap::with_capacity(parsed.tensor_directory.len());
    let mut skipped = 0usize;
    for info in parsed.tensor_directory.values() {
        if !(options.tensor_filter)(&info.name) {
            skipped += 1;
            continue;
        }
        let start = (parsed.tensor_data_base_offset + info.offset) as usize;
        let end = start + info.byte_size as usize;
        if end > file_bytes.len() {
            return Err(GgufError::Truncated {
                context: format!("tensor data for '{}'", info.name),
                need_bytes: end - file_bytes.len(),
            });
        }
        let decoded = decode_tensor_bytes(info, &file_bytes[start..end], options.dequantize)?;
        tensors.insert(info.name.clone(), decoded);
    }
    if skipped > 0 {
        log::debug!("tensor filter skipped {skipped} of {} tensors", parsed.tensor_directory.len());
    }

    Ok(Model {
        header: parsed.header,
        metadata: parsed.metadata,
        tensor_directory: parsed.tensor_directory,
        tensors: Some(tensors),
        source_path: None,
        dequantize: options.dequantize,
        tensor_data_base_offset: parsed.tensor_data_base_offset,
    })
}

/// Parse structure only; no tensor bytes are read. Equivalent to
/// `load(path, LoadOptions { lazy: true, tensor_filter: reject-all, .. })`.
pub fn peek(path: impl AsRef<Path>) -> Result<Model, GgufError> {
    load(
        path,
        LoadOptions {
            lazy: true,
            ..LoadOptions::default()
        },
    )
}

/// Fetch a single tensor by name, decoding it from its packed bytes.
///
/// For lazy models this performs one positioned read; for eager models it
/// returns the already-materialized tensor without touching the filesystem.
pub fn fetch_tensor(model: &Model, name: &str) -> Result<DecodedTensor, GgufError> {
    if let Some(tensors) = &model.tensors {
        return tensors
            .get(name)
            .cloned()
            .ok_or_else(|| GgufError::TensorNotFound(name.to_string()));
    }

    let info = model
        .tensor_directory
        .get(name)
        .ok_or_else(|| GgufError::TensorNotFound(name.to_string()))?;

    let path: &PathBuf = model
        .source_path
        .as_ref()
        .expect("lazy model must carry a source path");

    let absolute_offset = model.tensor_data_base_offset + info.offset;
    let bytes = positioned_read(path, absolute_offset, info.byte_size as usize)?;
    decode_tensor_bytes(info, &bytes, model.dequantize)
}
