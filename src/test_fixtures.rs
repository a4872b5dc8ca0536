//! In-memory GGUF byte-stream construction for tests. Not part of the public
//! API — synthesizing container bytes is a test concern, not a reader
//! concern.

use crate::primitive::StringWidth;

const TYPE_UINT32: u32 = 4;
const TYPE_INT32: u32 = 5;
const TYPE_STRING: u32 = 8;
const TYPE_F32: u32 = 0;

fn align_up(offset: u64, alignment: u64) -> u64 {
    (offset + alignment - 1) / alignment * alignment
}

pub struct GgufFixture {
    version: u32,
    metadata_entries: Vec<(String, u32, Vec<u8>)>,
    tensors: Vec<(String, Vec<u64>, u32, Vec<u8>)>,
}

impl GgufFixture {
    pub fn new(version: u32) -> Self {
        Self {
            version,
            metadata_entries: Vec::new(),
            tensors: Vec::new(),
        }
    }

    fn width(&self) -> StringWidth {
        if self.version >= 3 {
            StringWidth::U64Length
        } else {
            StringWidth::U32Length
        }
    }

    fn encode_string(&self, s: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        match self.width() {
            StringWidth::U32Length => buf.extend_from_slice(&(s.len() as u32).to_le_bytes()),
            StringWidth::U64Length => buf.extend_from_slice(&(s.len() as u64).to_le_bytes()),
        }
        buf.extend_from_slice(s.as_bytes());
        buf
    }

    pub fn add_metadata_string(&mut self, key: &str, value: &str) {
        let encoded = self.encode_string(value);
        self.metadata_entries.push((key.to_string(), TYPE_STRING, encoded));
    }

    pub fn add_metadata_u32(&mut self, key: &str, value: u32) {
        self.metadata_entries.push((key.to_string(), TYPE_UINT32, value.to_le_bytes().to_vec()));
    }

    pub fn add_metadata_i32(&mut self, key: &str, value: i32) {
        self.metadata_entries.push((key.to_string(), TYPE_INT32, value.to_le_bytes().to_vec()));
    }

    pub fn add_metadata_raw(&mut self, key: &str, type_id: u32, value_bytes: Vec<u8>) {
        self.metadata_entries.push((key.to_string(), type_id, value_bytes));
    }

    pub fn add_f32_tensor(&mut self, name: &str, dims_on_disk: &[u64], data: &[f32]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.tensors.push((name.to_string(), dims_on_disk.to_vec(), TYPE_F32, bytes));
    }

    pub fn add_raw_tensor(&mut self, name: &str, dims_on_disk: &[u64], type_id: u32, data: Vec<u8>) {
        self.tensors.push((name.to_string(), dims_on_disk.to_vec(), type_id, data));
    }

    fn alignment(&self) -> u64 {
        for (key, type_id, bytes) in &self.metadata_entries {
            if key == "general.alignment" {
                return match *type_id {
                    TYPE_UINT32 => u32::from_le_bytes(bytes[..4].try_into().unwrap()) as u64,
                    TYPE_INT32 => {
                        let v = i32::from_le_bytes(bytes[..4].try_into().unwrap());
                        if v > 0 {
                            v as u64
                        } else {
                            32
                        }
                    }
                    _ => 32,
                };
            }
        }
        32
    }

    pub fn finish(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"GGUF");
        out.extend_from_slice(&self.version.to_le_bytes());

        let tensor_count = self.tensors.len() as u64;
        let metadata_kv_count = self.metadata_entries.len() as u64;
        if self.version >= 3 {
            out.extend_from_slice(&tensor_count.to_le_bytes());
            out.extend_from_slice(&metadata_kv_count.to_le_bytes());
        } else {
            out.extend_from_slice(&(tensor_count as u32).to_le_bytes());
            out.extend_from_slice(&(metadata_kv_count as u32).to_le_bytes());
        }

        for (key, type_id, value_bytes) in &self.metadata_entries {
            out.extend_from_slice(&self.encode_string(key));
            out.extend_from_slice(&type_id.to_le_bytes());
            out.extend_from_slice(value_bytes);
        }

        let alignment = self.alignment();
        let mut offsets = Vec::with_capacity(self.tensors.len());
        let mut cursor = 0u64;
        for (_, _, _, data) in &self.tensors {
            let aligned = align_up(cursor, alignment);
            offsets.push(aligned);
            cursor = aligned + data.len() as u64;
        }

        for (i, (name, dims, type_id, _data)) in self.tensors.iter().enumerate() {
            out.extend_from_slice(&self.encode_string(name));
            out.extend_from_slice(&(dims.len() as u32).to_le_bytes());
            for d in dims {
                out.extend_from_slice(&d.to_le_bytes());
            }
            out.extend_from_slice(&type_id.to_le_bytes());
            out.extend_from_slice(&offsets[i].to_le_bytes());
        }

        let prefix_len = out.len() as u64;
        let base_offset = align_up(prefix_len, alignment);
        out.resize(base_offset as usize, 0);

        let mut data_section = vec![0u8; cursor as usize];
        for (i, (_, _, _, data)) in self.tensors.iter().enumerate() {
            let start = offsets[i] as usize;
            data_section[start..start + data.len()].copy_from_slice(data);
        }
        out.extend_from_slice(&data_section);

        out
    }
}
