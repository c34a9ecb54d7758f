/// Test utilities for building NTUPLE files
use byteorder::{LittleEndian, WriteBytesExt};
use ntup2zarr::models::{ColumnValues, ElementType};

/// Builder for creating NTUPLE test files
pub struct NtupBuilder {
    version: u16,
    extra_header: String,
    trees: Vec<(String, Vec<(String, ElementType)>)>,
    baskets: Vec<u8>,
}

impl NtupBuilder {
    /// Create a new builder with default header (version 1.0, no extra header)
    pub fn new() -> Self {
        Self {
            version: 0x0100,
            extra_header: String::new(),
            trees: Vec::new(),
            baskets: Vec::new(),
        }
    }

    /// Create a new builder with a specific version and extra header
    pub fn with_header(version: u16, extra_header: &str) -> Self {
        Self {
            version,
            extra_header: extra_header.to_string(),
            trees: Vec::new(),
            baskets: Vec::new(),
        }
    }

    /// Declare a tree and its branches. The empty name is the root tree.
    pub fn tree(mut self, name: &str, branches: &[(&str, ElementType)]) -> Self {
        self.trees.push((
            name.to_string(),
            branches
                .iter()
                .map(|(n, t)| (n.to_string(), *t))
                .collect(),
        ));
        self
    }

    /// Append a basket for a declared tree. Columns must be supplied in
    /// branch-declaration order with equal lengths.
    pub fn basket(mut self, tree: &str, columns: &[ColumnValues]) -> Self {
        let tree_index = self
            .trees
            .iter()
            .position(|(name, _)| name == tree)
            .expect("basket references undeclared tree");
        let rows = columns.first().map_or(0, |c| c.len());

        self.baskets
            .write_u32::<LittleEndian>(tree_index as u32)
            .unwrap();
        self.baskets.write_u32::<LittleEndian>(rows as u32).unwrap();
        for column in columns {
            write_values(&mut self.baskets, column);
        }
        self
    }

    /// Append raw bytes to the basket section (for corruption tests)
    pub fn raw_bytes(mut self, bytes: &[u8]) -> Self {
        self.baskets.extend_from_slice(bytes);
        self
    }

    /// Build and return the final NTUPLE data
    pub fn build(self) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(b"NTUPLE");
        data.write_u16::<LittleEndian>(self.version).unwrap();
        data.write_u32::<LittleEndian>(self.extra_header.len() as u32)
            .unwrap();
        data.extend_from_slice(self.extra_header.as_bytes());

        data.write_u32::<LittleEndian>(self.trees.len() as u32)
            .unwrap();
        for (name, branches) in &self.trees {
            write_string(&mut data, name);
            data.write_u32::<LittleEndian>(branches.len() as u32)
                .unwrap();
            for (branch_name, dtype) in branches {
                write_string(&mut data, branch_name);
                data.push(dtype.code());
            }
        }

        data.extend_from_slice(&self.baskets);
        data
    }
}

impl Default for NtupBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn write_string(data: &mut Vec<u8>, s: &str) {
    data.write_u32::<LittleEndian>(s.len() as u32).unwrap();
    data.extend_from_slice(s.as_bytes());
}

fn write_values(data: &mut Vec<u8>, values: &ColumnValues) {
    match values {
        ColumnValues::Bool(v) => {
            for &b in v {
                data.push(if b { 1 } else { 0 });
            }
        }
        ColumnValues::Int32(v) => {
            for &x in v {
                data.write_i32::<LittleEndian>(x).unwrap();
            }
        }
        ColumnValues::Int64(v) => {
            for &x in v {
                data.write_i64::<LittleEndian>(x).unwrap();
            }
        }
        ColumnValues::UInt32(v) => {
            for &x in v {
                data.write_u32::<LittleEndian>(x).unwrap();
            }
        }
        ColumnValues::UInt64(v) => {
            for &x in v {
                data.write_u64::<LittleEndian>(x).unwrap();
            }
        }
        ColumnValues::Float32(v) => {
            for &x in v {
                data.write_f32::<LittleEndian>(x).unwrap();
            }
        }
        ColumnValues::Float64(v) => {
            for &x in v {
                data.write_f64::<LittleEndian>(x).unwrap();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_creates_valid_header() {
        let data = NtupBuilder::new().build();
        assert_eq!(&data[0..6], b"NTUPLE");
        assert_eq!(data[6], 0x00); // Minor version
        assert_eq!(data[7], 0x01); // Major version
        assert_eq!(data[8..12], [0, 0, 0, 0]); // Extra header length = 0
        assert_eq!(data[12..16], [0, 0, 0, 0]); // Tree count = 0
    }

    #[test]
    fn test_builder_with_extra_header() {
        let data = NtupBuilder::with_header(0x0100, "test").build();
        assert_eq!(&data[0..6], b"NTUPLE");
        assert_eq!(data[8], 4); // Extra header length
        assert_eq!(&data[12..16], b"test");
    }
}
