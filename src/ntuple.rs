use anyhow::{anyhow, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

use crate::models::{ColumnValues, ElementType};

/// Canonical extension of chunked ntuple files.
pub const FILE_EXTENSION: &str = "ntup";

const MAGIC: &[u8; 6] = b"NTUPLE";
const HEADER_LEN: usize = 12;

/// One branch declaration in the tree directory.
#[derive(Debug, Clone)]
pub struct BranchInfo {
    pub name: String,
    pub dtype: ElementType,
}

/// One tree declaration: a named partition of branches.
///
/// The tree with the empty name is the root tree.
#[derive(Debug, Clone)]
pub struct TreeInfo {
    pub name: String,
    pub branches: Vec<BranchInfo>,
}

impl TreeInfo {
    pub fn branch(&self, name: &str) -> Option<&BranchInfo> {
        self.branches.iter().find(|b| b.name == name)
    }

    /// Encoded size of one row across all branches, in bytes.
    fn row_len(&self) -> usize {
        self.branches.iter().map(|b| b.dtype.byte_len()).sum()
    }
}

/// One basket: a record batch for one tree, carrying `rows` values for
/// every branch of that tree in declaration order.
#[derive(Debug, Clone)]
pub struct Basket {
    pub tree_index: usize,
    pub rows: usize,
    pub columns: Vec<(String, ColumnValues)>,
}

fn read_inner_string(data: &[u8], pos: usize) -> Result<(String, usize)> {
    if pos + 4 > data.len() {
        return Err(anyhow!("Invalid string size position"));
    }

    let mut cursor = Cursor::new(&data[pos..pos + 4]);
    let size = cursor.read_u32::<LittleEndian>()? as usize;
    let end = pos + 4 + size;

    if end > data.len() {
        return Err(anyhow!("Invalid string size"));
    }

    let s = String::from_utf8(data[pos + 4..end].to_vec())
        .map_err(|e| anyhow!("Invalid UTF-8 in string: {}", e))?;

    Ok((s, end))
}

/// Low-level reader over the raw bytes of a chunked ntuple file.
pub struct NtupleReader<'a> {
    data: &'a [u8],
}

impl<'a> NtupleReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn is_valid(&self) -> bool {
        self.data.len() >= HEADER_LEN
            && &self.data[0..6] == MAGIC
            && self.get_version() >= 0x0100
    }

    pub fn get_version(&self) -> u16 {
        if self.data.len() < HEADER_LEN {
            return 0;
        }
        let mut cursor = Cursor::new(&self.data[6..8]);
        cursor.read_u16::<LittleEndian>().unwrap_or(0)
    }

    pub fn get_extra_header(&self) -> String {
        if self.data.len() < HEADER_LEN {
            return String::new();
        }

        let mut cursor = Cursor::new(&self.data[8..12]);
        let size = cursor.read_u32::<LittleEndian>().unwrap_or(0) as usize;

        if HEADER_LEN + size > self.data.len() {
            return String::new();
        }

        String::from_utf8(self.data[HEADER_LEN..HEADER_LEN + size].to_vec()).unwrap_or_default()
    }

    /// Parse the tree directory.
    pub fn trees(&self) -> Result<Vec<TreeInfo>> {
        Ok(self.parse_directory()?.0)
    }

    /// Iterate the baskets following the tree directory, in file order.
    pub fn baskets(&self) -> Result<BasketIterator<'a>> {
        let (trees, data_start) = self.parse_directory()?;
        Ok(BasketIterator {
            data: self.data,
            pos: data_start,
            trees,
        })
    }

    /// Returns the parsed directory and the offset of the first basket.
    fn parse_directory(&self) -> Result<(Vec<TreeInfo>, usize)> {
        if !self.is_valid() {
            return Err(anyhow!("Not a valid NTUPLE file"));
        }

        let mut cursor = Cursor::new(&self.data[8..12]);
        let extra_header_size = cursor.read_u32::<LittleEndian>()? as usize;
        let mut pos = HEADER_LEN + extra_header_size;

        if pos + 4 > self.data.len() {
            return Err(anyhow!("Truncated tree directory"));
        }
        let mut cursor = Cursor::new(&self.data[pos..pos + 4]);
        let tree_count = cursor.read_u32::<LittleEndian>()? as usize;
        pos += 4;

        let mut trees = Vec::with_capacity(tree_count);
        for _ in 0..tree_count {
            let (name, next) = read_inner_string(self.data, pos)?;
            pos = next;

            if pos + 4 > self.data.len() {
                return Err(anyhow!("Truncated tree directory"));
            }
            let mut cursor = Cursor::new(&self.data[pos..pos + 4]);
            let branch_count = cursor.read_u32::<LittleEndian>()? as usize;
            pos += 4;

            let mut branches = Vec::with_capacity(branch_count);
            for _ in 0..branch_count {
                let (branch_name, next) = read_inner_string(self.data, pos)?;
                pos = next;

                if pos >= self.data.len() {
                    return Err(anyhow!("Truncated tree directory"));
                }
                let code = self.data[pos];
                pos += 1;

                let dtype = ElementType::from_code(code)
                    .ok_or_else(|| anyhow!("Unknown element type code {}", code))?;
                branches.push(BranchInfo {
                    name: branch_name,
                    dtype,
                });
            }

            trees.push(TreeInfo { name, branches });
        }

        Ok((trees, pos))
    }
}

/// Iterator over the baskets of an ntuple file.
pub struct BasketIterator<'a> {
    data: &'a [u8],
    pos: usize,
    trees: Vec<TreeInfo>,
}

impl<'a> BasketIterator<'a> {
    pub fn trees(&self) -> &[TreeInfo] {
        &self.trees
    }

    fn read_basket(&mut self) -> Result<Basket> {
        let mut cursor = Cursor::new(&self.data[self.pos..self.pos + 8]);
        let tree_index = cursor.read_u32::<LittleEndian>()? as usize;
        let rows = cursor.read_u32::<LittleEndian>()? as usize;
        self.pos += 8;

        let tree = self
            .trees
            .get(tree_index)
            .ok_or_else(|| anyhow!("Basket references unknown tree index {}", tree_index))?;

        let payload_len = tree.row_len() * rows;
        if self.pos + payload_len > self.data.len() {
            return Err(anyhow!("Truncated basket payload"));
        }

        let mut columns = Vec::with_capacity(tree.branches.len());
        for branch in &tree.branches {
            let len = branch.dtype.byte_len() * rows;
            let values = decode_values(&self.data[self.pos..self.pos + len], branch.dtype, rows)?;
            columns.push((branch.name.clone(), values));
            self.pos += len;
        }

        Ok(Basket {
            tree_index,
            rows,
            columns,
        })
    }
}

impl<'a> Iterator for BasketIterator<'a> {
    type Item = Result<Basket>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.data.len() {
            return None;
        }
        if self.pos + 8 > self.data.len() {
            self.pos = self.data.len();
            return Some(Err(anyhow!("Truncated basket header")));
        }

        match self.read_basket() {
            Ok(basket) => Some(Ok(basket)),
            Err(e) => {
                // Stop after the first malformed basket.
                self.pos = self.data.len();
                Some(Err(e))
            }
        }
    }
}

fn decode_values(data: &[u8], dtype: ElementType, rows: usize) -> Result<ColumnValues> {
    let mut cursor = Cursor::new(data);
    let values = match dtype {
        ElementType::Bool => ColumnValues::Bool(data.iter().map(|&b| b != 0).collect()),
        ElementType::Int32 => {
            let mut v = Vec::with_capacity(rows);
            for _ in 0..rows {
                v.push(cursor.read_i32::<LittleEndian>()?);
            }
            ColumnValues::Int32(v)
        }
        ElementType::Int64 => {
            let mut v = Vec::with_capacity(rows);
            for _ in 0..rows {
                v.push(cursor.read_i64::<LittleEndian>()?);
            }
            ColumnValues::Int64(v)
        }
        ElementType::UInt32 => {
            let mut v = Vec::with_capacity(rows);
            for _ in 0..rows {
                v.push(cursor.read_u32::<LittleEndian>()?);
            }
            ColumnValues::UInt32(v)
        }
        ElementType::UInt64 => {
            let mut v = Vec::with_capacity(rows);
            for _ in 0..rows {
                v.push(cursor.read_u64::<LittleEndian>()?);
            }
            ColumnValues::UInt64(v)
        }
        ElementType::Float32 => {
            let mut v = Vec::with_capacity(rows);
            for _ in 0..rows {
                v.push(cursor.read_f32::<LittleEndian>()?);
            }
            ColumnValues::Float32(v)
        }
        ElementType::Float64 => {
            let mut v = Vec::with_capacity(rows);
            for _ in 0..rows {
                v.push(cursor.read_f64::<LittleEndian>()?);
            }
            ColumnValues::Float64(v)
        }
    };
    Ok(values)
}
