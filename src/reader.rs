//! High-level API for reading chunked ntuple files.

use crate::convert::{BatchIter, ColumnSource};
use crate::error::{Error, Result};
use crate::models::RecordBatch;
use crate::ntuple::{NtupleReader, TreeInfo};
use memmap2::Mmap;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

enum ReaderData {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl ReaderData {
    fn bytes(&self) -> &[u8] {
        match self {
            ReaderData::Mapped(mmap) => mmap,
            ReaderData::Owned(data) => data,
        }
    }
}

/// A reader for chunked ntuple files.
///
/// The file is memory-mapped; baskets are decoded one at a time during
/// traversal, so peak memory stays at roughly one basket regardless of
/// file size.
///
/// # Examples
///
/// ```no_run
/// use ntup2zarr::NtupReader;
///
/// let reader = NtupReader::from_file("events.ntup")?;
/// println!("trees: {:?}", reader.tree_names()?);
/// # Ok::<(), ntup2zarr::Error>(())
/// ```
pub struct NtupReader {
    data: ReaderData,
}

impl NtupReader {
    /// Create a reader from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or is not a valid
    /// ntuple file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let mmap = unsafe { Mmap::map(&file)? };

        let reader = NtupleReader::new(&mmap);
        if !reader.is_valid() {
            return Err(Error::InvalidFormat(format!(
                "{} is not a valid NTUPLE file",
                path.as_ref().display()
            )));
        }

        Ok(Self {
            data: ReaderData::Mapped(mmap),
        })
    }

    /// Create a reader from raw bytes.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let reader = NtupleReader::new(&data);
        if !reader.is_valid() {
            return Err(Error::InvalidFormat(
                "Not a valid NTUPLE file".to_string(),
            ));
        }

        Ok(Self {
            data: ReaderData::Owned(data),
        })
    }

    /// Get the ntuple format version (e.g. 0x0100 for version 1.0).
    pub fn version(&self) -> u16 {
        NtupleReader::new(self.data.bytes()).get_version()
    }

    /// Get the optional extra header string.
    pub fn extra_header(&self) -> String {
        NtupleReader::new(self.data.bytes()).get_extra_header()
    }

    /// Names of all trees in the file, in directory order.
    ///
    /// The root tree is reported as the empty string.
    pub fn tree_names(&self) -> Result<Vec<String>> {
        let trees = NtupleReader::new(self.data.bytes())
            .trees()
            .map_err(|e| Error::InvalidFormat(e.to_string()))?;
        Ok(trees.into_iter().map(|t| t.name).collect())
    }

    /// Get a low-level reader for direct access to the binary structures.
    pub fn low_level_reader(&self) -> NtupleReader<'_> {
        NtupleReader::new(self.data.bytes())
    }

    fn find_tree(&self, tree: &str) -> Result<(usize, TreeInfo)> {
        let trees = NtupleReader::new(self.data.bytes())
            .trees()
            .map_err(|e| Error::InvalidFormat(e.to_string()))?;

        trees
            .into_iter()
            .enumerate()
            .find(|(_, t)| t.name == tree)
            .ok_or_else(|| Error::schema(tree, "tree not found in file"))
    }
}

impl ColumnSource for NtupReader {
    fn list_columns(&self, tree: &str) -> Result<Vec<String>> {
        let (_, info) = self.find_tree(tree)?;
        Ok(info.branches.into_iter().map(|b| b.name).collect())
    }

    fn batches(&self, tree: &str, columns: &[String]) -> Result<BatchIter<'_>> {
        let (tree_index, info) = self.find_tree(tree)?;
        for column in columns {
            if info.branch(column).is_none() {
                return Err(Error::schema(
                    tree,
                    format!("branch `{}` not found in tree", column),
                ));
            }
        }

        let baskets = NtupleReader::new(self.data.bytes())
            .baskets()
            .map_err(|e| Error::InvalidFormat(e.to_string()))?;

        let tree_name = tree.to_string();
        let columns = columns.to_vec();
        let iter = baskets
            .filter(move |basket| match basket {
                Ok(b) => b.tree_index == tree_index,
                Err(_) => true,
            })
            .map(move |basket| {
                let basket = basket.map_err(|e| Error::InvalidFormat(e.to_string()))?;
                let mut by_name: HashMap<String, _> = basket.columns.into_iter().collect();
                let mut projected = Vec::with_capacity(columns.len());
                for name in &columns {
                    let values = by_name.remove(name).ok_or_else(|| {
                        Error::schema(&tree_name, format!("branch `{}` missing from basket", name))
                    })?;
                    projected.push((name.clone(), values));
                }
                Ok(RecordBatch::new(projected))
            });

        Ok(Box::new(iter))
    }
}
