use log::debug;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use zarrs::array::codec::{BytesToBytesCodecTraits, GzipCodec, ZstdCodec};
use zarrs::array::{Array, ArrayBuilder, DataType, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs::filesystem::FilesystemStore;
use zarrs::group::GroupBuilder;
use zarrs::storage::{ReadableWritableListableStorage, ReadableWritableListableStorageTraits};

use crate::convert::DatasetSink;
use crate::error::{Error, Result};
use crate::models::{ColumnValues, Compression, CompressionCodec, ElementType};

/// Canonical extension of destination stores.
pub const FILE_EXTENSION: &str = "zarr";

const DEFAULT_GZIP_LEVEL: u32 = 4;
const DEFAULT_ZSTD_LEVEL: u32 = 5;

/// Zarr node path for one dataset: `/<tree>/<column>`, or `/<column>` for
/// the root tree.
pub fn dataset_path(tree: &str, column: &str) -> String {
    if tree.is_empty() {
        format!("/{}", column)
    } else {
        format!("/{}/{}", tree, column)
    }
}

struct Dataset {
    array: Array<dyn ReadableWritableListableStorageTraits>,
    rows: u64,
    dtype: ElementType,
}

/// Destination sink writing one Zarr V3 store per converted source file.
///
/// Every dataset is a 1-D resizable array created with zero rows.
/// Appending a batch grows the array shape by the batch length and writes
/// the values into exactly the new tail slice.
pub struct ZarrSink {
    store: ReadableWritableListableStorage,
    compression: Compression,
    chunk_rows: u64,
    groups: HashSet<String>,
    datasets: HashMap<String, Dataset>,
}

impl std::fmt::Debug for ZarrSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZarrSink")
            .field("compression", &self.compression)
            .field("chunk_rows", &self.chunk_rows)
            .field("groups", &self.groups)
            .finish_non_exhaustive()
    }
}

impl ZarrSink {
    /// Create the store at `path`.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::DestinationConflict`] if `path` already exists;
    /// the existing store is left untouched. The check happens once here,
    /// not per dataset.
    pub fn create(path: &Path, compression: Compression, chunk_rows: u64) -> Result<Self> {
        if chunk_rows == 0 {
            return Err(Error::Config("chunk rows must be non-zero".to_string()));
        }
        if path.exists() {
            return Err(Error::DestinationConflict(path.to_path_buf()));
        }

        let store: ReadableWritableListableStorage = Arc::new(
            FilesystemStore::new(path).map_err(|e| Error::Output(e.to_string()))?,
        );

        GroupBuilder::new()
            .build(store.clone(), "/")
            .map_err(|e| Error::Output(e.to_string()))?
            .store_metadata()
            .map_err(|e| Error::Output(e.to_string()))?;

        Ok(Self {
            store,
            compression,
            chunk_rows,
            groups: HashSet::new(),
            datasets: HashMap::new(),
        })
    }

    fn ensure_group(&mut self, tree: &str) -> Result<()> {
        if tree.is_empty() || !self.groups.insert(tree.to_string()) {
            return Ok(());
        }

        GroupBuilder::new()
            .build(self.store.clone(), &format!("/{}", tree))
            .map_err(|e| Error::Output(e.to_string()))?
            .store_metadata()
            .map_err(|e| Error::Output(e.to_string()))?;
        Ok(())
    }

    fn codec_chain(&self) -> Result<Vec<Arc<dyn BytesToBytesCodecTraits>>> {
        match self.compression.codec {
            CompressionCodec::None => Ok(vec![]),
            CompressionCodec::Gzip => {
                let level = self.compression.level.unwrap_or(DEFAULT_GZIP_LEVEL);
                let codec = GzipCodec::new(level)
                    .map_err(|e| Error::Config(format!("invalid gzip level: {}", e)))?;
                Ok(vec![Arc::new(codec)])
            }
            CompressionCodec::Zstd => {
                let level = self.compression.level.unwrap_or(DEFAULT_ZSTD_LEVEL) as i32;
                let level = level
                    .try_into()
                    .map_err(|_| Error::Config(format!("invalid zstd level: {}", level)))?;
                Ok(vec![Arc::new(ZstdCodec::new(level, false))])
            }
        }
    }
}

fn zarr_data_type(dtype: ElementType) -> (DataType, FillValue) {
    match dtype {
        ElementType::Bool => (DataType::Bool, FillValue::from(false)),
        ElementType::Int32 => (DataType::Int32, FillValue::from(0i32)),
        ElementType::Int64 => (DataType::Int64, FillValue::from(0i64)),
        ElementType::UInt32 => (DataType::UInt32, FillValue::from(0u32)),
        ElementType::UInt64 => (DataType::UInt64, FillValue::from(0u64)),
        ElementType::Float32 => (DataType::Float32, FillValue::from(0f32)),
        ElementType::Float64 => (DataType::Float64, FillValue::from(0f64)),
    }
}

impl DatasetSink for ZarrSink {
    fn create_dataset(&mut self, tree: &str, column: &str, dtype: ElementType) -> Result<()> {
        let path = dataset_path(tree, column);
        if self.datasets.contains_key(&path) {
            return Err(Error::Other(format!("dataset {} already created", path)));
        }

        self.ensure_group(tree)?;
        let (data_type, fill_value) = zarr_data_type(dtype);
        let codecs = self.codec_chain()?;

        let dtype_value =
            serde_json::to_value(dtype).map_err(|e| Error::Output(e.to_string()))?;
        let mut attributes = serde_json::Map::new();
        attributes.insert("tree".to_string(), serde_json::json!(tree));
        attributes.insert("branch".to_string(), serde_json::json!(column));
        attributes.insert("element_type".to_string(), dtype_value);

        let array = ArrayBuilder::new(
            vec![0], // zero rows, grown by append
            data_type,
            vec![self.chunk_rows]
                .try_into()
                .map_err(|_| Error::Config("chunk rows must be non-zero".to_string()))?,
            fill_value,
        )
        .bytes_to_bytes_codecs(codecs)
        .dimension_names(["row"].into())
        .attributes(attributes)
        .build(self.store.clone(), &path)
        .map_err(|e| Error::Output(e.to_string()))?;

        array
            .store_metadata()
            .map_err(|e| Error::Output(e.to_string()))?;

        debug!("Created dataset {} ({})", path, dtype);
        self.datasets.insert(
            path,
            Dataset {
                array,
                rows: 0,
                dtype,
            },
        );
        Ok(())
    }

    fn append(&mut self, tree: &str, column: &str, values: &ColumnValues) -> Result<()> {
        let path = dataset_path(tree, column);
        let dataset = self
            .datasets
            .get_mut(&path)
            .ok_or_else(|| Error::Other(format!("dataset {} was never created", path)))?;

        if values.elem_type() != dataset.dtype {
            return Err(Error::write_mismatch(
                tree,
                column,
                format!(
                    "dataset is {}, batch has {}",
                    dataset.dtype,
                    values.elem_type()
                ),
            ));
        }
        if values.is_empty() {
            return Ok(());
        }

        let start = dataset.rows;
        let end = start + values.len() as u64;

        dataset.array.set_shape(vec![end]);
        dataset
            .array
            .store_metadata()
            .map_err(|e| Error::Output(e.to_string()))?;

        let tail = ArraySubset::new_with_ranges(&[start..end]);
        let result = match values {
            ColumnValues::Bool(v) => dataset.array.store_array_subset_elements::<bool>(&tail, v),
            ColumnValues::Int32(v) => dataset.array.store_array_subset_elements::<i32>(&tail, v),
            ColumnValues::Int64(v) => dataset.array.store_array_subset_elements::<i64>(&tail, v),
            ColumnValues::UInt32(v) => dataset.array.store_array_subset_elements::<u32>(&tail, v),
            ColumnValues::UInt64(v) => dataset.array.store_array_subset_elements::<u64>(&tail, v),
            ColumnValues::Float32(v) => dataset.array.store_array_subset_elements::<f32>(&tail, v),
            ColumnValues::Float64(v) => dataset.array.store_array_subset_elements::<f64>(&tail, v),
        };
        result.map_err(|e| Error::Output(e.to_string()))?;

        dataset.rows = end;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        // The filesystem store persists every metadata and chunk write as
        // it happens; releasing the handles is all that remains.
        self.datasets.clear();
        self.groups.clear();
        Ok(())
    }
}
