use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Element type of a branch, fixed for the lifetime of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Bool,
    Int32,
    Int64,
    UInt32,
    UInt64,
    Float32,
    Float64,
}

impl ElementType {
    /// Size of one encoded element in a basket, in bytes.
    pub fn byte_len(&self) -> usize {
        match self {
            ElementType::Bool => 1,
            ElementType::Int32 | ElementType::UInt32 | ElementType::Float32 => 4,
            ElementType::Int64 | ElementType::UInt64 | ElementType::Float64 => 8,
        }
    }

    /// Wire code used in the ntuple tree directory.
    pub fn code(&self) -> u8 {
        match self {
            ElementType::Bool => 0,
            ElementType::Int32 => 1,
            ElementType::Int64 => 2,
            ElementType::UInt32 => 3,
            ElementType::UInt64 => 4,
            ElementType::Float32 => 5,
            ElementType::Float64 => 6,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ElementType::Bool),
            1 => Some(ElementType::Int32),
            2 => Some(ElementType::Int64),
            3 => Some(ElementType::UInt32),
            4 => Some(ElementType::UInt64),
            5 => Some(ElementType::Float32),
            6 => Some(ElementType::Float64),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ElementType::Bool => "bool",
            ElementType::Int32 => "int32",
            ElementType::Int64 => "int64",
            ElementType::UInt32 => "uint32",
            ElementType::UInt64 => "uint64",
            ElementType::Float32 => "float32",
            ElementType::Float64 => "float64",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One column's values for one record batch.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Bool(Vec<bool>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    UInt32(Vec<u32>),
    UInt64(Vec<u64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

impl ColumnValues {
    pub fn elem_type(&self) -> ElementType {
        match self {
            ColumnValues::Bool(_) => ElementType::Bool,
            ColumnValues::Int32(_) => ElementType::Int32,
            ColumnValues::Int64(_) => ElementType::Int64,
            ColumnValues::UInt32(_) => ElementType::UInt32,
            ColumnValues::UInt64(_) => ElementType::UInt64,
            ColumnValues::Float32(_) => ElementType::Float32,
            ColumnValues::Float64(_) => ElementType::Float64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Bool(v) => v.len(),
            ColumnValues::Int32(v) => v.len(),
            ColumnValues::Int64(v) => v.len(),
            ColumnValues::UInt32(v) => v.len(),
            ColumnValues::UInt64(v) => v.len(),
            ColumnValues::Float32(v) => v.len(),
            ColumnValues::Float64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One chunk of rows for the columns of a tree, in emission order.
///
/// All columns of one batch have the same length (the batch's row count).
/// Concatenating the batches of one tree, in emission order, reconstructs
/// the full columns in file order.
#[derive(Debug, Clone)]
pub struct RecordBatch {
    columns: Vec<(String, ColumnValues)>,
}

impl RecordBatch {
    pub fn new(columns: Vec<(String, ColumnValues)>) -> Self {
        Self { columns }
    }

    /// Row count of this batch (length of the first column, 0 if empty).
    pub fn num_rows(&self) -> usize {
        self.columns.first().map_or(0, |(_, v)| v.len())
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Columns in emission order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &ColumnValues)> {
        self.columns.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn column(&self, name: &str) -> Option<&ColumnValues> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }
}

/// Compression codec applied uniformly to all datasets of one container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionCodec {
    #[default]
    None,
    Gzip,
    Zstd,
}

impl FromStr for CompressionCodec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(CompressionCodec::None),
            "gzip" => Ok(CompressionCodec::Gzip),
            "zstd" => Ok(CompressionCodec::Zstd),
            other => Err(format!(
                "unknown compression `{}` (expected none, gzip or zstd)",
                other
            )),
        }
    }
}

impl fmt::Display for CompressionCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionCodec::None => f.write_str("none"),
            CompressionCodec::Gzip => f.write_str("gzip"),
            CompressionCodec::Zstd => f.write_str("zstd"),
        }
    }
}

/// Compression configuration: codec plus an optional codec-specific level.
///
/// The level is meaningful for `gzip` (0-9) and `zstd` (1-22); it is
/// ignored when the codec is `none`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Compression {
    pub codec: CompressionCodec,
    pub level: Option<u32>,
}

impl Compression {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn gzip(level: u32) -> Self {
        Self {
            codec: CompressionCodec::Gzip,
            level: Some(level),
        }
    }

    pub fn zstd(level: u32) -> Self {
        Self {
            codec: CompressionCodec::Zstd,
            level: Some(level),
        }
    }
}
