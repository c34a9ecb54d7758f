//! # ntup2zarr
//!
//! A Rust library for converting chunked ntuple files (`.ntup`), which hold
//! columnar, tree-structured binary records, into Zarr stores of named,
//! independently growable datasets.
//!
//! ## Features
//!
//! - **Streaming conversion**: one basket in memory at a time, whole columns
//!   are never materialized
//! - **Type safety**: each branch's element type is probed once and enforced
//!   on every append
//! - **Order preservation**: concatenating the appended batches reproduces
//!   the source columns in file order
//! - **Compression**: optional gzip or zstd, applied uniformly per store
//! - **Batch resilience**: one bad file is logged and skipped, the run
//!   continues
//!
//! ## Quick Start
//!
//! ```no_run
//! use ntup2zarr::ZarrConverter;
//!
//! let stats = ZarrConverter::new("./output")
//!     .tree("events")
//!     .convert("run001.ntup")?;
//!
//! println!("{}", stats.summary());
//! # Ok::<(), ntup2zarr::Error>(())
//! ```
//!
//! ## Data Types
//!
//! Branches carry one of the fixed-width element types `bool`, `int32`,
//! `int64`, `uint32`, `uint64`, `float32` or `float64`. The destination
//! dataset is created with the matching Zarr data type.
//!
//! ## Destination Layout
//!
//! One store per source file, named after the file's stem with a `.zarr`
//! extension. One 1-D dataset per (tree, branch) pair at the node path
//! `/tree/branch`; branches of the root tree live directly under `/`.
//!
//! ## Advanced Usage
//!
//! The conversion engine in [`convert`] is generic over two traits:
//! [`ColumnSource`](convert::ColumnSource) on the input side and
//! [`DatasetSink`](convert::DatasetSink) on the output side. [`NtupReader`]
//! and [`formats::zarr::ZarrSink`] are the stock implementations; custom
//! sources and sinks plug into the same engine.
//!
//! For direct access to the binary structures of an ntuple file:
//!
//! ```no_run
//! use ntup2zarr::NtupReader;
//!
//! let reader = NtupReader::from_file("run001.ntup")?;
//! let low_level = reader.low_level_reader();
//!
//! for tree in low_level.trees()? {
//!     println!("{}: {} branches", tree.name, tree.branches.len());
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! All operations return `Result<T, Error>`:
//!
//! ```no_run
//! use ntup2zarr::{Error, ZarrConverter};
//!
//! match ZarrConverter::new("./output").convert("run001.ntup") {
//!     Ok(stats) => println!("{}", stats.summary()),
//!     Err(Error::DestinationConflict(path)) => {
//!         eprintln!("{} already exists", path.display());
//!     }
//!     Err(err) => eprintln!("Error: {}", err),
//! }
//! ```

// Public API modules
pub mod error;
pub mod reader;
pub mod writer;

// Re-export commonly used types
pub use error::{Error, Result};
pub use models::{ColumnValues, Compression, CompressionCodec, ElementType, RecordBatch};
pub use reader::NtupReader;
pub use writer::{ConvertStats, ZarrConverter};

// Internal modules (public but not part of the high-level API)
pub mod convert;
pub mod formats;
pub mod models;
pub mod ntuple;
