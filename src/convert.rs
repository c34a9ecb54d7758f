//! The schema-discovery-and-streaming-append engine.
//!
//! Conversion of one tree runs in four steps against two narrow seams,
//! [`ColumnSource`] on the input side and [`DatasetSink`] on the output
//! side:
//!
//! 1. [`resolve_columns`] - decide which branches to transfer
//! 2. [`probe_schema`] - read one batch to learn each branch's element type
//! 3. [`create_datasets`] - create one empty, appendable dataset per branch
//! 4. [`stream_append`] - re-traverse all batches and append them in order
//!
//! The probe pass discards its values; the data pass re-reads the first
//! batch. This doubles the read cost of one batch but keeps discovered
//! data out of the write path entirely.

use crate::error::{Error, Result};
use crate::formats::zarr::{self, ZarrSink};
use crate::models::{ColumnValues, Compression, ElementType, RecordBatch};
use crate::reader::NtupReader;
use crate::writer::ConvertStats;
use log::{info, warn};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Default Zarr chunk length, in rows.
pub const DEFAULT_CHUNK_ROWS: u64 = 65_536;

/// A fallible sequence of record batches for one tree, in file order.
pub type BatchIter<'a> = Box<dyn Iterator<Item = Result<RecordBatch>> + 'a>;

/// Source-side collaborator: enumerates columns and emits record batches.
///
/// Implementations must emit, for a fixed `(tree, columns)` request, the
/// same batch sequence on every traversal; the engine traverses twice
/// (probe pass, then data pass).
pub trait ColumnSource {
    /// All column names available in `tree`, in the source's order.
    fn list_columns(&self, tree: &str) -> Result<Vec<String>>;

    /// The batch sequence for `tree`, projected to `columns`.
    fn batches(&self, tree: &str, columns: &[String]) -> Result<BatchIter<'_>>;
}

/// Destination-side collaborator: named, appendable, typed datasets.
pub trait DatasetSink {
    /// Create an empty dataset for `(tree, column)` with the given element
    /// type. Called exactly once per resolved column, before any append.
    fn create_dataset(&mut self, tree: &str, column: &str, dtype: ElementType) -> Result<()>;

    /// Append `values` to the tail of the dataset for `(tree, column)`.
    fn append(&mut self, tree: &str, column: &str, values: &ColumnValues) -> Result<()>;

    /// Flush and release the container.
    fn finish(&mut self) -> Result<()>;
}

/// Fully-resolved conversion configuration, constructed once before any
/// tree processing begins.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Trees to convert; empty means the single root tree.
    pub trees: Vec<String>,
    /// Branches to include in every requested tree; empty means all.
    pub columns: Vec<String>,
    /// Compression applied uniformly to all datasets of one store.
    pub compression: Compression,
    /// Zarr chunk length, in rows.
    pub chunk_rows: u64,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            trees: Vec::new(),
            columns: Vec::new(),
            compression: Compression::none(),
            chunk_rows: DEFAULT_CHUNK_ROWS,
        }
    }
}

/// Resolve the final set of column names to transfer for `tree`.
///
/// An empty `requested` list adopts the source's full column set in the
/// source's reported order. An explicit list is validated against the
/// source and deduplicated in request order; a name the source does not
/// know fails with a schema error before any dataset is created.
pub fn resolve_columns(
    source: &dyn ColumnSource,
    tree: &str,
    requested: &[String],
) -> Result<Vec<String>> {
    let available = source.list_columns(tree)?;

    if requested.is_empty() {
        return Ok(dedupe(available));
    }

    for name in requested {
        if !available.contains(name) {
            return Err(Error::schema(
                tree,
                format!("branch `{}` not found in tree", name),
            ));
        }
    }
    Ok(dedupe(requested.to_vec()))
}

fn dedupe(names: Vec<String>) -> Vec<String> {
    let mut seen = Vec::with_capacity(names.len());
    for name in names {
        if !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}

/// Learn each column's element type from the first available batch.
///
/// The probed batch's values are discarded; the data pass re-reads them.
/// A tree that yields no batches has no types to infer and fails with a
/// schema error rather than producing zero-row datasets of unknown type.
pub fn probe_schema(
    source: &dyn ColumnSource,
    tree: &str,
    columns: &[String],
) -> Result<Vec<(String, ElementType)>> {
    let mut batches = source.batches(tree, columns)?;
    let first = batches
        .next()
        .ok_or_else(|| Error::schema(tree, "tree has no baskets to probe"))??;

    let mut schema = Vec::with_capacity(columns.len());
    for name in columns {
        let values = first
            .column(name)
            .ok_or_else(|| Error::write_mismatch(tree, name, "column missing from probed batch"))?;
        schema.push((name.clone(), values.elem_type()));
    }
    Ok(schema)
}

/// Create one empty, appendable dataset per probed column.
pub fn create_datasets(
    sink: &mut dyn DatasetSink,
    tree: &str,
    schema: &[(String, ElementType)],
) -> Result<()> {
    for (column, dtype) in schema {
        sink.create_dataset(tree, column, *dtype)?;
    }
    Ok(())
}

/// Re-traverse the full batch sequence and append every batch to the tail
/// of the matching datasets, preserving batch order and intra-batch row
/// order. Returns the total number of rows appended.
///
/// A batch that disagrees with the probed schema - an unexpected or
/// duplicated column, a missing column, a ragged column length, or a
/// changed element type - is a contract violation of the source and fails
/// with a write mismatch, fatal for this tree. Each batch is validated in
/// full before any of its columns is appended.
pub fn stream_append(
    source: &dyn ColumnSource,
    sink: &mut dyn DatasetSink,
    tree: &str,
    columns: &[String],
    schema: &[(String, ElementType)],
) -> Result<u64> {
    let expected: HashMap<&str, ElementType> =
        schema.iter().map(|(n, t)| (n.as_str(), *t)).collect();

    let mut total_rows = 0u64;
    for batch in source.batches(tree, columns)? {
        let batch = batch?;
        let rows = batch.num_rows();

        let mut seen: HashSet<&str> = HashSet::with_capacity(columns.len());
        for (column, values) in batch.columns() {
            let dtype = expected.get(column).copied().ok_or_else(|| {
                Error::write_mismatch(tree, column, "column not in the resolved set")
            })?;
            if !seen.insert(column) {
                return Err(Error::write_mismatch(
                    tree,
                    column,
                    "column appears more than once in batch",
                ));
            }
            if values.elem_type() != dtype {
                return Err(Error::write_mismatch(
                    tree,
                    column,
                    format!("expected {}, batch has {}", dtype, values.elem_type()),
                ));
            }
            if values.len() != rows {
                return Err(Error::write_mismatch(
                    tree,
                    column,
                    format!("column has {} rows, batch has {}", values.len(), rows),
                ));
            }
        }
        if seen.len() != columns.len() {
            let missing = columns
                .iter()
                .find(|c| !seen.contains(c.as_str()))
                .map(|s| s.as_str())
                .unwrap_or("?");
            return Err(Error::write_mismatch(
                tree,
                missing,
                "column missing from batch",
            ));
        }

        for (column, values) in batch.columns() {
            sink.append(tree, column, values)?;
        }
        total_rows += rows as u64;
    }

    Ok(total_rows)
}

/// Convert one tree end to end: resolve, probe, create, stream.
///
/// Returns `(datasets created, rows appended)`.
pub fn convert_tree(
    source: &dyn ColumnSource,
    sink: &mut dyn DatasetSink,
    tree: &str,
    requested: &[String],
) -> Result<(usize, u64)> {
    let columns = resolve_columns(source, tree, requested)?;
    let schema = probe_schema(source, tree, &columns)?;
    create_datasets(sink, tree, &schema)?;
    let rows = stream_append(source, sink, tree, &columns, &schema)?;
    Ok((schema.len(), rows))
}

/// Destination store path: the source file's stem with the Zarr extension,
/// placed directly in the output directory.
pub fn destination_path(infile: &Path, outdir: &Path) -> PathBuf {
    let stem = infile
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("converted");
    outdir.join(format!("{}.{}", stem, zarr::FILE_EXTENSION))
}

/// Convert one source file into one Zarr store.
///
/// The store is released on every exit path: an error while converting a
/// tree still flushes the partially written store before the error is
/// returned (the caller must treat such a store as unusable and delete it
/// before retrying).
pub fn convert_file(infile: &Path, outdir: &Path, options: &ConvertOptions) -> Result<ConvertStats> {
    let reader = NtupReader::from_file(infile)?;
    let outpath = destination_path(infile, outdir);
    let mut sink = ZarrSink::create(&outpath, options.compression, options.chunk_rows)?;

    let result = convert_trees(&reader, &mut sink, options);
    let finish_result = sink.finish();

    let stats = result?;
    finish_result?;
    Ok(stats)
}

fn convert_trees(
    source: &dyn ColumnSource,
    sink: &mut dyn DatasetSink,
    options: &ConvertOptions,
) -> Result<ConvertStats> {
    let trees = if options.trees.is_empty() {
        vec![String::new()]
    } else {
        dedupe(options.trees.clone())
    };

    let mut stats = ConvertStats::default();
    for tree in &trees {
        let (datasets, rows) = convert_tree(source, sink, tree, &options.columns)?;
        info!(
            "   ├─ Tree {}: {} dataset(s), {} row(s)",
            if tree.is_empty() { "(root)" } else { tree },
            datasets,
            rows
        );
        stats.trees += 1;
        stats.datasets += datasets;
        stats.rows += rows;
    }
    Ok(stats)
}

/// Outcome of a batch run across several source files.
#[derive(Debug, Default)]
pub struct BatchSummary {
    /// Destination paths of the files that converted cleanly.
    pub converted: Vec<PathBuf>,
    /// Source paths that were skipped, with the error that caused it.
    pub skipped: Vec<(PathBuf, Error)>,
}

impl BatchSummary {
    pub fn all_succeeded(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Convert several source files, one at a time, in the supplied order.
///
/// Every per-file error - unreadable source, existing destination, schema
/// or type mismatch, disk failure - is isolated uniformly: the file is
/// logged and skipped, and the run continues with the next file.
pub fn convert_files(infiles: &[PathBuf], outdir: &Path, options: &ConvertOptions) -> BatchSummary {
    let mut summary = BatchSummary::default();

    for (i, infile) in infiles.iter().enumerate() {
        info!(
            "On file {}. File {} out of {}",
            infile.display(),
            i + 1,
            infiles.len()
        );
        match convert_file(infile, outdir, options) {
            Ok(stats) => {
                info!("   └─ {}", stats.summary());
                summary.converted.push(destination_path(infile, outdir));
            }
            Err(e) => {
                warn!("Could not process {}.", infile.display());
                warn!("Received: {}", e);
                warn!("Skipping {}.", infile.display());
                summary.skipped.push((infile.clone(), e));
            }
        }
    }

    summary
}
