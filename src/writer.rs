//! High-level API for converting ntuple files to Zarr stores.

use crate::convert::{self, ConvertOptions};
use crate::error::Result;
use crate::models::Compression;
use std::path::{Path, PathBuf};

/// Converter for writing ntuple data to Zarr format.
///
/// Zarr stores hold named, independently growable, typed datasets and are
/// widely supported by scientific analysis tools.
///
/// # Examples
///
/// ```no_run
/// use ntup2zarr::{Compression, ZarrConverter};
///
/// let stats = ZarrConverter::new("./output")
///     .tree("events")
///     .compression(Compression::gzip(4))
///     .convert("run001.ntup")?;
///
/// println!("{}", stats.summary());
/// # Ok::<(), ntup2zarr::Error>(())
/// ```
pub struct ZarrConverter {
    outdir: PathBuf,
    options: ConvertOptions,
}

impl ZarrConverter {
    /// Create a converter writing into the given output directory.
    ///
    /// The destination store is named after the source file's stem with a
    /// `.zarr` extension.
    pub fn new<P: AsRef<Path>>(outdir: P) -> Self {
        Self {
            outdir: outdir.as_ref().to_path_buf(),
            options: ConvertOptions::default(),
        }
    }

    /// Add a tree to convert. Default is the single root tree.
    pub fn tree<S: Into<String>>(mut self, name: S) -> Self {
        self.options.trees.push(name.into());
        self
    }

    /// Set the trees to convert, replacing any previous selection.
    pub fn trees<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.trees = names.into_iter().map(Into::into).collect();
        self
    }

    /// Set the branches to include in every requested tree.
    /// Default is all branches of each tree.
    pub fn columns<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.columns = names.into_iter().map(Into::into).collect();
        self
    }

    /// Set the compression applied uniformly to all datasets of the store.
    pub fn compression(mut self, compression: Compression) -> Self {
        self.options.compression = compression;
        self
    }

    /// Set the Zarr chunk length in rows. Default is 65,536.
    pub fn chunk_rows(mut self, rows: u64) -> Self {
        self.options.chunk_rows = rows;
        self
    }

    /// Convert one source file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the source file cannot be read or is not a valid ntuple file
    /// - the destination store already exists
    /// - a requested tree or branch does not exist, or a tree has no
    ///   baskets to probe
    /// - a basket disagrees with the probed schema
    pub fn convert<P: AsRef<Path>>(&self, infile: P) -> Result<ConvertStats> {
        convert::convert_file(infile.as_ref(), &self.outdir, &self.options)
    }
}

/// Statistics about one converted source file.
#[derive(Debug, Clone, Default)]
pub struct ConvertStats {
    /// Number of trees converted
    pub trees: usize,
    /// Number of datasets created
    pub datasets: usize,
    /// Total rows appended, summed over trees
    pub rows: u64,
}

impl ConvertStats {
    /// Get a human-readable summary of the conversion.
    pub fn summary(&self) -> String {
        format!(
            "Converted {} tree(s) into {} dataset(s), {} row(s)",
            self.trees, self.datasets, self.rows
        )
    }
}
