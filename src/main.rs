//! Command-line interface for the ntuple converter.
//!
//! This binary converts chunked ntuple (.ntup) files to Zarr stores.

use anyhow::Result;
use clap::Parser;
use log::{info, LevelFilter};
use ntup2zarr::convert::{self, ConvertOptions, DEFAULT_CHUNK_ROWS};
use ntup2zarr::models::{Compression, CompressionCodec};
use ntup2zarr::ntuple;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Convert .ntup files to Zarr stores",
    long_about = "Converts chunked ntuple files (.ntup) to Zarr stores.\n\n\
                  Each store holds one resizable, typed dataset per branch, addressed\n\
                  by tree-name/branch-name. Stores are named after the input files,\n\
                  with \".ntup\" replaced by \".zarr\"."
)]
struct Args {
    /// Ntuple file(s) to convert
    #[arg(value_name = "INFILE", required = true)]
    infiles: Vec<PathBuf>,

    /// Directory in which to place the output stores
    #[arg(short, long, value_name = "OUT_DIR")]
    outdir: PathBuf,

    /// Tree to convert; repeat for several trees. Leave unset to convert
    /// the root tree.
    #[arg(short, long = "tree", value_name = "NAME")]
    trees: Vec<String>,

    /// Branch to include in the output; repeat for several branches.
    /// Leave unset to include all branches.
    #[arg(short, long = "branches", value_name = "NAME")]
    branches: Vec<String>,

    /// Logging level. [error, warn, info, debug, trace]
    #[arg(short, long, default_value = "warn")]
    log: String,

    /// Compression. [none, gzip, zstd]
    #[arg(short = 'x', long)]
    compression: Option<String>,

    /// Compression level (gzip: 0-9, zstd: 1-22). Ignored without -x.
    #[arg(long)]
    level: Option<u32>,

    /// Zarr chunk length in rows
    #[arg(long, default_value_t = DEFAULT_CHUNK_ROWS)]
    chunk_rows: u64,
}

fn check_outdir(outdir: &Path) -> Result<()> {
    if !outdir.is_dir() {
        anyhow::bail!("Supplied path `{}` is not a directory.", outdir.display());
    }
    Ok(())
}

fn check_infiles(infiles: &[PathBuf]) -> Result<()> {
    for path in infiles {
        let is_ntup = path.extension().and_then(|ext| ext.to_str())
            == Some(ntuple::FILE_EXTENSION);
        if !(path.is_file() && is_ntup) {
            anyhow::bail!("{} is not an ntuple file.", path.display());
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = LevelFilter::from_str(&args.log)
        .map_err(|_| anyhow::anyhow!("Invalid log level `{}`", args.log))?;
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .init();

    let compression = match &args.compression {
        Some(name) => Compression {
            codec: CompressionCodec::from_str(name).map_err(|e| anyhow::anyhow!(e))?,
            level: args.level,
        },
        None => Compression::none(),
    };

    check_outdir(&args.outdir)?;
    check_infiles(&args.infiles)?;

    let options = ConvertOptions {
        trees: args.trees,
        columns: args.branches,
        compression,
        chunk_rows: args.chunk_rows,
    };

    info!(
        "Converting {} file(s) into {}",
        args.infiles.len(),
        args.outdir.display()
    );

    let start = Instant::now();
    let summary = convert::convert_files(&args.infiles, &args.outdir, &options);
    info!(
        "Processed {} file(s) in {:.2?}: {} converted, {} skipped",
        args.infiles.len(),
        start.elapsed(),
        summary.converted.len(),
        summary.skipped.len()
    );

    if !summary.all_succeeded() {
        anyhow::bail!("{} file(s) could not be converted", summary.skipped.len());
    }

    Ok(())
}
