//! Simple example: convert one ntuple file to a Zarr store.

use ntup2zarr::{Compression, ZarrConverter};

fn main() -> Result<(), ntup2zarr::Error> {
    let stats = ZarrConverter::new("./output")
        .tree("events")
        .compression(Compression::gzip(4))
        .convert("run001.ntup")?;

    println!("{}", stats.summary());

    Ok(())
}
