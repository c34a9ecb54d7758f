//! Example showing low-level access to the binary structures of an
//! ntuple file.

use ntup2zarr::NtupReader;

fn main() -> Result<(), anyhow::Error> {
    let reader = NtupReader::from_file("run001.ntup")?;

    println!("Version: {:#06x}", reader.version());
    let extra = reader.extra_header();
    if !extra.is_empty() {
        println!("Extra header: {}", extra);
    }

    let low_level = reader.low_level_reader();
    for tree in low_level.trees()? {
        let name = if tree.name.is_empty() {
            "(root)"
        } else {
            &tree.name
        };
        println!("Tree {}:", name);
        for branch in &tree.branches {
            println!("  - {} ({})", branch.name, branch.dtype);
        }
    }

    let mut baskets = 0usize;
    let mut rows = 0usize;
    for basket in low_level.baskets()? {
        let basket = basket?;
        baskets += 1;
        rows += basket.rows;
    }
    println!("{} basket(s), {} row(s) total", baskets, rows);

    Ok(())
}
