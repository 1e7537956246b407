use anyhow::{Context, Result};
use petal::*;

/// Prints every class a registry file knows, one line per class.
fn main() -> Result<()> {
    init_logging("info");

    let path = std::env::args()
        .nth(1)
        .context("usage: dump-registry <registry file>")?;
    for (signature, id) in load_rows(&path)? {
        let (nodes, edges) = match signature.split_once(':') {
            Some((n, "")) => (n, 0),
            Some((n, rest)) => (n, rest.split(',').count()),
            None => (signature.as_str(), 0),
        };
        println!("{}\t{} nodes\t{} edges\t{}", id, nodes, edges, signature);
    }
    Ok(())
}
