use anyhow::{Context, Result};
use petal::*;

fn main() -> Result<()> {
    init_logging("info");

    let mut args = std::env::args().skip(1);
    let path = args
        .next()
        .context("usage: petal <lattice file> [colon-separated options]")?;
    let options = args.next().unwrap_or_default();

    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read lattice file {}", path))?;
    let lattice = Lattice::parse(&text)?;

    let config = Config::parse(&options);
    let mut registry = open_registry(config.database.as_deref())?;
    if let Some(report) = analyze(&lattice, &config, registry.as_mut())? {
        println!("{}", report);
    }
    Ok(())
}
