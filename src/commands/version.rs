use anyhow::Result;

pub fn execute() -> Result<()> {
    println!("procwatch version {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
