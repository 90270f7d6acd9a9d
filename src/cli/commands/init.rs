//! Configuration file initialisation

use anyhow::{Context, Result, bail};
use std::path::Path;

use reference_data_loader::config::{CONFIG_FILENAME, LoaderConfig, sample_config};

/// Write a commented sample configuration into `workdir`
pub fn handle_init_config(workdir: &Path, force: bool) -> Result<()> {
    let path = workdir.join(CONFIG_FILENAME);
    if LoaderConfig::exists(workdir) && !force {
        bail!("{} already exists. Use --force to overwrite", path.display());
    }

    std::fs::write(&path, sample_config())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Created {}", path.display());
    Ok(())
}
