//! Checksum command

use anyhow::Result;

use reference_data_loader::fingerprint::checksum;

use super::{GlobalArgs, load_config, open_resolver};

/// Print the configuration checksum of the selected datasets
pub fn handle_checksum(global: &GlobalArgs) -> Result<()> {
    let config = load_config(&global.workdir)?;
    let (mut resolver, datasets) = open_resolver(&config, &global.datasets)?;

    let value = checksum(&mut resolver, &datasets)?;
    println!("{}", value);
    Ok(())
}
