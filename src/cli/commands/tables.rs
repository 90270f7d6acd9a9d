//! Table generation command

use anyhow::{Result, bail};

use reference_data_loader::database::generate_tables;

use super::{GlobalArgs, load_config, open_backend, open_resolver};

/// Create the tables of the selected datasets from the package descriptor
///
/// Requires `load.auto_generate_tables` (or `AUTO_GENERATE_TABLES`) unless
/// `force` is set.
pub async fn handle_generate_tables(global: &GlobalArgs, force: bool) -> Result<()> {
    let config = load_config(&global.workdir)?;
    if !config.load.auto_generate_tables && !force {
        bail!("Table generation is disabled. Set load.auto_generate_tables or pass --force");
    }

    let (mut resolver, datasets) = open_resolver(&config, &global.datasets)?;
    let backend = open_backend(&config, &global.workdir).await?;

    let tables = generate_tables(backend.as_ref(), &mut resolver, &datasets).await?;
    for table in tables {
        println!("{}", table);
    }
    Ok(())
}
