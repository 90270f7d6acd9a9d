//! Load command
//!
//! Loads datasets into the configured database in one transaction.

use anyhow::{Context, Result};
use tracing::info;

use reference_data_loader::database::generate_tables;
use reference_data_loader::loader::{DatasetLoader, LoadReport};

use super::{GlobalArgs, load_config, open_backend, open_resolver};

/// Load command arguments
#[derive(Debug, Clone)]
pub struct LoadArgs {
    /// Override the configured batch size
    pub batch_size: Option<usize>,
    /// Print the report as JSON
    pub json: bool,
}

pub async fn handle_load(global: &GlobalArgs, args: &LoadArgs) -> Result<()> {
    let config = load_config(&global.workdir)?;
    let (mut resolver, datasets) = open_resolver(&config, &global.datasets)?;
    if datasets.is_empty() {
        info!("No datasets configured, nothing to load");
    }

    let backend = open_backend(&config, &global.workdir).await?;

    if config.load.auto_generate_tables && resolver.source_kind() == "datapackage" {
        generate_tables(backend.as_ref(), &mut resolver, &datasets)
            .await
            .context("Table generation failed")?;
    }

    let batch_size = args.batch_size.unwrap_or(config.load.batch_size);
    let report = DatasetLoader::new(backend.as_ref(), resolver)
        .with_batch_size(batch_size)
        .load(&datasets)
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &LoadReport) {
    for dataset in &report.datasets {
        if dataset.skipped {
            println!("{}: skipped", dataset.dataset);
            continue;
        }
        println!(
            "{} -> {}: {} rows ({} batches, {} deleted)",
            dataset.dataset,
            dataset.table,
            dataset.rows_inserted,
            dataset.batches_flushed,
            dataset.rows_deleted
        );
        for warning in &dataset.warnings {
            println!("  warning: {}", warning);
        }
    }
    println!("Total: {} rows", report.total_rows());
}
