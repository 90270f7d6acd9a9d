//! Configuration fingerprinting
//!
//! A fingerprint summarises the configuration of a set of datasets so a
//! deployment can tell whether reference data must be reloaded. It covers
//! the configuration resources of each dataset (descriptor entry, or the
//! dataset and columns property files), not the CSV contents.

use crc32fast::Hasher;
use tracing::debug;

use crate::resolver::{ConfigResult, ConfigurationResolver};

/// CRC-32 of one dataset: its identifier followed by its configuration bytes
pub fn dataset_checksum(resolver: &mut ConfigurationResolver, dataset: &str) -> ConfigResult<i32> {
    let bytes = resolver.resource_bytes(dataset)?;

    let mut hasher = Hasher::new();
    hasher.update(dataset.as_bytes());
    hasher.update(&bytes);
    let crc = hasher.finalize() as i32;

    debug!("Checksum of dataset {}: {}", dataset, crc);
    Ok(crc)
}

/// Sum of the per-dataset checksums, wrapping on overflow
///
/// Order of `datasets` does not matter. The result is stable across runs
/// for unchanged configuration.
pub fn checksum(resolver: &mut ConfigurationResolver, datasets: &[String]) -> ConfigResult<i32> {
    let mut total: i32 = 0;
    for dataset in datasets {
        total = total.wrapping_add(dataset_checksum(resolver, dataset)?);
    }
    Ok(total)
}
