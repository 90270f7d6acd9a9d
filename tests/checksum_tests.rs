//! Configuration fingerprint tests

mod common;

use common::{
    DEMO_SCHEMA, names, package_resolver, properties_resolver, resource, write, write_package,
};
use reference_data_loader::config::LoaderConfig;
use reference_data_loader::fingerprint::{checksum, dataset_checksum};
use reference_data_loader::resolver::{ConfigError, ConfigurationResolver};
use tempfile::TempDir;

fn write_legacy(config: &std::path::Path) {
    write(config, "demo_dataset.properties", "__CSV_FILE=demo.csv\n__TABLE=demo\n");
    write(
        config,
        "demo_columns.properties",
        "__COLUMNS=id,label\nid.type=int\nid.constraints=is_index\n",
    );
    write(config, "other_dataset.properties", "__TABLE=other\n");
    write(config, "other_columns.properties", "__COLUMNS=code\n");
}

#[test]
fn test_checksum_is_deterministic() {
    let temp = TempDir::new().unwrap();
    write_package(temp.path(), &[resource("demo", "demo.csv", DEMO_SCHEMA)]);

    let first = checksum(&mut package_resolver(temp.path()), &names(&["demo"])).unwrap();
    let second = checksum(&mut package_resolver(temp.path()), &names(&["demo"])).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_descriptor_change_alters_checksum() {
    let temp = TempDir::new().unwrap();
    write_package(temp.path(), &[resource("demo", "demo.csv", DEMO_SCHEMA)]);
    let before = checksum(&mut package_resolver(temp.path()), &names(&["demo"])).unwrap();

    let changed = DEMO_SCHEMA.replace("\"string\"", "\"text\"");
    write_package(temp.path(), &[resource("demo", "demo.csv", &changed)]);
    let after = checksum(&mut package_resolver(temp.path()), &names(&["demo"])).unwrap();
    assert_ne!(before, after);
}

#[test]
fn test_unrelated_resource_does_not_contribute() {
    let temp = TempDir::new().unwrap();
    let other = r#"{"tableName": "other", "fields": [{"name": "code", "type": "string"}]}"#;
    write_package(
        temp.path(),
        &[
            resource("demo", "demo.csv", DEMO_SCHEMA),
            resource("other", "other.csv", other),
        ],
    );
    let before = dataset_checksum(&mut package_resolver(temp.path()), "demo").unwrap();

    write_package(
        temp.path(),
        &[
            resource("demo", "demo.csv", DEMO_SCHEMA),
            resource("other", "other.csv", &other.replace("string", "date")),
        ],
    );
    let after = dataset_checksum(&mut package_resolver(temp.path()), "demo").unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_legacy_checksum_tracks_property_bytes() {
    let data = TempDir::new().unwrap();
    let config = TempDir::new().unwrap();
    write_legacy(config.path());
    let datasets = names(&["demo"]);

    let before = checksum(
        &mut properties_resolver(data.path(), config.path(), &["demo"]),
        &datasets,
    )
    .unwrap();

    // Whitespace and comments in another dataset's files are irrelevant
    write(
        config.path(),
        "other_dataset.properties",
        "# reformatted\n__TABLE = other\n\n",
    );
    let unrelated = checksum(
        &mut properties_resolver(data.path(), config.path(), &["demo"]),
        &datasets,
    )
    .unwrap();
    assert_eq!(before, unrelated);

    // One byte in the columns file of the dataset is not
    write(
        config.path(),
        "demo_columns.properties",
        "__COLUMNS=id,label\nid.type=int\nid.constraints=is_indey\n",
    );
    let changed = checksum(
        &mut properties_resolver(data.path(), config.path(), &["demo"]),
        &datasets,
    )
    .unwrap();
    assert_ne!(before, changed);
}

#[test]
fn test_checksum_sums_datasets_in_any_order() {
    let data = TempDir::new().unwrap();
    let config = TempDir::new().unwrap();
    write_legacy(config.path());
    let mut resolver = properties_resolver(data.path(), config.path(), &["demo", "other"]);

    let demo = dataset_checksum(&mut resolver, "demo").unwrap();
    let other = dataset_checksum(&mut resolver, "other").unwrap();
    assert_eq!(
        checksum(&mut resolver, &names(&["demo", "other"])).unwrap(),
        demo.wrapping_add(other)
    );
    assert_eq!(
        checksum(&mut resolver, &names(&["other", "demo"])).unwrap(),
        demo.wrapping_add(other)
    );
}

#[test]
fn test_checksum_of_missing_dataset_fails() {
    let data = TempDir::new().unwrap();
    let config = TempDir::new().unwrap();

    let err = checksum(
        &mut properties_resolver(data.path(), config.path(), &["ghost"]),
        &names(&["ghost"]),
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::ResourceNotFound { .. }));
}

#[test]
fn test_checksum_from_configuration() {
    let temp = TempDir::new().unwrap();
    write_package(temp.path(), &[resource("demo", "demo.csv", DEMO_SCHEMA)]);

    let mut config = LoaderConfig::new();
    config.sources.data_root = temp.path().to_string_lossy().into_owned();
    config.sources.datapackage = Some("datapackage.json".to_string());

    let mut resolver = ConfigurationResolver::from_config(&config).unwrap();
    let datasets = resolver.dataset_names();
    assert_eq!(datasets, vec!["demo".to_string()]);

    assert_eq!(
        checksum(&mut resolver, &datasets).unwrap(),
        checksum(&mut package_resolver(temp.path()), &datasets).unwrap()
    );
    assert_eq!(checksum(&mut resolver, &[]).unwrap(), 0);
}
