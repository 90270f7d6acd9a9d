//! Configuration resolution from files on disk

mod common;

use common::{DEMO_SCHEMA, package_resolver, properties_resolver, write};
use reference_data_loader::config::LoaderConfig;
use reference_data_loader::models::SqlType;
use reference_data_loader::resolver::{ConfigError, ConfigurationResolver, CsvLocation};
use tempfile::TempDir;

#[test]
fn test_schema_reference_is_resolved_relative_to_descriptor() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "schemas/demo.json", DEMO_SCHEMA);
    write(
        temp.path(),
        "datapackage.json",
        r#"{"name": "ref", "resources": [
            {"name": "demo", "path": "csv/demo.csv", "schema": "schemas/demo.json"}
        ]}"#,
    );

    let config = package_resolver(temp.path()).resolve("demo").unwrap();
    assert_eq!(config.table_name, "demo");
    assert_eq!(config.primary_key.as_deref(), Some("id"));
    assert_eq!(
        config.csv,
        CsvLocation::File(temp.path().join("csv/demo.csv"))
    );
    assert!(config.field("label").unwrap().is_required());
}

#[test]
fn test_yaml_descriptor() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "datapackage.yaml",
        r#"name: yaml
resources:
  - name: countries
    path: countries.csv
    deleteQuery: DELETE FROM "${table}" WHERE managed
    schema:
      tableName: country
      primaryKey: code
      fields:
        - name: code
          type: string
          constraints:
            pattern: "[A-Z]{2}"
        - name: joined
          type: date
"#,
    );

    let mut config = LoaderConfig::new();
    config.sources.data_root = temp.path().to_string_lossy().into_owned();
    config.sources.datapackage = Some("datapackage.yaml".to_string());
    let mut resolver = ConfigurationResolver::from_config(&config).unwrap();
    assert_eq!(resolver.source_kind(), "datapackage");
    assert_eq!(resolver.dataset_names(), vec!["countries".to_string()]);

    let resolved = resolver.resolve("countries").unwrap();
    assert_eq!(
        resolved.delete_query,
        "DELETE FROM \"country\" WHERE managed"
    );
    assert_eq!(
        resolved.field("joined").unwrap().short_sql_type().unwrap(),
        SqlType::Date
    );
    assert_eq!(
        resolved.field("code").unwrap().constraints.pattern.as_deref(),
        Some("[A-Z]{2}")
    );
}

#[test]
fn test_missing_schema_reference() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "datapackage.json",
        r#"{"resources": [{"name": "demo", "path": "demo.csv", "schema": "missing.json"}]}"#,
    );

    let mut config = LoaderConfig::new();
    config.sources.data_root = temp.path().to_string_lossy().into_owned();
    config.sources.datapackage = Some("datapackage.json".to_string());
    let err = ConfigurationResolver::from_config(&config).unwrap_err();
    assert!(matches!(err, ConfigError::Schema { .. }));
}

#[test]
fn test_legacy_shared_columns_file_for_single_dataset() {
    let data = TempDir::new().unwrap();
    let config = TempDir::new().unwrap();
    write(
        config.path(),
        "demo_dataset.properties",
        "__CSV_FILE=/dev/null\n__TABLE=Demo_Table\n",
    );
    write(
        config.path(),
        "columns.properties",
        "__COLUMNS=id, label\nid.type=int\nid.is_index=true\n",
    );

    let mut resolver = properties_resolver(data.path(), config.path(), &["demo"]);
    assert_eq!(resolver.source_kind(), "properties");

    let resolved = resolver.resolve("demo").unwrap();
    assert_eq!(resolved.table_name, "Demo_Table");
    assert_eq!(resolved.csv, CsvLocation::Skip);
    assert_eq!(resolved.primary_key.as_deref(), Some("id"));
    assert_eq!(
        resolved.field("label").unwrap().sql_type.as_deref(),
        Some("VARCHAR")
    );
}

#[test]
fn test_legacy_missing_table_name() {
    let data = TempDir::new().unwrap();
    let config = TempDir::new().unwrap();
    write(config.path(), "demo_dataset.properties", "__CSV_FILE=demo.csv\n");

    let err = properties_resolver(data.path(), config.path(), &["demo"])
        .resolve("demo")
        .unwrap_err();
    assert!(matches!(err, ConfigError::MissingTableName { dataset } if dataset == "demo"));
}

#[test]
fn test_legacy_missing_dataset_file() {
    let data = TempDir::new().unwrap();
    let config = TempDir::new().unwrap();

    let err = properties_resolver(data.path(), config.path(), &["demo"])
        .resolve("demo")
        .unwrap_err();
    assert!(matches!(err, ConfigError::ResourceNotFound { .. }));
}

#[test]
fn test_legacy_properties_are_read_as_latin1() {
    let data = TempDir::new().unwrap();
    let config = TempDir::new().unwrap();
    std::fs::write(
        config.path().join("demo_dataset.properties"),
        b"__CSV_FILE=demo.csv\n__TABLE=r\xe9f\xe9rence\n",
    )
    .unwrap();
    std::fs::write(
        config.path().join("columns.properties"),
        b"__COLUMNS=id,libell\xe9\nid.type=int\nid.is_index=true\n",
    )
    .unwrap();

    let resolved = properties_resolver(data.path(), config.path(), &["demo"])
        .resolve("demo")
        .unwrap();
    assert_eq!(resolved.table_name, "référence");
    assert!(resolved.field("libellé").is_some());
}
