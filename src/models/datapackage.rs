//! Package descriptor model
//!
//! A package descriptor lists the dataset resources to load. Each resource
//! names a CSV file and carries a table schema, either inline or as a path to
//! another descriptor file resolved relative to the descriptor that references
//! it. Descriptors may be written in JSON or YAML.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{Schema, SchemaError};

/// A dataset resource of a package descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    /// Dataset name; doubles as the dataset identifier
    pub name: String,
    /// CSV location, relative to the data root unless absolute
    #[serde(default)]
    pub path: String,
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default)]
    pub media_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    /// Explicit delete statement, replacing the derived one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_query: Option<String>,
    #[serde(default)]
    pub schema: Schema,
}

fn default_profile() -> String {
    "tabular-data-resource".to_string()
}

fn default_format() -> String {
    "csv".to_string()
}

/// A package descriptor with all schema references inlined
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataPackage {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub resources: Vec<Resource>,
    /// Resource entries as read, with referenced schemas inlined
    #[serde(skip)]
    entries: BTreeMap<String, Value>,
}

impl DataPackage {
    /// Load a descriptor file, inlining referenced schema files
    pub fn load(path: &Path) -> Result<Self, SchemaError> {
        let mut root = read_document(path)?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        let resources = root
            .get_mut("resources")
            .and_then(Value::as_array_mut)
            .ok_or_else(|| SchemaError::DescriptorParse {
                path: path.to_path_buf(),
                message: "missing 'resources' list".to_string(),
            })?;

        for resource in resources.iter_mut() {
            let schema_ref = resource
                .get("schema")
                .and_then(Value::as_str)
                .map(str::to_string);
            if let Some(schema_file) = schema_ref {
                let schema_path = base_dir.join(&schema_file);
                debug!(
                    "Inlining schema {} into descriptor {}",
                    schema_path.display(),
                    path.display()
                );
                let schema = read_document(&schema_path)?;
                if let Some(object) = resource.as_object_mut() {
                    object.insert("schema".to_string(), schema);
                }
            }
        }

        Self::from_value(root, path)
    }

    /// Parse a JSON descriptor whose schemas are all inline
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let root: Value = serde_json::from_str(json).map_err(|e| SchemaError::DescriptorParse {
            path: PathBuf::new(),
            message: e.to_string(),
        })?;
        Self::from_value(root, Path::new(""))
    }

    fn from_value(root: Value, path: &Path) -> Result<Self, SchemaError> {
        let entries: BTreeMap<String, Value> = root
            .get("resources")
            .and_then(Value::as_array)
            .map(|resources| {
                resources
                    .iter()
                    .filter_map(|entry| {
                        Some((entry.get("name")?.as_str()?.to_string(), entry.clone()))
                    })
                    .collect()
            })
            .unwrap_or_default();

        let mut package: DataPackage =
            serde_json::from_value(root).map_err(|e| SchemaError::DescriptorParse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        package.entries = entries;
        Ok(package)
    }

    /// Find a resource by dataset name
    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.name == name)
    }

    /// Resource names in declaration order
    pub fn resource_names(&self) -> Vec<String> {
        self.resources.iter().map(|r| r.name.clone()).collect()
    }

    /// Canonical bytes of a resource entry, including its inlined schema
    ///
    /// Object keys are emitted in sorted order, so layout and whitespace of the
    /// descriptor files do not affect the result.
    pub fn resource_entry_bytes(&self, name: &str) -> Option<Vec<u8>> {
        self.entries
            .get(name)
            .and_then(|entry| serde_json::to_vec(entry).ok())
    }
}

/// Read a JSON or YAML document into a JSON value
fn read_document(path: &Path) -> Result<Value, SchemaError> {
    let content = std::fs::read_to_string(path).map_err(|e| SchemaError::DescriptorRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_lowercase().as_str(), "yaml" | "yml"))
        .unwrap_or(false);

    if is_yaml {
        serde_yaml::from_str(&content).map_err(|e| SchemaError::DescriptorParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    } else {
        serde_json::from_str(&content).map_err(|e| SchemaError::DescriptorParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const DESCRIPTOR: &str = r#"{
        "name": "reference",
        "title": "Reference data",
        "resources": [
            {
                "name": "demo",
                "path": "demo.csv",
                "schema": {
                    "tableName": "demo",
                    "primaryKey": "id",
                    "fields": [
                        {"name": "id", "type": "integer"},
                        {"name": "label", "type": "string", "constraints": {"required": true}}
                    ]
                }
            }
        ]
    }"#;

    #[test]
    fn test_parse_inline_descriptor() {
        let package = DataPackage::from_json(DESCRIPTOR).unwrap();
        assert_eq!(package.name, "reference");
        assert_eq!(package.resource_names(), vec!["demo"]);

        let resource = package.resource("demo").unwrap();
        assert_eq!(resource.path, "demo.csv");
        assert_eq!(resource.format, "csv");
        assert_eq!(resource.profile, "tabular-data-resource");
        assert_eq!(resource.schema.table(), Some("demo"));
        assert!(resource.schema.fields[1].is_required());
        assert!(package.resource("missing").is_none());
    }

    #[test]
    fn test_load_resolves_schema_reference() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("schemas")).unwrap();
        std::fs::write(
            dir.path().join("schemas/demo.json"),
            r#"{"tableName": "demo", "fields": [{"name": "id", "type": "integer"}]}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("datapackage.json"),
            r#"{"name": "p", "resources": [
                {"name": "demo", "path": "demo.csv", "schema": "schemas/demo.json"}
            ]}"#,
        )
        .unwrap();

        let package = DataPackage::load(&dir.path().join("datapackage.json")).unwrap();
        let schema = &package.resource("demo").unwrap().schema;
        assert_eq!(schema.table(), Some("demo"));
        assert_eq!(schema.fields.len(), 1);

        let bytes = package.resource_entry_bytes("demo").unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("tableName"));
    }

    #[test]
    fn test_load_yaml_descriptor() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("datapackage.yaml"),
            "name: p\nresources:\n  - name: demo\n    path: demo.csv\n    schema:\n      tableName: demo\n      fields:\n        - name: id\n          type: integer\n",
        )
        .unwrap();

        let package = DataPackage::load(&dir.path().join("datapackage.yaml")).unwrap();
        assert_eq!(package.resource("demo").unwrap().schema.table(), Some("demo"));
    }

    #[test]
    fn test_load_missing_schema_reference_fails() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("datapackage.json"),
            r#"{"resources": [{"name": "demo", "schema": "nowhere.json"}]}"#,
        )
        .unwrap();

        let err = DataPackage::load(&dir.path().join("datapackage.json")).unwrap_err();
        assert!(matches!(err, SchemaError::DescriptorRead { .. }));
    }

    #[test]
    fn test_entry_bytes_ignore_whitespace() {
        let compact = DataPackage::from_json(
            r#"{"resources":[{"name":"demo","path":"a.csv","schema":{"tableName":"t"}}]}"#,
        )
        .unwrap();
        let spaced = DataPackage::from_json(
            "{\n  \"resources\": [ {\"path\": \"a.csv\",\n \"name\": \"demo\", \"schema\": {\"tableName\": \"t\"}} ]\n}",
        )
        .unwrap();
        assert_eq!(
            compact.resource_entry_bytes("demo"),
            spaced.resource_entry_bytes("demo")
        );
    }
}
