//! Entity/attribute view consumed by the engine.
//!
//! The engine never touches a host application's object model; it sees
//! populations through the narrow [`AttributeSource`] interface and receives
//! the selected subset as a plain entity-id slice. [`InMemoryTable`] is the
//! concrete source used by the CLI and tests, loadable from a JSON file of
//! `{"id": ..., "attributes": {...}}` rows.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{CloudError, Result};

/// Opaque entity identifier used by both populations.
pub type EntityId = u64;

/// Text payload of one attribute on one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Single text value.
    Text(String),
    /// Multi-valued attribute; values are joined with a single space before
    /// tokenization.
    List(Vec<String>),
}

impl AttributeValue {
    /// Returns the attribute's text with multi-valued entries space-joined.
    #[must_use]
    pub fn joined(&self) -> String {
        match self {
            Self::Text(value) => value.clone(),
            Self::List(values) => values.join(" "),
        }
    }
}

/// Read-only view of the background population's entities and their text.
pub trait AttributeSource {
    /// All entities in the background population.
    fn entities(&self) -> Vec<EntityId>;

    /// Attribute columns known to the store.
    fn attribute_names(&self) -> Vec<String>;

    /// Text value(s) of one attribute on one entity, if present.
    fn attribute_text(&self, entity: EntityId, attribute: &str) -> Option<AttributeValue>;
}

/// One entity row as loaded from a corpus JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Entity identifier.
    pub id: EntityId,
    /// Attribute name to text payload.
    pub attributes: FxHashMap<String, AttributeValue>,
}

/// In-memory attribute table backing the CLI and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTable {
    rows: FxHashMap<EntityId, FxHashMap<String, AttributeValue>>,
    columns: Vec<String>,
}

impl InMemoryTable {
    /// Builds a table from entity records. Later duplicate ids overwrite
    /// earlier ones.
    #[must_use]
    pub fn from_records(records: Vec<EntityRecord>) -> Self {
        let mut rows: FxHashMap<EntityId, FxHashMap<String, AttributeValue>> =
            FxHashMap::default();
        let mut columns: Vec<String> = Vec::new();
        for record in records {
            for name in record.attributes.keys() {
                if !columns.iter().any(|known| known == name) {
                    columns.push(name.clone());
                }
            }
            rows.insert(record.id, record.attributes);
        }
        columns.sort_unstable();
        Self { rows, columns }
    }

    /// Loads a table from a JSON file containing an array of entity records.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).map_err(|err| CloudError::io(err, Some(path.to_path_buf())))?;
        let records: Vec<EntityRecord> = serde_json::from_reader(BufReader::new(file))?;
        Ok(Self::from_records(records))
    }

    /// Number of entities in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl AttributeSource for InMemoryTable {
    fn entities(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.rows.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn attribute_names(&self) -> Vec<String> {
        self.columns.clone()
    }

    fn attribute_text(&self, entity: EntityId, attribute: &str) -> Option<AttributeValue> {
        self.rows.get(&entity)?.get(attribute).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn record(id: EntityId, attrs: &[(&str, &str)]) -> EntityRecord {
        EntityRecord {
            id,
            attributes: attrs
                .iter()
                .map(|(k, v)| ((*k).to_string(), AttributeValue::Text((*v).to_string())))
                .collect(),
        }
    }

    #[test]
    fn joined_flattens_multi_valued_attributes() {
        let value = AttributeValue::List(vec!["alpha".into(), "beta".into()]);
        assert_eq!(value.joined(), "alpha beta");
        assert_eq!(AttributeValue::Text("gamma".into()).joined(), "gamma");
    }

    #[test]
    fn table_tracks_columns_and_lookups() {
        let table = InMemoryTable::from_records(vec![
            record(1, &[("name", "first entity")]),
            record(2, &[("name", "second"), ("note", "extra")]),
        ]);
        assert_eq!(table.entities(), vec![1, 2]);
        assert_eq!(table.attribute_names(), vec!["name", "note"]);
        assert_eq!(
            table.attribute_text(2, "note"),
            Some(AttributeValue::Text("extra".into()))
        );
        assert_eq!(table.attribute_text(1, "note"), None);
        assert_eq!(table.attribute_text(9, "name"), None);
    }

    #[test]
    fn load_reads_json_records() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("corpus.json");
        fs::write(
            &path,
            r#"[
                {"id": 7, "attributes": {"name": "seventh", "tags": ["a", "b"]}},
                {"id": 8, "attributes": {"name": "eighth"}}
            ]"#,
        )
        .expect("write corpus");

        let table = InMemoryTable::load(&path).expect("load corpus");
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.attribute_text(7, "tags"),
            Some(AttributeValue::List(vec!["a".into(), "b".into()]))
        );
    }

    #[test]
    fn load_surfaces_io_errors_with_path() {
        let err = InMemoryTable::load("/definitely/not/here.json").expect_err("missing file");
        assert!(matches!(err, CloudError::Io { path: Some(_), .. }));
    }
}
