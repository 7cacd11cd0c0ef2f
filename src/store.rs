//! Flat-file association store for dppctl
//!
//! Persists bootstrap (id → URI) and configurator (id → curve) associations
//! across daemon restarts in a single JSON document at a fixed path. The
//! command layer writes a record right after the daemon hands out an id and
//! reads it back only when the daemon no longer knows that id.
//!
//! Repeated writes of the same (kind, id) keep the first value: the fallback
//! path must see the URI that was current when the id was handed out. No
//! cross-process locking; concurrent writers can drop each other's records.

use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

use crate::log::log_warn;
use crate::paths;

/// The two record families sharing the state file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// Peer public-key material: id → provisioning URI
    Bootstrap,
    /// Local signing identity: id → named elliptic curve
    Configurator,
}

impl RecordKind {
    fn key_prefix(self) -> &'static str {
        match self {
            RecordKind::Bootstrap => "bootstrap_",
            RecordKind::Configurator => "configurator_",
        }
    }

    fn value_field(self) -> &'static str {
        match self {
            RecordKind::Bootstrap => "uri",
            RecordKind::Configurator => "curve",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Bootstrap => write!(f, "bootstrap"),
            RecordKind::Configurator => write!(f, "configurator"),
        }
    }
}

/// Error types for store access
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("state file i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("state file is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("state file top level is not a JSON object")]
    UnexpectedShape,

    #[error("state file record {key} has no {field} string field")]
    MissingField { key: String, field: &'static str },

    #[error("{kind} record {id} not found")]
    NotFound { kind: RecordKind, id: u32 },
}

/// Record counts per kind, for the status command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreSummary {
    pub bootstrap: usize,
    pub configurator: usize,
}

/// In-memory form of the state file: one table per kind, plus any foreign
/// top-level keys carried through rewrites untouched.
#[derive(Debug, Default)]
struct StateTable {
    bootstrap: BTreeMap<u32, String>,
    configurator: BTreeMap<u32, String>,
    foreign: Map<String, Value>,
}

impl StateTable {
    fn table(&mut self, kind: RecordKind) -> &mut BTreeMap<u32, String> {
        match kind {
            RecordKind::Bootstrap => &mut self.bootstrap,
            RecordKind::Configurator => &mut self.configurator,
        }
    }

    fn get(&self, kind: RecordKind, id: u32) -> Option<&String> {
        match kind {
            RecordKind::Bootstrap => self.bootstrap.get(&id),
            RecordKind::Configurator => self.configurator.get(&id),
        }
    }

    fn to_value(&self) -> Value {
        let mut obj = Map::new();
        for (id, uri) in &self.bootstrap {
            obj.insert(format!("bootstrap_{}", id), json!({ "id": id, "uri": uri }));
        }
        for (id, curve) in &self.configurator {
            obj.insert(
                format!("configurator_{}", id),
                json!({ "id": id, "curve": curve }),
            );
        }
        for (key, value) in &self.foreign {
            obj.insert(key.clone(), value.clone());
        }
        Value::Object(obj)
    }
}

/// Handle on the association state file.
pub struct AssociationStore {
    path: PathBuf,
}

impl AssociationStore {
    /// Open the store at the configured state file path.
    pub fn open() -> Self {
        Self {
            path: paths::state_file_path(),
        }
    }

    /// Open the store at a specific path (for testing).
    pub fn open_at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Insert a record, keeping the first value if the id already exists,
    /// and rewrite the whole file. Records of the other kind and foreign
    /// keys are carried through unchanged.
    pub fn upsert(&self, kind: RecordKind, id: u32, value: &str) -> Result<(), StoreError> {
        let mut table = self.load()?;

        match table.get(kind, id) {
            Some(existing) if existing != value => {
                // First write wins; the restart-fallback path must keep
                // returning the value the id was handed out with.
                log_warn(
                    "store",
                    "duplicate_upsert",
                    &format!("{} {} already stored, keeping existing value", kind, id),
                );
            }
            Some(_) => {}
            None => {
                table.table(kind).insert(id, value.to_string());
            }
        }

        self.persist(&table)
    }

    /// Look up the stored value for (kind, id).
    pub fn lookup(&self, kind: RecordKind, id: u32) -> Result<String, StoreError> {
        let table = self.load()?;
        table
            .get(kind, id)
            .cloned()
            .ok_or(StoreError::NotFound { kind, id })
    }

    /// Count records per kind.
    pub fn summary(&self) -> Result<StoreSummary, StoreError> {
        let table = self.load()?;
        Ok(StoreSummary {
            bootstrap: table.bootstrap.len(),
            configurator: table.configurator.len(),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn load(&self) -> Result<StateTable, StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            // Absent file is an empty store
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(StateTable::default());
            }
            Err(e) => return Err(e.into()),
        };

        let doc: Value = serde_json::from_str(&text)?;
        let Value::Object(obj) = doc else {
            return Err(StoreError::UnexpectedShape);
        };

        let mut table = StateTable::default();
        for (key, value) in obj {
            if let Some(id) = record_id(&key, RecordKind::Bootstrap) {
                table
                    .bootstrap
                    .insert(id, record_value(&key, &value, RecordKind::Bootstrap)?);
            } else if let Some(id) = record_id(&key, RecordKind::Configurator) {
                table
                    .configurator
                    .insert(id, record_value(&key, &value, RecordKind::Configurator)?);
            } else {
                table.foreign.insert(key, value);
            }
        }

        if !table.foreign.is_empty() {
            log_warn(
                "store",
                "foreign_keys",
                &format!(
                    "state file carries {} unrecognized top-level key(s), preserving",
                    table.foreign.len()
                ),
            );
        }

        Ok(table)
    }

    /// Rewrite the file atomically: sibling temp file, fsync, rename.
    fn persist(&self, table: &StateTable) -> Result<(), StoreError> {
        let doc = serde_json::to_string_pretty(&table.to_value())?;

        let mut tmp_name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "state".into());
        tmp_name.push(".tmp");
        let tmp = self.path.with_file_name(tmp_name);

        {
            let mut file = File::create(&tmp)?;
            file.write_all(doc.as_bytes())?;
            file.write_all(b"\n")?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn record_id(key: &str, kind: RecordKind) -> Option<u32> {
    key.strip_prefix(kind.key_prefix())?.parse().ok()
}

fn record_value(key: &str, value: &Value, kind: RecordKind) -> Result<String, StoreError> {
    value
        .get(kind.value_field())
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| StoreError::MissingField {
            key: key.to_string(),
            field: kind.value_field(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> AssociationStore {
        AssociationStore::open_at(dir.path().join("state.json"))
    }

    #[test]
    fn upsert_then_lookup_returns_written_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store
            .upsert(RecordKind::Bootstrap, 7, "DPP:K:ABC...")
            .unwrap();
        assert_eq!(store.lookup(RecordKind::Bootstrap, 7).unwrap(), "DPP:K:ABC...");
    }

    #[test]
    fn cross_kind_records_survive_rewrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.upsert(RecordKind::Bootstrap, 1, "X").unwrap();
        store.upsert(RecordKind::Configurator, 2, "Y").unwrap();

        assert_eq!(store.lookup(RecordKind::Bootstrap, 1).unwrap(), "X");
        assert_eq!(store.lookup(RecordKind::Configurator, 2).unwrap(), "Y");
    }

    #[test]
    fn repeated_write_keeps_first_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.upsert(RecordKind::Bootstrap, 7, "A").unwrap();
        store.upsert(RecordKind::Bootstrap, 7, "B").unwrap();

        // First write wins; the daemon handed out id 7 with value "A"
        assert_eq!(store.lookup(RecordKind::Bootstrap, 7).unwrap(), "A");
    }

    #[test]
    fn lookup_missing_id_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        // File absent entirely
        let err = store.lookup(RecordKind::Bootstrap, 1).unwrap_err();
        assert!(matches!(
            err,
            StoreError::NotFound {
                kind: RecordKind::Bootstrap,
                id: 1
            }
        ));

        // File present, other kind only
        store.upsert(RecordKind::Configurator, 1, "prime256v1").unwrap();
        let err = store.lookup(RecordKind::Bootstrap, 1).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn legacy_hand_emitted_state_file_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        // Byte format written by older dppctl builds
        std::fs::write(
            &path,
            "{\n  \"configurator_1\": {\n    \"id\": 1,\n    \"curve\": \"prime256v1\"\n  },\n  \"bootstrap_2\": {\n    \"id\": 2,\n    \"uri\": \"DPP:K:MDkw;;\"\n  }\n}\n",
        )
        .unwrap();

        let store = AssociationStore::open_at(&path);
        assert_eq!(store.lookup(RecordKind::Configurator, 1).unwrap(), "prime256v1");
        assert_eq!(store.lookup(RecordKind::Bootstrap, 2).unwrap(), "DPP:K:MDkw;;");
    }

    #[test]
    fn foreign_top_level_keys_are_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(
            &path,
            r#"{ "bootstrap_1": { "id": 1, "uri": "DPP:X;;" }, "other_tool": { "note": 1 } }"#,
        )
        .unwrap();

        let store = AssociationStore::open_at(&path);
        store.upsert(RecordKind::Configurator, 1, "prime256v1").unwrap();

        let rewritten = std::fs::read_to_string(&path).unwrap();
        assert!(rewritten.contains("other_tool"));
        assert_eq!(store.lookup(RecordKind::Bootstrap, 1).unwrap(), "DPP:X;;");
    }

    #[test]
    fn invalid_json_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = AssociationStore::open_at(&path);
        let err = store.lookup(RecordKind::Bootstrap, 1).unwrap_err();
        assert!(matches!(err, StoreError::Malformed(_)));
    }

    #[test]
    fn record_without_value_field_is_missing_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, r#"{ "bootstrap_3": { "id": 3 } }"#).unwrap();

        let store = AssociationStore::open_at(&path);
        let err = store.lookup(RecordKind::Bootstrap, 3).unwrap_err();
        assert!(matches!(err, StoreError::MissingField { field: "uri", .. }));
    }

    #[test]
    fn rewrite_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.upsert(RecordKind::Bootstrap, 1, "DPP:A;;").unwrap();
        store.upsert(RecordKind::Bootstrap, 2, "DPP:B;;").unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .filter(|n| n.to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn summary_counts_per_kind() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        assert_eq!(
            store.summary().unwrap(),
            StoreSummary {
                bootstrap: 0,
                configurator: 0
            }
        );

        store.upsert(RecordKind::Bootstrap, 1, "DPP:A;;").unwrap();
        store.upsert(RecordKind::Bootstrap, 2, "DPP:B;;").unwrap();
        store.upsert(RecordKind::Configurator, 1, "prime256v1").unwrap();

        assert_eq!(
            store.summary().unwrap(),
            StoreSummary {
                bootstrap: 2,
                configurator: 1
            }
        );
    }
}
