use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::{Criteria, Entity, EntityStore, RecordId, SortSpec, StoreError};

const ID_FIELD: &str = "id";
const CREATED_FIELD: &str = "created_date";
const UPDATED_FIELD: &str = "updated_date";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreState {
    sequence: u64,
    collections: BTreeMap<String, BTreeMap<String, Value>>,
}

/// Document store backed by memory and, optionally, a JSON file rewritten on every mutation.
#[derive(Debug, Default)]
pub struct JsonStore {
    state: Mutex<StoreState>,
    path: Option<PathBuf>,
}

impl JsonStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open a file-backed store, loading existing contents when the file is present.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let state = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                StoreState::default()
            } else {
                serde_json::from_str(&raw)?
            }
        } else {
            StoreState::default()
        };

        Ok(Self {
            state: Mutex::new(state),
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }

    /// Apply a mutation and keep it only once the file has been written.
    fn mutate<R>(
        &self,
        apply: impl FnOnce(&mut StoreState) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let mut state = self.lock()?;
        if self.path.is_none() {
            return apply(&mut *state);
        }

        let mut staged = state.clone();
        let result = apply(&mut staged)?;
        self.persist(&staged)?;
        *state = staged;
        Ok(result)
    }

    fn persist(&self, state: &StoreState) -> Result<(), StoreError> {
        if let Some(path) = &self.path {
            let encoded = serde_json::to_string_pretty(state)?;
            fs::write(path, encoded)?;
            debug!(path = %path.display(), "store flushed");
        }
        Ok(())
    }
}

fn encode<T: Entity>(record: &T) -> Result<Map<String, Value>, StoreError> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Unavailable(format!(
            "{} records must encode as objects, found {other}",
            T::COLLECTION
        ))),
    }
}

fn decode<T: Entity>(document: &Value) -> Result<T, StoreError> {
    Ok(serde_json::from_value(document.clone())?)
}

fn timestamp() -> Value {
    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true))
}

fn matches(document: &Value, criteria: &Criteria) -> bool {
    criteria.iter().all(|(field, expected)| {
        let actual = document.get(field).unwrap_or(&Value::Null);
        actual == expected
    })
}

fn compare_values(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Number(a), Value::Number(b)) => {
            let a = a.as_f64().unwrap_or_default();
            let b = b.as_f64().unwrap_or_default();
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Value::String(a), Value::String(b)) => {
            match (DateTime::parse_from_rfc3339(a), DateTime::parse_from_rfc3339(b)) {
                (Ok(a), Ok(b)) => a.cmp(&b),
                _ => a.cmp(b),
            }
        }
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        _ => Ordering::Equal,
    }
}

fn sort_documents(documents: &mut [&Value], sort: &SortSpec) {
    documents.sort_by(|left, right| {
        let field = left.get(&sort.field).unwrap_or(&Value::Null);
        let other = right.get(&sort.field).unwrap_or(&Value::Null);
        let ordering = compare_values(field, other).then_with(|| {
            compare_values(
                left.get(ID_FIELD).unwrap_or(&Value::Null),
                right.get(ID_FIELD).unwrap_or(&Value::Null),
            )
        });
        if sort.descending {
            ordering.reverse()
        } else {
            ordering
        }
    });
}

impl EntityStore for JsonStore {
    fn filter<T: Entity>(
        &self,
        criteria: &Criteria,
        sort: Option<&SortSpec>,
    ) -> Result<Vec<T>, StoreError> {
        let state = self.lock()?;
        let Some(collection) = state.collections.get(T::COLLECTION) else {
            return Ok(Vec::new());
        };

        let mut documents: Vec<&Value> = collection
            .values()
            .filter(|document| matches(document, criteria))
            .collect();
        if let Some(sort) = sort {
            sort_documents(&mut documents, sort);
        }

        documents.into_iter().map(decode::<T>).collect()
    }

    fn get<T: Entity>(&self, id: &RecordId) -> Result<Option<T>, StoreError> {
        let state = self.lock()?;
        state
            .collections
            .get(T::COLLECTION)
            .and_then(|collection| collection.get(id.as_str()))
            .map(decode::<T>)
            .transpose()
    }

    fn create<T: Entity>(&self, record: T) -> Result<T, StoreError> {
        let mut document = encode(&record)?;
        self.mutate(|state| {
            let id = if record.id().is_unassigned() {
                state.sequence += 1;
                format!("{}-{:08}", T::ID_PREFIX, state.sequence)
            } else {
                record.id().to_string()
            };

            let collection = state
                .collections
                .entry(T::COLLECTION.to_string())
                .or_default();
            if collection.contains_key(&id) {
                return Err(StoreError::Conflict);
            }

            let now = timestamp();
            document.insert(ID_FIELD.to_string(), Value::String(id.clone()));
            document.insert(CREATED_FIELD.to_string(), now.clone());
            document.insert(UPDATED_FIELD.to_string(), now);

            let document = Value::Object(document);
            let stored = decode::<T>(&document)?;
            collection.insert(id, document);
            Ok(stored)
        })
    }

    fn update<T: Entity>(&self, id: &RecordId, record: T) -> Result<T, StoreError> {
        let mut document = encode(&record)?;
        self.mutate(|state| {
            let collection = state
                .collections
                .get_mut(T::COLLECTION)
                .ok_or(StoreError::NotFound)?;
            let existing = collection.get(id.as_str()).ok_or(StoreError::NotFound)?;

            let created = existing
                .get(CREATED_FIELD)
                .cloned()
                .unwrap_or(Value::Null);
            document.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
            document.insert(CREATED_FIELD.to_string(), created);
            document.insert(UPDATED_FIELD.to_string(), timestamp());

            let document = Value::Object(document);
            let stored = decode::<T>(&document)?;
            collection.insert(id.to_string(), document);
            Ok(stored)
        })
    }

    fn delete<T: Entity>(&self, id: &RecordId) -> Result<(), StoreError> {
        self.mutate(|state| {
            state
                .collections
                .get_mut(T::COLLECTION)
                .and_then(|collection| collection.remove(id.as_str()))
                .map(|_| ())
                .ok_or(StoreError::NotFound)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::criteria;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Lead {
        #[serde(default)]
        id: RecordId,
        name: String,
        stage: String,
        score: u32,
        #[serde(default)]
        created_date: Option<DateTime<Utc>>,
        #[serde(default)]
        updated_date: Option<DateTime<Utc>>,
    }

    impl Entity for Lead {
        const COLLECTION: &'static str = "leads";
        const ID_PREFIX: &'static str = "lead";

        fn id(&self) -> &RecordId {
            &self.id
        }
    }

    fn lead(name: &str, stage: &str, score: u32) -> Lead {
        Lead {
            id: RecordId::default(),
            name: name.to_string(),
            stage: stage.to_string(),
            score,
            created_date: None,
            updated_date: None,
        }
    }

    #[test]
    fn create_assigns_ids_and_stamps() {
        let store = JsonStore::in_memory();
        let created = store.create(lead("Ana", "new", 10)).expect("create");

        assert!(created.id.as_str().starts_with("lead-"));
        assert!(created.created_date.is_some());
        assert_eq!(created.created_date, created.updated_date);
    }

    #[test]
    fn create_rejects_duplicate_explicit_ids() {
        let store = JsonStore::in_memory();
        let mut record = lead("Ana", "new", 10);
        record.id = RecordId::new("lead-fixed");
        store.create(record.clone()).expect("first insert");

        assert!(matches!(store.create(record), Err(StoreError::Conflict)));
    }

    #[test]
    fn filter_uses_exact_match_and_sort() {
        let store = JsonStore::in_memory();
        store.create(lead("Ana", "new", 10)).expect("create");
        store.create(lead("Beto", "won", 40)).expect("create");
        store.create(lead("Carla", "new", 25)).expect("create");

        let found: Vec<Lead> = store
            .filter(
                &criteria([("stage", "new")]),
                Some(&SortSpec::parse("-score")),
            )
            .expect("filter");
        let names: Vec<_> = found.iter().map(|lead| lead.name.as_str()).collect();
        assert_eq!(names, vec!["Carla", "Ana"]);

        let all: Vec<Lead> = store.list(Some(&SortSpec::ascending("name"))).expect("list");
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].name, "Ana");
    }

    #[test]
    fn update_keeps_created_date_and_requires_existing_record() {
        let store = JsonStore::in_memory();
        let created = store.create(lead("Ana", "new", 10)).expect("create");

        let mut changed = created.clone();
        changed.stage = "won".to_string();
        changed.created_date = None;
        let updated = store.update(&created.id, changed).expect("update");
        assert_eq!(updated.created_date, created.created_date);
        assert_eq!(updated.stage, "won");

        let missing = store.update(&RecordId::new("lead-missing"), lead("X", "new", 0));
        assert!(matches!(missing, Err(StoreError::NotFound)));
    }

    #[test]
    fn delete_removes_record() {
        let store = JsonStore::in_memory();
        let created = store.create(lead("Ana", "new", 10)).expect("create");
        store.delete::<Lead>(&created.id).expect("delete");

        assert!(store.get::<Lead>(&created.id).expect("get").is_none());
        assert!(matches!(
            store.delete::<Lead>(&created.id),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn file_backed_store_reloads_contents() {
        let path = std::env::temp_dir().join(format!(
            "dealer-ops-store-{}-{}.json",
            std::process::id(),
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));

        let created = {
            let store = JsonStore::open(&path).expect("open");
            store.create(lead("Ana", "new", 10)).expect("create")
        };

        let reopened = JsonStore::open(&path).expect("reopen");
        let fetched: Lead = reopened
            .get(&created.id)
            .expect("get")
            .expect("record persisted");
        assert_eq!(fetched.name, "Ana");

        let next = reopened.create(lead("Beto", "new", 5)).expect("create");
        assert_ne!(next.id, created.id);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn failed_file_write_leaves_records_unchanged() {
        let path = std::env::temp_dir().join(format!(
            "dealer-ops-store-{}-{}.json",
            std::process::id(),
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        let store = JsonStore::open(&path).expect("open");
        let created = store.create(lead("Ana", "new", 10)).expect("create");

        // A directory at the store path makes every later flush fail.
        fs::remove_file(&path).expect("remove store file");
        fs::create_dir(&path).expect("block store path");

        let mut changed = created.clone();
        changed.stage = "won".to_string();
        assert!(matches!(
            store.update(&created.id, changed),
            Err(StoreError::Io(_))
        ));
        assert!(matches!(
            store.create(lead("Beto", "new", 5)),
            Err(StoreError::Io(_))
        ));
        assert!(matches!(
            store.delete::<Lead>(&created.id),
            Err(StoreError::Io(_))
        ));

        let remaining: Vec<Lead> = store.list(None).expect("list");
        assert_eq!(remaining, vec![created]);

        let _ = fs::remove_dir(&path);
    }

    #[test]
    fn missing_store_directory_rejects_create() {
        let path = std::env::temp_dir()
            .join(format!("dealer-ops-missing-{}", std::process::id()))
            .join("store.json");
        let store = JsonStore::open(&path).expect("open");

        assert!(store.create(lead("Ana", "new", 10)).is_err());
        assert!(store.list::<Lead>(None).expect("list").is_empty());
    }
}
