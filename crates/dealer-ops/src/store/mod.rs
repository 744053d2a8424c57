//! Generic record persistence used by the back-office modules.
//!
//! Records are kept as JSON documents grouped by collection, mirroring the hosted data
//! client the dealership front end talks to: exact-match filters, an optional sort field,
//! and `created_date`/`updated_date` stamps applied by the store itself.

mod json;

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use json::JsonStore;

/// Exact-match filter criteria keyed by serialized field name.
pub type Criteria = Map<String, Value>;

/// Identifier assigned by the store on `create`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_unassigned(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A typed record stored in one collection.
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    const COLLECTION: &'static str;
    const ID_PREFIX: &'static str;

    fn id(&self) -> &RecordId;
}

/// Sort order accepted by `list` and `filter`; `-field` sorts descending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub descending: bool,
}

impl SortSpec {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }

    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.strip_prefix('-') {
            Some(field) => Self::descending(field),
            None => Self::ascending(raw.trim_start_matches('+')),
        }
    }

    pub fn newest_first() -> Self {
        Self::descending("created_date")
    }
}

/// Storage abstraction so the workflow can run against the local mock or a hosted backend.
pub trait EntityStore: Send + Sync {
    fn filter<T: Entity>(
        &self,
        criteria: &Criteria,
        sort: Option<&SortSpec>,
    ) -> Result<Vec<T>, StoreError>;

    fn get<T: Entity>(&self, id: &RecordId) -> Result<Option<T>, StoreError>;

    /// Persist a new record. An unassigned id is replaced by a generated one.
    fn create<T: Entity>(&self, record: T) -> Result<T, StoreError>;

    fn update<T: Entity>(&self, id: &RecordId, record: T) -> Result<T, StoreError>;

    fn delete<T: Entity>(&self, id: &RecordId) -> Result<(), StoreError>;

    fn list<T: Entity>(&self, sort: Option<&SortSpec>) -> Result<Vec<T>, StoreError> {
        self.filter(&Criteria::new(), sort)
    }
}

/// Build criteria from `(field, value)` pairs.
pub fn criteria<I, K, V>(pairs: I) -> Criteria
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect()
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("record could not be encoded: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("store file error: {0}")]
    Io(#[from] std::io::Error),
}
