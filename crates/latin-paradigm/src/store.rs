//! JSON persistence for headword → [`Paradigm`] mappings.
//!
//! The canonical file is a flat object keyed by headword. Older files wrap
//! the mapping as `{"data": {...}, "options": {...}}`; [`ParadigmStore::load`]
//! unwraps those and keeps `options` so that [`ParadigmStore::save`] writes
//! them back untouched. Loading never fails: a missing or unreadable file
//! yields an empty store. A headword whose paradigm cannot be read is kept
//! as raw JSON and written back on save.

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, RwLock};

use serde::Deserialize;
use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{info, warn};

use crate::Paradigm;

const DATA_KEY: &str = "data";
const OPTIONS_KEY: &str = "options";

/// Store shared between batch workers and readers; writers are serialised by the lock.
pub type SharedStore = Arc<RwLock<ParadigmStore>>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access store file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed store document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to replace store file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParadigmStore {
    entries: BTreeMap<String, Paradigm>,
    unparsed: Map<String, Value>,
    options: Option<Value>,
}

impl ParadigmStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `path`, falling back to an empty store on any problem.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!("no store at {}, starting empty", path.display());
                return Self::new();
            }
            Err(err) => {
                warn!("could not read store {}: {err}", path.display());
                return Self::new();
            }
        };
        match Self::from_json(&raw) {
            Ok(store) => {
                info!("loaded {} headwords from {}", store.len(), path.display());
                store
            }
            Err(err) => {
                warn!("ignoring corrupt store {}: {err}", path.display());
                Self::new()
            }
        }
    }

    /// Parse either the flat or the legacy wrapped document.
    pub fn from_json(raw: &str) -> Result<Self, StoreError> {
        let value: Value = serde_json::from_str(raw)?;
        let Value::Object(mut object) = value else {
            return Ok(Self::new());
        };

        let mut options = None;
        if object.contains_key(DATA_KEY) || object.contains_key(OPTIONS_KEY) {
            options = object.remove(OPTIONS_KEY);
            object = match object.remove(DATA_KEY) {
                Some(Value::Object(data)) => data,
                _ => Map::new(),
            };
        }

        let mut entries = BTreeMap::new();
        let mut unparsed = Map::new();
        for (headword, value) in object {
            match Paradigm::deserialize(&value) {
                Ok(paradigm) if paradigm.is_empty() => {}
                Ok(paradigm) => {
                    entries.insert(headword, paradigm);
                }
                Err(err) => {
                    warn!("keeping {headword} as stored, paradigm unreadable: {err}");
                    unparsed.insert(headword, value);
                }
            }
        }
        Ok(Self {
            entries,
            unparsed,
            options,
        })
    }

    pub fn to_json(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string(&self.document()?)?)
    }

    fn document(&self) -> Result<Value, StoreError> {
        let mut data = self.unparsed.clone();
        for (headword, paradigm) in &self.entries {
            data.insert(headword.clone(), serde_json::to_value(paradigm)?);
        }
        Ok(match &self.options {
            Some(options) => {
                let mut wrapped = Map::new();
                wrapped.insert(DATA_KEY.to_string(), Value::Object(data));
                wrapped.insert(OPTIONS_KEY.to_string(), options.clone());
                Value::Object(wrapped)
            }
            None => Value::Object(data),
        })
    }

    /// Write the whole mapping to `path` atomically.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = path.as_ref();
        let parent = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let document = self.document()?;
        let mut temp = NamedTempFile::new_in(parent)?;
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            serde_json::to_writer(&mut writer, &document)?;
            writer.flush()?;
        }
        temp.persist(path)?;
        info!("saved {} headwords to {}", self.len(), path.display());
        Ok(())
    }

    /// Store a paradigm under `headword`, replacing any previous one.
    ///
    /// Empty paradigms are never stored; returns whether the entry was kept.
    pub fn insert(&mut self, headword: impl Into<String>, paradigm: Paradigm) -> bool {
        if paradigm.is_empty() {
            return false;
        }
        let headword = headword.into();
        self.unparsed.remove(&headword);
        self.entries.insert(headword, paradigm);
        true
    }

    /// Drop `headword`, including an unreadable entry kept under that name.
    pub fn remove(&mut self, headword: &str) -> Option<Paradigm> {
        self.unparsed.remove(headword);
        self.entries.remove(headword)
    }

    pub fn get(&self, headword: &str) -> Option<&Paradigm> {
        self.entries.get(headword)
    }

    pub fn contains(&self, headword: &str) -> bool {
        self.entries.contains_key(headword)
    }

    /// Stored headwords in sorted order.
    pub fn headwords(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Settings carried over from a legacy wrapped file.
    pub fn options(&self) -> Option<&Value> {
        self.options.as_ref()
    }

    pub fn into_shared(self) -> SharedStore {
        Arc::new(RwLock::new(self))
    }
}
