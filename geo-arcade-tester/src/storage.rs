//! High-score persistence for the tester: a JSON file standing in for the
//! browser's key/value store.
use geo_arcade_game::constants::HIGH_SCORES_STORAGE_KEY;
use geo_arcade_game::{MemoryStorage, ScoreStorage};
use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to access score file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("score file {path} is not a JSON object")]
    NotAnObject { path: PathBuf },
}

/// A JSON object file holding one string entry per storage key.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn read_entries(&self) -> Result<Map<String, Value>, StorageError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(err) => return Err(self.io_error(err)),
        };
        if text.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(entries)) => Ok(entries),
            _ => Err(StorageError::NotAnObject {
                path: self.path.clone(),
            }),
        }
    }

    fn write_entries(&self, entries: Map<String, Value>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| self.io_error(err))?;
        }
        let text = serde_json::to_string_pretty(&Value::Object(entries))
            .map_err(|err| self.io_error(io::Error::other(err)))?;
        fs::write(&self.path, text).map_err(|err| self.io_error(err))
    }
}

impl ScoreStorage for JsonFileStorage {
    type Error = StorageError;

    fn read(&self) -> Result<Option<String>, Self::Error> {
        Ok(self
            .read_entries()?
            .get(HIGH_SCORES_STORAGE_KEY)
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    fn write(&self, payload: &str) -> Result<(), Self::Error> {
        // An unreadable file is replaced rather than blocking the write.
        let mut entries = self.read_entries().unwrap_or_default();
        entries.insert(
            HIGH_SCORES_STORAGE_KEY.to_string(),
            Value::String(payload.to_string()),
        );
        self.write_entries(entries)
    }

    fn clear(&self) -> Result<(), Self::Error> {
        let mut entries = self.read_entries().unwrap_or_default();
        entries.remove(HIGH_SCORES_STORAGE_KEY);
        self.write_entries(entries)
    }
}

/// Storage selected on the command line.
#[derive(Debug, Clone)]
pub enum ScoreStore {
    Memory(MemoryStorage),
    File(JsonFileStorage),
}

impl ScoreStore {
    pub fn from_path(path: Option<PathBuf>) -> Self {
        path.map_or_else(
            || Self::Memory(MemoryStorage::new()),
            |path| Self::File(JsonFileStorage::new(path)),
        )
    }

    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Memory(_) => "in-memory".to_string(),
            Self::File(file) => file.path().display().to_string(),
        }
    }
}

impl ScoreStorage for ScoreStore {
    type Error = StorageError;

    fn read(&self) -> Result<Option<String>, Self::Error> {
        match self {
            Self::Memory(memory) => Ok(memory.payload()),
            Self::File(file) => file.read(),
        }
    }

    fn write(&self, payload: &str) -> Result<(), Self::Error> {
        match self {
            Self::Memory(memory) => {
                let Ok(()) = memory.write(payload);
                Ok(())
            }
            Self::File(file) => file.write(payload),
        }
    }

    fn clear(&self) -> Result<(), Self::Error> {
        match self {
            Self::Memory(memory) => {
                let Ok(()) = memory.clear();
                Ok(())
            }
            Self::File(file) => file.clear(),
        }
    }
}
