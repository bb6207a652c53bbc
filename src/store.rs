//! Document storage
//!
//! The storage seam of the pipeline. Sensor documents are append-only: they
//! are inserted once, queried, and deleted only for retention.

use crate::error::ComputeError;
use crate::types::SensorDocument;
use chrono::{DateTime, Utc};
use log::warn;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Filter applied by [`DocumentStore::query`]. Empty matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentQuery {
    pub source: Option<String>,
    pub device_id: Option<String>,
    /// Inclusive lower bound on the document timestamp
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl DocumentQuery {
    pub fn matches(&self, document: &SensorDocument) -> bool {
        if let Some(source) = &self.source {
            if &document.source != source {
                return false;
            }
        }
        if let Some(device_id) = &self.device_id {
            if &document.device_id != device_id {
                return false;
            }
        }
        if let Some(since) = self.since {
            match DateTime::parse_from_rfc3339(&document.timestamp) {
                Ok(stamped) => stamped.with_timezone(&Utc) >= since,
                Err(_) => false,
            }
        } else {
            true
        }
    }
}

/// Persistence for sensor documents
pub trait DocumentStore {
    /// Append a document
    fn insert(&mut self, document: &SensorDocument) -> Result<(), ComputeError>;

    /// Documents matching the filter, in insertion order
    fn query(&self, query: &DocumentQuery) -> Result<Vec<SensorDocument>, ComputeError>;

    /// Remove the document with the given id. Returns whether one was removed.
    fn delete(&mut self, id: &str) -> Result<bool, ComputeError>;
}

/// In-memory store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    documents: Vec<SensorDocument>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl DocumentStore for MemoryStore {
    fn insert(&mut self, document: &SensorDocument) -> Result<(), ComputeError> {
        self.documents.push(document.clone());
        Ok(())
    }

    fn query(&self, query: &DocumentQuery) -> Result<Vec<SensorDocument>, ComputeError> {
        Ok(self
            .documents
            .iter()
            .filter(|document| query.matches(document))
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    fn delete(&mut self, id: &str) -> Result<bool, ComputeError> {
        let before = self.documents.len();
        self.documents.retain(|document| document.id != id);
        Ok(self.documents.len() != before)
    }
}

/// Newline-delimited JSON file store, one document per line
#[derive(Debug, Clone)]
pub struct NdjsonStore {
    path: PathBuf,
}

impl NdjsonStore {
    /// Open a store at `path`. The file is created on first insert.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every well-formed document. Malformed lines are logged and skipped.
    fn read_all(&self) -> Result<Vec<SensorDocument>, ComputeError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(ComputeError::StoreError(format!(
                    "failed to open {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        read_documents(BufReader::new(file), &self.path.display().to_string())
    }
}

/// Parse newline-delimited sensor documents. Blank lines are ignored;
/// malformed lines are logged against `origin` and skipped.
pub fn read_documents(
    reader: impl BufRead,
    origin: &str,
) -> Result<Vec<SensorDocument>, ComputeError> {
    let mut documents = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<SensorDocument>(&line) {
            Ok(document) => documents.push(document),
            Err(e) => warn!(
                "{}:{}: skipping malformed document: {}",
                origin,
                index + 1,
                e
            ),
        }
    }
    Ok(documents)
}

impl DocumentStore for NdjsonStore {
    fn insert(&mut self, document: &SensorDocument) -> Result<(), ComputeError> {
        let line = serde_json::to_string(document)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                ComputeError::StoreError(format!("failed to open {}: {}", self.path.display(), e))
            })?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    fn query(&self, query: &DocumentQuery) -> Result<Vec<SensorDocument>, ComputeError> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|document| query.matches(document))
            .take(query.limit.unwrap_or(usize::MAX))
            .collect())
    }

    fn delete(&mut self, id: &str) -> Result<bool, ComputeError> {
        let documents = self.read_all()?;
        let kept: Vec<&SensorDocument> = documents.iter().filter(|d| d.id != id).collect();
        if kept.len() == documents.len() {
            return Ok(false);
        }

        let mut contents = String::new();
        for document in kept {
            contents.push_str(&serde_json::to_string(document)?);
            contents.push('\n');
        }
        fs::write(&self.path, contents)?;
        Ok(true)
    }
}
