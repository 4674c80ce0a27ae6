//! JSON-file record store.
//!
//! All owners share one `records.json` array. Every mutation rewrites the file
//! atomically and pushes a change batch to the owner's subscribers. `poll`
//! re-reads the file when another process has replaced it and publishes the
//! difference, so two running instances stay in sync.

use super::files::{atomic_write, read_file};
use super::store::{ChangeBatch, ChangeEvent, Store, StoreError, Subscription};
use super::wire::{RecordDocument, RecordPatch};
use crate::domain::RecordId;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Sender};
use std::time::SystemTime;

struct Listener {
    owner_id: String,
    sender: Sender<ChangeBatch>,
}

pub struct LocalStore {
    /// None keeps everything in memory
    path: Option<PathBuf>,
    documents: Vec<RecordDocument>,
    /// Entries of the file that are not record documents; written back untouched
    foreign: Vec<serde_json::Value>,
    listeners: Vec<Listener>,
    last_seen: Option<SystemTime>,
}

impl LocalStore {
    /// Open (or start) the store at `path`
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let (documents, foreign) = read_documents(&path)?;
        let last_seen = modified_time(&path);
        tracing::debug!(path = %path.display(), count = documents.len(), "opened record store");

        Ok(Self {
            path: Some(path),
            documents,
            foreign,
            listeners: Vec::new(),
            last_seen,
        })
    }

    /// A store that never touches the disk
    pub fn in_memory() -> Self {
        Self {
            path: None,
            documents: Vec::new(),
            foreign: Vec::new(),
            listeners: Vec::new(),
            last_seen: None,
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    fn index_of(&self, id: &RecordId) -> Option<usize> {
        self.documents
            .iter()
            .position(|doc| doc.id.as_ref() == Some(id))
    }

    fn save(&mut self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let mut entries = Vec::with_capacity(self.documents.len() + self.foreign.len());
        for doc in &self.documents {
            entries.push(serde_json::to_value(doc)?);
        }
        entries.extend(self.foreign.iter().cloned());

        let json = serde_json::to_string_pretty(&entries)?;
        atomic_write(path, &json).map_err(|e| StoreError::Write {
            path: path.clone(),
            reason: format!("{e:#}"),
        })?;
        self.last_seen = modified_time(path);
        Ok(())
    }

    /// Send each subscriber the events for its owner; forget closed subscriptions
    fn publish(&mut self, events: ChangeBatch) {
        if events.is_empty() {
            return;
        }
        self.listeners.retain(|listener| {
            let batch: ChangeBatch = events
                .iter()
                .filter(|event| event.document.belongs_to(&listener.owner_id))
                .cloned()
                .collect();
            batch.is_empty() || listener.sender.send(batch).is_ok()
        });
    }
}

impl Store for LocalStore {
    fn query(&self, owner_id: &str) -> Result<Vec<RecordDocument>, StoreError> {
        Ok(self
            .documents
            .iter()
            .filter(|doc| doc.belongs_to(owner_id))
            .cloned()
            .collect())
    }

    fn subscribe(&mut self, owner_id: &str) -> Result<Subscription, StoreError> {
        let (sender, receiver) = channel();
        let initial: ChangeBatch = self
            .query(owner_id)?
            .into_iter()
            .map(ChangeEvent::added)
            .collect();
        if !initial.is_empty() {
            // The receiver is alive in this scope, so the send cannot fail
            let _ = sender.send(initial);
        }
        self.listeners.push(Listener {
            owner_id: owner_id.to_string(),
            sender,
        });
        Ok(Subscription::new(receiver))
    }

    fn create(&mut self, mut document: RecordDocument) -> Result<RecordId, StoreError> {
        let id = RecordId::generate();
        document.id = Some(id.clone());
        self.documents.push(document.clone());

        if let Err(e) = self.save() {
            self.documents.pop();
            return Err(e);
        }

        tracing::info!(id = %id, "created record");
        self.publish(vec![ChangeEvent::added(document)]);
        Ok(id)
    }

    fn update(&mut self, id: &RecordId, patch: &RecordPatch) -> Result<(), StoreError> {
        let index = self
            .index_of(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        if patch.is_empty() {
            return Ok(());
        }

        let previous = self.documents[index].clone();
        patch.apply_to(&mut self.documents[index]);

        if let Err(e) = self.save() {
            self.documents[index] = previous;
            return Err(e);
        }

        tracing::info!(id = %id, "updated record");
        let document = self.documents[index].clone();
        self.publish(vec![ChangeEvent::modified(document)]);
        Ok(())
    }

    fn delete(&mut self, id: &RecordId) -> Result<(), StoreError> {
        let index = self
            .index_of(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        let removed = self.documents.remove(index);

        if let Err(e) = self.save() {
            self.documents.insert(index, removed);
            return Err(e);
        }

        tracing::info!(id = %id, "deleted record");
        self.publish(vec![ChangeEvent::removed(removed)]);
        Ok(())
    }

    fn poll(&mut self) -> Result<(), StoreError> {
        let Some(path) = self.path.clone() else {
            return Ok(());
        };
        let seen = modified_time(&path);
        if seen == self.last_seen {
            return Ok(());
        }

        let (documents, foreign) = read_documents(&path)?;
        let events = diff_documents(&self.documents, &documents);
        if !events.is_empty() {
            tracing::info!(changes = events.len(), "picked up external store changes");
        }

        self.documents = documents;
        self.foreign = foreign;
        self.last_seen = seen;
        self.publish(events);
        Ok(())
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|meta| meta.modified()).ok()
}

/// Load the file, splitting it into readable documents and anything else
fn read_documents(
    path: &Path,
) -> Result<(Vec<RecordDocument>, Vec<serde_json::Value>), StoreError> {
    let content = read_file(path).map_err(|e| StoreError::Read {
        path: path.to_path_buf(),
        reason: format!("{e:#}"),
    })?;
    if content.trim().is_empty() {
        return Ok((Vec::new(), Vec::new()));
    }

    let entries: Vec<serde_json::Value> =
        serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
            path: path.to_path_buf(),
            source,
        })?;

    let mut documents = Vec::new();
    let mut foreign = Vec::new();
    for entry in entries {
        match serde_json::from_value::<RecordDocument>(entry.clone()) {
            Ok(doc) if doc.id.is_some() => documents.push(doc),
            Ok(_) => foreign.push(entry),
            Err(e) => {
                tracing::warn!(error = %e, "keeping unreadable store entry as-is");
                foreign.push(entry);
            }
        }
    }
    Ok((documents, foreign))
}

/// Changes that turn `old` into `new`, keyed by id
fn diff_documents(old: &[RecordDocument], new: &[RecordDocument]) -> ChangeBatch {
    let old_by_id: HashMap<&RecordId, &RecordDocument> = old
        .iter()
        .filter_map(|doc| doc.id.as_ref().map(|id| (id, doc)))
        .collect();
    let new_ids: Vec<&RecordId> = new.iter().filter_map(|doc| doc.id.as_ref()).collect();

    let mut events = Vec::new();
    for doc in new {
        let Some(id) = doc.id.as_ref() else { continue };
        match old_by_id.get(id) {
            None => events.push(ChangeEvent::added(doc.clone())),
            Some(previous) if *previous != doc => events.push(ChangeEvent::modified(doc.clone())),
            Some(_) => {}
        }
    }
    for doc in old {
        if let Some(id) = doc.id.as_ref() {
            if !new_ids.contains(&id) {
                events.push(ChangeEvent::removed(doc.clone()));
            }
        }
    }
    events
}
