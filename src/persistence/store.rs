use super::wire::{RecordDocument, RecordPatch};
use crate::domain::RecordId;
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, TryRecvError};
use thiserror::Error;

/// Kind of change delivered by a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

/// One document change
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub document: RecordDocument,
}

impl ChangeEvent {
    pub fn added(document: RecordDocument) -> Self {
        Self {
            kind: ChangeKind::Added,
            document,
        }
    }

    pub fn modified(document: RecordDocument) -> Self {
        Self {
            kind: ChangeKind::Modified,
            document,
        }
    }

    pub fn removed(document: RecordDocument) -> Self {
        Self {
            kind: ChangeKind::Removed,
            document,
        }
    }
}

/// Ordered changes delivered together
pub type ChangeBatch = Vec<ChangeEvent>;

/// Failures of store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no record with id {0}")]
    NotFound(RecordId),
    #[error("could not read {path}: {reason}")]
    Read { path: PathBuf, reason: String },
    #[error("could not write {path}: {reason}")]
    Write { path: PathBuf, reason: String },
    #[error("store file {path} is not valid JSON: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not encode records: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Live change feed for one owner. Dropping it unsubscribes.
pub struct Subscription {
    receiver: Receiver<ChangeBatch>,
}

impl Subscription {
    pub fn new(receiver: Receiver<ChangeBatch>) -> Self {
        Self { receiver }
    }

    /// Every batch delivered since the last call, oldest first
    pub fn drain(&self) -> Vec<ChangeBatch> {
        let mut batches = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(batch) => batches.push(batch),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        batches
    }
}

/// Collection of record documents keyed by owner
pub trait Store {
    /// One-shot fetch of an owner's documents
    fn query(&self, owner_id: &str) -> Result<Vec<RecordDocument>, StoreError>;

    /// Register a listener. The first batch replays the current documents as `Added`.
    fn subscribe(&mut self, owner_id: &str) -> Result<Subscription, StoreError>;

    /// Insert a document and return its assigned id
    fn create(&mut self, document: RecordDocument) -> Result<RecordId, StoreError>;

    fn update(&mut self, id: &RecordId, patch: &RecordPatch) -> Result<(), StoreError>;

    fn delete(&mut self, id: &RecordId) -> Result<(), StoreError>;

    /// Pick up changes made outside this process. Stores without outside writers do nothing.
    fn poll(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}
