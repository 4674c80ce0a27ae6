//! Keeps the in-memory record list, the refresh tasks and the render target in
//! agreement with the store's change stream.

use crate::board::RenderTarget;
use crate::domain::{ProgressSnapshot, Record, RecordId};
use crate::persistence::{ChangeEvent, ChangeKind, RecordDocument, RecordPatch, Store};
use crate::scheduler::RefreshScheduler;
use chrono::{DateTime, Utc};
use std::time::Instant;

/// Result of persisting a reorder as independent updates
#[derive(Debug, Default, PartialEq)]
pub struct ReorderOutcome {
    pub applied: usize,
    pub failed: Vec<(RecordId, String)>,
}

impl ReorderOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct Reconciler<T: RenderTarget> {
    owner_id: String,
    records: Vec<Record>,
    scheduler: RefreshScheduler,
    target: T,
}

impl<T: RenderTarget> Reconciler<T> {
    pub fn new(owner_id: impl Into<String>, target: T, scheduler: RefreshScheduler) -> Self {
        Self {
            owner_id: owner_id.into(),
            records: Vec::new(),
            scheduler,
            target,
        }
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Records in display order
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn record(&self, id: &RecordId) -> Option<&Record> {
        self.records.iter().find(|r| &r.id == id)
    }

    pub fn index_of(&self, id: &RecordId) -> Option<usize> {
        self.records.iter().position(|r| &r.id == id)
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut T {
        &mut self.target
    }

    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.scheduler
    }

    /// Position for a newly created record: one past the current maximum
    pub fn next_position(&self) -> i64 {
        self.records
            .iter()
            .map(|r| r.position)
            .max()
            .map_or(0, |max| max + 1)
    }

    /// Replace the whole list with `documents`, ordered by position.
    /// Returns how many documents were skipped as unreadable.
    pub fn load(&mut self, documents: Vec<RecordDocument>, wall: DateTime<Utc>, mono: Instant) -> usize {
        for record in self.records.drain(..) {
            self.scheduler.stop(&record.id);
            self.target.unmount(&record.id);
        }

        let mut skipped = 0;
        let mut records = Vec::with_capacity(documents.len());
        for doc in documents {
            match self.decode(&doc) {
                Some(record) => records.push(record),
                None => skipped += 1,
            }
        }
        // Vec::sort_by_key is stable, so equal positions keep store order
        records.sort_by_key(|r| r.position);

        for record in records {
            if self.index_of(&record.id).is_some() {
                tracing::warn!(id = %record.id, "duplicate record id in store, keeping the first");
                skipped += 1;
                continue;
            }
            self.show(&record, wall, mono);
            self.records.push(record);
        }
        tracing::debug!(loaded = self.records.len(), skipped, "loaded records");
        skipped
    }

    /// Apply one batch of store changes in order
    pub fn apply(&mut self, batch: Vec<ChangeEvent>, wall: DateTime<Utc>, mono: Instant) {
        for event in batch {
            match event.kind {
                ChangeKind::Added => self.on_added(&event.document, wall, mono),
                ChangeKind::Modified => self.on_modified(&event.document, wall, mono),
                ChangeKind::Removed => self.on_removed(&event.document),
            }
        }
    }

    fn on_added(&mut self, doc: &RecordDocument, wall: DateTime<Utc>, mono: Instant) {
        if let Some(id) = &doc.id {
            if self.index_of(id).is_some() {
                return;
            }
        }
        if let Some(record) = self.decode(doc) {
            self.show(&record, wall, mono);
            self.records.push(record);
        }
    }

    fn on_modified(&mut self, doc: &RecordDocument, wall: DateTime<Utc>, mono: Instant) {
        let Some(index) = doc.id.as_ref().and_then(|id| self.index_of(id)) else {
            return;
        };
        let Some(record) = self.decode(doc) else {
            return;
        };

        let old_id = self.records[index].id.clone();
        self.scheduler.stop(&old_id);
        self.target.unmount(&old_id);

        self.show(&record, wall, mono);
        self.records[index] = record;
    }

    fn on_removed(&mut self, doc: &RecordDocument) {
        let Some(id) = &doc.id else { return };
        self.scheduler.stop(id);
        if let Some(index) = self.index_of(id) {
            self.records.remove(index);
            self.target.unmount(id);
        }
    }

    /// Document to record, logging and skipping it when unreadable
    fn decode(&self, doc: &RecordDocument) -> Option<Record> {
        match doc.to_record() {
            Ok(record) => Some(record),
            Err(e) => {
                let id = doc.id.as_ref().map_or("<none>", |id| id.as_str());
                tracing::warn!(id, error = %e, "skipping unreadable record");
                None
            }
        }
    }

    /// Mount the record and give it a refresh task
    fn show(&mut self, record: &Record, wall: DateTime<Utc>, mono: Instant) {
        if let Err(e) = self.scheduler.start(&record.id, record.refresh_rate, mono) {
            tracing::warn!(error = %e, "replacing stale refresh task");
            self.scheduler.restart(&record.id, record.refresh_rate, mono);
        }
        let drawn = self.scheduler.observe(&record.id, wall);
        self.target.mount(record, ProgressSnapshot::compute(record, drawn));
    }

    /// Redraw every record whose refresh is due. Tasks whose visual is gone
    /// cancel themselves. Returns how many records were redrawn.
    pub fn tick(&mut self, wall: DateTime<Utc>, mono: Instant) -> usize {
        let mut redrawn = 0;
        for id in self.scheduler.due(mono) {
            let Some(record) = self.records.iter().find(|r| r.id == id) else {
                self.scheduler.stop(&id);
                continue;
            };
            if !self.target.contains(&id) {
                tracing::debug!(id = %id, "render target gone, cancelling refresh");
                self.scheduler.stop(&id);
                continue;
            }

            let drawn = self.scheduler.observe(&id, wall);
            let snapshot = ProgressSnapshot::compute(record, drawn);
            if self.target.update(&id, snapshot) {
                redrawn += 1;
            } else {
                self.scheduler.stop(&id);
            }
        }
        redrawn
    }

    /// Adopt `ordering` as the display order and give each record
    /// `position = index`. Ids not in the list are ignored; records missing
    /// from `ordering` follow in their current order. Returns the position
    /// updates to persist.
    pub fn reorder(&mut self, ordering: &[RecordId]) -> Vec<(RecordId, i64)> {
        let mut remaining: Vec<Option<Record>> = self.records.drain(..).map(Some).collect();
        let mut reordered = Vec::with_capacity(remaining.len());

        for id in ordering {
            if let Some(slot) = remaining
                .iter_mut()
                .find(|slot| slot.as_ref().is_some_and(|r| &r.id == id))
            {
                reordered.extend(slot.take());
            }
        }
        reordered.extend(remaining.into_iter().flatten());

        let mut updates = Vec::with_capacity(reordered.len());
        for (index, record) in reordered.iter_mut().enumerate() {
            record.position = index as i64;
            updates.push((record.id.clone(), record.position));
        }
        self.records = reordered;
        updates
    }
}

/// Persist position updates one by one. Failures are collected, not rolled back.
pub fn persist_positions(store: &mut dyn Store, updates: &[(RecordId, i64)]) -> ReorderOutcome {
    let mut outcome = ReorderOutcome::default();
    for (id, position) in updates {
        match store.update(id, &RecordPatch::position(*position)) {
            Ok(()) => outcome.applied += 1,
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "position update failed");
                outcome.failed.push((id.clone(), e.to_string()));
            }
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::domain::{Granularity, RecordKind, TimeInterval};
    use crate::persistence::store::StoreError;
    use crate::persistence::{LocalStore, Subscription};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn wall() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn record(id: &str, position: i64) -> Record {
        Record {
            id: RecordId::new(id),
            owner_id: "owner".to_string(),
            title: id.to_string(),
            granularity: Granularity::Minutes,
            refresh_rate: 100,
            position,
            kind: RecordKind::Single(TimeInterval::new(
                Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            )),
        }
    }

    fn doc(id: &str, position: i64) -> RecordDocument {
        RecordDocument::from_record(&record(id, position))
    }

    fn reconciler() -> Reconciler<Board> {
        Reconciler::new("owner", Board::default(), RefreshScheduler::new())
    }

    fn order(r: &Reconciler<Board>) -> Vec<&str> {
        r.records().iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_load_sorts_by_position() {
        let mut r = reconciler();
        r.load(vec![doc("A", 2), doc("B", 0), doc("C", 1)], wall(), Instant::now());
        assert_eq!(order(&r), vec!["B", "C", "A"]);
        assert_eq!(r.scheduler().len(), 3);
        assert!(r.target().contains(&RecordId::new("A")));
    }

    #[test]
    fn test_load_is_stable_and_skips_malformed() {
        let mut broken = doc("X", 0);
        broken.end_date = Some("31/12/2024".to_string());
        let mut no_position = doc("D", 0);
        no_position.position = None;

        let mut r = reconciler();
        let skipped = r.load(
            vec![doc("A", 1), no_position, broken, doc("B", 1)],
            wall(),
            Instant::now(),
        );
        assert_eq!(skipped, 1);
        assert_eq!(order(&r), vec!["A", "B", "D"]);
    }

    #[test]
    fn test_added_duplicate_is_ignored() {
        let mut r = reconciler();
        let now = Instant::now();
        r.load(vec![doc("A", 0)], wall(), now);
        r.apply(vec![ChangeEvent::added(doc("A", 0)), ChangeEvent::added(doc("B", 1))], wall(), now);
        assert_eq!(order(&r), vec!["A", "B"]);
        assert_eq!(r.scheduler().len(), 2);
    }

    #[test]
    fn test_modified_unknown_id_is_noop() {
        let mut r = reconciler();
        let now = Instant::now();
        r.load(vec![doc("A", 0)], wall(), now);
        r.apply(vec![ChangeEvent::modified(doc("ghost", 0))], wall(), now);
        assert_eq!(order(&r), vec!["A"]);
        assert!(!r.target().contains(&RecordId::new("ghost")));
    }

    #[test]
    fn test_modified_replaces_in_place_without_duplicates() {
        let mut r = reconciler();
        let now = Instant::now();
        r.load(vec![doc("A", 0), doc("B", 1), doc("C", 2)], wall(), now);

        let mut edited = record("B", 1);
        edited.title = "renamed".to_string();
        edited.refresh_rate = 5000;
        r.apply(vec![ChangeEvent::modified(RecordDocument::from_record(&edited))], wall(), now);

        assert_eq!(order(&r), vec!["A", "B", "C"]);
        assert_eq!(r.record(&RecordId::new("B")).map(|r| r.title.as_str()), Some("renamed"));
        assert_eq!(r.scheduler().len(), 3);
        assert_eq!(
            r.target().card(&RecordId::new("B")).map(|c| c.record.title.as_str()),
            Some("renamed")
        );

        // B now runs on the 5000 ms cadence, the others keep 100 ms
        let b = RecordId::new("B");
        let b_draws = r.target().card(&b).map(|c| c.draws);
        assert_eq!(r.tick(wall(), now + Duration::from_millis(150)), 2);
        assert_eq!(r.target().card(&b).map(|c| c.draws), b_draws);
        assert_eq!(r.tick(wall(), now + Duration::from_millis(5000)), 3);
        assert_eq!(r.target().card(&b).map(|c| c.draws), b_draws.map(|d| d + 1));
    }

    #[test]
    fn test_removed_cancels_task_and_unmounts() {
        let mut r = reconciler();
        let now = Instant::now();
        r.load(vec![doc("A", 0), doc("B", 1)], wall(), now);
        r.apply(vec![ChangeEvent::removed(doc("A", 0))], wall(), now);

        assert_eq!(order(&r), vec!["B"]);
        assert!(!r.scheduler().is_scheduled(&RecordId::new("A")));
        assert!(!r.target().contains(&RecordId::new("A")));

        // A second removal of the same id changes nothing
        r.apply(vec![ChangeEvent::removed(doc("A", 0))], wall(), now);
        assert_eq!(order(&r), vec!["B"]);
    }

    #[test]
    fn test_tick_redraws_due_records() {
        let mut r = reconciler();
        let start = Instant::now();
        r.load(vec![doc("A", 0)], wall(), start);

        assert_eq!(r.tick(wall(), start), 0);
        let later = wall() + chrono::Duration::hours(6);
        assert_eq!(r.tick(later, start + Duration::from_millis(150)), 1);

        let card = r.target().card(&RecordId::new("A")).unwrap();
        assert_eq!(card.draws, 2);
        assert_eq!(card.snapshot.percentage, 75.0);
    }

    #[test]
    fn test_tick_cancels_when_target_gone() {
        let mut r = reconciler();
        let start = Instant::now();
        r.load(vec![doc("A", 0)], wall(), start);
        r.target_mut().unmount(&RecordId::new("A"));

        assert_eq!(r.tick(wall(), start + Duration::from_millis(150)), 0);
        assert!(!r.scheduler().is_scheduled(&RecordId::new("A")));
    }

    #[test]
    fn test_reorder_sets_positions() {
        let mut r = reconciler();
        r.load(vec![doc("A", 0), doc("B", 1), doc("C", 2)], wall(), Instant::now());

        let updates = r.reorder(&[RecordId::new("C"), RecordId::new("A"), RecordId::new("nope")]);
        assert_eq!(order(&r), vec!["C", "A", "B"]);
        assert_eq!(
            updates,
            vec![
                (RecordId::new("C"), 0),
                (RecordId::new("A"), 1),
                (RecordId::new("B"), 2)
            ]
        );
    }

    #[test]
    fn test_next_position() {
        let mut r = reconciler();
        assert_eq!(r.next_position(), 0);
        r.load(vec![doc("A", 3), doc("B", 7)], wall(), Instant::now());
        assert_eq!(r.next_position(), 8);
    }

    /// Store whose updates fail for chosen ids
    struct FlakyStore {
        inner: LocalStore,
        failing: Vec<RecordId>,
    }

    impl Store for FlakyStore {
        fn query(&self, owner_id: &str) -> Result<Vec<RecordDocument>, StoreError> {
            self.inner.query(owner_id)
        }

        fn subscribe(&mut self, owner_id: &str) -> Result<Subscription, StoreError> {
            self.inner.subscribe(owner_id)
        }

        fn create(&mut self, document: RecordDocument) -> Result<RecordId, StoreError> {
            self.inner.create(document)
        }

        fn update(&mut self, id: &RecordId, patch: &RecordPatch) -> Result<(), StoreError> {
            if self.failing.contains(id) {
                return Err(StoreError::Write {
                    path: "records.json".into(),
                    reason: "disk full".to_string(),
                });
            }
            self.inner.update(id, patch)
        }

        fn delete(&mut self, id: &RecordId) -> Result<(), StoreError> {
            self.inner.delete(id)
        }
    }

    #[test]
    fn test_partial_reorder_failure_is_reported_not_rolled_back() {
        let mut inner = LocalStore::in_memory();
        let a = inner.create(doc("A", 0)).unwrap();
        let b = inner.create(doc("B", 1)).unwrap();
        let mut store = FlakyStore {
            inner,
            failing: vec![b.clone()],
        };

        let mut r = reconciler();
        r.load(store.query("owner").unwrap(), wall(), Instant::now());

        let updates = r.reorder(&[b.clone(), a.clone()]);
        let outcome = persist_positions(&mut store, &updates);

        assert_eq!(outcome.applied, 1);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].0, b);
        assert!(!outcome.is_complete());
        // The in-memory order stays as requested
        assert_eq!(r.records()[0].id, b);

        let stored = store.query("owner").unwrap();
        let a_doc = stored.iter().find(|d| d.id.as_ref() == Some(&a)).unwrap();
        assert_eq!(a_doc.position, Some(1));
    }
}
