//! Render target for the terminal UI: one card per record id.

use crate::domain::{ProgressSnapshot, Record, RecordId};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// How long a removed card stays visible (dimmed) before it disappears
pub const EXIT_DELAY: Duration = Duration::from_millis(300);

/// Where computed snapshots are drawn
pub trait RenderTarget {
    /// Create (or replace) the visual for a record
    fn mount(&mut self, record: &Record, snapshot: ProgressSnapshot);

    /// Write a fresh snapshot. False when the record has no live visual.
    fn update(&mut self, id: &RecordId, snapshot: ProgressSnapshot) -> bool;

    fn unmount(&mut self, id: &RecordId);

    fn contains(&self, id: &RecordId) -> bool;
}

#[derive(Debug, Clone)]
pub struct Card {
    pub record: Record,
    pub snapshot: ProgressSnapshot,
    /// Number of snapshots written since mount
    pub draws: u64,
    leaving_since: Option<Instant>,
}

impl Card {
    pub fn is_leaving(&self) -> bool {
        self.leaving_since.is_some()
    }
}

#[derive(Debug)]
pub struct Board {
    cards: HashMap<RecordId, Card>,
    exit_delay: Duration,
}

impl Default for Board {
    fn default() -> Self {
        Self::new(EXIT_DELAY)
    }
}

impl Board {
    pub fn new(exit_delay: Duration) -> Self {
        Self {
            cards: HashMap::new(),
            exit_delay,
        }
    }

    /// Live or leaving card for `id`
    pub fn card(&self, id: &RecordId) -> Option<&Card> {
        self.cards.get(id)
    }

    /// Cards on their way out, oldest removal first
    pub fn leaving(&self) -> Vec<&Card> {
        let mut cards: Vec<&Card> = self.cards.values().filter(|c| c.is_leaving()).collect();
        cards.sort_by_key(|c| c.leaving_since);
        cards
    }

    /// Drop cards whose exit delay has run out. Returns how many went.
    pub fn sweep(&mut self, now: Instant) -> usize {
        let delay = self.exit_delay;
        let before = self.cards.len();
        self.cards.retain(|_, card| match card.leaving_since {
            Some(since) => now.duration_since(since) < delay,
            None => true,
        });
        before - self.cards.len()
    }

    pub fn len(&self) -> usize {
        self.cards.values().filter(|c| !c.is_leaving()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RenderTarget for Board {
    fn mount(&mut self, record: &Record, snapshot: ProgressSnapshot) {
        self.cards.insert(
            record.id.clone(),
            Card {
                record: record.clone(),
                snapshot,
                draws: 1,
                leaving_since: None,
            },
        );
    }

    fn update(&mut self, id: &RecordId, snapshot: ProgressSnapshot) -> bool {
        match self.cards.get_mut(id) {
            Some(card) if !card.is_leaving() => {
                card.snapshot = snapshot;
                card.draws += 1;
                true
            }
            _ => false,
        }
    }

    fn unmount(&mut self, id: &RecordId) {
        if let Some(card) = self.cards.get_mut(id) {
            if card.leaving_since.is_none() {
                card.leaving_since = Some(Instant::now());
            }
        }
    }

    fn contains(&self, id: &RecordId) -> bool {
        self.cards.get(id).is_some_and(|card| !card.is_leaving())
    }
}
