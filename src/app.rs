use crate::board::Board;
use crate::domain::{
    format_input_date, parse_input_date, parse_refresh_rate, DraftKind, Granularity, PeriodDraft,
    Record, RecordDraft, RecordId, UiMode, ValidationError,
};
use crate::persistence::{RecordDocument, RecordPatch, Settings, Store, Subscription};
use crate::reconciler::{persist_positions, Reconciler};
use crate::scheduler::RefreshScheduler;
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use std::time::{Duration as StdDuration, Instant};

/// How long a status line message stays up
const STATUS_TTL: StdDuration = StdDuration::from_secs(5);

/// Periods a new group starts with
const INITIAL_PERIODS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Error,
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub text: String,
    pub kind: StatusKind,
    pub shown_at: Instant,
}

/// A focusable field of the form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Kind,
    Title,
    Granularity,
    RefreshRate,
    Start,
    End,
    PeriodTitle(usize),
    PeriodStart(usize),
    PeriodEnd(usize),
}

impl FormField {
    pub fn label(&self) -> String {
        match self {
            Self::Kind => "Type".to_string(),
            Self::Title => "Title".to_string(),
            Self::Granularity => "Unit".to_string(),
            Self::RefreshRate => "Refresh (ms)".to_string(),
            Self::Start => "Start".to_string(),
            Self::End => "End".to_string(),
            Self::PeriodTitle(i) => format!("Period {} title", i + 1),
            Self::PeriodStart(i) => format!("Period {} start", i + 1),
            Self::PeriodEnd(i) => format!("Period {} end", i + 1),
        }
    }

    /// Index of the period this field belongs to
    pub fn period(&self) -> Option<usize> {
        match self {
            Self::PeriodTitle(i) | Self::PeriodStart(i) | Self::PeriodEnd(i) => Some(*i),
            _ => None,
        }
    }
}

/// Text of one group period in the form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeriodFields {
    pub title: String,
    pub start: String,
    pub end: String,
    pub color: Option<String>,
}

impl PeriodFields {
    /// Blank title, one day long, starting `offset_days` after `now`
    fn starting(now: DateTime<Utc>, offset_days: i64) -> Self {
        let start = now + Duration::days(offset_days);
        Self {
            title: String::new(),
            start: format_input_date(start),
            end: format_input_date(start + Duration::days(1)),
            color: None,
        }
    }
}

/// Add/edit form state
#[derive(Debug, Clone, PartialEq)]
pub struct FormState {
    /// Set when editing an existing record
    pub editing: Option<RecordId>,
    pub is_group: bool,
    pub title: String,
    pub granularity: Granularity,
    pub refresh_rate: String,
    pub start: String,
    pub end: String,
    pub periods: Vec<PeriodFields>,
    pub focus: usize,
}

impl FormState {
    /// Empty form: now until 24 hours from now
    pub fn new(settings: &Settings, now: DateTime<Utc>) -> Self {
        Self {
            editing: None,
            is_group: false,
            title: String::new(),
            granularity: settings.default_granularity,
            refresh_rate: settings.default_refresh_rate.to_string(),
            start: format_input_date(now),
            end: format_input_date(now + Duration::days(1)),
            periods: Vec::new(),
            focus: 1,
        }
    }

    /// Form pre-filled from an existing record
    pub fn for_record(record: &Record, now: DateTime<Utc>) -> Self {
        let range = record.global_range(now);
        let periods = record
            .periods()
            .iter()
            .map(|p| PeriodFields {
                title: p.title.clone(),
                start: format_input_date(p.interval.start),
                end: format_input_date(p.interval.end),
                color: Some(p.color.clone()),
            })
            .collect();

        Self {
            editing: Some(record.id.clone()),
            is_group: record.is_group(),
            title: record.title.clone(),
            granularity: record.granularity,
            refresh_rate: record.refresh_rate.to_string(),
            start: format_input_date(range.start),
            end: format_input_date(range.end),
            periods,
            focus: 1,
        }
    }

    /// Focusable fields in order for the current kind
    pub fn fields(&self) -> Vec<FormField> {
        let mut fields = vec![
            FormField::Kind,
            FormField::Title,
            FormField::Granularity,
            FormField::RefreshRate,
        ];
        if self.is_group {
            for i in 0..self.periods.len() {
                fields.push(FormField::PeriodTitle(i));
                fields.push(FormField::PeriodStart(i));
                fields.push(FormField::PeriodEnd(i));
            }
        } else {
            fields.push(FormField::Start);
            fields.push(FormField::End);
        }
        fields
    }

    pub fn focused(&self) -> FormField {
        let fields = self.fields();
        fields[self.focus.min(fields.len() - 1)]
    }

    pub fn focus_next(&mut self) {
        self.focus = (self.focus + 1) % self.fields().len();
    }

    pub fn focus_prev(&mut self) {
        let count = self.fields().len();
        self.focus = (self.focus + count - 1) % count;
    }

    /// Editable text behind a field, None for choice fields
    pub fn text(&self, field: FormField) -> Option<&str> {
        match field {
            FormField::Kind | FormField::Granularity => None,
            FormField::Title => Some(&self.title),
            FormField::RefreshRate => Some(&self.refresh_rate),
            FormField::Start => Some(&self.start),
            FormField::End => Some(&self.end),
            FormField::PeriodTitle(i) => self.periods.get(i).map(|p| p.title.as_str()),
            FormField::PeriodStart(i) => self.periods.get(i).map(|p| p.start.as_str()),
            FormField::PeriodEnd(i) => self.periods.get(i).map(|p| p.end.as_str()),
        }
    }

    fn text_mut(&mut self, field: FormField) -> Option<&mut String> {
        match field {
            FormField::Kind | FormField::Granularity => None,
            FormField::Title => Some(&mut self.title),
            FormField::RefreshRate => Some(&mut self.refresh_rate),
            FormField::Start => Some(&mut self.start),
            FormField::End => Some(&mut self.end),
            FormField::PeriodTitle(i) => self.periods.get_mut(i).map(|p| &mut p.title),
            FormField::PeriodStart(i) => self.periods.get_mut(i).map(|p| &mut p.start),
            FormField::PeriodEnd(i) => self.periods.get_mut(i).map(|p| &mut p.end),
        }
    }

    pub fn add_char(&mut self, c: char) {
        let field = self.focused();
        if let Some(text) = self.text_mut(field) {
            text.push(c);
        }
    }

    pub fn backspace(&mut self) {
        let field = self.focused();
        if let Some(text) = self.text_mut(field) {
            text.pop();
        }
    }

    /// Left/right on a choice field
    pub fn cycle(&mut self, forward: bool, now: DateTime<Utc>) {
        match self.focused() {
            FormField::Kind => self.toggle_kind(now),
            FormField::Granularity => {
                self.granularity = if forward {
                    self.granularity.next()
                } else {
                    self.granularity.prev()
                };
            }
            _ => {}
        }
    }

    /// Switch between single timer and group. An empty group gets two periods.
    pub fn toggle_kind(&mut self, now: DateTime<Utc>) {
        self.is_group = !self.is_group;
        if self.is_group && self.periods.is_empty() {
            for offset in 0..INITIAL_PERIODS {
                self.periods.push(PeriodFields::starting(now, offset as i64));
            }
        }
        self.focus = self.focus.min(self.fields().len() - 1);
    }

    /// Append a period starting where the last one ends
    pub fn add_period(&mut self, now: DateTime<Utc>) {
        if !self.is_group {
            return;
        }
        let period = match self.periods.last() {
            Some(last) => {
                let start = parse_input_date(&last.end).ok().flatten().unwrap_or(now);
                PeriodFields {
                    title: String::new(),
                    start: format_input_date(start),
                    end: format_input_date(start + Duration::days(1)),
                    color: None,
                }
            }
            None => PeriodFields::starting(now, 0),
        };
        self.periods.push(period);
        let fields = self.fields();
        self.focus = fields
            .iter()
            .position(|f| *f == FormField::PeriodTitle(self.periods.len() - 1))
            .unwrap_or(self.focus);
    }

    /// Remove the focused period, or the last one when focus is elsewhere
    pub fn remove_period(&mut self) {
        if !self.is_group || self.periods.is_empty() {
            return;
        }
        let index = self
            .focused()
            .period()
            .unwrap_or(self.periods.len() - 1);
        self.periods.remove(index);
        self.focus = self.focus.min(self.fields().len() - 1);
    }

    /// Parse the typed text into a draft
    pub fn to_draft(&self) -> Result<RecordDraft, ValidationError> {
        let refresh_rate = parse_refresh_rate(&self.refresh_rate)?;
        let kind = if self.is_group {
            let mut periods = Vec::with_capacity(self.periods.len());
            for fields in &self.periods {
                periods.push(PeriodDraft {
                    title: fields.title.trim().to_string(),
                    start: parse_input_date(&fields.start)?,
                    end: parse_input_date(&fields.end)?,
                    color: fields.color.clone(),
                });
            }
            DraftKind::Group(periods)
        } else {
            DraftKind::Single {
                start: parse_input_date(&self.start)?,
                end: parse_input_date(&self.end)?,
            }
        };

        Ok(RecordDraft {
            title: self.title.trim().to_string(),
            granularity: self.granularity,
            refresh_rate,
            kind,
        })
    }
}

/// Main application state
pub struct AppState {
    pub reconciler: Reconciler<Board>,
    store: Box<dyn Store>,
    subscription: Subscription,
    pub settings: Settings,
    pub selected_index: usize,
    pub ui_mode: UiMode,
    pub form: Option<FormState>,
    pub pending_delete: Option<RecordId>,
    pub status: Option<StatusMessage>,
    pub should_quit: bool,
}

impl AppState {
    /// Load the owner's records and start listening for changes
    pub fn new(mut store: Box<dyn Store>, settings: Settings) -> Result<Self> {
        let owner_id = settings.owner_id.clone();
        let documents = store
            .query(&owner_id)
            .context("Failed to load records")?;
        let subscription = store
            .subscribe(&owner_id)
            .context("Failed to subscribe to record changes")?;

        let mut reconciler = Reconciler::new(owner_id, Board::default(), RefreshScheduler::new());
        let skipped = reconciler.load(documents, Utc::now(), Instant::now());

        let mut app = Self {
            reconciler,
            store,
            subscription,
            settings,
            selected_index: 0,
            ui_mode: UiMode::Normal,
            form: None,
            pending_delete: None,
            status: None,
            should_quit: false,
        };
        if skipped > 0 {
            app.set_error(format!("{} unreadable record(s) skipped, see the log", skipped));
        }
        Ok(app)
    }

    pub fn records(&self) -> &[Record] {
        self.reconciler.records()
    }

    pub fn selected_record(&self) -> Option<&Record> {
        self.records().get(self.selected_index)
    }

    /// Run one loop iteration of background work: external changes,
    /// subscription batches, due redraws, card exits.
    pub fn pump(&mut self, wall: DateTime<Utc>, mono: Instant) {
        if let Err(e) = self.store.poll() {
            tracing::warn!(error = %e, "could not check the store for outside changes");
        }

        for batch in self.subscription.drain() {
            self.reconciler.apply(batch, wall, mono);
        }
        self.reconciler.tick(wall, mono);
        self.reconciler.target_mut().sweep(mono);
        self.clamp_selection();

        if self
            .status
            .as_ref()
            .is_some_and(|s| mono.duration_since(s.shown_at) >= STATUS_TTL)
        {
            self.status = None;
        }
    }

    /// Earliest refresh deadline, for the input poll timeout
    pub fn next_deadline(&self) -> Option<Instant> {
        self.reconciler.scheduler().next_deadline()
    }

    fn clamp_selection(&mut self) {
        let len = self.records().len();
        if self.selected_index >= len {
            self.selected_index = len.saturating_sub(1);
        }
    }

    pub fn set_info(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind: StatusKind::Info,
            shown_at: Instant::now(),
        });
    }

    pub fn set_error(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind: StatusKind::Error,
            shown_at: Instant::now(),
        });
    }

    /// Move selection up
    pub fn move_selection_up(&mut self) {
        if self.selected_index > 0 {
            self.selected_index -= 1;
        }
    }

    /// Move selection down
    pub fn move_selection_down(&mut self) {
        if self.selected_index + 1 < self.records().len() {
            self.selected_index += 1;
        }
    }

    /// Move selected record up in the display order
    pub fn move_selected_up(&mut self) {
        if self.selected_index > 0 && self.selected_index < self.records().len() {
            self.swap_with(self.selected_index - 1);
        }
    }

    /// Move selected record down in the display order
    pub fn move_selected_down(&mut self) {
        if self.selected_index + 1 < self.records().len() {
            self.swap_with(self.selected_index + 1);
        }
    }

    fn swap_with(&mut self, other: usize) {
        let mut ordering: Vec<RecordId> = self.records().iter().map(|r| r.id.clone()).collect();
        ordering.swap(self.selected_index, other);

        let updates = self.reconciler.reorder(&ordering);
        self.selected_index = other;

        let outcome = persist_positions(self.store.as_mut(), &updates);
        if !outcome.is_complete() {
            self.set_error(format!(
                "Could not save the new order for {} record(s)",
                outcome.failed.len()
            ));
        }
    }

    /// Open the form for a new record
    pub fn start_add(&mut self) {
        self.form = Some(FormState::new(&self.settings, Utc::now()));
        self.ui_mode = UiMode::Form;
    }

    /// Open the form for the selected record
    pub fn start_edit(&mut self) {
        if let Some(record) = self.selected_record() {
            self.form = Some(FormState::for_record(record, Utc::now()));
            self.ui_mode = UiMode::Form;
        }
    }

    pub fn cancel_form(&mut self) {
        self.form = None;
        self.ui_mode = UiMode::Normal;
    }

    /// Validate and send the form to the store. The list itself changes when
    /// the store reports the change. Returns whether the form closed.
    pub fn submit_form(&mut self) -> bool {
        let Some(form) = &self.form else {
            return false;
        };

        let draft = match form.to_draft().and_then(RecordDraft::validate) {
            Ok(draft) => draft,
            Err(e) => {
                self.set_error(e.to_string());
                return false;
            }
        };

        let result = match &form.editing {
            Some(id) => self
                .store
                .update(id, &RecordPatch::from_draft(&draft))
                .map(|()| format!("Updated \"{}\"", draft.title)),
            None => {
                let document = RecordDocument::new_from_draft(
                    &draft,
                    self.reconciler.owner_id(),
                    self.reconciler.next_position(),
                );
                self.store
                    .create(document)
                    .map(|_| format!("Added \"{}\"", draft.title))
            }
        };

        match result {
            Ok(message) => {
                self.set_info(message);
                self.cancel_form();
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "saving record failed");
                self.set_error(format!("Could not save: {}", e));
                false
            }
        }
    }

    /// Ask for confirmation before deleting the selected record
    pub fn request_delete(&mut self) {
        if let Some(record) = self.selected_record() {
            self.pending_delete = Some(record.id.clone());
            self.ui_mode = UiMode::ConfirmDelete;
        }
    }

    pub fn confirm_delete(&mut self) {
        if let Some(id) = self.pending_delete.take() {
            match self.store.delete(&id) {
                Ok(()) => self.set_info("Deleted"),
                Err(e) => {
                    tracing::error!(id = %id, error = %e, "delete failed");
                    self.set_error(format!("Could not delete: {}", e));
                }
            }
        }
        self.ui_mode = UiMode::Normal;
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
        self.ui_mode = UiMode::Normal;
    }

    /// Title of the record waiting for delete confirmation
    pub fn pending_delete_title(&self) -> Option<&str> {
        let id = self.pending_delete.as_ref()?;
        self.reconciler.record(id).map(|r| r.title.as_str())
    }
}
