use super::enums::Granularity;
use super::interval::TimeInterval;
use super::record::{palette_color, Period, RecordKind};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use thiserror::Error;

/// Format used to type dates in the form and on the command line
pub const INPUT_DATE_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Reasons a submission is rejected before reaching the store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter a title")]
    MissingTitle,
    #[error("Please choose a start and an end date")]
    MissingDates,
    #[error("Could not read date \"{0}\" (expected DD/MM/YYYY HH:MM)")]
    UnreadableDate(String),
    #[error("A group needs at least 2 periods (has {0})")]
    TooFewPeriods(usize),
    #[error("Please enter a title for period {0}")]
    PeriodMissingTitle(usize),
    #[error("Please choose the dates for period {0}")]
    PeriodMissingDates(usize),
    #[error("Refresh rate must be a whole number of milliseconds above 0")]
    InvalidRefreshRate,
}

/// Parse a user-typed local date ("31/12/2024 18:30") into a UTC instant.
/// Blank input is `Ok(None)`.
pub fn parse_input_date(input: &str) -> Result<Option<DateTime<Utc>>, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let naive = NaiveDateTime::parse_from_str(trimmed, INPUT_DATE_FORMAT)
        .map_err(|_| ValidationError::UnreadableDate(trimmed.to_string()))?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| Some(local.with_timezone(&Utc)))
        .ok_or_else(|| ValidationError::UnreadableDate(trimmed.to_string()))
}

/// Format a UTC instant the way the form expects it back
pub fn format_input_date(instant: DateTime<Utc>) -> String {
    instant.with_timezone(&Local).format(INPUT_DATE_FORMAT).to_string()
}

/// Parse a refresh rate typed as text
pub fn parse_refresh_rate(input: &str) -> Result<u64, ValidationError> {
    match input.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(ms),
        _ => Err(ValidationError::InvalidRefreshRate),
    }
}

/// A period as entered, before validation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeriodDraft {
    pub title: String,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    /// Kept when editing an existing period; otherwise taken from the palette
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DraftKind {
    Single {
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    },
    Group(Vec<PeriodDraft>),
}

/// User input for a new or edited record
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDraft {
    pub title: String,
    pub granularity: Granularity,
    pub refresh_rate: u64,
    pub kind: DraftKind,
}

/// The validated fields of a record; identity, owner and position are added by the caller
#[derive(Debug, Clone, PartialEq)]
pub struct ValidDraft {
    pub title: String,
    pub granularity: Granularity,
    pub refresh_rate: u64,
    pub kind: RecordKind,
}

impl RecordDraft {
    /// Check every field and build the record contents, or say what's wrong
    pub fn validate(self) -> Result<ValidDraft, ValidationError> {
        if self.refresh_rate == 0 {
            return Err(ValidationError::InvalidRefreshRate);
        }

        let kind = match self.kind {
            DraftKind::Single { start, end } => {
                if self.title.trim().is_empty() {
                    return Err(ValidationError::MissingTitle);
                }
                match (start, end) {
                    (Some(start), Some(end)) => RecordKind::Single(TimeInterval::new(start, end)),
                    _ => return Err(ValidationError::MissingDates),
                }
            }
            DraftKind::Group(drafts) => {
                if drafts.len() < 2 {
                    return Err(ValidationError::TooFewPeriods(drafts.len()));
                }
                if self.title.trim().is_empty() {
                    return Err(ValidationError::MissingTitle);
                }

                let mut periods = Vec::with_capacity(drafts.len());
                for (index, draft) in drafts.into_iter().enumerate() {
                    let number = index + 1;
                    if draft.title.trim().is_empty() {
                        return Err(ValidationError::PeriodMissingTitle(number));
                    }
                    let (start, end) = match (draft.start, draft.end) {
                        (Some(start), Some(end)) => (start, end),
                        _ => return Err(ValidationError::PeriodMissingDates(number)),
                    };
                    periods.push(Period {
                        title: draft.title,
                        interval: TimeInterval::new(start, end),
                        color: draft
                            .color
                            .unwrap_or_else(|| palette_color(index).to_string()),
                    });
                }
                RecordKind::Group(periods)
            }
        };

        Ok(ValidDraft {
            title: self.title,
            granularity: self.granularity,
            refresh_rate: self.refresh_rate,
            kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn period_draft(title: &str) -> PeriodDraft {
        let now = Utc::now();
        PeriodDraft {
            title: title.to_string(),
            start: Some(now),
            end: Some(now + Duration::hours(1)),
            color: None,
        }
    }

    fn single_draft(title: &str) -> RecordDraft {
        let now = Utc::now();
        RecordDraft {
            title: title.to_string(),
            granularity: Granularity::Seconds,
            refresh_rate: 1000,
            kind: DraftKind::Single {
                start: Some(now),
                end: Some(now + Duration::days(1)),
            },
        }
    }

    fn group_draft(periods: Vec<PeriodDraft>) -> RecordDraft {
        RecordDraft {
            title: "Semester".to_string(),
            granularity: Granularity::Days,
            refresh_rate: 60_000,
            kind: DraftKind::Group(periods),
        }
    }

    #[test]
    fn test_valid_single() {
        let valid = single_draft("Sprint").validate().unwrap();
        assert_eq!(valid.title, "Sprint");
        assert!(matches!(valid.kind, RecordKind::Single(_)));
    }

    #[test]
    fn test_single_missing_title() {
        assert_eq!(
            single_draft("   ").validate(),
            Err(ValidationError::MissingTitle)
        );
    }

    #[test]
    fn test_single_missing_dates() {
        let mut draft = single_draft("Sprint");
        draft.kind = DraftKind::Single {
            start: Some(Utc::now()),
            end: None,
        };
        assert_eq!(draft.validate(), Err(ValidationError::MissingDates));
    }

    #[test]
    fn test_zero_refresh_rate_rejected() {
        let mut draft = single_draft("Sprint");
        draft.refresh_rate = 0;
        assert_eq!(draft.validate(), Err(ValidationError::InvalidRefreshRate));
    }

    #[test]
    fn test_group_needs_two_periods() {
        assert_eq!(
            group_draft(vec![period_draft("Only")]).validate(),
            Err(ValidationError::TooFewPeriods(1))
        );
    }

    #[test]
    fn test_group_period_title_required() {
        let result = group_draft(vec![period_draft("A"), period_draft("")]).validate();
        assert_eq!(result, Err(ValidationError::PeriodMissingTitle(2)));
    }

    #[test]
    fn test_group_period_dates_required() {
        let mut second = period_draft("B");
        second.end = None;
        let result = group_draft(vec![period_draft("A"), second]).validate();
        assert_eq!(result, Err(ValidationError::PeriodMissingDates(2)));
    }

    #[test]
    fn test_group_colors_by_index_unless_kept() {
        let mut third = period_draft("C");
        third.color = Some("#123456".to_string());
        let valid = group_draft(vec![period_draft("A"), period_draft("B"), third])
            .validate()
            .unwrap();

        match valid.kind {
            RecordKind::Group(periods) => {
                assert_eq!(periods[0].color, "#6c5ce7");
                assert_eq!(periods[1].color, "#00b894");
                assert_eq!(periods[2].color, "#123456");
            }
            RecordKind::Single(_) => panic!("expected a group"),
        }
    }

    #[test]
    fn test_parse_input_date_roundtrip() {
        let parsed = parse_input_date("31/12/2024 18:30").unwrap().unwrap();
        assert_eq!(format_input_date(parsed), "31/12/2024 18:30");
    }

    #[test]
    fn test_parse_input_date_blank_and_garbage() {
        assert_eq!(parse_input_date("  ").unwrap(), None);
        assert_eq!(
            parse_input_date("tomorrow"),
            Err(ValidationError::UnreadableDate("tomorrow".to_string()))
        );
    }

    #[test]
    fn test_parse_refresh_rate() {
        assert_eq!(parse_refresh_rate(" 250 "), Ok(250));
        assert_eq!(parse_refresh_rate("0"), Err(ValidationError::InvalidRefreshRate));
        assert_eq!(parse_refresh_rate("fast"), Err(ValidationError::InvalidRefreshRate));
    }
}
