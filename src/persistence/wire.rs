//! Persisted record shape.
//!
//! Documents are camelCase JSON objects:
//! `{id, title, startDate, endDate, granularity, refreshRate, ownerId, position, isGroup, periods?}`.
//! Reading is lenient so older documents still load: `userId` is accepted for
//! `ownerId`, `refreshRate` may be a number or a numeric string, and missing
//! granularity/position fall back to defaults.

use crate::domain::{
    palette_color, Granularity, Period, Record, RecordId, RecordKind, TimeInterval, ValidDraft,
    DEFAULT_REFRESH_MS, UNORDERED_POSITION,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Why a stored document could not become a `Record`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("unreadable date in `{field}`: {value:?}")]
    BadDate { field: &'static str, value: String },
}

/// One period of a group document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodDocument {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// A record as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub granularity: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_refresh_rate",
        skip_serializing_if = "Option::is_none"
    )]
    pub refresh_rate: Option<u64>,
    #[serde(default, alias = "userId", skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
    #[serde(default)]
    pub is_group: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub periods: Option<Vec<PeriodDocument>>,
}

/// Partial update. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub granularity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_rate: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_group: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub periods: Option<Vec<PeriodDocument>>,
}

/// Accept 1000, "1000", 1000.0; anything else (including 0) reads as unset
fn lenient_refresh_rate<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let rate = match value {
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 1.0).map(|f| f as u64)),
        Some(serde_json::Value::String(s)) => leading_integer(&s),
        _ => None,
    };
    Ok(rate.filter(|ms| *ms > 0))
}

/// Digits at the start of a string, ignoring leading whitespace ("250ms" -> 250)
fn leading_integer(s: &str) -> Option<u64> {
    let digits: String = s
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

pub fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_instant(field: &'static str, value: Option<&str>) -> Result<DateTime<Utc>, DocumentError> {
    let value = value.ok_or(DocumentError::MissingField(field))?;
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| DocumentError::BadDate {
            field,
            value: value.to_string(),
        })
}

fn period_documents(periods: &[Period]) -> Vec<PeriodDocument> {
    periods
        .iter()
        .map(|p| PeriodDocument {
            title: p.title.clone(),
            start_date: Some(format_instant(p.interval.start)),
            end_date: Some(format_instant(p.interval.end)),
            color: Some(p.color.clone()),
        })
        .collect()
}

/// Date range and period list as stored for a record kind.
/// Groups store their overall range alongside the periods.
struct KindFields {
    start_date: Option<String>,
    end_date: Option<String>,
    is_group: bool,
    periods: Option<Vec<PeriodDocument>>,
}

impl KindFields {
    fn of(kind: &RecordKind) -> Self {
        match kind {
            RecordKind::Single(interval) => Self {
                start_date: Some(format_instant(interval.start)),
                end_date: Some(format_instant(interval.end)),
                is_group: false,
                periods: None,
            },
            RecordKind::Group(periods) => {
                let start = periods.iter().map(|p| p.interval.start).min();
                let end = periods.iter().map(|p| p.interval.end).max();
                Self {
                    start_date: start.map(format_instant),
                    end_date: end.map(format_instant),
                    is_group: true,
                    periods: Some(period_documents(periods)),
                }
            }
        }
    }
}

impl RecordDocument {
    /// Full document for an existing record
    pub fn from_record(record: &Record) -> Self {
        let fields = KindFields::of(&record.kind);
        Self {
            id: Some(record.id.clone()),
            title: Some(record.title.clone()),
            start_date: fields.start_date,
            end_date: fields.end_date,
            granularity: Some(record.granularity.to_tag().to_string()),
            refresh_rate: Some(record.refresh_rate),
            owner_id: Some(record.owner_id.clone()),
            position: Some(record.position),
            is_group: fields.is_group,
            periods: fields.periods,
        }
    }

    /// Document for a record that has no id yet
    pub fn new_from_draft(draft: &ValidDraft, owner_id: &str, position: i64) -> Self {
        let fields = KindFields::of(&draft.kind);
        Self {
            id: None,
            title: Some(draft.title.clone()),
            start_date: fields.start_date,
            end_date: fields.end_date,
            granularity: Some(draft.granularity.to_tag().to_string()),
            refresh_rate: Some(draft.refresh_rate),
            owner_id: Some(owner_id.to_string()),
            position: Some(position),
            is_group: fields.is_group,
            periods: fields.periods,
        }
    }

    /// Rebuild the record. Documents without an owner are never returned by
    /// an owner query, so they are rejected here too.
    pub fn to_record(&self) -> Result<Record, DocumentError> {
        let id = self.id.clone().ok_or(DocumentError::MissingField("id"))?;
        let title = self.title.clone().ok_or(DocumentError::MissingField("title"))?;
        let owner_id = self
            .owner_id
            .clone()
            .ok_or(DocumentError::MissingField("ownerId"))?;

        let kind = if self.is_group {
            let docs = self
                .periods
                .as_ref()
                .ok_or(DocumentError::MissingField("periods"))?;
            let mut periods = Vec::with_capacity(docs.len());
            for (index, doc) in docs.iter().enumerate() {
                periods.push(Period {
                    title: doc.title.clone(),
                    interval: TimeInterval::new(
                        parse_instant("periods.startDate", doc.start_date.as_deref())?,
                        parse_instant("periods.endDate", doc.end_date.as_deref())?,
                    ),
                    color: doc
                        .color
                        .clone()
                        .unwrap_or_else(|| palette_color(index).to_string()),
                });
            }
            RecordKind::Group(periods)
        } else {
            RecordKind::Single(TimeInterval::new(
                parse_instant("startDate", self.start_date.as_deref())?,
                parse_instant("endDate", self.end_date.as_deref())?,
            ))
        };

        Ok(Record {
            id,
            owner_id,
            title,
            granularity: self
                .granularity
                .as_deref()
                .and_then(Granularity::from_tag)
                .unwrap_or_default(),
            refresh_rate: self.refresh_rate.unwrap_or(DEFAULT_REFRESH_MS),
            position: self.position.unwrap_or(UNORDERED_POSITION),
            kind,
        })
    }

    pub fn belongs_to(&self, owner_id: &str) -> bool {
        self.owner_id.as_deref() == Some(owner_id)
    }
}

impl RecordPatch {
    /// Overwrite every editable field with the validated form contents
    pub fn from_draft(draft: &ValidDraft) -> Self {
        let fields = KindFields::of(&draft.kind);
        Self {
            title: Some(draft.title.clone()),
            start_date: fields.start_date,
            end_date: fields.end_date,
            granularity: Some(draft.granularity.to_tag().to_string()),
            refresh_rate: Some(draft.refresh_rate),
            position: None,
            is_group: Some(fields.is_group),
            periods: fields.periods,
        }
    }

    pub fn position(position: i64) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge into a stored document. Switching a record to a single timer drops its periods.
    pub fn apply_to(&self, document: &mut RecordDocument) {
        if let Some(title) = &self.title {
            document.title = Some(title.clone());
        }
        if let Some(start) = &self.start_date {
            document.start_date = Some(start.clone());
        }
        if let Some(end) = &self.end_date {
            document.end_date = Some(end.clone());
        }
        if let Some(granularity) = &self.granularity {
            document.granularity = Some(granularity.clone());
        }
        if let Some(rate) = self.refresh_rate {
            document.refresh_rate = Some(rate);
        }
        if let Some(position) = self.position {
            document.position = Some(position);
        }
        if let Some(is_group) = self.is_group {
            document.is_group = is_group;
            if !is_group {
                document.periods = None;
            }
        }
        if let Some(periods) = &self.periods {
            document.periods = Some(periods.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, h, 0, 0).unwrap()
    }

    fn single() -> Record {
        Record {
            id: RecordId::new("abc"),
            owner_id: "owner-1".to_string(),
            title: "Sprint".to_string(),
            granularity: Granularity::Minutes,
            refresh_rate: 250,
            position: 4,
            kind: RecordKind::Single(TimeInterval::new(at(1, 0), at(2, 0))),
        }
    }

    fn group() -> Record {
        Record {
            id: RecordId::new("grp"),
            owner_id: "owner-1".to_string(),
            title: "Semester".to_string(),
            granularity: Granularity::Days,
            refresh_rate: 60_000,
            position: 0,
            kind: RecordKind::Group(vec![
                Period {
                    title: "Term 1".to_string(),
                    interval: TimeInterval::new(at(1, 0), at(10, 0)),
                    color: "#6c5ce7".to_string(),
                },
                Period {
                    title: "Term 2".to_string(),
                    interval: TimeInterval::new(at(11, 0), at(20, 0)),
                    color: "#00b894".to_string(),
                },
            ]),
        }
    }

    #[test]
    fn test_single_document_shape() {
        let json = serde_json::to_value(RecordDocument::from_record(&single())).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "abc",
                "title": "Sprint",
                "startDate": "2024-01-01T00:00:00.000Z",
                "endDate": "2024-01-02T00:00:00.000Z",
                "granularity": "minutes",
                "refreshRate": 250,
                "ownerId": "owner-1",
                "position": 4,
                "isGroup": false
            })
        );
    }

    #[test]
    fn test_roundtrip_single_and_group() {
        for record in [single(), group()] {
            let json = serde_json::to_string(&RecordDocument::from_record(&record)).unwrap();
            let doc: RecordDocument = serde_json::from_str(&json).unwrap();
            assert_eq!(doc.to_record().unwrap(), record);
        }
    }

    #[test]
    fn test_group_document_carries_global_range() {
        let doc = RecordDocument::from_record(&group());
        assert!(doc.is_group);
        assert_eq!(doc.start_date.as_deref(), Some("2024-01-01T00:00:00.000Z"));
        assert_eq!(doc.end_date.as_deref(), Some("2024-01-20T00:00:00.000Z"));
        assert_eq!(doc.periods.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn test_lenient_legacy_document() {
        let doc: RecordDocument = serde_json::from_str(
            r#"{
                "id": "legacy",
                "title": "Old timer",
                "startDate": "2024-01-01T00:00:00.000Z",
                "endDate": "2024-01-02T00:00:00.000Z",
                "refreshRate": "500",
                "userId": "u-1"
            }"#,
        )
        .unwrap();
        let record = doc.to_record().unwrap();
        assert_eq!(record.owner_id, "u-1");
        assert_eq!(record.refresh_rate, 500);
        assert_eq!(record.granularity, Granularity::Seconds);
        assert_eq!(record.position, UNORDERED_POSITION);
    }

    #[test]
    fn test_bad_refresh_rate_falls_back() {
        for raw in [r#""fast""#, "0", "null", "-5"] {
            let doc: RecordDocument = serde_json::from_str(&format!(
                r#"{{"id":"x","title":"t","ownerId":"o","startDate":"2024-01-01T00:00:00Z","endDate":"2024-01-02T00:00:00Z","refreshRate":{}}}"#,
                raw
            ))
            .unwrap();
            assert_eq!(doc.to_record().unwrap().refresh_rate, DEFAULT_REFRESH_MS);
        }
    }

    #[test]
    fn test_missing_owner_rejected() {
        let mut doc = RecordDocument::from_record(&single());
        doc.owner_id = None;
        assert!(!doc.belongs_to("owner-1"));
        assert_eq!(doc.to_record(), Err(DocumentError::MissingField("ownerId")));
    }

    #[test]
    fn test_malformed_dates_rejected() {
        let mut doc = RecordDocument::from_record(&single());
        doc.start_date = Some("not a date".to_string());
        assert_eq!(
            doc.to_record(),
            Err(DocumentError::BadDate {
                field: "startDate",
                value: "not a date".to_string()
            })
        );

        doc.start_date = None;
        assert_eq!(doc.to_record(), Err(DocumentError::MissingField("startDate")));
    }

    #[test]
    fn test_group_without_periods_rejected() {
        let mut doc = RecordDocument::from_record(&group());
        doc.periods = None;
        assert_eq!(doc.to_record(), Err(DocumentError::MissingField("periods")));
    }

    #[test]
    fn test_period_without_color_gets_palette() {
        let mut doc = RecordDocument::from_record(&group());
        if let Some(periods) = doc.periods.as_mut() {
            periods[1].color = None;
        }
        let record = doc.to_record().unwrap();
        assert_eq!(record.periods()[1].color, "#00b894");
    }

    #[test]
    fn test_patch_position_only() {
        let mut doc = RecordDocument::from_record(&single());
        let before = doc.clone();
        RecordPatch::position(9).apply_to(&mut doc);
        assert_eq!(doc.position, Some(9));
        assert_eq!(doc.title, before.title);
        assert_eq!(doc.start_date, before.start_date);
    }

    #[test]
    fn test_patch_group_to_single_drops_periods() {
        let mut doc = RecordDocument::from_record(&group());
        let draft = ValidDraft {
            title: "Now single".to_string(),
            granularity: Granularity::Hours,
            refresh_rate: 1000,
            kind: RecordKind::Single(TimeInterval::new(at(1, 0), at(3, 0))),
        };
        RecordPatch::from_draft(&draft).apply_to(&mut doc);

        let record = doc.to_record().unwrap();
        assert_eq!(record.id, RecordId::new("grp"));
        assert_eq!(record.position, 0);
        assert!(!record.is_group());
        assert!(doc.periods.is_none());
    }

    #[test]
    fn test_patch_serializes_only_set_fields() {
        let json = serde_json::to_value(RecordPatch::position(2)).unwrap();
        assert_eq!(json, serde_json::json!({ "position": 2 }));
        assert!(RecordPatch::default().is_empty());
    }
}
