pub mod draft;
pub mod enums;
pub mod interval;
pub mod record;
pub mod views;

pub use draft::{
    format_input_date, parse_input_date, parse_refresh_rate, DraftKind, PeriodDraft, RecordDraft,
    ValidDraft, ValidationError,
};
pub use enums::{Granularity, Status, UiMode};
pub use interval::{Amount, Elapsed, Progress, Remaining, TimeInterval};
pub use record::{
    palette_color, Period, Record, RecordId, RecordKind, DEFAULT_REFRESH_MS, UNORDERED_POSITION,
};
pub use views::{parse_hex_color, ring_arc, ring_point, status_badge, PeriodSnapshot, ProgressSnapshot};
