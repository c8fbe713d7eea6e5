//! Typed sort keys for logical file fields.
//!
//! Every accessor yields a key even when the attribute is absent: numeric
//! fields default to `0`, text to `""`, dates to the earliest representable
//! instant and ranked labels to their table's default rank.

use std::cmp::Ordering;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use serde_json::Value;

use crate::rules::evaluator::parse_timestamp;
use crate::storage::model::FileRecord;

#[derive(Debug, Clone)]
pub enum SortKey {
    Number(f64),
    Date(DateTime<Utc>),
    Text(String),
}

impl SortKey {
    fn variant_rank(&self) -> u8 {
        match self {
            Self::Number(_) => 0,
            Self::Date(_) => 1,
            Self::Text(_) => 2,
        }
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Date(a), Self::Date(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            _ => self.variant_rank().cmp(&other.variant_rank()),
        }
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SortKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortKey {}

const SEVERITY_RANKS: &[(&str, u8)] = &[
    ("debug", 1),
    ("info", 2),
    ("warning", 3),
    ("error", 4),
    ("critical", 5),
];
const PRIORITY_RANKS: &[(&str, u8)] = &[("low", 1), ("medium", 2), ("high", 3), ("urgent", 4)];
const STATUS_RANKS: &[(&str, u8)] = &[
    ("draft", 1),
    ("pending", 2),
    ("approved", 3),
    ("completed", 4),
    ("archived", 5),
];

const NUMERIC_FIELDS: &[&str] = &[
    "file_size",
    "duration",
    "amount",
    "width",
    "height",
    "bitrate",
    "sample_rate",
    "channels",
    "year",
    "track_number",
    "compression_ratio",
    "contents_count",
    "line_count",
    "complexity",
    "entries_count",
    "error_count",
];
const TEXT_FIELDS: &[&str] = &[
    "filename",
    "file_type",
    "artist",
    "author",
    "genre",
    "document_type",
    "department",
    "project",
];

const LANGUAGES: &[(&str, &str)] = &[
    ("py", "Python"),
    ("js", "JavaScript"),
    ("java", "Java"),
    ("cpp", "C++"),
    ("c", "C"),
    ("cs", "C#"),
    ("php", "PHP"),
    ("rb", "Ruby"),
    ("go", "Go"),
    ("rs", "Rust"),
];

/// How a logical field name is turned into a [`SortKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldAccessor<'a> {
    Numeric(&'a str),
    Text(&'a str),
    Date(&'a str),
    Ranked {
        field: &'a str,
        table: &'static [(&'static str, u8)],
        default_rank: u8,
    },
    Resolution,
    ReferenceNumber,
    Language,
    ModifiedTime,
    TimestampRange,
    Generic(&'a str),
}

impl<'a> FieldAccessor<'a> {
    pub fn for_field(field: &'a str) -> Self {
        match field {
            "resolution" => Self::Resolution,
            "reference_number" => Self::ReferenceNumber,
            "language" => Self::Language,
            "modified_time" => Self::ModifiedTime,
            "timestamp_range" => Self::TimestampRange,
            "created_at" => Self::Date(field),
            "severity" => Self::Ranked {
                field,
                table: SEVERITY_RANKS,
                default_rank: 2,
            },
            "priority" => Self::Ranked {
                field,
                table: PRIORITY_RANKS,
                default_rank: 2,
            },
            "status" => Self::Ranked {
                field,
                table: STATUS_RANKS,
                default_rank: 1,
            },
            _ if NUMERIC_FIELDS.contains(&field) => Self::Numeric(field),
            _ if TEXT_FIELDS.contains(&field) => Self::Text(field),
            _ => Self::Generic(field),
        }
    }

    pub fn extract(&self, file: &FileRecord) -> SortKey {
        match *self {
            Self::Numeric(field) => SortKey::Number(numeric(file.attribute(field))),
            Self::Text(field) => SortKey::Text(text(field, file)),
            Self::Date(field) => SortKey::Date(date(file.attribute(field)).unwrap_or(earliest())),
            Self::Ranked {
                field,
                table,
                default_rank,
            } => {
                let rank = file
                    .attribute(field)
                    .and_then(Value::as_str)
                    .and_then(|label| {
                        let label = label.trim().to_ascii_lowercase();
                        table
                            .iter()
                            .find(|(name, _)| *name == label)
                            .map(|(_, rank)| *rank)
                    })
                    .unwrap_or(default_rank);
                SortKey::Number(f64::from(rank))
            }
            Self::Resolution => SortKey::Number(
                numeric(file.attribute("width")) * numeric(file.attribute("height")),
            ),
            Self::ReferenceNumber => SortKey::Number(reference_number(file)),
            Self::Language => SortKey::Text(language(file).to_ascii_lowercase()),
            Self::ModifiedTime => SortKey::Date(
                date(file.attribute("modified_time"))
                    .or_else(|| date(file.attribute("created_at")))
                    .unwrap_or(earliest()),
            ),
            Self::TimestampRange => {
                SortKey::Date(earliest_logged_timestamp(file).unwrap_or(earliest()))
            }
            Self::Generic(field) => match file.attribute(field) {
                Some(Value::Number(number)) => SortKey::Number(number.as_f64().unwrap_or(0.0)),
                Some(Value::Bool(flag)) => SortKey::Number(if *flag { 1.0 } else { 0.0 }),
                Some(Value::String(value)) => SortKey::Text(value.to_lowercase()),
                _ => SortKey::Text(String::new()),
            },
        }
    }
}

pub fn sort_key(file: &FileRecord, field: &str) -> SortKey {
    FieldAccessor::for_field(field).extract(file)
}

/// Language name derived from the file extension, `Unknown` otherwise.
pub fn language(file: &FileRecord) -> &'static str {
    file.extension()
        .and_then(|ext| {
            LANGUAGES
                .iter()
                .find(|(known, _)| *known == ext)
                .map(|(_, name)| *name)
        })
        .unwrap_or("Unknown")
}

fn numeric(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(number)) => number.as_f64().unwrap_or(0.0),
        Some(Value::String(raw)) => raw.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn text(field: &str, file: &FileRecord) -> String {
    if field == "filename" {
        return file.filename().to_lowercase();
    }
    match file.attribute(field) {
        Some(Value::String(value)) => value.to_lowercase(),
        Some(Value::Number(number)) => number.to_string(),
        _ => String::new(),
    }
}

fn date(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value? {
        Value::String(raw) => parse_timestamp(raw),
        Value::Number(number) => number
            .as_i64()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        _ => None,
    }
}

fn earliest() -> DateTime<Utc> {
    DateTime::<Utc>::MIN_UTC
}

/// Earliest `YYYY-MM-DD HH:MM:SS` stamp found in the `content` attribute.
fn earliest_logged_timestamp(file: &FileRecord) -> Option<DateTime<Utc>> {
    static STAMP: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = STAMP
        .get_or_init(|| Regex::new(r"\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}").ok())
        .as_ref()?;
    let content = file.attribute("content")?.as_str()?;
    pattern
        .find_iter(content)
        .filter_map(|found| NaiveDateTime::parse_from_str(found.as_str(), "%Y-%m-%d %H:%M:%S").ok())
        .min()
        .map(|stamp| stamp.and_utc())
}

fn reference_number(file: &FileRecord) -> f64 {
    static DIGITS: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(pattern) = DIGITS.get_or_init(|| Regex::new(r"\d+").ok()).as_ref() else {
        return 0.0;
    };
    let raw = match file.attribute("reference_number") {
        Some(Value::Number(number)) => return number.as_f64().unwrap_or(0.0),
        Some(Value::String(raw)) => raw.as_str(),
        _ => return 0.0,
    };
    pattern
        .find(raw)
        .and_then(|found| found.as_str().parse::<f64>().ok())
        .unwrap_or(0.0)
}
