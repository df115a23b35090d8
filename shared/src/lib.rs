use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Storage key of the students collection
pub const STUDENTS_KEY: &str = "students";
/// Storage key of the supplements collection
pub const SUPPLEMENTS_KEY: &str = "supplements";
/// Storage key of the exercise types collection
pub const EXERCISE_TYPES_KEY: &str = "exercise-types";
/// Storage key of the login flag
pub const LOGGED_IN_KEY: &str = "isLoggedIn";
/// Refresh key for views that read the audit trail
pub const STUDENT_HISTORY_KEY: &str = "student-history";

/// A single value slot in the remote key/value store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    /// Arbitrary JSON; the store enforces no schema
    pub value: serde_json::Value,
}

/// A student managed by the trainer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub name: String,
    /// Normalized `09xxxxxxxxx` phone number
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
}

/// A supplement in the trainer's catalogue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Supplement {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dosage: Option<String>,
}

/// An exercise type used when building workout programs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseType {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Identity of a student that already owns a phone number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentSummary {
    pub id: i64,
    pub name: String,
}

/// Response of the phone uniqueness endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneCheckResponse {
    pub exists: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student: Option<StudentSummary>,
}

impl PhoneCheckResponse {
    pub fn available() -> Self {
        Self { exists: false, student: None }
    }

    pub fn taken_by(id: i64, name: impl Into<String>) -> Self {
        Self {
            exists: true,
            student: Some(StudentSummary { id, name: name.into() }),
        }
    }
}

/// Kind of user-visible action recorded in the audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryAction {
    Edit,
    Exercise,
    Diet,
    Supplement,
    Delete,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryAction::Edit => "edit",
            HistoryAction::Exercise => "exercise",
            HistoryAction::Diet => "diet",
            HistoryAction::Supplement => "supplement",
            HistoryAction::Delete => "delete",
        }
    }
}

impl fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HistoryAction {
    type Err = HistoryEntryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "edit" => Ok(HistoryAction::Edit),
            "exercise" => Ok(HistoryAction::Exercise),
            "diet" => Ok(HistoryAction::Diet),
            "supplement" => Ok(HistoryAction::Supplement),
            "delete" => Ok(HistoryAction::Delete),
            other => Err(HistoryEntryError::UnknownAction(other.to_string())),
        }
    }
}

/// Audit trail record as stored remotely.
///
/// Entries are immutable once created. Deserialization is lenient: string
/// timestamps are converted to epoch milliseconds and a missing description
/// falls back to the details text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawHistoryEntry")]
pub struct HistoryEntry {
    pub id: i64,
    /// Epoch milliseconds
    pub timestamp: i64,
    /// `None` when the subject no longer exists
    pub student_id: Option<i64>,
    pub student_name: String,
    pub action_type: HistoryAction,
    pub details: String,
    pub description: String,
}

/// Payload for appending an entry; the remote store assigns the id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewHistoryEntry {
    pub timestamp: i64,
    pub student_id: Option<i64>,
    pub student_name: String,
    pub action_type: HistoryAction,
    pub details: String,
    pub description: String,
}

impl NewHistoryEntry {
    /// Create an entry stamped with the current time
    pub fn new(
        action_type: HistoryAction,
        student_id: Option<i64>,
        student_name: impl Into<String>,
        details: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now().timestamp_millis(),
            student_id,
            student_name: student_name.into(),
            action_type,
            details: details.into(),
            description: description.into(),
        }
    }

    /// Attach the id assigned by the store
    pub fn into_entry(self, id: i64) -> HistoryEntry {
        HistoryEntry {
            id,
            timestamp: self.timestamp,
            student_id: self.student_id,
            student_name: self.student_name,
            action_type: self.action_type,
            details: self.details,
            description: self.description,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Millis(i64),
    Fractional(f64),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct RawHistoryEntry {
    id: i64,
    timestamp: RawTimestamp,
    #[serde(default)]
    student_id: Option<i64>,
    #[serde(default)]
    student_name: String,
    action_type: HistoryAction,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl TryFrom<RawHistoryEntry> for HistoryEntry {
    type Error = HistoryEntryError;

    fn try_from(raw: RawHistoryEntry) -> Result<Self, Self::Error> {
        let timestamp = match raw.timestamp {
            RawTimestamp::Millis(millis) => millis,
            RawTimestamp::Fractional(millis) => millis as i64,
            RawTimestamp::Text(text) => parse_timestamp_millis(&text)
                .ok_or(HistoryEntryError::InvalidTimestamp(text))?,
        };
        let details = raw.details.unwrap_or_default();
        let description = match raw.description {
            Some(description) if !description.is_empty() => description,
            _ => details.clone(),
        };

        Ok(HistoryEntry {
            id: raw.id,
            timestamp,
            student_id: raw.student_id,
            student_name: raw.student_name,
            action_type: raw.action_type,
            details,
            description,
        })
    }
}

/// Convert a textual timestamp to epoch milliseconds.
///
/// Accepts RFC 3339, SQLite's `YYYY-MM-DD HH:MM:SS` (read as UTC) and plain
/// numeric strings.
pub fn parse_timestamp_millis(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(millis) = text.parse::<i64>() {
        return Some(millis);
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.timestamp_millis());
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| naive.and_utc().timestamp_millis())
}

#[derive(Debug, Clone, PartialEq)]
pub enum HistoryEntryError {
    InvalidTimestamp(String),
    UnknownAction(String),
}

impl fmt::Display for HistoryEntryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryEntryError::InvalidTimestamp(value) => write!(f, "Invalid history timestamp '{}'", value),
            HistoryEntryError::UnknownAction(value) => write!(f, "Unknown history action '{}'", value),
        }
    }
}

impl std::error::Error for HistoryEntryError {}

/// Fold Persian (U+06F0..U+06F9) and Arabic-Indic (U+0660..U+0669) digits to
/// ASCII and trim surrounding whitespace. Other characters are kept as-is.
pub fn fold_digits(input: &str) -> String {
    input
        .trim()
        .chars()
        .map(|c| match c {
            '\u{06F0}'..='\u{06F9}' => char::from(b'0' + (c as u32 - 0x06F0) as u8),
            '\u{0660}'..='\u{0669}' => char::from(b'0' + (c as u32 - 0x0660) as u8),
            other => other,
        })
        .collect()
}

/// Severity of a transient notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Error,
}

/// Transient notification shown by the UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    pub kind: ToastKind,
    pub title: String,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fold_persian_and_arabic_digits() {
        assert_eq!(fold_digits("۰۹۱۲۳۸۲۳۸۸۶"), "09123823886");
        assert_eq!(fold_digits("٠٩١٢٣٤٥٦٧٨٩"), "09123456789");
        assert_eq!(fold_digits("  0912 "), "0912");
        assert_eq!(fold_digits("09a2"), "09a2");
    }

    #[test]
    fn test_history_action_round_trip_names() {
        for action in [
            HistoryAction::Edit,
            HistoryAction::Exercise,
            HistoryAction::Diet,
            HistoryAction::Supplement,
            HistoryAction::Delete,
        ] {
            assert_eq!(action.as_str().parse::<HistoryAction>().unwrap(), action);
        }
        assert!("archive".parse::<HistoryAction>().is_err());
    }

    #[test]
    fn test_history_entry_numeric_timestamp() {
        let entry: HistoryEntry = serde_json::from_value(json!({
            "id": 3,
            "timestamp": 1702516122000i64,
            "student_id": 7,
            "student_name": "Ali",
            "action_type": "delete",
            "details": "phone: 09123823886",
            "description": "Student Ali was deleted"
        }))
        .unwrap();

        assert_eq!(entry.timestamp, 1702516122000);
        assert_eq!(entry.student_id, Some(7));
        assert_eq!(entry.action_type, HistoryAction::Delete);
        assert_eq!(entry.description, "Student Ali was deleted");
    }

    #[test]
    fn test_history_entry_string_timestamps_are_normalized() {
        let rfc: HistoryEntry = serde_json::from_value(json!({
            "id": 1,
            "timestamp": "2023-12-14T01:08:42Z",
            "student_name": "Sara",
            "action_type": "diet",
            "details": "new diet plan"
        }))
        .unwrap();
        assert_eq!(rfc.timestamp, 1702516122000);

        let sqlite: HistoryEntry = serde_json::from_value(json!({
            "id": 2,
            "timestamp": "2023-12-14 01:08:42",
            "student_name": "Sara",
            "action_type": "edit",
            "details": "renamed"
        }))
        .unwrap();
        assert_eq!(sqlite.timestamp, 1702516122000);
    }

    #[test]
    fn test_missing_description_falls_back_to_details() {
        let entry: HistoryEntry = serde_json::from_value(json!({
            "id": 4,
            "timestamp": 1,
            "student_id": null,
            "student_name": "Reza",
            "action_type": "supplement",
            "details": "creatine 5g"
        }))
        .unwrap();

        assert_eq!(entry.student_id, None);
        assert_eq!(entry.description, "creatine 5g");
    }

    #[test]
    fn test_unparseable_timestamp_is_rejected() {
        let result: Result<HistoryEntry, _> = serde_json::from_value(json!({
            "id": 5,
            "timestamp": "yesterday",
            "student_name": "Reza",
            "action_type": "edit",
            "details": ""
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_phone_check_response_shapes() {
        let free: PhoneCheckResponse = serde_json::from_value(json!({ "exists": false })).unwrap();
        assert_eq!(free, PhoneCheckResponse::available());

        let taken: PhoneCheckResponse =
            serde_json::from_value(json!({ "exists": true, "student": { "id": 7, "name": "Ali" } })).unwrap();
        assert_eq!(taken, PhoneCheckResponse::taken_by(7, "Ali"));
    }
}
