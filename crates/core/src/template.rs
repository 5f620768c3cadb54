//! Template records: the canonical shape published downstream and the
//! loosely-typed upstream shape it is derived from.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Upstream record identifier. Never regenerated locally.
pub type ExternalId = String;

// ── Canonical model ──────────────────────────────────────────────────

/// Normalized template as published to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalTemplate {
    pub external_id: ExternalId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    pub sections: Vec<Section>,
}

impl CanonicalTemplate {
    /// Total number of questions across all sections.
    pub fn question_count(&self) -> usize {
        self.sections.iter().map(|s| s.questions.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub description: String,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub mandatory: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

/// Binary question classification. There is no third category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QuestionKind {
    Choice,
    Text,
}

impl std::fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuestionKind::Choice => write!(f, "CHOICE"),
            QuestionKind::Text => write!(f, "TEXT"),
        }
    }
}

// ── Upstream model ───────────────────────────────────────────────────

/// A template as returned by the template-management service.
///
/// Only `id` is required. Every other field tolerates absence and a few
/// alternate spellings seen across upstream versions; when several
/// spellings are present the first usable one wins. Values of the wrong
/// shape decode as `None` instead of rejecting the record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawTemplate {
    pub id: ExternalId,
    pub name: Option<String>,
    pub description: Option<String>,
    pub modified: Option<DateTime<Utc>>,
    pub created: Option<DateTime<Utc>>,
    pub questions: Option<Vec<RawQuestion>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawQuestion {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub value: Option<String>,
    pub mandatory: Option<bool>,
    pub options: Option<Vec<String>>,
}

const NAME_KEYS: &[&str] = &["name", "title"];
const MODIFIED_KEYS: &[&str] = &["modified", "modifiedAt", "updatedAt", "updated"];
const CREATED_KEYS: &[&str] = &["created", "createdAt"];
const KIND_KEYS: &[&str] = &["type", "questionType"];
const VALUE_KEYS: &[&str] = &["value", "text", "label"];
const MANDATORY_KEYS: &[&str] = &["mandatory", "required"];
const OPTIONS_KEYS: &[&str] = &["options", "choices"];

type Object = serde_json::Map<String, Value>;

/// First of `keys` whose value `parse` accepts.
fn first_of<T>(obj: &Object, keys: &[&str], parse: impl Fn(&Value) -> Option<T>) -> Option<T> {
    keys.iter().filter_map(|key| obj.get(*key)).find_map(parse)
}

impl RawTemplate {
    fn from_object(obj: &Object) -> Result<Self, String> {
        let id = obj
            .get("id")
            .and_then(scalar_to_string)
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                format!(
                    "template id must be a non-empty string or number, got {}",
                    obj.get("id").unwrap_or(&Value::Null)
                )
            })?;

        Ok(Self {
            id,
            name: first_of(obj, NAME_KEYS, scalar_to_string),
            description: first_of(obj, &["description"], scalar_to_string),
            modified: first_of(obj, MODIFIED_KEYS, parse_timestamp),
            created: first_of(obj, CREATED_KEYS, parse_timestamp),
            questions: obj.get("questions").and_then(|v| match v {
                Value::Array(items) => Some(items.iter().map(RawQuestion::from_value).collect()),
                _ => None,
            }),
        })
    }
}

impl RawQuestion {
    /// A question that is not an object still counts as a (blank) question.
    fn from_value(v: &Value) -> Self {
        let Value::Object(obj) = v else {
            return Self::default();
        };
        Self {
            kind: first_of(obj, KIND_KEYS, scalar_to_string),
            value: first_of(obj, VALUE_KEYS, scalar_to_string),
            mandatory: first_of(obj, MANDATORY_KEYS, lenient_bool),
            options: first_of(obj, OPTIONS_KEYS, string_list),
        }
    }
}

impl<'de> Deserialize<'de> for RawTemplate {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        match Value::deserialize(d)? {
            Value::Object(obj) => Self::from_object(&obj).map_err(serde::de::Error::custom),
            other => Err(serde::de::Error::custom(format!(
                "template must be an object, got {other}"
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for RawQuestion {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        Ok(Self::from_value(&Value::deserialize(d)?))
    }
}

// ── Lenient decoding helpers ─────────────────────────────────────────

/// Render a scalar JSON value as a string. Objects, arrays and null yield `None`.
fn scalar_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lenient_bool(v: &Value) -> Option<bool> {
    match v {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|i| i != 0),
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn string_list(v: &Value) -> Option<Vec<String>> {
    match v {
        Value::Array(items) => Some(items.iter().filter_map(scalar_to_string).collect()),
        _ => None,
    }
}

/// Parse an upstream timestamp: RFC 3339, a bare `YYYY-MM-DD` date, or epoch
/// milliseconds (number or numeric string).
pub fn parse_timestamp(v: &Value) -> Option<DateTime<Utc>> {
    match v {
        Value::Number(n) => n.as_i64().and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
            }
            s.parse::<i64>()
                .ok()
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        }
        _ => None,
    }
}
