//! The event domain model.
//!
//! Backends deliver schemaless [`Document`] records; everything past the
//! store boundary works with fully-populated [`Event`] values. The decode
//! step applies one documented default table, so no other layer ever has to
//! reason about missing fields:
//!
//! | missing/invalid field | default                |
//! |-----------------------|------------------------|
//! | title                 | `""`                   |
//! | description           | `""`                   |
//! | datetime              | now (decode instant)   |
//! | state                 | `regular`              |

use crate::error::{PlanError, PlanResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// A schemaless document as stored by the backend.
///
/// The `id` is assigned by the store on creation and never changes; the
/// fields are plain JSON key/value pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

/// Priority state of an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventState {
    #[default]
    Regular,
    Necessary,
    Urgent,
}

impl EventState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventState::Regular => "regular",
            EventState::Necessary => "necessary",
            EventState::Urgent => "urgent",
        }
    }

    /// Lenient wire decoding: anything unrecognized normalizes to `Regular`.
    pub fn from_wire(s: &str) -> Self {
        match s {
            "necessary" => EventState::Necessary,
            "urgent" => EventState::Urgent,
            _ => EventState::Regular,
        }
    }
}

impl fmt::Display for EventState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict parsing for user-supplied values (CLI flags). Unlike
/// [`EventState::from_wire`], unknown values are an error here.
impl FromStr for EventState {
    type Err = PlanError;

    fn from_str(s: &str) -> PlanResult<Self> {
        match s {
            "regular" => Ok(EventState::Regular),
            "necessary" => Ok(EventState::Necessary),
            "urgent" => Ok(EventState::Urgent),
            other => Err(PlanError::InvalidEvent(format!(
                "unknown state '{other}' (expected regular, necessary or urgent)"
            ))),
        }
    }
}

/// A planner event, owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub datetime: DateTime<Utc>,
    pub state: EventState,
}

impl Event {
    /// Decode a stored document into an event, applying the default table.
    ///
    /// This is the only place defaults are filled in; view and filter code
    /// never observes absent fields.
    pub fn from_document(doc: Document) -> Event {
        let f = &doc.fields;

        let datetime = str_field(f, "datetime")
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        let state = str_field(f, "state")
            .map(EventState::from_wire)
            .unwrap_or_default();

        Event {
            id: doc.id,
            owner_id: str_field(f, "owner_id").unwrap_or_default().to_string(),
            title: str_field(f, "title").unwrap_or_default().to_string(),
            description: str_field(f, "description").unwrap_or_default().to_string(),
            datetime,
            state,
        }
    }
}

fn str_field<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    fields.get(key).and_then(Value::as_str)
}

/// Payload for creating a new event.
///
/// The title is the one required field; everything else falls back to the
/// default table on [`EventDraft::into_fields`].
#[derive(Debug, Clone, Default)]
pub struct EventDraft {
    pub title: String,
    pub description: String,
    pub datetime: Option<DateTime<Utc>>,
    pub state: EventState,
}

impl EventDraft {
    pub fn validate(&self) -> PlanResult<()> {
        if self.title.trim().is_empty() {
            return Err(PlanError::InvalidEvent("title must not be empty".into()));
        }
        Ok(())
    }

    /// Build the stored field set, attaching the owner and filling defaults.
    pub fn into_fields(self, owner_id: &str) -> Map<String, Value> {
        let datetime = self.datetime.unwrap_or_else(Utc::now);

        let mut fields = Map::new();
        fields.insert("owner_id".into(), owner_id.into());
        fields.insert("title".into(), self.title.into());
        fields.insert("description".into(), self.description.into());
        fields.insert("datetime".into(), datetime.to_rfc3339().into());
        fields.insert("state".into(), self.state.as_str().into());
        fields
    }
}

/// Wholesale replacement of an event's mutable fields.
///
/// There is no partial-field diffing: an update always carries all four
/// mutable fields. `id` and `owner_id` are never touched.
#[derive(Debug, Clone)]
pub struct EventChanges {
    pub title: String,
    pub description: String,
    pub datetime: DateTime<Utc>,
    pub state: EventState,
}

impl EventChanges {
    pub fn validate(&self) -> PlanResult<()> {
        if self.title.trim().is_empty() {
            return Err(PlanError::InvalidEvent("title must not be empty".into()));
        }
        Ok(())
    }

    pub fn into_fields(self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("title".into(), self.title.into());
        fields.insert("description".into(), self.description.into());
        fields.insert("datetime".into(), self.datetime.to_rfc3339().into());
        fields.insert("state".into(), self.state.as_str().into());
        fields
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn doc(fields: &[(&str, &str)]) -> Document {
        Document {
            id: "doc-1".to_string(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
                .collect(),
        }
    }

    #[test]
    fn decode_with_all_fields() {
        let event = Event::from_document(doc(&[
            ("owner_id", "user-1"),
            ("title", "Standup"),
            ("description", "daily"),
            ("datetime", "2025-03-20T15:00:00+00:00"),
            ("state", "urgent"),
        ]));

        assert_eq!(event.id, "doc-1");
        assert_eq!(event.owner_id, "user-1");
        assert_eq!(event.title, "Standup");
        assert_eq!(event.description, "daily");
        assert_eq!(
            event.datetime,
            Utc.with_ymd_and_hms(2025, 3, 20, 15, 0, 0).unwrap()
        );
        assert_eq!(event.state, EventState::Urgent);
    }

    #[test]
    fn decode_defaults_missing_fields() {
        let before = Utc::now();
        let event = Event::from_document(doc(&[("owner_id", "user-1"), ("title", "Standup")]));
        let after = Utc::now();

        assert_eq!(event.description, "");
        assert_eq!(event.state, EventState::Regular);
        assert!(event.datetime >= before && event.datetime <= after);
    }

    #[test]
    fn decode_defaults_invalid_datetime() {
        let before = Utc::now();
        let event = Event::from_document(doc(&[("datetime", "not a timestamp")]));
        assert!(event.datetime >= before);
    }

    #[test]
    fn unknown_state_normalizes_to_regular() {
        let event = Event::from_document(doc(&[("state", "catastrophic")]));
        assert_eq!(event.state, EventState::Regular);
    }

    #[test]
    fn strict_state_parse_rejects_unknown() {
        assert!("urgent".parse::<EventState>().is_ok());
        assert!("catastrophic".parse::<EventState>().is_err());
    }

    #[test]
    fn draft_requires_title() {
        let draft = EventDraft {
            title: "   ".to_string(),
            ..Default::default()
        };
        assert!(draft.validate().is_err());
    }

    #[test]
    fn draft_fields_default_datetime_and_state() {
        let draft = EventDraft {
            title: "Standup".to_string(),
            ..Default::default()
        };
        let before = Utc::now();
        let fields = draft.into_fields("user-1");

        assert_eq!(fields["owner_id"], "user-1");
        assert_eq!(fields["title"], "Standup");
        assert_eq!(fields["state"], "regular");

        let datetime: DateTime<Utc> = fields["datetime"]
            .as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap();
        assert!(datetime >= before && datetime <= Utc::now());
    }

    #[test]
    fn changes_replace_all_mutable_fields() {
        let changes = EventChanges {
            title: "Deploy".to_string(),
            description: String::new(),
            datetime: Utc.with_ymd_and_hms(2025, 3, 21, 9, 0, 0).unwrap(),
            state: EventState::Necessary,
        };
        let fields = changes.into_fields();

        assert_eq!(fields.len(), 4);
        assert!(!fields.contains_key("owner_id"));
        assert_eq!(fields["state"], "necessary");
    }
}
