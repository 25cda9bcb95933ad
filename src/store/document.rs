//! Persisted meeting document schema.
//!
//! One JSON file holds every meeting record, split into upcoming and past
//! lists. The document is the single source of truth; all mutations go
//! through the store serializer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TranscriptLine {
    pub timestamp: Option<DateTime<Utc>>,
    pub speaker: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MeetingRecord {
    pub id: String,
    pub recording_id: Option<String>,
    pub calendar_event_id: Option<String>,
    pub title: String,
    pub content: String,
    pub transcript: Vec<TranscriptLine>,
    pub participants: Vec<String>,
    pub ai_summary: Option<String>,
    pub recording_complete: bool,
    pub video_path: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub attendees: Vec<String>,
    pub description: Option<String>,
}

impl MeetingRecord {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MeetingDocument {
    pub upcoming_meetings: Vec<MeetingRecord>,
    pub past_meetings: Vec<MeetingRecord>,
}

impl MeetingDocument {
    /// Upcoming first, then past — the search order used everywhere.
    pub fn all(&self) -> impl Iterator<Item = &MeetingRecord> {
        self.upcoming_meetings.iter().chain(self.past_meetings.iter())
    }

    fn all_mut(&mut self) -> impl Iterator<Item = &mut MeetingRecord> {
        self.upcoming_meetings
            .iter_mut()
            .chain(self.past_meetings.iter_mut())
    }

    pub fn find(&self, id: &str) -> Option<&MeetingRecord> {
        self.all().find(|r| r.id == id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut MeetingRecord> {
        self.all_mut().find(|r| r.id == id)
    }

    pub fn find_by_recording(&self, recording_id: &str) -> Option<&MeetingRecord> {
        self.all()
            .find(|r| r.recording_id.as_deref() == Some(recording_id))
    }

    pub fn find_by_calendar_event(&self, event_id: &str) -> Option<&MeetingRecord> {
        self.all()
            .find(|r| r.calendar_event_id.as_deref() == Some(event_id))
    }

    /// Remove a record from whichever list holds it.
    pub fn remove(&mut self, id: &str) -> Option<MeetingRecord> {
        if let Some(index) = self.upcoming_meetings.iter().position(|r| r.id == id) {
            return Some(self.upcoming_meetings.remove(index));
        }
        if let Some(index) = self.past_meetings.iter().position(|r| r.id == id) {
            return Some(self.past_meetings.remove(index));
        }
        None
    }

    pub fn len(&self) -> usize {
        self.upcoming_meetings.len() + self.past_meetings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.upcoming_meetings.is_empty() && self.past_meetings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_searches_upcoming_then_past() {
        let mut doc = MeetingDocument::default();
        doc.past_meetings.push(MeetingRecord {
            id: "a".to_string(),
            title: "past".to_string(),
            ..Default::default()
        });
        doc.upcoming_meetings.push(MeetingRecord {
            id: "a".to_string(),
            title: "upcoming".to_string(),
            ..Default::default()
        });

        assert_eq!(doc.find("a").unwrap().title, "upcoming");
    }

    #[test]
    fn test_remove_from_either_list() {
        let mut doc = MeetingDocument::default();
        doc.upcoming_meetings.push(MeetingRecord::new("u"));
        doc.past_meetings.push(MeetingRecord::new("p"));
        let upcoming_id = doc.upcoming_meetings[0].id.clone();
        let past_id = doc.past_meetings[0].id.clone();

        assert_eq!(doc.remove(&past_id).unwrap().title, "p");
        assert_eq!(doc.remove(&upcoming_id).unwrap().title, "u");
        assert!(doc.remove("missing").is_none());
        assert!(doc.is_empty());
    }

    #[test]
    fn test_find_by_recording_and_calendar_event() {
        let mut doc = MeetingDocument::default();
        let mut record = MeetingRecord::new("Sync");
        record.recording_id = Some("r1".to_string());
        record.calendar_event_id = Some("ev1".to_string());
        doc.upcoming_meetings.push(record);

        assert!(doc.find_by_recording("r1").is_some());
        assert!(doc.find_by_calendar_event("ev1").is_some());
        assert!(doc.find_by_recording("r2").is_none());
    }

    #[test]
    fn test_document_wire_format_is_camel_case() {
        let doc = MeetingDocument::default();
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("upcomingMeetings"));
        assert!(json.contains("pastMeetings"));
    }

    #[test]
    fn test_unknown_fields_are_tolerated() {
        let json = r#"{"upcomingMeetings":[{"id":"a","title":"t","legacyField":1}],"pastMeetings":[]}"#;
        let doc: MeetingDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.upcoming_meetings[0].id, "a");
    }
}
