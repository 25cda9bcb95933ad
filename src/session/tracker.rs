//! Calendar metadata for recordings that were started ahead of a scheduled
//! meeting. Insertion order is preserved because the correlator evaluates
//! candidates first-to-last.

use crate::engine::Platform;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct CalendarLink {
    pub recording_id: String,
    pub meeting_id: String,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub video_url: Option<String>,
    pub platform: Platform,
    pub audio_only: bool,
    pub upload_token: String,
}

#[derive(Debug, Default)]
pub struct CalendarLinkTracker {
    links: Vec<CalendarLink>,
}

impl CalendarLinkTracker {
    /// Insert a link, replacing any existing one for the same recording id
    /// without disturbing its position.
    pub fn insert(&mut self, link: CalendarLink) {
        match self
            .links
            .iter_mut()
            .find(|l| l.recording_id == link.recording_id)
        {
            Some(existing) => *existing = link,
            None => self.links.push(link),
        }
    }

    pub fn remove(&mut self, recording_id: &str) -> Option<CalendarLink> {
        let index = self
            .links
            .iter()
            .position(|l| l.recording_id == recording_id)?;
        Some(self.links.remove(index))
    }

    pub fn get(&self, recording_id: &str) -> Option<&CalendarLink> {
        self.links.iter().find(|l| l.recording_id == recording_id)
    }

    pub fn get_for_meeting(&self, meeting_id: &str) -> Option<&CalendarLink> {
        self.links.iter().find(|l| l.meeting_id == meeting_id)
    }

    pub fn snapshot(&self) -> Vec<CalendarLink> {
        self.links.clone()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}
