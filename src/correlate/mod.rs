//! Decides whether a just-detected conferencing window belongs to a
//! calendar-linked recording that is already in progress.
//!
//! Pure and deterministic: candidates are evaluated in tracker order and the
//! first qualifying link wins. No match is a normal outcome — the window is
//! then treated as an ad-hoc call.

use crate::engine::DetectedWindow;
use crate::session::CalendarLink;
use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, Copy)]
pub struct CorrelationSettings {
    /// Slack on either side of the calendar time window.
    pub buffer: Duration,
    /// Assumed length when the event has no end time.
    pub default_duration: Duration,
}

impl Default for CorrelationSettings {
    fn default() -> Self {
        Self {
            buffer: Duration::minutes(5),
            default_duration: Duration::minutes(60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CorrelationMatch {
    pub recording_id: String,
    pub link: CalendarLink,
}

/// Match a detected window against the live calendar links.
pub fn correlate(
    window: &DetectedWindow,
    links: &[CalendarLink],
    now: DateTime<Utc>,
    settings: &CorrelationSettings,
) -> Option<CorrelationMatch> {
    links
        .iter()
        .find(|link| {
            time_window_matches(link, window, now, settings) || title_matches(&link.title, &window.title)
        })
        .map(|link| CorrelationMatch {
            recording_id: link.recording_id.clone(),
            link: link.clone(),
        })
}

fn time_window_matches(
    link: &CalendarLink,
    window: &DetectedWindow,
    now: DateTime<Utc>,
    settings: &CorrelationSettings,
) -> bool {
    if link.platform != window.platform {
        return false;
    }

    let end = link
        .end_time
        .unwrap_or(link.start_time + settings.default_duration);

    now >= link.start_time - settings.buffer && now <= end + settings.buffer
}

/// Fuzzy fallback: tokenize the calendar title on whitespace, keep tokens
/// longer than 3 characters, and count substring hits in the lower-cased
/// window title. A match needs at least min(2, ceil(tokens / 2)) hits.
fn title_matches(link_title: &str, window_title: &str) -> bool {
    let window_lower = window_title.to_lowercase();

    let tokens: Vec<String> = link_title
        .split_whitespace()
        .filter(|t| t.chars().count() > 3)
        .map(|t| t.to_lowercase())
        .collect();

    if tokens.is_empty() {
        return false;
    }

    let required = 2.min(tokens.len().div_ceil(2));
    let hits = tokens
        .iter()
        .filter(|token| window_lower.contains(token.as_str()))
        .count();

    hits >= required
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Platform;

    fn window(platform: Platform, title: &str) -> DetectedWindow {
        DetectedWindow {
            platform,
            title: title.to_string(),
            id: "w1".to_string(),
        }
    }

    fn link(
        recording_id: &str,
        platform: Platform,
        title: &str,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    ) -> CalendarLink {
        CalendarLink {
            recording_id: recording_id.to_string(),
            meeting_id: format!("meeting-{recording_id}"),
            title: title.to_string(),
            start_time: start,
            end_time: end,
            video_url: None,
            platform,
            audio_only: true,
            upload_token: "tok".to_string(),
        }
    }

    #[test]
    fn test_time_match_inside_window() {
        let start = Utc::now();
        let links = vec![link(
            "r1",
            Platform::Zoom,
            "Quarterly review",
            start,
            Some(start + Duration::minutes(30)),
        )];

        let result = correlate(
            &window(Platform::Zoom, "Zoom Meeting"),
            &links,
            start + Duration::minutes(2),
            &CorrelationSettings::default(),
        );
        assert_eq!(result.unwrap().recording_id, "r1");
    }

    #[test]
    fn test_time_match_within_buffer() {
        let start = Utc::now();
        let links = vec![link(
            "r1",
            Platform::Zoom,
            "Quarterly review",
            start,
            Some(start + Duration::minutes(30)),
        )];
        let settings = CorrelationSettings::default();

        // 4 minutes before start: inside the 5-minute buffer.
        assert!(correlate(
            &window(Platform::Zoom, "Zoom Meeting"),
            &links,
            start - Duration::minutes(4),
            &settings,
        )
        .is_some());

        // 10 minutes past end: outside the buffer, and the window title
        // shares nothing with the calendar title.
        assert!(correlate(
            &window(Platform::Zoom, "Zoom Meeting"),
            &links,
            start + Duration::minutes(40),
            &settings,
        )
        .is_none());
    }

    #[test]
    fn test_time_match_requires_same_platform() {
        let start = Utc::now();
        let links = vec![link("r1", Platform::Teams, "Budget talk", start, None)];

        assert!(correlate(
            &window(Platform::Zoom, "Zoom Meeting"),
            &links,
            start,
            &CorrelationSettings::default(),
        )
        .is_none());
    }

    #[test]
    fn test_missing_end_time_assumes_default_duration() {
        let start = Utc::now();
        let links = vec![link("r1", Platform::Meet, "Roadmap session", start, None)];
        let settings = CorrelationSettings::default();

        // 50 minutes in: still within the assumed 60-minute meeting.
        assert!(correlate(
            &window(Platform::Meet, "Google Meet"),
            &links,
            start + Duration::minutes(50),
            &settings,
        )
        .is_some());

        // 70 minutes in: past 60 minutes plus the 5-minute buffer.
        assert!(correlate(
            &window(Platform::Meet, "Google Meet"),
            &links,
            start + Duration::minutes(70),
            &settings,
        )
        .is_none());
    }

    #[test]
    fn test_title_fallback_matches_outside_time_window() {
        let start = Utc::now() - Duration::hours(3);
        let links = vec![link(
            "r1",
            Platform::Zoom,
            "Weekly Engineering Sync",
            start,
            Some(start + Duration::minutes(30)),
        )];

        // Tokens longer than 3 chars: {weekly, engineering, sync}; two of
        // them appear in the window title, meeting the min(2, ceil(3/2)) = 2
        // threshold.
        let result = correlate(
            &window(Platform::Zoom, "Engineering Sync - Zoom Meeting"),
            &links,
            Utc::now(),
            &CorrelationSettings::default(),
        );
        assert_eq!(result.unwrap().recording_id, "r1");
    }

    #[test]
    fn test_title_fallback_single_hit_is_not_enough() {
        let start = Utc::now() - Duration::hours(3);
        let links = vec![link(
            "r1",
            Platform::Zoom,
            "Weekly Engineering Sync",
            start,
            Some(start + Duration::minutes(30)),
        )];

        assert!(correlate(
            &window(Platform::Zoom, "Engineering all-hands"),
            &links,
            Utc::now(),
            &CorrelationSettings::default(),
        )
        .is_none());
    }

    #[test]
    fn test_short_tokens_are_ignored() {
        let start = Utc::now() - Duration::hours(3);
        let links = vec![link(
            "r1",
            Platform::Zoom,
            "1:1 w/ Sam",
            start,
            Some(start + Duration::minutes(30)),
        )];

        // Every token is 3 characters or shorter, so the fallback never fires.
        assert!(correlate(
            &window(Platform::Zoom, "1:1 w/ Sam - Zoom"),
            &links,
            Utc::now(),
            &CorrelationSettings::default(),
        )
        .is_none());
    }

    #[test]
    fn test_token_length_counts_characters_not_bytes() {
        let start = Utc::now() - Duration::hours(3);
        // Two-character CJK tokens are six bytes but still too short.
        let links = vec![link(
            "r1",
            Platform::Zoom,
            "定例 会議",
            start,
            Some(start + Duration::minutes(30)),
        )];

        assert!(correlate(
            &window(Platform::Zoom, "定例 会議 - Zoom"),
            &links,
            Utc::now(),
            &CorrelationSettings::default(),
        )
        .is_none());
    }

    #[test]
    fn test_first_qualifying_link_wins() {
        let start = Utc::now();
        let links = vec![
            link("r1", Platform::Zoom, "Design review", start, None),
            link("r2", Platform::Zoom, "Design review", start, None),
        ];

        let result = correlate(
            &window(Platform::Zoom, "Zoom Meeting"),
            &links,
            start,
            &CorrelationSettings::default(),
        );
        assert_eq!(result.unwrap().recording_id, "r1");
    }

    #[test]
    fn test_no_links_no_match() {
        assert!(correlate(
            &window(Platform::Zoom, "Zoom Meeting"),
            &[],
            Utc::now(),
            &CorrelationSettings::default(),
        )
        .is_none());
    }
}
