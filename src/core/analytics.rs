use serde::{Deserialize, Serialize};

use crate::core::message::now_millis;

/// Usage counters persisted with the settings blob.
///
/// Missing fields in a saved blob fall back to their defaults, so older or
/// partial saves merge cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalyticsCounters {
    /// Epoch milliseconds of the first recorded session.
    pub session_start: i64,
    pub messages_sent: u64,
    pub total_characters: u64,
    pub total_words: u64,
    /// Round-trip samples in milliseconds.
    pub response_times: Vec<u64>,
    pub average_response_time: f64,
}

impl Default for AnalyticsCounters {
    fn default() -> Self {
        Self {
            session_start: now_millis(),
            messages_sent: 0,
            total_characters: 0,
            total_words: 0,
            response_times: Vec::new(),
            average_response_time: 0.0,
        }
    }
}

impl AnalyticsCounters {
    pub fn record_sent(&mut self, text: &str) {
        self.messages_sent += 1;
        self.total_characters += text.chars().count() as u64;
        self.total_words += text.split_whitespace().count() as u64;
    }

    pub fn record_response_time(&mut self, millis: u64) {
        self.response_times.push(millis);
        let total: u64 = self.response_times.iter().sum();
        self.average_response_time = total as f64 / self.response_times.len() as f64;
    }

    pub fn average_words_per_message(&self) -> f64 {
        if self.messages_sent == 0 {
            0.0
        } else {
            self.total_words as f64 / self.messages_sent as f64
        }
    }

    /// Multi-line summary for `/analytics`.
    pub fn summary(&self) -> String {
        let started = chrono::DateTime::from_timestamp_millis(self.session_start)
            .map(|date| date.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "unknown".to_string());

        format!(
            "Messages sent: {}\nCharacters typed: {}\nWords typed: {} ({:.1} per message)\nAverage response time: {:.0} ms over {} replies\nTracking since: {}",
            self.messages_sent,
            self.total_characters,
            self.total_words,
            self.average_words_per_message(),
            self.average_response_time,
            self.response_times.len(),
            started,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_sent_counts_characters_and_words() {
        let mut counters = AnalyticsCounters::default();
        counters.record_sent("héllo  wide\tworld");
        counters.record_sent("   ");

        assert_eq!(counters.messages_sent, 2);
        assert_eq!(counters.total_characters, 17 + 3);
        assert_eq!(counters.total_words, 3);
    }

    #[test]
    fn response_time_average_tracks_samples() {
        let mut counters = AnalyticsCounters::default();
        counters.record_response_time(100);
        counters.record_response_time(300);
        assert_eq!(counters.response_times, vec![100, 300]);
        assert_eq!(counters.average_response_time, 200.0);
    }

    #[test]
    fn saved_fields_override_defaults() {
        let counters: AnalyticsCounters =
            serde_json::from_str(r#"{"messagesSent": 4, "sessionStart": 1700000000000}"#).unwrap();
        assert_eq!(counters.messages_sent, 4);
        assert_eq!(counters.session_start, 1_700_000_000_000);
        assert_eq!(counters.total_words, 0);
        assert!(counters.response_times.is_empty());
    }

    #[test]
    fn summary_mentions_counts() {
        let mut counters = AnalyticsCounters::default();
        counters.record_sent("one two");
        let summary = counters.summary();
        assert!(summary.contains("Messages sent: 1"));
        assert!(summary.contains("Words typed: 2 (2.0 per message)"));
    }
}
