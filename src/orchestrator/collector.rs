//! Probe results and the ordered log that collects them

use serde::Serialize;
use serde_json::{Map, Value};

/// Structured payload carried by a result
pub type Payload = Map<String, Value>;

/// Outcome of one probe
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeResult {
    #[serde(rename = "test_name")]
    pub name: String,
    pub success: bool,
    pub message: String,
    pub data: Payload,
    /// Local completion time, `HH:MM:SS`
    pub timestamp: String,
}

impl ProbeResult {
    pub fn passed(name: impl Into<String>, message: impl Into<String>, data: Payload) -> Self {
        Self::new(name.into(), true, message.into(), data)
    }

    pub fn failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(name.into(), false, message.into(), Payload::new())
    }

    fn new(name: String, success: bool, message: String, data: Payload) -> Self {
        Self {
            name,
            success,
            message,
            data,
            timestamp: chrono::Local::now().format("%H:%M:%S").to_string(),
        }
    }
}

/// Counts over a result log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Summary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

/// Append-only, ordered log of results
///
/// Entries are never reordered, dropped or deduplicated by name.
#[derive(Debug, Clone, Default)]
pub struct ResultLog {
    entries: Vec<ProbeResult>,
}

impl ResultLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, result: ProbeResult) {
        self.entries.push(result);
    }

    pub fn extend(&mut self, results: impl IntoIterator<Item = ProbeResult>) {
        for result in results {
            self.append(result);
        }
    }

    /// Recompute the summary from the current contents
    pub fn summary(&self) -> Summary {
        let total = self.entries.len();
        let successful = self.entries.iter().filter(|r| r.success).count();
        Summary {
            total,
            successful,
            failed: total - successful,
        }
    }

    /// Whether every recorded result succeeded
    pub fn all_succeeded(&self) -> bool {
        self.entries.iter().all(|r| r.success)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProbeResult> {
        self.entries.iter()
    }

    pub fn into_results(self) -> Vec<ProbeResult> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_format() {
        let r = ProbeResult::failed("x", "nope");
        let parts: Vec<&str> = r.timestamp.split(':').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts.iter().all(|p| p.len() == 2 && p.parse::<u8>().is_ok()));
        assert!(r.data.is_empty());
    }

    #[test]
    fn test_summary_tracks_every_append() {
        let mut log = ResultLog::new();
        assert_eq!(log.summary(), Summary::default());
        assert!(log.all_succeeded());

        let outcomes = [true, false, true, true, false];
        for (i, ok) in outcomes.iter().enumerate() {
            let r = if *ok {
                ProbeResult::passed(format!("step {}", i), "ok", Payload::new())
            } else {
                ProbeResult::failed(format!("step {}", i), "failed")
            };
            log.append(r);

            let s = log.summary();
            assert_eq!(s.total, i + 1);
            assert_eq!(s.successful + s.failed, s.total);
        }

        assert_eq!(
            log.summary(),
            Summary {
                total: 5,
                successful: 3,
                failed: 2
            }
        );
        assert!(!log.all_succeeded());
    }

    #[test]
    fn test_duplicate_names_are_kept_in_order() {
        let mut log = ResultLog::new();
        log.append(ProbeResult::passed("same", "first", Payload::new()));
        log.append(ProbeResult::failed("same", "second"));

        let messages: Vec<_> = log.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second"]);
        assert_eq!(log.summary().total, 2);
    }

    #[test]
    fn test_serializes_with_report_field_names() {
        let r = ProbeResult::passed("Get Analytics", "ok", Payload::new());
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["test_name"], "Get Analytics");
        assert!(v.get("name").is_none());
        assert!(v["data"].is_object());
        assert!(v["timestamp"].is_string());
    }
}
