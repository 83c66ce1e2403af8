use crate::capture::extractor::ProfileRecord;
use indexmap::IndexMap;
use serde_json::Value;

/// Deduplicated, insertion-ordered collection of captured records.
///
/// Records are keyed by uid, so the seen-uid set and the record sequence can
/// never disagree in length. The first occurrence of a uid wins; later
/// duplicates are dropped entirely.
#[derive(Debug, Clone, Default)]
pub struct CaptureState {
    records: IndexMap<String, ProfileRecord>,
    request_count: u64,
    raw_pages: Vec<Value>,
}

impl CaptureState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a page's records in order, returning how many were new
    pub fn append(&mut self, page_records: impl IntoIterator<Item = ProfileRecord>) -> usize {
        let mut added = 0;
        for record in page_records {
            if self.records.contains_key(&record.uid) {
                continue;
            }
            self.records.insert(record.uid.clone(), record);
            added += 1;
        }
        added
    }

    /// Count one processed page, logging its envelope when one was decoded
    pub fn record_request(&mut self, payload: Option<Value>) {
        self.request_count += 1;
        if let Some(payload) = payload {
            self.raw_pages.push(payload);
        }
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.records.contains_key(uid)
    }

    pub fn seen_uids(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn request_count(&self) -> u64 {
        self.request_count
    }

    pub fn raw_pages(&self) -> &[Value] {
        &self.raw_pages
    }

    /// Current records in first-seen order
    pub fn snapshot(&self) -> Vec<ProfileRecord> {
        self.records.values().cloned().collect()
    }

    /// Consume the state into (records, request count, raw page log)
    pub fn into_parts(self) -> (Vec<ProfileRecord>, u64, Vec<Value>) {
        (self.records.into_values().collect(), self.request_count, self.raw_pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(uid: &str, nickname: &str) -> ProfileRecord {
        ProfileRecord::new(uid).with_nickname(nickname)
    }

    #[test]
    fn test_append_dedups_within_page() {
        let mut state = CaptureState::new();
        let added = state.append(vec![rec("1", "a"), rec("1", "b"), rec("2", "c")]);

        assert_eq!(added, 2);
        assert_eq!(state.len(), 2);
        assert_eq!(state.snapshot()[0].nickname, "a");
    }

    #[test]
    fn test_duplicates_are_idempotent() {
        let mut state = CaptureState::new();
        state.append(vec![rec("1", "a"), rec("2", "b")]);
        let before = state.snapshot();

        assert_eq!(state.append(vec![rec("2", "changed"), rec("1", "changed")]), 0);
        assert_eq!(state.snapshot(), before);
        assert_eq!(state.seen_uids().count(), state.len());
    }

    #[test]
    fn test_first_seen_order() {
        let mut state = CaptureState::new();
        state.append(vec![rec("3", ""), rec("1", "")]);
        state.append(vec![rec("1", ""), rec("2", ""), rec("3", "")]);

        let uids: Vec<_> = state.seen_uids().collect();
        assert_eq!(uids, ["3", "1", "2"]);
    }

    #[test]
    fn test_request_count_independent_of_records() {
        let mut state = CaptureState::new();
        state.record_request(Some(json!({"status_code": 0})));
        state.record_request(None);
        state.record_request(Some(json!({"status_code": 1})));

        assert_eq!(state.request_count(), 3);
        assert_eq!(state.raw_pages().len(), 2);
        assert!(state.is_empty());
    }

    #[test]
    fn test_into_parts() {
        let mut state = CaptureState::new();
        state.append(vec![rec("9", "x")]);
        state.record_request(Some(json!({})));

        let (records, requests, raw) = state.into_parts();
        assert_eq!(records, vec![rec("9", "x")]);
        assert_eq!(requests, 1);
        assert_eq!(raw.len(), 1);
    }
}
