use indexmap::IndexMap;

/// A response whose body is ready to be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyResponse {
    pub request_id: String,
    pub url: String,
}

/// Outcome of registering a `ResponseStarted` event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// URL does not match the target pattern
    Ignored,

    /// The correlator was closed for new registrations
    Closed,

    Tracked,

    /// Tracked, but the map was full and the oldest entry was dropped
    TrackedWithEviction { evicted: String },
}

/// Matches `ResponseStarted` to a later `ResponseReady` by request id.
///
/// Only URLs containing the target pattern are tracked. The pending map is
/// bounded; insertion order is kept so the oldest entry is evicted first.
#[derive(Debug, Clone)]
pub struct RequestCorrelator {
    pattern: String,
    pending: IndexMap<String, String>,
    max_pending: usize,
    accepting: bool,
    evicted: u64,
}

impl RequestCorrelator {
    pub fn new(pattern: impl Into<String>, max_pending: usize) -> Self {
        Self {
            pattern: pattern.into(),
            pending: IndexMap::new(),
            max_pending: max_pending.max(1),
            accepting: true,
            evicted: 0,
        }
    }

    pub fn matches(&self, url: &str) -> bool {
        url.contains(&self.pattern)
    }

    pub fn on_response_started(&mut self, request_id: &str, url: &str) -> Registration {
        if !self.matches(url) {
            return Registration::Ignored;
        }
        if !self.accepting {
            log::debug!("Ignoring request {} after stop: {}", request_id, url);
            return Registration::Closed;
        }

        let mut evicted = None;
        if !self.pending.contains_key(request_id) && self.pending.len() >= self.max_pending {
            evicted = self.pending.shift_remove_index(0).map(|(id, _)| id);
            self.evicted += 1;
        }

        log::trace!("Tracking request {}: {}", request_id, url);
        self.pending.insert(request_id.to_string(), url.to_string());

        match evicted {
            Some(evicted) => Registration::TrackedWithEviction { evicted },
            None => Registration::Tracked,
        }
    }

    /// Takes the pending entry for `request_id`, if it is tracked
    pub fn on_response_ready(&mut self, request_id: &str) -> Option<ReadyResponse> {
        self.pending
            .shift_remove(request_id)
            .map(|url| ReadyResponse {
                request_id: request_id.to_string(),
                url,
            })
    }

    /// Stop tracking new requests; already pending ones can still complete
    pub fn close(&mut self) {
        self.accepting = false;
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Entries dropped because the map was full
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    pub fn is_pending(&self, request_id: &str) -> bool {
        self.pending.contains_key(request_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST_URL: &str = "https://www.douyin.com/aweme/v1/web/user/following/list/?count=20";

    #[test]
    fn test_ignores_unrelated_urls() {
        let mut correlator = RequestCorrelator::new("user/following/list", 8);
        assert_eq!(
            correlator.on_response_started("1", "https://www.douyin.com/aweme/v1/web/feed/"),
            Registration::Ignored
        );
        assert_eq!(correlator.pending_len(), 0);
        assert_eq!(correlator.on_response_ready("1"), None);
    }

    #[test]
    fn test_started_then_ready() {
        let mut correlator = RequestCorrelator::new("user/following/list", 8);
        assert_eq!(correlator.on_response_started("42.1", LIST_URL), Registration::Tracked);
        assert!(correlator.is_pending("42.1"));

        let ready = correlator.on_response_ready("42.1").unwrap();
        assert_eq!(ready.request_id, "42.1");
        assert_eq!(ready.url, LIST_URL);
        assert_eq!(correlator.pending_len(), 0);
    }

    #[test]
    fn test_ready_consumed_once() {
        let mut correlator = RequestCorrelator::new("user/following/list", 8);
        correlator.on_response_started("1", LIST_URL);
        assert!(correlator.on_response_ready("1").is_some());
        assert!(correlator.on_response_ready("1").is_none());
    }

    #[test]
    fn test_out_of_order_requests() {
        let mut correlator = RequestCorrelator::new("user/following/list", 8);
        correlator.on_response_started("5", LIST_URL);
        correlator.on_response_started("3", LIST_URL);

        assert_eq!(correlator.on_response_ready("3").unwrap().request_id, "3");
        assert_eq!(correlator.on_response_ready("5").unwrap().request_id, "5");
    }

    #[test]
    fn test_evicts_oldest_when_full() {
        let mut correlator = RequestCorrelator::new("user/following/list", 2);
        correlator.on_response_started("a", LIST_URL);
        correlator.on_response_started("b", LIST_URL);
        assert_eq!(
            correlator.on_response_started("c", LIST_URL),
            Registration::TrackedWithEviction {
                evicted: "a".to_string()
            }
        );
        assert_eq!(correlator.pending_len(), 2);
        assert!(!correlator.is_pending("a"));
        assert!(correlator.is_pending("c"));
        assert_eq!(correlator.evicted(), 1);
    }

    #[test]
    fn test_reregistering_same_id_does_not_evict() {
        let mut correlator = RequestCorrelator::new("user/following/list", 1);
        correlator.on_response_started("a", LIST_URL);
        assert_eq!(correlator.on_response_started("a", LIST_URL), Registration::Tracked);
        assert_eq!(correlator.evicted(), 0);
    }

    #[test]
    fn test_closed_rejects_new_but_completes_pending() {
        let mut correlator = RequestCorrelator::new("user/following/list", 8);
        correlator.on_response_started("1", LIST_URL);
        correlator.close();

        assert!(!correlator.is_accepting());
        assert_eq!(correlator.on_response_started("2", LIST_URL), Registration::Closed);
        assert!(correlator.on_response_ready("1").is_some());
        assert!(correlator.on_response_ready("2").is_none());
    }
}
