use std::time::Duration;

/// URL fragment of the following-list API
pub const DEFAULT_URL_PATTERN: &str = "user/following/list";

/// Options controlling a capture run
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    /// Only responses whose URL contains this substring are captured
    pub url_pattern: String,

    /// How long to wait for in-flight responses after a stop signal
    pub drain_grace: Duration,

    /// Maximum number of tracked in-flight responses
    pub max_pending: usize,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            url_pattern: DEFAULT_URL_PATTERN.to_string(),
            drain_grace: Duration::from_secs(3),
            max_pending: 256,
        }
    }
}

impl CaptureOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn url_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.url_pattern = pattern.into();
        self
    }

    pub fn drain_grace(mut self, grace: Duration) -> Self {
        self.drain_grace = grace;
        self
    }

    pub fn max_pending(mut self, max: usize) -> Self {
        self.max_pending = max;
        self
    }
}
