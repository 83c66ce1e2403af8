use crate::capture::decoder::PaginationHint;

const UNKNOWN: &str = "?";

/// Read-only view of capture progress after a page was processed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Items in the latest page
    pub page_items: usize,

    /// Records the latest page added
    pub added: usize,

    /// Records captured so far
    pub total_records: usize,

    pub request_count: u64,

    pub hint: PaginationHint,
}

impl Progress {
    /// Human-readable progress line; missing hints render as placeholders
    pub fn line(&self) -> String {
        let total = self
            .hint
            .total_count
            .map_or_else(|| UNKNOWN.to_string(), |t| t.to_string());
        let more = match self.hint.has_more {
            Some(true) => "more pages available",
            Some(false) => "end of list",
            None => "pagination unknown",
        };

        format!(
            "Page #{}: {} users ({} new), {} unique so far of {} ({})",
            self.request_count, self.page_items, self.added, self.total_records, total, more
        )
    }
}
