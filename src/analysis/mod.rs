//! Offline analysis of captured bios
//!
//! Consumes the ordered record collection produced by a capture run and picks
//! out users whose bios list convention or offline event schedules. Matching is
//! keyword and pattern based:
//! - [`has_schedule_info`]: whether a bio mentions a schedule at all
//! - [`extract_schedule_lines`]: the individual schedule lines of a bio
//! - [`classify`]: coarse account categories
//! - [`llm_prompt`]: a prompt for structured extraction by an external model

pub mod bio;
pub mod keywords;
pub mod prompt;

pub use bio::{classify, extract_schedule_lines, format_followers, has_schedule_info, matched_event_keywords, snippet};
pub use prompt::llm_prompt;

use crate::capture::ProfileRecord;
use crate::output::{NO_BIO, RULE_WIDTH};
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt::Write as _;

pub const SCHEDULE_SUMMARY_FILE: &str = "schedule_summary.txt";
pub const SCHEDULE_JSON_FILE: &str = "schedule_users.json";
pub const PROMPT_FILE: &str = "extract_schedule_prompt.txt";

/// One user with schedule information, as written to JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleEntry {
    pub nickname: String,
    pub signature: String,
    pub follower_count: u64,
    pub category: String,
    pub schedule_lines: Vec<String>,
    pub profile_url: String,
}

impl ScheduleEntry {
    pub fn from_record(record: &ProfileRecord) -> Self {
        Self {
            nickname: record.nickname.clone(),
            signature: record.signature.clone(),
            follower_count: record.follower_count,
            category: classify(&record.signature),
            schedule_lines: extract_schedule_lines(&record.signature),
            profile_url: record.profile_url(),
        }
    }
}

/// Records split by whether their bio lists a schedule
#[derive(Debug, Clone)]
pub struct ScheduleReport<'a> {
    pub total: usize,
    pub schedule_users: Vec<&'a ProfileRecord>,
    pub others: Vec<&'a ProfileRecord>,

    /// Category counts over all records, most common first
    pub categories: Vec<(String, usize)>,
}

/// Partition records and count categories
pub fn analyze(records: &[ProfileRecord]) -> ScheduleReport<'_> {
    let (schedule_users, others): (Vec<_>, Vec<_>) =
        records.iter().partition(|record| has_schedule_info(&record.signature));

    let mut counts: IndexMap<String, usize> = IndexMap::new();
    for record in records {
        *counts.entry(classify(&record.signature)).or_insert(0) += 1;
    }
    let mut categories: Vec<_> = counts.into_iter().collect();
    // Stable sort keeps first-seen order among equal counts
    categories.sort_by(|a, b| b.1.cmp(&a.1));

    ScheduleReport {
        total: records.len(),
        schedule_users,
        others,
        categories,
    }
}

impl ScheduleReport<'_> {
    pub fn entries(&self) -> Vec<ScheduleEntry> {
        self.schedule_users
            .iter()
            .map(|record| ScheduleEntry::from_record(record))
            .collect()
    }

    /// Numbered listing of schedule users; bios without extractable lines are
    /// shown as a snippet of `snippet_chars` characters
    pub fn render_schedules(&self, snippet_chars: usize, with_links: bool) -> String {
        let mut out = String::new();

        for (i, record) in self.schedule_users.iter().enumerate() {
            let _ = writeln!(
                out,
                "[{}] {}  ({} followers)  [{}]",
                i + 1,
                record.nickname,
                format_followers(record.follower_count),
                classify(&record.signature)
            );

            let lines = extract_schedule_lines(&record.signature);
            if lines.is_empty() {
                let _ = writeln!(out, "    📝 {}", snippet(&record.signature, snippet_chars));
            } else {
                for line in lines {
                    let _ = writeln!(out, "    📅 {}", line);
                }
            }
            if with_links {
                let _ = writeln!(out, "    🔗 {}", record.profile_url());
            }
            out.push('\n');
        }

        out
    }

    pub fn render_categories(&self) -> String {
        let mut out = String::from("Categories:\n");
        for (category, count) in &self.categories {
            let _ = writeln!(out, "  {}: {}", category, count);
        }
        out
    }

    /// One line per user without schedule information
    pub fn render_others(&self) -> String {
        let mut out = String::new();
        for record in &self.others {
            let bio = snippet(&record.signature, 60);
            let bio = if bio.trim().is_empty() { NO_BIO.to_string() } else { bio };
            let _ = writeln!(out, "  {}: {}", record.nickname, bio);
        }
        out
    }

    /// Contents of the schedule summary file
    pub fn render_summary_file(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Convention / offline schedule summary (from {} users)", self.total);
        let _ = writeln!(out, "Generated: {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
        let _ = writeln!(out, "With schedule information: {} users", self.schedule_users.len());
        let _ = writeln!(out, "{}\n", "=".repeat(RULE_WIDTH));
        out.push_str(&self.render_schedules(120, true));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<ProfileRecord> {
        vec![
            ProfileRecord::new("1")
                .with_nickname("Alice")
                .with_signature("coser\n2.8深圳 漫展")
                .with_sec_uid("A1")
                .with_follower_count(15000),
            ProfileRecord::new("2").with_nickname("Bob").with_signature("just vibes"),
            ProfileRecord::new("3").with_nickname("Carol").with_signature("近期有线下活动"),
            ProfileRecord::new("4").with_nickname("Dan"),
        ]
    }

    #[test]
    fn test_analyze_partitions_in_order() {
        let records = records();
        let report = analyze(&records);

        let names: Vec<_> = report.schedule_users.iter().map(|r| r.nickname.as_str()).collect();
        assert_eq!(names, ["Alice", "Carol"]);
        assert_eq!(report.others.len(), 2);
        assert_eq!(report.total, 4);
    }

    #[test]
    fn test_category_histogram_sorted() {
        let records = records();
        let report = analyze(&records);

        assert_eq!(report.categories[0], ("Other".to_string(), 2));
        let total: usize = report.categories.iter().map(|(_, n)| n).sum();
        assert_eq!(total, 4);
    }

    #[test]
    fn test_entries() {
        let records = records();
        let entries = analyze(&records).entries();

        assert_eq!(entries[0].category, "Coser");
        assert_eq!(entries[0].schedule_lines, vec!["2.8深圳 漫展"]);
        assert_eq!(entries[0].profile_url, "https://www.douyin.com/user/A1");
    }

    #[test]
    fn test_render_schedules() {
        let records = records();
        let text = analyze(&records).render_schedules(100, true);

        assert!(text.contains("[1] Alice  (1.5w followers)  [Coser]"));
        assert!(text.contains("    📅 2.8深圳 漫展"));
        assert!(text.contains("    🔗 https://www.douyin.com/user/A1"));
        assert!(text.contains("[2] Carol"));
    }

    #[test]
    fn test_render_others() {
        let records = records();
        let text = analyze(&records).render_others();
        assert!(text.contains("  Bob: just vibes"));
        assert!(text.contains("  Dan: (no bio)"));
    }
}
