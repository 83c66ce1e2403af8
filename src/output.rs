//! Downstream consumer interface and the output-directory sink
//!
//! The JSON array of [`ProfileRecord`] in `all_followings.json` is the contract
//! consumed by the analysis stage; the other files are for humans.

use crate::analysis::matched_event_keywords;
use crate::capture::{CaptureReport, ProfileRecord};
use crate::error::{CaptureError, Result};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

pub const RECORDS_FILE: &str = "all_followings.json";
pub const RAW_PAGES_FILE: &str = "raw_pages.json";
pub const SUMMARY_FILE: &str = "bio_summary.txt";
pub const EVENTS_FILE: &str = "coser_events.txt";

pub(crate) const NO_BIO: &str = "(no bio)";
pub(crate) const RULE_WIDTH: usize = 60;

const BIO_PREFIX: &str = "    Bio: ";
const FOLLOWERS_PREFIX: &str = "    Followers: ";
const PROFILE_PREFIX: &str = "    Profile: ";

/// Receives the finalized result of a capture run
pub trait CaptureSink {
    fn consume(&mut self, report: &CaptureReport) -> Result<()>;
}

/// Writes a capture report into a directory
#[derive(Debug, Clone)]
pub struct OutputDir {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl OutputDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Files written by the last `consume`
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn write(&mut self, name: &str, contents: &str) -> Result<()> {
        let path = self.dir.join(name);
        fs::write(&path, contents)?;
        log::info!("Wrote {}", path.display());
        self.written.push(path);
        Ok(())
    }
}

impl CaptureSink for OutputDir {
    fn consume(&mut self, report: &CaptureReport) -> Result<()> {
        self.written.clear();

        if report.records.is_empty() {
            log::warn!("No users were captured; make sure you are logged in and scrolled the list");
            return Ok(());
        }

        fs::create_dir_all(&self.dir)?;

        // The record file goes first so a later failure cannot lose it
        self.write(RECORDS_FILE, &serde_json::to_string_pretty(&report.records)?)?;
        self.write(RAW_PAGES_FILE, &serde_json::to_string_pretty(&report.raw_pages)?)?;
        self.write(SUMMARY_FILE, &render_summary(&report.records))?;
        self.write(EVENTS_FILE, &render_event_matches(&report.records))?;

        Ok(())
    }
}

fn generated_at() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Trimmed bio with continuation lines indented under the label
fn bio_or_placeholder(signature: &str) -> String {
    let trimmed = signature.trim();
    if trimmed.is_empty() {
        NO_BIO.to_string()
    } else {
        trimmed.replace('\n', "\n    ")
    }
}

/// Numbered, human-readable listing of every captured user
pub fn render_summary(records: &[ProfileRecord]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Following list bio summary ({} users)", records.len());
    let _ = writeln!(out, "Generated: {}", generated_at());
    let _ = writeln!(out, "{}\n", "=".repeat(RULE_WIDTH));

    for (i, record) in records.iter().enumerate() {
        let _ = writeln!(out, "[{}] {}", i + 1, record.nickname);
        let _ = writeln!(out, "{}{}", BIO_PREFIX, bio_or_placeholder(&record.signature));
        let _ = writeln!(out, "{}{}", FOLLOWERS_PREFIX, record.follower_count);
        let _ = writeln!(out, "{}{}\n", PROFILE_PREFIX, record.profile_url());
    }

    out
}

/// Users whose bio or nickname mentions an event keyword
pub fn render_event_matches(records: &[ProfileRecord]) -> String {
    let matches: Vec<_> = records
        .iter()
        .filter_map(|record| {
            let keywords = matched_event_keywords(record);
            (!keywords.is_empty()).then_some((record, keywords))
        })
        .collect();

    let mut out = String::new();
    let _ = writeln!(out, "Users that may list convention schedules ({} users)", matches.len());
    let _ = writeln!(out, "Generated: {}", generated_at());
    let _ = writeln!(out, "{}\n", "=".repeat(RULE_WIDTH));

    for (i, (record, keywords)) in matches.iter().enumerate() {
        let _ = writeln!(out, "[{}] {}", i + 1, record.nickname);
        let _ = writeln!(out, "{}{}", BIO_PREFIX, bio_or_placeholder(&record.signature));
        let _ = writeln!(out, "    Matched keywords: {}", keywords.join(", "));
        let _ = writeln!(out, "{}{}\n", PROFILE_PREFIX, record.profile_url());
    }

    out
}

/// Parse a summary written by [`render_summary`].
///
/// Bio continuation lines are joined back with newlines. The summary does not
/// carry uids, so the entry number stands in for one.
pub fn parse_summary(text: &str) -> Vec<ProfileRecord> {
    let mut records = Vec::new();
    let mut current: Option<ProfileRecord> = None;
    let mut bio_lines: Vec<String> = Vec::new();

    for line in text.lines() {
        if let Some((index, nickname)) = parse_heading(line) {
            if let Some(record) = current.take() {
                records.push(finish_bio(record, &mut bio_lines));
            }
            current = Some(ProfileRecord::new(index).with_nickname(nickname));
            continue;
        }

        let Some(record) = current.as_mut() else {
            continue;
        };

        if let Some(bio) = line.strip_prefix(BIO_PREFIX) {
            bio_lines.push(bio.to_string());
        } else if let Some(count) = line.strip_prefix(FOLLOWERS_PREFIX) {
            record.follower_count = count.trim().parse().unwrap_or(0);
        } else if let Some(url) = line.strip_prefix(PROFILE_PREFIX) {
            if let Some((_, sec_uid)) = url.trim().rsplit_once("/user/") {
                record.sec_uid = sec_uid.to_string();
            }
        } else if line.starts_with("    ") && !bio_lines.is_empty() {
            bio_lines.push(line.trim().to_string());
        }
    }

    if let Some(record) = current {
        records.push(finish_bio(record, &mut bio_lines));
    }

    records
}

fn parse_heading(line: &str) -> Option<(&str, &str)> {
    let rest = line.strip_prefix('[')?;
    let (index, nickname) = rest.split_once("] ")?;
    if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((index, nickname.trim()))
}

fn finish_bio(record: ProfileRecord, bio_lines: &mut Vec<String>) -> ProfileRecord {
    let bio = bio_lines.join("\n").trim().to_string();
    bio_lines.clear();
    let bio = if bio == NO_BIO { String::new() } else { bio };
    record.with_signature(bio)
}

/// Load captured records from an output directory.
///
/// Prefers the JSON record file and falls back to the text summary.
pub fn load_records(dir: &Path) -> Result<(Vec<ProfileRecord>, PathBuf)> {
    let json_path = dir.join(RECORDS_FILE);
    if json_path.exists() {
        let records = serde_json::from_str(&fs::read_to_string(&json_path)?)?;
        return Ok((records, json_path));
    }

    let summary_path = dir.join(SUMMARY_FILE);
    if summary_path.exists() {
        let records = parse_summary(&fs::read_to_string(&summary_path)?);
        return Ok((records, summary_path));
    }

    Err(CaptureError::NoRecords(dir.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CaptureStats, Termination};
    use serde_json::json;
    use tempfile::TempDir;

    fn report(records: Vec<ProfileRecord>) -> CaptureReport {
        CaptureReport {
            records,
            request_count: 1,
            raw_pages: vec![json!({"status_code": 0})],
            stats: CaptureStats::default(),
            termination: Termination::Stopped,
        }
    }

    fn alice() -> ProfileRecord {
        ProfileRecord::new("1")
            .with_nickname("Alice")
            .with_signature("coser\n2.8深圳 漫展")
            .with_sec_uid("MS4wLjABAAAA")
            .with_follower_count(15000)
    }

    #[test]
    fn test_output_dir_writes_all_files() {
        let tmp = TempDir::new().unwrap();
        let mut sink = OutputDir::new(tmp.path().join("out"));

        sink.consume(&report(vec![alice(), ProfileRecord::new("2").with_nickname("Bob")]))
            .unwrap();

        assert_eq!(sink.written().len(), 4);
        let records: Vec<ProfileRecord> =
            serde_json::from_str(&fs::read_to_string(sink.path().join(RECORDS_FILE)).unwrap()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], alice());

        let events = fs::read_to_string(sink.path().join(EVENTS_FILE)).unwrap();
        assert!(events.contains("(1 users)"));
        assert!(events.contains("[1] Alice"));
        assert!(!events.contains("Bob"));
    }

    #[test]
    fn test_empty_capture_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let mut sink = OutputDir::new(tmp.path().join("out"));

        sink.consume(&report(Vec::new())).unwrap();
        assert!(sink.written().is_empty());
        assert!(!sink.path().exists());
    }

    #[test]
    fn test_summary_round_trip() {
        let bob = ProfileRecord::new("2").with_nickname("Bob").with_sec_uid("XYZ");
        let text = render_summary(&[alice(), bob]);
        assert!(text.contains("    Bio: (no bio)"));

        let parsed = parse_summary(&text);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].nickname, "Alice");
        assert_eq!(parsed[0].signature, "coser\n2.8深圳 漫展");
        assert_eq!(parsed[0].follower_count, 15000);
        assert_eq!(parsed[0].sec_uid, "MS4wLjABAAAA");
        assert_eq!(parsed[1].signature, "");
        assert_eq!(parsed[1].sec_uid, "XYZ");
    }

    #[test]
    fn test_load_prefers_json() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(SUMMARY_FILE), render_summary(&[alice()])).unwrap();
        fs::write(
            tmp.path().join(RECORDS_FILE),
            serde_json::to_string(&vec![ProfileRecord::new("9")]).unwrap(),
        )
        .unwrap();

        let (records, source) = load_records(tmp.path()).unwrap();
        assert_eq!(records[0].uid, "9");
        assert!(source.ends_with(RECORDS_FILE));
    }

    #[test]
    fn test_load_falls_back_to_summary() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(SUMMARY_FILE), render_summary(&[alice()])).unwrap();

        let (records, source) = load_records(tmp.path()).unwrap();
        assert_eq!(records[0].nickname, "Alice");
        assert!(source.ends_with(SUMMARY_FILE));
    }

    #[test]
    fn test_load_missing() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(load_records(tmp.path()), Err(CaptureError::NoRecords(_))));
    }
}
