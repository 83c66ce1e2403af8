use crate::analysis::keywords::{
    CATEGORIES, CATEGORY_OTHER, CATEGORY_UNKNOWN, EVENT_KEYWORDS, SCHEDULE_KEYWORDS, SCHEDULE_LINE_KEYWORDS,
};
use crate::capture::ProfileRecord;
use crate::output::NO_BIO;
use regex::Regex;
use std::sync::OnceLock;

fn date_then_place() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d{1,2}[./]\d{1,2}\s*[\p{Han}]").unwrap())
}

fn month_day() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d{1,2}[./]\d{1,2}").unwrap())
}

fn han() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\p{Han}").unwrap())
}

fn is_blank_bio(bio: &str) -> bool {
    let bio = bio.trim();
    bio.is_empty() || bio == NO_BIO
}

fn contains_ignore_case(haystack_lower: &str, keyword: &str) -> bool {
    haystack_lower.contains(&keyword.to_lowercase())
}

/// Whether a bio looks like it lists an event schedule
pub fn has_schedule_info(bio: &str) -> bool {
    if is_blank_bio(bio) {
        return false;
    }

    let lower = bio.to_lowercase();
    SCHEDULE_KEYWORDS.iter().any(|kw| contains_ignore_case(&lower, kw)) || date_then_place().is_match(bio)
}

/// Lines of a bio that carry a date and a place, or a schedule keyword
pub fn extract_schedule_lines(bio: &str) -> Vec<String> {
    bio.split(['\n', '|', '｜'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| {
            let dated = month_day().is_match(line) && han().is_match(line);
            let lower = line.to_lowercase();
            dated || SCHEDULE_LINE_KEYWORDS.iter().any(|kw| contains_ignore_case(&lower, kw))
        })
        .map(str::to_string)
        .collect()
}

/// Category labels for a bio, joined with `/`
pub fn classify(bio: &str) -> String {
    if is_blank_bio(bio) {
        return CATEGORY_UNKNOWN.to_string();
    }

    let lower = bio.to_lowercase();
    let labels: Vec<&str> = CATEGORIES
        .iter()
        .filter(|(_, terms)| terms.iter().any(|term| lower.contains(term)))
        .map(|(label, _)| *label)
        .collect();

    if labels.is_empty() {
        CATEGORY_OTHER.to_string()
    } else {
        labels.join("/")
    }
}

/// Event keywords found in a record's bio or nickname
pub fn matched_event_keywords(record: &ProfileRecord) -> Vec<&'static str> {
    let text = format!("{} {}", record.signature, record.nickname).to_lowercase();
    EVENT_KEYWORDS
        .iter()
        .copied()
        .filter(|kw| contains_ignore_case(&text, kw))
        .collect()
}

/// Follower count with large values shortened, e.g. `15000` -> `1.5w`
pub fn format_followers(count: u64) -> String {
    if count >= 10_000 {
        format!("{:.1}w", count as f64 / 10_000.0)
    } else {
        count.to_string()
    }
}

/// Bio flattened to one line and cut to `max_chars` characters
pub fn snippet(bio: &str, max_chars: usize) -> String {
    bio.replace('\n', " ").chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_by_keyword() {
        assert!(has_schedule_info("近期行程见置顶"));
        assert!(has_schedule_info("Shanghai ComicFes day 1"));
        assert!(has_schedule_info("see you at the ONLY event"));
    }

    #[test]
    fn test_schedule_by_date_and_place() {
        assert!(has_schedule_info("2.8深圳"));
        assert!(has_schedule_info("1/24 广州"));
        assert!(!has_schedule_info("version 1.2 released"));
    }

    #[test]
    fn test_no_schedule_for_blank() {
        assert!(!has_schedule_info(""));
        assert!(!has_schedule_info("   "));
        assert!(!has_schedule_info(NO_BIO));
    }

    #[test]
    fn test_extract_schedule_lines() {
        let bio = "日常分享\n1.24 上海 某某漫展｜2.8深圳\n合作请私信|线下活动看动态";
        assert_eq!(
            extract_schedule_lines(bio),
            vec!["1.24 上海 某某漫展", "2.8深圳", "线下活动看动态"]
        );
    }

    #[test]
    fn test_extract_ignores_dates_without_place() {
        assert!(extract_schedule_lines("v1.2\n3/4").is_empty());
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(""), CATEGORY_UNKNOWN);
        assert_eq!(classify("just vibes"), CATEGORY_OTHER);
        assert_eq!(classify("Cosplay 爱好者 | 接约拍"), "Coser/Photographer");
        assert_eq!(classify("官方账号"), "Official");
    }

    #[test]
    fn test_matched_event_keywords() {
        let record = ProfileRecord::new("1").with_nickname("阿狸cos").with_signature("3.1 BW 上海");
        let matched = matched_event_keywords(&record);

        assert!(matched.contains(&"cos"));
        assert!(matched.contains(&"BW"));
        assert!(matched.contains(&"上海"));
        assert!(!matched.contains(&"北京"));
    }

    #[test]
    fn test_format_followers() {
        assert_eq!(format_followers(9999), "9999");
        assert_eq!(format_followers(15000), "1.5w");
        assert_eq!(format_followers(1_234_567), "123.5w");
    }

    #[test]
    fn test_snippet_counts_chars() {
        assert_eq!(snippet("深圳\n上海", 4), "深圳 上");
    }
}
