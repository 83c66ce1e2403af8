use crate::analysis::bio::has_schedule_info;
use crate::capture::ProfileRecord;
use chrono::{Datelike, NaiveDate};
use std::fmt::Write as _;

/// Year assumed for a bio date that only gives a month: this year, or last
/// year once that month has already passed
pub fn schedule_year(today: NaiveDate, month: u32) -> i32 {
    if month < today.month() {
        today.year() - 1
    } else {
        today.year()
    }
}

/// Build a prompt asking an external model to turn schedule bios into
/// structured events. Only users with schedule information are included.
pub fn llm_prompt(records: &[ProfileRecord]) -> String {
    llm_prompt_for_date(records, chrono::Local::now().date_naive())
}

pub fn llm_prompt_for_date(records: &[ProfileRecord], today: NaiveDate) -> String {
    let year = today.year();
    let previous = year - 1;
    let example_year = schedule_year(today, 2);

    let mut prompt = format!(
        r#"You are a data extraction assistant. Below are short-video platform user bios. Extract every convention or offline event schedule entry from them.

Requirements:
1. For each entry extract: date, city, event name, event type (signing / convention / pop-up / performance / other)
2. Format dates as YYYY-MM-DD. The year defaults to {year}; if the month has already passed (today is {today}), use {previous}
3. Split date ranges (e.g. 1.1-1.3) into a start and an end date
4. Output a JSON array

Example output:
```json
[
  {{
    "nickname": "xxx",
    "events": [
      {{
        "date_start": "{example_year}-02-08",
        "date_end": "{example_year}-02-08",
        "city": "深圳",
        "event_name": "AL迎春之约",
        "type": "signing"
      }}
    ]
  }}
]
```

User data:
"#,
        today = today.format("%Y-%m-%d"),
    );

    for record in records.iter().filter(|r| has_schedule_info(&r.signature)) {
        let _ = write!(prompt, "\n---\nNickname: {}\nBio: {}\n", record.nickname, record.signature);
    }

    prompt.push_str("\n---\nExtract all schedule entries and output JSON.");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_schedule_year() {
        let today = date(2026, 3, 10);
        assert_eq!(schedule_year(today, 2), 2025);
        assert_eq!(schedule_year(today, 3), 2026);
        assert_eq!(schedule_year(today, 12), 2026);
        assert_eq!(schedule_year(date(2026, 1, 5), 1), 2026);
    }

    #[test]
    fn test_prompt_includes_only_schedule_users() {
        let records = vec![
            ProfileRecord::new("1").with_nickname("Alice").with_signature("2.8深圳 签售"),
            ProfileRecord::new("2").with_nickname("Bob").with_signature("just vibes"),
        ];

        let prompt = llm_prompt_for_date(&records, date(2026, 1, 15));
        assert!(prompt.contains("Nickname: Alice\nBio: 2.8深圳 签售"));
        assert!(!prompt.contains("Nickname: Bob"));
        assert!(prompt.contains("\"date_start\": \"2026-02-08\""));
        assert!(prompt.ends_with("output JSON."));
    }

    #[test]
    fn test_prompt_states_month_rule() {
        let prompt = llm_prompt_for_date(&[], date(2026, 3, 10));
        assert!(prompt.contains("The year defaults to 2026; if the month has already passed (today is 2026-03-10), use 2025"));
        assert!(prompt.contains("\"date_start\": \"2025-02-08\""));
    }
}
