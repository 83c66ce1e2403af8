use crate::capture::decoder::RawPage;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Base URL of a user's profile page
pub const PROFILE_URL_BASE: &str = "https://www.douyin.com/user/";

/// Canonical user profile harvested from the following list.
///
/// `uid` is the identity key; two records with the same `uid` are the same user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProfileRecord {
    /// Stable, non-empty user identifier
    pub uid: String,

    #[serde(default)]
    pub nickname: String,

    /// Free-text bio, may span several lines
    #[serde(default)]
    pub signature: String,

    /// Identifier used in profile URLs
    #[serde(default)]
    pub sec_uid: String,

    #[serde(default)]
    pub follower_count: u64,

    #[serde(default)]
    pub unique_id: String,
}

impl ProfileRecord {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            nickname: String::new(),
            signature: String::new(),
            sec_uid: String::new(),
            follower_count: 0,
            unique_id: String::new(),
        }
    }

    pub fn with_nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = nickname.into();
        self
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = signature.into();
        self
    }

    pub fn with_sec_uid(mut self, sec_uid: impl Into<String>) -> Self {
        self.sec_uid = sec_uid.into();
        self
    }

    pub fn with_follower_count(mut self, follower_count: u64) -> Self {
        self.follower_count = follower_count;
        self
    }

    pub fn profile_url(&self) -> String {
        format!("{}{}", PROFILE_URL_BASE, self.sec_uid)
    }

    /// Normalize one list entry. Returns `None` when no usable uid is present.
    pub fn from_item(item: &Value) -> Option<Self> {
        let uid = match item.get("uid")? {
            Value::String(s) if !s.trim().is_empty() => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };

        Some(Self {
            uid,
            nickname: string_field(item, "nickname"),
            signature: string_field(item, "signature"),
            sec_uid: string_field(item, "sec_uid"),
            follower_count: item.get("follower_count").and_then(count_field).unwrap_or(0),
            unique_id: string_field(item, "unique_id"),
        })
    }
}

/// Non-negative whole number, whether encoded as an integer or as a float like `100.0`
fn count_field(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }

    let f = value.as_f64()?;
    (f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64).then_some(f as u64)
}

fn string_field(item: &Value, key: &str) -> String {
    item.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

/// Records extracted from one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// In page order
    pub records: Vec<ProfileRecord>,

    /// Items dropped for lacking a uid
    pub skipped: usize,
}

/// Map every item of a page to a record, keeping page order
pub fn extract_records(page: &RawPage) -> Extraction {
    let mut extraction = Extraction::default();

    for (position, item) in page.items.iter().enumerate() {
        match ProfileRecord::from_item(item) {
            Some(record) => extraction.records.push(record),
            None => {
                log::debug!("Skipping item {} without a uid", position);
                extraction.skipped += 1;
            }
        }
    }

    extraction
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page(items: Value) -> RawPage {
        RawPage::from_envelope(json!({"status_code": 0, "followings": items})).unwrap()
    }

    #[test]
    fn test_full_item() {
        let item = json!({
            "uid": "100",
            "nickname": "Alice",
            "signature": "line one\nline two",
            "sec_uid": "MS4wLjAB",
            "follower_count": 12345,
            "unique_id": "alice_cos"
        });

        let record = ProfileRecord::from_item(&item).unwrap();
        assert_eq!(record.uid, "100");
        assert_eq!(record.signature, "line one\nline two");
        assert_eq!(record.follower_count, 12345);
        assert_eq!(record.unique_id, "alice_cos");
        assert_eq!(record.profile_url(), "https://www.douyin.com/user/MS4wLjAB");
    }

    #[test]
    fn test_defaults_for_missing_fields() {
        let record = ProfileRecord::from_item(&json!({"uid": "7"})).unwrap();
        assert_eq!(record, ProfileRecord::new("7"));
    }

    #[test]
    fn test_non_numeric_follower_count() {
        let record = ProfileRecord::from_item(&json!({"uid": "7", "follower_count": "lots"})).unwrap();
        assert_eq!(record.follower_count, 0);

        let record = ProfileRecord::from_item(&json!({"uid": "7", "follower_count": -3})).unwrap();
        assert_eq!(record.follower_count, 0);
    }

    #[test]
    fn test_whole_float_follower_count() {
        let record = ProfileRecord::from_item(&json!({"uid": "7", "follower_count": 100.0})).unwrap();
        assert_eq!(record.follower_count, 100);

        let record = ProfileRecord::from_item(&json!({"uid": "7", "follower_count": 2.5})).unwrap();
        assert_eq!(record.follower_count, 0);

        let record = ProfileRecord::from_item(&json!({"uid": "7", "follower_count": -4.0})).unwrap();
        assert_eq!(record.follower_count, 0);
    }

    #[test]
    fn test_numeric_uid() {
        let record = ProfileRecord::from_item(&json!({"uid": 98765})).unwrap();
        assert_eq!(record.uid, "98765");
    }

    #[test]
    fn test_missing_or_empty_uid() {
        assert!(ProfileRecord::from_item(&json!({"nickname": "noUid"})).is_none());
        assert!(ProfileRecord::from_item(&json!({"uid": ""})).is_none());
        assert!(ProfileRecord::from_item(&json!({"uid": null})).is_none());
        assert!(ProfileRecord::from_item(&json!("not an object")).is_none());
    }

    #[test]
    fn test_extract_skips_bad_items_and_keeps_order() {
        let extraction = extract_records(&page(json!([
            {"uid": "B", "nickname": "second"},
            {"nickname": "noUid"},
            {"uid": "A", "nickname": "first"}
        ])));

        assert_eq!(extraction.skipped, 1);
        let uids: Vec<_> = extraction.records.iter().map(|r| r.uid.as_str()).collect();
        assert_eq!(uids, ["B", "A"]);
    }

    #[test]
    fn test_serialized_field_names() {
        let value = serde_json::to_value(ProfileRecord::new("1")).unwrap();
        let mut keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(
            keys,
            ["follower_count", "nickname", "sec_uid", "signature", "uid", "unique_id"]
        );
    }
}
