//! AREDL level document
//!
//! ```json
//! {
//!   "legacy": false,
//!   "verifications": [
//!     { "video_url": "https://...", "submitted_by": { "global_name": "...", "username": "..." } }
//!   ]
//! }
//! ```

use serde_json::Value;

use crate::cache::CacheEntry;

const UNKNOWN_SUBMITTER: &str = "Unknown";

/// Names shown before the rest are dropped from the label
const MAX_DISPLAYED_NAMES: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub video_url: String,
    pub submitter: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LevelResponse {
    pub legacy: bool,
    pub verifications: Vec<Verification>,
}

impl LevelResponse {
    /// Parse a response body.
    ///
    /// Only malformed JSON is an error. Fields of an unexpected type are
    /// treated as absent.
    pub fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        let document: Value = serde_json::from_slice(body)?;

        let legacy = document
            .get("legacy")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let verifications = document
            .get("verifications")
            .and_then(Value::as_array)
            .map(|records| records.iter().map(parse_verification).collect())
            .unwrap_or_default();

        Ok(Self {
            legacy,
            verifications,
        })
    }

    /// Submitter names in first-seen order, duplicates removed
    pub fn submitters(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for verification in &self.verifications {
            if !names.contains(&verification.submitter.as_str()) {
                names.push(&verification.submitter);
            }
        }
        names
    }

    /// First non-empty video URL
    pub fn video_url(&self) -> &str {
        self.verifications
            .iter()
            .map(|v| v.video_url.as_str())
            .find(|url| !url.is_empty())
            .unwrap_or_default()
    }

    pub fn verifier_text(&self) -> String {
        let names = self.submitters();
        let shown = &names[..names.len().min(MAX_DISPLAYED_NAMES)];
        shown.join(" & ")
    }

    pub fn into_entry(self, fetched_at: u64) -> CacheEntry {
        CacheEntry::new(
            self.verifier_text(),
            self.video_url().to_string(),
            self.legacy,
            fetched_at,
        )
    }
}

fn parse_verification(record: &Value) -> Verification {
    let video_url = record
        .get("video_url")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let user = record.get("submitted_by");
    let name_field = |field: &str| {
        user.and_then(|u| u.get(field))
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
    };
    let submitter = name_field("global_name")
        .or_else(|| name_field("username"))
        .unwrap_or(UNKNOWN_SUBMITTER)
        .to_string();

    Verification {
        video_url,
        submitter,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_for(body: &str) -> CacheEntry {
        LevelResponse::parse(body.as_bytes()).unwrap().into_entry(100)
    }

    #[test]
    fn test_two_verifiers() {
        let entry = entry_for(
            r#"{
                "legacy": false,
                "verifications": [
                    {"video_url": "https://youtu.be/first", "submitted_by": {"global_name": "Alice"}},
                    {"video_url": "https://youtu.be/second", "submitted_by": {"global_name": "Bob"}}
                ]
            }"#,
        );
        assert_eq!(entry.verifier_text, "Alice & Bob");
        assert_eq!(entry.video_url, "https://youtu.be/first");
        assert_eq!(entry.fetched_at, 100);
    }

    #[test]
    fn test_duplicate_submitter_listed_once() {
        let entry = entry_for(
            r#"{"verifications": [
                {"video_url": "a", "submitted_by": {"global_name": "Alice"}},
                {"video_url": "b", "submitted_by": {"global_name": "Alice"}}
            ]}"#,
        );
        assert_eq!(entry.verifier_text, "Alice");
    }

    #[test]
    fn test_only_two_names_displayed() {
        let response = LevelResponse::parse(
            br#"{"verifications": [
                {"submitted_by": {"global_name": "A"}},
                {"submitted_by": {"global_name": "B"}},
                {"submitted_by": {"global_name": "C"}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(response.submitters(), vec!["A", "B", "C"]);
        assert_eq!(response.verifier_text(), "A & B");
    }

    #[test]
    fn test_name_fallbacks() {
        let response = LevelResponse::parse(
            br#"{"verifications": [
                {"submitted_by": {"global_name": null, "username": "bob_gd"}},
                {"submitted_by": {"global_name": "", "username": "carol"}},
                {"submitted_by": {}},
                {}
            ]}"#,
        )
        .unwrap();
        let names: Vec<_> = response
            .verifications
            .iter()
            .map(|v| v.submitter.as_str())
            .collect();
        assert_eq!(names, vec!["bob_gd", "carol", "Unknown", "Unknown"]);
    }

    #[test]
    fn test_first_non_empty_video() {
        let entry = entry_for(
            r#"{"verifications": [
                {"video_url": "", "submitted_by": {"username": "a"}},
                {"submitted_by": {"username": "b"}},
                {"video_url": "https://youtu.be/third", "submitted_by": {"username": "c"}}
            ]}"#,
        );
        assert_eq!(entry.video_url, "https://youtu.be/third");
    }

    #[test]
    fn test_no_verifications_is_negative() {
        let entry = entry_for(r#"{"legacy": true, "verifications": []}"#);
        assert!(entry.is_negative());
        assert!(entry.video_url.is_empty());
        assert!(entry.legacy);

        assert!(entry_for("{}").is_negative());
    }

    #[test]
    fn test_wrong_types_are_absent() {
        let entry = entry_for(r#"{"legacy": "yes", "verifications": {"not": "an array"}}"#);
        assert_eq!(entry, CacheEntry::negative(100));
    }

    #[test]
    fn test_malformed_json_is_error() {
        assert!(LevelResponse::parse(b"<html>502</html>").is_err());
    }
}
