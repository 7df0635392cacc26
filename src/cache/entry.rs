use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Deserializer, Serialize};

/// Verification metadata of one level record.
///
/// An entry with an empty `verifier_text` is a negative result: the level was
/// checked and nothing was found. It is persisted and served like any other
/// entry so the level is not fetched again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(rename = "verifier", default)]
    pub verifier_text: String,
    #[serde(rename = "video", default)]
    pub video_url: String,
    /// Older cache files wrote this flag as `0`/`1`
    #[serde(default, deserialize_with = "bool_or_flag")]
    pub legacy: bool,
    /// Seconds since the unix epoch
    #[serde(rename = "timestamp", default)]
    pub fetched_at: u64,
}

impl CacheEntry {
    pub fn new(verifier_text: String, video_url: String, legacy: bool, fetched_at: u64) -> Self {
        Self {
            verifier_text,
            video_url,
            legacy,
            fetched_at,
        }
    }

    pub fn negative(fetched_at: u64) -> Self {
        Self {
            fetched_at,
            ..Self::default()
        }
    }

    pub fn is_negative(&self) -> bool {
        self.verifier_text.is_empty()
    }

    /// Text shown next to the level
    pub fn label(&self) -> String {
        if self.is_negative() {
            "Not on AREDL".to_string()
        } else {
            format!("Verified by: {}", self.verifier_text)
        }
    }
}

pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(u8),
}

fn bool_or_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Int(n) => n != 0,
    })
}
