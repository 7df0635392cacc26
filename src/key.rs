use std::fmt;

use serde::{Deserialize, Serialize};

/// Suffix AREDL uses to address the two-player record of a level.
pub const DUO_SUFFIX: &str = "_2p";

/// Which record of a level a lookup is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    Solo,
    Duo,
}

impl Variant {
    pub fn from_duo(duo: bool) -> Self {
        if duo { Variant::Duo } else { Variant::Solo }
    }
}

/// Lookup key of the verifier cache.
///
/// The string form is the level id, followed by [`DUO_SUFFIX`] for the duo
/// record. The same string is used as the last path segment of the fetch URL
/// and as the key of the persisted document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(level_id: i64, variant: Variant) -> Self {
        match variant {
            Variant::Solo => Self(level_id.to_string()),
            Variant::Duo => Self(format!("{}{}", level_id, DUO_SUFFIX)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for CacheKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&str> for CacheKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Remote list a level is ranked on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Button-based levels (AREDL)
    Classic,
    /// Movement-based levels (AREPL)
    Platformer,
}

impl Endpoint {
    pub fn for_level(platformer: bool) -> Self {
        if platformer {
            Endpoint::Platformer
        } else {
            Endpoint::Classic
        }
    }
}

/// Everything the policy needs to know about a level shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelRequest {
    pub level_id: i64,
    pub variant: Variant,
    pub platformer: bool,
    /// Demon difficulty ordinal as reported by the game (6 = extreme demon)
    pub difficulty: u8,
}

impl LevelRequest {
    pub fn new(level_id: i64) -> Self {
        Self {
            level_id,
            variant: Variant::Solo,
            platformer: false,
            difficulty: 0,
        }
    }

    pub fn duo(mut self, duo: bool) -> Self {
        self.variant = Variant::from_duo(duo);
        self
    }

    pub fn platformer(mut self, platformer: bool) -> Self {
        self.platformer = platformer;
        self
    }

    pub fn difficulty(mut self, difficulty: u8) -> Self {
        self.difficulty = difficulty;
        self
    }

    /// Ids `<= 0` belong to unsaved or local levels and are never looked up.
    pub fn is_valid(&self) -> bool {
        self.level_id > 0
    }

    pub fn is_eligible(&self, min_difficulty: u8) -> bool {
        self.difficulty >= min_difficulty
    }

    pub fn key(&self) -> CacheKey {
        CacheKey::new(self.level_id, self.variant)
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::for_level(self.platformer)
    }
}
