use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

pub const SETTINGS_FILENAME: &str = "settings.json";

pub const CLASSIC_ENDPOINT: &str = "https://api.aredl.net/v2/api/aredl/levels";
pub const PLATFORMER_ENDPOINT: &str = "https://api.aredl.net/v2/api/arepl/levels";

/// Extreme demon
pub const DEFAULT_MIN_DIFFICULTY: u8 = 6;

/// settings.json
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
    /// キャッシュをメモリ上のみに保持する（デフォルト: false）
    #[serde(default)]
    pub disable_cache: bool,
    /// 検索対象とする最低デーモン難易度（デフォルト: 6）
    #[serde(default = "default_min_difficulty")]
    pub min_difficulty: u8,
    /// ベリファイア名の横に動画リンクを表示する（デフォルト: true）
    #[serde(default = "default_true")]
    pub show_video: bool,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub endpoints: EndpointSettings,
}

/// Base URLs of the two level lists
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EndpointSettings {
    #[serde(default = "default_classic")]
    pub classic: String,
    #[serde(default = "default_platformer")]
    pub platformer: String,
}

fn default_true() -> bool {
    true
}

fn default_min_difficulty() -> u8 {
    DEFAULT_MIN_DIFFICULTY
}

fn default_user_agent() -> String {
    "Mozilla/5.0".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_classic() -> String {
    CLASSIC_ENDPOINT.to_string()
}

fn default_platformer() -> String {
    PLATFORMER_ENDPOINT.to_string()
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            classic: default_classic(),
            platformer: default_platformer(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            disable_cache: false,
            min_difficulty: default_min_difficulty(),
            show_video: default_true(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            endpoints: EndpointSettings::default(),
        }
    }
}

impl Settings {
    /// 保存ディレクトリからsettings.jsonを読み込む
    pub fn load_from_dir(dir: &Path) -> Self {
        Self::load_from_path(&dir.join(SETTINGS_FILENAME))
    }

    pub fn load_from_path(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(settings) => settings,
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
