use localreel_common::DeliveryMode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub stream: StreamConfig,

    #[serde(default)]
    pub player: PlayerConfig,

    #[serde(default)]
    pub assets: AssetsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// SQLite database holding the saved directory capability
    #[serde(default = "default_database")]
    pub database: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
        }
    }
}

fn default_database() -> PathBuf {
    PathBuf::from("~/.local/share/localreel/localreel.db")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamConfig {
    /// Bytes read and appended per window in chunked mode
    #[serde(default = "default_window_bytes")]
    pub window_bytes: u64,

    /// Delivery mode used when `play` is not given `--mode`
    #[serde(default)]
    pub default_mode: DeliveryMode,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            window_bytes: default_window_bytes(),
            default_mode: DeliveryMode::default(),
        }
    }
}

fn default_window_bytes() -> u64 {
    localreel_media::DEFAULT_WINDOW_LEN
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlayerConfig {
    /// External player that reads media from stdin
    #[serde(default = "default_player_command")]
    pub command: String,

    #[serde(default = "default_player_args")]
    pub args: Vec<String>,

    /// MIME types the player accepts for chunked streams.
    /// Empty means every descriptor in the built-in table.
    #[serde(default)]
    pub supported_types: Vec<String>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            command: default_player_command(),
            args: default_player_args(),
            supported_types: Vec::new(),
        }
    }
}

fn default_player_command() -> String {
    "mpv".to_string()
}

fn default_player_args() -> Vec<String> {
    vec!["--really-quiet".to_string(), "-".to_string()]
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssetsConfig {
    /// Root under which each cache version gets its own directory
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Name of the current cache version
    #[serde(default = "default_cache_version")]
    pub version: String,

    /// Shell assets fetched on install
    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,

    /// Upstream the shell is fetched from (e.g. "http://localhost:3000")
    #[serde(default)]
    pub origin: Option<String>,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            version: default_cache_version(),
            manifest: default_manifest(),
            origin: None,
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("~/.cache/localreel/assets")
}

fn default_cache_version() -> String {
    "video-stream-pwa-v1".to_string()
}

fn default_manifest() -> Vec<String> {
    ["/", "/index.html", "/app.js", "/manifest.json", "/style.css"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}
