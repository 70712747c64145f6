//! Bot configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;
use yukino_types::UserId;

/// Which voice channel a message author must occupy for their messages to
/// be read aloud.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeakerGate {
    /// The author may be in any voice channel of the guild.
    #[default]
    AnyVoiceChannel,
    /// The author must share the bot's voice channel.
    SameChannel,
}

/// Top-level bot configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Bot identity and relay policy.
    #[serde(default)]
    pub bot: BotConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// VOICEVOX engine settings.
    #[serde(default)]
    pub voicevox: VoicevoxConfig,

    /// Open JTalk engine settings.
    #[serde(default)]
    pub openjtalk: OpenJtalkConfig,

    /// Keep-alive HTTP endpoint settings.
    #[serde(default)]
    pub keep_alive: KeepAliveConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Bot identity and relay policy.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// The operator's user id; always permitted to run voice commands.
    #[serde(default)]
    pub owner_id: UserId,

    /// Which voice channel a speaker must occupy for relay.
    #[serde(default)]
    pub speaker_gate: SpeakerGate,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    /// Busy timeout for SQLite connections, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled SQLite connections.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

/// VOICEVOX engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct VoicevoxConfig {
    /// Base URL of a running VOICEVOX engine.
    #[serde(default = "default_voicevox_url")]
    pub base_url: String,
}

/// Open JTalk engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenJtalkConfig {
    /// Path to the `open_jtalk` binary.
    #[serde(default = "default_openjtalk_binary")]
    pub binary: String,

    /// Path to the dictionary directory.
    #[serde(default = "default_openjtalk_dictionary")]
    pub dictionary_dir: String,

    /// Path to the HTS voice file.
    #[serde(default = "default_openjtalk_voice")]
    pub voice: String,
}

/// Keep-alive HTTP endpoint configuration (uptime pings).
#[derive(Debug, Clone, Deserialize)]
pub struct KeepAliveConfig {
    /// Host address to bind to.
    #[serde(default = "default_keep_alive_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_keep_alive_port")]
    pub port: u16,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "yukino_bot=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_db_path() -> String {
    "yukino.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    8
}

fn default_voicevox_url() -> String {
    "http://127.0.0.1:50021".to_string()
}

fn default_openjtalk_binary() -> String {
    "open_jtalk".to_string()
}

fn default_openjtalk_dictionary() -> String {
    "/var/lib/mecab/dic/open-jtalk/naist-jdic".to_string()
}

fn default_openjtalk_voice() -> String {
    "/usr/share/hts-voice/nitech-jp-atr503-m001/nitech_jp_atr503_m001.htsvoice".to_string()
}

fn default_keep_alive_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0))
}

fn default_keep_alive_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            owner_id: 0,
            speaker_gate: SpeakerGate::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
        }
    }
}

impl Default for VoicevoxConfig {
    fn default() -> Self {
        Self {
            base_url: default_voicevox_url(),
        }
    }
}

impl Default for OpenJtalkConfig {
    fn default() -> Self {
        Self {
            binary: default_openjtalk_binary(),
            dictionary_dir: default_openjtalk_dictionary(),
            voice: default_openjtalk_voice(),
        }
    }
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            host: default_keep_alive_host(),
            port: default_keep_alive_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `YUKINO_OWNER_ID` overrides `bot.owner_id`
/// - `YUKINO_SPEAKER_GATE` overrides `bot.speaker_gate`
///   (`any_voice_channel` or `same_channel`)
/// - `YUKINO_DB_PATH` overrides `database.path`
/// - `YUKINO_VOICEVOX_URL` overrides `voicevox.base_url`
/// - `YUKINO_OPENJTALK_BINARY` overrides `openjtalk.binary`
/// - `YUKINO_KEEP_ALIVE_PORT` overrides `keep_alive.port`
/// - `YUKINO_LOG_LEVEL` overrides `logging.level`
/// - `YUKINO_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    // Environment variable overrides
    if let Ok(owner) = std::env::var("YUKINO_OWNER_ID") {
        if let Ok(parsed) = owner.parse() {
            config.bot.owner_id = parsed;
        }
    }
    if let Ok(gate) = std::env::var("YUKINO_SPEAKER_GATE") {
        match gate.as_str() {
            "any_voice_channel" => config.bot.speaker_gate = SpeakerGate::AnyVoiceChannel,
            "same_channel" => config.bot.speaker_gate = SpeakerGate::SameChannel,
            other => tracing::warn!(value = other, "unknown YUKINO_SPEAKER_GATE, ignoring"),
        }
    }
    if let Ok(db_path) = std::env::var("YUKINO_DB_PATH") {
        config.database.path = db_path;
    }
    if let Ok(url) = std::env::var("YUKINO_VOICEVOX_URL") {
        config.voicevox.base_url = url;
    }
    if let Ok(binary) = std::env::var("YUKINO_OPENJTALK_BINARY") {
        config.openjtalk.binary = binary;
    }
    if let Ok(port) = std::env::var("YUKINO_KEEP_ALIVE_PORT") {
        if let Ok(parsed) = port.parse() {
            config.keep_alive.port = parsed;
        }
    }
    if let Ok(level) = std::env::var("YUKINO_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(json) = std::env::var("YUKINO_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }

    Ok(config)
}
