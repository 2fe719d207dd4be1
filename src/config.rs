//! Configuration management

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Stream container format requested from the service
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum StreamFormat {
    #[default]
    Flv,
    Ts,
    Mp4,
    H264,
}

impl StreamFormat {
    /// Feed path segment for this format
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamFormat::Flv => "flv",
            StreamFormat::Ts => "ts",
            StreamFormat::Mp4 => "mp4",
            StreamFormat::H264 => "h264",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "flv" => Some(StreamFormat::Flv),
            "ts" => Some(StreamFormat::Ts),
            "mp4" => Some(StreamFormat::Mp4),
            "h264" => Some(StreamFormat::H264),
            _ => None,
        }
    }
}

/// Built-in user agent choices, selectable by index
pub const USER_AGENTS: &[(&str, &str)] = &[
    ("Default", "catchup_tv/0.1"),
    (
        "Firefox",
        "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0",
    ),
    (
        "Chrome",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    ),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: String,
    #[serde(default)]
    pub stream_format: StreamFormat,
    #[serde(default = "default_feed_auto_update")]
    pub feed_auto_update_index: u8,
    #[serde(default)]
    pub selected_user_agent: usize,
    #[serde(default)]
    pub custom_user_agent: String,
    #[serde(default)]
    pub use_custom_user_agent: bool,
    // When the channel feed cache was last refreshed (Unix timestamp)
    #[serde(default)]
    pub last_feed_fetch: i64,
}

fn default_feed_auto_update() -> u8 {
    4 // 1 Day
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            stream_format: StreamFormat::Flv,
            feed_auto_update_index: 4, // 1 Day
            selected_user_agent: 0,
            custom_user_agent: String::new(),
            use_custom_user_agent: false,
            last_feed_fetch: 0,
        }
    }
}

impl AppConfig {
    fn config_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("catchup_tv");
        fs::create_dir_all(&path).ok();
        path.push("config.json");
        path
    }

    pub fn load() -> Self {
        let path = Self::config_path();

        if path.exists() {
            if let Ok(content) = fs::read_to_string(&path) {
                if let Ok(config) = serde_json::from_str(&content) {
                    return config;
                }
            }
        }

        Self::default()
    }

    pub fn save(&self) {
        let path = Self::config_path();
        if let Ok(content) = serde_json::to_string_pretty(self) {
            let _ = fs::write(path, content);
        }
    }

    /// Effective User-Agent header value
    pub fn user_agent(&self) -> &str {
        if self.use_custom_user_agent && !self.custom_user_agent.is_empty() {
            return &self.custom_user_agent;
        }

        USER_AGENTS
            .get(self.selected_user_agent)
            .map(|(_, ua)| *ua)
            .unwrap_or(USER_AGENTS[0].1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_json_round_trip() {
        let mut config = AppConfig::default();
        config.server = "http://example.com".to_string();
        config.stream_format = StreamFormat::Ts;
        config.feed_auto_update_index = 2;

        let json = serde_json::to_string(&config).unwrap();
        let restored: AppConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.server, "http://example.com");
        assert_eq!(restored.stream_format, StreamFormat::Ts);
        assert_eq!(restored.feed_auto_update_index, 2);
    }

    #[test]
    fn test_config_missing_and_unknown_fields_tolerated() {
        let config: AppConfig =
            serde_json::from_str(r#"{"server":"http://example.com","legacy_key":true}"#).unwrap();

        assert_eq!(config.server, "http://example.com");
        assert_eq!(config.stream_format, StreamFormat::Flv);
        assert_eq!(config.feed_auto_update_index, 4);
        assert!(!config.use_custom_user_agent);
    }

    #[test]
    fn test_stream_format_names() {
        assert_eq!(StreamFormat::from_name("ts"), Some(StreamFormat::Ts));
        assert_eq!(StreamFormat::from_name("avi"), None);
        assert_eq!(StreamFormat::Flv.as_str(), "flv");
    }

    #[test]
    fn test_user_agent_selection() {
        let mut config = AppConfig::default();
        assert_eq!(config.user_agent(), USER_AGENTS[0].1);

        config.selected_user_agent = 99;
        assert_eq!(config.user_agent(), USER_AGENTS[0].1);

        config.use_custom_user_agent = true;
        config.custom_user_agent = "custom/1.0".to_string();
        assert_eq!(config.user_agent(), "custom/1.0");
    }
}
