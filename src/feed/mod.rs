//! Programme feed module
//!
//! Contains the Media RSS feed parser, the downloader and related types.

mod download;
mod parser;

// Re-export public types
pub use download::{DownloadConfig, FeedDownloader, ProgressCallback};
pub use parser::ProgrammeFeedParser;

use chrono::{DateTime, Local, NaiveTime};

/// Feed auto-refresh interval settings
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum FeedAutoUpdate {
    Off,
    Hours1,
    Hours6,
    Hours12,
    #[default]
    Day1,
}

impl FeedAutoUpdate {
    /// Get interval in seconds, or None if auto-refresh is off
    pub fn as_secs(&self) -> Option<i64> {
        match self {
            FeedAutoUpdate::Off => None,
            FeedAutoUpdate::Hours1 => Some(3600),
            FeedAutoUpdate::Hours6 => Some(6 * 3600),
            FeedAutoUpdate::Hours12 => Some(12 * 3600),
            FeedAutoUpdate::Day1 => Some(24 * 3600),
        }
    }

    /// Get human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            FeedAutoUpdate::Off => "Off",
            FeedAutoUpdate::Hours1 => "1 Hour",
            FeedAutoUpdate::Hours6 => "6 Hours",
            FeedAutoUpdate::Hours12 => "12 Hours",
            FeedAutoUpdate::Day1 => "1 Day",
        }
    }

    /// Convert to index for storage
    pub fn to_index(&self) -> u8 {
        match self {
            FeedAutoUpdate::Off => 0,
            FeedAutoUpdate::Hours1 => 1,
            FeedAutoUpdate::Hours6 => 2,
            FeedAutoUpdate::Hours12 => 3,
            FeedAutoUpdate::Day1 => 4,
        }
    }

    /// Create from storage index
    pub fn from_index(i: u8) -> Self {
        match i {
            0 => FeedAutoUpdate::Off,
            1 => FeedAutoUpdate::Hours1,
            2 => FeedAutoUpdate::Hours6,
            3 => FeedAutoUpdate::Hours12,
            4 => FeedAutoUpdate::Day1,
            _ => FeedAutoUpdate::Day1,
        }
    }
}

/// Format a programme start as local date and time
pub fn format_datetime(dt: &DateTime<Local>) -> String {
    dt.format("%Y-%m-%d %H:%M").to_string()
}

/// Format a thumbnail offset as HH:MM:SS
pub fn format_time(t: &NaiveTime) -> String {
    t.format("%H:%M:%S").to_string()
}

/// Format a duration in seconds for listing output
pub fn format_duration(secs: i64) -> String {
    if secs <= 0 {
        return "--".to_string();
    }
    if secs < 3600 {
        return format!("{} min", (secs + 59) / 60);
    }
    format!("{}h{:02}", secs / 3600, (secs % 3600) / 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_update_index_round_trip() {
        for i in 0..=4u8 {
            assert_eq!(FeedAutoUpdate::from_index(i).to_index(), i);
        }
        // Unknown indices fall back to the default interval
        assert_eq!(FeedAutoUpdate::from_index(99), FeedAutoUpdate::Day1);
    }

    #[test]
    fn test_auto_update_intervals() {
        assert_eq!(FeedAutoUpdate::Off.as_secs(), None);
        assert_eq!(FeedAutoUpdate::Hours1.as_secs(), Some(3600));
        assert_eq!(FeedAutoUpdate::Day1.as_secs(), Some(86400));
        assert_eq!(FeedAutoUpdate::default(), FeedAutoUpdate::Day1);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "--");
        assert_eq!(format_duration(90), "2 min");
        assert_eq!(format_duration(1800), "30 min");
        assert_eq!(format_duration(5400), "1h30");
    }
}
