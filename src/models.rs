//! Data models for the catchup TV client

use chrono::{DateTime, Local, NaiveTime};

/// One programme listing entry from a channel feed
#[derive(Debug, Clone, PartialEq)]
pub struct Programme {
    pub title: String,
    pub description: String,
    /// Programme ID, -1 when it could not be determined
    pub id: i64,
    /// Channel ID, -1 when it could not be determined
    pub channel_id: i64,
    /// Scheduled start in the local time zone
    pub start: Option<DateTime<Local>>,
    /// Duration in seconds
    pub duration: i64,
}

impl Default for Programme {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            id: -1,
            channel_id: -1,
            start: None,
            duration: 0,
        }
    }
}

/// Preview image taken at some offset within a programme
#[derive(Debug, Clone, PartialEq)]
pub struct Thumbnail {
    pub url: String,
    /// Offset within the programme, as a time of day
    pub time: NaiveTime,
}
