//! Catchup service feed client
//!
//! Builds the service's Media RSS feed URLs and fetches them as text.
//! Channel listings, full-text search and season passes each have their own
//! feed endpoint.

use std::time::Duration;

/// Client for a catchup service publishing Media RSS programme feeds.
pub struct FeedClient {
    server: String,
    format: String,
    user_agent: String,
}

impl FeedClient {
    /// `format` is the stream container the service should list, e.g. "flv"
    pub fn new(server: &str, format: &str) -> Self {
        Self {
            server: server.trim_end_matches('/').to_string(),
            format: format.to_string(),
            user_agent: "catchup_tv/0.1".to_string(),
        }
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    /// Listing feed for one channel
    pub fn channel_feed_url(&self, channel_id: i64) -> String {
        format!(
            "{}/feed/channels/{}/{}.mediarss",
            self.server, channel_id, self.format
        )
    }

    /// Full-text search feed
    pub fn search_feed_url(&self, query: &str) -> String {
        format!("{}/feed/search/?q={}", self.server, escape_query(query))
    }

    /// Season pass (recording subscription) feed
    pub fn season_pass_feed_url(&self, pass_id: i64) -> String {
        format!("{}/feedbeta/seasonpasses/{}", self.server, pass_id)
    }

    /// Fetch a feed document as text
    pub fn fetch(&self, url: &str) -> Result<String, String> {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(60)))
            .timeout_connect(Some(Duration::from_secs(30)))
            .build()
            .new_agent();

        let mut response = agent
            .get(url)
            .header("User-Agent", &self.user_agent)
            .call()
            .map_err(|e| format!("Request failed: {}", e))?;

        if response.status() != 200 {
            return Err(format!("HTTP error: {}", response.status()));
        }

        response
            .body_mut()
            .read_to_string()
            .map_err(|e| format!("Read failed: {}", e))
    }
}

/// Percent-escape the characters that break a query string
fn escape_query(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());

    for c in query.chars() {
        match c {
            ' ' => escaped.push_str("%20"),
            '%' => escaped.push_str("%25"),
            '&' => escaped.push_str("%26"),
            '+' => escaped.push_str("%2B"),
            '#' => escaped.push_str("%23"),
            '?' => escaped.push_str("%3F"),
            _ => escaped.push(c),
        }
    }

    escaped
}
