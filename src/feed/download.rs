//! Feed downloader with HTTPS support
//!
//! Fetches programme feeds to disk with retries and hands them to the
//! parser. Gzip-compressed feeds (.mediarss.gz) are detected from the file
//! content, not the name.

use flate2::read::GzDecoder;
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::time::Duration;

use super::parser::ProgrammeFeedParser;

/// Download configuration
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Maximum retry attempts
    pub max_retries: u32,
    /// Delay between retries in milliseconds
    pub retry_delay_ms: u64,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
    /// Read timeout in seconds
    pub read_timeout_secs: u64,
    /// Chunk size for reading (bytes)
    pub chunk_size: usize,
    /// User agent string
    pub user_agent: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 2000,
            connect_timeout_secs: 30,
            read_timeout_secs: 120,
            chunk_size: 64 * 1024,
            user_agent: "catchup_tv/0.1".to_string(),
        }
    }
}

/// Download progress callback: (downloaded_bytes, total_bytes)
pub type ProgressCallback = Box<dyn Fn(u64, Option<u64>) + Send>;

/// Feed downloader with retry support
pub struct FeedDownloader;

impl FeedDownloader {
    fn create_agent(config: &DownloadConfig) -> ureq::Agent {
        ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.read_timeout_secs)))
            .timeout_connect(Some(Duration::from_secs(config.connect_timeout_secs)))
            .build()
            .new_agent()
    }

    /// Download a feed to a file with retry support (HTTP and HTTPS)
    pub fn download_to_file(
        url: &str,
        output_path: &str,
        config: &DownloadConfig,
        progress: Option<ProgressCallback>,
    ) -> Result<String, String> {
        let agent = Self::create_agent(config);
        let mut attempts = 0;

        loop {
            attempts += 1;

            match Self::try_download(&agent, url, output_path, config, &progress) {
                Ok(total) => {
                    if let Some(ref cb) = progress {
                        cb(total, Some(total));
                    }
                    return Ok(output_path.to_string());
                }
                Err(e) => {
                    if attempts >= config.max_retries {
                        return Err(format!("Download failed after {} attempts: {}", attempts, e));
                    }

                    std::thread::sleep(Duration::from_millis(config.retry_delay_ms));
                }
            }
        }
    }

    fn try_download(
        agent: &ureq::Agent,
        url: &str,
        output_path: &str,
        config: &DownloadConfig,
        progress: &Option<ProgressCallback>,
    ) -> Result<u64, String> {
        let response = agent
            .get(url)
            .header("User-Agent", &config.user_agent)
            .call()
            .map_err(|e| format!("Request failed: {}", e))?;

        let status = response.status();
        if status != 200 && status != 206 {
            return Err(format!("HTTP error: {}", status));
        }

        let total_size: Option<u64> = response
            .headers()
            .get("Content-Length")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok());

        let mut file = std::fs::File::create(output_path)
            .map_err(|e| format!("Create file failed: {}", e))?;

        let mut reader = response.into_body().into_reader();
        let mut buffer = vec![0u8; config.chunk_size];
        let mut downloaded: u64 = 0;

        loop {
            match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => {
                    file.write_all(&buffer[..n])
                        .map_err(|e| format!("Write failed: {}", e))?;
                    downloaded += n as u64;

                    if let Some(ref cb) = progress {
                        cb(downloaded, total_size);
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(format!("Read failed: {}", e)),
            }
        }

        file.flush().map_err(|e| format!("Flush failed: {}", e))?;
        Ok(downloaded)
    }

    /// Download a feed and parse it in one step
    pub fn download_and_parse(
        url: &str,
        config: &DownloadConfig,
        progress: Option<ProgressCallback>,
    ) -> Result<ProgrammeFeedParser, String> {
        let ext = if url.ends_with(".gz") { "mediarss.gz" } else { "mediarss" };
        let temp_path = std::env::temp_dir().join(format!("catchup_tv_feed.{}", ext));
        let temp_path_str = temp_path.to_string_lossy().to_string();

        Self::download_to_file(url, &temp_path_str, config, progress)?;

        let result = Self::parse_file(&temp_path_str);

        let _ = std::fs::remove_file(&temp_path);

        result
    }

    /// Parse a feed file from disk - auto-detects gzip compression
    pub fn parse_file(path: &str) -> Result<ProgrammeFeedParser, String> {
        let file = std::fs::File::open(path).map_err(|e| e.to_string())?;
        let mut reader = BufReader::with_capacity(64 * 1024, file);

        // gzip magic number is 1f 8b
        let mut magic = [0u8; 2];
        let gzipped = match reader.read_exact(&mut magic) {
            Ok(()) => magic[0] == 0x1f && magic[1] == 0x8b,
            // Too short for a magic number; let the parser report it
            Err(_) => false,
        };
        reader
            .seek(SeekFrom::Start(0))
            .map_err(|e| e.to_string())?;

        let mut parser = ProgrammeFeedParser::new();
        if gzipped {
            let decoder = GzDecoder::new(reader);
            parser.parse(BufReader::with_capacity(64 * 1024, decoder))?;
        } else {
            parser.parse(reader)?;
        }

        Ok(parser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write as _;

    const FEED: &str = r#"<rss><channel>
      <item><title>Compressed Listing</title></item>
    </channel></rss>"#;

    fn temp_file(name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_parse_plain_file() {
        let path = temp_file("catchup_tv_test_plain.mediarss", FEED.as_bytes());

        let parser = FeedDownloader::parse_file(&path.to_string_lossy()).unwrap();
        assert_eq!(parser.programmes().len(), 1);
        assert_eq!(parser.programmes()[0].title, "Compressed Listing");

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_parse_gzipped_file() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(FEED.as_bytes()).unwrap();
        let path = temp_file("catchup_tv_test_gz.mediarss.gz", &encoder.finish().unwrap());

        let parser = FeedDownloader::parse_file(&path.to_string_lossy()).unwrap();
        assert_eq!(parser.programmes().len(), 1);
        assert_eq!(parser.programmes()[0].title, "Compressed Listing");

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_parse_file_missing() {
        assert!(FeedDownloader::parse_file("/nonexistent/feed.mediarss").is_err());
    }

    #[test]
    fn test_download_gives_up_after_max_retries() {
        let config = DownloadConfig {
            max_retries: 2,
            retry_delay_ms: 1,
            ..DownloadConfig::default()
        };

        let out = std::env::temp_dir().join("catchup_tv_test_retry.mediarss");
        let err = FeedDownloader::download_to_file(
            "this is not a url",
            &out.to_string_lossy(),
            &config,
            None,
        )
        .unwrap_err();

        assert!(err.contains("after 2 attempts"), "unexpected error: {}", err);
    }

    #[test]
    fn test_empty_file_is_invalid_feed() {
        let path = temp_file("catchup_tv_test_empty.mediarss", b"");

        let err = FeedDownloader::parse_file(&path.to_string_lossy()).unwrap_err();
        assert!(!err.is_empty());

        let _ = std::fs::remove_file(&path);
    }
}
