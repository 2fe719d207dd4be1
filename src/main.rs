//! Catchup TV listings client
//!
//! Console client for a TV catchup service that publishes its programme
//! listings as Media RSS feeds. Fetches (or reads) a feed, parses it and
//! prints the programme listing.

use std::path::PathBuf;
use std::process::ExitCode;

mod api;
mod config;
mod feed;
mod models;

use api::FeedClient;
use config::{AppConfig, StreamFormat};
use feed::{
    DownloadConfig, FeedAutoUpdate, FeedDownloader, ProgrammeFeedParser, ProgressCallback,
};

/// Where to read the feed from
enum Source {
    File(String),
    Url(String),
    Channel(i64),
    Search(String),
    SeasonPass(i64),
}

fn timestamp_now() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

fn info(msg: &str) {
    println!("[{}] [INFO] {}", timestamp_now(), msg);
}

fn error(msg: &str) {
    eprintln!("[{}] [ERROR] {}", timestamp_now(), msg);
}

fn usage() {
    println!("Catchup TV listings client");
    println!();
    println!("Usage: catchup_tv [OPTIONS]");
    println!();
    println!("Sources:");
    println!("  --file PATH       Parse a feed file from disk (gzip is detected)");
    println!("  --url URL         Download and parse a feed URL");
    println!("  --channel ID      Fetch the listing feed for a channel (cached)");
    println!("  --search QUERY    Fetch the search feed for QUERY");
    println!("  --pass ID         Fetch a season pass feed");
    println!();
    println!("Options:");
    println!("  --thumbs          Also print the collected thumbnails");
    println!();
    println!("Settings (persisted):");
    println!("  --set-server URL  Set the service base URL");
    println!("  --set-format FMT  Preferred stream format: flv, ts, mp4, h264");
    println!("  --set-auto N      Channel feed refresh interval:");
    for i in 0..=4u8 {
        println!("                      {} = {}", i, FeedAutoUpdate::from_index(i).label());
    }
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut config = AppConfig::load();
    let mut source: Option<Source> = None;
    let mut show_thumbs = false;

    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        match arg {
            "--help" | "-h" => {
                usage();
                return ExitCode::SUCCESS;
            }
            "--thumbs" => show_thumbs = true,
            "--file" | "--url" | "--channel" | "--search" | "--pass" | "--set-server"
            | "--set-format" | "--set-auto" => {
                i += 1;
                let value = match args.get(i) {
                    Some(v) => v.clone(),
                    None => {
                        error(&format!("{} needs a value", arg));
                        return ExitCode::FAILURE;
                    }
                };

                match arg {
                    "--file" => source = Some(Source::File(value)),
                    "--url" => source = Some(Source::Url(value)),
                    "--search" => source = Some(Source::Search(value)),
                    "--channel" => match value.parse() {
                        Ok(id) => source = Some(Source::Channel(id)),
                        Err(_) => {
                            error("--channel needs a numeric channel ID");
                            return ExitCode::FAILURE;
                        }
                    },
                    "--pass" => match value.parse() {
                        Ok(id) => source = Some(Source::SeasonPass(id)),
                        Err(_) => {
                            error("--pass needs a numeric season pass ID");
                            return ExitCode::FAILURE;
                        }
                    },
                    "--set-server" => {
                        config.server = value.trim_end_matches('/').to_string();
                        config.save();
                        info(&format!("Server set to {}", config.server));
                        return ExitCode::SUCCESS;
                    }
                    "--set-format" => match StreamFormat::from_name(&value) {
                        Some(format) => {
                            config.stream_format = format;
                            config.save();
                            info(&format!("Stream format set to {}", format.as_str()));
                            return ExitCode::SUCCESS;
                        }
                        None => {
                            error("--set-format expects one of: flv, ts, mp4, h264");
                            return ExitCode::FAILURE;
                        }
                    },
                    "--set-auto" => match value.parse::<u8>() {
                        Ok(index) => {
                            let auto = FeedAutoUpdate::from_index(index);
                            config.feed_auto_update_index = auto.to_index();
                            config.save();
                            info(&format!("Feed refresh set to {}", auto.label()));
                            return ExitCode::SUCCESS;
                        }
                        Err(_) => {
                            error("--set-auto needs an index, see --help");
                            return ExitCode::FAILURE;
                        }
                    },
                    _ => {}
                }
            }
            _ => {
                error(&format!("Unknown option {}", arg));
                usage();
                return ExitCode::FAILURE;
            }
        }
        i += 1;
    }

    let source = match source {
        Some(source) => source,
        None => {
            usage();
            return ExitCode::FAILURE;
        }
    };

    match run(source, show_thumbs, &mut config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error(&e);
            ExitCode::FAILURE
        }
    }
}

fn run(source: Source, show_thumbs: bool, config: &mut AppConfig) -> Result<(), String> {
    let parser = match source {
        Source::File(path) => {
            info(&format!("Reading feed from {}", path));
            FeedDownloader::parse_file(&path)?
        }
        Source::Url(url) => download(&url, config)?,
        Source::Channel(id) => fetch_channel_feed(id, config)?,
        Source::Search(query) => {
            let client = feed_client(config)?;
            let url = client.search_feed_url(&query);
            info(&format!("Fetching {}", url));
            parse_text(&client.fetch(&url)?)?
        }
        Source::SeasonPass(id) => {
            let client = feed_client(config)?;
            let url = client.season_pass_feed_url(id);
            info(&format!("Fetching {}", url));
            parse_text(&client.fetch(&url)?)?
        }
    };

    print_listing(&parser, show_thumbs);
    Ok(())
}

fn feed_client(config: &AppConfig) -> Result<FeedClient, String> {
    if config.server.is_empty() {
        return Err("No server configured - run with --set-server first".to_string());
    }

    Ok(FeedClient::new(&config.server, config.stream_format.as_str())
        .with_user_agent(config.user_agent()))
}

fn parse_text(body: &str) -> Result<ProgrammeFeedParser, String> {
    let mut parser = ProgrammeFeedParser::new();
    parser.parse(body.as_bytes())?;
    Ok(parser)
}

fn download(url: &str, config: &AppConfig) -> Result<ProgrammeFeedParser, String> {
    let mut download_config = DownloadConfig::default();
    download_config.user_agent = config.user_agent().to_string();

    info(&format!("Downloading {}", url));
    let progress: ProgressCallback = Box::new(|downloaded, total| {
        if total == Some(downloaded) {
            info(&format!("Downloaded {} bytes", downloaded));
        }
    });

    FeedDownloader::download_and_parse(url, &download_config, Some(progress))
}

/// Fetch one channel's listing feed, re-using the on-disk copy while it is
/// younger than the configured refresh interval.
fn fetch_channel_feed(channel_id: i64, config: &mut AppConfig) -> Result<ProgrammeFeedParser, String> {
    let client = feed_client(config)?;
    let cache = cache_path(channel_id);
    let cache_str = cache.to_string_lossy().to_string();

    if cache.exists() {
        let fresh = match FeedAutoUpdate::from_index(config.feed_auto_update_index).as_secs() {
            // Refresh is off: the cached copy stays until deleted by hand
            None => true,
            Some(max_age) => {
                let age = unix_now() - config.last_feed_fetch;
                age >= 0 && age < max_age
            }
        };

        if fresh {
            info(&format!("Using cached feed {}", cache_str));
            return FeedDownloader::parse_file(&cache_str);
        }
    }

    let url = client.channel_feed_url(channel_id);
    let mut download_config = DownloadConfig::default();
    download_config.user_agent = config.user_agent().to_string();

    info(&format!("Refreshing channel feed from {}", url));
    FeedDownloader::download_to_file(&url, &cache_str, &download_config, None)?;

    config.last_feed_fetch = unix_now();
    config.save();

    FeedDownloader::parse_file(&cache_str)
}

fn cache_path(channel_id: i64) -> PathBuf {
    let mut path = dirs::cache_dir().unwrap_or_else(std::env::temp_dir);
    path.push("catchup_tv");
    std::fs::create_dir_all(&path).ok();
    path.push(format!("channel_{}.mediarss", channel_id));
    path
}

fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

fn print_listing(parser: &ProgrammeFeedParser, show_thumbs: bool) {
    for programme in parser.programmes() {
        let start = match &programme.start {
            Some(dt) => feed::format_datetime(dt),
            None => "---------- --:--".to_string(),
        };

        println!(
            "{}  {:>7}  {}",
            start,
            feed::format_duration(programme.duration),
            programme.title
        );

        if !programme.description.is_empty() {
            println!("    {}", programme.description);
        }
        if programme.id >= 0 || programme.channel_id >= 0 {
            println!(
                "    programme {} / channel {}",
                programme.id, programme.channel_id
            );
        }
    }

    info(&format!("{} programmes", parser.programmes().len()));

    if show_thumbs {
        for thumbnail in parser.thumbnails() {
            println!("{}  {}", feed::format_time(&thumbnail.time), thumbnail.url);
        }
        info(&format!("{} thumbnails", parser.thumbnails().len()));
    }
}
