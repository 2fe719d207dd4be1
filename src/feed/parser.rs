//! Programme feed parser
//!
//! Streaming parser for the Media RSS programme listings published by the
//! catchup service (rss > channel > item > media:group). Walks the document
//! with a pull-style cursor and collects programmes and thumbnails in
//! document order.

use chrono::{DateTime, Local, NaiveTime, TimeZone, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use std::io::BufRead;

use crate::models::{Programme, Thumbnail};

/// Pull-style cursor over one XML document.
///
/// Thin layer over `quick_xml::Reader` exposing the operations the feed
/// walkers need: advance to the next start element inside the current one,
/// inspect its name and attributes, read its text, or skip its subtree.
/// Malformed markup is treated as end of input rather than an error.
pub struct XmlCursor<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    /// Qualified name as written, e.g. "media:group"
    qualified: String,
    /// Name with any namespace prefix stripped
    local: String,
    attrs: Vec<(String, String)>,
    /// Current element was self-closing
    empty: bool,
}

impl<R: BufRead> XmlCursor<R> {
    pub fn new(input: R) -> Self {
        Self {
            reader: Reader::from_reader(input),
            buf: Vec::with_capacity(4096),
            qualified: String::new(),
            local: String::new(),
            attrs: Vec::new(),
            empty: false,
        }
    }

    /// Advance to the next start element within the current element.
    ///
    /// Returns false once the current element (or the document) ends.
    pub fn next_start_element(&mut self) -> bool {
        if self.empty {
            // A self-closing element has no children
            self.empty = false;
            return false;
        }

        loop {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf) {
                Ok(Event::Start(ref e)) => {
                    capture_element(
                        e,
                        &mut self.qualified,
                        &mut self.local,
                        &mut self.attrs,
                    );
                    return true;
                }
                Ok(Event::Empty(ref e)) => {
                    capture_element(
                        e,
                        &mut self.qualified,
                        &mut self.local,
                        &mut self.attrs,
                    );
                    self.empty = true;
                    return true;
                }
                Ok(Event::End(_)) | Ok(Event::Eof) => return false,
                Ok(_) => {}
                Err(_) => return false,
            }
        }
    }

    /// Local name of the current element, e.g. "group" for media:group
    pub fn name(&self) -> &str {
        &self.local
    }

    /// Name of the current element as written, prefix included
    pub fn qualified_name(&self) -> &str {
        &self.qualified
    }

    /// Attribute value of the current element, by name
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Consume the current element, returning all character content up to
    /// the matching end tag. Nested markup contributes only its text.
    pub fn read_element_text(&mut self) -> String {
        let mut text = String::new();

        if self.empty {
            self.empty = false;
            return text;
        }

        let mut depth = 0usize;
        loop {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf) {
                Ok(Event::Start(_)) => depth += 1,
                Ok(Event::Text(ref e)) => match e.decode() {
                    Ok(decoded) => match quick_xml::escape::unescape(&decoded) {
                        Ok(t) => text.push_str(&t),
                        Err(_) => text.push_str(&decoded),
                    },
                    Err(_) => text.push_str(&String::from_utf8_lossy(e.as_ref())),
                },
                Ok(Event::CData(ref e)) => {
                    text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
                Ok(Event::End(_)) => {
                    if depth == 0 {
                        return text;
                    }
                    depth -= 1;
                }
                Ok(Event::Eof) | Err(_) => return text,
                Ok(_) => {}
            }
        }
    }

    /// Consume and discard everything up to and including the matching
    /// end tag of the current element.
    pub fn skip_current_element(&mut self) {
        if self.empty {
            self.empty = false;
            return;
        }

        let mut depth = 0usize;
        loop {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf) {
                Ok(Event::Start(_)) => depth += 1,
                Ok(Event::End(_)) => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                }
                Ok(Event::Eof) | Err(_) => return,
                Ok(_) => {}
            }
        }
    }
}

/// Copy the element's names and attributes out of the shared event buffer
fn capture_element(
    e: &BytesStart,
    qualified: &mut String,
    local: &mut String,
    attrs: &mut Vec<(String, String)>,
) {
    qualified.clear();
    qualified.push_str(&String::from_utf8_lossy(e.name().as_ref()));
    local.clear();
    local.push_str(&String::from_utf8_lossy(e.local_name().as_ref()));

    attrs.clear();
    for attr in e.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = match attr.unescape_value() {
            Ok(v) => v.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
        };
        attrs.push((key, value));
    }
}

/// Streaming parser for the service's programme feeds.
///
/// One instance can parse any number of documents; the output lists are
/// reset at the start of every [`parse`](ProgrammeFeedParser::parse) call.
#[derive(Debug)]
pub struct ProgrammeFeedParser {
    programmes: Vec<Programme>,
    thumbnails: Vec<Thumbnail>,
    error: String,
    datetime_regexp: Regex,
    time_regexp: Regex,
}

impl ProgrammeFeedParser {
    pub fn new() -> Self {
        Self {
            programmes: Vec::new(),
            thumbnails: Vec::new(),
            error: String::new(),
            datetime_regexp: Regex::new(r"(\d{1,2}) (\w{3}) (\d+) (\d{2}):(\d{2}):(\d{2})")
                .unwrap(),
            time_regexp: Regex::new(r"^(\d{1,2}):(\d{1,2}):(\d{1,2})").unwrap(),
        }
    }

    /// Parse one feed document from `input`.
    ///
    /// The only hard failures are a missing top-level element and a
    /// top-level element other than `rss`; anything wrong inside an item
    /// body is tolerated field by field, so a structurally sound document
    /// always parses even when every programme record comes out empty.
    pub fn parse<R: BufRead>(&mut self, input: R) -> Result<(), String> {
        let mut cursor = XmlCursor::new(input);
        self.programmes.clear();
        self.thumbnails.clear();
        self.error.clear();

        if !cursor.next_start_element() {
            return Err(self.fail("Invalid programme feed"));
        }

        if cursor.name() != "rss" {
            return Err(self.fail("Programme feed does not contain an rss element"));
        }

        while cursor.next_start_element() {
            if cursor.name() == "channel" {
                self.parse_channel_element(&mut cursor);
            } else {
                cursor.skip_current_element();
            }
        }

        Ok(())
    }

    /// Message recorded by the most recent failing parse call
    pub fn last_error(&self) -> &str {
        &self.error
    }

    /// Programmes collected by the most recent parse, in document order
    pub fn programmes(&self) -> &[Programme] {
        &self.programmes
    }

    /// Thumbnails collected by the most recent parse, in document order.
    /// The list is channel-wide, not nested under the owning programme.
    pub fn thumbnails(&self) -> &[Thumbnail] {
        &self.thumbnails
    }

    fn fail(&mut self, message: &str) -> String {
        self.error = message.to_string();
        message.to_string()
    }

    fn parse_channel_element<R: BufRead>(&mut self, cursor: &mut XmlCursor<R>) {
        while cursor.next_start_element() {
            if cursor.name() == "item" {
                self.parse_item_element(cursor);
            } else {
                cursor.skip_current_element();
            }
        }
    }

    /// Scan one item's children left to right, then append the programme
    /// unconditionally, however little of it survived parsing.
    fn parse_item_element<R: BufRead>(&mut self, cursor: &mut XmlCursor<R>) {
        let mut programme = Programme::default();

        while cursor.next_start_element() {
            if cursor.name() == "title" {
                programme.title = cursor.read_element_text();
            } else if cursor.name() == "description" {
                programme.description = cursor.read_element_text();
            } else if cursor.name() == "link" {
                programme.id = parse_programme_id(&cursor.read_element_text());
            } else if cursor.name() == "source" {
                programme.channel_id = cursor.attribute("url").map_or(-1, parse_channel_id);
                cursor.skip_current_element();
            } else if cursor.name() == "pubDate" {
                programme.start = self.parse_datetime(&cursor.read_element_text());
            } else if cursor.qualified_name() == "media:group" {
                self.parse_media_group_element(cursor, &mut programme);
            } else {
                cursor.skip_current_element();
            }
        }

        self.programmes.push(programme);
    }

    /// Every child's subtree is skipped unconditionally after its
    /// attributes have been read.
    fn parse_media_group_element<R: BufRead>(
        &mut self,
        cursor: &mut XmlCursor<R>,
        programme: &mut Programme,
    ) {
        while cursor.next_start_element() {
            if cursor.qualified_name() == "media:content" {
                if let Some(duration) = cursor
                    .attribute("duration")
                    .and_then(|v| v.parse::<i64>().ok())
                {
                    programme.duration = duration;
                }
            } else if cursor.qualified_name() == "media:thumbnail" {
                let url = cursor.attribute("url").unwrap_or_default().to_string();
                let time = cursor.attribute("time").and_then(|v| self.parse_time(v));

                if let Some(time) = time {
                    self.thumbnails.push(Thumbnail { url, time });
                }
            }

            cursor.skip_current_element();
        }
    }

    /// Parse a feed timestamp such as "Sun, 5 Jan 2020 10:00:00 GMT".
    ///
    /// The captured fields are taken as UTC and converted to local time.
    /// The month table is the fixed English Jan..Dec set, case-sensitive;
    /// anything else does not parse.
    pub fn parse_datetime(&self, s: &str) -> Option<DateTime<Local>> {
        let caps = self.datetime_regexp.captures(s)?;

        let month = month_number(caps.get(2)?.as_str())?;
        let day: u32 = caps.get(1)?.as_str().parse().ok()?;
        let year: i32 = caps.get(3)?.as_str().parse().ok()?;
        let hour: u32 = caps.get(4)?.as_str().parse().ok()?;
        let min: u32 = caps.get(5)?.as_str().parse().ok()?;
        let sec: u32 = caps.get(6)?.as_str().parse().ok()?;

        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .single()
            .map(|utc| utc.with_timezone(&Local))
    }

    /// Parse a thumbnail offset such as "00:14:59" into a time of day.
    /// The pattern is anchored at the start of the string.
    pub fn parse_time(&self, s: &str) -> Option<NaiveTime> {
        let caps = self.time_regexp.captures(s)?;

        let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
        let min: u32 = caps.get(2)?.as_str().parse().ok()?;
        let sec: u32 = caps.get(3)?.as_str().parse().ok()?;

        NaiveTime::from_hms_opt(hour, min, sec)
    }
}

impl Default for ProgrammeFeedParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract the numeric programme ID from an item link.
///
/// "http://example.com/search/?findid=8155949" -> 8155949
/// "http://example.com/feedbeta/seasonpasses/852238" -> 852238
pub fn parse_programme_id(s: &str) -> i64 {
    let tail = match s.rfind('=').or_else(|| s.rfind('/')) {
        Some(pos) => &s[pos + 1..],
        None => s,
    };

    tail.parse().unwrap_or(-1)
}

/// Extract the numeric channel ID from a channel feed URL.
///
/// "http://example.com/feed/channels/1855486/flv.mediarss" -> 1855486
pub fn parse_channel_id(s: &str) -> i64 {
    let start = match s.find("channels/") {
        Some(pos) => pos + "channels/".len(),
        None => return -1,
    };
    let end = match s[start..].find('/') {
        Some(rel) => start + rel,
        None => return -1,
    };

    s[start..end].parse().unwrap_or(-1)
}

fn month_number(name: &str) -> Option<u32> {
    match name {
        "Jan" => Some(1),
        "Feb" => Some(2),
        "Mar" => Some(3),
        "Apr" => Some(4),
        "May" => Some(5),
        "Jun" => Some(6),
        "Jul" => Some(7),
        "Aug" => Some(8),
        "Sep" => Some(9),
        "Oct" => Some(10),
        "Nov" => Some(11),
        "Dec" => Some(12),
        _ => None,
    }
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
