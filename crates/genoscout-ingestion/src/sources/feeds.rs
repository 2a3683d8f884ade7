//! Journal RSS / Atom feed client.
//!
//! Handles RSS 2.0 (`<item>`), RSS 1.0 / RDF (`<item>` with Dublin Core and
//! PRISM fields) and Atom (`<entry>`). One client per configured feed.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use genoscout_common::sandbox::SandboxClient as Client;
use genoscout_common::JournalFeed;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use scraper::Html;
use tracing::{debug, info, instrument};

use crate::models::{collapse_whitespace, PaperDraft, PaperRecord};
use super::{DiscoverySource, DiscoveryWindow};

/// Publication timestamp fields, most preferred first.
const TIMESTAMP_FIELDS: &[&[u8]] = &[
    b"pubDate",
    b"published",
    b"dc:date",
    b"prism:publicationDate",
    b"updated",
];

/// One parsed feed entry, before normalisation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    pub summary: String,
    pub description: String,
    pub content: String,
    pub prism_doi: String,
    pub dc_identifier: String,
    pub authors: Vec<String>,
    /// (field, raw value) in document order
    pub timestamps: Vec<(String, String)>,
}

impl FeedEntry {
    /// First candidate field (in `TIMESTAMP_FIELDS` order) holding a parseable date.
    pub fn publication_time(&self) -> Option<NaiveDateTime> {
        TIMESTAMP_FIELDS.iter().find_map(|field| {
            self.timestamps
                .iter()
                .filter(|(name, _)| name.as_bytes() == *field)
                .find_map(|(_, raw)| parse_feed_timestamp(raw))
        })
    }

    /// `prism:doi`, else a DOI-shaped `dc:identifier`.
    pub fn doi(&self) -> String {
        if !self.prism_doi.trim().is_empty() {
            return strip_doi_prefix(&self.prism_doi);
        }
        let ident = strip_doi_prefix(&self.dc_identifier);
        if ident.starts_with("10.") { ident } else { String::new() }
    }

    /// Summary, falling back to description, then content; markup removed.
    pub fn abstract_text(&self) -> String {
        let raw = [&self.summary, &self.description, &self.content]
            .into_iter()
            .find(|s| !s.trim().is_empty())
            .map(String::as_str)
            .unwrap_or("");
        strip_html(raw)
    }
}

fn strip_doi_prefix(raw: &str) -> String {
    let s = raw.trim();
    let lower = s.to_lowercase();
    for prefix in ["https://doi.org/", "http://doi.org/", "http://dx.doi.org/", "doi:"] {
        if lower.starts_with(prefix) {
            return s[prefix.len()..].trim().to_string();
        }
    }
    s.to_string()
}

/// Text content of an HTML snippet, entities decoded.
pub fn strip_html(s: &str) -> String {
    let fragment = Html::parse_fragment(s);
    let text: Vec<&str> = fragment.root_element().text().collect();
    collapse_whitespace(&text.join(" "))
}

/// RFC 2822 (RSS), RFC 3339 (Atom, Dublin Core), or a bare date.
pub fn parse_feed_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc).naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).naive_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt);
    }
    s.get(..10)
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn is_entry(name: &[u8]) -> bool {
    name == b"item" || name == b"entry"
}

fn is_feed_root(name: &[u8]) -> bool {
    matches!(name, b"rss" | b"feed" | b"rdf:RDF" | b"RDF")
}

/// Atom `<link href=".."/>`; only `rel="alternate"` or no rel counts.
fn atom_link_href(e: &BytesStart) -> Option<String> {
    let mut href = None;
    let mut rel_ok = true;
    for attr in e.attributes().flatten() {
        let value = attr.unescape_value().ok()?.into_owned();
        match attr.key.as_ref() {
            b"href" => href = Some(value),
            b"rel" => rel_ok = value == "alternate",
            _ => {}
        }
    }
    href.filter(|_| rel_ok)
}

fn assign_field(entry: &mut FeedEntry, name: &[u8], text: String) {
    let value = text.trim().to_string();
    if value.is_empty() {
        return;
    }
    match name {
        b"title" | b"dc:title" if entry.title.is_empty() => entry.title = collapse_whitespace(&value),
        b"link" if entry.link.is_empty() => entry.link = value,
        b"summary" => entry.summary = value,
        b"description" => entry.description = value,
        b"content" | b"content:encoded" if entry.content.is_empty() => entry.content = value,
        b"prism:doi" => entry.prism_doi = value,
        b"dc:identifier" if entry.dc_identifier.is_empty() => entry.dc_identifier = value,
        b"dc:creator" | b"author" => entry.authors.push(collapse_whitespace(&value)),
        other if TIMESTAMP_FIELDS.contains(&other) => {
            entry.timestamps.push((String::from_utf8_lossy(other).into_owned(), value));
        }
        _ => {}
    }
}

/// Parse feed XML into entries.
///
/// Each open element collects its own text; on close the text is assigned to
/// the entry if the element is a direct child of `<item>`/`<entry>` and is
/// then appended to the parent, so nested markup inside summaries survives.
pub fn parse_feed(xml: &str) -> anyhow::Result<Vec<FeedEntry>> {
    let mut reader = Reader::from_str(xml);
    let mut entries = Vec::new();
    let mut stack: Vec<(Vec<u8>, String)> = Vec::new();
    let mut current: Option<FeedEntry> = None;
    let mut entry_depth = 0usize;
    let mut saw_root = false;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let name = e.name().as_ref().to_vec();
                saw_root |= is_feed_root(&name);
                if is_entry(&name) && current.is_none() {
                    current = Some(FeedEntry::default());
                    entry_depth = stack.len() + 1;
                } else if name == b"link" && stack.len() == entry_depth {
                    if let (Some(entry), Some(href)) = (current.as_mut(), atom_link_href(e)) {
                        if entry.link.is_empty() {
                            entry.link = href;
                        }
                    }
                }
                stack.push((name, String::new()));
            }
            Ok(Event::Empty(ref e)) => {
                if e.name().as_ref() == b"link" && stack.len() == entry_depth {
                    if let (Some(entry), Some(href)) = (current.as_mut(), atom_link_href(e)) {
                        if entry.link.is_empty() {
                            entry.link = href;
                        }
                    }
                }
            }
            Ok(Event::Text(ref e)) => {
                if let Some((_, text)) = stack.last_mut() {
                    let chunk = e
                        .unescape()
                        .map(|c| c.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(e).into_owned());
                    text.push_str(&chunk);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some((_, text)) = stack.last_mut() {
                    text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::End(_)) => {
                let Some((name, text)) = stack.pop() else { continue };
                let depth = stack.len();

                if current.is_some() && is_entry(&name) && depth + 1 == entry_depth {
                    if let Some(entry) = current.take() {
                        entries.push(entry);
                    }
                    continue;
                }

                if let Some(entry) = current.as_mut() {
                    if depth == entry_depth {
                        // Atom <author> holds <name>; RSS <author> holds text
                        if name != b"author" || has_text(&text) {
                            assign_field(entry, &name, text.clone());
                        }
                    } else if depth == entry_depth + 1
                        && stack.last().map(|(p, _)| p.as_slice()) == Some(b"author".as_slice())
                    {
                        // Only <name> counts; <email> and <uri> are dropped.
                        if name == b"name" {
                            assign_field(entry, b"author", text);
                        }
                        continue;
                    }
                }

                if let Some((_, parent_text)) = stack.last_mut() {
                    parent_text.push_str(&text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => anyhow::bail!("feed XML error at byte {}: {e}", reader.buffer_position()),
            _ => {}
        }
    }

    if !saw_root {
        anyhow::bail!("document is not an RSS or Atom feed");
    }
    Ok(entries)
}

fn has_text(text: &str) -> bool {
    !text.trim().is_empty()
}

pub struct FeedClient {
    client: Client,
    feed: JournalFeed,
}

impl FeedClient {
    /// `client` must already allow the feed's host.
    pub fn new(client: Client, feed: JournalFeed) -> Self {
        Self { client, feed }
    }

    fn entry_to_record(&self, entry: &FeedEntry, published: Option<NaiveDateTime>) -> Option<PaperRecord> {
        if entry.title.trim().is_empty() {
            return None;
        }
        Some(PaperRecord::new(PaperDraft {
            title: entry.title.clone(),
            authors: entry.authors.join(", "),
            abstract_text: entry.abstract_text(),
            source: self.feed.name.clone(),
            url: entry.link.clone(),
            doi: entry.doi(),
            date: published.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
            pdf_url: String::new(),
        }))
    }

    /// Applies the per-feed cap and the lookback cutoff to parsed entries.
    pub fn select_records(&self, entries: &[FeedEntry], window: &DiscoveryWindow) -> Vec<PaperRecord> {
        let cutoff = window.cutoff().naive_utc();
        entries
            .iter()
            .take(window.max_per_source)
            .filter_map(|entry| {
                let published = entry.publication_time();
                if matches!(published, Some(t) if t < cutoff) {
                    debug!(title = %entry.title, "Entry older than lookback window");
                    return None;
                }
                self.entry_to_record(entry, published)
            })
            .collect()
    }
}

#[async_trait]
impl DiscoverySource for FeedClient {
    fn name(&self) -> String {
        self.feed.name.clone()
    }

    #[instrument(skip(self, window), fields(feed = %self.feed.name))]
    async fn discover(&self, window: &DiscoveryWindow) -> anyhow::Result<Vec<PaperRecord>> {
        let xml = self.client
            .get(&self.feed.url)?
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let entries = parse_feed(&xml)?;
        let papers = self.select_records(&entries, window);
        info!(n = papers.len(), "entries");
        Ok(papers)
    }
}
