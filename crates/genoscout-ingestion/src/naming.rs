//! Stable identity and deterministic artifact names.

use chrono::NaiveDate;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::models::PaperRecord;

/// Hex characters kept from the digest.
const UID_LEN: usize = 12;
/// Upper bound on topic words in an artifact name.
const MAX_TOPIC_WORDS: usize = 4;

/// Short stable id for a DOI or title. Same input, same uid, across runs.
pub fn compute_uid(doi_or_title: &str) -> String {
    let digest = Sha256::digest(doi_or_title.as_bytes());
    let mut hex = format!("{:x}", digest);
    hex.truncate(UID_LEN);
    hex
}

/// Lowercase, collapse non-alphanumeric runs to one hyphen, trim hyphens.
pub fn slugify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_hyphen = false;
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(c);
        } else {
            pending_hyphen = true;
        }
    }
    out
}

/// Builds `{journal}-{first-author-lastname}-{date}-{topic}`.
///
/// Pure and total: every component has a fallback so the stem is never empty.
pub fn build_artifact_name(record: &PaperRecord) -> String {
    format!(
        "{}-{}-{}-{}",
        journal_slug(&record.source),
        first_author_last_name(&record.authors),
        date_component(&record.date),
        topic_slug(record),
    )
}

fn parenthetical_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*\(.*?\)").unwrap())
}

/// "bioRxiv (genomics)" → "biorxiv"
fn journal_slug(source: &str) -> String {
    let stripped = parenthetical_regex().replace_all(source, "");
    let slug = slugify(&stripped);
    if slug.is_empty() { "unknown".to_string() } else { slug }
}

/// First author is whatever precedes the first ',' or ';'; the last name is
/// its last whitespace-separated word.
fn first_author_last_name(authors: &str) -> String {
    let first = authors
        .split(',')
        .next()
        .and_then(|a| a.split(';').next())
        .unwrap_or("")
        .trim();
    let last_word = first.split_whitespace().last().unwrap_or("");
    let name: String = last_word
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii_lowercase())
        .collect();
    if name.is_empty() { "unknown".to_string() } else { name }
}

fn date_component(date: &str) -> String {
    match date.get(..10) {
        Some(day) if NaiveDate::parse_from_str(day, "%Y-%m-%d").is_ok() => day.to_string(),
        _ => "unknown-date".to_string(),
    }
}

fn topic_slug(record: &PaperRecord) -> String {
    let mut seen = HashSet::new();
    let mut words: Vec<String> = Vec::new();
    for kw in &record.matched_keywords {
        let slug = slugify(kw);
        if !slug.is_empty() && seen.insert(slug.clone()) {
            words.push(slug);
        }
        if words.len() >= MAX_TOPIC_WORDS {
            break;
        }
    }

    if words.is_empty() {
        words = slugify(&record.title)
            .split('-')
            .filter(|w| !w.is_empty() && !STOP_WORDS.contains(w))
            .take(MAX_TOPIC_WORDS)
            .map(String::from)
            .collect();
    }

    if words.is_empty() { "paper".to_string() } else { words.join("-") }
}

/// Words skipped when a topic is derived from the title.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "in",
    "into", "is", "its", "of", "on", "or", "that", "the", "their", "to",
    "via", "we", "with", "without",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaperDraft;

    fn record(source: &str, authors: &str, date: &str, title: &str, kws: &[&str]) -> PaperRecord {
        let mut rec = PaperRecord::new(PaperDraft {
            title: title.to_string(),
            authors: authors.to_string(),
            source: source.to_string(),
            date: date.to_string(),
            doi: "10.1101/2026.01.01.000001".to_string(),
            ..Default::default()
        });
        rec.matched_keywords = kws.iter().map(|s| s.to_string()).collect();
        rec
    }

    #[test]
    fn test_uid_is_short_and_stable() {
        let a = compute_uid("10.1101/2026.01.01.000001");
        assert_eq!(a.len(), 12);
        assert_eq!(a, compute_uid("10.1101/2026.01.01.000001"));
        assert_ne!(a, compute_uid("10.1101/2026.01.01.000002"));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("scRNA-seq"), "scrna-seq");
        assert_eq!(slugify("  Hi-C / 3D genome!! "), "hi-c-3d-genome");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn test_full_name_from_keywords() {
        let rec = record(
            "Nature Genetics",
            "Zhang Wei, Smith J",
            "2026-02-10T08:00:00",
            "Whatever",
            &["scRNA-seq", "tumor", "scRNA-seq"],
        );
        assert_eq!(build_artifact_name(&rec), "nature-genetics-wei-2026-02-10-scrna-seq-tumor");
    }

    #[test]
    fn test_parenthetical_source_stripped() {
        let rec = record("bioRxiv (genomics)", "Ada Lovelace; Charles Babbage", "2026-01-05", "T", &["genome"]);
        assert_eq!(build_artifact_name(&rec), "biorxiv-lovelace-2026-01-05-genome");
    }

    #[test]
    fn test_topic_capped_at_four_keywords() {
        let rec = record("Cell", "A B", "2026-01-05", "T", &["one", "two", "three", "four", "five"]);
        assert!(build_artifact_name(&rec).ends_with("-one-two-three-four"));
    }

    #[test]
    fn test_title_fallback_skips_stop_words() {
        let rec = record("Cell", "A B", "2026-01-05", "The landscape of the human enhancer atlas in mice", &[]);
        assert_eq!(build_artifact_name(&rec), "cell-b-2026-01-05-landscape-human-enhancer-atlas");
    }

    #[test]
    fn test_missing_fields_fall_back() {
        let rec = record("", "", "2026", "", &[]);
        assert_eq!(build_artifact_name(&rec), "unknown-unknown-unknown-date-paper");
    }

    #[test]
    fn test_naming_is_deterministic() {
        let rec = record("Genome Research", "Jane Doe", "2026-03-01", "Long reads", &["long-read"]);
        let first = build_artifact_name(&rec);
        for _ in 0..5 {
            assert_eq!(build_artifact_name(&rec), first);
        }
    }
}
