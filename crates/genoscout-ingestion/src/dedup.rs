//! Cross-source deduplication.
//!
//! Key: DOI when present, else the normalised title. The first record seen
//! wins, so adapter execution order decides which field values survive.

use std::collections::HashSet;

use crate::models::PaperRecord;

/// Result of a deduplication check.
#[derive(Debug, PartialEq, Eq)]
pub enum DedupResult {
    /// First time this key is seen; keep the record.
    New,
    /// A record with this DOI was already kept.
    DuplicateDoi(String),
    /// No DOI, and a record with this title was already kept.
    DuplicateTitle(String),
}

/// Streaming deduplicator; remembers every key it has accepted.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<String>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, incoming: &PaperRecord) -> DedupResult {
        let key = incoming.dedup_key();
        if self.seen.insert(key.to_string()) {
            DedupResult::New
        } else if incoming.doi.is_empty() {
            DedupResult::DuplicateTitle(key.to_string())
        } else {
            DedupResult::DuplicateDoi(key.to_string())
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Single order-stable pass; later duplicates are dropped silently.
pub fn deduplicate(records: Vec<PaperRecord>) -> Vec<PaperRecord> {
    let mut dedup = Deduplicator::new();
    records
        .into_iter()
        .filter(|r| dedup.check(r) == DedupResult::New)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaperDraft;

    fn rec(title: &str, doi: &str, source: &str) -> PaperRecord {
        PaperRecord::new(PaperDraft {
            title: title.to_string(),
            doi: doi.to_string(),
            source: source.to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn test_same_doi_keeps_first_adapter_fields() {
        let records = vec![
            rec("From preprint server", "10.1/x", "bioRxiv (genomics)"),
            rec("From journal feed", "10.1/x", "Nature Genetics"),
        ];
        let out = deduplicate(records);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "From preprint server");
        assert_eq!(out[0].source, "bioRxiv (genomics)");
    }

    #[test]
    fn test_title_key_used_without_doi() {
        let records = vec![
            rec("Same title", "", "A"),
            rec("Same title", "", "B"),
            rec("Same title", "10.1/y", "C"),
        ];
        let out = deduplicate(records);
        // DOI-keyed record is distinct from the title-keyed one
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].source, "A");
        assert_eq!(out[1].source, "C");
    }

    #[test]
    fn test_check_reports_duplicate_kind() {
        let mut d = Deduplicator::new();
        assert_eq!(d.check(&rec("T", "10.1/z", "A")), DedupResult::New);
        assert_eq!(d.check(&rec("T2", "10.1/z", "B")), DedupResult::DuplicateDoi("10.1/z".into()));
        assert_eq!(d.check(&rec("Only title", "", "A")), DedupResult::New);
        assert_eq!(
            d.check(&rec("Only title", "", "B")),
            DedupResult::DuplicateTitle("Only title".into())
        );
        assert_eq!(d.len(), 2);
    }

    #[test]
    fn test_order_is_stable() {
        let records = vec![rec("c", "", "1"), rec("a", "", "2"), rec("c", "", "3"), rec("b", "", "4")];
        let titles: Vec<String> = deduplicate(records).into_iter().map(|r| r.title).collect();
        assert_eq!(titles, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_dedup_is_idempotent() {
        let records = vec![
            rec("a", "10.1/a", "1"),
            rec("b", "", "1"),
            rec("a again", "10.1/a", "2"),
            rec("b", "", "2"),
            rec("c", "10.1/c", "2"),
        ];
        let once = deduplicate(records);
        let twice = deduplicate(once.clone());
        assert_eq!(once, twice);
    }
}
