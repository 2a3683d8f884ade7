//! Relevance filtering: drop non-research notices, keep keyword matches, cap.

use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, info};

use crate::models::PaperRecord;

/// Title patterns for corrections, errata, retractions and similar notices.
const NON_RESEARCH_PATTERNS: &[&str] = &[
    r"\bauthor correction\b",
    r"\bcorrection\b.*\b(to|for)\b",
    r"\berratum\b",
    r"\berrata\b",
    r"\bretraction\b",
    r"\bwithdrawal\b",
    r"\bexpression of concern\b",
    r"\bpublisher\s+correction\b",
    r"\bpublisher\s+note\b",
    r"\bcorrigendum\b",
    r"\badditional information\b.*\bcorrection\b",
];

fn non_research_regexes() -> &'static [Regex] {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        NON_RESEARCH_PATTERNS
            .iter()
            .map(|p| Regex::new(&format!("(?i){p}")).unwrap())
            .collect()
    })
}

pub fn is_non_research(title: &str) -> bool {
    non_research_regexes().iter().any(|re| re.is_match(title))
}

/// Exclusion pass. Returns the survivors, in order.
pub fn exclude_non_research(records: Vec<PaperRecord>) -> Vec<PaperRecord> {
    let before = records.len();
    let kept: Vec<PaperRecord> = records
        .into_iter()
        .filter(|r| {
            let excluded = is_non_research(&r.title);
            if excluded {
                debug!(title = %truncate(&r.title, 60), "Excluded non-research article");
            }
            !excluded
        })
        .collect();

    let removed = before - kept.len();
    if removed > 0 {
        info!(removed, "Filtered out correction/erratum articles");
    }
    kept
}

/// Keyword inclusion filter.
#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    keywords: Vec<String>,
    lowered: Vec<String>,
}

impl RelevanceFilter {
    pub fn new(keywords: &[String]) -> Self {
        let keywords: Vec<String> = keywords
            .iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        let lowered = keywords.iter().map(|k| k.to_lowercase()).collect();
        Self { keywords, lowered }
    }

    /// Keywords found in `title + " " + abstract`, in configured order.
    pub fn matches(&self, record: &PaperRecord) -> Vec<String> {
        let text = format!("{} {}", record.title, record.abstract_text).to_lowercase();
        self.keywords
            .iter()
            .zip(&self.lowered)
            .filter(|(_, lower)| text.contains(lower.as_str()))
            .map(|(kw, _)| kw.clone())
            .collect()
    }

    /// Keeps records with at least one match and records the matches on them.
    pub fn apply(&self, records: Vec<PaperRecord>) -> Vec<PaperRecord> {
        records
            .into_iter()
            .filter_map(|mut r| {
                let matched = self.matches(&r);
                if matched.is_empty() {
                    None
                } else {
                    r.matched_keywords = matched;
                    Some(r)
                }
            })
            .collect()
    }
}

/// Order-preserving hard cap.
pub fn cap(mut records: Vec<PaperRecord>, max: usize) -> Vec<PaperRecord> {
    if records.len() > max {
        info!(max, "Capping papers to evaluate");
        records.truncate(max);
    }
    records
}

pub(crate) fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaperDraft;

    fn rec(title: &str, abstract_text: &str) -> PaperRecord {
        PaperRecord::new(PaperDraft {
            title: title.to_string(),
            abstract_text: abstract_text.to_string(),
            ..Default::default()
        })
    }

    fn keywords(kws: &[&str]) -> Vec<String> {
        kws.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_crispr_screen_kept_with_match() {
        let filter = RelevanceFilter::new(&keywords(&["single-cell", "CRISPR screen"]));
        let out = filter.apply(vec![rec("CRISPR screen reveals regulators of T cell exhaustion", "")]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].matched_keywords, vec!["CRISPR screen"]);
    }

    #[test]
    fn test_matches_in_abstract_and_configured_order() {
        let filter = RelevanceFilter::new(&keywords(&["GWAS", "enhancer", "chromatin"]));
        let r = rec("Mapping regulatory variation", "Chromatin accessibility at enhancers; gwas loci.");
        assert_eq!(filter.matches(&r), vec!["GWAS", "enhancer", "chromatin"]);
    }

    #[test]
    fn test_non_matching_dropped() {
        let filter = RelevanceFilter::new(&keywords(&["genome"]));
        assert!(filter.apply(vec![rec("Bird migration", "Birds fly south.")]).is_empty());
    }

    #[test]
    fn test_title_and_abstract_joined_with_space() {
        // "genome" must not match across the title/abstract boundary
        let filter = RelevanceFilter::new(&keywords(&["ge nome", "genome"]));
        let r = rec("Large ge", "nome study");
        assert_eq!(filter.matches(&r), vec!["ge nome"]);
    }

    #[test]
    fn test_non_research_titles() {
        assert!(is_non_research("Author Correction: Single-cell atlas"));
        assert!(is_non_research("Correction to: A genome-wide screen"));
        assert!(is_non_research("Publisher Note on figure 2"));
        assert!(is_non_research("RETRACTION: something"));
        assert!(is_non_research("Expression of concern: data"));
        assert!(is_non_research("Corrigendum"));
        assert!(!is_non_research("Error-correcting codes in DNA storage"));
        assert!(!is_non_research("A single-cell atlas of human retina"));
    }

    #[test]
    fn test_exclude_keeps_order() {
        let out = exclude_non_research(vec![
            rec("First paper", ""),
            rec("Erratum: First paper", ""),
            rec("Second paper", ""),
        ]);
        let titles: Vec<&str> = out.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["First paper", "Second paper"]);
    }

    #[test]
    fn test_cap_invariant() {
        for n in 0..8 {
            let records: Vec<PaperRecord> = (0..n).map(|i| rec(&format!("p{i}"), "")).collect();
            let capped = cap(records, 3);
            assert!(capped.len() <= 3);
            if n >= 1 {
                assert_eq!(capped[0].title, "p0");
            }
        }
    }
}
