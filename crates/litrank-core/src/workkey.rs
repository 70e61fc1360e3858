//! Work-key clustering: assign every record a canonical identifier (§4.4).

use sha2::{Digest, Sha256};

use crate::normalize::{normalize_title, strip_arxiv_version};
use crate::types::{PaperRecord, SourceTag};

/// Registrant prefixes known to carry bad DOI data; records with a DOI under
/// one of these fall through to the next identifier instead of clustering on
/// a misleading DOI.
pub const SUSPICIOUS_DOI_PREFIXES: &[&str] = &["10.65215/"];

/// Compute the canonical work key for a record, trying identifiers in order
/// of strength: DOI, arXiv id, PMID, Semantic Scholar id, then a fuzzy
/// title-hash fallback.
pub fn compute_work_key(record: &PaperRecord) -> String {
    if let Some(doi) = &record.doi {
        let lower = doi.to_lowercase();
        let suspicious = SUSPICIOUS_DOI_PREFIXES.iter().any(|p| lower.starts_with(p));
        if !suspicious {
            return format!("doi:{lower}");
        }
    }

    if let Some(arxiv_id) = &record.arxiv_id {
        return format!("arxiv:{}", strip_arxiv_version(arxiv_id));
    }
    if record.source == SourceTag::Arxiv {
        return format!("arxiv:{}", strip_arxiv_version(&record.source_id));
    }

    if let Some(pmid) = &record.pmid {
        return format!("pmid:{pmid}");
    }
    if record.source == SourceTag::Pubmed {
        return format!("pmid:{}", record.source_id);
    }

    if record.source == SourceTag::SemanticScholar {
        return format!("s2:{}", record.source_id);
    }

    let normalized_title = normalize_title(&record.title);
    let first_author = record
        .first_author_name()
        .and_then(crate::normalize::extract_surname)
        .unwrap_or_else(|| "unknown".to_string());
    let year_bucket = record.year.map(|y| y.to_string()).unwrap_or_else(|| "unknown".to_string());
    let content = format!("{normalized_title}|{first_author}|{year_bucket}");
    let digest = Sha256::digest(content.as_bytes());
    let hex: String = digest.iter().take(8).map(|b| format!("{b:02x}")).collect();
    format!("title_hash:{hex}")
}

pub fn is_title_hash_key(key: &str) -> bool {
    key.starts_with("title_hash:")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Author;

    fn paper(source: SourceTag, id: &str, title: &str) -> PaperRecord {
        PaperRecord::new(source, id, title)
    }

    #[test]
    fn doi_takes_priority() {
        let mut r = paper(SourceTag::OpenAlex, "W1", "Title");
        r.doi = Some("10.1145/xyz".into());
        r.arxiv_id = Some("1706.03762".into());
        assert_eq!(compute_work_key(&r), "doi:10.1145/xyz");
    }

    #[test]
    fn suspicious_doi_falls_through_to_arxiv() {
        let mut r = paper(SourceTag::OpenAlex, "W1", "Title");
        r.doi = Some("10.65215/ne77pf66".into());
        r.arxiv_id = Some("1706.03762".into());
        assert_eq!(compute_work_key(&r), "arxiv:1706.03762");
    }

    #[test]
    fn arxiv_id_from_any_source_is_promoted() {
        let mut s2 = paper(SourceTag::SemanticScholar, "s2id", "Title");
        s2.arxiv_id = Some("1706.03762v2".into());
        let mut oa = paper(SourceTag::OpenAlex, "Wx", "Title");
        oa.arxiv_id = Some("1706.03762".into());
        assert_eq!(compute_work_key(&s2), compute_work_key(&oa));
        assert_eq!(compute_work_key(&s2), "arxiv:1706.03762");
    }

    #[test]
    fn pmid_used_when_no_stronger_id() {
        let mut r = paper(SourceTag::Pubmed, "123", "Title");
        r.pmid = Some("123".into());
        assert_eq!(compute_work_key(&r), "pmid:123");
    }

    #[test]
    fn semantic_scholar_id_fallback() {
        let r = paper(SourceTag::SemanticScholar, "abc123", "Title");
        assert_eq!(compute_work_key(&r), "s2:abc123");
    }

    #[test]
    fn title_hash_fallback_is_deterministic() {
        let mut a = paper(SourceTag::Crossref, "c1", "Some Unique Title");
        a.year = Some(2020);
        a.authors = vec![Author::new("Jane Doe")];
        let mut b = a.clone();
        b.source_id = "c2".into();
        assert_eq!(compute_work_key(&a), compute_work_key(&b));
        assert!(is_title_hash_key(&compute_work_key(&a)));
    }

    #[test]
    fn title_hash_differs_by_title() {
        let mut a = paper(SourceTag::Crossref, "c1", "Title One");
        a.year = Some(2020);
        let mut b = paper(SourceTag::Crossref, "c2", "Title Two");
        b.year = Some(2020);
        assert_ne!(compute_work_key(&a), compute_work_key(&b));
    }
}
