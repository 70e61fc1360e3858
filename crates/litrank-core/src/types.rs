//! Core data model: the raw per-source record and the canonical merged work.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Tag identifying which adapter produced or enriched a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTag {
    SemanticScholar,
    OpenAlex,
    Pubmed,
    Arxiv,
    Crossref,
    OpenAccessResolver,
}

impl SourceTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTag::SemanticScholar => "semantic_scholar",
            SourceTag::OpenAlex => "openalex",
            SourceTag::Pubmed => "pubmed",
            SourceTag::Arxiv => "arxiv",
            SourceTag::Crossref => "crossref",
            SourceTag::OpenAccessResolver => "openaccess_resolver",
        }
    }

    /// Priority order used when picking which source's citation_count to trust (§4.6).
    pub fn citation_priority(&self) -> usize {
        match self {
            SourceTag::SemanticScholar => 0,
            SourceTag::OpenAlex => 1,
            SourceTag::Crossref => 2,
            SourceTag::Pubmed => 3,
            SourceTag::Arxiv => 4,
            SourceTag::OpenAccessResolver => 5,
        }
    }

    /// Representative-selection source bonus (§4.6).
    pub fn representative_bonus(&self) -> i32 {
        match self {
            SourceTag::SemanticScholar => 5,
            SourceTag::OpenAlex => 4,
            SourceTag::Pubmed => 3,
            SourceTag::Crossref => 2,
            SourceTag::Arxiv => 1,
            SourceTag::OpenAccessResolver => 0,
        }
    }

    /// Relevance-reliability weight used in feature extraction (§4.9).
    pub fn reliability(&self) -> f64 {
        match self {
            SourceTag::SemanticScholar => 1.0,
            SourceTag::OpenAlex => 0.9,
            SourceTag::Pubmed => 0.85,
            SourceTag::Crossref => 0.8,
            SourceTag::Arxiv => 0.7,
            SourceTag::OpenAccessResolver => 0.5,
        }
    }
}

impl std::fmt::Display for SourceTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of the venue/work a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkType {
    Journal,
    Conference,
    Book,
    Chapter,
    Preprint,
    Survey,
    Unknown,
}

/// Data-quality flags attached to a record or merged paper (§7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataQualityFlag {
    BadYear,
    ImplausibleCitationAge,
    YearCorrected,
    YearUncorrectable,
    SuspiciousDoi,
}

/// A single author as reported by a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    #[serde(default)]
    pub affiliations: BTreeSet<String>,
}

impl Author {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), affiliations: BTreeSet::new() }
    }
}

/// The normalized record an adapter emits for one paper from one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    pub title: String,
    pub source: SourceTag,
    pub source_id: String,
    pub doi: Option<String>,
    pub arxiv_id: Option<String>,
    pub pmid: Option<String>,
    pub abstract_text: Option<String>,
    pub year: Option<i32>,
    pub venue: Option<String>,
    pub authors: Vec<Author>,
    pub citation_count: Option<u64>,
    pub oa_url: Option<String>,
    pub publisher_url: Option<String>,
    pub topics: Vec<String>,
    pub keywords: BTreeSet<String>,
    pub is_survey: bool,
    pub is_open_access: bool,
    pub work_type: WorkType,
    /// Source-assigned relevance in [0, 1].
    pub relevance_score: f64,
    pub data_quality_flags: BTreeSet<DataQualityFlag>,
}

impl PaperRecord {
    /// A minimal record with every optional field absent; tests and adapters
    /// build on top of this rather than repeating every field.
    pub fn new(source: SourceTag, source_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            source,
            source_id: source_id.into(),
            doi: None,
            arxiv_id: None,
            pmid: None,
            abstract_text: None,
            year: None,
            venue: None,
            authors: Vec::new(),
            citation_count: None,
            oa_url: None,
            publisher_url: None,
            topics: Vec::new(),
            keywords: BTreeSet::new(),
            is_survey: false,
            is_open_access: false,
            work_type: WorkType::Unknown,
            relevance_score: 0.0,
            data_quality_flags: BTreeSet::new(),
        }
    }

    pub fn first_author_name(&self) -> Option<&str> {
        self.authors.first().map(|a| a.name.as_str())
    }
}

/// The canonical, post-merge work. One `MergedPaper` aggregates one or more
/// `PaperRecord`s that were judged to describe the same paper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergedPaper {
    pub id: String,
    pub title: String,
    pub doi: Option<String>,
    pub arxiv_id: Option<String>,
    pub pmid: Option<String>,
    pub abstract_text: Option<String>,
    pub year: Option<i32>,
    pub venue: Option<String>,
    pub authors: Vec<Author>,
    pub citation_count: Option<u64>,
    pub citation_source: Option<SourceTag>,
    pub oa_url: Option<String>,
    pub publisher_url: Option<String>,
    pub doi_url: Option<String>,
    pub topics: Vec<String>,
    pub keywords: BTreeSet<String>,
    pub categories: BTreeSet<String>,
    pub urls: BTreeSet<String>,
    pub databases: BTreeSet<String>,
    pub is_survey: bool,
    pub is_open_access: bool,
    pub work_type: WorkType,
    pub relevance_score: f64,
    pub data_quality_flags: BTreeSet<DataQualityFlag>,
    pub work_key: String,
    pub sources: Vec<SourceTag>,
    pub source_ids: HashMap<SourceTag, String>,
    pub field_provenance: HashMap<String, String>,
    pub score: f64,
    pub why_recommended: Vec<String>,
    pub selected: bool,
    pub comments: Vec<String>,
}

impl MergedPaper {
    pub fn age_years(&self, current_year: i32) -> i32 {
        self.year.map(|y| (current_year - y).max(0)).unwrap_or(0)
    }

    pub fn first_author_name(&self) -> Option<&str> {
        self.authors.first().map(|a| a.name.as_str())
    }

    /// Citation key per §6: `<surname><year|"XXXX"><first-title-word>`, alnum only, lowercase.
    pub fn citation_key(&self) -> String {
        let surname = self
            .first_author_name()
            .and_then(crate::normalize::extract_surname)
            .unwrap_or_else(|| "unknown".to_string());
        let year = self.year.map(|y| y.to_string()).unwrap_or_else(|| "XXXX".to_string());
        let first_word = self
            .title
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_lowercase();
        format!("{surname}{year}{first_word}")
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect()
    }
}

/// Outcome of a single adapter's contribution to a request: the successful
/// records it returned, or the reason it produced none. Never a hard error —
/// adapter failures are swallowed at this boundary (§7).
#[derive(Debug, Clone)]
pub struct SourceOutcome {
    pub source: SourceTag,
    pub records: Vec<PaperRecord>,
    pub skipped_reason: Option<String>,
}

impl SourceOutcome {
    pub fn ok(source: SourceTag, records: Vec<PaperRecord>) -> Self {
        Self { source, records, skipped_reason: None }
    }

    pub fn skipped(source: SourceTag, reason: impl Into<String>) -> Self {
        Self { source, records: Vec::new(), skipped_reason: Some(reason.into()) }
    }
}

/// A fixed set of feature values computed per paper for ranking (§4.9).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaperFeatures {
    pub relevance: f64,
    pub log_citations: f64,
    pub citation_velocity: f64,
    pub recency: f64,
    pub age_years: i32,
    pub is_survey: f64,
    pub is_open_access: f64,
    pub venue_signal: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn citation_key_strips_punctuation() {
        let mut paper = test_paper();
        paper.title = "Attention Is All You Need".into();
        paper.year = Some(2017);
        paper.authors = vec![Author::new("Ashish Vaswani")];
        assert_eq!(paper.citation_key(), "vaswani2017attention");
    }

    #[test]
    fn citation_key_handles_missing_year_and_author() {
        let mut paper = test_paper();
        paper.title = "Some Title".into();
        paper.year = None;
        paper.authors = vec![];
        assert_eq!(paper.citation_key(), "unknownXXXXsome");
    }

    fn test_paper() -> MergedPaper {
        MergedPaper {
            id: "1".into(),
            title: String::new(),
            doi: None,
            arxiv_id: None,
            pmid: None,
            abstract_text: None,
            year: None,
            venue: None,
            authors: vec![],
            citation_count: None,
            citation_source: None,
            oa_url: None,
            publisher_url: None,
            doi_url: None,
            topics: vec![],
            keywords: BTreeSet::new(),
            categories: BTreeSet::new(),
            urls: BTreeSet::new(),
            databases: BTreeSet::new(),
            is_survey: false,
            is_open_access: false,
            work_type: WorkType::Unknown,
            relevance_score: 0.0,
            data_quality_flags: BTreeSet::new(),
            work_key: String::new(),
            sources: vec![],
            source_ids: HashMap::new(),
            field_provenance: HashMap::new(),
            score: 0.0,
            why_recommended: vec![],
            selected: false,
            comments: vec![],
        }
    }
}
