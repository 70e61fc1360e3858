//! Per-paper feature extraction and within-set normalization (§4.9).

use crate::types::{MergedPaper, PaperFeatures, WorkType};

const TOP_TIER_VENUES: &[&str] = &[
    "nature", "science", "cell", "lancet", "nejm", "bmj", "pnas", "plos one", "ieee", "acm",
    "springer", "elsevier", "neurips", "icml", "iclr", "aaai", "ijcai", "cvpr", "iccv", "eccv",
    "acl", "emnlp", "naacl", "sigir", "kdd", "www", "chi", "uist",
];

/// Compute the raw (pre-normalization) feature vector for one paper.
pub fn compute_features(paper: &MergedPaper, current_year: i32, query: Option<&str>) -> PaperFeatures {
    let age_years = paper.age_years(current_year);

    let relevance = compute_unified_relevance(paper, query);

    let citations = paper.citation_count.unwrap_or(0);
    let log_citations = (1.0 + citations as f64).ln();

    let citation_velocity = if age_years <= 0 {
        citations as f64
    } else {
        let base_velocity = citations as f64 / age_years as f64;
        let acceleration = if age_years < 2 && citations > 10 {
            1.5
        } else if age_years < 3 && citations > 20 {
            1.2
        } else {
            1.0
        };
        base_velocity * acceleration
    };
    let log_velocity = (1.0 + citation_velocity).ln();

    let recency = (-0.15 * age_years as f64).exp();

    PaperFeatures {
        relevance,
        log_citations,
        citation_velocity: log_velocity,
        recency,
        age_years,
        is_survey: if paper.is_survey { 1.0 } else { 0.0 },
        is_open_access: if paper.is_open_access { 1.0 } else { 0.0 },
        venue_signal: compute_venue_quality(paper),
    }
}

/// Robust percentile-based normalization of `log_citations`, `citation_velocity`
/// and `relevance` within one candidate set; the remaining fields are already
/// in `[0, 1]` and pass through unchanged.
pub fn normalize_features(papers_with_features: &[(MergedPaper, PaperFeatures)]) -> Vec<PaperFeatures> {
    if papers_with_features.is_empty() {
        return Vec::new();
    }

    let citations: Vec<f64> = papers_with_features.iter().map(|(_, f)| f.log_citations).collect();
    let velocities: Vec<f64> = papers_with_features.iter().map(|(_, f)| f.citation_velocity).collect();
    let relevances: Vec<f64> = papers_with_features.iter().map(|(_, f)| f.relevance).collect();

    papers_with_features
        .iter()
        .map(|(_, f)| PaperFeatures {
            relevance: percentile_normalize(&relevances, f.relevance),
            log_citations: percentile_normalize(&citations, f.log_citations),
            citation_velocity: percentile_normalize(&velocities, f.citation_velocity),
            recency: f.recency,
            age_years: f.age_years,
            is_survey: f.is_survey,
            is_open_access: f.is_open_access,
            venue_signal: f.venue_signal,
        })
        .collect()
}

fn percentile_normalize(values: &[f64], value: f64) -> f64 {
    if values.is_empty() {
        return 0.5;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = sorted.len();
    let p25_idx = ((n as f64) * 0.25) as usize;
    let p75_idx = (((n as f64) * 0.75) as usize).min(n - 1);
    let p25 = sorted[p25_idx];
    let p75 = sorted[p75_idx];
    let iqr = p75 - p25;

    if iqr > 0.001 {
        ((value - p25) / iqr).clamp(0.0, 1.0)
    } else {
        let min = sorted[0];
        let max = sorted[n - 1];
        if max > min { (value - min) / (max - min) } else { 0.5 }
    }
}

const SOURCE_RELIABILITY: &[(&str, f64)] = &[
    ("semantic_scholar", 1.0),
    ("openalex", 0.9),
    ("crossref", 0.8),
    ("pubmed", 0.85),
    ("arxiv", 0.7),
];

fn reliability_for(source: &str) -> f64 {
    SOURCE_RELIABILITY.iter().find(|(s, _)| *s == source).map(|(_, w)| *w).unwrap_or(0.5)
}

pub fn compute_unified_relevance(paper: &MergedPaper, query: Option<&str>) -> f64 {
    let (source_relevance, _) = if paper.relevance_score > 0.0 {
        let sources: Vec<&str> = paper.sources.iter().map(|s| s.as_str()).collect();
        let avg_weight = if sources.is_empty() {
            0.5
        } else {
            sources.iter().map(|s| reliability_for(s)).sum::<f64>() / sources.len() as f64
        };
        (paper.relevance_score * avg_weight, avg_weight)
    } else {
        (0.5, 0.5)
    };

    let query_similarity = query.map(|q| compute_query_similarity(q, paper)).unwrap_or(0.0);
    let topic_overlap = compute_topic_overlap(paper);

    let relevance = if query.is_some() && query_similarity > 0.0 {
        0.4 * source_relevance + 0.4 * query_similarity + 0.2 * topic_overlap
    } else {
        0.7 * source_relevance + 0.3 * topic_overlap
    };

    relevance.clamp(0.0, 1.0)
}

pub fn compute_query_similarity(query: &str, paper: &MergedPaper) -> f64 {
    let query_lower = query.to_lowercase();
    let query_words: std::collections::HashSet<&str> = query_lower.split_whitespace().collect();
    if query_words.is_empty() {
        return 0.0;
    }

    let title_lower = paper.title.to_lowercase();
    let title_words: std::collections::HashSet<&str> = title_lower.split_whitespace().collect();
    let title_overlap = query_words.intersection(&title_words).count() as f64 / query_words.len() as f64;

    let abstract_overlap = paper
        .abstract_text
        .as_deref()
        .map(|a| {
            let lower = a.to_lowercase();
            let words: std::collections::HashSet<&str> = lower.split_whitespace().collect();
            query_words.intersection(&words).count() as f64 / query_words.len() as f64
        })
        .unwrap_or(0.0);

    let keyword_overlap = if paper.keywords.is_empty() {
        0.0
    } else {
        let keyword_words: std::collections::HashSet<String> =
            paper.keywords.iter().map(|k| k.to_lowercase()).collect();
        let keyword_refs: std::collections::HashSet<&str> = keyword_words.iter().map(|s| s.as_str()).collect();
        query_words.intersection(&keyword_refs).count() as f64 / query_words.len() as f64
    };

    (0.5 * title_overlap + 0.3 * abstract_overlap + 0.2 * keyword_overlap).min(1.0)
}

fn compute_topic_overlap(paper: &MergedPaper) -> f64 {
    if paper.topics.is_empty() {
        return 0.3;
    }
    (0.3 + paper.topics.len() as f64 / 10.0).min(1.0)
}

fn compute_venue_quality(paper: &MergedPaper) -> f64 {
    let Some(venue) = &paper.venue else { return 0.0 };
    let venue_lower = venue.to_lowercase();
    let mut score: f64 = 0.0;

    if TOP_TIER_VENUES.iter().any(|v| venue_lower.contains(v)) {
        score += 0.6;
    }

    match paper.work_type {
        WorkType::Journal | WorkType::Conference => score += 0.3,
        WorkType::Book => score += 0.1,
        _ => {}
    }

    score.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Author, DataQualityFlag, SourceTag};
    use std::collections::{BTreeSet, HashMap};

    fn paper() -> MergedPaper {
        MergedPaper {
            id: "1".into(),
            title: "Attention Is All You Need".into(),
            doi: None,
            arxiv_id: None,
            pmid: None,
            abstract_text: None,
            year: Some(2017),
            venue: None,
            authors: vec![Author::new("Ashish Vaswani")],
            citation_count: Some(1000),
            citation_source: Some(SourceTag::SemanticScholar),
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
            relevance_score: 0.8,
            data_quality_flags: BTreeSet::new(),
            work_key: "doi:x".into(),
            sources: vec![SourceTag::SemanticScholar],
            source_ids: HashMap::new(),
            field_provenance: HashMap::new(),
            score: 0.0,
            why_recommended: vec![],
            selected: false,
            comments: vec![],
        }
    }

    #[test]
    fn log_citations_matches_ln1p() {
        let p = paper();
        let f = compute_features(&p, 2026, None);
        assert!((f.log_citations - 1001.0_f64.ln()).abs() < 1e-9);
    }

    #[test]
    fn recency_decays_with_age() {
        let mut p = paper();
        p.year = Some(2026);
        let recent = compute_features(&p, 2026, None).recency;
        p.year = Some(2016);
        let old = compute_features(&p, 2026, None).recency;
        assert!(recent > old);
        assert!((recent - 1.0).abs() < 1e-9);
    }

    #[test]
    fn citation_velocity_uses_raw_count_for_brand_new_papers() {
        let mut p = paper();
        p.year = Some(2026);
        p.citation_count = Some(5);
        let f = compute_features(&p, 2026, None);
        assert!((f.citation_velocity - (1.0 + 5.0_f64).ln()).abs() < 1e-9);
    }

    #[test]
    fn venue_signal_rewards_top_tier_journal() {
        let mut p = paper();
        p.venue = Some("Nature".into());
        p.work_type = WorkType::Journal;
        assert!((compute_venue_quality(&p) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn venue_signal_zero_without_venue() {
        let p = paper();
        assert_eq!(compute_venue_quality(&p), 0.0);
    }

    #[test]
    fn normalize_features_empty_is_empty() {
        assert!(normalize_features(&[]).is_empty());
    }

    #[test]
    fn normalize_features_constant_input_falls_back_to_half() {
        let a = (paper(), PaperFeatures {
            relevance: 0.5, log_citations: 1.0, citation_velocity: 1.0, recency: 1.0,
            age_years: 0, is_survey: 0.0, is_open_access: 0.0, venue_signal: 0.0,
        });
        let b = a.clone();
        let normalized = normalize_features(&[a, b]);
        assert_eq!(normalized[0].log_citations, 0.5);
    }

    #[test]
    fn unified_relevance_uses_topic_overlap_without_query() {
        let mut p = paper();
        p.relevance_score = 0.0;
        p.topics = vec!["a".into(), "b".into()];
        let r = compute_unified_relevance(&p, None);
        assert!(r > 0.0 && r <= 1.0);
    }

    #[test]
    fn is_survey_and_open_access_are_binary() {
        let mut p = paper();
        p.is_survey = true;
        p.is_open_access = true;
        let f = compute_features(&p, 2026, None);
        assert_eq!(f.is_survey, 1.0);
        assert_eq!(f.is_open_access, 1.0);
    }
}
