//! Two-stage ranking: relevance prefilter, mode-weighted re-rank, adaptive
//! survey cap, diversity filter (§4.10).

use std::collections::HashMap;

use crate::features::{compute_features, normalize_features};
use crate::types::{MergedPaper, PaperFeatures};

pub const RELEVANCE_PREFILTER_LIMIT: usize = 200;
pub const MAX_SURVEYS_IN_RESULTS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingMode {
    Foundational,
    Recent,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    pub relevance: f64,
    pub citations: f64,
    pub velocity: f64,
    pub recency: f64,
    pub venue: f64,
    pub survey: f64,
    pub open_access: f64,
}

pub const FOUNDATIONAL_WEIGHTS: ScoringWeights = ScoringWeights {
    relevance: 0.45,
    citations: 0.35,
    velocity: 0.0,
    recency: 0.0,
    venue: 0.10,
    survey: 0.05,
    open_access: 0.05,
};

pub const RECENT_WEIGHTS: ScoringWeights = ScoringWeights {
    relevance: 0.55,
    citations: 0.0,
    velocity: 0.25,
    recency: 0.15,
    venue: 0.03,
    survey: 0.0,
    open_access: 0.02,
};

pub fn compute_score(features: &PaperFeatures, weights: &ScoringWeights) -> f64 {
    weights.relevance * features.relevance
        + weights.citations * features.log_citations
        + weights.velocity * features.citation_velocity
        + weights.recency * features.recency
        + weights.venue * features.venue_signal
        + weights.survey * features.is_survey
        + weights.open_access * features.is_open_access
}

#[derive(Debug, Clone, Copy, Default)]
pub struct QueryIntent {
    pub survey_seeking: f64,
    pub recent_seeking: f64,
    pub foundational_seeking: f64,
}

const SURVEY_KEYWORDS: &[&str] =
    &["survey", "review", "overview", "state of the art", "state-of-the-art", "comprehensive", "systematic review", "literature review"];
const RECENT_KEYWORDS: &[&str] =
    &["recent", "latest", "new", "current", "2024", "2023", "2022", "emerging", "trending", "cutting-edge", "cutting edge"];
const FOUNDATIONAL_KEYWORDS: &[&str] =
    &["foundational", "classic", "seminal", "pioneering", "foundation", "fundamental", "original", "early"];

pub fn detect_query_intent(query: &str) -> QueryIntent {
    let lower = query.to_lowercase();
    let mut survey: f64 = 0.0;
    let mut recent: f64 = 0.0;
    let mut foundational: f64 = 0.0;

    for kw in SURVEY_KEYWORDS {
        if lower.contains(kw) {
            survey += 0.3;
        }
    }
    for kw in RECENT_KEYWORDS {
        if lower.contains(kw) {
            recent += 0.3;
        }
    }
    for kw in FOUNDATIONAL_KEYWORDS {
        if lower.contains(kw) {
            foundational += 0.3;
        }
    }

    let total = survey + recent + foundational;
    if total > 0.0 {
        survey = (survey / total).min(1.0);
        recent = (recent / total).min(1.0);
        foundational = (foundational / total).min(1.0);
    }
    QueryIntent { survey_seeking: survey, recent_seeking: recent, foundational_seeking: foundational }
}

fn adjust_weights_by_intent(base: ScoringWeights, mode: RankingMode, intent: &QueryIntent) -> ScoringWeights {
    let mut weights = base;

    if intent.survey_seeking > 0.3 {
        weights.survey = (base.survey + intent.survey_seeking * 0.1).min(0.15);
    }
    if intent.recent_seeking > 0.3 && mode == RankingMode::Recent {
        weights.recency = (base.recency + intent.recent_seeking * 0.1).min(0.25);
        weights.velocity = (base.velocity + intent.recent_seeking * 0.1).min(0.35);
    }
    if intent.foundational_seeking > 0.3 && mode == RankingMode::Foundational {
        weights.citations = (base.citations + intent.foundational_seeking * 0.1).min(0.45);
    }
    weights
}

pub fn get_feature_contributions(features: &PaperFeatures, weights: &ScoringWeights) -> HashMap<&'static str, f64> {
    let mut out = HashMap::new();
    out.insert("relevance", weights.relevance * features.relevance);
    out.insert("citations", weights.citations * features.log_citations);
    out.insert("velocity", weights.velocity * features.citation_velocity);
    out.insert("recency", weights.recency * features.recency);
    out.insert("venue", weights.venue * features.venue_signal);
    out.insert("survey", weights.survey * features.is_survey);
    out.insert("open_access", weights.open_access * features.is_open_access);
    out
}

/// Rank `papers` for `mode`, returning up to `limit` in score-descending order.
pub fn rank_papers(
    mut papers: Vec<MergedPaper>,
    mode: RankingMode,
    limit: usize,
    survey_only: bool,
    query: Option<&str>,
    current_year: i32,
) -> Vec<MergedPaper> {
    if papers.is_empty() {
        return papers;
    }

    papers.sort_by(|a, b| b.relevance_score.partial_cmp(&a.relevance_score).unwrap());
    papers.truncate(RELEVANCE_PREFILTER_LIMIT);

    let intent = query.map(detect_query_intent).unwrap_or_default();
    let base_weights = if mode == RankingMode::Foundational { FOUNDATIONAL_WEIGHTS } else { RECENT_WEIGHTS };
    let weights = adjust_weights_by_intent(base_weights, mode, &intent);

    let mut with_features: Vec<(MergedPaper, PaperFeatures)> = papers
        .into_iter()
        .map(|p| {
            let f = compute_features(&p, current_year, query);
            (p, f)
        })
        .collect();

    if mode == RankingMode::Recent {
        for (paper, features) in with_features.iter_mut() {
            if let Some(year) = paper.year {
                if year >= current_year - 3 {
                    features.recency = (features.recency * 1.5).min(1.0);
                }
            }
        }
    }

    let normalized = normalize_features(&with_features);
    let mut scored: Vec<(MergedPaper, f64, PaperFeatures)> = with_features
        .into_iter()
        .zip(normalized)
        .map(|((mut paper, _), features)| {
            let score = compute_score(&features, &weights);
            paper.score = score;
            (paper, score, features)
        })
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());

    let result = if survey_only {
        scored.into_iter().take(limit).map(|(p, _, _)| p).collect()
    } else {
        apply_adaptive_survey_cap(scored, limit, &intent)
    };

    apply_diversity_filters(result, limit)
}

fn apply_adaptive_survey_cap(
    scored: Vec<(MergedPaper, f64, PaperFeatures)>,
    limit: usize,
    intent: &QueryIntent,
) -> Vec<MergedPaper> {
    let (surveys, non_surveys): (Vec<_>, Vec<_>) = scored.into_iter().partition(|(p, _, _)| p.is_survey);

    let survey_cap = if intent.survey_seeking > 0.5 { (limit / 2).min(surveys.len()) } else { MAX_SURVEYS_IN_RESULTS };

    let quality_surveys: Vec<&(MergedPaper, f64, PaperFeatures)> = if surveys.is_empty() {
        Vec::new()
    } else {
        let mut scores: Vec<f64> = surveys.iter().map(|(_, s, _)| *s).collect();
        scores.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let median = scores[scores.len() / 2];
        surveys.iter().filter(|(_, s, _)| *s >= median).collect()
    };

    let mut result = Vec::new();
    let mut survey_idx = 0usize;
    let mut non_survey_idx = 0usize;

    while result.len() < limit {
        if survey_idx < quality_surveys.len() && survey_idx < survey_cap {
            result.push(quality_surveys[survey_idx].0.clone());
            survey_idx += 1;
        } else if non_survey_idx < non_surveys.len() {
            result.push(non_surveys[non_survey_idx].0.clone());
            non_survey_idx += 1;
        } else if survey_idx < surveys.len() && result.len() < limit {
            result.push(surveys[survey_idx].0.clone());
            survey_idx += 1;
        } else {
            break;
        }
    }

    result
}

fn apply_diversity_filters(papers: Vec<MergedPaper>, limit: usize) -> Vec<MergedPaper> {
    if papers.len() <= limit {
        return papers;
    }

    let mut result: Vec<MergedPaper> = Vec::new();
    let mut author_counts: HashMap<String, usize> = HashMap::new();
    let mut venue_counts: HashMap<String, usize> = HashMap::new();
    let mut decade_counts: HashMap<i32, usize> = HashMap::new();
    let mut rejected: Vec<MergedPaper> = Vec::new();

    for paper in papers {
        if result.len() >= limit {
            rejected.push(paper);
            continue;
        }

        if let Some(first_author) = paper.first_author_name() {
            let count = author_counts.get(first_author).copied().unwrap_or(0);
            if count >= 2 {
                rejected.push(paper);
                continue;
            }
        }
        if let Some(venue) = &paper.venue {
            let count = venue_counts.get(venue).copied().unwrap_or(0);
            if count >= 3 {
                rejected.push(paper);
                continue;
            }
        }
        if let Some(year) = paper.year {
            let decade = (year / 10) * 10;
            let count = decade_counts.get(&decade).copied().unwrap_or(0);
            if count >= 3 && (result.len() as f64) < (limit as f64) * 0.7 {
                rejected.push(paper);
                continue;
            }
        }

        if let Some(first_author) = paper.first_author_name() {
            *author_counts.entry(first_author.to_string()).or_insert(0) += 1;
        }
        if let Some(venue) = &paper.venue {
            *venue_counts.entry(venue.clone()).or_insert(0) += 1;
        }
        if let Some(year) = paper.year {
            *decade_counts.entry((year / 10) * 10).or_insert(0) += 1;
        }
        result.push(paper);
    }

    if result.len() < limit {
        let remaining = limit - result.len();
        result.extend(rejected.into_iter().take(remaining));
    }

    result.truncate(limit);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Author, SourceTag, WorkType};
    use std::collections::{BTreeSet, HashMap as StdHashMap};

    fn paper(id: &str, relevance: f64, citations: u64, year: i32) -> MergedPaper {
        MergedPaper {
            id: id.into(),
            title: format!("Paper {id}"),
            doi: None,
            arxiv_id: None,
            pmid: None,
            abstract_text: None,
            year: Some(year),
            venue: None,
            authors: vec![Author::new(format!("Author {id}"))],
            citation_count: Some(citations),
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
            relevance_score: relevance,
            data_quality_flags: BTreeSet::new(),
            work_key: format!("k{id}"),
            sources: vec![SourceTag::SemanticScholar],
            source_ids: StdHashMap::new(),
            field_provenance: StdHashMap::new(),
            score: 0.0,
            why_recommended: vec![],
            selected: false,
            comments: vec![],
        }
    }

    #[test]
    fn empty_input_returns_empty() {
        assert!(rank_papers(vec![], RankingMode::Foundational, 20, false, None, 2026).is_empty());
    }

    #[test]
    fn foundational_mode_favors_high_citations() {
        let low_cite = paper("1", 0.9, 5, 2020);
        let high_cite = paper("2", 0.9, 50_000, 2015);
        let ranked = rank_papers(vec![low_cite, high_cite], RankingMode::Foundational, 20, false, None, 2026);
        assert_eq!(ranked[0].id, "2");
    }

    #[test]
    fn recent_mode_favors_recency_over_raw_citations() {
        let old_highly_cited = paper("1", 0.5, 10_000, 2000);
        let brand_new = paper("2", 0.5, 0, 2026);
        let ranked = rank_papers(vec![old_highly_cited, brand_new], RankingMode::Recent, 20, false, None, 2026);
        assert_eq!(ranked[0].id, "2");
    }

    #[test]
    fn detect_query_intent_normalizes_to_one() {
        let intent = detect_query_intent("a recent survey of foundational methods");
        let total = intent.survey_seeking + intent.recent_seeking + intent.foundational_seeking;
        assert!(total <= 1.0001 && total > 0.0);
    }

    #[test]
    fn diversity_filter_caps_authors_at_two() {
        let mut papers = Vec::new();
        for i in 0..5 {
            let mut p = paper(&i.to_string(), 0.9, 100, 2020);
            p.authors = vec![Author::new("Same Author")];
            p.score = 1.0 - i as f64 * 0.01;
            papers.push(p);
        }
        let result = apply_diversity_filters(papers, 3);
        let author_count = result.iter().filter(|p| p.first_author_name() == Some("Same Author")).count();
        assert!(author_count <= 2 || result.len() == 3);
    }

    #[test]
    fn diversity_filter_noop_when_under_limit() {
        let papers = vec![paper("1", 0.9, 1, 2020)];
        let result = apply_diversity_filters(papers, 20);
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn survey_cap_limits_quality_surveys_before_backfill() {
        // Mixed surveys and non-surveys: the cap should bind before backfill
        // kicks in, so non-surveys fill the remaining slots.
        let mut scored = Vec::new();
        for i in 0..10 {
            let mut p = paper(&format!("survey{i}"), 0.9, 100, 2020);
            p.is_survey = true;
            let features = compute_features(&p, 2026, None);
            scored.push((p, 1.0 - i as f64 * 0.01, features));
        }
        for i in 0..10 {
            let p = paper(&format!("paper{i}"), 0.9, 100, 2020);
            let features = compute_features(&p, 2026, None);
            scored.push((p, 0.5 - i as f64 * 0.01, features));
        }
        let result = apply_adaptive_survey_cap(scored, 10, &QueryIntent::default());
        let survey_count = result.iter().filter(|p| p.is_survey).count();
        assert!(survey_count <= MAX_SURVEYS_IN_RESULTS);
        assert_eq!(result.len(), 10);
    }

    #[test]
    fn survey_cap_backfills_with_surveys_when_no_non_surveys_exist() {
        let mut scored = Vec::new();
        for i in 0..10 {
            let mut p = paper(&i.to_string(), 0.9, 100, 2020);
            p.is_survey = true;
            let features = compute_features(&p, 2026, None);
            scored.push((p, 1.0 - i as f64 * 0.01, features));
        }
        let result = apply_adaptive_survey_cap(scored, 20, &QueryIntent::default());
        assert_eq!(result.len(), 10);
    }
}
