//! "Why recommended" bullet generation (§4.12).

use crate::features::compute_features;
use crate::ranking::{get_feature_contributions, RankingMode, FOUNDATIONAL_WEIGHTS, RECENT_WEIGHTS};
use crate::types::{MergedPaper, PaperFeatures};

const MAX_BULLETS: usize = 4;

fn bullet(key: &str) -> String {
    match key {
        "high_relevance" => "High semantic match to your topic",
        "top_cited" => "Top-cited within the candidate set",
        "classic" => "Classic paper in the field",
        "fast_growth" => "Fast citation growth for a recent paper",
        "trending" => "Trending: rising citations",
        "survey" => "Survey/Review (good starting point)",
        "open_access" => "Open access available",
        "venue" => "Published in recognized venue",
        _ => unreachable!("unknown bullet key {key}"),
    }
    .to_string()
}

/// Attach `why_recommended` bullets to every paper in `papers`, using the
/// full candidate set for citation-percentile context.
pub fn add_explanations(mut papers: Vec<MergedPaper>, mode: RankingMode, current_year: i32) -> Vec<MergedPaper> {
    let all_citations: Vec<u64> = {
        let mut v: Vec<u64> = papers.iter().map(|p| p.citation_count.unwrap_or(0)).collect();
        v.sort_unstable();
        v
    };

    for paper in papers.iter_mut() {
        paper.why_recommended = generate_why_bullets(paper, mode, &all_citations, current_year);
    }
    papers
}

fn generate_why_bullets(paper: &MergedPaper, mode: RankingMode, all_citations: &[u64], current_year: i32) -> Vec<String> {
    let features = compute_features(paper, current_year, None);
    let weights = if mode == RankingMode::Foundational { FOUNDATIONAL_WEIGHTS } else { RECENT_WEIGHTS };
    let contributions = get_feature_contributions(&features, &weights);

    let mut sorted: Vec<(&str, f64)> = contributions.into_iter().collect();
    sorted.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());

    let paper_citations = paper.citation_count.unwrap_or(0);
    let citation_percentile = if all_citations.is_empty() {
        0.0
    } else {
        let below = all_citations.iter().filter(|&&c| c < paper_citations).count();
        below as f64 / all_citations.len() as f64
    };

    let mut bullets = Vec::new();
    for (feature, contribution) in sorted {
        if contribution <= 0.0 {
            continue;
        }
        if bullets.len() >= MAX_BULLETS {
            break;
        }
        if let Some(text) = feature_to_bullet(feature, contribution, paper, &features, mode, citation_percentile, current_year) {
            if !bullets.contains(&text) {
                bullets.push(text);
            }
        }
    }

    if paper.is_open_access && bullets.len() < MAX_BULLETS {
        let text = bullet("open_access");
        if !bullets.contains(&text) {
            bullets.push(text);
        }
    }
    if paper.is_survey && bullets.len() < MAX_BULLETS {
        let text = bullet("survey");
        if !bullets.contains(&text) {
            bullets.push(text);
        }
    }

    bullets.truncate(MAX_BULLETS);
    bullets
}

fn feature_to_bullet(
    feature: &str,
    contribution: f64,
    paper: &MergedPaper,
    features: &PaperFeatures,
    mode: RankingMode,
    citation_percentile: f64,
    current_year: i32,
) -> Option<String> {
    match feature {
        "relevance" if contribution > 0.1 => {
            if features.relevance > 0.6 { Some(bullet("high_relevance")) } else { None }
        }
        "citations" => {
            if citation_percentile >= 0.9 {
                Some(bullet("top_cited"))
            } else if paper.citation_count.is_some_and(|c| c >= 1000) {
                Some(format!("Highly cited ({} citations)", paper.citation_count.unwrap()))
            } else if paper.citation_count.is_some_and(|c| c >= 100) && features.age_years >= 10 {
                Some(bullet("classic"))
            } else {
                None
            }
        }
        "velocity" => {
            if mode == RankingMode::Recent && contribution > 0.1 {
                Some(bullet("fast_growth"))
            } else if contribution > 0.05 {
                Some(bullet("trending"))
            } else {
                None
            }
        }
        "recency" => {
            if paper.year.is_some_and(|y| y >= current_year - 2) {
                Some(format!("Published recently ({})", paper.year.unwrap()))
            } else {
                None
            }
        }
        "survey" if paper.is_survey => Some(bullet("survey")),
        "open_access" if paper.is_open_access => Some(bullet("open_access")),
        "venue" if paper.venue.is_some() => Some(bullet("venue")),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Author, SourceTag, WorkType};
    use std::collections::{BTreeSet, HashMap};

    fn paper(citations: u64, year: i32) -> MergedPaper {
        MergedPaper {
            id: "1".into(),
            title: "Some Paper".into(),
            doi: None,
            arxiv_id: None,
            pmid: None,
            abstract_text: None,
            year: Some(year),
            venue: None,
            authors: vec![Author::new("A Author")],
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
            relevance_score: 0.9,
            data_quality_flags: BTreeSet::new(),
            work_key: "k1".into(),
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
    fn highly_cited_paper_gets_citation_bullet() {
        let p = paper(5000, 2010);
        let out = add_explanations(vec![p], RankingMode::Foundational, 2026);
        assert!(out[0].why_recommended.iter().any(|b| b.contains("cited") || b.contains("Cited")));
    }

    #[test]
    fn open_access_always_appended_when_flagged() {
        let mut p = paper(10, 2024);
        p.is_open_access = true;
        let out = add_explanations(vec![p], RankingMode::Foundational, 2026);
        assert!(out[0].why_recommended.contains(&"Open access available".to_string()));
    }

    #[test]
    fn survey_bullet_appended_when_flagged() {
        let mut p = paper(10, 2024);
        p.is_survey = true;
        let out = add_explanations(vec![p], RankingMode::Foundational, 2026);
        assert!(out[0].why_recommended.contains(&"Survey/Review (good starting point)".to_string()));
    }

    #[test]
    fn bullets_never_exceed_max() {
        let mut p = paper(50_000, 2009);
        p.is_open_access = true;
        p.is_survey = true;
        p.venue = Some("Nature".into());
        let out = add_explanations(vec![p], RankingMode::Foundational, 2026);
        assert!(out[0].why_recommended.len() <= MAX_BULLETS);
    }

    #[test]
    fn bullets_contain_no_duplicates() {
        let mut p = paper(50_000, 2009);
        p.is_open_access = true;
        let out = add_explanations(vec![p], RankingMode::Foundational, 2026);
        let unique: std::collections::HashSet<&String> = out[0].why_recommended.iter().collect();
        assert_eq!(unique.len(), out[0].why_recommended.len());
    }
}
