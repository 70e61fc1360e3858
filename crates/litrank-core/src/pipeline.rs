//! The search orchestrator (§2): cache check, adapter fan-out, normalize,
//! cluster, merge, sanity-pass, dedup, enrich, rank, explain, cache.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{instrument, warn};

use crate::annotation::{AnnotationStore, WriteOutcome};
use crate::cache::{PaperCache, SearchCache, SearchCacheKey};
use crate::circuit_breaker::CircuitBreakerRegistry;
use crate::config::Config;
use crate::enrich::{enrich_papers, OpenAccessResolver};
use crate::error::{PipelineError, Result};
use crate::explain::add_explanations;
use crate::merge::{citation_age_sanity_pass, cluster_and_merge, safe_post_merge_dedup};
use crate::normalize::normalize_record;
use crate::ranking::{rank_papers, RankingMode};
use crate::source::{SearchParams, Source};
use crate::types::{MergedPaper, SourceOutcome, SourceTag};

/// The full set of filters that participate in the cache key and the
/// post-gather filtering stage (§4.13, §6).
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub query: String,
    pub mode: RankingMode,
    pub limit: usize,
    pub sort_by: SortBy,
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
    pub publication_types: Vec<String>,
    pub open_access_only: bool,
    pub survey_only: bool,
    pub bypass_cache: bool,
    /// Per-source candidate cap (§6's `limit_per_database`). Falls back to
    /// the configured default when absent.
    pub limit_per_source: Option<usize>,
    /// `None` means "include" — a source is only left out of the fan-out
    /// when its toggle is explicitly `Some(false)` (§6).
    pub include_pubmed: Option<bool>,
    pub include_arxiv: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    #[default]
    Relevance,
    Citations,
    Year,
}

impl Default for RankingMode {
    fn default() -> Self {
        RankingMode::Foundational
    }
}

#[derive(Debug, Clone)]
pub struct SearchResponse {
    pub results: Vec<MergedPaper>,
    pub query: String,
    pub mode: RankingMode,
    pub sort_by: SortBy,
    pub limit: usize,
    pub total_candidates: usize,
    pub source_stats: HashMap<SourceTag, usize>,
}

/// The cache cap on stored ranked candidates (§4.10).
const CACHE_RESULT_CAP: usize = 100;

pub struct Pipeline {
    config: Config,
    sources: Vec<Arc<dyn Source>>,
    circuit_breakers: CircuitBreakerRegistry,
    search_cache: SearchCache,
    paper_cache: PaperCache,
    oa_resolver: Arc<dyn OpenAccessResolver>,
    annotation_store: Arc<dyn AnnotationStore>,
}

impl Pipeline {
    pub fn new(
        config: Config,
        sources: Vec<Arc<dyn Source>>,
        oa_resolver: Arc<dyn OpenAccessResolver>,
        annotation_store: Arc<dyn AnnotationStore>,
    ) -> Self {
        Self {
            search_cache: SearchCache::new(config.search_cache_ttl),
            paper_cache: PaperCache::new(config.paper_cache_ttl),
            config,
            sources,
            circuit_breakers: CircuitBreakerRegistry::new(),
            oa_resolver,
            annotation_store,
        }
    }

    fn source_tag_for(source: &dyn Source) -> SourceTag {
        match source.id() {
            "semantic_scholar" => SourceTag::SemanticScholar,
            "openalex" => SourceTag::OpenAlex,
            "pubmed" => SourceTag::Pubmed,
            "arxiv" => SourceTag::Arxiv,
            "crossref" => SourceTag::Crossref,
            _ => SourceTag::OpenAccessResolver,
        }
    }

    /// `include_pubmed`/`include_arxiv` toggles (§6) filtered against the
    /// configured source list; every other source is always enabled.
    fn enabled_sources(&self, request: &SearchRequest) -> Vec<&Arc<dyn Source>> {
        self.sources
            .iter()
            .filter(|source| match Self::source_tag_for(source.as_ref()) {
                SourceTag::Pubmed => request.include_pubmed.unwrap_or(true),
                SourceTag::Arxiv => request.include_arxiv.unwrap_or(true),
                _ => true,
            })
            .collect()
    }

    /// Query every enabled, available source in parallel. A source skipped by
    /// its circuit breaker, or one whose call fails, contributes an empty
    /// result rather than failing the whole request (§5, §7).
    #[instrument(skip(self, sources))]
    async fn fan_out(&self, params: SearchParams<'_>, sources: &[&Arc<dyn Source>]) -> Vec<SourceOutcome> {
        let futures = sources.iter().map(|source| {
            let tag = Self::source_tag_for(source.as_ref());
            let source = Arc::clone(source);
            async move {
                if !self.circuit_breakers.is_source_available(tag) {
                    warn!(source = tag.as_str(), "circuit breaker open, skipping source");
                    return SourceOutcome::skipped(tag, "circuit breaker open");
                }
                match source.search(params).await {
                    Ok(records) => {
                        self.circuit_breakers.record_success(tag);
                        SourceOutcome::ok(tag, records)
                    }
                    Err(err) => {
                        warn!(source = tag.as_str(), error = %err, "adapter call failed");
                        self.circuit_breakers.record_failure(tag);
                        SourceOutcome::skipped(tag, err.to_string())
                    }
                }
            }
        });
        futures::future::join_all(futures).await
    }

    fn cache_key(&self, request: &SearchRequest) -> SearchCacheKey {
        let sources = self.enabled_sources(request).iter().map(|s| s.id().to_string()).collect();
        SearchCacheKey::new(
            &request.query,
            mode_str(request.mode),
            request.year_min,
            request.year_max,
            request.publication_types.clone(),
            request.survey_only,
            request.open_access_only,
            sources,
        )
    }

    /// Run the full pipeline for `request`, validating first (§6's 422/400
    /// rules), then checking the cache, then gathering/merging/ranking.
    #[instrument(skip(self))]
    pub async fn search(&self, request: SearchRequest) -> Result<SearchResponse> {
        validate(&request)?;

        let key = self.cache_key(&request);
        let current_year_i32 = current_year();

        if !request.bypass_cache {
            if let Some(cached) = self.search_cache.get(&key) {
                let mut response = self.present(cached.papers, &request);
                response.total_candidates = cached.total_candidates;
                response.source_stats = cached.source_stats;
                return Ok(response);
            }
        }

        let params = SearchParams {
            query: &request.query,
            limit: request.limit_per_source.unwrap_or(self.config.default_candidates_per_source),
            year_min: request.year_min,
            year_max: request.year_max,
        };
        let sources = self.enabled_sources(&request);
        let outcomes = self.fan_out(params, &sources).await;

        let mut source_stats = HashMap::new();
        let mut records = Vec::new();
        for outcome in outcomes {
            source_stats.insert(outcome.source, outcome.records.len());
            records.extend(outcome.records);
        }
        for record in records.iter_mut() {
            normalize_record(record, current_year_i32);
        }

        let mut merged = cluster_and_merge(records);
        for paper in merged.iter_mut() {
            citation_age_sanity_pass(paper, current_year_i32);
        }
        let mut merged = safe_post_merge_dedup(merged);

        merged.retain(|p| passes_filters(p, &request));

        merged = enrich_papers(merged, self.oa_resolver.as_ref(), true).await;

        let total_candidates = merged.len();
        let mut ranked = rank_papers(merged, request.mode, CACHE_RESULT_CAP, request.survey_only, Some(&request.query), current_year_i32);
        ranked = add_explanations(ranked, request.mode, current_year_i32);

        for paper in &ranked {
            self.paper_cache.set(paper.clone());
        }
        self.search_cache.set(&key, ranked.clone(), total_candidates, source_stats.clone());

        let mut response = self.present(ranked, &request);
        response.total_candidates = total_candidates;
        response.source_stats = source_stats;
        Ok(response)
    }

    /// Apply `sort_by` and `limit` to a full cached/ranked candidate set.
    /// `total_candidates`/`source_stats` are filled in by the caller from the
    /// same cache entry so they stay identical across `sort_by`/`limit` changes.
    fn present(&self, mut papers: Vec<MergedPaper>, request: &SearchRequest) -> SearchResponse {
        match request.sort_by {
            SortBy::Relevance => papers.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap()),
            SortBy::Citations => papers.sort_by(|a, b| b.citation_count.unwrap_or(0).cmp(&a.citation_count.unwrap_or(0))),
            SortBy::Year => papers.sort_by(|a, b| b.year.unwrap_or(0).cmp(&a.year.unwrap_or(0))),
        }
        papers.truncate(request.limit);
        SearchResponse {
            results: papers,
            query: request.query.clone(),
            mode: request.mode,
            sort_by: request.sort_by,
            limit: request.limit,
            total_candidates: 0,
            source_stats: HashMap::new(),
        }
    }

    pub fn get_paper(&self, id: &str) -> Option<MergedPaper> {
        self.paper_cache.get_by_id(id)
    }

    pub async fn set_selected(&self, paper_id: &str, selected: bool) -> WriteOutcome {
        self.annotation_store.set_selected(paper_id, selected).await
    }

    pub async fn set_comment(&self, paper_id: &str, comment: &str) -> WriteOutcome {
        self.annotation_store.set_comment(paper_id, comment).await
    }

    /// Papers the annotation store has on record as bookmarked, resolved
    /// against the paper cache. An id with no cached paper (evicted by TTL)
    /// is silently dropped rather than surfaced as an error (§6).
    pub async fn bookmarked_papers(&self) -> Vec<MergedPaper> {
        let ids = self.annotation_store.bookmarked_paper_ids().await;
        ids.iter().filter_map(|id| self.paper_cache.get_by_id(id)).collect()
    }

    pub async fn papers_with_notes(&self) -> Vec<MergedPaper> {
        let ids = self.annotation_store.paper_ids_with_notes().await;
        ids.iter().filter_map(|id| self.paper_cache.get_by_id(id)).collect()
    }

    /// One-hop "related papers" (§6, §1 Non-goals: no deeper traversal):
    /// fetches Semantic Scholar citations/references and OpenAlex related
    /// works for the paper's own source ids, then normalizes, merges,
    /// enriches and ranks them the same way a regular search does.
    #[instrument(skip(self))]
    pub async fn related_papers(&self, paper_id: &str, limit: usize) -> Result<Vec<MergedPaper>> {
        let Some(paper) = self.get_paper(paper_id) else {
            return Ok(Vec::new());
        };
        let current_year_i32 = current_year();

        let s2 = self.sources.iter().find(|s| s.id() == "semantic_scholar");
        let oa = self.sources.iter().find(|s| s.id() == "openalex");
        let s2_id = paper.source_ids.get(&SourceTag::SemanticScholar);
        let oa_id = paper.source_ids.get(&SourceTag::OpenAlex);

        let edge_limit = self.config.default_candidates_per_source;
        let citations = async {
            match (s2, s2_id) {
                (Some(source), Some(id)) => source.get_citations(id, edge_limit).await.unwrap_or_default(),
                _ => Vec::new(),
            }
        };
        let references = async {
            match (s2, s2_id) {
                (Some(source), Some(id)) => source.get_references(id, edge_limit).await.unwrap_or_default(),
                _ => Vec::new(),
            }
        };
        let related = async {
            match (oa, oa_id) {
                (Some(source), Some(id)) => source.get_related_works(id, edge_limit).await.unwrap_or_default(),
                _ => Vec::new(),
            }
        };
        let (citations, references, related) = tokio::join!(citations, references, related);

        let mut records: Vec<_> = citations.into_iter().chain(references).chain(related).collect();
        if records.is_empty() {
            return Ok(Vec::new());
        }
        for record in records.iter_mut() {
            normalize_record(record, current_year_i32);
        }

        let mut merged = cluster_and_merge(records);
        for p in merged.iter_mut() {
            citation_age_sanity_pass(p, current_year_i32);
        }
        let merged = safe_post_merge_dedup(merged);
        let merged = enrich_papers(merged, self.oa_resolver.as_ref(), true).await;

        let mut ranked = rank_papers(merged, RankingMode::Foundational, limit + 1, false, None, current_year_i32);
        ranked = add_explanations(ranked, RankingMode::Foundational, current_year_i32);
        ranked.retain(|p| p.id != paper_id);
        ranked.truncate(limit);
        Ok(ranked)
    }

    /// Publication (journal/conference/book) detail lookup (§6). No store of
    /// publication-level metadata exists yet, so this always reports 501.
    pub fn get_publication(&self, _publication_id: &str) -> Result<()> {
        Err(PipelineError::NotImplemented("publication".into()))
    }
}

fn mode_str(mode: RankingMode) -> &'static str {
    match mode {
        RankingMode::Foundational => "foundational",
        RankingMode::Recent => "recent",
    }
}

fn validate(request: &SearchRequest) -> Result<()> {
    if request.query.trim().chars().count() < 2 {
        return Err(PipelineError::InvalidRequest("q must be at least 2 characters".into()));
    }
    if !(1..=100).contains(&request.limit) {
        return Err(PipelineError::InvalidRequest("limit must be between 1 and 100".into()));
    }
    if let (Some(min), Some(max)) = (request.year_min, request.year_max) {
        if min > max {
            return Err(PipelineError::BadInput("year_min must not exceed year_max".into()));
        }
    }
    Ok(())
}

fn passes_filters(paper: &MergedPaper, request: &SearchRequest) -> bool {
    if request.open_access_only && !paper.is_open_access {
        return false;
    }
    if request.survey_only && !paper.is_survey {
        return false;
    }
    if !request.publication_types.is_empty() {
        let type_name = work_type_name(paper);
        if !request.publication_types.iter().any(|t| t.eq_ignore_ascii_case(type_name)) {
            return false;
        }
    }
    true
}

fn work_type_name(paper: &MergedPaper) -> &'static str {
    use crate::types::WorkType;
    match paper.work_type {
        WorkType::Journal => "Journal",
        WorkType::Conference => "Conference Proceedings",
        WorkType::Book => "Book",
        WorkType::Chapter => "Chapter",
        WorkType::Preprint => "Preprint",
        WorkType::Survey => "Survey",
        WorkType::Unknown => "Unknown",
    }
}

fn current_year() -> i32 {
    chrono::Utc::now().year()
}

use chrono::Datelike;
