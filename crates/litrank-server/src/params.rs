use schemars::JsonSchema;
use serde::Deserialize;

use litrank_core::pipeline::{SearchRequest, SortBy};
use litrank_core::RankingMode;

/// Parameters for the `search` tool: fan a query out to every enabled
/// bibliographic source and return ranked, deduplicated papers.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SearchToolParams {
    /// The research-paper search query.
    pub query: String,

    /// Ranking mode: `"foundational"` favors highly-cited, influential work;
    /// `"recent"` favors recency. Defaults to `"foundational"`.
    pub mode: Option<String>,

    /// Maximum number of ranked results to return. Defaults to 20.
    pub limit: Option<usize>,

    /// Sort key applied after ranking: `"relevance"`, `"citations"`, or `"year"`.
    pub sort_by: Option<String>,

    /// Earliest publication year to include.
    pub year_min: Option<i32>,

    /// Latest publication year to include.
    pub year_max: Option<i32>,

    /// Publication type filter (e.g. `"journal-article"`, `"preprint"`).
    pub publication_types: Option<Vec<String>>,

    /// Only include open-access papers.
    pub oa_only: Option<bool>,

    /// Only include survey/review papers.
    pub survey_only: Option<bool>,

    /// Per-source candidate cap before merging. Defaults to the configured value.
    pub limit_per_database: Option<usize>,

    /// Whether to query PubMed for this request. Defaults to true.
    pub include_pubmed: Option<bool>,

    /// Whether to query arXiv for this request. Defaults to true.
    pub include_arxiv: Option<bool>,

    /// Skip the query-keyed result cache and re-run the full pipeline.
    pub bypass_cache: Option<bool>,
}

impl SearchToolParams {
    pub fn into_search_request(self) -> SearchRequest {
        SearchRequest {
            query: self.query,
            mode: match self.mode.as_deref() {
                Some("recent") => RankingMode::Recent,
                _ => RankingMode::Foundational,
            },
            limit: self.limit.unwrap_or(20),
            sort_by: match self.sort_by.as_deref() {
                Some("citations") => SortBy::Citations,
                Some("year") => SortBy::Year,
                _ => SortBy::Relevance,
            },
            year_min: self.year_min,
            year_max: self.year_max,
            publication_types: self.publication_types.unwrap_or_default(),
            open_access_only: self.oa_only.unwrap_or(false),
            survey_only: self.survey_only.unwrap_or(false),
            limit_per_source: self.limit_per_database,
            include_pubmed: self.include_pubmed,
            include_arxiv: self.include_arxiv,
            bypass_cache: self.bypass_cache.unwrap_or(false),
        }
    }
}

/// Parameters for tools that operate on a single already-ranked paper.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct PaperIdToolParams {
    /// The merged paper id, as returned by a prior `search` call.
    pub id: String,
}

/// Parameters for the `related_papers` tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RelatedToolParams {
    /// The merged paper id, as returned by a prior `search` call.
    pub id: String,

    /// Maximum number of related papers to return. Defaults to 20.
    pub limit: Option<usize>,
}

/// Parameters for the `select` tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SelectToolParams {
    /// The merged paper id.
    pub id: String,

    /// Whether the paper should be bookmarked.
    pub selected: bool,
}

/// Parameters for the `comment` tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CommentToolParams {
    /// The merged paper id.
    pub id: String,

    /// Free-text note to attach to the paper.
    pub text: String,
}
