//! Semantic Scholar Graph API adapter.

use async_trait::async_trait;
use chrono::Datelike;
use serde::Deserialize;
use tracing::instrument;

use litrank_core::retry::{api_retry_config, with_retry};
use litrank_core::source::{relevance_from_rank, SearchParams, Source, SourceError};
use litrank_core::types::{Author, PaperRecord, SourceTag};

use crate::error::{Result, SemanticScholarError};

const DEFAULT_BASE_URL: &str = "https://api.semanticscholar.org/graph/v1";

const PAPER_FIELDS: &str = "paperId,title,abstract,year,venue,authors,citationCount,\
isOpenAccess,openAccessPdf,externalIds,publicationTypes,s2FieldsOfStudy";

/// Client for the Semantic Scholar Academic Graph API.
pub struct SemanticScholarClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl SemanticScholarClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self { http: reqwest::Client::new(), base_url: DEFAULT_BASE_URL.to_string(), api_key }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn headers(&self) -> reqwest::header::HeaderMap {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(reqwest::header::ACCEPT, "application/json".parse().unwrap());
        if let Some(key) = &self.api_key {
            if let Ok(value) = key.parse() {
                headers.insert("x-api-key", value);
            }
        }
        headers
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<serde_json::Value> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.http.get(&url).headers(self.headers()).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SemanticScholarError::Api { status: status.as_u16(), message });
        }
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(SemanticScholarError::Json)
    }

    async fn search_raw(&self, params: SearchParams<'_>) -> Result<Vec<RawPaper>> {
        let mut year_filter = String::new();
        if params.year_min.is_some() || params.year_max.is_some() {
            if let Some(min) = params.year_min {
                year_filter.push_str(&min.to_string());
            }
            year_filter.push('-');
            if let Some(max) = params.year_max {
                year_filter.push_str(&max.to_string());
            }
        }

        let mut query = vec![
            ("query", params.query.to_string()),
            ("limit", params.limit.min(100).to_string()),
            ("fields", PAPER_FIELDS.to_string()),
        ];
        if !year_filter.is_empty() {
            query.push(("year", year_filter));
        }

        let result = with_retry(
            api_retry_config(),
            |err: &SemanticScholarError| matches!(err, SemanticScholarError::Http(_)),
            || self.get_json("/paper/search", &query),
        )
        .await;

        let value = match result {
            Ok(v) => v,
            Err(SemanticScholarError::Api { status: 429, .. }) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let response: SearchResponse = serde_json::from_value(value).map_err(SemanticScholarError::Json)?;
        Ok(response.data)
    }

    /// Shared body for `/paper/{id}/citations` and `/paper/{id}/references`:
    /// both return `{"data": [{"<paper_key>": {...paper fields...}}]}`.
    async fn citation_edge(&self, paper_id: &str, limit: usize, edge: &str, paper_key: &str) -> Result<Vec<PaperRecord>> {
        let query = [("fields", PAPER_FIELDS.to_string()), ("limit", limit.min(100).to_string())];
        let path = format!("/paper/{paper_id}/{edge}");
        let result = with_retry(
            api_retry_config(),
            |err: &SemanticScholarError| matches!(err, SemanticScholarError::Http(_)),
            || self.get_json(&path, &query),
        )
        .await;

        let value = match result {
            Ok(v) => v,
            Err(SemanticScholarError::Api { .. }) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let response: EdgeResponse = serde_json::from_value(value).map_err(SemanticScholarError::Json)?;
        let records = response
            .data
            .into_iter()
            .filter_map(|mut item| {
                let paper = item.remove(paper_key)?;
                let raw: RawPaper = serde_json::from_value(paper).ok()?;
                let title = raw.title.clone().filter(|t| !t.is_empty())?;
                Some(parse_paper(raw, title))
            })
            .collect();
        Ok(records)
    }
}

#[async_trait]
impl Source for SemanticScholarClient {
    fn id(&self) -> &'static str {
        "semantic_scholar"
    }

    #[instrument(skip(self))]
    async fn search(&self, params: SearchParams<'_>) -> std::result::Result<Vec<PaperRecord>, SourceError> {
        let raw = self.search_raw(params).await.map_err(SourceError::from)?;
        let total = raw.len();
        let records = raw
            .into_iter()
            .enumerate()
            .filter_map(|(idx, paper)| {
                let title = paper.title.clone()?;
                if title.is_empty() {
                    return None;
                }
                let mut record = parse_paper(paper, title);
                record.relevance_score = relevance_from_rank(idx, total);
                Some(record)
            })
            .collect();
        Ok(records)
    }

    async fn get(&self, paper_id: &str) -> std::result::Result<Option<PaperRecord>, SourceError> {
        let query = [("fields", PAPER_FIELDS.to_string())];
        let path = format!("/paper/{paper_id}");
        let result = with_retry(
            api_retry_config(),
            |err: &SemanticScholarError| matches!(err, SemanticScholarError::Http(_)),
            || self.get_json(&path, &query),
        )
        .await;

        let value = match result {
            Ok(v) => v,
            Err(SemanticScholarError::Api { status: 404, .. }) => return Ok(None),
            Err(SemanticScholarError::Api { status: 429, .. }) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let paper: RawPaper = serde_json::from_value(value).map_err(SemanticScholarError::Json)?;
        let Some(title) = paper.title.clone() else { return Ok(None) };
        if title.is_empty() {
            return Ok(None);
        }
        Ok(Some(parse_paper(paper, title)))
    }

    async fn get_citations(&self, source_id: &str, limit: usize) -> std::result::Result<Vec<PaperRecord>, SourceError> {
        self.citation_edge(source_id, limit, "citations", "citingPaper").await.map_err(SourceError::from)
    }

    async fn get_references(&self, source_id: &str, limit: usize) -> std::result::Result<Vec<PaperRecord>, SourceError> {
        self.citation_edge(source_id, limit, "references", "citedPaper").await.map_err(SourceError::from)
    }
}

#[derive(Debug, Deserialize, Default)]
struct EdgeResponse {
    #[serde(default)]
    data: Vec<std::collections::HashMap<String, serde_json::Value>>,
}

fn parse_paper(data: RawPaper, title: String) -> PaperRecord {
    let external_ids = data.external_ids.unwrap_or_default();
    let authors = data
        .authors
        .into_iter()
        .filter_map(|a| a.name.map(Author::new))
        .collect();
    let topics = data
        .s2_fields_of_study
        .unwrap_or_default()
        .into_iter()
        .filter_map(|f| f.category)
        .collect();
    let pub_types = data.publication_types.unwrap_or_default();
    let is_survey = pub_types.iter().any(|t| t == "Review" || t == "Survey");
    let oa_url = data.open_access_pdf.and_then(|pdf| pdf.url);

    let mut record = PaperRecord::new(SourceTag::SemanticScholar, data.paper_id.unwrap_or_default(), title);
    record.doi = external_ids.doi;
    record.arxiv_id = external_ids.arxiv;
    record.pmid = external_ids.pubmed;
    record.abstract_text = data.abstract_text;
    record.year = data.year.filter(|&y| (1800..=current_year()).contains(&y));
    record.venue = data.venue;
    record.authors = authors;
    record.citation_count = data.citation_count;
    record.oa_url = oa_url;
    record.topics = topics;
    record.is_survey = is_survey;
    record.is_open_access = data.is_open_access;
    record
}

fn current_year() -> i32 {
    chrono::Utc::now().year()
}

#[derive(Debug, Deserialize, Default)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<RawPaper>,
}

#[derive(Debug, Deserialize)]
struct RawPaper {
    #[serde(rename = "paperId")]
    paper_id: Option<String>,
    title: Option<String>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    year: Option<i32>,
    venue: Option<String>,
    #[serde(default)]
    authors: Vec<RawAuthor>,
    #[serde(rename = "citationCount")]
    citation_count: Option<u64>,
    #[serde(rename = "isOpenAccess", default)]
    is_open_access: bool,
    #[serde(rename = "openAccessPdf")]
    open_access_pdf: Option<RawOaPdf>,
    #[serde(rename = "externalIds")]
    external_ids: Option<RawExternalIds>,
    #[serde(rename = "publicationTypes")]
    publication_types: Option<Vec<String>>,
    #[serde(rename = "s2FieldsOfStudy")]
    s2_fields_of_study: Option<Vec<RawFieldOfStudy>>,
}

#[derive(Debug, Deserialize)]
struct RawAuthor {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawOaPdf {
    url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct RawExternalIds {
    #[serde(rename = "DOI")]
    doi: Option<String>,
    #[serde(rename = "ArXiv")]
    arxiv: Option<String>,
    #[serde(rename = "PubMed")]
    pubmed: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawFieldOfStudy {
    category: Option<String>,
}
