//! OpenAlex works-search adapter.

use async_trait::async_trait;
use chrono::Datelike;
use serde::Deserialize;
use tracing::instrument;

use litrank_core::retry::{api_retry_config, with_retry};
use litrank_core::source::{relevance_from_rank, SearchParams, Source, SourceError};
use litrank_core::types::{Author, PaperRecord, SourceTag};

use crate::error::{OpenAlexError, Result};

const DEFAULT_BASE_URL: &str = "https://api.openalex.org";

const SELECT_FIELDS: &str = "id,doi,title,display_name,abstract_inverted_index,publication_year,\
type,authorships,concepts,cited_by_count,open_access,primary_location,best_oa_location,ids";

/// Client for the OpenAlex works API, used here as a search-and-enrich
/// bibliographic source rather than the teacher's full 30-entity surface.
pub struct OpenAlexClient {
    http: reqwest::Client,
    base_url: String,
    email: String,
}

impl OpenAlexClient {
    pub fn new(email: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(), base_url: DEFAULT_BASE_URL.to_string(), email: email.into() }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn user_agent(&self) -> String {
        format!("litrank/1.0 (mailto:{})", self.email)
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<serde_json::Value> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .header(reqwest::header::USER_AGENT, self.user_agent())
            .query(query)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(OpenAlexError::Api { status: status.as_u16(), message });
        }
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(OpenAlexError::Json)
    }

    async fn search_raw(&self, params: SearchParams<'_>) -> Result<Vec<RawWork>> {
        let mut filters = Vec::new();
        if let Some(min) = params.year_min {
            filters.push(format!("from_publication_date:{min}-01-01"));
        }
        if let Some(max) = params.year_max {
            filters.push(format!("to_publication_date:{max}-12-31"));
        }

        let mut query = vec![
            ("search", params.query.to_string()),
            ("per_page", params.limit.min(200).to_string()),
            ("select", SELECT_FIELDS.to_string()),
        ];
        if !filters.is_empty() {
            query.push(("filter", filters.join(",")));
        }

        let result = with_retry(
            api_retry_config(),
            |err: &OpenAlexError| matches!(err, OpenAlexError::Http(_)),
            || self.get_json("/works", &query),
        )
        .await;

        let value = match result {
            Ok(v) => v,
            Err(OpenAlexError::Api { status: 429, .. }) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let response: WorksResponse = serde_json::from_value(value).map_err(OpenAlexError::Json)?;
        Ok(response.results)
    }
}

#[async_trait]
impl Source for OpenAlexClient {
    fn id(&self) -> &'static str {
        "openalex"
    }

    #[instrument(skip(self))]
    async fn search(&self, params: SearchParams<'_>) -> std::result::Result<Vec<PaperRecord>, SourceError> {
        let raw = self.search_raw(params).await.map_err(SourceError::from)?;
        let total = raw.len();
        let records = raw
            .into_iter()
            .enumerate()
            .filter_map(|(idx, work)| {
                let title = work_title(&work)?;
                let mut record = parse_work(work, title);
                record.relevance_score = relevance_from_rank(idx, total);
                Some(record)
            })
            .collect();
        Ok(records)
    }

    async fn get(&self, paper_id: &str) -> std::result::Result<Option<PaperRecord>, SourceError> {
        let id = if paper_id.starts_with('W') { paper_id.to_string() } else { format!("W{paper_id}") };
        let query = [("select", SELECT_FIELDS.to_string())];
        let path = format!("/works/{id}");
        let result = with_retry(
            api_retry_config(),
            |err: &OpenAlexError| matches!(err, OpenAlexError::Http(_)),
            || self.get_json(&path, &query),
        )
        .await;

        let value = match result {
            Ok(v) => v,
            Err(OpenAlexError::Api { status: 404, .. }) => return Ok(None),
            Err(OpenAlexError::Api { status: 429, .. }) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let work: RawWork = serde_json::from_value(value).map_err(OpenAlexError::Json)?;
        let Some(title) = work_title(&work) else { return Ok(None) };
        Ok(Some(parse_work(work, title)))
    }

    async fn get_related_works(&self, source_id: &str, limit: usize) -> std::result::Result<Vec<PaperRecord>, SourceError> {
        let id = if source_id.starts_with('W') { source_id.to_string() } else { format!("W{source_id}") };
        let query = [
            ("filter", format!("related_to:{id}")),
            ("per_page", limit.min(50).to_string()),
            ("select", SELECT_FIELDS.to_string()),
        ];
        let result = with_retry(
            api_retry_config(),
            |err: &OpenAlexError| matches!(err, OpenAlexError::Http(_)),
            || self.get_json("/works", &query),
        )
        .await;

        let value = match result {
            Ok(v) => v,
            Err(OpenAlexError::Api { .. }) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let response: WorksResponse = serde_json::from_value(value).map_err(OpenAlexError::Json)?;
        let records = response
            .results
            .into_iter()
            .filter_map(|work| {
                let title = work_title(&work)?;
                Some(parse_work(work, title))
            })
            .collect();
        Ok(records)
    }
}

fn work_title(work: &RawWork) -> Option<String> {
    work.title.clone().or_else(|| work.display_name.clone()).filter(|t| !t.is_empty())
}

fn strip_doi_prefix(doi: &str) -> Option<String> {
    let lower = doi.to_lowercase();
    if lower.is_empty() {
        return None;
    }
    Some(lower.strip_prefix("https://doi.org/").unwrap_or(&lower).to_string())
}

fn arxiv_id_from_doi(doi: &str) -> Option<String> {
    let lower = doi.to_lowercase();
    if !lower.contains("arxiv") {
        return None;
    }
    let marker = "arxiv.";
    let start = lower.find(marker)? + marker.len();
    let tail = &lower[start..];
    let digits: String = tail.chars().take_while(|c| c.is_ascii_digit() || *c == '.').collect();
    if digits.contains('.') { Some(digits) } else { None }
}

fn reconstruct_abstract(inverted_index: Option<&std::collections::HashMap<String, Vec<u32>>>) -> Option<String> {
    let index = inverted_index?;
    if index.is_empty() {
        return None;
    }
    let mut positions: Vec<(u32, &str)> = Vec::new();
    for (word, occurrences) in index {
        for &pos in occurrences {
            positions.push((pos, word.as_str()));
        }
    }
    positions.sort_by_key(|&(pos, _)| pos);
    Some(positions.into_iter().map(|(_, w)| w).collect::<Vec<_>>().join(" "))
}

fn parse_work(data: RawWork, title: String) -> PaperRecord {
    let doi = data.doi.as_deref().and_then(strip_doi_prefix);
    let arxiv_id = doi
        .as_deref()
        .and_then(arxiv_id_from_doi)
        .or_else(|| data.ids.as_ref().and_then(|i| i.arxiv.clone()));
    let pmid = data.ids.as_ref().and_then(|i| i.pmid.clone());

    let openalex_id = data
        .id
        .as_deref()
        .map(|id| id.strip_prefix("https://openalex.org/").unwrap_or(id).to_string())
        .unwrap_or_default();

    let authors = data
        .authorships
        .into_iter()
        .filter_map(|a| {
            let name = a.author.and_then(|au| au.display_name)?;
            let mut author = Author::new(name);
            for inst in a.institutions {
                if let Some(n) = inst.display_name {
                    author.affiliations.insert(n);
                }
            }
            Some(author)
        })
        .collect();

    let mut topics: Vec<String> = data
        .concepts
        .into_iter()
        .filter(|c| c.score.unwrap_or(0.0) > 0.3)
        .filter_map(|c| c.display_name)
        .collect();
    topics.truncate(10);

    let venue = data
        .primary_location
        .as_ref()
        .and_then(|loc| loc.source.as_ref())
        .and_then(|s| s.display_name.clone());

    let open_access = data.open_access.unwrap_or_default();
    let best_oa_location = data.best_oa_location.unwrap_or_default();
    let publisher_url = best_oa_location.pdf_url.clone().or(best_oa_location.landing_page_url.clone());
    let oa_url = open_access.oa_url.clone().or_else(|| publisher_url.clone());

    let mut record = PaperRecord::new(SourceTag::OpenAlex, openalex_id, title.clone());
    record.doi = doi;
    record.arxiv_id = arxiv_id;
    record.pmid = pmid;
    record.abstract_text = reconstruct_abstract(data.abstract_inverted_index.as_ref());
    record.year = data.publication_year.filter(|&y| (1800..=current_year()).contains(&y));
    record.venue = venue;
    record.authors = authors;
    record.citation_count = data.cited_by_count;
    record.oa_url = oa_url;
    record.publisher_url = publisher_url;
    record.topics = topics;
    record.is_survey = data.work_type.as_deref() == Some("review") || title.to_lowercase().contains("review");
    record.is_open_access = open_access.is_oa.unwrap_or(false);
    record
}

fn current_year() -> i32 {
    chrono::Utc::now().year()
}

#[derive(Debug, Deserialize, Default)]
struct WorksResponse {
    #[serde(default)]
    results: Vec<RawWork>,
}

#[derive(Debug, Deserialize, Default)]
struct RawWork {
    id: Option<String>,
    doi: Option<String>,
    title: Option<String>,
    display_name: Option<String>,
    abstract_inverted_index: Option<std::collections::HashMap<String, Vec<u32>>>,
    publication_year: Option<i32>,
    #[serde(rename = "type")]
    work_type: Option<String>,
    #[serde(default)]
    authorships: Vec<RawAuthorship>,
    #[serde(default)]
    concepts: Vec<RawConcept>,
    cited_by_count: Option<u64>,
    open_access: Option<RawOpenAccess>,
    primary_location: Option<RawLocation>,
    best_oa_location: Option<RawOaLocation>,
    ids: Option<RawIds>,
}

#[derive(Debug, Deserialize, Default)]
struct RawIds {
    arxiv: Option<String>,
    pmid: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct RawAuthorship {
    author: Option<RawAuthor>,
    #[serde(default)]
    institutions: Vec<RawInstitution>,
}

#[derive(Debug, Deserialize)]
struct RawAuthor {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawInstitution {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawConcept {
    display_name: Option<String>,
    score: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct RawOpenAccess {
    is_oa: Option<bool>,
    oa_url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct RawLocation {
    source: Option<RawSource>,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
struct RawOaLocation {
    pdf_url: Option<String>,
    landing_page_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn work_json() -> serde_json::Value {
        serde_json::json!({
            "id": "https://openalex.org/W2163605009",
            "doi": "https://doi.org/10.48550/arxiv.1706.03762",
            "title": "Attention Is All You Need",
            "display_name": "Attention Is All You Need",
            "abstract_inverted_index": {"The": [0], "model": [1]},
            "publication_year": 2017,
            "type": "article",
            "authorships": [{"author": {"display_name": "Ashish Vaswani"}, "institutions": [{"display_name": "Google"}]}],
            "concepts": [{"display_name": "Attention", "score": 0.8}, {"display_name": "Noise", "score": 0.1}],
            "cited_by_count": 90000,
            "open_access": {"is_oa": true, "oa_url": "https://arxiv.org/abs/1706.03762"},
            "primary_location": {"source": {"display_name": "NeurIPS"}},
            "best_oa_location": {"pdf_url": "https://arxiv.org/pdf/1706.03762"},
            "ids": {},
        })
    }

    #[tokio::test]
    async fn search_parses_doi_and_reconstructs_abstract() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/works"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"results": [work_json()]})))
            .mount(&server)
            .await;
        let client = OpenAlexClient::new("user@example.com").with_base_url(server.uri());
        let params = SearchParams { query: "attention", limit: 20, year_min: None, year_max: None };
        let records = client.search(params).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].doi.as_deref(), Some("10.48550/arxiv.1706.03762"));
        assert_eq!(records[0].arxiv_id.as_deref(), Some("1706.03762"));
        assert_eq!(records[0].abstract_text.as_deref(), Some("The model"));
        assert!(records[0].topics.contains(&"Attention".to_string()));
        assert!(!records[0].topics.contains(&"Noise".to_string()));
    }

    #[tokio::test]
    async fn rate_limit_returns_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/works"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;
        let client = OpenAlexClient::new("user@example.com").with_base_url(server.uri());
        let params = SearchParams { query: "x", limit: 20, year_min: None, year_max: None };
        assert!(client.search(params).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn get_adds_missing_w_prefix() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/works/W2163605009"))
            .respond_with(ResponseTemplate::new(200).set_body_json(work_json()))
            .mount(&server)
            .await;
        let client = OpenAlexClient::new("user@example.com").with_base_url(server.uri());
        let paper = client.get("2163605009").await.unwrap().unwrap();
        assert_eq!(paper.title, "Attention Is All You Need");
    }

    #[test]
    fn reconstruct_abstract_orders_by_position() {
        let mut index = std::collections::HashMap::new();
        index.insert("world".to_string(), vec![1u32]);
        index.insert("hello".to_string(), vec![0u32]);
        assert_eq!(reconstruct_abstract(Some(&index)).as_deref(), Some("hello world"));
    }
}
