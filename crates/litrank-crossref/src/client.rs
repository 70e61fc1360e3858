//! Crossref works adapter: DOI-keyed metadata, used both for search and as
//! the fallback `get` lookup when a merged paper carries a DOI from another
//! source (§4.1).

use async_trait::async_trait;
use chrono::Datelike;
use serde::Deserialize;
use tracing::instrument;

use litrank_core::retry::{api_retry_config, with_retry};
use litrank_core::source::{SearchParams, Source, SourceError};
use litrank_core::types::{Author, PaperRecord, SourceTag};

use crate::error::{CrossrefError, Result};

const DEFAULT_BASE_URL: &str = "https://api.crossref.org";

/// Fixed year-field priority order (§9 Open Question decision).
const YEAR_FIELDS: &[&str] = &["published-print", "published-online", "issued", "published"];

pub struct CrossrefClient {
    http: reqwest::Client,
    base_url: String,
    email: String,
}

impl CrossrefClient {
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
            return Err(CrossrefError::Api { status: status.as_u16(), message });
        }
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(CrossrefError::Json)
    }
}

#[async_trait]
impl Source for CrossrefClient {
    fn id(&self) -> &'static str {
        "crossref"
    }

    #[instrument(skip(self))]
    async fn search(&self, params: SearchParams<'_>) -> std::result::Result<Vec<PaperRecord>, SourceError> {
        let mut filters = Vec::new();
        if let Some(min) = params.year_min {
            filters.push(format!("from-pub-date:{min}"));
        }
        if let Some(max) = params.year_max {
            filters.push(format!("until-pub-date:{max}"));
        }

        let mut query = vec![
            ("query", params.query.to_string()),
            ("rows", params.limit.min(100).to_string()),
            ("select", "DOI,title,author,published,published-print,published-online,issued,\
container-title,type,abstract,is-referenced-by-count,URL,resource".to_string()),
        ];
        if !filters.is_empty() {
            query.push(("filter", filters.join(",")));
        }

        let result = with_retry(
            api_retry_config(),
            |err: &CrossrefError| matches!(err, CrossrefError::Http(_)),
            || self.get_json("/works", &query),
        )
        .await;

        let value = match result {
            Ok(v) => v,
            Err(CrossrefError::Api { status: 429, .. }) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let response: WorksResponse = serde_json::from_value(value).map_err(CrossrefError::Json)?;
        let items: Vec<RawWork> = response
            .message
            .items
            .into_iter()
            .filter(|item| !item.title.is_empty())
            .collect();
        let total = items.len();
        let records = items
            .into_iter()
            .enumerate()
            .map(|(position, item)| {
                let title = item.title.first().cloned().unwrap_or_default();
                let mut record = parse_work(item, title);
                record.relevance_score = litrank_core::source::relevance_from_rank(position, total);
                record
            })
            .collect();
        Ok(records)
    }

    async fn get(&self, paper_id: &str) -> std::result::Result<Option<PaperRecord>, SourceError> {
        let doi = paper_id.replace("https://doi.org/", "").replace("http://doi.org/", "");
        let path = format!("/works/{doi}");
        let result = with_retry(
            api_retry_config(),
            |err: &CrossrefError| matches!(err, CrossrefError::Http(_)),
            || self.get_json(&path, &[]),
        )
        .await;

        let value = match result {
            Ok(v) => v,
            Err(CrossrefError::Api { status: 404, .. }) => return Ok(None),
            Err(CrossrefError::Api { status: 429, .. }) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let response: GetResponse = serde_json::from_value(value).map_err(CrossrefError::Json)?;
        let Some(title) = response.message.title.first().cloned() else { return Ok(None) };
        Ok(Some(parse_work(response.message, title)))
    }
}

fn extract_year(item: &RawWork) -> Option<i32> {
    let dated = [&item.published_print, &item.published_online, &item.issued, &item.published];
    let fields: Vec<(&str, &Option<RawDate>)> = YEAR_FIELDS.iter().copied().zip(dated).collect();
    for (_, date) in fields {
        if let Some(y) = date.as_ref().and_then(|d| d.date_parts.first()).and_then(|parts| parts.first()) {
            return Some(*y);
        }
    }
    None
}

fn strip_jats_tags(abstract_text: &str) -> String {
    abstract_text
        .replace("<jats:p>", "")
        .replace("</jats:p>", "")
        .replace("<jats:italic>", "")
        .replace("</jats:italic>", "")
}

fn parse_work(data: RawWork, title: String) -> PaperRecord {
    let year = extract_year(&data).filter(|&y| (1800..=current_year()).contains(&y));
    let authors = data
        .author
        .into_iter()
        .filter_map(|a| {
            let mut parts = Vec::new();
            if let Some(given) = a.given {
                parts.push(given);
            }
            if let Some(family) = a.family {
                parts.push(family);
            }
            if parts.is_empty() {
                return None;
            }
            let mut author = Author::new(parts.join(" "));
            for aff in a.affiliation {
                if let Some(name) = aff.name {
                    author.affiliations.insert(name);
                }
            }
            Some(author)
        })
        .collect();

    let venue = data.container_title.first().cloned();
    let is_survey = matches!(data.work_type.as_deref(), Some("review") | Some("book-review"));
    let abstract_text = data.abstract_field.as_deref().map(strip_jats_tags);
    let publisher_url = data.url.clone().or_else(|| data.resource.and_then(|r| r.primary).and_then(|p| p.url));

    let mut record = PaperRecord::new(SourceTag::Crossref, data.doi.clone().unwrap_or_default(), title);
    record.doi = data.doi;
    record.abstract_text = abstract_text;
    record.year = year;
    record.venue = venue;
    record.authors = authors;
    record.citation_count = data.is_referenced_by_count;
    record.publisher_url = publisher_url;
    record.is_survey = is_survey;
    record
}

fn current_year() -> i32 {
    chrono::Utc::now().year()
}

#[derive(Debug, Deserialize, Default)]
struct WorksResponse {
    message: WorksMessage,
}

#[derive(Debug, Deserialize, Default)]
struct WorksMessage {
    #[serde(default)]
    items: Vec<RawWork>,
}

#[derive(Debug, Deserialize, Default)]
struct GetResponse {
    message: RawWork,
}

#[derive(Debug, Deserialize, Default, Clone)]
struct RawWork {
    #[serde(rename = "DOI")]
    doi: Option<String>,
    #[serde(default)]
    title: Vec<String>,
    #[serde(default)]
    author: Vec<RawAuthor>,
    published: Option<RawDate>,
    #[serde(rename = "published-print")]
    published_print: Option<RawDate>,
    #[serde(rename = "published-online")]
    published_online: Option<RawDate>,
    issued: Option<RawDate>,
    #[serde(rename = "container-title", default)]
    container_title: Vec<String>,
    #[serde(rename = "type")]
    work_type: Option<String>,
    #[serde(rename = "abstract")]
    abstract_field: Option<String>,
    #[serde(rename = "is-referenced-by-count")]
    is_referenced_by_count: Option<u64>,
    #[serde(rename = "URL")]
    url: Option<String>,
    resource: Option<RawResource>,
}

#[derive(Debug, Deserialize, Default, Clone)]
struct RawAuthor {
    given: Option<String>,
    family: Option<String>,
    #[serde(default)]
    affiliation: Vec<RawAffiliation>,
}

#[derive(Debug, Deserialize, Default, Clone)]
struct RawAffiliation {
    name: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
struct RawDate {
    #[serde(rename = "date-parts", default)]
    date_parts: Vec<Vec<i32>>,
}

#[derive(Debug, Deserialize, Default, Clone)]
struct RawResource {
    primary: Option<RawPrimary>,
}

#[derive(Debug, Deserialize, Default, Clone)]
struct RawPrimary {
    #[serde(rename = "URL")]
    url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn work_json() -> serde_json::Value {
        serde_json::json!({
            "DOI": "10.1145/3295222.3295349",
            "title": ["Attention Is All You Need"],
            "author": [{"given": "Ashish", "family": "Vaswani"}],
            "published-print": {"date-parts": [[2017]]},
            "issued": {"date-parts": [[2016]]},
            "container-title": ["NeurIPS"],
            "type": "proceedings-article",
            "abstract": "<jats:p>The dominant model.</jats:p>",
            "is-referenced-by-count": 90000,
            "URL": "https://dl.acm.org/doi/10.1145/3295222.3295349",
        })
    }

    #[tokio::test]
    async fn search_prefers_published_print_over_issued() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/works"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"message": {"items": [work_json()]}})))
            .mount(&server)
            .await;
        let client = CrossrefClient::new("user@example.com").with_base_url(server.uri());
        let params = SearchParams { query: "attention", limit: 20, year_min: None, year_max: None };
        let records = client.search(params).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].year, Some(2017));
        assert_eq!(records[0].abstract_text.as_deref(), Some("The dominant model."));
    }

    #[tokio::test]
    async fn get_strips_doi_url_prefix() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/works/10.1145/3295222.3295349"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"message": work_json()})))
            .mount(&server)
            .await;
        let client = CrossrefClient::new("user@example.com").with_base_url(server.uri());
        let paper = client.get("https://doi.org/10.1145/3295222.3295349").await.unwrap().unwrap();
        assert_eq!(paper.title, "Attention Is All You Need");
    }

    #[tokio::test]
    async fn get_returns_none_on_404() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/works/10.1/unknown"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let client = CrossrefClient::new("user@example.com").with_base_url(server.uri());
        assert_eq!(client.get("10.1/unknown").await.unwrap(), None);
    }
}
