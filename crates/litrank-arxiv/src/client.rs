//! arXiv Atom feed adapter. All arXiv papers are open access by construction
//! and the API offers no server-side date filter, so year bounds are applied
//! client-side after parsing (§4.1).

use async_trait::async_trait;
use chrono::Datelike;
use tracing::instrument;

use litrank_core::normalize::strip_arxiv_version;
use litrank_core::retry::{api_retry_config, with_retry};
use litrank_core::source::{relevance_from_rank, SearchParams, Source, SourceError};
use litrank_core::types::{Author, PaperRecord, SourceTag};

use crate::error::{ArxivError, Result};

const DEFAULT_BASE_URL: &str = "http://export.arxiv.org/api/query";

pub struct ArxivClient {
    http: reqwest::Client,
    base_url: String,
}

impl Default for ArxivClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ArxivClient {
    pub fn new() -> Self {
        Self { http: reqwest::Client::new(), base_url: DEFAULT_BASE_URL.to_string() }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    async fn fetch_feed(&self, query: &[(&str, String)]) -> Result<feed_rs::model::Feed> {
        let response = self.http.get(&self.base_url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ArxivError::Api { status: status.as_u16(), message });
        }
        let bytes = response.bytes().await?;
        let feed = feed_rs::parser::parse(&bytes[..])?;
        Ok(feed)
    }
}

#[async_trait]
impl Source for ArxivClient {
    fn id(&self) -> &'static str {
        "arxiv"
    }

    #[instrument(skip(self))]
    async fn search(&self, params: SearchParams<'_>) -> std::result::Result<Vec<PaperRecord>, SourceError> {
        let query = vec![
            ("search_query", format!("all:{}", params.query)),
            ("start", "0".to_string()),
            ("max_results", params.limit.min(100).to_string()),
            ("sortBy", "relevance".to_string()),
            ("sortOrder", "descending".to_string()),
        ];

        let feed = match with_retry(
            api_retry_config(),
            |err: &ArxivError| matches!(err, ArxivError::Http(_)),
            || self.fetch_feed(&query),
        )
        .await
        {
            Ok(feed) => feed,
            Err(ArxivError::Api { status: 429, .. }) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let entries: Vec<_> = feed.entries.into_iter().filter(|e| e.title.is_some()).collect();
        let total = entries.len();
        let records: Vec<PaperRecord> = entries
            .into_iter()
            .enumerate()
            .filter_map(|(position, entry)| {
                let mut record = parse_entry(entry)?;
                if let Some(min) = params.year_min {
                    if record.year.is_some_and(|y| y < min) {
                        return None;
                    }
                }
                if let Some(max) = params.year_max {
                    if record.year.is_some_and(|y| y > max) {
                        return None;
                    }
                }
                record.relevance_score = relevance_from_rank(position, total);
                Some(record)
            })
            .collect();
        Ok(records)
    }

    async fn get(&self, paper_id: &str) -> std::result::Result<Option<PaperRecord>, SourceError> {
        let arxiv_id = paper_id.replace("arXiv:", "").replace("arxiv:", "");
        let query = vec![("id_list", arxiv_id), ("max_results", "1".to_string())];

        let feed = match with_retry(
            api_retry_config(),
            |err: &ArxivError| matches!(err, ArxivError::Http(_)),
            || self.fetch_feed(&query),
        )
        .await
        {
            Ok(feed) => feed,
            Err(ArxivError::Api { status: 404, .. }) => return Ok(None),
            Err(ArxivError::Api { status: 429, .. }) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(feed.entries.into_iter().next().and_then(parse_entry))
    }
}

fn parse_entry(entry: feed_rs::model::Entry) -> Option<PaperRecord> {
    let title = entry.title?.content.trim().replace('\n', " ");
    if title.is_empty() {
        return None;
    }

    let arxiv_url = entry.id.clone();
    let raw_id = arxiv_url.rsplit("/abs/").next().unwrap_or(&arxiv_url);
    let arxiv_id = strip_arxiv_version(raw_id);

    let abstract_text = entry.summary.map(|s| s.content.trim().replace('\n', " "));

    let authors = entry.authors.into_iter().map(|p| Author::new(p.name)).collect();

    let year = entry.published.map(|d| d.year()).filter(|&y| (1991..=current_year()).contains(&y));

    let topics: Vec<String> = entry.categories.iter().map(|c| c.term.clone()).collect();
    let venue = topics.first().map(|term| format!("arXiv {term}")).unwrap_or_else(|| "arXiv".to_string());

    let oa_url = entry
        .links
        .iter()
        .find(|link| link.title.as_deref() == Some("pdf"))
        .map(|link| link.href.clone())
        .or_else(|| Some(format!("https://arxiv.org/pdf/{arxiv_id}")));

    let mut record = PaperRecord::new(SourceTag::Arxiv, arxiv_id.clone(), title);
    record.arxiv_id = Some(arxiv_id);
    record.abstract_text = abstract_text;
    record.year = year;
    record.venue = Some(venue);
    record.authors = authors;
    record.oa_url = oa_url;
    record.publisher_url = Some(arxiv_url);
    record.topics = topics;
    record.is_open_access = true;
    Some(record)
}

fn current_year() -> i32 {
    chrono::Utc::now().year()
}
