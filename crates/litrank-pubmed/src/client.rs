//! PubMed/NCBI E-utilities adapter: a two-step esearch (find PMIDs) then
//! efetch (fetch article XML) dance, per §4.1.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;

use litrank_core::retry::{api_retry_config, with_retry};
use litrank_core::source::{relevance_from_rank, SearchParams, Source, SourceError};
use litrank_core::types::{Author, PaperRecord, SourceTag};

use crate::error::{PubmedError, Result};

const DEFAULT_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

pub struct PubmedClient {
    http: reqwest::Client,
    base_url: String,
    email: String,
}

impl PubmedClient {
    pub fn new(email: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(), base_url: DEFAULT_BASE_URL.to_string(), email: email.into() }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn base_params(&self) -> Vec<(&'static str, String)> {
        vec![("email", self.email.clone()), ("tool", "litrank".to_string())]
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.http.get(&url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PubmedError::Api { status: status.as_u16(), message });
        }
        Ok(response)
    }

    async fn esearch(&self, query: &str, limit: usize, year_min: Option<i32>, year_max: Option<i32>) -> Result<Vec<String>> {
        let term = if year_min.is_some() || year_max.is_some() {
            format!("({}) AND {}:{}[dp]", query, year_min.unwrap_or(1900), year_max.unwrap_or(2100))
        } else {
            query.to_string()
        };

        let mut params = self.base_params();
        params.push(("db", "pubmed".to_string()));
        params.push(("term", term));
        params.push(("retmax", limit.min(100).to_string()));
        params.push(("retmode", "json".to_string()));
        params.push(("sort", "relevance".to_string()));

        let query_refs: Vec<(&str, String)> = params;
        let response = self.get("/esearch.fcgi", &query_refs).await?;
        let body: EsearchResponse = response.json().await?;
        Ok(body.esearchresult.idlist)
    }

    async fn efetch(&self, ids: &[String]) -> Result<Vec<PubmedArticle>> {
        let mut params = self.base_params();
        params.push(("db", "pubmed".to_string()));
        params.push(("id", ids.join(",")));
        params.push(("retmode", "xml".to_string()));

        let response = self.get("/efetch.fcgi", &params).await?;
        let text = response.text().await?;
        let parsed: PubmedArticleSet = quick_xml::de::from_str(&text)?;
        Ok(parsed.articles)
    }
}

#[async_trait]
impl Source for PubmedClient {
    fn id(&self) -> &'static str {
        "pubmed"
    }

    #[instrument(skip(self))]
    async fn search(&self, params: SearchParams<'_>) -> std::result::Result<Vec<PaperRecord>, SourceError> {
        let ids = match with_retry(
            api_retry_config(),
            |err: &PubmedError| matches!(err, PubmedError::Http(_)),
            || self.esearch(params.query, params.limit, params.year_min, params.year_max),
        )
        .await
        {
            Ok(ids) => ids,
            Err(PubmedError::Api { status: 429, .. }) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let articles = match with_retry(
            api_retry_config(),
            |err: &PubmedError| matches!(err, PubmedError::Http(_)),
            || self.efetch(&ids),
        )
        .await
        {
            Ok(articles) => articles,
            Err(PubmedError::Api { status: 429, .. }) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let total = articles.len();
        let records = articles
            .into_iter()
            .enumerate()
            .filter_map(|(position, article)| {
                let mut record = parse_article(article)?;
                record.relevance_score = relevance_from_rank(position, total);
                Some(record)
            })
            .collect();
        Ok(records)
    }

    async fn get(&self, paper_id: &str) -> std::result::Result<Option<PaperRecord>, SourceError> {
        let ids = [paper_id.to_string()];
        let result = with_retry(
            api_retry_config(),
            |err: &PubmedError| matches!(err, PubmedError::Http(_)),
            || self.efetch(&ids),
        )
        .await;

        let articles = match result {
            Ok(articles) => articles,
            Err(PubmedError::Api { status: 404, .. }) => return Ok(None),
            Err(PubmedError::Api { status: 429, .. }) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(articles.into_iter().next().and_then(parse_article))
    }
}

fn parse_article(article: PubmedArticle) -> Option<PaperRecord> {
    let citation = article.medline_citation?;
    let pmid = citation.pmid.map(|p| p.text);
    let article_el = citation.article?;
    let title = article_el.article_title?.text;
    if title.is_empty() {
        return None;
    }

    let abstract_text = article_el.abstract_el.map(|a| {
        a.abstract_texts
            .into_iter()
            .filter_map(|t| {
                let text = t.text?;
                Some(match t.label {
                    Some(label) if !label.is_empty() => format!("{label}: {text}"),
                    _ => text,
                })
            })
            .collect::<Vec<_>>()
            .join(" ")
    });

    let authors = article_el
        .author_list
        .map(|al| {
            al.authors
                .into_iter()
                .filter_map(|a| {
                    let mut parts = Vec::new();
                    if let Some(fore) = a.fore_name {
                        parts.push(fore.text);
                    }
                    if let Some(last) = a.last_name {
                        parts.push(last.text);
                    }
                    if parts.is_empty() {
                        return None;
                    }
                    let mut author = Author::new(parts.join(" "));
                    for aff in a.affiliation_info {
                        if let Some(affiliation) = aff.affiliation {
                            author.affiliations.insert(affiliation.text);
                        }
                    }
                    Some(author)
                })
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    let year = article_el
        .journal
        .as_ref()
        .and_then(|j| j.journal_issue.as_ref())
        .and_then(|ji| ji.pub_date.as_ref())
        .and_then(|pd| pd.year.as_ref())
        .and_then(|y| y.text.parse::<i32>().ok());

    let venue = article_el.journal.as_ref().and_then(|j| j.title.as_ref()).map(|t| t.text.clone());

    let doi = article
        .pubmed_data
        .as_ref()
        .and_then(|pd| pd.article_id_list.as_ref())
        .and_then(|ail| ail.ids.iter().find(|id| id.id_type == "doi"))
        .and_then(|id| id.value.clone());

    let is_survey = article_el
        .publication_type_list
        .map(|ptl| ptl.types.into_iter().any(|t| t.text.to_lowercase().contains("review")))
        .unwrap_or(false);

    let mut record = PaperRecord::new(SourceTag::Pubmed, pmid.clone().unwrap_or_default(), title);
    record.doi = doi;
    record.pmid = pmid.clone();
    record.abstract_text = abstract_text;
    record.year = year;
    record.venue = venue;
    record.authors = authors;
    record.is_survey = is_survey;
    record.publisher_url = pmid.map(|id| format!("https://pubmed.ncbi.nlm.nih.gov/{id}/"));
    Some(record)
}

#[derive(Debug, Deserialize, Default)]
struct EsearchResponse {
    esearchresult: EsearchResult,
}

#[derive(Debug, Deserialize, Default)]
struct EsearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
struct PubmedArticleSet {
    #[serde(rename = "PubmedArticle", default)]
    articles: Vec<PubmedArticle>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
struct PubmedArticle {
    medline_citation: Option<MedlineCitation>,
    pubmed_data: Option<PubmedData>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
struct MedlineCitation {
    #[serde(rename = "PMID")]
    pmid: Option<TextNode>,
    article: Option<ArticleEl>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
struct ArticleEl {
    journal: Option<Journal>,
    article_title: Option<TextNode>,
    #[serde(rename = "Abstract")]
    abstract_el: Option<AbstractEl>,
    author_list: Option<AuthorListEl>,
    publication_type_list: Option<PublicationTypeList>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
struct Journal {
    journal_issue: Option<JournalIssue>,
    title: Option<TextNode>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
struct JournalIssue {
    pub_date: Option<PubDate>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
struct PubDate {
    year: Option<TextNode>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
struct AbstractEl {
    #[serde(rename = "AbstractText", default)]
    abstract_texts: Vec<AbstractText>,
}

#[derive(Debug, Deserialize, Default)]
struct AbstractText {
    #[serde(rename = "@Label")]
    label: Option<String>,
    #[serde(rename = "$text")]
    text: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
struct AuthorListEl {
    #[serde(rename = "Author", default)]
    authors: Vec<AuthorEl>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
struct AuthorEl {
    fore_name: Option<TextNode>,
    last_name: Option<TextNode>,
    #[serde(rename = "AffiliationInfo", default)]
    affiliation_info: Vec<AffiliationInfoEl>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
struct AffiliationInfoEl {
    affiliation: Option<TextNode>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
struct PublicationTypeList {
    #[serde(rename = "PublicationType", default)]
    types: Vec<TextNode>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
struct PubmedData {
    article_id_list: Option<ArticleIdList>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
struct ArticleIdList {
    #[serde(rename = "ArticleId", default)]
    ids: Vec<ArticleIdEl>,
}

#[derive(Debug, Deserialize, Default)]
struct ArticleIdEl {
    #[serde(rename = "@IdType")]
    id_type: String,
    #[serde(rename = "$text")]
    value: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
struct TextNode {
    #[serde(rename = "$text")]
    text: String,
}
