//! Unpaywall open-access resolver: looks up a DOI's best free-to-read
//! location. It never participates in search or get — it only implements
//! `OpenAccessResolver` (§9), exactly the Python adapter's no-op `search`
//! and `get_paper`.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;

use litrank_core::enrich::OpenAccessResolver;
use litrank_core::retry::{api_retry_config, with_retry};

use crate::error::{Result, UnpaywallError};

const DEFAULT_BASE_URL: &str = "https://api.unpaywall.org/v2";

pub struct UnpaywallClient {
    http: reqwest::Client,
    base_url: String,
    email: String,
}

impl UnpaywallClient {
    pub fn new(email: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(), base_url: DEFAULT_BASE_URL.to_string(), email: email.into() }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn clean_doi(doi: &str) -> &str {
        doi.strip_prefix("https://doi.org/").or_else(|| doi.strip_prefix("http://doi.org/")).unwrap_or(doi)
    }

    async fn lookup(&self, doi: &str) -> Result<UnpaywallResponse> {
        let url = format!("{}/{}", self.base_url, Self::clean_doi(doi));
        let response = self.http.get(&url).query(&[("email", &self.email)]).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UnpaywallError::Api { status: status.as_u16() });
        }
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(UnpaywallError::Json)
    }
}

#[async_trait]
impl OpenAccessResolver for UnpaywallClient {
    #[instrument(skip(self))]
    async fn resolve(&self, doi: &str) -> Option<String> {
        let result = with_retry(
            api_retry_config(),
            |err: &UnpaywallError| matches!(err, UnpaywallError::Http(_)),
            || self.lookup(doi),
        )
        .await;

        let data = match result {
            Ok(data) => data,
            Err(_) => return None,
        };

        if !data.is_oa {
            return None;
        }

        if let Some(best) = &data.best_oa_location {
            if let Some(url) = best.url_for_pdf.clone().or_else(|| best.url.clone()).or_else(|| best.url_for_landing_page.clone()) {
                return Some(url);
            }
        }

        data.oa_locations.iter().find_map(|loc| loc.url_for_pdf.clone().or_else(|| loc.url.clone()))
    }
}

#[derive(Debug, Deserialize, Default)]
struct UnpaywallResponse {
    #[serde(default)]
    is_oa: bool,
    best_oa_location: Option<OaLocation>,
    #[serde(default)]
    oa_locations: Vec<OaLocation>,
}

#[derive(Debug, Deserialize, Default)]
struct OaLocation {
    url_for_pdf: Option<String>,
    url: Option<String>,
    url_for_landing_page: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn resolve_prefers_pdf_url_from_best_location() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/10.1145/3295222.3295349"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "is_oa": true,
                "best_oa_location": {"url_for_pdf": "https://oa.example/pdf", "url": "https://oa.example/landing"},
                "oa_locations": [],
            })))
            .mount(&server)
            .await;

        let client = UnpaywallClient::new("user@example.com").with_base_url(server.uri());
        let url = client.resolve("10.1145/3295222.3295349").await;
        assert_eq!(url.as_deref(), Some("https://oa.example/pdf"));
    }

    #[tokio::test]
    async fn resolve_strips_doi_url_prefix_before_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/10.1/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"is_oa": false})))
            .mount(&server)
            .await;

        let client = UnpaywallClient::new("user@example.com").with_base_url(server.uri());
        let url = client.resolve("https://doi.org/10.1/abc").await;
        assert_eq!(url, None);
    }

    #[tokio::test]
    async fn resolve_returns_none_on_404() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/10.1/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = UnpaywallClient::new("user@example.com").with_base_url(server.uri());
        assert_eq!(client.resolve("10.1/missing").await, None);
    }

    #[tokio::test]
    async fn resolve_falls_back_to_other_oa_locations() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/10.1/fallback"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "is_oa": true,
                "best_oa_location": null,
                "oa_locations": [{"url": "https://repo.example/paper"}],
            })))
            .mount(&server)
            .await;

        let client = UnpaywallClient::new("user@example.com").with_base_url(server.uri());
        let url = client.resolve("10.1/fallback").await;
        assert_eq!(url.as_deref(), Some("https://repo.example/paper"));
    }
}
