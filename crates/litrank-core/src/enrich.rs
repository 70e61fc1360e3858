//! Pure post-merge enrichment: DOI URLs, open-access links, publisher URL
//! fallback (§9's "cyclic enrichment becomes a pure mapping step").

use async_trait::async_trait;

use crate::types::MergedPaper;

/// The OA-resolver collaborator (`unpaywall`, §4.1). Kept as a trait so the
/// core pipeline never depends on a concrete HTTP client.
#[async_trait]
pub trait OpenAccessResolver: Send + Sync {
    async fn resolve(&self, doi: &str) -> Option<String>;
}

/// Never finds an OA link; lets the pipeline run without network access.
pub struct NullOpenAccessResolver;

#[async_trait]
impl OpenAccessResolver for NullOpenAccessResolver {
    async fn resolve(&self, _doi: &str) -> Option<String> {
        None
    }
}

fn build_doi_urls(papers: &mut [MergedPaper]) {
    for paper in papers.iter_mut() {
        if let Some(doi) = &paper.doi {
            if paper.doi_url.is_none() {
                paper.doi_url = Some(format!("https://doi.org/{doi}"));
            }
        }
    }
}

fn fill_publisher_urls(papers: &mut [MergedPaper]) {
    for paper in papers.iter_mut() {
        if paper.publisher_url.is_none() {
            if let Some(doi_url) = &paper.doi_url {
                paper.publisher_url = Some(doi_url.clone());
            }
        }
    }
}

/// Fetch OA links for every paper that has a DOI but no OA URL yet.
async fn fetch_oa_links(papers: &mut [MergedPaper], resolver: &dyn OpenAccessResolver) {
    for paper in papers.iter_mut() {
        if paper.oa_url.is_some() {
            continue;
        }
        let Some(doi) = paper.doi.clone() else { continue };
        if let Some(url) = resolver.resolve(&doi).await {
            paper.oa_url = Some(url);
            paper.is_open_access = true;
        }
    }
}

/// Apply all enrichment steps: DOI URLs, OA links, publisher URL fallback.
pub async fn enrich_papers(mut papers: Vec<MergedPaper>, resolver: &dyn OpenAccessResolver, fetch_oa: bool) -> Vec<MergedPaper> {
    build_doi_urls(&mut papers);
    if fetch_oa {
        fetch_oa_links(&mut papers, resolver).await;
    }
    fill_publisher_urls(&mut papers);
    papers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SourceTag, WorkType};
    use std::collections::{BTreeSet, HashMap};

    struct AlwaysResolves;

    #[async_trait]
    impl OpenAccessResolver for AlwaysResolves {
        async fn resolve(&self, _doi: &str) -> Option<String> {
            Some("https://oa.example/pdf".into())
        }
    }

    fn paper(doi: Option<&str>) -> MergedPaper {
        MergedPaper {
            id: "1".into(),
            title: "T".into(),
            doi: doi.map(String::from),
            arxiv_id: None,
            pmid: None,
            abstract_text: None,
            year: None,
            venue: None,
            authors: vec![],
            citation_count: None,
            citation_source: None,
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
            relevance_score: 0.0,
            data_quality_flags: BTreeSet::new(),
            work_key: "k".into(),
            sources: vec![SourceTag::Crossref],
            source_ids: HashMap::new(),
            field_provenance: HashMap::new(),
            score: 0.0,
            why_recommended: vec![],
            selected: false,
            comments: vec![],
        }
    }

    #[tokio::test]
    async fn doi_url_is_derived_from_doi() {
        let papers = enrich_papers(vec![paper(Some("10.1/x"))], &NullOpenAccessResolver, false).await;
        assert_eq!(papers[0].doi_url.as_deref(), Some("https://doi.org/10.1/x"));
    }

    #[tokio::test]
    async fn no_doi_means_no_doi_url() {
        let papers = enrich_papers(vec![paper(None)], &NullOpenAccessResolver, false).await;
        assert!(papers[0].doi_url.is_none());
    }

    #[tokio::test]
    async fn oa_resolver_fills_oa_url_and_flag() {
        let papers = enrich_papers(vec![paper(Some("10.1/x"))], &AlwaysResolves, true).await;
        assert_eq!(papers[0].oa_url.as_deref(), Some("https://oa.example/pdf"));
        assert!(papers[0].is_open_access);
    }

    #[tokio::test]
    async fn existing_oa_url_is_not_overwritten() {
        let mut p = paper(Some("10.1/x"));
        p.oa_url = Some("https://existing".into());
        let papers = enrich_papers(vec![p], &AlwaysResolves, true).await;
        assert_eq!(papers[0].oa_url.as_deref(), Some("https://existing"));
    }

    #[tokio::test]
    async fn publisher_url_falls_back_to_doi_url() {
        let papers = enrich_papers(vec![paper(Some("10.1/x"))], &NullOpenAccessResolver, false).await;
        assert_eq!(papers[0].publisher_url.as_deref(), Some("https://doi.org/10.1/x"));
    }

    #[tokio::test]
    async fn existing_publisher_url_is_kept() {
        let mut p = paper(Some("10.1/x"));
        p.publisher_url = Some("https://publisher.example".into());
        let papers = enrich_papers(vec![p], &NullOpenAccessResolver, false).await;
        assert_eq!(papers[0].publisher_url.as_deref(), Some("https://publisher.example"));
    }

    #[tokio::test]
    async fn fetch_oa_disabled_skips_resolver() {
        let papers = enrich_papers(vec![paper(Some("10.1/x"))], &AlwaysResolves, false).await;
        assert!(papers[0].oa_url.is_none());
    }
}
