use std::sync::Arc;

use litrank_arxiv::ArxivClient;
use litrank_core::annotation::NullAnnotationStore;
use litrank_core::source::Source;
use litrank_core::{Config, Pipeline};
use litrank_crossref::CrossrefClient;
use litrank_openalex::OpenAlexClient;
use litrank_pubmed::PubmedClient;
use litrank_semantic_scholar::SemanticScholarClient;
use litrank_server::LitrankMcp;
use litrank_unpaywall::UnpaywallClient;
use rmcp::ServiceExt;

fn build_pipeline(config: Config) -> Pipeline {
    let sources: Vec<Arc<dyn Source>> = vec![
        Arc::new(SemanticScholarClient::new(config.semantic_scholar_api_key.clone())),
        Arc::new(OpenAlexClient::new(config.unpaywall_email.clone())),
        Arc::new(CrossrefClient::new(config.unpaywall_email.clone())),
        Arc::new(PubmedClient::new(config.unpaywall_email.clone())),
        Arc::new(ArxivClient::new()),
    ];
    let oa_resolver = Arc::new(UnpaywallClient::new(config.unpaywall_email.clone()));
    let annotation_store = Arc::new(NullAnnotationStore);
    Pipeline::new(config, sources, oa_resolver, annotation_store)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let pipeline = build_pipeline(Config::from_env());
    let server = LitrankMcp::new(pipeline);
    let service = server.serve(rmcp::transport::stdio()).await?;
    service.waiting().await?;
    Ok(())
}
