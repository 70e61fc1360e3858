use std::sync::Arc;

use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{ServerCapabilities, ServerInfo};
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use serde::Serialize;

use litrank_core::{Pipeline, PipelineError};

use crate::params::{CommentToolParams, PaperIdToolParams, RelatedToolParams, SearchToolParams, SelectToolParams};

#[derive(Clone)]
pub struct LitrankMcp {
    pipeline: Arc<Pipeline>,
    tool_router: ToolRouter<Self>,
}

impl LitrankMcp {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            tool_router: Self::tool_router(),
        }
    }
}

fn json_result<T: Serialize>(value: T) -> Result<String, String> {
    serde_json::to_string_pretty(&value).map_err(|e| format!("JSON serialization error: {e}"))
}

fn pipeline_err(err: PipelineError) -> String {
    err.to_string()
}

#[tool_router(vis = "pub")]
impl LitrankMcp {
    /// Fan a query out to every enabled bibliographic source, normalize and
    /// deduplicate the results into canonical works, and return them ranked.
    #[tool]
    pub async fn search(&self, Parameters(params): Parameters<SearchToolParams>) -> Result<String, String> {
        let request = params.into_search_request();
        let response = self.pipeline.search(request).await.map_err(pipeline_err)?;
        json_result(response.results)
    }

    /// Fetch one previously-ranked paper by id.
    #[tool]
    pub async fn get_paper(&self, Parameters(params): Parameters<PaperIdToolParams>) -> Result<String, String> {
        match self.pipeline.get_paper(&params.id) {
            Some(paper) => json_result(paper),
            None => Err(PipelineError::PaperNotFound(params.id).to_string()),
        }
    }

    /// One-hop related papers for a previously-ranked paper.
    #[tool]
    pub async fn related_papers(&self, Parameters(params): Parameters<RelatedToolParams>) -> Result<String, String> {
        let limit = params.limit.unwrap_or(20);
        let papers = self.pipeline.related_papers(&params.id, limit).await.map_err(pipeline_err)?;
        json_result(papers)
    }

    /// Bookmark or unbookmark a paper.
    #[tool]
    pub async fn select(&self, Parameters(params): Parameters<SelectToolParams>) -> Result<String, String> {
        let outcome = self.pipeline.set_selected(&params.id, params.selected).await;
        json_result(outcome)
    }

    /// Attach a free-text note to a paper.
    #[tool]
    pub async fn comment(&self, Parameters(params): Parameters<CommentToolParams>) -> Result<String, String> {
        let outcome = self.pipeline.set_comment(&params.id, &params.text).await;
        json_result(outcome)
    }

    /// List every paper currently bookmarked.
    #[tool]
    pub async fn bookmarked(&self) -> Result<String, String> {
        json_result(self.pipeline.bookmarked_papers().await)
    }

    /// List every paper that has a note attached.
    #[tool]
    pub async fn with_notes(&self) -> Result<String, String> {
        json_result(self.pipeline.papers_with_notes().await)
    }

    /// Look up a publication (journal/conference/book) by id. Not yet
    /// implemented; always returns a 501 error.
    #[tool]
    pub async fn publication(&self, Parameters(params): Parameters<PaperIdToolParams>) -> Result<String, String> {
        self.pipeline.get_publication(&params.id).map_err(pipeline_err)?;
        json_result(())
    }
}

#[tool_handler]
impl ServerHandler for LitrankMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: rmcp::model::Implementation {
                name: "litrank-server".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: None,
                description: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "MCP server for ranking research papers across Semantic Scholar, OpenAlex, \
                 Crossref, PubMed and arXiv. Use `search` to fan a query out and get back \
                 deduplicated, ranked papers; `get_paper` to look one up by id; \
                 `related_papers` for a one-hop citation/reference walk; `select`/`comment` \
                 to bookmark or annotate a paper; `bookmarked`/`with_notes` to list annotated \
                 papers. `publication` is not yet implemented and always errors."
                    .into(),
            ),
        }
    }
}
