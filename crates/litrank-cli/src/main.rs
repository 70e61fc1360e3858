mod cli;
mod format;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use litrank_arxiv::ArxivClient;
use litrank_core::annotation::NullAnnotationStore;
use litrank_core::pipeline::{SearchRequest, SortBy};
use litrank_core::source::Source;
use litrank_core::{Config, Pipeline, RankingMode};
use litrank_crossref::CrossrefClient;
use litrank_openalex::OpenAlexClient;
use litrank_pubmed::PubmedClient;
use litrank_semantic_scholar::SemanticScholarClient;
use litrank_unpaywall::UnpaywallClient;

use cli::{Cli, Command, Mode, Sort};

fn exit_err(message: impl std::fmt::Display) -> ExitCode {
    eprintln!("error: {message}");
    ExitCode::FAILURE
}

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

fn mode_from(mode: Mode) -> RankingMode {
    match mode {
        Mode::Foundational => RankingMode::Foundational,
        Mode::Recent => RankingMode::Recent,
    }
}

fn sort_by_from(sort: Sort) -> SortBy {
    match sort {
        Sort::Relevance => SortBy::Relevance,
        Sort::Citations => SortBy::Citations,
        Sort::Year => SortBy::Year,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let pipeline = build_pipeline(Config::from_env());

    match cli.command {
        Command::Search {
            query,
            mode,
            limit,
            sort_by,
            year_min,
            year_max,
            oa_only,
            survey_only,
            limit_per_database,
            exclude_pubmed,
            exclude_arxiv,
            bypass_cache,
            json,
        } => {
            let request = SearchRequest {
                query,
                mode: mode_from(mode),
                limit,
                sort_by: sort_by_from(sort_by),
                year_min,
                year_max,
                open_access_only: oa_only,
                survey_only,
                limit_per_source: limit_per_database,
                include_pubmed: exclude_pubmed.then_some(false),
                include_arxiv: exclude_arxiv.then_some(false),
                bypass_cache,
                ..Default::default()
            };
            match pipeline.search(request).await {
                Ok(response) => {
                    if json {
                        println!("{}", serde_json::to_string_pretty(&search_response_json(&response)).unwrap());
                    } else {
                        print!("{}", format::format_search(&response));
                    }
                    ExitCode::SUCCESS
                }
                Err(err) => exit_err(err),
            }
        }
        Command::Get { id, json } => match pipeline.get_paper(&id) {
            Some(paper) => {
                if json {
                    println!("{}", serde_json::to_string_pretty(&paper).unwrap());
                } else {
                    print!("{}", format::format_paper(&paper));
                }
                ExitCode::SUCCESS
            }
            None => exit_err(litrank_core::PipelineError::PaperNotFound(id)),
        },
        Command::Related { id, limit, json } => match pipeline.related_papers(&id, limit).await {
            Ok(papers) => {
                if json {
                    println!("{}", serde_json::to_string_pretty(&papers).unwrap());
                } else {
                    print!("{}", format::format_paper_list(&papers));
                }
                ExitCode::SUCCESS
            }
            Err(err) => exit_err(err),
        },
        Command::Select { id, selected } => {
            let outcome = pipeline.set_selected(&id, selected).await;
            println!("persisted: {}", outcome.persisted);
            ExitCode::SUCCESS
        }
        Command::Comment { id, text } => {
            let outcome = pipeline.set_comment(&id, &text).await;
            println!("persisted: {}", outcome.persisted);
            ExitCode::SUCCESS
        }
        Command::Bookmarked { json } => {
            let papers = pipeline.bookmarked_papers().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&papers).unwrap());
            } else {
                print!("{}", format::format_paper_list(&papers));
            }
            ExitCode::SUCCESS
        }
        Command::WithNotes { json } => {
            let papers = pipeline.papers_with_notes().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&papers).unwrap());
            } else {
                print!("{}", format::format_paper_list(&papers));
            }
            ExitCode::SUCCESS
        }
        Command::Publication { id } => match pipeline.get_publication(&id) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => exit_err(err),
        },
    }
}

fn search_response_json(response: &litrank_core::SearchResponse) -> serde_json::Value {
    serde_json::json!({
        "results": response.results,
        "query": response.query,
        "limit": response.limit,
        "totalCandidates": response.total_candidates,
    })
}
