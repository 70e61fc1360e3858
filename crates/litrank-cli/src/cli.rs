use clap::{Parser, Subcommand, ValueEnum};

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Mode {
    Foundational,
    Recent,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Sort {
    Relevance,
    Citations,
    Year,
}

#[derive(Parser)]
#[command(name = "litrank", about = "Rank research papers across bibliographic sources", term_width = 100)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Fan a query out to every enabled source and return ranked papers
    Search {
        query: String,
        #[arg(long, value_enum, default_value = "foundational")]
        mode: Mode,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long, value_enum, default_value = "relevance")]
        sort_by: Sort,
        #[arg(long)]
        year_min: Option<i32>,
        #[arg(long)]
        year_max: Option<i32>,
        #[arg(long)]
        oa_only: bool,
        #[arg(long)]
        survey_only: bool,
        /// Per-source candidate cap before merging (defaults to the configured value)
        #[arg(long)]
        limit_per_database: Option<usize>,
        /// Leave PubMed out of the fan-out for this query
        #[arg(long)]
        exclude_pubmed: bool,
        /// Leave arXiv out of the fan-out for this query
        #[arg(long)]
        exclude_arxiv: bool,
        #[arg(long)]
        bypass_cache: bool,
        #[arg(long)]
        json: bool,
    },
    /// Fetch one previously-ranked paper by id
    Get {
        id: String,
        #[arg(long)]
        json: bool,
    },
    /// One-hop related papers for a previously-ranked paper
    Related {
        id: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Bookmark or unbookmark a paper
    Select {
        id: String,
        #[arg(long)]
        selected: bool,
    },
    /// Attach a note to a paper
    Comment {
        id: String,
        text: String,
    },
    /// List bookmarked papers
    Bookmarked {
        #[arg(long)]
        json: bool,
    },
    /// List papers with notes
    WithNotes {
        #[arg(long)]
        json: bool,
    },
    /// Look up a publication (journal/conference/book) by id — not yet implemented
    Publication { id: String },
}
