use litrank_core::{MergedPaper, SearchResponse};

fn meta_line(resp: &SearchResponse) -> String {
    format!(
        "Found {} candidates for \"{}\" ({} mode) · showing {}",
        resp.total_candidates,
        resp.query,
        mode_label(resp.mode),
        resp.results.len().min(resp.limit),
    )
}

fn mode_label(mode: litrank_core::RankingMode) -> &'static str {
    match mode {
        litrank_core::RankingMode::Foundational => "foundational",
        litrank_core::RankingMode::Recent => "recent",
    }
}

pub fn format_search(resp: &SearchResponse) -> String {
    let mut out = format!("{}\n", meta_line(resp));
    for (i, paper) in resp.results.iter().enumerate() {
        out.push_str(&format_paper_line(i + 1, paper));
    }
    out
}

fn format_paper_line(index: usize, paper: &MergedPaper) -> String {
    let year = paper.year.map_or(String::new(), |y| format!(" ({y})"));
    let mut out = format!("\n {:>2}  {}{}\n", index, paper.title, year);

    if !paper.authors.is_empty() {
        let names: Vec<&str> = paper.authors.iter().map(|a| a.name.as_str()).collect();
        out.push_str(&format!("     {}\n", names.join(" · ")));
    }

    let mut parts = Vec::new();
    if let Some(v) = &paper.venue {
        parts.push(v.clone());
    }
    if let Some(c) = paper.citation_count {
        parts.push(format!("{c} citations"));
    }
    parts.push(format!("score {:.3}", paper.score));
    if paper.is_open_access {
        parts.push("OA".to_string());
    }
    out.push_str(&format!("     {}\n", parts.join(" · ")));

    for bullet in &paper.why_recommended {
        out.push_str(&format!("     - {bullet}\n"));
    }
    out
}

pub fn format_paper(paper: &MergedPaper) -> String {
    format_paper_line(1, paper)
}

pub fn format_paper_list(papers: &[MergedPaper]) -> String {
    if papers.is_empty() {
        return "(none)\n".to_string();
    }
    let mut out = String::new();
    for (i, paper) in papers.iter().enumerate() {
        out.push_str(&format_paper_line(i + 1, paper));
    }
    out
}
