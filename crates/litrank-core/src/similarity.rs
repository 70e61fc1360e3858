//! Similarity primitives used for fuzzy clustering and post-merge dedup (§4.3).

use crate::normalize::{extract_surname, normalize_title};
use crate::types::PaperRecord;

/// Token-sort fuzzy ratio of two normalized titles, scaled to `[0, 1]`.
///
/// Sorts each title's words before comparing so word-order differences don't
/// tank the score, then measures edit distance over the sorted strings.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let norm_a = normalize_title(a);
    let norm_b = normalize_title(b);
    if norm_a.is_empty() || norm_b.is_empty() {
        return 0.0;
    }
    token_sort_ratio(&norm_a, &norm_b)
}

fn token_sort_ratio(a: &str, b: &str) -> f64 {
    let sorted_a = sorted_tokens(a);
    let sorted_b = sorted_tokens(b);
    strsim::normalized_levenshtein(&sorted_a, &sorted_b)
}

fn sorted_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Similarity of two records' first authors, by surname.
pub fn author_similarity(a: &PaperRecord, b: &PaperRecord) -> f64 {
    let surname_a = a.first_author_name().and_then(extract_surname);
    let surname_b = b.first_author_name().and_then(extract_surname);
    match (surname_a, surname_b) {
        (Some(x), Some(y)) if x == y => 1.0,
        (Some(x), Some(y)) => strsim::normalized_levenshtein(&x, &y),
        _ => 0.5,
    }
}

pub fn year_similarity(a: Option<i32>, b: Option<i32>) -> f64 {
    match (a, b) {
        (Some(x), Some(y)) => match (x - y).abs() {
            0 => 1.0,
            1 => 0.9,
            2 => 0.7,
            _ => 0.0,
        },
        _ => 0.5,
    }
}

/// Fuzzy "same paper" decision used to sub-cluster a title-hash bucket (§4.5)
/// and to gate the safe post-merge dedup pass (§4.8).
pub fn are_likely_same_paper(a: &PaperRecord, b: &PaperRecord) -> bool {
    if let (Some(doi_a), Some(doi_b)) = (&a.doi, &b.doi) {
        return doi_a.eq_ignore_ascii_case(doi_b);
    }

    let title_sim = title_similarity(&a.title, &b.title);
    if title_sim < 0.90 {
        return false;
    }

    if let (Some(ya), Some(yb)) = (a.year, b.year) {
        if (ya - yb).abs() > 2 {
            return false;
        }
    }

    if title_sim >= 0.95 {
        return true;
    }

    let author_sim = author_similarity(a, b);
    if author_sim < 0.30 {
        return false;
    }

    let year_sim = year_similarity(a.year, b.year);
    let combined = 0.50 * title_sim + 0.35 * author_sim + 0.15 * year_sim;
    combined >= 0.85
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Author, SourceTag};

    fn paper(title: &str) -> PaperRecord {
        PaperRecord::new(SourceTag::OpenAlex, "1", title)
    }

    #[test]
    fn title_similarity_is_order_insensitive() {
        let sim = title_similarity("Deep Learning for Graphs", "Graphs for Deep Learning");
        assert!(sim > 0.9, "expected high similarity, got {sim}");
    }

    #[test]
    fn title_similarity_empty_is_zero() {
        assert_eq!(title_similarity("", "something"), 0.0);
    }

    #[test]
    fn author_similarity_exact_match() {
        let mut a = paper("x");
        a.authors = vec![Author::new("Ashish Vaswani")];
        let mut b = paper("y");
        b.authors = vec![Author::new("Vaswani, Ashish")];
        assert_eq!(author_similarity(&a, &b), 1.0);
    }

    #[test]
    fn author_similarity_absent_is_uncertain() {
        let a = paper("x");
        let b = paper("y");
        assert_eq!(author_similarity(&a, &b), 0.5);
    }

    #[test]
    fn year_similarity_off_by_one() {
        assert_eq!(year_similarity(Some(2017), Some(2018)), 0.9);
    }

    #[test]
    fn are_likely_same_paper_doi_match_short_circuits() {
        let mut a = paper("Completely Different Title A");
        a.doi = Some("10.1/x".into());
        let mut b = paper("Totally Unrelated Title B");
        b.doi = Some("10.1/x".into());
        assert!(are_likely_same_paper(&a, &b));
    }

    #[test]
    fn are_likely_same_paper_doi_mismatch_short_circuits_false() {
        let mut a = paper("Attention Is All You Need");
        a.doi = Some("10.1/x".into());
        let mut b = paper("Attention Is All You Need");
        b.doi = Some("10.1/y".into());
        assert!(!are_likely_same_paper(&a, &b));
    }

    #[test]
    fn are_likely_same_paper_false_when_titles_and_years_diverge() {
        let mut a = paper("Attention Is All You Need");
        a.year = Some(2017);
        a.authors = vec![Author::new("Vaswani")];
        let mut b = paper("A Completely Unrelated Study of Soil Chemistry");
        b.year = Some(2005);
        b.authors = vec![Author::new("Totally Different Person")];
        assert!(!are_likely_same_paper(&a, &b));
    }
}
