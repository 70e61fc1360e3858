//! Normalization of raw source fields (§4.2).

use unicode_normalization::UnicodeNormalization;

use crate::types::{DataQualityFlag, PaperRecord, WorkType};

const TITLE_STRIP_PREFIXES: &[&str] = &["a ", "an ", "the ", "on ", "re: ", "re:", "fwd: ", "fwd:"];

const SURVEY_KEYWORDS: &[&str] = &[
    "survey",
    "review",
    "overview",
    "tutorial",
    "state of the art",
    "state-of-the-art",
    "systematic review",
    "meta-analysis",
    "literature review",
];

const BOOK_KEYWORDS: &[&str] = &[
    "handbook",
    "press",
    "chapter",
    "ebook",
    "e-book",
    "isbn",
    "springer book",
    "edition",
    "textbook",
    "cambridge university press",
    "oxford university press",
    "wiley",
    "elsevier book",
    "academic press",
];

const CONFERENCE_KEYWORDS: &[&str] = &[
    "proceedings",
    "conference",
    "symposium",
    "workshop",
    "icml",
    "neurips",
    "nips",
    "iclr",
    "cvpr",
    "iccv",
    "eccv",
    "acl",
    "emnlp",
    "naacl",
    "aaai",
    "ijcai",
    "sigkdd",
    "www",
    "chi",
    "sigir",
    "wsdm",
];

const JOURNAL_KEYWORDS: &[&str] = &[
    "journal",
    "transactions",
    "letters",
    "magazine",
    "nature",
    "science",
    "cell",
    "lancet",
    "nejm",
    "jama",
    "plos",
    "bmc",
    "frontiers",
];

/// Lowercase, whitespace-collapsed, prefix/suffix-stripped title for comparison.
pub fn normalize_title(title: &str) -> String {
    if title.is_empty() {
        return String::new();
    }
    let decomposed: String = title.nfkd().collect();
    let mut s = decomposed.to_lowercase();
    s = strip_html_tags(&s);
    s = collapse_whitespace(&s).trim().to_string();

    for prefix in TITLE_STRIP_PREFIXES {
        if let Some(rest) = s.strip_prefix(prefix) {
            s = rest.to_string();
            break;
        }
    }
    s.trim_end_matches('.').to_string()
}

fn strip_html_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_was_space = false;
    for c in s.chars() {
        if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    out
}

/// Lowercase, accent-stripped, punctuation-stripped author name for comparison.
pub fn normalize_author_name(name: &str) -> String {
    if name.is_empty() {
        return String::new();
    }
    let decomposed: String = name.nfkd().collect();
    let without_combining: String = decomposed.chars().filter(|c| !is_combining_mark(*c)).collect();
    let lower = without_combining.to_lowercase();
    let collapsed = collapse_whitespace(&lower).trim().to_string();
    collapsed.chars().filter(|c| !",;:'\"".contains(*c)).collect()
}

fn is_combining_mark(c: char) -> bool {
    matches!(c as u32,
        0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0x20D0..=0x20FF
    )
}

/// Extract the normalized surname from a raw author name: text before a
/// comma ("Last, First"), else the last word ("First M. Last").
pub fn extract_surname(raw_name: &str) -> Option<String> {
    let normalized = normalize_author_name(raw_name);
    if normalized.is_empty() {
        return None;
    }
    if let Some((before_comma, _)) = normalized.split_once(',') {
        let surname = before_comma.trim();
        return if surname.is_empty() { None } else { Some(surname.to_string()) };
    }
    normalized.split_whitespace().last().map(|s| s.to_string())
}

const URL_DOI_PREFIXES: &[&str] =
    &["https://doi.org/", "http://doi.org/", "doi.org/", "doi:"];

/// Strip any URL/scheme prefix and require a leading `10.`; otherwise `None`.
pub fn normalize_doi(doi: &str) -> Option<String> {
    let mut s = doi.trim().to_string();
    let lower = s.to_lowercase();
    for prefix in URL_DOI_PREFIXES {
        if lower.starts_with(prefix) {
            s = s[prefix.len()..].to_string();
            break;
        }
    }
    if s.starts_with("10.") { Some(s) } else { None }
}

/// Keep a year iff it falls within `[1800, current_year]`.
pub fn normalize_year(year: i32, current_year: i32) -> Option<i32> {
    if (1800..=current_year).contains(&year) { Some(year) } else { None }
}

const VENUE_SUFFIXES: &[&str] = &[" (Online)", " (Print)", " - Online", " - Print"];

pub fn normalize_venue(venue: &str) -> Option<String> {
    let mut s = venue.trim().to_string();
    for suffix in VENUE_SUFFIXES {
        if let Some(stripped) = s.strip_suffix(suffix) {
            s = stripped.to_string();
            break;
        }
    }
    let s = collapse_whitespace(&s).trim().to_string();
    if s.is_empty() { None } else { Some(s) }
}

/// Strip an arXiv version suffix, e.g. `1706.03762v2` -> `1706.03762`.
pub fn strip_arxiv_version(arxiv_id: &str) -> String {
    match arxiv_id.rsplit_once('v') {
        Some((base, version)) if version.chars().all(|c| c.is_ascii_digit()) && !version.is_empty() => {
            base.to_string()
        }
        _ => arxiv_id.to_string(),
    }
}

pub fn detect_survey(title: &str, is_survey_flag: bool) -> bool {
    if is_survey_flag {
        return true;
    }
    let lower = title.to_lowercase();
    SURVEY_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// Classify a record's work type by title/venue keywords, following the
/// ordered-test rules in §4.2.
pub fn detect_work_type(record: &PaperRecord) -> WorkType {
    let title_lower = record.title.to_lowercase();
    let venue_lower = record.venue.as_deref().unwrap_or("").to_lowercase();

    if SURVEY_KEYWORDS.iter().any(|kw| title_lower.contains(kw)) || record.is_survey {
        return WorkType::Survey;
    }

    if BOOK_KEYWORDS.iter().any(|kw| title_lower.contains(kw) || venue_lower.contains(kw)) {
        return if title_lower.contains("chapter") || venue_lower.contains("chapter") {
            WorkType::Chapter
        } else {
            WorkType::Book
        };
    }

    if record.source == crate::types::SourceTag::Arxiv
        || venue_lower.contains("arxiv")
        || venue_lower.contains("preprint")
        || title_lower.contains("preprint")
    {
        return WorkType::Preprint;
    }

    if CONFERENCE_KEYWORDS.iter().any(|kw| venue_lower.contains(kw)) {
        return WorkType::Conference;
    }

    if JOURNAL_KEYWORDS.iter().any(|kw| venue_lower.contains(kw)) {
        return WorkType::Journal;
    }

    if record.venue.is_some() { WorkType::Journal } else { WorkType::Unknown }
}

/// Apply every per-field normalization rule to one raw adapter record in
/// place: DOI cleanup, year validation, venue cleanup, work-type and survey
/// classification (§4.2). Adapters emit raw fields; this is the one place
/// those fields become comparable across sources.
pub fn normalize_record(record: &mut PaperRecord, current_year: i32) {
    if let Some(doi) = record.doi.take() {
        record.doi = normalize_doi(&doi);
    }

    if let Some(year) = record.year {
        match normalize_year(year, current_year) {
            Some(valid) => record.year = Some(valid),
            None => {
                record.year = None;
                record.data_quality_flags.insert(DataQualityFlag::BadYear);
            }
        }
    }

    record.venue = record.venue.take().and_then(|v| normalize_venue(&v));
    record.is_survey = detect_survey(&record.title, record.is_survey);
    record.work_type = detect_work_type(record);
}
