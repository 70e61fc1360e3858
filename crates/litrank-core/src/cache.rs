//! In-process, TTL-based search-result and single-paper caches (§4.13).
//!
//! Grounded in the disk cache's key-hashing mechanics (`DefaultHasher` over
//! sorted key material, atomic-write-free since this cache never touches
//! disk) and in the versioned-key/TTL design of the system being reimplemented
//! here: `sort_by`/`limit` never enter the key, so re-sorting or re-paging a
//! cached result never costs a cache miss.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::types::{MergedPaper, SourceTag};

/// Bumped whenever ranking or normalization logic changes incompatibly with
/// previously cached candidate sets.
pub const CACHE_VERSION: &str = "v1";

/// The part of a search request that determines cache identity. `sort_by`
/// and `limit` are deliberately absent — they're applied to the cached
/// candidate list at retrieval time instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchCacheKey {
    pub query: String,
    pub mode: String,
    pub year_from: Option<i32>,
    pub year_to: Option<i32>,
    pub publication_types: Vec<String>,
    pub survey_only: bool,
    pub open_access_only: bool,
    pub sources: Vec<String>,
}

impl SearchCacheKey {
    /// Canonicalize free-form input: lowercase/trim the query, sort list
    /// fields, so equivalent requests always hash identically.
    pub fn new(
        query: &str,
        mode: &str,
        year_from: Option<i32>,
        year_to: Option<i32>,
        mut publication_types: Vec<String>,
        survey_only: bool,
        open_access_only: bool,
        mut sources: Vec<String>,
    ) -> Self {
        publication_types.sort();
        sources.sort();
        Self {
            query: query.trim().to_lowercase(),
            mode: mode.to_string(),
            year_from,
            year_to,
            publication_types,
            survey_only,
            open_access_only,
            sources,
        }
    }

    fn hash_u64(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        CACHE_VERSION.hash(&mut hasher);
        self.hash(&mut hasher);
        hasher.finish()
    }
}

struct SearchCacheEntry {
    papers: Vec<MergedPaper>,
    total_candidates: usize,
    source_stats: HashMap<SourceTag, usize>,
    created_at: Instant,
}

/// A cached ranked candidate set together with the stats that must stay
/// identical across requests differing only in `sort_by`/`limit` (§8 property 5).
#[derive(Debug, Clone)]
pub struct CachedSearch {
    pub papers: Vec<MergedPaper>,
    pub total_candidates: usize,
    pub source_stats: HashMap<SourceTag, usize>,
}

/// Caches the full candidate set for a search, keyed by [`SearchCacheKey`].
/// Retrieval-time sort/limit are the caller's job, not the cache's.
pub struct SearchCache {
    entries: Mutex<HashMap<u64, SearchCacheEntry>>,
    ttl: Duration,
}

impl SearchCache {
    pub fn new(ttl: Duration) -> Self {
        Self { entries: Mutex::new(HashMap::new()), ttl }
    }

    pub fn get(&self, key: &SearchCacheKey) -> Option<CachedSearch> {
        let entries = self.entries.lock().expect("search cache lock poisoned");
        let entry = entries.get(&key.hash_u64())?;
        if entry.created_at.elapsed() > self.ttl {
            return None;
        }
        Some(CachedSearch {
            papers: entry.papers.clone(),
            total_candidates: entry.total_candidates,
            source_stats: entry.source_stats.clone(),
        })
    }

    pub fn set(&self, key: &SearchCacheKey, papers: Vec<MergedPaper>, total_candidates: usize, source_stats: HashMap<SourceTag, usize>) {
        let mut entries = self.entries.lock().expect("search cache lock poisoned");
        entries.insert(key.hash_u64(), SearchCacheEntry { papers, total_candidates, source_stats, created_at: Instant::now() });
    }

    pub fn invalidate(&self, key: &SearchCacheKey) {
        let mut entries = self.entries.lock().expect("search cache lock poisoned");
        entries.remove(&key.hash_u64());
    }

    pub fn cleanup_expired(&self) -> usize {
        let mut entries = self.entries.lock().expect("search cache lock poisoned");
        let before = entries.len();
        entries.retain(|_, entry| entry.created_at.elapsed() <= self.ttl);
        before - entries.len()
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.lock().expect("search cache lock poisoned");
        let expired = entries.values().filter(|e| e.created_at.elapsed() > self.ttl).count();
        CacheStats { total_entries: entries.len(), expired_entries: expired }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub expired_entries: usize,
}

struct PaperCacheEntry {
    paper: MergedPaper,
    created_at: Instant,
}

/// Single-paper cache addressable by either the paper's own id or its DOI,
/// with a TTL typically much longer than [`SearchCache`]'s.
pub struct PaperCache {
    by_id: Mutex<HashMap<String, Arc<PaperCacheEntry>>>,
    by_doi: Mutex<HashMap<String, Arc<PaperCacheEntry>>>,
    ttl: Duration,
}

impl PaperCache {
    pub fn new(ttl: Duration) -> Self {
        Self { by_id: Mutex::new(HashMap::new()), by_doi: Mutex::new(HashMap::new()), ttl }
    }

    pub fn get_by_id(&self, id: &str) -> Option<MergedPaper> {
        let by_id = self.by_id.lock().expect("paper cache lock poisoned");
        let entry = by_id.get(id)?;
        if entry.created_at.elapsed() > self.ttl {
            return None;
        }
        Some(entry.paper.clone())
    }

    pub fn get_by_doi(&self, doi: &str) -> Option<MergedPaper> {
        let by_doi = self.by_doi.lock().expect("paper cache lock poisoned");
        let entry = by_doi.get(&doi.to_lowercase())?;
        if entry.created_at.elapsed() > self.ttl {
            return None;
        }
        Some(entry.paper.clone())
    }

    pub fn set(&self, paper: MergedPaper) {
        let entry = Arc::new(PaperCacheEntry { paper: paper.clone(), created_at: Instant::now() });
        self.by_id.lock().expect("paper cache lock poisoned").insert(paper.id.clone(), entry.clone());
        if let Some(doi) = &paper.doi {
            self.by_doi.lock().expect("paper cache lock poisoned").insert(doi.to_lowercase(), entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WorkType;
    use std::collections::{BTreeSet, HashMap as StdHashMap};

    fn key(query: &str) -> SearchCacheKey {
        SearchCacheKey::new(query, "foundational", None, None, vec![], false, false, vec![])
    }

    fn paper(id: &str) -> MergedPaper {
        MergedPaper {
            id: id.into(),
            title: "T".into(),
            doi: Some(format!("10.1/{id}")),
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
            sources: vec![],
            source_ids: StdHashMap::new(),
            field_provenance: StdHashMap::new(),
            score: 0.0,
            why_recommended: vec![],
            selected: false,
            comments: vec![],
        }
    }

    #[test]
    fn key_ignores_case_and_whitespace() {
        let a = key("  Deep Learning  ");
        let b = key("deep learning");
        assert_eq!(a.hash_u64(), b.hash_u64());
    }

    #[test]
    fn cache_roundtrip() {
        let cache = SearchCache::new(Duration::from_secs(60));
        let k = key("graphs");
        cache.set(&k, vec![paper("1")], 1, StdHashMap::new());
        let got = cache.get(&k).unwrap();
        assert_eq!(got.papers.len(), 1);
        assert_eq!(got.papers[0].id, "1");
    }

    #[test]
    fn different_mode_is_different_key() {
        let cache = SearchCache::new(Duration::from_secs(60));
        let foundational = SearchCacheKey::new("x", "foundational", None, None, vec![], false, false, vec![]);
        let recent = SearchCacheKey::new("x", "recent", None, None, vec![], false, false, vec![]);
        cache.set(&foundational, vec![paper("f")], 1, StdHashMap::new());
        assert!(cache.get(&recent).is_none());
    }

    #[test]
    fn expired_entry_is_miss() {
        let cache = SearchCache::new(Duration::from_millis(0));
        let k = key("x");
        cache.set(&k, vec![paper("1")], 1, StdHashMap::new());
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get(&k).is_none());
    }

    #[test]
    fn invalidate_removes_entry() {
        let cache = SearchCache::new(Duration::from_secs(60));
        let k = key("x");
        cache.set(&k, vec![paper("1")], 1, StdHashMap::new());
        cache.invalidate(&k);
        assert!(cache.get(&k).is_none());
    }

    #[test]
    fn publication_types_order_does_not_affect_key() {
        let a = SearchCacheKey::new("x", "foundational", None, None, vec!["journal".into(), "book".into()], false, false, vec![]);
        let b = SearchCacheKey::new("x", "foundational", None, None, vec!["book".into(), "journal".into()], false, false, vec![]);
        assert_eq!(a.hash_u64(), b.hash_u64());
    }

    #[test]
    fn cached_stats_survive_sort_and_limit_changes() {
        let cache = SearchCache::new(Duration::from_secs(60));
        let k = key("graphs");
        let mut stats = StdHashMap::new();
        stats.insert(SourceTag::OpenAlex, 3usize);
        cache.set(&k, vec![paper("1"), paper("2")], 2, stats);
        let got = cache.get(&k).unwrap();
        assert_eq!(got.total_candidates, 2);
        assert_eq!(got.source_stats.get(&SourceTag::OpenAlex), Some(&3));
    }

    #[test]
    fn paper_cache_lookup_by_doi() {
        let cache = PaperCache::new(Duration::from_secs(60));
        cache.set(paper("42"));
        let by_id = cache.get_by_id("42").unwrap();
        let by_doi = cache.get_by_doi("10.1/42").unwrap();
        assert_eq!(by_id.id, by_doi.id);
    }
}
