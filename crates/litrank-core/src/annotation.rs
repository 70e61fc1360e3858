//! The external persistence collaborator boundary (§6): a relational store
//! for user bookmarks/notes, represented as a trait so the pipeline is fully
//! exercisable without a real database.

use async_trait::async_trait;
use serde::Serialize;

/// Outcome of a write to the annotation store. `persisted: false` means the
/// store was unavailable, not that the request was invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WriteOutcome {
    pub persisted: bool,
}

#[async_trait]
pub trait AnnotationStore: Send + Sync {
    async fn set_selected(&self, paper_id: &str, selected: bool) -> WriteOutcome;
    async fn set_comment(&self, paper_id: &str, comment: &str) -> WriteOutcome;
    async fn bookmarked_paper_ids(&self) -> Vec<String>;
    async fn paper_ids_with_notes(&self) -> Vec<String>;
}

/// Default implementation: every write reports `persisted: false` and every
/// read returns empty, so the crate runs standalone without a database.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAnnotationStore;

#[async_trait]
impl AnnotationStore for NullAnnotationStore {
    async fn set_selected(&self, _paper_id: &str, _selected: bool) -> WriteOutcome {
        WriteOutcome { persisted: false }
    }

    async fn set_comment(&self, _paper_id: &str, _comment: &str) -> WriteOutcome {
        WriteOutcome { persisted: false }
    }

    async fn bookmarked_paper_ids(&self) -> Vec<String> {
        Vec::new()
    }

    async fn paper_ids_with_notes(&self) -> Vec<String> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_store_never_persists() {
        let store = NullAnnotationStore;
        assert!(!store.set_selected("1", true).await.persisted);
        assert!(!store.set_comment("1", "note").await.persisted);
    }

    #[tokio::test]
    async fn null_store_reads_are_empty() {
        let store = NullAnnotationStore;
        assert!(store.bookmarked_paper_ids().await.is_empty());
        assert!(store.paper_ids_with_notes().await.is_empty());
    }
}
