use serde::Serialize;

use crate::{
    error::Result,
    model::Bookmark,
    search_index::{SearchDocument, SearchIndex},
    store::Store,
};

/// Hits returned when a caller asks for `limit == 0`.
pub const DEFAULT_SEARCH_LIMIT: usize = 20;

/// Upper bound on bookmarks written by [`SearchService::rebuild`].
pub const REBUILD_LIMIT: usize = 1000;

const WRITER_MEMORY_BUDGET: usize = 15_000_000;

/// A ranked full-text hit resolved against the store.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub rank: usize,
    pub score: f32,
    pub bookmark: Bookmark,
}

/// Keeps the full-text index in step with the store and answers queries.
///
/// The index is a projection: it changes only when one of these methods is
/// called, and [`SearchService::search`] drops hits the store no longer
/// knows about.
pub struct SearchService<'a> {
    store: &'a Store,
    index: SearchIndex,
}

impl<'a> SearchService<'a> {
    pub fn new(store: &'a Store, index: SearchIndex) -> Self {
        Self { store, index }
    }

    pub fn index(&self) -> &SearchIndex {
        &self.index
    }

    /// Insert or replace the document for `bookmark`.
    pub fn index_bookmark(&self, bookmark: &Bookmark) -> Result<()> {
        let mut writer = self.index.writer(WRITER_MEMORY_BUDGET)?;
        self.index
            .add_document(&writer, &SearchDocument::from(bookmark))?;
        writer.commit()?;
        tracing::debug!(id = bookmark.id, "indexed bookmark");
        Ok(())
    }

    /// Remove the document for bookmark `id`, if there is one.
    pub fn delete_bookmark(&self, id: i64) -> Result<()> {
        let mut writer = self.index.writer(WRITER_MEMORY_BUDGET)?;
        self.index.delete_document(&writer, &id.to_string());
        writer.commit()?;
        Ok(())
    }

    /// Run a free-text query and load each hit from the store.
    ///
    /// `limit == 0` selects [`DEFAULT_SEARCH_LIMIT`]. Hits that no longer
    /// resolve to a bookmark are skipped, so fewer than `limit` results may
    /// come back even when more documents matched.
    pub fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let limit = if limit == 0 { DEFAULT_SEARCH_LIMIT } else { limit };
        let hits = self.index.search(query, limit)?;

        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            let id = match hit.id.parse::<i64>() {
                Ok(id) => id,
                Err(e) => {
                    tracing::warn!(
                        id = %hit.id,
                        error = %e,
                        "unparseable document id"
                    );
                    continue;
                }
            };

            match self.store.get_by_id(id) {
                Ok(Some(bookmark)) => results.push(SearchResult {
                    rank: results.len() + 1,
                    score: hit.score,
                    bookmark,
                }),
                Ok(None) => {
                    tracing::debug!(id, "skipping stale index entry");
                }
                Err(e) => {
                    tracing::warn!(id, error = %e, "failed to load search hit");
                }
            }
        }

        Ok(results)
    }

    /// Replace the whole index with documents for the newest
    /// [`REBUILD_LIMIT`] bookmarks. Returns how many were written.
    pub fn rebuild(&mut self) -> Result<usize> {
        let bookmarks = self.store.list(None, REBUILD_LIMIT, 0)?;

        self.index.reopen()?;
        let mut writer = self.index.writer(WRITER_MEMORY_BUDGET)?;
        self.index.delete_all(&writer)?;
        for bookmark in &bookmarks {
            self.index
                .add_document(&writer, &SearchDocument::from(bookmark))?;
        }
        writer.commit()?;

        tracing::info!(count = bookmarks.len(), "search index rebuilt");
        Ok(bookmarks.len())
    }
}

impl std::fmt::Debug for SearchService<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchService")
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn saved(store: &Store, url: &str, title: &str, content: &str) -> Bookmark {
        let mut b = Bookmark::new(url, title);
        b.content = content.to_string();
        store.create(&mut b).unwrap();
        b
    }

    #[test]
    fn search_resolves_hits_from_store() {
        let store = Store::open_in_memory().unwrap();
        let service =
            SearchService::new(&store, SearchIndex::open_in_ram().unwrap());

        let rust = saved(&store, "https://rust.example", "Rust", "ownership");
        let go = saved(&store, "https://go.example", "Go", "goroutines");
        service.index_bookmark(&rust).unwrap();
        service.index_bookmark(&go).unwrap();

        let results = service.search("ownership", 0).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].rank, 1);
        assert_eq!(results[0].bookmark.id, rust.id);
        assert_eq!(results[0].bookmark.url, "https://rust.example");
    }

    #[test]
    fn tags_are_searchable_after_reindex() {
        let store = Store::open_in_memory().unwrap();
        let service =
            SearchService::new(&store, SearchIndex::open_in_ram().unwrap());
        let mut b = saved(&store, "https://a.example", "A", "");
        service.index_bookmark(&b).unwrap();
        assert!(service.search("cooking", 10).unwrap().is_empty());

        b.add_tag("cooking");
        store.update(&mut b).unwrap();
        service.index_bookmark(&b).unwrap();

        let results = service.search("cooking", 10).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(service.index().num_docs().unwrap(), 1);
    }

    #[test]
    fn search_respects_limit() {
        let store = Store::open_in_memory().unwrap();
        let service =
            SearchService::new(&store, SearchIndex::open_in_ram().unwrap());
        for i in 0..5 {
            let url = format!("https://{i}.example");
            let b = saved(&store, &url, "T", "shared");
            service.index_bookmark(&b).unwrap();
        }

        assert_eq!(service.search("shared", 2).unwrap().len(), 2);
        assert_eq!(service.search("shared", 0).unwrap().len(), 5);
    }

    #[test]
    fn stale_entries_are_skipped_until_rebuild() {
        let store = Store::open_in_memory().unwrap();
        let mut service =
            SearchService::new(&store, SearchIndex::open_in_ram().unwrap());

        let gone = saved(&store, "https://gone.example", "Gone", "ephemeral");
        let kept = saved(&store, "https://kept.example", "Kept", "ephemeral");
        service.index_bookmark(&gone).unwrap();
        service.index_bookmark(&kept).unwrap();

        assert!(store.delete(gone.id).unwrap());

        let results = service.search("ephemeral", 10).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].bookmark.id, kept.id);
        assert_eq!(service.index().num_docs().unwrap(), 2);

        assert_eq!(service.rebuild().unwrap(), 1);
        assert_eq!(service.index().num_docs().unwrap(), 1);
    }

    #[test]
    fn delete_bookmark_removes_document() {
        let store = Store::open_in_memory().unwrap();
        let service =
            SearchService::new(&store, SearchIndex::open_in_ram().unwrap());
        let b = saved(&store, "https://a.example", "A", "removable");
        service.index_bookmark(&b).unwrap();

        service.delete_bookmark(b.id).unwrap();
        service.delete_bookmark(9999).unwrap();

        assert!(service.search("removable", 10).unwrap().is_empty());
        assert_eq!(service.index().num_docs().unwrap(), 0);
    }

    #[test]
    fn rebuild_indexes_unindexed_bookmarks_on_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::open_in_memory().unwrap();
        let index = SearchIndex::open(&tmp.path().join("index")).unwrap();
        let mut service = SearchService::new(&store, index);

        saved(&store, "https://a.example", "Alpha", "first");
        saved(&store, "https://b.example", "Beta", "second");

        assert!(service.search("first", 10).unwrap().is_empty());
        assert_eq!(service.rebuild().unwrap(), 2);
        assert_eq!(service.search("first", 10).unwrap().len(), 1);

        // Rebuilding twice does not duplicate documents.
        assert_eq!(service.rebuild().unwrap(), 2);
        assert_eq!(service.index().num_docs().unwrap(), 2);
    }
}
