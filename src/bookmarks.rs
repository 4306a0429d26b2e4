//! Bookmark orchestration: validation, de-duplication, extraction and tag
//! edits on top of the [`Store`].

use crate::{
    error::{Error, Result},
    extractor::{ContentExtractor, generate_summary},
    fuzzy,
    model::{Bookmark, Tag},
    store::Store,
};

/// Page size used when a caller asks for `limit == 0`.
pub const DEFAULT_LIST_LIMIT: usize = 20;

/// How many bookmarks are loaded as candidates for a fuzzy title search.
pub const FUZZY_CANDIDATE_LIMIT: usize = 1000;

pub struct BookmarkService<'a, E> {
    store: &'a Store,
    extractor: E,
}

impl<'a, E: ContentExtractor> BookmarkService<'a, E> {
    pub fn new(store: &'a Store, extractor: E) -> Self {
        Self { store, extractor }
    }

    /// Save `url`, or return the existing bookmark for it.
    ///
    /// When the page cannot be fetched a minimal bookmark is still saved,
    /// with the URL as its title, no derived text and no tags.
    pub fn add(&self, url: &str, tags: &[&str]) -> Result<Bookmark> {
        validate_url(url)?;

        if let Some(existing) = self.store.get_by_url(url)? {
            tracing::debug!(url, id = existing.id, "bookmark already saved");
            return Ok(existing);
        }

        let mut bookmark = match self.extractor.extract(url) {
            Ok(fields) => {
                let mut bookmark = Bookmark::new(url, fields.title);
                bookmark.summary = generate_summary(&fields.content);
                bookmark.description = fields.description;
                bookmark.content = fields.content;
                for tag in tags.iter().filter(|t| !t.is_empty()) {
                    bookmark.add_tag(tag);
                }
                bookmark
            }
            Err(e) => {
                tracing::warn!(
                    url,
                    error = %e,
                    dropped_tags = tags.len(),
                    "content extraction failed"
                );
                Bookmark::new(url, url)
            }
        };

        self.store.create(&mut bookmark)?;
        tracing::info!(id = bookmark.id, url, "bookmark saved");
        Ok(bookmark)
    }

    pub fn get(&self, id: i64) -> Result<Bookmark> {
        self.store
            .get_by_id(id)?
            .ok_or_else(|| Error::bookmark_not_found(id))
    }

    /// List bookmarks newest first. `limit == 0` selects
    /// [`DEFAULT_LIST_LIMIT`].
    pub fn list(
        &self,
        tag: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Bookmark>> {
        let limit = if limit == 0 { DEFAULT_LIST_LIMIT } else { limit };
        self.store.list(tag, limit, offset)
    }

    pub fn update(&self, bookmark: &mut Bookmark) -> Result<()> {
        self.store.update(bookmark)
    }

    pub fn delete(&self, id: i64) -> Result<()> {
        if !self.store.delete(id)? {
            return Err(Error::bookmark_not_found(id));
        }
        tracing::info!(id, "bookmark deleted");
        Ok(())
    }

    /// Attach `tag` to a bookmark. Attaching a tag it already has still
    /// rewrites the bookmark.
    pub fn add_tag(&self, id: i64, tag: &str) -> Result<Bookmark> {
        let mut bookmark = self.get(id)?;
        bookmark.add_tag(tag);
        self.store.update(&mut bookmark)?;
        Ok(bookmark)
    }

    pub fn remove_tag(&self, id: i64, tag: &str) -> Result<Bookmark> {
        let mut bookmark = self.get(id)?;
        bookmark.remove_tag(tag);
        self.store.update(&mut bookmark)?;
        Ok(bookmark)
    }

    pub fn all_tags(&self) -> Result<Vec<Tag>> {
        self.store.all_tags()
    }

    pub fn count(&self) -> Result<usize> {
        self.store.count()
    }

    /// Fuzzy-match `query` against bookmark titles, best match first.
    ///
    /// Candidates are the newest [`FUZZY_CANDIDATE_LIMIT`] bookmarks, read
    /// fresh from the store on every call.
    pub fn find_by_title(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Bookmark>> {
        let limit = if limit == 0 { DEFAULT_LIST_LIMIT } else { limit };
        let bookmarks = self.store.list(None, FUZZY_CANDIDATE_LIMIT, 0)?;
        let titles: Vec<&str> =
            bookmarks.iter().map(|b| b.title.as_str()).collect();
        let ranked = fuzzy::find(query, &titles);

        let mut slots: Vec<Option<Bookmark>> =
            bookmarks.into_iter().map(Some).collect();
        Ok(ranked
            .iter()
            .take(limit)
            .filter_map(|m| slots.get_mut(m.index).and_then(Option::take))
            .collect())
    }
}

impl<E> std::fmt::Debug for BookmarkService<'_, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookmarkService").finish_non_exhaustive()
    }
}

/// Rejects input the `url` parser would silently rewrite: surrounding
/// controls or spaces, and embedded tabs or newlines.
fn validate_url(url: &str) -> Result<()> {
    let invalid = |reason: String| Error::Validation {
        url: url.to_string(),
        reason,
    };

    if url.trim_matches(|c: char| c <= ' ') != url {
        return Err(invalid("leading or trailing whitespace".to_string()));
    }
    if url.contains(['\t', '\n', '\r']) {
        return Err(invalid("embedded tab or newline".to_string()));
    }
    url::Url::parse(url)
        .map(|_| ())
        .map_err(|e| invalid(e.to_string()))
}
