//! SQLite-backed bookmark and tag storage.
//!
//! Every write that touches a bookmark and its tag associations runs in one
//! transaction, so a reader never sees scalar fields from one write paired
//! with tags from another.

use std::path::Path;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::{
    error::{Error, Result},
    model::{Bookmark, Tag},
};

/// Idempotent schema, safe to run on every open.
///
/// `users` is not used by any operation.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS bookmarks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT UNIQUE NOT NULL,
    title TEXT NOT NULL DEFAULT '',
    description TEXT NOT NULL DEFAULT '',
    content TEXT NOT NULL DEFAULT '',
    summary TEXT NOT NULL DEFAULT '',
    created_at TIMESTAMP NOT NULL,
    updated_at TIMESTAMP NOT NULL
);

CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT UNIQUE NOT NULL
);

CREATE TABLE IF NOT EXISTS bookmark_tags (
    bookmark_id INTEGER NOT NULL,
    tag_id INTEGER NOT NULL,
    PRIMARY KEY (bookmark_id, tag_id),
    FOREIGN KEY (bookmark_id) REFERENCES bookmarks(id) ON DELETE CASCADE,
    FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_bookmarks_created_at
    ON bookmarks(created_at);

CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT UNIQUE NOT NULL,
    password TEXT NOT NULL,
    created_at TIMESTAMP NOT NULL
);
";

const SELECT_BOOKMARK: &str = "SELECT id, url, title, description, content, \
     summary, created_at, updated_at FROM bookmarks";

pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create the database at `path` and ensure the schema exists.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    /// Create an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        tracing::debug!("database schema initialized");
        Ok(Self { conn })
    }

    /// Insert a new bookmark with its tags, assigning ids to both.
    ///
    /// Tags are matched by name: an existing tag row is reused, a missing one
    /// is created. Nothing is written if any step fails.
    pub fn create(&self, bookmark: &mut Bookmark) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            "INSERT INTO bookmarks (url, title, description, content, \
             summary, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                bookmark.url,
                bookmark.title,
                bookmark.description,
                bookmark.content,
                bookmark.summary,
                bookmark.created_at,
                bookmark.updated_at,
            ],
        )?;
        let id = tx.last_insert_rowid();
        let tag_ids = attach_tags(&tx, id, &bookmark.tags)?;

        tx.commit()?;

        bookmark.id = id;
        assign_tag_ids(&mut bookmark.tags, &tag_ids);
        Ok(())
    }

    pub fn get_by_id(&self, id: i64) -> Result<Option<Bookmark>> {
        let found = self
            .conn
            .query_row(
                &format!("{SELECT_BOOKMARK} WHERE id = ?1"),
                params![id],
                row_to_bookmark,
            )
            .optional()?;
        self.with_tags(found)
    }

    pub fn get_by_url(&self, url: &str) -> Result<Option<Bookmark>> {
        let found = self
            .conn
            .query_row(
                &format!("{SELECT_BOOKMARK} WHERE url = ?1"),
                params![url],
                row_to_bookmark,
            )
            .optional()?;
        self.with_tags(found)
    }

    /// List bookmarks newest first, optionally only those carrying `tag`.
    ///
    /// `limit` and `offset` page over bookmarks; tags are attached afterwards.
    /// An empty tag name is treated as no filter.
    pub fn list(
        &self,
        tag: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Bookmark>> {
        let limit = to_sql_int(limit);
        let offset = to_sql_int(offset);

        let mut bookmarks = match tag.filter(|t| !t.is_empty()) {
            Some(name) => {
                let mut stmt = self.conn.prepare(
                    "SELECT b.id, b.url, b.title, b.description, b.content, \
                     b.summary, b.created_at, b.updated_at \
                     FROM bookmarks b \
                     JOIN bookmark_tags bt ON bt.bookmark_id = b.id \
                     JOIN tags t ON t.id = bt.tag_id \
                     WHERE t.name = ?1 \
                     ORDER BY b.created_at DESC, b.id DESC \
                     LIMIT ?2 OFFSET ?3",
                )?;
                stmt.query_map(params![name, limit, offset], row_to_bookmark)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => {
                let mut stmt = self.conn.prepare(&format!(
                    "{SELECT_BOOKMARK} \
                     ORDER BY created_at DESC, id DESC \
                     LIMIT ?1 OFFSET ?2"
                ))?;
                stmt.query_map(params![limit, offset], row_to_bookmark)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            }
        };

        for bookmark in &mut bookmarks {
            bookmark.tags = self.tags_for(bookmark.id)?;
        }
        Ok(bookmarks)
    }

    /// Overwrite a bookmark's fields and replace its whole tag set.
    ///
    /// `updated_at` is advanced to now. Fails with [`Error::NotFound`] when
    /// no bookmark has this id.
    pub fn update(&self, bookmark: &mut Bookmark) -> Result<()> {
        let now = Utc::now();
        let tx = self.conn.unchecked_transaction()?;

        let affected = tx.execute(
            "UPDATE bookmarks SET url = ?1, title = ?2, description = ?3, \
             content = ?4, summary = ?5, updated_at = ?6 WHERE id = ?7",
            params![
                bookmark.url,
                bookmark.title,
                bookmark.description,
                bookmark.content,
                bookmark.summary,
                now,
                bookmark.id,
            ],
        )?;
        if affected == 0 {
            return Err(Error::bookmark_not_found(bookmark.id));
        }

        tx.execute(
            "DELETE FROM bookmark_tags WHERE bookmark_id = ?1",
            params![bookmark.id],
        )?;
        let tag_ids = attach_tags(&tx, bookmark.id, &bookmark.tags)?;

        tx.commit()?;

        bookmark.updated_at = now;
        assign_tag_ids(&mut bookmark.tags, &tag_ids);
        Ok(())
    }

    /// Delete a bookmark. Its tag associations go with it; tag rows stay.
    ///
    /// Returns `false` when there was nothing to delete.
    pub fn delete(&self, id: i64) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM bookmarks WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }

    /// Every tag, ordered by name.
    pub fn all_tags(&self) -> Result<Vec<Tag>> {
        let mut stmt =
            self.conn.prepare("SELECT id, name FROM tags ORDER BY name")?;
        let tags = stmt
            .query_map([], row_to_tag)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tags)
    }

    pub fn count(&self) -> Result<usize> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM bookmarks", [], |row| {
                    row.get(0)
                })?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    fn tags_for(&self, bookmark_id: i64) -> Result<Vec<Tag>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.id, t.name FROM tags t \
             JOIN bookmark_tags bt ON bt.tag_id = t.id \
             WHERE bt.bookmark_id = ?1 \
             ORDER BY t.name",
        )?;
        let tags = stmt
            .query_map(params![bookmark_id], row_to_tag)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tags)
    }

    fn with_tags(&self, found: Option<Bookmark>) -> Result<Option<Bookmark>> {
        match found {
            Some(mut bookmark) => {
                bookmark.tags = self.tags_for(bookmark.id)?;
                Ok(Some(bookmark))
            }
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

/// Upsert each tag by name and link it to the bookmark. Returns the tag ids
/// in the same order as `tags`.
fn attach_tags(
    conn: &Connection,
    bookmark_id: i64,
    tags: &[Tag],
) -> Result<Vec<i64>> {
    let mut ids = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag_id: i64 = conn.query_row(
            "INSERT INTO tags (name) VALUES (?1) \
             ON CONFLICT(name) DO UPDATE SET name = excluded.name \
             RETURNING id",
            params![tag.name],
            |row| row.get(0),
        )?;
        conn.execute(
            "INSERT OR IGNORE INTO bookmark_tags (bookmark_id, tag_id) \
             VALUES (?1, ?2)",
            params![bookmark_id, tag_id],
        )?;
        ids.push(tag_id);
    }
    Ok(ids)
}

fn assign_tag_ids(tags: &mut [Tag], ids: &[i64]) {
    for (tag, id) in tags.iter_mut().zip(ids) {
        tag.id = *id;
    }
}

fn row_to_bookmark(row: &Row) -> rusqlite::Result<Bookmark> {
    Ok(Bookmark {
        id: row.get(0)?,
        url: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        content: row.get(4)?,
        summary: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
        tags: Vec::new(),
    })
}

fn row_to_tag(row: &Row) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

fn to_sql_int(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn bookmark(url: &str, tags: &[&str]) -> Bookmark {
        let mut b = Bookmark::new(url, url);
        for t in tags {
            b.add_tag(t);
        }
        b
    }

    /// Bookmarks created one minute apart, oldest first.
    fn seed(store: &Store, entries: &[(&str, &[&str])]) -> Vec<Bookmark> {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        entries
            .iter()
            .enumerate()
            .map(|(i, (url, tags))| {
                let mut b = bookmark(url, tags);
                b.created_at = base + Duration::minutes(i as i64);
                b.updated_at = b.created_at;
                store.create(&mut b).unwrap();
                b
            })
            .collect()
    }

    fn names(b: &Bookmark) -> Vec<String> {
        let mut names = b.tag_names();
        names.sort();
        names
    }

    #[test]
    fn create_assigns_ids() {
        let store = Store::open_in_memory().unwrap();
        let mut b = bookmark("https://a.example", &["go", "tui"]);
        store.create(&mut b).unwrap();

        assert!(b.id > 0);
        assert!(b.tags.iter().all(|t| t.id > 0));
    }

    #[test]
    fn tags_round_trip_regardless_of_order() {
        let store = Store::open_in_memory().unwrap();
        let mut b = bookmark("https://a.example", &["tui", "go"]);
        store.create(&mut b).unwrap();

        let loaded = store.get_by_id(b.id).unwrap().unwrap();
        assert_eq!(names(&loaded), vec!["go", "tui"]);
        assert_eq!(loaded.url, "https://a.example");
        assert_eq!(loaded.created_at, b.created_at);
    }

    #[test]
    fn existing_tag_rows_are_reused() {
        let store = Store::open_in_memory().unwrap();
        let mut a = bookmark("https://a.example", &["rust"]);
        let mut b = bookmark("https://b.example", &["rust"]);
        store.create(&mut a).unwrap();
        store.create(&mut b).unwrap();

        assert_eq!(a.tags[0].id, b.tags[0].id);
        assert_eq!(store.all_tags().unwrap().len(), 1);
    }

    #[test]
    fn tag_names_are_case_sensitive() {
        let store = Store::open_in_memory().unwrap();
        seed(&store, &[("https://a.example", &["Rust", "rust"])]);

        let tags: Vec<_> =
            store.all_tags().unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(tags, vec!["Rust", "rust"]);
    }

    #[test]
    fn lookups_return_none_when_absent() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.get_by_id(42).unwrap().is_none());
        assert!(store.get_by_url("https://nope.example").unwrap().is_none());
    }

    #[test]
    fn get_by_url_populates_tags() {
        let store = Store::open_in_memory().unwrap();
        seed(&store, &[("https://a.example", &["x"])]);

        let b = store.get_by_url("https://a.example").unwrap().unwrap();
        assert_eq!(b.tag_names(), vec!["x"]);
    }

    #[test]
    fn duplicate_url_fails_without_partial_write() {
        let store = Store::open_in_memory().unwrap();
        seed(&store, &[("https://a.example", &[])]);

        let mut dup = bookmark("https://a.example", &["fresh"]);
        let err = store.create(&mut dup).unwrap_err();

        assert!(matches!(err, Error::Persistence(_)));
        assert_eq!(dup.id, 0);
        assert_eq!(store.count().unwrap(), 1);
        assert!(store.all_tags().unwrap().is_empty());
    }

    #[test]
    fn failed_create_rolls_back_tag_rows() {
        let store = Store::open_in_memory().unwrap();
        store
            .conn
            .execute_batch(
                "CREATE TRIGGER reject_boom BEFORE INSERT ON bookmark_tags \
                 WHEN (SELECT name FROM tags WHERE id = NEW.tag_id) = 'boom' \
                 BEGIN SELECT RAISE(ABORT, 'boom'); END;",
            )
            .unwrap();

        let mut b = bookmark("https://a.example", &["ok", "boom"]);
        assert!(store.create(&mut b).is_err());

        assert!(store.get_by_url("https://a.example").unwrap().is_none());
        assert!(store.all_tags().unwrap().is_empty());
        assert!(b.tags.iter().all(|t| t.id == 0));
    }

    #[test]
    fn list_orders_newest_first() {
        let store = Store::open_in_memory().unwrap();
        seed(
            &store,
            &[
                ("https://1.example", &[]),
                ("https://2.example", &[]),
                ("https://3.example", &[]),
            ],
        );

        let urls: Vec<_> = store
            .list(None, 10, 0)
            .unwrap()
            .into_iter()
            .map(|b| b.url)
            .collect();
        assert_eq!(
            urls,
            vec!["https://3.example", "https://2.example", "https://1.example"]
        );
    }

    #[test]
    fn list_paginates_before_attaching_tags() {
        let store = Store::open_in_memory().unwrap();
        seed(
            &store,
            &[
                ("https://1.example", &["a"]),
                ("https://2.example", &["a", "b"]),
                ("https://3.example", &["a"]),
            ],
        );

        let page = store.list(None, 1, 1).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].url, "https://2.example");
        assert_eq!(names(&page[0]), vec!["a", "b"]);

        let tagged = store.list(Some("a"), 2, 1).unwrap();
        let urls: Vec<_> = tagged.iter().map(|b| b.url.as_str()).collect();
        assert_eq!(urls, vec!["https://2.example", "https://1.example"]);
    }

    #[test]
    fn list_filters_by_exact_tag() {
        let store = Store::open_in_memory().unwrap();
        seed(
            &store,
            &[("https://u1.example", &["a"]), ("https://u2.example", &["b"])],
        );

        let filtered = store.list(Some("a"), 10, 0).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].url, "https://u1.example");

        assert!(store.list(Some("A"), 10, 0).unwrap().is_empty());
        assert_eq!(store.list(Some(""), 10, 0).unwrap().len(), 2);
    }

    #[test]
    fn update_replaces_tag_set_and_fields() {
        let store = Store::open_in_memory().unwrap();
        let mut b = seed(&store, &[("https://a.example", &["old", "keep"])])
            .remove(0);
        let before = b.updated_at;

        b.title = "New title".to_string();
        b.remove_tag("old");
        b.add_tag("new");
        store.update(&mut b).unwrap();

        let loaded = store.get_by_id(b.id).unwrap().unwrap();
        assert_eq!(loaded.title, "New title");
        assert_eq!(names(&loaded), vec!["keep", "new"]);
        assert!(loaded.updated_at > before);
        assert_eq!(loaded.created_at, before);
        assert_eq!(loaded.updated_at, b.updated_at);

        // The detached tag row survives.
        assert_eq!(store.all_tags().unwrap().len(), 3);
    }

    #[test]
    fn update_unknown_id_is_not_found() {
        let store = Store::open_in_memory().unwrap();
        let mut ghost = bookmark("https://ghost.example", &["x"]);
        ghost.id = 99;

        let err = store.update(&mut ghost).unwrap_err();
        assert!(matches!(err, Error::NotFound { kind: "bookmark", .. }));
        assert!(store.all_tags().unwrap().is_empty());
    }

    #[test]
    fn delete_cascades_associations_only() {
        let store = Store::open_in_memory().unwrap();
        let seeded = seed(
            &store,
            &[
                ("https://a.example", &["shared", "solo"]),
                ("https://b.example", &["shared"]),
            ],
        );

        assert!(store.delete(seeded[0].id).unwrap());
        assert!(store.get_by_id(seeded[0].id).unwrap().is_none());
        assert!(!store.delete(seeded[0].id).unwrap());

        let tags: Vec<_> =
            store.all_tags().unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(tags, vec!["shared", "solo"]);

        let assoc: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM bookmark_tags", [], |r| r.get(0))
            .unwrap();
        assert_eq!(assoc, 1);
    }

    #[test]
    fn reopen_preserves_data() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("bookmarks.db");

        {
            let store = Store::open(&path).unwrap();
            seed(&store, &[("https://a.example", &["kept"])]);
        }

        {
            let store = Store::open(&path).unwrap();
            let b = store.get_by_url("https://a.example").unwrap().unwrap();
            assert_eq!(b.tag_names(), vec!["kept"]);
        }
    }
}
