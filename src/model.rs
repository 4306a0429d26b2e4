use chrono::{DateTime, Utc};
use serde::Serialize;

/// A named label shared across bookmarks.
///
/// `id` is 0 until the tag has been written to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
        }
    }
}

/// A saved URL with the text derived from its page and a set of tags.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bookmark {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub summary: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub tags: Vec<Tag>,
}

impl Bookmark {
    /// A not-yet-persisted bookmark with both timestamps set to now.
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            url: url.into(),
            title: title.into(),
            description: String::new(),
            content: String::new(),
            summary: String::new(),
            created_at: now,
            updated_at: now,
            tags: Vec::new(),
        }
    }

    /// Attach a tag by name. Returns `false` when a tag with the same name is
    /// already present.
    pub fn add_tag(&mut self, name: &str) -> bool {
        if self.has_tag(name) {
            return false;
        }
        self.tags.push(Tag::new(name));
        true
    }

    /// Detach a tag by name. Returns `false` when no such tag was attached.
    pub fn remove_tag(&mut self, name: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| t.name != name);
        self.tags.len() != before
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.iter().any(|t| t.name == name)
    }

    pub fn tag_names(&self) -> Vec<String> {
        self.tags.iter().map(|t| t.name.clone()).collect()
    }
}
