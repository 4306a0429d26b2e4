//! bookmarker - save, tag and search web bookmarks from the terminal.
//!
//! Saving a URL fetches the page and derives a title, description, readable
//! text and a short summary from it. Bookmarks live in SQLite together with
//! their tags; a [Tantivy](https://github.com/quickwit-oss/tantivy) index
//! derived from the database serves ranked full-text queries, and titles can
//! also be matched fuzzily.
//!
//! # Quick start
//!
//! ```no_run
//! use bookmarker::{
//!     BookmarkService, DataDir, HtmlExtractor, SearchIndex, SearchService,
//!     Store,
//! };
//!
//! let data_dir = DataDir::resolve(None).unwrap();
//! let store = Store::open(&data_dir.bookmarks_db()).unwrap();
//! let index = SearchIndex::open(&data_dir.index_dir().unwrap()).unwrap();
//!
//! let bookmarks = BookmarkService::new(&store, HtmlExtractor::new().unwrap());
//! let search = SearchService::new(&store, index);
//!
//! let saved = bookmarks
//!     .add("https://www.rust-lang.org", &["rust", "lang"])
//!     .unwrap();
//! search.index_bookmark(&saved).unwrap();
//!
//! for r in search.search("rust", 10).unwrap() {
//!     println!("{} {} (score: {:.3})", r.rank, r.bookmark.url, r.score);
//! }
//! ```

pub mod app;
pub mod bookmarks;
pub mod cli;
pub mod data_dir;
pub mod error;
pub mod extractor;
pub mod fuzzy;
pub mod model;
pub mod opener;
pub mod search;
pub mod search_index;
pub mod store;

pub use bookmarks::BookmarkService;
pub use data_dir::DataDir;
pub use error::{Error, Result};
pub use extractor::{ContentExtractor, HtmlExtractor};
pub use model::{Bookmark, Tag};
pub use search::SearchService;
pub use search_index::SearchIndex;
pub use store::Store;
