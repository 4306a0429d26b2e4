use std::path::{Path, PathBuf};

use tantivy::{
    Index,
    IndexReader,
    IndexWriter,
    TantivyDocument,
    collector::TopDocs,
    doc,
    query::QueryParser,
    schema::*,
    tokenizer::{
        LowerCaser,
        RemoveLongFilter,
        SimpleTokenizer,
        Stemmer,
        TextAnalyzer,
    },
};

use crate::{error::Result, model::Bookmark};

/// Field names used in the schema.
pub mod fields {
    pub const ID: &str = "id";
    pub const URL: &str = "url";
    pub const TITLE: &str = "title";
    pub const DESCRIPTION: &str = "description";
    pub const CONTENT: &str = "content";
    pub const SUMMARY: &str = "summary";
    pub const TAGS: &str = "tags";
}

/// Manages a Tantivy full-text index of bookmark documents.
pub struct SearchIndex {
    index: Index,
    reader: IndexReader,
    fields: SchemaFields,
    location: Option<PathBuf>,
}

/// Resolved field handles for the schema.
#[derive(Debug, Clone, Copy)]
pub struct SchemaFields {
    pub id: Field,
    pub url: Field,
    pub title: Field,
    pub description: Field,
    pub content: Field,
    pub summary: Field,
    pub tags: Field,
}

impl SchemaFields {
    /// Fields searched by free-text queries.
    fn text_fields(&self) -> Vec<Field> {
        vec![
            self.url,
            self.title,
            self.description,
            self.content,
            self.summary,
            self.tags,
        ]
    }
}

/// The indexed projection of one bookmark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchDocument {
    pub id: String,
    pub url: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub summary: String,
    /// Tag names joined by spaces.
    pub tags: String,
}

impl From<&Bookmark> for SearchDocument {
    fn from(bookmark: &Bookmark) -> Self {
        Self {
            id: bookmark.id.to_string(),
            url: bookmark.url.clone(),
            title: bookmark.title.clone(),
            description: bookmark.description.clone(),
            content: bookmark.content.clone(),
            summary: bookmark.summary.clone(),
            tags: bookmark.tag_names().join(" "),
        }
    }
}

/// A ranked hit. `id` is the stored document id, unparsed.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub score: f32,
    pub id: String,
}

fn build_schema() -> (Schema, SchemaFields) {
    let mut builder = Schema::builder();

    let id = builder.add_text_field(fields::ID, STRING | STORED);

    let indexing = TextFieldIndexing::default()
        .set_tokenizer("en_stem")
        .set_index_option(IndexRecordOption::WithFreqsAndPositions);
    let stored_text = TextOptions::default()
        .set_indexing_options(indexing.clone())
        .set_stored();
    let text = TextOptions::default().set_indexing_options(indexing);

    let url = builder.add_text_field(fields::URL, stored_text.clone());
    let title = builder.add_text_field(fields::TITLE, stored_text.clone());
    let description = builder.add_text_field(fields::DESCRIPTION, text.clone());
    let content = builder.add_text_field(fields::CONTENT, text.clone());
    let summary = builder.add_text_field(fields::SUMMARY, text);
    let tags = builder.add_text_field(fields::TAGS, stored_text);

    let schema = builder.build();
    let fields = SchemaFields {
        id,
        url,
        title,
        description,
        content,
        summary,
        tags,
    };

    (schema, fields)
}

fn register_tokenizers(index: &Index) {
    let en_stem = TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(RemoveLongFilter::limit(40))
        .filter(LowerCaser)
        .filter(Stemmer::new(tantivy::tokenizer::Language::English))
        .build();
    index.tokenizers().register("en_stem", en_stem);
}

impl SearchIndex {
    /// Open or create a search index at the given directory.
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let (schema, fields) = build_schema();

        let mmap_dir = tantivy::directory::MmapDirectory::open(dir)
            .map_err(|e| tantivy::TantivyError::SystemError(e.to_string()))?;
        let index = if Index::exists(&mmap_dir)
            .map_err(|e| tantivy::TantivyError::SystemError(e.to_string()))?
        {
            Index::open(mmap_dir)?
        } else {
            tracing::info!(dir = %dir.display(), "creating search index");
            Index::create(mmap_dir, schema, tantivy::IndexSettings::default())?
        };

        register_tokenizers(&index);
        let reader = index.reader()?;

        Ok(Self {
            index,
            reader,
            fields,
            location: Some(dir.to_path_buf()),
        })
    }

    /// Create an in-memory search index (for testing).
    pub fn open_in_ram() -> Result<Self> {
        let (schema, fields) = build_schema();
        let index = Index::create_in_ram(schema);
        register_tokenizers(&index);
        let reader = index.reader()?;

        Ok(Self {
            index,
            reader,
            fields,
            location: None,
        })
    }

    /// Drop the open handles and open the index again from its directory.
    ///
    /// An in-memory index has nowhere to reopen from and is left as is.
    pub fn reopen(&mut self) -> Result<()> {
        if let Some(dir) = self.location.clone() {
            *self = Self::open(&dir)?;
        }
        Ok(())
    }

    /// Create a writer with the given memory budget (in bytes).
    pub fn writer(&self, memory_budget: usize) -> Result<IndexWriter> {
        Ok(self.index.writer(memory_budget)?)
    }

    /// Add a document via the given writer, replacing any document that has
    /// the same id.
    pub fn add_document(
        &self,
        writer: &IndexWriter,
        document: &SearchDocument,
    ) -> Result<()> {
        let f = self.fields;

        self.delete_document(writer, &document.id);

        writer.add_document(doc!(
            f.id => document.id.as_str(),
            f.url => document.url.as_str(),
            f.title => document.title.as_str(),
            f.description => document.description.as_str(),
            f.content => document.content.as_str(),
            f.summary => document.summary.as_str(),
            f.tags => document.tags.as_str(),
        ))?;

        Ok(())
    }

    pub fn delete_document(&self, writer: &IndexWriter, id: &str) {
        let term = tantivy::Term::from_field_text(self.fields.id, id);
        writer.delete_term(term);
    }

    /// Queue removal of every document, including ones added earlier in the
    /// same uncommitted batch.
    pub fn delete_all(&self, writer: &IndexWriter) -> Result<()> {
        writer.delete_all_documents()?;
        Ok(())
    }

    /// Search all text fields with BM25 scoring, returning the top `limit`
    /// hits. Syntax errors in the query are tolerated.
    pub fn search(
        &self,
        query_str: &str,
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let f = self.fields;
        self.reader.reload()?;
        let searcher = self.reader.searcher();

        let parser = QueryParser::for_index(&self.index, f.text_fields());
        let (query, errors) = parser.parse_query_lenient(query_str);
        if !errors.is_empty() {
            tracing::debug!(query = query_str, ?errors, "lenient query parse");
        }

        let top_docs = searcher.search(&query, &TopDocs::with_limit(limit))?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, doc_address) in top_docs {
            let doc: TantivyDocument = searcher.doc(doc_address)?;
            hits.push(SearchHit {
                score,
                id: extract_text(&doc, f.id),
            });
        }

        Ok(hits)
    }

    /// Number of live documents as of the last commit.
    pub fn num_docs(&self) -> Result<u64> {
        self.reader.reload()?;
        Ok(self.reader.searcher().num_docs())
    }
}

impl std::fmt::Debug for SearchIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchIndex")
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

fn extract_text(doc: &TantivyDocument, field: Field) -> String {
    doc.get_first(field)
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}
