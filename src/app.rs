//! The command loop shared by one-shot CLI invocations and the interactive
//! shell.
//!
//! Every user request becomes an [`Action`]. Actions are queued on the
//! [`App`] and processed in order by [`App::process`], which renders results
//! and records what was shown in an [`AppState`] owned by the caller.

use std::{
    collections::VecDeque,
    io::{BufRead, Write},
};

use clap::{CommandFactory, Parser};

use crate::{
    bookmarks::BookmarkService,
    cli::ShellLine,
    data_dir::DataDir,
    error::{Error, Result},
    extractor::ContentExtractor,
    model::{Bookmark, Tag},
    opener::{SystemOpener, UrlOpener},
    search::{SearchResult, SearchService},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagOp {
    Add,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    List {
        tag: Option<String>,
        limit: usize,
        offset: usize,
        json: bool,
    },
    Search {
        query: String,
        limit: usize,
        json: bool,
    },
    Find {
        query: String,
        limit: usize,
        json: bool,
    },
    Add {
        url: String,
        tags: Vec<String>,
    },
    View {
        id: i64,
        json: bool,
    },
    Edit {
        id: i64,
        title: Option<String>,
        description: Option<String>,
    },
    Delete {
        id: i64,
    },
    Open {
        id: i64,
    },
    Tag {
        id: i64,
        op: TagOp,
        name: String,
    },
    Tags {
        json: bool,
    },
    Rebuild,
    Status {
        json: bool,
    },
    Help,
    Quit,
}

impl Action {
    /// Parse one line of shell input. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Action>> {
        let words = split_words(line)?;
        let Some(first) = words.first() else {
            return Ok(None);
        };

        match first.as_str() {
            "quit" | "exit" => return Ok(Some(Action::Quit)),
            "help" | "?" if words.len() == 1 => return Ok(Some(Action::Help)),
            _ => {}
        }

        let parsed = ShellLine::try_parse_from(&words)
            .map_err(|e| Error::Usage(e.to_string().trim_end().to_string()))?;
        parsed.command.into_action().map(Some).ok_or_else(|| {
            Error::Usage(format!("'{first}' is not available in the shell"))
        })
    }
}

/// Split a line into words on whitespace. Single or double quotes group
/// words; there are no escapes.
fn split_words(line: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_word = true;
            }
            None if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            None => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if quote.is_some() {
        return Err(Error::Usage("unterminated quote".to_string()));
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

/// What the user is looking at between actions.
#[derive(Debug)]
pub struct AppState {
    /// Bookmarks shown by the last listing, search or find.
    pub bookmarks: Vec<Bookmark>,
    /// Outcome of the last action.
    pub status: String,
    /// Cleared by [`Action::Quit`].
    pub running: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            bookmarks: Vec::new(),
            status: String::new(),
            running: true,
        }
    }
}

pub struct App<'a, E> {
    bookmarks: BookmarkService<'a, E>,
    search: SearchService<'a>,
    data_dir: Option<DataDir>,
    opener: Box<dyn UrlOpener + 'a>,
    queue: VecDeque<Action>,
}

impl<'a, E: ContentExtractor> App<'a, E> {
    pub fn new(
        bookmarks: BookmarkService<'a, E>,
        search: SearchService<'a>,
    ) -> Self {
        Self {
            bookmarks,
            search,
            data_dir: None,
            opener: Box::new(SystemOpener),
            queue: VecDeque::new(),
        }
    }

    /// Replace the handler used by [`Action::Open`].
    pub fn with_opener(mut self, opener: impl UrlOpener + 'a) -> Self {
        self.opener = Box::new(opener);
        self
    }

    /// Directory reported by [`Action::Status`].
    pub fn with_data_dir(mut self, dir: DataDir) -> Self {
        self.data_dir = Some(dir);
        self
    }

    pub fn push(&mut self, action: Action) {
        self.queue.push_back(action);
    }

    /// Run queued actions in order.
    ///
    /// Stops at the first failing action and drops whatever was queued after
    /// it. [`Action::Quit`] also drops the rest of the queue.
    pub fn process<W: Write>(
        &mut self,
        state: &mut AppState,
        out: &mut W,
    ) -> Result<()> {
        while let Some(action) = self.queue.pop_front() {
            if let Err(e) = self.dispatch(action, state, out) {
                self.queue.clear();
                return Err(e);
            }
            if !state.running {
                self.queue.clear();
                break;
            }
        }
        Ok(())
    }

    /// Read actions from `input` one line at a time until end of input or
    /// `quit`. Failures are printed and the loop goes on.
    pub fn shell<R: BufRead, W: Write>(
        &mut self,
        state: &mut AppState,
        input: R,
        out: &mut W,
    ) -> Result<()> {
        writeln!(out, "Type 'help' for commands, 'quit' to leave.")?;
        let mut lines = input.lines();

        while state.running {
            write!(out, "> ")?;
            out.flush()?;

            let Some(line) = lines.next() else {
                writeln!(out)?;
                break;
            };
            match Action::parse(&line?) {
                Ok(Some(action)) => self.push(action),
                Ok(None) => continue,
                Err(e) => {
                    writeln!(out, "{e}")?;
                    continue;
                }
            }

            if let Err(e) = self.process(state, out) {
                state.status = e.to_string();
                writeln!(out, "error: {e}")?;
            }
        }
        Ok(())
    }

    fn dispatch<W: Write>(
        &mut self,
        action: Action,
        state: &mut AppState,
        out: &mut W,
    ) -> Result<()> {
        match action {
            Action::List {
                tag,
                limit,
                offset,
                json,
            } => {
                let bookmarks =
                    self.bookmarks.list(tag.as_deref(), limit, offset)?;
                write_bookmarks(out, &bookmarks, json)?;
                state.status = format!("{} bookmark(s)", bookmarks.len());
                state.bookmarks = bookmarks;
            }
            Action::Search { query, limit, json } => {
                let results = self.search.search(&query, limit)?;
                write_results(out, &results, json)?;
                state.status =
                    format!("{} result(s) for '{query}'", results.len());
                state.bookmarks =
                    results.into_iter().map(|r| r.bookmark).collect();
            }
            Action::Find { query, limit, json } => {
                let bookmarks = self.bookmarks.find_by_title(&query, limit)?;
                write_bookmarks(out, &bookmarks, json)?;
                state.status =
                    format!("{} match(es) for '{query}'", bookmarks.len());
                state.bookmarks = bookmarks;
            }
            Action::Add { url, tags } => {
                let tags: Vec<&str> = tags.iter().map(String::as_str).collect();
                let bookmark = self.bookmarks.add(&url, &tags)?;
                writeln!(
                    out,
                    "Saved #{} {}",
                    bookmark.id,
                    display_title(&bookmark)
                )?;
                state.status = format!("saved #{}", bookmark.id);
                self.reindex(&bookmark, state);
            }
            Action::View { id, json } => {
                let bookmark = self.bookmarks.get(id)?;
                if json {
                    write_json(out, &bookmark)?;
                } else {
                    write_bookmark_detail(out, &bookmark)?;
                }
                state.status = format!("viewing #{id}");
            }
            Action::Edit {
                id,
                title,
                description,
            } => {
                if title.is_none() && description.is_none() {
                    writeln!(out, "Nothing to change for #{id}")?;
                    return Ok(());
                }
                let mut bookmark = self.bookmarks.get(id)?;
                if let Some(title) = title {
                    bookmark.title = title;
                }
                if let Some(description) = description {
                    bookmark.description = description;
                }
                self.bookmarks.update(&mut bookmark)?;
                writeln!(out, "Updated #{id}")?;
                state.status = format!("updated #{id}");
                self.reindex(&bookmark, state);
            }
            Action::Delete { id } => {
                self.bookmarks.delete(id)?;
                writeln!(out, "Deleted #{id}")?;
                state.status = format!("deleted #{id}");
                state.bookmarks.retain(|b| b.id != id);
                if let Err(e) = self.search.delete_bookmark(id) {
                    tracing::warn!(
                        id,
                        error = %e,
                        "failed to remove bookmark from index"
                    );
                    state.status =
                        format!("deleted #{id}, index not updated: {e}");
                }
            }
            Action::Open { id } => {
                let bookmark = self.bookmarks.get(id)?;
                self.opener.open(&bookmark.url)?;
                writeln!(out, "Opening #{id} {}", bookmark.url)?;
                state.status = format!("opened #{id}");
            }
            Action::Tag { id, op, name } => {
                let bookmark = match op {
                    TagOp::Add => self.bookmarks.add_tag(id, &name)?,
                    TagOp::Remove => self.bookmarks.remove_tag(id, &name)?,
                };
                writeln!(
                    out,
                    "#{id} tags: {}",
                    bookmark.tag_names().join(", ")
                )?;
                state.status = format!("tagged #{id}");
                self.reindex(&bookmark, state);
            }
            Action::Tags { json } => {
                let tags = self.bookmarks.all_tags()?;
                write_tags(out, &tags, json)?;
                state.status = format!("{} tag(s)", tags.len());
            }
            Action::Rebuild => {
                let count = self.search.rebuild()?;
                writeln!(out, "Indexed {count} bookmark(s)")?;
                state.status = format!("indexed {count}");
            }
            Action::Status { json } => {
                let bookmarks = self.bookmarks.count()?;
                let documents = self.search.index().num_docs()?;
                let root = self.data_dir.as_ref().map_or_else(
                    || "(in memory)".to_string(),
                    |dir| dir.root().display().to_string(),
                );
                let source = self.data_dir.as_ref().map(DataDir::source);
                if json {
                    write_json(
                        out,
                        &serde_json::json!({
                            "data_dir": root,
                            "data_dir_source": source,
                            "bookmarks": bookmarks,
                            "indexed_documents": documents,
                        }),
                    )?;
                } else {
                    match source {
                        Some(source) => writeln!(
                            out,
                            "Data directory: {root} (from {source})"
                        )?,
                        None => writeln!(out, "Data directory: {root}")?,
                    }
                    writeln!(out, "Bookmarks: {bookmarks}")?;
                    writeln!(out, "Indexed documents: {documents}")?;
                }
            }
            Action::Help => {
                let mut cmd = ShellLine::command();
                writeln!(out, "{}", cmd.render_help())?;
                writeln!(out, "Type 'quit' or 'exit' to leave the shell.")?;
            }
            Action::Quit => state.running = false,
        }
        Ok(())
    }

    /// Push a stored bookmark into the index. The store write already
    /// happened, so a failure here is only reported.
    fn reindex(&self, bookmark: &Bookmark, state: &mut AppState) {
        if let Err(e) = self.search.index_bookmark(bookmark) {
            tracing::warn!(
                id = bookmark.id,
                error = %e,
                "failed to index bookmark"
            );
            state.status =
                format!("saved #{}, index not updated: {e}", bookmark.id);
        }
    }
}

impl<E> std::fmt::Debug for App<'_, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("data_dir", &self.data_dir)
            .field("queued", &self.queue.len())
            .finish_non_exhaustive()
    }
}

fn display_title(bookmark: &Bookmark) -> &str {
    if bookmark.title.is_empty() {
        &bookmark.url
    } else {
        &bookmark.title
    }
}

fn write_json<W: Write, T: serde::Serialize>(
    out: &mut W,
    value: &T,
) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

fn write_bookmarks<W: Write>(
    out: &mut W,
    bookmarks: &[Bookmark],
    json: bool,
) -> Result<()> {
    if json {
        return write_json(out, &bookmarks);
    }
    if bookmarks.is_empty() {
        writeln!(out, "No bookmarks.")?;
        return Ok(());
    }
    for bookmark in bookmarks {
        write_bookmark_line(out, &bookmark.id.to_string(), bookmark)?;
    }
    Ok(())
}

fn write_results<W: Write>(
    out: &mut W,
    results: &[SearchResult],
    json: bool,
) -> Result<()> {
    if json {
        return write_json(out, &results);
    }
    if results.is_empty() {
        writeln!(out, "No results.")?;
        return Ok(());
    }
    for result in results {
        let label = format!(
            "{}. [{:.3}] {}",
            result.rank, result.score, result.bookmark.id
        );
        write_bookmark_line(out, &label, &result.bookmark)?;
    }
    Ok(())
}

fn write_bookmark_line<W: Write>(
    out: &mut W,
    label: &str,
    bookmark: &Bookmark,
) -> Result<()> {
    writeln!(out, "{label:>5}  {}", display_title(bookmark))?;
    writeln!(out, "       {}", bookmark.url)?;
    if !bookmark.tags.is_empty() {
        writeln!(out, "       tags: {}", bookmark.tag_names().join(", "))?;
    }
    Ok(())
}

fn write_bookmark_detail<W: Write>(
    out: &mut W,
    bookmark: &Bookmark,
) -> Result<()> {
    const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    writeln!(out, "#{} {}", bookmark.id, display_title(bookmark))?;
    writeln!(out, "URL:         {}", bookmark.url)?;
    writeln!(out, "Tags:        {}", bookmark.tag_names().join(", "))?;
    writeln!(out, "Created:     {}", bookmark.created_at.format(TIME_FORMAT))?;
    writeln!(out, "Updated:     {}", bookmark.updated_at.format(TIME_FORMAT))?;
    if !bookmark.description.is_empty() {
        writeln!(out, "Description: {}", bookmark.description)?;
    }
    if !bookmark.summary.is_empty() {
        writeln!(out, "\n{}", bookmark.summary)?;
    }
    if !bookmark.content.is_empty() {
        writeln!(out, "\n{}", bookmark.content.trim_end())?;
    }
    Ok(())
}

fn write_tags<W: Write>(out: &mut W, tags: &[Tag], json: bool) -> Result<()> {
    if json {
        return write_json(out, &tags);
    }
    if tags.is_empty() {
        writeln!(out, "No tags.")?;
    }
    for tag in tags {
        writeln!(out, "{}", tag.name)?;
    }
    Ok(())
}
