use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use crate::app::{Action, TagOp};

#[derive(Debug, Parser)]
#[command(
    name = "bookmarker",
    about = "Save, tag and search web bookmarks from the terminal"
)]
pub struct Cli {
    /// Override the XDG data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// One line typed into the interactive shell.
#[derive(Debug, Parser)]
#[command(name = "bookmarker", no_binary_name = true)]
pub struct ShellLine {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Save a URL, fetching its title and text
    Add(AddArgs),
    /// List saved bookmarks, newest first
    List(ListArgs),
    /// Show one bookmark in full
    View(ViewArgs),
    /// Change a bookmark's title or description
    Edit(EditArgs),
    /// Delete a bookmark
    Delete(DeleteArgs),
    /// Open a bookmark in the default browser
    Open(OpenArgs),
    /// Attach or detach a tag
    Tag {
        #[command(subcommand)]
        action: TagAction,
    },
    /// List every tag
    Tags(JsonArgs),
    /// Full-text search over titles, text and tags
    Search(SearchArgs),
    /// Fuzzy search over titles
    Find(SearchArgs),
    /// Rebuild the search index from the database
    Rebuild,
    /// Show data location and counts
    Status(JsonArgs),
    /// Read commands interactively, one per line
    Shell,
    /// Generate shell completions
    #[command(hide = true)]
    Completions(CompletionsArgs),
}

impl Command {
    /// The action this command runs, or `None` for commands handled outside
    /// the action loop (`shell`, `completions`).
    pub fn into_action(self) -> Option<Action> {
        let action = match self {
            Command::Add(args) => Action::Add {
                url: args.url,
                tags: args.tags,
            },
            Command::List(args) => Action::List {
                tag: args.tag,
                limit: args.count,
                offset: args.offset,
                json: args.json,
            },
            Command::View(args) => Action::View {
                id: args.id,
                json: args.json,
            },
            Command::Edit(args) => Action::Edit {
                id: args.id,
                title: args.title,
                description: args.description,
            },
            Command::Delete(args) => Action::Delete { id: args.id },
            Command::Open(args) => Action::Open { id: args.id },
            Command::Tag { action } => match action {
                TagAction::Add { id, name } => Action::Tag {
                    id,
                    op: TagOp::Add,
                    name,
                },
                TagAction::Remove { id, name } => Action::Tag {
                    id,
                    op: TagOp::Remove,
                    name,
                },
            },
            Command::Tags(args) => Action::Tags { json: args.json },
            Command::Search(args) => Action::Search {
                query: args.query.join(" "),
                limit: args.count,
                json: args.json,
            },
            Command::Find(args) => Action::Find {
                query: args.query.join(" "),
                limit: args.count,
                json: args.json,
            },
            Command::Rebuild => Action::Rebuild,
            Command::Status(args) => Action::Status { json: args.json },
            Command::Shell | Command::Completions(_) => return None,
        };
        Some(action)
    }
}

// -- Tag subcommands --

#[derive(Debug, Subcommand)]
pub enum TagAction {
    /// Attach a tag to a bookmark
    Add {
        /// Bookmark id
        id: i64,
        /// Tag name (case-sensitive)
        name: String,
    },
    /// Detach a tag from a bookmark
    Remove {
        /// Bookmark id
        id: i64,
        /// Tag name (case-sensitive)
        name: String,
    },
}

// -- Add --

#[derive(Debug, Parser)]
pub struct AddArgs {
    /// Absolute URL to save
    pub url: String,

    /// Tag to attach (repeatable)
    #[arg(short, long = "tag")]
    pub tags: Vec<String>,
}

// -- List --

#[derive(Debug, Parser)]
pub struct ListArgs {
    /// Only bookmarks carrying this exact tag
    #[arg(short, long)]
    pub tag: Option<String>,

    /// Number of bookmarks to show
    #[arg(short = 'n', long, default_value = "20")]
    pub count: usize,

    /// Number of bookmarks to skip
    #[arg(long, default_value = "0")]
    pub offset: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- View / Delete / Open --

#[derive(Debug, Parser)]
pub struct ViewArgs {
    /// Bookmark id
    pub id: i64,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct DeleteArgs {
    /// Bookmark id
    pub id: i64,
}

#[derive(Debug, Parser)]
pub struct OpenArgs {
    /// Bookmark id
    pub id: i64,
}

// -- Edit --

#[derive(Debug, Parser)]
pub struct EditArgs {
    /// Bookmark id
    pub id: i64,

    /// New title
    #[arg(long)]
    pub title: Option<String>,

    /// New description
    #[arg(long)]
    pub description: Option<String>,
}

// -- Search / Find --

#[derive(Debug, Parser)]
pub struct SearchArgs {
    /// The search query
    #[arg(required = true)]
    pub query: Vec<String>,

    /// Number of results to return
    #[arg(short = 'n', long, default_value = "20")]
    pub count: usize,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct JsonArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Completions --

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsArgs {
    /// Generate shell completions and print to stdout.
    pub fn generate(&self) {
        let mut cmd = Cli::command();
        clap_complete::generate(
            self.shell,
            &mut cmd,
            "bookmarker",
            &mut std::io::stdout(),
        );
    }
}
