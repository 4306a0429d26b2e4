use bookmarker::{
    BookmarkService,
    DataDir,
    HtmlExtractor,
    SearchIndex,
    SearchService,
    Store,
    app::{App, AppState},
    cli::{Cli, Command},
    error,
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("BOOKMARKER_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> error::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let action = match cli.command {
        Command::Completions(args) => {
            args.generate();
            return Ok(());
        }
        command => command.into_action(),
    };

    let data_dir = DataDir::resolve(cli.data_dir.as_deref())?;
    let store = Store::open(&data_dir.bookmarks_db())?;
    let index = SearchIndex::open(&data_dir.index_dir()?)?;
    let bookmarks = BookmarkService::new(&store, HtmlExtractor::new()?);
    let search = SearchService::new(&store, index);

    let mut app = App::new(bookmarks, search).with_data_dir(data_dir);
    let mut state = AppState::default();
    let mut out = std::io::stdout().lock();

    match action {
        Some(action) => {
            app.push(action);
            app.process(&mut state, &mut out)
        }
        None => app.shell(&mut state, std::io::stdin().lock(), &mut out),
    }
}
