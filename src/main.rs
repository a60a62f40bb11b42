use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use aria::config::AppConfig;
use aria::engine::{Engine, LocalEngine};
use aria::library::{reindex, Album, Database};
use aria::search::SearchIndex;
use aria::session::Session;
use aria::ui::TerminalRenderer;

#[derive(Parser)]
#[command(name = "aria", version, about = "Terminal album player")]
#[command(args_conflicts_with_subcommands = true)]
struct Args {
    /// Fuzzy search terms picking the album to play
    query: Vec<String>,

    /// Database directory (default: ~/.aria)
    #[arg(long, global = true)]
    database_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Rebuild the database from a music directory
    Reindex {
        /// Root of the music collection
        dir: PathBuf,
    },
}

fn init_logging() -> Result<()> {
    let mut log_dir = dirs::cache_dir().unwrap_or_else(|| PathBuf::from("."));
    log_dir.push("aria");
    log_dir.push("logs");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "aria.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,aria=debug"));

    let subscriber = tracing_subscriber::fmt()
        .with_writer(file_writer)
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .with_env_filter(filter)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // keep the writer thread alive for the whole run
    std::mem::forget(guard);
    Ok(())
}

async fn play(query: &str, database_dir: PathBuf) -> Result<()> {
    let database = Database::load(&database_dir)?;
    let index = SearchIndex::load(&database_dir)
        .with_context(|| format!("no search index in {}", database_dir.display()))?;

    let matches = index.query(query);
    let album_ref = match matches.as_slice() {
        [] => bail!("nothing in the library matches \"{query}\""),
        [only] => *only,
        candidates => {
            println!("found several albums:");
            println!();
            for candidate in candidates {
                println!("- {candidate}");
            }
            println!();
            bail!("narrow the search down to one of them");
        }
    };
    info!("playing {album_ref}");
    let album = Album::new(database.album(album_ref)?.to_vec());
    if album.is_empty() {
        bail!("album \"{album_ref}\" has no tracks");
    }
    info!("output sample rate {} Hz", album.output_sample_rate());

    // prime the engine with the whole album before the session opens
    let engine = LocalEngine::spawn();
    for track in album.tracks() {
        engine.queue(&track.path)?;
    }
    engine.play()?;

    let renderer = TerminalRenderer::stdout();
    Session::new(engine, renderer, album, database_dir)
        .run()
        .await
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging()?;

    let database_dir = args
        .database_dir
        .unwrap_or_else(|| AppConfig::load().database_dir);

    match args.command {
        Some(Command::Reindex { dir }) => {
            let database = reindex::reindex(&dir, &database_dir)?;
            println!(
                "indexed {} tracks in {} albums",
                database.track_count(),
                database.album_count()
            );
            Ok(())
        }
        None => {
            if args.query.is_empty() {
                bail!("give me something to play, e.g. `aria mezzanine`");
            }
            play(&args.query.join(" "), database_dir).await
        }
    }
}
