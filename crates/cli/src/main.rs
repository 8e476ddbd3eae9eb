//! cinescope CLI: movie search with trending searches, from the terminal.
//!
//! Every command builds the same session the HTTP API uses, so searches made
//! here are counted exactly like searches made from a browser.

mod render;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{CommandFactory, Parser, Subcommand};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use cinescope_core::session::SessionOptions;
use cinescope_core::{open_store, CatalogClient, Config, Session, Settings, StoreBackend};

/// How long interactive mode waits for the last query's results after EOF.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(30);

/// cinescope: find movies, see what everyone else is searching for.
#[derive(Parser)]
#[command(name = "cine", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON instead of human-readable text
    #[arg(long, global = true)]
    json: bool,

    /// Config file (default: ./.cinescope.toml, then ~/.cinescope/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the search debounce delay in milliseconds
    #[arg(long, global = true)]
    debounce_ms: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the catalog and count the search
    Search {
        /// Search query
        query: String,

        /// Maximum number of results to print
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// List popular movies
    Popular {
        /// Maximum number of results to print
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Show the most searched terms
    Trending {
        /// Number of entries (default from config)
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Type queries line by line; results update after the debounce delay
    Interactive {
        /// Maximum number of results per frame
        #[arg(long, default_value = "10")]
        limit: usize,
    },
    /// Serve the JSON API for a browser front end
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "8470")]
        port: u16,

        /// Bind to 0.0.0.0 instead of 127.0.0.1 (localhost)
        #[arg(long)]
        bind_all: bool,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// ---------------------------------------------------------------------------
// Setup helpers
// ---------------------------------------------------------------------------

fn init_tracing(default_level: &str) {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    for target in ["cinescope", "cine"] {
        if let Ok(directive) = format!("{target}={default_level}").parse() {
            filter = filter.add_directive(directive);
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Config {
    let mut settings = Settings::load(cli.config.as_deref()).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });
    if let Some(ms) = cli.debounce_ms {
        settings.debounce_ms = Some(ms);
    }
    if let Commands::Trending { limit: Some(limit) } = cli.command {
        settings.trending_limit = Some(limit);
    }
    settings.resolve().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    })
}

fn build_session(config: &Config) -> Arc<Session<StoreBackend>> {
    let http = reqwest::Client::new();
    let catalog = CatalogClient::new(http.clone(), &config.catalog);
    let store = Arc::new(open_store(config, http));
    Session::spawn(catalog, store, SessionOptions::from(config))
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => {
            eprintln!("Error: could not encode output: {e}");
            std::process::exit(1);
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received SIGINT, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(_) => {
                let _ = ctrl_c.await;
                info!("Received SIGINT, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
        info!("Received Ctrl+C, shutting down...");
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

async fn run_fetch(session: &Session<StoreBackend>, query: &str, limit: usize, json: bool) {
    session.fetch_movies(query).await;
    let state = session.state();

    if let Some(error) = &state.error {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }

    if json {
        let shown: Vec<_> = state.movies.iter().take(limit).collect();
        print_json(&shown);
    } else {
        if state.movies.is_empty() {
            eprintln!("No results for '{query}'");
            std::process::exit(1);
        }
        print!("{}", render::movie_table(&state.movies, limit));
        eprintln!("\n{} results (showing {})", state.movies.len(), state.movies.len().min(limit));
        if let Some(outcome) = &state.last_upsert {
            eprintln!("{}", render::upsert_line(outcome));
        }
    }
}

async fn run_trending(session: &Session<StoreBackend>, json: bool) {
    session.refresh_trending().await;
    let trending = session.state().trending;
    if json {
        print_json(&trending);
    } else if trending.is_empty() {
        eprintln!("No searches recorded yet ({} store)", session.store().name());
    } else {
        print!("{}", render::trending_table(&trending));
    }
}

async fn run_interactive(session: Arc<Session<StoreBackend>>, limit: usize, json: bool) {
    let mut updates = session.subscribe();
    let renderer = tokio::spawn(async move {
        let mut last_frame = String::new();
        while updates.changed().await.is_ok() {
            let state = updates.borrow_and_update().clone();
            if json {
                if let Ok(line) = serde_json::to_string(&state) {
                    println!("{line}");
                }
                continue;
            }
            let frame = render::frame(&state, limit);
            if frame != last_frame {
                println!("{frame}");
                last_frame = frame;
            }
        }
    });

    session.start().await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last = None;
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                session.set_query(line.clone());
                last = Some(line);
            }
            Ok(None) => break,
            Err(e) => {
                eprintln!("Error reading input: {e}");
                break;
            }
        }
    }

    // Let the final query settle before exiting.
    if let Some(last) = last {
        let mut rx = session.subscribe();
        let settled = rx.wait_for(|s| s.stabilized_query.as_deref() == Some(last.as_str()) && !s.loading);
        let budget = session.debounce() + SETTLE_TIMEOUT;
        if tokio::time::timeout(budget, settled).await.is_err() {
            eprintln!("Gave up waiting for results for '{last}'");
        }
    }

    drop(session);
    renderer.abort();
}

async fn run_serve(session: Arc<Session<StoreBackend>>, port: u16, bind_all: bool) {
    session.start_in_background();

    let host = if bind_all { [0, 0, 0, 0] } else { [127, 0, 0, 1] };
    let addr = SocketAddr::from((host, port));
    if let Err(e) = cinescope_http::serve(session, addr, shutdown_signal()).await {
        eprintln!("Error: server failed on {addr}: {e}");
        std::process::exit(1);
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = &cli.command {
        clap_complete::generate(*shell, &mut Cli::command(), "cine", &mut std::io::stdout());
        return;
    }

    let long_running = matches!(cli.command, Commands::Interactive { .. } | Commands::Serve { .. });
    init_tracing(if long_running { "info" } else { "warn" });

    let config = load_config(&cli);
    let session = build_session(&config);

    match cli.command {
        Commands::Search { query, limit } => {
            if query.is_empty() {
                eprintln!("Error: query must not be empty (use `cine popular`)");
                std::process::exit(2);
            }
            run_fetch(&session, &query, limit, cli.json).await;
        }
        Commands::Popular { limit } => run_fetch(&session, "", limit, cli.json).await,
        Commands::Trending { .. } => run_trending(&session, cli.json).await,
        Commands::Interactive { limit } => run_interactive(session, limit, cli.json).await,
        Commands::Serve { port, bind_all } => run_serve(session, port, bind_all).await,
        Commands::Completions { .. } => {}
    }
}
