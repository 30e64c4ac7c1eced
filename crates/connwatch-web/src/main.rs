use std::sync::Arc;

use connwatch_engine::prefs::QUICK_FILTER_KEY;
use connwatch_engine::{MemoryPreferences, PreferenceStore};
use connwatch_web::app::{AppState, build_router};
use connwatch_web::config::{ConfigOverrides, WebConfig};
use connwatch_web::pipeline::spawn_pipeline;
use connwatch_web::tcp::run_tcp_acceptor;
use facet::Facet;
use figue as args;
use tokio::net::TcpListener;
use tracing::{error, info};

#[derive(Facet, Debug)]
struct Cli {
    #[facet(flatten)]
    builtins: args::FigueBuiltins,
    /// Snapshot ingest address (overrides CONNWATCH_LISTEN).
    #[facet(args::named, default)]
    listen: Option<String>,
    /// HTTP API address (overrides CONNWATCH_HTTP).
    #[facet(args::named, default)]
    http: Option<String>,
    /// Closed connections kept in the closed view and the ledger window.
    #[facet(args::named, default)]
    max_closed_rows: Option<u32>,
    /// Active rows shown before any "load more" request.
    #[facet(args::named, default)]
    visible_rows: Option<u32>,
    /// Rows added per "load more" request.
    #[facet(args::named, default)]
    load_more_step: Option<u32>,
    /// Keep the first-seen record of a reappearing connection instead of the latest.
    #[facet(args::named, default)]
    keep_first: bool,
}

fn main() {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
        .block_on(async {
            if let Err(err) = run().await {
                eprintln!("{err}");
                std::process::exit(1);
            }
        });
}

async fn run() -> Result<(), String> {
    let cli = parse_cli()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = WebConfig::from_env(&ConfigOverrides {
        listen: cli.listen,
        http: cli.http,
        max_closed_rows: cli.max_closed_rows,
        visible_rows: cli.visible_rows,
        load_more_step: cli.load_more_step,
        keep_first: cli.keep_first,
    })?;

    let prefs: Arc<dyn PreferenceStore> = Arc::new(MemoryPreferences::new());
    if let Some(filter) = &config.initial_filter {
        prefs.set(QUICK_FILTER_KEY, filter.clone());
    }
    let (pipeline, pipeline_task) = spawn_pipeline(config.engine, prefs.clone());
    let state = AppState::new(pipeline, prefs);

    let tcp_listener = TcpListener::bind(&config.tcp_addr)
        .await
        .map_err(|e| format!("failed to bind TCP on {}: {e}", config.tcp_addr))?;
    info!(tcp_addr = %config.tcp_addr, "connwatch TCP ingest listener ready");

    let http_listener = TcpListener::bind(&config.http_addr)
        .await
        .map_err(|e| format!("failed to bind HTTP on {}: {e}", config.http_addr))?;
    info!(
        http_addr = %config.http_addr,
        max_closed_rows = config.engine.max_closed_rows,
        visible_rows = config.engine.initial_rows,
        collision = ?config.engine.collision,
        "connwatch HTTP API ready"
    );
    print_startup_hints(&config.http_addr, &config.tcp_addr);

    let app = build_router(state.clone());
    tokio::select! {
        _ = run_tcp_acceptor(tcp_listener, state) => {}
        result = axum::serve(http_listener, app) => {
            if let Err(e) = result {
                error!(%e, "HTTP server error");
            }
        }
        _ = pipeline_task => {
            error!("pipeline task exited");
        }
    }
    Ok(())
}

fn parse_cli() -> Result<Cli, String> {
    let figue_config = args::builder::<Cli>()
        .map_err(|e| format!("failed to build CLI schema: {e}"))?
        .cli(|cli| cli.strict())
        .help(|h| {
            h.program_name("connwatch-web")
                .description("Connection snapshot diff + retention server")
                .version(option_env!("CARGO_PKG_VERSION").unwrap_or("dev"))
        })
        .build();
    let cli = args::Driver::new(figue_config)
        .run()
        .into_result()
        .map_err(|e| e.to_string())?;
    Ok(cli.value)
}

fn print_startup_hints(http_addr: &str, tcp_addr: &str) {
    println!();
    println!("  connwatch-web ready");
    println!();
    println!("  \x1b[32mViews: ws://{http_addr}/api/views/ws\x1b[0m");
    println!();
    println!("  Point a snapshot producer at:");
    println!("    \x1b[32m{tcp_addr}\x1b[0m");
    println!();
}
