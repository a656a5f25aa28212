use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use latin_paradigm::ParadigmStore;
use latin_scrape::source::DEFAULT_TIMEOUT;
use latin_scrape::{DEFAULT_BASE_URL, DEFAULT_MAX_WORKERS, Harvester, HttpLexicon};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

use verbtrainer::{AppState, router};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_STORE_PATH: &str = "data.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = load_config();
    info!("binding to {}:{}", config.host, config.port);
    info!("using store at {}", config.store_path.display());
    info!(
        "fetching from {} with {} workers",
        config.base_url, config.workers
    );
    if config.exclude_supina {
        info!("supine forms excluded from fetched paradigms");
    }

    let store = ParadigmStore::load(&config.store_path).into_shared();
    // The blocking client owns its own runtime and must be built off the async workers.
    let (base_url, timeout) = (config.base_url.clone(), config.timeout);
    let lexicon = tokio::task::spawn_blocking(move || HttpLexicon::new(&base_url, timeout))
        .await
        .context("lexicon client setup panicked")??;
    let harvester = Harvester::new(Arc::new(lexicon), Arc::clone(&store))
        .with_store_path(&config.store_path)
        .with_max_workers(config.workers);

    let state = AppState {
        store,
        harvester,
        store_path: config.store_path,
        exclude_supina: config.exclude_supina,
    };

    let app = router(state).layer(TraceLayer::new_for_http());
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("invalid listen address")?;
    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Debug, Clone)]
struct Config {
    host: String,
    port: u16,
    store_path: PathBuf,
    base_url: String,
    workers: usize,
    timeout: Duration,
    exclude_supina: bool,
}

fn load_config() -> Config {
    let mut exclude_supina = false;
    let mut cli_store: Option<PathBuf> = None;
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--exclude-supina" => exclude_supina = true,
            "--store" => {
                if let Some(path) = args.next() {
                    cli_store = Some(PathBuf::from(path));
                }
            }
            _ => {
                if let Some(path) = arg.strip_prefix("--store=") {
                    cli_store = Some(PathBuf::from(path));
                }
            }
        }
    }

    let host = env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);
    let store_path = cli_store
        .or_else(|| env::var("STORE_PATH").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH));
    let base_url = env::var("LEXICON_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
    let workers = env::var("FETCH_WORKERS")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_MAX_WORKERS);
    let timeout = env::var("FETCH_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|v| *v > 0)
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_TIMEOUT);

    Config {
        host,
        port,
        store_path,
        base_url,
        workers,
        timeout,
        exclude_supina,
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let max_level = env_filter
        .max_level_hint()
        .and_then(|hint| hint.into_level())
        .unwrap_or(Level::INFO);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_level(true)
        .with_max_level(max_level)
        .init();
}
