use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use quran_lexicon_client::{
    BundleLimits, DEFAULT_MAX_ROWS, DEFAULT_PAGE_SIZE, HttpTransport, LexiconBundleClient,
};
use quran_morphology::{Resolver, ScoreWeights};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

use quran_word_inspector::{AppState, router};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_API_BASE: &str = "http://127.0.0.1:8788/api";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = load_config();
    info!("binding to {}:{}", config.host, config.port);
    info!("using lexicon api at {}", config.api_base);
    info!(
        "bundle pages of {} rows, capped at {}",
        config.limits.page_size, config.limits.max_rows
    );
    if config.disable_cache {
        info!("cache headers disabled");
    }

    let weights = match &config.score_weights_path {
        Some(path) => {
            info!("loading score weights from {}", path.display());
            ScoreWeights::from_file(path)
                .with_context(|| format!("reading score weights from {}", path.display()))?
        }
        None => ScoreWeights::default(),
    };

    let transport = HttpTransport::new(&config.api_base)?;
    let client = LexiconBundleClient::new(Arc::new(transport)).with_limits(config.limits);

    let state = AppState {
        resolver: Resolver::new(weights),
        client: Arc::new(client),
        disable_cache: config.disable_cache,
    };

    let app = router(state).layer(TraceLayer::new_for_http());
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("invalid listen address")?;
    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
struct Config {
    host: String,
    port: u16,
    api_base: String,
    score_weights_path: Option<PathBuf>,
    limits: BundleLimits,
    disable_cache: bool,
}

fn load_config() -> Config {
    parse_config(env::args().skip(1), |key| env::var(key).ok())
}

/// Environment first, then `--flag` / `--flag=value` overrides.
fn parse_config(
    args: impl IntoIterator<Item = String>,
    var: impl Fn(&str) -> Option<String>,
) -> Config {
    let mut disable_cache = false;
    let mut cli_api_base: Option<String> = None;
    let mut cli_weights: Option<PathBuf> = None;
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--no-cache" => disable_cache = true,
            "--api-base" => cli_api_base = args.next(),
            "--score-weights" => cli_weights = args.next().map(PathBuf::from),
            _ => {
                if let Some(base) = arg.strip_prefix("--api-base=") {
                    cli_api_base = Some(base.to_string());
                } else if let Some(path) = arg.strip_prefix("--score-weights=") {
                    cli_weights = Some(PathBuf::from(path));
                }
            }
        }
    }

    let host = var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = var("PORT")
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);
    let api_base = cli_api_base
        .or_else(|| var("LEXICON_API_BASE"))
        .filter(|base| !base.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
    let score_weights_path = cli_weights.or_else(|| var("SCORE_WEIGHTS_PATH").map(PathBuf::from));
    let page_size = var("BUNDLE_PAGE_SIZE")
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_PAGE_SIZE);
    let max_rows = var("BUNDLE_MAX_ROWS")
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_MAX_ROWS);

    Config {
        host,
        port,
        api_base,
        score_weights_path,
        limits: BundleLimits::new(page_size, max_rows),
        disable_cache,
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

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(args: &[&str], vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        parse_config(args.iter().map(|a| a.to_string()), |key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[], &[]);
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.limits, BundleLimits::default());
        assert_eq!(config.score_weights_path, None);
        assert!(!config.disable_cache);
    }

    #[test]
    fn flags_override_environment() {
        let config = config(
            &["--no-cache", "--api-base=http://cli/api", "--score-weights", "w.json"],
            &[
                ("LEXICON_API_BASE", "http://env/api"),
                ("SCORE_WEIGHTS_PATH", "env.json"),
                ("PORT", "9000"),
                ("BUNDLE_PAGE_SIZE", "0"),
                ("BUNDLE_MAX_ROWS", "400"),
            ],
        );
        assert!(config.disable_cache);
        assert_eq!(config.api_base, "http://cli/api");
        assert_eq!(config.score_weights_path, Some(PathBuf::from("w.json")));
        assert_eq!(config.port, 9000);
        assert_eq!(config.limits, BundleLimits::new(DEFAULT_PAGE_SIZE, 400));
    }

    #[test]
    fn weights_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights.json");
        std::fs::write(&path, r#"{ "exact_location": 20 }"#).unwrap();

        let config = config(&[], &[("SCORE_WEIGHTS_PATH", path.to_str().unwrap())]);
        let weights = ScoreWeights::from_file(config.score_weights_path.unwrap()).unwrap();
        assert_eq!(weights.exact_location, 20);
        assert_eq!(weights.partial_location, 9);
    }
}
