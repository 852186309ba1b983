// huntwarden/src/main.rs
//
// Huntwarden: anti-cheat, trust scoring and AI content services for
// location-based treasure hunts.
//
// Two operational modes:
//   serve  run one or all HTTP services (anti-cheat, clue generator,
//          NPC guardian, world builder)
//   eval   score a labeled JSONL player dataset and print a report
//
// Usage:
//   huntwarden --mode serve --service all --bind 0.0.0.0:8000
//   huntwarden --mode serve --service clue-generator --redis-url redis://127.0.0.1:6379
//   huntwarden --mode eval --path labeled_players.jsonl

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use huntwarden::api::{self, AppState, Service};
use huntwarden::clue::{ClueCache, MemoryCache, Providers, RedisCache};
use huntwarden::config::{ClueConfig, LlmConfig, ScoringConfig, DEFAULT_CLUE_SECRET};
use huntwarden::engine::audit::AuditLog;
use huntwarden::eval::{report, Evaluator};
use huntwarden::redis_state::{self, RedisConfig, RedisPersistence};

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name    = "huntwarden",
    about   = "Anti-cheat, trust scoring and AI content services for treasure hunts",
    version = env!("CARGO_PKG_VERSION"),
)]
struct Cli {
    #[arg(long, value_enum, default_value = "serve")]
    mode: Mode,

    #[arg(long, value_enum, default_value = "all", help = "Service set to mount (serve mode)")]
    service: Service,

    #[arg(long, env = "HUNTWARDEN_BIND", default_value = "0.0.0.0:8000")]
    bind: String,

    #[arg(long, default_value = "labeled_players.jsonl", help = "Labeled JSONL dataset (eval mode)")]
    path: PathBuf,

    #[arg(long, default_value_t = 0.5, help = "Combined risk at which eval flags a player")]
    eval_threshold: f64,

    #[arg(long, env = "HUNTWARDEN_AUDIT_DIR", help = "Directory for JSONL audit records")]
    audit_dir: Option<PathBuf>,

    #[arg(long, env = "REDIS_URL", help = "Redis for trust persistence and the clue cache")]
    redis_url: Option<String>,

    #[command(flatten)]
    scoring: ScoringConfig,

    #[command(flatten)]
    llm: LlmConfig,

    #[command(flatten)]
    clue: ClueConfig,
}

#[derive(Clone, ValueEnum)]
enum Mode {
    Serve,   // HTTP services
    Eval,    // offline evaluation over a labeled dataset
}

// ── Modes ─────────────────────────────────────────────────────────────────────

async fn run_eval(cli: &Cli) -> Result<()> {
    let evaluator = Evaluator::new(&cli.scoring, cli.eval_threshold)?;
    let result    = evaluator.run_dataset(&cli.path).await
        .with_context(|| format!("evaluating {}", cli.path.display()))?;

    println!("{}", report::markdown(&result));
    println!("{}", serde_json::to_string_pretty(&report::to_json(&result))?);
    Ok(())
}

async fn run_serve(cli: Cli) -> Result<()> {
    if cli.clue.clue_secret_key == DEFAULT_CLUE_SECRET {
        warn!("CLUE_SECRET_KEY is the default value; clue proofs are forgeable");
    }

    let redis = match cli.redis_url.as_deref() {
        Some(url) => match redis_state::connect(url).await {
            Ok(conn) => Some(conn),
            Err(e) => {
                warn!("Redis unavailable at {}: {}; running in memory", url, e);
                None
            }
        },
        None => None,
    };

    let memory_cache = Arc::new(MemoryCache::new());
    let cache: Arc<dyn ClueCache> = match &redis {
        Some(conn) => Arc::new(RedisCache::new(conn.clone())),
        None       => memory_cache.clone(),
    };

    let providers = Providers::from_config(&cli.llm)?;
    let audit     = AuditLog::new(cli.audit_dir.clone())?;
    let state     = Arc::new(AppState::new(cli.scoring, cli.llm, cli.clue, providers, cache, audit)?);

    // Housekeeping
    tokio::spawn(Arc::clone(&state.store).housekeeping_loop());
    if redis.is_none() {
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(60)).await;
                let dropped = memory_cache.sweep();
                if dropped > 0 {
                    info!(dropped, remaining = memory_cache.len(), "clue cache swept");
                }
            }
        });
    }

    // Trust persistence
    if let Some(url) = cli.redis_url.as_deref().filter(|_| redis.is_some()) {
        let persistence = RedisPersistence::connect(RedisConfig::with_url(url), Arc::clone(&state.store)).await?;
        match persistence.restore().await {
            Ok(n)  => info!(players = n, "trust state restored from Redis"),
            Err(e) => warn!("Redis restore failed: {}", e),
        }
        tokio::spawn(Arc::new(persistence).checkpoint_loop());
    }

    let app      = api::router(cli.service, Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(&cli.bind).await
        .with_context(|| format!("binding {}", cli.bind))?;

    info!(service = %cli.service, bind = %cli.bind, "huntwarden listening");
    axum::serve(listener, app).await?;
    Ok(())
}

// ── Main ──────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env()
            .add_directive("huntwarden=info".parse()?))
        .compact().init();

    let cli = Cli::parse();
    match cli.mode {
        Mode::Eval  => run_eval(&cli).await,
        Mode::Serve => run_serve(cli).await,
    }
}
