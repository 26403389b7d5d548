use anyhow::Result;
use chrono::Utc;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use vigil_alert::checker::CheckerContext;
use vigil_storage::engine::SqliteStore;
use vigil_storage::TriggerStore;
use vigil_target::pattern::PatternResolver;

use vigil_server::config::ServerConfig;
use vigil_server::ingest::Ingester;
use vigil_server::scheduler::TriggerScheduler;

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  vigil-server [config.toml]                       Start the checker service");
    eprintln!("  vigil-server check <config.toml>                 Check every trigger once and exit");
    eprintln!("  vigil-server ingest <config.toml> <metrics.txt>  Load Graphite plaintext lines from a file");
}

#[tokio::main]
async fn main() -> Result<()> {
    vigil_common::id::init(1, 1);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("vigil=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some("check") => {
            let config_path = args.get(2).ok_or_else(|| {
                print_usage();
                anyhow::anyhow!("check requires <config.toml> argument")
            })?;
            run_check_once(config_path).await
        }
        Some("ingest") => {
            let config_path = args.get(2).ok_or_else(|| {
                print_usage();
                anyhow::anyhow!("ingest requires <config.toml> and <metrics.txt> arguments")
            })?;
            let input_path = args.get(3).ok_or_else(|| {
                print_usage();
                anyhow::anyhow!("ingest requires <metrics.txt> argument")
            })?;
            run_ingest(config_path, input_path).await
        }
        Some("--help" | "-h") => {
            print_usage();
            Ok(())
        }
        _ => {
            let config_path = args
                .get(1)
                .map(|s| s.as_str())
                .unwrap_or("config/server.toml");
            run_server(config_path).await
        }
    }
}

fn open_store(config: &ServerConfig) -> Result<Arc<dyn TriggerStore>> {
    let path = config.database_path();
    let store = SqliteStore::open(&path)
        .map_err(|e| anyhow::anyhow!("Failed to open store '{}': {e}", path.display()))?;
    Ok(Arc::new(store))
}

fn build_scheduler(config: &ServerConfig, store: Arc<dyn TriggerStore>) -> TriggerScheduler {
    let resolver = Arc::new(PatternResolver::with_step(store.clone(), config.checker.step_secs));
    let ctx = CheckerContext::new(store, resolver).with_metrics_ttl(config.checker.metrics_ttl_secs);
    TriggerScheduler::new(
        ctx,
        config.triggers.clone(),
        config.checker.tick_secs,
        config.checker.max_concurrent,
    )
}

fn ingester(config: &ServerConfig, store: Arc<dyn TriggerStore>) -> Ingester {
    let patterns = config
        .triggers
        .iter()
        .flat_map(|trigger| trigger.patterns.iter().cloned())
        .collect();
    Ingester::new(store, patterns)
}

async fn run_server(config_path: &str) -> Result<()> {
    let config = ServerConfig::load(config_path)?;
    tracing::info!(
        config = config_path,
        triggers = config.triggers.len(),
        "Starting vigil-server"
    );

    let store = open_store(&config)?;
    let scheduler = build_scheduler(&config, store.clone());

    if let Some(addr) = &config.ingest.listen {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind Graphite listener on '{addr}': {e}"))?;
        let ingester = ingester(&config, store.clone());
        tokio::spawn(async move {
            if let Err(e) = ingester.serve(listener).await {
                tracing::error!(error = %e, "Graphite listener stopped");
            }
        });
    }

    tokio::select! {
        _ = scheduler.run() => {}
        result = signal::ctrl_c() => {
            result?;
            tracing::info!("Shutdown signal received");
        }
    }
    Ok(())
}

async fn run_check_once(config_path: &str) -> Result<()> {
    let config = ServerConfig::load(config_path)?;
    let store = open_store(&config)?;
    let scheduler = build_scheduler(&config, store);

    let summary = scheduler.check_all(Utc::now().timestamp()).await?;
    tracing::info!(checked = summary.checked, failed = summary.failed, "Check finished");
    if summary.failed > 0 {
        anyhow::bail!("{} trigger check(s) failed", summary.failed);
    }
    Ok(())
}

async fn run_ingest(config_path: &str, input_path: &str) -> Result<()> {
    let config = ServerConfig::load(config_path)?;
    let store = open_store(&config)?;
    let ingester = ingester(&config, store);

    let file = std::fs::File::open(Path::new(input_path))
        .map_err(|e| anyhow::anyhow!("Failed to open '{input_path}': {e}"))?;
    let summary = tokio::task::spawn_blocking(move || ingester.ingest_reader(BufReader::new(file))).await??;
    tracing::info!(
        accepted = summary.accepted,
        rejected = summary.rejected,
        "Ingest finished"
    );
    Ok(())
}
