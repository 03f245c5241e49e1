// src/main.rs
//! HD sweeper entry point
//! Loads the configuration, wires the counter store, endpoints and scheduler,
//! and runs until Ctrl-C.
use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use hd_sweeper::api::{StatusServer, StatusState};
use hd_sweeper::blockchain::{EndpointRegistry, EthereumClient};
use hd_sweeper::core::config::{CounterBackend, SweeperConfig};
use hd_sweeper::core::derivation::{derive_accounts_from, DerivationEngine, SeedPhrase};
use hd_sweeper::monitoring::SweepMetrics;
use hd_sweeper::storage::{
    CounterService, CounterStore, HttpCounterStore, MemoryCounterStore, SqliteCounterStore,
};
use hd_sweeper::sweeper::{CycleScheduler, SweepWorker, WorkerSettings};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "hd-sweeper")]
#[command(about = "Periodic HD-derivation balance sweeper")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sweep loop (default)
    Run(RunArgs),
    /// Derive a throwaway account set and print addresses and paths
    Derive {
        /// Number of accounts to derive
        #[arg(long, default_value = "5")]
        count: usize,
    },
}

#[derive(ClapArgs, Default)]
struct RunArgs {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "sweeper.toml")]
    config: PathBuf,
    /// Override the destination address
    #[arg(long)]
    destination: Option<String>,
    /// Override the seconds between cycles
    #[arg(long)]
    interval_secs: Option<u64>,
    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging()?;

    match args.command {
        Some(Commands::Derive { count }) => derive_preview(count),
        Some(Commands::Run(run_args)) => run(run_args).await,
        None => {
            run(RunArgs { config: PathBuf::from("sweeper.toml"), ..RunArgs::default() }).await
        }
    }
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hyper=info,h2=info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_max_level(tracing::Level::TRACE)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn load_config(args: &RunArgs) -> Result<SweeperConfig> {
    let mut config = if args.config.exists() {
        SweeperConfig::load(&args.config)?
    } else {
        warn!(path = %args.config.display(), "Config file not found, using defaults");
        SweeperConfig::default()
    };

    if let Some(destination) = &args.destination {
        config.sweeper.destination = Some(destination.clone());
    }
    if let Some(secs) = args.interval_secs {
        config.sweeper.interval_secs = secs;
    }

    config.validate()?;
    Ok(config)
}

async fn open_counter_store(config: &SweeperConfig) -> Result<Arc<dyn CounterStore>> {
    let store: Arc<dyn CounterStore> = match config.counters.backend {
        CounterBackend::Http => {
            let url = config.counters.url.as_deref().context("counters.url is required")?;
            Arc::new(HttpCounterStore::new(url, config.timeouts.request())?)
        }
        CounterBackend::Sqlite => {
            Arc::new(SqliteCounterStore::new_with_url(&config.counters.database_url).await?)
        }
        CounterBackend::Memory => {
            warn!("Using in-memory counters; values are lost on exit");
            Arc::new(MemoryCounterStore::new())
        }
    };
    Ok(store)
}

async fn run(args: RunArgs) -> Result<()> {
    info!("Starting hd-sweeper v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args)?;
    let destination = config.destination()?;

    let registry = match &config.endpoints {
        Some(urls) => EndpointRegistry::new(urls)?,
        None => EndpointRegistry::default(),
    };
    let providers =
        EthereumClient::connect_registry(&registry, config.sweeper.chain_id, config.timeouts.request())?;
    info!(endpoints = providers.len(), chain_id = config.sweeper.chain_id, "Endpoints ready");

    let store = open_counter_store(&config).await?;
    let (counters, counter_task) = CounterService::start(store).await;

    let metrics = Arc::new(SweepMetrics::new()?);
    let worker = Arc::new(SweepWorker::new(
        WorkerSettings {
            destination,
            request_timeout: config.timeouts.request(),
            confirmation_timeout: config.timeouts.confirmation(),
            poll_interval: config.timeouts.poll_interval(),
        },
        counters.clone(),
    ));
    let scheduler = CycleScheduler::new(
        Arc::new(DerivationEngine::new(config.sweeper.word_count)),
        providers,
        worker,
        config.interval(),
    )
    .with_metrics(metrics.clone());

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl-C received, shutting down");
            }
            shutdown.cancel();
        });
    }

    let status_task = match &config.status.bind {
        Some(bind) => {
            let addr: SocketAddr =
                bind.parse().with_context(|| format!("Invalid status.bind '{}'", bind))?;
            let state = StatusState {
                counters: counters.clone(),
                metrics: Some(metrics.clone()),
                scheduler: scheduler.state(),
            };
            let server = StatusServer::new(addr, state).bind().await?;
            let shutdown = shutdown.clone();
            Some(tokio::spawn(async move {
                if let Err(e) = server.serve(shutdown).await {
                    error!(error = %e, "Status server stopped with error");
                }
            }))
        }
        None => None,
    };

    if args.once {
        match scheduler.run_once().await {
            Ok(report) => info!(
                checked = report.checked(),
                swept = report.swept(),
                failed = report.failed(),
                swept_wei = %report.swept_amount(),
                "Single cycle complete"
            ),
            Err(e) => warn!(error = %e, "Single cycle skipped"),
        }
        shutdown.cancel();
    } else {
        scheduler.run(shutdown.clone()).await;
    }

    if let Some(task) = status_task {
        if let Err(e) = task.await {
            warn!(error = %e, "Status server task failed");
        }
    }

    // closing every handle lets the counter task drain and exit
    drop(scheduler);
    drop(counters);
    let _ = counter_task.await;

    let final_counts = metrics.accounts_checked.get();
    info!(checks_this_run = final_counts, "hd-sweeper stopped");
    Ok(())
}

/// Print a freshly derived, immediately discarded account set. Keys are never shown.
fn derive_preview(count: usize) -> Result<()> {
    let seed = SeedPhrase::generate()?;
    let accounts = derive_accounts_from(&seed, count)?;
    for account in &accounts {
        println!("{:>4}  {:<22}  {:?}", account.index, account.derivation_path, account.address);
    }
    Ok(())
}
