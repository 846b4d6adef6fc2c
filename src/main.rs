use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn, Level};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

use arb_tracker::config::Config;
use arb_tracker::engine::ArbitrageEngine;
use arb_tracker::exchange::{BinanceSource, CoinbaseSource, KrakenSource, QuoteSource};
use arb_tracker::model::{BinanceHistory, ModelTrainer, Scorer, TrainError};
use arb_tracker::server::{router, ApiState, SubscriberRegistry};

#[derive(Parser)]
#[command(name = "arb-tracker")]
#[command(about = "Cross-exchange arbitrage monitor with ML confidence scoring")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the monitor and websocket broadcast server
    Serve,
    /// Train the confidence model from historical candles and exit
    Train,
    /// Run a single detection cycle and print the results
    Scan,
}

fn init_logging() -> Result<()> {
    use tracing_subscriber::fmt::writer::MakeWriterExt;

    std::fs::create_dir_all("logs").context("Failed to create logs directory")?;

    let file_appender = tracing_appender::rolling::hourly("logs", "arb-tracker.log");
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);

    // Leak the guard to keep it alive for the program duration
    Box::leak(Box::new(_guard));

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("arb_tracker=debug".parse()?)
                .add_directive(Level::INFO.into()),
        )
        .with_writer(std::io::stdout.and(file_writer))
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .init();

    Ok(())
}

fn build_sources() -> Result<Vec<Arc<dyn QuoteSource>>> {
    let sources: Vec<Arc<dyn QuoteSource>> = vec![
        Arc::new(BinanceSource::new()?) as Arc<dyn QuoteSource>,
        Arc::new(CoinbaseSource::new()?),
        Arc::new(KrakenSource::new()?),
    ];
    Ok(sources)
}

fn log_config(config: &Config) {
    info!("📋 Configuration:");
    info!("   Pairs: {}", config.pairs.join(", "));
    info!("   Min spread: {}%", config.detection.min_spread_pct);
    info!("   Notional size: {}", config.detection.notional_trade_size);
    info!("   Broadcast interval: {}s", config.broadcast.interval_secs);
    info!("   Bind address: {}", config.broadcast.bind_addr);
    info!("   Model dir: {}", config.training.model_dir);
}

async fn run_serve(config: Config) -> Result<()> {
    info!("🚀 Starting arbitrage monitor");
    log_config(&config);

    let scorer = Arc::new(Scorer::new());
    if scorer.load_from_dir(Path::new(&config.training.model_dir)) {
        info!("🧠 Trained model loaded, ML scoring active");
    } else {
        info!("🧮 No trained model found, heuristic scoring active");
        // Train in the background; the scorer swaps over when done.
        let scorer = Arc::clone(&scorer);
        let training = config.training.clone();
        tokio::spawn(async move {
            let trainer = ModelTrainer::new(training.clone());
            let history = match BinanceHistory::new() {
                Ok(history) => history,
                Err(e) => {
                    warn!(error = %e, "Could not build history client, staying on heuristic scoring");
                    return;
                }
            };
            match trainer.train(&history).await {
                Ok(artifact) => {
                    if let Err(e) = ModelTrainer::persist(&artifact, Path::new(&training.model_dir))
                    {
                        warn!(error = %e, "Failed to persist trained model");
                    }
                    scorer.install(artifact);
                }
                Err(e @ TrainError::InsufficientData { .. }) => {
                    warn!(error = %e, "Not enough history to train, staying on heuristic scoring");
                }
                Err(e) => {
                    warn!(error = %e, "Background training failed, staying on heuristic scoring");
                }
            }
        });
    }

    let registry = Arc::new(SubscriberRegistry::new());
    let engine = ArbitrageEngine::new(build_sources()?, &config, scorer, Arc::clone(&registry));

    let state = ApiState {
        registry,
        latest: engine.latest(),
    };
    let listener = tokio::net::TcpListener::bind(&config.broadcast.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.broadcast.bind_addr))?;
    info!("🌐 Listening on {}", config.broadcast.bind_addr);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router(state)).await {
            warn!(error = %e, "HTTP server exited");
        }
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("🛑 Shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    engine.run(shutdown_rx).await;
    info!("👋 Goodbye");
    Ok(())
}

async fn run_train(config: Config) -> Result<()> {
    info!("🎓 Training confidence model");

    let trainer = ModelTrainer::new(config.training.clone());
    let history = BinanceHistory::new()?;

    match trainer.train(&history).await {
        Ok(artifact) => {
            ModelTrainer::persist(&artifact, Path::new(&config.training.model_dir))?;
            info!("✅ Model trained and persisted to {}", config.training.model_dir);
            Ok(())
        }
        Err(e @ TrainError::InsufficientData { .. }) => {
            warn!(error = %e, "Training skipped");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

async fn run_scan(config: Config) -> Result<()> {
    info!("🔍 Running a single detection cycle");
    log_config(&config);

    let scorer = Arc::new(Scorer::new());
    scorer.load_from_dir(Path::new(&config.training.model_dir));

    let registry = Arc::new(SubscriberRegistry::new());
    let engine = ArbitrageEngine::new(build_sources()?, &config, scorer, registry);
    let opportunities = engine.run_cycle().await;

    if opportunities.is_empty() {
        info!("No opportunities above the spread threshold");
        return Ok(());
    }

    for opp in &opportunities {
        info!(
            "💰 {}: buy {} @ {} / sell {} @ {} | spread {:.4}% | confidence {:.1}",
            opp.pair,
            opp.buy_exchange,
            opp.buy_price,
            opp.sell_exchange,
            opp.sell_price,
            opp.spread_pct,
            opp.confidence_score,
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_serve(config).await,
        Commands::Train => run_train(config).await,
        Commands::Scan => run_scan(config).await,
    }
}
