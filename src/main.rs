use autoconvert::{
    config::AppConfig,
    connectors::{spawn_keepalive, BinanceRestClient, TelegramSink, UserDataStream, UserStreamSession},
    data::SymbolCatalog,
    trading::{BalanceEventHandler, ConversionRules, Resolution, TradeDispatcher},
    utils::{logger, metrics, Notifier},
    Result,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "autoconvert")]
#[command(about = "Converts incoming exchange balances into target assets")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/autoconvert.toml")]
    config: PathBuf,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Log file path
    #[arg(long, default_value = "logs/autoconvert.log")]
    log_file: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Listen for balance updates and convert them (default)
    Run,
    /// Validate configuration
    Validate,
    /// Show how an incoming amount would be converted, without trading
    Plan {
        /// Received asset, e.g. ETH
        asset: String,
        /// Received amount
        amount: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    dotenv::dotenv().ok();
    logger::init(&cli.log_level, &cli.log_file)?;

    info!("Starting {} v{}", autoconvert::APP_NAME, autoconvert::VERSION);

    let config = AppConfig::load_or_default(&cli.config);

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_service(config).await,
        Commands::Validate => validate_config(config),
        Commands::Plan { asset, amount } => show_plan(config, &asset, amount).await,
    }
}

async fn run_service(config: AppConfig) -> Result<()> {
    config.validate()?;
    info!("Conversion rules: {:?}", config.conversion.rules);

    if let Some(port) = config.monitoring.metrics_port {
        metrics::install_exporter(port)?;
    }

    let (notifier, messages) = Notifier::channel();
    TelegramSink::new(&config.telegram)?.spawn(messages);
    notifier.notify("Bot started");

    let client = Arc::new(BinanceRestClient::new(&config.exchange)?);

    // Without pair and precision data nothing can be traded
    let catalog = Arc::new(SymbolCatalog::load(client.as_ref()).await?);

    let listen_key = client.start_user_stream().await?;
    let keepalive = spawn_keepalive(
        client.clone(),
        listen_key.clone(),
        config.session.keepalive_interval(),
        config.session.retry_delay(),
    );

    let (job_tx, job_rx) = mpsc::channel(config.execution.queue_capacity);
    let dispatcher = TradeDispatcher::new(
        catalog,
        client.clone(),
        notifier.clone(),
        &config.conversion.bridge_asset,
        config.execution.order_timeout(),
    );
    let dispatcher_task = tokio::spawn(dispatcher.run(job_rx));

    let rules = Arc::new(ConversionRules::from_config(&config.conversion));
    let (event_tx, event_rx) = mpsc::channel(config.execution.queue_capacity);
    let handler_task = tokio::spawn(BalanceEventHandler::new(rules, job_tx, notifier.clone()).run(event_rx));

    let stream = UserDataStream::new(
        &config.exchange.websocket_url,
        &listen_key,
        config.session.reconnect_delay(),
    );
    let ws = stream.connect().await?;

    info!("Starting user data handler");
    tokio::select! {
        result = stream.run(ws, event_tx) => {
            if let Err(e) = result {
                error!("User data stream failed: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => info!("Shutdown requested"),
    }

    keepalive.abort();
    if let Err(e) = handler_task.await? {
        error!("Balance handler stopped with error: {}", e);
    }
    let stats = dispatcher_task.await?;
    info!("Shutdown complete: {:?}", stats);

    Ok(())
}

fn validate_config(config: AppConfig) -> Result<()> {
    info!("Validating configuration...");

    match config.validate() {
        Ok(_) => {
            info!("Configuration is valid");
            println!("Configuration validation passed!");
            let rules = ConversionRules::from_config(&config.conversion);
            for source in rules.sources() {
                let targets: Vec<String> = rules
                    .targets(source)
                    .into_iter()
                    .flatten()
                    .map(|t| format!("{} {}%", t.destination, t.percent))
                    .collect();
                println!("  {} -> {}", source, targets.join(", "));
            }
        }
        Err(e) => {
            error!("Configuration validation failed: {}", e);
            return Err(e);
        }
    }

    Ok(())
}

async fn show_plan(config: AppConfig, asset: &str, amount: f64) -> Result<()> {
    let client = BinanceRestClient::new(&config.exchange)?;
    let catalog = Arc::new(SymbolCatalog::load(&client).await?);
    let rules = ConversionRules::from_config(&config.conversion);
    let dispatcher = TradeDispatcher::new(
        catalog,
        Arc::new(client),
        Notifier::disabled(),
        &config.conversion.bridge_asset,
        config.execution.order_timeout(),
    );

    let allocations = rules.allocate(asset, amount);
    if allocations.is_empty() {
        println!("Nothing to convert for {} {}", amount, asset.to_uppercase());
        return Ok(());
    }

    for allocation in allocations {
        println!("{}% -> {}", allocation.percent, allocation.job);
        let mut job = allocation.job;
        loop {
            match dispatcher.resolve(&job) {
                Ok(Resolution::Order(order)) => {
                    println!(
                        "  {} {} {}={}",
                        order.symbol,
                        order.side,
                        order.quantity.param_name(),
                        order.formatted_quantity()
                    );
                    break;
                }
                Ok(Resolution::Bridge(leg)) => {
                    println!("  no direct pair, first leg: {}", leg);
                    job = leg;
                }
                Err(e) => {
                    println!("  unroutable: {}", e);
                    break;
                }
            }
        }
    }

    Ok(())
}
