use std::time::Duration;

use clap::Parser;
use rust_decimal::Decimal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_appender::rolling;
use uniquote_common::models::{quote::TradeDirection, ProtocolVersion};
use uniquote_ethereum::{provider::ProviderContext, rpc::config::MulticallBatchingConfig};

use crate::{config::QuoterSettings, QuoterBuilder};

/// Uniquote CLI - Quotes a token pair across v2 and v3 pools
///
/// Prints the best bid and ask for every amount, or the best route for a single amount, as JSON.
/// With `--watch` it keeps printing updated quotes as new blocks arrive.
#[derive(Parser, Debug, Clone, PartialEq)]
#[clap(version = env!("CARGO_PKG_VERSION"))]
struct CliArgs {
    /// Address of the token being sold. The native currency is
    /// 0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE.
    #[clap(long)]
    token_a: String,

    /// Address of the token being bought.
    #[clap(long)]
    token_b: String,

    /// Node URL. When omitted, the public endpoint of the chain is used.
    #[clap(long, env = "RPC_URL")]
    rpc_url: Option<String>,

    #[clap(long, env = "UNIQUOTE_CHAIN_ID", default_value = "1")]
    chain_id: u64,

    /// Trade amount, in token A. Can be repeated.
    #[clap(short = 'a', long, number_of_values = 1, required = true)]
    amount: Vec<Decimal>,

    /// Find the best route for the single given amount instead of bid/ask quotes.
    #[clap(long)]
    best_route: bool,

    /// With --best-route: whether the amount is sold (input) or bought (output).
    #[clap(long, default_value = "input")]
    direction: TradeDirection,

    /// Protocol versions to quote, comma separated.
    #[clap(long, value_delimiter = ',', default_value = "v2,v3")]
    versions: Vec<ProtocolVersion>,

    /// Only quote the direct pair.
    #[clap(long)]
    disable_multihop: bool,

    /// Maximum number of intermediary tokens in a route.
    #[clap(long, default_value = "1")]
    max_hops: usize,

    /// Keep running and print quotes again when they change.
    #[clap(long)]
    watch: bool,

    /// Relative price move below which a watched quote is considered unchanged.
    #[clap(long, default_value = "0")]
    price_tolerance: f64,

    /// Seconds after which a watched quote is printed again even if unchanged.
    #[clap(long, default_value = "1200")]
    quote_ttl: u64,

    /// Seconds between two polls of the node for new blocks.
    #[clap(long, default_value = "4")]
    poll_interval: u64,

    /// Split multicalls into requests of at most this many calls. Unbounded if not set.
    #[clap(long)]
    max_calls_per_request: Option<usize>,

    /// Logging folder path.
    #[clap(long, default_value = "logs")]
    log_folder: String,

    /// Enable verbose logging.
    #[clap(long)]
    verbose: bool,
}

impl CliArgs {
    fn validate(&self) -> Result<(), String> {
        if self.best_route && self.amount.len() != 1 {
            return Err("--best-route takes exactly one --amount".to_string());
        }
        if self.amount.iter().any(|amount| amount.is_sign_negative() || amount.is_zero()) {
            return Err("Amounts must be greater than zero".to_string());
        }
        Ok(())
    }

    fn provider(&self) -> ProviderContext {
        match &self.rpc_url {
            Some(url) => ProviderContext::ProviderUrl { chain_id: self.chain_id, url: url.clone() },
            None => ProviderContext::ChainId(self.chain_id),
        }
    }

    fn settings(&self) -> QuoterSettings {
        QuoterSettings::default()
            .protocol_versions(&self.versions)
            .disable_multihop(self.disable_multihop)
            .max_hops(self.max_hops)
            .price_tolerance(self.price_tolerance)
            .quote_ttl(Duration::from_secs(self.quote_ttl))
    }

    fn batching(&self) -> MulticallBatchingConfig {
        match self.max_calls_per_request {
            Some(max_calls_per_request) => {
                MulticallBatchingConfig::Chunked { max_calls_per_request }
            }
            None => MulticallBatchingConfig::Unbounded,
        }
    }
}

pub async fn run_cli() -> Result<(), String> {
    // Parse CLI Args
    let args: CliArgs = CliArgs::parse();
    args.validate()?;

    // Setup Logging
    let log_level = if args.verbose { "debug" } else { "info" };
    let (non_blocking, _guard) =
        tracing_appender::non_blocking(rolling::never(&args.log_folder, "uniquote.log"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(non_blocking)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| format!("Failed to set up logging subscriber: {e}"))?;

    run(args).await
}

async fn run(args: CliArgs) -> Result<(), String> {
    info!("Running with version: {}", option_env!("CARGO_PKG_VERSION").unwrap_or("unknown"));

    let engine = QuoterBuilder::new(args.provider(), &args.token_a, &args.token_b)
        .settings(args.settings())
        .batching(args.batching())
        .poll_interval(Duration::from_secs(args.poll_interval))
        .build()
        .await
        .map_err(|e| format!("Failed to set up quoter: {e}"))?;

    let output = if args.best_route {
        let best = engine
            .find_best_route(args.amount[0], args.direction)
            .await
            .map_err(|e| format!("Failed to find best route: {e}"))?;
        serde_json::to_string_pretty(&best)
    } else {
        let quotes = engine
            .get_best_bid_ask_quotes(args.amount.clone())
            .await
            .map_err(|e| format!("Failed to quote: {e}"))?;
        serde_json::to_string_pretty(&quotes)
    }
    .map_err(|e| format!("Failed to serialize quote: {e}"))?;
    println!("{output}");

    if !args.watch {
        engine.unwatch().await;
        return Ok(());
    }
    if !engine.is_watching().await {
        return Err("Failed to subscribe to new blocks".to_string());
    }

    let mut events = engine.subscribe();
    info!("Watching {}/{}", engine.token_a(), engine.token_b());
    loop {
        match events.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => println!("{json}"),
                // Log the error but continue processing further events.
                Err(e) => error!("Failed to serialize quote change: {e}"),
            },
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "Quote printer lagged behind"),
            Err(RecvError::Closed) => break,
        }
    }

    Err("Quote watcher terminated: block stream ended".to_string())
}
