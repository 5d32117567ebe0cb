//! The quoting pipeline: routes are enumerated once per direction, turned into batched quote
//! calls, executed, then aggregated into bid/ask prices or ranked into a best route. A
//! [`watcher::PriceWatcher`] keeps the last requested quote alive on new blocks.

pub mod aggregate;
pub mod ranker;
pub mod request;
pub mod routes;
pub mod watcher;

use std::sync::{Arc, Weak};

use futures03::FutureExt;
use rust_decimal::Decimal;
use tokio::sync::{broadcast, Mutex, OnceCell};
use tracing::{debug, instrument, warn};
use uniquote_common::{
    models::{
        network::NetworkDetails,
        quote::{BestRouteQuotes, BidAskQuote, TradeDirection},
        route::AllPossibleRoutes,
        token::Token,
        ProtocolVersion,
    },
    traits::{BatchCallExecutor, NetworkProvider},
    QuoterError,
};

use crate::config::QuoterSettings;
use aggregate::QuoteResultAggregator;
use ranker::RouteRanker;
use request::QuoteRequestBuilder;
use routes::RouteEnumerator;
use watcher::{ChangePolicy, PriceWatcher, QuoteChanged, Recompute, WatchedQuote};

/// The last top-level request, replayed by the watcher on every block.
#[derive(Debug, Clone, PartialEq)]
enum WatchRequest {
    BidAsk(Vec<Decimal>),
    BestRoute { amount: Decimal, direction: TradeDirection },
}

struct EngineInner {
    token_a: Token,
    token_b: Token,
    settings: QuoterSettings,
    versions: Vec<ProtocolVersion>,
    network: NetworkDetails,
    enumerator: RouteEnumerator,
    requests: QuoteRequestBuilder,
    aggregator: QuoteResultAggregator,
    ranker: RouteRanker,
    executor: Arc<dyn BatchCallExecutor>,
    provider: Arc<dyn NetworkProvider>,
    routes_a_to_b: OnceCell<AllPossibleRoutes>,
    routes_b_to_a: OnceCell<AllPossibleRoutes>,
    watcher: PriceWatcher,
    last: Mutex<Option<(WatchRequest, WatchedQuote)>>,
}

/// Quotes one token pair.
///
/// Cloning is cheap and clones share the route cache and the watcher.
#[derive(Clone)]
pub struct QuoterEngine {
    inner: Arc<EngineInner>,
}

impl QuoterEngine {
    /// Creates an engine for the `token_a`/`token_b` pair. Nothing is fetched until a quote is
    /// requested.
    ///
    /// ## Return
    /// `ConfigurationError` for invalid settings or when both tokens resolve to the same
    /// contract.
    pub fn new(
        token_a: Token,
        token_b: Token,
        settings: QuoterSettings,
        network: NetworkDetails,
        executor: Arc<dyn BatchCallExecutor>,
        provider: Arc<dyn NetworkProvider>,
    ) -> Result<Self, QuoterError> {
        settings.validate()?;
        let wrapped_native = network.wrapped_native.address;
        if token_a.call_address(wrapped_native) == token_b.call_address(wrapped_native) {
            return Err(QuoterError::ConfigurationError(format!(
                "Cannot quote {token_a} against itself ({})",
                token_a.checksum_address()
            )));
        }

        let inner = EngineInner {
            versions: settings.enabled_versions(),
            enumerator: RouteEnumerator::new(
                network.base_tokens.clone(),
                wrapped_native,
                settings.max_hops,
            ),
            requests: QuoteRequestBuilder::new(network.contracts, wrapped_native),
            aggregator: QuoteResultAggregator::new(token_b.clone()),
            ranker: RouteRanker::new(token_a.clone(), token_b.clone()),
            token_a,
            token_b,
            settings,
            network,
            executor,
            provider,
            routes_a_to_b: OnceCell::new(),
            routes_b_to_a: OnceCell::new(),
            watcher: PriceWatcher::new(),
            last: Mutex::new(None),
        };
        Ok(Self { inner: Arc::new(inner) })
    }

    pub fn token_a(&self) -> &Token {
        &self.inner.token_a
    }

    pub fn token_b(&self) -> &Token {
        &self.inner.token_b
    }

    pub fn network(&self) -> &NetworkDetails {
        &self.inner.network
    }

    pub fn settings(&self) -> &QuoterSettings {
        &self.inner.settings
    }

    /// Candidate routes from token A to token B, enumerated on first use.
    pub async fn routes_a_to_b(&self) -> &AllPossibleRoutes {
        self.inner.routes_a_to_b().await
    }

    /// Candidate routes from token B to token A, enumerated on first use.
    pub async fn routes_b_to_a(&self) -> &AllPossibleRoutes {
        self.inner.routes_b_to_a().await
    }

    /// Best bid and ask of every trade amount (in token A), in request order. Duplicate amounts
    /// are quoted once. Amounts no route could quote are left out.
    ///
    /// Tears down the running watcher and starts a new one on the fresh result.
    ///
    /// ## Return
    /// `InvalidAmount` for an empty or invalid amount list, `RouteNotFound` when no amount could
    /// be quoted at all, `NetworkFailure` when the batch fails.
    #[instrument(skip(self), fields(pair = %self.pair()))]
    pub async fn get_best_bid_ask_quotes(
        &self,
        amounts: Vec<Decimal>,
    ) -> Result<Vec<BidAskQuote>, QuoterError> {
        self.inner.watcher.stop().await;
        let amounts = unique(amounts);
        let quotes = self.inner.bid_ask(&amounts).await?;
        self.rewatch(WatchRequest::BidAsk(amounts), WatchedQuote::BidAsk(quotes.clone()))
            .await;
        Ok(quotes)
    }

    /// Best route from token A to token B for `amount`, along with every route that could be
    /// quoted.
    ///
    /// With `TradeDirection::Input`, `amount` of token A is sold; with `TradeDirection::Output`
    /// `amount` of token B is bought. Tears down the running watcher and starts a new one on the
    /// fresh result.
    #[instrument(skip(self), fields(pair = %self.pair()))]
    pub async fn find_best_route(
        &self,
        amount: Decimal,
        direction: TradeDirection,
    ) -> Result<BestRouteQuotes, QuoterError> {
        self.inner.watcher.stop().await;
        let best = self
            .inner
            .best_route(amount, direction)
            .await?;
        self.rewatch(
            WatchRequest::BestRoute { amount, direction },
            WatchedQuote::BestRoute(best.clone()),
        )
        .await;
        Ok(best)
    }

    /// Resumes watching the last requested quote. A no-op while already watching or before any
    /// quote was requested.
    pub async fn watch(&self) -> Result<(), QuoterError> {
        if self.inner.watcher.is_watching().await {
            return Ok(());
        }
        let Some((request, quote)) = self.inner.last.lock().await.clone() else {
            debug!("Nothing to watch yet");
            return Ok(());
        };

        let blocks = self.inner.provider.subscribe_blocks().await?;
        self.inner
            .watcher
            .start_if_idle(blocks, quote, self.recompute(request), self.policy())
            .await;
        Ok(())
    }

    /// Stops watching and closes the notification channel. Idempotent.
    pub async fn unwatch(&self) {
        self.inner.watcher.stop().await;
    }

    pub async fn is_watching(&self) -> bool {
        self.inner.watcher.is_watching().await
    }

    /// Receives quote changes until the watcher is stopped. Subscribe after the quoting call:
    /// each quoting call closes the previous channel.
    pub fn subscribe(&self) -> broadcast::Receiver<QuoteChanged> {
        self.inner.watcher.subscribe()
    }

    async fn rewatch(&self, request: WatchRequest, quote: WatchedQuote) {
        *self.inner.last.lock().await = Some((request.clone(), quote.clone()));
        match self.inner.provider.subscribe_blocks().await {
            Ok(blocks) => {
                self.inner
                    .watcher
                    .start(blocks, quote, self.recompute(request), self.policy())
                    .await
            }
            Err(err) => warn!(%err, "Failed to subscribe to blocks, quote is not watched"),
        }
    }

    fn policy(&self) -> ChangePolicy {
        ChangePolicy::new(self.inner.settings.quote_ttl, self.inner.settings.price_tolerance)
    }

    /// The watcher only holds a weak reference: dropping the last engine handle ends the watch.
    fn recompute(&self, request: WatchRequest) -> Recompute {
        let inner: Weak<EngineInner> = Arc::downgrade(&self.inner);
        Arc::new(move || {
            let inner = inner.clone();
            let request = request.clone();
            async move {
                let inner = inner.upgrade()?;
                Some(inner.compute(&request).await)
            }
            .boxed()
        })
    }

    fn pair(&self) -> String {
        format!("{}/{}", self.inner.token_a, self.inner.token_b)
    }
}

impl EngineInner {
    async fn routes_a_to_b(&self) -> &AllPossibleRoutes {
        self.routes_a_to_b
            .get_or_init(|| async {
                self.enumerator.enumerate(
                    &self.token_a,
                    &self.token_b,
                    self.settings.disable_multihop,
                    &self.versions,
                )
            })
            .await
    }

    async fn routes_b_to_a(&self) -> &AllPossibleRoutes {
        self.routes_b_to_a
            .get_or_init(|| async {
                self.enumerator.enumerate(
                    &self.token_b,
                    &self.token_a,
                    self.settings.disable_multihop,
                    &self.versions,
                )
            })
            .await
    }

    async fn compute(&self, request: &WatchRequest) -> Result<WatchedQuote, QuoterError> {
        match request {
            WatchRequest::BidAsk(amounts) => self
                .bid_ask(amounts)
                .await
                .map(WatchedQuote::BidAsk),
            WatchRequest::BestRoute { amount, direction } => self
                .best_route(*amount, *direction)
                .await
                .map(WatchedQuote::BestRoute),
        }
    }

    async fn bid_ask(&self, amounts: &[Decimal]) -> Result<Vec<BidAskQuote>, QuoterError> {
        if amounts.is_empty() {
            return Err(QuoterError::InvalidAmount("No trade amount requested".to_string()));
        }

        let batch = self.requests.build_batch(
            self.routes_a_to_b().await,
            self.routes_b_to_a().await,
            amounts,
            &self.versions,
        )?;
        let results = self.executor.execute(batch).await?;
        let mut merged = self.aggregator.aggregate(&results)?;

        let quotes: Vec<BidAskQuote> = amounts
            .iter()
            .filter_map(|amount| merged.remove(amount))
            .collect();
        if quotes.is_empty() {
            return Err(self.route_not_found());
        }
        Ok(quotes)
    }

    async fn best_route(
        &self,
        amount: Decimal,
        direction: TradeDirection,
    ) -> Result<BestRouteQuotes, QuoterError> {
        let routes = self.routes_a_to_b().await;
        let batch = self
            .requests
            .build_route_batch(routes, amount, direction, &self.versions)?;
        let results = self.executor.execute(batch).await?;
        self.ranker
            .rank(routes, amount, direction, &results)
    }

    fn route_not_found(&self) -> QuoterError {
        QuoterError::RouteNotFound { from: self.token_a.address, to: self.token_b.address }
    }
}

fn unique(amounts: Vec<Decimal>) -> Vec<Decimal> {
    let mut unique = Vec::with_capacity(amounts.len());
    for amount in amounts {
        if !unique.contains(&amount) {
            unique.push(amount);
        }
    }
    unique
}
