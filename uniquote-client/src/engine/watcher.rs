use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use chrono::{DateTime, Utc};
use futures03::future::BoxFuture;
use serde::Serialize;
use tokio::{
    sync::{broadcast, mpsc::Receiver, oneshot},
    task::JoinHandle,
    time::Instant,
};
use tracing::{debug, info, trace, warn};
use uniquote_common::{
    models::{
        blockchain::BlockHeader,
        quote::{BestRouteQuotes, BidAskQuote},
    },
    QuoterError,
};

const CHANNEL_CAPACITY: usize = 64;

/// Recomputes the quote being watched. Invoked once per (coalesced) block. Resolves to `None`
/// once the quote source is gone, which ends the watch.
pub type Recompute =
    Arc<dyn Fn() -> BoxFuture<'static, Option<Result<WatchedQuote, QuoterError>>> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WatchedQuote {
    BidAsk(Vec<BidAskQuote>),
    BestRoute(BestRouteQuotes),
}

/// Emitted when a recomputed quote differs meaningfully from the last one emitted, or when the
/// last one expired.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteChanged {
    pub block: BlockHeader,
    pub quote: WatchedQuote,
    pub computed_at: DateTime<Utc>,
}

/// Broadcast channel that can be closed: once closed every receiver observes the end of the
/// stream. A later `subscribe` opens a fresh channel.
#[derive(Debug, Default)]
pub(crate) struct QuoteChannel {
    sender: Mutex<Option<broadcast::Sender<QuoteChanged>>>,
}

impl QuoteChannel {
    pub(crate) fn subscribe(&self) -> broadcast::Receiver<QuoteChanged> {
        let mut sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        sender
            .get_or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Delivers to the current receivers, if any.
    pub(crate) fn send(&self, event: QuoteChanged) {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(sender) = sender.as_ref() {
            // Err only means nobody listens right now.
            let _ = sender.send(event);
        }
    }

    pub(crate) fn close(&self) {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

/// Thresholds deciding when a recomputed quote is worth emitting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChangePolicy {
    /// Lifetime of an emitted quote. A quote is emitted again after it lapses even if unchanged.
    pub quote_ttl: Duration,
    /// Relative price move tolerated before a quote counts as changed.
    pub price_tolerance: f64,
}

impl ChangePolicy {
    pub fn new(quote_ttl: Duration, price_tolerance: f64) -> Self {
        Self { quote_ttl, price_tolerance }
    }

    fn deadline(&self, from: Instant) -> Option<Instant> {
        from.checked_add(self.quote_ttl)
    }

    /// Whether `fresh` differs meaningfully from `held`.
    ///
    /// Best routes change on a different route, fee tier or protocol version, or on a quoted
    /// amount moving beyond the tolerance. Bid/ask sets change on different amounts, a side
    /// appearing or disappearing, or any price moving beyond the tolerance.
    pub fn has_changed(&self, held: &WatchedQuote, fresh: &WatchedQuote) -> bool {
        match (held, fresh) {
            (WatchedQuote::BestRoute(held), WatchedQuote::BestRoute(fresh)) => {
                let (held, fresh) = (&held.best_route_quote, &fresh.best_route_quote);
                held.route_text != fresh.route_text ||
                    held.fee_tier != fresh.fee_tier ||
                    held.protocol_version != fresh.protocol_version ||
                    self.moved(held.converted_amount, fresh.converted_amount)
            }
            (WatchedQuote::BidAsk(held), WatchedQuote::BidAsk(fresh)) => {
                held.len() != fresh.len() ||
                    held
                        .iter()
                        .zip(fresh)
                        .any(|(held, fresh)| {
                            held.amount() != fresh.amount() ||
                                self.side_moved(held.bid_price(), fresh.bid_price()) ||
                                self.side_moved(held.ask_price(), fresh.ask_price())
                        })
            }
            _ => true,
        }
    }

    fn side_moved(&self, held: Option<f64>, fresh: Option<f64>) -> bool {
        match (held, fresh) {
            (Some(held), Some(fresh)) => self.moved(held, fresh),
            (None, None) => false,
            _ => true,
        }
    }

    fn moved(&self, held: f64, fresh: f64) -> bool {
        if held == fresh {
            return false;
        }
        if held == 0.0 {
            return true;
        }
        ((fresh - held) / held).abs() > self.price_tolerance
    }
}

struct ActiveWatch {
    end_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Keeps a quote fresh while blocks arrive.
///
/// At most one watch runs at a time; starting a new one tears the previous one down first.
#[derive(Default)]
pub struct PriceWatcher {
    state: tokio::sync::Mutex<Option<ActiveWatch>>,
    channel: Arc<QuoteChannel>,
}

impl PriceWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QuoteChanged> {
        self.channel.subscribe()
    }

    pub async fn is_watching(&self) -> bool {
        self.state
            .lock()
            .await
            .as_ref()
            .is_some_and(|active| !active.task.is_finished())
    }

    /// Starts watching `blocks`, replacing any running watch. `initial` is the quote the caller
    /// already holds; only changes relative to it are emitted.
    ///
    /// Replacing a watch closes the notification channel, so receivers of the previous watch
    /// observe the end of their stream.
    pub async fn start(
        &self,
        blocks: Receiver<BlockHeader>,
        initial: WatchedQuote,
        recompute: Recompute,
        policy: ChangePolicy,
    ) {
        let mut state = self.state.lock().await;
        if let Some(active) = state.take() {
            Self::shutdown(active).await;
            self.channel.close();
            debug!("Replaced running watch");
        }
        *state = Some(self.spawn(blocks, initial, recompute, policy));
    }

    /// Like `start` but leaves a running watch untouched. Returns whether a watch was started;
    /// if not, `blocks` is dropped, ending that subscription.
    pub async fn start_if_idle(
        &self,
        blocks: Receiver<BlockHeader>,
        initial: WatchedQuote,
        recompute: Recompute,
        policy: ChangePolicy,
    ) -> bool {
        let mut state = self.state.lock().await;
        if state
            .as_ref()
            .is_some_and(|active| !active.task.is_finished())
        {
            return false;
        }
        *state = Some(self.spawn(blocks, initial, recompute, policy));
        true
    }

    /// Ends the running watch, if any, and closes the notification channel. Idempotent.
    pub async fn stop(&self) {
        let active = self.state.lock().await.take();
        if let Some(active) = active {
            Self::shutdown(active).await;
            info!("Stopped watching");
        }
        self.channel.close();
    }

    async fn shutdown(active: ActiveWatch) {
        let _ = active.end_tx.send(());
        active.task.abort();
        // Cancelled or already finished, either way it is gone.
        let _ = active.task.await;
    }

    fn spawn(
        &self,
        blocks: Receiver<BlockHeader>,
        initial: WatchedQuote,
        recompute: Recompute,
        policy: ChangePolicy,
    ) -> ActiveWatch {
        let (end_tx, end_rx) = oneshot::channel();
        let channel = self.channel.clone();
        info!(?policy, "Started watching");
        let task = tokio::spawn(run_watch(blocks, end_rx, channel, initial, recompute, policy));
        ActiveWatch { end_tx, task }
    }
}

impl Drop for PriceWatcher {
    fn drop(&mut self) {
        if let Some(active) = self.state.get_mut().take() {
            active.task.abort();
        }
    }
}

async fn run_watch(
    mut blocks: Receiver<BlockHeader>,
    mut end_rx: oneshot::Receiver<()>,
    channel: Arc<QuoteChannel>,
    initial: WatchedQuote,
    recompute: Recompute,
    policy: ChangePolicy,
) {
    let mut held = initial;
    let mut deadline = policy.deadline(Instant::now());

    loop {
        let mut block = tokio::select! {
            biased;
            _ = &mut end_rx => break,
            block = blocks.recv() => match block {
                Some(block) => block,
                None => {
                    debug!("Block stream ended");
                    channel.close();
                    break;
                }
            },
        };
        // Only the latest of a burst of blocks is worth quoting.
        while let Ok(newer) = blocks.try_recv() {
            block = newer;
        }

        let fresh = tokio::select! {
            biased;
            _ = &mut end_rx => break,
            fresh = recompute() => fresh,
        };
        let fresh = match fresh {
            Some(Ok(fresh)) => fresh,
            Some(Err(err)) => {
                warn!(%err, %block, "Failed to recompute watched quote");
                continue;
            }
            None => {
                debug!("Quote source dropped");
                channel.close();
                break;
            }
        };

        let now = Instant::now();
        let expired = deadline.is_some_and(|deadline| now >= deadline);
        if !expired && !policy.has_changed(&held, &fresh) {
            trace!(%block, "Quote unchanged");
            continue;
        }

        debug!(%block, expired, "Quote changed");
        channel.send(QuoteChanged { block, quote: fresh.clone(), computed_at: Utc::now() });
        held = fresh;
        deadline = policy.deadline(now);
    }
}
