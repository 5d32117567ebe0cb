use std::time::Duration;

use tokio::{
    sync::mpsc::{self, Receiver},
    time::MissedTickBehavior,
};
use tracing::{debug, info, warn};
use uniquote_common::models::blockchain::BlockHeader;

use crate::{EthereumRpcClient, RPCError};

/// Emits a header every time the node reports a higher block number.
///
/// Blocks mined between two polls are not replayed, only the latest one is emitted.
#[derive(Clone, Debug)]
pub struct BlockPoller {
    client: EthereumRpcClient,
    poll_interval: Duration,
}

impl BlockPoller {
    pub fn new(client: EthereumRpcClient, poll_interval: Duration) -> Self {
        Self { client, poll_interval }
    }

    /// Reads the current head and starts polling in the background. The head at start time is
    /// not emitted. Polling stops once the receiver is dropped.
    pub async fn start(&self) -> Result<Receiver<BlockHeader>, RPCError> {
        let mut last_seen = self.client.get_block_number().await?;
        let (tx, rx) = mpsc::channel(16);
        let client = self.client.clone();
        let poll_interval = self.poll_interval;

        info!(start_block = last_seen, ?poll_interval, "Starting block poller");
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(poll_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately.
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = tx.closed() => break,
                    _ = interval.tick() => {}
                }

                let number = match client.get_block_number().await {
                    Ok(number) => number,
                    Err(err) => {
                        warn!(%err, "Failed to poll block number");
                        continue;
                    }
                };
                if number <= last_seen {
                    continue;
                }

                match client.get_block_header(number).await {
                    Ok(header) => {
                        debug!(%header, "New block");
                        last_seen = number;
                        if tx.send(header).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => warn!(%err, number, "Failed to fetch block header"),
                }
            }
            debug!("Block poller stopped");
        });

        Ok(rx)
    }
}
