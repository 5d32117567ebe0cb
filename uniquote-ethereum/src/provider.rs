use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::Receiver;
use tracing::{info, instrument};
use uniquote_common::{
    models::{blockchain::BlockHeader, Chain},
    traits::NetworkProvider,
    QuoterError,
};

use crate::{blocks::BlockPoller, EthereumRpcClient};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(4);

/// The ways a caller can point the quoter at a chain.
#[derive(Clone, Debug)]
pub enum ProviderContext {
    /// An already configured client; the chain id is asked from the node.
    Client(EthereumRpcClient),
    /// A built-in chain, reached through its default public endpoint.
    ChainId(u64),
    /// Any node URL, expected to serve `chain_id`.
    ProviderUrl { chain_id: u64, url: String },
}

impl ProviderContext {
    /// Resolves the context into a connected provider.
    ///
    /// ## Return
    /// `ConfigurationError` for an unsupported chain id passed alone, a malformed URL or a node
    /// serving another chain than requested. `NetworkFailure` when the node cannot be reached.
    #[instrument(skip(self))]
    pub async fn connect(self) -> Result<EthereumProvider, QuoterError> {
        let (client, chain_id) = match self {
            ProviderContext::Client(client) => {
                let chain_id = client.get_chain_id().await?;
                (client, chain_id)
            }
            ProviderContext::ChainId(chain_id) => {
                let chain = Chain::try_from(chain_id)?;
                (EthereumRpcClient::new(chain.default_rpc_url())?, chain_id)
            }
            ProviderContext::ProviderUrl { chain_id, url } => {
                let client = EthereumRpcClient::new(&url)?;
                let node_chain_id = client.get_chain_id().await?;
                if node_chain_id != chain_id {
                    return Err(QuoterError::ConfigurationError(format!(
                        "Node at {url} serves chain {node_chain_id}, expected {chain_id}"
                    )));
                }
                (client, chain_id)
            }
        };

        info!(chain_id, url = client.get_url(), "Connected provider");
        Ok(EthereumProvider::new(client, chain_id))
    }
}

#[derive(Clone, Debug)]
pub struct EthereumProvider {
    client: EthereumRpcClient,
    chain_id: u64,
    poll_interval: Duration,
}

impl EthereumProvider {
    pub fn new(client: EthereumRpcClient, chain_id: u64) -> Self {
        Self { client, chain_id, poll_interval: DEFAULT_POLL_INTERVAL }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn client(&self) -> &EthereumRpcClient {
        &self.client
    }
}

#[async_trait]
impl NetworkProvider for EthereumProvider {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn subscribe_blocks(&self) -> Result<Receiver<BlockHeader>, QuoterError> {
        Ok(BlockPoller::new(self.client.clone(), self.poll_interval)
            .start()
            .await?)
    }
}
