use std::time::Duration;

use alloy::{
    primitives::{Address, Bytes, U64},
    rpc::{
        client::{ClientBuilder, ReqwestClient},
        types::{Block, BlockNumberOrTag, TransactionInput, TransactionRequest},
    },
    transports::http::reqwest,
};
use tracing::instrument;
use uniquote_common::models::blockchain::BlockHeader;
use url::Url;

use crate::rpc::errors::{RPCError, RequestError, RpcResultExt};

pub mod config;
pub mod errors;

/// This struct wraps the ReqwestClient and provides the Ethereum RPC methods the quoter needs.
/// It is cheap to clone, as the `inner` internally uses an Arc for the ReqwestClient.
#[derive(Clone, Debug)]
pub struct EthereumRpcClient {
    inner: ReqwestClient,
    url: String,
}

impl EthereumRpcClient {
    /// Creates a new EthereumRpcClient with the given RPC URL.
    pub fn new(rpc_url: &str) -> Result<Self, RPCError> {
        let url: Url = rpc_url
            .parse()
            .map_err(|e| RPCError::SetupError(format!("Invalid RPC URL: {e}")))?;

        let http_client = reqwest::ClientBuilder::new()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| RPCError::SetupError(format!("Failed to create HTTP client: {e}")))?;

        let rpc = ClientBuilder::default().http_with_client(http_client, url);

        Ok(Self { inner: rpc, url: rpc_url.to_string() })
    }

    pub fn get_url(&self) -> &str {
        &self.url
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn get_chain_id(&self) -> Result<u64, RPCError> {
        let chain_id: U64 = self
            .inner
            .request_noparams("eth_chainId")
            .await
            .rpc_context("Failed to get chain id")?;

        Ok(chain_id.to::<u64>())
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn get_block_number(&self) -> Result<u64, RPCError> {
        let block_number: U64 = self
            .inner
            .request_noparams("eth_blockNumber")
            .await
            .rpc_context("Failed to get block number")?;

        Ok(block_number.to::<u64>())
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn get_block_header(&self, number: u64) -> Result<BlockHeader, RPCError> {
        let full_tx_objects = false;

        let block: Option<Block> = self
            .inner
            .request("eth_getBlockByNumber", (BlockNumberOrTag::Number(number), full_tx_objects))
            .await
            .with_rpc_context(|| format!("Failed to get block {number}"))?;

        let block = block.ok_or_else(|| {
            RPCError::RequestError(RequestError::Other(format!(
                "Failed to get block {number}: Block not found"
            )))
        })?;

        Ok(BlockHeader::new(
            block.header.number,
            block.header.hash,
            block.header.parent_hash,
            block.header.timestamp,
        ))
    }

    /// Executes a read-only message call against the latest block.
    /// See https://ethereum.org/en/developers/docs/apis/json-rpc/#eth_call
    ///
    /// Returns the output data from the call or an error if the call failed.
    #[instrument(level = "debug", skip(self, data), fields(data_len = data.len()))]
    pub async fn eth_call(&self, to: Address, data: Bytes) -> Result<Bytes, RPCError> {
        let request = TransactionRequest::default()
            .to(to)
            .input(TransactionInput::new(data));
        let block = BlockNumberOrTag::Latest;

        self.inner
            .request("eth_call", (&request, block))
            .await
            .with_rpc_context(|| format!("Failed to send an eth_call request to {to}"))
    }
}
