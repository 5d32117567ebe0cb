use alloy::primitives::Address;
use async_trait::async_trait;
use tokio::sync::mpsc::Receiver;

use crate::{
    models::{
        blockchain::BlockHeader,
        call::{BatchResults, ContractCallContext},
        token::Token,
    },
    QuoterError,
};

/// Runs batches of read-only contract calls.
#[cfg_attr(feature = "test-utils", mockall::automock)]
#[async_trait]
pub trait BatchCallExecutor: Send + Sync {
    /// Executes every call of every context and returns one result per call.
    ///
    /// # Parameters
    /// * `contexts` - The calls to run, grouped by target contract.
    ///
    /// # Returns
    /// A `ContractCallResults` per context carrying the same `reference`. A reverted call is
    /// reported with `success = false`; only a failure of the batch as a whole is an error
    /// (`QuoterError::NetworkFailure`). The whole batch resolves at once, there is no partial
    /// delivery.
    async fn execute(&self, contexts: Vec<ContractCallContext>)
        -> Result<BatchResults, QuoterError>;
}

/// Retrieves token metadata (decimals and symbol).
#[cfg_attr(feature = "test-utils", mockall::automock)]
#[async_trait]
pub trait TokenMetadataSource: Send + Sync {
    /// Returns the metadata of every address that resolves to a token. Addresses that do not
    /// are left out of the result rather than failing the call.
    async fn get_tokens(&self, addresses: Vec<Address>) -> Result<Vec<Token>, QuoterError>;
}

/// Connection to a chain: its identity and its new block notifications.
#[cfg_attr(feature = "test-utils", mockall::automock)]
#[async_trait]
pub trait NetworkProvider: Send + Sync {
    fn chain_id(&self) -> u64;

    /// Subscribes to new blocks. Dropping the receiver ends the subscription.
    async fn subscribe_blocks(&self) -> Result<Receiver<BlockHeader>, QuoterError>;
}
