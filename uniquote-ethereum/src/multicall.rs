use alloy::{
    primitives::{Address, Bytes},
    sol_types::SolCall,
};
use async_trait::async_trait;
use futures03::future::try_join_all;
use tracing::{debug, instrument, trace};
use uniquote_common::{
    models::call::{
        BatchResults, CallReturnContext, ContractCall, ContractCallContext, ContractCallResults,
    },
    traits::BatchCallExecutor,
    QuoterError,
};

use crate::{
    abi::{
        self,
        IMulticall3::{aggregate3Call, Call3, Call3Result},
    },
    rpc::config::MulticallBatchingConfig,
    EthereumRpcClient, RPCError,
};

/// Runs contract calls through Multicall3 `aggregate3` with `allowFailure` set, so a reverting
/// call only marks its own result as failed.
#[derive(Clone, Debug)]
pub struct MulticallExecutor {
    client: EthereumRpcClient,
    multicall: Address,
    batching: MulticallBatchingConfig,
}

impl MulticallExecutor {
    pub fn new(client: EthereumRpcClient, multicall: Address) -> Self {
        Self { client, multicall, batching: MulticallBatchingConfig::default() }
    }

    pub fn with_batching(mut self, batching: MulticallBatchingConfig) -> Self {
        self.batching = batching;
        self
    }

    /// Sends `calls` through `aggregate3` and returns one result per call, in order.
    #[instrument(level = "debug", skip_all, fields(n_calls = calls.len()))]
    pub(crate) async fn aggregate(&self, calls: Vec<Call3>) -> Result<Vec<Call3Result>, RPCError> {
        if calls.is_empty() {
            return Ok(Vec::new());
        }

        let chunk_size = self
            .batching
            .max_calls_per_request()
            .unwrap_or(calls.len());
        let mut chunks = Vec::new();
        let mut remaining = calls.into_iter();
        loop {
            let chunk: Vec<Call3> = remaining
                .by_ref()
                .take(chunk_size)
                .collect();
            if chunk.is_empty() {
                break;
            }
            chunks.push(chunk);
        }
        trace!(n_chunks = chunks.len(), "Sending aggregate3 requests");

        let responses = try_join_all(
            chunks
                .into_iter()
                .map(|chunk| self.aggregate_chunk(chunk)),
        )
        .await?;

        Ok(responses
            .into_iter()
            .flatten()
            .collect())
    }

    async fn aggregate_chunk(&self, calls: Vec<Call3>) -> Result<Vec<Call3Result>, RPCError> {
        let expected = calls.len();
        let data: Bytes = aggregate3Call { calls }
            .abi_encode()
            .into();

        let output = self
            .client
            .eth_call(self.multicall, data)
            .await?;

        let results = aggregate3Call::abi_decode_returns(&output)
            .map_err(|e| RPCError::DecodeError(format!("Failed to decode aggregate3: {e}")))?;

        if results.len() != expected {
            return Err(RPCError::DecodeError(format!(
                "aggregate3 returned {} results for {expected} calls",
                results.len()
            )));
        }
        Ok(results)
    }

    async fn execute_context(
        &self,
        context: ContractCallContext,
    ) -> Result<ContractCallResults, RPCError> {
        let target = context.contract_address;
        let calls = context
            .calls
            .iter()
            .map(|call| Call3 {
                target,
                allowFailure: true,
                callData: abi::encode_quote_call(&call.method),
            })
            .collect();

        let results = self.aggregate(calls).await?;

        let calls = context
            .calls
            .into_iter()
            .zip(results)
            .map(|(call, result)| to_return_context(call, result))
            .collect();

        Ok(ContractCallResults { reference: context.reference, calls })
    }
}

fn to_return_context(call: ContractCall, result: Call3Result) -> CallReturnContext {
    let method_name = call.method.name();
    if !result.success {
        return CallReturnContext::failure(call.tag, method_name);
    }

    match abi::decode_quote_return(&call.method, &result.returnData) {
        Ok(values) => CallReturnContext::success(call.tag, method_name, values),
        Err(err) => {
            debug!(method_name, %err, "Undecodable return data, treating call as reverted");
            CallReturnContext::failure(call.tag, method_name)
        }
    }
}

#[async_trait]
impl BatchCallExecutor for MulticallExecutor {
    async fn execute(
        &self,
        contexts: Vec<ContractCallContext>,
    ) -> Result<BatchResults, QuoterError> {
        let results = try_join_all(
            contexts
                .into_iter()
                .map(|context| self.execute_context(context)),
        )
        .await?;

        Ok(BatchResults { results })
    }
}
