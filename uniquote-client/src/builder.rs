use std::{str::FromStr, sync::Arc, time::Duration};

use alloy::primitives::Address;
use tracing::{info, instrument};
use uniquote_common::{
    models::{network::NetworkDetails, token::Token, NATIVE_TOKEN_ADDRESS},
    traits::{NetworkProvider, TokenMetadataSource},
    QuoterError,
};
use uniquote_ethereum::{
    erc20::Erc20TokenSource,
    multicall::MulticallExecutor,
    provider::{ProviderContext, DEFAULT_POLL_INTERVAL},
    rpc::config::MulticallBatchingConfig,
};

use crate::{config::QuoterSettings, engine::QuoterEngine};

/// Wires a [`QuoterEngine`] to an Ethereum node.
pub struct QuoterBuilder {
    provider: ProviderContext,
    token_a: String,
    token_b: String,
    settings: QuoterSettings,
    batching: MulticallBatchingConfig,
    poll_interval: Duration,
}

impl QuoterBuilder {
    /// Creates a builder quoting `token_a` against `token_b`, both given as hex addresses. The
    /// native currency is requested with `0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE`.
    pub fn new(provider: ProviderContext, token_a: &str, token_b: &str) -> Self {
        Self {
            provider,
            token_a: token_a.to_string(),
            token_b: token_b.to_string(),
            settings: QuoterSettings::default(),
            batching: MulticallBatchingConfig::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn settings(mut self, settings: QuoterSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets how multicalls are split into requests. Unbounded by default.
    pub fn batching(mut self, batching: MulticallBatchingConfig) -> Self {
        self.batching = batching;
        self
    }

    /// Sets how often the node is polled for new blocks while watching.
    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Connects to the node, resolves the network and the metadata of both tokens, and creates
    /// the engine.
    ///
    /// ## Return
    /// `ConfigurationError` for malformed or identical addresses, unsupported chains, invalid
    /// settings or tokens without metadata. `NetworkFailure` when the node cannot be reached.
    #[instrument(skip(self), fields(token_a = %self.token_a, token_b = %self.token_b))]
    pub async fn build(self) -> Result<QuoterEngine, QuoterError> {
        let address_a = parse_address(&self.token_a)?;
        let address_b = parse_address(&self.token_b)?;
        if address_a == address_b {
            return Err(QuoterError::ConfigurationError(format!(
                "Token A and token B are the same address {address_a}"
            )));
        }
        self.settings.validate()?;

        let provider = self
            .provider
            .connect()
            .await?
            .with_poll_interval(self.poll_interval);
        let network = NetworkDetails::resolve(
            provider.chain_id(),
            self.settings.custom_network.clone(),
            &self.settings.contract_overrides,
        )?;

        let multicall =
            MulticallExecutor::new(provider.client().clone(), network.contracts.multicall)
                .with_batching(self.batching);
        let source = Erc20TokenSource::new(multicall.clone(), network.chain_id);
        let (token_a, token_b) = resolve_tokens(&source, address_a, address_b, &network).await?;

        info!(
            network = %network.name,
            %token_a,
            %token_b,
            versions = ?self.settings.enabled_versions(),
            "Quoter ready"
        );
        QuoterEngine::new(
            token_a,
            token_b,
            self.settings,
            network,
            Arc::new(multicall),
            Arc::new(provider),
        )
    }
}

fn parse_address(address: &str) -> Result<Address, QuoterError> {
    Address::from_str(address.trim()).map_err(|err| {
        QuoterError::ConfigurationError(format!("Invalid token address {address}: {err}"))
    })
}

/// Looks up both tokens. The native placeholder is not looked up, it mirrors the wrapped native
/// token of the network.
pub(crate) async fn resolve_tokens(
    source: &dyn TokenMetadataSource,
    token_a: Address,
    token_b: Address,
    network: &NetworkDetails,
) -> Result<(Token, Token), QuoterError> {
    let lookups: Vec<Address> = [token_a, token_b]
        .into_iter()
        .filter(|address| *address != NATIVE_TOKEN_ADDRESS)
        .collect();
    let tokens = if lookups.is_empty() { Vec::new() } else { source.get_tokens(lookups).await? };

    let find = |address: Address| {
        if address == NATIVE_TOKEN_ADDRESS {
            return Ok(native_token(network));
        }
        tokens
            .iter()
            .find(|token| token.address == address)
            .cloned()
            .ok_or_else(|| {
                QuoterError::ConfigurationError(format!(
                    "No token metadata for {address} on {}",
                    network.name
                ))
            })
    };
    Ok((find(token_a)?, find(token_b)?))
}

fn native_token(network: &NetworkDetails) -> Token {
    let wrapped = &network.wrapped_native;
    let symbol = wrapped
        .symbol
        .strip_prefix('W')
        .unwrap_or(&wrapped.symbol);
    Token::new(NATIVE_TOKEN_ADDRESS, symbol, wrapped.decimals, network.chain_id)
}
