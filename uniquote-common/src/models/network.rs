use alloy::primitives::{address, Address};
use serde::{Deserialize, Serialize};

use super::{token::Token, Chain};
use crate::QuoterError;

/// Multicall3, deployed at the same address on every supported chain.
pub const MULTICALL3_ADDRESS: Address = address!("cA11bde05977b3631167028862bE2a173976CA11");

/// Quoter (v1) of the concentrated liquidity deployment.
pub const V3_QUOTER_ADDRESS: Address = address!("b27308f9F90D607463bb33eA1BeBb41C27CE5AB6");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAddresses {
    pub v2_router: Address,
    pub v3_quoter: Address,
    pub multicall: Address,
}

impl ContractAddresses {
    pub fn for_chain(chain: Chain) -> Self {
        let v2_router = match chain {
            Chain::Ethereum => address!("7a250d5630B4cF539739dF2C5dAcb4c659F2488D"),
            Chain::Arbitrum => address!("4752ba5DBc23f44D87826276BF6Fd6b1C372aD24"),
            Chain::Optimism => address!("4A7b5Da61326A6379179b40d00F57E5bbDC962c2"),
            Chain::Polygon => address!("edf6066a2b290C185783862C7F4776A2C8077AD1"),
        };
        Self { v2_router, v3_quoter: V3_QUOTER_ADDRESS, multicall: MULTICALL3_ADDRESS }
    }
}

/// Addresses of a cloned deployment (a fork of the protocol) replacing the canonical ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractOverrides {
    pub v2_router: Option<Address>,
    pub v3_quoter: Option<Address>,
}

/// Everything the engine needs to know about the chain it quotes on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkDetails {
    pub name: String,
    pub chain_id: u64,
    pub contracts: ContractAddresses,
    pub wrapped_native: Token,
    /// Intermediaries tried for multihop routes, in routing order.
    pub base_tokens: Vec<Token>,
}

impl NetworkDetails {
    pub fn for_chain(chain: Chain) -> Self {
        Self {
            name: chain.to_string(),
            chain_id: chain.id(),
            contracts: ContractAddresses::for_chain(chain),
            wrapped_native: chain.wrapped_native_token(),
            base_tokens: chain.base_tokens(),
        }
    }

    /// Picks the custom network when one is configured, the built-in chain otherwise, and
    /// applies contract overrides on top.
    ///
    /// Fails for a chain id that is neither built in nor matching the custom network.
    pub fn resolve(
        chain_id: u64,
        custom_network: Option<NetworkDetails>,
        overrides: &ContractOverrides,
    ) -> Result<Self, QuoterError> {
        let mut details = match custom_network {
            Some(custom) if custom.chain_id == chain_id => custom,
            Some(custom) => {
                return Err(QuoterError::ConfigurationError(format!(
                    "Provider is connected to chain {chain_id} but the custom network {} \
                    declares chain {}",
                    custom.name, custom.chain_id
                )))
            }
            None => Self::for_chain(Chain::try_from(chain_id)?),
        };

        if let Some(router) = overrides.v2_router {
            details.contracts.v2_router = router;
        }
        if let Some(quoter) = overrides.v3_quoter {
            details.contracts.v3_quoter = quoter;
        }
        Ok(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn custom(chain_id: u64) -> NetworkDetails {
        let wrapped = Token::new(Address::repeat_byte(0x11), "WNATIVE", 18, chain_id);
        NetworkDetails {
            name: "devnet".to_string(),
            chain_id,
            contracts: ContractAddresses {
                v2_router: Address::repeat_byte(0x01),
                v3_quoter: Address::repeat_byte(0x02),
                multicall: Address::repeat_byte(0x03),
            },
            wrapped_native: wrapped.clone(),
            base_tokens: vec![wrapped],
        }
    }

    #[test]
    fn test_resolve_builtin_chain() {
        let details = NetworkDetails::resolve(1, None, &ContractOverrides::default()).unwrap();

        assert_eq!(details.name, "ethereum");
        assert_eq!(details.contracts.multicall, MULTICALL3_ADDRESS);
        assert_eq!(details.wrapped_native.symbol, "WETH");
    }

    #[test]
    fn test_resolve_unsupported_chain() {
        let res = NetworkDetails::resolve(31337, None, &ContractOverrides::default());

        assert!(matches!(res, Err(QuoterError::ConfigurationError(_))));
    }

    #[test]
    fn test_resolve_custom_network() {
        let details =
            NetworkDetails::resolve(31337, Some(custom(31337)), &ContractOverrides::default())
                .unwrap();

        assert_eq!(details, custom(31337));
    }

    #[test]
    fn test_resolve_custom_network_chain_mismatch() {
        let res = NetworkDetails::resolve(1, Some(custom(31337)), &ContractOverrides::default());

        assert!(matches!(res, Err(QuoterError::ConfigurationError(_))));
    }

    #[test]
    fn test_resolve_applies_overrides() {
        let overrides =
            ContractOverrides { v2_router: Some(Address::repeat_byte(0xaa)), v3_quoter: None };

        let details = NetworkDetails::resolve(1, None, &overrides).unwrap();

        assert_eq!(details.contracts.v2_router, Address::repeat_byte(0xaa));
        assert_eq!(details.contracts.v3_quoter, V3_QUOTER_ADDRESS);
    }
}
