pub mod blockchain;
pub mod call;
pub mod error;
pub mod network;
pub mod quote;
pub mod route;
pub mod token;

use alloy::primitives::{address, Address};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use token::Token;

use crate::QuoterError;

/// Placeholder address wallets and aggregators use for the chain's native currency. It never
/// reaches calldata, the wrapped native token is quoted instead.
pub const NATIVE_TOKEN_ADDRESS: Address = address!("EeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Chain {
    #[default]
    Ethereum,
    Arbitrum,
    Optimism,
    Polygon,
}

impl Chain {
    pub fn id(&self) -> u64 {
        match self {
            Chain::Ethereum => 1,
            Chain::Optimism => 10,
            Chain::Polygon => 137,
            Chain::Arbitrum => 42161,
        }
    }

    /// Public endpoint used when a caller only knows the chain id.
    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Chain::Ethereum => "https://ethereum-rpc.publicnode.com",
            Chain::Arbitrum => "https://arbitrum-one-rpc.publicnode.com",
            Chain::Optimism => "https://optimism-rpc.publicnode.com",
            Chain::Polygon => "https://polygon-bor-rpc.publicnode.com",
        }
    }

    /// Returns the wrapped native token for the chain.
    pub fn wrapped_native_token(&self) -> Token {
        match self {
            Chain::Ethereum => self.token(
                address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"),
                "WETH",
                18,
            ),
            Chain::Arbitrum => self.token(
                address!("82aF49447D8a07e3bd95BD0d56f35241523fBab1"),
                "WETH",
                18,
            ),
            Chain::Optimism => self.token(
                address!("4200000000000000000000000000000000000006"),
                "WETH",
                18,
            ),
            Chain::Polygon => self.token(
                address!("0d500B1d8E8eF31E21C99d1Db9A6444d3ADf1270"),
                "WMATIC",
                18,
            ),
        }
    }

    /// High liquidity tokens tried as intermediaries of multihop routes, in routing order.
    pub fn base_tokens(&self) -> Vec<Token> {
        match self {
            Chain::Ethereum => vec![
                self.token(address!("dAC17F958D2ee523a2206206994597C13D831ec7"), "USDT", 6),
                self.token(address!("c00e94Cb662C3520282E6f5717214004A7f26888"), "COMP", 18),
                self.token(address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"), "USDC", 6),
                self.token(address!("6B175474E89094C44Da98b954EedeAC495271d0F"), "DAI", 18),
                self.wrapped_native_token(),
                self.token(address!("2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599"), "WBTC", 8),
            ],
            Chain::Arbitrum => vec![
                self.token(address!("Fd086bC7CD5C481DCC9C85ebE478A1C0b69FCbb9"), "USDT", 6),
                self.token(address!("af88d065e77c8cC2239327C5EDb3A432268e5831"), "USDC", 6),
                self.token(address!("DA10009cBd5D07dd0CeCc66161FC93D7c9000da1"), "DAI", 18),
                self.wrapped_native_token(),
                self.token(address!("2f2a2543B76A4166549F7aaB2e75Bef0aefC5B0f"), "WBTC", 8),
            ],
            Chain::Optimism => vec![
                self.token(address!("94b008aA00579c1307B0EF2c499aD98a8ce58e58"), "USDT", 6),
                self.token(address!("0b2C639c533813f4Aa9D7837CAf62653d097Ff85"), "USDC", 6),
                self.token(address!("DA10009cBd5D07dd0CeCc66161FC93D7c9000da1"), "DAI", 18),
                self.wrapped_native_token(),
                self.token(address!("68f180fcCe6836688e9084f035309E29Bf0A2095"), "WBTC", 8),
            ],
            Chain::Polygon => vec![
                self.token(address!("c2132D05D31c914a87C6611C10748AEb04B58e8F"), "USDT", 6),
                self.token(address!("2791Bca1f2de4661ED88A30C99A7a9449Aa84174"), "USDC", 6),
                self.token(address!("8f3Cf7ad23Cd3CaDbD9735AFf958023239c6A063"), "DAI", 18),
                self.token(address!("7ceB23fD6bC0adD59E62ac25578270cFf1b9f619"), "WETH", 18),
                self.token(address!("1BFD67037B42Cf73acF2047067bd4F2C47D9BfD6"), "WBTC", 8),
                self.wrapped_native_token(),
            ],
        }
    }

    fn token(&self, address: Address, symbol: &str, decimals: u32) -> Token {
        Token::new(address, symbol, decimals, self.id())
    }
}

impl TryFrom<u64> for Chain {
    type Error = QuoterError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Chain::Ethereum),
            10 => Ok(Chain::Optimism),
            137 => Ok(Chain::Polygon),
            42161 => Ok(Chain::Arbitrum),
            other => Err(QuoterError::ConfigurationError(format!(
                "ChainId {other} is not supported. Supported chains: ethereum (1), optimism (10), \
                polygon (137), arbitrum (42161). Configure a custom network for anything else"
            ))),
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumString,
    Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProtocolVersion {
    V2,
    V3,
}

impl ProtocolVersion {
    pub const ALL: [ProtocolVersion; 2] = [ProtocolVersion::V2, ProtocolVersion::V3];
}

/// Fee tiers of concentrated liquidity pools, in hundredths of a basis point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub enum FeeTier {
    Lowest,
    Low,
    Medium,
    High,
}

impl FeeTier {
    pub const ALL: [FeeTier; 4] = [FeeTier::Lowest, FeeTier::Low, FeeTier::Medium, FeeTier::High];

    pub fn as_u32(&self) -> u32 {
        match self {
            FeeTier::Lowest => 100,
            FeeTier::Low => 500,
            FeeTier::Medium => 3000,
            FeeTier::High => 10000,
        }
    }

    /// Liquidity provider fee as a percentage, e.g. 0.3 for the 3000 tier.
    pub fn percent(&self) -> f64 {
        self.as_u32() as f64 / 10_000.0
    }

    pub fn from_percent(percent: f64) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|tier| (tier.percent() - percent).abs() < f64::EPSILON)
    }
}

impl From<FeeTier> for u32 {
    fn from(value: FeeTier) -> Self {
        value.as_u32()
    }
}

impl TryFrom<u32> for FeeTier {
    type Error = QuoterError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        FeeTier::ALL
            .into_iter()
            .find(|tier| tier.as_u32() == value)
            .ok_or_else(|| QuoterError::ConfigurationError(format!("Unknown fee tier {value}")))
    }
}

impl std::fmt::Display for FeeTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.percent())
    }
}
