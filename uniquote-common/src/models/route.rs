use alloy::primitives::Address;
use serde::Serialize;

use super::{token::Token, FeeTier, ProtocolVersion};

/// A candidate swap path.
///
/// Always holds at least two tokens and, for v3, exactly one fee tier that applies to every hop.
/// Routes are only built by their constructors so both invariants hold for every instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RouteContext {
    route: Vec<Token>,
    fee_tier: Option<FeeTier>,
    protocol_version: ProtocolVersion,
}

impl RouteContext {
    /// A constant product route `from > via.. > to`.
    pub fn v2(from: Token, via: Vec<Token>, to: Token) -> Self {
        Self {
            route: Self::path(from, via, to),
            fee_tier: None,
            protocol_version: ProtocolVersion::V2,
        }
    }

    /// A concentrated liquidity route `from > via.. > to` through pools of the given fee tier.
    pub fn v3(from: Token, via: Vec<Token>, to: Token, fee_tier: FeeTier) -> Self {
        Self {
            route: Self::path(from, via, to),
            fee_tier: Some(fee_tier),
            protocol_version: ProtocolVersion::V3,
        }
    }

    fn path(from: Token, via: Vec<Token>, to: Token) -> Vec<Token> {
        let mut route = Vec::with_capacity(via.len() + 2);
        route.push(from);
        route.extend(via);
        route.push(to);
        route
    }

    pub fn route(&self) -> &[Token] {
        &self.route
    }

    pub fn fee_tier(&self) -> Option<FeeTier> {
        self.fee_tier
    }

    pub fn protocol_version(&self) -> ProtocolVersion {
        self.protocol_version
    }

    pub fn from_token(&self) -> &Token {
        &self.route[0]
    }

    pub fn to_token(&self) -> &Token {
        &self.route[self.route.len() - 1]
    }

    pub fn is_direct(&self) -> bool {
        self.route.len() == 2
    }

    /// Human readable path, e.g. `FUN > WETH > REP`.
    pub fn route_text(&self) -> String {
        self.route
            .iter()
            .map(|t| t.symbol.as_str())
            .collect::<Vec<_>>()
            .join(" > ")
    }

    pub fn route_path_array(&self) -> Vec<Address> {
        self.route
            .iter()
            .map(|t| t.address)
            .collect()
    }

    /// Path addresses as they go into calldata.
    pub fn call_path(&self, wrapped_native: Address) -> Vec<Address> {
        self.route
            .iter()
            .map(|t| t.call_address(wrapped_native))
            .collect()
    }
}

/// Candidate routes of one direction, partitioned by protocol version because pool existence and
/// call shapes differ per version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AllPossibleRoutes {
    pub v2: Vec<RouteContext>,
    pub v3: Vec<RouteContext>,
}

impl AllPossibleRoutes {
    pub fn get(&self, version: ProtocolVersion) -> &[RouteContext] {
        match version {
            ProtocolVersion::V2 => &self.v2,
            ProtocolVersion::V3 => &self.v3,
        }
    }

    pub fn len(&self) -> usize {
        self.v2.len() + self.v3.len()
    }

    pub fn is_empty(&self) -> bool {
        self.v2.is_empty() && self.v3.is_empty()
    }
}
