use alloy::primitives::Address;
use tracing::trace;
use uniquote_common::models::{
    route::{AllPossibleRoutes, RouteContext},
    token::Token,
    FeeTier, ProtocolVersion,
};

/// Generates candidate paths between two tokens.
///
/// Enumeration is speculative: it never fails and does not know which pools exist. Routes through
/// missing pools revert when quoted and are pruned there.
#[derive(Clone, Debug)]
pub struct RouteEnumerator {
    base_tokens: Vec<Token>,
    wrapped_native: Address,
    max_hops: usize,
}

impl RouteEnumerator {
    pub fn new(base_tokens: Vec<Token>, wrapped_native: Address, max_hops: usize) -> Self {
        let mut unique: Vec<Token> = Vec::with_capacity(base_tokens.len());
        for token in base_tokens {
            if !unique.contains(&token) {
                unique.push(token);
            }
        }
        Self { base_tokens: unique, wrapped_native, max_hops }
    }

    /// Routes from `from` to `to` for every enabled version, in a stable order: direct route,
    /// then one-intermediary routes in base token order, then two-intermediary routes. v3 routes
    /// repeat every path once per fee tier, path-major.
    pub fn enumerate(
        &self,
        from: &Token,
        to: &Token,
        disable_multihop: bool,
        versions: &[ProtocolVersion],
    ) -> AllPossibleRoutes {
        let paths = self.intermediaries(from, to, disable_multihop);
        let mut routes = AllPossibleRoutes::default();

        if versions.contains(&ProtocolVersion::V2) {
            routes.v2 = paths
                .iter()
                .map(|via| RouteContext::v2(from.clone(), via.clone(), to.clone()))
                .collect();
        }
        if versions.contains(&ProtocolVersion::V3) {
            routes.v3 = paths
                .iter()
                .flat_map(|via| {
                    FeeTier::ALL
                        .into_iter()
                        .map(|fee| RouteContext::v3(from.clone(), via.clone(), to.clone(), fee))
                })
                .collect();
        }

        trace!(
            from = %from,
            to = %to,
            n_v2 = routes.v2.len(),
            n_v3 = routes.v3.len(),
            "Enumerated routes"
        );
        routes
    }

    fn intermediaries(&self, from: &Token, to: &Token, disable_multihop: bool) -> Vec<Vec<Token>> {
        let mut paths = vec![vec![]];
        if disable_multihop || self.max_hops == 0 {
            return paths;
        }

        let endpoints =
            [from.call_address(self.wrapped_native), to.call_address(self.wrapped_native)];
        let bases: Vec<&Token> = self
            .base_tokens
            .iter()
            .filter(|base| !endpoints.contains(&base.address))
            .collect();

        paths.extend(
            bases
                .iter()
                .map(|base| vec![(*base).clone()]),
        );
        if self.max_hops >= 2 {
            for first in &bases {
                for second in &bases {
                    if first.address != second.address {
                        paths.push(vec![(*first).clone(), (*second).clone()]);
                    }
                }
            }
        }
        paths
    }
}
