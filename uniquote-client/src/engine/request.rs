use alloy::primitives::{Address, U256};
use rust_decimal::Decimal;
use uniquote_common::{
    models::{
        call::{ContractCallContext, QuoteMethod},
        network::ContractAddresses,
        quote::{CallTag, QuoteSide, TradeDirection},
        route::{AllPossibleRoutes, RouteContext},
        token::Token,
        FeeTier, ProtocolVersion,
    },
    QuoterError,
};

/// Turns routes and trade amounts into tagged read-only calls, one context per protocol version.
#[derive(Clone, Debug)]
pub struct QuoteRequestBuilder {
    contracts: ContractAddresses,
    wrapped_native: Address,
}

impl QuoteRequestBuilder {
    pub fn new(contracts: ContractAddresses, wrapped_native: Address) -> Self {
        Self { contracts, wrapped_native }
    }

    /// Builds the bid/ask batch of a pair.
    ///
    /// Every trade amount is an amount of token A (the source of `routes_a_to_b`). Bids sell it
    /// along A→B routes, asks buy it with token B along B→A routes.
    ///
    /// ## Return
    /// `InvalidAmount` if an amount is not positive or vanishes in token A's precision.
    pub fn build_batch(
        &self,
        routes_a_to_b: &AllPossibleRoutes,
        routes_b_to_a: &AllPossibleRoutes,
        trade_amounts: &[Decimal],
        versions: &[ProtocolVersion],
    ) -> Result<Vec<ContractCallContext>, QuoterError> {
        let mut contexts = Vec::with_capacity(versions.len());
        for &version in versions {
            let mut context = ContractCallContext::new(version, self.target(version));
            let bid_routes = routes_a_to_b.get(version);
            let ask_routes = routes_b_to_a.get(version);

            for &amount in trade_amounts {
                for (idx, route) in bid_routes.iter().enumerate() {
                    let raw = route.from_token().to_raw_amount(amount)?;
                    context.push(
                        CallTag::new(idx, amount, QuoteSide::Bid),
                        self.exact_input(route, raw),
                    );
                }
                for (idx, route) in ask_routes.iter().enumerate() {
                    let raw = route.to_token().to_raw_amount(amount)?;
                    context.push(
                        CallTag::new(idx, amount, QuoteSide::Ask),
                        self.exact_output(route, raw),
                    );
                }
            }

            if !context.is_empty() {
                contexts.push(context);
            }
        }
        Ok(contexts)
    }

    /// Builds the batch quoting each route of one direction on its own.
    ///
    /// With `TradeDirection::Input` the amount is sold (token `from` units) and each call
    /// returns the output; with `TradeDirection::Output` the amount is bought (token `to` units)
    /// and each call returns the required input.
    pub fn build_route_batch(
        &self,
        routes: &AllPossibleRoutes,
        amount: Decimal,
        direction: TradeDirection,
        versions: &[ProtocolVersion],
    ) -> Result<Vec<ContractCallContext>, QuoterError> {
        let mut contexts = Vec::with_capacity(versions.len());
        for &version in versions {
            let mut context = ContractCallContext::new(version, self.target(version));
            for (idx, route) in routes.get(version).iter().enumerate() {
                let (side, method) = match direction {
                    TradeDirection::Input => {
                        let raw = route.from_token().to_raw_amount(amount)?;
                        (QuoteSide::Bid, self.exact_input(route, raw))
                    }
                    TradeDirection::Output => {
                        let raw = route.to_token().to_raw_amount(amount)?;
                        (QuoteSide::Ask, self.exact_output(route, raw))
                    }
                };
                context.push(CallTag::new(idx, amount, side), method);
            }

            if !context.is_empty() {
                contexts.push(context);
            }
        }
        Ok(contexts)
    }

    fn target(&self, version: ProtocolVersion) -> Address {
        match version {
            ProtocolVersion::V2 => self.contracts.v2_router,
            ProtocolVersion::V3 => self.contracts.v3_quoter,
        }
    }

    /// Call selling `amount_in` of the route's first token.
    fn exact_input(&self, route: &RouteContext, amount_in: U256) -> QuoteMethod {
        let path = route.call_path(self.wrapped_native);
        match v3_fee(route) {
            None => QuoteMethod::GetAmountsOut { amount_in, path },
            Some(fee) if route.is_direct() => QuoteMethod::QuoteExactInputSingle {
                token_in: path[0],
                token_out: path[1],
                fee,
                amount_in,
                sqrt_price_limit_x96: U256::ZERO,
            },
            Some(fee) => QuoteMethod::QuoteExactInput { path, fee, amount_in },
        }
    }

    /// Call buying `amount_out` of the route's last token.
    fn exact_output(&self, route: &RouteContext, amount_out: U256) -> QuoteMethod {
        let path = route.call_path(self.wrapped_native);
        match v3_fee(route) {
            None => QuoteMethod::GetAmountsIn { amount_out, path },
            Some(fee) if route.is_direct() => QuoteMethod::QuoteExactOutputSingle {
                token_in: path[0],
                token_out: path[1],
                fee,
                amount_out,
                sqrt_price_limit_x96: U256::ZERO,
            },
            Some(fee) => QuoteMethod::QuoteExactOutput { path, fee, amount_out },
        }
    }
}

fn v3_fee(route: &RouteContext) -> Option<FeeTier> {
    match route.protocol_version() {
        ProtocolVersion::V2 => None,
        ProtocolVersion::V3 => route.fee_tier(),
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use uniquote_common::models::{network::ContractAddresses, Chain, NATIVE_TOKEN_ADDRESS};

    use super::*;
    use crate::{
        engine::routes::RouteEnumerator,
        test_fixtures::{fun, rep, weth},
    };

    fn builder() -> QuoteRequestBuilder {
        QuoteRequestBuilder::new(
            ContractAddresses::for_chain(Chain::Ethereum),
            Chain::Ethereum.wrapped_native_token().address,
        )
    }

    fn routes(from: &Token, to: &Token, disable_multihop: bool) -> AllPossibleRoutes {
        let chain = Chain::Ethereum;
        RouteEnumerator::new(chain.base_tokens(), chain.wrapped_native_token().address, 1)
            .enumerate(from, to, disable_multihop, &ProtocolVersion::ALL)
    }

    #[test]
    fn test_build_batch_one_context_per_version() {
        let contracts = ContractAddresses::for_chain(Chain::Ethereum);
        let amounts = [Decimal::ONE, Decimal::TEN];

        let batch = builder()
            .build_batch(
                &routes(&fun(), &rep(), true),
                &routes(&rep(), &fun(), true),
                &amounts,
                &ProtocolVersion::ALL,
            )
            .unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].reference, ProtocolVersion::V2);
        assert_eq!(batch[0].contract_address, contracts.v2_router);
        // 2 amounts * (1 bid + 1 ask)
        assert_eq!(batch[0].calls.len(), 4);
        assert_eq!(batch[1].reference, ProtocolVersion::V3);
        assert_eq!(batch[1].contract_address, contracts.v3_quoter);
        // 2 amounts * 4 fee tiers * (1 bid + 1 ask)
        assert_eq!(batch[1].calls.len(), 16);
    }

    #[test]
    fn test_build_batch_v2_calls() {
        let batch = builder()
            .build_batch(
                &routes(&fun(), &rep(), true),
                &routes(&rep(), &fun(), true),
                &[Decimal::from(10_000)],
                &[ProtocolVersion::V2],
            )
            .unwrap();

        let calls = &batch[0].calls;
        assert_eq!(calls[0].tag, CallTag::new(0, Decimal::from(10_000), QuoteSide::Bid));
        assert_eq!(
            calls[0].method,
            QuoteMethod::GetAmountsOut {
                amount_in: U256::from(10_000u64 * 100_000_000),
                path: vec![fun().address, rep().address],
            }
        );
        assert_eq!(calls[1].tag.side, QuoteSide::Ask);
        assert_eq!(
            calls[1].method,
            QuoteMethod::GetAmountsIn {
                amount_out: U256::from(10_000u64 * 100_000_000),
                path: vec![rep().address, fun().address],
            }
        );
    }

    #[test]
    fn test_build_batch_v3_direct_calls() {
        let amount = Decimal::from_str("1.5").unwrap();

        let batch = builder()
            .build_batch(
                &routes(&weth(), &rep(), true),
                &routes(&rep(), &weth(), true),
                &[amount],
                &[ProtocolVersion::V3],
            )
            .unwrap();

        let calls = &batch[0].calls;
        let raw = U256::from(15u64) * U256::from(10u64).pow(U256::from(17u64));
        assert_eq!(
            calls[0].method,
            QuoteMethod::QuoteExactInputSingle {
                token_in: weth().address,
                token_out: rep().address,
                fee: FeeTier::Lowest,
                amount_in: raw,
                sqrt_price_limit_x96: U256::ZERO,
            }
        );
        // asks follow the four bids of the amount
        assert_eq!(
            calls[4].method,
            QuoteMethod::QuoteExactOutputSingle {
                token_in: rep().address,
                token_out: weth().address,
                fee: FeeTier::Lowest,
                amount_out: raw,
                sqrt_price_limit_x96: U256::ZERO,
            }
        );
    }

    #[test]
    fn test_build_batch_v3_multihop_uses_path_calls() {
        let batch = builder()
            .build_batch(
                &routes(&fun(), &rep(), false),
                &routes(&rep(), &fun(), false),
                &[Decimal::ONE],
                &[ProtocolVersion::V3],
            )
            .unwrap();

        let multihop: Vec<_> = batch[0]
            .calls
            .iter()
            .filter(|call| {
                matches!(
                    call.method,
                    QuoteMethod::QuoteExactInput { .. } | QuoteMethod::QuoteExactOutput { .. }
                )
            })
            .collect();
        assert_eq!(multihop.len(), 2 * 6 * FeeTier::ALL.len());
        assert!(matches!(
            &multihop[0].method,
            QuoteMethod::QuoteExactInput { path, .. } if path.len() == 3
        ));
    }

    #[test]
    fn test_native_token_is_wrapped_in_calldata() {
        let eth = Token::new(NATIVE_TOKEN_ADDRESS, "ETH", 18, 1);

        let batch = builder()
            .build_batch(
                &routes(&eth, &rep(), true),
                &routes(&rep(), &eth, true),
                &[Decimal::ONE],
                &[ProtocolVersion::V2],
            )
            .unwrap();

        assert_eq!(
            batch[0].calls[0].method,
            QuoteMethod::GetAmountsOut {
                amount_in: U256::from(10u64).pow(U256::from(18u64)),
                path: vec![weth().address, rep().address],
            }
        );
    }

    #[test]
    fn test_build_batch_rejects_invalid_amount() {
        let res = builder().build_batch(
            &routes(&fun(), &rep(), true),
            &routes(&rep(), &fun(), true),
            &[Decimal::ZERO],
            &ProtocolVersion::ALL,
        );

        assert!(matches!(res, Err(QuoterError::InvalidAmount(_))));
    }

    #[test]
    fn test_build_route_batch_output_direction() {
        let batch = builder()
            .build_route_batch(
                &routes(&fun(), &rep(), true),
                Decimal::ONE,
                TradeDirection::Output,
                &ProtocolVersion::ALL,
            )
            .unwrap();

        assert_eq!(
            batch[0].calls[0].method,
            QuoteMethod::GetAmountsIn {
                amount_out: U256::from(10u64).pow(U256::from(18u64)),
                path: vec![fun().address, rep().address],
            }
        );
        assert!(batch[1]
            .calls
            .iter()
            .all(|call| call.tag.side == QuoteSide::Ask &&
                matches!(call.method, QuoteMethod::QuoteExactOutputSingle { .. })));
    }

    #[test]
    fn test_build_route_batch_skips_disabled_versions() {
        let batch = builder()
            .build_route_batch(
                &routes(&fun(), &rep(), true),
                Decimal::ONE,
                TradeDirection::Input,
                &[ProtocolVersion::V3],
            )
            .unwrap();

        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].reference, ProtocolVersion::V3);
        assert_eq!(batch[0].calls.len(), FeeTier::ALL.len());
    }
}
