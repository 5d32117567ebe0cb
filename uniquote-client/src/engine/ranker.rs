use alloy::primitives::U256;
use rust_decimal::Decimal;
use tracing::{debug, warn};
use uniquote_common::{
    models::{
        call::BatchResults,
        quote::{BestRouteQuotes, TradeDirection, TriedRouteQuote},
        route::{AllPossibleRoutes, RouteContext},
        token::Token,
        ProtocolVersion,
    },
    QuoterError,
};

use super::aggregate::decode_amount;

/// Picks the single best route of one direction among individually quoted candidates.
#[derive(Clone, Debug)]
pub struct RouteRanker {
    token_from: Token,
    token_to: Token,
}

impl RouteRanker {
    pub fn new(token_from: Token, token_to: Token) -> Self {
        Self { token_from, token_to }
    }

    /// Ranks the quoted `routes`.
    ///
    /// Selling (`TradeDirection::Input`) the best route returns the most `token_to`; buying
    /// (`TradeDirection::Output`) it requires the least `token_from`. Survivors are considered in
    /// enumeration order (v2 before v3, then route index) and the first extremal one wins, so the
    /// outcome is reproducible for a fixed chain state.
    ///
    /// ## Return
    /// `RouteNotFound` if every call reverted or quoted nothing.
    pub fn rank(
        &self,
        routes: &AllPossibleRoutes,
        amount: Decimal,
        direction: TradeDirection,
        results: &BatchResults,
    ) -> Result<BestRouteQuotes, QuoterError> {
        let mut survivors: Vec<(ProtocolVersion, usize, &RouteContext, U256)> = Vec::new();
        for entry in &results.results {
            let candidates = routes.get(entry.reference);
            for call in &entry.calls {
                let Some(raw) = decode_amount(entry.reference, call)? else {
                    continue;
                };
                match candidates.get(call.tag.route_index) {
                    Some(route) => {
                        survivors.push((entry.reference, call.tag.route_index, route, raw))
                    }
                    None => warn!(
                        version = %entry.reference,
                        route_index = call.tag.route_index,
                        "Result for an unknown route"
                    ),
                }
            }
        }
        survivors.sort_by_key(|(version, idx, _, _)| (*version, *idx));

        let quoted_token = match direction {
            TradeDirection::Input => &self.token_to,
            TradeDirection::Output => &self.token_from,
        };
        let mut best: Option<usize> = None;
        let mut tried = Vec::with_capacity(survivors.len());
        for (pos, (version, _, route, raw)) in survivors.iter().enumerate() {
            let is_better = match best {
                None => true,
                Some(best_pos) => {
                    let best_raw = survivors[best_pos].3;
                    match direction {
                        TradeDirection::Input => *raw > best_raw,
                        TradeDirection::Output => *raw < best_raw,
                    }
                }
            };
            if is_better {
                best = Some(pos);
            }
            tried.push(TriedRouteQuote {
                route_path_array: route.route_path_array(),
                route_text: route.route_text(),
                fee_tier: route.fee_tier(),
                protocol_version: *version,
                amount,
                expected_amount_raw: *raw,
                converted_amount: quoted_token.from_raw_amount(*raw),
            });
        }

        let best = best.ok_or(QuoterError::RouteNotFound {
            from: self.token_from.address,
            to: self.token_to.address,
        })?;
        let best_route_quote = tried[best].clone();
        debug!(
            route = %best_route_quote.route_text,
            version = %best_route_quote.protocol_version,
            fee_tier = ?best_route_quote.fee_tier,
            n_tried = tried.len(),
            "Selected best route"
        );
        Ok(BestRouteQuotes { best_route_quote, tried_routes_quote: tried })
    }
}
