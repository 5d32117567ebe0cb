use alloy::primitives::{Address, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use super::{FeeTier, ProtocolVersion};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum QuoteSide {
    /// Selling token A for token B.
    Bid,
    /// Buying token A with token B.
    Ask,
}

/// Whether a trade amount is the exact amount sold or the exact amount bought.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TradeDirection {
    #[default]
    Input,
    Output,
}

/// Key carried next to every batched call so its result can be traced back to the route and
/// trade amount that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallTag {
    pub route_index: usize,
    pub trade_amount: Decimal,
    pub side: QuoteSide,
}

impl CallTag {
    pub fn new(route_index: usize, trade_amount: Decimal, side: QuoteSide) -> Self {
        Self { route_index, trade_amount, side }
    }
}

/// Best bid and ask for one trade amount across every route and protocol version.
///
/// At least one of the two prices is always present.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BidAskQuote {
    amount: Decimal,
    bid_price: Option<f64>,
    ask_price: Option<f64>,
}

impl BidAskQuote {
    pub fn new(amount: Decimal, side: QuoteSide, price: f64) -> Self {
        match side {
            QuoteSide::Bid => Self { amount, bid_price: Some(price), ask_price: None },
            QuoteSide::Ask => Self { amount, bid_price: None, ask_price: Some(price) },
        }
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn bid_price(&self) -> Option<f64> {
        self.bid_price
    }

    pub fn ask_price(&self) -> Option<f64> {
        self.ask_price
    }

    /// Folds another quote of the same amount in: keeps the highest bid and the lowest ask.
    /// On equal prices the value already held wins.
    pub fn merge(&mut self, other: &BidAskQuote) {
        if let Some(bid) = other.bid_price {
            if self.bid_price.map_or(true, |held| bid > held) {
                self.bid_price = Some(bid);
            }
        }
        if let Some(ask) = other.ask_price {
            if self.ask_price.map_or(true, |held| ask < held) {
                self.ask_price = Some(ask);
            }
        }
    }
}

/// Quote of a single route, before any merging.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriedRouteQuote {
    pub route_path_array: Vec<Address>,
    pub route_text: String,
    pub fee_tier: Option<FeeTier>,
    pub protocol_version: ProtocolVersion,
    pub amount: Decimal,
    pub expected_amount_raw: U256,
    pub converted_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BestRouteQuotes {
    pub best_route_quote: TriedRouteQuote,
    pub tried_routes_quote: Vec<TriedRouteQuote>,
}
