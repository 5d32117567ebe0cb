use std::collections::{hash_map::Entry, HashMap};

use alloy::primitives::U256;
use rust_decimal::{prelude::ToPrimitive, Decimal};
use tracing::{debug, trace};
use uniquote_common::{
    models::{
        call::{
            BatchResults, CallReturnContext, GET_AMOUNTS_IN, GET_AMOUNTS_OUT, QUOTE_EXACT_INPUT,
            QUOTE_EXACT_INPUT_SINGLE, QUOTE_EXACT_OUTPUT, QUOTE_EXACT_OUTPUT_SINGLE,
        },
        quote::BidAskQuote,
        token::Token,
        ProtocolVersion,
    },
    QuoterError,
};

/// Folds the results of a bid/ask batch into the best bid and ask of every trade amount.
#[derive(Clone, Debug)]
pub struct QuoteResultAggregator {
    token_b: Token,
}

impl QuoteResultAggregator {
    pub fn new(token_b: Token) -> Self {
        Self { token_b }
    }

    /// Decodes every successful call into a price and keeps, per trade amount, the highest bid
    /// and the lowest ask. Reverted calls and zero outputs are dropped.
    ///
    /// Amounts without a single surviving call are absent from the map.
    pub fn aggregate(
        &self,
        results: &BatchResults,
    ) -> Result<HashMap<Decimal, BidAskQuote>, QuoterError> {
        let mut quotes: HashMap<Decimal, BidAskQuote> = HashMap::new();
        let mut pruned = 0usize;

        for entry in &results.results {
            for call in &entry.calls {
                let Some(raw) = decode_amount(entry.reference, call)? else {
                    pruned += 1;
                    continue;
                };
                let Some(price) = self.price(raw, call.tag.trade_amount) else {
                    pruned += 1;
                    continue;
                };

                let quote = BidAskQuote::new(call.tag.trade_amount, call.tag.side, price);
                trace!(
                    version = %entry.reference,
                    route_index = call.tag.route_index,
                    side = %call.tag.side,
                    price,
                    "Decoded quote"
                );
                match quotes.entry(call.tag.trade_amount) {
                    Entry::Occupied(mut held) => held.get_mut().merge(&quote),
                    Entry::Vacant(slot) => {
                        slot.insert(quote);
                    }
                }
            }
        }

        debug!(n_amounts = quotes.len(), pruned, "Aggregated bid/ask quotes");
        Ok(quotes)
    }

    fn price(&self, raw: U256, trade_amount: Decimal) -> Option<f64> {
        let amount = trade_amount.to_f64()?;
        if amount <= 0.0 {
            return None;
        }
        let price = self.token_b.from_raw_amount(raw) / amount;
        price.is_finite().then_some(price)
    }
}

/// Extracts the quoted amount of a call result.
///
/// v2 `getAmountsOut` yields the output after the last hop, `getAmountsIn` the input required at
/// the first hop, and every v3 quote a scalar.
///
/// ## Return
/// `None` for reverted calls and calls quoting nothing. `UnsupportedVersion` when the method does
/// not belong to `version`, whatever the outcome of the call.
pub(crate) fn decode_amount(
    version: ProtocolVersion,
    call: &CallReturnContext,
) -> Result<Option<U256>, QuoterError> {
    let method = call.method_name.as_str();
    let pick_last = match (version, method) {
        (ProtocolVersion::V2, GET_AMOUNTS_OUT) => true,
        (ProtocolVersion::V2, GET_AMOUNTS_IN) => false,
        (
            ProtocolVersion::V3,
            QUOTE_EXACT_INPUT_SINGLE |
            QUOTE_EXACT_OUTPUT_SINGLE |
            QUOTE_EXACT_INPUT |
            QUOTE_EXACT_OUTPUT,
        ) => false,
        _ => {
            return Err(QuoterError::UnsupportedVersion {
                version,
                method: call.method_name.clone(),
            })
        }
    };

    if !call.success {
        return Ok(None);
    }
    let value = if pick_last { call.return_values.last() } else { call.return_values.first() };
    Ok(value
        .copied()
        .filter(|value| !value.is_zero()))
}
