//! Shapes exchanged with the batch call executor.
//!
//! The engine describes every read-only call as a typed [`QuoteMethod`] grouped per target
//! contract; the executor encodes, runs and decodes them and hands back one
//! [`CallReturnContext`] per call.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use super::{quote::CallTag, FeeTier, ProtocolVersion};

pub const GET_AMOUNTS_OUT: &str = "getAmountsOut";
pub const GET_AMOUNTS_IN: &str = "getAmountsIn";
pub const QUOTE_EXACT_INPUT_SINGLE: &str = "quoteExactInputSingle";
pub const QUOTE_EXACT_OUTPUT_SINGLE: &str = "quoteExactOutputSingle";
pub const QUOTE_EXACT_INPUT: &str = "quoteExactInput";
pub const QUOTE_EXACT_OUTPUT: &str = "quoteExactOutput";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuoteMethod {
    /// v2 router: amounts along `path` when selling `amount_in` of its first token.
    GetAmountsOut { amount_in: U256, path: Vec<Address> },
    /// v2 router: amounts along `path` needed to buy `amount_out` of its last token.
    GetAmountsIn { amount_out: U256, path: Vec<Address> },
    QuoteExactInputSingle {
        token_in: Address,
        token_out: Address,
        fee: FeeTier,
        amount_in: U256,
        sqrt_price_limit_x96: U256,
    },
    QuoteExactOutputSingle {
        token_in: Address,
        token_out: Address,
        fee: FeeTier,
        amount_out: U256,
        sqrt_price_limit_x96: U256,
    },
    /// v3 quoter multihop. `path` is in swap order, every hop uses `fee`.
    QuoteExactInput { path: Vec<Address>, fee: FeeTier, amount_in: U256 },
    /// v3 quoter multihop. `path` is in swap order, the executor encodes it reversed as the
    /// quoter expects for exact output.
    QuoteExactOutput { path: Vec<Address>, fee: FeeTier, amount_out: U256 },
}

impl QuoteMethod {
    pub fn name(&self) -> &'static str {
        match self {
            QuoteMethod::GetAmountsOut { .. } => GET_AMOUNTS_OUT,
            QuoteMethod::GetAmountsIn { .. } => GET_AMOUNTS_IN,
            QuoteMethod::QuoteExactInputSingle { .. } => QUOTE_EXACT_INPUT_SINGLE,
            QuoteMethod::QuoteExactOutputSingle { .. } => QUOTE_EXACT_OUTPUT_SINGLE,
            QuoteMethod::QuoteExactInput { .. } => QUOTE_EXACT_INPUT,
            QuoteMethod::QuoteExactOutput { .. } => QUOTE_EXACT_OUTPUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractCall {
    pub tag: CallTag,
    pub method: QuoteMethod,
}

/// All calls addressed to one contract. One context per protocol version keeps a version's
/// calls in a single network round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractCallContext {
    pub reference: ProtocolVersion,
    pub contract_address: Address,
    pub calls: Vec<ContractCall>,
}

impl ContractCallContext {
    pub fn new(reference: ProtocolVersion, contract_address: Address) -> Self {
        Self { reference, contract_address, calls: Vec::new() }
    }

    pub fn push(&mut self, tag: CallTag, method: QuoteMethod) {
        self.calls
            .push(ContractCall { tag, method });
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

/// Outcome of one call. `success = false` marks a revert, `return_values` is then empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallReturnContext {
    pub tag: CallTag,
    pub method_name: String,
    pub success: bool,
    pub return_values: Vec<U256>,
}

impl CallReturnContext {
    pub fn success(tag: CallTag, method_name: &str, return_values: Vec<U256>) -> Self {
        Self { tag, method_name: method_name.to_string(), success: true, return_values }
    }

    pub fn failure(tag: CallTag, method_name: &str) -> Self {
        Self { tag, method_name: method_name.to_string(), success: false, return_values: vec![] }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractCallResults {
    pub reference: ProtocolVersion,
    pub calls: Vec<CallReturnContext>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResults {
    pub results: Vec<ContractCallResults>,
}
