use std::{
    fmt::Display,
    hash::{Hash, Hasher},
};

use alloy::primitives::{Address, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::NATIVE_TOKEN_ADDRESS;
use crate::QuoterError;

/// An ERC20 token. Identity is the contract address only; the address type compares bytes, so
/// two spellings of the same hex address are the same token.
#[derive(Debug, Clone, Deserialize, Serialize, Eq)]
pub struct Token {
    pub address: Address,
    pub symbol: String,
    pub decimals: u32,
    pub chain_id: u64,
}

impl Token {
    pub fn new(address: Address, symbol: &str, decimals: u32, chain_id: u64) -> Self {
        Self { address, symbol: symbol.to_string(), decimals, chain_id }
    }

    /// EIP-55 checksummed address.
    pub fn checksum_address(&self) -> String {
        self.address.to_checksum(None)
    }

    pub fn is_native(&self) -> bool {
        self.address == NATIVE_TOKEN_ADDRESS
    }

    /// Address to put into calldata: the native placeholder becomes the wrapped native token.
    pub fn call_address(&self, wrapped_native: Address) -> Address {
        if self.is_native() {
            wrapped_native
        } else {
            self.address
        }
    }

    /// Scales a decimal amount into the token's smallest unit, truncating extra digits.
    ///
    /// ## Return
    /// Fails with `InvalidAmount` for non-positive amounts and for amounts that truncate to zero.
    pub fn to_raw_amount(&self, amount: Decimal) -> Result<U256, QuoterError> {
        if amount <= Decimal::ZERO {
            return Err(QuoterError::InvalidAmount(format!("{amount} must be greater than zero")));
        }

        let overflow = || QuoterError::InvalidAmount(format!("{amount} {} overflows", self.symbol));
        let ten = U256::from(10u64);
        let mantissa = U256::from(amount.mantissa().unsigned_abs());
        let shift = ten
            .checked_pow(U256::from(self.decimals))
            .ok_or_else(overflow)?;
        let divisor = ten
            .checked_pow(U256::from(amount.scale()))
            .ok_or_else(overflow)?;
        let raw = mantissa
            .checked_mul(shift)
            .ok_or_else(overflow)?
            / divisor;

        if raw.is_zero() {
            return Err(QuoterError::InvalidAmount(format!(
                "{amount} is below the smallest unit of {}",
                self.symbol
            )));
        }
        Ok(raw)
    }

    /// Converts an amount in the token's smallest unit into a decimal number.
    pub fn from_raw_amount(&self, raw: U256) -> f64 {
        u256_to_f64(raw) / 10f64.powi(self.decimals as i32)
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

/// Lossy conversion, exact up to 2^53.
pub fn u256_to_f64(value: U256) -> f64 {
    value
        .as_limbs()
        .iter()
        .rev()
        .fold(0f64, |acc, limb| acc * 18_446_744_073_709_551_616.0 + *limb as f64)
}
