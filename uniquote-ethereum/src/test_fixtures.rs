//! Shared test helpers: JSON-RPC mocks and a few mainnet constants.

use std::{str::FromStr, sync::LazyLock};

use alloy::primitives::{hex, Address};
use mockito::{Matcher, Mock, ServerGuard};

pub const WETH_STR: &str = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2";
pub const USDC_STR: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";
pub const MKR_STR: &str = "0x9f8F72aA9304c8B593d555F12eF6589cC3A579A2";

pub static WETH: LazyLock<Address> =
    LazyLock::new(|| Address::from_str(WETH_STR).expect("valid address"));
pub static USDC: LazyLock<Address> =
    LazyLock::new(|| Address::from_str(USDC_STR).expect("valid address"));

/// Mainnet node used by the ignored integration tests.
pub fn rpc_url() -> String {
    std::env::var("RPC_URL").expect("RPC_URL must be set for testing")
}

pub fn json_rpc_result(result: &str) -> String {
    format!(r#"{{"jsonrpc":"2.0","id":0,"result":{result}}}"#)
}

/// JSON-RPC response carrying raw call output.
pub fn json_rpc_bytes(data: &[u8]) -> String {
    json_rpc_result(&format!("\"{}\"", hex::encode_prefixed(data)))
}

/// JSON-RPC block object without transactions, as returned by `eth_getBlockByNumber`.
pub fn block_json(number: u64) -> String {
    let word = |byte: u8| format!("\"0x{}\"", format!("{byte:02x}").repeat(32));
    format!(
        r#"{{
            "hash": {hash},
            "parentHash": {parent},
            "sha3Uncles": {zero},
            "miner": "0x0000000000000000000000000000000000000000",
            "stateRoot": {zero},
            "transactionsRoot": {zero},
            "receiptsRoot": {zero},
            "logsBloom": "0x{bloom}",
            "difficulty": "0x0",
            "number": "{number:#x}",
            "gasLimit": "0x1c9c380",
            "gasUsed": "0x0",
            "timestamp": "0x65a1b2c3",
            "extraData": "0x",
            "mixHash": {zero},
            "nonce": "0x0000000000000000",
            "baseFeePerGas": "0x7",
            "size": "0x220",
            "uncles": [],
            "transactions": []
        }}"#,
        hash = word(0xab),
        parent = word(0xaa),
        zero = word(0x00),
        bloom = "00".repeat(256),
    )
}

/// Mocks a JSON-RPC method; requests for other methods are not matched by this mock.
pub async fn mock_rpc_method(server: &mut ServerGuard, method: &str, body: &str) -> Mock {
    server
        .mock("POST", "/")
        .match_body(Matcher::PartialJsonString(format!(r#"{{"method":"{method}"}}"#)))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await
}
