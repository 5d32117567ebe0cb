use alloy::{
    core::sol,
    primitives::{Address, B256, U256},
    sol_types::{SolCall, SolValue},
};
use async_trait::async_trait;
use tracing::{debug, instrument, warn};
use uniquote_common::{models::token::Token, traits::TokenMetadataSource, QuoterError};

use crate::{
    abi::IMulticall3::{Call3, Call3Result},
    multicall::MulticallExecutor,
    RPCError,
};

// Optional metadata getters of EIP-20: https://eips.ethereum.org/EIPS/eip-20
sol! {
    function symbol() public view returns (string);
    function decimals() public view returns (uint8);
}

// Some early tokens (e.g. MKR) return their symbol as bytes32.
sol! {
    interface IERC20Bytes32 {
        function symbol() public view returns (bytes32);
    }
}

/// Encode symbol() call
pub fn encode_symbol() -> Vec<u8> {
    symbolCall {}.abi_encode()
}

/// Encode decimals() call
pub fn encode_decimals() -> Vec<u8> {
    decimalsCall {}.abi_encode()
}

/// Decode symbol() return value, accepting both the string and the legacy bytes32 layout.
pub(crate) fn decode_symbol(data: &[u8]) -> Option<String> {
    if let Some(symbol) = symbolCall::abi_decode_returns(data)
        .ok()
        .filter(|s| !s.is_empty())
    {
        return Some(symbol);
    }

    let raw: B256 = IERC20Bytes32::symbolCall::abi_decode_returns(data).ok()?;
    let trimmed: Vec<u8> = raw
        .iter()
        .copied()
        .take_while(|b| *b != 0)
        .collect();
    String::from_utf8(trimmed)
        .ok()
        .filter(|s| !s.is_empty())
}

/// Decode decimals() return value. The word is read as a full `uint256`, values that do not fit
/// a `uint8` are rejected rather than truncated.
pub fn decode_decimals(data: &[u8]) -> Result<u8, RPCError> {
    let raw = U256::abi_decode(data)
        .map_err(|err| RPCError::DecodeError(format!("Invalid decimals() return: {err}")))?;
    u8::try_from(raw)
        .map_err(|_| RPCError::DecodeError(format!("decimals() out of range: {raw}")))
}

/// Reads token metadata with two multicalled getters per address.
#[derive(Clone, Debug)]
pub struct Erc20TokenSource {
    multicall: MulticallExecutor,
    chain_id: u64,
}

impl Erc20TokenSource {
    pub fn new(multicall: MulticallExecutor, chain_id: u64) -> Self {
        Self { multicall, chain_id }
    }

    fn to_token(
        &self,
        address: Address,
        symbol: &Call3Result,
        decimals: &Call3Result,
    ) -> Option<Token> {
        if !decimals.success {
            debug!(%address, "decimals() reverted, not a token");
            return None;
        }
        let decimals = match decode_decimals(&decimals.returnData) {
            Ok(decimals) => decimals,
            Err(err) => {
                debug!(%address, %err, "Failed to decode decimals()");
                return None;
            }
        };

        let symbol = symbol
            .success
            .then(|| decode_symbol(&symbol.returnData))
            .flatten()
            .unwrap_or_else(|| {
                warn!(%address, "Token without readable symbol, using its address");
                address.to_checksum(None)
            });

        Some(Token::new(address, &symbol, decimals.into(), self.chain_id))
    }
}

#[async_trait]
impl TokenMetadataSource for Erc20TokenSource {
    #[instrument(skip(self))]
    async fn get_tokens(&self, addresses: Vec<Address>) -> Result<Vec<Token>, QuoterError> {
        let calls = addresses
            .iter()
            .flat_map(|address| {
                [
                    Call3 {
                        target: *address,
                        allowFailure: true,
                        callData: encode_symbol().into(),
                    },
                    Call3 {
                        target: *address,
                        allowFailure: true,
                        callData: encode_decimals().into(),
                    },
                ]
            })
            .collect();

        let results = self.multicall.aggregate(calls).await?;

        Ok(addresses
            .into_iter()
            .zip(results.chunks_exact(2))
            .filter_map(|(address, pair)| self.to_token(address, &pair[0], &pair[1]))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::Bytes;
    use rstest::rstest;

    use super::*;
    use crate::{
        test_fixtures::{json_rpc_bytes, mock_rpc_method, rpc_url, MKR_STR, USDC, WETH},
        EthereumRpcClient,
    };

    fn result(success: bool, data: Vec<u8>) -> Call3Result {
        Call3Result { success, returnData: Bytes::from(data) }
    }

    #[test]
    fn test_decode_decimals() {
        let val = U256::from(255);
        let decimals = decode_decimals(&val.to_be_bytes::<32>()).unwrap();
        assert_eq!(decimals, 255);
    }

    #[test]
    fn test_decode_decimals_does_not_panic() {
        let val = U256::from(1024);
        let res = decode_decimals(&val.to_be_bytes::<32>());
        assert!(matches!(res, Err(RPCError::DecodeError(_))));
    }

    #[test]
    fn test_decode_decimals_rejects_short_data() {
        assert!(decode_decimals(&[0x12]).is_err());
    }

    #[rstest]
    #[case::string("USDC".to_string().abi_encode(), Some("USDC"))]
    #[case::bytes32(B256::right_padding_from(b"MKR").abi_encode(), Some("MKR"))]
    #[case::empty_bytes32(B256::ZERO.abi_encode(), None)]
    #[case::garbage(vec![0x01], None)]
    fn test_decode_symbol(#[case] data: Vec<u8>, #[case] expected: Option<&str>) {
        assert_eq!(decode_symbol(&data).as_deref(), expected);
    }

    #[tokio::test]
    async fn test_get_tokens_skips_non_tokens() {
        let mut server = mockito::Server::new_async().await;
        let response = vec![
            result(true, "WETH".to_string().abi_encode()),
            result(true, U256::from(18).abi_encode()),
            result(false, vec![]),
            result(false, vec![]),
            result(false, vec![]),
            result(true, U256::from(6).abi_encode()),
        ]
        .abi_encode();
        let _mock = mock_rpc_method(&mut server, "eth_call", &json_rpc_bytes(&response)).await;
        let client = EthereumRpcClient::new(&server.url()).unwrap();
        let executor = MulticallExecutor::new(client, Address::repeat_byte(0xca));
        let source = Erc20TokenSource::new(executor, 1);
        let unknown = Address::repeat_byte(0x42);

        let tokens = source
            .get_tokens(vec![*WETH, unknown, *USDC])
            .await
            .unwrap();

        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0], Token::new(*WETH, "WETH", 18, 1));
        assert_eq!(tokens[0].symbol, "WETH");
        assert_eq!(tokens[1].symbol, USDC.to_checksum(None));
        assert_eq!(tokens[1].decimals, 6);
    }

    #[tokio::test]
    async fn test_get_tokens_skips_out_of_range_decimals() {
        let mut server = mockito::Server::new_async().await;
        let response = vec![
            result(true, "WETH".to_string().abi_encode()),
            result(true, U256::from(18).abi_encode()),
            result(true, "BAD".to_string().abi_encode()),
            result(true, U256::from(1024).abi_encode()),
        ]
        .abi_encode();
        let _mock = mock_rpc_method(&mut server, "eth_call", &json_rpc_bytes(&response)).await;
        let client = EthereumRpcClient::new(&server.url()).unwrap();
        let executor = MulticallExecutor::new(client, Address::repeat_byte(0xca));
        let source = Erc20TokenSource::new(executor, 1);

        let tokens = source
            .get_tokens(vec![*WETH, Address::repeat_byte(0x42)])
            .await
            .unwrap();

        assert_eq!(tokens, vec![Token::new(*WETH, "WETH", 18, 1)]);
    }

    #[tokio::test]
    #[ignore = "require RPC connection"]
    async fn test_get_tokens_mainnet() {
        let client = EthereumRpcClient::new(&rpc_url()).unwrap();
        let executor = MulticallExecutor::new(
            client,
            uniquote_common::models::network::MULTICALL3_ADDRESS,
        );
        let source = Erc20TokenSource::new(executor, 1);
        let mkr: Address = MKR_STR.parse().unwrap();

        let tokens = source
            .get_tokens(vec![*USDC, mkr])
            .await
            .unwrap();

        assert_eq!(tokens[0].symbol, "USDC");
        assert_eq!(tokens[0].decimals, 6);
        assert_eq!(tokens[1].symbol, "MKR");
    }
}
