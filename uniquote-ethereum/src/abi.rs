//! Contract interfaces used for quoting and their calldata codecs.

use alloy::{
    core::sol,
    primitives::{
        aliases::{U160, U24},
        Address, Bytes, U256,
    },
    sol_types::SolCall,
};
use uniquote_common::models::{call::QuoteMethod, FeeTier};

sol! {
    interface IUniswapV2Router02 {
        function getAmountsOut(uint256 amountIn, address[] calldata path)
            external view returns (uint256[] memory amounts);
        function getAmountsIn(uint256 amountOut, address[] calldata path)
            external view returns (uint256[] memory amounts);
    }

    interface IQuoter {
        function quoteExactInputSingle(
            address tokenIn,
            address tokenOut,
            uint24 fee,
            uint256 amountIn,
            uint160 sqrtPriceLimitX96
        ) external returns (uint256 amountOut);
        function quoteExactOutputSingle(
            address tokenIn,
            address tokenOut,
            uint24 fee,
            uint256 amountOut,
            uint160 sqrtPriceLimitX96
        ) external returns (uint256 amountIn);
        function quoteExactInput(bytes path, uint256 amountIn)
            external returns (uint256 amountOut);
        function quoteExactOutput(bytes path, uint256 amountOut)
            external returns (uint256 amountIn);
    }

    interface IMulticall3 {
        struct Call3 {
            address target;
            bool allowFailure;
            bytes callData;
        }

        struct Call3Result {
            bool success;
            bytes returnData;
        }

        function aggregate3(Call3[] calldata calls)
            external payable returns (Call3Result[] memory returnData);
    }
}

/// Packs a multihop path the way the quoter reads it: `token (20) | fee (3) | token (20) ...`.
pub fn encode_v3_path(path: &[Address], fee: FeeTier) -> Bytes {
    let fee_bytes = fee.as_u32().to_be_bytes();
    let mut encoded = Vec::with_capacity(path.len() * 23);
    for (idx, token) in path.iter().enumerate() {
        if idx > 0 {
            encoded.extend_from_slice(&fee_bytes[1..]);
        }
        encoded.extend_from_slice(token.as_slice());
    }
    encoded.into()
}

/// Encodes the calldata of a quote method.
pub fn encode_quote_call(method: &QuoteMethod) -> Bytes {
    let data = match method {
        QuoteMethod::GetAmountsOut { amount_in, path } => {
            IUniswapV2Router02::getAmountsOutCall { amountIn: *amount_in, path: path.clone() }
                .abi_encode()
        }
        QuoteMethod::GetAmountsIn { amount_out, path } => {
            IUniswapV2Router02::getAmountsInCall { amountOut: *amount_out, path: path.clone() }
                .abi_encode()
        }
        QuoteMethod::QuoteExactInputSingle {
            token_in,
            token_out,
            fee,
            amount_in,
            sqrt_price_limit_x96,
        } => IQuoter::quoteExactInputSingleCall {
            tokenIn: *token_in,
            tokenOut: *token_out,
            fee: U24::from(fee.as_u32()),
            amountIn: *amount_in,
            sqrtPriceLimitX96: U160::saturating_from(*sqrt_price_limit_x96),
        }
        .abi_encode(),
        QuoteMethod::QuoteExactOutputSingle {
            token_in,
            token_out,
            fee,
            amount_out,
            sqrt_price_limit_x96,
        } => IQuoter::quoteExactOutputSingleCall {
            tokenIn: *token_in,
            tokenOut: *token_out,
            fee: U24::from(fee.as_u32()),
            amountOut: *amount_out,
            sqrtPriceLimitX96: U160::saturating_from(*sqrt_price_limit_x96),
        }
        .abi_encode(),
        QuoteMethod::QuoteExactInput { path, fee, amount_in } => {
            IQuoter::quoteExactInputCall { path: encode_v3_path(path, *fee), amountIn: *amount_in }
                .abi_encode()
        }
        QuoteMethod::QuoteExactOutput { path, fee, amount_out } => {
            let reversed: Vec<Address> = path.iter().rev().copied().collect();
            IQuoter::quoteExactOutputCall {
                path: encode_v3_path(&reversed, *fee),
                amountOut: *amount_out,
            }
            .abi_encode()
        }
    };
    data.into()
}

/// Decodes the return data of a quote method into its unsigned integer values: the amounts
/// array for the router, a single amount for the quoter.
pub fn decode_quote_return(
    method: &QuoteMethod,
    data: &[u8],
) -> Result<Vec<U256>, alloy::sol_types::Error> {
    Ok(match method {
        QuoteMethod::GetAmountsOut { .. } => {
            IUniswapV2Router02::getAmountsOutCall::abi_decode_returns(data)?
        }
        QuoteMethod::GetAmountsIn { .. } => {
            IUniswapV2Router02::getAmountsInCall::abi_decode_returns(data)?
        }
        QuoteMethod::QuoteExactInputSingle { .. } => {
            vec![IQuoter::quoteExactInputSingleCall::abi_decode_returns(data)?]
        }
        QuoteMethod::QuoteExactOutputSingle { .. } => {
            vec![IQuoter::quoteExactOutputSingleCall::abi_decode_returns(data)?]
        }
        QuoteMethod::QuoteExactInput { .. } => {
            vec![IQuoter::quoteExactInputCall::abi_decode_returns(data)?]
        }
        QuoteMethod::QuoteExactOutput { .. } => {
            vec![IQuoter::quoteExactOutputCall::abi_decode_returns(data)?]
        }
    })
}
