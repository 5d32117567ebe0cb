#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;

pub mod abi;
pub mod blocks;
pub mod erc20;
pub mod multicall;
pub mod provider;
pub mod rpc;

#[cfg(test)]
pub mod test_fixtures;

pub use rpc::{errors::RPCError, EthereumRpcClient};
