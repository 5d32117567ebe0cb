use std::{
    collections::HashMap,
    str::FromStr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::mpsc::{self, Receiver, Sender};
use uniquote_common::{
    models::{
        blockchain::BlockHeader,
        call::{
            BatchResults, CallReturnContext, ContractCallContext, ContractCallResults, QuoteMethod,
        },
        token::Token,
        Chain, FeeTier, ProtocolVersion,
    },
    traits::{BatchCallExecutor, NetworkProvider},
    QuoterError,
};

fn token(address: &str, symbol: &str, decimals: u32) -> Token {
    Token::new(Address::from_str(address).unwrap(), symbol, decimals, Chain::Ethereum.id())
}

pub fn fun() -> Token {
    token("0x419D0d8BdD9aF5e606Ae2232ed285Aff190E711b", "FUN", 8)
}

pub fn rep() -> Token {
    token("0x1985365e9f78359a9B6AD760e32412f4a445E862", "REP", 18)
}

pub fn aave() -> Token {
    token("0x7Fc66500c84A76Ad7e9c93437bFc5Ac33E2DDaE9", "AAVE", 18)
}

pub fn uni() -> Token {
    token("0x1f9840a85d5aF5bf1D1762F925BDADdC4201F984", "UNI", 18)
}

pub fn weth() -> Token {
    Chain::Ethereum.wrapped_native_token()
}

pub fn usdc() -> Token {
    base("USDC")
}

fn base(symbol: &str) -> Token {
    Chain::Ethereum
        .base_tokens()
        .into_iter()
        .find(|token| token.symbol == symbol)
        .unwrap()
}

/// Hundredths of a basis point charged by every v2 pool.
const V2_FEE: u64 = 3000;
const FEE_DENOMINATOR: u64 = 1_000_000;

type PoolKey = (ProtocolVersion, Option<FeeTier>, Address, Address);

/// In-memory constant product pools answering quote calls the way routers and quoters do.
///
/// Calls touching a missing pool, or draining one, fail like a reverted call.
#[derive(Default)]
pub struct FakeAmm {
    pools: Mutex<HashMap<PoolKey, (U256, U256)>>,
    executions: AtomicUsize,
}

impl FakeAmm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a v2 pool holding whole `reserve_a` of `a` and `reserve_b` of `b`.
    pub fn set_v2_pool(&self, a: &Token, b: &Token, reserve_a: u64, reserve_b: u64) {
        self.set_pool(ProtocolVersion::V2, None, a, b, reserve_a, reserve_b);
    }

    pub fn set_v3_pool(&self, a: &Token, b: &Token, fee: FeeTier, reserve_a: u64, reserve_b: u64) {
        self.set_pool(ProtocolVersion::V3, Some(fee), a, b, reserve_a, reserve_b);
    }

    /// Number of `execute` calls so far.
    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }

    fn set_pool(
        &self,
        version: ProtocolVersion,
        fee: Option<FeeTier>,
        a: &Token,
        b: &Token,
        reserve_a: u64,
        reserve_b: u64,
    ) {
        let raw_a = a
            .to_raw_amount(Decimal::from(reserve_a))
            .unwrap();
        let raw_b = b
            .to_raw_amount(Decimal::from(reserve_b))
            .unwrap();
        let (key, reserves) = if a.address < b.address {
            ((version, fee, a.address, b.address), (raw_a, raw_b))
        } else {
            ((version, fee, b.address, a.address), (raw_b, raw_a))
        };
        self.pools
            .lock()
            .unwrap()
            .insert(key, reserves);
    }

    /// Reserves of `token_in` and `token_out` in that order, plus the pool fee.
    fn pool(
        &self,
        version: ProtocolVersion,
        fee: Option<FeeTier>,
        token_in: Address,
        token_out: Address,
    ) -> Option<(U256, U256, u64)> {
        let pools = self.pools.lock().unwrap();
        let fee_ppm = fee.map_or(V2_FEE, |fee| fee.as_u32() as u64);
        if token_in < token_out {
            let (r_in, r_out) = *pools.get(&(version, fee, token_in, token_out))?;
            Some((r_in, r_out, fee_ppm))
        } else {
            let (r_out, r_in) = *pools.get(&(version, fee, token_out, token_in))?;
            Some((r_in, r_out, fee_ppm))
        }
    }

    fn amount_out(
        &self,
        version: ProtocolVersion,
        fee: Option<FeeTier>,
        hop: (Address, Address),
        amount_in: U256,
    ) -> Option<U256> {
        let (reserve_in, reserve_out, fee_ppm) = self.pool(version, fee, hop.0, hop.1)?;
        let denominator = U256::from(FEE_DENOMINATOR);
        let in_with_fee = amount_in * U256::from(FEE_DENOMINATOR - fee_ppm);
        let out = reserve_out * in_with_fee / (reserve_in * denominator + in_with_fee);
        (!out.is_zero()).then_some(out)
    }

    fn amount_in(
        &self,
        version: ProtocolVersion,
        fee: Option<FeeTier>,
        hop: (Address, Address),
        amount_out: U256,
    ) -> Option<U256> {
        let (reserve_in, reserve_out, fee_ppm) = self.pool(version, fee, hop.0, hop.1)?;
        if amount_out >= reserve_out {
            return None;
        }
        let numerator = reserve_in * amount_out * U256::from(FEE_DENOMINATOR);
        let denominator = (reserve_out - amount_out) * U256::from(FEE_DENOMINATOR - fee_ppm);
        Some(numerator / denominator + U256::from(1u64))
    }

    /// Amounts along `path` selling `amount_in`, first to last.
    fn amounts_out(
        &self,
        version: ProtocolVersion,
        fee: Option<FeeTier>,
        path: &[Address],
        amount_in: U256,
    ) -> Option<Vec<U256>> {
        let mut amounts = vec![amount_in];
        for hop in path.windows(2) {
            let previous = *amounts.last()?;
            amounts.push(self.amount_out(version, fee, (hop[0], hop[1]), previous)?);
        }
        Some(amounts)
    }

    /// Amounts along `path` buying `amount_out`, first to last.
    fn amounts_in(
        &self,
        version: ProtocolVersion,
        fee: Option<FeeTier>,
        path: &[Address],
        amount_out: U256,
    ) -> Option<Vec<U256>> {
        let mut amounts = vec![amount_out];
        for hop in path.windows(2).rev() {
            let next = amounts[0];
            amounts.insert(0, self.amount_in(version, fee, (hop[0], hop[1]), next)?);
        }
        Some(amounts)
    }

    fn quote(&self, method: &QuoteMethod) -> Option<Vec<U256>> {
        match method {
            QuoteMethod::GetAmountsOut { amount_in, path } => {
                self.amounts_out(ProtocolVersion::V2, None, path, *amount_in)
            }
            QuoteMethod::GetAmountsIn { amount_out, path } => {
                self.amounts_in(ProtocolVersion::V2, None, path, *amount_out)
            }
            QuoteMethod::QuoteExactInputSingle { token_in, token_out, fee, amount_in, .. } => self
                .amount_out(ProtocolVersion::V3, Some(*fee), (*token_in, *token_out), *amount_in)
                .map(|out| vec![out]),
            QuoteMethod::QuoteExactOutputSingle { token_in, token_out, fee, amount_out, .. } => self
                .amount_in(ProtocolVersion::V3, Some(*fee), (*token_in, *token_out), *amount_out)
                .map(|amount_in| vec![amount_in]),
            QuoteMethod::QuoteExactInput { path, fee, amount_in } => self
                .amounts_out(ProtocolVersion::V3, Some(*fee), path, *amount_in)
                .and_then(|amounts| amounts.last().copied())
                .map(|out| vec![out]),
            QuoteMethod::QuoteExactOutput { path, fee, amount_out } => self
                .amounts_in(ProtocolVersion::V3, Some(*fee), path, *amount_out)
                .and_then(|amounts| amounts.first().copied())
                .map(|amount_in| vec![amount_in]),
        }
    }
}

#[async_trait]
impl BatchCallExecutor for FakeAmm {
    async fn execute(
        &self,
        contexts: Vec<ContractCallContext>,
    ) -> Result<BatchResults, QuoterError> {
        self.executions
            .fetch_add(1, Ordering::SeqCst);
        let results = contexts
            .into_iter()
            .map(|context| ContractCallResults {
                reference: context.reference,
                calls: context
                    .calls
                    .into_iter()
                    .map(|call| match self.quote(&call.method) {
                        Some(values) => {
                            CallReturnContext::success(call.tag, call.method.name(), values)
                        }
                        None => CallReturnContext::failure(call.tag, call.method.name()),
                    })
                    .collect(),
            })
            .collect();
        Ok(BatchResults { results })
    }
}

/// Pools of the routing scenarios: FUN and REP only meet through WETH on v2, AAVE and UNI share
/// a deep direct v3 pool next to a route through WETH.
pub fn mainnet_amm() -> FakeAmm {
    let amm = FakeAmm::new();
    amm.set_v2_pool(&fun(), &weth(), 50_000_000, 1_000);
    amm.set_v2_pool(&weth(), &rep(), 1_000, 300_000);
    amm.set_v2_pool(&fun(), &usdc(), 100_000, 2_000);
    amm.set_v3_pool(&aave(), &uni(), FeeTier::Lowest, 100_000, 2_500_000);
    amm.set_v3_pool(&aave(), &uni(), FeeTier::Medium, 1_000, 25_000);
    amm.set_v3_pool(&aave(), &weth(), FeeTier::Medium, 10_000, 5_000);
    amm.set_v3_pool(&weth(), &uni(), FeeTier::Medium, 5_000, 250_000);
    amm
}

/// Network whose blocks are produced by the test.
pub struct BlockFeed {
    chain_id: u64,
    subscribers: Mutex<Vec<Sender<BlockHeader>>>,
}

impl BlockFeed {
    pub fn new(chain_id: u64) -> Self {
        Self { chain_id, subscribers: Mutex::new(Vec::new()) }
    }

    pub async fn push_block(&self, number: u64) {
        let subscribers = self.subscribers.lock().unwrap().clone();
        let block = BlockHeader { number, ..Default::default() };
        for subscriber in subscribers {
            let _ = subscriber.send(block.clone()).await;
        }
    }

    /// Subscriptions whose receiver is still alive.
    pub fn open_subscriptions(&self) -> usize {
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|subscriber| !subscriber.is_closed());
        subscribers.len()
    }
}

#[async_trait]
impl NetworkProvider for BlockFeed {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn subscribe_blocks(&self) -> Result<Receiver<BlockHeader>, QuoterError> {
        let (tx, rx) = mpsc::channel(16);
        self.subscribers.lock().unwrap().push(tx);
        Ok(rx)
    }
}
