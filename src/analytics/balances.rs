//! Batched native and ERC-20 balance reads through Multicall3.
//!
//! Every wallet gets one `getEthBalance` call plus one `balanceOf` call per
//! tracked token. Calls are submitted through `aggregate3` with
//! `allowFailure = true`, grouped into chunks of `chunk_size` wallets that
//! are sent one after another. A failed chunk zeroes its wallets and the
//! remaining chunks still go out.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::contracts::{IMulticall3, IERC20};
use crate::domain::{dedup_canonical, parse_address, CanonicalAddress, TokenConfig};
use crate::error::Result;

/// Decimals of the chain's native currency
pub const NATIVE_DECIMALS: u8 = 18;

/// Shortest return payload that holds one ABI word
const WORD_LEN: usize = 32;

/// One read inside a batch. Descriptors never depend on each other's results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallDescriptor {
    pub target: Address,
    pub call_data: Bytes,
    pub allow_failure: bool,
}

/// Per-call result of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    Ok(Bytes),
    Failed,
}

/// The chain RPC primitive: submit a batch of independent calls in one round trip.
///
/// An `Err` means the whole submission failed; individual call failures are
/// reported as [`CallOutcome::Failed`] in the returned vector.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BatchCaller: Send + Sync {
    async fn aggregate3(&self, calls: Vec<CallDescriptor>) -> Result<Vec<CallOutcome>>;
}

/// Balances of one wallet. Token symbols only appear for nonzero holdings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletBalances {
    pub address: CanonicalAddress,
    pub native_balance: String,
    pub token_balances: BTreeMap<String, String>,
}

impl WalletBalances {
    fn empty(address: CanonicalAddress) -> Self {
        Self {
            address,
            native_balance: "0".to_string(),
            token_balances: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum CallKind {
    Native,
    Token(usize),
}

#[derive(Debug, Clone, Copy)]
struct PlannedCall {
    wallet: usize,
    kind: CallKind,
}

pub fn encode_get_eth_balance(wallet: Address) -> Bytes {
    IMulticall3::getEthBalanceCall { addr: wallet }.abi_encode().into()
}

/// `balanceOf(address)`: selector `0x70a08231` followed by the address left-padded to 32 bytes
pub fn encode_balance_of(wallet: Address) -> Bytes {
    IERC20::balanceOfCall { account: wallet }.abi_encode().into()
}

/// Read the leading uint256 word. Short or empty payloads decode to zero.
pub fn decode_balance(return_data: &[u8]) -> U256 {
    if return_data.len() < WORD_LEN {
        return U256::ZERO;
    }
    U256::try_from_be_slice(&return_data[..WORD_LEN]).unwrap_or(U256::ZERO)
}

/// Render a raw integer amount with `decimals` fractional digits.
///
/// Trailing fractional zeros are dropped but one digit is always kept:
/// `1000000` with 6 decimals is `"1.0"`, `1500000` is `"1.5"`.
pub fn format_units(value: U256, decimals: u8) -> String {
    let digits = value.to_string();
    let decimals = decimals as usize;

    let (int_part, frac_part) = if digits.len() > decimals {
        let split = digits.len() - decimals;
        (digits[..split].to_string(), digits[split..].to_string())
    } else {
        ("0".to_string(), format!("{digits:0>decimals$}"))
    };

    let frac = frac_part.trim_end_matches('0');
    if frac.is_empty() {
        format!("{int_part}.0")
    } else {
        format!("{int_part}.{frac}")
    }
}

/// Batched balance reader over a [`BatchCaller`]
#[derive(Clone)]
pub struct ChainBatchReader {
    caller: Arc<dyn BatchCaller>,
    multicall_address: Address,
    chunk_size: usize,
}

impl ChainBatchReader {
    /// `chunk_size` is the number of wallets per submission
    pub fn new(caller: Arc<dyn BatchCaller>, multicall_address: Address, chunk_size: usize) -> Self {
        Self {
            caller,
            multicall_address,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Native and token balances for every distinct address.
    ///
    /// The result has exactly one entry per canonical input address, even
    /// when the address is malformed or every one of its calls failed.
    pub async fn fetch_balances<S: AsRef<str> + Sync>(
        &self,
        addresses: &[S],
        tokens: &[TokenConfig],
    ) -> HashMap<CanonicalAddress, WalletBalances> {
        let wallets = dedup_canonical(addresses.iter().map(|a| a.as_ref()));
        let mut balances: Vec<WalletBalances> = wallets
            .iter()
            .cloned()
            .map(WalletBalances::empty)
            .collect();

        if wallets.is_empty() {
            return HashMap::new();
        }

        let token_targets: Vec<Option<Address>> = tokens
            .iter()
            .map(|token| match parse_address(&token.address) {
                Ok(addr) => Some(addr),
                Err(e) => {
                    warn!(symbol = %token.symbol, error = %e, "Skipping token with invalid contract address");
                    None
                }
            })
            .collect();

        // Build one group of calls per wallet so a chunk never splits a wallet
        let mut groups: Vec<Vec<(PlannedCall, CallDescriptor)>> = Vec::with_capacity(wallets.len());
        for (index, wallet) in wallets.iter().enumerate() {
            let addr = match wallet.parse() {
                Ok(addr) => addr,
                Err(e) => {
                    warn!(address = %wallet, error = %e, "Unreadable wallet address, defaulting balances");
                    continue;
                }
            };

            let mut group = Vec::with_capacity(1 + tokens.len());
            group.push((
                PlannedCall {
                    wallet: index,
                    kind: CallKind::Native,
                },
                CallDescriptor {
                    target: self.multicall_address,
                    call_data: encode_get_eth_balance(addr),
                    allow_failure: true,
                },
            ));
            for (token_index, target) in token_targets.iter().enumerate() {
                let Some(target) = target else {
                    continue;
                };
                group.push((
                    PlannedCall {
                        wallet: index,
                        kind: CallKind::Token(token_index),
                    },
                    CallDescriptor {
                        target: *target,
                        call_data: encode_balance_of(addr),
                        allow_failure: true,
                    },
                ));
            }
            groups.push(group);
        }

        for (chunk_index, chunk) in groups.chunks(self.chunk_size).enumerate() {
            let (plan, calls): (Vec<PlannedCall>, Vec<CallDescriptor>) =
                chunk.iter().flatten().cloned().unzip();
            let outcomes = self.submit_chunk(chunk_index, calls).await;

            for (planned, outcome) in plan.iter().zip(outcomes) {
                let CallOutcome::Ok(data) = outcome else {
                    continue;
                };
                let raw = decode_balance(&data);
                let wallet = &mut balances[planned.wallet];
                match planned.kind {
                    CallKind::Native => {
                        wallet.native_balance = format_units(raw, NATIVE_DECIMALS);
                    }
                    CallKind::Token(token_index) => {
                        if raw > U256::ZERO {
                            let token = &tokens[token_index];
                            wallet
                                .token_balances
                                .insert(token.symbol.clone(), format_units(raw, token.decimals));
                        }
                    }
                }
            }
        }

        balances
            .into_iter()
            .map(|wallet| (wallet.address.clone(), wallet))
            .collect()
    }

    /// Native balance only, keyed by canonical address
    pub async fn native_balances<S: AsRef<str> + Sync>(
        &self,
        addresses: &[S],
    ) -> HashMap<CanonicalAddress, String> {
        self.fetch_balances(addresses, &[])
            .await
            .into_iter()
            .map(|(address, wallet)| (address, wallet.native_balance))
            .collect()
    }

    /// Submit one chunk; the result always has one outcome per call
    async fn submit_chunk(&self, chunk_index: usize, calls: Vec<CallDescriptor>) -> Vec<CallOutcome> {
        let expected = calls.len();
        match self.caller.aggregate3(calls).await {
            Ok(mut outcomes) => {
                if outcomes.len() != expected {
                    warn!(
                        chunk = chunk_index,
                        expected,
                        received = outcomes.len(),
                        "Multicall returned a mismatched result count"
                    );
                }
                outcomes.truncate(expected);
                outcomes.resize(expected, CallOutcome::Failed);
                debug!(chunk = chunk_index, calls = expected, "Multicall chunk completed");
                outcomes
            }
            Err(e) => {
                warn!(chunk = chunk_index, calls = expected, error = %e, "Multicall chunk failed");
                vec![CallOutcome::Failed; expected]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DashError;
    use alloy::primitives::address;

    const MULTICALL: Address = address!("cA11bde05977b3631167028862bE2a173976CA11");

    fn word(value: u128) -> Bytes {
        U256::from(value).to_be_bytes::<32>().to_vec().into()
    }

    fn wallet(n: usize) -> String {
        format!("0x{n:040x}")
    }

    fn tokens() -> Vec<TokenConfig> {
        crate::domain::default_tokens()
    }

    fn reader(mock: MockBatchCaller, chunk_size: usize) -> ChainBatchReader {
        ChainBatchReader::new(Arc::new(mock), MULTICALL, chunk_size)
    }

    #[test]
    fn test_balance_of_encoding() {
        let addr = address!("00000000000000000000000000000000000000aa");
        let data = encode_balance_of(addr);
        assert_eq!(data.len(), 4 + 32);
        assert_eq!(&data[..4], &[0x70, 0xa0, 0x82, 0x31]);
        assert!(data[4..35].iter().all(|b| *b == 0));
        assert_eq!(data[35], 0xaa);
    }

    #[test]
    fn test_decode_short_payload_is_zero() {
        assert_eq!(decode_balance(&[]), U256::ZERO);
        assert_eq!(decode_balance(&[0x01; 31]), U256::ZERO);
        assert_eq!(decode_balance(&word(42)), U256::from(42));
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(U256::from(1_000_000u64), 6), "1.0");
        assert_eq!(format_units(U256::from(1_500_000u64), 6), "1.5");
        assert_eq!(format_units(U256::from(1_234_560_000u64), 6), "1234.56");
        assert_eq!(format_units(U256::from(5u64), 6), "0.000005");
        assert_eq!(format_units(U256::ZERO, 18), "0.0");
        assert_eq!(format_units(U256::from(7u64), 0), "7.0");
    }

    #[tokio::test]
    async fn test_600_wallets_use_two_batches() {
        let mut mock = MockBatchCaller::new();
        mock.expect_aggregate3()
            .times(2)
            .returning(|calls| Ok(calls.iter().map(|_| CallOutcome::Ok(word(1))).collect()));

        let addresses: Vec<String> = (1..=600).map(wallet).collect();
        let result = reader(mock, 500).fetch_balances(&addresses, &tokens()).await;

        assert_eq!(result.len(), 600);
    }

    #[tokio::test]
    async fn test_chunk_sizes_follow_wallet_groups() {
        let mut mock = MockBatchCaller::new();
        let mut seq = mockall::Sequence::new();
        mock.expect_aggregate3()
            .withf(|calls| calls.len() == 2500)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|calls| Ok(vec![CallOutcome::Failed; calls.len()]));
        mock.expect_aggregate3()
            .withf(|calls| calls.len() == 500)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|calls| Ok(vec![CallOutcome::Failed; calls.len()]));

        let addresses: Vec<String> = (1..=600).map(wallet).collect();
        reader(mock, 500).fetch_balances(&addresses, &tokens()).await;
    }

    #[tokio::test]
    async fn test_failed_chunk_defaults_only_its_wallets() {
        let mut mock = MockBatchCaller::new();
        let mut seq = mockall::Sequence::new();
        mock.expect_aggregate3()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(DashError::Rpc("connection reset".into())));
        mock.expect_aggregate3()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|calls| {
                Ok(calls
                    .iter()
                    .map(|_| CallOutcome::Ok(word(2_000_000_000_000_000_000)))
                    .collect())
            });

        let addresses: Vec<String> = (1..=3).map(wallet).collect();
        let result = reader(mock, 2).fetch_balances(&addresses, &tokens()).await;

        assert_eq!(result.len(), 3);
        for n in [1, 2] {
            let unread = &result[&CanonicalAddress::new(&wallet(n))];
            assert_eq!(unread.native_balance, "0");
            assert!(unread.token_balances.is_empty());
        }
        let read = &result[&CanonicalAddress::new(&wallet(3))];
        assert_eq!(read.native_balance, "2.0");
        assert_eq!(read.token_balances.len(), tokens().len());
    }

    #[tokio::test]
    async fn test_only_nonzero_tokens_are_reported() {
        let mut mock = MockBatchCaller::new();
        // native, USDC, USDT, WETH, ARB
        mock.expect_aggregate3().times(1).returning(|_| {
            Ok(vec![
                CallOutcome::Ok(word(500_000_000_000_000_000)),
                CallOutcome::Ok(word(25_500_000)),
                CallOutcome::Ok(word(0)),
                CallOutcome::Failed,
                CallOutcome::Ok(Bytes::from_static(&[0x01, 0x02])),
            ])
        });

        let result = reader(mock, 500)
            .fetch_balances(&[wallet(9)], &tokens())
            .await;
        let balances = &result[&CanonicalAddress::new(&wallet(9))];

        assert_eq!(balances.native_balance, "0.5");
        assert_eq!(balances.token_balances.len(), 1);
        assert_eq!(balances.token_balances["USDC"], "25.5");
    }

    #[tokio::test]
    async fn test_short_response_marks_missing_calls_failed() {
        let mut mock = MockBatchCaller::new();
        mock.expect_aggregate3()
            .times(1)
            .returning(|_| Ok(vec![CallOutcome::Ok(word(1_000_000_000_000_000_000))]));

        let addresses = [wallet(1), wallet(2)];
        let result = reader(mock, 500).fetch_balances(&addresses, &[]).await;

        assert_eq!(result[&CanonicalAddress::new(&wallet(1))].native_balance, "1.0");
        assert_eq!(result[&CanonicalAddress::new(&wallet(2))].native_balance, "0");
    }

    #[tokio::test]
    async fn test_duplicates_and_bad_addresses() {
        let mut mock = MockBatchCaller::new();
        mock.expect_aggregate3()
            .withf(|calls| calls.len() == 1)
            .times(1)
            .returning(|_| Ok(vec![CallOutcome::Ok(word(3_000_000_000_000_000_000))]));

        let addresses = [
            "0x00000000000000000000000000000000000000AB".to_string(),
            "0x00000000000000000000000000000000000000ab".to_string(),
            "garbage".to_string(),
        ];
        let result = reader(mock, 500).native_balances(&addresses).await;

        assert_eq!(result.len(), 2);
        assert_eq!(
            result[&CanonicalAddress::new("0x00000000000000000000000000000000000000ab")],
            "3.0"
        );
        assert_eq!(result[&CanonicalAddress::new("garbage")], "0");
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_calls() {
        let mut mock = MockBatchCaller::new();
        mock.expect_aggregate3().times(0);
        let empty: [&str; 0] = [];
        assert!(reader(mock, 500).fetch_balances(&empty, &tokens()).await.is_empty());
    }
}
