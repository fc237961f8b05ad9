//! Multicall3 `aggregate3` over an alloy HTTP provider.

use alloy::primitives::Address;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use async_trait::async_trait;
use tracing::debug;

use crate::analytics::balances::{BatchCaller, CallDescriptor, CallOutcome};
use crate::contracts::IMulticall3;
use crate::domain::parse_address;
use crate::error::{DashError, Result};

/// [`BatchCaller`] backed by a deployed Multicall3 contract
#[derive(Clone)]
pub struct AlloyMulticall {
    provider: DynProvider,
    multicall_address: Address,
}

impl AlloyMulticall {
    pub fn new(rpc_url: &str, multicall_address: &str) -> Result<Self> {
        let url = rpc_url
            .parse()
            .map_err(|e| DashError::Validation(format!("Invalid RPC URL {rpc_url}: {e}")))?;
        let provider = ProviderBuilder::new().connect_http(url).erased();

        Ok(Self {
            provider,
            multicall_address: parse_address(multicall_address)?,
        })
    }

    pub fn multicall_address(&self) -> Address {
        self.multicall_address
    }
}

fn to_call3(call: CallDescriptor) -> IMulticall3::Call3 {
    IMulticall3::Call3 {
        target: call.target,
        allowFailure: call.allow_failure,
        callData: call.call_data,
    }
}

fn to_outcome(result: IMulticall3::CallResult) -> CallOutcome {
    if result.success {
        CallOutcome::Ok(result.returnData)
    } else {
        CallOutcome::Failed
    }
}

#[async_trait]
impl BatchCaller for AlloyMulticall {
    async fn aggregate3(&self, calls: Vec<CallDescriptor>) -> Result<Vec<CallOutcome>> {
        let count = calls.len();
        let contract = IMulticall3::new(self.multicall_address, self.provider.clone());
        let results = contract
            .aggregate3(calls.into_iter().map(to_call3).collect())
            .call()
            .await
            .map_err(|e| DashError::Rpc(format!("aggregate3 with {count} calls failed: {e}")))?;

        debug!(calls = count, results = results.len(), "aggregate3 returned");
        Ok(results.into_iter().map(to_outcome).collect())
    }
}
