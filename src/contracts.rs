//! Solidity bindings for the contracts read by the balance fetcher

use alloy::sol;

sol! {
    /// Multicall3, deployed at 0xcA11bde05977b3631167028862bE2a173976CA11 on every major chain
    #[allow(missing_docs)]
    #[sol(rpc)]
    interface IMulticall3 {
        struct Call3 {
            address target;
            bool allowFailure;
            bytes callData;
        }

        struct CallResult {
            bool success;
            bytes returnData;
        }

        function aggregate3(Call3[] calldata calls) external payable returns (CallResult[] memory returnData);

        function getEthBalance(address addr) external view returns (uint256 balance);
    }
}

sol! {
    #[allow(missing_docs)]
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
    }
}
