use alloy::sol;

sol! {
    /// One sub-call of an aggregate3 batch.
    struct Call3 {
        address target;
        bool allowFailure;
        bytes callData;
    }

    /// Per-call outcome; `success == false` means the sub-call reverted.
    struct McResult {
        bool success;
        bytes returnData;
    }

    #[sol(rpc)]
    interface IMulticall3 {
        function aggregate3(Call3[] calldata calls) external payable returns (McResult[] memory returnData);
        function getBlockNumber() external view returns (uint256 blockNumber);
    }
}
