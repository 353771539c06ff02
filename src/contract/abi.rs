//! Contract ABI bindings (read functions only)

use alloy_sol_types::sol;

sol! {
    /// BasePulse polls contract
    interface IPollsContract {
        function owner() external view returns (address);

        function nextPollId() external view returns (uint256);

        function getPoll(uint256 pollId) external view returns (
            uint256 id,
            string question,
            string[] options,
            uint256 endTime,
            bool isActive,
            address creator,
            uint256 totalFunding,
            uint256 totalVotes,
            address fundingToken
        );

        function hasUserVoted(uint256 pollId, address user) external view returns (bool);
    }

    /// ERC-20 reads used for reward tokens
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);

        function decimals() external view returns (uint8);

        function symbol() external view returns (string);
    }
}
