//! ABI bindings for every contract the solvers read or write.

use alloy_sol_types::sol;

sol! {
	interface IERC20 {
		function allowance(address owner, address spender) external view returns (uint256);
		function approve(address spender, uint256 amount) external returns (bool);
	}

	/// Yearn-style vault.
	interface IVault {
		function pricePerShare() external view returns (uint256);
		function deposit(uint256 amount) external returns (uint256);
		function withdraw(uint256 maxShares) external returns (uint256);
	}

	/// Deposits on behalf of a vault while attributing them to a partner.
	interface IPartnerTracker {
		function deposit(address vault, address partnerId, uint256 amount) external returns (uint256);
	}

	/// Wraps the native coin before depositing, unwraps on withdrawal.
	interface INativeZap {
		function deposit() external payable;
		function withdraw(uint256 amount) external;
	}

	interface IStakingRewardsZap {
		function zapIn(address vault, uint256 amount) external returns (uint256);
	}

	interface IStakingRewards {
		function stake(uint256 amount) external;
		function withdraw(uint256 amount) external;
	}
}
