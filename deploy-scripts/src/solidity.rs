//! Definitions of Solidity functions called by the scripts

use alloy_sol_types::sol;

sol! {
    /// Registers a subscription tier on a staking factory
    function addSubscription(string memory name, uint256 period, uint256 price) external;

    /// Registers an APR bracket on a staking factory
    function addApr(uint256 apr) external;

    /// Repoints a transparent proxy, called on its `ProxyAdmin`
    function upgradeAndCall(address proxy, address implementation, bytes memory data) external payable;

    /// Repoints a transparent proxy without a call, only on 4.x `ProxyAdmin`s
    function upgrade(address proxy, address implementation) external;

    /// The upgrade interface of a `ProxyAdmin`, absent before 5.0
    function UPGRADE_INTERFACE_VERSION() external view returns (string memory);
}
