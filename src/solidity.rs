//! Solidity ABI definitions for the contracts called during deployment and
//! storefront interaction

use ethers::contract::abigen;

abigen!(
    UpgradeableBeaconContract,
    r#"[
        function upgradeTo(address newImplementation) external
        function implementation() external view returns (address)
    ]"#
);

abigen!(
    HashGameStoreContract,
    r#"[
        function playerRegister(string username) external
        function developerRegister(string username) external
        function gameRegister(string title, uint256 price) external
        function buyOriginalKey(string title) external payable
        function gameTitleToPrice(string title) external view returns (uint256)
        function getPlayerLibrary(string username) external view returns (uint256[])
        function getGameTitle(uint256 gameId) external view returns (string)
    ]"#
);
