//! Constants used in the deploy scripts

/// The default path of the deployments registry file
pub const DEFAULT_DEPLOYMENTS_PATH: &str = "deployments.json";

/// The default directory containing contract compilation artifacts,
/// matching the brownie `build/contracts` layout of the contracts project
pub const DEFAULT_ARTIFACTS_DIR: &str = "build/contracts";

/// The number of confirmations to wait for the contract deployment transaction
pub const NUM_DEPLOY_CONFIRMATIONS: usize = 0;

/// The artifact name of the game store logic contract
pub const GAME_CODE_ARTIFACT: &str = "HashGameStore";

/// The artifact name of the key marketplace logic contract
pub const MARKETPLACE_CODE_ARTIFACT: &str = "HashGameMarketplace";

/// The artifact name of the upgradeable beacon contract.
///
/// The beacon is deployed with no target; its first `upgradeTo` call sets one.
pub const BEACON_ARTIFACT: &str = "UpgradeableBeacon";

/// The artifact name of the beacon proxy contract, whose constructor takes the
/// beacon address it delegates through
pub const PROXY_ARTIFACT: &str = "BeaconProxy";

/// The extension of a contract compilation artifact file
pub const ARTIFACT_EXTENSION: &str = "json";

/// The ABI key in an artifact file
pub const ARTIFACT_ABI_KEY: &str = "abi";

/// The creation bytecode key in an artifact file
pub const ARTIFACT_BYTECODE_KEY: &str = "bytecode";
