//! Implementations of the various deploy and storefront scripts

use std::{path::Path, sync::Arc};

use ethers::{providers::Middleware, types::U256};
use tracing::{info, warn};

use crate::{
    cli::{
        BuyOriginalKeyArgs, Domain, PlayerLibraryArgs, RegisterDeveloperArgs, RegisterGameArgs,
        RegisterPlayerArgs,
    },
    deploy::ContractDeployer,
    errors::ScriptError,
    registry::{Registry, Role},
    solidity::HashGameStoreContract,
};

/// Verify that the registry and the connected client agree on the network,
/// recording the chain id on first use
fn check_network(registry: &mut Registry, chain_id: u64) -> Result<(), ScriptError> {
    match registry.chain_id() {
        Some(recorded) if recorded != chain_id => Err(ScriptError::NetworkMismatch(format!(
            "registry was written for chain {}, client is connected to chain {}",
            recorded, chain_id,
        ))),
        Some(_) => Ok(()),
        None => {
            registry.set_chain_id(chain_id);
            Ok(())
        }
    }
}

/// First-time deployment of the full contract system.
///
/// Deploys both beacons and both logic contracts, points each beacon at its
/// logic, deploys the marketplace proxy, and records all five addresses in
/// the registry in a single save. Each step awaits mining before the next
/// begins.
///
/// If a step fails, nothing is recorded: contracts mined before the failure
/// stay on-chain unreferenced (deployments are irreversible), and a retry
/// deploys fresh ones rather than reusing orphans.
pub(crate) async fn initialize(
    deployer: &impl ContractDeployer,
    deployments_path: &Path,
) -> Result<(), ScriptError> {
    let mut registry = Registry::load_or_default(deployments_path)?;
    if registry.any_role_set() {
        return Err(ScriptError::AlreadyInitialized);
    }
    check_network(&mut registry, deployer.chain_id())?;

    let game_beacon = deployer.deploy_beacon(Domain::Game).await?;
    info!("game beacon deployed at {:#x}", game_beacon);

    let marketplace_beacon = deployer.deploy_beacon(Domain::Marketplace).await?;
    info!("marketplace beacon deployed at {:#x}", marketplace_beacon);

    let game_code = deployer.deploy_code(Domain::Game).await?;
    info!("game code deployed at {:#x}", game_code);

    let marketplace_code = deployer.deploy_code(Domain::Marketplace).await?;
    info!("marketplace code deployed at {:#x}", marketplace_code);

    deployer.upgrade_beacon(game_beacon, game_code).await?;
    deployer
        .upgrade_beacon(marketplace_beacon, marketplace_code)
        .await?;
    info!("beacons pointed at initial code");

    let marketplace_proxy = deployer.deploy_proxy(marketplace_beacon).await?;
    info!("marketplace proxy deployed at {:#x}", marketplace_proxy);

    registry.set(Role::GameBeacon, game_beacon);
    registry.set(Role::MarketplaceBeacon, marketplace_beacon);
    registry.set(Role::GameCode, game_code);
    registry.set(Role::MarketplaceCode, marketplace_code);
    registry.set(Role::MarketplaceProxy, marketplace_proxy);
    registry.save(deployments_path)
}

/// Deploy new logic for a domain and re-point its beacon at it.
///
/// The new code address is persisted before the beacon call, so the registry
/// always records the latest intended code. If the re-point then fails, the
/// registry and the beacon diverge until an operator intervenes; the `status`
/// command surfaces the divergence.
pub(crate) async fn upgrade(
    deployer: &impl ContractDeployer,
    domain: Domain,
    deployments_path: &Path,
) -> Result<(), ScriptError> {
    let mut registry = Registry::load_or_default(deployments_path)?;
    check_network(&mut registry, deployer.chain_id())?;

    // Check the precondition before spending gas on a deployment
    let beacon = registry.get(domain.beacon_role())?;

    let new_code = deployer.deploy_code(domain).await?;
    info!("new {} code deployed at {:#x}", domain, new_code);

    registry.set(domain.code_role(), new_code);
    registry.save(deployments_path)?;

    deployer.upgrade_beacon(beacon, new_code).await?;
    info!(
        "{} beacon at {:#x} re-pointed to {:#x}",
        domain, beacon, new_code
    );

    Ok(())
}

/// Initialize the system, then upgrade both domains to fresh logic
pub(crate) async fn rollout(
    deployer: &impl ContractDeployer,
    deployments_path: &Path,
) -> Result<(), ScriptError> {
    initialize(deployer, deployments_path).await?;
    upgrade(deployer, Domain::Game, deployments_path).await?;
    upgrade(deployer, Domain::Marketplace, deployments_path).await
}

/// Compare each domain's recorded code address against its beacon's live
/// target, warning on divergence. Never mutates the registry or the chain.
pub(crate) async fn status(
    deployer: &impl ContractDeployer,
    deployments_path: &Path,
) -> Result<(), ScriptError> {
    let mut registry = Registry::load(deployments_path)?;
    check_network(&mut registry, deployer.chain_id())?;

    for domain in [Domain::Game, Domain::Marketplace] {
        let beacon = registry.get(domain.beacon_role())?;
        let recorded = registry.get(domain.code_role())?;
        let live = deployer.beacon_target(beacon).await?;

        if live == recorded {
            info!("{} beacon target matches registry ({:#x})", domain, recorded);
        } else {
            warn!(
                "{} diverged: registry records code {:#x}, beacon points at {:#x}",
                domain, recorded, live,
            );
        }
    }

    Ok(())
}

/// Instantiate a handle to the game store contract at the registry's
/// recorded address
fn game_store<M: Middleware>(
    client: Arc<M>,
    deployments_path: &Path,
) -> Result<HashGameStoreContract<M>, ScriptError> {
    let registry = Registry::load(deployments_path)?;
    let address = registry.get(Role::GameCode)?;

    Ok(HashGameStoreContract::new(address, client))
}

/// Register a player with the game store
pub(crate) async fn register_player(
    args: RegisterPlayerArgs,
    client: Arc<impl Middleware + 'static>,
    deployments_path: &Path,
) -> Result<(), ScriptError> {
    let store = game_store(client, deployments_path)?;

    store
        .player_register(args.username.clone())
        .send()
        .await
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?
        .await
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;

    info!("registered player '{}'", args.username);
    Ok(())
}

/// Register a developer with the game store
pub(crate) async fn register_developer(
    args: RegisterDeveloperArgs,
    client: Arc<impl Middleware + 'static>,
    deployments_path: &Path,
) -> Result<(), ScriptError> {
    let store = game_store(client, deployments_path)?;

    store
        .developer_register(args.username.clone())
        .send()
        .await
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?
        .await
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;

    info!("registered developer '{}'", args.username);
    Ok(())
}

/// Register a game title and its base key price with the game store
pub(crate) async fn register_game(
    args: RegisterGameArgs,
    client: Arc<impl Middleware + 'static>,
    deployments_path: &Path,
) -> Result<(), ScriptError> {
    let store = game_store(client, deployments_path)?;

    store
        .game_register(args.title.clone(), U256::from(args.price))
        .send()
        .await
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?
        .await
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;

    info!(
        "registered game '{}' with base price of {} wei",
        args.title, args.price
    );
    Ok(())
}

/// Buy an original key for a game, attaching its current base price as the
/// transaction value
pub(crate) async fn buy_original_key(
    args: BuyOriginalKeyArgs,
    client: Arc<impl Middleware + 'static>,
    deployments_path: &Path,
) -> Result<(), ScriptError> {
    let store = game_store(client, deployments_path)?;

    let price = store
        .game_title_to_price(args.title.clone())
        .call()
        .await
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;

    store
        .buy_original_key(args.title.clone())
        .value(price)
        .send()
        .await
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?
        .await
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;

    info!("bought an original key for '{}' at {} wei", args.title, price);
    Ok(())
}

/// Print a player's game library, with duplicate keys counted per title
pub(crate) async fn player_library(
    args: PlayerLibraryArgs,
    client: Arc<impl Middleware + 'static>,
    deployments_path: &Path,
) -> Result<(), ScriptError> {
    let store = game_store(client, deployments_path)?;

    let game_ids: Vec<U256> = store
        .get_player_library(args.username.clone())
        .call()
        .await
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;

    // Count duplicate keys per game id, keeping first-seen order
    let mut counts: Vec<(U256, usize)> = Vec::new();
    for id in game_ids {
        match counts.iter_mut().find(|(seen, _)| *seen == id) {
            Some((_, count)) => *count += 1,
            None => counts.push((id, 1)),
        }
    }

    let mut titles = Vec::with_capacity(counts.len());
    for (id, count) in counts {
        let title = store
            .get_game_title(id)
            .call()
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;
        titles.push((title, count));
    }

    println!("{}'s library is: {}", args.username, format_library(&titles));
    Ok(())
}

/// Render a library as a comma-separated list of titles, annotating titles
/// owned more than once with their key count
fn format_library(titles: &[(String, usize)]) -> String {
    titles
        .iter()
        .map(|(title, count)| {
            if *count > 1 {
                format!("{}({})", title, count)
            } else {
                title.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use std::{
        collections::{HashMap, HashSet},
        sync::{
            atomic::{AtomicBool, AtomicU64, Ordering},
            Mutex,
        },
    };

    use async_trait::async_trait;
    use ethers::types::Address;
    use tempfile::tempdir;

    use super::{format_library, initialize, rollout, status, upgrade};
    use crate::{
        cli::Domain,
        deploy::ContractDeployer,
        errors::ScriptError,
        registry::{Registry, Role},
    };

    /// The chain id the mock deployer reports
    const MOCK_CHAIN_ID: u64 = 31337;

    /// A deployer that hands out fresh addresses and tracks beacon targets in
    /// memory, standing in for the chain
    struct MockDeployer {
        /// Source of fresh, distinct addresses
        next_address: AtomicU64,
        /// Each beacon's current target
        beacons: Mutex<HashMap<Address, Address>>,
        /// Whether upgrade calls should be rejected
        reject_upgrades: AtomicBool,
    }

    impl MockDeployer {
        /// A mock with no deployments yet
        fn new() -> Self {
            Self {
                next_address: AtomicU64::new(1),
                beacons: Mutex::new(HashMap::new()),
                reject_upgrades: AtomicBool::new(false),
            }
        }

        /// Make all subsequent upgrade calls fail with `UpgradeRejected`
        fn reject_upgrades(&self) {
            self.reject_upgrades.store(true, Ordering::SeqCst);
        }

        /// The next fresh address
        fn fresh_address(&self) -> Address {
            Address::from_low_u64_be(self.next_address.fetch_add(1, Ordering::SeqCst))
        }

        /// The live target of a beacon, as the chain would report it
        fn target(&self, beacon: Address) -> Option<Address> {
            self.beacons.lock().unwrap().get(&beacon).copied()
        }
    }

    #[async_trait]
    impl ContractDeployer for MockDeployer {
        fn chain_id(&self) -> u64 {
            MOCK_CHAIN_ID
        }

        async fn deploy_code(&self, _domain: Domain) -> Result<Address, ScriptError> {
            Ok(self.fresh_address())
        }

        async fn deploy_beacon(&self, _domain: Domain) -> Result<Address, ScriptError> {
            Ok(self.fresh_address())
        }

        async fn deploy_proxy(&self, _beacon: Address) -> Result<Address, ScriptError> {
            Ok(self.fresh_address())
        }

        async fn upgrade_beacon(
            &self,
            beacon: Address,
            new_code: Address,
        ) -> Result<(), ScriptError> {
            if self.reject_upgrades.load(Ordering::SeqCst) {
                return Err(ScriptError::UpgradeRejected("rejected by mock".to_string()));
            }

            self.beacons.lock().unwrap().insert(beacon, new_code);
            Ok(())
        }

        async fn beacon_target(&self, beacon: Address) -> Result<Address, ScriptError> {
            self.target(beacon)
                .ok_or_else(|| ScriptError::ContractInteraction("unknown beacon".to_string()))
        }
    }

    /// A temp registry path for a test
    fn registry_path(dir: &tempfile::TempDir) -> std::path::PathBuf {
        dir.path().join("deployments.json")
    }

    /// Initialization records five distinct addresses and points both beacons
    /// at their code
    #[tokio::test]
    async fn initialize_records_all_roles() {
        let dir = tempdir().unwrap();
        let path = registry_path(&dir);
        let deployer = MockDeployer::new();

        initialize(&deployer, &path).await.unwrap();

        let registry = Registry::load(&path).unwrap();
        let addresses: HashSet<Address> = Role::ALL
            .iter()
            .map(|role| registry.get(*role).unwrap())
            .collect();
        assert_eq!(addresses.len(), 5);
        assert!(!addresses.contains(&Address::zero()));
        assert_eq!(registry.chain_id(), Some(MOCK_CHAIN_ID));

        for domain in [Domain::Game, Domain::Marketplace] {
            let beacon = registry.get(domain.beacon_role()).unwrap();
            let code = registry.get(domain.code_role()).unwrap();
            assert_eq!(deployer.target(beacon), Some(code));
        }
    }

    /// A second initialization over the same registry fails outright rather
    /// than redeploying
    #[tokio::test]
    async fn initialize_twice_fails() {
        let dir = tempdir().unwrap();
        let path = registry_path(&dir);
        let deployer = MockDeployer::new();

        initialize(&deployer, &path).await.unwrap();
        let before = Registry::load(&path).unwrap();

        let result = initialize(&deployer, &path).await;
        assert!(matches!(result, Err(ScriptError::AlreadyInitialized)));

        // Nothing was overwritten
        assert_eq!(Registry::load(&path).unwrap(), before);
    }

    /// Upgrading a domain replaces only that domain's code address
    #[tokio::test]
    async fn upgrade_changes_only_its_domain() {
        let dir = tempdir().unwrap();
        let path = registry_path(&dir);
        let deployer = MockDeployer::new();

        initialize(&deployer, &path).await.unwrap();
        let before = Registry::load(&path).unwrap();

        upgrade(&deployer, Domain::Game, &path).await.unwrap();
        let after = Registry::load(&path).unwrap();

        let new_code = after.get(Role::GameCode).unwrap();
        assert_ne!(new_code, before.get(Role::GameCode).unwrap());
        for role in [
            Role::GameBeacon,
            Role::MarketplaceBeacon,
            Role::MarketplaceCode,
            Role::MarketplaceProxy,
        ] {
            assert_eq!(after.get(role).unwrap(), before.get(role).unwrap());
        }

        // The beacon follows the registry
        let beacon = after.get(Role::GameBeacon).unwrap();
        assert_eq!(deployer.target(beacon), Some(new_code));
    }

    /// A rejected beacon call still leaves the new code address in the
    /// registry, while the beacon keeps its pre-upgrade target: the
    /// documented divergence window
    #[tokio::test]
    async fn rejected_upgrade_records_code_but_not_beacon() {
        let dir = tempdir().unwrap();
        let path = registry_path(&dir);
        let deployer = MockDeployer::new();

        initialize(&deployer, &path).await.unwrap();
        let before = Registry::load(&path).unwrap();
        let old_code = before.get(Role::MarketplaceCode).unwrap();
        let beacon = before.get(Role::MarketplaceBeacon).unwrap();

        deployer.reject_upgrades();
        let result = upgrade(&deployer, Domain::Marketplace, &path).await;
        assert!(matches!(result, Err(ScriptError::UpgradeRejected(_))));

        // Registry already shows the new, unapplied code address
        let after = Registry::load(&path).unwrap();
        let recorded = after.get(Role::MarketplaceCode).unwrap();
        assert_ne!(recorded, old_code);

        // The live beacon target is unchanged
        assert_eq!(deployer.target(beacon), Some(old_code));

        // The reconciliation read over this state still succeeds
        status(&deployer, &path).await.unwrap();
    }

    /// Upgrading a domain whose beacon was never recorded fails before any
    /// deployment is attempted
    #[tokio::test]
    async fn upgrade_requires_recorded_beacon() {
        let dir = tempdir().unwrap();
        let path = registry_path(&dir);
        let deployer = MockDeployer::new();

        let result = upgrade(&deployer, Domain::Game, &path).await;
        assert!(matches!(
            result,
            Err(ScriptError::MissingRole(Role::GameBeacon))
        ));

        // No code was deployed for the aborted upgrade
        assert_eq!(deployer.next_address.load(Ordering::SeqCst), 1);
    }

    /// A registry written for another chain is rejected before any deployment
    #[tokio::test]
    async fn mismatched_network_rejected() {
        let dir = tempdir().unwrap();
        let path = registry_path(&dir);

        let mut registry = Registry::default();
        registry.set_chain_id(1);
        registry.set(Role::GameBeacon, Address::from_low_u64_be(42));
        registry.save(&path).unwrap();

        let deployer = MockDeployer::new();
        let result = upgrade(&deployer, Domain::Game, &path).await;
        assert!(matches!(result, Err(ScriptError::NetworkMismatch(_))));
        assert_eq!(deployer.next_address.load(Ordering::SeqCst), 1);
    }

    /// A rollout ends with both beacons pointing at the registry's recorded
    /// code
    #[tokio::test]
    async fn rollout_leaves_beacons_in_sync() {
        let dir = tempdir().unwrap();
        let path = registry_path(&dir);
        let deployer = MockDeployer::new();

        rollout(&deployer, &path).await.unwrap();

        let registry = Registry::load(&path).unwrap();
        for domain in [Domain::Game, Domain::Marketplace] {
            let beacon = registry.get(domain.beacon_role()).unwrap();
            let code = registry.get(domain.code_role()).unwrap();
            assert_eq!(deployer.target(beacon), Some(code));
        }
    }

    /// The reconciliation read requires an existing registry
    #[tokio::test]
    async fn status_requires_registry_file() {
        let dir = tempdir().unwrap();
        let deployer = MockDeployer::new();

        let result = status(&deployer, &registry_path(&dir)).await;
        assert!(matches!(result, Err(ScriptError::ReadRegistry(_))));
    }

    /// Duplicate keys are rendered with a per-title count
    #[test]
    fn library_formatting() {
        let titles = vec![
            ("Idle Paladin".to_string(), 2),
            ("Death Stranding".to_string(), 1),
        ];
        assert_eq!(format_library(&titles), "Idle Paladin(2), Death Stranding");
        assert_eq!(format_library(&[]), "");
    }
}
