//! The contract deployment layer: submitting contract-creation transactions
//! and beacon upgrade calls, and awaiting their mining.
//!
//! The [`ContractDeployer`] trait is the seam over the chain client; the
//! orchestrator in `commands` is written against it so its sequencing can be
//! exercised without a network.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use ethers::{
    abi::Tokenize, contract::ContractFactory, providers::Middleware, types::Address,
};

use crate::{
    cli::Domain,
    constants::{BEACON_ARTIFACT, NUM_DEPLOY_CONFIRMATIONS, PROXY_ARTIFACT},
    errors::ScriptError,
    solidity::UpgradeableBeaconContract,
    utils::load_artifact,
};

/// The deployment and beacon-management operations the orchestrator needs.
///
/// Every method blocks until the submitted transaction is mined or the call
/// fails; there is no retry and no cancellation at this layer. A mined
/// deployment is irreversible.
#[async_trait]
pub trait ContractDeployer {
    /// The id of the chain the deployer is connected to
    fn chain_id(&self) -> u64;

    /// Deploy a new logic contract for the given domain
    async fn deploy_code(&self, domain: Domain) -> Result<Address, ScriptError>;

    /// Deploy a new beacon for the given domain. The beacon starts with no
    /// target; the first upgrade call sets one.
    async fn deploy_beacon(&self, domain: Domain) -> Result<Address, ScriptError>;

    /// Deploy a proxy bound at construction to the given beacon. The proxy's
    /// delegation lives entirely in the external contract; upgrades go
    /// through the beacon, never the proxy.
    async fn deploy_proxy(&self, beacon: Address) -> Result<Address, ScriptError>;

    /// Re-point the beacon at a new logic contract. This is the only mutator
    /// of a beacon's target; authorization is enforced by the contract.
    async fn upgrade_beacon(&self, beacon: Address, new_code: Address) -> Result<(), ScriptError>;

    /// Read the beacon's current target from the chain
    async fn beacon_target(&self, beacon: Address) -> Result<Address, ScriptError>;
}

/// A [`ContractDeployer`] backed by an ethers client, deploying from
/// compilation artifacts on disk.
pub struct EthersDeployer<M> {
    /// The RPC client, with the deployer's signer attached
    client: Arc<M>,
    /// The chain id reported by the connected network
    chain_id: u64,
    /// The directory holding contract compilation artifacts
    artifacts_dir: PathBuf,
}

impl<M: Middleware + 'static> EthersDeployer<M> {
    /// Construct a deployer, fetching the connected network's chain id
    pub async fn new(client: Arc<M>, artifacts_dir: &Path) -> Result<Self, ScriptError> {
        let chain_id = client
            .get_chainid()
            .await
            .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?
            .as_u64();

        Ok(Self {
            client,
            chain_id,
            artifacts_dir: artifacts_dir.to_path_buf(),
        })
    }

    /// Deploy the named artifact with the given constructor arguments,
    /// awaiting mining and returning the deployed address
    async fn deploy_artifact<T: Tokenize>(
        &self,
        name: &str,
        constructor_args: T,
    ) -> Result<Address, ScriptError> {
        let (abi, bytecode) = load_artifact(&self.artifacts_dir, name)?;
        let factory = ContractFactory::new(abi, bytecode, self.client.clone());

        let contract = factory
            .deploy(constructor_args)
            .map_err(|e| ScriptError::ContractDeployment(e.to_string()))?
            .confirmations(NUM_DEPLOY_CONFIRMATIONS)
            .send()
            .await
            .map_err(|e| ScriptError::ContractDeployment(e.to_string()))?;

        Ok(contract.address())
    }
}

#[async_trait]
impl<M: Middleware + 'static> ContractDeployer for EthersDeployer<M> {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn deploy_code(&self, domain: Domain) -> Result<Address, ScriptError> {
        self.deploy_artifact(domain.code_artifact(), ()).await
    }

    async fn deploy_beacon(&self, _domain: Domain) -> Result<Address, ScriptError> {
        self.deploy_artifact(BEACON_ARTIFACT, ()).await
    }

    async fn deploy_proxy(&self, beacon: Address) -> Result<Address, ScriptError> {
        self.deploy_artifact(PROXY_ARTIFACT, (beacon,)).await
    }

    async fn upgrade_beacon(&self, beacon: Address, new_code: Address) -> Result<(), ScriptError> {
        let beacon = UpgradeableBeaconContract::new(beacon, self.client.clone());

        beacon
            .upgrade_to(new_code)
            .send()
            .await
            .map_err(|e| ScriptError::UpgradeRejected(e.to_string()))?
            .await
            .map_err(|e| ScriptError::UpgradeRejected(e.to_string()))?;

        Ok(())
    }

    async fn beacon_target(&self, beacon: Address) -> Result<Address, ScriptError> {
        let beacon = UpgradeableBeaconContract::new(beacon, self.client.clone());

        beacon
            .implementation()
            .call()
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))
    }
}
