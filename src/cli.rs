//! Definitions of CLI arguments and commands for deploy scripts

use std::{
    fmt::{self, Display},
    path::Path,
    sync::Arc,
};

use clap::{Args, Parser, Subcommand, ValueEnum};
use ethers::providers::Middleware;

use crate::{
    commands::{
        buy_original_key, initialize, player_library, register_developer, register_game,
        register_player, rollout, status, upgrade,
    },
    constants::{DEFAULT_ARTIFACTS_DIR, DEFAULT_DEPLOYMENTS_PATH, GAME_CODE_ARTIFACT, MARKETPLACE_CODE_ARTIFACT},
    deploy::EthersDeployer,
    errors::ScriptError,
    registry::Role,
};

/// Scripts for deploying, upgrading, and interacting with the HashGameStore
/// contracts
#[derive(Parser)]
pub struct Cli {
    /// Private key of the deployer
    // TODO: Better key management
    #[arg(short, long)]
    pub priv_key: String,

    /// Network RPC URL
    #[arg(short, long)]
    pub rpc_url: String,

    /// Path to the deployments registry file
    #[arg(short, long, default_value = DEFAULT_DEPLOYMENTS_PATH)]
    pub deployments_path: String,

    /// Directory containing the contract compilation artifacts
    #[arg(short, long, default_value = DEFAULT_ARTIFACTS_DIR)]
    pub artifacts_dir: String,

    /// The command to run
    #[command(subcommand)]
    pub command: Command,
}

/// The two independently upgradeable subsystems
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum Domain {
    /// The game store
    Game,
    /// The key resale marketplace
    Marketplace,
}

impl Domain {
    /// The registry role of the domain's logic contract
    pub fn code_role(self) -> Role {
        match self {
            Domain::Game => Role::GameCode,
            Domain::Marketplace => Role::MarketplaceCode,
        }
    }

    /// The registry role of the domain's beacon
    pub fn beacon_role(self) -> Role {
        match self {
            Domain::Game => Role::GameBeacon,
            Domain::Marketplace => Role::MarketplaceBeacon,
        }
    }

    /// The artifact name of the domain's logic contract
    pub(crate) fn code_artifact(self) -> &'static str {
        match self {
            Domain::Game => GAME_CODE_ARTIFACT,
            Domain::Marketplace => MARKETPLACE_CODE_ARTIFACT,
        }
    }
}

impl Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::Game => write!(f, "game"),
            Domain::Marketplace => write!(f, "marketplace"),
        }
    }
}

/// The deploy script commands
#[derive(Subcommand)]
pub enum Command {
    /// First-time deployment: both beacons, both logic contracts, beacon
    /// re-points, and the marketplace proxy, recorded in the registry in one
    /// save. Fails if the registry already has roles recorded.
    Initialize,
    /// Deploy new logic for a domain and re-point its beacon at it
    Upgrade(UpgradeArgs),
    /// Initialize, then upgrade both domains to fresh logic contracts
    Rollout,
    /// Compare each domain's registry code address against its beacon's live
    /// target, without mutating anything
    Status,
    /// Register a player with the game store
    RegisterPlayer(RegisterPlayerArgs),
    /// Register a developer with the game store
    RegisterDeveloper(RegisterDeveloperArgs),
    /// Register a game title and its base price with the game store
    RegisterGame(RegisterGameArgs),
    /// Buy an original key for a game, paying its current base price
    BuyOriginalKey(BuyOriginalKeyArgs),
    /// Print a player's game library
    PlayerLibrary(PlayerLibraryArgs),
}

/// Arguments to the `upgrade` command
#[derive(Args)]
pub struct UpgradeArgs {
    /// The domain whose logic contract to upgrade
    #[arg(long, value_enum)]
    pub domain: Domain,
}

/// Arguments to the `register-player` command
#[derive(Args)]
pub struct RegisterPlayerArgs {
    /// The player's username
    #[arg(short, long)]
    pub username: String,
}

/// Arguments to the `register-developer` command
#[derive(Args)]
pub struct RegisterDeveloperArgs {
    /// The developer's username
    #[arg(short, long)]
    pub username: String,
}

/// Arguments to the `register-game` command
#[derive(Args)]
pub struct RegisterGameArgs {
    /// The game title
    #[arg(short, long)]
    pub title: String,

    /// The base price of an original key, in wei
    #[arg(short, long)]
    pub price: u128,
}

/// Arguments to the `buy-original-key` command
#[derive(Args)]
pub struct BuyOriginalKeyArgs {
    /// The title of the game to buy a key for
    #[arg(short, long)]
    pub title: String,
}

/// Arguments to the `player-library` command
#[derive(Args)]
pub struct PlayerLibraryArgs {
    /// The player's username
    #[arg(short, long)]
    pub username: String,
}

impl Command {
    /// Run the command against the given client
    pub async fn run(
        self,
        client: Arc<impl Middleware + 'static>,
        deployments_path: &str,
        artifacts_dir: &str,
    ) -> Result<(), ScriptError> {
        let deployments_path = Path::new(deployments_path);
        let artifacts_dir = Path::new(artifacts_dir);

        match self {
            Command::Initialize => {
                let deployer = EthersDeployer::new(client, artifacts_dir).await?;
                initialize(&deployer, deployments_path).await
            }
            Command::Upgrade(args) => {
                let deployer = EthersDeployer::new(client, artifacts_dir).await?;
                upgrade(&deployer, args.domain, deployments_path).await
            }
            Command::Rollout => {
                let deployer = EthersDeployer::new(client, artifacts_dir).await?;
                rollout(&deployer, deployments_path).await
            }
            Command::Status => {
                let deployer = EthersDeployer::new(client, artifacts_dir).await?;
                status(&deployer, deployments_path).await
            }
            Command::RegisterPlayer(args) => {
                register_player(args, client, deployments_path).await
            }
            Command::RegisterDeveloper(args) => {
                register_developer(args, client, deployments_path).await
            }
            Command::RegisterGame(args) => register_game(args, client, deployments_path).await,
            Command::BuyOriginalKey(args) => {
                buy_original_key(args, client, deployments_path).await
            }
            Command::PlayerLibrary(args) => player_library(args, client, deployments_path).await,
        }
    }
}
