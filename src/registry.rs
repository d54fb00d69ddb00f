//! The deployments registry: a persisted mapping from logical contract role
//! to the currently deployed on-chain address.
//!
//! The registry is the driver-side source of truth for "which address is
//! current"; the chain remains the source of truth for what a beacon actually
//! points at. The orchestrator keeps the two consistent, and the `status`
//! command reconciles them.

use std::{
    fmt::{self, Display},
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use ethers::types::Address;
use serde::{Deserialize, Serialize};

use crate::errors::ScriptError;

/// The logical roles tracked by the registry, one current address each.
///
/// The `Display` impl renders the role's key in the deployments file.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Role {
    /// The game store logic contract
    GameCode,
    /// The beacon pointing at the current game store logic
    GameBeacon,
    /// The marketplace logic contract
    MarketplaceCode,
    /// The beacon pointing at the current marketplace logic
    MarketplaceBeacon,
    /// The stable-address proxy delegating through the marketplace beacon
    MarketplaceProxy,
}

impl Role {
    /// All roles, in deployment order
    pub const ALL: [Role; 5] = [
        Role::GameBeacon,
        Role::MarketplaceBeacon,
        Role::GameCode,
        Role::MarketplaceCode,
        Role::MarketplaceProxy,
    ];
}

impl Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::GameCode => write!(f, "gameCode"),
            Role::GameBeacon => write!(f, "gameBeacon"),
            Role::MarketplaceCode => write!(f, "marketplaceCode"),
            Role::MarketplaceBeacon => write!(f, "marketplaceBeacon"),
            Role::MarketplaceProxy => write!(f, "marketplaceProxy"),
        }
    }
}

/// The persisted registry of deployed contract addresses.
///
/// Only the current address per role is kept; superseded addresses live on in
/// the chain's history alone.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Registry {
    /// The id of the chain the recorded addresses were deployed to
    #[serde(skip_serializing_if = "Option::is_none")]
    chain_id: Option<u64>,
    /// The current game store logic contract address
    #[serde(skip_serializing_if = "Option::is_none")]
    game_code: Option<Address>,
    /// The game beacon address
    #[serde(skip_serializing_if = "Option::is_none")]
    game_beacon: Option<Address>,
    /// The current marketplace logic contract address
    #[serde(skip_serializing_if = "Option::is_none")]
    marketplace_code: Option<Address>,
    /// The marketplace beacon address
    #[serde(skip_serializing_if = "Option::is_none")]
    marketplace_beacon: Option<Address>,
    /// The marketplace proxy address
    #[serde(skip_serializing_if = "Option::is_none")]
    marketplace_proxy: Option<Address>,
}

impl Registry {
    /// Read the registry from `path`.
    ///
    /// A missing file is an error here; use [`Registry::load_or_default`]
    /// where a first run is expected.
    pub fn load(path: &Path) -> Result<Self, ScriptError> {
        let contents =
            fs::read_to_string(path).map_err(|e| ScriptError::ReadRegistry(e.to_string()))?;

        serde_json::from_str(&contents).map_err(|e| ScriptError::ReadRegistry(e.to_string()))
    }

    /// Read the registry from `path`, treating a missing file as an empty
    /// registry. This is the expected state on a first run.
    pub fn load_or_default(path: &Path) -> Result<Self, ScriptError> {
        match fs::read_to_string(path) {
            Ok(contents) => {
                serde_json::from_str(&contents).map_err(|e| ScriptError::ReadRegistry(e.to_string()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ScriptError::ReadRegistry(e.to_string())),
        }
    }

    /// Persist the full registry to `path`, overwriting atomically.
    ///
    /// The file is written to a sibling temp path and renamed over the
    /// target, so a concurrent reader sees either the old or the new
    /// registry, never a partial write.
    pub fn save(&self, path: &Path) -> Result<(), ScriptError> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| ScriptError::WriteRegistry(e.to_string()))?;

        let mut tmp_path = path.as_os_str().to_owned();
        tmp_path.push(".tmp");
        let tmp_path = PathBuf::from(tmp_path);

        fs::write(&tmp_path, contents).map_err(|e| ScriptError::WriteRegistry(e.to_string()))?;
        fs::rename(&tmp_path, path).map_err(|e| ScriptError::WriteRegistry(e.to_string()))
    }

    /// Get the current address for `role`, failing if none was ever recorded
    pub fn get(&self, role: Role) -> Result<Address, ScriptError> {
        self.slot(role).ok_or(ScriptError::MissingRole(role))
    }

    /// Insert or overwrite the address for `role`.
    ///
    /// In-memory only; the caller persists via [`Registry::save`].
    pub fn set(&mut self, role: Role, address: Address) {
        *self.slot_mut(role) = Some(address);
    }

    /// Whether any role has an address recorded
    pub fn any_role_set(&self) -> bool {
        Role::ALL.iter().any(|role| self.slot(*role).is_some())
    }

    /// The chain id the registry was written against, if recorded
    pub fn chain_id(&self) -> Option<u64> {
        self.chain_id
    }

    /// Record the chain id the registry is being written against
    pub fn set_chain_id(&mut self, chain_id: u64) {
        self.chain_id = Some(chain_id);
    }

    /// The recorded address for `role`, if any
    fn slot(&self, role: Role) -> Option<Address> {
        match role {
            Role::GameCode => self.game_code,
            Role::GameBeacon => self.game_beacon,
            Role::MarketplaceCode => self.marketplace_code,
            Role::MarketplaceBeacon => self.marketplace_beacon,
            Role::MarketplaceProxy => self.marketplace_proxy,
        }
    }

    /// A mutable reference to the slot for `role`
    fn slot_mut(&mut self, role: Role) -> &mut Option<Address> {
        match role {
            Role::GameCode => &mut self.game_code,
            Role::GameBeacon => &mut self.game_beacon,
            Role::MarketplaceCode => &mut self.marketplace_code,
            Role::MarketplaceBeacon => &mut self.marketplace_beacon,
            Role::MarketplaceProxy => &mut self.marketplace_proxy,
        }
    }
}
