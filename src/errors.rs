//! Definitions of errors that can occur during the execution of the contract management scripts

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

use crate::registry::Role;

/// Errors that can occur during the execution of the contract management scripts
#[derive(Debug)]
pub enum ScriptError {
    /// Error initializing the RPC client
    ClientInitialization(String),
    /// Error parsing a contract compilation artifact
    ArtifactParsing(String),
    /// Error deploying a contract.
    ///
    /// Deployments are never retried and never rolled back: a contract that
    /// was mined before a later step failed stays on-chain, unreferenced.
    ContractDeployment(String),
    /// A beacon upgrade call was rejected, either by the contract's
    /// authorization check or because the target is not a deployed contract
    UpgradeRejected(String),
    /// Error calling a contract method
    ContractInteraction(String),
    /// The registry has no address recorded for the requested role
    MissingRole(Role),
    /// Error reading the deployments registry file
    ReadRegistry(String),
    /// Error writing the deployments registry file
    WriteRegistry(String),
    /// The registry was written against a different network than the one the
    /// client is connected to
    NetworkMismatch(String),
    /// An initialization was attempted over a registry that already has
    /// deployed roles recorded
    AlreadyInitialized,
}

impl Display for ScriptError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::ClientInitialization(s) => write!(f, "error initializing client: {}", s),
            ScriptError::ArtifactParsing(s) => write!(f, "error parsing artifact: {}", s),
            ScriptError::ContractDeployment(s) => write!(f, "error deploying contract: {}", s),
            ScriptError::UpgradeRejected(s) => write!(f, "beacon upgrade rejected: {}", s),
            ScriptError::ContractInteraction(s) => {
                write!(f, "error interacting with contract: {}", s)
            }
            ScriptError::MissingRole(role) => {
                write!(f, "no address recorded for role: {}", role)
            }
            ScriptError::ReadRegistry(s) => write!(f, "error reading deployments: {}", s),
            ScriptError::WriteRegistry(s) => write!(f, "error writing deployments: {}", s),
            ScriptError::NetworkMismatch(s) => write!(f, "network mismatch: {}", s),
            ScriptError::AlreadyInitialized => {
                write!(f, "deployments registry already contains deployed roles")
            }
        }
    }
}

impl Error for ScriptError {}
