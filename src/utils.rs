//! Utilities for the deploy scripts.

use std::{path::Path, str::FromStr, sync::Arc};

use ethers::{
    abi::Contract,
    middleware::SignerMiddleware,
    providers::{Http, Middleware, Provider},
    signers::{LocalWallet, Signer},
    types::Bytes,
    utils::hex::FromHex,
};

use crate::{
    constants::{ARTIFACT_ABI_KEY, ARTIFACT_BYTECODE_KEY, ARTIFACT_EXTENSION},
    errors::ScriptError,
};

/// Sets up the client with which to deploy and call contracts, from the
/// deployer's private key and the network RPC URL.
pub async fn setup_client(
    priv_key: &str,
    rpc_url: &str,
) -> Result<Arc<impl Middleware>, ScriptError> {
    let provider = Provider::<Http>::try_from(rpc_url)
        .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;

    let wallet = LocalWallet::from_str(priv_key)
        .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;
    let chain_id = provider
        .get_chainid()
        .await
        .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?
        .as_u64();
    let client = Arc::new(SignerMiddleware::new(
        provider,
        wallet.clone().with_chain_id(chain_id),
    ));

    Ok(client)
}

/// Loads a contract compilation artifact from the artifacts directory,
/// returning its ABI and creation bytecode.
///
/// Artifacts are expected in the contracts project's build layout: one JSON
/// file per contract with `abi` and `bytecode` fields.
pub fn load_artifact(artifacts_dir: &Path, name: &str) -> Result<(Contract, Bytes), ScriptError> {
    let path = artifacts_dir.join(name).with_extension(ARTIFACT_EXTENSION);
    let contents = std::fs::read_to_string(&path).map_err(|e| {
        ScriptError::ArtifactParsing(format!("{}: {}", path.display(), e))
    })?;

    let artifact: serde_json::Value = serde_json::from_str(&contents)
        .map_err(|e| ScriptError::ArtifactParsing(e.to_string()))?;

    let abi: Contract = serde_json::from_value(artifact[ARTIFACT_ABI_KEY].clone())
        .map_err(|e| ScriptError::ArtifactParsing(e.to_string()))?;

    let bytecode_hex = artifact[ARTIFACT_BYTECODE_KEY].as_str().ok_or_else(|| {
        ScriptError::ArtifactParsing(format!("no creation bytecode in artifact for {}", name))
    })?;
    let bytecode = Bytes::from_hex(bytecode_hex)
        .map_err(|e| ScriptError::ArtifactParsing(e.to_string()))?;

    Ok((abi, bytecode))
}
