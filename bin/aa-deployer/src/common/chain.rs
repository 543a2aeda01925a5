//! Chain connection and factory argument groups shared by the commands.

use std::time::Duration;

use aa_deploy::{Create2Factory, RpcChain};
use alloy_signer_local::PrivateKeySigner;
use clap::Parser;
use tracing::info;

use super::{load_hex, DeployerError, Result};

/// RPC connection and signing arguments
#[derive(Parser, Debug, Clone)]
pub struct ChainArgs {
    /// RPC URL of the target chain
    #[arg(long = "rpc", env = "RPC_URL", default_value = "http://localhost:8545")]
    pub rpc: String,

    /// Private key of the operator account paying for deployments
    #[arg(long = "private-key", env = "DEPLOYER_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: Option<String>,

    /// Interval between receipt polls, in milliseconds
    #[arg(long = "receipt.poll-interval-ms", default_value = "1000")]
    pub poll_interval_ms: u64,

    /// How long to wait for a transaction to be included, in seconds
    #[arg(long = "receipt.timeout-secs", default_value = "120")]
    pub receipt_timeout_secs: u64,
}

impl ChainArgs {
    /// Parses the operator key.
    pub fn signer(&self) -> Result<PrivateKeySigner> {
        let key = self.private_key.as_deref().ok_or_else(|| {
            DeployerError::InvalidInput(
                "no private key: pass --private-key or set DEPLOYER_PRIVATE_KEY".to_string(),
            )
        })?;
        // The key itself must not end up in error messages
        key.trim()
            .parse()
            .map_err(|_| DeployerError::InvalidInput("malformed private key".to_string()))
    }

    /// Connects to the RPC node.
    pub fn connect(&self) -> Result<RpcChain> {
        let signer = self.signer()?;
        info!(rpc = %self.rpc, operator = %signer.address(), "Connecting");
        Ok(RpcChain::connect_http(&self.rpc, signer)?
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms))
            .with_receipt_timeout(Duration::from_secs(self.receipt_timeout_secs)))
    }
}

/// CREATE2 factory arguments
#[derive(Parser, Debug, Clone, Default)]
pub struct FactoryArgs {
    /// Presigned keyless transaction deploying a custom factory, as hex. Defaults to the
    /// canonical deterministic deployment proxy.
    #[arg(long = "factory.tx", conflicts_with = "factory_tx_file")]
    pub factory_tx: Option<String>,

    /// File containing the presigned factory transaction as hex. Use `-` for stdin.
    #[arg(long = "factory.tx-file")]
    pub factory_tx_file: Option<String>,
}

impl FactoryArgs {
    /// Returns the configured factory.
    pub fn factory(&self) -> Result<Create2Factory> {
        match load_hex(self.factory_tx.as_deref(), self.factory_tx_file.as_deref())? {
            Some(raw) => Ok(Create2Factory::from_presigned(raw)?),
            None => Ok(Create2Factory::canonical()),
        }
    }
}
