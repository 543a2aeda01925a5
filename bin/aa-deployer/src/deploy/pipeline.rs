use std::path::PathBuf;

use aa_deploy::{DeployStep, Salt};
use alloy_sol_types::SolValue;
use clap::Parser;

use super::{Artifact, ArtifactStore, Result};

/// Contracts to deploy and how
#[derive(Parser, Debug, Clone)]
pub struct PipelineArgs {
    /// Directory holding the compiled artifacts (hardhat `artifacts/` or foundry `out/`)
    #[arg(long = "artifacts", default_value = "artifacts")]
    pub artifacts: PathBuf,

    /// Artifact name of the entry point
    #[arg(long = "entry-point.artifact", default_value = "EntryPoint")]
    pub entry_point_artifact: String,

    /// Artifact name of the paymaster. Its constructor takes the entry point address.
    #[arg(long = "paymaster.artifact", default_value = "TestPaymasterAcceptAll")]
    pub paymaster_artifact: String,

    /// CREATE2 salt shared by all contracts
    #[arg(
        long = "salt",
        default_value = "0x0000000000000000000000000000000000000000000000000000000000000000"
    )]
    pub salt: Salt,

    /// Gas limit of each deployment transaction
    #[arg(long = "gas-limit", default_value = "6000000")]
    pub gas_limit: u64,
}

/// The entry point and the paymaster bound to it.
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// Entry point artifact
    pub entry_point: Artifact,
    /// Paymaster artifact
    pub paymaster: Artifact,
    /// CREATE2 salt
    pub salt: Salt,
    /// Gas limit of each deployment
    pub gas_limit: u64,
}

impl Pipeline {
    /// Loads the artifacts named by `args`.
    pub fn load(args: &PipelineArgs) -> Result<Self> {
        let store = ArtifactStore::new(&args.artifacts);
        Ok(Self {
            entry_point: store.load(&args.entry_point_artifact)?,
            paymaster: store.load(&args.paymaster_artifact)?,
            salt: args.salt,
            gas_limit: args.gas_limit,
        })
    }

    /// `[EntryPoint, Paymaster(EntryPoint)]`.
    pub fn steps(&self) -> aa_deploy::Result<Vec<DeployStep>> {
        let entry_point_code = self.entry_point.init_code(&[])?;
        let entry_point = DeployStep::fixed(&self.entry_point.name, entry_point_code)
            .with_salt(self.salt)
            .with_gas_limit(self.gas_limit);

        let paymaster_artifact = self.paymaster.clone();
        let entry_point_name = self.entry_point.name.clone();
        let paymaster = DeployStep::new(&self.paymaster.name, move |resolved| {
            let entry_point = resolved.get(&entry_point_name)?;
            paymaster_artifact.init_code(&entry_point.abi_encode())
        })
        .depends_on(&self.entry_point.name)
        .with_salt(self.salt)
        .with_gas_limit(self.gas_limit);

        Ok(vec![entry_point, paymaster])
    }

    /// Returns the artifact of step `name`.
    pub fn artifact(&self, name: &str) -> Option<&Artifact> {
        [&self.entry_point, &self.paymaster].into_iter().find(|a| a.name == name)
    }
}
