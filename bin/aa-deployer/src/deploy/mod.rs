//! Deploy module running the `[EntryPoint, Paymaster(EntryPoint)]` pipeline against a chain.

mod cmd;
mod pipeline;

pub use cmd::*;
pub use pipeline::*;

// Re-export from common module
pub use crate::common::{
    Artifact, ArtifactStore, ChainArgs, DeployerError, DeploymentFile, DeploymentsDir,
    FactoryArgs, Result,
};
