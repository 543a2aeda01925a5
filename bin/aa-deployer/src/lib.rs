//! Deterministic deployment of the entry point and paymaster contracts
//!
//! Contracts are deployed through the CREATE2 deterministic deployment proxy, which itself is
//! deployed with a presigned keyless transaction when missing. Re-running a deployment only
//! deploys what is not on chain yet.

mod cmd;
pub use cmd::*;

/// Argument groups, errors and file formats shared by the commands
pub mod common;

/// Deploy command
pub mod deploy;

/// Factory command
pub mod factory;

/// Predict command
pub mod predict;
