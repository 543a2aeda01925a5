//! Deterministic deployment of account-abstraction contracts through a CREATE2 factory.
//!
//! Contracts are deployed through the deterministic deployment proxy, so each lands at an
//! address that only depends on its init code and salt. Every operation checks the chain
//! before acting, which makes re-running a pipeline safe: contracts already present are
//! skipped and only missing ones are deployed.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod address;
pub use address::*;

mod chain;
pub use chain::*;

mod deployer;
pub use deployer::*;

mod error;
pub use error::*;

mod factory;
pub use factory::*;

mod presence;
pub use presence::*;

mod rpc;
pub use rpc::*;

mod sequencer;
pub use sequencer::*;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
