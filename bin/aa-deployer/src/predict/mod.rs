//! Predict module computing deterministic addresses without touching any chain.

mod cmd;

pub use cmd::*;

// Re-export from common module
pub use crate::{
    common::{load_hex, FactoryArgs, Result},
    deploy::{Pipeline, PipelineArgs},
};
