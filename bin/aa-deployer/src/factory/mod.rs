//! Factory module deploying only the CREATE2 factory.

mod cmd;

pub use cmd::*;

// Re-export from common module
pub use crate::common::{ChainArgs, FactoryArgs, Result};
