mod artifacts;
mod chain;
mod error;
mod hex;
mod logging;

pub use artifacts::*;
pub use chain::*;
pub use error::*;
pub use hex::*;
pub use logging::*;
