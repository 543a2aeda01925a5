use alloy_primitives::Address;
use tracing::trace;

use crate::{ChainClient, Result};

/// Returns true iff `address` holds non-empty code on `chain`.
///
/// Issues exactly one read-only call. Failures are propagated as-is.
pub async fn is_deployed<C: ChainClient>(chain: &C, address: Address) -> Result<bool> {
    let code = chain.get_code(address).await?;
    trace!(%address, code_len = code.len(), "Code at address");
    Ok(!code.is_empty())
}
