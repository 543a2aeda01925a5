//! Error types for deterministic deployments.

use alloy_primitives::{Address, TxHash};
use alloy_transport::{RpcError, TransportError};

/// Errors raised by the deployment mechanism and its chain collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeployError {
    /// Malformed caller input (address, init code, presigned transaction, step list).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The chain could not be queried (connection failure, timeout, ...).
    #[error("Chain unavailable: {0}")]
    ChainUnavailable(String),

    /// The node refused a submitted transaction with a JSON-RPC error.
    #[error("Transaction rejected: {0}")]
    Rejected(String),

    /// The CREATE2 factory is still absent after its deployment was submitted.
    #[error("Factory deployment at {address} failed: {reason}")]
    FactoryDeployFailed {
        /// The address the factory was expected at
        address: Address,
        /// What went wrong
        reason: String,
    },

    /// A contract is still absent after its deployment was submitted.
    #[error("Deployment of `{name}` at {address} failed: {reason}")]
    DeploymentFailed {
        /// The contract name
        name: String,
        /// The address the contract was expected at
        address: Address,
        /// What went wrong
        reason: String,
    },
}

impl DeployError {
    /// Returns true if re-running the failed step may succeed without operator action.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ChainUnavailable(_))
    }

    /// Short name of the error kind, used when reporting a failed step.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "InvalidInput",
            Self::ChainUnavailable(_) => "ChainUnavailable",
            Self::Rejected(_) => "Rejected",
            Self::FactoryDeployFailed { .. } => "FactoryDeployFailed",
            Self::DeploymentFailed { .. } => "DeploymentFailed",
        }
    }

    /// Maps an error from a transaction submission. JSON-RPC error responses mean the node
    /// refused the transaction; everything else is a transport problem.
    pub fn from_submission(err: TransportError) -> Self {
        match err {
            RpcError::ErrorResp(payload) => Self::Rejected(payload.to_string()),
            other => Self::ChainUnavailable(other.to_string()),
        }
    }

    pub(crate) fn receipt_timeout(tx_hash: TxHash) -> Self {
        Self::ChainUnavailable(format!("timed out waiting for receipt of {tx_hash}"))
    }
}

impl From<TransportError> for DeployError {
    fn from(err: TransportError) -> Self {
        Self::ChainUnavailable(err.to_string())
    }
}

/// Result type for deployment operations.
pub type Result<T, E = DeployError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_json_rpc::ErrorPayload;

    #[test]
    fn test_only_chain_unavailable_is_retryable() {
        assert!(DeployError::ChainUnavailable("connection refused".into()).is_retryable());
        assert!(!DeployError::InvalidInput("empty init code".into()).is_retryable());
        assert!(!DeployError::Rejected("nonce too low".into()).is_retryable());
        assert!(!DeployError::DeploymentFailed {
            name: "EntryPoint".into(),
            address: Address::ZERO,
            reason: "reverted".into(),
        }
        .is_retryable());
    }

    #[test]
    fn test_submission_error_classification() {
        let rejected = DeployError::from_submission(RpcError::ErrorResp(ErrorPayload {
            code: -32000,
            message: "only replay-protected (EIP-155) transactions allowed over RPC".into(),
            data: None,
        }));
        assert_eq!(rejected.kind(), "Rejected");

        let unavailable = DeployError::from_submission(TransportError::NullResp);
        assert_eq!(unavailable.kind(), "ChainUnavailable");
    }
}
