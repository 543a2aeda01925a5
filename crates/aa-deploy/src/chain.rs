//! The chain collaborator consumed by the deployment mechanism.

use std::future::Future;

use alloy_primitives::{Address, Bytes, TxHash, U256};

use crate::Result;

/// A transaction to be signed and submitted by the operator account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    /// Recipient
    pub to: Address,
    /// Calldata
    pub data: Bytes,
    /// Value in wei
    pub value: U256,
    /// Gas limit. Estimated by the collaborator if unset.
    pub gas_limit: Option<u64>,
}

impl TxRequest {
    /// Creates a call to `to` carrying `data` and no value.
    pub fn call(to: Address, data: Bytes) -> Self {
        Self { to, data, value: U256::ZERO, gas_limit: None }
    }

    /// Creates a plain value transfer.
    pub fn transfer(to: Address, value: U256) -> Self {
        Self { to, data: Bytes::new(), value, gas_limit: None }
    }

    /// Sets the gas limit.
    pub const fn with_gas_limit(mut self, gas_limit: Option<u64>) -> Self {
        self.gas_limit = gas_limit;
        self
    }
}

/// The outcome of an included transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxReceipt {
    /// Transaction hash
    pub tx_hash: TxHash,
    /// Whether execution succeeded
    pub success: bool,
    /// The address created by a contract-creation transaction
    pub contract_address: Option<Address>,
}

/// Access to an Ethereum-compatible chain.
///
/// Implementations surface connection and timeout problems as
/// [`DeployError::ChainUnavailable`](crate::DeployError::ChainUnavailable) and never retry
/// internally. Submissions refused by the node surface as
/// [`DeployError::Rejected`](crate::DeployError::Rejected).
pub trait ChainClient {
    /// The account that pays for and signs submitted transactions.
    fn signer_address(&self) -> Address;

    /// Returns the code stored at `address`. Empty if there is none.
    fn get_code(&self, address: Address) -> impl Future<Output = Result<Bytes>> + Send;

    /// Returns the balance of `address` in wei.
    fn get_balance(&self, address: Address) -> impl Future<Output = Result<U256>> + Send;

    /// Signs `tx` with the operator account and submits it.
    fn send_transaction(&self, tx: TxRequest) -> impl Future<Output = Result<TxHash>> + Send;

    /// Submits an already signed transaction.
    fn send_raw_transaction(&self, raw: Bytes) -> impl Future<Output = Result<TxHash>> + Send;

    /// Waits until `tx_hash` is included and returns its receipt.
    fn wait_for_receipt(&self, tx_hash: TxHash) -> impl Future<Output = Result<TxReceipt>> + Send;
}
