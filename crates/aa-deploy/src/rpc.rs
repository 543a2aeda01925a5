//! [`ChainClient`] over a JSON-RPC node.

use std::time::Duration;

use alloy_network::{EthereumWallet, ReceiptResponse, TransactionBuilder};
use alloy_primitives::{Address, Bytes, TxHash, U256};
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_rpc_types_eth::TransactionRequest;
use alloy_signer_local::PrivateKeySigner;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::{ChainClient, DeployError, Result, TxReceipt, TxRequest};

/// Default interval between receipt polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default time to wait for a transaction to be included.
pub const DEFAULT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(120);

/// A chain reached over HTTP JSON-RPC, signing with a local private key.
///
/// Nonce, gas price, gas limit and chain id of submitted transactions are filled by the
/// provider.
#[derive(Debug, Clone)]
pub struct RpcChain {
    provider: DynProvider,
    signer: Address,
    poll_interval: Duration,
    receipt_timeout: Duration,
}

impl RpcChain {
    /// Connects to `rpc_url`, signing with `signer`.
    pub fn connect_http(rpc_url: &str, signer: PrivateKeySigner) -> Result<Self> {
        let url: reqwest::Url = rpc_url
            .parse()
            .map_err(|e| DeployError::InvalidInput(format!("Invalid RPC URL '{rpc_url}': {e}")))?;
        let address = signer.address();
        debug!(%url, signer = %address, "Connecting to RPC");
        let provider =
            ProviderBuilder::new().wallet(EthereumWallet::from(signer)).connect_http(url);
        Ok(Self {
            provider: DynProvider::new(provider),
            signer: address,
            poll_interval: DEFAULT_POLL_INTERVAL,
            receipt_timeout: DEFAULT_RECEIPT_TIMEOUT,
        })
    }

    /// Sets the interval between receipt polls.
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets how long to wait for a transaction to be included.
    pub const fn with_receipt_timeout(mut self, timeout: Duration) -> Self {
        self.receipt_timeout = timeout;
        self
    }

    /// Returns the underlying provider.
    pub const fn provider(&self) -> &DynProvider {
        &self.provider
    }
}

impl ChainClient for RpcChain {
    fn signer_address(&self) -> Address {
        self.signer
    }

    async fn get_code(&self, address: Address) -> Result<Bytes> {
        Ok(self.provider.get_code_at(address).await?)
    }

    async fn get_balance(&self, address: Address) -> Result<U256> {
        Ok(self.provider.get_balance(address).await?)
    }

    async fn send_transaction(&self, tx: TxRequest) -> Result<TxHash> {
        let mut request = TransactionRequest::default()
            .with_from(self.signer)
            .with_to(tx.to)
            .with_input(tx.data)
            .with_value(tx.value);
        if let Some(gas_limit) = tx.gas_limit {
            request.set_gas_limit(gas_limit);
        }

        let pending =
            self.provider.send_transaction(request).await.map_err(DeployError::from_submission)?;
        debug!(tx_hash = %pending.tx_hash(), to = %tx.to, "Transaction submitted");
        Ok(*pending.tx_hash())
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<TxHash> {
        let pending =
            self.provider.send_raw_transaction(&raw).await.map_err(DeployError::from_submission)?;
        debug!(tx_hash = %pending.tx_hash(), "Raw transaction submitted");
        Ok(*pending.tx_hash())
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TxReceipt> {
        let deadline = Instant::now() + self.receipt_timeout;
        loop {
            if let Some(receipt) = self.provider.get_transaction_receipt(tx_hash).await? {
                return Ok(TxReceipt {
                    tx_hash,
                    success: ReceiptResponse::status(&receipt),
                    contract_address: ReceiptResponse::contract_address(&receipt),
                });
            }
            if Instant::now() >= deadline {
                return Err(DeployError::receipt_timeout(tx_hash));
            }
            trace!(%tx_hash, "Receipt not available yet");
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
