//! The CREATE2 factory and its one-time keyless deployment.
//!
//! The factory is the deterministic deployment proxy: its runtime takes calldata
//! `salt (32 bytes) ++ init_code`, runs `CREATE2(0, init_code, salt)` and returns the created
//! address. It is itself deployed with a presigned keyless transaction, so its address does not
//! depend on which operator account happens to run the deployment.

mod keyless;
pub use keyless::*;

use alloy_primitives::{address, hex, Address, Bytes, TxHash, U256};
use tracing::{debug, info, warn};

use crate::{is_deployed, ChainClient, DeployError, Result, TxRequest};

/// The canonical deterministic-deployment-proxy transaction (pre-EIP-155, v=27, r=s=0x22..22).
/// Signer: 0x3fab184622dc19b6109349b94811493bf2a45362
/// Deployed to: 0x4e59b44847b379578588920ca78fbf26c0b4956c
pub const CANONICAL_FACTORY_TX: &[u8] = &hex!("f8a58085174876e800830186a08080b853604580600e600039806000f350fe7fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffe03601600081602082378035828234f58015156039578182fd5b8082525050506014600cf31ba02222222222222222222222222222222222222222222222222222222222222222a02222222222222222222222222222222222222222222222222222222222222222");

/// The one-time account that sends [`CANONICAL_FACTORY_TX`].
pub const CANONICAL_FACTORY_DEPLOYER: Address =
    address!("3fab184622dc19b6109349b94811493bf2a45362");

/// The address of the canonical CREATE2 factory.
pub const CANONICAL_FACTORY_ADDRESS: Address =
    address!("4e59b44847b379578588920ca78fbf26c0b4956c");

/// Gas price (100 gwei) and gas limit of [`CANONICAL_FACTORY_TX`].
const CANONICAL_GAS_PRICE: u128 = 100_000_000_000;
const CANONICAL_GAS_LIMIT: u64 = 100_000;

/// Whether the factory had to be deployed by this call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactoryState {
    /// The factory already held code
    AlreadyPresent(Address),
    /// The factory was deployed by this call
    Deployed {
        /// The factory address
        address: Address,
        /// The keyless deployment transaction
        tx_hash: TxHash,
    },
}

impl FactoryState {
    /// Returns the factory address.
    pub const fn address(&self) -> Address {
        match self {
            Self::AlreadyPresent(address) | Self::Deployed { address, .. } => *address,
        }
    }
}

/// A CREATE2 factory reachable through a presigned keyless deployment transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Create2Factory {
    raw_tx: Bytes,
    deployer: Address,
    address: Address,
    upfront_cost: U256,
}

impl Default for Create2Factory {
    fn default() -> Self {
        Self::canonical()
    }
}

impl Create2Factory {
    /// The canonical deterministic deployment proxy at
    /// `0x4e59b44847b379578588920ca78fbf26c0b4956c`.
    pub fn canonical() -> Self {
        Self {
            raw_tx: Bytes::from_static(CANONICAL_FACTORY_TX),
            deployer: CANONICAL_FACTORY_DEPLOYER,
            address: CANONICAL_FACTORY_ADDRESS,
            upfront_cost: U256::from(CANONICAL_GAS_PRICE) * U256::from(CANONICAL_GAS_LIMIT),
        }
    }

    /// Uses a custom presigned keyless transaction, e.g. one with a gas limit suited to a chain
    /// with a different gas schedule.
    pub fn from_presigned(raw_tx: impl Into<Bytes>) -> Result<Self> {
        let raw_tx = raw_tx.into();
        let invalid = |e: KeylessTxError| {
            DeployError::InvalidInput(format!("factory deployment transaction: {e}"))
        };
        let tx = KeylessTx::decode(&raw_tx).map_err(invalid)?;
        let deployer = tx.recover_signer().map_err(invalid)?;
        Ok(Self {
            address: deployer.create(tx.nonce),
            deployer,
            upfront_cost: tx.upfront_cost(),
            raw_tx,
        })
    }

    /// The factory address. Independent of the operator account.
    pub const fn address(&self) -> Address {
        self.address
    }

    /// The one-time account that sends the presigned transaction.
    pub const fn deployer(&self) -> Address {
        self.deployer
    }

    /// Wei the one-time deployer needs to send the presigned transaction.
    pub const fn upfront_cost(&self) -> U256 {
        self.upfront_cost
    }

    /// The presigned transaction.
    pub const fn raw_tx(&self) -> &Bytes {
        &self.raw_tx
    }

    /// Makes sure the factory holds code, deploying it if absent.
    ///
    /// Idempotent: once the factory is present no transaction is ever submitted again.
    pub async fn ensure<C: ChainClient>(&self, chain: &C) -> Result<FactoryState> {
        if is_deployed(chain, self.address).await? {
            debug!(factory = %self.address, "CREATE2 factory already deployed");
            return Ok(FactoryState::AlreadyPresent(self.address));
        }

        info!(factory = %self.address, deployer = %self.deployer, "Deploying CREATE2 factory");
        self.fund_deployer(chain).await?;

        let tx_hash = chain
            .send_raw_transaction(self.raw_tx.clone())
            .await
            .map_err(|e| self.rejection_to_failure(e))?;
        let receipt = chain.wait_for_receipt(tx_hash).await?;
        if !receipt.success {
            warn!(%tx_hash, "CREATE2 factory deployment reverted");
        }

        // Re-check even on success: the keyless tx may have been dropped or superseded
        if !is_deployed(chain, self.address).await? {
            return Err(self.failure(format!("no code after transaction {tx_hash}")));
        }

        info!(factory = %self.address, %tx_hash, "CREATE2 factory deployed");
        Ok(FactoryState::Deployed { address: self.address, tx_hash })
    }

    /// Tops up the one-time deployer so it can pay for the presigned transaction.
    async fn fund_deployer<C: ChainClient>(&self, chain: &C) -> Result<()> {
        let balance = chain.get_balance(self.deployer).await?;
        if balance >= self.upfront_cost {
            debug!(deployer = %self.deployer, %balance, "Factory deployer already funded");
            return Ok(());
        }

        let shortfall = self.upfront_cost - balance;
        info!(
            deployer = %self.deployer,
            from = %chain.signer_address(),
            value = %shortfall,
            "Funding factory deployer"
        );
        let tx_hash = chain
            .send_transaction(TxRequest::transfer(self.deployer, shortfall))
            .await
            .map_err(|e| self.rejection_to_failure(e))?;
        let receipt = chain.wait_for_receipt(tx_hash).await?;
        if !receipt.success {
            return Err(self.failure(format!("funding transaction {tx_hash} reverted")));
        }
        Ok(())
    }

    fn failure(&self, reason: String) -> DeployError {
        DeployError::FactoryDeployFailed { address: self.address, reason }
    }

    fn rejection_to_failure(&self, err: DeployError) -> DeployError {
        match err {
            DeployError::Rejected(reason) => self.failure(reason),
            other => other,
        }
    }
}
