//! Skip-or-deploy of a single contract through the CREATE2 factory.

use alloy_primitives::{Address, Bytes, TxHash};
use tracing::{debug, info};

use crate::{
    compute_address, is_deployed, ChainClient, Create2Factory, DeployError, FactoryState,
    InitCode, Result, Salt, TxRequest,
};

/// The outcome of deploying one contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deployment {
    /// The deterministic address of the contract
    pub address: Address,
    /// True if the contract was already on-chain. Normally no transaction is sent then; a
    /// transaction is only reported if a concurrent deployment won the race.
    pub already_existed: bool,
    /// The deployment transaction, if one was sent
    pub tx_hash: Option<TxHash>,
}

/// Deploys contracts through a CREATE2 factory, skipping those already present.
#[derive(Debug)]
pub struct Deployer<'a, C> {
    chain: &'a C,
    factory: Create2Factory,
    /// Factory resolved during this run. Never outlives the deployer.
    resolved_factory: Option<FactoryState>,
}

impl<'a, C: ChainClient> Deployer<'a, C> {
    /// Creates a deployer using `factory` on `chain`.
    pub const fn new(chain: &'a C, factory: Create2Factory) -> Self {
        Self { chain, factory, resolved_factory: None }
    }

    /// Returns the chain collaborator.
    pub const fn chain(&self) -> &'a C {
        self.chain
    }

    /// Returns the factory state resolved so far in this run, if any.
    pub const fn factory_state(&self) -> Option<FactoryState> {
        self.resolved_factory
    }

    /// Forgets the factory resolved so far, so the next call consults the chain again.
    pub const fn reset(&mut self) {
        self.resolved_factory = None;
    }

    /// Makes sure the factory is deployed and returns its address.
    ///
    /// The chain is only consulted on the first call of a run.
    pub async fn ensure_factory(&mut self) -> Result<Address> {
        if let Some(state) = self.resolved_factory {
            return Ok(state.address());
        }
        let state = self.factory.ensure(self.chain).await?;
        self.resolved_factory = Some(state);
        Ok(state.address())
    }

    /// Resolves the deterministic address of `init_code` under `salt`, deploying the factory
    /// first if needed.
    pub async fn resolve(&mut self, init_code: &InitCode, salt: Salt) -> Result<Address> {
        let factory = self.ensure_factory().await?;
        compute_address(factory, init_code, salt)
    }

    /// Deploys `init_code` under `salt` unless it is already present.
    pub async fn deploy(
        &mut self,
        name: &str,
        init_code: &InitCode,
        salt: Salt,
        gas_limit: Option<u64>,
    ) -> Result<Deployment> {
        let address = self.resolve(init_code, salt).await?;
        self.deploy_resolved(name, address, init_code, salt, gas_limit).await
    }

    /// Second half of [`Self::deploy`]: `address` must come from [`Self::resolve`] with the same
    /// init code and salt.
    pub async fn deploy_resolved(
        &mut self,
        name: &str,
        address: Address,
        init_code: &InitCode,
        salt: Salt,
        gas_limit: Option<u64>,
    ) -> Result<Deployment> {
        if is_deployed(self.chain, address).await? {
            info!(name, %address, "Contract already deployed, skipping");
            return Ok(Deployment { address, already_existed: true, tx_hash: None });
        }

        let factory = self.ensure_factory().await?;
        debug!(name, %factory, %salt, init_code_len = init_code.len(), "Submitting deployment");

        let failed = |reason: String| DeployError::DeploymentFailed {
            name: name.to_string(),
            address,
            reason,
        };
        let tx = TxRequest::call(factory, factory_calldata(init_code, salt))
            .with_gas_limit(gas_limit);
        let tx_hash = match self.chain.send_transaction(tx).await {
            Ok(tx_hash) => tx_hash,
            Err(DeployError::Rejected(reason)) => {
                // Gas estimation fails if a concurrent run already occupied the address
                if is_deployed(self.chain, address).await? {
                    info!(name, %address, "Deployment rejected but contract is present");
                    return Ok(Deployment { address, already_existed: true, tx_hash: None });
                }
                return Err(failed(reason));
            }
            Err(other) => return Err(other),
        };
        let receipt = self.chain.wait_for_receipt(tx_hash).await?;

        // Presence decides, not the receipt: a concurrent run may have taken the address first,
        // which makes our transaction revert while the contract is in place.
        if !is_deployed(self.chain, address).await? {
            let reason = if receipt.success {
                format!("no code after transaction {tx_hash}")
            } else {
                format!("transaction {tx_hash} reverted")
            };
            return Err(failed(reason));
        }
        if !receipt.success {
            info!(name, %address, %tx_hash, "Deployment reverted but contract is present");
            return Ok(Deployment { address, already_existed: true, tx_hash: Some(tx_hash) });
        }

        info!(name, %address, %tx_hash, "Contract deployed");
        Ok(Deployment { address, already_existed: false, tx_hash: Some(tx_hash) })
    }
}

/// Calldata understood by the factory: `salt ++ init_code`.
pub fn factory_calldata(init_code: &InitCode, salt: Salt) -> Bytes {
    let mut data = Vec::with_capacity(32 + init_code.len());
    data.extend_from_slice(salt.as_slice());
    data.extend_from_slice(init_code);
    data.into()
}
