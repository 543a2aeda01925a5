//! CREATE2 address derivation.
//!
//! The address of a contract created through a CREATE2 factory only depends on the factory
//! address, the salt and the init code:
//!
//! `address = keccak256(0xff ++ factory ++ salt ++ keccak256(init_code))[12:]`
//!
//! The deployer account and its nonce play no part, so the same triple yields the same address
//! on every chain.

use alloy_primitives::{keccak256, Address, Bytes, B256};

use crate::{DeployError, Result};

/// The salt used to diversify deterministic addresses. The zero salt is valid.
pub type Salt = B256;

/// Contract creation bytecode concatenated with its ABI-encoded constructor arguments.
///
/// An [`InitCode`] is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Deref, derive_more::Into)]
pub struct InitCode(Bytes);

impl InitCode {
    /// Wraps raw init code, rejecting empty input.
    pub fn new(code: impl Into<Bytes>) -> Result<Self> {
        let code = code.into();
        if code.is_empty() {
            return Err(DeployError::InvalidInput("init code is empty".to_string()));
        }
        Ok(Self(code))
    }

    /// Builds init code from creation bytecode and already ABI-encoded constructor arguments.
    pub fn with_args(bytecode: &[u8], constructor_args: &[u8]) -> Result<Self> {
        if bytecode.is_empty() {
            return Err(DeployError::InvalidInput("creation bytecode is empty".to_string()));
        }
        let mut code = Vec::with_capacity(bytecode.len() + constructor_args.len());
        code.extend_from_slice(bytecode);
        code.extend_from_slice(constructor_args);
        Ok(Self(code.into()))
    }

    /// Returns the keccak256 hash of the init code.
    pub fn hash(&self) -> B256 {
        keccak256(&self.0)
    }

    /// Returns the raw bytes.
    pub const fn bytes(&self) -> &Bytes {
        &self.0
    }
}

/// Computes the address a CREATE2 `factory` deploys `init_code` to under `salt`.
pub fn compute_address(factory: Address, init_code: &[u8], salt: Salt) -> Result<Address> {
    if init_code.is_empty() {
        return Err(DeployError::InvalidInput("init code is empty".to_string()));
    }

    let mut preimage = [0u8; 85];
    preimage[0] = 0xff;
    preimage[1..21].copy_from_slice(factory.as_slice());
    preimage[21..53].copy_from_slice(salt.as_slice());
    preimage[53..].copy_from_slice(keccak256(init_code).as_slice());

    Ok(Address::from_slice(&keccak256(preimage)[12..]))
}

/// Same as [`compute_address`], but takes the factory address as raw bytes, which must be
/// exactly 20 bytes long.
pub fn compute_address_from_slice(factory: &[u8], init_code: &[u8], salt: Salt) -> Result<Address> {
    let factory = Address::try_from(factory).map_err(|_| {
        DeployError::InvalidInput(format!(
            "factory address must be 20 bytes, got {}",
            factory.len()
        ))
    })?;
    compute_address(factory, init_code, salt)
}
