//! Test utilities: an in-memory chain and sample pipelines.

mod chain;
pub use chain::*;

use alloy_primitives::{bytes, Address, Bytes};

use crate::{DeployStep, InitCode};

/// Stand-in creation bytecode of the entry point.
pub const ENTRY_POINT_BYTECODE: Bytes = bytes!("6080604052348015600f57600080fd5b50603f80601d6000396000f3fe6080604052600080fdfea164736f6c6343000811000a");

/// Stand-in creation bytecode of a paymaster taking the entry point address as its only
/// constructor argument.
pub const PAYMASTER_BYTECODE: Bytes = bytes!("60a060405234801561001057600080fd5b5060405161002e38038061002e833981016040819052");

/// Name of the entry point step.
pub const ENTRY_POINT: &str = "EntryPoint";

/// Name of the paymaster step.
pub const PAYMASTER: &str = "TestPaymasterAcceptAll";

/// Init code of the stand-in entry point.
pub fn entry_point_init_code() -> InitCode {
    InitCode::new(ENTRY_POINT_BYTECODE).expect("non-empty bytecode")
}

/// Init code of the stand-in paymaster bound to `entry_point`.
pub fn paymaster_init_code(entry_point: Address) -> InitCode {
    InitCode::with_args(&PAYMASTER_BYTECODE, entry_point.into_word().as_slice())
        .expect("non-empty bytecode")
}

/// The `[EntryPoint, Paymaster(EntryPoint)]` pipeline.
pub fn entry_point_and_paymaster() -> Vec<DeployStep> {
    vec![
        DeployStep::fixed(ENTRY_POINT, entry_point_init_code()).with_gas_limit(6_000_000),
        DeployStep::new(PAYMASTER, |resolved| Ok(paymaster_init_code(resolved.get(ENTRY_POINT)?)))
            .depends_on(ENTRY_POINT)
            .with_gas_limit(6_000_000),
    ]
}
