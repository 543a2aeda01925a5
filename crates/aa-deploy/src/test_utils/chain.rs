//! An in-memory [`ChainClient`].

use std::sync::{Mutex, MutexGuard};

use alloy_primitives::{bytes, keccak256, map::HashMap, Address, Bytes, TxHash, B256, U256};

use crate::{
    ChainClient, DeployError, KeylessTx, Result, TxReceipt, TxRequest, CANONICAL_FACTORY_TX,
};

/// Runtime code of the deterministic deployment proxy.
pub const FACTORY_RUNTIME_CODE: Bytes = bytes!("7fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffe03601600081602082378035828234f58015156039578182fd5b8082525050506014600cf3");

/// The default operator account of a [`MockChain`].
pub const MOCK_SIGNER: Address = Address::new([0x10; 20]);

/// Balance of [`MOCK_SIGNER`] on a fresh [`MockChain`]: 1000 ether.
pub const MOCK_SIGNER_BALANCE: U256 = U256::from_limbs([0x35c9adc5dea00000, 0x36, 0, 0]);

/// A transaction submitted to a [`MockChain`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentTx {
    /// Presigned raw transaction
    Raw(Bytes),
    /// Transaction signed by the operator
    Signed(TxRequest),
}

#[derive(Debug, Default)]
struct State {
    code: HashMap<Address, Bytes>,
    balances: HashMap<Address, U256>,
    nonces: HashMap<Address, u64>,
    receipts: HashMap<TxHash, TxReceipt>,
    sent: Vec<SentTx>,
    get_code_failures: HashMap<Address, usize>,
    unavailable: bool,
    drop_deployments: bool,
    reject_raw: bool,
}

/// An in-memory chain emulating just enough of the EVM for deterministic deployments.
///
/// - presigned keyless transactions create their contract at `CREATE(signer, nonce)`; the
///   canonical factory transaction installs [`FACTORY_RUNTIME_CODE`]
/// - calls to an account holding [`FACTORY_RUNTIME_CODE`] take `salt ++ init_code` and create
///   the contract at its CREATE2 address, reverting if the address is occupied
/// - created contracts get their init code as runtime code; init code starting with `REVERT`
///   (`0xfd`) fails
///
/// Faults can be injected with [`Self::fail_get_code`], [`Self::set_unavailable`],
/// [`Self::drop_deployments`] and [`Self::reject_raw_transactions`].
#[derive(Debug)]
pub struct MockChain {
    signer: Address,
    state: Mutex<State>,
}

impl Default for MockChain {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChain {
    /// A fresh chain where only [`MOCK_SIGNER`] holds ether.
    pub fn new() -> Self {
        let mut state = State::default();
        state.balances.insert(MOCK_SIGNER, MOCK_SIGNER_BALANCE);
        Self { signer: MOCK_SIGNER, state: Mutex::new(state) }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Installs `code` at `address`.
    pub fn set_code(&self, address: Address, code: Bytes) {
        self.state().code.insert(address, code);
    }

    /// Returns the code at `address`.
    pub fn code(&self, address: Address) -> Bytes {
        self.state().code.get(&address).cloned().unwrap_or_default()
    }

    /// Sets the balance of `address`.
    pub fn set_balance(&self, address: Address, balance: U256) {
        self.state().balances.insert(address, balance);
    }

    /// Returns the balance of `address`.
    pub fn balance(&self, address: Address) -> U256 {
        self.state().balances.get(&address).copied().unwrap_or_default()
    }

    /// All transactions submitted so far, in order.
    pub fn sent(&self) -> Vec<SentTx> {
        self.state().sent.clone()
    }

    /// Number of transactions submitted so far.
    pub fn sent_count(&self) -> usize {
        self.state().sent.len()
    }

    /// Makes the next `times` code reads of `address` fail with `ChainUnavailable`.
    pub fn fail_get_code(&self, address: Address, times: usize) {
        self.state().get_code_failures.insert(address, times);
    }

    /// Makes every call fail with `ChainUnavailable` while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state().unavailable = unavailable;
    }

    /// Makes deployments succeed without leaving code behind while set.
    pub fn drop_deployments(&self, drop: bool) {
        self.state().drop_deployments = drop;
    }

    /// Makes the node refuse presigned raw transactions while set, like nodes that only accept
    /// replay-protected transactions.
    pub fn reject_raw_transactions(&self, reject: bool) {
        self.state().reject_raw = reject;
    }
}

impl State {
    fn check_available(&self) -> Result<()> {
        if self.unavailable {
            return Err(DeployError::ChainUnavailable("connection refused".to_string()));
        }
        Ok(())
    }

    fn next_tx_hash(&self, payload: &[u8]) -> TxHash {
        let mut preimage = (self.sent.len() as u64).to_be_bytes().to_vec();
        preimage.extend_from_slice(payload);
        keccak256(preimage)
    }

    fn debit(&mut self, from: Address, amount: U256) -> Result<()> {
        let balance = self.balances.entry(from).or_default();
        if *balance < amount {
            return Err(DeployError::Rejected(format!("insufficient funds for {from}")));
        }
        *balance -= amount;
        Ok(())
    }

    /// Runs a contract creation at `address`. Returns whether it succeeded.
    fn create(&mut self, address: Address, init_code: &Bytes) -> bool {
        if self.code.get(&address).is_some_and(|code| !code.is_empty()) {
            return false;
        }
        if init_code.first() == Some(&0xfd) {
            return false;
        }
        if self.drop_deployments || init_code.is_empty() {
            return true;
        }
        let runtime = if *init_code == factory_init_code() {
            FACTORY_RUNTIME_CODE
        } else {
            init_code.clone()
        };
        self.code.insert(address, runtime);
        true
    }

    fn call_factory(&mut self, factory: Address, data: &Bytes) -> (bool, Option<Address>) {
        if data.len() < 32 {
            return (false, None);
        }
        let (salt, init_code) = data.split_at(32);
        let init_code = Bytes::copy_from_slice(init_code);
        let address = factory.create2_from_code(B256::from_slice(salt), &init_code);
        if self.create(address, &init_code) {
            (true, Some(address))
        } else {
            (false, None)
        }
    }
}

fn factory_init_code() -> Bytes {
    KeylessTx::decode(CANONICAL_FACTORY_TX).map(|tx| tx.init_code).unwrap_or_default()
}

impl ChainClient for MockChain {
    fn signer_address(&self) -> Address {
        self.signer
    }

    async fn get_code(&self, address: Address) -> Result<Bytes> {
        let mut state = self.state();
        state.check_available()?;
        if let Some(remaining) = state.get_code_failures.get_mut(&address) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(DeployError::ChainUnavailable(format!(
                    "timed out reading code at {address}"
                )));
            }
        }
        Ok(state.code.get(&address).cloned().unwrap_or_default())
    }

    async fn get_balance(&self, address: Address) -> Result<U256> {
        let state = self.state();
        state.check_available()?;
        Ok(state.balances.get(&address).copied().unwrap_or_default())
    }

    async fn send_transaction(&self, tx: TxRequest) -> Result<TxHash> {
        let mut state = self.state();
        state.check_available()?;
        state.debit(self.signer, tx.value)?;
        *state.nonces.entry(self.signer).or_default() += 1;

        let tx_hash = state.next_tx_hash(&tx.data);
        state.sent.push(SentTx::Signed(tx.clone()));
        *state.balances.entry(tx.to).or_default() += tx.value;

        let is_factory = state.code.get(&tx.to) == Some(&FACTORY_RUNTIME_CODE);
        let (success, contract_address) =
            if is_factory { state.call_factory(tx.to, &tx.data) } else { (true, None) };
        state.receipts.insert(tx_hash, TxReceipt { tx_hash, success, contract_address });
        Ok(tx_hash)
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<TxHash> {
        let mut state = self.state();
        state.check_available()?;
        if state.reject_raw {
            return Err(DeployError::Rejected(
                "only replay-protected (EIP-155) transactions allowed over RPC".to_string(),
            ));
        }

        let tx = KeylessTx::decode(&raw).map_err(|e| DeployError::Rejected(e.to_string()))?;
        let signer = tx.recover_signer().map_err(|e| DeployError::Rejected(e.to_string()))?;
        let nonce = state.nonces.get(&signer).copied().unwrap_or_default();
        if nonce != tx.nonce {
            return Err(DeployError::Rejected(format!("nonce too low: {signer}")));
        }
        state.debit(signer, tx.upfront_cost())?;
        state.nonces.insert(signer, nonce + 1);

        let tx_hash = state.next_tx_hash(&raw);
        state.sent.push(SentTx::Raw(raw));
        let address = signer.create(nonce);
        let success = state.create(address, &tx.init_code);
        let contract_address = success.then_some(address);
        state.receipts.insert(tx_hash, TxReceipt { tx_hash, success, contract_address });
        Ok(tx_hash)
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TxReceipt> {
        let state = self.state();
        state.check_available()?;
        state
            .receipts
            .get(&tx_hash)
            .copied()
            .ok_or_else(|| DeployError::ChainUnavailable(format!("unknown transaction {tx_hash}")))
    }
}
