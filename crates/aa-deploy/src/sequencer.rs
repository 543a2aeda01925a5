//! Ordered deployment pipelines.
//!
//! A pipeline is a list of [`DeployStep`]s executed strictly in order. Each step declares the
//! earlier steps it depends on and builds its init code from their resolved addresses, so a
//! paymaster can embed the address of the entry point it was deployed for.

use std::{collections::HashSet, fmt};

use alloy_primitives::{Address, TxHash};
use tracing::{debug, error, info};

use crate::{
    compute_address, ChainClient, Create2Factory, DeployError, Deployer, Deployment, InitCode,
    Result, Salt,
};

/// Builds a step's init code from the addresses of the steps it depends on.
pub type InitCodeBuilder = Box<dyn Fn(&ResolvedAddresses) -> Result<InitCode> + Send + Sync>;

/// One deployment in a pipeline.
pub struct DeployStep {
    /// Unique name of the step, usually the contract name
    pub name: String,
    /// CREATE2 salt
    pub salt: Salt,
    /// Gas limit of the deployment transaction. Estimated if unset.
    pub gas_limit: Option<u64>,
    /// Earlier steps whose addresses the init code builder reads
    pub depends_on: Vec<String>,
    build_init_code: InitCodeBuilder,
}

impl fmt::Debug for DeployStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeployStep")
            .field("name", &self.name)
            .field("salt", &self.salt)
            .field("gas_limit", &self.gas_limit)
            .field("depends_on", &self.depends_on)
            .finish_non_exhaustive()
    }
}

impl DeployStep {
    /// Creates a step with a zero salt, no gas limit and no dependencies.
    pub fn new<F>(name: impl Into<String>, build_init_code: F) -> Self
    where
        F: Fn(&ResolvedAddresses) -> Result<InitCode> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            salt: Salt::ZERO,
            gas_limit: None,
            depends_on: Vec::new(),
            build_init_code: Box::new(build_init_code),
        }
    }

    /// Creates a step whose init code does not depend on anything.
    pub fn fixed(name: impl Into<String>, init_code: InitCode) -> Self {
        Self::new(name, move |_| Ok(init_code.clone()))
    }

    /// Sets the salt.
    pub const fn with_salt(mut self, salt: Salt) -> Self {
        self.salt = salt;
        self
    }

    /// Sets the gas limit of the deployment transaction.
    pub const fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    /// Declares a dependency on an earlier step.
    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.depends_on.push(name.into());
        self
    }

    /// Runs the init code builder against `resolved`.
    pub fn build_init_code(&self, resolved: &ResolvedAddresses) -> Result<InitCode> {
        (self.build_init_code)(resolved)
    }
}

/// Addresses resolved by confirmed steps, in confirmation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedAddresses {
    entries: Vec<(String, Address)>,
}

impl ResolvedAddresses {
    /// Returns the address resolved for `name`.
    pub fn get(&self, name: &str) -> Result<Address> {
        self.entries
            .iter()
            .find_map(|(n, address)| (n == name).then_some(*address))
            .ok_or_else(|| {
                DeployError::InvalidInput(format!("address of `{name}` is not resolved"))
            })
    }

    /// Iterates over `(name, address)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Address)> {
        self.entries.iter().map(|(name, address)| (name.as_str(), *address))
    }

    /// Number of resolved addresses.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is resolved.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, name: String, address: Address) {
        self.entries.push((name, address));
    }

    /// The subset visible to a step: only what it declared.
    fn restrict_to(&self, names: &[String]) -> Self {
        let entries = self.entries.iter().filter(|(n, _)| names.contains(n)).cloned().collect();
        Self { entries }
    }
}

/// Progress of a single step.
///
/// `Pending → Resolving → Deploying → Confirmed`, or `Failed` from any non-terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    /// Not started
    Pending,
    /// Deterministic address computed
    Resolving(Address),
    /// Presence check / deployment in flight
    Deploying(Address),
    /// Code confirmed at the address
    Confirmed {
        /// The contract address
        address: Address,
        /// Whether it was present before this run touched it
        already_existed: bool,
    },
    /// Aborted the pipeline
    Failed(DeployError),
}

impl StepStatus {
    /// Returns true for `Confirmed` and `Failed`.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed { .. } | Self::Failed(_))
    }

    fn can_advance_to(&self, next: &Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Resolving(_)) |
                (Self::Resolving(_), Self::Deploying(_)) |
                (Self::Deploying(_), Self::Confirmed { .. })
        ) || (!self.is_terminal() && matches!(next, Self::Failed(_)))
    }
}

/// Per-step bookkeeping held by the sequencer for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentRecord {
    /// Step name
    pub name: String,
    /// Deterministic address, once computed
    pub address: Option<Address>,
    /// Init code, once built
    pub init_code: Option<InitCode>,
    /// CREATE2 salt
    pub salt: Salt,
    /// True only once code is confirmed at `address`
    pub deployed: bool,
    /// Deployment transaction, if one was sent
    pub tx_hash: Option<TxHash>,
    /// Current status
    pub status: StepStatus,
}

impl DeploymentRecord {
    fn pending(step: &DeployStep) -> Self {
        Self {
            name: step.name.clone(),
            address: None,
            init_code: None,
            salt: step.salt,
            deployed: false,
            tx_hash: None,
            status: StepStatus::Pending,
        }
    }

    fn advance(&mut self, next: StepStatus) {
        debug_assert!(
            self.status.can_advance_to(&next),
            "illegal step transition {:?} -> {next:?}",
            self.status
        );
        debug!(step = %self.name, status = ?next, "Step status");
        self.status = next;
    }

    fn confirm(&mut self, deployment: Deployment) {
        self.deployed = true;
        self.tx_hash = deployment.tx_hash;
        self.advance(StepStatus::Confirmed {
            address: deployment.address,
            already_existed: deployment.already_existed,
        });
    }

    /// Returns the deployment outcome if the step is confirmed.
    pub fn deployment(&self) -> Option<Deployment> {
        match self.status {
            StepStatus::Confirmed { address, already_existed } => {
                Some(Deployment { address, already_existed, tx_hash: self.tx_hash })
            }
            _ => None,
        }
    }
}

/// The outcome of a successful pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentReport {
    records: Vec<DeploymentRecord>,
}

impl DeploymentReport {
    /// Returns the deployment of step `name`.
    pub fn get(&self, name: &str) -> Option<Deployment> {
        self.records.iter().find(|r| r.name == name).and_then(DeploymentRecord::deployment)
    }

    /// Iterates over `(name, deployment)` in step order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Deployment)> {
        self.records.iter().filter_map(|r| r.deployment().map(|d| (r.name.as_str(), d)))
    }

    /// The per-step records.
    pub fn records(&self) -> &[DeploymentRecord] {
        &self.records
    }
}

/// A pipeline aborted on `step`.
///
/// Steps confirmed before the failure stay deployed; re-running the pipeline skips them.
#[derive(Debug, thiserror::Error)]
#[error("step `{step}` failed with {kind}: {source}", kind = .source.kind())]
pub struct SequenceError {
    /// The failed step
    pub step: String,
    /// Why it failed
    #[source]
    pub source: DeployError,
    /// Records of all steps at the time of failure
    pub records: Vec<DeploymentRecord>,
}

impl SequenceError {
    /// Iterates over the steps confirmed before the failure.
    pub fn completed(&self) -> impl Iterator<Item = (&str, Deployment)> {
        self.records.iter().filter_map(|r| r.deployment().map(|d| (r.name.as_str(), d)))
    }
}

/// Runs deployment pipelines against one chain.
#[derive(Debug)]
pub struct Sequencer<'a, C> {
    deployer: Deployer<'a, C>,
}

impl<'a, C: ChainClient> Sequencer<'a, C> {
    /// Creates a sequencer deploying through `factory` on `chain`.
    pub const fn new(chain: &'a C, factory: Create2Factory) -> Self {
        Self { deployer: Deployer::new(chain, factory) }
    }

    /// Returns the underlying deployer.
    pub const fn deployer(&self) -> &Deployer<'a, C> {
        &self.deployer
    }

    /// Executes `steps` in order, aborting on the first failure.
    ///
    /// Every run starts from the chain: nothing resolved by an earlier run is reused.
    pub async fn run(&mut self, steps: &[DeployStep]) -> Result<DeploymentReport, SequenceError> {
        self.deployer.reset();
        let mut records: Vec<_> = steps.iter().map(DeploymentRecord::pending).collect();

        if let Err((step, source)) = validate(steps) {
            return Err(SequenceError { step, source, records });
        }

        let mut resolved = ResolvedAddresses::default();
        for (i, step) in steps.iter().enumerate() {
            info!(step = %step.name, "Running deployment step");
            match self.run_step(step, &resolved, &mut records[i]).await {
                Ok(deployment) => {
                    info!(
                        step = %step.name,
                        address = %deployment.address,
                        already_existed = deployment.already_existed,
                        "Step confirmed"
                    );
                    resolved.insert(step.name.clone(), deployment.address);
                }
                Err(source) => {
                    error!(step = %step.name, kind = source.kind(), %source, "Step failed");
                    records[i].advance(StepStatus::Failed(source.clone()));
                    return Err(SequenceError { step: step.name.clone(), source, records });
                }
            }
        }

        Ok(DeploymentReport { records })
    }

    async fn run_step(
        &mut self,
        step: &DeployStep,
        resolved: &ResolvedAddresses,
        record: &mut DeploymentRecord,
    ) -> Result<Deployment> {
        let init_code = step.build_init_code(&resolved.restrict_to(&step.depends_on))?;
        let address = self.deployer.resolve(&init_code, step.salt).await?;
        record.address = Some(address);
        record.init_code = Some(init_code.clone());
        record.advance(StepStatus::Resolving(address));

        record.advance(StepStatus::Deploying(address));
        let deployment = self
            .deployer
            .deploy_resolved(&step.name, address, &init_code, step.salt, step.gas_limit)
            .await?;
        record.confirm(deployment);
        Ok(deployment)
    }
}

/// Runs `steps` through `factory` on `chain`.
pub async fn deploy_sequence<C: ChainClient>(
    chain: &C,
    factory: Create2Factory,
    steps: &[DeployStep],
) -> Result<DeploymentReport, SequenceError> {
    Sequencer::new(chain, factory).run(steps).await
}

/// Computes the addresses `steps` resolve to through `factory` without touching any chain.
///
/// Matches what a [`Sequencer`] run resolves for the same steps.
pub fn predict_addresses(factory: Address, steps: &[DeployStep]) -> Result<ResolvedAddresses> {
    validate(steps).map_err(|(_, err)| err)?;
    let mut resolved = ResolvedAddresses::default();
    for step in steps {
        let init_code = step.build_init_code(&resolved.restrict_to(&step.depends_on))?;
        let address = compute_address(factory, &init_code, step.salt)?;
        resolved.insert(step.name.clone(), address);
    }
    Ok(resolved)
}

/// Checks that names are unique and every dependency names an earlier step.
fn validate(steps: &[DeployStep]) -> Result<(), (String, DeployError)> {
    let mut seen = HashSet::new();
    for step in steps {
        for dep in &step.depends_on {
            if !seen.contains(dep.as_str()) {
                let reason =
                    format!("`{}` depends on `{dep}`, which is not an earlier step", step.name);
                return Err((step.name.clone(), DeployError::InvalidInput(reason)));
            }
        }
        if !seen.insert(step.name.as_str()) {
            let reason = format!("duplicate step name `{}`", step.name);
            return Err((step.name.clone(), DeployError::InvalidInput(reason)));
        }
    }
    Ok(())
}
