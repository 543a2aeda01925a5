use std::path::PathBuf;

use aa_deploy::{
    ChainClient, Create2Factory, Deployment, DeploymentReport, FactoryState, Sequencer,
};
use clap::Parser;
use tracing::warn;

use super::{
    ChainArgs, DeployerError, DeploymentFile, DeploymentsDir, FactoryArgs, Pipeline, PipelineArgs,
    Result,
};

/// Deploy the entry point and the paymaster, skipping whatever is already deployed
#[derive(Parser, Debug)]
pub struct Cmd {
    /// Chain connection
    #[command(flatten)]
    pub chain_args: ChainArgs,

    /// CREATE2 factory
    #[command(flatten)]
    pub factory_args: FactoryArgs,

    /// Contracts to deploy
    #[command(flatten)]
    pub pipeline_args: PipelineArgs,

    /// Directory to write one `<Name>.json` deployment record per contract into
    #[arg(long = "deployments")]
    pub deployments: Option<PathBuf>,
}

impl Cmd {
    /// Execute the deploy command
    pub async fn run(&self) -> Result<()> {
        // Everything that can be checked offline is checked before connecting
        let pipeline = Pipeline::load(&self.pipeline_args)?;
        let factory = self.factory_args.factory()?;
        let chain = self.chain_args.connect()?;
        self.execute(&chain, &pipeline, factory).await?;
        Ok(())
    }

    /// Runs `pipeline` on `chain`, printing every confirmed contract, including those confirmed
    /// before a failure.
    pub async fn execute<C: ChainClient>(
        &self,
        chain: &C,
        pipeline: &Pipeline,
        factory: Create2Factory,
    ) -> Result<DeploymentReport> {
        let steps = pipeline.steps()?;
        let mut sequencer = Sequencer::new(chain, factory);
        let result = sequencer.run(&steps).await;

        if let Some(state) = sequencer.deployer().factory_state() {
            println!("{}", describe_factory(state));
        }
        let records = match &result {
            Ok(report) => report.records(),
            Err(err) => err.records.as_slice(),
        };
        let confirmed: Vec<_> = records
            .iter()
            .filter_map(|r| r.deployment().map(|d| (r.name.as_str(), d)))
            .collect();
        for (name, deployment) in &confirmed {
            println!("{}", describe(name, deployment));
        }

        // A failed record write never hides the failed step
        let mut record_error = None;
        for (name, deployment) in confirmed {
            if let Err(err) = self.record(pipeline, name, deployment) {
                warn!(name, %err, "Failed to write deployment record");
                record_error.get_or_insert(err);
            }
        }

        let report = result.map_err(DeployerError::from)?;
        match record_error {
            Some(err) => Err(err),
            None => Ok(report),
        }
    }

    fn record(&self, pipeline: &Pipeline, name: &str, deployment: Deployment) -> Result<()> {
        let Some(dir) = &self.deployments else { return Ok(()) };
        let Some(artifact) = pipeline.artifact(name) else {
            warn!(name, "No artifact for deployed contract, skipping record");
            return Ok(());
        };
        let path = DeploymentsDir::new(dir)
            .write(name, &DeploymentFile::new(artifact, pipeline.salt, deployment))?;
        println!("  recorded in {}", path.display());
        Ok(())
    }
}

fn describe_factory(state: FactoryState) -> String {
    match state {
        FactoryState::AlreadyPresent(address) => {
            format!("CREATE2 factory: {address} (already deployed)")
        }
        FactoryState::Deployed { address, tx_hash } => {
            format!("CREATE2 factory: {address} (deployed in {tx_hash})")
        }
    }
}

fn describe(name: &str, deployment: &Deployment) -> String {
    let address = deployment.address;
    match (deployment.already_existed, deployment.tx_hash) {
        (true, _) => format!("{name}: {address} (already deployed)"),
        (false, Some(tx_hash)) => format!("{name}: {address} (deployed in {tx_hash})"),
        (false, None) => format!("{name}: {address} (deployed)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Artifact;
    use aa_deploy::{
        predict_addresses,
        test_utils::{MockChain, ENTRY_POINT_BYTECODE, PAYMASTER_BYTECODE},
        DeployError, Salt, CANONICAL_FACTORY_ADDRESS,
    };
    use alloy_primitives::{Address, B256};

    fn pipeline() -> Pipeline {
        let artifact = |name: &str, bytecode| Artifact {
            name: name.to_string(),
            abi: serde_json::json!([]),
            bytecode,
        };
        Pipeline {
            entry_point: artifact("EntryPoint", ENTRY_POINT_BYTECODE),
            paymaster: artifact("TestPaymasterAcceptAll", PAYMASTER_BYTECODE),
            salt: Salt::ZERO,
            gas_limit: 6_000_000,
        }
    }

    fn cmd(deployments: Option<PathBuf>) -> Cmd {
        #[derive(Parser)]
        struct Wrapper {
            #[command(flatten)]
            cmd: Cmd,
        }
        let mut cmd = Wrapper::parse_from(["aa-deployer"]).cmd;
        cmd.deployments = deployments;
        cmd
    }

    #[test]
    fn test_defaults() {
        let cmd = cmd(None);
        assert_eq!(cmd.chain_args.rpc, "http://localhost:8545");
        assert_eq!(cmd.pipeline_args.entry_point_artifact, "EntryPoint");
        assert_eq!(cmd.pipeline_args.paymaster_artifact, "TestPaymasterAcceptAll");
        assert_eq!(cmd.pipeline_args.salt, B256::ZERO);
        assert_eq!(cmd.pipeline_args.gas_limit, 6_000_000);
    }

    #[tokio::test]
    async fn test_deploys_then_skips_and_records() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = cmd(Some(dir.path().to_path_buf()));
        let chain = MockChain::new();
        let pipeline = pipeline();

        let first = cmd.execute(&chain, &pipeline, Create2Factory::canonical()).await.unwrap();
        let sent = chain.sent_count();
        let second = cmd.execute(&chain, &pipeline, Create2Factory::canonical()).await.unwrap();
        assert_eq!(chain.sent_count(), sent);

        let predicted =
            predict_addresses(CANONICAL_FACTORY_ADDRESS, &pipeline.steps().unwrap()).unwrap();
        for (name, address) in predicted.iter() {
            assert_eq!(first.get(name).unwrap().address, address);
            assert!(second.get(name).unwrap().already_existed);

            let record = DeploymentsDir::new(dir.path()).read(name).unwrap();
            assert_eq!(record.address, address);
            assert!(record.already_existed);
        }
    }

    #[tokio::test]
    async fn test_failure_keeps_confirmed_records() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = cmd(Some(dir.path().to_path_buf()));
        let chain = MockChain::new();
        let pipeline = pipeline();
        let paymaster = predict_addresses(CANONICAL_FACTORY_ADDRESS, &pipeline.steps().unwrap())
            .unwrap()
            .get("TestPaymasterAcceptAll")
            .unwrap();
        chain.fail_get_code(paymaster, 1);

        let err = match cmd.execute(&chain, &pipeline, Create2Factory::canonical()).await {
            Err(DeployerError::Sequence(err)) => err,
            other => panic!("expected a sequence error, got {other:?}"),
        };
        assert_eq!(err.step, "TestPaymasterAcceptAll");
        assert!(matches!(err.source, DeployError::ChainUnavailable(_)));
        assert!(err
            .to_string()
            .starts_with("step `TestPaymasterAcceptAll` failed with ChainUnavailable"));

        let deployments = DeploymentsDir::new(dir.path());
        assert_ne!(deployments.read("EntryPoint").unwrap().address, Address::ZERO);
        assert!(deployments.read("TestPaymasterAcceptAll").is_err());
    }

    #[tokio::test]
    async fn test_unwritable_records_keep_the_failed_step() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file");
        std::fs::write(&file, b"").unwrap();
        let cmd = cmd(Some(file.join("sub")));
        let chain = MockChain::new();
        let pipeline = pipeline();
        let paymaster = predict_addresses(CANONICAL_FACTORY_ADDRESS, &pipeline.steps().unwrap())
            .unwrap()
            .get("TestPaymasterAcceptAll")
            .unwrap();
        chain.fail_get_code(paymaster, 1);

        let err = match cmd.execute(&chain, &pipeline, Create2Factory::canonical()).await {
            Err(DeployerError::Sequence(err)) => err,
            other => panic!("expected a sequence error, got {other:?}"),
        };
        assert_eq!(err.step, "TestPaymasterAcceptAll");
        assert_eq!(err.completed().count(), 1);
    }

    #[tokio::test]
    async fn test_unwritable_records_fail_a_successful_run() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file");
        std::fs::write(&file, b"").unwrap();
        let cmd = cmd(Some(file.join("sub")));
        let chain = MockChain::new();

        let result = cmd.execute(&chain, &pipeline(), Create2Factory::canonical()).await;
        assert!(matches!(result, Err(DeployerError::Io { .. })), "{result:?}");
        assert_eq!(chain.sent_count(), 4);
    }

    #[test]
    fn test_describe() {
        let address = Address::with_last_byte(1);
        let existing = Deployment { address, already_existed: true, tx_hash: None };
        assert_eq!(
            describe("EntryPoint", &existing),
            format!("EntryPoint: {address} (already deployed)")
        );
    }
}
