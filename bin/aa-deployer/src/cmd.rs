use clap::Parser;

use crate::common::{DeployerError, LogArgs};

/// Main command enumeration for the aa-deployer CLI tool
#[derive(clap::Subcommand, Debug)]
pub enum MainCmd {
    /// Deploy the entry point and the paymaster through the CREATE2 factory
    Deploy(crate::deploy::Cmd),
    /// Deploy only the CREATE2 factory
    Factory(crate::factory::Cmd),
    /// Print deterministic addresses without connecting to a chain
    Predict(crate::predict::Cmd),
}

/// Top-level CLI with global logging flags
#[derive(Parser, Debug)]
#[command(name = "aa-deployer", version, about, infer_subcommands = true)]
pub struct Cli {
    /// Logging configuration
    #[command(flatten)]
    pub log_args: LogArgs,

    /// Subcommand
    #[command(subcommand)]
    pub cmd: MainCmd,
}

/// Error types for the main command system
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Logging could not be set up
    #[error("Logging error: {0}")]
    Logging(DeployerError),
    /// Command error
    #[error("{0}")]
    Deployer(#[from] DeployerError),
}

impl Cli {
    /// Initialize logging and execute the subcommand
    pub async fn run(&self) -> Result<(), Error> {
        self.log_args.init().map_err(Error::Logging)?;
        self.cmd.run().await
    }
}

impl MainCmd {
    /// Execute the main command
    pub async fn run(&self) -> Result<(), Error> {
        match self {
            Self::Deploy(cmd) => cmd.run().await?,
            Self::Factory(cmd) => cmd.run().await?,
            Self::Predict(cmd) => cmd.run()?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::parse_from(["aa-deployer", "-vvv", "predict", "--init-code", "0x00"]);
        assert_eq!(cli.log_args.verbose, 3);
        assert!(matches!(cli.cmd, MainCmd::Predict(_)));

        let cli = Cli::parse_from([
            "aa-deployer",
            "deploy",
            "--rpc",
            "http://127.0.0.1:9545",
            "--gas-limit",
            "8000000",
            "--deployments",
            "deployments/local",
        ]);
        let MainCmd::Deploy(cmd) = cli.cmd else { panic!("expected deploy") };
        assert_eq!(cmd.chain_args.rpc, "http://127.0.0.1:9545");
        assert_eq!(cmd.pipeline_args.gas_limit, 8_000_000);
        assert!(cmd.deployments.is_some());
    }

    #[test]
    fn test_conflicting_factory_sources_rejected() {
        let result = Cli::try_parse_from([
            "aa-deployer",
            "factory",
            "--factory.tx",
            "0x00",
            "--factory.tx-file",
            "tx.hex",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_debug_assert() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
