use aa_deploy::{ChainClient, Create2Factory, FactoryState};
use clap::Parser;

use super::{ChainArgs, FactoryArgs, Result};

/// Deploy the CREATE2 factory if it is not deployed yet
#[derive(Parser, Debug)]
pub struct Cmd {
    /// Chain connection
    #[command(flatten)]
    pub chain_args: ChainArgs,

    /// CREATE2 factory
    #[command(flatten)]
    pub factory_args: FactoryArgs,
}

impl Cmd {
    /// Execute the factory command
    pub async fn run(&self) -> Result<()> {
        let factory = self.factory_args.factory()?;
        let chain = self.chain_args.connect()?;
        let state = self.execute(&chain, factory).await?;
        match state {
            FactoryState::AlreadyPresent(address) => {
                println!("CREATE2 factory: {address} (already deployed)");
            }
            FactoryState::Deployed { address, tx_hash } => {
                println!("CREATE2 factory: {address} (deployed in {tx_hash})");
            }
        }
        Ok(())
    }

    /// Ensures `factory` on `chain`.
    pub async fn execute<C: ChainClient>(
        &self,
        chain: &C,
        factory: Create2Factory,
    ) -> Result<FactoryState> {
        Ok(factory.ensure(chain).await?)
    }
}
