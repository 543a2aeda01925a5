use aa_deploy::{compute_address, predict_addresses, InitCode, Salt};
use alloy_primitives::Address;
use clap::Parser;

use super::{load_hex, FactoryArgs, Pipeline, PipelineArgs, Result};

/// Print the addresses contracts would be deployed to, without connecting to any chain
#[derive(Parser, Debug)]
pub struct Cmd {
    /// CREATE2 factory
    #[command(flatten)]
    pub factory_args: FactoryArgs,

    /// Contracts of the pipeline
    #[command(flatten)]
    pub pipeline_args: PipelineArgs,

    /// Predict the address of this init code (bytecode with encoded constructor arguments)
    /// instead of the pipeline
    #[arg(long = "init-code", conflicts_with = "init_code_file")]
    pub init_code: Option<String>,

    /// File containing the init code as hex. Use `-` for stdin.
    #[arg(long = "init-code-file")]
    pub init_code_file: Option<String>,
}

impl Cmd {
    /// Execute the predict command
    pub fn run(&self) -> Result<()> {
        for (name, address) in self.execute()? {
            println!("{name}: {address}");
        }
        Ok(())
    }

    /// Returns `(name, address)` pairs in deployment order.
    pub fn execute(&self) -> Result<Vec<(String, Address)>> {
        let factory = self.factory_args.factory()?.address();
        if let Some(code) = load_hex(self.init_code.as_deref(), self.init_code_file.as_deref())? {
            let init_code = InitCode::new(code)?;
            let address = compute_address(factory, &init_code, self.salt())?;
            return Ok(vec![("init code".to_string(), address)]);
        }

        let pipeline = Pipeline::load(&self.pipeline_args)?;
        let resolved = predict_addresses(factory, &pipeline.steps()?)?;
        Ok(resolved.iter().map(|(name, address)| (name.to_string(), address)).collect())
    }

    const fn salt(&self) -> Salt {
        self.pipeline_args.salt
    }
}
