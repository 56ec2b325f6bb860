use anyhow::{Context, Result};
use clap::Args;

use crate::commands::RuntimeArgs;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(flatten)]
    pub runtime: RuntimeArgs,
}

/// Print the resolved runtime configuration, after validation, exactly
/// as the other subcommands will see it.
pub fn run(args: ConfigArgs) -> Result<()> {
    let config = args.runtime.resolve()?;
    let rendered =
        serde_yaml::to_string(&config).context("Failed to render runtime configuration")?;
    print!("{}", rendered);
    Ok(())
}
