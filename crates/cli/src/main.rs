//! debounce - run a command once its input goes quiet

use anyhow::Result;
use clap::Parser;
use cli_lib::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli_lib::init_logging(cli.verbose);

    let settings = cli_lib::settings_from_cli(&cli)?;
    let stdin = std::io::stdin();
    let runs = cli_lib::drive(&settings, cli.leading_run, stdin.lock())?;

    tracing::info!("Input closed after {} run(s)", runs);
    Ok(())
}
