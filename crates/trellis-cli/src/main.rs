use clap::Parser;
use trellis_cli::Cli;
use trellis_cli::tracing_setup::init_tracing;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs)?;

    let output = cli.execute()?;
    println!("{output}");
    Ok(())
}
