use std::process::ExitCode;

use clap::Parser;
use hubsync::cli::{self, Cli};
use hubsync::config::Config;
use hubsync::logging::init_tracing;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();
    let all_ok = cli::run(cli, Config::from_env()).await?;
    Ok(if all_ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
