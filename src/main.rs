use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    jenmusic::logging::init("info").context("init logging")?;

    let cli = jenmusic::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        jenmusic::cli::Command::Update(args) => {
            let config =
                jenmusic::config::UpdateConfig::from_args(args).context("load configuration")?;
            tracing::debug!(?config, "resolved configuration");
            jenmusic::update::run(config).await.context("update")?;
        }
        jenmusic::cli::Command::Render(args) => {
            jenmusic::document::render(args).await.context("render")?;
        }
    }

    Ok(())
}
