use clap::Parser;
use log::*;

use observability_copilot::{
    Result,
    cli::{Args, Command},
    command,
    config::Config,
};

fn initialize_logger(debug: bool) -> Result<()> {
    let filter = if debug {
        simplelog::LevelFilter::Debug
    } else {
        simplelog::LevelFilter::Info
    };

    let config = simplelog::ConfigBuilder::new()
        .add_filter_allow_str("observability_copilot")
        .build();

    simplelog::TermLogger::init(
        filter,
        config,
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    Ok(())
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli_args = Args::parse();

    initialize_logger(cli_args.debug)?;

    let config = Config::load(&cli_args.config)?;
    debug!("loaded config: {config:?}");

    match cli_args.command {
        Command::Scan {
            repo,
            branch,
            id,
            path,
            out_file,
        } => {
            command::scan::execute(&config, repo, branch, id, path, out_file)
                .await?
        }
        Command::Plan {
            language,
            service,
            mode,
            scan,
            out_file,
        } => {
            command::plan::execute(
                &config, language, service, mode, scan, out_file,
            )
            .await?
        }
        Command::Apply { path, plan } => {
            command::apply::execute(path, plan).await?
        }
        Command::ToggleSpec { service, mode } => {
            command::toggle::execute(&service, mode)?
        }
        Command::Submit {
            repo,
            language,
            mode,
            service,
            base,
            github_token,
        } => {
            command::submit::execute(
                &config,
                repo,
                language,
                mode,
                service,
                base,
                github_token,
            )
            .await?
        }
    }

    Ok(())
}
