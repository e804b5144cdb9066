//! Binary entry point for the `nexstor` CLI.

use std::io::{self, Write};
use std::process;

use camino::Utf8Path;
use clap::Parser;
use thiserror::Error;
use tracing::info;

use nexstor::files::read_to_string_ambient;
use nexstor::logging::{self, LogFormat};
use nexstor::{
    AccessMode, ApplianceConfig, ApplianceProvisioner, ProvisionError, Provisioner,
    ReclaimPolicy, VolumeDescriptor, VolumeRequest, parse_quantity,
};

mod cli;

use cli::{Cli, Command, DeleteCommand, LogFormatArg, ProvisionCommand};

#[derive(Clone, Debug, Error, Eq, PartialEq)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid argument: {0}")]
    Argument(String),
    #[error("failed to read descriptor {path}: {message}")]
    Descriptor { path: String, message: String },
    #[error(transparent)]
    Provision(#[from] ProvisionError),
    #[error("failed to write output: {0}")]
    Output(String),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = logging::init(log_format(cli.log_format)) {
        writeln!(io::stderr(), "failed to initialise logging: {err}").ok();
    }

    let exit_code = match dispatch(cli.command).await {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

const fn log_format(arg: LogFormatArg) -> LogFormat {
    match arg {
        LogFormatArg::Human => LogFormat::Human,
        LogFormatArg::Json => LogFormat::Json,
    }
}

async fn dispatch(command: Command) -> Result<(), CliError> {
    match command {
        Command::Provision(args) => provision(&args).await,
        Command::Delete(args) => delete(&args).await,
    }
}

fn load_provisioner() -> Result<ApplianceProvisioner, CliError> {
    let config =
        ApplianceConfig::load_without_cli_args().map_err(|err| CliError::Config(err.to_string()))?;
    config
        .validate()
        .map_err(|err| CliError::Config(err.to_string()))?;
    Ok(ApplianceProvisioner::from_config(&config)?)
}

async fn provision(args: &ProvisionCommand) -> Result<(), CliError> {
    let request = build_request(args)?;
    let provisioner = load_provisioner()?;
    let descriptor = provisioner.provision(&request).await?;

    let rendered = serde_json::to_string_pretty(&descriptor)
        .map_err(|err| CliError::Output(err.to_string()))?;
    writeln!(io::stdout(), "{rendered}").map_err(|err| CliError::Output(err.to_string()))
}

async fn delete(args: &DeleteCommand) -> Result<(), CliError> {
    let descriptor = read_descriptor(&args.descriptor)?;
    let provisioner = load_provisioner()?;

    match provisioner.delete(&descriptor).await {
        Ok(()) => {
            info!(volume = descriptor.name(), "volume deleted");
            Ok(())
        }
        Err(err) if err.is_ignorable() => {
            writeln!(io::stderr(), "skipped: {err}").ok();
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

fn build_request(args: &ProvisionCommand) -> Result<VolumeRequest, CliError> {
    let access_modes = args
        .access_modes
        .iter()
        .map(|mode| mode.parse::<AccessMode>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| CliError::Argument(err.to_string()))?;
    let reclaim_policy = args
        .reclaim_policy
        .parse::<ReclaimPolicy>()
        .map_err(|err| CliError::Argument(err.to_string()))?;

    let mut request = VolumeRequest::new(args.name.as_str())
        .with_access_modes(access_modes)
        .with_reclaim_policy(reclaim_policy);
    if let Some(capacity) = &args.capacity {
        let bytes = parse_quantity(capacity).map_err(|err| CliError::Argument(err.to_string()))?;
        request = request.with_capacity(bytes);
    }
    request
        .validate()
        .map_err(|err| CliError::Argument(err.to_string()))?;
    Ok(request)
}

fn read_descriptor(path: &str) -> Result<VolumeDescriptor, CliError> {
    let contents =
        read_to_string_ambient(Utf8Path::new(path)).map_err(|err| CliError::Descriptor {
            path: path.to_owned(),
            message: err.to_string(),
        })?;
    serde_json::from_str(&contents).map_err(|err| CliError::Descriptor {
        path: path.to_owned(),
        message: err.to_string(),
    })
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
