//! Command-line interface definitions for the `nexstor` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::{Parser, Subcommand, ValueEnum};

/// Top-level CLI for the `nexstor` binary.
#[derive(Debug, Parser)]
#[command(
    name = "nexstor",
    about = "Provision and release NFS volumes on a NexentaStor appliance",
    version,
    arg_required_else_help = true
)]
pub(crate) struct Cli {
    /// Log output format.
    #[arg(
        long,
        value_enum,
        global = true,
        default_value_t = LogFormatArg::Human,
        env = "NEXSTOR_LOG_FORMAT"
    )]
    pub(crate) log_format: LogFormatArg,
    /// Operation to perform.
    #[command(subcommand)]
    pub(crate) command: Command,
}

/// Subcommands of `nexstor`.
#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Create a filesystem and NFS export, then print the volume descriptor.
    #[command(
        name = "provision",
        about = "Create a filesystem and NFS export, then print the volume descriptor"
    )]
    Provision(ProvisionCommand),
    /// Delete the filesystem behind a descriptor created by this instance.
    #[command(
        name = "delete",
        about = "Delete the filesystem behind a descriptor created by this instance"
    )]
    Delete(DeleteCommand),
}

/// Arguments for `nexstor provision`.
#[derive(Debug, Parser)]
pub(crate) struct ProvisionCommand {
    /// Volume name; the filesystem is created as `<pool>/<name>`.
    #[arg(long, value_name = "NAME")]
    pub(crate) name: String,
    /// Quota such as `5Gi`, `500M` or a plain byte count. Omit for no quota.
    #[arg(long, value_name = "QUANTITY")]
    pub(crate) capacity: Option<String>,
    /// Access mode (`ReadWriteOnce`, `ReadOnlyMany`, `ReadWriteMany` or
    /// `RWO`, `ROX`, `RWX`). Repeat for several.
    #[arg(long = "access-mode", value_name = "MODE")]
    pub(crate) access_modes: Vec<String>,
    /// Reclaim policy recorded on the descriptor.
    #[arg(long, value_name = "POLICY", default_value = "Delete")]
    pub(crate) reclaim_policy: String,
}

/// Arguments for `nexstor delete`.
#[derive(Debug, Parser)]
pub(crate) struct DeleteCommand {
    /// JSON descriptor previously printed by `nexstor provision`.
    #[arg(long, value_name = "FILE")]
    pub(crate) descriptor: String,
}

/// Log output formats selectable on the command line.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub(crate) enum LogFormatArg {
    /// Compact human-readable lines.
    Human,
    /// One JSON object per event.
    Json,
}
