use crate::cli::AuditCli;
use clap::Parser;

/// Initialise the CLI and logging for an audit binary.
pub fn init() -> AuditCli {
    env_logger::init();

    AuditCli::parse()
}
