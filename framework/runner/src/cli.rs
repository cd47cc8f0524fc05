use crate::config::AuditStage;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
pub struct AuditCli {
    /// Path to a TOML audit config. Values given on the command line override the file.
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Only run the named load test scenario. Matching ignores case.
    ///
    /// You can run several scenarios by using the flag multiple times. For example
    /// `--scenario baseline --scenario "peak load"`.
    #[clap(long, short)]
    pub scenario: Vec<String>,

    /// Override the number of concurrent users for every scenario
    #[clap(long)]
    pub users: Option<u32>,

    /// Override the number of seconds every scenario runs for, excluding ramp-up
    #[clap(long)]
    pub duration: Option<u64>,

    /// Seed the simulated outcomes and traffic class selection so runs are reproducible
    #[clap(long)]
    pub seed: Option<u64>,

    /// The number of seconds to keep monitoring after the database phase
    #[clap(long)]
    pub monitor_window: Option<u64>,

    /// Skip a stage of the audit. One of `functional`, `security`, `integration`, `load-test`,
    /// `database` or `monitoring`.
    ///
    /// You can skip several stages by using the flag multiple times. Skipped stages do not
    /// count towards the scores, see the skipped score defaults of the score policy.
    #[clap(long, value_parser = parse_stage)]
    pub skip: Vec<AuditStage>,

    /// Do not show a progress bar on the CLI.
    ///
    /// This is recommended for CI/CD environments where the progress bar isn't being looked at by anyone and is just adding noise to the logs.
    #[clap(long, default_value = "false")]
    pub no_progress: bool,

    /// Write the audit report as JSON into this directory
    #[clap(long)]
    pub report_dir: Option<PathBuf>,
}

fn parse_stage(s: &str) -> anyhow::Result<AuditStage> {
    let wanted = s.trim().to_ascii_lowercase().replace('_', "-");

    AuditStage::ALL
        .into_iter()
        .find(|stage| stage.to_string() == wanted)
        .ok_or_else(|| anyhow::anyhow!("Unknown audit stage: {s}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_names_parse() {
        assert_eq!(AuditStage::LoadTest, parse_stage("load-test").unwrap());
        assert_eq!(AuditStage::LoadTest, parse_stage("load_test").unwrap());
        assert_eq!(AuditStage::Security, parse_stage("Security").unwrap());
        assert!(parse_stage("deploy").is_err());
    }

    #[test]
    fn defaults_leave_everything_unset() {
        let cli = AuditCli::try_parse_from(["payment_audit"]).unwrap();

        assert!(cli.config.is_none());
        assert!(cli.scenario.is_empty());
        assert!(cli.skip.is_empty());
        assert!(!cli.no_progress);
    }

    #[test]
    fn unknown_stage_is_a_usage_error() {
        assert!(AuditCli::try_parse_from(["payment_audit", "--skip", "deploy"]).is_err());
    }
}
