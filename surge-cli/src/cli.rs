//! CLI argument parsing definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use surge_config::domains::utils::parse_seconds;

#[derive(Parser)]
#[command(name = "surge", author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Set the log level (trace, debug, info, warn, error) or a filter directive
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the health-check load test
    Run {
        /// Number of concurrent users
        #[arg(short, long, value_name = "N")]
        users: Option<usize>,

        /// Users started per second
        #[arg(short = 'r', long, value_name = "RATE")]
        spawn_rate: Option<f64>,

        /// Stop after this many seconds
        #[arg(short = 't', long, value_name = "SECS", value_parser = parse_seconds)]
        run_time: Option<Duration>,

        /// Target server URL
        #[arg(long, value_name = "URL")]
        url: Option<String>,

        /// Run as the coordinator of a distributed run
        #[arg(long, conflicts_with = "worker")]
        master: bool,

        /// Run as an executor of a distributed run
        #[arg(long)]
        worker: bool,

        /// Print the final report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        config_cmd: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Validate a configuration file
    Validate {
        /// Path to the configuration file
        #[arg(long, value_name = "PATH")]
        config_file: PathBuf,
    },

    /// Generate a sample configuration file
    Generate {
        /// Output file path; prints to stdout when omitted
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },

    /// Show current configuration in use
    Show {
        /// Path to configuration file (optional, uses default loading logic)
        #[arg(long, value_name = "PATH")]
        config_file: Option<PathBuf>,

        /// Output format: yaml, json
        #[arg(long, value_name = "FORMAT", default_value = "yaml")]
        format: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_arguments() {
        let cli = Cli::try_parse_from([
            "surge",
            "--log-level",
            "debug",
            "run",
            "-u",
            "20",
            "-r",
            "5",
            "-t",
            "90",
            "--url",
            "http://127.0.0.1:3000/",
            "--master",
        ])
        .unwrap();

        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Some(Commands::Run {
                users,
                spawn_rate,
                run_time,
                url,
                master,
                worker,
                json,
            }) => {
                assert_eq!(users, Some(20));
                assert_eq!(spawn_rate, Some(5.0));
                assert_eq!(run_time, Some(Duration::from_secs(90)));
                assert_eq!(url.as_deref(), Some("http://127.0.0.1:3000/"));
                assert!(master);
                assert!(!worker);
                assert!(!json);
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_master_and_worker_conflict() {
        let result = Cli::try_parse_from(["surge", "run", "--master", "--worker"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_run_time_rejected() {
        let result = Cli::try_parse_from(["surge", "run", "--run-time", "soon"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let cli = Cli::try_parse_from(["surge", "config", "show", "--config", "surge.yaml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("surge.yaml")));
    }
}
