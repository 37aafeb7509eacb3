use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use surge_config::{ConfigLoader, LogFormat, LoggingConfig, RoleConfig, SurgeConfig};
use surge_load::{
    log_runner_role, Environment, HealthCheckUser, LoadRunner, RequestStats, RunParameters, WaitTime,
};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

mod cli;
use cli::{Cli, Commands, ConfigCommands};

/// Command-line overrides for a load run
#[derive(Debug, Default, Clone, PartialEq)]
struct RunOverrides {
    users: Option<usize>,
    spawn_rate: Option<f64>,
    run_time: Option<Duration>,
    url: Option<String>,
    role: Option<RoleConfig>,
}

impl RunOverrides {
    /// Apply the overrides and re-validate the result
    fn apply(self, config: &mut SurgeConfig) -> Result<()> {
        if let Some(users) = self.users {
            config.load.users = users;
        }
        if let Some(spawn_rate) = self.spawn_rate {
            config.load.spawn_rate = spawn_rate;
        }
        if let Some(run_time) = self.run_time {
            config.load.run_time = Some(run_time);
        }
        if let Some(url) = self.url {
            config.target.url = url;
        }
        if let Some(role) = self.role {
            config.load.role = role;
        }
        config
            .validate_all()
            .context("Invalid configuration after applying command-line options")
    }
}

/// Load configuration from a file or from the environment
///
/// Runs before logging is initialized, so it reports through errors only. An
/// explicit path that does not exist is an error rather than a silent
/// fallback to the default target.
fn load_config(config_path: Option<&PathBuf>) -> Result<SurgeConfig> {
    let loader = ConfigLoader::new();

    match config_path {
        Some(path) => {
            if !path.exists() {
                return Err(anyhow::anyhow!("Configuration file not found: {:?}", path));
            }
            loader
                .from_file(path)
                .context(format!("Failed to load configuration from {:?}", path))
        }
        None => loader
            .from_env()
            .context("Failed to load configuration from environment"),
    }
}

/// Initialize tracing from the logging configuration
///
/// `--log-level` wins over `RUST_LOG`, which wins over the configured level.
fn init_logging(config: &LoggingConfig, log_level: Option<&String>) -> Result<()> {
    let env_filter = match log_level {
        Some(level) => EnvFilter::try_new(level).unwrap_or_else(|_| {
            eprintln!(
                "Invalid log level '{}', falling back to '{}'",
                level,
                config.level.as_str()
            );
            EnvFilter::new(config.level.as_str())
        }),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.level.as_str())),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(config.ansi)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    let result = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Text => builder.try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    debug!(format = ?config.format, "Logging initialized");
    Ok(())
}

/// Resolves on Ctrl-C
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Run the health-check load test and print the report
async fn run_command(mut config: SurgeConfig, overrides: RunOverrides, json: bool) -> Result<()> {
    overrides.apply(&mut config)?;

    let stats = Arc::new(RequestStats::new());
    let mut environment = Environment::new(config.load.role.into());
    environment.add_init_listener(log_runner_role);
    environment.add_request_listener(stats.clone());
    let environment = Arc::new(environment);
    environment.fire_init();

    info!(
        url = %config.target.url,
        socketio_path = %config.target.socketio_path,
        "Starting health-check load test"
    );

    let mut runner = LoadRunner::new(environment, RunParameters::from(&config.load));
    runner
        .add_user_class(HealthCheckUser::blueprint(
            config.target.clone(),
            config.health_check.clone(),
            WaitTime::from(&config.load.wait_time),
        ))
        .context("Failed to register user class")?;

    let summary = runner
        .run(shutdown_signal())
        .await
        .context("Load run failed")?;

    let report = stats.report(summary.elapsed);
    if json {
        let output = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{}", output);
    } else {
        println!("{}", report);
    }

    let errors = stats.total_errors();
    if errors > 0 {
        return Err(anyhow::anyhow!("Run finished with {} error(s)", errors));
    }
    Ok(())
}

/// Handle configuration validation
fn handle_config_validate(config_file: &PathBuf) -> Result<()> {
    info!("Validating configuration file: {:?}", config_file);

    if !config_file.exists() {
        return Err(anyhow::anyhow!(
            "Configuration file not found: {:?}",
            config_file
        ));
    }

    match load_config(Some(config_file)) {
        Ok(_config) => {
            println!("✅ Configuration file is valid");
            info!("Configuration validation passed");
            Ok(())
        }
        Err(e) => {
            println!("❌ Configuration validation failed: {:#}", e);
            error!("Configuration validation failed: {:#}", e);
            Err(e)
        }
    }
}

/// Handle configuration generation
fn handle_config_generate(output: Option<&PathBuf>, force: bool) -> Result<()> {
    let content = SurgeConfig::generate_sample();

    let Some(output) = output else {
        print!("{}", content);
        return Ok(());
    };

    info!("Generating configuration at: {:?}", output);

    if output.exists() && !force {
        return Err(anyhow::anyhow!(
            "Output file already exists: {:?}. Use --force to overwrite.",
            output
        ));
    }

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).context("Failed to create output directory")?;
    }

    fs::write(output, content).context(format!("Failed to write {:?}", output))?;
    println!("✅ Configuration written to {:?}", output);
    Ok(())
}

/// Handle configuration display
fn handle_config_show(config: &SurgeConfig, format: &str) -> Result<()> {
    match format.to_lowercase().as_str() {
        "yaml" | "yml" => {
            let output = serde_yaml::to_string(config).context("Failed to serialize to YAML")?;
            println!("{}", output);
        }
        "json" => {
            let output =
                serde_json::to_string_pretty(config).context("Failed to serialize to JSON")?;
            println!("{}", output);
        }
        _ => {
            return Err(anyhow::anyhow!(
                "Unknown output format: {}. Valid formats: yaml, json",
                format
            ));
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first
    let config_path = match &cli.command {
        Some(Commands::Config {
            config_cmd: ConfigCommands::Show { config_file: Some(path), .. },
        }) => Some(path.clone()),
        _ => cli.config.clone(),
    };
    let config = load_config(config_path.as_ref())?;

    init_logging(&config.logging, cli.log_level.as_ref())?;
    match &config_path {
        Some(path) => info!("Loaded configuration from: {:?}", path),
        None => debug!("No configuration file specified. Loaded from environment or defaults."),
    }

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
            let role = if master {
                Some(RoleConfig::Master)
            } else if worker {
                Some(RoleConfig::Worker)
            } else {
                None
            };
            let overrides = RunOverrides {
                users,
                spawn_rate,
                run_time,
                url,
                role,
            };
            run_command(config, overrides, json).await
        }
        Some(Commands::Config { config_cmd }) => match config_cmd {
            ConfigCommands::Validate { config_file } => handle_config_validate(&config_file),
            ConfigCommands::Generate { output, force } => {
                handle_config_generate(output.as_ref(), force)
            }
            ConfigCommands::Show { format, .. } => handle_config_show(&config, &format),
        },
        None => {
            // If no subcommand is provided, print help
            use clap::CommandFactory;
            let mut cmd = Cli::command();
            cmd.print_help().context("Failed to print help")?;
            println!();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_apply_to_config() {
        let mut config = SurgeConfig::default();
        let overrides = RunOverrides {
            users: Some(10),
            spawn_rate: Some(2.0),
            run_time: Some(Duration::from_secs(30)),
            url: Some("http://localhost:3000/".to_string()),
            role: Some(RoleConfig::Worker),
        };

        overrides.apply(&mut config).unwrap();

        assert_eq!(config.load.users, 10);
        assert_eq!(config.load.spawn_rate, 2.0);
        assert_eq!(config.load.run_time, Some(Duration::from_secs(30)));
        assert_eq!(config.target.url, "http://localhost:3000/");
        assert_eq!(config.load.role, RoleConfig::Worker);
    }

    #[test]
    fn test_empty_overrides_keep_config() {
        let mut config = SurgeConfig::default();
        RunOverrides::default().apply(&mut config).unwrap();
        assert_eq!(config, SurgeConfig::default());
    }

    #[test]
    fn test_invalid_overrides_rejected() {
        let mut config = SurgeConfig::default();
        let overrides = RunOverrides {
            users: Some(0),
            ..Default::default()
        };
        assert!(overrides.apply(&mut config).is_err());

        let mut config = SurgeConfig::default();
        let overrides = RunOverrides {
            url: Some("ftp://example.com/".to_string()),
            ..Default::default()
        };
        assert!(overrides.apply(&mut config).is_err());
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("typo.yaml");

        let error = load_config(Some(&missing)).unwrap_err();
        assert!(error.to_string().contains("Configuration file not found"));
    }

    #[test]
    fn test_existing_config_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("surge.yaml");
        fs::write(&path, "target:\n  url: \"http://localhost:3000/\"\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.target.url, "http://localhost:3000/");
    }

    #[test]
    fn test_show_renders_loaded_config() {
        let config = SurgeConfig::default();
        assert!(handle_config_show(&config, "json").is_ok());
        assert!(handle_config_show(&config, "yaml").is_ok());
        assert!(handle_config_show(&config, "toml").is_err());
    }

    #[test]
    fn test_generate_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("surge.yaml");

        handle_config_generate(Some(&path), false).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("health_check"));

        assert!(handle_config_generate(Some(&path), false).is_err());
        assert!(handle_config_generate(Some(&path), true).is_ok());
    }
}
