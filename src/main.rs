use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pg_backup_manager::config::{self, CompressorKind, Password, Settings, SettingsOverrides};
use pg_backup_manager::managers::logging::{self, LoggingConfig};
use pg_backup_manager::utils::{RealExecutor, ToolPaths};
use pg_backup_manager::{BackupManager, ExclusionPolicy};
use std::path::PathBuf;
use std::process::ExitCode;

/// Exit status for configuration errors, matching clap's usage errors
const EXIT_CONFIG: u8 = 2;

#[derive(Parser)]
#[command(name = "pg-backup-manager")]
#[command(about = "Policy-driven backups of every database in a PostgreSQL instance", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to TOML settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// PostgreSQL host
    #[arg(short = 'H', long, global = true)]
    host: Option<String>,

    /// PostgreSQL port [default: 5432]
    #[arg(short = 'P', long, global = true)]
    port: Option<u16>,

    /// PostgreSQL user [default: postgres]
    #[arg(short, long, global = true)]
    user: Option<String>,

    /// Database used to list the others [default: postgres]
    #[arg(short, long, global = true)]
    database: Option<String>,

    /// PostgreSQL password
    #[arg(short, long, global = true, env = "PGPASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// File containing the PostgreSQL password
    #[arg(long, global = true)]
    password_file: Option<PathBuf>,

    /// Output directory, created if missing
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Compressor [default: gzip]
    #[arg(short, long, global = true, value_enum)]
    compressor: Option<CompressorKind>,

    /// Compression level, 1-9 [default: 9]
    #[arg(short, long, global = true, allow_negative_numbers = true)]
    level: Option<i64>,

    /// Exclusion policy document [default: pg_db.json]
    #[arg(short, long = "json-file", global = true)]
    json_file: Option<PathBuf>,

    /// Directory for rotating log files
    #[arg(short = 'L', long = "log", global = true)]
    log_directory: Option<PathBuf>,

    /// Log level [default: info]
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Back up every enabled database and the globals (default)
    Run {
        /// List databases and show the commands that would run, without dumping
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate settings, policy document and required tools
    Validate,
}

impl Cli {
    fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            database: self.database.clone(),
            password: self.password.as_deref().map(Password::new),
            password_file: self.password_file.clone(),
            output: self.output.clone(),
            compressor: self.compressor,
            level: self.level,
            json_file: self.json_file.clone(),
            log_directory: self.log_directory.clone(),
            log_level: self.log_level.clone(),
        }
    }
}

/// Everything a run needs, resolved before any backup attempt
struct Prepared {
    settings: Settings,
    tools: ToolPaths,
    policy: ExclusionPolicy,
}

fn main() -> ExitCode {
    let mut cli = Cli::parse();
    let command = cli.command.take().unwrap_or(Commands::Run { dry_run: false });
    let create_directories = !matches!(command, Commands::Validate);

    let prepared = match prepare(&cli, create_directories) {
        Ok(prepared) => prepared,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            eprintln!();
            eprintln!("Usage: pg-backup-manager -H <HOST> -p <PASSWORD> -o <OUTPUT> [-L <LOG_DIR>]");
            eprintln!("Run 'pg-backup-manager --help' for all options.");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    // Setup logging with file rotation (must keep guard alive)
    let logging_config = LoggingConfig::from_config(
        prepared.settings.log_directory.as_deref(),
        &prepared.settings.log_level,
    );
    let _log_guard = match logging::init_logging(&logging_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    // Policy was loaded before the subscriber existed
    prepared.policy.warn_duplicates();

    match command {
        Commands::Validate => {
            println!("Configuration is valid!");
            println!(
                "Server: {}:{} (user {})",
                prepared.settings.connection.host,
                prepared.settings.connection.port,
                prepared.settings.connection.user
            );
            println!(
                "Compressor: {} at level {}",
                prepared.tools.compressor.display(),
                prepared.settings.compressor.level
            );
            println!("Policy entries: {}", prepared.policy.len());
            ExitCode::SUCCESS
        }

        Commands::Run { dry_run } => {
            let executor = RealExecutor::new(prepared.settings.password.clone());
            let manager = BackupManager::new(
                &prepared.settings,
                prepared.tools,
                prepared.policy,
                executor,
            );

            if dry_run {
                return match manager.dry_run() {
                    Ok(_) => ExitCode::SUCCESS,
                    Err(_) => ExitCode::FAILURE,
                };
            }

            match manager.run() {
                Ok(report) if !report.has_failures() => ExitCode::SUCCESS,
                // Every failure has already been logged with its target
                Ok(_) | Err(_) => ExitCode::FAILURE,
            }
        }
    }
}

/// Resolve settings, tools and policy, and create directories
///
/// Nothing is spawned here, so any error leaves the server untouched.
fn prepare(cli: &Cli, create_directories: bool) -> Result<Prepared> {
    let file = cli
        .config
        .as_ref()
        .map(config::load_settings_file)
        .transpose()
        .context("Failed to load settings file")?;

    let settings = config::resolve_settings(cli.overrides(), file)?;
    let tools = ToolPaths::resolve(settings.compressor.kind)?;
    let policy = config::load_policy(&settings.policy_file)?;

    if create_directories {
        config::prepare_directories(&settings)?;
    }

    Ok(Prepared {
        settings,
        tools,
        policy,
    })
}
