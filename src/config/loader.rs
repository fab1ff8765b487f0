use super::policy::ExclusionPolicy;
use super::types::*;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", .path.display())]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Unable to parse policy document {}: {source}", .path.display())]
    PolicyError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Compression level must be in range 1-9, now is '{0}'")]
    InvalidLevel(i64),

    #[error("Unable to find '{tool}' in PATH: {source}")]
    ToolNotFound {
        tool: String,
        #[source]
        source: which::Error,
    },

    #[error("Failed to create directory {}: {source}", .path.display())]
    DirectoryError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Load the optional TOML settings file
pub fn load_settings_file<P: AsRef<Path>>(path: P) -> Result<SettingsFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&contents)?)
}

/// Merge command line overrides over the settings file and defaults
///
/// Precedence is command line > settings file > default.
pub fn resolve_settings(
    overrides: SettingsOverrides,
    file: Option<SettingsFile>,
) -> Result<Settings> {
    let file = file.unwrap_or_default();

    let host = overrides
        .host
        .or(file.host)
        .ok_or(ConfigError::MissingParameter("host"))?;

    let output_directory = overrides
        .output
        .or(file.output)
        .ok_or(ConfigError::MissingParameter("output"))?;

    let password = match overrides.password {
        Some(password) => password,
        None => {
            let password_file = overrides
                .password_file
                .or(file.password_file)
                .ok_or(ConfigError::MissingParameter("password"))?;
            read_password_file(&password_file)?
        }
    };

    let raw_level = overrides.level.or(file.level);
    let level = match raw_level {
        Some(value) => CompressionLevel::new(value).ok_or(ConfigError::InvalidLevel(value))?,
        None => CompressionLevel::default(),
    };

    let connection = ConnectionProfile {
        host,
        port: overrides.port.or(file.port).unwrap_or_else(default_port),
        user: overrides.user.or(file.user).unwrap_or_else(default_user),
        database: overrides
            .database
            .or(file.database)
            .unwrap_or_else(default_database),
    };

    validate_connection(&connection)?;

    Ok(Settings {
        connection,
        password,
        output_directory: super::expand_tilde(&output_directory),
        compressor: CompressorSelection {
            kind: overrides
                .compressor
                .or(file.compressor)
                .unwrap_or(CompressorKind::Gzip),
            level,
        },
        policy_file: overrides
            .json_file
            .or(file.json_file)
            .unwrap_or_else(default_policy_file),
        log_directory: overrides
            .log_directory
            .or(file.log_directory)
            .map(|dir| super::expand_tilde(&dir)),
        log_level: overrides
            .log_level
            .or(file.log_level)
            .unwrap_or_else(default_log_level),
    })
}

fn validate_connection(connection: &ConnectionProfile) -> Result<()> {
    if connection.host.trim().is_empty() {
        return Err(ConfigError::MissingParameter("host"));
    }

    if connection.port == 0 {
        return Err(ConfigError::ValidationError(
            "Port must be between 1 and 65535".to_string(),
        ));
    }

    if connection.user.trim().is_empty() {
        return Err(ConfigError::MissingParameter("user"));
    }

    Ok(())
}

/// Read a password from a file, dropping the trailing newline
fn read_password_file(path: &Path) -> Result<Password> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    let secret = contents.trim_end_matches(['\r', '\n']);

    if secret.is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "Password file is empty: {}",
            path.display()
        )));
    }

    Ok(Password::new(secret))
}

/// Load the exclusion policy document
pub fn load_policy<P: AsRef<Path>>(path: P) -> Result<ExclusionPolicy> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    ExclusionPolicy::from_json(&contents).map_err(|source| ConfigError::PolicyError {
        path: path.to_path_buf(),
        source,
    })
}
