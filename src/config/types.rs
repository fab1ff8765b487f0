use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use zeroize::Zeroize;

/// Fully resolved startup settings for one process lifetime
#[derive(Debug, Clone)]
pub struct Settings {
    pub connection: ConnectionProfile,
    pub password: Password,
    /// Directory receiving one archive per database plus the globals archive
    pub output_directory: PathBuf,
    pub compressor: CompressorSelection,
    /// Path to the JSON exclusion policy document
    pub policy_file: PathBuf,
    pub log_directory: Option<PathBuf>,
    pub log_level: String,
}

/// Where and as whom to connect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionProfile {
    pub host: String,
    pub port: u16,
    pub user: String,
    /// Administrative database, only used by the listing query
    pub database: String,
}

/// Database password
///
/// Never rendered by `Debug` or `Display`, and zeroed when dropped.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Access the secret for handing it to a child process environment
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(<redacted>)")
    }
}

impl fmt::Display for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

impl Drop for Password {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// External compressors the dump stream can be piped into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CompressorKind {
    Gzip,
    Xz,
    Lzma,
    #[serde(rename = "7z")]
    #[value(name = "7z")]
    SevenZ,
    #[serde(rename = "7za")]
    #[value(name = "7za")]
    SevenZa,
}

impl CompressorKind {
    /// Executable name looked up on PATH
    pub fn binary_name(&self) -> &'static str {
        match self {
            CompressorKind::Gzip => "gzip",
            CompressorKind::Xz => "xz",
            CompressorKind::Lzma => "lzma",
            CompressorKind::SevenZ => "7z",
            CompressorKind::SevenZa => "7za",
        }
    }

    /// Extension appended after `.tar` / `.sql` on archive names
    pub fn extension(&self) -> &'static str {
        match self {
            CompressorKind::Gzip => "gz",
            CompressorKind::Xz | CompressorKind::Lzma => "xz",
            CompressorKind::SevenZ | CompressorKind::SevenZa => "7z",
        }
    }
}

impl fmt::Display for CompressorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary_name())
    }
}

/// Compression level, always within 1..=9
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CompressionLevel(u8);

impl CompressionLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 9;

    pub fn new(level: i64) -> Option<Self> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&level) {
            Some(Self(level as u8))
        } else {
            None
        }
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        Self(Self::MAX)
    }
}

impl fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressorSelection {
    pub kind: CompressorKind,
    pub level: CompressionLevel,
}

/// Optional TOML settings file, every key may be overridden on the command line
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsFile {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    /// File holding the password; the password itself is never read from here
    #[serde(default)]
    pub password_file: Option<PathBuf>,
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(default)]
    pub compressor: Option<CompressorKind>,
    #[serde(default)]
    pub level: Option<i64>,
    #[serde(default)]
    pub json_file: Option<PathBuf>,
    #[serde(default)]
    pub log_directory: Option<PathBuf>,
    #[serde(default)]
    pub log_level: Option<String>,
}

/// Values given on the command line (or their environment variables)
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub database: Option<String>,
    pub password: Option<Password>,
    pub password_file: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub compressor: Option<CompressorKind>,
    pub level: Option<i64>,
    pub json_file: Option<PathBuf>,
    pub log_directory: Option<PathBuf>,
    pub log_level: Option<String>,
}

// Default value functions

pub fn default_port() -> u16 { 5432 }
pub fn default_user() -> String { "postgres".to_string() }
pub fn default_database() -> String { "postgres".to_string() }
pub fn default_policy_file() -> PathBuf { PathBuf::from("pg_db.json") }
pub fn default_log_level() -> String { "info".to_string() }
