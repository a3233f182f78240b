//! Configuration error types

use std::path::PathBuf;

use thiserror::Error;

/// Error type for configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `--help` was given
    #[error("Help requested")]
    HelpRequested,

    /// Command line could not be parsed
    #[error("{0}")]
    InvalidArguments(String),

    /// Config file could not be read
    #[error("Cannot open '{}': {source}", path.display())]
    FileRead {
        /// Path to the config file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Unknown key in a config file
    #[error("Unknown option '{0}'")]
    UnknownOption(String),

    /// A config file line was rejected
    #[error("{}:{line}: {source}", path.display())]
    InFile {
        /// Config file
        path: PathBuf,
        /// 1-based line number
        line: usize,
        /// What was wrong with the line
        #[source]
        source: Box<ConfigError>,
    },

    /// Unknown key named by `--send`
    #[error("Unexpected key '{0}' used in --send. Check help")]
    UnknownSendKey(String),

    /// Value failed validation
    #[error("Invalid value '{value}' for {option}: {reason}")]
    InvalidValue {
        /// Option name
        option: &'static str,
        /// Rejected value
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// Mutually exclusive options were combined
    #[error("{0}")]
    Conflict(&'static str),
}
