//! Runtime configuration
//!
//! Options arrive from four places and end up in one [`ConfigStore`]:
//!
//! ```text
//!   argv / FRAMECAST_*  ──► CommandLine  ─┐
//!   --config file       ──► ConfigFile   ─┼─► ConfigStore::set ──► apply
//!   socket / stdin      ──► ClientRequest ┘        (live contexts only)
//! ```
//!
//! Command line and config file values are staged and applied in one
//! `ProcessStart` batch once the capture pipeline is running.

pub mod args;
pub mod error;
pub mod file;
pub mod option;
pub mod parser;
pub mod store;

pub use args::{parse_args, usage};
pub use error::ConfigError;
pub use file::load_config_file;
pub use option::{ConfigOption, Effect, ValueKind, OPTIONS};
pub use parser::{parse_line, parse_lines, set_option, ConfigLine, ConfigTarget};
pub use store::{ConfigStore, OriginContext, SetOutcome};
