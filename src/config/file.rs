//! Config file loading

use std::path::Path;

use super::error::ConfigError;
use super::parser::{self, ConfigTarget};
use super::store::OriginContext;
use crate::error::{Error, Result};

/// Read a config file and stage its values
///
/// Values already set on the command line win. Unknown keys and invalid
/// values are fatal and report the offending line.
pub fn load_config_file<T: ConfigTarget + ?Sized>(target: &mut T, path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    for (index, line) in content.lines().enumerate() {
        parser::parse_line(target, line, OriginContext::ConfigFile).map_err(|e| match e {
            Error::Config(source) => Error::Config(ConfigError::InFile {
                path: path.to_path_buf(),
                line: index + 1,
                source: Box::new(source),
            }),
            other => other,
        })?;
    }

    tracing::debug!(path = %path.display(), "Config file loaded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;
    use crate::config::option;
    use crate::config::store::ConfigStore;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_config_file() {
        let file = write_config("# camera\nwidth = 640\nvflip\nannotation=front door\n");
        let mut store = ConfigStore::new();

        load_config_file(&mut store, file.path()).unwrap();

        assert_eq!(store.int("width"), 640);
        assert!(store.flag("vflip"));
        assert_eq!(store.text("annotation"), "front door");
    }

    #[test]
    fn test_command_line_wins_over_file() {
        let file = write_config("quality=20\n");
        let mut store = ConfigStore::new();
        store
            .set(option::find("quality").unwrap(), "30", OriginContext::CommandLine)
            .unwrap();

        load_config_file(&mut store, file.path()).unwrap();

        assert_eq!(store.int("quality"), 30);
    }

    #[test]
    fn test_unknown_key_reports_line() {
        let file = write_config("width=640\n\nbogus=1\n");
        let mut store = ConfigStore::new();

        let err = load_config_file(&mut store, file.path()).unwrap_err();

        match err {
            Error::Config(ConfigError::InFile { line, source, .. }) => {
                assert_eq!(line, 3);
                assert!(matches!(*source, ConfigError::UnknownOption(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_value_is_fatal() {
        let file = write_config("rotation=400\n");
        let mut store = ConfigStore::new();

        assert!(load_config_file(&mut store, file.path()).is_err());
    }

    #[test]
    fn test_missing_file() {
        let mut store = ConfigStore::new();
        let err = load_config_file(&mut store, Path::new("/nonexistent/framecast.conf")).unwrap_err();

        assert!(matches!(err, Error::Config(ConfigError::FileRead { .. })));
    }
}
