//! Command line parsing
//!
//! The clap command is generated from the option table, so every option is
//! available as `--name value`, `--name=value` and, where it has one,
//! `FRAMECAST_<NAME>` in the environment. Flags given without a value mean
//! `on`.
//!
//! Short aliases are multi-letter with a single dash (`-ISO 400`, `-ab`),
//! which clap cannot express, so they are rewritten to the long form first.

use std::ffi::OsString;

use clap::{Arg, ArgAction, Command};

use super::error::ConfigError;
use super::option::{self, ValueKind, OPTIONS};
use super::parser;
use super::store::{ConfigStore, OriginContext};
use crate::error::Result;

/// Build the clap command from the option table
pub fn command() -> Command {
    let mut cmd = Command::new("framecast")
        .about("Reassemble encoded camera frames and distribute them to local clients")
        .disable_help_flag(true)
        .disable_version_flag(true)
        .after_help(option::enumerations());

    for option in OPTIONS {
        let help = match option.short {
            Some(short) => format!("{} [-{short}]", option.help),
            None => option.help.to_string(),
        };
        let mut arg = Arg::new(option.name).long(option.name).help(help);

        arg = match option.kind {
            ValueKind::Send => arg.num_args(1).action(ArgAction::Append).value_name("KEY=VALUE"),
            ValueKind::Flag | ValueKind::Action => arg
                .num_args(0..=1)
                .default_missing_value("on")
                .value_name("on|off"),
            ValueKind::Integer { .. } | ValueKind::Decimal { .. } => {
                arg.num_args(1).allow_negative_numbers(true)
            }
            _ => arg.num_args(1),
        };

        if let Some(key) = option.env_key() {
            arg = arg.env(key);
        }

        cmd = cmd.arg(arg);
    }

    cmd
}

/// Usage text for `--help`
pub fn usage() -> String {
    command().render_help().to_string()
}

/// Rewrite `-alias` to `--name`, keeping an attached `=value`
fn expand_aliases<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    args.into_iter()
        .map(|arg| {
            let arg: OsString = arg.into();
            let Some(text) = arg.to_str() else {
                return arg;
            };
            let Some(rest) = text.strip_prefix('-').filter(|r| !r.starts_with('-')) else {
                return arg;
            };

            let (alias, value) = match rest.split_once('=') {
                Some((alias, value)) => (alias, Some(value)),
                None => (rest, None),
            };
            match (option::find_short(alias), value) {
                (Some(opt), Some(value)) => format!("--{}={value}", opt.name).into(),
                (Some(opt), None) => format!("--{}", opt.name).into(),
                (None, _) => arg,
            }
        })
        .collect()
}

/// Parse process arguments (including the program name) into the store
pub fn parse_args<I, T>(store: &mut ConfigStore, args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let matches = command()
        .try_get_matches_from(expand_aliases(args))
        .map_err(|e| ConfigError::InvalidArguments(e.to_string()))?;

    if matches.contains_id("help") {
        return Err(ConfigError::HelpRequested.into());
    }

    for option in OPTIONS {
        if option.kind == ValueKind::Send {
            let values = matches.get_many::<String>(option.name).into_iter().flatten();
            for value in values {
                parser::set_option(store, option, value, OriginContext::CommandLine)?;
            }
        } else if let Some(value) = matches.get_one::<String>(option.name) {
            parser::set_option(store, option, value, OriginContext::CommandLine)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn parse(args: &[&str]) -> Result<ConfigStore> {
        let mut store = ConfigStore::new();
        let argv = std::iter::once("framecast").chain(args.iter().copied());
        parse_args(&mut store, argv)?;
        Ok(store)
    }

    #[test]
    fn test_long_forms() {
        let store = parse(&["--width", "640", "--quality=30", "--vflip"]).unwrap();

        assert_eq!(store.get("width"), Some("640"));
        assert_eq!(store.get("quality"), Some("30"));
        assert_eq!(store.get("vflip"), Some("on"));
        assert!(!store.is_set("height"));
    }

    #[test]
    fn test_short_aliases() {
        let store = parse(&["-w", "640", "-ISO", "400", "-ab", "-q=25"]).unwrap();

        assert_eq!(store.get("width"), Some("640"));
        assert_eq!(store.get("ISO"), Some("400"));
        assert_eq!(store.get("anno_background"), Some("on"));
        assert_eq!(store.get("quality"), Some("25"));
    }

    #[test]
    fn test_negative_numbers() {
        let store = parse(&["-ev", "-5", "--sharpness", "-20"]).unwrap();

        assert_eq!(store.get("ev"), Some("-5"));
        assert_eq!(store.get("sharpness"), Some("-20"));
    }

    #[test]
    fn test_flag_followed_by_option() {
        let store = parse(&["--hflip", "--vflip", "off"]).unwrap();

        assert_eq!(store.get("hflip"), Some("on"));
        assert_eq!(store.get("vflip"), Some("off"));
    }

    #[test]
    fn test_repeated_send() {
        let store = parse(&["--send", "quality=40", "--send", "vflip"]).unwrap();

        assert_eq!(store.send_list(), ["quality=40", "vflip"]);
    }

    #[test]
    fn test_help_requested() {
        let err = parse(&["--help"]).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::HelpRequested)));
    }

    #[test]
    fn test_invalid_value_is_fatal() {
        let err = parse(&["--quality", "150"]).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_unknown_argument() {
        let err = parse(&["--bogus"]).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::InvalidArguments(_))));
    }

    #[test]
    fn test_env_keys_registered() {
        let cmd = command();
        let quality = cmd
            .get_arguments()
            .find(|a| a.get_id() == "quality")
            .unwrap();
        assert_eq!(quality.get_env().unwrap(), "FRAMECAST_QUALITY");

        let framing = cmd
            .get_arguments()
            .find(|a| a.get_id() == "framing")
            .unwrap();
        assert!(framing.get_env().is_none());
    }

    #[test]
    fn test_usage_lists_enumerations() {
        let text = usage();
        assert!(text.contains("--quality"));
        assert!(text.contains("fireworks"));
    }
}
