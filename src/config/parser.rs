//! Config line parser
//!
//! Every configuration source speaks the same `key=value` line grammar:
//!
//! ```text
//!   # comment            ignored
//!   quality = 30         key "quality", value "30"
//!   vflip                bare key, value "on"
//!   annotation=a=b       split on the first '=' only
//! ```
//!
//! Lines are routed through [`ConfigTarget`], which owns the store and knows
//! how to apply an option's effect.

use super::error::ConfigError;
use super::option::{self, ConfigOption};
use super::store::{ConfigStore, OriginContext};
use crate::error::{Error, Result};

/// One `key=value` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigLine<'a> {
    pub key: &'a str,
    pub value: &'a str,
}

impl<'a> ConfigLine<'a> {
    /// Parse a line, returning `None` for blank lines and comments
    pub fn parse(line: &'a str) -> Option<Self> {
        let line = match line.find('#') {
            Some(pos) => &line[..pos],
            None => line,
        };
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let (key, value) = match line.split_once('=') {
            Some((key, value)) => (key.trim(), value.trim()),
            None => (line, "on"),
        };
        Some(ConfigLine { key, value })
    }
}

/// Something configuration lines can be applied to
pub trait ConfigTarget {
    /// Store receiving the values
    fn store_mut(&mut self) -> &mut ConfigStore;

    /// Run the effect of an option whose value was just stored
    fn apply(&mut self, option: &'static ConfigOption, ctx: OriginContext) -> Result<()>;
}

/// Staging only; nothing to apply before the pipeline exists
impl ConfigTarget for ConfigStore {
    fn store_mut(&mut self) -> &mut ConfigStore {
        self
    }

    fn apply(&mut self, _option: &'static ConfigOption, _ctx: OriginContext) -> Result<()> {
        Ok(())
    }
}

/// Store a value for a known option and apply it if the context calls for it
///
/// A client value the capture pipeline refuses is rolled back: the previous
/// value is restored and applied again.
pub fn set_option<T: ConfigTarget + ?Sized>(
    target: &mut T,
    option: &'static ConfigOption,
    value: &str,
    ctx: OriginContext,
) -> Result<()> {
    let previous = target.store_mut().get(option.name).map(str::to_string);
    let outcome = target.store_mut().set(option, value, ctx)?;
    if !outcome.is_stored() || !ctx.applies_immediately() {
        return Ok(());
    }

    match target.apply(option, ctx) {
        Err(Error::Capture(e)) if !ctx.failures_are_fatal() => {
            tracing::warn!(
                option = option.name,
                value = value,
                error = %e,
                "Capture rejected value from client, keeping previous"
            );
            target.store_mut().restore(option.name, previous);
            target.apply(option, ctx)
        }
        result => result,
    }
}

/// Parse and apply one line
pub fn parse_line<T: ConfigTarget + ?Sized>(
    target: &mut T,
    line: &str,
    ctx: OriginContext,
) -> Result<()> {
    let Some(entry) = ConfigLine::parse(line) else {
        return Ok(());
    };

    let Some(option) = option::find(entry.key) else {
        if ctx == OriginContext::ConfigFile {
            return Err(ConfigError::UnknownOption(entry.key.to_string()).into());
        }
        tracing::debug!(key = entry.key, "Ignoring unknown option");
        return Ok(());
    };

    set_option(target, option, entry.value, ctx)
}

/// Parse and apply newline-separated lines
pub fn parse_lines<T: ConfigTarget + ?Sized>(
    target: &mut T,
    text: &str,
    ctx: OriginContext,
) -> Result<()> {
    for line in text.lines() {
        parse_line(target, line, ctx)?;
    }
    Ok(())
}
