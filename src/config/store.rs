//! Configuration store
//!
//! Holds the current string value of every option. All four configuration
//! sources write through [`ConfigStore::set`], which applies the policy of
//! the [`OriginContext`] the value arrived with.

use std::collections::HashMap;

use super::error::ConfigError;
use super::option::{self, ConfigOption, Effect, ValueKind, OPTIONS};
use crate::capture::property::{
    parse_colour_effect, AwbMode, CameraProperty, CameraSetting, ExposureMode, ImageEffect,
    MeteringMode, Mirror, Region,
};
use crate::capture::CaptureSettings;
use crate::output::FramingMode;

/// Where a configuration value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginContext {
    /// Process arguments (and their environment overrides)
    CommandLine,
    /// The `--config` file
    ConfigFile,
    /// A datagram or control-stream line at runtime
    ClientRequest,
    /// The batch apply after the capture pipeline starts
    ProcessStart,
}

impl OriginContext {
    /// Whether a value overwrites one that is already set
    pub fn replaces_existing(self) -> bool {
        !matches!(self, OriginContext::ConfigFile)
    }

    /// Whether the option's effect runs as soon as the value is stored
    pub fn applies_immediately(self) -> bool {
        matches!(
            self,
            OriginContext::ClientRequest | OriginContext::ProcessStart
        )
    }

    /// Whether an invalid value ends the process
    pub fn failures_are_fatal(self) -> bool {
        !matches!(self, OriginContext::ClientRequest)
    }
}

/// Result of a [`ConfigStore::set`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    /// The value was accepted
    Stored,
    /// An earlier value took precedence
    Unchanged,
    /// The value was invalid and has been dropped
    Rejected,
    /// The option has no meaning in this context
    Ignored,
}

impl SetOutcome {
    /// Whether the option's effect should run
    pub fn is_stored(self) -> bool {
        self == SetOutcome::Stored
    }
}

/// Current option values
#[derive(Debug, Default)]
pub struct ConfigStore {
    values: HashMap<&'static str, String>,
    send_list: Vec<String>,
    quit_requested: bool,
}

impl ConfigStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with every default filled in
    pub fn with_defaults() -> Self {
        let mut store = Self::new();
        store.fill_defaults();
        store
    }

    /// Validate and record a value under the policy of `ctx`
    pub fn set(
        &mut self,
        option: &'static ConfigOption,
        value: &str,
        ctx: OriginContext,
    ) -> Result<SetOutcome, ConfigError> {
        match option.kind {
            ValueKind::Send => return self.push_send(value, ctx),
            ValueKind::Action => {
                if option.effect == Effect::Quit {
                    self.quit_requested = true;
                }
                return Ok(SetOutcome::Stored);
            }
            _ => {}
        }

        if let Err(reason) = option.kind.validate(value) {
            if ctx.failures_are_fatal() {
                return Err(ConfigError::InvalidValue {
                    option: option.name,
                    value: value.to_string(),
                    reason,
                });
            }
            tracing::warn!(
                option = option.name,
                value = value,
                reason = %reason,
                "Ignoring invalid value from client"
            );
            return Ok(SetOutcome::Rejected);
        }

        if !ctx.replaces_existing() && self.values.contains_key(option.name) {
            return Ok(SetOutcome::Unchanged);
        }

        self.values.insert(option.name, value.to_string());
        Ok(SetOutcome::Stored)
    }

    fn push_send(&mut self, value: &str, ctx: OriginContext) -> Result<SetOutcome, ConfigError> {
        if ctx == OriginContext::ClientRequest {
            tracing::debug!(value = value, "Ignoring send from client");
            return Ok(SetOutcome::Ignored);
        }

        let line = value.trim();
        let key = line.split_once('=').map_or(line, |(key, _)| key).trim();
        if option::find(key).is_none() {
            return Err(ConfigError::UnknownSendKey(key.to_string()));
        }

        self.send_list.push(line.to_string());
        Ok(SetOutcome::Stored)
    }

    /// Put back a value captured before a [`ConfigStore::set`]
    pub(crate) fn restore(&mut self, name: &'static str, value: Option<String>) {
        match value {
            Some(value) => self.values.insert(name, value),
            None => self.values.remove(name),
        };
    }

    /// Give every unset option its default value
    pub fn fill_defaults(&mut self) {
        for option in OPTIONS {
            if let Some(default) = option.default {
                self.values
                    .entry(option.name)
                    .or_insert_with(|| default.to_string());
            }
        }
    }

    /// Raw value of an option
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Whether an option has a value
    pub fn is_set(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Integer value (0 when unset)
    pub fn int(&self, name: &str) -> i64 {
        self.get(name)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or_default()
    }

    /// Decimal value (0.0 when unset)
    pub fn decimal(&self, name: &str) -> f64 {
        self.get(name)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or_default()
    }

    /// Flag value (`on` is true)
    pub fn flag(&self, name: &str) -> bool {
        self.get(name) == Some("on")
    }

    /// Text value (empty when unset)
    pub fn text(&self, name: &str) -> &str {
        self.get(name).unwrap_or("")
    }

    /// Current output framing
    pub fn framing(&self) -> FramingMode {
        self.text("framing").parse().unwrap_or_default()
    }

    /// Channel id byte for length-prefixed output
    pub fn channel(&self) -> Option<u8> {
        u8::try_from(self.int("channel")).ok()
    }

    /// Lines queued by `--send`
    pub fn send_list(&self) -> &[String] {
        &self.send_list
    }

    /// Whether `quit` was given
    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    /// Pipeline parameters that need a restart to change
    pub fn capture_settings(&self) -> CaptureSettings {
        CaptureSettings {
            width: self.u32("width"),
            height: self.u32("height"),
            fps: self.decimal("fps"),
            quality: self.u32("quality"),
            restart_interval: self.u32("restart_interval"),
            sensor_mode: self.u32("mode"),
            annotation: self.text("annotation").to_string(),
        }
    }

    /// Typed camera property for a setting, from the current values
    pub fn property(&self, setting: CameraSetting) -> Option<CameraProperty> {
        let property = match setting {
            CameraSetting::Annotation => {
                CameraProperty::Annotation(self.text("annotation").to_string())
            }
            CameraSetting::AnnotationBackground => {
                CameraProperty::AnnotationBackground(self.flag("anno_background"))
            }
            CameraSetting::Sharpness => CameraProperty::Sharpness(self.i32("sharpness")),
            CameraSetting::Contrast => CameraProperty::Contrast(self.i32("contrast")),
            CameraSetting::Brightness => CameraProperty::Brightness(self.i32("brightness")),
            CameraSetting::Saturation => CameraProperty::Saturation(self.i32("saturation")),
            CameraSetting::Iso => CameraProperty::Iso(self.u32("ISO")),
            CameraSetting::VideoStabilisation => {
                CameraProperty::VideoStabilisation(self.flag("vstab"))
            }
            CameraSetting::ExposureCompensation => {
                CameraProperty::ExposureCompensation(self.i32("ev"))
            }
            CameraSetting::ExposureMode => {
                CameraProperty::ExposureMode(ExposureMode::from_name(self.text("exposure"))?)
            }
            CameraSetting::AwbMode => CameraProperty::AwbMode(AwbMode::from_name(self.text("awb"))?),
            CameraSetting::ImageEffect => {
                CameraProperty::ImageEffect(ImageEffect::from_name(self.text("imxfx"))?)
            }
            CameraSetting::ColourEffect => {
                CameraProperty::ColourEffect(parse_colour_effect(self.text("colfx")).ok()?)
            }
            CameraSetting::Metering => {
                CameraProperty::Metering(MeteringMode::from_name(self.text("metering"))?)
            }
            CameraSetting::Rotation => CameraProperty::Rotation(self.i32("rotation")),
            CameraSetting::Mirror => {
                CameraProperty::Mirror(Mirror::from_flips(self.flag("hflip"), self.flag("vflip")))
            }
            CameraSetting::RegionOfInterest => {
                CameraProperty::RegionOfInterest(Region::parse(self.text("roi"))?)
            }
            CameraSetting::ShutterSpeed => CameraProperty::ShutterSpeed(self.u32("shutter")),
            CameraSetting::Quality => CameraProperty::Quality(self.u32("quality")),
            CameraSetting::RestartInterval => {
                CameraProperty::RestartInterval(self.u32("restart_interval"))
            }
        };
        Some(property)
    }

    fn i32(&self, name: &str) -> i32 {
        i32::try_from(self.int(name)).unwrap_or_default()
    }

    fn u32(&self, name: &str) -> u32 {
        u32::try_from(self.int(name)).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opt(name: &str) -> &'static ConfigOption {
        option::find(name).unwrap()
    }

    #[test]
    fn test_context_policy() {
        assert!(OriginContext::CommandLine.replaces_existing());
        assert!(!OriginContext::ConfigFile.replaces_existing());
        assert!(OriginContext::ClientRequest.replaces_existing());

        assert!(!OriginContext::CommandLine.applies_immediately());
        assert!(!OriginContext::ConfigFile.applies_immediately());
        assert!(OriginContext::ClientRequest.applies_immediately());
        assert!(OriginContext::ProcessStart.applies_immediately());

        assert!(!OriginContext::ClientRequest.failures_are_fatal());
        assert!(OriginContext::ProcessStart.failures_are_fatal());
    }

    #[test]
    fn test_command_line_beats_config_file() {
        let mut store = ConfigStore::new();

        store.set(opt("quality"), "30", OriginContext::CommandLine).unwrap();
        let outcome = store.set(opt("quality"), "20", OriginContext::ConfigFile).unwrap();

        assert_eq!(outcome, SetOutcome::Unchanged);
        assert_eq!(store.get("quality"), Some("30"));
    }

    #[test]
    fn test_config_file_fills_unset() {
        let mut store = ConfigStore::new();

        store.set(opt("quality"), "20", OriginContext::ConfigFile).unwrap();
        store.fill_defaults();

        assert_eq!(store.int("quality"), 20);
        assert_eq!(store.int("width"), 320);
    }

    #[test]
    fn test_client_request_overrides() {
        let mut store = ConfigStore::with_defaults();

        let outcome = store.set(opt("quality"), "40", OriginContext::ClientRequest).unwrap();

        assert!(outcome.is_stored());
        assert_eq!(store.int("quality"), 40);
    }

    #[test]
    fn test_invalid_client_value_keeps_prior() {
        let mut store = ConfigStore::with_defaults();

        let outcome = store.set(opt("quality"), "150", OriginContext::ClientRequest).unwrap();

        assert_eq!(outcome, SetOutcome::Rejected);
        assert_eq!(store.int("quality"), 15);
    }

    #[test]
    fn test_invalid_startup_value_is_fatal() {
        let mut store = ConfigStore::new();

        let err = store
            .set(opt("quality"), "150", OriginContext::CommandLine)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { option: "quality", .. }));

        assert!(store.set(opt("awb"), "purple", OriginContext::ConfigFile).is_err());
    }

    #[test]
    fn test_send_list() {
        let mut store = ConfigStore::new();

        store.set(opt("send"), "quality=40", OriginContext::CommandLine).unwrap();
        store.set(opt("send"), "quit", OriginContext::CommandLine).unwrap();
        assert_eq!(store.send_list(), ["quality=40", "quit"]);

        let err = store
            .set(opt("send"), "bogus=1", OriginContext::CommandLine)
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownSendKey(key) if key == "bogus"));

        let outcome = store.set(opt("send"), "quality=1", OriginContext::ClientRequest).unwrap();
        assert_eq!(outcome, SetOutcome::Ignored);
        assert_eq!(store.send_list().len(), 2);
    }

    #[test]
    fn test_quit_is_recorded() {
        let mut store = ConfigStore::new();
        assert!(!store.quit_requested());

        store.set(opt("quit"), "on", OriginContext::CommandLine).unwrap();

        assert!(store.quit_requested());
        assert!(store.get("quit").is_none());
    }

    #[test]
    fn test_typed_getters() {
        let mut store = ConfigStore::with_defaults();

        assert_eq!(store.framing(), FramingMode::Concatenate);
        assert_eq!(store.channel(), None);
        assert_eq!(store.int("count"), -1);
        assert!(!store.flag("vstab"));

        store.set(opt("framing"), "header", OriginContext::CommandLine).unwrap();
        store.set(opt("channel"), "3", OriginContext::CommandLine).unwrap();
        store.set(opt("vstab"), "on", OriginContext::CommandLine).unwrap();

        assert_eq!(store.framing(), FramingMode::LengthPrefixed);
        assert_eq!(store.channel(), Some(3));
        assert!(store.flag("vstab"));
    }

    #[test]
    fn test_property_resolution() {
        let mut store = ConfigStore::with_defaults();
        store.set(opt("hflip"), "on", OriginContext::CommandLine).unwrap();
        store.set(opt("awb"), "cloudy", OriginContext::CommandLine).unwrap();

        assert_eq!(
            store.property(CameraSetting::Mirror),
            Some(CameraProperty::Mirror(Mirror::Horizontal))
        );
        assert_eq!(
            store.property(CameraSetting::AwbMode),
            Some(CameraProperty::AwbMode(AwbMode::Cloudy))
        );
        assert_eq!(
            store.property(CameraSetting::Quality),
            Some(CameraProperty::Quality(15))
        );
        assert_eq!(
            store.property(CameraSetting::RegionOfInterest),
            Some(CameraProperty::RegionOfInterest(Region::FULL))
        );
    }

    #[test]
    fn test_capture_settings() {
        let store = ConfigStore::with_defaults();
        let settings = store.capture_settings();

        assert_eq!(settings.width, 320);
        assert_eq!(settings.height, 0);
        assert_eq!(settings.quality, 15);
        assert_eq!(settings.fps, 0.0);
    }
}
