//! Option table
//!
//! Every setting the program understands is one row in [`OPTIONS`]. The same
//! table drives the command line, the config file, the environment and live
//! client requests. Each row carries a [`ValueKind`] (how a value is
//! validated) and an [`Effect`] (what applying it does).

use std::fmt::Write as _;

use crate::capture::property::{
    parse_colour_effect, AwbMode, CameraSetting, ExposureMode, ImageEffect, MeteringMode, Region,
};
use crate::output::FramingMode;

/// Prefix for environment overrides (`FRAMECAST_QUALITY=30`)
pub const ENV_PREFIX: &str = "FRAMECAST_";

/// How an option's value is validated
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueKind {
    /// Whole number within an inclusive range
    Integer { min: i64, max: i64 },
    /// Decimal number within an inclusive range
    Decimal { min: f64, max: f64 },
    /// `on` or `off`
    Flag,
    /// One of a fixed set of names
    Choice(&'static [&'static str]),
    /// Free text
    Text,
    /// `U:V` chroma pair, or empty for off
    ColourEffect,
    /// `x:y:w:h` normalised rectangle
    Region,
    /// `key=value` line forwarded to a running server
    Send,
    /// Triggers an action; the value is ignored
    Action,
}

impl ValueKind {
    /// Check a raw value, returning the reason it is unacceptable
    pub fn validate(&self, value: &str) -> Result<(), String> {
        match *self {
            ValueKind::Integer { min, max } => {
                let n: i64 = value
                    .trim()
                    .parse()
                    .map_err(|_| "expected a whole number".to_string())?;
                if n < min || n > max {
                    return Err(format!("must be between {min} and {max}"));
                }
                Ok(())
            }
            ValueKind::Decimal { min, max } => {
                let n: f64 = value
                    .trim()
                    .parse()
                    .map_err(|_| "expected a number".to_string())?;
                if !(min..=max).contains(&n) {
                    return Err(format!("must be between {min} and {max}"));
                }
                Ok(())
            }
            ValueKind::Flag => match value {
                "on" | "off" => Ok(()),
                _ => Err("expected 'on' or 'off'".to_string()),
            },
            ValueKind::Choice(names) => {
                if names.contains(&value) {
                    Ok(())
                } else {
                    Err(format!("expected one of: {}", names.join(", ")))
                }
            }
            ValueKind::ColourEffect => parse_colour_effect(value)
                .map(|_| ())
                .map_err(str::to_string),
            ValueKind::Region => Region::parse(value)
                .map(|_| ())
                .ok_or_else(|| "expected x:y:w:h with each in 0.0-1.0".to_string()),
            ValueKind::Text | ValueKind::Send | ValueKind::Action => Ok(()),
        }
    }
}

/// What applying an option does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Read when needed, nothing to apply
    None,
    /// Push a property to the running capture pipeline
    Camera(CameraSetting),
    /// Geometry or rate change; the pipeline must be restarted
    Restart,
    /// Switch the output framing for the next frame
    Framing,
    /// Change the channel id byte of length-prefixed output
    Channel,
    /// Reset the remaining frame count
    Count,
    /// End the session
    Quit,
    /// Print usage (startup only)
    Help,
}

/// One configurable setting
#[derive(Debug)]
pub struct ConfigOption {
    /// Long name (`--quality`, `quality=30`)
    pub name: &'static str,
    /// Short alias (`-q`)
    pub short: Option<&'static str>,
    /// One-line description
    pub help: &'static str,
    /// Value used when nothing else set one
    pub default: Option<&'static str>,
    /// Validation rule
    pub kind: ValueKind,
    /// Applier
    pub effect: Effect,
    /// Whether `FRAMECAST_<NAME>` may set it
    pub env: bool,
}

impl ConfigOption {
    /// Environment variable that can override this option
    pub fn env_key(&self) -> Option<String> {
        self.env
            .then(|| format!("{ENV_PREFIX}{}", self.name.to_ascii_uppercase()))
    }

    /// Whether a value is recorded in the store
    pub fn is_stored(&self) -> bool {
        !matches!(self.kind, ValueKind::Send | ValueKind::Action)
    }
}

const fn opt(
    name: &'static str,
    short: Option<&'static str>,
    help: &'static str,
    default: Option<&'static str>,
    kind: ValueKind,
    effect: Effect,
) -> ConfigOption {
    ConfigOption {
        name,
        short,
        help,
        default,
        kind,
        effect,
        env: true,
    }
}

const fn local(
    name: &'static str,
    short: Option<&'static str>,
    help: &'static str,
    kind: ValueKind,
    effect: Effect,
) -> ConfigOption {
    ConfigOption {
        name,
        short,
        help,
        default: None,
        kind,
        effect,
        env: false,
    }
}

const fn int(min: i64, max: i64) -> ValueKind {
    ValueKind::Integer { min, max }
}

/// All options, in help order
pub static OPTIONS: &[ConfigOption] = &[
    opt("width", Some("w"), "Set image width <size>", Some("320"), int(0, 8192), Effect::Restart),
    opt("height", Some("h"), "Set image height <size> (0 = calculate from width)", Some("0"), int(0, 8192), Effect::Restart),
    opt("annotation", Some("a"), "Annotate the video frames with this text", Some(""), ValueKind::Text, Effect::Camera(CameraSetting::Annotation)),
    opt("anno_background", Some("ab"), "Turn on a black background behind the annotation", Some("off"), ValueKind::Flag, Effect::Camera(CameraSetting::AnnotationBackground)),
    opt("sharpness", Some("sh"), "Set image sharpness (-100 to 100)", Some("0"), int(-100, 100), Effect::Camera(CameraSetting::Sharpness)),
    opt("contrast", Some("co"), "Set image contrast (-100 to 100)", Some("0"), int(-100, 100), Effect::Camera(CameraSetting::Contrast)),
    opt("brightness", Some("br"), "Set image brightness (0 to 100)", Some("50"), int(0, 100), Effect::Camera(CameraSetting::Brightness)),
    opt("saturation", Some("sa"), "Set image saturation (-100 to 100)", Some("0"), int(-100, 100), Effect::Camera(CameraSetting::Saturation)),
    opt("ISO", Some("ISO"), "Set capture ISO (100 to 800, 0 = auto)", Some("0"), int(0, 800), Effect::Camera(CameraSetting::Iso)),
    opt("vstab", Some("vs"), "Turn on video stabilisation", Some("off"), ValueKind::Flag, Effect::Camera(CameraSetting::VideoStabilisation)),
    opt("ev", Some("ev"), "Set EV compensation (-10 to 10)", Some("0"), int(-10, 10), Effect::Camera(CameraSetting::ExposureCompensation)),
    opt("exposure", Some("ex"), "Set exposure mode", Some("auto"), ValueKind::Choice(ExposureMode::NAMES), Effect::Camera(CameraSetting::ExposureMode)),
    opt("fps", None, "Limit the frame rate (0 = auto)", Some("0"), ValueKind::Decimal { min: 0.0, max: 120.0 }, Effect::Restart),
    opt("awb", Some("awb"), "Set Automatic White Balance (AWB) mode", Some("auto"), ValueKind::Choice(AwbMode::NAMES), Effect::Camera(CameraSetting::AwbMode)),
    opt("imxfx", Some("ifx"), "Set image effect", Some("none"), ValueKind::Choice(ImageEffect::NAMES), Effect::Camera(CameraSetting::ImageEffect)),
    opt("colfx", Some("cfx"), "Set colour effect <U:V>", Some(""), ValueKind::ColourEffect, Effect::Camera(CameraSetting::ColourEffect)),
    opt("mode", Some("md"), "Set sensor mode (0 to 7)", Some("0"), int(0, 7), Effect::Restart),
    opt("metering", Some("mm"), "Set metering mode", Some("average"), ValueKind::Choice(MeteringMode::NAMES), Effect::Camera(CameraSetting::Metering)),
    opt("rotation", Some("rot"), "Set image rotation (0-359)", Some("0"), int(0, 359), Effect::Camera(CameraSetting::Rotation)),
    opt("hflip", Some("hf"), "Set horizontal flip", Some("off"), ValueKind::Flag, Effect::Camera(CameraSetting::Mirror)),
    opt("vflip", Some("vf"), "Set vertical flip", Some("off"), ValueKind::Flag, Effect::Camera(CameraSetting::Mirror)),
    opt("roi", Some("roi"), "Set region of interest (x:y:w:h as normalised coordinates [0.0-1.0])", Some("0:0:1:1"), ValueKind::Region, Effect::Camera(CameraSetting::RegionOfInterest)),
    opt("shutter", Some("ss"), "Set shutter speed in microseconds (0 = auto)", Some("0"), int(0, u32::MAX as i64), Effect::Camera(CameraSetting::ShutterSpeed)),
    opt("quality", Some("q"), "Set the JPEG quality (0-100)", Some("15"), int(0, 100), Effect::Camera(CameraSetting::Quality)),
    opt("restart_interval", Some("rs"), "Set the JPEG restart interval (default of 0 for none)", Some("0"), int(0, 65535), Effect::Camera(CameraSetting::RestartInterval)),
    opt("channel", None, "Channel id byte after the length in header framing (-1 = none)", Some("-1"), int(-1, 255), Effect::Channel),
    opt("socket", None, "Specify the socket filename for communication", Some("/tmp/framecast_socket"), ValueKind::Text, Effect::None),
    opt("output", Some("o"), "Specify an output filename or '-' for stdout", Some(""), ValueKind::Text, Effect::None),
    opt("count", None, "How many frames to capture before quitting (-1 = no limit)", Some("-1"), int(-1, i64::MAX), Effect::Count),
    opt("verbose", Some("v"), "Log debug diagnostics", Some("off"), ValueKind::Flag, Effect::None),
    local("config", Some("c"), "Specify a config file to read for options", ValueKind::Text, Effect::None),
    ConfigOption {
        name: "framing",
        short: Some("fr"),
        help: "Specify the output framing (cat, mime, http, header, replace)",
        default: Some("cat"),
        kind: ValueKind::Choice(FramingMode::NAMES),
        effect: Effect::Framing,
        env: false,
    },
    local("send", None, "Send this parameter to the server (e.g. --send shutter=1000)", ValueKind::Send, Effect::None),
    local("server", None, "Run as a server", ValueKind::Flag, Effect::None),
    local("client", None, "Run as a client", ValueKind::Flag, Effect::None),
    local("quit", None, "Tell a server to quit", ValueKind::Action, Effect::Quit),
    local("help", None, "Print this help message", ValueKind::Action, Effect::Help),
];

/// Look up an option by its long name
pub fn find(name: &str) -> Option<&'static ConfigOption> {
    OPTIONS.iter().find(|o| o.name == name)
}

/// Look up an option by its short alias
pub fn find_short(alias: &str) -> Option<&'static ConfigOption> {
    OPTIONS.iter().find(|o| o.short == Some(alias))
}

/// Valid enumerations, appended to the usage text
pub fn enumerations() -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Exposure (--exposure) options: {}", ExposureMode::NAMES.join(", "));
    let _ = writeln!(out, "White balance (--awb) options: {}", AwbMode::NAMES.join(", "));
    let _ = writeln!(out, "Image effect (--imxfx) options: {}", ImageEffect::NAMES.join(", "));
    let _ = writeln!(out, "Metering (--metering) options: {}", MeteringMode::NAMES.join(", "));
    let _ = writeln!(out, "Framing (--framing) options: {}", FramingMode::NAMES.join(", "));
    out.push_str(
        "Sensor mode (--mode) options:\n\
         \x20      0   automatic selection\n\
         \x20      1   1920x1080 (16:9) 1-30 fps\n\
         \x20      2   2592x1944 (4:3)  1-15 fps\n\
         \x20      3   2592x1944 (4:3)  0.1666-1 fps\n\
         \x20      4   1296x972  (4:3)  1-42 fps, 2x2 binning\n\
         \x20      5   1296x730  (16:9) 1-49 fps, 2x2 binning\n\
         \x20      6   640x480   (4:3)  42.1-60 fps, 2x2 binning plus skip\n\
         \x20      7   640x480   (4:3)  60.1-90 fps, 2x2 binning plus skip\n",
    );
    out
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_names_and_aliases_are_unique() {
        let mut names = HashSet::new();
        let mut shorts = HashSet::new();

        for option in OPTIONS {
            assert!(names.insert(option.name), "duplicate {}", option.name);
            if let Some(short) = option.short {
                assert!(shorts.insert(short), "duplicate alias {short}");
            }
        }
    }

    #[test]
    fn test_defaults_validate() {
        for option in OPTIONS {
            if let Some(default) = option.default {
                assert!(
                    option.kind.validate(default).is_ok(),
                    "default for {} is invalid",
                    option.name
                );
            }
        }
    }

    #[test]
    fn test_find() {
        assert_eq!(find("quality").unwrap().short, Some("q"));
        assert_eq!(find_short("q").unwrap().name, "quality");
        assert_eq!(find_short("ISO").unwrap().name, "ISO");
        assert!(find("Quality").is_none());
        assert!(find_short("zz").is_none());
    }

    #[test]
    fn test_integer_validation() {
        let quality = find("quality").unwrap();
        assert!(quality.kind.validate("0").is_ok());
        assert!(quality.kind.validate("100").is_ok());
        assert!(quality.kind.validate("150").is_err());
        assert!(quality.kind.validate("-1").is_err());
        assert!(quality.kind.validate("high").is_err());
    }

    #[test]
    fn test_choice_validation() {
        let awb = find("awb").unwrap();
        assert!(awb.kind.validate("cloudy").is_ok());
        assert!(awb.kind.validate("Cloudy").is_err());

        let framing = find("framing").unwrap();
        assert!(framing.kind.validate("mime").is_ok());
        assert!(framing.kind.validate("flv").is_err());
    }

    #[test]
    fn test_flag_and_decimal_validation() {
        assert!(ValueKind::Flag.validate("on").is_ok());
        assert!(ValueKind::Flag.validate("yes").is_err());

        let fps = find("fps").unwrap();
        assert!(fps.kind.validate("29.97").is_ok());
        assert!(fps.kind.validate("-1").is_err());
    }

    #[test]
    fn test_env_keys() {
        assert_eq!(
            find("quality").unwrap().env_key().as_deref(),
            Some("FRAMECAST_QUALITY")
        );
        assert_eq!(find("ISO").unwrap().env_key().as_deref(), Some("FRAMECAST_ISO"));
        assert!(find("framing").unwrap().env_key().is_none());
        assert!(find("send").unwrap().env_key().is_none());
    }

    #[test]
    fn test_enumerations_mention_every_choice() {
        let text = enumerations();
        assert!(text.contains("fireworks"));
        assert!(text.contains("horizon"));
        assert!(text.contains("replace"));
    }
}
