//! Camera properties
//!
//! The settable surface of the capture pipeline. Option values are validated
//! as strings by the config layer and turned into these typed properties when
//! they are applied.

use std::fmt;

/// Which camera property an option drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraSetting {
    Annotation,
    AnnotationBackground,
    Sharpness,
    Contrast,
    Brightness,
    Saturation,
    Iso,
    VideoStabilisation,
    ExposureCompensation,
    ExposureMode,
    AwbMode,
    ImageEffect,
    ColourEffect,
    Metering,
    Rotation,
    Mirror,
    RegionOfInterest,
    ShutterSpeed,
    Quality,
    RestartInterval,
}

/// A typed property change sent to the capture pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum CameraProperty {
    /// Text overlay (empty = none)
    Annotation(String),
    /// Black background behind the overlay
    AnnotationBackground(bool),
    /// -100 to 100
    Sharpness(i32),
    /// -100 to 100
    Contrast(i32),
    /// 0 to 100
    Brightness(i32),
    /// -100 to 100
    Saturation(i32),
    /// 0 = auto
    Iso(u32),
    VideoStabilisation(bool),
    /// -10 to 10
    ExposureCompensation(i32),
    ExposureMode(ExposureMode),
    AwbMode(AwbMode),
    ImageEffect(ImageEffect),
    /// Fixed chroma (U, V), or None for off
    ColourEffect(Option<(u8, u8)>),
    Metering(MeteringMode),
    /// Degrees, 0 to 359
    Rotation(i32),
    Mirror(Mirror),
    RegionOfInterest(Region),
    /// Microseconds, 0 = auto
    ShutterSpeed(u32),
    /// JPEG quality, 0 to 100
    Quality(u32),
    /// JPEG restart interval, 0 = none
    RestartInterval(u32),
}

/// Exposure mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExposureMode {
    Off,
    Auto,
    Night,
    NightPreview,
    Backlight,
    Spotlight,
    Sports,
    Snow,
    Beach,
    VeryLong,
    FixedFps,
    AntiShake,
    Fireworks,
}

impl ExposureMode {
    /// Accepted spellings
    pub const NAMES: &'static [&'static str] = &[
        "off",
        "auto",
        "night",
        "nightpreview",
        "backlight",
        "spotlight",
        "sports",
        "snow",
        "beach",
        "verylong",
        "fixedfps",
        "antishake",
        "fireworks",
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "off" => Some(ExposureMode::Off),
            "auto" => Some(ExposureMode::Auto),
            "night" => Some(ExposureMode::Night),
            "nightpreview" => Some(ExposureMode::NightPreview),
            "backlight" => Some(ExposureMode::Backlight),
            "spotlight" => Some(ExposureMode::Spotlight),
            "sports" => Some(ExposureMode::Sports),
            "snow" => Some(ExposureMode::Snow),
            "beach" => Some(ExposureMode::Beach),
            "verylong" => Some(ExposureMode::VeryLong),
            "fixedfps" => Some(ExposureMode::FixedFps),
            "antishake" => Some(ExposureMode::AntiShake),
            "fireworks" => Some(ExposureMode::Fireworks),
            _ => None,
        }
    }
}

/// Automatic white balance mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwbMode {
    Off,
    Auto,
    Sunlight,
    Cloudy,
    Shade,
    Tungsten,
    Fluorescent,
    Incandescent,
    Flash,
    Horizon,
}

impl AwbMode {
    /// Accepted spellings
    pub const NAMES: &'static [&'static str] = &[
        "off",
        "auto",
        "sun",
        "cloudy",
        "shade",
        "tungsten",
        "fluorescent",
        "incandescent",
        "flash",
        "horizon",
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "off" => Some(AwbMode::Off),
            "auto" => Some(AwbMode::Auto),
            "sun" => Some(AwbMode::Sunlight),
            "cloudy" => Some(AwbMode::Cloudy),
            "shade" => Some(AwbMode::Shade),
            "tungsten" => Some(AwbMode::Tungsten),
            "fluorescent" => Some(AwbMode::Fluorescent),
            "incandescent" => Some(AwbMode::Incandescent),
            "flash" => Some(AwbMode::Flash),
            "horizon" => Some(AwbMode::Horizon),
            _ => None,
        }
    }
}

/// Image effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageEffect {
    None,
    Negative,
    Solarize,
    Sketch,
    Denoise,
    Emboss,
    OilPaint,
    Hatch,
    Gpen,
    Pastel,
    Watercolour,
    Film,
    Blur,
    Saturation,
    ColourSwap,
    WashedOut,
    Posterise,
    ColourPoint,
    ColourBalance,
    Cartoon,
}

impl ImageEffect {
    /// Accepted spellings (British and American variants)
    pub const NAMES: &'static [&'static str] = &[
        "none",
        "negative",
        "solarise",
        "solarize",
        "sketch",
        "denoise",
        "emboss",
        "oilpaint",
        "hatch",
        "gpen",
        "pastel",
        "watercolour",
        "watercolor",
        "film",
        "blur",
        "saturation",
        "colourswap",
        "colorswap",
        "washedout",
        "posterise",
        "posterize",
        "colourpoint",
        "colorpoint",
        "colourbalance",
        "colorbalance",
        "cartoon",
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "none" => Some(ImageEffect::None),
            "negative" => Some(ImageEffect::Negative),
            "solarise" | "solarize" => Some(ImageEffect::Solarize),
            "sketch" => Some(ImageEffect::Sketch),
            "denoise" => Some(ImageEffect::Denoise),
            "emboss" => Some(ImageEffect::Emboss),
            "oilpaint" => Some(ImageEffect::OilPaint),
            "hatch" => Some(ImageEffect::Hatch),
            "gpen" => Some(ImageEffect::Gpen),
            "pastel" => Some(ImageEffect::Pastel),
            "watercolour" | "watercolor" => Some(ImageEffect::Watercolour),
            "film" => Some(ImageEffect::Film),
            "blur" => Some(ImageEffect::Blur),
            "saturation" => Some(ImageEffect::Saturation),
            "colourswap" | "colorswap" => Some(ImageEffect::ColourSwap),
            "washedout" => Some(ImageEffect::WashedOut),
            "posterise" | "posterize" => Some(ImageEffect::Posterise),
            "colourpoint" | "colorpoint" => Some(ImageEffect::ColourPoint),
            "colourbalance" | "colorbalance" => Some(ImageEffect::ColourBalance),
            "cartoon" => Some(ImageEffect::Cartoon),
            _ => None,
        }
    }
}

/// Exposure metering mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeteringMode {
    Average,
    Spot,
    Backlit,
    Matrix,
}

impl MeteringMode {
    /// Accepted spellings
    pub const NAMES: &'static [&'static str] = &["average", "spot", "backlit", "matrix"];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "average" => Some(MeteringMode::Average),
            "spot" => Some(MeteringMode::Spot),
            "backlit" => Some(MeteringMode::Backlit),
            "matrix" => Some(MeteringMode::Matrix),
            _ => None,
        }
    }
}

/// Image mirroring, derived from the hflip and vflip options together
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirror {
    None,
    Horizontal,
    Vertical,
    Both,
}

impl Mirror {
    pub fn from_flips(hflip: bool, vflip: bool) -> Self {
        match (hflip, vflip) {
            (false, false) => Mirror::None,
            (true, false) => Mirror::Horizontal,
            (false, true) => Mirror::Vertical,
            (true, true) => Mirror::Both,
        }
    }
}

/// Region of interest in normalised coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Region {
    /// The whole sensor
    pub const FULL: Region = Region {
        x: 0.0,
        y: 0.0,
        width: 1.0,
        height: 1.0,
    };

    /// Parse `x:y:w:h` (commas are accepted as separators too)
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Vec<f64> = s
            .split([':', ','])
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .ok()?;

        if parts.len() != 4 || parts.iter().any(|v| !(0.0..=1.0).contains(v)) {
            return None;
        }

        Some(Region {
            x: parts[0],
            y: parts[1],
            width: parts[2],
            height: parts[3],
        })
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}:{}", self.x, self.y, self.width, self.height)
    }
}

/// Parse a colour effect value
///
/// `U:V` with both components in 0-255 enables the effect; an empty string or
/// `off` disables it. Anything else is rejected.
pub fn parse_colour_effect(s: &str) -> Result<Option<(u8, u8)>, &'static str> {
    let s = s.trim();
    if s.is_empty() || s == "off" {
        return Ok(None);
    }

    let (u, v) = s.split_once(':').ok_or("expected U:V")?;
    let u = u.trim().parse::<u8>().map_err(|_| "U must be 0-255")?;
    let v = v.trim().parse::<u8>().map_err(|_| "V must be 0-255")?;
    Ok(Some((u, v)))
}
