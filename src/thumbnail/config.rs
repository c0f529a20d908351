use std::{env::var, fmt, str::FromStr};

use camino::Utf8PathBuf;
use tracing::warn;

/// Width the layout constants below are expressed against.
pub const REFERENCE_WIDTH: f32 = 1280.0;
pub const REFERENCE_HEIGHT: f32 = 720.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gradient {
    Diagonal,
    Radial,
}

impl Gradient {
    /// Opacity of the synthetic gradient over the blurred source.
    pub fn opacity(self) -> f32 {
        match self {
            Gradient::Diagonal => 0.25,
            Gradient::Radial => 0.35,
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            Gradient::Diagonal => "diagonal",
            Gradient::Radial => "radial",
        }
    }
}

impl FromStr for Gradient {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "diagonal" => Ok(Gradient::Diagonal),
            "radial" => Ok(Gradient::Radial),
            other => Err(format!("unknown gradient {other:?}")),
        }
    }
}

/// Selects one visual variant of the thumbnail. Part of the cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Style {
    pub gradient: Gradient,
    /// Loop a few frames pulsing the progress bar and write a GIF.
    pub animated: bool,
}

impl Style {
    pub const fn still(gradient: Gradient) -> Self {
        Style {
            gradient,
            animated: false,
        }
    }

    pub const fn pulsing(gradient: Gradient) -> Self {
        Style {
            gradient,
            animated: true,
        }
    }

    pub fn extension(&self) -> &'static str {
        if self.animated {
            "gif"
        } else {
            "png"
        }
    }
}

impl Default for Style {
    fn default() -> Self {
        Style::still(Gradient::Diagonal)
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.gradient.slug())?;
        if self.animated {
            f.write_str("_pulse")?;
        }
        Ok(())
    }
}

/// How the circular subject art is cut out of the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectCrop {
    /// Squash the whole image into the disk.
    Full,
    /// Take the largest centered square.
    CenterSquare,
}

impl FromStr for SubjectCrop {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(SubjectCrop::Full),
            "center" | "center-square" => Ok(SubjectCrop::CenterSquare),
            other => Err(format!("unknown crop {other:?}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FontPaths {
    pub title: Utf8PathBuf,
    pub body: Utf8PathBuf,
}

#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    pub subject_crop: SubjectCrop,
    pub fonts: FontPaths,
    /// Optional player-controls strip pasted under the progress bar.
    pub controls_icon: Option<Utf8PathBuf>,
    pub cache_dir: Utf8PathBuf,
    /// Where downloaded source images are parked while decoding.
    pub scratch_dir: Utf8PathBuf,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            width: REFERENCE_WIDTH as u32,
            height: REFERENCE_HEIGHT as u32,
            subject_crop: SubjectCrop::CenterSquare,
            fonts: FontPaths {
                title: "assets/font3.ttf".into(),
                body: "assets/font2.ttf".into(),
            },
            controls_icon: Some("assets/play_icons.png".into()),
            cache_dir: "cache".into(),
            scratch_dir: "cache/scratch".into(),
        }
    }
}

impl RenderConfig {
    pub fn from_env() -> Self {
        let mut config = RenderConfig::default();
        if let Ok(dir) = var("THUMB_CACHE_DIR") {
            config.scratch_dir = Utf8PathBuf::from(&dir).join("scratch");
            config.cache_dir = dir.into();
        }
        if let Ok(dir) = var("THUMB_SCRATCH_DIR") {
            config.scratch_dir = dir.into();
        }
        config.width = env_number("THUMB_WIDTH", config.width);
        config.height = env_number("THUMB_HEIGHT", config.height);
        if let Ok(path) = var("THUMB_TITLE_FONT") {
            config.fonts.title = path.into();
        }
        if let Ok(path) = var("THUMB_BODY_FONT") {
            config.fonts.body = path.into();
        }
        if let Ok(raw) = var("THUMB_CROP") {
            match raw.parse() {
                Ok(crop) => config.subject_crop = crop,
                Err(err) => warn!(%err, "keeping default crop"),
            }
        }
        if let Ok(path) = var("THUMB_ICONS") {
            config.controls_icon = (!path.is_empty()).then(|| path.into());
        }
        config
    }

    /// Uniform scale of the reference layout onto this canvas.
    pub fn scale(&self) -> f32 {
        (self.width as f32 / REFERENCE_WIDTH).min(self.height as f32 / REFERENCE_HEIGHT)
    }

    pub fn sx(&self, x: f32) -> i32 {
        (x * self.width as f32 / REFERENCE_WIDTH).round() as i32
    }

    pub fn sy(&self, y: f32) -> i32 {
        (y * self.height as f32 / REFERENCE_HEIGHT).round() as i32
    }

    /// Scales a reference length, never below one pixel.
    pub fn px(&self, v: f32) -> u32 {
        (v * self.scale()).round().max(1.0) as u32
    }
}

fn env_number(key: &str, default: u32) -> u32 {
    match var(key) {
        Ok(raw) => match raw.parse::<u32>() {
            Ok(value) if value > 0 => value,
            _ => {
                warn!(key, %raw, default, "ignoring invalid number");
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn style_names() {
        assert_eq!(Style::still(Gradient::Radial).to_string(), "radial");
        assert_eq!(Style::pulsing(Gradient::Diagonal).to_string(), "diagonal_pulse");
        assert_eq!(Style::pulsing(Gradient::Diagonal).extension(), "gif");
        assert_eq!("Radial".parse::<Gradient>(), Ok(Gradient::Radial));
        assert!("spiral".parse::<Gradient>().is_err());
        assert_eq!("full".parse::<SubjectCrop>(), Ok(SubjectCrop::Full));
        assert_eq!("Center".parse::<SubjectCrop>(), Ok(SubjectCrop::CenterSquare));
    }

    #[test]
    fn layout_scales_with_canvas() {
        let config = RenderConfig {
            width: 320,
            height: 180,
            ..RenderConfig::default()
        };
        assert_eq!(config.sx(1280.0), 320);
        assert_eq!(config.sy(720.0), 180);
        assert_eq!(config.px(400.0), 100);
        assert_eq!(config.px(1.0), 1);
    }
}
