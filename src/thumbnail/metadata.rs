use async_trait::async_trait;
use camino::Utf8PathBuf;
use color_eyre::eyre::WrapErr;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{info, instrument};

use super::process::ensure_exit_ok;

/// Duration value used for broadcasts without a fixed length.
pub const LIVE: &str = "Live";

/// Longest view-count text the metadata line will show.
const MAX_VIEWS_CHARS: usize = 23;

lazy_static! {
    static ref NON_WORD: Regex = Regex::new(r"\W+").unwrap();
    static ref MISSING_VIDEO: Regex = Regex::new(
        r"(?i)video unavailable|incomplete youtube id|is not a valid url|private video|does not exist|has been removed"
    )
    .unwrap();
}

/// What a search/info lookup knows about a video, before defaults are applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoInfo {
    pub title: Option<String>,
    pub channel: Option<String>,
    /// Already shortened, e.g. "1.2M views".
    pub views: Option<String>,
    /// "MM:SS" or "H:MM:SS"; `None` for livestreams.
    pub duration: Option<String>,
    /// Most preferred first.
    pub thumbnails: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoMetadata {
    pub id: String,
    pub title: String,
    pub channel: String,
    pub view_count_display: String,
    pub duration_display: String,
    pub source_thumbnail_url: String,
}

impl VideoMetadata {
    /// Applies display defaults. `None` when the lookup listed no thumbnail.
    pub fn from_info(id: &str, info: VideoInfo) -> Option<Self> {
        let thumbnail = info.thumbnails.into_iter().next()?;
        let source_thumbnail_url = match thumbnail.split_once('?') {
            Some((bare, _)) => bare.to_string(),
            None => thumbnail,
        };
        let title = info
            .title
            .map(|title| tidy_title(&title))
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| "Unsupported Title".to_string());
        let view_count_display = info
            .views
            .map(|views| views.chars().take(MAX_VIEWS_CHARS).collect())
            .unwrap_or_else(|| "Unknown Views".to_string());
        let duration_display = match info.duration {
            Some(duration) if !duration.eq_ignore_ascii_case("live") && !duration.is_empty() => {
                duration
            }
            _ => LIVE.to_string(),
        };

        Some(VideoMetadata {
            id: id.to_string(),
            title,
            channel: info.channel.unwrap_or_else(|| "Unknown Channel".to_string()),
            view_count_display,
            duration_display,
            source_thumbnail_url,
        })
    }

    pub fn is_live(&self) -> bool {
        self.duration_display == LIVE
    }
}

/// Collapses punctuation runs into single spaces and title-cases every word.
pub fn tidy_title(raw: &str) -> String {
    let spaced = NON_WORD.replace_all(raw, " ");
    let mut title = String::with_capacity(spaced.len());
    let mut after_letter = false;
    for c in spaced.trim().chars() {
        if c.is_alphabetic() {
            if after_letter {
                title.extend(c.to_lowercase());
            } else {
                title.extend(c.to_uppercase());
            }
            after_letter = true;
        } else {
            title.push(c);
            after_letter = false;
        }
    }
    title
}

/// "1234567" → "1.2M views"
pub fn short_views(count: u64) -> String {
    const UNITS: [(u64, &str); 3] = [(1_000_000_000, "B"), (1_000_000, "M"), (1_000, "K")];
    for (size, unit) in UNITS {
        if count >= size {
            let scaled = format!("{:.1}", count as f64 / size as f64);
            let scaled = scaled.strip_suffix(".0").unwrap_or(&scaled);
            return format!("{scaled}{unit} views");
        }
    }
    format!("{count} views")
}

fn clock(seconds: u64) -> String {
    let (h, m, s) = (seconds / 3600, seconds / 60 % 60, seconds % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}

/// Video search/info capability.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// `Ok(None)` when nothing matches the id.
    async fn lookup(&self, video_id: &str) -> color_eyre::Result<Option<VideoInfo>>;
}

/// Looks videos up by shelling out to `yt-dlp --dump-single-json`.
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: Utf8PathBuf,
}

impl YtDlp {
    pub fn new(program: impl Into<Utf8PathBuf>) -> Self {
        YtDlp {
            program: program.into(),
        }
    }
}

impl Default for YtDlp {
    fn default() -> Self {
        YtDlp::new("yt-dlp")
    }
}

/// Whether yt-dlp's stderr says the video itself is gone, as opposed to the
/// lookup breaking.
fn is_missing(stderr: &str) -> bool {
    MISSING_VIDEO.is_match(stderr)
}

#[async_trait]
impl MetadataSource for YtDlp {
    #[instrument(skip(self))]
    async fn lookup(&self, video_id: &str) -> color_eyre::Result<Option<VideoInfo>> {
        let url = format!("https://www.youtube.com/watch?v={video_id}");
        let output = Command::new(self.program.as_str())
            .args([
                "--dump-single-json",
                "--skip-download",
                "--no-playlist",
                "--no-warnings",
            ])
            .arg(&url)
            .kill_on_drop(true)
            .output()
            .await
            .wrap_err_with(|| format!("failed to spawn {}", self.program))?;

        if !output.status.success() && is_missing(&String::from_utf8_lossy(&output.stderr)) {
            info!("no such video");
            return Ok(None);
        }
        ensure_exit_ok(self.program.as_str(), &output).wrap_err("video lookup failed")?;
        parse_dump(&output.stdout).map(Some)
    }
}

#[derive(Debug, Deserialize)]
struct RawVideo {
    title: Option<String>,
    channel: Option<String>,
    uploader: Option<String>,
    view_count: Option<u64>,
    duration: Option<f64>,
    duration_string: Option<String>,
    #[serde(default)]
    is_live: bool,
    thumbnail: Option<String>,
    #[serde(default)]
    thumbnails: Vec<RawThumbnail>,
}

#[derive(Debug, Deserialize)]
struct RawThumbnail {
    url: String,
}

fn parse_dump(json: &[u8]) -> color_eyre::Result<VideoInfo> {
    let raw: RawVideo = serde_json::from_slice(json).wrap_err("yt-dlp printed invalid JSON")?;

    let duration = if raw.is_live {
        None
    } else {
        raw.duration_string
            .or_else(|| raw.duration.map(|seconds| clock(seconds.round() as u64)))
    };
    // yt-dlp lists thumbnails worst first; its own pick goes in front.
    let mut thumbnails: Vec<String> = raw.thumbnail.into_iter().collect();
    for thumb in raw.thumbnails.into_iter().rev() {
        if !thumbnails.contains(&thumb.url) {
            thumbnails.push(thumb.url);
        }
    }

    Ok(VideoInfo {
        title: raw.title,
        channel: raw.channel.or(raw.uploader),
        views: raw.view_count.map(short_views),
        duration,
        thumbnails,
    })
}
