//! "Now playing" thumbnails: video metadata and cover art composed into a
//! single image, cached on disk by video id.

mod background;
mod cache;
mod config;
mod error;
mod fetch;
mod metadata;
mod process;
mod status;
mod subject;
mod text;
mod typeface;

use std::{f32::consts::TAU, sync::Arc};

use camino::{Utf8Path, Utf8PathBuf};
use image::{DynamicImage, RgbaImage};
use once_cell::sync::OnceCell;
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{
    debug, dispatcher, error, info, instrument, instrument::WithSubscriber, warn, Dispatch, Span,
};

pub use config::{Gradient, RenderConfig, Style};
pub use error::{Stage, ThumbnailError};
pub use fetch::{HttpFetcher, ImageFetcher};
pub use metadata::{MetadataSource, VideoMetadata, YtDlp};
pub(crate) use typeface::FontSet;

use status::Progress;

/// Frames in an animated thumbnail.
const PULSE_FRAMES: usize = 6;
const PULSE_FLOOR: f32 = 0.55;

/// Brightness of the progress bar in frame `i`: full at the first frame,
/// dimmest halfway through the loop.
fn pulse(i: usize) -> f32 {
    let wave = 0.5 + 0.5 * (TAU * i as f32 / PULSE_FRAMES as f32).cos();
    PULSE_FLOOR + (1.0 - PULSE_FLOOR) * wave
}

fn load_icons(path: &Utf8Path) -> Option<RgbaImage> {
    match image::open(path) {
        Ok(icons) => Some(icons.to_rgba8()),
        Err(err) => {
            warn!(%path, %err, "controls strip unavailable, drawing vector icons");
            None
        }
    }
}

/// Fonts and the controls strip. Read from disk by the first render, so any
/// fallback warnings land in that render's log sink.
struct Assets {
    fonts: FontSet,
    icons: Option<RgbaImage>,
}

impl Assets {
    fn load(config: &RenderConfig) -> Self {
        Assets {
            fonts: FontSet::load(config),
            icons: config.controls_icon.as_deref().and_then(load_icons),
        }
    }
}

/// Everything one compositing run needs, movable onto the blocking pool.
struct Job {
    config: Arc<RenderConfig>,
    assets: Arc<OnceCell<Assets>>,
    meta: VideoMetadata,
    style: Style,
    seed: u64,
}

impl Job {
    fn paint(self, source: &DynamicImage, out: &Utf8Path) -> Result<(), ThumbnailError> {
        let config = &*self.config;
        let assets = self.assets.get_or_init(|| Assets::load(config));
        let fonts = &assets.fonts;
        let mut rng = StdRng::seed_from_u64(self.seed);

        let mut canvas = background::compose(source, config, self.style.gradient, &mut rng);
        let glow = background::random_color(&mut rng);
        subject::draw_subject(&mut canvas, source, config, glow);
        let lines = text::draw_details(&mut canvas, config, fonts, &self.meta, glow);
        let badge = status::draw_badge(&mut canvas, config, fonts, self.meta.is_live());
        status::draw_controls(&mut canvas, config, assets.icons.as_ref());
        debug!(?lines, badge, "overlay composed");

        let mut progress = Progress {
            fraction: rng.gen_range(0.2..0.8),
            accent: glow,
            pulse: 1.0,
        };
        let duration = self.meta.duration_display.as_str();
        if !self.style.animated {
            status::draw_progress(&mut canvas, config, fonts, duration, progress);
            return cache::write_png(out, &canvas);
        }

        let frames = (0..PULSE_FRAMES)
            .map(|i| {
                let mut frame = canvas.clone();
                progress.pulse = pulse(i);
                status::draw_progress(&mut frame, config, fonts, duration, progress);
                frame
            })
            .collect();
        cache::write_gif(out, frames)
    }
}

/// Renders thumbnails with a metadata source and an image fetcher.
pub struct Renderer<M, F> {
    config: Arc<RenderConfig>,
    assets: Arc<OnceCell<Assets>>,
    metadata: M,
    fetcher: F,
    log_sink: Option<Dispatch>,
}

impl<M, F> Renderer<M, F>
where
    M: MetadataSource,
    F: ImageFetcher,
{
    pub fn new(config: RenderConfig, metadata: M, fetcher: F) -> Self {
        Renderer {
            config: Arc::new(config),
            assets: Arc::new(OnceCell::new()),
            metadata,
            fetcher,
            log_sink: None,
        }
    }

    /// Sends this renderer's logs to `sink` instead of the default subscriber.
    pub fn with_log_sink(mut self, sink: impl Into<Dispatch>) -> Self {
        self.log_sink = Some(sink.into());
        self
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Path to the thumbnail for `video_id`, or `None` if it could not be
    /// produced. Failures are logged, never returned.
    pub async fn render(&self, video_id: &str, style: Style) -> Option<Utf8PathBuf> {
        self.render_seeded(video_id, style, rand::random()).await
    }

    /// Like [`Renderer::render`] with a fixed seed for the decorative
    /// randomness (gradient, glow color, bar fill).
    pub async fn render_seeded(&self, video_id: &str, style: Style, seed: u64) -> Option<Utf8PathBuf> {
        let attempt = async {
            match self.try_render(video_id, style, seed).await {
                Ok(path) => Some(path),
                Err(err) => {
                    let stage = err.stage();
                    let report = color_eyre::Report::new(err);
                    error!(video_id, %style, %stage, error = ?report, "no thumbnail produced");
                    None
                }
            }
        };
        match &self.log_sink {
            Some(sink) => attempt.with_subscriber(sink.clone()).await,
            None => attempt.await,
        }
    }

    #[instrument(skip(self))]
    pub async fn try_render(
        &self,
        video_id: &str,
        style: Style,
        seed: u64,
    ) -> Result<Utf8PathBuf, ThumbnailError> {
        let path = cache::cache_path(&self.config.cache_dir, video_id, style);
        if cache::cached(&path).await {
            debug!(%path, "cache hit");
            return Ok(path);
        }

        let info = self
            .metadata
            .lookup(video_id)
            .await
            .map_err(|err| ThumbnailError::fetch(Stage::Metadata, err))?
            .ok_or_else(|| ThumbnailError::NotFound(video_id.to_string()))?;
        let meta = VideoMetadata::from_info(video_id, info)
            .ok_or_else(|| ThumbnailError::fetch(Stage::Download, "lookup listed no thumbnail"))?;
        let scratch = fetch::download_source(
            &self.fetcher,
            &meta.source_thumbnail_url,
            &self.config.scratch_dir,
            video_id,
        )
        .await?;

        let job = Job {
            config: Arc::clone(&self.config),
            assets: Arc::clone(&self.assets),
            meta,
            style,
            seed,
        };
        let out = path.clone();
        // Blocking-pool threads know nothing of this task's subscriber or span.
        let dispatch = dispatcher::get_default(Dispatch::clone);
        let span = Span::current();
        tokio::task::spawn_blocking(move || {
            dispatcher::with_default(&dispatch, || {
                span.in_scope(|| {
                    let source = scratch.decode()?;
                    drop(scratch);
                    job.paint(&source, &out)
                })
            })
        })
        .await
        .map_err(|err| ThumbnailError::render(Stage::Compose, err))??;

        info!(%path, "thumbnail rendered");
        Ok(path)
    }
}
