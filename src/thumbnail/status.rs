use image::{
    imageops::{self, FilterType},
    Rgba, RgbaImage,
};
use imageproc::{
    drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_polygon_mut},
    point::Point,
    rect::Rect,
};

use super::{background::paste, config::RenderConfig, metadata::LIVE, text::stamp, FontSet};

/// Color of everything that says "live".
pub const ALERT: Rgba<u8> = Rgba([230, 30, 45, 255]);
const TRACK: Rgba<u8> = Rgba([255, 255, 255, 90]);
const BADGE: Rgba<u8> = Rgba([255, 0, 150, 220]);
const LABEL: Rgba<u8> = Rgba([235, 235, 235, 255]);
const ICON: Rgba<u8> = Rgba([255, 255, 255, 230]);

/// Filled rectangle with rounded corners, drawn straight onto `layer`.
pub fn fill_rounded_rect(layer: &mut RgbaImage, rect: Rect, radius: u32, color: Rgba<u8>) {
    let (x, y, w, h) = (rect.left(), rect.top(), rect.width(), rect.height());
    let r = radius.min(w / 2).min(h / 2);
    if r == 0 {
        draw_filled_rect_mut(layer, rect, color);
        return;
    }
    if w > 2 * r {
        draw_filled_rect_mut(layer, Rect::at(x + r as i32, y).of_size(w - 2 * r, h), color);
    }
    if h > 2 * r {
        draw_filled_rect_mut(layer, Rect::at(x, y + r as i32).of_size(w, h - 2 * r), color);
    }
    let (left, top) = (x + r as i32, y + r as i32);
    let (right, bottom) = (x + w as i32 - 1 - r as i32, y + h as i32 - 1 - r as i32);
    for center in [(left, top), (right, top), (left, bottom), (right, bottom)] {
        draw_filled_circle_mut(layer, center, r as i32, color);
    }
}

/// Runs `paint` on a transparent layer covering `area` and blends the result
/// onto the canvas.
fn blended(canvas: &mut RgbaImage, area: Rect, paint: impl FnOnce(&mut RgbaImage)) {
    let mut layer = RgbaImage::new(area.width(), area.height());
    paint(&mut layer);
    paste(canvas, &layer, area.left() as i64, area.top() as i64);
}

fn dimmed(color: Rgba<u8>, pulse: f32) -> Rgba<u8> {
    let [r, g, b, a] = color.0;
    let k = pulse.clamp(0.0, 1.0);
    Rgba([
        (r as f32 * k).round() as u8,
        (g as f32 * k).round() as u8,
        (b as f32 * k).round() as u8,
        a,
    ])
}

/// Where the progress bar sits on the canvas.
pub fn bar_rect(config: &RenderConfig) -> Rect {
    Rect::at(config.sx(565.0), config.sy(460.0))
        .of_size(config.sx(580.0).max(2) as u32, config.px(10.0).max(2))
}

/// How the bar should look in one frame.
#[derive(Debug, Clone, Copy)]
pub struct Progress {
    /// Share of the track that is filled; decorative only.
    pub fraction: f32,
    pub accent: Rgba<u8>,
    /// 1.0 is full color, lower values darken the bar.
    pub pulse: f32,
}

/// Progress bar plus its labels. A live duration gets a solid alert bar and
/// a "LIVE" tag instead of timecodes. Returns the labels drawn.
pub fn draw_progress(
    canvas: &mut RgbaImage,
    config: &RenderConfig,
    fonts: &FontSet,
    duration: &str,
    progress: Progress,
) -> Vec<String> {
    let bar = bar_rect(config);
    let radius = bar.height() / 2;
    let label_y = bar.bottom() + config.sy(12.0);
    let live = duration == LIVE;

    if live {
        let color = dimmed(ALERT, progress.pulse);
        blended(canvas, bar, |layer| {
            fill_rounded_rect(layer, Rect::at(0, 0).of_size(bar.width(), bar.height()), radius, color)
        });
        let tag = "LIVE";
        let pad = config.px(8.0);
        let tag_rect = Rect::at(bar.left(), label_y)
            .of_size(fonts.small.width(tag) + 2 * pad, fonts.small.line_height() + pad);
        blended(canvas, tag_rect, |layer| {
            fill_rounded_rect(
                layer,
                Rect::at(0, 0).of_size(tag_rect.width(), tag_rect.height()),
                config.px(6.0),
                color,
            );
            fonts.small.draw(layer, LABEL, pad as i32, (pad / 2) as i32, tag);
        });
        return vec![tag.to_string()];
    }

    let filled = ((bar.width() as f32 * progress.fraction.clamp(0.0, 1.0)).round() as u32)
        .clamp(bar.height(), bar.width());
    let accent = dimmed(progress.accent, progress.pulse);
    blended(canvas, bar, |layer| {
        fill_rounded_rect(layer, Rect::at(0, 0).of_size(bar.width(), bar.height()), radius, TRACK);
        fill_rounded_rect(layer, Rect::at(0, 0).of_size(filled, bar.height()), radius, accent);
    });
    let knob = (bar.left() + filled as i32, bar.top() + radius as i32);
    draw_filled_circle_mut(canvas, knob, (bar.height() as i32).max(2), accent);

    let start = "00:00";
    stamp(canvas, &fonts.small, (bar.left(), label_y), start, LABEL, None);
    let end_x = bar.right() + 1 - fonts.small.width(duration) as i32;
    stamp(canvas, &fonts.small, (end_x, label_y), duration, LABEL, None);
    vec![start.to_string(), duration.to_string()]
}

/// Rounded badge above the bar: "LIVE" for streams, "TRENDING" otherwise.
pub fn draw_badge(canvas: &mut RgbaImage, config: &RenderConfig, fonts: &FontSet, live: bool) -> &'static str {
    let text = if live { "LIVE" } else { "TRENDING" };
    let pad = config.px(10.0);
    let width = config.px(120.0).max(fonts.small.width(text) + 2 * pad);
    let height = config.px(40.0).max(fonts.small.line_height() + pad);
    let area = Rect::at(config.sx(565.0), config.sy(380.0)).of_size(width, height);
    blended(canvas, area, |layer| {
        fill_rounded_rect(layer, Rect::at(0, 0).of_size(width, height), config.px(15.0), BADGE);
        let text_y = (height - fonts.small.line_height()) / 2;
        fonts.small.draw(layer, LABEL, pad as i32, text_y as i32, text);
    });
    text
}

fn triangle(layer: &mut RgbaImage, tip_right: bool, x: i32, y: i32, size: i32) {
    let points = if tip_right {
        [Point::new(x, y), Point::new(x + size, y + size / 2), Point::new(x, y + size)]
    } else {
        [Point::new(x + size, y), Point::new(x, y + size / 2), Point::new(x + size, y + size)]
    };
    draw_polygon_mut(layer, &points, ICON);
}

/// Previous / play / next glyphs for when no icon strip is bundled.
fn draw_vector_controls(layer: &mut RgbaImage) {
    let (w, h) = (layer.width() as i32, layer.height() as i32);
    let size = (h * 2 / 3).max(3);
    let y = (h - size) / 2;
    let bar = (size / 6).max(1) as u32;

    // previous: bar + two left-pointing triangles
    let prev_x = w / 6 - size / 2;
    draw_filled_rect_mut(layer, Rect::at(prev_x, y).of_size(bar, size as u32), ICON);
    triangle(layer, false, prev_x + bar as i32, y, size / 2 + 1);
    triangle(layer, false, prev_x + bar as i32 + size / 2, y, size / 2 + 1);

    // play: triangle in a ring
    let (cx, cy) = (w / 2, h / 2);
    draw_filled_circle_mut(layer, (cx, cy), h / 2 - 1, Rgba([255, 255, 255, 60]));
    triangle(layer, true, cx - size / 3, cy - size / 2, size);

    // next: two right-pointing triangles + bar
    let next_x = w * 5 / 6 - size / 2;
    triangle(layer, true, next_x, y, size / 2 + 1);
    triangle(layer, true, next_x + size / 2, y, size / 2 + 1);
    draw_filled_rect_mut(layer, Rect::at(next_x + size, y).of_size(bar, size as u32), ICON);
}

/// Player controls strip under the bar. Uses the bundled icon image when one
/// was loaded.
pub fn draw_controls(canvas: &mut RgbaImage, config: &RenderConfig, icons: Option<&RgbaImage>) {
    let area = Rect::at(config.sx(565.0), config.sy(520.0))
        .of_size(config.sx(580.0).max(6) as u32, config.px(62.0).max(6));
    match icons {
        Some(icons) => {
            let strip = imageops::resize(icons, area.width(), area.height(), FilterType::Triangle);
            paste(canvas, &strip, area.left() as i64, area.top() as i64);
        }
        None => blended(canvas, area, draw_vector_controls),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thumbnail::typeface::{Face, Typeface};

    fn setup() -> (RgbaImage, RenderConfig, FontSet) {
        let config = RenderConfig {
            width: 320,
            height: 180,
            ..RenderConfig::default()
        };
        let face = Face::new(Typeface::Builtin, 8.0);
        let fonts = FontSet {
            title: face.sized(12.0),
            body: face.clone(),
            small: face,
        };
        let canvas = RgbaImage::from_pixel(320, 180, Rgba([0, 0, 0, 255]));
        (canvas, config, fonts)
    }

    fn bar_center(config: &RenderConfig) -> (u32, u32) {
        let bar = bar_rect(config);
        (
            (bar.left() + bar.width() as i32 / 2) as u32,
            (bar.top() + bar.height() as i32 / 2) as u32,
        )
    }

    #[test]
    fn live_uses_alert_bar_and_label() {
        let (mut canvas, config, fonts) = setup();
        let progress = Progress {
            fraction: 0.3,
            accent: Rgba([0, 255, 0, 255]),
            pulse: 1.0,
        };
        let labels = draw_progress(&mut canvas, &config, &fonts, LIVE, progress);

        assert_eq!(labels, vec!["LIVE".to_string()]);
        let (x, y) = bar_center(&config);
        assert_eq!(*canvas.get_pixel(x, y), ALERT);
        // Right end of the bar too: the whole track is alert colored.
        let bar = bar_rect(&config);
        assert_eq!(*canvas.get_pixel((bar.right() - 2) as u32, y), ALERT);
    }

    #[test]
    fn fixed_duration_shows_timecodes() {
        let (mut canvas, config, fonts) = setup();
        let accent = Rgba([0, 255, 0, 255]);
        let progress = Progress {
            fraction: 0.25,
            accent,
            pulse: 1.0,
        };
        let labels = draw_progress(&mut canvas, &config, &fonts, "3:45", progress);

        assert_eq!(labels, vec!["00:00".to_string(), "3:45".to_string()]);
        let bar = bar_rect(&config);
        let (_, y) = bar_center(&config);
        assert_eq!(*canvas.get_pixel((bar.left() + 3) as u32, y), accent);
        let tail = canvas.get_pixel((bar.right() - 3) as u32, y);
        assert_ne!(*tail, ALERT);
        assert_ne!(*tail, accent);
        assert!(canvas.pixels().all(|p| *p != ALERT));
    }

    #[test]
    fn pulse_darkens_the_bar() {
        let (mut canvas, config, fonts) = setup();
        let progress = Progress {
            fraction: 0.5,
            accent: ALERT,
            pulse: 0.5,
        };
        draw_progress(&mut canvas, &config, &fonts, LIVE, progress);
        let (x, y) = bar_center(&config);
        assert_eq!(*canvas.get_pixel(x, y), dimmed(ALERT, 0.5));
    }

    #[test]
    fn badge_text_follows_liveness() {
        let (mut canvas, config, fonts) = setup();
        assert_eq!(draw_badge(&mut canvas, &config, &fonts, true), "LIVE");
        assert_eq!(draw_badge(&mut canvas, &config, &fonts, false), "TRENDING");
    }

    #[test]
    fn rounded_rect_has_soft_corners() {
        let mut layer = RgbaImage::new(40, 20);
        let white = Rgba([255, 255, 255, 255]);
        fill_rounded_rect(&mut layer, Rect::at(0, 0).of_size(40, 20), 8, white);
        assert_eq!(layer.get_pixel(0, 0)[3], 0);
        assert_eq!(*layer.get_pixel(20, 10), white);
        assert_eq!(*layer.get_pixel(0, 10), white);
    }

    #[test]
    fn controls_fall_back_to_vector_icons() {
        let (mut canvas, config, _) = setup();
        let before = canvas.clone();
        draw_controls(&mut canvas, &config, None);
        assert_ne!(canvas, before);
        assert!(canvas.pixels().all(|p| p[3] == 255));
    }
}
