use image::{imageops, Rgba, RgbaImage};

use super::{
    background::paste, config::RenderConfig, metadata::VideoMetadata, typeface::Face, FontSet,
};

pub const ELLIPSIS: &str = "...";

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const SHADOW: Rgba<u8> = Rgba([0, 0, 0, 170]);
/// Blur radii of the neon passes, widest first, at reference size.
const GLOW_RADII: [f32; 3] = [6.0, 4.0, 2.0];

/// Greedy word wrap into at most two lines, measured in pixels. Whatever does
/// not fit ends the last line with [`ELLIPSIS`].
pub fn wrap_title(face: &Face, title: &str, max_width: u32) -> Vec<String> {
    let mut words = title.split_whitespace().peekable();
    let mut lines: Vec<String> = Vec::with_capacity(2);

    while lines.len() < 2 {
        let mut line = String::new();
        while let Some(word) = words.peek() {
            let candidate = if line.is_empty() {
                word.to_string()
            } else {
                format!("{line} {word}")
            };
            if face.width(&candidate) > max_width {
                break;
            }
            line = candidate;
            words.next();
        }
        if line.is_empty() {
            // A single word wider than the whole line.
            match words.next() {
                Some(word) => line = ellipsize(face, word, max_width),
                None => break,
            }
        }
        lines.push(line);
    }

    if words.peek().is_some() {
        if let Some(last) = lines.last_mut() {
            *last = ellipsize(face, last, max_width);
        }
    }
    lines
}

/// Cuts `text` down until it fits `max_width` with the ellipsis appended.
pub fn ellipsize(face: &Face, text: &str, max_width: u32) -> String {
    let mut cut = text.trim_end().to_string();
    loop {
        let candidate = format!("{cut}{ELLIPSIS}");
        if cut.is_empty() || face.width(&candidate) <= max_width {
            return candidate;
        }
        cut.pop();
        cut.truncate(cut.trim_end().len());
    }
}

/// Returns `text` untouched when it fits, ellipsized otherwise.
pub fn fit(face: &Face, text: &str, max_width: u32) -> String {
    if face.width(text) <= max_width {
        text.to_string()
    } else {
        ellipsize(face, text, max_width)
    }
}

/// Draws `text` onto a padded transparent layer, optionally blurs it, and
/// blends it onto `canvas` so the canvas never picks up holes.
pub fn stamp(
    canvas: &mut RgbaImage,
    face: &Face,
    (x, y): (i32, i32),
    text: &str,
    color: Rgba<u8>,
    sigma: Option<f32>,
) {
    let pad = sigma.map_or(0, |s| (s * 3.0).ceil() as u32) + 2;
    let (w, h) = (face.width(text) + 2 * pad, face.line_height() + 2 * pad);
    let [r, g, b, _] = color.0;
    let mut layer = RgbaImage::from_pixel(w, h, Rgba([r, g, b, 0]));
    face.draw(&mut layer, color, pad as i32, pad as i32, text);
    if let Some(sigma) = sigma {
        layer = imageops::blur(&layer, sigma);
    }
    paste(canvas, &layer, (x - pad as i32) as i64, (y - pad as i32) as i64);
}

/// Neon glow passes, a dark drop shadow, then the text itself.
pub fn draw_glowing(
    canvas: &mut RgbaImage,
    face: &Face,
    at: (i32, i32),
    text: &str,
    glow: Rgba<u8>,
    scale: f32,
) {
    if text.is_empty() {
        return;
    }
    for radius in GLOW_RADII {
        stamp(canvas, face, at, text, glow, Some((radius * scale).max(0.5)));
    }
    let offset = (2.0 * scale).round().max(1.0) as i32;
    stamp(
        canvas,
        face,
        (at.0 + offset, at.1 + offset),
        text,
        SHADOW,
        Some(scale.max(0.5)),
    );
    stamp(canvas, face, at, text, WHITE, None);
}

/// Title block and "{channel} • {views}" line. Returns the lines drawn.
pub fn draw_details(
    canvas: &mut RgbaImage,
    config: &RenderConfig,
    fonts: &FontSet,
    meta: &VideoMetadata,
    glow: Rgba<u8>,
) -> Vec<String> {
    let x = config.sx(565.0);
    let max_width = (config.width as i32 - x - config.sx(60.0)).max(1) as u32;
    let scale = config.scale();

    let mut drawn = wrap_title(&fonts.title, &meta.title, max_width);
    for (line, y) in drawn.iter().zip([170.0, 240.0]) {
        draw_glowing(canvas, &fonts.title, (x, config.sy(y)), line, glow, scale);
    }

    let details = fit(
        &fonts.body,
        &format!("{} • {}", meta.channel, meta.view_count_display),
        max_width,
    );
    draw_glowing(canvas, &fonts.body, (x, config.sy(320.0)), &details, glow, scale);
    drawn.push(details);
    drawn
}
