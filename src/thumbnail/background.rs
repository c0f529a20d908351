use image::{
    imageops::{self, FilterType},
    DynamicImage, Rgba, RgbaImage,
};
use rand::Rng;

use super::config::{Gradient, RenderConfig};

const BRIGHTNESS: f32 = 0.6;
const BLUR_RADIUS: f32 = 20.0;
/// Blurs run on a copy shrunk by this factor.
const BLUR_DOWNSCALE: u32 = 8;

/// Channels stay in 50..=255 so nothing comes out muddy.
pub fn random_color(rng: &mut impl Rng) -> Rgba<u8> {
    Rgba([
        rng.gen_range(50..=255),
        rng.gen_range(50..=255),
        rng.gen_range(50..=255),
        255,
    ])
}

fn lerp(a: Rgba<u8>, b: Rgba<u8>, t: f32) -> Rgba<u8> {
    let t = t.clamp(0.0, 1.0);
    let mut out = a;
    for (o, (a, b)) in out.0.iter_mut().zip(a.0.iter().zip(b.0.iter())) {
        *o = (*a as f32 + (*b as f32 - *a as f32) * t).round() as u8;
    }
    out
}

fn ramp(colors: &[Rgba<u8>; 3], t: f32) -> Rgba<u8> {
    if t < 0.5 {
        lerp(colors[0], colors[1], t * 2.0)
    } else {
        lerp(colors[1], colors[2], (t - 0.5) * 2.0)
    }
}

/// Three-stop gradient: top-left to bottom-right, or center outwards.
pub fn gradient(kind: Gradient, width: u32, height: u32, colors: &[Rgba<u8>; 3]) -> RgbaImage {
    let span_x = (width.max(2) - 1) as f32;
    let span_y = (height.max(2) - 1) as f32;
    match kind {
        Gradient::Diagonal => RgbaImage::from_fn(width, height, |x, y| {
            ramp(colors, (x as f32 / span_x + y as f32 / span_y) / 2.0)
        }),
        Gradient::Radial => {
            let (cx, cy) = (span_x / 2.0, span_y / 2.0);
            let reach = cx.hypot(cy).max(1.0);
            RgbaImage::from_fn(width, height, |x, y| {
                ramp(colors, (x as f32 - cx).hypot(y as f32 - cy) / reach)
            })
        }
    }
}

/// Gaussian blur on a shrunken copy, scaled back up. Looks the same as a
/// wide blur at a fraction of the cost.
pub fn soft_blur(img: &RgbaImage, radius: f32) -> RgbaImage {
    let (width, height) = img.dimensions();
    let small = imageops::resize(
        img,
        (width / BLUR_DOWNSCALE).max(1),
        (height / BLUR_DOWNSCALE).max(1),
        FilterType::Triangle,
    );
    let small = imageops::blur(&small, (radius / BLUR_DOWNSCALE as f32).max(0.5));
    imageops::resize(&small, width, height, FilterType::Triangle)
}

/// Full-canvas backdrop: the source filled to the canvas, blurred, darkened,
/// and washed with a random gradient.
pub fn compose(
    source: &DynamicImage,
    config: &RenderConfig,
    kind: Gradient,
    rng: &mut impl Rng,
) -> RgbaImage {
    let filled = source
        .resize_to_fill(config.width, config.height, FilterType::Triangle)
        .to_rgba8();
    let mut backdrop = soft_blur(&filled, BLUR_RADIUS * config.scale());

    let colors = [random_color(rng), random_color(rng), random_color(rng)];
    let wash = gradient(kind, config.width, config.height, &colors);
    let opacity = kind.opacity();
    for (px, tint) in backdrop.pixels_mut().zip(wash.pixels()) {
        for c in 0..3 {
            let dimmed = px[c] as f32 * BRIGHTNESS;
            px[c] = (dimmed * (1.0 - opacity) + tint[c] as f32 * opacity).round() as u8;
        }
        px[3] = 255;
    }
    backdrop
}

/// Alpha-blends `layer` onto `canvas` with its top-left at (x, y), in integer
/// math so an opaque canvas stays exactly opaque. Off-canvas parts are
/// clipped.
pub fn paste(canvas: &mut RgbaImage, layer: &RgbaImage, x: i64, y: i64) {
    let (width, height) = (canvas.width() as i64, canvas.height() as i64);
    for (lx, ly, src) in layer.enumerate_pixels() {
        let (cx, cy) = (x + lx as i64, y + ly as i64);
        let alpha = src[3] as u32;
        if alpha == 0 || cx < 0 || cy < 0 || cx >= width || cy >= height {
            continue;
        }
        let dst = canvas.get_pixel_mut(cx as u32, cy as u32);
        for c in 0..3 {
            dst[c] = ((src[c] as u32 * alpha + dst[c] as u32 * (255 - alpha) + 127) / 255) as u8;
        }
        dst[3] = (alpha + dst[3] as u32 * (255 - alpha) / 255) as u8;
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    #[test]
    fn random_colors_stay_bright() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let color = random_color(&mut rng);
            assert!(color.0[..3].iter().all(|c| *c >= 50));
            assert_eq!(color[3], 255);
        }
    }

    #[test]
    fn diagonal_runs_corner_to_corner() {
        let img = gradient(Gradient::Diagonal, 40, 20, &[RED, GREEN, BLUE]);
        assert_eq!(*img.get_pixel(0, 0), RED);
        assert_eq!(*img.get_pixel(39, 19), BLUE);
        assert_eq!(img.get_pixel(39, 0), img.get_pixel(0, 19));
    }

    #[test]
    fn radial_starts_in_the_middle() {
        let img = gradient(Gradient::Radial, 41, 21, &[RED, GREEN, BLUE]);
        assert_eq!(*img.get_pixel(20, 10), RED);
        assert_eq!(*img.get_pixel(0, 0), BLUE);
        assert_eq!(*img.get_pixel(40, 20), BLUE);
    }

    #[test]
    fn paste_blends_and_clips() {
        let mut canvas = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        let layer = RgbaImage::from_fn(3, 3, |x, _| Rgba([255, 255, 255, [0, 128, 254][x as usize]]));
        paste(&mut canvas, &layer, 2, -1);

        assert!(canvas.pixels().all(|p| p[3] == 255));
        assert_eq!(*canvas.get_pixel(2, 0), Rgba([0, 0, 0, 255]));
        assert_eq!(*canvas.get_pixel(3, 1), Rgba([128, 128, 128, 255]));
        assert_eq!(*canvas.get_pixel(0, 0), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn backdrop_fills_canvas_and_is_opaque() {
        let config = RenderConfig {
            width: 160,
            height: 90,
            ..RenderConfig::default()
        };
        // Tall source still has to cover a wide canvas.
        let source = DynamicImage::ImageRgba8(RgbaImage::from_pixel(30, 80, Rgba([255, 255, 255, 255])));
        let mut rng = StdRng::seed_from_u64(1);

        let backdrop = compose(&source, &config, Gradient::Radial, &mut rng);
        assert_eq!(backdrop.dimensions(), (160, 90));
        assert!(backdrop.pixels().all(|p| p[3] == 255));
        // Darkened white can never come back to full brightness.
        assert!(backdrop.pixels().all(|p| p.0[..3].iter().all(|c| *c < 255)));
    }
}
