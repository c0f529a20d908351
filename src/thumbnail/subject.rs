use image::{
    imageops::{self, FilterType},
    DynamicImage, GenericImageView, Rgba, RgbaImage,
};

use super::{
    background::paste,
    config::{RenderConfig, SubjectCrop},
};

/// Antialiased coverage of pixel (x, y) by a disk centered in a `size` box.
fn disk_coverage(x: u32, y: u32, size: u32, radius: f32) -> f32 {
    let center = size as f32 / 2.0;
    let dist = (x as f32 + 0.5 - center).hypot(y as f32 + 0.5 - center);
    (radius - dist + 0.5).clamp(0.0, 1.0)
}

/// Cuts the source into a `diameter` wide disk. Outside the disk alpha is zero.
pub fn circle_crop(source: &DynamicImage, diameter: u32, crop: SubjectCrop) -> RgbaImage {
    let square = match crop {
        SubjectCrop::Full => source.resize_exact(diameter, diameter, FilterType::Lanczos3),
        SubjectCrop::CenterSquare => {
            let (width, height) = source.dimensions();
            let side = width.min(height);
            source
                .crop_imm((width - side) / 2, (height - side) / 2, side, side)
                .resize_exact(diameter, diameter, FilterType::Lanczos3)
        }
    };
    let mut disk = square.to_rgba8();
    let radius = diameter as f32 / 2.0;
    for (x, y, px) in disk.enumerate_pixels_mut() {
        px[3] = (px[3] as f32 * disk_coverage(x, y, diameter, radius)).round() as u8;
    }
    disk
}

/// Puts a blurred colored ring of width `ring` around `art`.
pub fn with_glow(art: &RgbaImage, ring: u32, color: Rgba<u8>, blur: f32) -> RgbaImage {
    let size = art.width() + ring * 2;
    let outer = size as f32 / 2.0;
    let inner = outer - ring as f32;
    let [r, g, b, a] = color.0;
    let halo = RgbaImage::from_fn(size, size, |x, y| {
        let band = disk_coverage(x, y, size, outer) - disk_coverage(x, y, size, inner);
        Rgba([r, g, b, (a as f32 * band).round() as u8])
    });
    let mut framed = if blur > 0.0 {
        imageops::blur(&halo, blur)
    } else {
        halo
    };
    imageops::overlay(&mut framed, art, ring as i64, ring as i64);
    framed
}

/// Circular art with its glow, pasted left of the text block.
pub fn draw_subject(
    canvas: &mut RgbaImage,
    source: &DynamicImage,
    config: &RenderConfig,
    glow: Rgba<u8>,
) {
    let size = config.px(400.0);
    let ring = config.px(20.0);
    let art = circle_crop(source, size.saturating_sub(ring * 2).max(1), config.subject_crop);
    let framed = with_glow(&art, ring, glow, 8.0 * config.scale());
    paste(canvas, &framed, config.sx(120.0) as i64, config.sy(160.0) as i64);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opaque(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, _| {
            if x < width / 2 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        }))
    }

    #[test]
    fn disk_has_clean_corners() {
        let disk = circle_crop(&opaque(160, 90), 100, SubjectCrop::CenterSquare);
        assert_eq!(disk.dimensions(), (100, 100));
        for (x, y) in [(0, 0), (99, 0), (0, 99), (99, 99), (10, 10)] {
            assert_eq!(disk.get_pixel(x, y)[3], 0, "corner ({x}, {y}) leaked");
        }
        assert_eq!(disk.get_pixel(50, 50)[3], 255);
        assert_eq!(disk.get_pixel(50, 1)[3], 255);
    }

    #[test]
    fn edge_is_antialiased() {
        let disk = circle_crop(&opaque(64, 64), 64, SubjectCrop::Full);
        let partial = disk
            .pixels()
            .filter(|p| p[3] > 0 && p[3] < 255)
            .count();
        assert!(partial > 0);
    }

    #[test]
    fn center_square_keeps_the_middle() {
        // 3:1 source, left third red, the rest blue: the middle square is mostly blue.
        let source = DynamicImage::ImageRgba8(RgbaImage::from_fn(300, 100, |x, _| {
            if x < 100 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        }));
        let disk = circle_crop(&source, 50, SubjectCrop::CenterSquare);
        let middle = disk.get_pixel(25, 25);
        assert!(middle[2] > 200 && middle[0] < 50);
        let squashed = circle_crop(&source, 50, SubjectCrop::Full);
        let left = squashed.get_pixel(5, 25);
        assert!(left[0] > 200 && left[2] < 50);
    }

    #[test]
    fn glow_ring_surrounds_art() {
        let art = circle_crop(&opaque(40, 40), 40, SubjectCrop::Full);
        let framed = with_glow(&art, 10, Rgba([0, 255, 0, 255]), 0.0);
        assert_eq!(framed.dimensions(), (60, 60));
        // Inside the ring, left of the art.
        assert_eq!(*framed.get_pixel(4, 30), Rgba([0, 255, 0, 255]));
        assert_eq!(framed.get_pixel(0, 0)[3], 0);
        assert_eq!(*framed.get_pixel(30, 30), *art.get_pixel(20, 20));
    }
}
