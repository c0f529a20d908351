use ab_glyph::{FontArc, PxScale};
use camino::Utf8Path;
use image::{Rgba, RgbaImage};
use imageproc::{
    drawing::{draw_filled_rect_mut, draw_text_mut, text_size},
    rect::Rect,
};
use tracing::warn;

use super::config::RenderConfig;

/// Classic 5x7 column-major bitmap font for ' '..='~'. Bit 0 is the top row.
const GLYPHS: [[u8; 5]; 95] = [
    [0x00, 0x00, 0x00, 0x00, 0x00],
    [0x00, 0x00, 0x5F, 0x00, 0x00],
    [0x00, 0x07, 0x00, 0x07, 0x00],
    [0x14, 0x7F, 0x14, 0x7F, 0x14],
    [0x24, 0x2A, 0x7F, 0x2A, 0x12],
    [0x23, 0x13, 0x08, 0x64, 0x62],
    [0x36, 0x49, 0x55, 0x22, 0x50],
    [0x00, 0x05, 0x03, 0x00, 0x00],
    [0x00, 0x1C, 0x22, 0x41, 0x00],
    [0x00, 0x41, 0x22, 0x1C, 0x00],
    [0x08, 0x2A, 0x1C, 0x2A, 0x08],
    [0x08, 0x08, 0x3E, 0x08, 0x08],
    [0x00, 0x50, 0x30, 0x00, 0x00],
    [0x08, 0x08, 0x08, 0x08, 0x08],
    [0x00, 0x60, 0x60, 0x00, 0x00],
    [0x20, 0x10, 0x08, 0x04, 0x02],
    [0x3E, 0x51, 0x49, 0x45, 0x3E],
    [0x00, 0x42, 0x7F, 0x40, 0x00],
    [0x42, 0x61, 0x51, 0x49, 0x46],
    [0x21, 0x41, 0x45, 0x4B, 0x31],
    [0x18, 0x14, 0x12, 0x7F, 0x10],
    [0x27, 0x45, 0x45, 0x45, 0x39],
    [0x3C, 0x4A, 0x49, 0x49, 0x30],
    [0x01, 0x71, 0x09, 0x05, 0x03],
    [0x36, 0x49, 0x49, 0x49, 0x36],
    [0x06, 0x49, 0x49, 0x29, 0x1E],
    [0x00, 0x36, 0x36, 0x00, 0x00],
    [0x00, 0x56, 0x36, 0x00, 0x00],
    [0x00, 0x08, 0x14, 0x22, 0x41],
    [0x14, 0x14, 0x14, 0x14, 0x14],
    [0x41, 0x22, 0x14, 0x08, 0x00],
    [0x02, 0x01, 0x51, 0x09, 0x06],
    [0x32, 0x49, 0x79, 0x41, 0x3E],
    [0x7E, 0x11, 0x11, 0x11, 0x7E],
    [0x7F, 0x49, 0x49, 0x49, 0x36],
    [0x3E, 0x41, 0x41, 0x41, 0x22],
    [0x7F, 0x41, 0x41, 0x22, 0x1C],
    [0x7F, 0x49, 0x49, 0x49, 0x41],
    [0x7F, 0x09, 0x09, 0x01, 0x01],
    [0x3E, 0x41, 0x41, 0x51, 0x32],
    [0x7F, 0x08, 0x08, 0x08, 0x7F],
    [0x00, 0x41, 0x7F, 0x41, 0x00],
    [0x20, 0x40, 0x41, 0x3F, 0x01],
    [0x7F, 0x08, 0x14, 0x22, 0x41],
    [0x7F, 0x40, 0x40, 0x40, 0x40],
    [0x7F, 0x02, 0x04, 0x02, 0x7F],
    [0x7F, 0x04, 0x08, 0x10, 0x7F],
    [0x3E, 0x41, 0x41, 0x41, 0x3E],
    [0x7F, 0x09, 0x09, 0x09, 0x06],
    [0x3E, 0x41, 0x51, 0x21, 0x5E],
    [0x7F, 0x09, 0x19, 0x29, 0x46],
    [0x46, 0x49, 0x49, 0x49, 0x31],
    [0x01, 0x01, 0x7F, 0x01, 0x01],
    [0x3F, 0x40, 0x40, 0x40, 0x3F],
    [0x1F, 0x20, 0x40, 0x20, 0x1F],
    [0x7F, 0x20, 0x18, 0x20, 0x7F],
    [0x63, 0x14, 0x08, 0x14, 0x63],
    [0x03, 0x04, 0x78, 0x04, 0x03],
    [0x61, 0x51, 0x49, 0x45, 0x43],
    [0x00, 0x00, 0x7F, 0x41, 0x41],
    [0x02, 0x04, 0x08, 0x10, 0x20],
    [0x41, 0x41, 0x7F, 0x00, 0x00],
    [0x04, 0x02, 0x01, 0x02, 0x04],
    [0x40, 0x40, 0x40, 0x40, 0x40],
    [0x00, 0x01, 0x02, 0x04, 0x00],
    [0x20, 0x54, 0x54, 0x54, 0x78],
    [0x7F, 0x48, 0x44, 0x44, 0x38],
    [0x38, 0x44, 0x44, 0x44, 0x20],
    [0x38, 0x44, 0x44, 0x48, 0x7F],
    [0x38, 0x54, 0x54, 0x54, 0x18],
    [0x08, 0x7E, 0x09, 0x01, 0x02],
    [0x08, 0x14, 0x54, 0x54, 0x3C],
    [0x7F, 0x08, 0x04, 0x04, 0x78],
    [0x00, 0x44, 0x7D, 0x40, 0x00],
    [0x20, 0x40, 0x44, 0x3D, 0x00],
    [0x00, 0x7F, 0x10, 0x28, 0x44],
    [0x00, 0x41, 0x7F, 0x40, 0x00],
    [0x7C, 0x04, 0x18, 0x04, 0x78],
    [0x7C, 0x08, 0x04, 0x04, 0x78],
    [0x38, 0x44, 0x44, 0x44, 0x38],
    [0x7C, 0x14, 0x14, 0x14, 0x08],
    [0x08, 0x14, 0x14, 0x18, 0x7C],
    [0x7C, 0x08, 0x04, 0x04, 0x08],
    [0x48, 0x54, 0x54, 0x54, 0x20],
    [0x04, 0x3F, 0x44, 0x40, 0x20],
    [0x3C, 0x40, 0x40, 0x20, 0x7C],
    [0x1C, 0x20, 0x40, 0x20, 0x1C],
    [0x3C, 0x40, 0x30, 0x40, 0x3C],
    [0x44, 0x28, 0x10, 0x28, 0x44],
    [0x0C, 0x50, 0x50, 0x50, 0x3C],
    [0x44, 0x64, 0x54, 0x4C, 0x44],
    [0x00, 0x08, 0x36, 0x41, 0x00],
    [0x00, 0x00, 0x7F, 0x00, 0x00],
    [0x00, 0x41, 0x36, 0x08, 0x00],
    [0x08, 0x04, 0x08, 0x10, 0x08],
];
const BULLET: [u8; 5] = [0x00, 0x1C, 0x1C, 0x1C, 0x00];
const ADVANCE: u32 = 6;
const LINE: u32 = 8;

fn glyph(c: char) -> &'static [u8; 5] {
    match c {
        ' '..='~' => &GLYPHS[c as usize - ' ' as usize],
        '•' | '·' => &BULLET,
        _ => &GLYPHS['?' as usize - ' ' as usize],
    }
}

#[derive(Clone)]
pub enum Typeface {
    Vector(FontArc),
    /// Blocky 5x7 face used when no font file could be loaded.
    Builtin,
}

impl Typeface {
    pub fn load(path: &Utf8Path) -> Typeface {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(%path, %err, "font unavailable, using built-in face");
                return Typeface::Builtin;
            }
        };
        match FontArc::try_from_vec(bytes) {
            Ok(font) => Typeface::Vector(font),
            Err(err) => {
                warn!(%path, %err, "font unreadable, using built-in face");
                Typeface::Builtin
            }
        }
    }
}

/// A typeface at a pixel size.
#[derive(Clone)]
pub struct Face {
    typeface: Typeface,
    size: f32,
}

impl Face {
    pub fn new(typeface: Typeface, size: f32) -> Self {
        Face { typeface, size }
    }

    pub fn sized(&self, size: f32) -> Face {
        Face::new(self.typeface.clone(), size)
    }

    fn cell(&self) -> u32 {
        ((self.size / LINE as f32).round() as u32).max(1)
    }

    /// Rendered width of `text` in pixels.
    pub fn width(&self, text: &str) -> u32 {
        match &self.typeface {
            Typeface::Vector(font) => text_size(PxScale::from(self.size), font, text).0,
            Typeface::Builtin => {
                let chars = text.chars().count() as u32;
                (chars * ADVANCE).saturating_sub(1) * self.cell()
            }
        }
    }

    pub fn line_height(&self) -> u32 {
        match &self.typeface {
            Typeface::Vector(_) => self.size.ceil() as u32,
            Typeface::Builtin => LINE * self.cell(),
        }
    }

    pub fn draw(&self, canvas: &mut RgbaImage, color: Rgba<u8>, x: i32, y: i32, text: &str) {
        match &self.typeface {
            Typeface::Vector(font) => {
                draw_text_mut(canvas, color, x, y, PxScale::from(self.size), font, text)
            }
            Typeface::Builtin => {
                let cell = self.cell();
                for (i, c) in text.chars().enumerate() {
                    let left = x + (i as u32 * ADVANCE * cell) as i32;
                    for (col, bits) in glyph(c).iter().enumerate() {
                        for row in 0..7 {
                            if bits & (1 << row) == 0 {
                                continue;
                            }
                            let at = Rect::at(left + (col as u32 * cell) as i32, y + (row * cell) as i32)
                                .of_size(cell, cell);
                            draw_filled_rect_mut(canvas, at, color);
                        }
                    }
                }
            }
        }
    }
}

/// Faces used across one render.
#[derive(Clone)]
pub struct FontSet {
    pub title: Face,
    pub body: Face,
    pub small: Face,
}

impl FontSet {
    pub fn load(config: &RenderConfig) -> Self {
        let scale = config.scale();
        let body = Face::new(Typeface::load(&config.fonts.body), 30.0 * scale);
        FontSet {
            title: Face::new(Typeface::load(&config.fonts.title), 50.0 * scale),
            small: body.sized(20.0 * scale),
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_font_falls_back() {
        assert!(matches!(
            Typeface::load(Utf8Path::new("/nonexistent/font.ttf")),
            Typeface::Builtin
        ));
    }

    #[test]
    fn bundled_fonts_load() {
        let assets = Utf8Path::new(env!("CARGO_MANIFEST_DIR")).join("assets");
        for name in ["font2.ttf", "font3.ttf"] {
            let face = Face::new(Typeface::load(&assets.join(name)), 30.0);
            assert!(matches!(face.typeface, Typeface::Vector(_)), "{name}");
            assert!(face.width("Hello") > 0);
            assert_eq!(face.line_height(), 30);
        }
    }

    #[test]
    fn builtin_measures_by_cell() {
        let face = Face::new(Typeface::Builtin, 16.0);
        assert_eq!(face.cell(), 2);
        assert_eq!(face.width(""), 0);
        assert_eq!(face.width("ab"), 11 * 2);
        assert_eq!(face.line_height(), 16);
        assert!(face.sized(32.0).width("ab") > face.width("ab"));
    }

    #[test]
    fn builtin_draws_inside_its_box() {
        let face = Face::new(Typeface::Builtin, 8.0);
        let mut canvas = RgbaImage::new(40, 20);
        let white = Rgba([255, 255, 255, 255]);
        face.draw(&mut canvas, white, 2, 3, "I•");

        // Middle column of "I" is a full stroke.
        assert_eq!(*canvas.get_pixel(4, 3), white);
        assert_eq!(*canvas.get_pixel(4, 9), white);
        let lit = canvas.enumerate_pixels().filter(|(_, _, p)| p[3] > 0).count();
        assert!(lit > 0);
        assert!(canvas
            .enumerate_pixels()
            .filter(|(_, _, p)| p[3] > 0)
            .all(|(x, y, _)| (2..2 + face.width("I•")).contains(&x) && (3..3 + 7).contains(&y)));
    }
}
