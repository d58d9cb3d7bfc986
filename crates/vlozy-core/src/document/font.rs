//! Font resolution for rendering plain-text documents.
//!
//! An outline font is loaded from the first readable candidate path. When
//! none can be loaded, a built-in 5x7 bitmap font is used so that text
//! rendering never fails.

use std::path::PathBuf;

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};
use tracing::{debug, warn};

const INK: Rgb<u8> = Rgb([0, 0, 0]);

/// Glyph columns for ASCII 0x20..=0x7E, least significant bit at the top.
#[rustfmt::skip]
const BITMAP_GLYPHS: [[u8; 5]; 95] = [
    [0x00, 0x00, 0x00, 0x00, 0x00], [0x00, 0x00, 0x5F, 0x00, 0x00], [0x00, 0x07, 0x00, 0x07, 0x00],
    [0x14, 0x7F, 0x14, 0x7F, 0x14], [0x24, 0x2A, 0x7F, 0x2A, 0x12], [0x23, 0x13, 0x08, 0x64, 0x62],
    [0x36, 0x49, 0x55, 0x22, 0x50], [0x00, 0x05, 0x03, 0x00, 0x00], [0x00, 0x1C, 0x22, 0x41, 0x00],
    [0x00, 0x41, 0x22, 0x1C, 0x00], [0x08, 0x2A, 0x1C, 0x2A, 0x08], [0x08, 0x08, 0x3E, 0x08, 0x08],
    [0x00, 0x50, 0x30, 0x00, 0x00], [0x08, 0x08, 0x08, 0x08, 0x08], [0x00, 0x60, 0x60, 0x00, 0x00],
    [0x20, 0x10, 0x08, 0x04, 0x02], [0x3E, 0x51, 0x49, 0x45, 0x3E], [0x00, 0x42, 0x7F, 0x40, 0x00],
    [0x42, 0x61, 0x51, 0x49, 0x46], [0x21, 0x41, 0x45, 0x4B, 0x31], [0x18, 0x14, 0x12, 0x7F, 0x10],
    [0x27, 0x45, 0x45, 0x45, 0x39], [0x3C, 0x4A, 0x49, 0x49, 0x30], [0x01, 0x71, 0x09, 0x05, 0x03],
    [0x36, 0x49, 0x49, 0x49, 0x36], [0x06, 0x49, 0x49, 0x29, 0x1E], [0x00, 0x36, 0x36, 0x00, 0x00],
    [0x00, 0x56, 0x36, 0x00, 0x00], [0x08, 0x14, 0x22, 0x41, 0x00], [0x14, 0x14, 0x14, 0x14, 0x14],
    [0x00, 0x41, 0x22, 0x14, 0x08], [0x02, 0x01, 0x51, 0x09, 0x06], [0x32, 0x49, 0x79, 0x41, 0x3E],
    [0x7E, 0x11, 0x11, 0x11, 0x7E], [0x7F, 0x49, 0x49, 0x49, 0x36], [0x3E, 0x41, 0x41, 0x41, 0x22],
    [0x7F, 0x41, 0x41, 0x22, 0x1C], [0x7F, 0x49, 0x49, 0x49, 0x41], [0x7F, 0x09, 0x09, 0x01, 0x01],
    [0x3E, 0x41, 0x41, 0x51, 0x32], [0x7F, 0x08, 0x08, 0x08, 0x7F], [0x00, 0x41, 0x7F, 0x41, 0x00],
    [0x20, 0x40, 0x41, 0x3F, 0x01], [0x7F, 0x08, 0x14, 0x22, 0x41], [0x7F, 0x40, 0x40, 0x40, 0x40],
    [0x7F, 0x02, 0x04, 0x02, 0x7F], [0x7F, 0x04, 0x08, 0x10, 0x7F], [0x3E, 0x41, 0x41, 0x41, 0x3E],
    [0x7F, 0x09, 0x09, 0x09, 0x06], [0x3E, 0x41, 0x51, 0x21, 0x5E], [0x7F, 0x09, 0x19, 0x29, 0x46],
    [0x46, 0x49, 0x49, 0x49, 0x31], [0x01, 0x01, 0x7F, 0x01, 0x01], [0x3F, 0x40, 0x40, 0x40, 0x3F],
    [0x1F, 0x20, 0x40, 0x20, 0x1F], [0x7F, 0x20, 0x18, 0x20, 0x7F], [0x63, 0x14, 0x08, 0x14, 0x63],
    [0x03, 0x04, 0x78, 0x04, 0x03], [0x61, 0x51, 0x49, 0x45, 0x43], [0x00, 0x00, 0x7F, 0x41, 0x41],
    [0x02, 0x04, 0x08, 0x10, 0x20], [0x41, 0x41, 0x7F, 0x00, 0x00], [0x04, 0x02, 0x01, 0x02, 0x04],
    [0x40, 0x40, 0x40, 0x40, 0x40], [0x00, 0x01, 0x02, 0x04, 0x00], [0x20, 0x54, 0x54, 0x54, 0x78],
    [0x7F, 0x48, 0x44, 0x44, 0x38], [0x38, 0x44, 0x44, 0x44, 0x20], [0x38, 0x44, 0x44, 0x48, 0x7F],
    [0x38, 0x54, 0x54, 0x54, 0x18], [0x08, 0x7E, 0x09, 0x01, 0x02], [0x08, 0x14, 0x54, 0x54, 0x3C],
    [0x7F, 0x08, 0x04, 0x04, 0x78], [0x00, 0x44, 0x7D, 0x40, 0x00], [0x20, 0x40, 0x44, 0x3D, 0x00],
    [0x00, 0x7F, 0x10, 0x28, 0x44], [0x00, 0x41, 0x7F, 0x40, 0x00], [0x7C, 0x04, 0x18, 0x04, 0x78],
    [0x7C, 0x08, 0x04, 0x04, 0x78], [0x38, 0x44, 0x44, 0x44, 0x38], [0x7C, 0x14, 0x14, 0x14, 0x08],
    [0x08, 0x14, 0x14, 0x18, 0x7C], [0x7C, 0x08, 0x04, 0x04, 0x08], [0x48, 0x54, 0x54, 0x54, 0x20],
    [0x04, 0x3F, 0x44, 0x40, 0x20], [0x3C, 0x40, 0x40, 0x20, 0x7C], [0x1C, 0x20, 0x40, 0x20, 0x1C],
    [0x3C, 0x40, 0x30, 0x40, 0x3C], [0x44, 0x28, 0x10, 0x28, 0x44], [0x0C, 0x50, 0x50, 0x50, 0x3C],
    [0x44, 0x64, 0x54, 0x4C, 0x44], [0x00, 0x08, 0x36, 0x41, 0x00], [0x00, 0x00, 0x7F, 0x00, 0x00],
    [0x00, 0x41, 0x36, 0x08, 0x00], [0x10, 0x08, 0x08, 0x10, 0x08],
];

enum Glyphs {
    Outline(FontVec),
    Bitmap { scale: u32 },
}

/// Font used to render text documents.
pub struct TextFont {
    glyphs: Glyphs,
    size: f32,
    source: Option<PathBuf>,
}

impl TextFont {
    /// Load the first parseable font among `paths`, else the built-in bitmap font.
    pub fn resolve(paths: &[PathBuf], size: f32) -> Self {
        for path in paths {
            let Ok(data) = std::fs::read(path) else {
                continue;
            };
            match FontVec::try_from_vec(data) {
                Ok(font) => {
                    debug!("Using font {}", path.display());
                    return Self {
                        glyphs: Glyphs::Outline(font),
                        size,
                        source: Some(path.clone()),
                    };
                }
                Err(e) => warn!("Ignoring unreadable font {}: {}", path.display(), e),
            }
        }

        debug!("No font file found, using built-in bitmap font");
        Self::builtin(size)
    }

    /// The built-in bitmap font, scaled to roughly match `size`.
    pub fn builtin(size: f32) -> Self {
        let scale = ((size / 8.0).round() as u32).max(1);
        Self {
            glyphs: Glyphs::Bitmap { scale },
            size,
            source: None,
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self.glyphs, Glyphs::Bitmap { .. })
    }

    /// Path of the loaded font file, if an outline font is in use.
    pub fn source(&self) -> Option<&PathBuf> {
        self.source.as_ref()
    }

    /// Rendered width of `text` in pixels.
    pub fn text_width(&self, text: &str) -> u32 {
        match &self.glyphs {
            Glyphs::Outline(font) => text_size(PxScale::from(self.size), font, text).0,
            Glyphs::Bitmap { scale } => {
                let chars = text.chars().count() as u32;
                (chars * 6 * scale).saturating_sub(*scale)
            }
        }
    }

    /// Height of a line of glyphs, measured on "Ag".
    pub fn glyph_height(&self) -> u32 {
        match &self.glyphs {
            Glyphs::Outline(font) => text_size(PxScale::from(self.size), font, "Ag").1.max(1),
            Glyphs::Bitmap { scale } => 8 * scale,
        }
    }

    /// Draw `text` with its top-left corner at `(x, y)`.
    pub fn draw(&self, canvas: &mut RgbImage, x: i32, y: i32, text: &str) {
        match &self.glyphs {
            Glyphs::Outline(font) => {
                draw_text_mut(canvas, INK, x, y, PxScale::from(self.size), font, text);
            }
            Glyphs::Bitmap { scale } => draw_bitmap_text(canvas, x, y, *scale, text),
        }
    }
}

fn bitmap_glyph(c: char) -> &'static [u8; 5] {
    let index = match c {
        ' '..='~' => c as usize - 0x20,
        _ => '?' as usize - 0x20,
    };
    &BITMAP_GLYPHS[index]
}

fn draw_bitmap_text(canvas: &mut RgbImage, x: i32, y: i32, scale: u32, text: &str) {
    let (width, height) = canvas.dimensions();
    let advance = 6 * scale as i32;

    for (i, c) in text.chars().enumerate() {
        let origin_x = x + i as i32 * advance;
        for (col, bits) in bitmap_glyph(c).iter().enumerate() {
            for row in 0..7 {
                if bits & (1 << row) == 0 {
                    continue;
                }
                for dy in 0..scale {
                    for dx in 0..scale {
                        let px = origin_x + (col as u32 * scale + dx) as i32;
                        let py = y + (row * scale + dy) as i32;
                        if px >= 0 && py >= 0 && (px as u32) < width && (py as u32) < height {
                            canvas.put_pixel(px as u32, py as u32, INK);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_paths_fall_back_to_builtin() {
        let font = TextFont::resolve(&[PathBuf::from("/nonexistent/font.ttf")], 17.0);
        assert!(font.is_builtin());
        assert!(font.source().is_none());
    }

    #[test]
    fn test_builtin_metrics() {
        let font = TextFont::builtin(17.0);
        assert_eq!(font.glyph_height(), 16);
        assert_eq!(font.text_width(""), 0);
        assert_eq!(font.text_width("ab"), 22);
    }

    #[test]
    fn test_builtin_draws_ink() {
        let font = TextFont::builtin(8.0);
        let mut canvas = RgbImage::from_pixel(20, 10, Rgb([255, 255, 255]));
        font.draw(&mut canvas, 0, 0, "I");
        assert!(canvas.pixels().any(|p| *p == INK));

        let mut blank = RgbImage::from_pixel(20, 10, Rgb([255, 255, 255]));
        font.draw(&mut blank, 0, 0, " ");
        assert!(blank.pixels().all(|p| *p == Rgb([255, 255, 255])));
    }

    #[test]
    fn test_non_ascii_uses_placeholder() {
        assert_eq!(bitmap_glyph('ł'), bitmap_glyph('?'));
    }
}
