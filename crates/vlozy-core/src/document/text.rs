//! Plain-text documents rendered as a synthetic page image.

use std::borrow::Cow;

use image::{Rgb, RgbImage};

use super::font::TextFont;
use crate::models::config::DocumentConfig;

/// Decode bytes as UTF-8, falling back to Latin-1 so decoding never fails.
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => Cow::Owned(bytes.iter().map(|&b| b as char).collect()),
    }
}

/// Greedy word wrap of every source line to `width` columns.
///
/// Whitespace runs collapse to one space, words longer than the width are
/// split across lines, and each blank source line yields one empty line.
pub fn wrap_lines(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut wrapped = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            wrapped.push(String::new());
            continue;
        }

        let mut current = String::new();
        let mut current_len = 0usize;

        for word in line.split_whitespace() {
            let mut rest: Vec<char> = word.chars().collect();

            while !rest.is_empty() {
                let needed = if current_len == 0 {
                    rest.len()
                } else {
                    current_len + 1 + rest.len()
                };

                if needed <= width {
                    if current_len > 0 {
                        current.push(' ');
                        current_len += 1;
                    }
                    current.extend(rest.iter());
                    current_len += rest.len();
                    break;
                }

                if rest.len() > width {
                    let room = if current_len == 0 {
                        width
                    } else {
                        width.saturating_sub(current_len + 1)
                    };
                    if room > 0 {
                        if current_len > 0 {
                            current.push(' ');
                        }
                        current.extend(rest.drain(..room));
                    }
                }

                wrapped.push(std::mem::take(&mut current));
                current_len = 0;
            }
        }

        if current_len > 0 {
            wrapped.push(current);
        }
    }

    wrapped
}

/// Render text black-on-white, one wrapped line per row at a fixed pitch.
pub fn render_text(text: &str, font: &TextFont, config: &DocumentConfig) -> RgbImage {
    let lines = wrap_lines(text, config.wrap_columns);
    let margin = config.margin;
    let pitch = font.glyph_height() + config.line_spacing;

    let text_width = lines
        .iter()
        .map(|line| font.text_width(line))
        .max()
        .unwrap_or(0);

    let width = (text_width + 2 * margin).max(1);
    let height = (pitch * lines.len() as u32 + 2 * margin).max(1);

    let mut canvas = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));

    let mut y = margin as i32;
    for line in &lines {
        if !line.is_empty() {
            font.draw(&mut canvas, margin as i32, y, line);
        }
        y += pitch as i32;
    }

    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_utf8() {
        assert_eq!(decode_text("Faktura nr 12".as_bytes()), "Faktura nr 12");
    }

    #[test]
    fn test_decode_latin1_fallback() {
        assert_eq!(decode_text(&[0x63, 0x61, 0x66, 0xE9]), "café");
    }

    #[test]
    fn test_wrap_short_lines_untouched() {
        assert_eq!(wrap_lines("Invoice 42\nTotal 12 34", 100), vec!["Invoice 42", "Total 12 34"]);
    }

    #[test]
    fn test_wrap_preserves_blank_lines() {
        assert_eq!(wrap_lines("a\n\n   \nb", 100), vec!["a", "", "", "b"]);
    }

    #[test]
    fn test_wrap_breaks_on_words() {
        assert_eq!(
            wrap_lines("aaa bbb ccc", 7),
            vec!["aaa bbb", "ccc"]
        );
    }

    #[test]
    fn test_wrap_splits_long_words() {
        assert_eq!(wrap_lines("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(wrap_lines("ab cdefghij", 5), vec!["ab cd", "efghi", "j"]);
    }

    #[test]
    fn test_wrap_collapses_whitespace() {
        assert_eq!(wrap_lines("a \t  b", 100), vec!["a b"]);
    }

    #[test]
    fn test_render_canvas_size() {
        let font = TextFont::builtin(17.0);
        let config = DocumentConfig::default();
        let image = render_text("ab\n\ncd", &font, &config);

        let pitch = font.glyph_height() + config.line_spacing;
        assert_eq!(image.width(), font.text_width("ab") + 2 * config.margin);
        assert_eq!(image.height(), pitch * 3 + 2 * config.margin);
    }

    #[test]
    fn test_render_empty_text() {
        let font = TextFont::builtin(17.0);
        let image = render_text("", &font, &DocumentConfig::default());
        assert_eq!(image.dimensions(), (40, 40));
        assert!(image.pixels().all(|p| *p == Rgb([255, 255, 255])));
    }

    #[test]
    fn test_render_is_deterministic() {
        let font = TextFont::builtin(17.0);
        let config = DocumentConfig::default();
        let a = render_text("Invoice 42", &font, &config);
        let b = render_text("Invoice 42", &font, &config);
        assert_eq!(a.as_raw(), b.as_raw());
    }
}
