//! Local poster rendering: description text → styled PNG raster.
//!
//! This is the terminal image provider, so it must work with nothing but the
//! crate itself: no network, no API keys, no font files on disk.
//!
//! ## Why compiled-in glyphs?
//!
//! System font discovery differs per platform and fails in minimal
//! containers. The `font8x8` crate embeds a classic 8×8 ASCII bitmap font in
//! the binary, so text drawing can never fail at runtime. Glyphs are scaled
//! by integer factors to stay crisp.
//!
//! Rendering is fully deterministic: the same description and size produce
//! byte-identical PNG output.

use crate::config::ImageSize;
use crate::error::MusegenError;
use font8x8::legacy::BASIC_LEGACY;
use image::{Rgba, RgbaImage};
use std::io::Cursor;
use tracing::debug;

// Ocean Professional palette.
const BACKGROUND: Rgba<u8> = Rgba([15, 23, 42, 255]);
const HEADER_BLUE: Rgba<u8> = Rgba([37, 99, 235, 255]);
const BORDER_AMBER: Rgba<u8> = Rgba([245, 158, 11, 255]);
const TEXT_LIGHT: Rgba<u8> = Rgba([248, 250, 252, 255]);

const BORDER_PX: u32 = 8;
const GLYPH_PX: u32 = 8;
const TITLE_SCALE: u32 = 3;
const BODY_SCALE: u32 = 2;
const BODY_LINE_GAP: u32 = 6;
const BODY_MARGIN: u32 = 48;

const TITLE: &str = "MUSEGEN";

/// Render a description as a poster raster.
///
/// Layout: amber border, blue header band with the title, then the
/// description centered and word-wrapped underneath. Text that cannot fit
/// vertically is dropped rather than shrunk.
pub fn render_poster(description: &str, size: ImageSize) -> RgbaImage {
    let (w, h) = (size.width, size.height);
    let mut img = RgbaImage::from_pixel(w, h, BACKGROUND);

    draw_border(&mut img, BORDER_PX, BORDER_AMBER);

    let band_h = (h / 8).max(6 * GLYPH_PX);
    fill_rect(
        &mut img,
        BORDER_PX,
        BORDER_PX,
        w.saturating_sub(2 * BORDER_PX),
        band_h,
        HEADER_BLUE,
    );

    let title_h = GLYPH_PX * TITLE_SCALE;
    let title_y = BORDER_PX + (band_h.saturating_sub(title_h)) / 2;
    draw_text_centered(&mut img, TITLE, title_y, TITLE_SCALE, TEXT_LIGHT);

    let body_top = BORDER_PX + band_h + 3 * GLYPH_PX;
    let body_bottom = h.saturating_sub(BORDER_PX + 2 * GLYPH_PX);
    let line_h = GLYPH_PX * BODY_SCALE + BODY_LINE_GAP;
    let usable_w = w.saturating_sub(2 * BODY_MARGIN);
    let cols = (usable_w / (GLYPH_PX * BODY_SCALE)).max(1) as usize;

    let mut y = body_top;
    for line in wrap_text(description, cols) {
        if y + line_h > body_bottom {
            break;
        }
        draw_text_centered(&mut img, &line, y, BODY_SCALE, TEXT_LIGHT);
        y += line_h;
    }

    debug!("Rendered poster {}x{} px", w, h);
    img
}

/// Render a poster and encode it as PNG bytes.
pub fn poster_png(description: &str, size: ImageSize) -> Result<Vec<u8>, MusegenError> {
    let img = render_poster(description, size);
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| MusegenError::RenderFailed {
            detail: format!("PNG encoding failed: {e}"),
        })?;
    Ok(buf)
}

fn draw_border(img: &mut RgbaImage, thickness: u32, color: Rgba<u8>) {
    let (w, h) = img.dimensions();
    for y in 0..h {
        for x in 0..w {
            if x < thickness || y < thickness || x >= w - thickness || y >= h - thickness {
                img.put_pixel(x, y, color);
            }
        }
    }
}

fn fill_rect(img: &mut RgbaImage, x0: u32, y0: u32, w: u32, h: u32, color: Rgba<u8>) {
    let (iw, ih) = img.dimensions();
    for y in y0..(y0 + h).min(ih) {
        for x in x0..(x0 + w).min(iw) {
            img.put_pixel(x, y, color);
        }
    }
}

fn draw_text_centered(img: &mut RgbaImage, text: &str, y: u32, scale: u32, color: Rgba<u8>) {
    let (iw, _) = img.dimensions();
    let text_w = text.chars().count() as u32 * GLYPH_PX * scale;
    let x0 = iw.saturating_sub(text_w) / 2;
    let mut x = x0;
    for ch in text.chars() {
        draw_glyph(img, ch, x, y, scale, color);
        x += GLYPH_PX * scale;
    }
}

/// Draw one glyph. Characters outside the 8×8 font's ASCII range render
/// as `?`.
fn draw_glyph(img: &mut RgbaImage, ch: char, x0: u32, y0: u32, scale: u32, color: Rgba<u8>) {
    let (iw, ih) = img.dimensions();
    let idx = ch as usize;
    let glyph = if idx < BASIC_LEGACY.len() {
        BASIC_LEGACY[idx]
    } else {
        BASIC_LEGACY[b'?' as usize]
    };
    for (row, bits) in glyph.iter().enumerate() {
        for col in 0..8u32 {
            if bits & (1 << col) == 0 {
                continue;
            }
            for dy in 0..scale {
                for dx in 0..scale {
                    let x = x0 + col * scale + dx;
                    let y = y0 + row as u32 * scale + dy;
                    if x < iw && y < ih {
                        img.put_pixel(x, y, color);
                    }
                }
            }
        }
    }
}

/// Greedy word wrap for the poster body. Words longer than `cols` are kept
/// whole and clipped by the border when drawn.
fn wrap_text(text: &str, cols: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut buf: Vec<&str> = Vec::new();
    let mut used = 0usize;
    for word in text.split_whitespace() {
        let len = word.chars().count();
        if used + len + 1 > cols && !buf.is_empty() {
            lines.push(buf.join(" "));
            buf = vec![word];
            used = len;
        } else {
            buf.push(word);
            used += len + 1;
        }
    }
    if !buf.is_empty() {
        lines.push(buf.join(" "));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size() -> ImageSize {
        ImageSize::default()
    }

    #[test]
    fn poster_has_requested_dimensions() {
        let img = render_poster("A small test description.", size());
        assert_eq!(img.dimensions(), (1024, 1024));

        let custom = ImageSize {
            width: 640,
            height: 480,
        };
        let img = render_poster("Another description.", custom);
        assert_eq!(img.dimensions(), (640, 480));
    }

    #[test]
    fn rendering_is_deterministic() {
        let a = poster_png("Same input, same output.", size()).unwrap();
        let b = poster_png("Same input, same output.", size()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn border_and_header_use_theme_colors() {
        let img = render_poster("Theme check.", size());
        assert_eq!(*img.get_pixel(0, 0), BORDER_AMBER);
        assert_eq!(*img.get_pixel(1023, 1023), BORDER_AMBER);
        // Inside the header band but away from the title glyphs.
        assert_eq!(*img.get_pixel(BORDER_PX + 2, BORDER_PX + 2), HEADER_BLUE);
    }

    #[test]
    fn empty_description_still_renders() {
        let img = render_poster("", size());
        assert_eq!(img.dimensions(), (1024, 1024));
    }

    #[test]
    fn png_bytes_decode_back_to_same_dimensions() {
        let bytes = poster_png("Round trip.", size()).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.width(), 1024);
        assert_eq!(decoded.height(), 1024);
    }

    #[test]
    fn wrap_respects_column_budget() {
        let lines = wrap_text("one two three four five six seven eight", 12);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(line.chars().count() <= 12, "line too long: {line:?}");
        }
    }
}
