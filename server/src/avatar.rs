//! Player decoration: a small round RGBA badge in the player's colour
//! marked with the initial of their name, encoded as PNG and shipped to
//! clients as base64.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{ImageFormat, ImageResult, Rgba, RgbaImage};
use std::io::Cursor;

pub const AVATAR_SIZE: u32 = 28;

const WHITE: [u8; 3] = [255, 255, 255];

/// Scale of the 3x5 initial glyph
const GLYPH_SCALE: u32 = 2;

/// 3x5 bitmaps for `A-Z` then `0-9`, one row per byte, high bit on the left
static GLYPHS: [[u8; 5]; 36] = [
    [0b010, 0b101, 0b111, 0b101, 0b101],
    [0b110, 0b101, 0b110, 0b101, 0b110],
    [0b011, 0b100, 0b100, 0b100, 0b011],
    [0b110, 0b101, 0b101, 0b101, 0b110],
    [0b111, 0b100, 0b110, 0b100, 0b111],
    [0b111, 0b100, 0b110, 0b100, 0b100],
    [0b011, 0b100, 0b101, 0b101, 0b011],
    [0b101, 0b101, 0b111, 0b101, 0b101],
    [0b111, 0b010, 0b010, 0b010, 0b111],
    [0b001, 0b001, 0b001, 0b101, 0b010],
    [0b101, 0b101, 0b110, 0b101, 0b101],
    [0b100, 0b100, 0b100, 0b100, 0b111],
    [0b101, 0b111, 0b111, 0b101, 0b101],
    [0b110, 0b101, 0b101, 0b101, 0b101],
    [0b010, 0b101, 0b101, 0b101, 0b010],
    [0b110, 0b101, 0b110, 0b100, 0b100],
    [0b010, 0b101, 0b101, 0b110, 0b011],
    [0b110, 0b101, 0b110, 0b101, 0b101],
    [0b011, 0b100, 0b010, 0b001, 0b110],
    [0b111, 0b010, 0b010, 0b010, 0b010],
    [0b101, 0b101, 0b101, 0b101, 0b111],
    [0b101, 0b101, 0b101, 0b101, 0b010],
    [0b101, 0b101, 0b111, 0b111, 0b101],
    [0b101, 0b101, 0b010, 0b101, 0b101],
    [0b101, 0b101, 0b010, 0b010, 0b010],
    [0b111, 0b001, 0b010, 0b100, 0b111],
    [0b111, 0b101, 0b101, 0b101, 0b111],
    [0b010, 0b110, 0b010, 0b010, 0b111],
    [0b110, 0b001, 0b010, 0b100, 0b111],
    [0b110, 0b001, 0b010, 0b001, 0b110],
    [0b101, 0b101, 0b111, 0b001, 0b001],
    [0b111, 0b100, 0b110, 0b001, 0b110],
    [0b011, 0b100, 0b111, 0b101, 0b111],
    [0b111, 0b001, 0b010, 0b010, 0b010],
    [0b111, 0b101, 0b111, 0b101, 0b111],
    [0b111, 0b101, 0b111, 0b001, 0b110],
];

fn glyph_for(name: &str) -> Option<&'static [u8; 5]> {
    let initial = name.trim().chars().next()?.to_ascii_uppercase();
    match initial {
        'A'..='Z' => Some(&GLYPHS[(initial as u8 - b'A') as usize]),
        '0'..='9' => Some(&GLYPHS[26 + (initial as u8 - b'0') as usize]),
        _ => None,
    }
}

/// Straight-alpha "over" compositing of one source colour onto a pixel
fn blend(dst: &mut Rgba<u8>, rgb: [u8; 3], alpha: u8) {
    let sa = alpha as f32 / 255.0;
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return;
    }

    for channel in 0..3 {
        let sc = rgb[channel] as f32;
        let dc = dst[channel] as f32;
        let value = (sc * sa + dc * da * (1.0 - sa)) / out_a;
        dst[channel] = value.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round() as u8;
}

/// Fills the ellipse inscribed in `[x0, y0, x1, y1]`, leaving a hole of
/// `inner` pixels radius. Boxes may extend past the image.
fn fill_ring(img: &mut RgbaImage, bounds: [f32; 4], inner: f32, rgb: [u8; 3], alpha: u8) {
    let [x0, y0, x1, y1] = bounds;
    let cx = (x0 + x1) / 2.0;
    let cy = (y0 + y1) / 2.0;
    let rx = (x1 - x0) / 2.0;
    let ry = (y1 - y0) / 2.0;

    for (px, py, pixel) in img.enumerate_pixels_mut() {
        let dx = (px as f32 + 0.5 - cx) / rx;
        let dy = (py as f32 + 0.5 - cy) / ry;
        let dist = (dx * dx + dy * dy).sqrt();
        if dist > 1.0 || dist * rx < inner {
            continue;
        }
        blend(pixel, rgb, alpha);
    }
}

fn fill_ellipse(img: &mut RgbaImage, bounds: [f32; 4], rgb: [u8; 3], alpha: u8) {
    fill_ring(img, bounds, 0.0, rgb, alpha);
}

/// Draws `glyph` centred on the badge
fn draw_glyph(img: &mut RgbaImage, glyph: &[u8; 5]) {
    let left = AVATAR_SIZE / 2 - 3 * GLYPH_SCALE / 2;
    let top = AVATAR_SIZE / 2 - 5 * GLYPH_SCALE / 2;

    for (row, bits) in glyph.iter().enumerate() {
        for col in 0..3u32 {
            if bits & (0b100 >> col) == 0 {
                continue;
            }
            for dy in 0..GLYPH_SCALE {
                for dx in 0..GLYPH_SCALE {
                    let x = left + col * GLYPH_SCALE + dx;
                    let y = top + row as u32 * GLYPH_SCALE + dy;
                    img.put_pixel(x, y, Rgba([WHITE[0], WHITE[1], WHITE[2], 255]));
                }
            }
        }
    }
}

fn draw_badge(rgb: [u8; 3], name: &str) -> RgbaImage {
    let size = AVATAR_SIZE as f32;
    let mut img = RgbaImage::new(AVATAR_SIZE, AVATAR_SIZE);

    // Glow, widest ring first so the inner rings stack on top
    for i in (0..3).rev() {
        let spread = i as f32;
        let alpha = 50 - i * 15;
        fill_ellipse(
            &mut img,
            [1.0 - spread, 1.0 - spread, size - 1.0 + spread, size - 1.0 + spread],
            rgb,
            alpha as u8,
        );
    }

    let body = [3.0, 3.0, size - 3.0, size - 3.0];
    fill_ellipse(&mut img, body, rgb, 255);
    fill_ring(&mut img, body, (size - 6.0) / 2.0 - 2.0, WHITE, 255);

    let highlight = rgb.map(|c| c.saturating_add(60));
    fill_ellipse(&mut img, [6.0, 6.0, size / 2.0, size / 2.0], highlight, 255);

    match glyph_for(name) {
        Some(glyph) => draw_glyph(&mut img, glyph),
        None => {
            let mid = size / 2.0;
            fill_ellipse(&mut img, [mid - 2.0, mid - 2.0, mid + 2.0, mid + 2.0], WHITE, 255);
        }
    }
    img
}

/// Renders the avatar for a player colour and name as PNG bytes
pub fn render_avatar(rgb: [u8; 3], name: &str) -> ImageResult<Vec<u8>> {
    let img = draw_badge(rgb, name);
    let mut cursor = Cursor::new(Vec::new());
    img.write_to(&mut cursor, ImageFormat::Png)?;
    Ok(cursor.into_inner())
}

/// Renders the avatar and returns it base64-encoded, as sent on the wire
pub fn render_avatar_base64(rgb: [u8; 3], name: &str) -> ImageResult<String> {
    Ok(STANDARD.encode(render_avatar(rgb, name)?))
}
