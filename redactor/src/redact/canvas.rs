//! The drawing surface image redaction writes through.
//!
//! [`RgbImage`] implements [`Canvas`] with a built-in 3x5 bitmap face that
//! covers the placeholder alphabet, scaled up to fit the target box.

use ::image::{Rgb, RgbImage};

use crate::{config::Color, entity::BoundingBox};

/// A mutable raster that can be painted over.
///
/// Rectangles use exclusive `x2`/`y2` bounds. Implementations clip anything
/// outside their own dimensions.
pub trait Canvas {
    fn dimensions(&self) -> (u32, u32);

    fn fill_rect(&mut self, rect: BoundingBox, color: Color);

    /// Draws `text` centered in `rect`. Returns false if it does not fit.
    fn draw_centered_text(&mut self, rect: BoundingBox, text: &str, color: Color) -> bool;
}

const GLYPH_WIDTH: u32 = 3;
const GLYPH_HEIGHT: u32 = 5;
const MAX_SCALE: u32 = 4;

/// Rows top to bottom; bit 2 is the leftmost column.
fn glyph(c: char) -> [u8; 5] {
    match c.to_ascii_uppercase() {
        'A' => [0b010, 0b101, 0b111, 0b101, 0b101],
        'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'C' => [0b011, 0b100, 0b100, 0b100, 0b011],
        'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'E' => [0b111, 0b100, 0b110, 0b100, 0b111],
        'F' => [0b111, 0b100, 0b110, 0b100, 0b100],
        'G' => [0b011, 0b100, 0b101, 0b101, 0b011],
        'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'J' => [0b001, 0b001, 0b001, 0b101, 0b010],
        'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'M' => [0b101, 0b111, 0b111, 0b101, 0b101],
        'N' => [0b110, 0b101, 0b101, 0b101, 0b101],
        'O' => [0b010, 0b101, 0b101, 0b101, 0b010],
        'P' => [0b110, 0b101, 0b110, 0b100, 0b100],
        'Q' => [0b010, 0b101, 0b101, 0b110, 0b011],
        'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        'S' => [0b011, 0b100, 0b010, 0b001, 0b110],
        'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'V' => [0b101, 0b101, 0b101, 0b101, 0b010],
        'W' => [0b101, 0b101, 0b111, 0b111, 0b101],
        'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'Y' => [0b101, 0b101, 0b010, 0b010, 0b010],
        'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b110, 0b001, 0b010, 0b100, 0b111],
        '3' => [0b110, 0b001, 0b010, 0b001, 0b110],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b110, 0b001, 0b110],
        '6' => [0b011, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b010, 0b010, 0b010],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b110],
        '_' => [0b000, 0b000, 0b000, 0b000, 0b111],
        '[' => [0b110, 0b100, 0b100, 0b100, 0b110],
        ']' => [0b011, 0b001, 0b001, 0b001, 0b011],
        _ => [0; 5],
    }
}

/// Width in glyph units: one column of spacing between glyphs.
fn text_units(text: &str) -> u32 {
    let chars = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
    chars.saturating_mul(GLYPH_WIDTH + 1).saturating_sub(1)
}

impl Canvas for RgbImage {
    fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    fn fill_rect(&mut self, rect: BoundingBox, color: Color) {
        let rect = rect.clamp_to(self.width(), self.height());
        for y in rect.y1..rect.y2 {
            for x in rect.x1..rect.x2 {
                self.put_pixel(x, y, Rgb(color));
            }
        }
    }

    fn draw_centered_text(&mut self, rect: BoundingBox, text: &str, color: Color) -> bool {
        let rect = rect.clamp_to(self.width(), self.height());
        let units = text_units(text);
        if units == 0 {
            return false;
        }
        // One pixel of padding on each side.
        let room_x = rect.width().saturating_sub(2);
        let room_y = rect.height().saturating_sub(2);
        let scale = (room_x / units).min(room_y / GLYPH_HEIGHT).min(MAX_SCALE);
        if scale == 0 {
            return false;
        }

        let origin_x = rect.x1 + (rect.width() - units * scale) / 2;
        let origin_y = rect.y1 + (rect.height() - GLYPH_HEIGHT * scale) / 2;
        for (index, c) in (0u32..).zip(text.chars()) {
            let left = origin_x + index * (GLYPH_WIDTH + 1) * scale;
            for (row, bits) in (0u32..).zip(glyph(c)) {
                for column in 0..GLYPH_WIDTH {
                    if bits & (0b100 >> column) == 0 {
                        continue;
                    }
                    let cell = BoundingBox::new(
                        left + column * scale,
                        origin_y + row * scale,
                        left + (column + 1) * scale,
                        origin_y + (row + 1) * scale,
                    );
                    self.fill_rect(cell, color);
                }
            }
        }
        true
    }
}
