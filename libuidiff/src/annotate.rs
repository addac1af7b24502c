//! Drawing region outlines and labels on the new-version raster.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::region::DiffRegion;

const OUTLINE: Rgb<u8> = Rgb([255, 0, 0]);
const OUTLINE_WIDTH: u32 = 2;
const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;
const LABEL_GAP: u32 = 2;

/// Copy of `raster` with every region outlined and tagged with its kind.
pub fn annotate(raster: &RgbImage, regions: &[DiffRegion]) -> RgbImage {
    let mut canvas = raster.clone();
    for region in regions {
        outline(&mut canvas, region);
        let label_y = if region.y >= GLYPH_HEIGHT + LABEL_GAP {
            region.y - GLYPH_HEIGHT - LABEL_GAP
        } else {
            region.y + OUTLINE_WIDTH + 1
        };
        draw_label(&mut canvas, region.kind.label(), region.x, label_y, OUTLINE);
    }
    canvas
}

fn outline(canvas: &mut RgbImage, region: &DiffRegion) {
    for inset in 0..OUTLINE_WIDTH {
        let w = region.width.saturating_sub(2 * inset);
        let h = region.height.saturating_sub(2 * inset);
        if w == 0 || h == 0 {
            break;
        }
        let rect = Rect::at((region.x + inset) as i32, (region.y + inset) as i32).of_size(w, h);
        draw_hollow_rect_mut(canvas, rect, OUTLINE);
    }
}

/// 5x7 bitmap glyphs, one row per byte, most significant of 5 bits leftmost.
fn glyph(c: char) -> [u8; 7] {
    match c.to_ascii_uppercase() {
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'G' => [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111],
        'I' => [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'L' => [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
        'N' => [0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'S' => [0b01110, 0b10001, 0b10000, 0b01110, 0b00001, 0b10001, 0b01110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'U' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'Y' => [0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100, 0b00100],
        'Z' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111],
        ' ' => [0; 7],
        _ => [0b11111, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11111],
    }
}

fn draw_label(canvas: &mut RgbImage, text: &str, x: u32, y: u32, color: Rgb<u8>) {
    let (width, height) = canvas.dimensions();
    let mut cursor_x = x;

    for c in text.chars() {
        for (row, &bits) in glyph(c).iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if (bits >> (GLYPH_WIDTH - 1 - col)) & 1 == 1 {
                    let px = cursor_x + col;
                    let py = y + row as u32;
                    if px < width && py < height {
                        canvas.put_pixel(px, py, color);
                    }
                }
            }
        }
        cursor_x += GLYPH_WIDTH + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_regions_leaves_raster_untouched() {
        let raster = RgbImage::from_pixel(50, 50, Rgb([255, 255, 255]));
        assert_eq!(annotate(&raster, &[]), raster);
    }

    #[test]
    fn test_outline_is_drawn_on_region_border() {
        let raster = RgbImage::from_pixel(100, 100, Rgb([255, 255, 255]));
        let region = DiffRegion::new(20, 30, 40, 20);
        let out = annotate(&raster, &[region]);
        assert_eq!(out.get_pixel(20, 30), &OUTLINE);
        assert_eq!(out.get_pixel(21, 31), &OUTLINE);
        assert_eq!(out.get_pixel(59, 49), &OUTLINE);
        assert_eq!(out.get_pixel(40, 40), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_label_sits_above_or_inside_region() {
        let raster = RgbImage::from_pixel(100, 100, Rgb([255, 255, 255]));
        let low = annotate(&raster, &[DiffRegion::new(10, 40, 60, 10)]);
        let painted_above = (31..40).any(|y| (10..70).any(|x| low.get_pixel(x, y) == &OUTLINE));
        assert!(painted_above);

        let top = annotate(&raster, &[DiffRegion::new(0, 0, 90, 12)]);
        assert_eq!(top.dimensions(), (100, 100));
    }

    #[test]
    fn test_labels_are_clipped_at_canvas_edge() {
        let raster = RgbImage::from_pixel(12, 12, Rgb([0, 0, 0]));
        let out = annotate(&raster, &[DiffRegion::new(8, 0, 4, 12)]);
        assert_eq!(out.dimensions(), (12, 12));
    }
}
