use image::GrayImage;
use imageproc::point::Point;
use imageproc::rect::Rect;

/// Inclusive axis-aligned bounds of a point set: a single point is 1x1.
pub fn bounding_rect_from_points(points: &[Point<u32>]) -> Option<Rect> {
    let first = points.first()?;
    let mut min_x = first.x;
    let mut min_y = first.y;
    let mut max_x = first.x;
    let mut max_y = first.y;

    for point in points {
        min_x = min_x.min(point.x);
        min_y = min_y.min(point.y);
        max_x = max_x.max(point.x);
        max_y = max_y.max(point.y);
    }

    Some(Rect::at(min_x as i32, min_y as i32).of_size(max_x - min_x + 1, max_y - min_y + 1))
}

/// Foreground (255) where `luma <= level`, background (0) elsewhere.
pub fn binarize_inverted(luma: &GrayImage, level: u8) -> GrayImage {
    let mut binary = GrayImage::new(luma.width(), luma.height());
    for (x, y, pixel) in luma.enumerate_pixels() {
        if pixel[0] <= level {
            binary.put_pixel(x, y, image::Luma([255u8]));
        }
    }
    binary
}

pub fn is_uniform(luma: &GrayImage) -> bool {
    let mut pixels = luma.pixels();
    match pixels.next() {
        Some(first) => pixels.all(|p| p == first),
        None => true,
    }
}
