use imageproc::point::Point;
use imageproc::rect::Rect;

use crate::template::{SamplePoint, SampleWindow};

/// The full, unclipped window sampled around `center`, or `None` when the
/// window does not fit in pixel coordinate space and so cannot overlap any
/// image.
pub fn sample_window_rect(center: &SamplePoint, window: &SampleWindow) -> Option<Rect> {
    let width = i64::from(window.half_width) * 2;
    let height = i64::from(window.half_height) * 2;
    let left = i64::from(center.x) - i64::from(window.half_width);
    let top = i64::from(center.y) - i64::from(window.half_height);
    let right = left + width - 1;
    let bottom = top + height - 1;

    let coordinate_range = i64::from(i32::MIN)..=i64::from(i32::MAX);
    if width == 0
        || height == 0
        || !coordinate_range.contains(&left)
        || !coordinate_range.contains(&top)
        || !coordinate_range.contains(&right)
        || !coordinate_range.contains(&bottom)
    {
        return None;
    }

    Some(Rect::at(left as i32, top as i32).of_size(width as u32, height as u32))
}

/// Clips `rect` to `bounds`, returning `None` when they do not overlap.
pub fn clip_rect(rect: &Rect, bounds: &Rect) -> Option<Rect> {
    rect.intersect(*bounds)
}

pub fn center_of_rect(rect: &Rect) -> Point<f32> {
    Point::new(
        rect.left() as f32 + rect.width() as f32 / 2.0,
        rect.top() as f32 + rect.height() as f32 / 2.0,
    )
}
