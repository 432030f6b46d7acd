use image::{GrayImage, Luma, Rgb};
use imageproc::{contrast::threshold, rect::Rect};
use logging_timer::time;
use thiserror::Error;

pub const WHITE: Luma<u8> = Luma([u8::MAX]);
pub const BLACK: Luma<u8> = Luma([u8::MIN]);

/// Pixels of this value are pen or pencil marks; everything else is paper.
pub const INK: Luma<u8> = BLACK;

pub const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
pub const DARK_GREEN: Rgb<u8> = Rgb([0, 127, 0]);
pub const BLUE: Rgb<u8> = Rgb([0, 0, 255]);
pub const RED: Rgb<u8> = Rgb([255, 0, 0]);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("pixel at ({x}, {y}) has luma {value}; a binarized image may only contain 0 and 255")]
pub struct ImageFormatError {
    pub x: u32,
    pub y: u32,
    pub value: u8,
}

/// A grayscale image whose every pixel is either [`INK`] or [`WHITE`].
#[derive(Debug, Clone)]
pub struct BinarizedImage {
    img: GrayImage,
}

impl BinarizedImage {
    /// Accepts an image that was already reduced to two classes elsewhere.
    pub fn try_from_gray(img: GrayImage) -> Result<Self, ImageFormatError> {
        if let Some((x, y, pixel)) = img
            .enumerate_pixels()
            .find(|(_, _, p)| **p != BLACK && **p != WHITE)
        {
            return Err(ImageFormatError {
                x,
                y,
                value: pixel.0[0],
            });
        }

        Ok(Self { img })
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.img
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.img.dimensions()
    }

    pub fn bounds(&self) -> Option<Rect> {
        let (width, height) = self.dimensions();
        if width == 0 || height == 0 {
            return None;
        }
        Some(Rect::at(0, 0).of_size(width, height))
    }
}

/// Reduces a grayscale scan to ink and paper. Pixels at or below `level`
/// become ink.
#[time]
pub fn binarize(img: &GrayImage, level: u8) -> BinarizedImage {
    BinarizedImage {
        img: threshold(img, level),
    }
}

/// Determines the number of pixels within `rect` that match the given luma.
/// `rect` must lie within the image.
pub fn count_pixels_in_rect(img: &GrayImage, rect: &Rect, luma: &Luma<u8>) -> u32 {
    let mut count = 0;
    for y in rect.top()..=rect.bottom() {
        for x in rect.left()..=rect.right() {
            if img.get_pixel(x as u32, y as u32) == luma {
                count += 1;
            }
        }
    }
    count
}

/// Determines the ratio of pixels within `rect` that match the given luma.
pub fn ratio_in_rect(img: &GrayImage, rect: &Rect, luma: &Luma<u8>) -> f32 {
    let total = rect.width() * rect.height();
    count_pixels_in_rect(img, rect, luma) as f32 / total as f32
}
