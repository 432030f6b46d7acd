use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, RgbImage};
use imageproc::drawing::{draw_cross_mut, draw_hollow_rect_mut};
use log::{info, warn};

use crate::detect::{DetectionResult, ScoredQuestion};
use crate::geometry::center_of_rect;
use crate::image_utils::{BLUE, DARK_GREEN, GREEN, RED};

/// Creates a path for a debug image.
pub fn debug_image_path(base: &Path, label: &str) -> PathBuf {
    let mut result = PathBuf::from(base);
    result.set_file_name(format!(
        "{}_debug_{}.png",
        base.file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("image"),
        label
    ));
    result
}

/// Writes annotated copies of a scan next to it, or does nothing when
/// disabled.
pub struct ImageDebugWriter {
    input_path: PathBuf,
    input_image: Option<GrayImage>,
}

impl ImageDebugWriter {
    pub fn new(input_path: PathBuf, input_image: GrayImage) -> Self {
        Self {
            input_path,
            input_image: Some(input_image),
        }
    }

    pub fn disabled() -> Self {
        Self {
            input_path: PathBuf::new(),
            input_image: None,
        }
    }

    /// Draws on a color copy of the input and saves it under `label`.
    /// Returns the path written, if any.
    pub fn write(&self, label: &str, draw: impl FnOnce(&mut RgbImage)) -> Option<PathBuf> {
        let input_image = self.input_image.as_ref()?;
        let mut canvas = DynamicImage::ImageLuma8(input_image.clone()).into_rgb8();
        draw(&mut canvas);

        let path = debug_image_path(&self.input_path, label);
        match canvas.save(&path) {
            Ok(()) => {
                info!("wrote debug image {}", path.display());
                Some(path)
            }
            Err(e) => {
                warn!("unable to write debug image {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// Outlines every sampled window. The chosen option of each question is
/// drawn in green with a cross at its center; windows that were over the
/// threshold but lost to an earlier option are drawn in red.
pub fn draw_scored_questions_debug_image_mut(
    canvas: &mut RgbImage,
    scored_questions: &[ScoredQuestion],
    fill_threshold: f32,
) {
    for scored_question in scored_questions {
        let marked_index = match scored_question.result {
            DetectionResult::Marked { index, .. } => Some(index),
            DetectionResult::Unanswered => None,
        };

        for (index, bubble) in scored_question.bubbles.iter().enumerate() {
            let bounds = match bubble.bounds {
                Some(bounds) => bounds,
                None => continue,
            };

            if Some(index) == marked_index {
                draw_hollow_rect_mut(canvas, bounds, GREEN);
                let center = center_of_rect(&bounds);
                draw_cross_mut(
                    canvas,
                    DARK_GREEN,
                    center.x.round() as i32,
                    center.y.round() as i32,
                );
            } else if bubble.fill_ratio > fill_threshold {
                draw_hollow_rect_mut(canvas, bounds, RED);
            } else {
                draw_hollow_rect_mut(canvas, bounds, BLUE);
            }
        }
    }
}
