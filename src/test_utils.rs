use image::GrayImage;

use crate::geometry::sample_window_rect;
use crate::image_utils::{BLACK, WHITE};
use crate::template::{
    MultipleMarkPolicy, QuestionLayout, SamplePoint, SampleWindow, SheetTemplate,
};
use crate::types::OptionLabel;

const MARGIN: u32 = 10;
const SPACING: u32 = 20;

pub fn labels(labels: &[&str]) -> Vec<OptionLabel> {
    labels.iter().map(|label| OptionLabel::from(*label)).collect()
}

/// A template laying out `questions` rows of bubbles on a regular grid.
pub fn row_template(option_labels: &[&str], questions: u32) -> SheetTemplate {
    SheetTemplate {
        title: "test sheet".to_string(),
        option_labels: labels(option_labels),
        sample_window: SampleWindow::default(),
        mark_threshold: 0.5,
        binarize_level: 165,
        multiple_marks: MultipleMarkPolicy::FirstWins,
        questions: (0..questions)
            .map(|row| QuestionLayout {
                sample_points: (0..option_labels.len() as u32)
                    .map(|column| {
                        SamplePoint::new(MARGIN + column * SPACING, MARGIN + row * SPACING)
                    })
                    .collect(),
            })
            .collect(),
    }
}

/// An unmarked sheet large enough to hold every window of `template`.
pub fn blank_sheet(template: &SheetTemplate) -> GrayImage {
    let columns = template.option_labels.len() as u32;
    let rows = template.questions.len() as u32;
    GrayImage::from_pixel(
        MARGIN * 2 + columns * SPACING,
        MARGIN * 2 + rows * SPACING,
        WHITE,
    )
}

/// Blackens the leading `fill_ratio` share of the window around `center`.
pub fn fill_window(img: &mut GrayImage, center: &SamplePoint, fill_ratio: f32) {
    let rect = sample_window_rect(center, &SampleWindow::default()).expect("window fits");
    let total = rect.width() * rect.height();
    let count = (fill_ratio * total as f32).round() as u32;

    for i in 0..count {
        let x = rect.left() + (i % rect.width()) as i32;
        let y = rect.top() + (i / rect.width()) as i32;
        img.put_pixel(x as u32, y as u32, BLACK);
    }
}
