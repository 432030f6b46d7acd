use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{OptionLabel, QuestionNumber, Size};

pub const DEFAULT_MARK_THRESHOLD: f32 = 0.5;
pub const DEFAULT_BINARIZE_LEVEL: u8 = 165;
pub const DEFAULT_SAMPLE_WINDOW_HALF_SIZE: u32 = 5;

/// Largest half size whose full window still fits pixel coordinate space.
pub const MAX_SAMPLE_WINDOW_HALF_SIZE: u32 = i32::MAX as u32 / 2;

/// A static answer sheet layout: the option alphabet and, for every question,
/// where each option's bubble is sampled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetTemplate {
    pub title: String,
    pub option_labels: Vec<OptionLabel>,
    #[serde(default)]
    pub sample_window: SampleWindow,
    #[serde(default = "default_mark_threshold")]
    pub mark_threshold: f32,
    #[serde(default = "default_binarize_level")]
    pub binarize_level: u8,
    #[serde(default)]
    pub multiple_marks: MultipleMarkPolicy,
    pub questions: Vec<QuestionLayout>,
}

/// The ordered sample points of one question, one per option label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionLayout {
    pub sample_points: Vec<SamplePoint>,
}

/// Pixel coordinate of a bubble center. Written as `[x, y]` in templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplePoint {
    pub x: u32,
    pub y: u32,
}

impl SamplePoint {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Half extents of the square sampled around each point. A half size of 5
/// samples the 10x10 region `[x - 5, x + 5) x [y - 5, y + 5)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleWindow {
    pub half_width: u32,
    pub half_height: u32,
}

impl SampleWindow {
    pub fn size(&self) -> Size<u32> {
        Size {
            width: self.half_width * 2,
            height: self.half_height * 2,
        }
    }
}

impl Default for SampleWindow {
    fn default() -> Self {
        Self {
            half_width: DEFAULT_SAMPLE_WINDOW_HALF_SIZE,
            half_height: DEFAULT_SAMPLE_WINDOW_HALF_SIZE,
        }
    }
}

/// What to do when more than one option of a question exceeds the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MultipleMarkPolicy {
    /// Keep the first option holding the highest fill ratio.
    #[default]
    FirstWins,

    /// Fail detection for the sheet.
    Reject,
}

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("unable to read template {}: {1}", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("unable to parse template: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("template defines no option labels")]
    EmptyAlphabet,

    #[error("option label {0} appears more than once")]
    DuplicateLabel(OptionLabel),

    #[error("question {question} has {actual} sample points but the template defines {expected} option labels")]
    InvalidLayout {
        question: QuestionNumber,
        expected: usize,
        actual: usize,
    },

    #[error("mark threshold {0} must be between 0 and 1 exclusive")]
    InvalidThreshold(f32),

    #[error("sample window must be at least one pixel in each direction")]
    EmptySampleWindow,

    #[error("sample window half size {0} exceeds the maximum of {max}", max = MAX_SAMPLE_WINDOW_HALF_SIZE)]
    OversizedSampleWindow(u32),
}

fn default_mark_threshold() -> f32 {
    DEFAULT_MARK_THRESHOLD
}

fn default_binarize_level() -> u8 {
    DEFAULT_BINARIZE_LEVEL
}

/// Checks that a fill threshold lies strictly between 0 and 1.
pub fn is_valid_threshold(threshold: f32) -> bool {
    threshold > 0.0 && threshold < 1.0
}

impl SheetTemplate {
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Iterates over the questions paired with their 1-based numbers.
    pub fn numbered_questions(&self) -> impl Iterator<Item = (QuestionNumber, &QuestionLayout)> {
        self.questions
            .iter()
            .enumerate()
            .map(|(i, layout)| (i as QuestionNumber + 1, layout))
    }

    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.option_labels.is_empty() {
            return Err(LayoutError::EmptyAlphabet);
        }

        let mut seen = HashSet::new();
        for label in &self.option_labels {
            if !seen.insert(label) {
                return Err(LayoutError::DuplicateLabel(label.clone()));
            }
        }

        if !is_valid_threshold(self.mark_threshold) {
            return Err(LayoutError::InvalidThreshold(self.mark_threshold));
        }

        if self.sample_window.half_width == 0 || self.sample_window.half_height == 0 {
            return Err(LayoutError::EmptySampleWindow);
        }

        let largest_half_size = self
            .sample_window
            .half_width
            .max(self.sample_window.half_height);
        if largest_half_size > MAX_SAMPLE_WINDOW_HALF_SIZE {
            return Err(LayoutError::OversizedSampleWindow(largest_half_size));
        }

        for (question, layout) in self.numbered_questions() {
            if layout.sample_points.len() != self.option_labels.len() {
                return Err(LayoutError::InvalidLayout {
                    question,
                    expected: self.option_labels.len(),
                    actual: layout.sample_points.len(),
                });
            }
        }

        Ok(())
    }
}

/// Parses and validates a template from its JSON representation.
pub fn parse_template(json: &str) -> Result<SheetTemplate, LayoutError> {
    let template: SheetTemplate = serde_json::from_str(json)?;
    template.validate()?;
    Ok(template)
}

pub fn load_template(path: &Path) -> Result<SheetTemplate, LayoutError> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| LayoutError::Io(path.to_path_buf(), e))?;
    parse_template(&json)
}

/// The 20-question A-D sheet bundled with the binary.
pub fn load_standard_template() -> Result<SheetTemplate, LayoutError> {
    parse_template(include_str!("../templates/standard-20.json"))
}
