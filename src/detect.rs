use std::fmt::Display;

use imageproc::rect::Rect;
use log::{debug, warn};
use logging_timer::time;
use rayon::prelude::*;
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::answers::ExtractedAnswers;
use crate::geometry::{clip_rect, sample_window_rect};
use crate::image_utils::{ratio_in_rect, BinarizedImage, INK};
use crate::template::{
    is_valid_threshold, MultipleMarkPolicy, QuestionLayout, SamplePoint, SampleWindow,
    SheetTemplate,
};
use crate::types::{OptionLabel, QuestionNumber};

/// The outcome of reading one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectionResult {
    Marked { index: usize, label: OptionLabel },
    Unanswered,
}

impl Display for DetectionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectionResult::Marked { label, .. } => write!(f, "{}", label),
            DetectionResult::Unanswered => write!(f, "No answer"),
        }
    }
}

impl Serialize for DetectionResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            DetectionResult::Marked { label, .. } => serializer.serialize_str(label.as_str()),
            DetectionResult::Unanswered => serializer.serialize_none(),
        }
    }
}

/// The measured fill of a single bubble.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredBubble {
    pub label: OptionLabel,
    pub center: SamplePoint,

    /// The sampled region after clipping to the image, if any of it was inside.
    pub bounds: Option<Rect>,
    pub fill_ratio: f32,
}

/// Every bubble of a question along with the decision made from them.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredQuestion {
    pub question: QuestionNumber,
    pub bubbles: Vec<ScoredBubble>,
    pub result: DetectionResult,
}

#[derive(Debug, Error, PartialEq)]
pub enum DetectError {
    #[error("question {question} has {actual} sample points but there are {expected} option labels")]
    InvalidLayout {
        question: QuestionNumber,
        expected: usize,
        actual: usize,
    },

    #[error("fill threshold {0} must be between 0 and 1 exclusive")]
    InvalidThreshold(f32),

    #[error("question {question} has more than one mark: {}", join_labels(.labels))]
    MultipleMarks {
        question: QuestionNumber,
        labels: Vec<OptionLabel>,
    },
}

fn join_labels(labels: &[OptionLabel]) -> String {
    labels
        .iter()
        .map(|label| label.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Sheet-wide settings shared by every question.
#[derive(Debug, Clone, Copy)]
pub struct DetectOptions<'a> {
    pub option_labels: &'a [OptionLabel],
    pub sample_window: SampleWindow,
    pub fill_threshold: f32,
    pub multiple_marks: MultipleMarkPolicy,
}

impl<'a> DetectOptions<'a> {
    /// Takes settings from the template, optionally overriding its threshold.
    pub fn from_template(
        template: &'a SheetTemplate,
        fill_threshold: Option<f32>,
    ) -> Result<Self, DetectError> {
        let fill_threshold = fill_threshold.unwrap_or(template.mark_threshold);
        if !is_valid_threshold(fill_threshold) {
            return Err(DetectError::InvalidThreshold(fill_threshold));
        }

        Ok(Self {
            option_labels: &template.option_labels,
            sample_window: template.sample_window,
            fill_threshold,
            multiple_marks: template.multiple_marks,
        })
    }
}

/// Computes the fraction of ink inside the window around `center`. Windows
/// that cross the image border are clipped and only their visible part is
/// counted; a window entirely outside the image has no fill.
pub fn fill_ratio(
    image: &BinarizedImage,
    center: &SamplePoint,
    window: &SampleWindow,
) -> (Option<Rect>, f32) {
    let window_rect = sample_window_rect(center, window);
    let bounds = match (&window_rect, image.bounds()) {
        (Some(window_rect), Some(image_bounds)) => clip_rect(window_rect, &image_bounds),
        _ => None,
    };

    match bounds {
        Some(bounds) => {
            if Some(bounds) != window_rect {
                warn!(
                    "sample window at ({}, {}) extends past the image border",
                    center.x, center.y
                );
            }
            (Some(bounds), ratio_in_rect(image.as_gray(), &bounds, &INK))
        }
        None => {
            warn!(
                "sample window at ({}, {}) lies outside the image",
                center.x, center.y
            );
            (None, 0.0)
        }
    }
}

/// Picks the option with the highest fill ratio, provided it exceeds
/// `threshold`. When several options share the highest ratio the first one
/// wins.
pub fn select_marked_option(fill_ratios: &[f32], threshold: f32) -> Option<usize> {
    let mut marked: Option<(usize, f32)> = None;

    for (index, &fill_ratio) in fill_ratios.iter().enumerate() {
        if fill_ratio <= threshold {
            continue;
        }

        match marked {
            Some((_, max_fill_ratio)) if fill_ratio <= max_fill_ratio => {}
            _ => marked = Some((index, fill_ratio)),
        }
    }

    marked.map(|(index, _)| index)
}

/// Measures every bubble of one question and decides which option, if any,
/// was marked.
pub fn score_question(
    image: &BinarizedImage,
    question: QuestionNumber,
    layout: &QuestionLayout,
    options: &DetectOptions,
) -> Result<ScoredQuestion, DetectError> {
    if layout.sample_points.len() != options.option_labels.len() {
        return Err(DetectError::InvalidLayout {
            question,
            expected: options.option_labels.len(),
            actual: layout.sample_points.len(),
        });
    }

    let bubbles = layout
        .sample_points
        .iter()
        .zip(options.option_labels)
        .map(|(center, label)| {
            let (bounds, fill_ratio) = fill_ratio(image, center, &options.sample_window);
            ScoredBubble {
                label: label.clone(),
                center: *center,
                bounds,
                fill_ratio,
            }
        })
        .collect::<Vec<ScoredBubble>>();

    let fill_ratios = bubbles.iter().map(|b| b.fill_ratio).collect::<Vec<f32>>();
    let marked_labels = bubbles
        .iter()
        .filter(|b| b.fill_ratio > options.fill_threshold)
        .map(|b| b.label.clone())
        .collect::<Vec<OptionLabel>>();

    if marked_labels.len() > 1 {
        match options.multiple_marks {
            MultipleMarkPolicy::Reject => {
                return Err(DetectError::MultipleMarks {
                    question,
                    labels: marked_labels,
                })
            }
            MultipleMarkPolicy::FirstWins => warn!(
                "question {} has more than one mark ({}); keeping the fullest",
                question,
                join_labels(&marked_labels)
            ),
        }
    }

    let result = match select_marked_option(&fill_ratios, options.fill_threshold) {
        Some(index) => DetectionResult::Marked {
            index,
            label: options.option_labels[index].clone(),
        },
        None => DetectionResult::Unanswered,
    };

    debug!(
        "question {}: fill ratios {:?} -> {}",
        question, fill_ratios, result
    );

    Ok(ScoredQuestion {
        question,
        bubbles,
        result,
    })
}

/// Decides which option of a single question was marked.
pub fn detect(
    image: &BinarizedImage,
    question: QuestionNumber,
    layout: &QuestionLayout,
    options: &DetectOptions,
) -> Result<DetectionResult, DetectError> {
    score_question(image, question, layout, options).map(|scored| scored.result)
}

/// Scores every question on the sheet, in template order. When several
/// questions fail, the error of the lowest-numbered one is returned.
#[time]
pub fn score_sheet(
    image: &BinarizedImage,
    template: &SheetTemplate,
    options: &DetectOptions,
) -> Result<Vec<ScoredQuestion>, DetectError> {
    template
        .questions
        .par_iter()
        .enumerate()
        .map(|(i, layout)| score_question(image, i as QuestionNumber + 1, layout, options))
        .collect::<Vec<Result<ScoredQuestion, DetectError>>>()
        .into_iter()
        .collect()
}

/// Collects the per-question decisions in the order they were scored.
pub fn extracted_answers(scored_questions: &[ScoredQuestion]) -> ExtractedAnswers {
    scored_questions
        .iter()
        .map(|scored| (scored.question, scored.result.clone()))
        .collect()
}

/// Reads every question on the sheet.
pub fn detect_answers(
    image: &BinarizedImage,
    template: &SheetTemplate,
    fill_threshold: Option<f32>,
) -> Result<ExtractedAnswers, DetectError> {
    let options = DetectOptions::from_template(template, fill_threshold)?;
    let scored_questions = score_sheet(image, template, &options)?;
    Ok(extracted_answers(&scored_questions))
}
