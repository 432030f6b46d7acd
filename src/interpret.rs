use std::path::{Path, PathBuf};

use image::GrayImage;
use log::info;
use logging_timer::time;
use serde::Serialize;
use thiserror::Error;

use crate::answers::{AnswerKey, ExtractedAnswers};
use crate::debug::{draw_scored_questions_debug_image_mut, ImageDebugWriter};
use crate::detect::{extracted_answers, score_sheet, DetectError, DetectOptions, ScoredQuestion};
use crate::image_utils::{binarize, BinarizedImage, ImageFormatError};
use crate::score::{evaluate, EvaluationReport, ScoreError};
use crate::template::SheetTemplate;

#[derive(Debug, Clone)]
pub struct InterpretOptions {
    pub debug: bool,
    pub template: SheetTemplate,
    pub answer_key: Option<AnswerKey>,

    /// Overrides the template's mark threshold.
    pub fill_threshold: Option<f32>,

    /// The input is already reduced to ink and paper and must not be
    /// thresholded again.
    pub pre_binarized: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterpretedSheet {
    #[serde(skip)]
    pub scored_questions: Vec<ScoredQuestion>,
    pub answers: ExtractedAnswers,
    pub report: Option<EvaluationReport>,
}

#[derive(Debug, Error)]
pub enum InterpretError {
    #[error("unable to open image {}: {1}", .0.display())]
    ImageOpenError(PathBuf, #[source] image::ImageError),

    #[error(transparent)]
    ImageFormat(#[from] ImageFormatError),

    #[error(transparent)]
    Detect(#[from] DetectError),

    #[error(transparent)]
    Score(#[from] ScoreError),
}

#[time]
pub fn load_sheet_image(image_path: &Path) -> Result<GrayImage, InterpretError> {
    match image::open(image_path) {
        Ok(img) => Ok(img.into_luma8()),
        Err(e) => Err(InterpretError::ImageOpenError(image_path.to_path_buf(), e)),
    }
}

/// Reads the sheet and, when a key is configured, grades it.
pub fn interpret_binarized_sheet(
    image: &BinarizedImage,
    options: &InterpretOptions,
) -> Result<InterpretedSheet, InterpretError> {
    let detect_options = DetectOptions::from_template(&options.template, options.fill_threshold)?;
    let scored_questions = score_sheet(image, &options.template, &detect_options)?;
    let answers = extracted_answers(&scored_questions);

    let report = match &options.answer_key {
        Some(answer_key) => Some(evaluate(&answers, answer_key)?),
        None => None,
    };

    Ok(InterpretedSheet {
        scored_questions,
        answers,
        report,
    })
}

#[time]
pub fn interpret_sheet(
    image_path: &Path,
    options: &InterpretOptions,
) -> Result<InterpretedSheet, InterpretError> {
    let img = load_sheet_image(image_path)?;

    // annotate the scan as loaded, not its binarized form
    let debug = if options.debug {
        ImageDebugWriter::new(image_path.to_path_buf(), img.clone())
    } else {
        ImageDebugWriter::disabled()
    };

    let image = if options.pre_binarized {
        BinarizedImage::try_from_gray(img)?
    } else {
        binarize(&img, options.template.binarize_level)
    };

    let sheet = interpret_binarized_sheet(&image, options)?;
    info!(
        "read {} questions from {}",
        sheet.answers.len(),
        image_path.display()
    );

    let fill_threshold = options
        .fill_threshold
        .unwrap_or(options.template.mark_threshold);
    debug.write("marks", |canvas| {
        draw_scored_questions_debug_image_mut(canvas, &sheet.scored_questions, fill_threshold)
    });

    Ok(sheet)
}
