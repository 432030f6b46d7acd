use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::detect::DetectionResult;
use crate::types::{OptionLabel, QuestionNumber};

/// The correct option for every question of a sheet, numbered from 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerKey {
    answers: BTreeMap<QuestionNumber, OptionLabel>,
}

#[derive(Debug, Error)]
pub enum AnswerKeyError {
    #[error("unable to read answer key {}: {1}", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("unable to parse answer key: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("answer key questions must be numbered 1 to {expected} without gaps, found question {found}")]
    NotContiguous {
        expected: usize,
        found: QuestionNumber,
    },

    #[error("question {question} expects {label}, which is not a label on this sheet")]
    UnknownLabel {
        question: QuestionNumber,
        label: OptionLabel,
    },
}

impl AnswerKey {
    pub fn new(
        answers: impl IntoIterator<Item = (QuestionNumber, OptionLabel)>,
    ) -> Result<Self, AnswerKeyError> {
        let answers = answers.into_iter().collect::<BTreeMap<_, _>>();
        let expected = answers.len();
        for (i, question) in answers.keys().enumerate() {
            if *question as usize != i + 1 {
                return Err(AnswerKeyError::NotContiguous {
                    expected,
                    found: *question,
                });
            }
        }
        Ok(Self { answers })
    }

    pub fn get(&self, question: QuestionNumber) -> Option<&OptionLabel> {
        self.answers.get(&question)
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&QuestionNumber, &OptionLabel)> {
        self.answers.iter()
    }

    /// Ensures every expected answer is one of `option_labels`.
    pub fn check_labels(&self, option_labels: &[OptionLabel]) -> Result<(), AnswerKeyError> {
        let known = option_labels.iter().collect::<HashSet<_>>();
        match self.answers.iter().find(|(_, label)| !known.contains(label)) {
            Some((question, label)) => Err(AnswerKeyError::UnknownLabel {
                question: *question,
                label: label.clone(),
            }),
            None => Ok(()),
        }
    }
}

/// Parses a key written as a JSON object from question number to label,
/// e.g. `{ "1": "A", "2": "C" }`.
pub fn parse_answer_key(json: &str) -> Result<AnswerKey, AnswerKeyError> {
    let answers: BTreeMap<QuestionNumber, OptionLabel> = serde_json::from_str(json)?;
    AnswerKey::new(answers)
}

pub fn load_answer_key(path: &Path) -> Result<AnswerKey, AnswerKeyError> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| AnswerKeyError::Io(path.to_path_buf(), e))?;
    parse_answer_key(&json)
}

/// Detected answers keyed by question, in the order they were recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedAnswers {
    entries: Vec<(QuestionNumber, DetectionResult)>,
}

impl ExtractedAnswers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the answer for `question`. Re-recording a question replaces
    /// its answer but keeps its original position.
    pub fn insert(&mut self, question: QuestionNumber, result: DetectionResult) {
        match self.entries.iter_mut().find(|(q, _)| *q == question) {
            Some(entry) => entry.1 = result,
            None => self.entries.push((question, result)),
        }
    }

    pub fn get(&self, question: QuestionNumber) -> Option<&DetectionResult> {
        self.entries
            .iter()
            .find(|(q, _)| *q == question)
            .map(|(_, result)| result)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(QuestionNumber, DetectionResult)> {
        self.entries.iter()
    }
}

impl FromIterator<(QuestionNumber, DetectionResult)> for ExtractedAnswers {
    fn from_iter<I: IntoIterator<Item = (QuestionNumber, DetectionResult)>>(iter: I) -> Self {
        let mut answers = ExtractedAnswers::new();
        for (question, result) in iter {
            answers.insert(question, result);
        }
        answers
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnswerRow<'a> {
    question: QuestionNumber,
    marked_option: &'a DetectionResult,
}

impl Serialize for ExtractedAnswers {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(self.entries.iter().map(|(question, result)| AnswerRow {
            question: *question,
            marked_option: result,
        }))
    }
}
