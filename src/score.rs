use log::debug;
use serde::Serialize;
use thiserror::Error;

use crate::answers::{AnswerKey, ExtractedAnswers};
use crate::detect::DetectionResult;
use crate::types::QuestionNumber;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScoreError {
    #[error("question {0} does not appear in the answer key")]
    UnknownQuestion(QuestionNumber),
}

/// Per-question verdicts followed by the total score line. Built once by
/// [`evaluate`] and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvaluationReport {
    lines: Vec<String>,
    score: u32,
    total: u32,
}

impl EvaluationReport {
    /// Every line of the report, the score line last.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn verdict_lines(&self) -> &[String] {
        &self.lines[..self.lines.len() - 1]
    }

    pub fn score_line(&self) -> &str {
        &self.lines[self.lines.len() - 1]
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn total(&self) -> u32 {
        self.total
    }
}

/// Compares the detected answers against the key. Lines follow the order of
/// `extracted_answers`; the total is the number of questions in the key.
pub fn evaluate(
    extracted_answers: &ExtractedAnswers,
    answer_key: &AnswerKey,
) -> Result<EvaluationReport, ScoreError> {
    let total = answer_key.len() as u32;
    let mut score = 0;
    let mut lines = Vec::with_capacity(extracted_answers.len() + 1);

    for (question, selected) in extracted_answers.iter() {
        let correct = answer_key
            .get(*question)
            .ok_or(ScoreError::UnknownQuestion(*question))?;

        match selected {
            DetectionResult::Marked { label, .. } if label == correct => {
                lines.push(format!("Question {}: {} (Correct)", question, selected));
                score += 1;
            }
            _ => lines.push(format!(
                "Question {}: {} (Wrong), Correct: {}",
                question, selected, correct
            )),
        }
    }

    lines.push(format!("Total Score: {}/{}", score, total));
    debug!("scored {} of {}", score, total);

    Ok(EvaluationReport {
        lines,
        score,
        total,
    })
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;
    use crate::answers::parse_answer_key;
    use crate::types::OptionLabel;

    const ALPHABET: [&str; 4] = ["A", "B", "C", "D"];

    fn marked(label: &str) -> DetectionResult {
        DetectionResult::Marked {
            index: ALPHABET.iter().position(|l| *l == label).unwrap_or(0),
            label: label.into(),
        }
    }

    #[test]
    fn test_evaluate_mixed_sheet() {
        let key = parse_answer_key(r#"{ "1": "A", "2": "C", "3": "C" }"#).unwrap();
        let answers = vec![(1, marked("A")), (2, marked("B")), (3, marked("C"))]
            .into_iter()
            .collect::<ExtractedAnswers>();

        let report = evaluate(&answers, &key).unwrap();
        assert_eq!(
            report.lines(),
            [
                "Question 1: A (Correct)",
                "Question 2: B (Wrong), Correct: C",
                "Question 3: C (Correct)",
                "Total Score: 2/3",
            ]
        );
        assert_eq!(report.score(), 2);
        assert_eq!(report.total(), 3);
        assert_eq!(report.verdict_lines().len(), 3);
        assert_eq!(report.score_line(), "Total Score: 2/3");
    }

    #[test]
    fn test_unanswered_is_wrong() {
        let key = parse_answer_key(r#"{ "1": "D" }"#).unwrap();
        let answers = vec![(1, DetectionResult::Unanswered)]
            .into_iter()
            .collect::<ExtractedAnswers>();

        let report = evaluate(&answers, &key).unwrap();
        assert_eq!(
            report.lines(),
            ["Question 1: No answer (Wrong), Correct: D", "Total Score: 0/1"]
        );
    }

    #[test]
    fn test_total_counts_whole_key() {
        let key = parse_answer_key(r#"{ "1": "A", "2": "B", "3": "C", "4": "D" }"#).unwrap();
        let answers = vec![(4, marked("D")), (2, marked("B"))]
            .into_iter()
            .collect::<ExtractedAnswers>();

        let report = evaluate(&answers, &key).unwrap();
        assert_eq!(
            report.lines(),
            [
                "Question 4: D (Correct)",
                "Question 2: B (Correct)",
                "Total Score: 2/4",
            ]
        );
    }

    #[test]
    fn test_empty_answers_still_report_total() {
        let key = parse_answer_key(r#"{ "1": "A", "2": "B" }"#).unwrap();
        let report = evaluate(&ExtractedAnswers::new(), &key).unwrap();
        assert_eq!(report.lines(), ["Total Score: 0/2"]);
        assert!(report.verdict_lines().is_empty());
    }

    #[test]
    fn test_unknown_question_fails() {
        let key = parse_answer_key(r#"{ "1": "A", "2": "B" }"#).unwrap();
        let answers = vec![(1, marked("A")), (5, marked("B"))]
            .into_iter()
            .collect::<ExtractedAnswers>();

        assert_eq!(
            evaluate(&answers, &key),
            Err(ScoreError::UnknownQuestion(5))
        );
    }

    fn key_and_answers() -> impl Strategy<Value = (AnswerKey, ExtractedAnswers)> {
        prop::collection::vec((0usize..4, prop::option::of(0usize..4)), 1..30).prop_flat_map(
            |rows| {
                let len = rows.len();
                (Just(rows), prop::sample::subsequence((1..=len as u32).collect::<Vec<_>>(), 0..=len))
            },
        )
        .prop_map(|(rows, answered)| {
            let key = AnswerKey::new(
                rows.iter()
                    .enumerate()
                    .map(|(i, (correct, _))| (i as u32 + 1, OptionLabel::from(ALPHABET[*correct]))),
            )
            .unwrap();
            let answers = answered
                .iter()
                .map(|question| {
                    let result = match rows[*question as usize - 1].1 {
                        Some(index) => marked(ALPHABET[index]),
                        None => DetectionResult::Unanswered,
                    };
                    (*question, result)
                })
                .collect::<ExtractedAnswers>();
            (key, answers)
        })
    }

    proptest! {
        #[test]
        fn prop_total_is_key_size((key, answers) in key_and_answers()) {
            let report = evaluate(&answers, &key).unwrap();
            prop_assert_eq!(report.total() as usize, key.len());
            prop_assert!(report.score() as usize <= answers.len());
            prop_assert_eq!(report.lines().len(), answers.len() + 1);
            let suffix = format!("/{}", key.len());
            prop_assert!(report.score_line().ends_with(&suffix));
        }

        #[test]
        fn prop_evaluate_is_idempotent((key, answers) in key_and_answers()) {
            let first = evaluate(&answers, &key).unwrap();
            let second = evaluate(&answers, &key).unwrap();
            prop_assert_eq!(first.lines(), second.lines());
        }
    }
}
