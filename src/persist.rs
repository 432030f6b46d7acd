use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use log::info;

use crate::answers::ExtractedAnswers;
use crate::score::EvaluationReport;

const CSV_HEADER: [&str; 2] = ["Question", "Marked Option"];

/// Quotes a CSV field when it contains a delimiter, quote, or line break.
fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Writes detected answers as a two-column table of question and marked
/// option. Unanswered questions read `No answer`.
pub fn write_answers_csv<W: Write>(writer: &mut W, answers: &ExtractedAnswers) -> io::Result<()> {
    writeln!(writer, "{},{}", CSV_HEADER[0], CSV_HEADER[1])?;
    for (question, result) in answers.iter() {
        writeln!(
            writer,
            "{},{}",
            csv_field(&format!("Question {}", question)),
            csv_field(&result.to_string())
        )?;
    }
    Ok(())
}

/// Creates (or truncates) `path` and writes the answer table to it. The file
/// is flushed and closed before returning.
pub fn save_answers_csv(path: &Path, answers: &ExtractedAnswers) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_answers_csv(&mut writer, answers)?;
    writer.flush()?;
    info!("wrote {} answers to {}", answers.len(), path.display());
    Ok(())
}

/// Writes each report line in order, the score line last.
pub fn write_report<W: Write>(writer: &mut W, report: &EvaluationReport) -> io::Result<()> {
    for line in report.lines() {
        writeln!(writer, "{}", line)?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::answers::parse_answer_key;
    use crate::detect::DetectionResult;
    use crate::score::evaluate;

    fn sample_answers() -> ExtractedAnswers {
        vec![
            (
                1,
                DetectionResult::Marked {
                    index: 0,
                    label: "A".into(),
                },
            ),
            (2, DetectionResult::Unanswered),
            (
                3,
                DetectionResult::Marked {
                    index: 1,
                    label: "B, maybe".into(),
                },
            ),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_write_answers_csv() {
        let mut out = Vec::new();
        write_answers_csv(&mut out, &sample_answers()).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Question,Marked Option\n\
             Question 1,A\n\
             Question 2,No answer\n\
             Question 3,\"B, maybe\"\n"
        );
    }

    #[test]
    fn test_save_answers_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("omr_results.csv");
        save_answers_csv(&path, &sample_answers()).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("Question,Marked Option\nQuestion 1,A\n"));
        assert_eq!(contents.lines().count(), 4);
    }

    #[test]
    fn test_write_report() {
        let key = parse_answer_key(r#"{ "1": "A", "2": "C", "3": "B" }"#).unwrap();
        let report = evaluate(&sample_answers(), &key).unwrap();

        let mut out = Vec::new();
        write_report(&mut out, &report).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Question 1: A (Correct)\n\
             Question 2: No answer (Wrong), Correct: C\n\
             Question 3: B, maybe (Wrong), Correct: B\n\
             Total Score: 1/3\n"
        );
    }

    #[test]
    fn test_csv_field() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
