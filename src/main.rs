extern crate log;
extern crate pretty_env_logger;

use std::path::Path;
use std::process::exit;

use clap::{arg, command, value_parser, Command};

use omr_grade::answers::load_answer_key;
use omr_grade::interpret::{interpret_sheet, InterpretOptions};
use omr_grade::persist::{save_answers_csv, write_report};
use omr_grade::template::{load_standard_template, load_template};

fn main() {
    pretty_env_logger::init_custom_env("LOG");

    let matches = cli().get_matches();
    let debug = matches.get_flag("debug");
    let json = matches.get_flag("json");
    let pre_binarized = matches.get_flag("binarized");
    let fill_threshold = matches.get_one::<f32>("threshold").copied();
    let image_path = matches
        .get_one::<String>("image_path")
        .expect("image path is required");

    let template = match matches.get_one::<String>("template") {
        Some(path) => load_template(Path::new(path)),
        None => load_standard_template(),
    };
    let template = match template {
        Ok(template) => template,
        Err(e) => {
            eprintln!("Error loading sheet template: {}", e);
            exit(1);
        }
    };

    let answer_key = match matches.get_one::<String>("key") {
        Some(path) => {
            match load_answer_key(Path::new(path))
                .and_then(|key| key.check_labels(&template.option_labels).map(|()| key))
            {
                Ok(key) => Some(key),
                Err(e) => {
                    eprintln!("Error loading answer key: {}", e);
                    exit(1);
                }
            }
        }
        None => None,
    };

    let options = InterpretOptions {
        debug,
        template,
        answer_key,
        fill_threshold,
        pre_binarized,
    };

    let sheet = match interpret_sheet(Path::new(image_path), &options) {
        Ok(sheet) => sheet,
        Err(e) => {
            eprintln!("Error: {}", e);
            exit(1);
        }
    };

    if let Some(csv_path) = matches.get_one::<String>("csv") {
        if let Err(e) = save_answers_csv(Path::new(csv_path), &sheet.answers) {
            eprintln!("Error writing {}: {}", csv_path, e);
            exit(1);
        }
    }

    if json {
        match serde_json::to_string_pretty(&sheet) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing results: {}", e);
                exit(1);
            }
        }
        return;
    }

    for (question, result) in sheet.answers.iter() {
        println!("Question {}: {}", question, result);
    }

    if let Some(report) = &sheet.report {
        println!();
        if let Err(e) = write_report(&mut std::io::stdout().lock(), report) {
            eprintln!("Error writing report: {}", e);
            exit(1);
        }
    }
}

#[allow(clippy::cognitive_complexity)]
fn cli() -> Command {
    command!()
        .arg(arg!(-t --template <PATH> "Path to a sheet template JSON file (defaults to the built-in 20-question sheet)"))
        .arg(arg!(-k --key <PATH> "Path to an answer key JSON file"))
        .arg(
            arg!(--threshold <RATIO> "Fill ratio a bubble must exceed to count as marked")
                .value_parser(value_parser!(f32)),
        )
        .arg(arg!(--csv <PATH> "Write detected answers to a CSV file"))
        .arg(arg!(--json "Print results as JSON"))
        .arg(arg!(--binarized "Treat the input as an already binarized image"))
        .arg(arg!(-d --debug "Enable debug mode"))
        .arg(arg!(image_path: <IMAGE> "Path to the scanned answer sheet").required(true))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_cli_parses_all_options() {
        let matches = cli()
            .try_get_matches_from([
                "omr-grade",
                "--template",
                "sheet.json",
                "-k",
                "key.json",
                "--threshold",
                "0.6",
                "--csv",
                "out.csv",
                "--json",
                "-d",
                "scan.png",
            ])
            .unwrap();

        assert_eq!(
            matches.get_one::<String>("template").map(String::as_str),
            Some("sheet.json")
        );
        assert_eq!(
            matches.get_one::<String>("key").map(String::as_str),
            Some("key.json")
        );
        assert_eq!(matches.get_one::<f32>("threshold"), Some(&0.6));
        assert!(matches.get_flag("json"));
        assert!(matches.get_flag("debug"));
        assert!(!matches.get_flag("binarized"));
        assert_eq!(
            matches.get_one::<String>("image_path").map(String::as_str),
            Some("scan.png")
        );
    }

    #[test]
    fn test_cli_requires_image() {
        assert!(cli().try_get_matches_from(["omr-grade"]).is_err());
    }
}
