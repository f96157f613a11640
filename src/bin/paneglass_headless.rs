//! Paneglass Headless Replay
//!
//! Runs a JSON script of engine commands against the in-memory native layer
//! and prints the native operations the engine issued.

use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use paneglass::app::{logging, DisplayConfig};
use paneglass::script::{self, Script};

/// Command-line arguments
#[derive(Default)]
struct Args {
    /// Script file (stdin if not specified)
    input: Option<PathBuf>,
    /// Report file (stdout if not specified)
    output: Option<PathBuf>,
    /// Config file replacing the script's config
    config: Option<PathBuf>,
    /// Print only the drawn text runs
    text: bool,
    help: bool,
}

fn parse_args() -> Args {
    let mut args = Args::default();
    let argv: Vec<String> = std::env::args().skip(1).collect();

    let mut i = 0;
    while i < argv.len() {
        match argv[i].as_str() {
            "-h" | "--help" => {
                args.help = true;
            }
            "-i" | "--input" => {
                i += 1;
                if i < argv.len() {
                    args.input = Some(PathBuf::from(&argv[i]));
                }
            }
            "-o" | "--output" => {
                i += 1;
                if i < argv.len() {
                    args.output = Some(PathBuf::from(&argv[i]));
                }
            }
            "-c" | "--config" => {
                i += 1;
                if i < argv.len() {
                    args.config = Some(PathBuf::from(&argv[i]));
                }
            }
            "-t" | "--text" => {
                args.text = true;
            }
            other => {
                if args.input.is_none() && !other.starts_with('-') {
                    args.input = Some(PathBuf::from(other));
                }
            }
        }
        i += 1;
    }

    args
}

fn print_help() {
    eprintln!(
        r#"paneglass-headless - Replay display engine scripts

USAGE:
    paneglass-headless [OPTIONS] [SCRIPT]

OPTIONS:
    -h, --help              Show this help message
    -i, --input <FILE>      Script file (stdin if not specified)
    -o, --output <FILE>     Report file (stdout if not specified)
    -c, --config <FILE>     Display config replacing the script's own
    -t, --text              Print drawn text runs instead of the JSON report

Set RUST_LOG=debug to trace the engine.
"#
    );
}

fn main() -> ExitCode {
    logging::init();
    let args = parse_args();

    if args.help {
        print_help();
        return ExitCode::SUCCESS;
    }

    let input = match &args.input {
        Some(path) => std::fs::read_to_string(path),
        None => {
            let mut data = String::new();
            io::stdin().read_to_string(&mut data).map(|_| data)
        }
    };
    let input = match input {
        Ok(input) => input,
        Err(e) => {
            eprintln!("Error reading script: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut script = match Script::from_json(&input) {
        Ok(script) => script,
        Err(e) => {
            eprintln!("Error parsing script: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(path) = &args.config {
        match DisplayConfig::load(path) {
            Ok(config) => script.config = config,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        }
    }

    let report = match script::run(&script) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error opening display: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let output = if args.text {
        let mut text = String::new();
        for run in report.ops.iter().filter_map(|op| op.text()) {
            text.push_str(&run);
            text.push('\n');
        }
        text
    } else {
        match report.to_json() {
            Ok(json) => json + "\n",
            Err(e) => {
                eprintln!("Error serializing report: {}", e);
                return ExitCode::FAILURE;
            }
        }
    };

    let written = match &args.output {
        Some(path) => std::fs::write(path, output.as_bytes()),
        None => io::stdout().write_all(output.as_bytes()),
    };
    if let Err(e) = written {
        eprintln!("Error writing report: {}", e);
        return ExitCode::FAILURE;
    }

    if report.errors.is_empty() {
        ExitCode::SUCCESS
    } else {
        for error in &report.errors {
            eprintln!("command {}", error);
        }
        ExitCode::FAILURE
    }
}
