use std::fmt;
use std::io;
use std::path::PathBuf;

use quiz_core::model::{DEFAULT_QUESTION_COUNT, QuizSettings};
use services::{AppServices, Clock, LoadReport};

mod console;

use console::Console;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidQuestionCount { raw: String },
    InvalidPath { flag: &'static str },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidQuestionCount { raw } => {
                write!(f, "invalid --questions value: {raw}")
            }
            ArgsError::InvalidPath { flag } => write!(f, "{flag} must not be empty"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn require_path(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<PathBuf, ArgsError> {
    let value = require_value(args, flag)?;
    if value.trim().is_empty() {
        return Err(ArgsError::InvalidPath { flag });
    }
    Ok(PathBuf::from(value))
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- play [--data-dir <dir>] [--stats <file>] [--questions <n>] [--shuffle]");
    eprintln!("  cargo run -p app -- sets [--data-dir <dir>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --data-dir ./JSON");
    eprintln!("  --stats question_stats.json");
    eprintln!("  --questions {DEFAULT_QUESTION_COUNT}");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QCM_DATA_DIR, QCM_STATS_FILE, QCM_QUESTIONS, QCM_SHUFFLE, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Play,
    Sets,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "play" => Some(Self::Play),
            "sets" => Some(Self::Sets),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Args {
    data_dir: PathBuf,
    stats_path: PathBuf,
    question_count: u32,
    shuffle: bool,
}

impl Args {
    fn parse(
        args: &mut impl Iterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut data_dir = env("QCM_DATA_DIR")
            .filter(|v| !v.trim().is_empty())
            .map_or_else(|| PathBuf::from("JSON"), PathBuf::from);
        let mut stats_path = env("QCM_STATS_FILE")
            .filter(|v| !v.trim().is_empty())
            .map_or_else(|| PathBuf::from("question_stats.json"), PathBuf::from);
        let mut question_count = env("QCM_QUESTIONS")
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(DEFAULT_QUESTION_COUNT);
        let mut shuffle = env("QCM_SHUFFLE").is_some_and(|v| is_truthy(&v));

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--data-dir" => data_dir = require_path(args, "--data-dir")?,
                "--stats" => stats_path = require_path(args, "--stats")?,
                "--questions" => {
                    let value = require_value(args, "--questions")?;
                    question_count = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidQuestionCount { raw: value.clone() })?;
                }
                "--shuffle" => shuffle = true,
                "--no-shuffle" => shuffle = false,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            data_dir,
            stats_path,
            question_count,
            shuffle,
        })
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn report_load_problems(report: &LoadReport) {
    for failure in &report.failed_sets {
        eprintln!("warning: skipped {}: {}", failure.set_id, failure.error);
    }
    for (set_id, skipped) in &report.skipped_questions {
        eprintln!(
            "warning: skipped question #{} in {set_id}: {}",
            skipped.position + 1,
            skipped.error
        );
    }
    if !report.duplicate_keys.is_empty() {
        eprintln!(
            "warning: {} questions share an id with another question of the same set",
            report.duplicate_keys.len()
        );
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None => Command::Play,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Play,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            io::Error::new(io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };
    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let parsed = Args::parse(&mut argv.into_iter(), |key| std::env::var(key).ok()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    let settings = QuizSettings::new(parsed.question_count, parsed.shuffle)?;

    let (services, report) = AppServices::new_json(
        &parsed.data_dir,
        &parsed.stats_path,
        settings,
        Clock::system(),
    )?;
    report_load_problems(&report);

    let service = services.into_session_loop();
    match cmd {
        Command::Sets => {
            for set_id in service.store().set_ids() {
                let count = service.store().questions(set_id).map_or(0, <[_]>::len);
                println!("{set_id}\t{count}");
            }
            Ok(())
        }
        Command::Play => {
            if service.store().is_empty() {
                return Err(format!(
                    "no questions found in {}",
                    parsed.data_dir.display()
                )
                .into());
            }
            let stdin = io::stdin();
            let mut console = Console::new(stdin.lock(), io::stdout(), service);
            console.run()?;
            Ok(())
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
