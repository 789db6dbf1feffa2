use std::fs;
use std::io;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use lm_core::Severity;
use lm_editor::Command;
use lm_editor::EditorConfig;
use lm_editor::EditorSession;
use lm_editor::NoticeLog;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "LIVEMARK_LOG";
const KEYSTROKE_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Parser)]
#[command(name = "livemark")]
#[command(author, version)]
#[command(about = "Types text into a live-markup editor and prints the resulting document")]
#[command(after_help = "\
EXAMPLES:

    # Convert markup typed on stdin
    echo 'hello <i>world</i>' | livemark

    # Validate the result and print a JSON summary
    livemark --input notes.txt --validate --json

    # Show the document one step back in history
    livemark --input notes.txt --undo 1")]
struct Cli {
    /// Read text from this file instead of stdin
    #[arg(long)]
    input: Option<PathBuf>,

    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run the tag-balance validator over the final plain text
    #[arg(long)]
    validate: bool,

    /// Undo this many history steps before printing
    #[arg(long, default_value_t = 0)]
    undo: usize,

    /// Print a machine-readable summary
    #[arg(long)]
    json: bool,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Serialize)]
struct Summary {
    markup: String,
    char_count: usize,
    line_count: usize,
    history_entries: usize,
    history_index: Option<usize>,
    iterations: Option<usize>,
    converged: Option<bool>,
    valid: Option<bool>,
    notices: Vec<NoticeView>,
}

#[derive(Debug, Serialize)]
struct NoticeView {
    severity: &'static str,
    message: String,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => EditorConfig::load(path)
            .with_context(|| format!("failed to load config from `{}`", path.display()))?,
        None => EditorConfig::default(),
    };
    tracing::debug!(?config, "configuration resolved");
    let input = read_input(cli.input.as_deref())?;

    let notices = NoticeLog::new();
    let mut session = EditorSession::new(config, Box::new(notices.clone()))
        .context("failed to start editing session")?;

    type_lines(&mut session, &input);

    for _ in 0..cli.undo {
        let now = session.now();
        session.dispatch(Command::Undo, now);
        session.settle();
    }

    let valid = cli.validate.then(|| session.validate_content().valid);

    let report = session.last_report();
    let metrics = session.metrics();
    let summary = Summary {
        markup: session.markup(),
        char_count: metrics.char_count,
        line_count: metrics.line_count,
        history_entries: session.history().len(),
        history_index: session.history().index(),
        iterations: report.map(|report| report.iterations),
        converged: report.map(|report| report.converged),
        valid,
        notices: notices
            .notices()
            .into_iter()
            .map(|notice| NoticeView {
                severity: notice.severity.as_str(),
                message: notice.message,
            })
            .collect(),
    };

    if cli.json {
        let rendered =
            serde_json::to_string_pretty(&summary).context("failed to serialize summary")?;
        println!("{rendered}");
    } else {
        print_summary(&summary);
    }

    Ok(if valid == Some(false) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("lm_editor=debug,lm_html=debug,lm_security=debug,livemark=debug,info")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .init();
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read input file `{}`", path.display())),
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read stdin")?;
            Ok(buffer)
        }
    }
}

/// Types each line as its own paragraph and lets the debounce timers settle
/// before the next one.
fn type_lines(session: &mut EditorSession, input: &str) {
    for (index, line) in input.lines().enumerate() {
        let mut now = session.now();
        if index > 0 {
            session.dispatch(Command::Enter, now);
            now += KEYSTROKE_INTERVAL;
        }
        session.dispatch(Command::Type(line.to_owned()), now);
        session.settle();
    }
}

fn print_summary(summary: &Summary) {
    println!("{}", summary.markup);
    println!();
    println!(
        "chars: {}  lines: {}  history: {}/{}",
        summary.char_count,
        summary.line_count,
        summary.history_index.map_or(0, |index| index + 1),
        summary.history_entries
    );
    if let (Some(iterations), Some(converged)) = (summary.iterations, summary.converged) {
        let state = if converged { "converged" } else { "stopped at ceiling" };
        println!("last pass: {iterations} iterations, {state}");
    }
    for notice in &summary.notices {
        let marker = if notice.severity == Severity::Error.as_str() {
            "!"
        } else {
            "-"
        };
        println!("{marker} [{}] {}", notice.severity, notice.message);
    }
}
