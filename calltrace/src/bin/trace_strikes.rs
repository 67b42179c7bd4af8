//! Count function-call strikes inside marked ranges of a Chrome trace.
//!
//! Every call that starts inside one of the given ranges counts as a strike
//! for its signature (`name@url:line:column`). The result is printed to
//! stdout as a JSON object, signatures sorted.
//!
//! # Usage
//!
//! ```bash
//! # absolute microseconds, as in the trace's `ts` fields
//! trace_strikes trace.json --range 1200000:1350000 --range 2000000:2100000
//!
//! # timeline positions in [0, 1]
//! trace_strikes trace.json --relative --range 0.25:0.5
//! ```

use calltrace::attribution::{TimeRange, strike_counts};
use calltrace::input::read_trace;
use calltrace::session::TraceSession;
use calltrace_parse::ParserConfig;
use clap::Parser;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "trace_strikes")]
#[command(about = "Count calls per function signature inside marked time ranges")]
#[command(version)]
struct Args {
    /// Input trace file (.json or gzipped .json)
    input: PathBuf,

    /// Range as <start>:<end> (repeatable)
    #[arg(short, long = "range", value_name = "START:END", required = true)]
    ranges: Vec<TimeRange>,

    /// Interpret ranges as timeline positions in [0, 1]
    #[arg(long)]
    relative: bool,

    /// Additional event name that runs JavaScript (repeatable)
    #[arg(long = "js-event", value_name = "NAME")]
    js_events: Vec<String>,

    /// Additional event name that starts a new task (repeatable)
    #[arg(long = "task-event", value_name = "NAME")]
    task_events: Vec<String>,
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ParserConfig::default();
    config.js_invocation_events.extend(args.js_events);
    config.task_boundary_events.extend(args.task_events);

    let trace = read_trace(&args.input, &config).map_err(|e| {
        format!(
            "Failed to read trace '{}': {}",
            args.input.display(),
            e
        )
    })?;

    let mut session = TraceSession::new();
    session.load(trace);

    let strikes: BTreeMap<String, u64> = if args.relative {
        for range in &args.ranges {
            session.mark_range(range.start, range.end)?;
        }
        session.strikes()?
    } else {
        let trace = session.trace()?;
        strike_counts(trace.function_calls(), &args.ranges)
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, &strikes)?;
    writeln!(out)?;

    eprintln!(
        "{} signatures struck across {} ranges",
        strikes.len(),
        args.ranges.len()
    );

    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
