//! Export the call timeline of a Chrome Performance trace as NDJSON.
//!
//! Reads a trace saved from the DevTools Performance panel (plain or
//! gzipped JSON), reconstructs every sampled thread's function calls, and
//! writes one record per call.
//!
//! # Usage
//!
//! ```bash
//! trace_to_calls trace.json -o calls.ndjson
//! trace_to_calls trace.json.gz --js-event MyFramework.Render
//! RUST_LOG=debug trace_to_calls trace.json
//! ```

use calltrace::export::write_calls;
use calltrace::input::read_trace;
use calltrace_parse::ParserConfig;
use clap::Parser;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "trace_to_calls")]
#[command(about = "Export reconstructed function calls from a Chrome trace as NDJSON")]
#[command(version)]
struct Args {
    /// Input trace file (.json or gzipped .json)
    input: PathBuf,

    /// Output file (defaults to input filename with .calls.ndjson extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Additional event name that runs JavaScript (repeatable)
    #[arg(long = "js-event", value_name = "NAME")]
    js_events: Vec<String>,

    /// Additional event name that starts a new task (repeatable)
    #[arg(long = "task-event", value_name = "NAME")]
    task_events: Vec<String>,
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let output_path = args.output.unwrap_or_else(|| {
        let mut path = args.input.clone();
        path.set_extension("calls.ndjson");
        path
    });

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

    let output_file = File::create(&output_path).map_err(|e| {
        format!(
            "Failed to create output file '{}': {}",
            output_path.display(),
            e
        )
    })?;
    let mut writer = BufWriter::new(output_file);

    let written = write_calls(&trace, &mut writer)?;
    writer.flush()?;

    eprintln!(
        "Exported {} calls from {} threads: '{}' -> '{}'",
        written,
        trace.threads.len(),
        args.input.display(),
        output_path.display()
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
