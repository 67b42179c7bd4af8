use calltrace_parse::Trace;
use std::env;
use std::fs::File;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    if args.len() != 2 {
        eprintln!("Usage: {} <trace.json>", args[0]);
        return ExitCode::from(2);
    }

    let path = &args[1];

    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error opening '{}': {}", path, e);
            return ExitCode::FAILURE;
        }
    };

    let trace = match Trace::parse(file) {
        Ok(trace) => trace,
        Err(e) => {
            eprintln!("Invalid trace '{}': {}", path, e);
            return ExitCode::FAILURE;
        }
    };

    let violations = trace.verify();
    for (thread, violation) in &violations {
        eprintln!(
            "  pid {} tid {} (session '{}'): {}",
            thread.pid, thread.tid, thread.session_id, violation
        );
    }
    if !violations.is_empty() {
        eprintln!("Inconsistent call timeline in '{}': {} violations", path, violations.len());
        return ExitCode::FAILURE;
    }

    println!("Valid trace: {}", path);
    println!("  Time range: {} - {} us", trace.start_time, trace.end_time);
    println!("  Profiled threads: {}", trace.threads.len());
    println!("  Calls: {}", trace.function_calls().count());
    if !trace.screenshots.is_empty() {
        println!("  Screenshots: {}", trace.screenshots.len());
    }
    ExitCode::SUCCESS
}
