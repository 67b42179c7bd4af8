//! Tools for querying and exporting call timelines from Chrome traces.
//!
//! This crate sits on top of [`calltrace_parse`] and provides what the
//! timeline viewer and the command-line tools need:
//!
//! - [`input`] - Load plain or gzip-compressed trace files
//! - [`session`] - A loaded trace plus the time ranges marked on it
//! - [`attribution`] - Count calls by signature inside marked ranges
//! - [`export`] - Write reconstructed calls as NDJSON
//!
//! # Example
//!
//! ```no_run
//! use calltrace::attribution::{TimeRange, strike_counts};
//! use calltrace::input::read_trace;
//! use calltrace_parse::ParserConfig;
//!
//! let trace = read_trace("trace.json.gz", &ParserConfig::default()).unwrap();
//! let ranges = [TimeRange::new(trace.start_time, trace.end_time)];
//!
//! for (signature, strikes) in strike_counts(trace.function_calls(), &ranges) {
//!     println!("{strikes:>6}  {signature}");
//! }
//! ```

pub mod attribution;
pub mod export;
pub mod input;
pub mod session;

// Re-export calltrace_parse for convenience
pub use calltrace_parse;

use calltrace_parse::TraceError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Trace(#[from] TraceError),

    #[error("invalid time range '{0}': expected <start>:<end>")]
    InvalidRange(String),
}

pub type Result<T> = std::result::Result<T, ToolError>;
