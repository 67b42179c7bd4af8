//! Call timeline reconstruction for Chrome performance traces.
//!
//! This library reads a Chrome Performance trace (`traceEvents` JSON) and
//! rebuilds, per sampled thread, the list of function-call intervals that
//! were live while the trace was recorded. It merges two sources:
//!
//! - CPU profile samples (`Profile` / `ProfileChunk` events), which say
//!   which stack was on the CPU at an instant.
//! - Duration events (`"X"`, `"B"`/`"E"`), which bracket known synchronous
//!   scopes such as `RunTask` or `FunctionCall`.
//!
//! # Example
//!
//! ```no_run
//! use std::fs::File;
//! use calltrace_parse::Trace;
//!
//! let file = File::open("trace.json").unwrap();
//! let trace = Trace::parse(file).unwrap();
//!
//! println!("Calls: {}", trace.function_calls().count());
//! println!("Screenshots: {}", trace.screenshots.len());
//! ```

pub mod calls;
pub mod event;
pub mod node;
pub mod profile;
pub mod trace;

pub use calls::{CallId, ParserConfig, ProfileCall, ProfileCallsParser, Violation};
pub use event::{CompleteEvent, Phase, RawTrace, Timestamp, TraceEvent};
pub use node::{NodeId, NodeKind, ProfileNode, ProfileNodes};
pub use profile::{Profile, ProfileSample, ProfileSession};
pub use trace::{CallRef, Screenshot, ThreadCalls, Trace};

use thiserror::Error;

/// Errors that can occur while reconstructing a call timeline.
///
/// Every variant is fatal for the trace being parsed; no partial timeline
/// is produced.
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("duplicate profile node id {0}")]
    DuplicateNodeId(u64),

    #[error("profile node {0} is part of a parent cycle")]
    CyclicNodeTree(u64),

    #[error("sample references non-existent profile node {0}")]
    UnknownSampleNode(u64),

    #[error("profile has {samples} samples but {timestamps} timestamps")]
    SampleCountMismatch { samples: usize, timestamps: usize },

    #[error("end event '{name}' (category '{cat}') at {ts} has no matching begin event")]
    MalformedEventNesting { cat: String, name: String, ts: Timestamp },

    #[error("invalid call stack truncation to depth {depth} (pin {pin}, stack size {stack_len})")]
    InvalidTruncationDepth {
        depth: usize,
        pin: usize,
        stack_len: usize,
    },

    #[error("no trace has been loaded")]
    TraceNotYetLoaded,
}

/// Result type for trace reconstruction.
pub type Result<T> = std::result::Result<T, TraceError>;
