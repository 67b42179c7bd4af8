//! NDJSON export of reconstructed calls.
//!
//! The output starts with one `trace` record describing the whole trace,
//! followed by one `call` record per reconstructed call:
//!
//! ```text
//! {"type":"trace","start_time":1000.0,"end_time":1100.0,"threads":1,"calls":2,"screenshots":0}
//! {"type":"call","pid":1,"tid":1,"session":"0x1","id":0,"signature":"main@app.js:1:1",...}
//! ```
//!
//! `id` and `parent` index calls within one (pid, session) pair.

use crate::Result;
use calltrace_parse::{CallRef, Timestamp, Trace};
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Leading record of an export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub threads: usize,
    pub calls: usize,
    pub screenshots: usize,
}

impl TraceRecord {
    pub fn from_trace(trace: &Trace) -> Self {
        Self {
            start_time: trace.start_time,
            end_time: trace.end_time,
            threads: trace.threads.len(),
            calls: trace.function_calls().count(),
            screenshots: trace.screenshots.len(),
        }
    }
}

/// One reconstructed call, flattened with its node's call frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    pub pid: u64,
    pub tid: u64,
    pub session: String,
    pub id: usize,
    pub signature: String,
    pub function: String,
    pub url: String,
    /// 1-based.
    pub line: i64,
    /// 1-based.
    pub column: i64,
    pub start: Timestamp,
    pub end: Timestamp,
    pub depth: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<usize>,
}

impl CallRecord {
    pub fn from_call(call: &CallRef<'_>) -> Self {
        let node = call.node();
        Self {
            pid: call.thread.pid,
            tid: call.thread.tid,
            session: call.thread.session_id.clone(),
            id: call.id,
            signature: node.signature(),
            function: node.function_name.clone(),
            url: node.url.clone(),
            line: node.line_number,
            column: node.column_number,
            start: call.call.start_time,
            end: call.call.end_time,
            depth: call.call.depth,
            parent: call.call.parent,
        }
    }
}

#[derive(Serialize)]
struct TypedRecord<'a, T: Serialize> {
    #[serde(rename = "type")]
    record_type: &'a str,
    #[serde(flatten)]
    data: &'a T,
}

/// Writer for call-timeline NDJSON.
pub struct CallsWriter<W: Write> {
    writer: W,
}

impl<W: Write> CallsWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write the leading trace record. This should be called first.
    pub fn write_trace(&mut self, record: &TraceRecord) -> Result<()> {
        self.write_record("trace", record)
    }

    pub fn write_call(&mut self, record: &CallRecord) -> Result<()> {
        self.write_record("call", record)
    }

    fn write_record<T: Serialize>(&mut self, record_type: &str, data: &T) -> Result<()> {
        let typed = TypedRecord { record_type, data };
        let json = serde_json::to_string(&typed)?;
        writeln!(self.writer, "{}", json)?;
        Ok(())
    }
}

/// Export a whole trace. Returns the number of call records written.
pub fn write_calls<W: Write>(trace: &Trace, writer: W) -> Result<usize> {
    let mut writer = CallsWriter::new(writer);
    writer.write_trace(&TraceRecord::from_trace(trace))?;

    let mut written = 0;
    for call in trace.function_calls() {
        writer.write_call(&CallRecord::from_call(&call))?;
        written += 1;
    }
    Ok(written)
}
