//! Raw Chrome trace event model.
//!
//! These types mirror the JSON shape written by the DevTools Performance
//! panel and by `chrome://tracing`. Only the fields the timeline needs are
//! typed; everything else stays in `args` as a [`serde_json::Value`].

use crate::{Result, TraceError};
use serde::{Deserialize, Deserializer};
use std::io::Read;

/// Timestamps and durations, in microseconds.
pub type Timestamp = f64;

/// Event phase code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum Phase {
    /// `"X"`: self-contained event with a `dur`.
    #[serde(rename = "X")]
    Complete,
    /// `"B"`: opens a scope closed by a matching `"E"`.
    #[serde(rename = "B")]
    Begin,
    /// `"E"`: closes the innermost open `"B"`.
    #[serde(rename = "E")]
    End,
    /// Any other phase (metadata, instant, async, sample...).
    #[default]
    #[serde(other)]
    Other,
}

/// A Chrome Performance trace file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTrace {
    /// Trace events array.
    pub trace_events: Vec<TraceEvent>,
    /// Optional metadata.
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl RawTrace {
    /// Parse a trace from a reader.
    ///
    /// Accepts both the object form (`{"traceEvents": [...]}`) and the bare
    /// array form (`[...]`).
    pub fn parse<R: Read>(reader: R) -> Result<Self> {
        let mut contents = String::new();
        let mut buf_reader = std::io::BufReader::new(reader);
        buf_reader.read_to_string(&mut contents)?;

        if contents.trim_start().starts_with('[') {
            let trace_events: Vec<TraceEvent> = serde_json::from_str(&contents)?;
            Ok(RawTrace {
                trace_events,
                metadata: None,
            })
        } else {
            Ok(serde_json::from_str(&contents)?)
        }
    }
}

/// A trace event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TraceEvent {
    /// Event name.
    #[serde(default)]
    pub name: String,
    /// Event category.
    #[serde(default)]
    pub cat: String,
    /// Phase code.
    #[serde(default)]
    pub ph: Phase,
    /// Process ID.
    #[serde(default)]
    pub pid: u64,
    /// Thread ID.
    #[serde(default)]
    pub tid: u64,
    /// Timestamp in microseconds.
    #[serde(default)]
    pub ts: Timestamp,
    /// Duration in microseconds (`"X"` events).
    #[serde(default)]
    pub dur: Option<Timestamp>,
    /// Event ID. Profile sessions use it to tie chunks to their header.
    #[serde(default, deserialize_with = "deserialize_optional_string_or_number")]
    pub id: Option<String>,
    /// Event arguments.
    #[serde(default)]
    pub args: serde_json::Value,
}

/// Deserialize an optional field that can be either a string or number.
fn deserialize_optional_string_or_number<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<serde_json::Value> = Deserialize::deserialize(deserializer)?;
    match value {
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        _ => Ok(None),
    }
}

impl TraceEvent {
    /// Returns true for the header event of a CPU profiling session.
    pub fn is_profile(&self) -> bool {
        self.name == "Profile"
    }

    /// Returns true for a CPU profile data chunk.
    pub fn is_profile_chunk(&self) -> bool {
        self.name == "ProfileChunk"
    }

    /// Decode `args.data` of a `ProfileChunk` event.
    ///
    /// Returns `Ok(None)` when the event carries no data.
    pub fn profile_chunk(&self) -> Result<Option<ProfileChunkData>> {
        match self.args.get("data") {
            Some(data) if !data.is_null() => Ok(Some(ProfileChunkData::deserialize(data)?)),
            _ => Ok(None),
        }
    }

    /// The base64 image carried by a `Screenshot` event.
    pub fn screenshot(&self) -> Option<&str> {
        if self.name != "Screenshot" {
            return None;
        }
        self.args.get("snapshot").and_then(|s| s.as_str())
    }
}

/// Data from a ProfileChunk event.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileChunkData {
    /// CPU profile data in this chunk.
    #[serde(default)]
    pub cpu_profile: Option<ProfileChunkCpuProfile>,
    /// Time deltas for samples in this chunk.
    #[serde(default)]
    pub time_deltas: Vec<Timestamp>,
}

/// CPU profile data within a ProfileChunk.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileChunkCpuProfile {
    /// Nodes added in this chunk.
    #[serde(default)]
    pub nodes: Vec<RawProfileNode>,
    /// Sample node IDs in this chunk.
    #[serde(default)]
    pub samples: Vec<u64>,
}

/// A node of the sampled call tree, as delivered in a chunk.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProfileNode {
    /// Unique node ID within the profile.
    pub id: u64,
    /// Parent node ID.
    #[serde(default)]
    pub parent: Option<u64>,
    /// Call frame information for this node.
    pub call_frame: RawCallFrame,
}

/// Information about a call frame.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCallFrame {
    /// Function name.
    #[serde(default)]
    pub function_name: String,
    /// Script ID - can be string or number.
    #[serde(default, deserialize_with = "deserialize_script_id")]
    pub script_id: String,
    /// Script URL.
    #[serde(default)]
    pub url: String,
    /// Line number (0-based, -1 if unknown).
    #[serde(default = "default_line")]
    pub line_number: i64,
    /// Column number (0-based, -1 if unknown).
    #[serde(default = "default_line")]
    pub column_number: i64,
}

fn default_line() -> i64 {
    -1
}

/// Deserialize script_id which can be either a string or number.
fn deserialize_script_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value: serde_json::Value = Deserialize::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        _ => Err(D::Error::custom("expected string or number for scriptId")),
    }
}

/// A duration event resolved to an explicit interval.
#[derive(Debug, Clone, Copy)]
pub struct CompleteEvent<'a> {
    pub event: &'a TraceEvent,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
}

impl CompleteEvent<'_> {
    pub fn name(&self) -> &str {
        &self.event.name
    }
}

/// Resolve a thread's duration events into intervals.
///
/// `"X"` events are used as-is. `"B"` events are paired with the next `"E"`
/// that closes them; a `"B"` left open ends at its own start time. The
/// result is ordered by start time, keeping input order for equal starts.
pub fn complete_events<'a, I>(events: I) -> Result<Vec<CompleteEvent<'a>>>
where
    I: IntoIterator<Item = &'a TraceEvent>,
{
    let mut complete: Vec<CompleteEvent<'a>> = Vec::new();
    let mut open_begins: Vec<usize> = Vec::new();

    for event in events {
        match event.ph {
            Phase::Complete => complete.push(CompleteEvent {
                event,
                start_time: event.ts,
                end_time: event.ts + event.dur.unwrap_or(0.0),
            }),
            Phase::Begin => {
                open_begins.push(complete.len());
                complete.push(CompleteEvent {
                    event,
                    start_time: event.ts,
                    end_time: event.ts,
                });
            }
            Phase::End => {
                let begin = open_begins
                    .pop()
                    .map(|idx| &mut complete[idx])
                    .filter(|begin| begin.event.cat == event.cat && begin.event.name == event.name)
                    .ok_or_else(|| TraceError::MalformedEventNesting {
                        cat: event.cat.clone(),
                        name: event.name.clone(),
                        ts: event.ts,
                    })?;
                begin.end_time = event.ts;
            }
            Phase::Other => {}
        }
    }

    complete.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
    Ok(complete)
}
