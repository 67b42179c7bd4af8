//! Whole-trace aggregation.
//!
//! [`Trace`] groups raw events by process and profiling session, runs the
//! call reconstruction for every sampled thread, and exposes the results
//! together with the trace bounds and the screenshot filmstrip.

use crate::calls::{CallId, ParserConfig, ProfileCall, ProfileCallsParser, Violation, verify_calls};
use crate::event::{RawTrace, Timestamp, TraceEvent};
use crate::node::ProfileNode;
use crate::profile::{Profile, ProfileSession};
use crate::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Read;

// ============================================================================
// Result types
// ============================================================================

/// A filmstrip frame captured during recording.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Screenshot {
    /// Base64-encoded image.
    pub base64: String,
    pub timestamp: Timestamp,
}

/// The calls reconstructed from one profiling session.
#[derive(Debug, Clone)]
pub struct ThreadCalls {
    pub pid: u64,
    pub tid: u64,
    pub session_id: String,
    /// Profile the calls' `node` indices point into.
    pub profile: Profile,
    pub calls: Vec<ProfileCall>,
}

impl ThreadCalls {
    pub fn node(&self, id: CallId) -> &ProfileNode {
        self.profile.nodes.get(self.calls[id].node)
    }

    /// Call chain from the outermost call down to `id`, inclusive.
    pub fn stack(&self, id: CallId) -> Vec<CallId> {
        let mut stack = Vec::with_capacity(self.calls[id].depth + 1);
        let mut current = Some(id);
        while let Some(call) = current {
            stack.push(call);
            current = self.calls[call].parent;
        }
        stack.reverse();
        stack
    }

    /// Direct callees of `id`, in opening order.
    pub fn children(&self, id: CallId) -> impl Iterator<Item = CallId> + '_ {
        self.calls
            .iter()
            .enumerate()
            .filter(move |(_, call)| call.parent == Some(id))
            .map(|(child, _)| child)
    }
}

/// A call together with the thread it belongs to.
#[derive(Debug, Clone, Copy)]
pub struct CallRef<'a> {
    pub thread: &'a ThreadCalls,
    pub id: CallId,
    pub call: &'a ProfileCall,
}

impl<'a> CallRef<'a> {
    pub fn node(&self) -> &'a ProfileNode {
        self.thread.profile.nodes.get(self.call.node)
    }

    pub fn signature(&self) -> String {
        self.node().signature()
    }
}

// ============================================================================
// Trace
// ============================================================================

/// A fully reconstructed trace.
#[derive(Debug, Clone, Default)]
pub struct Trace {
    /// One entry per profiling session, ordered by (pid, session id).
    pub threads: Vec<ThreadCalls>,
    /// Sorted by timestamp.
    pub screenshots: Vec<Screenshot>,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
}

/// Events of one process, split the way reconstruction consumes them.
#[derive(Default)]
struct ProcessEvents<'a> {
    sessions: BTreeMap<&'a str, (Option<&'a TraceEvent>, Vec<&'a TraceEvent>)>,
    threads: BTreeMap<u64, Vec<&'a TraceEvent>>,
}

impl Trace {
    /// Parse and reconstruct a trace with the default event tables.
    pub fn parse<R: Read>(reader: R) -> Result<Self> {
        Self::parse_with_config(reader, &ParserConfig::default())
    }

    pub fn parse_with_config<R: Read>(reader: R, config: &ParserConfig) -> Result<Self> {
        let raw = RawTrace::parse(reader)?;
        Self::with_config(&raw, config)
    }

    pub fn from_raw(raw: &RawTrace) -> Result<Self> {
        Self::with_config(raw, &ParserConfig::default())
    }

    /// Reconstruct every profiling session in `raw`.
    ///
    /// Fails on the first session that cannot be rebuilt; no partial trace
    /// is returned.
    pub fn with_config(raw: &RawTrace, config: &ParserConfig) -> Result<Self> {
        let mut processes: BTreeMap<u64, ProcessEvents<'_>> = BTreeMap::new();

        for event in &raw.trace_events {
            let process = processes.entry(event.pid).or_default();
            if event.is_profile() || event.is_profile_chunk() {
                let session = process
                    .sessions
                    .entry(event.id.as_deref().unwrap_or_default())
                    .or_default();
                if event.is_profile() {
                    session.0 = Some(event);
                } else {
                    session.1.push(event);
                }
            } else {
                process.threads.entry(event.tid).or_default().push(event);
            }
        }

        let mut threads = Vec::new();
        for (pid, process) in &processes {
            for (session_id, (profile_event, chunks)) in &process.sessions {
                let Some(profile_event) = profile_event else {
                    log::warn!(
                        "process {}: profile session '{}' has {} chunks but no Profile event, skipping",
                        pid,
                        session_id,
                        chunks.len()
                    );
                    continue;
                };

                let mut session = ProfileSession::begin(profile_event);
                for chunk in chunks {
                    session.push_chunk(chunk)?;
                }
                let profile = session.finish()?;

                let events = process
                    .threads
                    .get(&profile.tid)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                let calls = ProfileCallsParser::parse(&profile, events.iter().copied(), config)?;

                threads.push(ThreadCalls {
                    pid: *pid,
                    tid: profile.tid,
                    session_id: session_id.to_string(),
                    profile,
                    calls,
                });
            }
        }

        let mut screenshots: Vec<Screenshot> = raw
            .trace_events
            .iter()
            .filter_map(|event| {
                event.screenshot().map(|base64| Screenshot {
                    base64: base64.to_string(),
                    timestamp: event.ts,
                })
            })
            .collect();
        screenshots.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

        // A zero timestamp means "unset" (metadata events), not time origin
        let mut timestamps = raw.trace_events.iter().map(|e| e.ts).filter(|&ts| ts != 0.0);
        let (start_time, end_time) = match timestamps.next() {
            Some(first) => timestamps.fold((first, first), |(lo, hi), ts| (lo.min(ts), hi.max(ts))),
            None => (0.0, 0.0),
        };

        log::debug!(
            "reconstructed {} sessions, {} screenshots, bounds [{}, {}]",
            threads.len(),
            screenshots.len(),
            start_time,
            end_time
        );

        Ok(Trace {
            threads,
            screenshots,
            start_time,
            end_time,
        })
    }

    /// Every reconstructed call, thread by thread.
    pub fn function_calls(&self) -> impl Iterator<Item = CallRef<'_>> {
        self.threads.iter().flat_map(|thread| {
            thread
                .calls
                .iter()
                .enumerate()
                .map(move |(id, call)| CallRef { thread, id, call })
        })
    }

    pub fn duration(&self) -> Timestamp {
        self.end_time - self.start_time
    }

    /// Normalize a timestamp to a timeline position in `[0, 1]`.
    pub fn position(&self, timestamp: Timestamp) -> f64 {
        let duration = self.duration();
        if duration <= 0.0 {
            return 0.0;
        }
        ((timestamp - self.start_time) / duration).clamp(0.0, 1.0)
    }

    /// Inverse of [`Trace::position`].
    pub fn timestamp_at(&self, position: f64) -> Timestamp {
        self.start_time + position.clamp(0.0, 1.0) * self.duration()
    }

    /// The screenshot closest to `timestamp`.
    ///
    /// When two screenshots are equally close, the later one wins.
    pub fn screenshot_at(&self, timestamp: Timestamp) -> Option<&Screenshot> {
        let idx = self.screenshots.partition_point(|s| s.timestamp < timestamp);
        let after = self.screenshots.get(idx);
        let before = idx.checked_sub(1).and_then(|i| self.screenshots.get(i));

        match (before, after) {
            (Some(b), Some(a)) => {
                if timestamp - b.timestamp < a.timestamp - timestamp {
                    Some(b)
                } else {
                    Some(a)
                }
            }
            (b, a) => a.or(b),
        }
    }

    /// Calls whose interval overlaps `[start, end]`.
    pub fn calls_in_range(&self, start: Timestamp, end: Timestamp) -> impl Iterator<Item = CallRef<'_>> {
        self.function_calls()
            .filter(move |c| c.call.start_time <= end && c.call.end_time >= start)
    }

    /// Calls live at `timestamp`.
    pub fn calls_at(&self, timestamp: Timestamp) -> impl Iterator<Item = CallRef<'_>> {
        self.calls_in_range(timestamp, timestamp)
    }

    /// Check every thread's calls for nesting violations.
    pub fn verify(&self) -> Vec<(&ThreadCalls, Violation)> {
        self.threads
            .iter()
            .flat_map(|thread| {
                verify_calls(&thread.calls)
                    .into_iter()
                    .map(move |violation| (thread, violation))
            })
            .collect()
    }
}
