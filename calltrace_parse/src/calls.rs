//! Call interval reconstruction.
//!
//! [`ProfileCallsParser`] walks one thread's duration events and CPU samples
//! in time order and maintains a call stack. Samples open and close calls by
//! diffing their ancestor chain against the stack; events bound how far
//! the stack may unwind through *pins*, the stack depth recorded when a
//! scope opened.
//!
//! Samples that arrive outside any JS-invocation event get an implicit
//! ("fake") invocation scope, so the calls they open are closed again when
//! the next event starts.

use crate::event::{CompleteEvent, Timestamp, TraceEvent, complete_events};
use crate::node::NodeId;
use crate::profile::{Profile, ProfileSample};
use crate::{Result, TraceError};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

/// Index of a call inside the list returned by the parser.
pub type CallId = usize;

/// One reconstructed function activation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileCall {
    /// Node in the owning profile's arena.
    pub node: NodeId,
    pub parent: Option<CallId>,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub depth: usize,
}

/// Event-name tables driving the reconstruction.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Events that start a new task; they reset the whole call stack.
    pub task_boundary_events: Vec<String>,
    /// Events known to run JavaScript.
    pub js_invocation_events: Vec<String>,
    /// Name prefixes that also mark JS invocations, compared ignoring ASCII case.
    pub js_invocation_prefixes: Vec<String>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            task_boundary_events: vec!["RunTask".to_string(), "RunMicrotasks".to_string()],
            js_invocation_events: vec![
                "RunMicrotasks".to_string(),
                "FunctionCall".to_string(),
                "EvaluateScript".to_string(),
                "EventDispatch".to_string(),
            ],
            js_invocation_prefixes: vec!["v8.".to_string()],
        }
    }
}

impl ParserConfig {
    pub fn is_task_boundary(&self, name: &str) -> bool {
        self.task_boundary_events.iter().any(|n| n == name)
    }

    pub fn is_js_invocation(&self, name: &str) -> bool {
        if self.js_invocation_events.iter().any(|n| n == name) {
            return true;
        }
        self.js_invocation_prefixes.iter().any(|prefix| {
            name.get(..prefix.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
        })
    }
}

/// A point in the merged event/sample stream.
#[derive(Debug, Clone, Copy)]
enum Frame<'a> {
    Event(CompleteEvent<'a>),
    Sample(ProfileSample),
}

impl Frame<'_> {
    fn start_time(&self) -> Timestamp {
        match self {
            Frame::Event(event) => event.start_time,
            Frame::Sample(sample) => sample.timestamp,
        }
    }

    fn end_time(&self) -> Timestamp {
        match self {
            Frame::Event(event) => event.end_time,
            Frame::Sample(sample) => sample.timestamp,
        }
    }
}

/// Merge time-ordered events and samples. An event starting at a sample's
/// timestamp comes first, so it scopes that sample.
fn merge_frames<'a>(events: &[CompleteEvent<'a>], samples: &[ProfileSample]) -> Vec<Frame<'a>> {
    let mut frames = Vec::with_capacity(events.len() + samples.len());
    let mut events = events.iter().peekable();
    let mut samples = samples.iter().peekable();

    loop {
        let frame = match (events.peek(), samples.peek()) {
            (Some(event), Some(sample)) if event.start_time <= sample.timestamp => {
                Frame::Event(**event)
            }
            (_, Some(sample)) => Frame::Sample(**sample),
            (Some(event), None) => Frame::Event(**event),
            (None, None) => break,
        };
        match frame {
            Frame::Event(_) => {
                events.next();
            }
            Frame::Sample(_) => {
                samples.next();
            }
        }
        frames.push(frame);
    }

    frames
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeKind {
    /// Opened by a duration event.
    Event,
    /// Implicit invocation around samples outside any JS event.
    FakeInvocation,
}

#[derive(Debug, Clone, Copy)]
struct Scope {
    pin: usize,
    kind: ScopeKind,
}

/// How a sample relates to the scopes open when it arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationState {
    /// No JS invocation is open; the sample opens a fake one.
    Idle,
    /// The innermost open event runs JavaScript.
    InRealInvocation,
    /// A fake invocation opened by an earlier sample is still open.
    InFakeInvocation,
}

/// Rebuilds call intervals for one thread.
pub struct ProfileCallsParser<'a> {
    profile: &'a Profile,
    config: &'a ParserConfig,
    event_stack: Vec<CompleteEvent<'a>>,
    call_stack: Vec<CallId>,
    scopes: Vec<Scope>,
    calls: Vec<ProfileCall>,
}

impl<'a> ProfileCallsParser<'a> {
    /// Reconstruct the calls of `profile`'s thread.
    ///
    /// `events` are the thread's other trace events; anything that is not a
    /// duration event is ignored. Returns every call opened during the
    /// pass, in opening order; `parent` indices point into the same list.
    pub fn parse<I>(profile: &'a Profile, events: I, config: &'a ParserConfig) -> Result<Vec<ProfileCall>>
    where
        I: IntoIterator<Item = &'a TraceEvent>,
    {
        let complete = complete_events(events)?;
        let frames = merge_frames(&complete, &profile.samples);

        let mut parser = ProfileCallsParser {
            profile,
            config,
            event_stack: Vec::new(),
            call_stack: Vec::new(),
            scopes: Vec::new(),
            calls: Vec::new(),
        };
        parser.run(&frames)?;

        log::debug!(
            "thread {}:{}: {} events, {} samples -> {} calls",
            profile.pid,
            profile.tid,
            complete.len(),
            profile.samples.len(),
            parser.calls.len()
        );

        Ok(parser.calls)
    }

    fn run(&mut self, frames: &[Frame<'a>]) -> Result<()> {
        for frame in frames {
            let frame_start = frame.start_time();

            while let Some(parent) = self.event_stack.last() {
                if frame_start < parent.end_time {
                    break;
                }
                let end_time = parent.end_time;
                self.event_stack.pop();
                self.on_event_end(end_time)?;
            }

            match frame {
                Frame::Event(event) => {
                    self.on_event_start(event)?;
                    self.event_stack.push(*event);
                }
                Frame::Sample(sample) => self.on_sample(sample)?,
            }
        }

        while let Some(event) = self.event_stack.pop() {
            self.on_event_end(event.end_time)?;
        }

        let last_end = frames.last().map_or(0.0, Frame::end_time);
        self.scopes.clear();
        self.truncate_call_stack(0, last_end)
    }

    fn current_pin(&self) -> usize {
        self.scopes.last().map_or(0, |scope| scope.pin)
    }

    fn in_fake_invocation(&self) -> bool {
        self.scopes
            .last()
            .is_some_and(|scope| scope.kind == ScopeKind::FakeInvocation)
    }

    fn close_fake_invocation(&mut self, timestamp: Timestamp) -> Result<()> {
        if !self.in_fake_invocation() {
            return Ok(());
        }
        let pin = self.scopes.pop().map_or(0, |scope| scope.pin);
        self.truncate_call_stack(pin, timestamp)
    }

    fn on_event_start(&mut self, event: &CompleteEvent<'a>) -> Result<()> {
        if self.config.is_task_boundary(event.name()) {
            self.scopes.clear();
            self.truncate_call_stack(0, event.start_time)?;
        }

        self.close_fake_invocation(event.start_time)?;

        self.scopes.push(Scope {
            pin: self.call_stack.len(),
            kind: ScopeKind::Event,
        });
        Ok(())
    }

    fn on_event_end(&mut self, end_time: Timestamp) -> Result<()> {
        // A fake invocation opened inside this event ends with it
        self.close_fake_invocation(end_time)?;

        let pin = self.scopes.pop().map_or(0, |scope| scope.pin);
        self.truncate_call_stack(pin, end_time)
    }

    fn invocation_state(&self) -> InvocationState {
        if self.in_fake_invocation() {
            InvocationState::InFakeInvocation
        } else if self
            .event_stack
            .last()
            .is_some_and(|event| self.config.is_js_invocation(event.name()))
        {
            InvocationState::InRealInvocation
        } else {
            InvocationState::Idle
        }
    }

    fn on_sample(&mut self, sample: &ProfileSample) -> Result<()> {
        match self.invocation_state() {
            InvocationState::InRealInvocation | InvocationState::InFakeInvocation => {
                self.update_call_stack(sample)
            }
            InvocationState::Idle => {
                let pin = self.call_stack.len();
                self.update_call_stack(sample)?;
                self.scopes.push(Scope {
                    pin,
                    kind: ScopeKind::FakeInvocation,
                });
                Ok(())
            }
        }
    }

    fn update_call_stack(&mut self, sample: &ProfileSample) -> Result<()> {
        let profile: &'a Profile = self.profile;
        let nodes = &profile.nodes;

        // GC samples only stretch the running call
        if Some(sample.node) == nodes.garbage_collector {
            if let Some(&top) = self.call_stack.last() {
                self.calls[top].end_time = sample.timestamp;
            }
            return Ok(());
        }

        let new_nodes: Vec<NodeId> = nodes
            .stack(sample.node)
            .into_iter()
            .filter(|&node| !nodes.get(node).is_meta())
            .collect();

        let min_len = self.call_stack.len().min(new_nodes.len());
        let mut index = self.current_pin();
        while index < min_len && self.calls[self.call_stack[index]].node == new_nodes[index] {
            index += 1;
        }

        self.truncate_call_stack(index, sample.timestamp)?;

        for (depth, &node) in new_nodes.iter().enumerate().skip(index) {
            let id = self.calls.len();
            self.calls.push(ProfileCall {
                node,
                parent: self.call_stack.last().copied(),
                start_time: sample.timestamp,
                end_time: sample.timestamp,
                depth,
            });
            self.call_stack.push(id);
        }

        Ok(())
    }

    /// Close every call above `depth` at `timestamp`.
    fn truncate_call_stack(&mut self, depth: usize, timestamp: Timestamp) -> Result<()> {
        let pin = self.current_pin();
        if depth < pin || depth > self.call_stack.len() {
            return Err(TraceError::InvalidTruncationDepth {
                depth,
                pin,
                stack_len: self.call_stack.len(),
            });
        }

        for id in self.call_stack.drain(depth..) {
            let call = &mut self.calls[id];
            call.end_time = timestamp.max(call.start_time);
        }
        Ok(())
    }
}

/// A broken structural invariant in a reconstructed call list.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Violation {
    #[error("call {call} ends before it starts")]
    EndBeforeStart { call: CallId },

    #[error("call {call} has depth {depth}, expected {expected}")]
    DepthMismatch {
        call: CallId,
        depth: usize,
        expected: usize,
    },

    #[error("call {call} points at non-existent parent {parent}")]
    UnknownParent { call: CallId, parent: CallId },

    #[error("call {call} is not contained in its parent {parent}")]
    EscapesParent { call: CallId, parent: CallId },

    #[error("sibling calls {call} and {sibling} overlap")]
    OverlapsSibling { call: CallId, sibling: CallId },
}

/// Check that `calls` form a properly nested forest.
pub fn verify_calls(calls: &[ProfileCall]) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut siblings: HashMap<Option<CallId>, Vec<CallId>> = HashMap::new();

    for (id, call) in calls.iter().enumerate() {
        if call.end_time < call.start_time {
            violations.push(Violation::EndBeforeStart { call: id });
        }

        if let Some(parent) = call.parent.filter(|&parent| parent >= calls.len()) {
            violations.push(Violation::UnknownParent { call: id, parent });
            continue;
        }

        let expected = call.parent.map_or(0, |parent| calls[parent].depth + 1);
        if call.depth != expected {
            violations.push(Violation::DepthMismatch {
                call: id,
                depth: call.depth,
                expected,
            });
        }

        if let Some(parent) = call.parent {
            let outer = &calls[parent];
            if call.start_time < outer.start_time || call.end_time > outer.end_time {
                violations.push(Violation::EscapesParent { call: id, parent });
            }
        }

        siblings.entry(call.parent).or_default().push(id);
    }

    let mut groups: Vec<_> = siblings.into_values().collect();
    groups.sort();
    for mut group in groups {
        group.sort_by(|&a, &b| {
            calls[a]
                .start_time
                .total_cmp(&calls[b].start_time)
                .then(calls[a].end_time.total_cmp(&calls[b].end_time))
        });
        for pair in group.windows(2) {
            if calls[pair[1]].start_time < calls[pair[0]].end_time {
                violations.push(Violation::OverlapsSibling {
                    call: pair[1],
                    sibling: pair[0],
                });
            }
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Phase, RawTrace};
    use std::io::Cursor;

    // root(1) -> main(2) -> a(3) -> a2(5)
    //                    -> b(4)
    //         -> other(6)
    //         -> (program)(7), (garbage collector)(8), (idle)(9)
    const NODES: &str = r#"[
        {"id": 1, "callFrame": {"functionName": "(root)", "scriptId": 0}},
        {"id": 2, "parent": 1, "callFrame": {"functionName": "main", "scriptId": 1, "url": "app.js", "lineNumber": 0, "columnNumber": 0}},
        {"id": 3, "parent": 2, "callFrame": {"functionName": "a", "scriptId": 1, "url": "app.js", "lineNumber": 4, "columnNumber": 0}},
        {"id": 4, "parent": 2, "callFrame": {"functionName": "b", "scriptId": 1, "url": "app.js", "lineNumber": 8, "columnNumber": 0}},
        {"id": 5, "parent": 3, "callFrame": {"functionName": "a2", "scriptId": 1, "url": "app.js", "lineNumber": 12, "columnNumber": 0}},
        {"id": 6, "parent": 1, "callFrame": {"functionName": "other", "scriptId": 2, "url": "lib.js", "lineNumber": 0, "columnNumber": 0}},
        {"id": 7, "parent": 1, "callFrame": {"functionName": "(program)", "scriptId": 0}},
        {"id": 8, "parent": 1, "callFrame": {"functionName": "(garbage collector)", "scriptId": 0}},
        {"id": 9, "parent": 1, "callFrame": {"functionName": "(idle)", "scriptId": 0}}
    ]"#;

    /// Build a profile starting at 0 with samples at absolute `times`.
    fn profile(samples: &[(u64, f64)]) -> Profile {
        let ids: Vec<u64> = samples.iter().map(|&(id, _)| id).collect();
        let mut deltas = Vec::new();
        let mut last = 0.0;
        for &(_, ts) in samples {
            deltas.push(ts - last);
            last = ts;
        }
        let data = format!(
            r#"[
                {{"name": "Profile", "ph": "P", "pid": 1, "tid": 1, "ts": 0, "id": "0x1"}},
                {{"name": "ProfileChunk", "ph": "P", "pid": 1, "tid": 1, "ts": 0, "id": "0x1",
                  "args": {{"data": {{"cpuProfile": {{"nodes": {NODES}, "samples": {ids:?}}}, "timeDeltas": {deltas:?}}}}}}}
            ]"#
        );
        let raw = RawTrace::parse(Cursor::new(data)).unwrap();
        Profile::new(&raw.trace_events[0], &raw.trace_events[1..]).unwrap()
    }

    fn complete(name: &str, ts: f64, dur: f64) -> TraceEvent {
        TraceEvent {
            name: name.to_string(),
            cat: "devtools.timeline".to_string(),
            ph: Phase::Complete,
            pid: 1,
            tid: 1,
            ts,
            dur: Some(dur),
            ..TraceEvent::default()
        }
    }

    fn phased(ph: Phase, cat: &str, name: &str, ts: f64) -> TraceEvent {
        TraceEvent {
            name: name.to_string(),
            cat: cat.to_string(),
            ph,
            ts,
            ..TraceEvent::default()
        }
    }

    fn parse(profile: &Profile, events: &[TraceEvent]) -> Result<Vec<ProfileCall>> {
        let config = ParserConfig::default();
        ProfileCallsParser::parse(profile, events, &config)
    }

    /// (raw node id, start, end, depth) for each call.
    fn summary(profile: &Profile, calls: &[ProfileCall]) -> Vec<(u64, f64, f64, usize)> {
        calls
            .iter()
            .map(|c| (profile.nodes.get(c.node).raw_id, c.start_time, c.end_time, c.depth))
            .collect()
    }

    #[test]
    fn single_sample_in_a_task() {
        let profile = profile(&[(2, 50.0)]);
        let events = vec![complete("RunTask", 0.0, 100.0)];
        let calls = parse(&profile, &events).unwrap();

        assert_eq!(summary(&profile, &calls), vec![(2, 50.0, 100.0, 0)]);
        assert_eq!(calls[0].parent, None);
    }

    #[test]
    fn nested_samples_open_and_close_calls() {
        let profile = profile(&[(3, 10.0), (5, 20.0), (4, 30.0), (2, 40.0)]);
        let events = vec![complete("FunctionCall", 0.0, 100.0)];
        let calls = parse(&profile, &events).unwrap();

        assert_eq!(
            summary(&profile, &calls),
            vec![
                (2, 10.0, 100.0, 0),
                (3, 10.0, 30.0, 1),
                (5, 20.0, 30.0, 2),
                (4, 30.0, 40.0, 1),
            ]
        );
        assert_eq!(calls[1].parent, Some(0));
        assert_eq!(calls[2].parent, Some(1));
        assert_eq!(calls[3].parent, Some(0));
        assert!(verify_calls(&calls).is_empty());
    }

    #[test]
    fn event_starting_at_sample_time_scopes_the_sample() {
        let profile = profile(&[(2, 10.0)]);
        let events = vec![complete("RunTask", 10.0, 5.0)];
        let calls = parse(&profile, &events).unwrap();

        // The task opens first, so its end closes the call
        assert_eq!(summary(&profile, &calls), vec![(2, 10.0, 15.0, 0)]);
    }

    #[test]
    fn task_boundary_resets_the_stack() {
        let profile = profile(&[(3, 10.0), (3, 60.0)]);
        let events = vec![
            complete("FunctionCall", 0.0, 200.0),
            complete("RunTask", 50.0, 100.0),
        ];
        let calls = parse(&profile, &events).unwrap();

        // The same stack is sampled twice but the task in between splits it
        assert_eq!(
            summary(&profile, &calls),
            vec![
                (2, 10.0, 50.0, 0),
                (3, 10.0, 50.0, 1),
                (2, 60.0, 150.0, 0),
                (3, 60.0, 150.0, 1),
            ]
        );
    }

    #[test]
    fn samples_outside_events_open_a_fake_invocation() {
        let profile = profile(&[(3, 10.0), (3, 20.0)]);
        let events = vec![complete("Layout", 30.0, 5.0)];
        let calls = parse(&profile, &events).unwrap();

        // Layout starting closes the implicit invocation
        assert_eq!(
            summary(&profile, &calls),
            vec![(2, 10.0, 30.0, 0), (3, 10.0, 30.0, 1)]
        );
    }

    #[test]
    fn fake_invocation_inside_non_js_event_ends_with_the_event() {
        let profile = profile(&[(4, 10.0)]);
        let events = vec![complete("ParseHTML", 0.0, 25.0)];
        let calls = parse(&profile, &events).unwrap();

        assert_eq!(
            summary(&profile, &calls),
            vec![(2, 10.0, 25.0, 0), (4, 10.0, 25.0, 1)]
        );
    }

    #[test]
    fn fake_invocation_in_nested_event_closes_with_that_event() {
        // other is sampled inside Layout and cannot unwind main/a; once
        // Layout ends, the outer FunctionCall is free to replace a with b
        let profile = profile(&[(3, 10.0), (6, 30.0), (4, 50.0)]);
        let events = vec![complete("FunctionCall", 0.0, 100.0), complete("Layout", 20.0, 20.0)];
        let calls = parse(&profile, &events).unwrap();

        assert_eq!(
            summary(&profile, &calls),
            vec![(2, 10.0, 100.0, 0), (3, 10.0, 50.0, 1), (4, 50.0, 100.0, 1)]
        );
        assert_eq!(calls[2].parent, Some(0));
    }

    #[test]
    fn truncation_outside_pin_and_stack_is_rejected() {
        let profile = profile(&[]);
        let config = ParserConfig::default();
        let mut parser = ProfileCallsParser {
            profile: &profile,
            config: &config,
            event_stack: Vec::new(),
            call_stack: Vec::new(),
            scopes: vec![Scope {
                pin: 2,
                kind: ScopeKind::Event,
            }],
            calls: Vec::new(),
        };

        assert!(matches!(
            parser.truncate_call_stack(0, 5.0),
            Err(TraceError::InvalidTruncationDepth {
                depth: 0,
                pin: 2,
                stack_len: 0
            })
        ));
        assert!(matches!(
            parser.truncate_call_stack(3, 5.0),
            Err(TraceError::InvalidTruncationDepth {
                depth: 3,
                pin: 2,
                stack_len: 0
            })
        ));
    }

    #[test]
    fn nested_event_cannot_unwind_below_its_pin() {
        // b is sampled inside the nested invocation, above the pinned main/a
        let profile = profile(&[(3, 10.0), (4, 30.0), (6, 50.0), (3, 70.0)]);
        let events = vec![
            complete("FunctionCall", 0.0, 100.0),
            complete("v8.callFunction", 20.0, 20.0),
        ];
        let calls = parse(&profile, &events).unwrap();

        assert_eq!(
            summary(&profile, &calls),
            vec![
                (2, 10.0, 50.0, 0),
                (3, 10.0, 50.0, 1),
                (6, 50.0, 70.0, 0),
                (2, 70.0, 100.0, 0),
                (3, 70.0, 100.0, 1),
            ]
        );
        assert!(verify_calls(&calls).is_empty());
    }

    #[test]
    fn garbage_collector_sample_extends_the_running_call() {
        let profile = profile(&[(3, 10.0), (8, 20.0), (3, 30.0)]);
        let events = vec![complete("FunctionCall", 0.0, 40.0)];
        let calls = parse(&profile, &events).unwrap();

        assert_eq!(
            summary(&profile, &calls),
            vec![(2, 10.0, 40.0, 0), (3, 10.0, 40.0, 1)]
        );
    }

    #[test]
    fn garbage_collector_never_opens_a_call() {
        let profile = profile(&[(8, 10.0)]);
        let events = vec![complete("FunctionCall", 0.0, 40.0)];
        let calls = parse(&profile, &events).unwrap();

        assert!(calls.is_empty());
    }

    #[test]
    fn meta_samples_close_user_calls() {
        let profile = profile(&[(3, 10.0), (9, 20.0)]);
        let events = vec![complete("FunctionCall", 0.0, 40.0)];
        let calls = parse(&profile, &events).unwrap();

        assert_eq!(
            summary(&profile, &calls),
            vec![(2, 10.0, 20.0, 0), (3, 10.0, 20.0, 1)]
        );
    }

    #[test]
    fn begin_end_events_scope_samples() {
        let profile = profile(&[(4, 10.0)]);
        let events = vec![
            phased(Phase::Begin, "v8", "EvaluateScript", 0.0),
            phased(Phase::End, "v8", "EvaluateScript", 30.0),
        ];
        let calls = parse(&profile, &events).unwrap();

        assert_eq!(
            summary(&profile, &calls),
            vec![(2, 10.0, 30.0, 0), (4, 10.0, 30.0, 1)]
        );
    }

    #[test]
    fn trailing_calls_close_at_the_last_frame() {
        let profile = profile(&[(3, 10.0), (3, 20.0)]);
        let calls = parse(&profile, &[]).unwrap();

        assert_eq!(
            summary(&profile, &calls),
            vec![(2, 10.0, 20.0, 0), (3, 10.0, 20.0, 1)]
        );
    }

    #[test]
    fn no_frames_no_calls() {
        let profile = profile(&[]);
        let calls = parse(&profile, &[]).unwrap();

        assert!(calls.is_empty());
    }

    #[test]
    fn malformed_nesting_is_rejected() {
        let profile = profile(&[(2, 10.0)]);
        let events = vec![
            phased(Phase::Begin, "a", "x", 0.0),
            phased(Phase::End, "b", "y", 5.0),
        ];

        assert!(matches!(
            parse(&profile, &events),
            Err(TraceError::MalformedEventNesting { .. })
        ));
    }

    #[test]
    fn js_invocation_names() {
        let config = ParserConfig::default();

        assert!(config.is_js_invocation("FunctionCall"));
        assert!(config.is_js_invocation("RunMicrotasks"));
        assert!(config.is_js_invocation("v8.compile"));
        assert!(config.is_js_invocation("V8.GCScavenger"));
        assert!(!config.is_js_invocation("RunTask"));
        assert!(!config.is_js_invocation("Layout"));
        assert!(!config.is_js_invocation("v8"));
        assert!(!config.is_js_invocation("ü.compile"));
        assert!(config.is_task_boundary("RunTask"));
        assert!(!config.is_task_boundary("FunctionCall"));
    }

    #[test]
    fn calls_cover_every_sampled_frame() {
        let samples = [(5, 10.0), (4, 20.0), (6, 30.0), (5, 40.0)];
        let profile = profile(&samples);
        let events = vec![complete("FunctionCall", 0.0, 100.0)];
        let calls = parse(&profile, &events).unwrap();

        for sample in &profile.samples {
            for node in profile.nodes.stack(sample.node) {
                if profile.nodes.get(node).is_meta() {
                    continue;
                }
                let covered = calls.iter().any(|c| {
                    c.node == node && c.start_time <= sample.timestamp && sample.timestamp <= c.end_time
                });
                assert!(covered, "node {} not covered at {}", node, sample.timestamp);
            }
        }
        assert!(verify_calls(&calls).is_empty());
    }

    #[test]
    fn verify_reports_broken_nesting() {
        let calls = vec![
            ProfileCall {
                node: 0,
                parent: None,
                start_time: 0.0,
                end_time: 10.0,
                depth: 0,
            },
            ProfileCall {
                node: 1,
                parent: Some(0),
                start_time: 5.0,
                end_time: 20.0,
                depth: 2,
            },
            ProfileCall {
                node: 2,
                parent: None,
                start_time: 8.0,
                end_time: 9.0,
                depth: 0,
            },
        ];
        let violations = verify_calls(&calls);

        assert!(violations.contains(&Violation::DepthMismatch {
            call: 1,
            depth: 2,
            expected: 1
        }));
        assert!(violations.contains(&Violation::EscapesParent { call: 1, parent: 0 }));
        assert!(violations.contains(&Violation::OverlapsSibling { call: 2, sibling: 0 }));
    }

    #[test]
    fn verify_reports_dangling_parent() {
        let calls = vec![ProfileCall {
            node: 0,
            parent: Some(5),
            start_time: 0.0,
            end_time: 10.0,
            depth: 1,
        }];

        assert_eq!(
            verify_calls(&calls),
            vec![Violation::UnknownParent { call: 0, parent: 5 }]
        );
    }
}
