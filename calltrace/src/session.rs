//! Interactive query session over one loaded trace.
//!
//! Mirrors how the timeline viewer is driven: a trace is loaded, the user
//! places pairs of markers on the timeline (positions in `[0, 1]`), and the
//! marked ranges are submitted for attribution. Every query issued before a
//! trace is loaded fails with [`TraceError::TraceNotYetLoaded`].

use crate::Result;
use crate::attribution::{TimeRange, strike_counts};
use calltrace_parse::{CallRef, Screenshot, Trace, TraceError};
use std::collections::BTreeMap;

/// A marked span of the timeline, in positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkedRange {
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Default)]
pub struct TraceSession {
    trace: Option<Trace>,
    ranges: Vec<MarkedRange>,
    /// First marker of a range still waiting for its second marker.
    pending_marker: Option<f64>,
}

impl TraceSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current trace. Marked ranges belong to the old timeline
    /// and are dropped.
    pub fn load(&mut self, trace: Trace) {
        log::info!(
            "loaded trace: {} profiled threads, {} screenshots",
            trace.threads.len(),
            trace.screenshots.len()
        );
        self.trace = Some(trace);
        self.ranges.clear();
        self.pending_marker = None;
    }

    pub fn is_loaded(&self) -> bool {
        self.trace.is_some()
    }

    pub fn trace(&self) -> Result<&Trace> {
        self.trace
            .as_ref()
            .ok_or_else(|| TraceError::TraceNotYetLoaded.into())
    }

    pub fn function_call_count(&self) -> Result<usize> {
        Ok(self.trace()?.function_calls().count())
    }

    /// Calls overlapping the span between two timeline positions.
    pub fn calls_in_range(&self, start: f64, end: f64) -> Result<Vec<CallRef<'_>>> {
        let trace = self.trace()?;
        let range = TimeRange::new(trace.timestamp_at(start), trace.timestamp_at(end));
        Ok(trace.calls_in_range(range.start, range.end).collect())
    }

    /// The screenshot to show at a timeline position.
    pub fn screenshot_at(&self, position: f64) -> Result<Option<&Screenshot>> {
        let trace = self.trace()?;
        Ok(trace.screenshot_at(trace.timestamp_at(position)))
    }

    /// Place a marker. Every second marker closes a range with the previous
    /// one; returns the range when that happens.
    pub fn place_marker(&mut self, position: f64) -> Result<Option<MarkedRange>> {
        self.trace()?;
        let position = position.clamp(0.0, 1.0);

        match self.pending_marker.take() {
            Some(first) => {
                let range = MarkedRange {
                    start: first.min(position),
                    end: first.max(position),
                };
                self.ranges.push(range);
                Ok(Some(range))
            }
            None => {
                self.pending_marker = Some(position);
                Ok(None)
            }
        }
    }

    /// Drop a half-placed range.
    pub fn abort_marker(&mut self) {
        self.pending_marker = None;
    }

    /// Mark a complete range directly.
    pub fn mark_range(&mut self, start: f64, end: f64) -> Result<MarkedRange> {
        self.trace()?;
        let (start, end) = (start.clamp(0.0, 1.0), end.clamp(0.0, 1.0));
        let range = MarkedRange {
            start: start.min(end),
            end: start.max(end),
        };
        self.ranges.push(range);
        Ok(range)
    }

    pub fn remove_last_range(&mut self) -> Option<MarkedRange> {
        self.ranges.pop()
    }

    pub fn clear_ranges(&mut self) {
        self.ranges.clear();
        self.pending_marker = None;
    }

    pub fn ranges(&self) -> &[MarkedRange] {
        &self.ranges
    }

    /// Marked ranges converted to absolute trace time.
    pub fn time_ranges(&self) -> Result<Vec<TimeRange>> {
        let trace = self.trace()?;
        Ok(self
            .ranges
            .iter()
            .map(|range| TimeRange::new(trace.timestamp_at(range.start), trace.timestamp_at(range.end)))
            .collect())
    }

    /// Strike counts per signature over the marked ranges.
    pub fn strikes(&self) -> Result<BTreeMap<String, u64>> {
        let trace = self.trace()?;
        let ranges = self.time_ranges()?;
        let strikes = strike_counts(trace.function_calls(), &ranges);
        log::debug!(
            "{} ranges struck {} distinct signatures",
            ranges.len(),
            strikes.len()
        );
        Ok(strikes)
    }
}
