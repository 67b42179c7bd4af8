//! Signature attribution over marked time ranges.
//!
//! A call is "struck" when it starts inside one of the ranges a user marked
//! on the timeline. Counting strikes per function signature points at the
//! code responsible for the marked slowdowns.

use crate::{Result, ToolError};
use calltrace_parse::{CallRef, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// An inclusive interval of absolute trace time, in microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl TimeRange {
    /// Build a range from two bounds given in any order.
    pub fn new(a: Timestamp, b: Timestamp) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn contains(&self, timestamp: Timestamp) -> bool {
        timestamp >= self.start && timestamp <= self.end
    }
}

impl FromStr for TimeRange {
    type Err = ToolError;

    /// Parse `<start>:<end>`.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ToolError::InvalidRange(s.to_string());
        let (start, end) = s.split_once(':').ok_or_else(invalid)?;
        let start: Timestamp = start.trim().parse().map_err(|_| invalid())?;
        let end: Timestamp = end.trim().parse().map_err(|_| invalid())?;
        if !start.is_finite() || !end.is_finite() {
            return Err(invalid());
        }
        Ok(TimeRange::new(start, end))
    }
}

/// Count, per signature, the calls starting inside any of `ranges`.
///
/// A call counts once even when ranges overlap.
pub fn strike_counts<'a, I>(calls: I, ranges: &[TimeRange]) -> BTreeMap<String, u64>
where
    I: IntoIterator<Item = CallRef<'a>>,
{
    let mut strikes = BTreeMap::new();
    for call in calls {
        if ranges.iter().any(|range| range.contains(call.call.start_time)) {
            *strikes.entry(call.signature()).or_insert(0) += 1;
        }
    }
    strikes
}
