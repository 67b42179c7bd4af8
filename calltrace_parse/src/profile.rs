//! CPU profile sessions.
//!
//! A profiling session is delivered as one `Profile` header event followed
//! by any number of `ProfileChunk` events. [`ProfileSession`] accumulates
//! the chunks; [`ProfileSession::finish`] turns them into a [`Profile`] with
//! absolute, time-sorted samples.

use crate::event::{RawProfileNode, Timestamp, TraceEvent};
use crate::node::{NodeId, NodeKind, ProfileNodes};
use crate::{Result, TraceError};

/// One stack-top observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileSample {
    pub timestamp: Timestamp,
    pub node: NodeId,
}

/// Accumulates the chunks of one profiling session.
#[derive(Debug, Clone)]
pub struct ProfileSession {
    pid: u64,
    tid: u64,
    session_id: String,
    start_time: Timestamp,
    nodes: Vec<RawProfileNode>,
    samples: Vec<u64>,
    time_deltas: Vec<Timestamp>,
}

impl ProfileSession {
    /// Start a session from its `Profile` header event.
    pub fn begin(profile_event: &TraceEvent) -> Self {
        Self {
            pid: profile_event.pid,
            tid: profile_event.tid,
            session_id: profile_event.id.clone().unwrap_or_default(),
            start_time: profile_event.ts,
            nodes: Vec::new(),
            samples: Vec::new(),
            time_deltas: Vec::new(),
        }
    }

    /// Append the data of a `ProfileChunk` event.
    pub fn push_chunk(&mut self, chunk_event: &TraceEvent) -> Result<()> {
        let Some(chunk) = chunk_event.profile_chunk()? else {
            return Ok(());
        };

        if let Some(cpu_profile) = chunk.cpu_profile {
            self.nodes.extend(cpu_profile.nodes);
            self.samples.extend(cpu_profile.samples);
        }
        self.time_deltas.extend(chunk.time_deltas);
        Ok(())
    }

    /// Close the session and build the profile.
    pub fn finish(self) -> Result<Profile> {
        let nodes = ProfileNodes::build(&self.nodes)?;

        let mut current_time = self.start_time;
        let timestamps: Vec<Timestamp> = self
            .time_deltas
            .iter()
            .map(|delta| {
                current_time += delta;
                current_time
            })
            .collect();

        if self.samples.len() != timestamps.len() {
            return Err(TraceError::SampleCountMismatch {
                samples: self.samples.len(),
                timestamps: timestamps.len(),
            });
        }

        // Chunks are not guaranteed to be globally ordered
        let mut order: Vec<usize> = (0..timestamps.len()).collect();
        order.sort_by(|&a, &b| timestamps[a].total_cmp(&timestamps[b]));

        let mut samples = Vec::with_capacity(order.len());
        for idx in order {
            let raw_id = self.samples[idx];
            let node = nodes
                .lookup(raw_id)
                .ok_or(TraceError::UnknownSampleNode(raw_id))?;
            samples.push(ProfileSample {
                timestamp: timestamps[idx],
                node,
            });
        }

        let mut profile = Profile {
            pid: self.pid,
            tid: self.tid,
            session_id: self.session_id,
            start_time: self.start_time,
            nodes,
            samples,
        };

        profile.splice_program_samples(|nodes, node| nodes.get(node).kind == NodeKind::Program);
        let program = profile.nodes.program;
        profile.splice_program_samples(|_, node| Some(node) == program);

        log::debug!(
            "profile {} (pid {}, tid {}): {} nodes, {} samples",
            profile.session_id,
            profile.pid,
            profile.tid,
            profile.nodes.len(),
            profile.samples.len()
        );

        Ok(profile)
    }
}

/// A finished CPU profile with node-resolved samples sorted by time.
#[derive(Debug, Clone)]
pub struct Profile {
    pub pid: u64,
    pub tid: u64,
    pub session_id: String,
    /// Timestamp of the `Profile` header event.
    pub start_time: Timestamp,
    pub nodes: ProfileNodes,
    pub samples: Vec<ProfileSample>,
}

impl Profile {
    /// Build a profile from a header event and its chunks, in order.
    pub fn new<'a, I>(profile_event: &TraceEvent, chunk_events: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a TraceEvent>,
    {
        let mut session = ProfileSession::begin(profile_event);
        for chunk in chunk_events {
            session.push_chunk(chunk)?;
        }
        session.finish()
    }

    /// Reattribute `(program)` samples that interrupt a single user call.
    ///
    /// A sample matching `is_program` whose neighbours are both non-meta and
    /// share a stack bottom takes the previous sample's node. The scan runs
    /// in place, so a replaced sample is the predecessor of the next one.
    fn splice_program_samples<F>(&mut self, is_program: F)
    where
        F: Fn(&ProfileNodes, NodeId) -> bool,
    {
        let nodes = &self.nodes;
        let samples = &mut self.samples;

        for idx in 1..samples.len().saturating_sub(1) {
            let prev = samples[idx - 1].node;
            let next = samples[idx + 1].node;

            if is_program(nodes, samples[idx].node)
                && !nodes.get(prev).is_meta()
                && !nodes.get(next).is_meta()
                && nodes.stack_bottom(prev) == nodes.stack_bottom(next)
            {
                samples[idx].node = prev;
            }
        }
    }
}
