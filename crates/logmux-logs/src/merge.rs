use logmux_types::PendingEntry;

use crate::buffer::{FlowControl, SourceBuffer, SourceStats};
use crate::filter::RecordFilter;

/// Index of a registered source, in registration order
pub type SourceId = usize;

/// Whether the consumer still wants output
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmitStatus {
    Continue,
    Closed,
}

/// Destination for merged entries
pub trait Emit {
    /// Take ownership of one entry and write it out
    fn emit(&mut self, entry: PendingEntry) -> EmitStatus;

    /// Push out anything buffered
    fn flush(&mut self) {}
}

/// Outcome of one scheduling pass
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Progress {
    /// Some source has nothing queued and is still open
    Waiting,
    /// Every source is done and drained
    Finished,
    /// The consumer went away
    SinkClosed,
}

/// Chronological k-way merge over registered sources.
///
/// An entry is only emitted once every open source has something queued,
/// so a slow source can never later produce an entry that should have come
/// first. Emission order is by (timestamp, registration index).
#[derive(Debug)]
pub struct MergeScheduler {
    sources: Vec<SourceBuffer>,
    filter: RecordFilter,
}

impl MergeScheduler {
    pub fn new(filter: RecordFilter) -> Self {
        Self {
            sources: Vec::new(),
            filter,
        }
    }

    /// Register a source; ties on timestamp go to the earlier registration
    pub fn register(&mut self, label: impl Into<String>, flow: Box<dyn FlowControl>) -> SourceId {
        self.sources.push(SourceBuffer::new(label, flow));
        self.sources.len() - 1
    }

    pub fn source(&self, id: SourceId) -> Option<&SourceBuffer> {
        self.sources.get(id)
    }

    /// New bytes from a source
    pub fn feed(&mut self, id: SourceId, chunk: &[u8]) {
        if let Some(source) = self.sources.get_mut(id) {
            source.feed(chunk, &self.filter);
        }
    }

    /// Source reached end of data
    pub fn finish(&mut self, id: SourceId) {
        if let Some(source) = self.sources.get_mut(id) {
            source.finish(&self.filter);
        }
    }

    /// Source failed or was cancelled; queued entries are still emitted
    pub fn close(&mut self, id: SourceId) {
        if let Some(source) = self.sources.get_mut(id) {
            source.close();
        }
    }

    /// Stop accepting input from every source
    pub fn close_all(&mut self) {
        for source in &mut self.sources {
            source.close();
        }
    }

    /// Every source is done and drained
    pub fn is_finished(&self) -> bool {
        self.sources.iter().all(|s| s.is_done() && !s.has_pending())
    }

    /// Emit everything that can be emitted in the current state, then
    /// adjust pause/resume so the blocking sources can catch up
    pub fn drain<E: Emit + ?Sized>(&mut self, emit: &mut E) -> Progress {
        loop {
            if self.emit_untimed(emit) == EmitStatus::Closed {
                return Progress::SinkClosed;
            }

            if self.sources.iter().any(Self::is_blocking) {
                self.apply_backpressure();
                return Progress::Waiting;
            }

            let Some(id) = self.earliest() else {
                return Progress::Finished;
            };
            let Some(entry) = self.sources[id].pop_earliest() else {
                return Progress::Finished;
            };
            if emit.emit(entry) == EmitStatus::Closed {
                return Progress::SinkClosed;
            }
        }
    }

    /// Per-source summary, in registration order
    pub fn stats(&self) -> Vec<(&str, &SourceStats)> {
        self.sources.iter().map(|s| (s.label(), s.stats())).collect()
    }

    /// Open and nothing queued
    fn is_blocking(source: &SourceBuffer) -> bool {
        !source.is_done() && !source.has_pending()
    }

    /// Entries without a timestamp never take part in the time comparison;
    /// they leave as soon as they reach the front of their own queue
    fn emit_untimed<E: Emit + ?Sized>(&mut self, emit: &mut E) -> EmitStatus {
        for source in &mut self.sources {
            while source
                .peek_earliest()
                .is_some_and(|entry| entry.timestamp.is_none())
            {
                if let Some(entry) = source.pop_earliest() {
                    if emit.emit(entry) == EmitStatus::Closed {
                        return EmitStatus::Closed;
                    }
                }
            }
        }
        EmitStatus::Continue
    }

    /// Source whose head entry is earliest, first registered on ties
    fn earliest(&self) -> Option<SourceId> {
        self.sources
            .iter()
            .enumerate()
            .filter_map(|(id, source)| {
                source
                    .peek_earliest()
                    .and_then(|entry| entry.timestamp)
                    .map(|ts| (ts, id))
            })
            .min()
            .map(|(_, id)| id)
    }

    /// Pause sources that are ahead, resume the ones we are waiting on
    fn apply_backpressure(&mut self) {
        for source in &mut self.sources {
            if source.is_done() {
                continue;
            }
            if source.has_pending() {
                source.pause();
            } else if source.is_paused() {
                source.resume();
            }
        }
    }
}
