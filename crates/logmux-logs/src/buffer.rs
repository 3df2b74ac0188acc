use std::collections::VecDeque;

use tokio::sync::watch;

use logmux_types::PendingEntry;

use crate::filter::RecordFilter;
use crate::line::LineReassembler;
use crate::parser::LogParser;

/// Switch controlling whether a source's reader keeps pulling chunks
pub trait FlowControl: Send {
    fn set_paused(&self, paused: bool);
}

/// Readers watch this channel and stop reading while it holds `true`
impl FlowControl for watch::Sender<bool> {
    fn set_paused(&self, paused: bool) {
        self.send_replace(paused);
    }
}

/// Flow control for sources whose input is already fully in hand
pub struct NoFlowControl;

impl FlowControl for NoFlowControl {
    fn set_paused(&self, _paused: bool) {}
}

/// Counts kept for the end-of-run summary
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceStats {
    pub lines: usize,
    pub kept: usize,
    pub dropped: usize,
}

/// Per-source queue of kept entries waiting for the merge.
///
/// Entries stay in arrival order; input from one source is trusted to
/// already be in time order.
pub struct SourceBuffer {
    /// Display label (path or `<stdin>`)
    label: String,

    /// Splits incoming chunks into lines
    reassembler: LineReassembler,

    /// Kept entries, oldest first
    pending: VecDeque<PendingEntry>,

    /// No more input will arrive
    done: bool,

    /// Reader currently told to stop pulling chunks
    paused: bool,

    /// Reader switch
    flow: Box<dyn FlowControl>,

    stats: SourceStats,
}

impl SourceBuffer {
    pub fn new(label: impl Into<String>, flow: Box<dyn FlowControl>) -> Self {
        Self {
            label: label.into(),
            reassembler: LineReassembler::new(),
            pending: VecDeque::new(),
            done: false,
            paused: false,
            flow,
            stats: SourceStats::default(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Feed a raw chunk; every completed line is classified, filtered and
    /// queued if kept
    pub fn feed(&mut self, chunk: &[u8], filter: &RecordFilter) {
        if self.done {
            return;
        }
        let lines: Vec<String> = self.reassembler.push(chunk).collect();
        for line in lines {
            self.admit(line, filter);
        }
    }

    /// End of data: flush the trailing fragment and mark done
    pub fn finish(&mut self, filter: &RecordFilter) {
        if self.done {
            return;
        }
        if let Some(line) = self.reassembler.finish() {
            self.admit(line, filter);
        }
        self.done = true;
    }

    /// Stop accepting input without flushing the unterminated fragment
    pub fn close(&mut self) {
        self.done = true;
    }

    fn admit(&mut self, line: String, filter: &RecordFilter) {
        self.stats.lines += 1;
        let classified = LogParser::classify(&line);
        match filter.admit(line, classified) {
            Some(entry) => {
                self.stats.kept += 1;
                self.pending.push_back(entry);
            }
            None => self.stats.dropped += 1,
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// The oldest queued entry
    pub fn peek_earliest(&self) -> Option<&PendingEntry> {
        self.pending.front()
    }

    /// Remove the oldest queued entry
    pub fn pop_earliest(&mut self) -> Option<PendingEntry> {
        self.pending.pop_front()
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Ask the reader to stop pulling chunks. No-op if already paused.
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            tracing::debug!(
                source = %self.label,
                pending = self.pending.len(),
                "pausing source"
            );
            self.flow.set_paused(true);
        }
    }

    /// Let the reader continue. No-op unless paused.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            tracing::debug!(source = %self.label, "resuming source");
            self.flow.set_paused(false);
        }
    }

    pub fn stats(&self) -> &SourceStats {
        &self.stats
    }
}

impl std::fmt::Debug for SourceBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceBuffer")
            .field("label", &self.label)
            .field("pending", &self.pending.len())
            .field("done", &self.done)
            .field("paused", &self.paused)
            .finish()
    }
}
