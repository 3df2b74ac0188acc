//! Log processing for logmux
//!
//! This crate turns raw byte streams into filtered, chronologically merged
//! log entries: line reassembly, record classification, predicate
//! filtering, per-source buffering with backpressure and the merge itself.

mod buffer;
mod error;
mod filter;
mod line;
mod merge;
mod parser;
mod pipeline;
mod predicate;
mod stream;

pub use buffer::{FlowControl, NoFlowControl, SourceBuffer, SourceStats};
pub use error::{EvalError, FilterError, PredicateError};
pub use filter::RecordFilter;
pub use line::{LineReassembler, Lines};
pub use merge::{Emit, EmitStatus, MergeScheduler, Progress, SourceId};
pub use parser::LogParser;
pub use pipeline::{Pipeline, PipelineReport};
pub use predicate::{Predicate, minimal_record};
pub use stream::{SourceEvent, SourceEventKind, SourceSpec, SourceStreamManager};

// Re-export types used in our public API
pub use logmux_types::{Classified, LogLevel, PendingEntry, Record};
