use std::io;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::buffer::SourceStats;
use crate::filter::RecordFilter;
use crate::merge::{Emit, MergeScheduler, Progress};
use crate::stream::{SourceEvent, SourceEventKind, SourceSpec, SourceStreamManager};

/// Events in flight between readers and the scheduler. Each reader also
/// waits for its previous chunk to be consumed before sending another.
const EVENT_CAPACITY: usize = 16;

/// What happened during a run
#[derive(Debug, Default)]
pub struct PipelineReport {
    /// Sources that could not be opened or read
    pub failed: Vec<(String, io::Error)>,

    /// The consumer stopped accepting output
    pub sink_closed: bool,

    /// Stopped by the cancellation token
    pub cancelled: bool,

    /// Per-source line counts, in registration order
    pub stats: Vec<(String, SourceStats)>,
}

impl PipelineReport {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Reads every source concurrently and writes one chronologically merged
/// stream to an [`Emit`] target
#[derive(Debug)]
pub struct Pipeline {
    filter: RecordFilter,
}

impl Pipeline {
    pub fn new(filter: RecordFilter) -> Self {
        Self { filter }
    }

    /// Run until every source ends, the sink closes, or `cancel` fires.
    ///
    /// Source failures are collected in the report; other sources keep
    /// going. On cancellation no further chunks are accepted, but entries
    /// already queued are still written.
    pub async fn run<E: Emit + ?Sized>(
        self,
        sources: Vec<SourceSpec>,
        emit: &mut E,
        cancel: CancellationToken,
    ) -> PipelineReport {
        let mut report = PipelineReport::default();
        let mut merge = MergeScheduler::new(self.filter);
        let mut streams = SourceStreamManager::new(cancel.child_token());
        let (event_tx, mut event_rx) = mpsc::channel::<SourceEvent>(EVENT_CAPACITY);

        let mut labels = Vec::with_capacity(sources.len());
        for spec in sources {
            let (pause_tx, pause_rx) = watch::channel(false);
            labels.push(spec.label());
            let id = merge.register(spec.label(), Box::new(pause_tx));
            streams.start_stream(id, spec, pause_rx, event_tx.clone());
        }
        drop(event_tx);
        tracing::debug!(sources = labels.len(), "pipeline started");

        loop {
            match merge.drain(emit) {
                Progress::Finished => break,
                Progress::SinkClosed => {
                    tracing::debug!("sink closed, stopping sources");
                    report.sink_closed = true;
                    break;
                }
                Progress::Waiting => {}
            }

            tokio::select! {
                biased;

                _ = cancel.cancelled(), if !report.cancelled => {
                    tracing::debug!("cancelled, flushing queued entries");
                    report.cancelled = true;
                    merge.close_all();
                }
                event = event_rx.recv() => match event {
                    Some(SourceEvent { source, kind, .. }) => match kind {
                        SourceEventKind::Chunk(chunk) => merge.feed(source, &chunk),
                        SourceEventKind::End => merge.finish(source),
                        SourceEventKind::Failed(e) => {
                            let label = labels.get(source).cloned().unwrap_or_default();
                            tracing::warn!(source = %label, error = %e, "source failed");
                            report.failed.push((label, e));
                            merge.close(source);
                        }
                    },
                    // Every reader has exited
                    None => merge.close_all(),
                },
            }
        }

        streams.stop();
        emit.flush();

        report.stats = merge
            .stats()
            .into_iter()
            .map(|(label, stats)| (label.to_string(), stats.clone()))
            .collect();
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::EmitStatus;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use logmux_types::PendingEntry;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use std::path::PathBuf;

    #[derive(Default)]
    struct Lines {
        out: Vec<String>,
        limit: Option<usize>,
        flushed: bool,
    }

    impl Emit for Lines {
        fn emit(&mut self, entry: PendingEntry) -> EmitStatus {
            self.out.push(entry.line);
            match self.limit {
                Some(limit) if self.out.len() >= limit => EmitStatus::Closed,
                _ => EmitStatus::Continue,
            }
        }

        fn flush(&mut self) {
            self.flushed = true;
        }
    }

    fn record(second: u32, msg: &str) -> String {
        format!(
            r#"{{"v":0,"level":30,"name":"app","hostname":"h","pid":1,"time":"2024-01-01T00:00:{:02}.000Z","msg":"{}"}}"#,
            second, msg
        )
    }

    fn write_file(dir: &tempfile::TempDir, name: &str, lines: &[String]) -> PathBuf {
        let path = dir.path().join(name);
        let body: String = lines.iter().map(|l| format!("{}\n", l)).collect();
        std::fs::write(&path, body).unwrap();
        path
    }

    fn write_gzip(dir: &tempfile::TempDir, name: &str, lines: &[String]) -> PathBuf {
        let path = dir.path().join(name);
        let mut encoder = GzEncoder::new(std::fs::File::create(&path).unwrap(), Compression::fast());
        for line in lines {
            writeln!(encoder, "{}", line).unwrap();
        }
        encoder.finish().unwrap();
        path
    }

    #[tokio::test]
    async fn test_merges_plain_and_gzip_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_file(&dir, "a.log", &[record(1, "a1"), record(3, "a3"), record(5, "a5")]);
        let b = write_gzip(&dir, "b.log.gz", &[record(2, "b2"), record(4, "b4")]);

        let mut sink = Lines::default();
        let report = Pipeline::new(RecordFilter::new())
            .run(
                vec![SourceSpec::File(a), SourceSpec::File(b)],
                &mut sink,
                CancellationToken::new(),
            )
            .await;

        let expected: Vec<String> = vec![
            record(1, "a1"),
            record(2, "b2"),
            record(3, "a3"),
            record(4, "b4"),
            record(5, "a5"),
        ];
        assert_eq!(sink.out, expected);
        assert!(sink.flushed);
        assert!(!report.has_failures());
        assert!(!report.sink_closed);
        assert_eq!(report.stats.len(), 2);
        assert_eq!(report.stats[1].1.kept, 2);
    }

    #[tokio::test]
    async fn test_failed_source_does_not_stop_others() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_file(&dir, "good.log", &[record(1, "x"), record(2, "y")]);
        let missing = dir.path().join("missing.log");

        let mut sink = Lines::default();
        let report = Pipeline::new(RecordFilter::new())
            .run(
                vec![SourceSpec::File(missing.clone()), SourceSpec::File(good)],
                &mut sink,
                CancellationToken::new(),
            )
            .await;

        assert_eq!(sink.out, vec![record(1, "x"), record(2, "y")]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, missing.display().to_string());
        assert_eq!(report.failed[0].1.kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_filter_applies_across_sources() {
        let dir = tempfile::tempdir().unwrap();
        let warn = r#"{"v":0,"level":40,"name":"app","hostname":"h","pid":1,"time":"2024-01-01T00:00:02Z","msg":"w"}"#;
        let a = write_file(&dir, "a.log", &[record(1, "info"), warn.to_string()]);
        let b = write_file(&dir, "b.log", &["plain text".to_string()]);

        let filter = RecordFilter::new().with_min_level(40).strict(true);
        let mut sink = Lines::default();
        let report = Pipeline::new(filter)
            .run(
                vec![SourceSpec::File(a), SourceSpec::File(b)],
                &mut sink,
                CancellationToken::new(),
            )
            .await;

        assert_eq!(sink.out, vec![warn.to_string()]);
        assert_eq!(report.stats[0].1.dropped, 1);
        assert_eq!(report.stats[1].1.dropped, 1);
    }

    #[tokio::test]
    async fn test_sink_close_stops_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let lines: Vec<String> = (0..50).map(|s| record(s, "m")).collect();
        let a = write_file(&dir, "a.log", &lines);

        let mut sink = Lines {
            limit: Some(3),
            ..Default::default()
        };
        let report = Pipeline::new(RecordFilter::new())
            .run(vec![SourceSpec::File(a)], &mut sink, CancellationToken::new())
            .await;

        assert!(report.sink_closed);
        assert_eq!(sink.out.len(), 3);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_file(&dir, "a.log", &[record(1, "x")]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut sink = Lines::default();
        let report = Pipeline::new(RecordFilter::new())
            .run(vec![SourceSpec::File(a)], &mut sink, cancel)
            .await;

        assert!(report.cancelled);
        assert!(sink.flushed);
    }

    #[tokio::test]
    async fn test_no_sources_finishes_immediately() {
        let mut sink = Lines::default();
        let report = Pipeline::new(RecordFilter::new())
            .run(Vec::new(), &mut sink, CancellationToken::new())
            .await;
        assert!(sink.out.is_empty());
        assert!(!report.cancelled);
    }
}
