use std::io::Write;

use logmux_logs::{Emit, EmitStatus};
use logmux_types::PendingEntry;

use crate::config::RenderConfig;
use crate::render::render_entry;
use crate::sink::SinkWriter;

/// Renders merged entries and writes them to a sink
#[derive(Debug)]
pub struct RecordWriter<W: Write> {
    config: RenderConfig,
    sink: SinkWriter<W>,
    written: usize,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(config: RenderConfig, output: W) -> Self {
        Self {
            config,
            sink: SinkWriter::new(output),
            written: 0,
        }
    }

    /// Entries written so far
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.sink.into_inner()
    }
}

impl<W: Write> Emit for RecordWriter<W> {
    fn emit(&mut self, entry: PendingEntry) -> EmitStatus {
        let text = render_entry(&entry, &self.config);
        if self.sink.write(&text) {
            self.written += 1;
            EmitStatus::Continue
        } else {
            EmitStatus::Closed
        }
    }

    fn flush(&mut self) {
        self.sink.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputMode;
    use logmux_logs::{MergeScheduler, NoFlowControl, Progress, RecordFilter};
    use pretty_assertions::assert_eq;

    fn record(time: &str, msg: &str) -> String {
        format!(
            r#"{{"v":0,"level":30,"name":"app","hostname":"h","pid":1,"time":"{}","msg":"{}"}}"#,
            time, msg
        )
    }

    #[test]
    fn test_merged_output_rendered_in_order() {
        let mut merge = MergeScheduler::new(RecordFilter::new());
        let a = merge.register("a", Box::new(NoFlowControl));
        let b = merge.register("b", Box::new(NoFlowControl));

        let first = format!("{}\n{}\n", record("2024-01-01T00:00:01.000Z", "one"), record("2024-01-01T00:00:03.000Z", "three"));
        merge.feed(a, first.as_bytes());
        merge.feed(b, format!("{}\n", record("2024-01-01T00:00:02.000Z", "two")).as_bytes());
        merge.finish(a);
        merge.finish(b);

        let mut writer = RecordWriter::new(RenderConfig::new(OutputMode::Short), Vec::new());
        assert_eq!(merge.drain(&mut writer), Progress::Finished);
        assert_eq!(writer.written(), 3);

        let out = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(
            out,
            "00:00:01.000Z  INFO app: one\n00:00:02.000Z  INFO app: two\n00:00:03.000Z  INFO app: three\n"
        );
    }

    #[test]
    fn test_pass_through_written_verbatim() {
        let mut writer = RecordWriter::new(RenderConfig::default(), Vec::new());
        assert_eq!(writer.emit(PendingEntry::raw("not json at all".into())), EmitStatus::Continue);
        assert_eq!(writer.into_inner(), b"not json at all\n");
    }
}
