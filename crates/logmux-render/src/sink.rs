use std::io::{self, Write};

/// Best-effort writer for rendered output.
///
/// The first write error is logged and closes the sink; later writes are
/// ignored. A broken pipe means the consumer went away and is not treated
/// as a failure.
#[derive(Debug)]
pub struct SinkWriter<W: Write> {
    inner: W,
    closed: bool,
}

impl<W: Write> SinkWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            closed: false,
        }
    }

    /// Write text; returns false once the sink is closed
    pub fn write(&mut self, text: &str) -> bool {
        if self.closed {
            return false;
        }
        if let Err(e) = self.inner.write_all(text.as_bytes()) {
            self.fail(e);
        }
        !self.closed
    }

    pub fn flush(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.inner.flush() {
            self.fail(e);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    fn fail(&mut self, error: io::Error) {
        self.closed = true;
        if error.kind() == io::ErrorKind::BrokenPipe {
            tracing::debug!("output closed by reader");
        } else {
            tracing::warn!(error = %error, "write to output failed");
        }
    }
}
