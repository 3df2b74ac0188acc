use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use flate2::write::MultiGzDecoder;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::merge::SourceId;

/// Bytes requested per read
const READ_CHUNK: usize = 64 * 1024;

/// Where a source's bytes come from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceSpec {
    Stdin,
    File(PathBuf),
}

impl SourceSpec {
    /// Label used in logs and error reports
    pub fn label(&self) -> String {
        match self {
            SourceSpec::Stdin => "<stdin>".to_string(),
            SourceSpec::File(path) => path.display().to_string(),
        }
    }

    /// Files ending in `.gz` are decompressed while reading
    pub fn is_gzip(&self) -> bool {
        match self {
            SourceSpec::Stdin => false,
            SourceSpec::File(path) => path.extension().is_some_and(|ext| ext == "gz"),
        }
    }
}

/// Something that happened to one source
#[derive(Debug)]
pub struct SourceEvent {
    pub source: SourceId,
    pub kind: SourceEventKind,

    /// Held until the event is dropped; a reader has at most one chunk in
    /// flight
    credit: Option<OwnedSemaphorePermit>,
}

#[derive(Debug)]
pub enum SourceEventKind {
    /// Decoded bytes, in order
    Chunk(Vec<u8>),
    /// End of data
    End,
    /// Open or read failed; no further events follow
    Failed(io::Error),
}

/// Manages one reader task per source
pub struct SourceStreamManager {
    /// Stops every reader
    cancel: CancellationToken,

    /// Active reader task handles
    tasks: Vec<tokio::task::JoinHandle<()>>,
}

impl SourceStreamManager {
    /// Create a manager whose readers stop when `cancel` fires
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            tasks: Vec::new(),
        }
    }

    /// Start reading a source. The reader holds off while `paused` is true
    /// and reports through `events`.
    pub fn start_stream(
        &mut self,
        source: SourceId,
        spec: SourceSpec,
        paused: watch::Receiver<bool>,
        events: mpsc::Sender<SourceEvent>,
    ) {
        let cancel = self.cancel.clone();
        let task = tokio::spawn(async move {
            let label = spec.label();
            let reader = SourceReader {
                source,
                credit: Arc::new(Semaphore::new(1)),
                paused,
                events,
                cancel,
            };
            let kind = match reader.run(&spec).await {
                Ok(true) => {
                    tracing::debug!(source = %label, "source ended");
                    SourceEventKind::End
                }
                // Cancelled or nobody listening
                Ok(false) => return,
                Err(e) => {
                    tracing::debug!(source = %label, error = %e, "source failed");
                    SourceEventKind::Failed(e)
                }
            };
            let event = SourceEvent {
                source,
                kind,
                credit: None,
            };
            let _ = reader.events.send(event).await;
        });
        self.tasks.push(task);
    }

    /// Stop all readers
    pub fn stop(&mut self) {
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for SourceStreamManager {
    fn drop(&mut self) {
        self.stop();
    }
}

/// State owned by one reader task
struct SourceReader {
    source: SourceId,
    credit: Arc<Semaphore>,
    paused: watch::Receiver<bool>,
    events: mpsc::Sender<SourceEvent>,
    cancel: CancellationToken,
}

impl SourceReader {
    /// Read to the end. Ok(true) at end of data, Ok(false) when stopped
    /// early.
    async fn run(&self, spec: &SourceSpec) -> io::Result<bool> {
        let mut input: Box<dyn AsyncRead + Unpin + Send> = match spec {
            SourceSpec::Stdin => Box::new(tokio::io::stdin()),
            SourceSpec::File(path) => Box::new(tokio::fs::File::open(path).await?),
        };
        let mut gzip = spec.is_gzip().then(|| MultiGzDecoder::new(Vec::new()));
        let mut paused = self.paused.clone();
        let mut buf = vec![0u8; READ_CHUNK];

        loop {
            if !self.wait_while_paused(&mut paused).await {
                return Ok(false);
            }

            let n = tokio::select! {
                _ = self.cancel.cancelled() => return Ok(false),
                read = input.read(&mut buf) => read?,
            };

            if n == 0 {
                if let Some(decoder) = gzip.as_mut() {
                    decoder.try_finish()?;
                    let tail = std::mem::take(decoder.get_mut());
                    if !tail.is_empty() && !self.send(tail).await {
                        return Ok(false);
                    }
                }
                return Ok(true);
            }

            let chunk = match gzip.as_mut() {
                Some(decoder) => {
                    decoder.write_all(&buf[..n])?;
                    std::mem::take(decoder.get_mut())
                }
                None => buf[..n].to_vec(),
            };
            if !chunk.is_empty() && !self.send(chunk).await {
                return Ok(false);
            }
        }
    }

    /// Returns false if cancelled or the scheduler is gone
    async fn wait_while_paused(&self, paused: &mut watch::Receiver<bool>) -> bool {
        loop {
            let is_paused = *paused.borrow_and_update();
            if !is_paused {
                break;
            }
            tokio::select! {
                _ = self.cancel.cancelled() => return false,
                changed = paused.changed() => {
                    if changed.is_err() {
                        return false;
                    }
                }
            }
        }
        !self.cancel.is_cancelled()
    }

    /// Waits until the previous chunk has been consumed
    async fn send(&self, chunk: Vec<u8>) -> bool {
        let credit = tokio::select! {
            _ = self.cancel.cancelled() => return false,
            credit = self.credit.clone().acquire_owned() => match credit {
                Ok(credit) => credit,
                Err(_) => return false,
            },
        };
        let event = SourceEvent {
            source: self.source,
            kind: SourceEventKind::Chunk(chunk),
            credit: Some(credit),
        };
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            sent = self.events.send(event) => sent.is_ok(),
        }
    }
}
