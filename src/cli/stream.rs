//! Stream demultiplexing for the child's stdout and stderr.
//!
//! Each stream is drained by its own task. Lines are recorded in the shared
//! [`Collector`] and forwarded to the caller's [`Observer`] as soon as they
//! are read, so observations arrive before the process exits. Order is kept
//! within a stream; nothing is promised across the two.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::cli::{Collector, ThreadEvent};

/// Error type for stream line decoding.
#[derive(thiserror::Error, Debug)]
pub enum StreamError {
    #[error("Failed to parse event: {reason} (input: {input})")]
    ParseError { input: String, reason: String },
    #[error("Line is not a JSON object")]
    NotJson,
}

/// One observation pushed to the caller while a call is running.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    /// A plain stdout line, or a JSON-mode line that failed to decode.
    Stdout(String),
    /// A stderr line, or a synthetic notice from the client.
    Stderr(String),
    /// A decoded JSON event.
    Event(Box<ThreadEvent>),
}

impl Observation {
    /// Text of a line observation.
    #[must_use]
    pub fn line(&self) -> Option<&str> {
        match self {
            Self::Stdout(line) | Self::Stderr(line) => Some(line),
            Self::Event(_) => None,
        }
    }
}

/// Receives observations from both stream tasks.
///
/// Called concurrently from the stdout and stderr tasks. Implementations must
/// return quickly; anything slow belongs behind a queue such as
/// [`ChannelObserver`].
pub trait Observer: Send + Sync {
    fn observe(&self, observation: Observation);
}

impl<F> Observer for F
where
    F: Fn(Observation) + Send + Sync,
{
    fn observe(&self, observation: Observation) {
        self(observation);
    }
}

/// Observer that queues observations on an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<Observation>,
}

impl ChannelObserver {
    /// Create an observer and the receiving end of its queue.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Observation>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Observer for ChannelObserver {
    fn observe(&self, observation: Observation) {
        // Receiver dropped means nobody is listening anymore.
        let _ = self.tx.send(observation);
    }
}

/// Observer that discards everything.
#[must_use]
pub fn discard() -> Arc<dyn Observer> {
    Arc::new(|_: Observation| {})
}

/// Parser for stdout lines in JSON mode.
pub struct StreamParser;

impl StreamParser {
    /// Returns true if a line is worth attempting as JSON.
    #[must_use]
    pub fn looks_like_json(line: &str) -> bool {
        line.trim_start().starts_with('{')
    }

    /// Parse a single line of `--json` output.
    ///
    /// # Errors
    ///
    /// Returns `StreamError::NotJson` if the line does not start with `{`,
    /// or `StreamError::ParseError` if decoding fails.
    pub fn parse_line(line: &str) -> Result<ThreadEvent, StreamError> {
        let trimmed = line.trim();
        if !Self::looks_like_json(trimmed) {
            return Err(StreamError::NotJson);
        }
        let mut event: ThreadEvent =
            serde_json::from_str(trimmed).map_err(|e| StreamError::ParseError {
                input: line.to_string(),
                reason: e.to_string(),
            })?;
        event.raw = line.to_string();
        Ok(event)
    }
}

/// Settings shared by the two reader tasks of one call.
#[derive(Clone)]
pub struct Demux {
    collector: Collector,
    observer: Arc<dyn Observer>,
    json: bool,
    debug: bool,
}

impl Demux {
    #[must_use]
    pub fn new(collector: Collector, observer: Arc<dyn Observer>, json: bool, debug: bool) -> Self {
        Self {
            collector,
            observer,
            json,
            debug,
        }
    }

    /// Spawn the stdout reader.
    pub fn spawn_stdout<R>(&self, reader: R) -> JoinHandle<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let demux = self.clone();
        tokio::spawn(async move {
            let mut lines = LineReader::new(reader);
            while let Some(line) = lines.next_line().await {
                demux.handle_stdout(line).await;
            }
        })
    }

    /// Spawn the stderr reader.
    pub fn spawn_stderr<R>(&self, reader: R) -> JoinHandle<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let demux = self.clone();
        tokio::spawn(async move {
            let mut lines = LineReader::new(reader);
            while let Some(line) = lines.next_line().await {
                demux.collector.push_stderr(line.clone()).await;
                demux.observer.observe(Observation::Stderr(line));
            }
        })
    }

    async fn handle_stdout(&self, line: String) {
        self.collector.push_stdout(line.clone()).await;

        if !self.json || !StreamParser::looks_like_json(&line) {
            self.observer.observe(Observation::Stdout(line));
            return;
        }

        match StreamParser::parse_line(&line) {
            Ok(event) => {
                self.collector.push_event(event.clone()).await;
                self.observer.observe(Observation::Event(Box::new(event)));
            }
            Err(e) => {
                if self.debug {
                    tracing::debug!(error = %e, "Treating undecodable JSON line as text");
                }
                self.observer.observe(Observation::Stdout(line));
            }
        }
    }
}

/// Newline-delimited reader that tolerates invalid UTF-8.
struct LineReader<R> {
    reader: BufReader<R>,
    buffer: Vec<u8>,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            buffer: Vec::with_capacity(4096),
        }
    }

    /// Next complete line without its terminator, or `None` at EOF.
    ///
    /// A trailing line without a newline is still returned. Read errors end
    /// the stream.
    async fn next_line(&mut self) -> Option<String> {
        self.buffer.clear();
        match self.reader.read_until(b'\n', &mut self.buffer).await {
            Ok(0) => None,
            Ok(_) => {
                if self.buffer.last() == Some(&b'\n') {
                    self.buffer.pop();
                    if self.buffer.last() == Some(&b'\r') {
                        self.buffer.pop();
                    }
                }
                Some(String::from_utf8_lossy(&self.buffer).into_owned())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Stream read failed");
                None
            }
        }
    }
}
