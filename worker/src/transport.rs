//! Worker Transport Layer
//!
//! Newline-delimited JSON over stdio: one `WorkerRequest` per input line, one
//! `WorkerEvent` per output line.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines};

use crate::error::{WorkerError, WorkerResult};
use crate::protocol::{WorkerEvent, WorkerRequest};
use crate::worker::{WorkerEvents, WorkerHandle};

/// One non-blank input line
#[derive(Debug)]
pub enum Incoming {
    Request(WorkerRequest),
    /// The line could not be parsed; carries the parser message
    Malformed(String),
}

/// Reads requests line by line
pub struct MessageReader<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin> MessageReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }

    /// Next message, or `None` at end of input
    ///
    /// Cancel safe: a message is never lost if the future is dropped.
    pub async fn next_message(&mut self) -> WorkerResult<Option<Incoming>> {
        while let Some(line) = self.lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            return Ok(Some(match serde_json::from_str(line) {
                Ok(request) => Incoming::Request(request),
                Err(e) => {
                    tracing::error!("Failed to parse worker request: {}", e);
                    Incoming::Malformed(e.to_string())
                }
            }));
        }
        Ok(None)
    }
}

/// Writes events, one JSON object per line
pub struct EventWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> EventWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub async fn write_event(&mut self, event: &WorkerEvent) -> WorkerResult<()> {
        let json = serde_json::to_string(event)?;
        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Reader/writer pair over the process's stdin and stdout
pub fn stdio() -> (
    MessageReader<BufReader<tokio::io::Stdin>>,
    EventWriter<tokio::io::Stdout>,
) {
    (
        MessageReader::new(BufReader::new(tokio::io::stdin())),
        EventWriter::new(tokio::io::stdout()),
    )
}

/// Pump requests into the worker and events out until input ends
///
/// At end of input the worker is closed and the call returns once every
/// queued request has finished and its events have been written.
pub async fn serve<R, W>(
    reader: &mut MessageReader<R>,
    writer: &mut EventWriter<W>,
    mut handle: WorkerHandle,
    mut events: WorkerEvents,
) -> WorkerResult<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut input_open = true;

    loop {
        tokio::select! {
            incoming = reader.next_message(), if input_open => match incoming? {
                Some(Incoming::Request(request)) => {
                    tracing::debug!("Received {} request", request.action());
                    handle.post(request)?;
                }
                Some(Incoming::Malformed(reason)) => {
                    let text = WorkerError::Malformed(reason).to_string();
                    writer.write_event(&WorkerEvent::error(text)).await?;
                }
                None => {
                    tracing::info!("Input closed, draining worker");
                    input_open = false;
                    handle.close();
                }
            },
            event = events.recv() => match event {
                Some(event) => writer.write_event(&event).await?,
                None => break,
            },
        }
    }

    handle.shutdown().await;
    Ok(())
}
