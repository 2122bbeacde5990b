//! Progress output without a shared lock.
//!
//! Workers push [`ProgressEvent`]s into a channel; a single consumer
//! thread owns the writer and formats one line per event, so lines never
//! interleave and producers never block on I/O.

use crate::error::{BenchError, Result};
use crate::report::{millis, Outcome, Phase};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::io::{self, Write};
use std::thread::{self, JoinHandle};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    PhaseStarted {
        phase: Phase,
        units: usize,
    },
    UnitFinished {
        phase: Phase,
        index: usize,
        outcome: Outcome,
        elapsed: Duration,
    },
    PhaseFinished {
        phase: Phase,
        wall: Duration,
        failed: usize,
    },
    Note(String),
}

impl ProgressEvent {
    pub fn format_line(&self) -> String {
        match self {
            ProgressEvent::PhaseStarted { phase, units } => format!(
                "[{}/4] {}: {} units",
                phase.number(),
                phase,
                units
            ),
            ProgressEvent::UnitFinished {
                phase,
                index,
                outcome,
                elapsed,
            } => format!(
                "  {} unit {:02}: {} ({:.3} ms)",
                phase,
                index,
                outcome,
                millis(*elapsed)
            ),
            ProgressEvent::PhaseFinished {
                phase,
                wall,
                failed,
            } => format!(
                "[{}/4] {} done in {:.3} ms, {} failed",
                phase.number(),
                phase,
                millis(*wall),
                failed
            ),
            ProgressEvent::Note(text) => text.clone(),
        }
    }
}

enum Message {
    Event(ProgressEvent),
    Close,
}

/// Cheap, cloneable sender side. A disabled handle drops everything.
#[derive(Debug, Clone, Default)]
pub struct ProgressHandle {
    tx: Option<Sender<Message>>,
}

impl std::fmt::Debug for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Message::Event(ev) => ev.fmt(f),
            Message::Close => f.write_str("Close"),
        }
    }
}

impl ProgressHandle {
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn send(&self, event: ProgressEvent) {
        if let Some(tx) = &self.tx {
            // The consumer may already be gone after close
            let _ = tx.send(Message::Event(event));
        }
    }

    pub fn note(&self, text: impl Into<String>) {
        self.send(ProgressEvent::Note(text.into()));
    }
}

/// Consumer thread that owns the output writer
pub struct ProgressSink<W: Write + Send + 'static> {
    tx: Sender<Message>,
    consumer: JoinHandle<io::Result<W>>,
}

impl<W: Write + Send + 'static> ProgressSink<W> {
    pub fn spawn(writer: W) -> Result<Self> {
        let (tx, rx) = unbounded();
        let consumer = thread::Builder::new()
            .name("progress".into())
            .spawn(move || consume(rx, writer))?;
        Ok(Self { tx, consumer })
    }

    pub fn handle(&self) -> ProgressHandle {
        ProgressHandle {
            tx: Some(self.tx.clone()),
        }
    }

    /// Drain everything sent so far, stop the consumer and hand back the writer
    pub fn finish(self) -> Result<W> {
        let _ = self.tx.send(Message::Close);
        match self.consumer.join() {
            Ok(written) => Ok(written?),
            Err(_) => Err(BenchError::Io(io::Error::other("progress consumer panicked"))),
        }
    }
}

fn consume<W: Write>(rx: Receiver<Message>, mut writer: W) -> io::Result<W> {
    for message in rx {
        match message {
            Message::Event(event) => {
                writeln!(writer, "{}", event.format_line())?;
                writer.flush()?;
            }
            Message::Close => break,
        }
    }
    Ok(writer)
}
