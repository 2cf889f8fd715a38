//! Event sinks
//!
//! `StreamEmitter` turns any `Flushable` transport into an append-only log:
//! every event is written as one complete line and flushed immediately.
//! `EventLog` keeps events in memory for buffered responses.

use std::future::{self, Future};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::debug;

use super::event::StreamEvent;

/// Capability required from the transport behind a stream
///
/// Writes may be buffered by the transport; `flush` must hand everything
/// written so far to the client. A transport with a bounded buffer keeps
/// writes pending while the client is not reading.
pub trait Flushable: AsyncWrite + Unpin + Send {}

impl<T: AsyncWrite + Unpin + Send + ?Sized> Flushable for T {}

/// Port for reporting pipeline progress
///
/// Implementations are cheap handles; clones report into the same
/// destination and may be used from several tasks at once.
pub trait EventSink: Clone + Send + Sync + 'static {
    /// Report one event. Never fails from the caller's point of view.
    ///
    /// Resolves once the event has been handed to the destination, which
    /// may take a while when the destination is slow to consume.
    fn emit(&self, event: StreamEvent) -> impl Future<Output = ()> + Send;
}

/// Flush-per-line emitter over a `Flushable` transport
///
/// Writers are serialized by a mutex so lines from concurrent pipe readers
/// never interleave inside a line. Transport errors are dropped: once the
/// client is gone there is nobody left to report them to.
#[derive(Debug)]
pub struct StreamEmitter<W> {
    writer: Arc<Mutex<W>>,
}

impl<W> Clone for StreamEmitter<W> {
    fn clone(&self) -> Self {
        Self {
            writer: Arc::clone(&self.writer),
        }
    }
}

impl<W: Flushable> StreamEmitter<W> {
    /// Wrap a transport whose headers are already committed
    pub fn open(writer: W) -> Self {
        Self {
            writer: Arc::new(Mutex::new(writer)),
        }
    }

    /// Write `line` followed by a newline and flush it
    pub async fn emit_line(&self, line: &str) {
        let mut framed = String::with_capacity(line.len() + 1);
        framed.push_str(line);
        framed.push('\n');

        let mut writer = self.writer.lock().await;
        let result = match writer.write_all(framed.as_bytes()).await {
            Ok(()) => writer.flush().await,
            Err(err) => Err(err),
        };

        if let Err(err) = result {
            debug!(error = %err, "Dropped stream line, transport unavailable");
        }
    }
}

impl<W: Flushable + 'static> EventSink for StreamEmitter<W> {
    fn emit(&self, event: StreamEvent) -> impl Future<Output = ()> + Send {
        let line = event.to_string();
        async move { self.emit_line(&line).await }
    }
}

/// In-memory sink used by buffered endpoints
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<StdMutex<Vec<StreamEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the events recorded so far, in emission order
    pub fn events(&self) -> Vec<StreamEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Render the recorded events in the stream line format
    pub fn render(&self) -> String {
        self.events()
            .iter()
            .map(|event| format!("{event}\n"))
            .collect()
    }
}

impl EventSink for EventLog {
    fn emit(&self, event: StreamEvent) -> impl Future<Output = ()> + Send {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
        future::ready(())
    }
}
