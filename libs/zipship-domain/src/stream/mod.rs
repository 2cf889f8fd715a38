//! Streaming response model
//!
//! The event vocabulary sent to clients and the sinks that carry it.

mod emitter;
mod event;

pub use emitter::{EventLog, EventSink, Flushable, StreamEmitter};
pub use event::{Channel, StreamEvent};
