//! Stream events
//!
//! One `StreamEvent` is one line of the plain-text log sent to the client:
//! `"[" + TAG + "] " + text`.

use std::fmt;

/// Channel an event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Progress of the pipeline itself
    Info,
    /// A line the command wrote to stdout
    Out,
    /// A line the command wrote to stderr
    Err,
    /// Terminal success
    Done,
    /// Terminal failure; shares the `ERR` tag with stderr lines
    Failed,
}

impl Channel {
    /// Tag written between brackets at the start of the line
    pub fn tag(&self) -> &'static str {
        match self {
            Channel::Info => "INFO",
            Channel::Out => "OUT",
            Channel::Err | Channel::Failed => "ERR",
            Channel::Done => "DONE",
        }
    }

    /// Whether no further events follow this one
    pub fn is_terminal(&self) -> bool {
        matches!(self, Channel::Done | Channel::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEvent {
    channel: Channel,
    text: String,
}

impl StreamEvent {
    pub fn new(channel: Channel, text: impl Into<String>) -> Self {
        Self {
            channel,
            text: text.into(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(Channel::Info, text)
    }

    pub fn out(text: impl Into<String>) -> Self {
        Self::new(Channel::Out, text)
    }

    pub fn err(text: impl Into<String>) -> Self {
        Self::new(Channel::Err, text)
    }

    pub fn done(text: impl Into<String>) -> Self {
        Self::new(Channel::Done, text)
    }

    pub fn failed(text: impl Into<String>) -> Self {
        Self::new(Channel::Failed, text)
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for StreamEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.channel.tag(), self.text)
    }
}
