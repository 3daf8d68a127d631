//! Per-call lifecycle notifications.
//!
//! A caller that wants to observe a run passes an [`EventSink`] for that
//! call only; nothing is shared between concurrent calls. Delivery is best
//! effort and never affects the result of the run.

use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandEvent {
    /// Full command line, emitted before the process is spawned.
    Command(String),
    /// Everything the process wrote to stdout.
    Stdout(String),
    /// Everything the process wrote to stderr.
    Stderr(String),
    /// The call has settled.
    Closed,
}

#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<CommandEvent>,
}

impl EventSink {
    pub fn new(tx: mpsc::UnboundedSender<CommandEvent>) -> Self {
        Self { tx }
    }

    /// Create a sink together with the receiving end.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<CommandEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn emit(&self, event: CommandEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("event receiver dropped; discarding notification");
        }
    }
}

/// Emit on an optional sink.
pub(crate) fn emit(sink: Option<&EventSink>, event: CommandEvent) {
    if let Some(sink) = sink {
        sink.emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_arrive_in_order() {
        let (sink, mut rx) = EventSink::channel();
        sink.emit(CommandEvent::Command("duplicity --version".into()));
        sink.emit(CommandEvent::Closed);

        assert_eq!(
            rx.try_recv().unwrap(),
            CommandEvent::Command("duplicity --version".into())
        );
        assert_eq!(rx.try_recv().unwrap(), CommandEvent::Closed);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_emit_after_receiver_dropped_is_harmless() {
        let (sink, rx) = EventSink::channel();
        drop(rx);
        sink.emit(CommandEvent::Closed);
        emit(None, CommandEvent::Closed);
    }
}
