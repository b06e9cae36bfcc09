/// Fire-and-forget signals the session raises for the UI layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// Raised on every inspection tick in the final three seconds
    InspectionWarning,
    /// Persisting the history failed; in-memory state is intact
    StorageWarning(String),
}

pub trait Notifier {
    fn signal(&mut self, signal: Signal);
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn signal(&mut self, _signal: Signal) {}
}

/// Buffers signals until the UI drains them on its next frame
#[derive(Debug, Default, Clone)]
pub struct QueuedNotifier {
    pending: Vec<Signal>,
}

impl QueuedNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&mut self) -> Vec<Signal> {
        std::mem::take(&mut self.pending)
    }

    pub fn pending(&self) -> &[Signal] {
        &self.pending
    }
}

impl Notifier for QueuedNotifier {
    fn signal(&mut self, signal: Signal) {
        self.pending.push(signal);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queued_notifier_drains_in_order() {
        let mut notifier = QueuedNotifier::new();
        notifier.signal(Signal::InspectionWarning);
        notifier.signal(Signal::StorageWarning("disk full".into()));
        assert_eq!(notifier.pending().len(), 2);

        let drained = notifier.drain();
        assert_eq!(
            drained,
            vec![
                Signal::InspectionWarning,
                Signal::StorageWarning("disk full".into())
            ]
        );
        assert!(notifier.pending().is_empty());
    }
}
