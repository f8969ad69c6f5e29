use std::collections::VecDeque;

use tokio::sync::oneshot;

/// An admitted item waiting for an execution slot.
///
/// The `ack` is resolved by the scheduler at dispatch time, not at admission
/// time - that deferral is what pushes backpressure onto the producer.
#[derive(Debug)]
pub(crate) struct Task<In> {
    pub(crate) index: u64,
    pub(crate) payload: In,
    pub(crate) ack: oneshot::Sender<()>,
}

/// Assigns sequence indices and queues admitted items until dispatch.
///
/// Indices are monotonically increasing from 0, never reused, never reset.
/// The queue is FIFO: items are dispatched in admission order.
#[derive(Debug)]
pub(crate) struct Ledger<In> {
    next_index: u64,
    pending: VecDeque<Task<In>>,
}

impl<In> Ledger<In> {
    pub(crate) fn new() -> Self {
        Self {
            next_index: 0,
            pending: VecDeque::new(),
        }
    }

    /// Admit a payload, assigning it the next sequence index.
    pub(crate) fn admit(&mut self, payload: In, ack: oneshot::Sender<()>) -> u64 {
        let index = self.next_index;
        self.next_index += 1;

        self.pending.push_back(Task {
            index,
            payload,
            ack,
        });

        index
    }

    /// Remove the head of the pending queue for dispatch.
    pub(crate) fn dequeue(&mut self) -> Option<Task<In>> {
        self.pending.pop_front()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admit(ledger: &mut Ledger<i32>, payload: i32) -> u64 {
        let (ack, _ack_rx) = oneshot::channel();
        ledger.admit(payload, ack)
    }

    #[test]
    fn indices_are_monotonic_from_zero() {
        let mut ledger = Ledger::new();

        assert_eq!(admit(&mut ledger, 10), 0);
        assert_eq!(admit(&mut ledger, 20), 1);
        assert_eq!(admit(&mut ledger, 30), 2);
    }

    #[test]
    fn dequeue_is_fifo() {
        let mut ledger = Ledger::new();

        admit(&mut ledger, 10);
        admit(&mut ledger, 20);

        assert_eq!(ledger.dequeue().map(|t| t.payload), Some(10));
        assert_eq!(ledger.dequeue().map(|t| t.payload), Some(20));
        assert!(ledger.dequeue().is_none());
        assert!(ledger.is_empty());
    }

    #[test]
    fn indices_are_not_reused_after_dequeue() {
        let mut ledger = Ledger::new();

        admit(&mut ledger, 10);
        ledger.dequeue();

        assert_eq!(admit(&mut ledger, 20), 1);
    }
}
