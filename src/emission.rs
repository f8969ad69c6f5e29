use std::collections::HashMap;

/// Decides when a completed result is released downstream.
///
/// `Unordered` releases each value the instant its transformation completes.
/// `Ordered` buffers completed results in per-index slots and releases the
/// contiguous prefix starting at the next expected sequence index, so emission
/// follows admission order regardless of completion order.
///
/// A `None` result is a skip: it occupies its sequence index for ordering
/// purposes but produces no emission.
#[derive(Debug)]
pub(crate) enum Emission<Out> {
    Unordered,
    Ordered {
        next_expected: u64,
        slots: HashMap<u64, Option<Out>>,
    },
}

impl<Out> Emission<Out> {
    pub(crate) fn new(ordered: bool) -> Self {
        match ordered {
            true => Self::Ordered {
                next_expected: 0,
                slots: HashMap::new(),
            },
            false => Self::Unordered,
        }
    }

    /// Record the completion of index `index` and return the values that can
    /// be released downstream, in release order.
    pub(crate) fn complete(&mut self, index: u64, result: Option<Out>) -> Vec<Out> {
        match self {
            Self::Unordered => result.into_iter().collect(),
            Self::Ordered {
                next_expected,
                slots,
            } => {
                slots.insert(index, result);

                let mut released = Vec::new();
                while let Some(slot) = slots.remove(next_expected) {
                    if let Some(value) = slot {
                        released.push(value);
                    }

                    *next_expected += 1;
                }

                released
            }
        }
    }

    /// True when no completed-but-unreleased result remains buffered.
    pub(crate) fn is_drained(&self) -> bool {
        match self {
            Self::Unordered => true,
            Self::Ordered { slots, .. } => slots.is_empty(),
        }
    }
}
