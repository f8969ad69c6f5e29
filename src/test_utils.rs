use std::{collections::HashMap, sync::Arc, time::Duration};

use futures::{future::BoxFuture, FutureExt};
use tokio::{sync::Mutex, time::Instant};

use crate::error::TransformError;

/// A test payload: an id and a processing duration. The tracked transform
/// sleeps for `10 * duration` milliseconds before completing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestValue {
    pub id: i32,
    pub duration: u64,
}

impl TestValue {
    pub fn new(id: i32, duration: u64) -> Self {
        Self { id, duration }
    }
}

#[derive(Clone, Copy)]
struct Span {
    started: Instant,
    finished: Option<Instant>,
}

/// Records when each tracked transform started and finished, so tests can
/// assert on actual execution overlap rather than on emission order alone.
#[derive(Clone, Default)]
pub struct Timings(Arc<Mutex<HashMap<i32, Span>>>);

impl Timings {
    pub fn new() -> Self {
        Self::default()
    }

    async fn started(&self, id: i32) {
        self.0.lock().await.insert(
            id,
            Span {
                started: Instant::now(),
                finished: None,
            },
        );
    }

    async fn finished(&self, id: i32) {
        let mut spans = self.0.lock().await;

        let span = spans.get_mut(&id).expect("finished before started");
        assert!(span.finished.is_none(), "transform ran twice for {id}");
        span.finished = Some(Instant::now());
    }

    pub async fn completed(&self, id: i32) -> bool {
        matches!(
            self.0.lock().await.get(&id),
            Some(Span {
                finished: Some(_),
                ..
            })
        )
    }

    /// True if `first` finished before `second` started.
    pub async fn finished_before(&self, first: i32, second: i32) -> bool {
        let spans = self.0.lock().await;

        match (spans.get(&first), spans.get(&second)) {
            (Some(a), Some(b)) => a.finished.is_some_and(|end| end <= b.started),
            _ => false,
        }
    }

    /// True if the two transforms were in flight at the same time.
    pub async fn overlapped(&self, first: i32, second: i32) -> bool {
        let spans = self.0.lock().await;

        match (spans.get(&first), spans.get(&second)) {
            (
                Some(Span {
                    started: start_a,
                    finished: Some(end_a),
                }),
                Some(Span {
                    started: start_b,
                    finished: Some(end_b),
                }),
            ) => start_a < end_b && start_b < end_a,
            _ => false,
        }
    }

    /// Wrap `inner` into a stage transform that records its execution span
    /// and sleeps for the value's configured duration.
    pub fn tracked<F>(
        &self,
        inner: F,
    ) -> impl FnMut(TestValue) -> BoxFuture<'static, Result<Option<i32>, TransformError>>
    where
        F: Fn(TestValue) -> Result<Option<i32>, TransformError> + Send + Sync + 'static,
    {
        let timings = self.clone();

        move |value| {
            let timings = timings.clone();
            let result = inner(value);

            async move {
                timings.started(value.id).await;
                tokio::time::sleep(Duration::from_millis(10 * value.duration)).await;
                timings.finished(value.id).await;

                result
            }
            .boxed()
        }
    }
}
