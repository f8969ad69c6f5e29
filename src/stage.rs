use std::future::Future;

use futures::{stream::FuturesUnordered, StreamExt};
use tokio::{
    sync::{
        mpsc::{self, Receiver, Sender},
        oneshot,
    },
    task::JoinHandle,
};
use tracing::{debug, trace, warn};

use crate::{
    config::StageConfig,
    emission::Emission,
    error::{StageError, TransformError},
    ledger::Ledger,
};

enum Command<In> {
    Submit {
        payload: In,
        ack: oneshot::Sender<()>,
    },
    Close,
}

/// Lifecycle of the stage's event loop. The loop exiting is the closed state:
/// dropping the output sender is what tells the consumer no further emissions
/// will occur.
enum State {
    Accepting,
    Draining,
}

/// Producer-side handle of a spawned stage.
///
/// The handle is single-producer: `submit` resolves only once the item is
/// dispatched into an execution slot, which is what bounds how far the
/// producer can run ahead of the stage. `close` signals end of input.
/// Dropping the handle without calling `close` signals end of input as well.
pub struct StageHandle<In> {
    commands: Sender<Command<In>>,
    closed: bool,
}

impl<In> StageHandle<In> {
    /// Submit one item. Resolves when the item is granted an execution slot,
    /// not when it is merely queued.
    ///
    /// Errors with [`StageError::SubmitAfterClose`] once `close` was called,
    /// and with [`StageError::Terminated`] if the stage failed or was
    /// cancelled before the item could be dispatched.
    pub async fn submit(&mut self, payload: In) -> Result<(), StageError> {
        if self.closed {
            return Err(StageError::SubmitAfterClose);
        }

        let (ack, ack_rx) = oneshot::channel();

        self.commands
            .send(Command::Submit { payload, ack })
            .await
            .map_err(|_| StageError::Terminated)?;

        ack_rx.await.map_err(|_| StageError::Terminated)
    }

    /// Submit every item of an iterator in order, then close the stage.
    pub async fn submit_all<I>(&mut self, items: I) -> Result<(), StageError>
    where
        I: IntoIterator<Item = In>,
    {
        for item in items {
            self.submit(item).await?;
        }

        self.close().await
    }

    /// Signal end of input. No further submissions are accepted.
    ///
    /// Errors with [`StageError::CloseAfterClose`] on a second call.
    pub async fn close(&mut self) -> Result<(), StageError> {
        if self.closed {
            return Err(StageError::CloseAfterClose);
        }

        self.closed = true;

        self.commands
            .send(Command::Close)
            .await
            .map_err(|_| StageError::Terminated)
    }
}

impl StageConfig {
    /// Spawn a stage applying `transform` to each submitted item.
    ///
    /// Returns the producer handle, the output receiver, and a join handle
    /// that resolves once the stage has fully drained - `Ok(())` on normal
    /// completion, `Err` carrying the first transform failure otherwise.
    ///
    /// The transform returns `Ok(Some(value))` to emit, `Ok(None)` to emit
    /// nothing for that item (in ordered mode the item still occupies its
    /// place in the emission order), or `Err` to abort the whole stage.
    ///
    /// # Example
    /// ```rust
    /// use weir::StageConfig;
    ///
    /// # tokio::runtime::Runtime::new().unwrap().block_on(async {
    /// let (mut handle, mut outputs, done) = StageConfig::ordered(3)
    ///     .spawn(|x: u32| async move { Ok::<_, std::convert::Infallible>(Some(x * x)) })
    ///     .unwrap();
    ///
    /// handle.submit_all(vec![1, 2, 3]).await.unwrap();
    ///
    /// assert_eq!(outputs.recv().await, Some(1));
    /// assert_eq!(outputs.recv().await, Some(4));
    /// assert_eq!(outputs.recv().await, Some(9));
    /// assert_eq!(outputs.recv().await, None);
    ///
    /// done.await.unwrap().unwrap();
    /// # });
    /// ```
    #[allow(clippy::type_complexity)]
    pub fn spawn<In, Out, F, Fut, E>(
        self,
        transform: F,
    ) -> Result<
        (
            StageHandle<In>,
            Receiver<Out>,
            JoinHandle<Result<(), StageError>>,
        ),
        crate::ConfigError,
    >
    where
        F: FnMut(In) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Option<Out>, E>> + Send + 'static,
        E: Into<TransformError> + Send + 'static,
        In: Send + 'static,
        Out: Send + 'static,
    {
        self.validate()?;

        let (command_sender, command_receiver) = mpsc::channel(1);
        // the output channel buffers up to one result per execution slot; a
        // full buffer stalls completions, which in turn stalls dispatch
        let (output_sender, output_receiver) = mpsc::channel(self.concurrency_limit);

        let join_handle = tokio::spawn(run(self, transform, command_receiver, output_sender));

        let handle = StageHandle {
            commands: command_sender,
            closed: false,
        };

        Ok((handle, output_receiver, join_handle))
    }
}

/// The stage's event loop. Owns all mutable state; no external
/// synchronization is needed.
async fn run<In, Out, F, Fut, E>(
    config: StageConfig,
    mut transform: F,
    mut commands: Receiver<Command<In>>,
    outputs: Sender<Out>,
) -> Result<(), StageError>
where
    F: FnMut(In) -> Fut,
    Fut: Future<Output = Result<Option<Out>, E>>,
    E: Into<TransformError>,
{
    let mut ledger = Ledger::new();
    let mut emission = Emission::new(config.ordered);
    let mut in_flight = FuturesUnordered::new();
    let mut state = State::Accepting;
    let mut failure: Option<StageError> = None;

    loop {
        let in_flight_len = in_flight.len();

        tokio::select! {
            biased;

            command = commands.recv(), if matches!(state, State::Accepting) => {
                match command {
                    Some(Command::Submit { payload, ack }) => {
                        let index = ledger.admit(payload, ack);
                        trace!(index, "item admitted");
                    }
                    // a dropped handle counts as end of input
                    Some(Command::Close) | None => {
                        debug!("end of input signaled, draining");
                        state = State::Draining;
                    }
                }
            },
            Some((index, result)) = in_flight.next(), if in_flight_len > 0 => {
                match result {
                    Ok(value) => {
                        trace!(index, "transform completed");

                        if failure.is_none() {
                            for value in emission.complete(index, value) {
                                if outputs.send(value).await.is_err() {
                                    // consumer hung up, nothing left to emit to
                                    return Ok(());
                                }
                            }
                        }
                    }
                    Err(source) => {
                        warn!(index, error = %source, "transform failed, aborting stage");

                        if failure.is_none() {
                            failure = Some(StageError::Transform { index, source });

                            // reject queued work; dropping the acks unblocks
                            // producers with a Terminated error
                            while ledger.dequeue().is_some() {}
                            state = State::Draining;
                        }
                    }
                }
            },
            else => break,
        }

        // fill freed execution slots from the pending queue; the ack resolves
        // here, at dispatch time, which is what backpressures the producer
        if failure.is_none() {
            while in_flight.len() < config.concurrency_limit {
                let Some(task) = ledger.dequeue() else { break };

                trace!(index = task.index, "dispatching");
                let _ = task.ack.send(());

                let index = task.index;
                let fut = (transform)(task.payload);
                in_flight.push(async move { (index, fut.await.map_err(Into::into)) });
            }
        }

        let drained = in_flight.is_empty()
            && ledger.is_empty()
            && (failure.is_some() || emission.is_drained());

        if matches!(state, State::Draining) && drained {
            break;
        }
    }

    debug!("stage drained");

    match failure {
        Some(error) => Err(error),
        None => Ok(()),
    }
}
