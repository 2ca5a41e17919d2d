//! Fold-and-broadcast: apply each action to a local state and mirror it
//! onto an outbound stream for downstream consumers.

use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Routes dispatched actions both into a state fold and onto an event
/// stream, in dispatch order.
///
/// The reducer is a pure `(state, action) -> state` step; if it fails,
/// the failure propagates to the caller and the stream is not advanced.
/// Every successful transition is mirrored exactly once to the stream.
///
/// # Examples
///
/// ```
/// use std::convert::Infallible;
///
/// use futures::{executor::block_on, StreamExt};
/// use jsonpull::SyncedReducer;
///
/// let (mut reducer, actions) = SyncedReducer::new(0u64, |total: &u64, n: &u64| {
///     Ok::<_, Infallible>(total + n)
/// });
/// reducer.dispatch(2).unwrap();
/// reducer.dispatch(3).unwrap();
/// assert_eq!(*reducer.state(), 5);
/// reducer.done();
/// assert_eq!(block_on(actions.collect::<Vec<_>>()), vec![2, 3]);
/// ```
#[derive(Debug)]
pub struct SyncedReducer<St, A, F> {
    state: St,
    reduce: F,
    sink: UnboundedSender<A>,
    done: bool,
}

impl<St, A, F> SyncedReducer<St, A, F> {
    /// Creates the reducer and the readable end of its action stream.
    pub fn new(initial: St, reduce: F) -> (Self, UnboundedReceiver<A>) {
        let (sink, stream) = mpsc::unbounded();
        (
            Self {
                state: initial,
                reduce,
                sink,
                done: false,
            },
            stream,
        )
    }

    /// Folds `action` into the state, then pushes it onto the stream.
    ///
    /// A reducer failure leaves both the state and the stream untouched.
    pub fn dispatch<E>(&mut self, action: A) -> Result<(), E>
    where
        F: FnMut(&St, &A) -> Result<St, E>,
    {
        debug_assert!(!self.done, "dispatch after done()");
        self.state = (self.reduce)(&self.state, &action)?;
        // The receiving side may already be gone; the fold stands either
        // way.
        let _ = self.sink.unbounded_send(action);
        Ok(())
    }

    /// The state after all dispatches so far.
    pub fn state(&self) -> &St {
        &self.state
    }

    /// Closes the outbound stream; the receiver sees the end after
    /// draining buffered actions.
    pub fn done(&mut self) {
        self.done = true;
        self.sink.close_channel();
    }

    /// Whether `done` has been called.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }
}
