//! Ready-listener registry
//!
//! Listeners registered before readiness wait in a FIFO queue. Marking the
//! registry ready drains that queue in one go, so a listener registered while
//! the drained batch runs is handed back for immediate dispatch instead of
//! joining a batch that is already being processed.

/// FIFO queue of listeners plus the ready flag
#[derive(Debug)]
pub struct ReadyListeners<L> {
    ready: bool,
    pending: Vec<L>,
}

impl<L> Default for ReadyListeners<L> {
    fn default() -> Self {
        Self {
            ready: false,
            pending: Vec::new(),
        }
    }
}

impl<L> ReadyListeners<L> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Queue `listener`, or hand it back when already ready
    ///
    /// The caller owns dispatch of a returned listener and must not run it
    /// synchronously.
    pub fn register(&mut self, listener: L) -> Option<L> {
        if self.ready {
            Some(listener)
        } else {
            self.pending.push(listener);
            None
        }
    }

    /// Put a handed-back listener at the back of the queue
    ///
    /// Used when readiness was dropped between `register` and dispatch.
    pub fn requeue(&mut self, listener: L) {
        self.ready = false;
        self.pending.push(listener);
    }

    /// Declare readiness and take every queued listener in registration order
    pub fn mark_ready(&mut self) -> Vec<L> {
        self.ready = true;
        std::mem::take(&mut self.pending)
    }

    /// Leave ready state; queued listeners are kept for the next readiness
    pub fn reset(&mut self) {
        self.ready = false;
    }
}
