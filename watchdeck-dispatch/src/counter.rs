//! Completion counter shared between the dispatcher and its watch tasks.

use std::sync::Arc;

use tokio::sync::watch;

/// Number of watch tasks still alive.
///
/// The dispatcher adds the task count before spawning; each task holds a
/// [`CompletionGuard`] that decrements on drop, so panics and early returns
/// are counted too. Clones share the same count.
#[derive(Debug, Clone)]
pub struct CompletionCounter {
    inner: Arc<watch::Sender<usize>>,
}

impl Default for CompletionCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionCounter {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0usize);
        Self { inner: Arc::new(tx) }
    }

    pub fn add(&self, n: usize) {
        self.inner.send_modify(|count| *count += n);
    }

    pub fn done(&self) {
        self.inner
            .send_modify(|count| *count = count.saturating_sub(1));
    }

    pub fn active(&self) -> usize {
        *self.inner.borrow()
    }

    /// A guard that calls [`CompletionCounter::done`] when dropped.
    /// Does not increment.
    pub fn guard(&self) -> CompletionGuard {
        CompletionGuard {
            counter: self.clone(),
        }
    }

    /// Resolve once the count is zero.
    pub async fn wait(&self) {
        let mut rx = self.inner.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|count| *count == 0).await;
    }
}

#[derive(Debug)]
pub struct CompletionGuard {
    counter: CompletionCounter,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.counter.done();
    }
}
