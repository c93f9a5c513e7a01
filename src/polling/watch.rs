use tokio::sync::watch;
use tokio::task::JoinHandle;

/// A live polling subscription.
///
/// Holds the latest value published by the poll task. Dropping the watch
/// aborts the task, so a view only has to keep it alive while mounted.
#[derive(Debug)]
pub struct Watch<T> {
    receiver: watch::Receiver<Option<T>>,
    handle: JoinHandle<()>,
}

impl<T: Clone> Watch<T> {
    pub(crate) fn new(receiver: watch::Receiver<Option<T>>, handle: JoinHandle<()>) -> Self {
        Self { receiver, handle }
    }

    /// Latest value, `None` until the first fetch succeeds.
    pub fn latest(&self) -> Option<T> {
        self.receiver.borrow().clone()
    }

    /// Waits for the next published value. Returns `None` once the poll
    /// task has stopped and nothing new will arrive.
    pub async fn changed(&mut self) -> Option<T> {
        self.receiver.changed().await.ok()?;
        self.receiver.borrow_and_update().clone()
    }

    /// True once the poll task has exited on its own (terminal status).
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl<T> Drop for Watch<T> {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
