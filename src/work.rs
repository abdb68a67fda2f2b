//! Work scheduled onto the dispatch thread
//!
//! All protocol state lives on the thread that owns the [`Display`]. Other
//! threads submit closures through a [`WorkSender`]; they run, in submission
//! order, the next time the owner calls [`Display::run_pending_work`].

use crate::display::Display;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

pub type Work = Box<dyn FnOnce(&mut Display) + Send>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkError {
    #[error("display has shut down")]
    Closed,
    #[error("work was dropped before it ran")]
    Dropped,
}

pub(crate) struct WorkQueue {
    tx: mpsc::UnboundedSender<Work>,
    rx: mpsc::UnboundedReceiver<Work>,
}

impl WorkQueue {
    pub(crate) fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    pub(crate) fn sender(&self) -> WorkSender {
        WorkSender {
            tx: self.tx.clone(),
        }
    }

    pub(crate) fn try_next(&mut self) -> Option<Work> {
        self.rx.try_recv().ok()
    }
}

/// Cloneable handle for submitting work from any thread
#[derive(Clone)]
pub struct WorkSender {
    tx: mpsc::UnboundedSender<Work>,
}

impl WorkSender {
    /// Queues `work` without waiting for it
    pub fn spawn<F>(&self, work: F) -> Result<(), WorkError>
    where
        F: FnOnce(&mut Display) + Send + 'static,
    {
        self.tx.send(Box::new(work)).map_err(|_| WorkError::Closed)
    }

    /// Queues `work` and blocks until it has run, returning its result
    ///
    /// Must not be called from the dispatch thread or from inside an async
    /// context; use [`WorkSender::run`] there.
    pub fn run_sync<F, R>(&self, work: F) -> Result<R, WorkError>
    where
        F: FnOnce(&mut Display) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (done, result) = oneshot::channel();
        self.spawn(move |display| {
            let _ = done.send(work(display));
        })?;
        result.blocking_recv().map_err(|_| WorkError::Dropped)
    }

    /// Queues `work` and waits asynchronously for its result
    pub async fn run<F, R>(&self, work: F) -> Result<R, WorkError>
    where
        F: FnOnce(&mut Display) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (done, result) = oneshot::channel();
        self.spawn(move |display| {
            let _ = done.send(work(display));
        })?;
        result.await.map_err(|_| WorkError::Dropped)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::WayfrontConfig;
    use crate::display::Display;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_work_runs_in_submission_order() {
        let mut display = Display::new(&WayfrontConfig::default()).unwrap();
        let sender = display.work_sender();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        for i in 0..3 {
            let order = order.clone();
            sender
                .spawn(move |_| order.lock().unwrap().push(i))
                .unwrap();
        }
        assert_eq!(display.run_pending_work(), 3);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
        assert_eq!(display.run_pending_work(), 0);
    }

    #[test]
    fn test_run_sync_returns_result_from_dispatch_thread() {
        let mut display = Display::new(&WayfrontConfig::default()).unwrap();
        let sender = display.work_sender();
        let ran = Arc::new(AtomicUsize::new(0));

        let worker = {
            let ran = ran.clone();
            std::thread::spawn(move || {
                sender.run_sync(move |display| {
                    ran.fetch_add(1, Ordering::SeqCst);
                    display.globals().count()
                })
            })
        };

        while !worker.is_finished() {
            display.run_pending_work();
            std::thread::yield_now();
        }
        let globals = worker.join().unwrap().unwrap();
        assert_eq!(globals, display.globals().count());
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }
}
