use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use crossbeam::channel::{bounded, Receiver, Sender};
use tracing::{debug, error};

use crate::error::{BridgeError, Result};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fixed set of named threads draining a bounded job queue.
///
/// `submit` blocks while the queue is full. A panicking job is logged and
/// the worker keeps running. Dropping the pool lets queued jobs finish and
/// joins the workers; [`WorkerPool::detach`] closes the queue without
/// joining.
pub struct WorkerPool {
    name: String,
    tx: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(name: &str, workers: usize, queue_depth: usize) -> Result<Self> {
        let (tx, rx) = bounded::<Job>(queue_depth);
        let handles = (0..workers.max(1))
            .map(|id| {
                let rx = rx.clone();
                let pool = name.to_string();
                thread::Builder::new()
                    .name(format!("{name}-{id}"))
                    .spawn(move || run_worker(&pool, rx))
            })
            .collect::<std::io::Result<Vec<_>>>()?;

        debug!(pool = name, workers = handles.len(), queue_depth, "worker pool started");
        Ok(Self {
            name: name.to_string(),
            tx: Some(tx),
            workers: handles,
        })
    }

    /// Queue `job` for a worker.
    pub fn submit(&self, job: impl FnOnce() + Send + 'static) -> Result<()> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| BridgeError::PoolClosed(self.name.clone()))?;
        tx.send(Box::new(job))
            .map_err(|_| BridgeError::PoolClosed(self.name.clone()))
    }

    /// Close the queue and return without joining the workers.
    ///
    /// Jobs already queued still run; each worker exits once the queue is
    /// drained.
    pub fn detach(mut self) {
        drop(self.tx.take());
        let detached = self.workers.drain(..).count();
        debug!(pool = %self.name, detached, "worker pool detached");
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }
}

fn run_worker(pool: &str, rx: Receiver<Job>) {
    while let Ok(job) = rx.recv() {
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            error!(pool, "job panicked");
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        drop(self.tx.take());
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("name", &self.name)
            .field("workers", &self.workers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use crossbeam::channel::unbounded;

    use super::*;

    #[test]
    fn runs_every_job_before_drop_returns() {
        let count = Arc::new(AtomicUsize::new(0));
        {
            let pool = WorkerPool::new("test", 3, 4).expect("pool should start");
            assert_eq!(pool.size(), 3);
            for _ in 0..50 {
                let count = Arc::clone(&count);
                pool.submit(move || {
                    count.fetch_add(1, Ordering::SeqCst);
                })
                .expect("submit should succeed");
            }
        }
        assert_eq!(count.load(Ordering::SeqCst), 50);
    }

    #[test]
    fn panicking_job_does_not_kill_worker() {
        let pool = WorkerPool::new("panicky", 1, 4).expect("pool should start");
        let (tx, rx) = unbounded();

        pool.submit(|| panic!("boom")).expect("submit should succeed");
        pool.submit(move || tx.send(42).expect("receiver alive"))
            .expect("submit should succeed");

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(42));
    }

    #[test]
    fn jobs_run_concurrently() {
        let pool = WorkerPool::new("parallel", 2, 4).expect("pool should start");
        let (blocker_tx, blocker_rx) = unbounded::<()>();
        let (done_tx, done_rx) = unbounded();

        // First job parks a worker until released.
        pool.submit(move || {
            let _ = blocker_rx.recv();
        })
        .expect("submit should succeed");
        pool.submit(move || done_tx.send("second").expect("receiver alive"))
            .expect("submit should succeed");

        assert_eq!(done_rx.recv_timeout(Duration::from_secs(5)), Ok("second"));
        blocker_tx.send(()).expect("blocked job alive");
    }

    #[test]
    fn zero_workers_still_gets_one() {
        let pool = WorkerPool::new("min", 0, 1).expect("pool should start");
        assert_eq!(pool.size(), 1);
        assert_eq!(pool.name(), "min");
    }

    #[test]
    fn detach_does_not_wait_for_running_jobs() {
        let pool = WorkerPool::new("detached", 1, 4).expect("pool should start");
        let (started_tx, started_rx) = unbounded();
        let (release_tx, release_rx) = unbounded::<()>();
        let (done_tx, done_rx) = unbounded();

        pool.submit(move || {
            started_tx.send(()).expect("receiver alive");
            let _ = release_rx.recv_timeout(Duration::from_secs(30));
            done_tx.send("finished").expect("receiver alive");
        })
        .expect("submit should succeed");
        started_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("job started");

        let begin = Instant::now();
        pool.detach();
        assert!(begin.elapsed() < Duration::from_secs(5));

        // The job keeps running after detach and finishes when released.
        release_tx.send(()).expect("job still waiting");
        assert_eq!(done_rx.recv_timeout(Duration::from_secs(5)), Ok("finished"));
    }
}
