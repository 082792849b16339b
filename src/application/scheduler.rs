use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::sync::{Notify, Semaphore, mpsc};
use tracing::{debug, warn};

type Task = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

#[derive(Default)]
struct Counters {
    submitted: AtomicU64,
    in_flight: AtomicUsize,
    idle: Notify,
}

impl Counters {
    fn finish(&self) {
        if self.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// Decrements the in-flight count when a task ends, even if it panicked.
struct InFlight(Arc<Counters>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.finish();
    }
}

/// Queue for fire-and-forget background work.
///
/// `submit` never blocks and never runs the task inline: tasks are queued and
/// started in submission order by a single worker, which spawns each one onto
/// the runtime. With `max_in_flight` set, the worker waits for a free slot
/// before starting the next task.
#[derive(Clone)]
pub struct TaskScheduler {
    sender: mpsc::UnboundedSender<(&'static str, Task)>,
    counters: Arc<Counters>,
}

impl TaskScheduler {
    /// Starts the worker. Must be called from within a tokio runtime.
    pub fn new(max_in_flight: Option<usize>) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<(&'static str, Task)>();
        let counters = Arc::new(Counters::default());
        let slots = max_in_flight.map(|n| Arc::new(Semaphore::new(n.max(1))));

        let worker_counters = counters.clone();
        tokio::spawn(async move {
            while let Some((label, task)) = receiver.recv().await {
                let permit = match &slots {
                    Some(slots) => slots.clone().acquire_owned().await.ok(),
                    None => None,
                };
                let guard = InFlight(worker_counters.clone());
                debug!(task = label, "starting task");
                tokio::spawn(async move {
                    let _guard = guard;
                    let _permit = permit;
                    task.await;
                });
            }
        });

        Self { sender, counters }
    }

    pub fn submit<F>(&self, label: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.counters.submitted.fetch_add(1, Ordering::SeqCst);
        self.counters.in_flight.fetch_add(1, Ordering::SeqCst);
        if self.sender.send((label, Box::pin(task))).is_err() {
            warn!(task = label, "scheduler worker stopped; task dropped");
            self.counters.finish();
        }
    }

    /// Tasks queued or running.
    pub fn in_flight(&self) -> usize {
        self.counters.in_flight.load(Ordering::SeqCst)
    }

    /// Tasks submitted since the scheduler was created.
    pub fn submitted(&self) -> u64 {
        self.counters.submitted.load(Ordering::SeqCst)
    }

    /// Waits until every submitted task, including ones submitted while
    /// waiting, has finished.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.counters.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }
}
