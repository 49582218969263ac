use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Named recurring jobs on the tokio runtime.
///
/// Scheduling under an existing name aborts and replaces the pending job, so
/// repeated setup calls never stack a second schedule. Within one job the
/// task runs to completion before the next tick fires, so cycles cannot
/// overlap; the first run is immediate.
#[derive(Default)]
pub struct JobScheduler {
    jobs: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl JobScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule_repeating<F, Fut>(&self, name: &str, period: Duration, mut task: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                task().await;
            }
        });

        let mut jobs = self.jobs.lock().unwrap();
        if let Some(previous) = jobs.insert(name.to_string(), handle) {
            debug!("Replacing scheduled job '{name}'");
            previous.abort();
        }
    }

    pub fn cancel(&self, name: &str) -> bool {
        let mut jobs = self.jobs.lock().unwrap();
        match jobs.remove(name) {
            Some(handle) => {
                handle.abort();
                debug!("Cancelled job '{name}'");
                true
            }
            None => false,
        }
    }

    pub fn is_scheduled(&self, name: &str) -> bool {
        self.jobs.lock().unwrap().contains_key(name)
    }
}

impl Drop for JobScheduler {
    fn drop(&mut self) {
        let jobs = self.jobs.lock().unwrap();
        for handle in jobs.values() {
            handle.abort();
        }
    }
}
