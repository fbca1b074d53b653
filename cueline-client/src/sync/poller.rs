use std::{future::Future, sync::Arc, time::Duration};

use crossbeam::atomic::AtomicCell;
use log::{debug, info};
use tokio::{
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};

use crate::ClientResult;

/// Keeps the polling streams of a queue running.
///
/// Dropping the handle stops them.
#[derive(Debug)]
pub struct PollerHandle {
    alive: Arc<AtomicCell<bool>>,
    tasks: Vec<JoinHandle<()>>,
}

impl PollerHandle {
    pub(crate) fn new(alive: Arc<AtomicCell<bool>>, tasks: Vec<JoinHandle<()>>) -> Self {
        Self { alive, tasks }
    }

    /// Stops polling. Results of requests still in flight are discarded.
    pub fn stop(&self) {
        self.alive.store(false);

        for task in &self.tasks {
            task.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.alive.load() && self.tasks.iter().any(|t| !t.is_finished())
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Spawns a task that runs `poll` on a fixed schedule until `alive` is cleared.
///
/// Failures never change the schedule. A session-fatal failure stops every stream sharing
/// `alive` if `stop_on_session_loss` is set.
pub(crate) fn spawn_stream<F, Fut>(
    name: &'static str,
    period: Duration,
    stop_on_session_loss: bool,
    alive: &Arc<AtomicCell<bool>>,
    poll: F,
) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ClientResult<()>> + Send + 'static,
{
    let alive = alive.clone();

    tokio::spawn(async move {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;

            if !alive.load() {
                break;
            }

            let Err(error) = poll().await else {
                continue;
            };

            debug!("Polling {} failed: {}", name, error);

            if error.is_session_fatal() && stop_on_session_loss {
                info!("Session was lost, stopping polling");
                alive.store(false);
            }
        }

        debug!("Stopped polling {}", name);
    })
}
