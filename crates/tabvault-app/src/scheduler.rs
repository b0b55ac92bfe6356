use std::time::Duration;

use log::{debug, info};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::runtime::RuntimeMessage;

/// Owns the single cleanup timer.
///
/// The timer only posts `Tick` into the runtime's channel; the sweep itself
/// runs inside the actor.
#[derive(Debug, Default)]
pub struct Scheduler {
    task: Option<JoinHandle<()>>,
    period: Option<Duration>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    /// Cancels the running timer, if any, and starts one with `period`.
    pub fn reschedule(&mut self, period: Duration, sender: UnboundedSender<RuntimeMessage>) {
        self.cancel();
        info!("cleanup interval set to {}s", period.as_secs_f64());
        self.period = Some(period);
        self.task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval.tick().await; // Skip first immediate tick
            loop {
                interval.tick().await;
                if sender.send(RuntimeMessage::Tick).is_err() {
                    debug!("runtime gone; cleanup timer exiting");
                    break;
                }
            }
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.period = None;
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
