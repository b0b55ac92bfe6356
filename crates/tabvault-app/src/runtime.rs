use log::{debug, info, warn};
use tabvault_core::{
    cleanup_interval, Command, Engine, Persistence, Response, Settings, TabEvent, Timestamp,
};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;

use crate::bridge::{Inbound, Outbound, TabSnapshot};
use crate::error::AppError;
use crate::host::BridgeTabProvider;
use crate::scheduler::Scheduler;

pub type Clock = fn() -> Timestamp;

pub fn wall_clock() -> Timestamp {
    chrono::Utc::now().timestamp_millis()
}

/// Everything the actor reacts to. Events, commands and timer ticks share
/// one queue, so no two of them ever interleave.
#[derive(Debug)]
pub enum RuntimeMessage {
    Command {
        command: Command,
        reply: oneshot::Sender<Response>,
    },
    Event(TabEvent),
    Snapshot(TabSnapshot),
    SyncedSettings(Settings),
    Tick,
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct RuntimeHandle {
    sender: UnboundedSender<RuntimeMessage>,
}

impl RuntimeHandle {
    pub fn send(&self, message: RuntimeMessage) -> Result<(), AppError> {
        self.sender
            .send(message)
            .map_err(|_| AppError::RuntimeStopped)
    }

    #[cfg(test)]
    pub async fn command(&self, command: Command) -> Result<Response, AppError> {
        let (reply, response) = oneshot::channel();
        self.send(RuntimeMessage::Command { command, reply })?;
        response.await.map_err(|_| AppError::RuntimeStopped)
    }

    /// Routes one bridge message into the runtime. Returns `false` once the
    /// bridge asked to shut down.
    ///
    /// Commands are queued before this returns, so their order relative to
    /// later events is preserved; only the wait for the reply is spawned.
    pub fn dispatch(
        &self,
        inbound: Inbound,
        outbound: &UnboundedSender<Outbound>,
    ) -> Result<bool, AppError> {
        match inbound {
            Inbound::Command {
                request_id,
                command,
            } => {
                debug!("request {request_id}: {}", command.name());
                let (reply, response) = oneshot::channel();
                self.send(RuntimeMessage::Command { command, reply })?;
                let outbound = outbound.clone();
                tokio::spawn(async move {
                    match response.await {
                        Ok(body) => {
                            if outbound.send(Outbound::Response { request_id, body }).is_err() {
                                debug!("request {request_id}: writer closed");
                            }
                        }
                        Err(_) => warn!("request {request_id}: runtime stopped before replying"),
                    }
                });
            }
            Inbound::Event(event) => self.send(RuntimeMessage::Event(event))?,
            Inbound::Snapshot(snapshot) => self.send(RuntimeMessage::Snapshot(snapshot))?,
            Inbound::SyncedSettings { settings } => {
                self.send(RuntimeMessage::SyncedSettings(settings))?
            }
            Inbound::Shutdown => {
                self.send(RuntimeMessage::Shutdown)?;
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Single owner of the engine. All state changes happen on the task running
/// [`AppRuntime::run`].
pub struct AppRuntime<P: Persistence> {
    engine: Engine<P, BridgeTabProvider>,
    scheduler: Scheduler,
    sender: UnboundedSender<RuntimeMessage>,
    receiver: UnboundedReceiver<RuntimeMessage>,
    outbound: UnboundedSender<Outbound>,
    clock: Clock,
    scheduled_revision: Option<u64>,
}

impl<P: Persistence> AppRuntime<P> {
    pub fn new(persistence: P, outbound: UnboundedSender<Outbound>, clock: Clock) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            engine: Engine::new(persistence, BridgeTabProvider::new()),
            scheduler: Scheduler::new(),
            sender,
            receiver,
            outbound,
            clock,
            scheduled_revision: None,
        }
    }

    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle {
            sender: self.sender.clone(),
        }
    }

    /// Loads stored state, then processes messages until `Shutdown`.
    ///
    /// Open tabs are indexed when the first snapshot arrives; indexing an
    /// empty mirror would discard timestamps of tabs that are in fact open.
    pub async fn run(mut self) {
        self.engine.load_stored();
        self.reschedule_if_needed();

        while let Some(message) = self.receiver.recv().await {
            let keep_running = self.handle_message(message);
            self.flush_outbound();
            if !keep_running {
                break;
            }
            self.reschedule_if_needed();
        }

        self.scheduler.cancel();
        info!("runtime stopped");
    }

    fn handle_message(&mut self, message: RuntimeMessage) -> bool {
        let now = (self.clock)();
        match message {
            RuntimeMessage::Command { command, reply } => {
                let response = self.engine.handle_command(command, now);
                if reply.send(response).is_err() {
                    debug!("requester went away before the reply");
                }
            }
            RuntimeMessage::Event(event) => {
                self.engine.provider_mut().apply_event(&event);
                self.engine.handle_event(event, now);
            }
            RuntimeMessage::Snapshot(snapshot) => {
                self.engine.provider_mut().apply_snapshot(snapshot);
                self.engine.reindex(now);
            }
            RuntimeMessage::SyncedSettings(settings) => {
                self.engine.apply_synced_settings(settings);
            }
            RuntimeMessage::Tick => {
                let report = self.engine.tick(now);
                if !report.is_empty() {
                    info!(
                        "cleanup: {} expired, {} archived",
                        report.purged, report.archived
                    );
                }
            }
            RuntimeMessage::Shutdown => return false,
        }
        true
    }

    fn flush_outbound(&mut self) {
        for message in self.engine.provider_mut().take_outbox() {
            if self.outbound.send(message).is_err() {
                warn!("bridge writer closed; dropping outbound request");
            }
        }
    }

    // Every settings mutation bumps the revision and restarts the timer,
    // even when the period is unchanged.
    fn reschedule_if_needed(&mut self) {
        let revision = self.engine.settings_revision();
        if self.scheduled_revision == Some(revision) {
            return;
        }
        self.scheduled_revision = Some(revision);
        let period = cleanup_interval(self.engine.settings());
        self.scheduler.reschedule(period, self.sender.clone());
    }
}
