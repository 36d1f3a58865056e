use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::JoinHandle;

use anyhow::{Context, Result};

use crate::bridge::{BridgeCommand, CommandDispatcher};
use crate::config::CoreConfig;
use crate::models::NotificationModel;
use crate::payload::CommandPayload;
use crate::publisher::UpdatePublisher;
use crate::services::BridgeServices;
use crate::stats::SharedBridgeStats;
use crate::store::SharedInterestStore;

pub const WORKER_THREAD_NAME: &str = "slimcat-bridge";

pub enum BridgeMessage {
    /// Raw payload from the transport
    Payload(CommandPayload),
    /// Already-parsed command (local injection, tests)
    Command(BridgeCommand),
    /// Reply once every earlier message has been applied
    Flush(Sender<()>),
    Shutdown,
}

/// Cheap, cloneable entry point for the transport thread(s).
#[derive(Clone)]
pub struct BridgeHandle {
    message_tx: Sender<BridgeMessage>,
}

impl BridgeHandle {
    pub(crate) fn new(message_tx: Sender<BridgeMessage>) -> Self {
        Self { message_tx }
    }

    /// Queue a payload for the worker. Does not wait for it to be applied.
    pub fn submit(&self, payload: CommandPayload) -> Result<(), mpsc::SendError<BridgeMessage>> {
        self.message_tx.send(BridgeMessage::Payload(payload))
    }

    /// Parse a JSON object and queue it.
    pub fn submit_json(&self, json: &str) -> Result<()> {
        let payload = CommandPayload::from_json(json).context("Rejected bridge payload")?;
        self.submit(payload)
            .map_err(|_| anyhow::anyhow!("Bridge worker is not running"))
    }

    pub fn send_command(&self, command: BridgeCommand) -> Result<(), mpsc::SendError<BridgeMessage>> {
        self.message_tx.send(BridgeMessage::Command(command))
    }

    /// Block until everything queued before this call has been applied.
    /// Returns false if the worker is gone.
    pub fn flush(&self) -> bool {
        let (done_tx, done_rx) = mpsc::channel();
        if self.message_tx.send(BridgeMessage::Flush(done_tx)).is_err() {
            return false;
        }
        done_rx.recv().is_ok()
    }
}

/// Owns the dispatcher on its dedicated thread.
struct BridgeWorker {
    dispatcher: CommandDispatcher,
    message_rx: Receiver<BridgeMessage>,
}

impl BridgeWorker {
    fn run(self) {
        tracing::debug!("bridge worker started");
        while let Ok(message) = self.message_rx.recv() {
            match message {
                BridgeMessage::Payload(payload) => {
                    self.guarded(|dispatcher| dispatcher.dispatch(&payload));
                }
                BridgeMessage::Command(command) => {
                    self.guarded(move |dispatcher| dispatcher.apply(command));
                }
                BridgeMessage::Flush(done_tx) => {
                    let _ = done_tx.send(());
                }
                BridgeMessage::Shutdown => break,
            }
        }
        tracing::debug!("bridge worker stopped");
    }

    /// A panic while applying one command must not take the bridge down.
    fn guarded(&self, f: impl FnOnce(&CommandDispatcher)) {
        if panic::catch_unwind(AssertUnwindSafe(|| f(&self.dispatcher))).is_err() {
            tracing::error!("bridge command panicked; continuing with next message");
        }
    }
}

pub struct BridgeRuntime {
    store: SharedInterestStore,
    publisher: UpdatePublisher,
    stats: SharedBridgeStats,
    services: BridgeServices,
    handle: BridgeHandle,
    worker_handle: Option<JoinHandle<()>>,
}

impl BridgeRuntime {
    pub fn spawn(config: &CoreConfig, services: BridgeServices) -> Result<Self> {
        Self::spawn_with(
            config,
            services,
            SharedInterestStore::new(),
            UpdatePublisher::new(),
        )
    }

    /// Spawn around an existing store and publisher (e.g. ones the UI
    /// already holds).
    pub fn spawn_with(
        config: &CoreConfig,
        services: BridgeServices,
        store: SharedInterestStore,
        publisher: UpdatePublisher,
    ) -> Result<Self> {
        let stats = SharedBridgeStats::new();
        let dispatcher = CommandDispatcher::new(
            store.clone(),
            publisher.clone(),
            services.clone(),
            config.site_domain.clone(),
        )
        .with_stats(stats.clone());

        let (message_tx, message_rx) = mpsc::channel::<BridgeMessage>();
        let worker = BridgeWorker {
            dispatcher,
            message_rx,
        };
        let worker_handle = std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || worker.run())
            .context("Failed to spawn bridge worker thread")?;

        Ok(Self {
            store,
            publisher,
            stats,
            services,
            handle: BridgeHandle::new(message_tx),
            worker_handle: Some(worker_handle),
        })
    }

    pub fn handle(&self) -> BridgeHandle {
        self.handle.clone()
    }

    pub fn store(&self) -> SharedInterestStore {
        self.store.clone()
    }

    pub fn publisher(&self) -> UpdatePublisher {
        self.publisher.clone()
    }

    pub fn stats(&self) -> SharedBridgeStats {
        self.stats.clone()
    }

    pub fn services(&self) -> BridgeServices {
        self.services.clone()
    }

    /// Act on an update (open its link, jump to the conversation) through
    /// the same shell the worker was given. Runs on the caller's thread.
    pub fn navigate(&self, update: &NotificationModel) {
        update.navigate(&*self.services.shell);
    }

    /// Stop the worker after it drains what is already queued.
    pub fn shutdown(&mut self) {
        let _ = self.handle.message_tx.send(BridgeMessage::Shutdown);
        if let Some(worker_handle) = self.worker_handle.take() {
            let _ = worker_handle.join();
        }
    }
}

impl Drop for BridgeRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}
