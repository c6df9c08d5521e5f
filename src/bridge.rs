//! Bridge orchestration.
//!
//! The [`Bridge`] wires the transport bus, the legacy adapters, the clipboard
//! correlator, the metadata hook and the merge/emission engine together, and
//! exposes the two inbound entry points the native host calls.
//!
//! Two supervised periodic tasks drive it:
//! - `extraction`: attach the hook if possible, merge the page sources and
//!   emit a `metadata-update` when the tracked fields changed
//! - `hook-poll`: spawned once the hook attaches, polls the player state

use crate::change_detector::ChangeDetector;
use crate::clipboard::{NativeClipboard, PlatformClipboard};
use crate::config::Config;
use crate::correlator::ClipboardCorrelator;
use crate::extractors::{dom, media_session, Document, MediaSession};
use crate::hook::{MetadataHook, PollOutcome, ServiceLocator};
use crate::merge::{merge_page_sources, MetadataStore, SharedStore};
use crate::supervisor::{PeriodicTask, Schedule};
use crate::transport::adapters::{ChromeWebview, IpcAdapter, LegacyTransports, QtTransport};
use crate::transport::channel::HostMessage;
use crate::transport::{MessageBus, NativeHost};
use crate::types::{BridgeError, CanonicalMetadata, Envelope};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const EXTRACTION_TASK: &str = "extraction";
pub const HOOK_POLL_TASK: &str = "hook-poll";

/// The page surfaces the bridge reads from
#[derive(Clone)]
pub struct PageSurfaces {
    pub document: Arc<dyn Document>,
    pub media_session: Arc<dyn MediaSession>,
    pub services: Arc<dyn ServiceLocator>,
    /// Underlying platform clipboard, if the page has one
    pub clipboard: Option<Arc<dyn PlatformClipboard>>,
}

/// The page-side bridge
pub struct Bridge {
    config: Config,
    bus: Arc<MessageBus>,
    correlator: Arc<ClipboardCorrelator>,
    transports: LegacyTransports,
    clipboard: Arc<NativeClipboard>,
    document: Arc<dyn Document>,
    media_session: Arc<dyn MediaSession>,
    hook: Arc<MetadataHook>,
    store: SharedStore,
    detector: Mutex<ChangeDetector>,
    token: CancellationToken,
    tasks: Mutex<Vec<PeriodicTask>>,
    started: AtomicBool,
}

impl Bridge {
    /// Build the bridge and install the legacy transports
    pub fn new(
        config: Config,
        host: Arc<dyn NativeHost>,
        surfaces: PageSurfaces,
    ) -> Result<Self, BridgeError> {
        let bus = Arc::new(MessageBus::new(host));
        let correlator = Arc::new(ClipboardCorrelator::new(config.timing.clipboard_timeout()));
        let transports = LegacyTransports::install(bus.clone(), correlator.clone())?;
        let clipboard = Arc::new(NativeClipboard::new(
            transports.ipc.clone(),
            surfaces.clipboard,
        ));

        let store = MetadataStore::shared();
        let hook = Arc::new(MetadataHook::new(
            surfaces.services,
            store.clone(),
            config.scraping.state_domain.clone(),
            config.scraping.logo_marker.clone(),
        ));

        Ok(Self {
            config,
            bus,
            correlator,
            transports,
            clipboard,
            document: surfaces.document,
            media_session: surfaces.media_session,
            hook,
            store,
            detector: Mutex::new(ChangeDetector::new()),
            token: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn ipc(&self) -> Arc<IpcAdapter> {
        self.transports.ipc.clone()
    }

    pub fn qt(&self) -> Arc<QtTransport> {
        self.transports.qt.clone()
    }

    pub fn chrome(&self) -> Arc<ChromeWebview> {
        self.transports.chrome.clone()
    }

    /// Clipboard accessor to expose to the hosted page
    pub fn clipboard(&self) -> Arc<NativeClipboard> {
        self.clipboard.clone()
    }

    /// Current canonical record
    pub fn metadata(&self) -> CanonicalMetadata {
        self.store.lock().metadata().clone()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Generic inbound entry point: deliver one payload to the listeners
    pub fn ipc_sender(&self, payload: String) -> Result<(), BridgeError> {
        self.bus.dispatch(payload)
    }

    /// Clipboard inbound entry point: answer the oldest pending read
    pub fn clipboard_response(&self, text: String) {
        self.correlator.resolve(text);
    }

    pub fn handle_host_message(&self, message: HostMessage) -> Result<(), BridgeError> {
        match message {
            HostMessage::Ipc(payload) => self.ipc_sender(payload),
            HostMessage::Clipboard(text) => {
                self.clipboard_response(text);
                Ok(())
            }
        }
    }

    /// One extraction cycle. Returns whether an update was emitted.
    ///
    /// Must run inside a Tokio runtime: attaching the hook spawns its poller.
    pub async fn extraction_cycle(&self) -> Result<bool, BridgeError> {
        if self.hook.try_attach().is_some() {
            self.spawn_hook_poller();
        }

        let marker = &self.config.scraping.logo_marker;
        let media = media_session::extract(self.media_session.as_ref(), marker);
        let dom = dom::extract(self.document.as_ref(), &self.config.scraping);

        let current = {
            let mut store = self.store.lock();
            let changed = merge_page_sources(&mut store, &media, &dom, marker);
            if changed > 0 {
                debug!(changed, "Page sources merged");
            }
            store.metadata().clone()
        };

        self.emit_if_changed(&current)
    }

    /// Poll the hook once, if attached
    pub async fn poll_hook(&self) -> Result<PollOutcome, BridgeError> {
        self.hook.poll().await
    }

    /// Send a `metadata-update` if the tracked fields differ from the last
    /// delivered record. A failed send leaves the last record untouched, so
    /// the next cycle retries.
    pub fn emit_if_changed(&self, current: &CanonicalMetadata) -> Result<bool, BridgeError> {
        let mut detector = self.detector.lock();
        if !detector.has_changed(current) {
            return Ok(false);
        }

        self.bus.send(&Envelope::metadata_update(current)?)?;
        detector.mark_sent(current);

        info!(
            title = %current.title,
            artist = %current.artist,
            emissions = detector.emissions(),
            "Metadata update sent"
        );
        Ok(true)
    }

    /// Spawn the extraction task. Calling it again does nothing.
    pub fn start(self: &Arc<Self>) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        let schedule = Schedule::every(self.config.timing.extraction_interval())
            .with_max_backoff(self.config.timing.max_backoff());
        let bridge = Arc::downgrade(self);

        let task = PeriodicTask::spawn(
            EXTRACTION_TASK,
            schedule,
            self.token.child_token(),
            move || {
                let bridge = bridge.clone();
                async move {
                    match bridge.upgrade() {
                        Some(bridge) => bridge.extraction_cycle().await.map(|_| ()),
                        None => Ok(()),
                    }
                }
            },
        );

        info!(
            interval = ?schedule.period,
            "Bridge started"
        );
        self.tasks.lock().push(task);
    }

    fn spawn_hook_poller(&self) {
        let schedule = Schedule::every(self.config.timing.hook_poll_interval())
            .with_max_backoff(self.config.timing.max_backoff());
        let hook = self.hook.clone();

        let task = PeriodicTask::spawn(
            HOOK_POLL_TASK,
            schedule,
            self.token.child_token(),
            move || {
                let hook = hook.clone();
                async move { hook.poll().await.map(|_| ()) }
            },
        );

        self.tasks.lock().push(task);
    }

    /// Start the bridge and serve host calls from `inbound` until the bridge
    /// is shut down or the host drops its end.
    pub async fn run(
        self: &Arc<Self>,
        mut inbound: mpsc::UnboundedReceiver<HostMessage>,
    ) -> Result<(), BridgeError> {
        self.start();

        loop {
            tokio::select! {
                _ = self.token.cancelled() => break,
                message = inbound.recv() => match message {
                    Some(message) => {
                        if let Err(e) = self.handle_host_message(message) {
                            warn!("Inbound host message failed: {}", e);
                        }
                    }
                    None => {
                        info!("Host channel closed");
                        break;
                    }
                },
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// Cancel every task and wait for them to stop
    pub async fn shutdown(&self) {
        self.token.cancel();
        let tasks: Vec<PeriodicTask> = self.tasks.lock().drain(..).collect();
        for task in tasks {
            task.shutdown().await;
        }
        debug!("Bridge stopped");
    }

    pub fn status(&self) -> BridgeStatus {
        BridgeStatus {
            hook_attached: self.hook.is_attached(),
            pending_clipboard_requests: self.correlator.pending_count(),
            listeners: self.bus.listener_count(),
            emissions: self.detector.lock().emissions(),
            metadata: self.metadata(),
            tasks: self
                .tasks
                .lock()
                .iter()
                .map(|task| {
                    let stats = task.stats();
                    TaskStatus {
                        name: task.name(),
                        runs: stats.runs(),
                        failures: stats.failures(),
                        consecutive_failures: stats.consecutive_failures(),
                    }
                })
                .collect(),
        }
    }
}

/// Bridge status
#[derive(Debug, Clone, Serialize)]
pub struct BridgeStatus {
    pub hook_attached: bool,
    pub pending_clipboard_requests: usize,
    pub listeners: usize,
    pub emissions: u64,
    pub metadata: CanonicalMetadata,
    pub tasks: Vec<TaskStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskStatus {
    pub name: &'static str,
    pub runs: u64,
    pub failures: u64,
    pub consecutive_failures: u64,
}

impl BridgeStatus {
    pub fn task(&self, name: &str) -> Option<&TaskStatus> {
        self.tasks.iter().find(|t| t.name == name)
    }
}
