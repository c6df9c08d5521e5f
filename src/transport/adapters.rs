//! Legacy transport shapes composed over the [`MessageBus`].
//!
//! The web app was written against several native bridges over the years:
//! - `ipc`: post/listen plus the clipboard read request
//! - Qt `webChannelTransport`: `send` plus a single `onmessage` callback
//! - `chrome.webview`: post/listen
//!
//! Each adapter here reproduces one of those shapes. None of them hold state
//! of their own apart from the Qt callback slot; they all forward to the bus.

use super::{InboundMessage, Listener, MessageBus, MESSAGE_EVENT};
use crate::correlator::{ClipboardCorrelator, PendingRead};
use crate::types::BridgeError;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::trace;

/// The canonical `ipc` shape
pub struct IpcAdapter {
    bus: Arc<MessageBus>,
    correlator: Arc<ClipboardCorrelator>,
}

impl IpcAdapter {
    pub fn new(bus: Arc<MessageBus>, correlator: Arc<ClipboardCorrelator>) -> Self {
        Self { bus, correlator }
    }

    pub fn post_message(&self, payload: &str) -> Result<(), BridgeError> {
        self.bus.post_message(payload)
    }

    pub fn add_event_listener(&self, event: &str, listener: Listener) -> Result<(), BridgeError> {
        self.bus.add_listener(event, listener)
    }

    pub fn remove_event_listener(
        &self,
        event: &str,
        listener: &Listener,
    ) -> Result<(), BridgeError> {
        self.bus.remove_listener(event, listener)
    }

    pub fn read_clipboard(&self) -> Result<PendingRead, BridgeError> {
        self.correlator.request(&self.bus)
    }
}

/// Qt `webChannelTransport` shape
pub struct QtTransport {
    bus: Arc<MessageBus>,
    onmessage: Mutex<Option<Listener>>,
}

impl QtTransport {
    pub fn new(bus: Arc<MessageBus>) -> Self {
        Self {
            bus,
            onmessage: Mutex::new(None),
        }
    }

    pub fn send(&self, payload: &str) -> Result<(), BridgeError> {
        self.bus.post_message(payload)
    }

    pub fn set_onmessage(&self, callback: Option<Listener>) {
        *self.onmessage.lock() = callback;
    }

    /// Forward an inbound message to the `onmessage` callback, if set
    fn deliver(&self, message: &InboundMessage) -> Result<(), BridgeError> {
        let callback = self.onmessage.lock().clone();
        match callback {
            Some(callback) => callback(message),
            None => {
                trace!("No Qt onmessage callback set, skipping");
                Ok(())
            }
        }
    }
}

/// `chrome.webview` shape
pub struct ChromeWebview {
    bus: Arc<MessageBus>,
}

impl ChromeWebview {
    pub fn new(bus: Arc<MessageBus>) -> Self {
        Self { bus }
    }

    pub fn post_message(&self, payload: &str) -> Result<(), BridgeError> {
        self.bus.post_message(payload)
    }

    pub fn add_event_listener(&self, event: &str, listener: Listener) -> Result<(), BridgeError> {
        self.bus.add_listener(event, listener)
    }

    pub fn remove_event_listener(
        &self,
        event: &str,
        listener: &Listener,
    ) -> Result<(), BridgeError> {
        self.bus.remove_listener(event, listener)
    }
}

/// All legacy adapters, built over one bus
pub struct LegacyTransports {
    pub ipc: Arc<IpcAdapter>,
    pub qt: Arc<QtTransport>,
    pub chrome: Arc<ChromeWebview>,
}

impl LegacyTransports {
    /// Build the adapters and register the listener forwarding inbound
    /// messages to the Qt `onmessage` callback. It is registered first, so
    /// the Qt callback sees every message before listeners added later.
    pub fn install(
        bus: Arc<MessageBus>,
        correlator: Arc<ClipboardCorrelator>,
    ) -> Result<Self, BridgeError> {
        let qt = Arc::new(QtTransport::new(bus.clone()));

        let forward = Arc::downgrade(&qt);
        bus.add_listener(
            MESSAGE_EVENT,
            Arc::new(move |message: &InboundMessage| match forward.upgrade() {
                Some(qt) => qt.deliver(message),
                None => Ok(()),
            }),
        )?;

        Ok(Self {
            ipc: Arc::new(IpcAdapter::new(bus.clone(), correlator)),
            qt,
            chrome: Arc::new(ChromeWebview::new(bus)),
        })
    }
}
