//! Transport between the page and the native host.
//!
//! A single [`MessageBus`] carries every message in both directions:
//! - Outbound: envelopes are serialized and handed to the [`NativeHost`]
//! - Inbound: opaque host payloads are dispatched to registered listeners
//!
//! The legacy transport shapes the web app was written against live in
//! [`adapters`] and are all composed over the same bus.

pub mod adapters;
pub mod channel;

use crate::types::{BridgeError, Envelope};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// The only event name listeners may register for
pub const MESSAGE_EVENT: &str = "message";

/// Inbound message handed to listeners
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub data: String,
}

/// Listener callback. Returning an error stops delivery of the current
/// message to listeners registered after this one.
pub type Listener = Arc<dyn Fn(&InboundMessage) -> Result<(), BridgeError> + Send + Sync>;

/// Page-to-native entry point
pub trait NativeHost: Send + Sync {
    /// Hand one serialized envelope to the host. Fails immediately with
    /// [`BridgeError::HostUnavailable`] if the host cannot be reached.
    fn post_message(&self, payload: &str) -> Result<(), BridgeError>;
}

/// Bidirectional message bus shared by every transport adapter
pub struct MessageBus {
    host: Arc<dyn NativeHost>,
    listeners: Mutex<Vec<Listener>>,
}

impl MessageBus {
    pub fn new(host: Arc<dyn NativeHost>) -> Self {
        Self {
            host,
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Serialize and forward an envelope to the host
    pub fn send(&self, envelope: &Envelope) -> Result<(), BridgeError> {
        let payload = envelope.to_json()?;
        trace!(name = envelope.name().unwrap_or(""), "Sending envelope");
        self.post_message(&payload)
    }

    /// Forward an already serialized payload to the host
    pub fn post_message(&self, payload: &str) -> Result<(), BridgeError> {
        self.host.post_message(payload)
    }

    pub fn add_listener(&self, event: &str, listener: Listener) -> Result<(), BridgeError> {
        ensure_supported(event)?;
        self.listeners.lock().push(listener);
        Ok(())
    }

    /// Remove every registration of `listener` (compared by identity)
    pub fn remove_listener(&self, event: &str, listener: &Listener) -> Result<(), BridgeError> {
        ensure_supported(event)?;
        self.listeners.lock().retain(|it| !Arc::ptr_eq(it, listener));
        Ok(())
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Deliver an inbound host payload to all listeners in registration order.
    ///
    /// The first listener error aborts delivery to the remaining listeners and
    /// is returned to the caller.
    pub fn dispatch(&self, data: String) -> Result<(), BridgeError> {
        // Snapshot so listeners may (un)register while being called
        let listeners: Vec<Listener> = self.listeners.lock().clone();
        let message = InboundMessage { data };

        debug!(listeners = listeners.len(), "Dispatching inbound message");

        for (index, listener) in listeners.iter().enumerate() {
            if let Err(e) = listener(&message) {
                warn!(index, "Listener failed, aborting dispatch: {}", e);
                return Err(e);
            }
        }

        Ok(())
    }
}

fn ensure_supported(event: &str) -> Result<(), BridgeError> {
    if event == MESSAGE_EVENT {
        Ok(())
    } else {
        Err(BridgeError::UnsupportedEvent(event.to_string()))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Host double recording every outbound payload
    #[derive(Default)]
    pub struct RecordingHost {
        pub sent: Mutex<Vec<String>>,
        pub unavailable: std::sync::atomic::AtomicBool,
    }

    impl RecordingHost {
        pub fn sent(&self) -> Vec<String> {
            self.sent.lock().clone()
        }
    }

    impl NativeHost for RecordingHost {
        fn post_message(&self, payload: &str) -> Result<(), BridgeError> {
            if self.unavailable.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(BridgeError::HostUnavailable);
            }
            self.sent.lock().push(payload.to_string());
            Ok(())
        }
    }
}
