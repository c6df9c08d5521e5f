//! Paired channel between the page and the native host.
//!
//! Instead of mutating global entry points, the bridge is given one end of an
//! explicit channel:
//! - [`HostLink`] is the page side and implements [`NativeHost`]
//! - [`HostEndpoint`] is the host side: it reads serialized envelopes and
//!   pushes [`HostMessage`]s back to the page

use super::NativeHost;
use crate::types::BridgeError;
use tokio::sync::mpsc;
use tracing::trace;

/// Calls the host makes into the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostMessage {
    /// Generic entry point: one opaque payload for the message listeners
    Ipc(String),
    /// Clipboard entry point: text answering the oldest pending read
    Clipboard(String),
}

/// Page side of the channel
#[derive(Clone)]
pub struct HostLink {
    outbound: mpsc::UnboundedSender<String>,
}

impl NativeHost for HostLink {
    fn post_message(&self, payload: &str) -> Result<(), BridgeError> {
        trace!(bytes = payload.len(), "Posting to host");
        self.outbound
            .send(payload.to_string())
            .map_err(|_| BridgeError::HostUnavailable)
    }
}

/// Host side of the channel
pub struct HostEndpoint {
    /// Serialized envelopes sent by the page
    pub outbound: mpsc::UnboundedReceiver<String>,
    /// Calls into the page
    pub inbound: mpsc::UnboundedSender<HostMessage>,
}

impl HostEndpoint {
    /// Invoke the generic inbound entry point
    pub fn send_ipc(&self, payload: impl Into<String>) -> Result<(), BridgeError> {
        self.inbound
            .send(HostMessage::Ipc(payload.into()))
            .map_err(|_| BridgeError::HostUnavailable)
    }

    /// Invoke the clipboard inbound entry point
    pub fn send_clipboard(&self, text: impl Into<String>) -> Result<(), BridgeError> {
        self.inbound
            .send(HostMessage::Clipboard(text.into()))
            .map_err(|_| BridgeError::HostUnavailable)
    }
}

/// Create a connected channel.
///
/// Returns the page-side link, the receiver of host calls the bridge drains,
/// and the host-side endpoint.
pub fn native_channel() -> (
    HostLink,
    mpsc::UnboundedReceiver<HostMessage>,
    HostEndpoint,
) {
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

    (
        HostLink {
            outbound: outbound_tx,
        },
        inbound_rx,
        HostEndpoint {
            outbound: outbound_rx,
            inbound: inbound_tx,
        },
    )
}
