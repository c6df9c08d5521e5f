//! Webview Bridge - page-side bridge between a hosted web app and its native shell
//!
//! This crate provides the core that sits inside the hosted page:
//!
//! - **Transport**: one message bus in both directions, with the legacy
//!   transport shapes (`ipc`, Qt `webChannelTransport`, `chrome.webview`)
//!   layered on top of it
//! - **Clipboard**: FIFO correlation of native clipboard reads, plus the
//!   clipboard accessor exposed to the page
//! - **Metadata**: a canonical now-playing record merged from the in-page
//!   player state, the media session and the DOM, pushed to the host only
//!   when it changes
//!
//! # Architecture
//!
//! Page surfaces are traits, so the same [`Bridge`] runs inside a real
//! embedding or against a [`SnapshotPage`]. The host is reached through a
//! [`NativeHost`]; [`native_channel`] builds an in-process pair for it.
//! Periodic work runs as supervised tasks that log and count failures and
//! stop on cancellation.

pub mod bridge;
pub mod change_detector;
pub mod clipboard;
pub mod config;
pub mod correlator;
pub mod extractors;
pub mod hook;
pub mod merge;
pub mod snapshot;
pub mod supervisor;
pub mod transport;
pub mod types;

// Re-export commonly used types
pub use bridge::{Bridge, BridgeStatus, PageSurfaces, TaskStatus};
pub use change_detector::{ChangeDetector, LastSentMetadata};
pub use clipboard::{ClipboardItem, NativeClipboard, PlatformClipboard};
pub use config::Config;
pub use correlator::{ClipboardCorrelator, PendingRead};
pub use extractors::{Document, Element, MediaMetadata, MediaSession, MetadataCandidate};
pub use hook::{MetadataHook, PollOutcome, ServiceLocator, StateService};
pub use merge::{merge_page_sources, Field, MetadataStore};
pub use snapshot::{PageSnapshot, SnapshotPage};
pub use supervisor::{PeriodicTask, Schedule, TaskStats};
pub use transport::adapters::{ChromeWebview, IpcAdapter, LegacyTransports, QtTransport};
pub use transport::channel::{native_channel, HostEndpoint, HostLink, HostMessage};
pub use transport::{InboundMessage, Listener, MessageBus, NativeHost, MESSAGE_EVENT};
pub use types::{
    BridgeError, CanonicalMetadata, Envelope, FieldSource, NativeCommand, PlayerState,
};
