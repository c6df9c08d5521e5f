//! Core types used throughout the bridge.
//!
//! This module defines the wire envelope exchanged with the native host, the
//! canonical now-playing record, the player state shape read from the page,
//! and the crate-wide error type.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Envelope `type` discriminator for native commands
pub const NATIVE_COMMAND: u8 = 6;

/// Command asking the host for the current clipboard text
pub const READ_CLIPBOARD: &str = "read-clipboard";

/// Command carrying a new now-playing record
pub const METADATA_UPDATE: &str = "metadata-update";

/// Wire unit exchanged between the page and the native host.
///
/// Fields are private so an envelope cannot be altered once built; `id` is an
/// informational millisecond timestamp and is never used for correlation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    id: i64,
    #[serde(rename = "type")]
    kind: u8,
    args: Vec<Value>,
}

impl Envelope {
    /// Build a native command envelope: `args[0]` is the command name and the
    /// optional payload follows it.
    pub fn command(name: &str, payload: Option<Value>) -> Self {
        let mut args = vec![Value::String(name.to_string())];
        if let Some(payload) = payload {
            args.push(payload);
        }

        Self {
            id: chrono::Utc::now().timestamp_millis(),
            kind: NATIVE_COMMAND,
            args,
        }
    }

    pub fn read_clipboard() -> Self {
        Self::command(READ_CLIPBOARD, None)
    }

    pub fn metadata_update(metadata: &CanonicalMetadata) -> Result<Self, BridgeError> {
        Ok(Self::command(METADATA_UPDATE, Some(serde_json::to_value(metadata)?)))
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn kind(&self) -> u8 {
        self.kind
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Command name (`args[0]`), if present and a string
    pub fn name(&self) -> Option<&str> {
        self.args.first().and_then(Value::as_str)
    }

    pub fn to_json(&self) -> Result<String, BridgeError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self, BridgeError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Commands the page sends to the host, decoded from an [`Envelope`]
#[derive(Debug, Clone, PartialEq)]
pub enum NativeCommand {
    ReadClipboard,
    MetadataUpdate(CanonicalMetadata),
}

impl TryFrom<Envelope> for NativeCommand {
    type Error = BridgeError;

    fn try_from(envelope: Envelope) -> Result<Self, Self::Error> {
        if envelope.kind != NATIVE_COMMAND {
            return Err(BridgeError::InvalidEnvelope(format!(
                "unknown type {}",
                envelope.kind
            )));
        }

        let mut args = envelope.args.into_iter();
        let name = match args.next() {
            Some(Value::String(name)) => name,
            Some(_) => return Err(BridgeError::InvalidEnvelope("invalid name type".into())),
            None => return Err(BridgeError::InvalidEnvelope("missing name".into())),
        };

        match (name.as_str(), args.next()) {
            (READ_CLIPBOARD, _) => Ok(NativeCommand::ReadClipboard),
            (METADATA_UPDATE, Some(data)) => {
                Ok(NativeCommand::MetadataUpdate(serde_json::from_value(data)?))
            }
            (METADATA_UPDATE, None) => Err(BridgeError::InvalidEnvelope(
                "metadata-update without payload".into(),
            )),
            (other, _) => Err(BridgeError::InvalidEnvelope(format!(
                "unknown method {other}"
            ))),
        }
    }
}

impl TryFrom<&str> for NativeCommand {
    type Error = BridgeError;

    fn try_from(raw: &str) -> Result<Self, Self::Error> {
        Envelope::from_json(raw)?.try_into()
    }
}

/// The single merged best-known now-playing record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalMetadata {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub art_url: String,
    #[serde(default)]
    pub logo: String,
}

impl CanonicalMetadata {
    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
            && self.artist.is_empty()
            && self.art_url.is_empty()
            && self.logo.is_empty()
    }
}

/// Where a canonical field value came from, ordered by priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum FieldSource {
    /// Field has never been set (or was reset)
    #[default]
    Empty,
    /// CSS selector scraping or the page title
    Dom,
    /// Platform media-session metadata
    MediaSession,
    /// Structured player state from the in-page service
    Hook,
}

impl FieldSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldSource::Empty => "empty",
            FieldSource::Dom => "dom",
            FieldSource::MediaSession => "media_session",
            FieldSource::Hook => "hook",
        }
    }
}

/// Player state returned by the in-page service's `getState("player")`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlayerState {
    pub event: Option<StateEvent>,
    pub meta_item: Option<MetaItem>,
    pub selected: Option<Selected>,
}

impl PlayerState {
    /// Id of the video currently selected for playback
    pub fn selected_video_id(&self) -> Option<&str> {
        self.selected
            .as_ref()
            .and_then(|s| s.stream_request.as_ref())
            .and_then(|r| r.path.as_ref())
            .and_then(|p| p.id.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StateEvent {
    pub name: String,
}

/// Container item (movie or series) the selected video belongs to
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaItem {
    pub name: Option<String>,
    pub videos: Vec<Video>,
    pub background: Option<String>,
    pub logo: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Video {
    pub id: String,
    pub title: Option<String>,
    pub name: Option<String>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Selected {
    pub stream_request: Option<StreamRequest>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamRequest {
    pub path: Option<StreamPath>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamPath {
    pub id: Option<String>,
}

/// Errors that can occur inside the bridge
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Unsupported event: {0}")]
    UnsupportedEvent(String),

    #[error("Native host entry point unavailable")]
    HostUnavailable,

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Pending request dropped before a response arrived")]
    RequestDropped,

    #[error("State fetch failed: {0}")]
    StateFetch(String),

    #[error("Service lookup failed: {0}")]
    ServiceLocate(String),

    #[error("Invalid envelope: {0}")]
    InvalidEnvelope(String),

    #[error("Listener failed: {0}")]
    Listener(String),

    #[error("Clipboard error: {0}")]
    Clipboard(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
