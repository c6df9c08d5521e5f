//! Metadata extraction from the page's sources.
//!
//! This module reads the three sources of now-playing information, in
//! descending priority:
//! - Player state: structured state polled from the in-page service
//! - Media session: the platform media-session metadata
//! - DOM: CSS selector scraping plus the page title
//!
//! Each extractor produces a [`MetadataCandidate`]; combining candidates into
//! the canonical record is the job of [`crate::merge`].

pub mod dom;
pub mod media_session;
pub mod player_state;

use crate::types::FieldSource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-field values produced by one source. `None` means the source had
/// nothing (or only whitespace) for that field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataCandidate {
    pub source: FieldSource,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub art_url: Option<String>,
    pub logo: Option<String>,
}

impl MetadataCandidate {
    pub fn empty(source: FieldSource) -> Self {
        Self {
            source,
            ..Default::default()
        }
    }
}

/// One DOM element as seen by selector queries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Element {
    /// Text content
    pub text: String,
    /// Attributes (`src`, `style`, ...)
    pub attributes: BTreeMap<String, String>,
}

impl Element {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Read-only view of the page document
pub trait Document: Send + Sync {
    /// Current `document.title`
    fn title(&self) -> String;

    /// Elements matching a CSS selector, in document order
    fn query_selector_all(&self, selector: &str) -> Vec<Element>;
}

/// Platform media-session metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub artwork: Vec<Artwork>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Artwork {
    pub src: String,
    pub sizes: Option<String>,
    #[serde(rename = "type")]
    pub mime_type: Option<String>,
}

/// Read-only view of the platform media session
pub trait MediaSession: Send + Sync {
    /// Current metadata, if the page has set any
    fn metadata(&self) -> Option<MediaMetadata>;
}

/// Trimmed value, or `None` if nothing is left
pub(crate) fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Whether a URL looks like a logo image
pub fn looks_like_logo(url: &str, marker: &str) -> bool {
    !marker.is_empty() && url.to_lowercase().contains(&marker.to_lowercase())
}
