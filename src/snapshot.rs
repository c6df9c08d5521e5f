//! Static page snapshots.
//!
//! A [`PageSnapshot`] is a JSON capture of everything the bridge reads from a
//! page: the document title, elements per selector, media-session metadata,
//! the in-page player state and the clipboard text the host would answer
//! with. [`SnapshotPage`] serves a snapshot through the page surface traits
//! and lets callers swap parts of it while the bridge is running.

use crate::bridge::PageSurfaces;
use crate::extractors::{Document, Element, MediaMetadata, MediaSession};
use crate::hook::{ServiceLocator, StateService};
use crate::types::{BridgeError, PlayerState};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Everything the bridge can read from a page, at one point in time
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PageSnapshot {
    /// `document.title`
    pub title: String,

    /// Elements keyed by the exact selector string that matches them
    pub elements: BTreeMap<String, Vec<Element>>,

    pub media_session: Option<MediaMetadata>,

    /// State served by the in-page service; `None` means no service object
    pub player_state: Option<PlayerState>,

    /// Text the host answers `read-clipboard` with
    pub clipboard: Option<String>,
}

impl PageSnapshot {
    pub fn from_json(raw: &str) -> Result<Self, BridgeError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn load(path: &Path) -> Result<Self, BridgeError> {
        let contents = std::fs::read_to_string(path)?;
        let snapshot = Self::from_json(&contents)?;
        info!(
            "Loaded page snapshot from {:?} ({} selectors)",
            path,
            snapshot.elements.len()
        );
        Ok(snapshot)
    }
}

/// Live page backed by a mutable snapshot
#[derive(Debug, Clone, Default)]
pub struct SnapshotPage {
    inner: Arc<RwLock<PageSnapshot>>,
}

impl SnapshotPage {
    pub fn new(snapshot: PageSnapshot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(snapshot)),
        }
    }

    /// Current contents
    pub fn snapshot(&self) -> PageSnapshot {
        self.inner.read().clone()
    }

    /// Mutate the page in place
    pub fn update(&self, f: impl FnOnce(&mut PageSnapshot)) {
        f(&mut self.inner.write());
    }

    pub fn clipboard_text(&self) -> Option<String> {
        self.inner.read().clipboard.clone()
    }

    /// Surfaces for a bridge reading this page
    pub fn surfaces(&self) -> PageSurfaces {
        PageSurfaces {
            document: Arc::new(self.clone()),
            media_session: Arc::new(self.clone()),
            services: Arc::new(self.clone()),
            clipboard: None,
        }
    }
}

impl Document for SnapshotPage {
    fn title(&self) -> String {
        self.inner.read().title.clone()
    }

    fn query_selector_all(&self, selector: &str) -> Vec<Element> {
        self.inner
            .read()
            .elements
            .get(selector)
            .cloned()
            .unwrap_or_default()
    }
}

impl MediaSession for SnapshotPage {
    fn metadata(&self) -> Option<MediaMetadata> {
        self.inner.read().media_session.clone()
    }
}

impl ServiceLocator for SnapshotPage {
    fn locate(&self) -> Result<Option<Arc<dyn StateService>>, BridgeError> {
        if self.inner.read().player_state.is_none() {
            return Ok(None);
        }
        debug!("Snapshot exposes a state service");
        Ok(Some(Arc::new(SnapshotStateService {
            page: self.inner.clone(),
        })))
    }
}

/// Serves the snapshot's current player state. A snapshot captures a single
/// state, so it answers for whichever domain the bridge is configured to ask.
struct SnapshotStateService {
    page: Arc<RwLock<PageSnapshot>>,
}

#[async_trait]
impl StateService for SnapshotStateService {
    async fn get_state(&self, domain: &str) -> Result<PlayerState, BridgeError> {
        trace!(domain, "Snapshot state requested");
        self.page
            .read()
            .player_state
            .clone()
            .ok_or_else(|| BridgeError::StateFetch("service went away".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> PageSnapshot {
        serde_json::from_value(json!({
            "title": "My Show",
            "elements": {
                ".title": [{ "text": "Heading" }],
                ".poster": [{ "attributes": { "src": "https://img/p.jpg" } }]
            },
            "media_session": {
                "title": "Session",
                "artwork": [{ "src": "https://img/a.jpg", "sizes": "512x512" }]
            },
            "clipboard": "copied"
        }))
        .unwrap()
    }

    #[test]
    fn test_document_queries() {
        let page = SnapshotPage::new(sample());

        assert_eq!(Document::title(&page), "My Show");
        assert_eq!(page.query_selector_all(".title")[0].text, "Heading");
        assert_eq!(
            page.query_selector_all(".poster")[0].attribute("src"),
            Some("https://img/p.jpg")
        );
        assert!(page.query_selector_all(".missing").is_empty());
        assert_eq!(page.metadata().unwrap().artwork.len(), 1);
        assert_eq!(page.clipboard_text().as_deref(), Some("copied"));
    }

    #[tokio::test]
    async fn test_service_appears_with_player_state() {
        let page = SnapshotPage::new(sample());
        assert!(page.locate().unwrap().is_none());

        page.update(|s| s.player_state = Some(PlayerState::default()));
        let service = page.locate().unwrap().unwrap();

        assert!(service.get_state("player").await.is_ok());
        assert!(service.get_state("playback").await.is_ok());

        page.update(|s| s.player_state = None);
        assert!(service.get_state("player").await.is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.json");
        std::fs::write(&path, r#"{"title":"Loaded"}"#).unwrap();

        let snapshot = PageSnapshot::load(&path).unwrap();
        assert_eq!(snapshot.title, "Loaded");
        assert!(snapshot.media_session.is_none());

        assert!(PageSnapshot::load(&dir.path().join("missing.json")).is_err());
    }
}
