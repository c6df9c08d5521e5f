//! Metadata source hook.
//!
//! The web app may expose a service object with an asynchronous
//! `getState(domain)` accessor. The hook looks for it on every extraction
//! cycle until found, attaches exactly once, and from then on polls the
//! player state on its own timer. Polled states feed the canonical store
//! directly with the highest priority.

use crate::extractors::player_state;
use crate::merge::SharedStore;
use crate::types::{BridgeError, PlayerState};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Player event name announcing a new video
pub const VIDEO_CHANGED: &str = "video-changed";

/// The in-page service object
#[async_trait]
pub trait StateService: Send + Sync {
    async fn get_state(&self, domain: &str) -> Result<PlayerState, BridgeError>;
}

/// Finds the in-page service object, if the page has one yet
pub trait ServiceLocator: Send + Sync {
    fn locate(&self) -> Result<Option<Arc<dyn StateService>>, BridgeError>;
}

/// What a single polled state did to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOutcome {
    pub reset: bool,
    pub fields_changed: usize,
}

/// Attach-once hook onto the in-page state service
pub struct MetadataHook {
    locator: Arc<dyn ServiceLocator>,
    service: Mutex<Option<Arc<dyn StateService>>>,
    store: SharedStore,
    domain: String,
    logo_marker: String,
}

impl MetadataHook {
    pub fn new(
        locator: Arc<dyn ServiceLocator>,
        store: SharedStore,
        domain: impl Into<String>,
        logo_marker: impl Into<String>,
    ) -> Self {
        Self {
            locator,
            service: Mutex::new(None),
            store,
            domain: domain.into(),
            logo_marker: logo_marker.into(),
        }
    }

    pub fn is_attached(&self) -> bool {
        self.service.lock().is_some()
    }

    /// Try to attach to the service.
    ///
    /// Returns the service only on the call that attaches; once attached,
    /// later calls return `None` without looking again.
    pub fn try_attach(&self) -> Option<Arc<dyn StateService>> {
        let mut slot = self.service.lock();
        if slot.is_some() {
            return None;
        }

        match self.locator.locate() {
            Ok(Some(service)) => {
                info!("Attached to in-page state service");
                *slot = Some(service.clone());
                Some(service)
            }
            Ok(None) => {
                trace!("State service not present yet");
                None
            }
            Err(e) => {
                warn!("Failed to attach to state service: {}", e);
                None
            }
        }
    }

    /// Fetch the player state once and apply it
    pub async fn poll(&self) -> Result<PollOutcome, BridgeError> {
        let service = self.service.lock().clone();
        let Some(service) = service else {
            return Ok(PollOutcome {
                reset: false,
                fields_changed: 0,
            });
        };

        let state = service.get_state(&self.domain).await?;
        Ok(self.apply_state(&state))
    }

    /// Apply a polled state: reset on a video change, then merge its
    /// metadata item, both under one lock so no cycle sees a half state.
    pub fn apply_state(&self, state: &PlayerState) -> PollOutcome {
        let mut store = self.store.lock();

        let reset = state
            .event
            .as_ref()
            .is_some_and(|event| event.name == VIDEO_CHANGED);
        if reset {
            debug!("Video changed, resetting canonical metadata");
            store.reset();
        }

        let fields_changed = player_state::extract(state, &self.logo_marker)
            .map(|candidate| store.apply(&candidate))
            .unwrap_or(0);

        if fields_changed > 0 {
            debug!(fields_changed, "Hook state merged");
        }

        PollOutcome {
            reset,
            fields_changed,
        }
    }
}
