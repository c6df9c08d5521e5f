//! Change detection for outgoing metadata updates.
//!
//! The detector remembers the tracked fields of the last record that was
//! actually delivered to the host and reports whether a fresh record differs.
//! The artist is not tracked: a change to it alone never triggers an update.

use crate::types::CanonicalMetadata;
use tracing::trace;

/// Tracked fields of the most recent emission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LastSentMetadata {
    pub title: String,
    pub art_url: String,
    pub logo: String,
}

impl From<&CanonicalMetadata> for LastSentMetadata {
    fn from(metadata: &CanonicalMetadata) -> Self {
        Self {
            title: metadata.title.clone(),
            art_url: metadata.art_url.clone(),
            logo: metadata.logo.clone(),
        }
    }
}

/// Change detector for the canonical record
#[derive(Debug, Default)]
pub struct ChangeDetector {
    last_sent: LastSentMetadata,
    emissions: u64,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `current` differs from the last emitted record in any tracked field
    pub fn has_changed(&self, current: &CanonicalMetadata) -> bool {
        let changed = LastSentMetadata::from(current) != self.last_sent;
        trace!(changed, title = %current.title, "Compared against last sent metadata");
        changed
    }

    /// Record `current` as delivered. Call only after the send succeeded.
    pub fn mark_sent(&mut self, current: &CanonicalMetadata) {
        self.last_sent = current.into();
        self.emissions += 1;
    }

    pub fn last_sent(&self) -> &LastSentMetadata {
        &self.last_sent
    }

    /// Number of updates delivered so far
    pub fn emissions(&self) -> u64 {
        self.emissions
    }
}
