//! Priority merge of metadata candidates into the canonical record.
//!
//! Every canonical field remembers which source set it. A field only accepts
//! a non-empty value from a source of equal or higher priority; empty values
//! never erase what was derived before. The only way back down is
//! [`MetadataStore::reset`], triggered when the player reports a new video.

use crate::extractors::{looks_like_logo, MetadataCandidate};
use crate::types::{CanonicalMetadata, FieldSource};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, trace};

/// Canonical record shared between the hook poller and the extraction cycle
pub type SharedStore = Arc<Mutex<MetadataStore>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Artist,
    ArtUrl,
    Logo,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::Title, Field::Artist, Field::ArtUrl, Field::Logo];

    fn index(self) -> usize {
        match self {
            Field::Title => 0,
            Field::Artist => 1,
            Field::ArtUrl => 2,
            Field::Logo => 3,
        }
    }
}

/// Canonical metadata plus per-field provenance
#[derive(Debug, Clone, Default)]
pub struct MetadataStore {
    metadata: CanonicalMetadata,
    sources: [FieldSource; 4],
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedStore {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn metadata(&self) -> &CanonicalMetadata {
        &self.metadata
    }

    pub fn source(&self, field: Field) -> FieldSource {
        self.sources[field.index()]
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Title => &self.metadata.title,
            Field::Artist => &self.metadata.artist,
            Field::ArtUrl => &self.metadata.art_url,
            Field::Logo => &self.metadata.logo,
        }
    }

    fn slot(&mut self, field: Field) -> &mut String {
        match field {
            Field::Title => &mut self.metadata.title,
            Field::Artist => &mut self.metadata.artist,
            Field::ArtUrl => &mut self.metadata.art_url,
            Field::Logo => &mut self.metadata.logo,
        }
    }

    /// Offer a value for one field. Returns whether the field changed.
    pub fn offer(&mut self, field: Field, value: Option<&str>, source: FieldSource) -> bool {
        let Some(value) = value.filter(|v| !v.is_empty()) else {
            return false;
        };

        let current = self.source(field);
        if source < current {
            trace!(
                ?field,
                source = source.as_str(),
                current = current.as_str(),
                "Lower-priority value ignored"
            );
            return false;
        }

        self.sources[field.index()] = source;
        let slot = self.slot(field);
        if slot.as_str() == value {
            return false;
        }
        *slot = value.to_string();
        true
    }

    /// Apply every field of a single candidate. Returns the number of fields changed.
    pub fn apply(&mut self, candidate: &MetadataCandidate) -> usize {
        let source = candidate.source;
        [
            self.offer(Field::Title, candidate.title.as_deref(), source),
            self.offer(Field::Artist, candidate.artist.as_deref(), source),
            self.offer(Field::ArtUrl, candidate.art_url.as_deref(), source),
            self.offer(Field::Logo, candidate.logo.as_deref(), source),
        ]
        .into_iter()
        .filter(|changed| *changed)
        .count()
    }

    /// Clear every field and its provenance
    pub fn reset(&mut self) {
        debug!("Canonical metadata reset");
        *self = Self::default();
    }
}

/// Merge the page-level sources into the store.
///
/// Per field, the first non-empty value from the media session, then the
/// DOM, is offered. A field already set by the hook outranks both. For the
/// logo, the chain is media-session logo artwork, then the merged art URL if
/// it is itself a logo image, then DOM logo selectors.
pub fn merge_page_sources(
    store: &mut MetadataStore,
    media: &MetadataCandidate,
    dom: &MetadataCandidate,
    logo_marker: &str,
) -> usize {
    let mut changed = 0;

    for (field, media_value, dom_value) in [
        (Field::Title, &media.title, &dom.title),
        (Field::Artist, &media.artist, &dom.artist),
        (Field::ArtUrl, &media.art_url, &dom.art_url),
    ] {
        let best = first_present([
            (media_value.as_deref(), media.source),
            (dom_value.as_deref(), dom.source),
        ]);
        if let Some((value, source)) = best {
            changed += usize::from(store.offer(field, Some(value), source));
        }
    }

    let art_url = store.get(Field::ArtUrl).to_string();
    let art_as_logo = Some(art_url.as_str()).filter(|url| looks_like_logo(url, logo_marker));
    let best_logo = first_present([
        (media.logo.as_deref(), media.source),
        (art_as_logo, store.source(Field::ArtUrl)),
        (dom.logo.as_deref(), dom.source),
    ]);
    if let Some((value, source)) = best_logo {
        changed += usize::from(store.offer(Field::Logo, Some(value), source));
    }

    changed
}

fn first_present<'a, const N: usize>(
    candidates: [(Option<&'a str>, FieldSource); N],
) -> Option<(&'a str, FieldSource)> {
    candidates
        .into_iter()
        .find_map(|(value, source)| value.filter(|v| !v.is_empty()).map(|v| (v, source)))
}
